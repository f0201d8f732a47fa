// Boundary loading, reprojection, the MOV join and the province clip.
//
// Both boundary files ship in the Statistics Canada Lambert projection
// (EPSG:3347); everything is brought to WGS84 before the overlay so that the
// renderer can crop with a lon/lat box.

use log::{info, warn};

use geo::{BooleanOps, MapCoords};
use geo_types::{Coord, MultiPolygon, Polygon};
use proj4rs::transform::transform;
use proj4rs::Proj;
use snafu::prelude::*;
use std::collections::HashMap;

use riding_results::RidingMov;
use shapefile::dbase::FieldValue;
use shapefile::Shape;

use crate::pipeline::*;

/// One riding polygon after the join: clipped geometry plus the MOV
/// annotation, or `None` when the tally had no value for this riding.
#[derive(Debug, Clone)]
pub struct DistrictShape {
    pub fed_num: String,
    pub name: Option<String>,
    pub mov: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// Loads both boundary files, reprojects them, left-joins the MOV values by
/// district number and clips every riding to the Ontario boundary.
pub fn join_geometry(
    districts_path: &str,
    provinces_path: &str,
    movs: &[RidingMov],
) -> PipelineResult<Vec<DistrictShape>> {
    let src = Proj::from_proj_string(STATCAN_LAMBERT).context(ProjDefinitionSnafu {
        definition: STATCAN_LAMBERT,
    })?;
    let dst = Proj::from_proj_string(WGS84_LONGLAT).context(ProjDefinitionSnafu {
        definition: WGS84_LONGLAT,
    })?;

    let province = load_province_boundary(provinces_path, ONTARIO_PRUID)?;
    let province = reproject(&province, &src, &dst)?;

    let district_shapes = load_district_shapes(districts_path, &TORONTO_RIDINGS)?;
    let mut clipped: Vec<(String, MultiPolygon<f64>)> = Vec::new();
    for (fed_num, geom) in district_shapes {
        let geom = reproject(&geom, &src, &dst)?;
        // A riding on the lake shore may be cut into several pieces here;
        // an empty intersection just renders nothing.
        clipped.push((fed_num, geom.intersection(&province)));
    }

    let res = attach_mov(clipped, movs);
    info!("join_geometry: {} riding polygons", res.len());
    Ok(res)
}

/// Left-joins the MOV values onto the riding polygons by district number.
/// A polygon without a tally keeps `mov: None`; it never inherits a value
/// from another riding.
fn attach_mov(shapes: Vec<(String, MultiPolygon<f64>)>, movs: &[RidingMov]) -> Vec<DistrictShape> {
    let mov_by_district: HashMap<&str, &RidingMov> = movs
        .iter()
        .map(|m| (m.district_num.as_str(), m))
        .collect();
    let mut res: Vec<DistrictShape> = Vec::new();
    for (fed_num, geometry) in shapes {
        let mov = mov_by_district.get(fed_num.as_str());
        if mov.is_none() {
            warn!("attach_mov: no MOV value for riding {}", fed_num);
        }
        res.push(DistrictShape {
            name: mov.map(|m| m.name.clone()),
            mov: mov.map(|m| m.mov),
            fed_num,
            geometry,
        });
    }
    res
}

/// Reads the district boundary shapefile and keeps the polygons whose
/// FED_NUM is in the allow-list.
fn load_district_shapes(
    path: &str,
    districts: &[&str],
) -> PipelineResult<Vec<(String, MultiPolygon<f64>)>> {
    info!("load_district_shapes: reading {}", path);
    let mut reader =
        shapefile::Reader::from_path(path).context(OpeningShapefileSnafu { path })?;
    let mut res: Vec<(String, MultiPolygon<f64>)> = Vec::new();
    for shape_record in reader.iter_shapes_and_records() {
        let (shape, record) = shape_record.context(ShapefileRecordSnafu {})?;
        let fed_num = match record.get("FED_NUM").and_then(normalize_district_id) {
            Some(id) => id,
            None => whatever!("missing FED_NUM attribute in {}", path),
        };
        if !districts.contains(&fed_num.as_str()) {
            continue;
        }
        res.push((fed_num, shape_to_multipolygon(shape, path)?));
    }
    info!("load_district_shapes: kept {} of the allow-list", res.len());
    Ok(res)
}

/// Reads the province boundary shapefile and returns the geometry of the
/// single province matching `pruid`.
fn load_province_boundary(path: &str, pruid: &str) -> PipelineResult<MultiPolygon<f64>> {
    info!("load_province_boundary: reading {}", path);
    let mut reader =
        shapefile::Reader::from_path(path).context(OpeningShapefileSnafu { path })?;
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for shape_record in reader.iter_shapes_and_records() {
        let (shape, record) = shape_record.context(ShapefileRecordSnafu {})?;
        let matches_pruid = match record.get("PRUID").and_then(normalize_district_id) {
            Some(id) => id == pruid,
            None => false,
        };
        if !matches_pruid {
            continue;
        }
        polygons.extend(shape_to_multipolygon(shape, path)?);
    }
    ensure!(!polygons.is_empty(), MissingProvinceSnafu { pruid });
    Ok(MultiPolygon(polygons))
}

fn shape_to_multipolygon(shape: Shape, path: &str) -> PipelineResult<MultiPolygon<f64>> {
    match shape {
        Shape::Polygon(p) => Ok(p.into()),
        Shape::NullShape => {
            warn!("shape_to_multipolygon: null shape in {}", path);
            Ok(MultiPolygon(Vec::new()))
        }
        other => whatever!("unexpected geometry type {} in {}", other.shapetype(), path),
    }
}

/// Renders an attribute value as the normalized district identifier. The
/// district file stores FED_NUM as a number while the province file stores
/// PRUID as text; both compare against string allow-lists.
fn normalize_district_id(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format!("{}", *n as i64)),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coordinate-wise reprojection. proj4rs works in radians on geographic
/// systems, hence the degree conversion on the way out.
fn reproject(
    mp: &MultiPolygon<f64>,
    src: &Proj,
    dst: &Proj,
) -> PipelineResult<MultiPolygon<f64>> {
    mp.try_map_coords(|coord| {
        let mut point = (coord.x, coord.y, 0.0);
        transform(src, dst, &mut point)?;
        Ok(Coord {
            x: point.0.to_degrees(),
            y: point.1.to_degrees(),
        })
    })
    .context(ReprojectionSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Rect};

    #[test]
    fn district_ids_normalize_across_attribute_types() {
        assert_eq!(
            normalize_district_id(&FieldValue::Numeric(Some(35007.0))),
            Some("35007".to_string())
        );
        assert_eq!(
            normalize_district_id(&FieldValue::Character(Some(" 35 ".to_string()))),
            Some("35".to_string())
        );
        assert_eq!(
            normalize_district_id(&FieldValue::Integer(35122)),
            Some("35122".to_string())
        );
        assert_eq!(normalize_district_id(&FieldValue::Numeric(None)), None);
        assert_eq!(normalize_district_id(&FieldValue::Character(None)), None);
    }

    #[test]
    fn statcan_lambert_roundtrips_toronto() {
        let src = Proj::from_proj_string(STATCAN_LAMBERT).unwrap();
        let dst = Proj::from_proj_string(WGS84_LONGLAT).unwrap();
        // A point near downtown Toronto in EPSG:3347 coordinates.
        let square = Rect::new(
            Coord {
                x: 7_200_000.0,
                y: 930_000.0,
            },
            Coord {
                x: 7_210_000.0,
                y: 940_000.0,
            },
        )
        .to_polygon();
        let mp = MultiPolygon(vec![square]);
        let out = reproject(&mp, &src, &dst).unwrap();
        let exterior: &LineString<f64> = out.0[0].exterior();
        for c in exterior.coords() {
            // Southern Ontario, in degrees.
            assert!(c.x > -85.0 && c.x < -75.0, "lon {}", c.x);
            assert!(c.y > 40.0 && c.y < 46.0, "lat {}", c.y);
        }
    }

    #[test]
    fn mov_join_matches_by_district_number_or_stays_missing() {
        let square = MultiPolygon(vec![Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        )
        .to_polygon()]);
        let shapes = vec![
            ("35007".to_string(), square.clone()),
            ("35022".to_string(), square),
        ];
        let movs = vec![RidingMov {
            district_num: "35007".to_string(),
            name: "Beaches--East York".to_string(),
            mov: 5.0,
        }];
        let joined = attach_mov(shapes, &movs);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].fed_num, "35007");
        assert_eq!(joined[0].mov, Some(5.0));
        assert_eq!(joined[0].name.as_deref(), Some("Beaches--East York"));
        // No tally for this riding: explicitly missing, not a default.
        assert_eq!(joined[1].fed_num, "35022");
        assert_eq!(joined[1].mov, None);
        assert_eq!(joined[1].name, None);
    }

    #[test]
    fn clip_keeps_the_overlapping_part() {
        let district: MultiPolygon<f64> = MultiPolygon(vec![Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 2.0, y: 2.0 },
        )
        .to_polygon()]);
        let province = MultiPolygon(vec![Rect::new(
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 3.0, y: 2.0 },
        )
        .to_polygon()]);
        let clipped = district.intersection(&province);
        use geo::Area;
        assert!((clipped.unsigned_area() - 2.0).abs() < 1e-9);
    }
}
