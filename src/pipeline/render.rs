// The choropleth itself: riding polygons filled on a diverging scale,
// cropped to the fixed Toronto box, written as SVG.

use log::{debug, info};

use plotters::prelude::*;

use geo_types::{LineString, Polygon as GeoPolygon};

use crate::pipeline::geometry::DistrictShape;
use crate::pipeline::*;

/// Canvas size in pixels, roughly the bounding-box aspect at Toronto's
/// latitude.
const MAP_SIZE: (u32, u32) = (900, 640);

/// Fill for ridings that carry no MOV value.
const NO_DATA_GRAY: RGBColor = RGBColor(190, 190, 190);

/// Draws every riding polygon over the fixed bounding box and writes the
/// SVG to `out_path`, replacing any existing file.
pub fn render_map(shapes: &[DistrictShape], out_path: &str) -> PipelineResult<()> {
    info!("render_map: drawing {} ridings to {}", shapes.len(), out_path);
    let root = SVGBackend::new(out_path, MAP_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| rendering_error(out_path, e))?;

    let (west, south, east, north) = TORONTO_BBOX;
    // No mesh, no axes: the chart is only used for the lon/lat viewport.
    let mut chart = ChartBuilder::on(&root)
        .build_cartesian_2d(west..east, south..north)
        .map_err(|e| rendering_error(out_path, e))?;

    for shape in shapes {
        let style = mov_color(shape.mov).filled();
        for polygon in shape.geometry.iter() {
            let (exterior, interiors) = polygon_rings(polygon);
            if exterior.is_empty() {
                continue;
            }
            chart
                .draw_series(std::iter::once(Polygon::new(exterior, style)))
                .map_err(|e| rendering_error(out_path, e))?;
            // Holes (lakes cut out by the province clip) are painted back
            // in the background color on top of the fill.
            for hole in interiors {
                chart
                    .draw_series(std::iter::once(Polygon::new(hole, WHITE.filled())))
                    .map_err(|e| rendering_error(out_path, e))?;
            }
        }
        debug!(
            "render_map: riding {} mov {:?} ({} polygons)",
            shape.fed_num,
            shape.mov,
            shape.geometry.0.len()
        );
    }

    root.present().map_err(|e| rendering_error(out_path, e))?;
    Ok(())
}

/// Splits a polygon into drawable rings: the exterior plus one ring per
/// interior hole.
fn polygon_rings(polygon: &GeoPolygon<f64>) -> (Vec<(f64, f64)>, Vec<Vec<(f64, f64)>>) {
    fn ring(ls: &LineString<f64>) -> Vec<(f64, f64)> {
        ls.coords().map(|c| (c.x, c.y)).collect()
    }
    (
        ring(polygon.exterior()),
        polygon.interiors().iter().map(ring).collect(),
    )
}

fn rendering_error(path: &str, e: impl std::fmt::Display) -> PipelineError {
    RenderingSnafu {
        path,
        message: e.to_string(),
    }
    .build()
}

/// Diverging blue/white/red scale anchored at -100, 0 and +100. Values
/// outside the domain are clamped; a missing value renders gray.
fn mov_color(mov: Option<f64>) -> RGBColor {
    let v = match mov {
        Some(v) => v,
        None => return NO_DATA_GRAY,
    };
    let t = (v / 100.0).clamp(-1.0, 1.0);
    if t < 0.0 {
        // White towards blue.
        let channel = lerp(255, 0, -t);
        RGBColor(channel, channel, 255)
    } else {
        // White towards red.
        let channel = lerp(255, 0, t);
        RGBColor(255, channel, channel)
    }
}

fn lerp(from: u8, to: u8, t: f64) -> u8 {
    (from as f64 + (to as f64 - from as f64) * t).round() as u8
}
