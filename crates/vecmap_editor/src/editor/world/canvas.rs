use bevy::prelude::*;

use vecmap_core::geometry::{Geometry, Point};
use vecmap_core::{Extent, MapLayer};

use crate::editor::types::{ContextMenuState, MapSession};
use crate::editor::UI_HIGHLIGHT;

/// 点要素的屏幕半径（像素）。
const POINT_RADIUS_PX: f32 = 4.0;
const MAX_GRID_LINES: usize = 200;

fn layer_color(index: usize, editable: bool) -> Color {
    const PALETTE: [Color; 5] = [
        Color::srgb(0.95, 0.65, 0.25),
        Color::srgb(0.35, 0.80, 0.55),
        Color::srgb(0.45, 0.70, 0.95),
        Color::srgb(0.85, 0.45, 0.80),
        Color::srgb(0.90, 0.90, 0.45),
    ];
    let base = PALETTE[index % PALETTE.len()];
    if editable {
        // 编辑中的图层画成红色，方便看出未提交的会话
        Color::srgb(0.95, 0.30, 0.30)
    } else {
        base
    }
}

fn closed(ring: &[Point]) -> impl Iterator<Item = Vec2> + '_ {
    let needs_close = ring.len() > 2 && ring.first() != ring.last();
    ring.iter()
        .copied()
        .chain(ring.first().copied().filter(|_| needs_close))
        .map(Vec2::from)
}

fn draw_geometry(gizmos: &mut Gizmos, geometry: &Geometry, color: Color, point_radius: f32) {
    match geometry {
        Geometry::Point(p) => {
            gizmos.circle_2d(Vec2::from(*p), point_radius, color);
        }
        Geometry::MultiPoint(points) => {
            for p in points {
                gizmos.circle_2d(Vec2::from(*p), point_radius, color);
            }
        }
        Geometry::Line(line) => gizmos.linestrip_2d(line.iter().copied().map(Vec2::from), color),
        Geometry::MultiLine(lines) => {
            for line in lines {
                gizmos.linestrip_2d(line.iter().copied().map(Vec2::from), color);
            }
        }
        Geometry::Polygon(rings) => {
            for ring in rings {
                gizmos.linestrip_2d(closed(ring), color);
            }
        }
        Geometry::MultiPolygon(parts) => {
            for ring in parts.iter().flatten() {
                gizmos.linestrip_2d(closed(ring), color);
            }
        }
    }
}

/// 底图：按当前范围选一个 1/2/5 × 10^n 的间距画网格。
fn draw_basemap_grid(gizmos: &mut Gizmos, extent: &Extent) {
    let span = extent.width().max(extent.height());
    if !(span.is_finite() && span > 0.0) {
        return;
    }
    let raw = span / 10.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(magnitude * 10.0);
    let color = Color::srgba(1.0, 1.0, 1.0, 0.08);

    let first_x = (extent.min_x / step).floor() * step;
    for i in 0..MAX_GRID_LINES {
        let x = first_x + i as f64 * step;
        if x > extent.max_x {
            break;
        }
        gizmos.line_2d(
            Vec2::new(x as f32, extent.min_y as f32),
            Vec2::new(x as f32, extent.max_y as f32),
            color,
        );
    }
    let first_y = (extent.min_y / step).floor() * step;
    for i in 0..MAX_GRID_LINES {
        let y = first_y + i as f64 * step;
        if y > extent.max_y {
            break;
        }
        gizmos.line_2d(
            Vec2::new(extent.min_x as f32, y as f32),
            Vec2::new(extent.max_x as f32, y as f32),
            color,
        );
    }
}

/// 自底向上绘制可见图层；菜单打开时高亮最近的候选要素。
pub fn draw_layers(mut gizmos: Gizmos, session: Res<MapSession>, menu: Res<ContextMenuState>) {
    let canvas = &session.canvas;
    let point_radius = POINT_RADIUS_PX * canvas.map_units_per_pixel() as f32;

    for (index, layer) in session.project.layers().iter().enumerate().rev() {
        if !layer.is_visible() {
            continue;
        }
        match layer {
            MapLayer::Raster(_) => draw_basemap_grid(&mut gizmos, &canvas.extent),
            MapLayer::Vector(vector) => {
                let color = layer_color(index, vector.is_editable());
                for feature in vector.features() {
                    if let Some(geometry) = &feature.geometry {
                        draw_geometry(&mut gizmos, geometry, color, point_radius);
                    }
                }
            }
        }
    }

    if !menu.open {
        return;
    }
    let Some(context) = &menu.context else {
        return;
    };
    let click = Vec2::from(context.click_point);
    gizmos.circle_2d(click, point_radius * 0.5, Color::WHITE);
    if let Some(best) = context.closest()
        && let Some(feature) = session.project.vector(best.layer_id).and_then(|l| l.feature(best.feature_id))
        && let Some(geometry) = &feature.geometry
    {
        draw_geometry(&mut gizmos, geometry, UI_HIGHLIGHT, point_radius * 1.5);
    }
}
