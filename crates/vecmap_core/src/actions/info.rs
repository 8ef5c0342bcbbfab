use std::fmt::Write as _;

use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::{haversine_m, Crs, MapUnits};
use crate::error::ActionError;
use crate::geometry::{GeometryCategory, Point};
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{resolve_feature, POLYGON_TYPES};

/// 显示面要素的几何信息与属性。
#[derive(Clone, Copy, Debug)]
pub struct SeeInfoPolygon;

impl MapAction for SeeInfoPolygon {
    fn declaration(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new("see_info_polygon", Scope::Feature)
            .name("See Polygon Info")
            .category("Information")
            .description("Show area, perimeter and attributes of the polygon")
            .geometry_types(POLYGON_TYPES)
            .setting("decimal_places", SettingSpec::int(2, "Decimal Places").range(0.0, 10.0))
            .setting("show_attributes", SettingSpec::bool(true, "Show Attributes"))
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let decimals = settings.get_i64("decimal_places", 2).clamp(0, 10) as usize;
        let units = target.layer_crs.units.abbreviation();
        let geometry = &target.geometry;

        let mut text = String::new();
        let _ = writeln!(text, "Layer: {} ({})", target.layer_name, target.layer_crs);
        let _ = writeln!(text, "Feature ID: {}", target.feature_id);
        let _ = writeln!(text, "Type: {}", geometry.category());
        let _ = writeln!(text, "Area: {:.*} {units}²", decimals, geometry.area());
        let _ = writeln!(text, "Perimeter: {:.*} {units}", decimals, geometry.length());
        let _ = writeln!(text, "Vertices: {}", geometry.vertex_count());
        let _ = writeln!(text, "Parts: {}", geometry.part_count());
        if let Some(c) = geometry.centroid() {
            let _ = writeln!(text, "Centroid: ({:.*}, {:.*})", decimals, c.x, decimals, c.y);
        }

        if let Some(layer) = env.project.vector(target.layer_id) {
            if layer.is_editable() {
                let state = if layer.is_modified() {
                    "editing, with uncommitted changes"
                } else {
                    "editing"
                };
                let _ = writeln!(text, "Layer state: {state}");
            }
            if settings.get_bool("show_attributes", true)
                && let Some(feature) = layer.feature(target.feature_id)
                && !feature.attributes.is_empty()
            {
                text.push_str("\nAttributes:\n");
                for (name, value) in &feature.attributes {
                    let _ = writeln!(text, "  {name}: {value}");
                }
            }
        }

        env.notifier
            .show_info(&format!("Polygon Info - Feature {}", target.feature_id), text.trim_end());
        Ok(ActionOutcome::Completed)
    }
}

/// 距离格式化：可选单位后缀，大数值自动换算（m → km，ft → mi）。
pub fn format_distance(
    value: f64,
    units: MapUnits,
    decimals: usize,
    show_units: bool,
    auto_convert: bool,
) -> String {
    let (value, suffix) = match units {
        MapUnits::Meters if auto_convert && value >= 1000.0 => (value / 1000.0, "km"),
        MapUnits::Feet if auto_convert && value >= 5280.0 => (value / 5280.0, "mi"),
        other => (value, other.abbreviation()),
    };
    if show_units {
        format!("{value:.decimals$} {suffix}")
    } else {
        format!("{value:.decimals$}")
    }
}

/// 两点间距离及其单位。地理坐标系按大圆距离折算成米。
pub fn measure(crs: Crs, from: Point, to: Point) -> (f64, MapUnits) {
    if crs.is_geographic() {
        (haversine_m(from, to), MapUnits::Meters)
    } else {
        (from.distance(to), crs.units)
    }
}

/// 从点击点量测到输入的目标点。
#[derive(Clone, Copy, Debug)]
pub struct MeasureDistance;

impl MapAction for MeasureDistance {
    fn declaration(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new("measure_distance", Scope::Universal)
            .name("Measure Distance")
            .category("Analysis")
            .description("Measure the distance from the clicked location to a target coordinate")
            .setting("decimal_places", SettingSpec::int(2, "Decimal Places").range(0.0, 10.0))
            .setting("show_units", SettingSpec::bool(true, "Show Units"))
            .setting(
                "auto_convert_units",
                SettingSpec::bool(true, "Auto-convert Units")
                    .describe("Show kilometres or miles for long distances"),
            )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let crs = ctx.canvas_crs().unwrap_or_default();
        let start = ctx.click_point;
        let suggestion = ctx.canvas.map_or(start, |c| c.extent.center());

        let form = DialogForm::new("Measure Distance")
            .message(format!(
                "From ({:.4}, {:.4}) in {crs}. Enter the target coordinate:",
                start.x, start.y
            ))
            .float("x", "Target X", suggestion.x, f64::MIN, f64::MAX)
            .float("y", "Target Y", suggestion.y, f64::MIN, f64::MAX);
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let end = Point::new(
            values.f64("x").unwrap_or(suggestion.x),
            values.f64("y").unwrap_or(suggestion.y),
        );
        if !end.is_finite() {
            return Err(ActionError::context("Invalid target coordinate"));
        }

        let (distance, units) = measure(crs, start, end);
        let decimals = settings.get_i64("decimal_places", 2).clamp(0, 10) as usize;
        let text = format_distance(
            distance,
            units,
            decimals,
            settings.get_bool("show_units", true),
            settings.get_bool("auto_convert_units", true),
        );
        env.notifier.show_info("Distance", &format!("Distance: {text}"));
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_distances_switch_units() {
        assert_eq!(format_distance(1500.0, MapUnits::Meters, 2, true, true), "1.50 km");
        assert_eq!(format_distance(1500.0, MapUnits::Meters, 1, true, false), "1500.0 m");
        assert_eq!(format_distance(10560.0, MapUnits::Feet, 0, true, true), "2 mi");
        assert_eq!(format_distance(12.345, MapUnits::Meters, 1, false, true), "12.3");
    }

    #[test]
    fn geographic_measurement_is_in_meters() {
        let (d, units) = measure(Crs::WGS84, Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert_eq!(units, MapUnits::Meters);
        assert!((d - 111_319.49).abs() < 1.0);
    }
}
