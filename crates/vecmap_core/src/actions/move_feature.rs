use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::error::ActionError;
use crate::geometry::{GeometryCategory, Point};
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{
    apply_layer_edit, format_template, report_success, resolve_feature, with_copy_settings,
    with_edit_settings, CopyChoice, POINT_TYPES, POLYGON_TYPES,
};

/// 方位角（0° = 北，90° = 东，顺时针）换算成平移量。
pub fn offset_for_bearing(distance: f64, bearing_deg: f64) -> (f64, f64) {
    let rad = (90.0 - bearing_deg).to_radians();
    (distance * rad.cos(), distance * rad.sin())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoveTarget {
    Point,
    Polygon,
}

/// 按距离与方位移动（或复制）点/面要素。
#[derive(Clone, Copy, Debug)]
pub struct MoveByDistanceDirection {
    target: MoveTarget,
}

impl MoveByDistanceDirection {
    pub fn point() -> Self {
        Self {
            target: MoveTarget::Point,
        }
    }

    pub fn polygon() -> Self {
        Self {
            target: MoveTarget::Polygon,
        }
    }

    fn noun(&self) -> &'static str {
        match self.target {
            MoveTarget::Point => "point",
            MoveTarget::Polygon => "polygon",
        }
    }

    fn accepts(&self) -> fn(GeometryCategory) -> bool {
        match self.target {
            MoveTarget::Point => GeometryCategory::is_puntal,
            MoveTarget::Polygon => GeometryCategory::is_polygonal,
        }
    }
}

impl MapAction for MoveByDistanceDirection {
    fn declaration(&self) -> CapabilityDeclaration {
        let (id, name, types) = match self.target {
            MoveTarget::Point => (
                "move_point_by_distance_direction",
                "Move Point by Distance & Direction",
                POINT_TYPES,
            ),
            MoveTarget::Polygon => (
                "move_polygon_by_distance_direction",
                "Move Polygon by Distance & Direction",
                POLYGON_TYPES,
            ),
        };
        let decl = CapabilityDeclaration::new(id, Scope::Feature)
            .name(name)
            .category("Editing")
            .description("Move the feature a given distance along a compass bearing (0° = North, 90° = East)")
            .geometry_types(types)
            .setting(
                "default_distance",
                SettingSpec::float(100.0, "Default Distance").range(0.0, 1_000_000.0).step(1.0),
            )
            .setting(
                "default_direction",
                SettingSpec::float(0.0, "Default Direction").range(0.0, 360.0).step(1.0),
            )
            .setting("confirm_move", SettingSpec::bool(true, "Confirm Before Moving"))
            .setting(
                "success_message_template",
                SettingSpec::str(
                    "Feature ID {feature_id} moved by {distance} units at {direction}°",
                    "Success Message Template",
                ),
            );
        with_copy_settings(with_edit_settings(decl))
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, self.accepts(), self.noun())?;
        let copy_choice = CopyChoice::from_settings(settings);

        let mut form = DialogForm::new(self.declaration().name)
            .message(format!(
                "Move {} feature ID {} from layer '{}'",
                self.noun(),
                target.feature_id,
                target.layer_name
            ))
            .float(
                "distance",
                "Distance (map units)",
                settings.get_f64("default_distance", 100.0),
                0.0,
                1_000_000.0,
            )
            .float(
                "direction",
                "Direction (0° = North, 90° = East)",
                settings.get_f64("default_direction", 0.0),
                0.0,
                360.0,
            );
        if copy_choice == CopyChoice::Ask {
            form = form.checkbox("create_copy", "Create a copy instead of moving", false);
        }
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let distance = values.f64("distance").unwrap_or(0.0);
        let direction = values.f64("direction").unwrap_or(0.0);
        let create_copy = match copy_choice {
            CopyChoice::Ask => values.bool("create_copy").unwrap_or(false),
            other => other.checkbox_default(),
        };

        let (dx, dy) = offset_for_bearing(distance, direction);
        let moved = target.geometry.translated(dx, dy);
        let distance_text = format!("{distance:.2}");
        let direction_text = format!("{direction:.1}");

        if settings.get_bool("confirm_move", true) {
            let question = format!(
                "{} {} feature ID {} from layer '{}' by {} units at {}°?",
                if create_copy { "Copy" } else { "Move" },
                self.noun(),
                target.feature_id,
                target.layer_name,
                distance_text,
                direction_text
            );
            if !env.notifier.confirm_action(&form.title, &question) {
                return Ok(ActionOutcome::Cancelled);
            }
        }

        let feature_id = target.feature_id;
        let mut new_id = None;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            if create_copy {
                let attributes = layer
                    .feature(feature_id)
                    .map(|f| f.attributes.clone())
                    .unwrap_or_default();
                new_id = Some(layer.add_feature(moved, attributes)?);
                Ok(())
            } else {
                layer.update_geometry(feature_id, moved)
            }
        })?;

        let message = match new_id {
            Some(id) => format!(
                "Copy created (ID: {id}), moved by {distance_text} units at {direction_text}°.\n\nOriginal feature (ID: {feature_id}) remains at its location."
            ),
            None => format_template(
                &settings.get_string(
                    "success_message_template",
                    "Feature ID {feature_id} moved by {distance} units at {direction}°",
                ),
                &[
                    ("feature_id", &feature_id),
                    ("layer_name", &target.layer_name),
                    ("distance", &distance_text),
                    ("direction", &direction_text),
                ],
            ),
        };
        report_success(env, settings, "Success", &format!("{message}{}", completion.note()));
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}

/// 把点移动到输入的坐标（图层 CRS）。
#[derive(Clone, Copy, Debug)]
pub struct MovePointToCoordinates;

impl MapAction for MovePointToCoordinates {
    fn declaration(&self) -> CapabilityDeclaration {
        let decl = CapabilityDeclaration::new("move_point_to_coordinates", Scope::Feature)
            .name("Move Point to Coordinates")
            .category("Editing")
            .description("Move a point feature to typed coordinates in the layer's coordinate system")
            .geometry_types(POINT_TYPES)
            .setting(
                "coordinate_decimals",
                SettingSpec::int(6, "Coordinate Decimals").range(0.0, 12.0),
            )
            .setting(
                "confirm_before_move",
                SettingSpec::bool(false, "Confirm Before Moving"),
            );
        with_copy_settings(with_edit_settings(decl))
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_puntal, "point")?;
        let current = target
            .geometry
            .as_point()
            .ok_or_else(|| ActionError::context("Feature has invalid point geometry"))?;
        let copy_choice = CopyChoice::from_settings(settings);

        let mut form = DialogForm::new("Move Point to Coordinates")
            .message(format!(
                "Point feature ID {} on layer '{}' ({})",
                target.feature_id,
                target.layer_name,
                target.layer_crs
            ))
            .float("x", "X", current.x, f64::MIN, f64::MAX)
            .float("y", "Y", current.y, f64::MIN, f64::MAX);
        if copy_choice == CopyChoice::Ask {
            form = form.checkbox("create_copy", "Create a copy instead of moving", false);
        }
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let destination = Point::new(
            values.f64("x").unwrap_or(current.x),
            values.f64("y").unwrap_or(current.y),
        );
        if !destination.is_finite() {
            return Err(ActionError::context("Invalid coordinates"));
        }
        let create_copy = match copy_choice {
            CopyChoice::Ask => values.bool("create_copy").unwrap_or(false),
            other => other.checkbox_default(),
        };

        let decimals = settings.get_i64("coordinate_decimals", 6).clamp(0, 12) as usize;
        let coords = format!(
            "({:.*}, {:.*})",
            decimals, destination.x, decimals, destination.y
        );
        if settings.get_bool("confirm_before_move", false)
            && !env.notifier.confirm_action(
                "Move Point to Coordinates",
                &format!("Move point feature ID {} to {coords}?", target.feature_id),
            )
        {
            return Ok(ActionOutcome::Cancelled);
        }

        // 多点整体平移，使第一个点落在目标位置
        let moved = target
            .geometry
            .translated(destination.x - current.x, destination.y - current.y);
        let feature_id = target.feature_id;
        let mut new_id = None;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            if create_copy {
                let attributes = layer
                    .feature(feature_id)
                    .map(|f| f.attributes.clone())
                    .unwrap_or_default();
                new_id = Some(layer.add_feature(moved, attributes)?);
                Ok(())
            } else {
                layer.update_geometry(feature_id, moved)
            }
        })?;

        let message = match new_id {
            Some(id) => format!("Point copy (ID: {id}) created at {coords}"),
            None => format!("Point feature ID {feature_id} moved to {coords}"),
        };
        report_success(env, settings, "Success", &format!("{message}{}", completion.note()));
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    #[test]
    fn bearing_zero_points_north() {
        let (dx, dy) = offset_for_bearing(10.0, 0.0);
        assert!(dx.abs() < 1e-9 && (dy - 10.0).abs() < 1e-9);
        let (dx, dy) = offset_for_bearing(10.0, 90.0);
        assert!((dx - 10.0).abs() < 1e-9 && dy.abs() < 1e-9);
    }

    #[test]
    fn moved_polygon_keeps_its_shape() {
        let poly = Geometry::Polygon(vec![vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]]);
        let (dx, dy) = offset_for_bearing(5.0, 180.0);
        let moved = poly.translated(dx, dy);
        assert!((moved.area() - poly.area()).abs() < 1e-9);
        let c = moved.centroid().unwrap();
        assert!((c.x - 1.0).abs() < 1e-9 && (c.y + 4.0).abs() < 1e-9);
    }
}
