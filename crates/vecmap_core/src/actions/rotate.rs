use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::error::ActionError;
use crate::geometry::GeometryCategory;
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{apply_layer_edit, report_success, resolve_feature, with_edit_settings, LINE_TYPES, POLYGON_TYPES};

/// 绕质心顺时针旋转线/面要素。
#[derive(Clone, Copy, Debug)]
pub struct RotateFeature {
    polygon: bool,
}

impl RotateFeature {
    pub fn line() -> Self {
        Self { polygon: false }
    }

    pub fn polygon() -> Self {
        Self { polygon: true }
    }

    fn noun(&self) -> &'static str {
        if self.polygon { "polygon" } else { "line" }
    }
}

impl MapAction for RotateFeature {
    fn declaration(&self) -> CapabilityDeclaration {
        let (id, name, types) = if self.polygon {
            ("rotate_polygon", "Rotate Polygon", POLYGON_TYPES)
        } else {
            ("rotate_line", "Rotate Line", LINE_TYPES)
        };
        let decl = CapabilityDeclaration::new(id, Scope::Feature)
            .name(name)
            .category("Editing")
            .description("Rotate the feature clockwise around its centroid")
            .geometry_types(types)
            .setting(
                "default_rotation_angle",
                SettingSpec::float(0.0, "Default Rotation Angle").range(-360.0, 360.0),
            )
            .setting(
                "confirm_before_rotate",
                SettingSpec::bool(false, "Confirm Before Rotating"),
            );
        with_edit_settings(decl)
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let accepts = if self.polygon {
            GeometryCategory::is_polygonal
        } else {
            GeometryCategory::is_linear
        };
        let target = resolve_feature(ctx, env.project, accepts, self.noun())?;

        let form = DialogForm::new(self.declaration().name)
            .message(format!(
                "Rotate {} feature ID {} clockwise around its centroid",
                self.noun(),
                target.feature_id
            ))
            .float(
                "angle",
                "Angle (degrees, clockwise)",
                settings.get_f64("default_rotation_angle", 0.0),
                -360.0,
                360.0,
            );
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let angle = values.f64("angle").unwrap_or(0.0);
        if angle == 0.0 {
            env.notifier
                .show_info(&form.title, "Rotation angle is 0°, nothing to do");
            return Ok(ActionOutcome::Cancelled);
        }

        let rotated = target.geometry.rotated(angle)?;
        if settings.get_bool("confirm_before_rotate", false)
            && !env.notifier.confirm_action(
                &form.title,
                &format!("Rotate {} feature ID {} by {angle:.1}°?", self.noun(), target.feature_id),
            )
        {
            return Ok(ActionOutcome::Cancelled);
        }

        let feature_id = target.feature_id;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            layer.update_geometry(feature_id, rotated)
        })?;
        report_success(
            env,
            settings,
            "Success",
            &format!(
                "{} feature ID {feature_id} rotated by {angle:.1}°{}",
                if self.polygon { "Polygon" } else { "Line" },
                completion.note()
            ),
        );
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}
