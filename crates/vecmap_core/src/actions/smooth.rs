use crate::action::{ActionOutcome, MapAction};
use crate::algorithms::{smooth_chaikin, MAX_SMOOTH_ITERATIONS};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::error::ActionError;
use crate::geometry::GeometryCategory;
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{
    apply_layer_edit, report_success, resolve_feature, with_copy_settings, with_edit_settings,
    CopyChoice, POLYGON_TYPES,
};

/// Chaikin 平滑面要素（可另存为副本）。
#[derive(Clone, Copy, Debug)]
pub struct SmoothPolygon;

impl MapAction for SmoothPolygon {
    fn declaration(&self) -> CapabilityDeclaration {
        let decl = CapabilityDeclaration::new("smooth_polygon", Scope::Feature)
            .name("Smooth Polygon")
            .category("Editing")
            .description("Smooth polygon edges with corner cutting")
            .geometry_types(POLYGON_TYPES)
            .setting(
                "default_iterations",
                SettingSpec::int(1, "Default Iterations").range(1.0, MAX_SMOOTH_ITERATIONS as f64),
            )
            .setting(
                "default_offset",
                SettingSpec::float(0.25, "Default Offset")
                    .range(0.01, 0.5)
                    .step(0.05)
                    .describe("Fraction of each edge cut off at the corners"),
            )
            .setting(
                "confirm_before_smooth",
                SettingSpec::bool(false, "Confirm Before Smoothing"),
            );
        with_copy_settings(with_edit_settings(decl))
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let copy_choice = CopyChoice::from_settings(settings);

        let mut form = DialogForm::new("Smooth Polygon")
            .message(format!(
                "Polygon feature ID {} ({} vertices)",
                target.feature_id,
                target.geometry.vertex_count()
            ))
            .int(
                "iterations",
                "Iterations",
                settings.get_i64("default_iterations", 1),
                1,
                MAX_SMOOTH_ITERATIONS as i64,
            )
            .float(
                "offset",
                "Offset",
                settings.get_f64("default_offset", 0.25),
                0.01,
                0.5,
            );
        if copy_choice == CopyChoice::Ask {
            form = form.checkbox("create_copy", "Create a smoothed copy", false);
        }
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let iterations = values.i64("iterations").unwrap_or(1).clamp(0, u32::MAX as i64) as u32;
        let offset = values.f64("offset").unwrap_or(0.25);
        let create_copy = match copy_choice {
            CopyChoice::Ask => values.bool("create_copy").unwrap_or(false),
            other => other.checkbox_default(),
        };

        let smoothed = smooth_chaikin(&target.geometry, iterations, offset)?;
        let vertices = (target.geometry.vertex_count(), smoothed.vertex_count());
        if settings.get_bool("confirm_before_smooth", false)
            && !env.notifier.confirm_action(
                "Smooth Polygon",
                &format!(
                    "Smooth polygon feature ID {} with {iterations} iteration(s)?",
                    target.feature_id
                ),
            )
        {
            return Ok(ActionOutcome::Cancelled);
        }

        let feature_id = target.feature_id;
        let mut new_id = None;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            if create_copy {
                let attributes = layer
                    .feature(feature_id)
                    .map(|f| f.attributes.clone())
                    .unwrap_or_default();
                new_id = Some(layer.add_feature(smoothed, attributes)?);
                Ok(())
            } else {
                layer.update_geometry(feature_id, smoothed)
            }
        })?;

        let subject = match new_id {
            Some(id) => format!("Smoothed copy (ID: {id}) of polygon {feature_id} created"),
            None => format!("Polygon feature ID {feature_id} smoothed"),
        };
        report_success(
            env,
            settings,
            "Success",
            &format!(
                "{subject}\n\nVertices: {} → {}{}",
                vertices.0,
                vertices.1,
                completion.note()
            ),
        );
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}
