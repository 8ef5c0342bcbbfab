use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::error::{ActionError, GeometryError};
use crate::geometry::{Geometry, GeometryCategory, Point};
use crate::layer::FeatureId;
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{
    apply_layer_edit, report_success, resolve_feature, resolve_target_layer, with_edit_settings,
    LINE_TYPES,
};

const MAX_SCALE_FACTOR: f64 = 1000.0;

fn scale_form(title: &str, message: String, default: f64) -> DialogForm {
    DialogForm::new(title).message(message).float(
        "factor",
        "Scale factor (1.0 = unchanged)",
        default,
        0.001,
        MAX_SCALE_FACTOR,
    )
}

/// 以质心为原点缩放单条线。
#[derive(Clone, Copy, Debug)]
pub struct ScaleLine;

impl MapAction for ScaleLine {
    fn declaration(&self) -> CapabilityDeclaration {
        let decl = CapabilityDeclaration::new("scale_line", Scope::Feature)
            .name("Scale Line")
            .category("Editing")
            .description("Scale a line feature around its centroid")
            .geometry_types(LINE_TYPES)
            .setting(
                "default_scale_factor",
                SettingSpec::float(1.0, "Default Scale Factor").range(0.001, MAX_SCALE_FACTOR),
            )
            .setting(
                "confirm_before_scale",
                SettingSpec::bool(false, "Confirm Before Scaling"),
            );
        with_edit_settings(decl)
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_linear, "line")?;
        let before = target.geometry.length();
        let form = scale_form(
            "Scale Line",
            format!(
                "Line feature ID {} (length {before:.2})",
                target.feature_id
            ),
            settings.get_f64("default_scale_factor", 1.0),
        );
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let factor = values.f64("factor").unwrap_or(1.0);
        let scaled = target.geometry.scaled(factor, None)?;
        if settings.get_bool("confirm_before_scale", false)
            && !env.notifier.confirm_action(
                "Scale Line",
                &format!("Scale line feature ID {} by {factor}?", target.feature_id),
            )
        {
            return Ok(ActionOutcome::Cancelled);
        }
        let after = scaled.length();
        let feature_id = target.feature_id;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            layer.update_geometry(feature_id, scaled)
        })?;
        report_success(
            env,
            settings,
            "Success",
            &format!(
                "Line feature ID {feature_id} scaled by {factor}\n\nLength: {before:.2} → {after:.2}{}",
                completion.note()
            ),
        );
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}

/// 缩放整个线图层：每条线绕自身质心（individual）或绕图层质心（layer）。
#[derive(Clone, Copy, Debug)]
pub struct ScaleLineLayer;

/// 对一组线几何按模式缩放，返回 (要素, 新几何) 列表。
pub fn scale_lines(
    lines: &[(FeatureId, Geometry)],
    factor: f64,
    around_layer_centroid: bool,
) -> Result<Vec<(FeatureId, Geometry)>, GeometryError> {
    let pivot: Option<Point> = if around_layer_centroid {
        let all = Geometry::MultiLine(
            lines
                .iter()
                .flat_map(|(_, g)| match g {
                    Geometry::Line(l) => vec![l.clone()],
                    Geometry::MultiLine(ls) => ls.clone(),
                    _ => Vec::new(),
                })
                .collect(),
        );
        Some(all.centroid().ok_or(GeometryError::Empty)?)
    } else {
        None
    };
    lines
        .iter()
        .map(|(id, g)| Ok((*id, g.scaled(factor, pivot)?)))
        .collect()
}

impl MapAction for ScaleLineLayer {
    fn declaration(&self) -> CapabilityDeclaration {
        let decl = CapabilityDeclaration::new("scale_line_layer", Scope::Layer)
            .name("Scale Line Layer")
            .category("Editing")
            .description("Scale every line in the layer")
            .geometry_types(LINE_TYPES)
            .setting(
                "default_scale_factor",
                SettingSpec::float(1.0, "Default Scale Factor").range(0.001, MAX_SCALE_FACTOR),
            )
            .setting(
                "default_scaling_mode",
                SettingSpec::choice("individual", &["individual", "layer"], "Scaling Mode")
                    .describe("individual: each line around its own centroid; layer: all lines around the layer centroid"),
            )
            .setting(
                "confirm_before_scale",
                SettingSpec::bool(true, "Confirm Before Scaling"),
            )
            .setting(
                "skip_invalid_geometries",
                SettingSpec::bool(true, "Skip Invalid Geometries"),
            );
        with_edit_settings(decl)
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_linear, "line")?;
        let layer_id = layer.id;
        let layer_name = layer.name.clone();
        let skip_invalid = settings.get_bool("skip_invalid_geometries", true);
        let mut lines = Vec::new();
        let mut skipped = 0usize;
        for f in layer.features() {
            match &f.geometry {
                Some(g) if !g.is_empty() && g.length() > 0.0 => lines.push((f.id, g.clone())),
                _ if skip_invalid => skipped += 1,
                _ => {
                    return Err(GeometryError::InvalidParameter(format!(
                        "feature {} has no valid line geometry",
                        f.id
                    ))
                    .into());
                }
            }
        }
        if lines.is_empty() {
            return Err(ActionError::context(format!(
                "Layer '{layer_name}' has no line features to scale"
            )));
        }

        let mode = settings.get_choice("default_scaling_mode", "individual");
        let form = scale_form(
            "Scale Line Layer",
            format!("Scale {} line(s) in layer '{layer_name}'", lines.len()),
            settings.get_f64("default_scale_factor", 1.0),
        )
        .choice(
            "mode",
            "Scale around",
            &mode,
            vec!["individual".to_string(), "layer".to_string()],
        );
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let factor = values.f64("factor").unwrap_or(1.0);
        let around_layer = values.text("mode").unwrap_or(&mode) == "layer";
        let scaled = scale_lines(&lines, factor, around_layer)?;

        if settings.get_bool("confirm_before_scale", true)
            && !env.notifier.confirm_action(
                "Scale Line Layer",
                &format!(
                    "Scale {} line(s) in layer '{layer_name}' by {factor}?",
                    scaled.len()
                ),
            )
        {
            return Ok(ActionOutcome::Cancelled);
        }

        let count = scaled.len();
        let completion = apply_layer_edit(env, layer_id, settings, |layer| {
            for (id, geometry) in scaled {
                layer.update_geometry(id, geometry)?;
            }
            Ok(())
        })?;
        let mut message = format!("{count} line(s) in layer '{layer_name}' scaled by {factor}");
        if skipped > 0 {
            message.push_str(&format!(" ({skipped} skipped)"));
        }
        report_success(
            env,
            settings,
            "Success",
            &format!("{message}{}", completion.note()),
        );
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_mode_scales_around_shared_pivot() {
        let lines = vec![
            (1, Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0)])),
            (2, Geometry::Line(vec![Point::new(8.0, 0.0), Point::new(10.0, 0.0)])),
        ];
        let individual = scale_lines(&lines, 2.0, false).unwrap();
        assert_eq!(
            individual[0].1,
            Geometry::Line(vec![Point::new(-1.0, 0.0), Point::new(3.0, 0.0)])
        );
        let shared = scale_lines(&lines, 2.0, true).unwrap();
        // 图层质心 (5, 0)
        assert_eq!(
            shared[0].1,
            Geometry::Line(vec![Point::new(-5.0, 0.0), Point::new(-1.0, 0.0)])
        );
    }
}
