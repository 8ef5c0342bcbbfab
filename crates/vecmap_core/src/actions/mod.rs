//! 内置动作，以及动作之间共用的小工具（定位目标、模板、编辑流程、派生图层输出）。

mod derived;
mod info;
mod layers;
mod move_feature;
mod rotate;
mod scale;
mod smooth;
mod snap;
mod zoom;

use std::fmt::Display;

use crate::action::MapAction;
use crate::capability::{CapabilityDeclaration, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::Crs;
use crate::edit::EditGuard;
use crate::error::{ActionError, MutationError};
use crate::geometry::{Geometry, GeometryCategory};
use crate::layer::{FeatureId, LayerId, MapLayer, VectorLayer};
use crate::locator::DetectedFeature;
use crate::project::Project;
use crate::settings::ActionSettings;

pub use derived::{
    ShowLineLayerSegmentLengths, ShowLineSegmentLengths, ShowPolygonAreaLayer,
    ShowPolygonLayerAngles, ShowPolygonLayerAreas, ShowPolygonLayerSideLengths,
};
pub use info::{MeasureDistance, SeeInfoPolygon};
pub use layers::{MergePolygonLayer, SplitPointLayerByAttribute, ToggleAllLayers};
pub use move_feature::{MoveByDistanceDirection, MovePointToCoordinates};
pub use rotate::RotateFeature;
pub use scale::{ScaleLine, ScaleLineLayer};
pub use smooth::SmoothPolygon;
pub use snap::SnapPoint;
pub use zoom::{ZoomToFeature, ZoomToLineLayer, ZoomToVisibleDataLayers};

/// 内置动作，顺序即菜单顺序。
pub fn builtin_actions() -> Vec<Box<dyn MapAction>> {
    vec![
        Box::new(MoveByDistanceDirection::point()),
        Box::new(MoveByDistanceDirection::polygon()),
        Box::new(MovePointToCoordinates),
        Box::new(RotateFeature::line()),
        Box::new(RotateFeature::polygon()),
        Box::new(ScaleLine),
        Box::new(ScaleLineLayer),
        Box::new(SmoothPolygon),
        Box::new(SnapPoint::to_line()),
        Box::new(SnapPoint::to_polygon()),
        Box::new(ZoomToFeature::point()),
        Box::new(ZoomToFeature::line()),
        Box::new(ZoomToFeature::polygon()),
        Box::new(ZoomToLineLayer),
        Box::new(SeeInfoPolygon),
        Box::new(ShowLineSegmentLengths),
        Box::new(ShowLineLayerSegmentLengths),
        Box::new(ShowPolygonAreaLayer),
        Box::new(ShowPolygonLayerAreas),
        Box::new(ShowPolygonLayerSideLengths),
        Box::new(ShowPolygonLayerAngles),
        Box::new(MergePolygonLayer),
        Box::new(SplitPointLayerByAttribute),
        Box::new(MeasureDistance),
        Box::new(ZoomToVisibleDataLayers),
        Box::new(ToggleAllLayers),
    ]
}

pub(crate) const POINT_TYPES: &[&str] = &["point", "multipoint"];
pub(crate) const LINE_TYPES: &[&str] = &["line", "multiline"];
pub(crate) const POLYGON_TYPES: &[&str] = &["polygon", "multipolygon"];

/// 把 `{name}` 占位符替换成对应的值；未知占位符保留原样。
pub(crate) fn format_template(template: &str, vars: &[(&str, &dyn Display)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), &value.to_string());
    }
    out
}

/// 已解析的目标要素（几何为图层 CRS 下的副本）。
pub(crate) struct FeatureTarget {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub layer_crs: Crs,
    pub feature_id: FeatureId,
    pub geometry: Geometry,
}

/// 在候选列表中找第一个符合类别的要素，并到工程中解析它。
pub(crate) fn resolve_feature(
    ctx: &ClickContext,
    project: &Project,
    accepts: fn(GeometryCategory) -> bool,
    noun: &str,
) -> Result<FeatureTarget, ActionError> {
    let detected = ctx
        .first_matching(accepts)
        .ok_or_else(|| ActionError::context(format!("No {noun} features found at this location")))?;
    let layer = resolve_layer(project, detected)?;
    let geometry = layer
        .feature(detected.feature_id)
        .and_then(|f| f.geometry.clone())
        .filter(|g| !g.is_empty())
        .ok_or_else(|| ActionError::context("Feature has no valid geometry"))?;
    Ok(FeatureTarget {
        layer_id: layer.id,
        layer_name: layer.name.clone(),
        layer_crs: layer.crs,
        feature_id: detected.feature_id,
        geometry,
    })
}

pub(crate) fn resolve_layer<'p>(
    project: &'p Project,
    detected: &DetectedFeature,
) -> Result<&'p VectorLayer, ActionError> {
    project
        .vector(detected.layer_id)
        .ok_or_else(|| ActionError::context(format!("Layer {} is no longer available", detected.layer_id)))
}

/// 图层作用域动作：点击处第一个符合类别的候选所在图层。
pub(crate) fn resolve_target_layer<'p>(
    ctx: &ClickContext,
    project: &'p Project,
    accepts: fn(GeometryCategory) -> bool,
    noun: &str,
) -> Result<&'p VectorLayer, ActionError> {
    let detected = ctx
        .first_matching(accepts)
        .ok_or_else(|| ActionError::context(format!("No {noun} layer found at this location")))?;
    resolve_layer(project, detected)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EditCompletion {
    Committed,
    /// 未自动提交，会话已交给用户。
    Pending,
}

impl EditCompletion {
    pub fn note(self) -> &'static str {
        match self {
            Self::Committed => "",
            Self::Pending => "\n\nChanges are pending in the layer's edit session.",
        }
    }
}

/// 所有修改图层的动作共用的编辑流程：
/// 进入会话 → 修改 → （失败则回滚） → 提交 → 提交失败时询问是否回滚 → 退出。
pub(crate) fn apply_layer_edit<F>(
    env: &mut ActionEnv<'_>,
    layer_id: LayerId,
    settings: &ActionSettings<'_>,
    mutate: F,
) -> Result<EditCompletion, ActionError>
where
    F: FnOnce(&mut VectorLayer) -> Result<(), MutationError>,
{
    let auto_commit = settings.get_bool("auto_commit_changes", true);
    let layer = env
        .project
        .vector_mut(layer_id)
        .ok_or_else(|| ActionError::context(format!("Layer {layer_id} is no longer available")))?;
    let layer_name = layer.name.clone();
    let mut guard = EditGuard::enter(layer)?;

    if let Err(err) = mutate(guard.layer_mut()) {
        guard.rollback();
        return Err(err.into());
    }

    if !auto_commit {
        guard.release_to_user();
        return Ok(EditCompletion::Pending);
    }

    match guard.commit() {
        Ok(()) => Ok(EditCompletion::Committed),
        Err(source) => {
            let roll_back = env.notifier.confirm_action(
                "Commit failed",
                &format!("{source}\n\nRoll back the changes made to layer '{layer_name}'?"),
            );
            if roll_back {
                guard.rollback();
            } else {
                guard.release_to_user();
            }
            Err(ActionError::Commit {
                source,
                rolled_back: roll_back,
            })
        }
    }
}

pub(crate) fn with_edit_settings(decl: CapabilityDeclaration) -> CapabilityDeclaration {
    decl.setting(
        "show_success_message",
        SettingSpec::bool(true, "Show Success Message"),
    )
    .setting(
        "auto_commit_changes",
        SettingSpec::bool(true, "Auto-commit Changes")
            .describe("Commit edits right away; otherwise leave them pending in the edit session"),
    )
}

pub(crate) fn with_copy_settings(decl: CapabilityDeclaration) -> CapabilityDeclaration {
    decl.setting(
        "default_copy_choice",
        SettingSpec::choice("ask", &["ask", "copy", "move"], "Default Copy Choice").describe(
            "\"ask\" shows a checkbox, \"copy\" always creates a copy, \"move\" always moves the original",
        ),
    )
}

pub(crate) fn with_output_settings(
    decl: CapabilityDeclaration,
    name_template: &str,
) -> CapabilityDeclaration {
    decl.setting(
        "layer_storage_type",
        SettingSpec::choice("temporary", &["temporary", "permanent"], "Layer Storage Type"),
    )
    .setting(
        "layer_name_template",
        SettingSpec::str(name_template, "Layer Name Template"),
    )
    .setting("decimal_places", SettingSpec::int(2, "Decimal Places").range(0.0, 10.0))
    .setting(
        "show_success_message",
        SettingSpec::bool(true, "Show Success Message"),
    )
}

/// 复制还是移动：`ask` 时由对话框里的勾选决定。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CopyChoice {
    Ask,
    Copy,
    Move,
}

impl CopyChoice {
    pub fn from_settings(settings: &ActionSettings<'_>) -> Self {
        match settings.get_choice("default_copy_choice", "ask").as_str() {
            "copy" => Self::Copy,
            "move" => Self::Move,
            _ => Self::Ask,
        }
    }

    /// 对话框复选框的初始值。
    pub fn checkbox_default(self) -> bool {
        self == Self::Copy
    }
}

/// 按 `show_success_message` 决定是否提示成功。
pub(crate) fn report_success(
    env: &mut ActionEnv<'_>,
    settings: &ActionSettings<'_>,
    title: &str,
    message: &str,
) {
    if settings.get_bool("show_success_message", true) {
        env.notifier.show_info(title, message);
    }
}

/// 派生图层：`permanent` 时先通过导出端口写出，然后放到工程最上层。
pub(crate) fn publish_layer(
    env: &mut ActionEnv<'_>,
    settings: &ActionSettings<'_>,
    layer: VectorLayer,
) -> Result<String, ActionError> {
    let storage = settings.get_choice("layer_storage_type", "temporary");
    let location = if storage == "permanent" {
        let exporter = env.exporter.as_deref_mut().ok_or_else(|| {
            ActionError::from(crate::error::ExportError {
                layer: layer.name.clone(),
                message: "no layer exporter is configured".to_string(),
            })
        })?;
        Some(exporter.export(&layer)?)
    } else {
        None
    };
    let name = layer.name.clone();
    env.project.insert_top(MapLayer::Vector(layer));
    env.refresh_canvas();
    Ok(match location {
        Some(path) => format!("Layer '{name}' saved to {path}"),
        None => format!("Temporary layer '{name}' added to the project"),
    })
}

pub(crate) fn round_to(value: f64, decimals: i64) -> f64 {
    let factor = 10f64.powi(decimals.clamp(0, 10) as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_placeholders_are_replaced() {
        let id: u64 = 7;
        let out = format_template(
            "Feature {feature_id} on '{layer_name}' {unknown}",
            &[("feature_id", &id), ("layer_name", &"roads")],
        );
        assert_eq!(out, "Feature 7 on 'roads' {unknown}");
    }

    #[test]
    fn builtin_actions_register_cleanly() {
        let mut registry = crate::registry::ActionRegistry::new();
        let errors = registry.register_all(builtin_actions());
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(registry.len(), builtin_actions().len());
    }

    #[test]
    fn rounding_honours_decimal_places() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
