use indexmap::IndexMap;
use tracing::debug;

use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::CrsTransform;
use crate::error::ActionError;
use crate::geometry::GeometryCategory;
use crate::layer::{AttributeValue, Field, FieldKind, VectorLayer};
use crate::notify::DialogForm;
use crate::settings::ActionSettings;

use super::{
    format_template, publish_layer, report_success, resolve_target_layer, with_output_settings,
    POINT_TYPES, POLYGON_TYPES,
};

/// 合并工程中所有有效面图层到一个新图层，记录来源图层名。
#[derive(Clone, Copy, Debug)]
pub struct MergePolygonLayer;

impl MapAction for MergePolygonLayer {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("merge_polygon_layer", Scope::Layer)
                .name("Merge Polygon Layers")
                .category("Layers")
                .description("Merge every polygon layer in the project into one new layer")
                .geometry_types(POLYGON_TYPES),
            "merged_{layer_count}_layers",
        )
        .setting(
            "include_invisible_layers",
            SettingSpec::bool(true, "Include Invisible Layers"),
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let clicked = resolve_target_layer(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let crs = clicked.crs;
        let include_invisible = settings.get_bool("include_invisible_layers", true);

        let mut fields: Vec<Field> = Vec::new();
        let mut rows = Vec::new();
        let mut multi = false;
        let mut merged_layers = 0usize;
        for layer in env.project.vector_layers() {
            if !layer.geometry_type.is_polygonal() || !layer.is_valid() {
                continue;
            }
            if !layer.visible && !include_invisible {
                continue;
            }
            let Ok(transform) = CrsTransform::new(layer.crs, crs) else {
                debug!(layer = %layer.name, "polygon layer left out of merge");
                continue;
            };
            merged_layers += 1;
            for field in &layer.fields {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field.clone());
                }
            }
            for feature in layer.features() {
                let Some(geometry) = feature.geometry.as_ref() else {
                    continue;
                };
                let Ok(geometry) = transform.geometry(geometry) else {
                    continue;
                };
                multi |= geometry.category() == GeometryCategory::MultiPolygon;
                let mut attributes = feature.attributes.clone();
                attributes.insert(
                    "source_layer".to_string(),
                    AttributeValue::Text(layer.name.clone()),
                );
                rows.push((geometry, attributes));
            }
        }
        if merged_layers < 2 {
            return Err(ActionError::context(
                "At least two polygon layers are needed to merge",
            ));
        }
        fields.push(Field::new("source_layer", FieldKind::Text));

        let template = settings.get_string("layer_name_template", "merged_{layer_count}_layers");
        let name = env
            .project
            .unique_layer_name(&format_template(&template, &[("layer_count", &merged_layers)]));
        let geometry_type = if multi {
            GeometryCategory::MultiPolygon
        } else {
            GeometryCategory::Polygon
        };
        let mut layer = VectorLayer::new(env.project.allocate_layer_id(), name, geometry_type, crs)
            .with_fields(fields);
        let count = rows.len();
        for (geometry, attributes) in rows {
            layer.add_committed(Some(geometry), attributes);
        }
        let location = publish_layer(env, settings, layer)?;
        report_success(
            env,
            settings,
            "Success",
            &format!("Merged {merged_layers} polygon layers ({count} features)\n\n{location}"),
        );
        Ok(ActionOutcome::Completed)
    }
}

/// 拆分时不提供的内部字段。
const RESERVED_FIELDS: &[&str] = &["fid", "id", "geometry"];

/// 按属性值把点图层拆成多个图层。
#[derive(Clone, Copy, Debug)]
pub struct SplitPointLayerByAttribute;

impl MapAction for SplitPointLayerByAttribute {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("split_point_layer_by_attribute", Scope::Layer)
                .name("Split Point Layer by Attribute")
                .category("Layers")
                .description("Create one point layer per distinct value of an attribute")
                .geometry_types(POINT_TYPES),
            "{original_layer_name}_{attribute_value}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let source = resolve_target_layer(ctx, env.project, GeometryCategory::is_puntal, "point")?;
        let options: Vec<String> = source
            .fields
            .iter()
            .map(|f| f.name.clone())
            .filter(|n| !RESERVED_FIELDS.contains(&n.to_lowercase().as_str()))
            .collect();
        let Some(first) = options.first().cloned() else {
            return Err(ActionError::context(format!(
                "Layer '{}' has no attribute fields to split by",
                source.name
            )));
        };

        let form = DialogForm::new("Split Point Layer by Attribute")
            .message(format!(
                "Split layer '{}' ({} features) by:",
                source.name,
                source.feature_count()
            ))
            .choice("field", "Attribute", &first, options.clone());
        let Some(values) = env.prompt.request(&form) else {
            return Ok(ActionOutcome::Cancelled);
        };
        let field = values.text("field").unwrap_or(&first).to_string();
        if !options.contains(&field) {
            return Err(ActionError::context(format!("Unknown attribute '{field}'")));
        }

        // 保持首次出现的顺序
        let mut groups: IndexMap<String, Vec<_>> = IndexMap::new();
        for feature in source.features() {
            let key = feature
                .attribute(&field)
                .cloned()
                .unwrap_or_default()
                .to_string();
            groups.entry(key).or_default().push(feature.clone());
        }
        let (source_name, crs, geometry_type, fields) = (
            source.name.clone(),
            source.crs,
            source.geometry_type,
            source.fields.clone(),
        );

        let template =
            settings.get_string("layer_name_template", "{original_layer_name}_{attribute_value}");
        let mut created = Vec::with_capacity(groups.len());
        for (value, features) in groups {
            let name = env.project.unique_layer_name(&format_template(
                &template,
                &[
                    ("original_layer_name", &source_name),
                    ("attribute_value", &value),
                    ("field_name", &field),
                ],
            ));
            let mut layer = VectorLayer::new(env.project.allocate_layer_id(), name, geometry_type, crs)
                .with_fields(fields.clone());
            for feature in features {
                layer.add_committed(feature.geometry, feature.attributes);
            }
            created.push(publish_layer(env, settings, layer)?);
        }

        report_success(
            env,
            settings,
            "Success",
            &format!(
                "Layer '{source_name}' split by '{field}' into {} layer(s):\n\n{}",
                created.len(),
                created.join("\n")
            ),
        );
        Ok(ActionOutcome::Completed)
    }
}

/// 一键显示/隐藏全部图层：有可见的就全部隐藏，否则全部显示。
#[derive(Clone, Copy, Debug)]
pub struct ToggleAllLayers;

impl MapAction for ToggleAllLayers {
    fn declaration(&self) -> CapabilityDeclaration {
        CapabilityDeclaration::new("toggle_all_layers", Scope::Universal)
            .name("Toggle All Layers")
            .category("Layers")
            .description("Hide all layers if any is visible, otherwise show them all")
            .setting(
                "include_basemap_layers",
                SettingSpec::bool(true, "Include Basemap Layers"),
            )
            .setting("show_info_message", SettingSpec::bool(false, "Show Info Message"))
    }

    fn run(
        &self,
        _ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let include_basemap = settings.get_bool("include_basemap_layers", true);
        let in_scope = |l: &crate::layer::MapLayer| include_basemap || !l.is_basemap();

        let any_visible = env
            .project
            .layers()
            .iter()
            .filter(|l| in_scope(*l))
            .any(|l| l.is_visible());
        let target = !any_visible;
        let mut changed = 0usize;
        for layer in env.project.layers_mut() {
            if in_scope(&*layer) && layer.is_visible() != target {
                layer.set_visible(target);
                changed += 1;
            }
        }
        if changed == 0 {
            return Ok(ActionOutcome::Completed);
        }
        env.refresh_canvas();
        if settings.get_bool("show_info_message", false) {
            let verb = if target { "shown" } else { "hidden" };
            env.notifier
                .show_info("Toggle All Layers", &format!("{changed} layer(s) {verb}"));
        }
        Ok(ActionOutcome::Completed)
    }
}
