//! 派生图层：把量测结果（线段长度、面积、内角）写成新的点/面图层。

use std::fmt::Display;

use crate::action::{ActionOutcome, MapAction};
use crate::algorithms::{polygon_angles, segment_lengths};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::Crs;
use crate::error::ActionError;
use crate::geometry::{Geometry, GeometryCategory};
use crate::layer::{AttributeValue, Attributes, Field, FieldKind, VectorLayer};
use crate::settings::ActionSettings;

use super::{
    format_template, publish_layer, report_success, resolve_feature, resolve_target_layer,
    round_to, with_output_settings, LINE_TYPES, POLYGON_TYPES,
};

/// 一行输出：几何 + 属性。
type Row = (Geometry, Attributes);

fn attrs<const N: usize>(values: [(&str, AttributeValue); N]) -> Attributes {
    values
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// 按模板命名、建图层、写入行并发布。
#[allow(clippy::too_many_arguments)]
fn emit_layer(
    env: &mut ActionEnv<'_>,
    settings: &ActionSettings<'_>,
    default_template: &str,
    vars: &[(&str, &dyn Display)],
    geometry_type: GeometryCategory,
    crs: Crs,
    fields: Vec<Field>,
    rows: Vec<Row>,
) -> Result<ActionOutcome, ActionError> {
    if rows.is_empty() {
        return Err(ActionError::context("Nothing to measure: no valid geometries found"));
    }
    let template = settings.get_string("layer_name_template", default_template);
    let name = env
        .project
        .unique_layer_name(&format_template(&template, vars));
    let id = env.project.allocate_layer_id();
    let mut layer = VectorLayer::new(id, name, geometry_type, crs).with_fields(fields);
    let count = rows.len();
    for (geometry, attributes) in rows {
        layer.add_committed(Some(geometry), attributes);
    }
    let location = publish_layer(env, settings, layer)?;
    report_success(
        env,
        settings,
        "Success",
        &format!("{location} with {count} feature(s)"),
    );
    Ok(ActionOutcome::Completed)
}

fn segment_rows(geometry: &Geometry, feature_id: u64, decimals: i64, label: &str) -> Vec<Row> {
    segment_lengths(geometry)
        .into_iter()
        .map(|s| {
            (
                Geometry::Point(s.midpoint),
                attrs([
                    ("feature_id", AttributeValue::Int(feature_id as i64)),
                    (label, AttributeValue::Int(s.index as i64)),
                    ("length", AttributeValue::Float(round_to(s.length, decimals))),
                ]),
            )
        })
        .collect()
}

fn segment_fields(label: &str) -> Vec<Field> {
    vec![
        Field::new("feature_id", FieldKind::Int),
        Field::new(label, FieldKind::Int),
        Field::new("length", FieldKind::Float),
    ]
}

/// 单条线各线段的长度（标注在线段中点）。
#[derive(Clone, Copy, Debug)]
pub struct ShowLineSegmentLengths;

impl MapAction for ShowLineSegmentLengths {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_line_segment_lengths", Scope::Feature)
                .name("Show Line Segment Lengths")
                .category("Analysis")
                .description("Create a point layer labelling each segment of the line with its length")
                .geometry_types(LINE_TYPES),
            "Segment Lengths_{feature_id}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_linear, "line")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let rows = segment_rows(&target.geometry, target.feature_id, decimals, "segment");
        emit_layer(
            env,
            settings,
            "Segment Lengths_{feature_id}",
            &[
                ("feature_id", &target.feature_id),
                ("source_layer", &target.layer_name),
            ],
            GeometryCategory::Point,
            target.layer_crs,
            segment_fields("segment"),
            rows,
        )
    }
}

/// 整个线图层各线段的长度。
#[derive(Clone, Copy, Debug)]
pub struct ShowLineLayerSegmentLengths;

impl MapAction for ShowLineLayerSegmentLengths {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_line_layer_segment_lengths", Scope::Layer)
                .name("Show Line Layer Segment Lengths")
                .category("Analysis")
                .description("Create a point layer labelling every segment in the line layer with its length")
                .geometry_types(LINE_TYPES),
            "Segment Lengths_{source_layer}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_linear, "line")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let rows: Vec<Row> = layer
            .features()
            .filter_map(|f| f.geometry.as_ref().map(|g| (f.id, g)))
            .flat_map(|(id, g)| segment_rows(g, id, decimals, "segment"))
            .collect();
        let (name, crs) = (layer.name.clone(), layer.crs);
        emit_layer(
            env,
            settings,
            "Segment Lengths_{source_layer}",
            &[("source_layer", &name)],
            GeometryCategory::Point,
            crs,
            segment_fields("segment"),
            rows,
        )
    }
}

/// 单个面复制为新图层，附面积与周长。
#[derive(Clone, Copy, Debug)]
pub struct ShowPolygonAreaLayer;

impl MapAction for ShowPolygonAreaLayer {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_polygon_area_layer", Scope::Feature)
                .name("Show Polygon Area Layer")
                .category("Analysis")
                .description("Copy the polygon into a new layer carrying its area and perimeter")
                .geometry_types(POLYGON_TYPES),
            "Polygon Area_{feature_id}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let row = (
            target.geometry.clone(),
            attrs([
                ("feature_id", AttributeValue::Int(target.feature_id as i64)),
                ("area", AttributeValue::Float(round_to(target.geometry.area(), decimals))),
                (
                    "perimeter",
                    AttributeValue::Float(round_to(target.geometry.length(), decimals)),
                ),
            ]),
        );
        emit_layer(
            env,
            settings,
            "Polygon Area_{feature_id}",
            &[
                ("feature_id", &target.feature_id),
                ("source_layer", &target.layer_name),
            ],
            target.geometry.category(),
            target.layer_crs,
            vec![
                Field::new("feature_id", FieldKind::Int),
                Field::new("area", FieldKind::Float),
                Field::new("perimeter", FieldKind::Float),
            ],
            vec![row],
        )
    }
}

/// 面图层各要素的面积（标注在质心）。
#[derive(Clone, Copy, Debug)]
pub struct ShowPolygonLayerAreas;

impl MapAction for ShowPolygonLayerAreas {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_polygon_layer_areas", Scope::Layer)
                .name("Show Polygon Layer Areas")
                .category("Analysis")
                .description("Create a point layer with the area of every polygon at its centroid")
                .geometry_types(POLYGON_TYPES),
            "Polygon Areas_{source_layer}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let rows: Vec<Row> = layer
            .features()
            .filter_map(|f| {
                let g = f.geometry.as_ref()?;
                let c = g.centroid()?;
                Some((
                    Geometry::Point(c),
                    attrs([
                        ("feature_id", AttributeValue::Int(f.id as i64)),
                        ("area", AttributeValue::Float(round_to(g.area(), decimals))),
                    ]),
                ))
            })
            .collect();
        let (name, crs) = (layer.name.clone(), layer.crs);
        emit_layer(
            env,
            settings,
            "Polygon Areas_{source_layer}",
            &[("source_layer", &name)],
            GeometryCategory::Point,
            crs,
            vec![
                Field::new("feature_id", FieldKind::Int),
                Field::new("area", FieldKind::Float),
            ],
            rows,
        )
    }
}

/// 面图层各边的边长（标注在边中点）。
#[derive(Clone, Copy, Debug)]
pub struct ShowPolygonLayerSideLengths;

impl MapAction for ShowPolygonLayerSideLengths {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_polygon_layer_side_lengths", Scope::Layer)
                .name("Show Polygon Layer Side Lengths")
                .category("Analysis")
                .description("Create a point layer labelling every polygon side with its length")
                .geometry_types(POLYGON_TYPES),
            "Side Lengths_{source_layer}",
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let rows: Vec<Row> = layer
            .features()
            .filter_map(|f| f.geometry.as_ref().map(|g| (f.id, g)))
            .flat_map(|(id, g)| segment_rows(g, id, decimals, "side"))
            .collect();
        let (name, crs) = (layer.name.clone(), layer.crs);
        emit_layer(
            env,
            settings,
            "Side Lengths_{source_layer}",
            &[("source_layer", &name)],
            GeometryCategory::Point,
            crs,
            segment_fields("side"),
            rows,
        )
    }
}

/// 面图层各顶点的内角。
#[derive(Clone, Copy, Debug)]
pub struct ShowPolygonLayerAngles;

impl MapAction for ShowPolygonLayerAngles {
    fn declaration(&self) -> CapabilityDeclaration {
        with_output_settings(
            CapabilityDeclaration::new("show_polygon_layer_angles", Scope::Layer)
                .name("Show Polygon Layer Angles")
                .category("Analysis")
                .description("Create a point layer with the interior angle at every polygon vertex")
                .geometry_types(POLYGON_TYPES),
            "Polygon Layer Angles",
        )
        .setting(
            "angle_unit",
            SettingSpec::choice("degrees", &["degrees", "radians"], "Angle Unit"),
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_polygonal, "polygon")?;
        let decimals = settings.get_i64("decimal_places", 2);
        let degrees = settings.get_choice("angle_unit", "degrees") == "degrees";
        let rows: Vec<Row> = layer
            .features()
            .filter_map(|f| f.geometry.as_ref().map(|g| (f.id, g)))
            .flat_map(|(id, g)| {
                polygon_angles(g).into_iter().map(move |a| {
                    let value = if degrees { a.radians.to_degrees() } else { a.radians };
                    (
                        Geometry::Point(a.vertex),
                        attrs([
                            ("feature_id", AttributeValue::Int(id as i64)),
                            ("vertex", AttributeValue::Int(a.index as i64)),
                            ("angle", AttributeValue::Float(round_to(value, decimals))),
                        ]),
                    )
                })
            })
            .collect();
        let (name, crs) = (layer.name.clone(), layer.crs);
        emit_layer(
            env,
            settings,
            "Polygon Layer Angles",
            &[("source_layer", &name)],
            GeometryCategory::Point,
            crs,
            vec![
                Field::new("feature_id", FieldKind::Int),
                Field::new("vertex", FieldKind::Int),
                Field::new("angle", FieldKind::Float),
            ],
            rows,
        )
    }
}
