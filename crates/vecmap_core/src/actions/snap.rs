use tracing::debug;

use crate::action::{ActionOutcome, MapAction};
use crate::algorithms::{nearest_point, NearestMethod, DEFAULT_NEAREST_SAMPLES};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::{Crs, CrsTransform};
use crate::error::ActionError;
use crate::geometry::{GeometryCategory, Point};
use crate::layer::{FeatureId, LayerId};
use crate::project::Project;
use crate::settings::ActionSettings;

use super::{
    apply_layer_edit, format_template, report_success, resolve_feature, with_edit_settings,
    POINT_TYPES,
};

/// 吸附到面时的落点。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonSnapTarget {
    Centroid,
    Boundary,
}

/// 目标搜索条件。
#[derive(Clone, Debug)]
pub struct SnapSearch<'a> {
    pub polygon: bool,
    pub polygon_target: PolygonSnapTarget,
    pub method: NearestMethod,
    pub include_invisible: bool,
    /// 排除这个图层（通常是点所在图层）。
    pub exclude_layer: Option<LayerId>,
    /// 图层名包含该子串（不区分大小写）；空串不过滤。
    pub name_filter: &'a str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnapCandidate {
    pub layer_id: LayerId,
    pub layer_name: String,
    pub feature_id: FeatureId,
    /// 吸附落点（点图层 CRS）。
    pub point: Point,
    pub distance: f64,
}

/// 在工程中找离 `origin`（`origin_crs` 下）最近的吸附目标。
/// 无法转换到 `origin_crs` 的图层或要素会被跳过。
pub fn find_snap_target(
    project: &Project,
    origin: Point,
    origin_crs: Crs,
    search: &SnapSearch<'_>,
) -> Option<SnapCandidate> {
    let filter = search.name_filter.trim().to_lowercase();
    let mut best: Option<SnapCandidate> = None;

    for layer in project.vector_layers() {
        let family_ok = if search.polygon {
            layer.geometry_type.is_polygonal()
        } else {
            layer.geometry_type.is_linear()
        };
        if !family_ok || !layer.is_valid() {
            continue;
        }
        if !layer.visible && !search.include_invisible {
            continue;
        }
        if search.exclude_layer == Some(layer.id) {
            continue;
        }
        if !filter.is_empty() && !layer.name.to_lowercase().contains(&filter) {
            continue;
        }
        let transform = match CrsTransform::new(layer.crs, origin_crs) {
            Ok(t) => t,
            Err(err) => {
                debug!(layer = %layer.name, %err, "snap target layer skipped");
                continue;
            }
        };

        for feature in layer.features() {
            let Some(geometry) = feature.geometry.as_ref().filter(|g| !g.is_empty()) else {
                continue;
            };
            let Ok(geometry) = transform.geometry(geometry) else {
                continue;
            };
            let point = if search.polygon && search.polygon_target == PolygonSnapTarget::Centroid {
                geometry.centroid()
            } else {
                let edge = if search.polygon {
                    geometry.boundary()
                } else {
                    Some(geometry)
                };
                edge.and_then(|g| nearest_point(&g, origin, search.method))
                    .map(|hit| hit.point)
            };
            let Some(point) = point else {
                continue;
            };
            let distance = origin.distance(point);
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(SnapCandidate {
                    layer_id: layer.id,
                    layer_name: layer.name.clone(),
                    feature_id: feature.id,
                    point,
                    distance,
                });
            }
        }
    }
    best
}

/// 把点吸附到最近的线/面。
#[derive(Clone, Copy, Debug)]
pub struct SnapPoint {
    polygon: bool,
}

impl SnapPoint {
    pub fn to_line() -> Self {
        Self { polygon: false }
    }

    pub fn to_polygon() -> Self {
        Self { polygon: true }
    }

    fn noun(&self) -> &'static str {
        if self.polygon { "polygon" } else { "line" }
    }

    fn default_template(&self) -> &'static str {
        if self.polygon {
            "Point snapped to polygon successfully. Distance moved: {distance_moved} map units"
        } else {
            "Point snapped to line successfully. Distance moved: {distance_moved} map units"
        }
    }
}

impl MapAction for SnapPoint {
    fn declaration(&self) -> CapabilityDeclaration {
        let (id, name, filter) = if self.polygon {
            ("snap_point_to_polygon", "Snap Point to Polygon", "polygon_layer_name_filter")
        } else {
            ("snap_point_to_line", "Snap Point to Line", "line_layer_name_filter")
        };
        let include = if self.polygon {
            "include_invisible_polygon_layers"
        } else {
            "include_invisible_line_layers"
        };
        let mut decl = CapabilityDeclaration::new(id, Scope::Feature)
            .name(name)
            .category("Editing")
            .description(&format!("Move the point onto the nearest {} feature", self.noun()))
            .geometry_types(POINT_TYPES)
            .setting("confirm_snap", SettingSpec::bool(true, "Confirm Before Snapping"))
            .setting(
                "maximum_snap_distance",
                SettingSpec::float(1000.0, "Maximum Snap Distance")
                    .range(0.0, 1.0e9)
                    .describe("Targets farther than this (map units of the point layer) are ignored"),
            )
            .setting(include, SettingSpec::bool(false, "Include Invisible Layers"))
            .setting(
                "exclude_current_layer",
                SettingSpec::bool(true, "Exclude Current Layer"),
            )
            .setting(filter, SettingSpec::str("", "Layer Name Filter"))
            .setting("decimal_places", SettingSpec::int(2, "Decimal Places").range(0.0, 10.0))
            .setting(
                "snap_method",
                SettingSpec::choice("sampled", &["sampled", "exact"], "Nearest Point Method")
                    .describe("sampled: nearest of evenly spaced samples along the target; exact: true closest point"),
            )
            .setting(
                "success_message_template",
                SettingSpec::str(self.default_template(), "Success Message Template"),
            );
        if self.polygon {
            decl = decl.setting(
                "snap_target",
                SettingSpec::choice("centroid", &["centroid", "boundary"], "Snap Target"),
            );
        }
        with_edit_settings(decl)
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let target = resolve_feature(ctx, env.project, GeometryCategory::is_puntal, "point")?;
        let origin = target
            .geometry
            .as_point()
            .ok_or_else(|| ActionError::context("Feature has invalid point geometry"))?;

        let (include_key, filter_key) = if self.polygon {
            ("include_invisible_polygon_layers", "polygon_layer_name_filter")
        } else {
            ("include_invisible_line_layers", "line_layer_name_filter")
        };
        let method = match settings.get_choice("snap_method", "sampled").as_str() {
            "exact" => NearestMethod::Exact,
            _ => NearestMethod::Sampled {
                samples: DEFAULT_NEAREST_SAMPLES,
            },
        };
        let polygon_target = match settings.get_choice("snap_target", "centroid").as_str() {
            "boundary" => PolygonSnapTarget::Boundary,
            _ => PolygonSnapTarget::Centroid,
        };
        let filter = settings.get_string(filter_key, "");
        let search = SnapSearch {
            polygon: self.polygon,
            polygon_target,
            method,
            include_invisible: settings.get_bool(include_key, false),
            exclude_layer: settings
                .get_bool("exclude_current_layer", true)
                .then_some(target.layer_id),
            name_filter: &filter,
        };

        let Some(candidate) = find_snap_target(env.project, origin, target.layer_crs, &search)
        else {
            return Err(ActionError::context(format!(
                "No {} features found to snap to",
                self.noun()
            )));
        };
        let max_distance = settings.get_f64("maximum_snap_distance", 1000.0);
        let decimals = settings.get_i64("decimal_places", 2).clamp(0, 10) as usize;
        let distance_text = format!("{:.*}", decimals, candidate.distance);
        if candidate.distance > max_distance {
            return Err(ActionError::context(format!(
                "Nearest {} is {distance_text} map units away, beyond the maximum snap distance of {max_distance}",
                self.noun()
            )));
        }

        if settings.get_bool("confirm_snap", true) {
            let question = format!(
                "Snap point feature ID {} to {} feature ID {} in layer '{}'?\n\nDistance: {distance_text} map units",
                target.feature_id,
                self.noun(),
                candidate.feature_id,
                candidate.layer_name
            );
            let title = if self.polygon { "Snap Point to Polygon" } else { "Snap Point to Line" };
            if !env.notifier.confirm_action(title, &question) {
                return Ok(ActionOutcome::Cancelled);
            }
        }

        let moved = target
            .geometry
            .translated(candidate.point.x - origin.x, candidate.point.y - origin.y);
        let feature_id = target.feature_id;
        let completion = apply_layer_edit(env, target.layer_id, settings, |layer| {
            layer.update_geometry(feature_id, moved)
        })?;
        let message = format_template(
            &settings.get_string("success_message_template", self.default_template()),
            &[
                ("distance_moved", &distance_text),
                ("feature_id", &feature_id),
                ("target_layer", &candidate.layer_name),
                ("target_feature_id", &candidate.feature_id),
            ],
        );
        report_success(env, settings, "Success", &format!("{message}{}", completion.note()));
        env.refresh_canvas();
        Ok(ActionOutcome::Completed)
    }
}
