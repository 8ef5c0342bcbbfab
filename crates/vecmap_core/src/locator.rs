//! 要素定位：找出点击点附近（容差内）的矢量要素，并按距离排序。
//!
//! - 无效图层和非矢量图层直接跳过。
//! - 图层 CRS 与画布不同时，先把要素几何转换到画布 CRS 再量距离。
//! - 面图层：点击点落在面内，距离为 0；否则为到边界的距离。
//! - 排序：距离升序 → 图层绘制顺序（上层优先） → 要素 id。
//! - 只读，不修改任何图层。

use std::cmp::Ordering;

use tracing::{trace, warn};

use crate::crs::{Crs, CrsTransform};
use crate::geometry::{GeometryCategory, Point};
use crate::layer::{FeatureId, LayerId, MapLayer};
use crate::project::Project;

/// 一个候选要素。`feature_id` 是句柄，执行时再到工程里解析。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectedFeature {
    pub layer_id: LayerId,
    pub feature_id: FeatureId,
    pub geometry_type: GeometryCategory,
    pub distance: f64,
    /// 图层在工程中的绘制顺序（0 = 最上层）。
    pub draw_index: usize,
}

pub fn locate(
    click_point: Point,
    project: &Project,
    canvas_crs: Crs,
    tolerance: f64,
) -> Vec<DetectedFeature> {
    // NaN/负数视为 0
    let tolerance = if tolerance.is_nan() { 0.0 } else { tolerance.max(0.0) };
    let mut hits = Vec::new();

    for (draw_index, layer) in project.layers().iter().enumerate() {
        let MapLayer::Vector(layer) = layer else {
            trace!(layer = layer.name(), "skipping non-vector layer");
            continue;
        };
        if !layer.is_valid() {
            trace!(layer = %layer.name, "skipping invalid layer");
            continue;
        }
        let transform = match CrsTransform::new(layer.crs, canvas_crs) {
            Ok(t) => t,
            Err(err) => {
                warn!(layer = %layer.name, %err, "layer skipped by locator");
                continue;
            }
        };
        let category = layer.geometry_type;

        for feature in layer.features() {
            let Some(geometry) = feature.geometry.as_ref() else {
                continue;
            };
            let geometry = match transform.geometry(geometry) {
                Ok(g) => g,
                Err(err) => {
                    trace!(layer = %layer.name, feature = feature.id, %err, "feature not transformable");
                    continue;
                }
            };
            let distance = if category.is_polygonal() && geometry.contains(click_point) {
                0.0
            } else {
                match geometry.distance_to(click_point) {
                    Some(d) => d,
                    None => continue,
                }
            };
            if distance <= tolerance {
                hits.push(DetectedFeature {
                    layer_id: layer.id,
                    feature_id: feature.id,
                    geometry_type: category,
                    distance,
                    draw_index,
                });
            }
        }
    }

    hits.sort_by(compare_candidates);
    hits
}

fn compare_candidates(a: &DetectedFeature, b: &DetectedFeature) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.draw_index.cmp(&b.draw_index))
        .then(a.feature_id.cmp(&b.feature_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use crate::layer::{Attributes, RasterLayer, VectorLayer};

    fn project_with(layers: Vec<VectorLayer>) -> Project {
        let mut p = Project::new();
        for l in layers {
            p.push_vector(l);
        }
        p
    }

    fn points(id: u32, coords: &[(f64, f64)]) -> VectorLayer {
        let mut layer = VectorLayer::new(
            LayerId(id),
            format!("points{id}"),
            GeometryCategory::Point,
            Crs::WEB_MERCATOR,
        );
        for (x, y) in coords {
            layer.add_committed(Some(Geometry::Point(Point::new(*x, *y))), Attributes::new());
        }
        layer
    }

    #[test]
    fn results_are_sorted_by_distance_then_draw_order() {
        let top = points(1, &[(3.0, 0.0), (1.0, 0.0)]);
        let bottom = points(2, &[(1.0, 0.0)]);
        let project = project_with(vec![top, bottom]);
        let hits = locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, 5.0);
        let order: Vec<(LayerId, FeatureId)> =
            hits.iter().map(|h| (h.layer_id, h.feature_id)).collect();
        assert_eq!(
            order,
            vec![(LayerId(1), 2), (LayerId(2), 1), (LayerId(1), 1)]
        );
    }

    #[test]
    fn invalid_and_raster_layers_are_skipped() {
        let mut broken = points(1, &[(0.0, 0.0)]);
        broken.set_valid(false);
        let mut project = project_with(vec![broken]);
        project.push_raster(RasterLayer {
            id: LayerId(9),
            name: "basemap".into(),
            visible: true,
            basemap: true,
        });
        assert!(locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, 5.0).is_empty());
    }

    #[test]
    fn nan_tolerance_only_matches_exact_hits() {
        let project = project_with(vec![points(1, &[(0.0, 0.0), (0.5, 0.0)])]);
        let hits = locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, f64::NAN);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn geographic_layers_are_measured_in_canvas_units() {
        let mut layer = VectorLayer::new(LayerId(1), "wgs", GeometryCategory::Point, Crs::WGS84);
        layer.add_committed(Some(Geometry::Point(Point::new(0.0, 0.0))), Attributes::new());
        let project = project_with(vec![layer]);
        // 3857 下原点附近 3 米
        let hits = locate(Point::new(3.0, 4.0), &project, Crs::WEB_MERCATOR, 5.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 5.0).abs() < 1e-6);
    }

    #[test]
    fn untransformable_layers_are_skipped() {
        let mut layer = VectorLayer::new(
            LayerId(1),
            "local",
            GeometryCategory::Point,
            Crs::projected(2154, crate::crs::MapUnits::Meters),
        );
        layer.add_committed(Some(Geometry::Point(Point::new(0.0, 0.0))), Attributes::new());
        let project = project_with(vec![layer]);
        assert!(locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, 5.0).is_empty());
    }
}
