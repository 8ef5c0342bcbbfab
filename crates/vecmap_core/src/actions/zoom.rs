use tracing::debug;

use crate::action::{ActionOutcome, MapAction};
use crate::capability::{CapabilityDeclaration, Scope, SettingSpec};
use crate::context::{ActionEnv, ClickContext};
use crate::crs::{Crs, CrsTransform};
use crate::error::ActionError;
use crate::geometry::{Extent, GeometryCategory};
use crate::settings::ActionSettings;

use super::{resolve_feature, resolve_target_layer, LINE_TYPES, POINT_TYPES, POLYGON_TYPES};

/// 零宽/零高范围（单点、水平线）放大到的最小边长，单位为画布地图单位。
const MIN_ZOOM_SIZE: f64 = 1.0;

fn buffer_setting(decl: CapabilityDeclaration) -> CapabilityDeclaration {
    decl.setting(
        "buffer_percentage",
        SettingSpec::float(10.0, "Buffer Percentage")
            .range(1.0, 50.0)
            .describe("Padding added on each side, as a percentage of the extent size"),
    )
}

/// 把 `source` CRS 下的范围缩放到画布上（转换到画布 CRS，加缓冲）。
fn zoom_to_extent(
    env: &mut ActionEnv<'_>,
    extent: Extent,
    source: Crs,
    buffer_fraction: f64,
) -> Result<Extent, ActionError> {
    let canvas = env.canvas()?;
    let view = canvas.view();
    let extent = CrsTransform::new(source, view.crs)?.extent(&extent)?;
    let target = extent.with_min_size(MIN_ZOOM_SIZE).buffered(buffer_fraction);
    canvas.set_extent(target);
    canvas.refresh();
    Ok(target)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ZoomKind {
    Point,
    Line,
    Polygon,
}

/// 缩放到单个点/线/面要素。
#[derive(Clone, Copy, Debug)]
pub struct ZoomToFeature {
    kind: ZoomKind,
}

impl ZoomToFeature {
    pub fn point() -> Self {
        Self {
            kind: ZoomKind::Point,
        }
    }

    pub fn line() -> Self {
        Self {
            kind: ZoomKind::Line,
        }
    }

    pub fn polygon() -> Self {
        Self {
            kind: ZoomKind::Polygon,
        }
    }
}

impl MapAction for ZoomToFeature {
    fn declaration(&self) -> CapabilityDeclaration {
        let (id, name, types) = match self.kind {
            ZoomKind::Point => ("zoom_to_point", "Zoom to Point", POINT_TYPES),
            ZoomKind::Line => ("zoom_to_line", "Zoom to Line", LINE_TYPES),
            ZoomKind::Polygon => ("zoom_to_polygon", "Zoom to Polygon", POLYGON_TYPES),
        };
        let decl = CapabilityDeclaration::new(id, Scope::Feature)
            .name(name)
            .category("Navigation")
            .description("Zoom the map to the clicked feature")
            .geometry_types(types);
        match self.kind {
            ZoomKind::Point => decl
                .setting(
                    "zoom_radius",
                    SettingSpec::float(400.0, "Zoom Radius").describe("Map units around the point"),
                )
                .setting(
                    "minimum_zoom_radius",
                    SettingSpec::float(50.0, "Minimum Zoom Radius").range(0.0, 1.0e9),
                )
                .setting(
                    "maximum_zoom_radius",
                    SettingSpec::float(5000.0, "Maximum Zoom Radius").range(0.0, 1.0e9),
                ),
            _ => buffer_setting(decl),
        }
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let accepts = match self.kind {
            ZoomKind::Point => GeometryCategory::is_puntal,
            ZoomKind::Line => GeometryCategory::is_linear,
            ZoomKind::Polygon => GeometryCategory::is_polygonal,
        };
        let noun = match self.kind {
            ZoomKind::Point => "point",
            ZoomKind::Line => "line",
            ZoomKind::Polygon => "polygon",
        };
        let target = resolve_feature(ctx, env.project, accepts, noun)?;

        if self.kind == ZoomKind::Point {
            let point = target
                .geometry
                .as_point()
                .ok_or_else(|| ActionError::context("Feature has invalid point geometry"))?;
            let min = settings.get_f64("minimum_zoom_radius", 50.0);
            let max = settings.get_f64("maximum_zoom_radius", 5000.0).max(min);
            let radius = settings.get_f64("zoom_radius", 400.0).clamp(min, max);
            let canvas = env.canvas()?;
            let canvas_crs = canvas.view().crs;
            let center = CrsTransform::new(target.layer_crs, canvas_crs)?.point(point)?;
            canvas.set_extent(Extent::around(center, radius, radius));
            canvas.refresh();
            return Ok(ActionOutcome::Completed);
        }

        let bounds = target
            .geometry
            .bounds()
            .ok_or_else(|| ActionError::context("Feature has no valid geometry"))?;
        let buffer = settings.get_f64("buffer_percentage", 10.0) / 100.0;
        zoom_to_extent(env, bounds, target.layer_crs, buffer)?;
        Ok(ActionOutcome::Completed)
    }
}

/// 缩放到整个线图层。
#[derive(Clone, Copy, Debug)]
pub struct ZoomToLineLayer;

impl MapAction for ZoomToLineLayer {
    fn declaration(&self) -> CapabilityDeclaration {
        buffer_setting(
            CapabilityDeclaration::new("zoom_to_line_layer", Scope::Layer)
                .name("Zoom to Line Layer")
                .category("Navigation")
                .description("Zoom the map to the full extent of the line layer")
                .geometry_types(LINE_TYPES),
        )
    }

    fn run(
        &self,
        ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let layer = resolve_target_layer(ctx, env.project, GeometryCategory::is_linear, "line")?;
        let crs = layer.crs;
        let extent = layer.extent().ok_or_else(|| {
            ActionError::context(format!("Layer '{}' has no features to zoom to", layer.name))
        })?;
        let buffer = settings.get_f64("buffer_percentage", 10.0) / 100.0;
        zoom_to_extent(env, extent, crs, buffer)?;
        Ok(ActionOutcome::Completed)
    }
}

/// 缩放到所有（可见）矢量图层的合并范围。
#[derive(Clone, Copy, Debug)]
pub struct ZoomToVisibleDataLayers;

impl MapAction for ZoomToVisibleDataLayers {
    fn declaration(&self) -> CapabilityDeclaration {
        buffer_setting(
            CapabilityDeclaration::new("zoom_to_visible_data_layers", Scope::Universal)
                .name("Zoom to Visible Data Layers")
                .category("Navigation")
                .description("Zoom to the combined extent of all visible vector layers"),
        )
        .setting(
            "include_invisible_layers",
            SettingSpec::bool(false, "Include Invisible Layers"),
        )
    }

    fn run(
        &self,
        _ctx: &ClickContext,
        env: &mut ActionEnv<'_>,
        settings: &ActionSettings<'_>,
    ) -> Result<ActionOutcome, ActionError> {
        let include_invisible = settings.get_bool("include_invisible_layers", false);
        let canvas_crs = env.canvas()?.view().crs;

        let mut combined: Option<Extent> = None;
        let mut used = 0usize;
        for layer in env.project.vector_layers() {
            if !layer.is_valid() || (!layer.visible && !include_invisible) {
                continue;
            }
            let Some(extent) = layer.extent() else {
                continue;
            };
            let extent = match CrsTransform::new(layer.crs, canvas_crs).and_then(|t| t.extent(&extent)) {
                Ok(e) => e,
                Err(err) => {
                    debug!(layer = %layer.name, %err, "layer left out of zoom extent");
                    continue;
                }
            };
            used += 1;
            combined = Some(match combined {
                Some(c) => c.union(&extent),
                None => extent,
            });
        }

        let Some(extent) = combined else {
            env.notifier.show_info(
                "Zoom to Visible Data Layers",
                "No visible vector layers with features to zoom to",
            );
            return Ok(ActionOutcome::Cancelled);
        };
        debug!(layers = used, "zooming to combined extent");
        let buffer = settings.get_f64("buffer_percentage", 10.0) / 100.0;
        zoom_to_extent(env, extent, canvas_crs, buffer)?;
        Ok(ActionOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CanvasState;
    use crate::geometry::Point;
    use crate::notify::AcceptDefaults;
    use crate::project::Project;
    use crate::settings::MemorySettings;
    use crate::notify::{NoticeLevel, Notifier};

    #[derive(Default)]
    struct Silent(Vec<NoticeLevel>);

    impl Notifier for Silent {
        fn show_info(&mut self, _: &str, _: &str) {
            self.0.push(NoticeLevel::Info);
        }
        fn show_warning(&mut self, _: &str, _: &str) {
            self.0.push(NoticeLevel::Warning);
        }
        fn show_error(&mut self, _: &str, _: &str) {
            self.0.push(NoticeLevel::Error);
        }
        fn confirm_action(&mut self, _: &str, _: &str) -> bool {
            true
        }
    }

    #[test]
    fn zoom_requires_canvas() {
        let mut project = Project::new();
        let mut notifier = Silent::default();
        let mut prompt = AcceptDefaults;
        let settings = MemorySettings::new();
        let mut env = ActionEnv::new(&mut project, &mut notifier, &mut prompt, &settings);
        let err = zoom_to_extent(&mut env, Extent::new(0.0, 0.0, 1.0, 1.0), Crs::WEB_MERCATOR, 0.1)
            .unwrap_err();
        assert_eq!(err.to_string(), "Map canvas not available");
    }

    #[test]
    fn degenerate_extent_gets_a_minimum_size() {
        let mut project = Project::new();
        let mut notifier = Silent::default();
        let mut prompt = AcceptDefaults;
        let settings = MemorySettings::new();
        let mut canvas = CanvasState::new(
            Crs::WEB_MERCATOR,
            Extent::new(0.0, 0.0, 100.0, 100.0),
            100.0,
            100.0,
        );
        let mut env = ActionEnv::new(&mut project, &mut notifier, &mut prompt, &settings)
            .with_canvas(&mut canvas);
        let target = zoom_to_extent(
            &mut env,
            Extent::around(Point::new(5.0, 5.0), 0.0, 0.0),
            Crs::WEB_MERCATOR,
            0.0,
        )
        .unwrap();
        assert!(target.width() >= MIN_ZOOM_SIZE);
        assert_eq!(canvas.requested_extent, Some(target));
    }
}
