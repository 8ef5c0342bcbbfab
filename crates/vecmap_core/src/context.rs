//! 点击上下文、画布端口、动作运行环境与图层导出端口。

use crate::crs::Crs;
use crate::error::{ActionError, ExportError};
use crate::geometry::{Extent, GeometryCategory, Point};
use crate::layer::VectorLayer;
use crate::locator::DetectedFeature;
use crate::notify::{Notifier, Prompt};
use crate::project::Project;
use crate::settings::{SettingsStore, DEFAULT_NAMESPACE};

/// 画布状态快照。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasView {
    pub crs: Crs,
    pub extent: Extent,
    pub map_units_per_pixel: f64,
}

pub trait MapCanvas {
    fn view(&self) -> CanvasView;

    fn set_extent(&mut self, extent: Extent);

    fn refresh(&mut self);
}

/// 纯内存画布：记录请求的范围与刷新次数，宿主程序再据此同步相机。
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasState {
    pub crs: Crs,
    pub extent: Extent,
    pub width_px: f64,
    pub height_px: f64,
    /// 动作请求过的新范围（宿主读取后清空）。
    pub requested_extent: Option<Extent>,
    pub refreshes: usize,
}

impl CanvasState {
    pub fn new(crs: Crs, extent: Extent, width_px: f64, height_px: f64) -> Self {
        Self {
            crs,
            extent,
            width_px: width_px.max(1.0),
            height_px: height_px.max(1.0),
            requested_extent: None,
            refreshes: 0,
        }
    }

    pub fn map_units_per_pixel(&self) -> f64 {
        (self.extent.width() / self.width_px).max(self.extent.height() / self.height_px)
    }

    pub fn take_requested_extent(&mut self) -> Option<Extent> {
        self.requested_extent.take()
    }
}

impl MapCanvas for CanvasState {
    fn view(&self) -> CanvasView {
        CanvasView {
            crs: self.crs,
            extent: self.extent,
            map_units_per_pixel: self.map_units_per_pixel(),
        }
    }

    fn set_extent(&mut self, extent: Extent) {
        if !extent.is_valid() {
            return;
        }
        self.extent = extent;
        self.requested_extent = Some(extent);
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

/// 一次右键交互的上下文，只交给一个动作使用。
#[derive(Clone, Debug, PartialEq)]
pub struct ClickContext {
    pub click_point: Point,
    pub canvas: Option<CanvasView>,
    pub detected_features: Vec<DetectedFeature>,
}

impl ClickContext {
    pub fn new(
        click_point: Point,
        canvas: Option<CanvasView>,
        detected_features: Vec<DetectedFeature>,
    ) -> Result<Self, ActionError> {
        if !click_point.is_finite() {
            return Err(ActionError::context("Click location is not a valid map coordinate"));
        }
        Ok(Self {
            click_point,
            canvas,
            detected_features,
        })
    }

    pub fn closest(&self) -> Option<&DetectedFeature> {
        self.detected_features.first()
    }

    /// 第一个（最近的）属于给定类别之一的候选。
    pub fn first_matching(&self, accepts: impl Fn(GeometryCategory) -> bool) -> Option<&DetectedFeature> {
        self.detected_features
            .iter()
            .find(|d| accepts(d.geometry_type))
    }

    pub fn canvas_crs(&self) -> Option<Crs> {
        self.canvas.map(|c| c.crs)
    }
}

/// 把派生图层写到持久存储，返回位置描述（路径等）。
pub trait LayerExporter {
    fn export(&mut self, layer: &VectorLayer) -> Result<String, ExportError>;
}

/// 动作运行时能访问的一切。
pub struct ActionEnv<'a> {
    pub project: &'a mut Project,
    pub canvas: Option<&'a mut dyn MapCanvas>,
    pub notifier: &'a mut dyn Notifier,
    pub prompt: &'a mut dyn Prompt,
    pub settings: &'a dyn SettingsStore,
    pub exporter: Option<&'a mut dyn LayerExporter>,
    pub namespace: &'a str,
}

impl<'a> ActionEnv<'a> {
    pub fn new(
        project: &'a mut Project,
        notifier: &'a mut dyn Notifier,
        prompt: &'a mut dyn Prompt,
        settings: &'a dyn SettingsStore,
    ) -> Self {
        Self {
            project,
            canvas: None,
            notifier,
            prompt,
            settings,
            exporter: None,
            namespace: DEFAULT_NAMESPACE,
        }
    }

    pub fn with_canvas(mut self, canvas: &'a mut dyn MapCanvas) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn with_exporter(mut self, exporter: &'a mut dyn LayerExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_namespace(mut self, namespace: &'a str) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn canvas(&mut self) -> Result<&mut (dyn MapCanvas + 'a), ActionError> {
        self.canvas
            .as_deref_mut()
            .ok_or_else(|| ActionError::context("Map canvas not available"))
    }

    /// 刷新画布（没有画布时忽略）。
    pub fn refresh_canvas(&mut self) {
        if let Some(canvas) = self.canvas.as_deref_mut() {
            canvas.refresh();
        }
    }
}
