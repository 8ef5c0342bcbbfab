#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};

use vecmap_core::error::ProviderError;
use vecmap_core::geometry::{Geometry, GeometryCategory, Point};
use vecmap_core::layer::{
    Attributes, DataProvider, Feature, FeatureChange, FeatureId, LayerId, ProviderCapabilities,
    VectorLayer,
};
use vecmap_core::notify::{DialogForm, DialogValues, NoticeLevel, Notifier, Prompt};
use vecmap_core::Crs;

/// 记录所有通知；确认框按队列回答，队列空时用 `default_answer`。
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notices: Vec<(NoticeLevel, String, String)>,
    pub confirmations: Vec<String>,
    pub answers: VecDeque<bool>,
    pub default_answer: bool,
}

impl RecordingNotifier {
    pub fn agreeing() -> Self {
        Self {
            default_answer: true,
            ..Self::default()
        }
    }

    pub fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            default_answer: true,
            ..Self::default()
        }
    }

    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.iter().map(|(l, _, _)| *l).collect()
    }

    pub fn last_text(&self) -> &str {
        self.notices.last().map(|(_, _, t)| t.as_str()).unwrap_or("")
    }
}

impl Notifier for RecordingNotifier {
    fn show_info(&mut self, title: &str, text: &str) {
        self.notices
            .push((NoticeLevel::Info, title.to_string(), text.to_string()));
    }

    fn show_warning(&mut self, title: &str, text: &str) {
        self.notices
            .push((NoticeLevel::Warning, title.to_string(), text.to_string()));
    }

    fn show_error(&mut self, title: &str, text: &str) {
        self.notices
            .push((NoticeLevel::Error, title.to_string(), text.to_string()));
    }

    fn confirm_action(&mut self, _title: &str, text: &str) -> bool {
        self.confirmations.push(text.to_string());
        self.answers.pop_front().unwrap_or(self.default_answer)
    }
}

/// 按脚本回答对话框：`None` 表示取消，`Some` 在默认值上覆盖给定字段。
/// 脚本用完后一律接受默认值。
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub script: VecDeque<Option<DialogValues>>,
    pub forms: Vec<DialogForm>,
}

impl ScriptedPrompt {
    pub fn answering(values: DialogValues) -> Self {
        Self {
            script: [Some(values)].into(),
            forms: Vec::new(),
        }
    }

    pub fn cancelling() -> Self {
        Self {
            script: [None].into(),
            forms: Vec::new(),
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn request(&mut self, form: &DialogForm) -> Option<DialogValues> {
        self.forms.push(form.clone());
        let mut values = form.defaults();
        match self.script.pop_front() {
            Some(None) => None,
            Some(Some(overrides)) => {
                for field in &form.fields {
                    if let Some(v) = overrides.get(&field.name) {
                        values.set(&field.name, v.clone());
                    }
                }
                Some(values)
            }
            None => Some(values),
        }
    }
}

/// 可编辑，但持久化总是失败。
#[derive(Debug, Default)]
pub struct FailingCommitProvider;

impl DataProvider for FailingCommitProvider {
    fn name(&self) -> &str {
        "failing-commit"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { editable: true }
    }

    fn persist(&mut self, _features: &BTreeMap<FeatureId, Feature>) -> Result<(), ProviderError> {
        Err(ProviderError::new(self.name(), "disk full"))
    }
}

/// 可编辑，但拒绝任何几何修改。
#[derive(Debug, Default)]
pub struct RejectingProvider;

impl DataProvider for RejectingProvider {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { editable: true }
    }

    fn validate_change(&self, change: FeatureChange<'_>) -> Result<(), ProviderError> {
        match change {
            FeatureChange::Geometry { .. } => {
                Err(ProviderError::new(self.name(), "geometry is locked"))
            }
            _ => Ok(()),
        }
    }

    fn persist(&mut self, _features: &BTreeMap<FeatureId, Feature>) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub fn square(x0: f64, y0: f64, size: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        Point::new(x0, y0),
        Point::new(x0 + size, y0),
        Point::new(x0 + size, y0 + size),
        Point::new(x0, y0 + size),
        Point::new(x0, y0),
    ]])
}

pub fn layer_with(
    id: u32,
    name: &str,
    category: GeometryCategory,
    geometries: Vec<Geometry>,
) -> VectorLayer {
    let mut layer = VectorLayer::new(LayerId(id), name, category, Crs::WEB_MERCATOR);
    for g in geometries {
        layer.add_committed(Some(g), Attributes::new());
    }
    layer
}

pub fn point_layer(id: u32, name: &str, points: &[(f64, f64)]) -> VectorLayer {
    layer_with(
        id,
        name,
        GeometryCategory::Point,
        points
            .iter()
            .map(|(x, y)| Geometry::Point(Point::new(*x, *y)))
            .collect(),
    )
}
