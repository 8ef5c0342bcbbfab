//! 调度器：定位要素 → 按能力描述筛选动作 → 组装上下文 → 执行选中的动作。

use tracing::{debug, info_span};

use crate::action::{ActionOutcome, MapAction};
use crate::capability::{GeometryTag, Scope};
use crate::context::{ActionEnv, CanvasView, ClickContext};
use crate::crs::Crs;
use crate::error::{ActionError, ConfigurationError, DispatchError};
use crate::geometry::Point;
use crate::locator::locate;
use crate::project::Project;
use crate::registry::ActionRegistry;
use crate::settings::{settings_key, SettingsStore, DEFAULT_NAMESPACE};

pub const DEFAULT_SEARCH_RADIUS_PX: f64 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    pub search_radius_px: f64,
    pub namespace: String,
    /// 没有画布时使用的 CRS。
    pub fallback_crs: Crs,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            search_radius_px: DEFAULT_SEARCH_RADIUS_PX,
            namespace: DEFAULT_NAMESPACE.to_string(),
            fallback_crs: Crs::default(),
        }
    }
}

/// 菜单显示用的条目。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuEntry {
    pub action_id: String,
    pub name: String,
    pub category: String,
}

#[derive(Default)]
pub struct Dispatcher {
    registry: ActionRegistry,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            registry: ActionRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DispatchConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ActionRegistry {
        &mut self.registry
    }

    pub fn register(&mut self, action: Box<dyn MapAction>) -> Result<(), ConfigurationError> {
        self.registry.register(action)
    }

    pub fn register_all<I>(&mut self, actions: I) -> Vec<ConfigurationError>
    where
        I: IntoIterator<Item = Box<dyn MapAction>>,
    {
        self.registry.register_all(actions)
    }

    /// 设置中的 `<ns>/<id>/enabled` 覆盖描述里的默认值，每次分发都重新读取。
    fn is_enabled(&self, action_id: &str, declared: bool, settings: &dyn SettingsStore) -> bool {
        settings
            .get(&settings_key(&self.config.namespace, action_id, "enabled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(declared)
    }

    /// 为一次右键点击生成上下文与有序的动作 id 列表。
    pub fn build_menu(
        &self,
        click_point: Point,
        project: &Project,
        canvas: Option<CanvasView>,
        settings: &dyn SettingsStore,
    ) -> Result<(ClickContext, Vec<String>), ActionError> {
        let _span = info_span!("build_menu", x = click_point.x, y = click_point.y).entered();

        let (crs, units_per_pixel) = match canvas {
            Some(view) => (view.crs, view.map_units_per_pixel),
            None => (self.config.fallback_crs, 1.0),
        };
        let tolerance = self.config.search_radius_px * units_per_pixel;
        let detected = if click_point.is_finite() {
            locate(click_point, project, crs, tolerance)
        } else {
            Vec::new()
        };
        let context = ClickContext::new(click_point, canvas, detected)?;

        let ids: Vec<String> = match context.closest() {
            Some(best) => {
                let tag = GeometryTag::Category(best.geometry_type);
                self.registry
                    .descriptors()
                    .filter(|d| d.applies_to(Scope::Feature, tag) || d.applies_to(Scope::Layer, tag))
                    .filter(|d| self.is_enabled(&d.action_id, d.enabled, settings))
                    .map(|d| d.action_id.clone())
                    .collect()
            }
            None => self
                .registry
                .descriptors()
                .filter(|d| d.scope == Scope::Universal)
                .filter(|d| d.applies_to(Scope::Universal, GeometryTag::Universal))
                .filter(|d| self.is_enabled(&d.action_id, d.enabled, settings))
                .map(|d| d.action_id.clone())
                .collect(),
        };

        debug!(
            candidates = context.detected_features.len(),
            tolerance,
            actions = ids.len(),
            "menu built"
        );
        Ok((context, ids))
    }

    pub fn menu_entries(&self, ids: &[String]) -> Vec<MenuEntry> {
        ids.iter()
            .filter_map(|id| self.registry.descriptor(id))
            .map(|d| MenuEntry {
                action_id: d.action_id.clone(),
                name: d.name.clone(),
                category: d.category.clone(),
            })
            .collect()
    }

    /// 把上下文交给选中的动作。动作自己的失败已经通过通知报告，这里原样返回。
    pub fn execute(
        &self,
        action_id: &str,
        context: &ClickContext,
        env: &mut ActionEnv<'_>,
    ) -> Result<Result<ActionOutcome, ActionError>, DispatchError> {
        let entry = self
            .registry
            .get(action_id)
            .ok_or_else(|| DispatchError::UnknownAction(action_id.to_string()))?;
        Ok(entry.action.execute(context, env))
    }
}
