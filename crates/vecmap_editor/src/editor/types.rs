//! 编辑器资源与组件。

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use vecmap_core::dispatcher::DEFAULT_SEARCH_RADIUS_PX;
use vecmap_core::settings::DEFAULT_NAMESPACE;
use vecmap_core::{CanvasState, ClickContext, Crs, Dispatcher, MenuEntry, NoticeLevel, Project};
use vecmap_format::{RonLayerExporter, RonSettingsStore};

pub const DEFAULT_CONFIG_PATH: &str = "settings/editor.ron";

/// 编辑器配置（`assets/settings/editor.ron`）。
#[derive(Resource, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 动作设置文件（相对 assets）。
    pub settings_path: String,
    /// 启动时读取的图层目录。
    pub layers_dir: String,
    /// 永久派生图层的输出目录。
    pub export_dir: String,
    pub namespace: String,
    /// 右键搜索半径（像素）。
    pub search_radius_px: f64,
    pub crs: Crs,
    /// false 时不弹系统对话框：确认一律通过，表单取默认值。
    pub native_dialogs: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            settings_path: "settings/actions.ron".to_string(),
            layers_dir: "layers".to_string(),
            export_dir: "layers/derived".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            search_radius_px: DEFAULT_SEARCH_RADIUS_PX,
            crs: Crs::WEB_MERCATOR,
            native_dialogs: true,
        }
    }
}

/// 工程 + 调度器 + 端口实现。动作执行时整体借出。
#[derive(Resource)]
pub struct MapSession {
    pub project: Project,
    pub dispatcher: Dispatcher,
    pub settings: RonSettingsStore,
    pub exporter: RonLayerExporter,
    pub canvas: CanvasState,
}

#[derive(Component)]
pub struct WorldCamera;

#[derive(Component)]
pub struct HudText;

#[derive(Resource, Default)]
pub struct PanState {
    pub active: bool,
    pub last_world: Option<Vec2>,
}

/// 最近的通知（HUD 显示）。
#[derive(Resource, Default)]
pub struct NoticeLog {
    pub entries: Vec<(NoticeLevel, String)>,
}

impl NoticeLog {
    const MAX: usize = 6;

    pub fn push(&mut self, level: NoticeLevel, text: String) {
        self.entries.push((level, text));
        if self.entries.len() > Self::MAX {
            let excess = self.entries.len() - Self::MAX;
            self.entries.drain(..excess);
        }
    }
}

#[derive(Resource, Default)]
pub struct ContextMenuState {
    pub open: bool,
    /// UI 屏幕坐标（原点左上）。
    pub screen_pos: Vec2,
    /// 打开菜单时的点击上下文（地图坐标 + 附近要素）。
    pub context: Option<ClickContext>,
    pub entries: Vec<MenuEntry>,
    /// 用于“点击菜单项/点击空白关闭”时，避免同一帧触发画布左键操作。
    pub consume_left_click: bool,
    /// 每次打开递增；UI 侧据此重建菜单项。
    pub generation: u64,
    pub built_generation: u64,
}

#[derive(Component)]
pub struct ContextMenuRoot;

#[derive(Component)]
pub struct ContextMenuBackdrop;

#[derive(Component)]
pub struct ContextMenuItem(pub String);

#[derive(Component)]
pub struct ContextMenuDisabled;

/// 菜单项点击后写入，world 侧执行。
#[derive(Resource, Default)]
pub struct ContextMenuCommand {
    pub action_id: Option<String>,
}
