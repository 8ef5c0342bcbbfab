//! Vector Map Editor（Bevy 宿主）
//!
//! 目标：
//! - 画布显示工程中的矢量/栅格图层，中键拖动、滚轮缩放
//! - 右键：定位附近要素，按能力描述弹出可用动作菜单
//! - 动作的设置保存在 `assets/settings/actions.ron`
//!
//! 说明：
//! - 本 crate 使用 Bevy 0.18。
//! - 动作逻辑全部在 `vecmap_core`，这里只负责把画布、对话框、设置存储接到端口上。

mod app;
mod demo;
mod host;
mod paths;
mod persistence;
mod types;
mod ui;
mod world;

use bevy::prelude::Color;

pub const UI_BG: Color = Color::srgb(0.12, 0.12, 0.12);
pub const UI_PANEL: Color = Color::srgb(0.16, 0.16, 0.16);
pub const UI_HIGHLIGHT: Color = Color::srgb(0.25, 0.45, 0.95);
pub const UI_BUTTON: Color = Color::srgb(0.22, 0.22, 0.22);
pub const UI_BUTTON_HOVER: Color = Color::srgb(0.28, 0.28, 0.28);
pub const UI_BUTTON_PRESS: Color = Color::srgb(0.35, 0.35, 0.35);

pub use app::run;
