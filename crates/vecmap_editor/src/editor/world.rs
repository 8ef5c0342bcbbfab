//! 世界（World）侧逻辑：相机、画布绘制、右键菜单、快捷键。
//!
//! 关键点：
//! - 屏幕坐标转地图坐标需要一个明确的“世界相机”（`WorldCamera`）。
//! - 相机与核心的 `CanvasState` 双向同步：相机 → 画布范围；动作请求的范围 → 相机。

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use vecmap_core::Point;

use super::types::WorldCamera;

mod camera;
mod canvas;
mod context_menu;
mod shortcuts;

pub use camera::{apply_requested_extent, camera_pan, camera_zoom, setup_world, sync_canvas_from_camera};
pub use canvas::draw_layers;
pub use context_menu::{apply_context_menu_command, context_menu_clear_consumption, context_menu_open_close};
pub use shortcuts::save_shortcuts;

/// 光标所在的地图坐标。
fn cursor_map_point(
    windows: &Query<&Window, With<PrimaryWindow>>,
    camera_q: &Query<(&Camera, &GlobalTransform), With<WorldCamera>>,
) -> Option<(Vec2, Point)> {
    let window = windows.single().ok()?;
    let cursor = window.cursor_position()?;
    let (camera, camera_transform) = camera_q.single().ok()?;
    let world = camera.viewport_to_world_2d(camera_transform, cursor).ok()?;
    Some((cursor, Point::from(world)))
}
