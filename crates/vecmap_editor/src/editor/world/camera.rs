use bevy::ecs::message::MessageReader;
use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use vecmap_core::{Extent, MapCanvas};

use crate::editor::types::{ContextMenuState, MapSession, PanState, WorldCamera};

const MIN_SCALE: f32 = 1.0e-4;
const MAX_SCALE: f32 = 1.0e4;

/// 初始化世界相机，并请求缩放到全部图层范围。
pub fn setup_world(mut commands: Commands, mut session: ResMut<MapSession>) {
    let full = session
        .project
        .vector_layers()
        .filter_map(|l| l.extent())
        .reduce(|a, b| a.union(&b));
    let center = full.map(|e| e.center()).unwrap_or_default();
    commands.spawn((
        Camera2d,
        Transform::from_translation(Vec3::new(center.x as f32, center.y as f32, 1000.0)),
        WorldCamera,
    ));
    if let Some(extent) = full {
        session.canvas.set_extent(extent.buffered(0.05).with_min_size(1.0));
    }
}

/// 画布平移（拖拽）：中键拖动，或 Space + 左键拖动。
pub fn camera_pan(
    keys: Res<ButtonInput<KeyCode>>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform), With<WorldCamera>>,
    mut cam_tf_q: Query<&mut Transform, With<WorldCamera>>,
    menu: Res<ContextMenuState>,
    mut pan: ResMut<PanState>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        pan.active = false;
        pan.last_world = None;
        return;
    };

    let want_pan = !menu.open
        && (buttons.pressed(MouseButton::Middle)
            || (keys.pressed(KeyCode::Space) && buttons.pressed(MouseButton::Left)));
    if !want_pan {
        pan.active = false;
        pan.last_world = None;
        return;
    }

    let Ok((camera, camera_transform)) = camera_q.single() else {
        return;
    };
    let Ok(world) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };

    let Some(last_world) = pan.last_world.filter(|_| pan.active) else {
        pan.active = true;
        pan.last_world = Some(world);
        return;
    };

    // 拖拽期间抓住的地图点保持在光标下
    let delta = last_world - world;
    if delta.length_squared() > 0.0
        && let Ok(mut tf) = cam_tf_q.single_mut()
    {
        tf.translation.x += delta.x;
        tf.translation.y += delta.y;
    }
}

/// 滚轮缩放：`ortho.scale` 即每像素的地图单位数。
pub fn camera_zoom(
    mut wheel: MessageReader<MouseWheel>,
    menu: Res<ContextMenuState>,
    mut proj_q: Query<&mut Projection, With<WorldCamera>>,
) {
    let mut delta: f32 = 0.0;
    for ev in wheel.read() {
        delta += ev.y;
    }
    if menu.open || delta.abs() < f32::EPSILON {
        return;
    }

    let Ok(mut proj) = proj_q.single_mut() else {
        return;
    };

    // wheel up (positive) => zoom in => ortho.scale smaller
    let factor: f32 = (1.0 - delta * 0.1).clamp(0.5, 2.0);
    if let Projection::Orthographic(ref mut ortho) = *proj {
        ortho.scale = (ortho.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
    }
}

/// 动作（缩放到要素/图层等）请求的范围 → 相机位置与缩放。
pub fn apply_requested_extent(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut session: ResMut<MapSession>,
    mut cam_q: Query<(&mut Transform, &mut Projection), With<WorldCamera>>,
) {
    if session.canvas.requested_extent.is_none() {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((mut tf, mut proj)) = cam_q.single_mut() else {
        return;
    };
    let Some(extent) = session.canvas.take_requested_extent() else {
        return;
    };

    let center = extent.center();
    tf.translation.x = center.x as f32;
    tf.translation.y = center.y as f32;
    if let Projection::Orthographic(ref mut ortho) = *proj {
        let sx = extent.width() as f32 / window.width().max(1.0);
        let sy = extent.height() as f32 / window.height().max(1.0);
        ortho.scale = sx.max(sy).clamp(MIN_SCALE, MAX_SCALE);
    }
    debug!(
        "canvas extent applied: ({:.2}, {:.2}) - ({:.2}, {:.2})",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    );
}

/// 相机 → 画布范围（右键定位的容差与动作读取的画布状态都依赖它）。
pub fn sync_canvas_from_camera(
    windows: Query<&Window, With<PrimaryWindow>>,
    cam_q: Query<(&Transform, &Projection), With<WorldCamera>>,
    mut session: ResMut<MapSession>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok((tf, proj)) = cam_q.single() else {
        return;
    };
    let Projection::Orthographic(ortho) = proj else {
        return;
    };

    let (w, h) = (window.width().max(1.0) as f64, window.height().max(1.0) as f64);
    let upp = ortho.scale as f64;
    let (cx, cy) = (tf.translation.x as f64, tf.translation.y as f64);
    let extent = Extent::new(
        cx - w * upp * 0.5,
        cy - h * upp * 0.5,
        cx + w * upp * 0.5,
        cy + h * upp * 0.5,
    );

    let canvas = &session.canvas;
    if canvas.extent == extent && canvas.width_px == w && canvas.height_px == h {
        return;
    }
    let canvas = &mut session.canvas;
    canvas.extent = extent;
    canvas.width_px = w;
    canvas.height_px = h;
}
