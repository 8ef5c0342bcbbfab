use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use vecmap_core::{ActionEnv, MapCanvas};

use crate::editor::host::{BevyNotifier, DialogPrompt};
use crate::editor::types::{
    ContextMenuCommand, ContextMenuState, EditorConfig, MapSession, NoticeLog, WorldCamera,
};

use super::cursor_map_point;

/// 右键：定位附近要素，向调度器要菜单。
pub fn context_menu_open_close(
    buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_q: Query<(&Camera, &GlobalTransform), With<WorldCamera>>,
    session: Res<MapSession>,
    mut menu: ResMut<ContextMenuState>,
) {
    if keys.just_pressed(KeyCode::Escape) {
        if menu.open {
            menu.open = false;
            menu.consume_left_click = true;
        }
        return;
    }

    if !buttons.just_pressed(MouseButton::Right) {
        return;
    }
    let Some((screen_pos, map_point)) = cursor_map_point(&windows, &camera_q) else {
        return;
    };

    let view = session.canvas.view();
    match session
        .dispatcher
        .build_menu(map_point, &session.project, Some(view), &session.settings)
    {
        Ok((context, ids)) => {
            info!(
                "context menu at map ({:.3}, {:.3}): {} candidate feature(s), {} action(s)",
                map_point.x,
                map_point.y,
                context.detected_features.len(),
                ids.len()
            );
            menu.entries = session.dispatcher.menu_entries(&ids);
            menu.context = Some(context);
            menu.open = true;
            menu.consume_left_click = false;
            menu.screen_pos = screen_pos;
            menu.generation += 1;
        }
        Err(err) => warn!("cannot build context menu: {err}"),
    }

    // “点空白关闭”交给 UI 侧的 ContextMenuBackdrop 处理。
}

/// 左键松开后清除“吞掉左键”的标记。
pub fn context_menu_clear_consumption(
    buttons: Res<ButtonInput<MouseButton>>,
    mut menu: ResMut<ContextMenuState>,
) {
    if menu.consume_left_click && !buttons.pressed(MouseButton::Left) {
        menu.consume_left_click = false;
    }
}

/// 执行菜单里选中的动作：工程、画布、导出器、设置整体借给动作。
pub fn apply_context_menu_command(
    mut cmd: ResMut<ContextMenuCommand>,
    mut menu: ResMut<ContextMenuState>,
    mut session: ResMut<MapSession>,
    mut log: ResMut<NoticeLog>,
    config: Res<EditorConfig>,
) {
    let Some(action_id) = cmd.action_id.take() else {
        return;
    };
    let Some(context) = menu.context.take() else {
        warn!("action {action_id} chosen without a click context");
        return;
    };

    let MapSession {
        project,
        dispatcher,
        settings,
        exporter,
        canvas,
    } = &mut *session;
    let mut notifier = BevyNotifier::new(&mut *log, config.native_dialogs);
    let mut prompt = DialogPrompt::new(config.native_dialogs);
    let mut env = ActionEnv::new(project, &mut notifier, &mut prompt, &*settings)
        .with_canvas(canvas)
        .with_exporter(exporter)
        .with_namespace(&config.namespace);

    match dispatcher.execute(&action_id, &context, &mut env) {
        Ok(Ok(outcome)) => info!("action {action_id}: {outcome:?}"),
        // 动作已经通过通知报告过失败
        Ok(Err(err)) => debug!("action {action_id} failed: {err}"),
        Err(err) => warn!("cannot dispatch {action_id}: {err}"),
    }
}
