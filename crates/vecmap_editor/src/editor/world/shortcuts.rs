use bevy::prelude::*;

use vecmap_core::NoticeLevel;

use crate::editor::paths::resolve_asset_path;
use crate::editor::persistence::{save_config_to_file, save_layers_to_dir};
use crate::editor::types::{EditorConfig, MapSession, NoticeLog, DEFAULT_CONFIG_PATH};

/// Ctrl+S：保存动作设置、编辑器配置与矢量图层（只写已提交数据）。
pub fn save_shortcuts(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<EditorConfig>,
    mut session: ResMut<MapSession>,
    mut log: ResMut<NoticeLog>,
) {
    let ctrl = keys.pressed(KeyCode::ControlLeft) || keys.pressed(KeyCode::ControlRight);
    if !(ctrl && keys.just_pressed(KeyCode::KeyS)) {
        return;
    }

    if let Err(err) = session.settings.save() {
        warn!("save settings failed: {err}");
        log.push(NoticeLevel::Error, format!("Save settings failed: {err}"));
        return;
    }
    if let Err(err) = save_config_to_file(&config, &resolve_asset_path(DEFAULT_CONFIG_PATH)) {
        warn!("save editor config failed: {err}");
    }

    let dir = resolve_asset_path(&config.layers_dir);
    match save_layers_to_dir(&dir, &session.project) {
        Ok(count) => {
            info!("saved {count} layer(s) to {}", dir.display());
            log.push(NoticeLevel::Info, format!("Saved settings and {count} layer(s)"));
        }
        Err(err) => {
            warn!("save layers failed: {err}");
            log.push(NoticeLevel::Error, format!("Save layers failed: {err}"));
        }
    }
}
