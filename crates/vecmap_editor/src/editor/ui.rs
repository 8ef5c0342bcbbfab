//! UI：HUD 文案与右键动作菜单。

use bevy::prelude::*;

use super::types::HudText;

mod context_menu;
mod hud;

pub use context_menu::{
    context_menu_backdrop_click, context_menu_item_click, context_menu_item_styles, context_menu_rebuild,
    context_menu_sync,
};
pub use hud::update_hud_text;

/// UI 初始化：HUD + 右键菜单实体树。
pub fn setup_ui(mut commands: Commands) {
    commands.spawn((
        Text::new("Right click on the map for actions"),
        TextFont {
            font_size: 13.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(8.0),
            right: Val::Px(10.0),
            max_width: Val::Px(460.0),
            padding: UiRect::all(Val::Px(8.0)),
            ..default()
        },
        BackgroundColor(super::UI_PANEL.with_alpha(0.85)),
        ZIndex(800),
        bevy::ui::FocusPolicy::Pass,
        HudText,
    ));

    context_menu::spawn_context_menu(&mut commands);
}
