//! 右键动作菜单：保持调度器给出的顺序，分类变化处加分隔线。

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use vecmap_core::MenuEntry;

use crate::editor::types::{
    ContextMenuBackdrop, ContextMenuCommand, ContextMenuDisabled, ContextMenuItem, ContextMenuRoot,
    ContextMenuState,
};
use crate::editor::{UI_BUTTON, UI_BUTTON_HOVER, UI_BUTTON_PRESS};

const DISABLED_BG: Color = Color::srgb(0.18, 0.18, 0.18);

/// UI 初始化时创建右键菜单实体树（初始为空；打开菜单时动态生成菜单项）。
pub(super) fn spawn_context_menu(commands: &mut Commands) {
    // 背景遮罩：用于“点空白关闭菜单”。z-index 略低于菜单本体。
    commands.spawn((
        Button,
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(0.0),
            top: Val::Px(0.0),
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            display: Display::None,
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.0)),
        ZIndex(4999),
        ContextMenuBackdrop,
    ));

    commands.spawn((
        // 面板本身也参与 hit-test，点面板空白处不会穿透到 backdrop。
        Button,
        Node {
            min_width: Val::Px(260.0),
            position_type: PositionType::Absolute,
            left: Val::Px(0.0),
            top: Val::Px(0.0),
            padding: UiRect::all(Val::Px(4.0)),
            row_gap: Val::Px(2.0),
            flex_direction: FlexDirection::Column,
            display: Display::None,
            ..default()
        },
        BackgroundColor(Color::srgba(0.08, 0.08, 0.09, 0.95)),
        BorderColor::all(Color::srgba(1.0, 1.0, 1.0, 0.12)),
        ZIndex(5000),
        ContextMenuRoot,
    ));
}

fn spawn_menu_item(commands: &mut Commands, parent: Entity, label: &str, hint: &str, action_id: Option<&str>) {
    let enabled = action_id.is_some();
    let mut e = commands.spawn((
        Button,
        Node {
            height: Val::Px(28.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(6.0)),
            column_gap: Val::Px(16.0),
            align_items: AlignItems::Center,
            justify_content: JustifyContent::SpaceBetween,
            ..default()
        },
        BackgroundColor(if enabled { UI_BUTTON } else { DISABLED_BG }),
        ContextMenuItem(action_id.unwrap_or_default().to_string()),
    ));
    if !enabled {
        e.insert(ContextMenuDisabled);
    }
    let id = e.id();
    commands.entity(parent).add_child(id);
    commands.entity(id).with_children(|b| {
        b.spawn((
            Text::new(label),
            TextFont {
                font_size: 14.0,
                ..default()
            },
            TextColor(if enabled {
                Color::WHITE
            } else {
                Color::srgba(1.0, 1.0, 1.0, 0.35)
            }),
        ));
        b.spawn((
            Text::new(hint),
            TextFont {
                font_size: 11.0,
                ..default()
            },
            TextColor(Color::srgba(1.0, 1.0, 1.0, 0.45)),
        ));
    });
}

fn spawn_menu_separator(commands: &mut Commands, parent: Entity) {
    let id = commands
        .spawn((
            Node {
                height: Val::Px(1.0),
                margin: UiRect::vertical(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(1.0, 1.0, 1.0, 0.12)),
        ))
        .id();
    commands.entity(parent).add_child(id);
}

/// 按调度器给出的顺序切分成连续的同分类段；分类变化处画分隔线，不重排条目。
pub(crate) fn category_runs(entries: &[MenuEntry]) -> Vec<(&str, &[MenuEntry])> {
    entries
        .chunk_by(|a, b| a.category == b.category)
        .map(|run| (run[0].category.as_str(), run))
        .collect()
}

/// 每次打开菜单时按调度器给出的条目重建菜单项。
pub fn context_menu_rebuild(
    mut commands: Commands,
    mut state: ResMut<ContextMenuState>,
    menu_q: Query<Entity, With<ContextMenuRoot>>,
    children_q: Query<&Children>,
) {
    if !state.open || state.built_generation == state.generation {
        return;
    }
    let Some(menu) = menu_q.iter().next() else {
        return;
    };
    state.built_generation = state.generation;

    if let Ok(children) = children_q.get(menu) {
        for child in children.iter().collect::<Vec<_>>() {
            // despawn 会连带子节点一起删除
            commands.entity(child).despawn();
        }
    }

    if state.entries.is_empty() {
        spawn_menu_item(&mut commands, menu, "No actions available", "", None);
        return;
    }

    for (i, (category, items)) in category_runs(&state.entries).into_iter().enumerate() {
        if i > 0 {
            spawn_menu_separator(&mut commands, menu);
        }
        for (j, entry) in items.iter().enumerate() {
            let hint = if j == 0 { category } else { "" };
            spawn_menu_item(&mut commands, menu, &entry.name, hint, Some(entry.action_id.as_str()));
        }
    }
}

/// 同步菜单位置/可见性（根据资源 `ContextMenuState`）。
pub fn context_menu_sync(
    windows: Query<&Window, With<PrimaryWindow>>,
    state: Res<ContextMenuState>,
    mut q: Query<&mut Node, (With<ContextMenuRoot>, Without<ContextMenuBackdrop>)>,
    mut backdrop_q: Query<&mut Node, (With<ContextMenuBackdrop>, Without<ContextMenuRoot>)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok(mut node) = q.single_mut() else {
        return;
    };
    let Ok(mut backdrop) = backdrop_q.single_mut() else {
        return;
    };

    if !state.open {
        node.display = Display::None;
        backdrop.display = Display::None;
        return;
    }

    node.display = Display::Flex;
    backdrop.display = Display::Flex;
    let margin = 6.0;
    let x = state.screen_pos.x.clamp(0.0, window.width()).max(margin);
    let y = state.screen_pos.y.clamp(0.0, window.height()).max(margin);
    node.left = Val::Px(x);
    node.top = Val::Px(y);
}

/// 点击遮罩关闭菜单。
pub fn context_menu_backdrop_click(
    mut menu: ResMut<ContextMenuState>,
    buttons: Res<ButtonInput<MouseButton>>,
    backdrop_q: Query<&Interaction, With<ContextMenuBackdrop>>,
) {
    if !menu.open || !buttons.just_released(MouseButton::Left) {
        return;
    }
    let Ok(interaction) = backdrop_q.single() else {
        return;
    };
    if matches!(*interaction, Interaction::Hovered | Interaction::Pressed) {
        menu.open = false;
        menu.context = None;
        menu.consume_left_click = true;
    }
}

/// 菜单项 hover/pressed 样式。
pub fn context_menu_item_styles(
    mut q: Query<
        (&Interaction, &mut BackgroundColor, Option<&ContextMenuDisabled>),
        (Changed<Interaction>, With<ContextMenuItem>),
    >,
) {
    for (interaction, mut bg, disabled) in q.iter_mut() {
        if disabled.is_some() {
            *bg = BackgroundColor(DISABLED_BG);
            continue;
        }
        *bg = match *interaction {
            Interaction::Pressed => BackgroundColor(UI_BUTTON_PRESS),
            Interaction::Hovered => BackgroundColor(UI_BUTTON_HOVER),
            Interaction::None => BackgroundColor(UI_BUTTON),
        };
    }
}

/// 菜单项点击：写入 `ContextMenuCommand`，由 world 侧执行动作。
pub fn context_menu_item_click(
    mut menu: ResMut<ContextMenuState>,
    mut cmd: ResMut<ContextMenuCommand>,
    buttons: Res<ButtonInput<MouseButton>>,
    q: Query<(&Interaction, &ContextMenuItem, Option<&ContextMenuDisabled>)>,
) {
    if !menu.open || !buttons.just_released(MouseButton::Left) {
        return;
    }

    for (interaction, item, disabled) in q.iter() {
        if !matches!(*interaction, Interaction::Hovered | Interaction::Pressed) {
            continue;
        }
        menu.consume_left_click = true;
        if disabled.is_some() {
            // 点到禁用项不关闭菜单
            return;
        }
        cmd.action_id = Some(item.0.clone());
        menu.open = false;
        return;
    }
}
