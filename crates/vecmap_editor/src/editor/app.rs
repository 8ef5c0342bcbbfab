//! 编辑器应用装配（Bevy App 构建与系统注册）。

use bevy::prelude::*;
use bevy::ui::UiSystems;

use vecmap_core::actions::builtin_actions;
use vecmap_core::{CanvasState, DispatchConfig, Dispatcher, Extent};
use vecmap_format::{RonLayerExporter, RonSettingsStore};

use super::{
	demo::demo_project,
	paths::{resolve_asset_path, workspace_assets_dir},
	persistence::{load_config_from_file, load_layers_from_dir},
	types::{
		ContextMenuCommand, ContextMenuState, EditorConfig, MapSession, NoticeLog, PanState,
		DEFAULT_CONFIG_PATH,
	},
	ui,
	world,
	UI_BG,
};

/// 读取配置、图层与动作设置，装配调度器。
fn open_session(config: &EditorConfig) -> MapSession {
	let mut project = vecmap_core::Project::new();
	let layers_dir = resolve_asset_path(&config.layers_dir);
	match load_layers_from_dir(&layers_dir, &mut project) {
		Ok(0) => {
			info!("no layer files in {}, using the demo project", layers_dir.display());
			project = demo_project(config.crs);
		}
		Ok(n) => info!("loaded {n} layer(s) from {}", layers_dir.display()),
		Err(err) => {
			warn!("load layers failed: {err}");
			project = demo_project(config.crs);
		}
	}

	let settings_path = resolve_asset_path(&config.settings_path);
	let settings = RonSettingsStore::load(&settings_path, &config.namespace).unwrap_or_else(|err| {
		// 坏文件：从空设置开始，Ctrl+S 时覆盖
		warn!("load action settings failed: {err}");
		RonSettingsStore::empty(&settings_path, &config.namespace)
	});

	let mut dispatcher = Dispatcher::new(DispatchConfig {
		search_radius_px: config.search_radius_px,
		namespace: config.namespace.clone(),
		fallback_crs: config.crs,
	});
	for err in dispatcher.register_all(builtin_actions()) {
		warn!("action rejected: {err}");
	}

	MapSession {
		project,
		dispatcher,
		settings,
		exporter: RonLayerExporter::new(resolve_asset_path(&config.export_dir)),
		canvas: CanvasState::new(config.crs, Extent::new(-500.0, -500.0, 500.0, 500.0), 1280.0, 720.0),
	}
}

/// 启动时读取配置与工程（需要日志插件已就绪）。
fn load_session(mut commands: Commands) {
	let config = load_config_from_file(&resolve_asset_path(DEFAULT_CONFIG_PATH)).unwrap_or_else(|err| {
		warn!("load editor config failed: {err}");
		EditorConfig::default()
	});
	let session = open_session(&config);
	commands.insert_resource(config);
	commands.insert_resource(session);
}

/// 运行编辑器。
pub fn run() {
	let assets_dir = workspace_assets_dir();

	App::new()
		// 用 ClearColor 控制背景色，而不是用全屏 UI 背景盖住世界渲染。
		.insert_resource(ClearColor(UI_BG))
		.add_plugins(
			DefaultPlugins
				.set(AssetPlugin {
					// 用绝对路径避免 cwd 差异导致找不到资源
					file_path: assets_dir.to_string_lossy().to_string(),
					..default()
				})
				.set(WindowPlugin {
					primary_window: Some(Window {
						title: "Vector Map Editor".to_string(),
						..default()
					}),
					..default()
				}),
		)
		// --- Resources ---
		.init_resource::<PanState>()
		.init_resource::<NoticeLog>()
		.init_resource::<ContextMenuState>()
		.init_resource::<ContextMenuCommand>()
		.add_systems(Startup, (load_session, (world::setup_world, ui::setup_ui)).chain())
		.add_systems(
			Update,
			(
				// --- UI: context menu ---
				ui::context_menu_sync,
				ui::context_menu_item_styles,
				ui::context_menu_backdrop_click,
				ui::context_menu_item_click,
			)
				.chain(),
		)
		.add_systems(
			Update,
			(
				// --- World: camera ↔ canvas ---
				world::camera_zoom,
				world::camera_pan,
				world::apply_requested_extent,
				world::sync_canvas_from_camera,
				// --- World: context menu + shortcuts ---
				world::context_menu_open_close,
				world::context_menu_clear_consumption,
				world::apply_context_menu_command,
				world::save_shortcuts,
			)
				.chain()
				.after(ui::context_menu_item_click),
		)
		.add_systems(
			PostUpdate,
			// --- UI: rebuild (run late to avoid entity-despawn command errors) ---
			ui::context_menu_rebuild.before(UiSystems::Layout),
		)
		.add_systems(Update, (world::draw_layers, ui::update_hud_text))
		.run();
}
