//! 右上角 HUD 文案。

use bevy::prelude::*;

use vecmap_core::{CanvasState, MapLayer, NoticeLevel, Project};

use crate::editor::types::{HudText, MapSession, NoticeLog};

fn layer_line(layer: &MapLayer) -> String {
	let vis = if layer.is_visible() { "on " } else { "off" };
	match layer {
		MapLayer::Raster(r) => format!("[{vis}] {} (raster{})", r.name, if r.basemap { ", basemap" } else { "" }),
		MapLayer::Vector(v) => {
			let edit = match (v.is_editable(), v.is_modified()) {
				(true, true) => " | editing, modified",
				(true, false) => " | editing",
				_ => "",
			};
			format!(
				"[{vis}] {} ({}, {} features){edit}",
				v.name,
				v.geometry_type.as_str(),
				v.feature_count()
			)
		}
	}
}

pub(crate) fn hud_message(project: &Project, canvas: &CanvasState, notices: &NoticeLog, unsaved_settings: bool) -> String {
	let mut msg = format!(
		"CRS: {} | {:.4} {}/px",
		canvas.crs,
		canvas.map_units_per_pixel(),
		canvas.crs.units.abbreviation()
	);
	if unsaved_settings {
		msg.push_str(" | settings not saved (Ctrl+S)");
	}

	msg.push_str("\n\nLayers (top first):");
	for layer in project.layers() {
		msg.push('\n');
		msg.push_str(&layer_line(layer));
	}

	if !notices.entries.is_empty() {
		msg.push_str("\n\nRecent:");
		for (level, text) in notices.entries.iter().rev() {
			let tag = match level {
				NoticeLevel::Info => "info",
				NoticeLevel::Warning => "warn",
				NoticeLevel::Error => "error",
			};
			msg.push_str(&format!("\n[{tag}] {text}"));
		}
	}

	msg.push_str("\n\nRight click: actions | Middle drag: pan | Wheel: zoom | Ctrl+S: save");
	msg
}

/// 更新右上角 HUD（CRS/比例、图层与编辑状态、最近的通知）。
pub fn update_hud_text(
	mut commands: Commands,
	session: Res<MapSession>,
	notices: Res<NoticeLog>,
	hud_q: Query<Entity, With<HudText>>,
) {
	let Some(hud_entity) = hud_q.iter().next() else {
		return;
	};
	let msg = hud_message(&session.project, &session.canvas, &notices, session.settings.is_dirty());
	commands.entity(hud_entity).insert(Text::new(msg));
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::editor::demo::demo_project;
	use vecmap_core::{Crs, Extent};

	#[test]
	fn hud_lists_layers_top_first_and_latest_notice_first() {
		let project = demo_project(Crs::WEB_MERCATOR);
		let canvas = CanvasState::new(Crs::WEB_MERCATOR, Extent::new(0.0, 0.0, 800.0, 600.0), 800.0, 600.0);
		let mut notices = NoticeLog::default();
		notices.push(NoticeLevel::Info, "first".to_string());
		notices.push(NoticeLevel::Warning, "second".to_string());

		let msg = hud_message(&project, &canvas, &notices, true);
		assert!(msg.starts_with("CRS: "));
		assert!(msg.contains("settings not saved"));
		let stations = msg.find("stations").unwrap();
		let basemap = msg.find("basemap").unwrap();
		assert!(stations < basemap);
		assert!(msg.find("[warn] second").unwrap() < msg.find("[info] first").unwrap());
	}

	#[test]
	fn notice_log_keeps_only_the_latest_entries() {
		let mut notices = NoticeLog::default();
		for i in 0..10 {
			notices.push(NoticeLevel::Info, i.to_string());
		}
		assert_eq!(notices.entries.len(), 6);
		assert_eq!(notices.entries[0].1, "4");
	}
}
