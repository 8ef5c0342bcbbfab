//! 编辑器配置与图层目录的读写（RON）。

use std::path::{Path, PathBuf};

use vecmap_core::{Project, VectorLayer};

use crate::editor::types::EditorConfig;

pub fn save_config_to_file(config: &EditorConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let text = ron::ser::to_string_pretty(config, ron::ser::PrettyConfig::default())
        .map_err(|e| e.to_string())?;
    std::fs::write(path, text).map_err(|e| e.to_string())?;
    Ok(())
}

pub fn load_config_from_file(path: &Path) -> Result<EditorConfig, String> {
    if !path.exists() {
        return Ok(EditorConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    ron::from_str::<EditorConfig>(&text).map_err(|e| e.to_string())
}

/// 目录下的 `*.ron` 图层文件（按文件名排序，不递归）。
fn layer_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| e.to_string())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

/// 把目录中的图层依次放到工程底部；返回读入的图层数。单个文件失败只跳过该文件。
pub fn load_layers_from_dir(dir: &Path, project: &mut Project) -> Result<usize, String> {
    let mut loaded = 0;
    for path in layer_files(dir)? {
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(err) => {
                bevy::log::warn!("skip layer file {}: {err}", path.display());
                continue;
            }
        };
        let id = project.allocate_layer_id();
        match vecmap_format::decode_layer_ron(&text, id) {
            Ok(layer) => {
                project.push_vector(layer);
                loaded += 1;
            }
            Err(err) => bevy::log::warn!("skip layer file {}: {err}", path.display()),
        }
    }
    Ok(loaded)
}

fn layer_file_name(layer: &VectorLayer) -> String {
    let stem: String = layer
        .name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_') { c } else { '_' })
        .collect();
    format!("{stem}.ron")
}

/// 写出所有矢量图层的已提交数据；返回写出的文件数。
pub fn save_layers_to_dir(dir: &Path, project: &Project) -> Result<usize, String> {
    std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
    let mut written = 0;
    for layer in project.vector_layers() {
        let text = vecmap_format::encode_layer_ron(layer).map_err(|e| e.to_string())?;
        let path = dir.join(layer_file_name(layer));
        std::fs::write(&path, text).map_err(|e| format!("{}: {e}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::editor::demo::demo_project;
    use vecmap_core::Crs;

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_file(&dir.path().join("editor.ron")).unwrap();
        assert_eq!(config.namespace, "MapActions");
        assert!(config.native_dialogs);
    }

    #[test]
    fn config_round_trips_through_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings").join("editor.ron");
        let config = EditorConfig {
            search_radius_px: 8.0,
            native_dialogs: false,
            crs: Crs::WGS84,
            ..EditorConfig::default()
        };
        save_config_to_file(&config, &path).unwrap();
        let loaded = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.search_radius_px, 8.0);
        assert_eq!(loaded.crs, Crs::WGS84);
        assert!(!loaded.native_dialogs);
    }

    #[test]
    fn saved_layers_load_back_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let project = demo_project(Crs::WEB_MERCATOR);
        assert_eq!(save_layers_to_dir(dir.path(), &project).unwrap(), 3);
        std::fs::write(dir.path().join("broken.ron"), "not a layer").unwrap();

        let mut reloaded = Project::new();
        assert_eq!(load_layers_from_dir(dir.path(), &mut reloaded).unwrap(), 3);
        let names: Vec<&str> = reloaded.layer_names().collect();
        assert_eq!(names, ["parcels", "roads", "stations"]);
        for layer in project.vector_layers() {
            let copy = reloaded.vector_layers().find(|l| l.name == layer.name).unwrap();
            assert_eq!(copy.committed_features(), layer.committed_features());
        }
    }

    #[test]
    fn missing_layer_dir_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = Project::new();
        assert_eq!(load_layers_from_dir(&dir.path().join("none"), &mut project).unwrap(), 0);
        assert!(project.is_empty());
    }
}
