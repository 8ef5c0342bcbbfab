//! 基于文件的端口实现：RON 设置存储、派生图层导出。

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use vecmap_core::context::LayerExporter;
use vecmap_core::error::ExportError;
use vecmap_core::settings::{SettingValue, SettingsStore};
use vecmap_core::{MemorySettings, VectorLayer};

use crate::{decode_settings_ron, encode_layer_ron, encode_settings_ron, FormatError};

/// 设置存储：内存中读写，`save` 时整体写回 RON 文件。
#[derive(Clone, Debug)]
pub struct RonSettingsStore {
    path: PathBuf,
    namespace: String,
    values: MemorySettings,
    dirty: bool,
}

impl RonSettingsStore {
    /// 文件不存在时得到一个空存储。
    pub fn load(path: impl Into<PathBuf>, namespace: &str) -> Result<Self, FormatError> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no settings file yet");
            return Ok(Self::empty(path, namespace));
        }
        let text = std::fs::read_to_string(&path).map_err(|e| FormatError::io(&path, e))?;
        Ok(Self {
            values: decode_settings_ron(&text)?,
            ..Self::empty(path, namespace)
        })
    }

    pub fn empty(path: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.to_string(),
            values: MemorySettings::new(),
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn save(&mut self) -> Result<(), FormatError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FormatError::io(parent, e))?;
        }
        let text = encode_settings_ron(&self.values, &self.namespace)?;
        std::fs::write(&self.path, text).map_err(|e| FormatError::io(&self.path, e))?;
        self.dirty = false;
        info!(path = %self.path.display(), keys = self.values.len(), "settings saved");
        Ok(())
    }
}

impl SettingsStore for RonSettingsStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        if self.values.get(key).as_ref() != Some(&value) {
            self.values.set(key, value);
            self.dirty = true;
        }
    }

    fn remove(&mut self, key: &str) -> Option<SettingValue> {
        let removed = self.values.remove(key);
        self.dirty |= removed.is_some();
        removed
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys()
    }
}

/// 把派生图层写成 `<dir>/<layer name>.ron`。
#[derive(Clone, Debug)]
pub struct RonLayerExporter {
    dir: PathBuf,
}

impl RonLayerExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, layer_name: &str) -> PathBuf {
        let file: String = layer_name
            .chars()
            .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ') { c } else { '_' })
            .collect();
        let file = file.trim();
        let file = if file.is_empty() { "layer" } else { file };
        self.dir.join(format!("{file}.ron"))
    }

    fn write(&self, layer: &VectorLayer) -> Result<PathBuf, FormatError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| FormatError::io(&self.dir, e))?;
        let path = self.path_for(&layer.name);
        let text = encode_layer_ron(layer)?;
        std::fs::write(&path, text).map_err(|e| FormatError::io(&path, e))?;
        Ok(path)
    }
}

impl LayerExporter for RonLayerExporter {
    fn export(&mut self, layer: &VectorLayer) -> Result<String, ExportError> {
        let path = self.write(layer).map_err(|e| ExportError {
            layer: layer.name.clone(),
            message: e.to_string(),
        })?;
        info!(layer = %layer.name, path = %path.display(), "layer exported");
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{decode_layer_ron, layer_fingerprint};
    use vecmap_core::geometry::{Geometry, GeometryCategory, Point};
    use vecmap_core::layer::{Attributes, LayerId};
    use vecmap_core::Crs;

    #[test]
    fn missing_settings_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = RonSettingsStore::load(dir.path().join("actions.ron"), "MapActions").unwrap();
        assert!(store.keys().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn settings_survive_a_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings").join("actions.ron");
        let mut store = RonSettingsStore::load(&path, "MapActions").unwrap();
        store.set("MapActions/smooth_polygon/default_iterations", SettingValue::Int(3));
        store.set("MapActions/toggle_all_layers/enabled", SettingValue::Bool(false));
        assert!(store.is_dirty());
        store.save().unwrap();
        assert!(!store.is_dirty());

        let reloaded = RonSettingsStore::load(&path, "MapActions").unwrap();
        assert_eq!(reloaded.keys(), store.keys());
        assert_eq!(
            reloaded.get("MapActions/smooth_polygon/default_iterations"),
            Some(SettingValue::Int(3))
        );
    }

    #[test]
    fn setting_an_unchanged_value_is_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RonSettingsStore::load(dir.path().join("a.ron"), "MapActions").unwrap();
        store.set("k", SettingValue::Bool(true));
        store.save().unwrap();
        store.set("k", SettingValue::Bool(true));
        assert!(!store.is_dirty());
        assert_eq!(store.remove("missing"), None);
        assert!(!store.is_dirty());
    }

    #[test]
    fn exporter_writes_a_loadable_layer() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = RonLayerExporter::new(dir.path().join("derived"));
        let mut layer = VectorLayer::new(LayerId(2), "Polygon Areas: parcels", GeometryCategory::Point, Crs::WEB_MERCATOR);
        layer.add_committed(Some(Geometry::Point(Point::new(5.0, 5.0))), Attributes::new());

        let location = exporter.export(&layer).unwrap();
        assert!(location.ends_with("Polygon Areas_ parcels.ron"));

        let text = std::fs::read_to_string(&location).unwrap();
        let loaded = decode_layer_ron(&text, LayerId(7)).unwrap();
        assert_eq!(layer_fingerprint(&loaded), layer_fingerprint(&layer));
    }
}
