#![forbid(unsafe_code)]

//! 磁盘格式（RON）：动作设置文件与矢量图层文件。
//!
//! - 设置文件：V2 按动作分组；V1 为扁平的 `namespace/action/name` 键值表（读取兼容）。
//! - 图层文件：要素 + 字段 + CRS，附带要素内容的 blake3 指纹。

mod store;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use vecmap_core::crs::Crs;
use vecmap_core::geometry::GeometryCategory;
use vecmap_core::layer::{Feature, FeatureId, Field, LayerId, VectorLayer};
use vecmap_core::settings::{settings_key, SettingValue, SettingsStore};
use vecmap_core::MemorySettings;

pub use store::{RonLayerExporter, RonSettingsStore};

pub const SETTINGS_FILE_VERSION: u32 = 2;
pub const LAYER_FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("cannot parse RON: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("cannot write RON: {0}")]
    Encode(#[from] ron::Error),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported {kind} file version {version}")]
    Version { kind: &'static str, version: u32 },
}

impl FormatError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

// ---- 设置文件 ----

#[derive(Serialize, Deserialize)]
struct SettingsFileV1 {
    values: BTreeMap<String, SettingValue>,
}

#[derive(Serialize, Deserialize)]
struct SettingsFileV2 {
    version: u32,
    namespace: String,
    /// action_id → (setting_name → value)
    actions: BTreeMap<String, BTreeMap<String, SettingValue>>,
    /// 不属于该命名空间的键，原样保留。
    #[serde(default)]
    other: BTreeMap<String, SettingValue>,
}

pub fn encode_settings_ron(store: &dyn SettingsStore, namespace: &str) -> Result<String, FormatError> {
    let prefix = format!("{namespace}/");
    let mut actions: BTreeMap<String, BTreeMap<String, SettingValue>> = BTreeMap::new();
    let mut other = BTreeMap::new();
    for key in store.keys() {
        let Some(value) = store.get(&key) else {
            continue;
        };
        let nested = key
            .strip_prefix(&prefix)
            .and_then(|rest| rest.split_once('/'))
            .filter(|(action, name)| !action.is_empty() && !name.is_empty());
        match nested {
            Some((action, name)) => {
                actions
                    .entry(action.to_string())
                    .or_default()
                    .insert(name.to_string(), value);
            }
            None => {
                other.insert(key, value);
            }
        }
    }
    let file = SettingsFileV2 {
        version: SETTINGS_FILE_VERSION,
        namespace: namespace.to_string(),
        actions,
        other,
    };
    Ok(ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())?)
}

pub fn decode_settings_ron(text: &str) -> Result<MemorySettings, FormatError> {
    // 最新版本：V2（按动作分组）
    if let Ok(v2) = ron::from_str::<SettingsFileV2>(text) {
        if v2.version > SETTINGS_FILE_VERSION {
            return Err(FormatError::Version {
                kind: "settings",
                version: v2.version,
            });
        }
        let nested = v2.actions.into_iter().flat_map(|(action, values)| {
            let namespace = v2.namespace.clone();
            values
                .into_iter()
                .map(move |(name, value)| (settings_key(&namespace, &action, &name), value))
        });
        return Ok(nested.chain(v2.other).collect());
    }

    // 兼容 V1：扁平键值
    let v1 = ron::from_str::<SettingsFileV1>(text)?;
    Ok(v1.values.into_iter().collect())
}

// ---- 图层文件 ----

#[derive(Serialize, Deserialize)]
struct LayerFileV1 {
    version: u32,
    name: String,
    crs: Crs,
    geometry_type: GeometryCategory,
    #[serde(default)]
    fields: Vec<Field>,
    features: Vec<Feature>,
    /// 要素内容的 blake3 指纹（十六进制）。
    #[serde(default)]
    fingerprint: String,
}

/// 已提交要素的指纹：顺序、几何、属性任何变化都会改变它。
pub fn features_fingerprint(features: &BTreeMap<FeatureId, Feature>) -> String {
    let mut hasher = blake3::Hasher::new();
    for feature in features.values() {
        // Debug 输出对 f64 是精确往返的
        hasher.update(format!("{feature:?}\n").as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub fn layer_fingerprint(layer: &VectorLayer) -> String {
    features_fingerprint(layer.committed_features())
}

/// 编码图层的已提交数据（未提交的编辑缓冲区不写出）。
pub fn encode_layer_ron(layer: &VectorLayer) -> Result<String, FormatError> {
    let file = LayerFileV1 {
        version: LAYER_FILE_VERSION,
        name: layer.name.clone(),
        crs: layer.crs,
        geometry_type: layer.geometry_type,
        fields: layer.fields.clone(),
        features: layer.committed_features().values().cloned().collect(),
        fingerprint: layer_fingerprint(layer),
    };
    Ok(ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())?)
}

pub fn decode_layer_ron(text: &str, id: LayerId) -> Result<VectorLayer, FormatError> {
    let file = ron::from_str::<LayerFileV1>(text)?;
    if file.version > LAYER_FILE_VERSION {
        return Err(FormatError::Version {
            kind: "layer",
            version: file.version,
        });
    }
    let mut layer = VectorLayer::new(id, file.name, file.geometry_type, file.crs).with_fields(file.fields);
    layer.load_features(file.features);
    if !file.fingerprint.is_empty() {
        let actual = layer_fingerprint(&layer);
        if actual != file.fingerprint {
            warn!(layer = %layer.name, "layer file fingerprint mismatch, data was edited outside the editor");
        }
    }
    Ok(layer)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use vecmap_core::geometry::{Geometry, Point};
    use vecmap_core::layer::{AttributeValue, Attributes, FieldKind};

    fn sample_layer() -> VectorLayer {
        let mut layer = VectorLayer::new(LayerId(4), "wells", GeometryCategory::Point, Crs::WGS84)
            .with_fields(vec![Field::new("depth", FieldKind::Float)]);
        let attributes: Attributes = [("depth".to_string(), AttributeValue::Float(12.5))].into();
        layer.add_committed(Some(Geometry::Point(Point::new(13.4, 52.5))), attributes);
        layer.add_committed(None, Attributes::new());
        layer
    }

    #[test]
    fn settings_are_grouped_by_action() {
        let store = MemorySettings::new()
            .with("MapActions/zoom_to_point/zoom_radius", 250.0)
            .with("MapActions/zoom_to_point/enabled", false)
            .with("MapActions/snap_point_to_line/snap_method", "exact")
            .with("Window/width", 1280_i64);

        let text = encode_settings_ron(&store, "MapActions").unwrap();
        assert!(text.contains("zoom_to_point"));
        assert!(!text.contains("MapActions/zoom_to_point"));

        let decoded = decode_settings_ron(&text).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn flat_v1_settings_still_load() {
        let text = r#"(values: {"MapActions/rotate_line/confirm_before_rotate": Bool(true)})"#;
        let decoded = decode_settings_ron(text).unwrap();
        assert_eq!(
            decoded.get("MapActions/rotate_line/confirm_before_rotate"),
            Some(SettingValue::Bool(true))
        );
    }

    #[test]
    fn newer_settings_version_is_refused() {
        let text = r#"(version: 9, namespace: "MapActions", actions: {})"#;
        assert!(matches!(
            decode_settings_ron(text),
            Err(FormatError::Version { version: 9, .. })
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(decode_settings_ron("not ron at all"), Err(FormatError::Parse(_))));
    }

    #[test]
    fn layer_file_keeps_ids_and_attributes() {
        let layer = sample_layer();
        let text = encode_layer_ron(&layer).unwrap();
        let decoded = decode_layer_ron(&text, LayerId(9)).unwrap();

        assert_eq!(decoded.id, LayerId(9));
        assert_eq!(decoded.name, "wells");
        assert_eq!(decoded.crs, Crs::WGS84);
        assert_eq!(decoded.fields, layer.fields);
        assert_eq!(decoded.committed_features(), layer.committed_features());
        assert_eq!(layer_fingerprint(&decoded), layer_fingerprint(&layer));
    }

    #[test]
    fn pending_edits_are_not_exported() {
        let mut layer = sample_layer();
        let before = layer_fingerprint(&layer);
        layer.start_editing().unwrap();
        layer
            .update_geometry(1, Geometry::Point(Point::new(0.0, 0.0)))
            .unwrap();

        let decoded = decode_layer_ron(&encode_layer_ron(&layer).unwrap(), LayerId(1)).unwrap();
        assert_eq!(layer_fingerprint(&decoded), before);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let mut layer = sample_layer();
        let before = layer_fingerprint(&layer);
        layer.start_editing().unwrap();
        layer
            .set_attribute(1, "depth", AttributeValue::Float(12.6))
            .unwrap();
        layer.commit_changes().unwrap();
        assert_ne!(layer_fingerprint(&layer), before);
    }
}
