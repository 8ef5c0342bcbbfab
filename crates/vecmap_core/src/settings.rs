//! 动作设置：值类型、键值存储接口、按命名空间读取。
//!
//! 存储键格式：`<namespace>/<action_id>/<setting_name>`。

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::capability::{SettingKind, SettingsSchema};

pub const DEFAULT_NAMESPACE: &str = "MapActions";

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
        }
    }

    /// 宽松转换：存储层可能把布尔写成字符串或整数。
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(i) => Some(*i != 0),
            Self::Float(_) => None,
            Self::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn matches_kind(&self, kind: SettingKind) -> bool {
        matches!(
            (kind, self),
            (SettingKind::Bool, Self::Bool(_))
                | (SettingKind::Int, Self::Int(_))
                | (SettingKind::Float, Self::Float(_) | Self::Int(_))
                | (
                    SettingKind::Str | SettingKind::Choice | SettingKind::Color | SettingKind::Path,
                    Self::Str(_)
                )
        )
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for SettingValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

pub fn settings_key(namespace: &str, action_id: &str, name: &str) -> String {
    format!("{namespace}/{action_id}/{name}")
}

/// 外部键值存储端口。
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<SettingValue>;

    fn set(&mut self, key: &str, value: SettingValue);

    fn remove(&mut self, key: &str) -> Option<SettingValue>;

    /// 按字典序返回全部键。
    fn keys(&self) -> Vec<String>;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySettings {
    values: BTreeMap<String, SettingValue>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }
}

impl FromIterator<(String, SettingValue)> for MemorySettings {
    fn from_iter<T: IntoIterator<Item = (String, SettingValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) -> Option<SettingValue> {
        self.values.remove(key)
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// 单个动作的设置读取器。
///
/// 读取顺序：存储中的值 → 设置表里的默认值 → 调用方给的默认值。
/// 数值会被夹到设置表声明的上下限内；选择项不在候选列表里时回退默认值。
pub struct ActionSettings<'a> {
    store: &'a dyn SettingsStore,
    namespace: &'a str,
    action_id: &'a str,
    schema: Option<&'a SettingsSchema>,
}

impl<'a> ActionSettings<'a> {
    pub fn new(store: &'a dyn SettingsStore, namespace: &'a str, action_id: &'a str) -> Self {
        Self {
            store,
            namespace,
            action_id,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: &'a SettingsSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn action_id(&self) -> &str {
        self.action_id
    }

    pub fn key(&self, name: &str) -> String {
        settings_key(self.namespace, self.action_id, name)
    }

    fn stored(&self, name: &str) -> Option<SettingValue> {
        self.store.get(&self.key(name))
    }

    fn schema_default(&self, name: &str) -> Option<&SettingValue> {
        self.schema.and_then(|s| s.get(name)).map(|spec| &spec.default)
    }

    fn clamp(&self, name: &str, v: f64) -> f64 {
        let Some(spec) = self.schema.and_then(|s| s.get(name)) else {
            return v;
        };
        let v = spec.min.map_or(v, |min| v.max(min));
        spec.max.map_or(v, |max| v.min(max))
    }

    pub fn get_setting(&self, name: &str, default: SettingValue) -> SettingValue {
        self.stored(name)
            .or_else(|| self.schema_default(name).cloned())
            .unwrap_or(default)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.stored(name)
            .and_then(|v| v.as_bool())
            .or_else(|| self.schema_default(name).and_then(SettingValue::as_bool))
            .unwrap_or(default)
    }

    pub fn get_f64(&self, name: &str, default: f64) -> f64 {
        let v = self
            .stored(name)
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite())
            .or_else(|| self.schema_default(name).and_then(SettingValue::as_f64))
            .unwrap_or(default);
        self.clamp(name, v)
    }

    pub fn get_i64(&self, name: &str, default: i64) -> i64 {
        let v = self
            .stored(name)
            .and_then(|v| v.as_i64())
            .or_else(|| self.schema_default(name).and_then(SettingValue::as_i64))
            .unwrap_or(default);
        self.clamp(name, v as f64).round() as i64
    }

    pub fn get_string(&self, name: &str, default: &str) -> String {
        self.stored(name)
            .map(|v| v.to_string())
            .or_else(|| self.schema_default(name).map(|v| v.to_string()))
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_choice(&self, name: &str, default: &str) -> String {
        let fallback = self
            .schema_default(name)
            .and_then(SettingValue::as_str)
            .unwrap_or(default)
            .to_string();
        let options = self
            .schema
            .and_then(|s| s.get(name))
            .map(|spec| spec.options.as_slice())
            .unwrap_or_default();
        match self.stored(name) {
            Some(SettingValue::Str(s)) if options.is_empty() || options.contains(&s) => s,
            _ => fallback,
        }
    }
}
