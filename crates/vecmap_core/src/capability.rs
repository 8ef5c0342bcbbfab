//! 能力描述：动作声明自己能在哪些作用域、哪些几何类别上运行，以及有哪些设置。
//!
//! 动作提供 `CapabilityDeclaration`（几何类别用字符串表示），
//! 注册表用 `CapabilityDescriptor::try_from` 校验成强类型描述。

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::geometry::GeometryCategory;
use crate::settings::SettingValue;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Universal,
    Layer,
    Feature,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Universal => "universal",
            Self::Layer => "layer",
            Self::Feature => "feature",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "universal" => Ok(Self::Universal),
            "layer" => Ok(Self::Layer),
            "feature" => Ok(Self::Feature),
            other => Err(format!("unknown scope `{other}`")),
        }
    }
}

/// 几何类别标签（闭合词表，大小写敏感）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryTag {
    Category(GeometryCategory),
    Universal,
}

impl GeometryTag {
    pub const UNIVERSAL: &'static str = "universal";

    pub fn parse(tag: &str) -> Option<GeometryTag> {
        if tag == Self::UNIVERSAL {
            return Some(Self::Universal);
        }
        GeometryCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == tag)
            .map(Self::Category)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category(c) => c.as_str(),
            Self::Universal => Self::UNIVERSAL,
        }
    }

    pub fn is_concrete(self) -> bool {
        matches!(self, Self::Category(_))
    }
}

impl From<GeometryCategory> for GeometryTag {
    fn from(c: GeometryCategory) -> Self {
        Self::Category(c)
    }
}

impl fmt::Display for GeometryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Bool,
    Int,
    Float,
    Str,
    Choice,
    Color,
    Path,
}

/// 设置表中的一项。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SettingSpec {
    pub kind: SettingKind,
    pub default: SettingValue,
    pub label: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub step: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub options: Vec<String>,
}

impl SettingSpec {
    fn with_kind(kind: SettingKind, default: SettingValue, label: &str) -> Self {
        Self {
            kind,
            default,
            label: label.to_string(),
            description: String::new(),
            min: None,
            max: None,
            step: None,
            options: Vec::new(),
        }
    }

    pub fn bool(default: bool, label: &str) -> Self {
        Self::with_kind(SettingKind::Bool, SettingValue::Bool(default), label)
    }

    pub fn int(default: i64, label: &str) -> Self {
        Self::with_kind(SettingKind::Int, SettingValue::Int(default), label)
    }

    pub fn float(default: f64, label: &str) -> Self {
        Self::with_kind(SettingKind::Float, SettingValue::Float(default), label)
    }

    pub fn str(default: &str, label: &str) -> Self {
        Self::with_kind(SettingKind::Str, SettingValue::Str(default.to_string()), label)
    }

    pub fn color(default: &str, label: &str) -> Self {
        Self::with_kind(SettingKind::Color, SettingValue::Str(default.to_string()), label)
    }

    pub fn path(default: &str, label: &str) -> Self {
        Self::with_kind(SettingKind::Path, SettingValue::Str(default.to_string()), label)
    }

    pub fn choice(default: &str, options: &[&str], label: &str) -> Self {
        let mut spec =
            Self::with_kind(SettingKind::Choice, SettingValue::Str(default.to_string()), label);
        spec.options = options.iter().map(|o| o.to_string()).collect();
        spec
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// 默认值与类型、上下限、候选项是否自洽。
    fn check(&self) -> Result<(), String> {
        if !self.default.matches_kind(self.kind) {
            return Err(format!(
                "default is {} but kind is {:?}",
                self.default.type_name(),
                self.kind
            ));
        }
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(format!("min {min} is greater than max {max}"));
        }
        if let Some(v) = self.default.as_f64().filter(|_| {
            matches!(self.kind, SettingKind::Int | SettingKind::Float)
        }) {
            if self.min.is_some_and(|min| v < min) || self.max.is_some_and(|max| v > max) {
                return Err(format!("default {v} is outside the declared bounds"));
            }
        }
        if self.kind == SettingKind::Choice {
            if self.options.is_empty() {
                return Err("choice has no options".to_string());
            }
            let default = self.default.as_str().unwrap_or_default();
            if !self.options.iter().any(|o| o == default) {
                return Err(format!("default `{default}` is not one of the options"));
            }
        }
        Ok(())
    }
}

pub type SettingsSchema = IndexMap<String, SettingSpec>;

/// 动作自报的能力声明（未校验）。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityDeclaration {
    pub action_id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub scope: Scope,
    pub supported_scopes: Vec<Scope>,
    pub supported_click_types: Vec<String>,
    pub supported_geometry_types: Vec<String>,
    pub enabled: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub settings: SettingsSchema,
}

impl CapabilityDeclaration {
    /// universal 作用域默认两个类型集合都是 `{universal}`。
    pub fn new(action_id: &str, scope: Scope) -> Self {
        let types = if scope == Scope::Universal {
            vec![GeometryTag::UNIVERSAL.to_string()]
        } else {
            Vec::new()
        };
        Self {
            action_id: action_id.to_string(),
            name: action_id.to_string(),
            category: String::new(),
            description: String::new(),
            scope,
            supported_scopes: vec![scope],
            supported_click_types: types.clone(),
            supported_geometry_types: types,
            enabled: true,
            settings: IndexMap::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// 同时设置点击类型与几何类型。
    pub fn geometry_types(mut self, tags: &[&str]) -> Self {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        self.supported_click_types = tags.clone();
        self.supported_geometry_types = tags;
        self
    }

    pub fn click_types(mut self, tags: &[&str]) -> Self {
        self.supported_click_types = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn supported_scopes(mut self, scopes: &[Scope]) -> Self {
        self.supported_scopes = scopes.to_vec();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn setting(mut self, name: &str, spec: SettingSpec) -> Self {
        self.settings.insert(name.to_string(), spec);
        self
    }
}

/// 校验后的能力描述。只有 `enabled` 在注册后可变。
#[derive(Clone, Debug, PartialEq)]
pub struct CapabilityDescriptor {
    pub action_id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub scope: Scope,
    pub supported_scopes: BTreeSet<Scope>,
    pub supported_click_types: BTreeSet<GeometryTag>,
    pub supported_geometry_types: BTreeSet<GeometryTag>,
    pub enabled: bool,
    pub settings_schema: SettingsSchema,
}

impl CapabilityDescriptor {
    /// 匹配规则：启用 ∧ 作用域相符（或 universal） ∧ 几何类别相符（或 universal）。
    pub fn matches(&self, scope: Scope, tag: GeometryTag) -> bool {
        self.enabled && self.applies_to(scope, tag)
    }

    /// 只看作用域和几何类别，不看 `enabled`。
    pub fn applies_to(&self, scope: Scope, tag: GeometryTag) -> bool {
        (self.scope == Scope::Universal || self.supported_scopes.contains(&scope))
            && (self.supported_geometry_types.contains(&tag)
                || self.supported_geometry_types.contains(&GeometryTag::Universal))
    }

    pub fn accepts_geometry(&self, category: GeometryCategory) -> bool {
        self.supported_geometry_types
            .contains(&GeometryTag::Category(category))
            || self
                .supported_geometry_types
                .contains(&GeometryTag::Universal)
    }
}

fn parse_tags(
    action_id: &str,
    tags: &[String],
) -> Result<BTreeSet<GeometryTag>, ConfigurationError> {
    tags.iter()
        .map(|t| {
            GeometryTag::parse(t).ok_or_else(|| ConfigurationError::UnknownGeometryTag {
                action_id: action_id.to_string(),
                tag: t.clone(),
            })
        })
        .collect()
}

impl TryFrom<CapabilityDeclaration> for CapabilityDescriptor {
    type Error = ConfigurationError;

    fn try_from(decl: CapabilityDeclaration) -> Result<Self, Self::Error> {
        let id = decl.action_id.trim();
        if id.is_empty() {
            return Err(ConfigurationError::EmptyActionId);
        }
        let click_types = parse_tags(id, &decl.supported_click_types)?;
        let geometry_types = parse_tags(id, &decl.supported_geometry_types)?;
        let mismatch = |reason: &str| ConfigurationError::ScopeMismatch {
            action_id: id.to_string(),
            scope: decl.scope,
            reason: reason.to_string(),
        };

        let mut supported_scopes: BTreeSet<Scope> = decl.supported_scopes.iter().copied().collect();
        if supported_scopes.is_empty() {
            supported_scopes.insert(decl.scope);
        }
        if !supported_scopes.contains(&decl.scope) {
            return Err(mismatch("supported scopes do not include the primary scope"));
        }

        let universal_only: BTreeSet<GeometryTag> = [GeometryTag::Universal].into();
        match decl.scope {
            Scope::Universal => {
                if click_types != universal_only || geometry_types != universal_only {
                    return Err(mismatch(
                        "universal actions must declare exactly {universal} geometry and click types",
                    ));
                }
            }
            Scope::Layer | Scope::Feature => {
                if !geometry_types.iter().any(|t| t.is_concrete()) {
                    return Err(mismatch("no concrete geometry category declared"));
                }
                if !click_types.is_empty() && !click_types.iter().any(|t| t.is_concrete()) {
                    return Err(mismatch("no concrete click type declared"));
                }
            }
        }

        for (name, spec) in &decl.settings {
            spec.check()
                .map_err(|reason| ConfigurationError::InvalidSetting {
                    action_id: id.to_string(),
                    setting: name.clone(),
                    reason,
                })?;
        }

        Ok(Self {
            action_id: id.to_string(),
            name: decl.name,
            category: decl.category,
            description: decl.description,
            scope: decl.scope,
            supported_scopes,
            supported_click_types: if click_types.is_empty() {
                geometry_types.clone()
            } else {
                click_types
            },
            supported_geometry_types: geometry_types,
            enabled: decl.enabled,
            settings_schema: decl.settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_case_sensitive() {
        assert_eq!(
            GeometryTag::parse("polygon"),
            Some(GeometryTag::Category(GeometryCategory::Polygon))
        );
        assert_eq!(GeometryTag::parse("Polygon"), None);
        assert_eq!(GeometryTag::parse("universal"), Some(GeometryTag::Universal));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let decl = CapabilityDeclaration::new("zoom_to_blob", Scope::Feature)
            .geometry_types(&["polygon", "blob"]);
        let err = CapabilityDescriptor::try_from(decl).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownGeometryTag {
                action_id: "zoom_to_blob".into(),
                tag: "blob".into(),
            }
        );
    }

    #[test]
    fn universal_scope_requires_universal_types() {
        let decl = CapabilityDeclaration::new("measure", Scope::Universal).geometry_types(&["point"]);
        assert!(matches!(
            CapabilityDescriptor::try_from(decl),
            Err(ConfigurationError::ScopeMismatch { .. })
        ));
        let ok = CapabilityDeclaration::new("measure", Scope::Universal);
        assert!(CapabilityDescriptor::try_from(ok).is_ok());
    }

    #[test]
    fn feature_scope_requires_a_concrete_category() {
        let decl = CapabilityDeclaration::new("rotate", Scope::Feature);
        assert!(matches!(
            CapabilityDescriptor::try_from(decl),
            Err(ConfigurationError::ScopeMismatch { .. })
        ));
        let decl = CapabilityDeclaration::new("rotate", Scope::Feature).geometry_types(&["universal"]);
        assert!(CapabilityDescriptor::try_from(decl).is_err());
    }

    #[test]
    fn inconsistent_setting_defaults_are_rejected() {
        let decl = CapabilityDeclaration::new("zoom", Scope::Feature)
            .geometry_types(&["point"])
            .setting("radius", SettingSpec::float(10.0, "Radius").range(50.0, 5000.0));
        assert!(matches!(
            CapabilityDescriptor::try_from(decl),
            Err(ConfigurationError::InvalidSetting { .. })
        ));
        let decl = CapabilityDeclaration::new("move", Scope::Feature)
            .geometry_types(&["point"])
            .setting("mode", SettingSpec::choice("jump", &["copy", "move"], "Mode"));
        assert!(CapabilityDescriptor::try_from(decl).is_err());
    }

    #[test]
    fn matching_honours_scope_and_universal_types() {
        let feature = CapabilityDescriptor::try_from(
            CapabilityDeclaration::new("rotate_line", Scope::Feature).geometry_types(&["line"]),
        )
        .unwrap();
        let line = GeometryTag::Category(GeometryCategory::Line);
        let poly = GeometryTag::Category(GeometryCategory::Polygon);
        assert!(feature.matches(Scope::Feature, line));
        assert!(!feature.matches(Scope::Layer, line));
        assert!(!feature.matches(Scope::Feature, poly));

        let universal =
            CapabilityDescriptor::try_from(CapabilityDeclaration::new("measure", Scope::Universal))
                .unwrap();
        assert!(universal.matches(Scope::Feature, poly));
        assert!(universal.matches(Scope::Universal, GeometryTag::Universal));

        let mut disabled = feature.clone();
        disabled.enabled = false;
        assert!(!disabled.matches(Scope::Feature, line));
    }
}
