//! 图层模型：要素、属性、矢量图层（含编辑缓冲区）与数据源接口。
//!
//! 编辑会话语义：
//! - `start_editing` 打开编辑缓冲区（已提交要素的副本）。
//! - 变更只作用于缓冲区；不在编辑会话中时变更返回 `MutationError::NotEditable`。
//! - `commit_changes` 通过数据源持久化缓冲区；失败时缓冲区原样保留。
//! - `rollback` 丢弃缓冲区中的修改，会话保持打开。
//! - `end_editing` 关闭会话（未提交的修改被丢弃）。

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::error::{CommitError, MutationError, ProviderError};
use crate::geometry::{Extent, Geometry, GeometryCategory};

pub type FeatureId = u64;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AttributeValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(FieldKind::Int),
            Self::Float(_) => Some(FieldKind::Float),
            Self::Text(_) => Some(FieldKind::Text),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

pub type Attributes = BTreeMap<String, AttributeValue>;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    Float,
    Text,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Option<Geometry>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: Attributes,
}

impl Feature {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// 交给数据源校验的一次变更。
#[derive(Clone, Copy, Debug)]
pub enum FeatureChange<'a> {
    Geometry {
        feature: FeatureId,
        geometry: &'a Geometry,
    },
    Attribute {
        feature: FeatureId,
        name: &'a str,
        value: &'a AttributeValue,
    },
    Add(&'a Feature),
    Delete(FeatureId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub editable: bool,
}

/// 数据源：决定图层能否进入编辑、变更是否被接受、以及如何持久化。
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    fn start_editing(&self) -> Result<(), ProviderError> {
        if self.capabilities().editable {
            Ok(())
        } else {
            Err(ProviderError::new(self.name(), "data source is read-only"))
        }
    }

    fn validate_change(&self, _change: FeatureChange<'_>) -> Result<(), ProviderError> {
        Ok(())
    }

    fn persist(&mut self, features: &BTreeMap<FeatureId, Feature>) -> Result<(), ProviderError>;
}

/// 内存数据源：总能持久化（可选只读）。
#[derive(Clone, Debug)]
pub struct MemoryProvider {
    editable: bool,
    commits: usize,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            editable: true,
            commits: 0,
        }
    }

    pub fn read_only() -> Self {
        Self {
            editable: false,
            commits: 0,
        }
    }

    pub fn commits(&self) -> usize {
        self.commits
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            editable: self.editable,
        }
    }

    fn persist(&mut self, _features: &BTreeMap<FeatureId, Feature>) -> Result<(), ProviderError> {
        self.commits += 1;
        Ok(())
    }
}

pub struct VectorLayer {
    pub id: LayerId,
    pub name: String,
    pub crs: Crs,
    pub geometry_type: GeometryCategory,
    pub fields: Vec<Field>,
    pub visible: bool,
    valid: bool,
    features: BTreeMap<FeatureId, Feature>,
    edit_buffer: Option<BTreeMap<FeatureId, Feature>>,
    provider: Box<dyn DataProvider>,
    next_feature_id: FeatureId,
}

impl fmt::Debug for VectorLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorLayer")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("crs", &self.crs)
            .field("geometry_type", &self.geometry_type)
            .field("provider", &self.provider.name())
            .field("features", &self.features.len())
            .field("editing", &self.edit_buffer.is_some())
            .finish()
    }
}

impl VectorLayer {
    pub fn new(
        id: LayerId,
        name: impl Into<String>,
        geometry_type: GeometryCategory,
        crs: Crs,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            crs,
            geometry_type,
            fields: Vec::new(),
            visible: true,
            valid: true,
            features: BTreeMap::new(),
            edit_buffer: None,
            provider: Box::new(MemoryProvider::new()),
            next_feature_id: 1,
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn DataProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 字段不存在时追加。
    pub fn ensure_field(&mut self, field: Field) {
        if self.field(&field.name).is_none() {
            self.fields.push(field);
        }
    }

    /// 直接写入已提交要素（装载数据/构造派生图层用，不经过编辑会话）。
    pub fn add_committed(&mut self, geometry: Option<Geometry>, attributes: Attributes) -> FeatureId {
        let id = self.next_feature_id;
        self.next_feature_id += 1;
        self.features.insert(
            id,
            Feature {
                id,
                geometry,
                attributes,
            },
        );
        id
    }

    /// 按给定 id 装载要素（保持原 id）。
    pub fn load_features<I: IntoIterator<Item = Feature>>(&mut self, features: I) {
        for f in features {
            self.next_feature_id = self.next_feature_id.max(f.id + 1);
            self.features.insert(f.id, f);
        }
    }

    // ---- 读取 ----

    /// 当前可见状态：编辑中读缓冲区，否则读已提交数据。
    fn current(&self) -> &BTreeMap<FeatureId, Feature> {
        self.edit_buffer.as_ref().unwrap_or(&self.features)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.current().values()
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.current().get(&id)
    }

    pub fn feature_count(&self) -> usize {
        self.current().len()
    }

    pub fn committed_features(&self) -> &BTreeMap<FeatureId, Feature> {
        &self.features
    }

    /// 编辑缓冲区（含未提交修改）；不在编辑中时为 `None`。
    pub fn pending_features(&self) -> Option<&BTreeMap<FeatureId, Feature>> {
        self.edit_buffer.as_ref()
    }

    pub fn extent(&self) -> Option<Extent> {
        self.features()
            .filter_map(|f| f.geometry.as_ref().and_then(Geometry::bounds))
            .reduce(|a, b| a.union(&b))
    }

    // ---- 编辑会话 ----

    pub fn is_editable(&self) -> bool {
        self.edit_buffer.is_some()
    }

    pub fn is_modified(&self) -> bool {
        self.edit_buffer
            .as_ref()
            .is_some_and(|buf| *buf != self.features)
    }

    /// 打开编辑会话；已在编辑中时不做任何事。
    pub fn start_editing(&mut self) -> Result<(), ProviderError> {
        if self.edit_buffer.is_some() {
            return Ok(());
        }
        self.provider.start_editing()?;
        self.edit_buffer = Some(self.features.clone());
        Ok(())
    }

    /// 持久化缓冲区，会话保持打开。
    pub fn commit_changes(&mut self) -> Result<(), CommitError> {
        let Some(buffer) = self.edit_buffer.as_ref() else {
            return Err(CommitError::NoSession(self.name.clone()));
        };
        self.provider
            .persist(buffer)
            .map_err(|source| CommitError::Provider {
                layer: self.name.clone(),
                source,
            })?;
        self.features = buffer.clone();
        Ok(())
    }

    /// 丢弃未提交的修改；不在编辑中时为 no-op。
    pub fn rollback(&mut self) {
        if let Some(buffer) = self.edit_buffer.as_mut() {
            buffer.clone_from(&self.features);
        }
    }

    /// 把缓冲区恢复到给定内容；不在编辑中时为 no-op。
    pub fn rollback_to(&mut self, baseline: &BTreeMap<FeatureId, Feature>) {
        if let Some(buffer) = self.edit_buffer.as_mut() {
            buffer.clone_from(baseline);
        }
    }

    pub fn end_editing(&mut self) {
        self.edit_buffer = None;
    }

    // ---- 变更（只在编辑会话中有效） ----

    fn buffer_mut(&mut self) -> Result<&mut BTreeMap<FeatureId, Feature>, MutationError> {
        let name = &self.name;
        self.edit_buffer
            .as_mut()
            .ok_or_else(|| MutationError::NotEditable(name.clone()))
    }

    fn check_geometry(&self, geometry: &Geometry) -> Result<(), MutationError> {
        if self.geometry_type.same_family(geometry.category()) {
            Ok(())
        } else {
            Err(MutationError::GeometryMismatch {
                layer: self.name.clone(),
                expected: self.geometry_type.to_string(),
                got: geometry.category().to_string(),
            })
        }
    }

    pub fn update_geometry(
        &mut self,
        feature: FeatureId,
        geometry: Geometry,
    ) -> Result<(), MutationError> {
        if !self.is_editable() {
            return Err(MutationError::NotEditable(self.name.clone()));
        }
        self.check_geometry(&geometry)?;
        if self.feature(feature).is_none() {
            return Err(MutationError::FeatureNotFound {
                layer: self.name.clone(),
                feature,
            });
        }
        self.provider.validate_change(FeatureChange::Geometry {
            feature,
            geometry: &geometry,
        })?;
        if let Some(f) = self.buffer_mut()?.get_mut(&feature) {
            f.geometry = Some(geometry);
        }
        Ok(())
    }

    pub fn set_attribute(
        &mut self,
        feature: FeatureId,
        name: &str,
        value: AttributeValue,
    ) -> Result<(), MutationError> {
        if !self.is_editable() {
            return Err(MutationError::NotEditable(self.name.clone()));
        }
        if self.feature(feature).is_none() {
            return Err(MutationError::FeatureNotFound {
                layer: self.name.clone(),
                feature,
            });
        }
        self.provider.validate_change(FeatureChange::Attribute {
            feature,
            name,
            value: &value,
        })?;
        if let Some(f) = self.buffer_mut()?.get_mut(&feature) {
            f.attributes.insert(name.to_string(), value);
        }
        Ok(())
    }

    pub fn add_feature(
        &mut self,
        geometry: Geometry,
        attributes: Attributes,
    ) -> Result<FeatureId, MutationError> {
        if !self.is_editable() {
            return Err(MutationError::NotEditable(self.name.clone()));
        }
        self.check_geometry(&geometry)?;
        let feature = Feature {
            id: self.next_feature_id,
            geometry: Some(geometry),
            attributes,
        };
        self.provider.validate_change(FeatureChange::Add(&feature))?;
        let id = feature.id;
        self.buffer_mut()?.insert(id, feature);
        self.next_feature_id += 1;
        Ok(id)
    }

    pub fn delete_feature(&mut self, feature: FeatureId) -> Result<(), MutationError> {
        if !self.is_editable() {
            return Err(MutationError::NotEditable(self.name.clone()));
        }
        if self.feature(feature).is_none() {
            return Err(MutationError::FeatureNotFound {
                layer: self.name.clone(),
                feature,
            });
        }
        self.provider.validate_change(FeatureChange::Delete(feature))?;
        self.buffer_mut()?.remove(&feature);
        Ok(())
    }
}

/// 非矢量图层（底图等），定位器会跳过它。
#[derive(Clone, Debug, PartialEq)]
pub struct RasterLayer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    /// 底图（切换全部图层时可选排除）。
    pub basemap: bool,
}

#[derive(Debug)]
pub enum MapLayer {
    Vector(VectorLayer),
    Raster(RasterLayer),
}

impl MapLayer {
    pub fn id(&self) -> LayerId {
        match self {
            Self::Vector(l) => l.id,
            Self::Raster(l) => l.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Vector(l) => &l.name,
            Self::Raster(l) => &l.name,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            Self::Vector(l) => l.visible,
            Self::Raster(l) => l.visible,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        match self {
            Self::Vector(l) => l.visible = visible,
            Self::Raster(l) => l.visible = visible,
        }
    }

    pub fn is_basemap(&self) -> bool {
        matches!(self, Self::Raster(r) if r.basemap)
    }

    pub fn as_vector(&self) -> Option<&VectorLayer> {
        match self {
            Self::Vector(l) => Some(l),
            Self::Raster(_) => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorLayer> {
        match self {
            Self::Vector(l) => Some(l),
            Self::Raster(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn point_layer() -> VectorLayer {
        let mut layer = VectorLayer::new(
            LayerId(1),
            "points",
            GeometryCategory::Point,
            Crs::WEB_MERCATOR,
        );
        layer.add_committed(Some(Geometry::Point(Point::new(1.0, 2.0))), Attributes::new());
        layer
    }

    #[test]
    fn mutation_outside_session_is_rejected() {
        let mut layer = point_layer();
        let err = layer
            .update_geometry(1, Geometry::Point(Point::new(0.0, 0.0)))
            .unwrap_err();
        assert_eq!(err, MutationError::NotEditable("points".into()));
    }

    #[test]
    fn rollback_restores_committed_state() {
        let mut layer = point_layer();
        let before = layer.committed_features().clone();
        layer.start_editing().unwrap();
        layer
            .update_geometry(1, Geometry::Point(Point::new(9.0, 9.0)))
            .unwrap();
        assert!(layer.is_modified());
        layer.rollback();
        assert!(!layer.is_modified());
        assert!(layer.is_editable());
        layer.end_editing();
        assert_eq!(layer.committed_features(), &before);
    }

    #[test]
    fn commit_keeps_session_open() {
        let mut layer = point_layer();
        layer.start_editing().unwrap();
        let id = layer
            .add_feature(Geometry::Point(Point::new(3.0, 3.0)), Attributes::new())
            .unwrap();
        layer.commit_changes().unwrap();
        assert!(layer.is_editable());
        assert!(layer.committed_features().contains_key(&id));
    }

    #[test]
    fn wrong_geometry_family_is_rejected() {
        let mut layer = point_layer();
        layer.start_editing().unwrap();
        let line = Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        assert!(matches!(
            layer.update_geometry(1, line),
            Err(MutationError::GeometryMismatch { .. })
        ));
        // 多点属于点家族
        assert!(
            layer
                .update_geometry(1, Geometry::MultiPoint(vec![Point::new(0.0, 0.0)]))
                .is_ok()
        );
    }

    #[test]
    fn read_only_provider_refuses_edit_mode() {
        let mut layer = point_layer().with_provider(Box::new(MemoryProvider::read_only()));
        assert!(layer.start_editing().is_err());
        assert!(!layer.is_editable());
    }
}
