//! 编辑事务包装：所有会修改图层的动作都经由这里进出编辑会话。
//!
//! 状态：`NotEditing → Entering → Editing → (Committing | RollingBack) → Exiting → Done`
//!
//! 规则：
//! - 进入前图层已在编辑中（用户打开的会话）：记录 `entered_by_wrapper = false`，
//!   之后任何路径都不会关闭它。
//! - 由包装器打开的会话只由包装器关闭。
//! - `exit` 可重复调用，第二次起为 no-op。
//! - 提交失败不会自动回滚，由调用方决定。
//! - 加入用户会话时记下当时的缓冲区，`rollback` 回到这份快照而不是已提交数据，
//!   用户自己未提交的修改不受影响。

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{CommitError, EditModeError};
use crate::layer::{Feature, FeatureId, LayerId, VectorLayer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditState {
    NotEditing,
    Entering,
    Editing,
    Committing,
    RollingBack,
    Exiting,
    Done,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EditSessionRecord {
    pub layer: LayerId,
    pub was_editable_before: bool,
    pub entered_by_wrapper: bool,
    state: EditState,
    /// 加入用户会话时的缓冲区内容；`None` 表示回滚到已提交数据。
    baseline: Option<BTreeMap<FeatureId, Feature>>,
}

impl EditSessionRecord {
    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EditState::Done
    }
}

pub fn enter(layer: &mut VectorLayer) -> Result<EditSessionRecord, EditModeError> {
    let mut record = EditSessionRecord {
        layer: layer.id,
        was_editable_before: layer.is_editable(),
        entered_by_wrapper: false,
        state: EditState::NotEditing,
        baseline: None,
    };
    if record.was_editable_before {
        record.baseline = layer.pending_features().cloned();
        record.state = EditState::Editing;
        debug!(layer = %layer.name, "joined existing edit session");
        return Ok(record);
    }

    record.state = EditState::Entering;
    layer
        .start_editing()
        .map_err(|source| EditModeError::Provider {
            layer: layer.name.clone(),
            source,
        })?;
    record.entered_by_wrapper = true;
    record.state = EditState::Editing;
    debug!(layer = %layer.name, provider = layer.provider_name(), "opened edit session");
    Ok(record)
}

/// 持久化缓冲区。失败时状态回到 `Editing`，修改仍在缓冲区。
pub fn commit(layer: &mut VectorLayer, record: &mut EditSessionRecord) -> Result<(), CommitError> {
    if record.state != EditState::Editing {
        return Err(CommitError::NoSession(layer.name.clone()));
    }
    record.state = EditState::Committing;
    let result = layer.commit_changes();
    record.state = EditState::Editing;
    match &result {
        // 已提交数据成为新的基线
        Ok(()) => record.baseline = None,
        Err(err) => warn!(layer = %layer.name, %err, "commit failed"),
    }
    result
}

/// 丢弃包装器期间的未提交修改；任何状态下调用都安全。
pub fn rollback(layer: &mut VectorLayer, record: &mut EditSessionRecord) {
    if record.state != EditState::Editing {
        return;
    }
    record.state = EditState::RollingBack;
    match &record.baseline {
        Some(baseline) => layer.rollback_to(baseline),
        None => layer.rollback(),
    }
    record.state = EditState::Editing;
    debug!(layer = %layer.name, "rolled back pending edits");
}

/// 只关闭包装器自己打开的会话。
pub fn exit(layer: &mut VectorLayer, record: &mut EditSessionRecord) {
    if record.state == EditState::Done {
        return;
    }
    if layer.id != record.layer {
        warn!(layer = %layer.name, record_layer = %record.layer, "edit record belongs to another layer, not exiting");
        return;
    }
    record.state = EditState::Exiting;
    if record.entered_by_wrapper {
        layer.end_editing();
        debug!(layer = %layer.name, "closed edit session");
    }
    record.state = EditState::Done;
}

/// 把包装器打开的会话交给用户：之后 `exit` 不再关闭它，未提交的修改保留在缓冲区。
pub fn release_to_user(record: &mut EditSessionRecord) {
    record.entered_by_wrapper = false;
    record.baseline = None;
}

/// RAII 形式：`Drop` 时执行 `exit`。
pub struct EditGuard<'l> {
    layer: &'l mut VectorLayer,
    record: EditSessionRecord,
}

impl<'l> EditGuard<'l> {
    pub fn enter(layer: &'l mut VectorLayer) -> Result<Self, EditModeError> {
        let record = enter(layer)?;
        Ok(Self { layer, record })
    }

    pub fn record(&self) -> &EditSessionRecord {
        &self.record
    }

    pub fn layer(&self) -> &VectorLayer {
        &*self.layer
    }

    pub fn layer_mut(&mut self) -> &mut VectorLayer {
        &mut *self.layer
    }

    pub fn commit(&mut self) -> Result<(), CommitError> {
        commit(&mut *self.layer, &mut self.record)
    }

    pub fn rollback(&mut self) {
        rollback(&mut *self.layer, &mut self.record);
    }

    pub fn release_to_user(&mut self) {
        release_to_user(&mut self.record);
    }

    pub fn exit(mut self) -> EditSessionRecord {
        exit(&mut *self.layer, &mut self.record);
        self.record.clone()
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        exit(&mut *self.layer, &mut self.record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::geometry::{Geometry, GeometryCategory, Point};
    use crate::layer::{Attributes, MemoryProvider};

    fn layer() -> VectorLayer {
        let mut l = VectorLayer::new(LayerId(3), "pts", GeometryCategory::Point, Crs::default());
        l.add_committed(Some(Geometry::Point(Point::new(0.0, 0.0))), Attributes::new());
        l
    }

    #[test]
    fn wrapper_closes_only_its_own_session() {
        let mut l = layer();
        let mut rec = enter(&mut l).unwrap();
        assert!(rec.entered_by_wrapper);
        exit(&mut l, &mut rec);
        assert!(!l.is_editable());

        l.start_editing().unwrap();
        let mut rec = enter(&mut l).unwrap();
        assert!(rec.was_editable_before);
        assert!(!rec.entered_by_wrapper);
        exit(&mut l, &mut rec);
        assert!(l.is_editable());
    }

    #[test]
    fn failed_enter_produces_no_record() {
        let mut l = layer().with_provider(Box::new(MemoryProvider::read_only()));
        assert!(matches!(enter(&mut l), Err(EditModeError::Provider { .. })));
        assert!(!l.is_editable());
    }

    #[test]
    fn guard_exits_on_drop() {
        let mut l = layer();
        {
            let mut guard = EditGuard::enter(&mut l).unwrap();
            guard
                .layer_mut()
                .update_geometry(1, Geometry::Point(Point::new(5.0, 5.0)))
                .unwrap();
        }
        // 未提交的修改随会话一起丢弃
        assert!(!l.is_editable());
        assert_eq!(
            l.feature(1).and_then(|f| f.geometry.clone()),
            Some(Geometry::Point(Point::new(0.0, 0.0)))
        );
    }

    #[test]
    fn released_session_stays_open_with_pending_edits() {
        let mut l = layer();
        {
            let mut guard = EditGuard::enter(&mut l).unwrap();
            guard
                .layer_mut()
                .update_geometry(1, Geometry::Point(Point::new(5.0, 5.0)))
                .unwrap();
            guard.release_to_user();
        }
        assert!(l.is_editable());
        assert!(l.is_modified());
    }

    #[test]
    fn exit_ignores_a_record_from_another_layer() {
        let mut own = layer();
        let mut other = VectorLayer::new(LayerId(8), "other", GeometryCategory::Point, Crs::default());
        let mut rec = enter(&mut own).unwrap();

        exit(&mut other, &mut rec);
        assert_eq!(rec.state(), EditState::Editing);
        assert!(own.is_editable());

        exit(&mut own, &mut rec);
        assert!(rec.is_done());
        assert!(!own.is_editable());
    }

    #[test]
    fn exit_is_idempotent() {
        let mut l = layer();
        let mut rec = enter(&mut l).unwrap();
        exit(&mut l, &mut rec);
        assert_eq!(rec.state(), EditState::Done);
        // 用户随后自己打开了会话，重复 exit 不能把它关掉
        l.start_editing().unwrap();
        exit(&mut l, &mut rec);
        assert!(l.is_editable());
    }
}
