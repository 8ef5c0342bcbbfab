//! 错误分类：注册期配置错误、上下文错误、编辑会话错误、变更/提交错误等。

use thiserror::Error;

use crate::capability::Scope;
use crate::layer::{FeatureId, LayerId};
use crate::notify::NoticeLevel;

/// 注册期错误：该动作被排除，其它动作继续注册。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("action id must not be empty")]
    EmptyActionId,
    #[error("duplicate action id `{0}`")]
    DuplicateActionId(String),
    #[error("action `{action_id}` declares unknown geometry tag `{tag}`")]
    UnknownGeometryTag { action_id: String, tag: String },
    #[error("action `{action_id}` has inconsistent scope `{scope}`: {reason}")]
    ScopeMismatch {
        action_id: String,
        scope: Scope,
        reason: String,
    },
    #[error("action `{action_id}` setting `{setting}` is invalid: {reason}")]
    InvalidSetting {
        action_id: String,
        setting: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn action_id(&self) -> Option<&str> {
        match self {
            Self::EmptyActionId => None,
            Self::DuplicateActionId(id) => Some(id),
            Self::UnknownGeometryTag { action_id, .. }
            | Self::ScopeMismatch { action_id, .. }
            | Self::InvalidSetting { action_id, .. } => Some(action_id),
        }
    }
}

/// 数据源拒绝操作（只读、写入失败等）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditModeError {
    #[error("layer {0} not found")]
    LayerNotFound(LayerId),
    #[error("layer {0} is not a vector layer")]
    NotVector(LayerId),
    #[error("layer `{layer}` cannot enter edit mode: {source}")]
    Provider {
        layer: String,
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("layer `{0}` is not in an edit session")]
    NotEditable(String),
    #[error("feature {feature} not found in layer `{layer}`")]
    FeatureNotFound { layer: String, feature: FeatureId },
    #[error("geometry type `{got}` does not fit layer `{layer}` ({expected})")]
    GeometryMismatch {
        layer: String,
        expected: String,
        got: String,
    },
    #[error(transparent)]
    Rejected(#[from] ProviderError),
}

/// 提交失败：内存中的修改仍在编辑缓冲区里，未回滚。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("layer `{0}` has no open edit session")]
    NoSession(String),
    #[error("commit to layer `{layer}` failed: {source}")]
    Provider {
        layer: String,
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("geometry is empty")]
    Empty,
    #[error("operation not supported for {0} geometry")]
    Unsupported(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrsError {
    #[error("no transformation from {from} to {to}")]
    Unsupported { from: String, to: String },
    #[error("coordinate ({x}, {y}) is outside the valid range of {crs}")]
    OutOfRange { crs: String, x: String, y: String },
    #[error("cannot parse CRS `{0}`")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("export of layer `{layer}` failed: {message}")]
pub struct ExportError {
    pub layer: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
}

/// 动作执行错误。由 `MapAction::execute` 统一转成通知，不会冒泡到调度器。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// 上下文缺失：在任何编辑会话操作之前失败。
    #[error("{0}")]
    Context(String),
    #[error(transparent)]
    EditMode(#[from] EditModeError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error("{}", commit_message(.source, .rolled_back))]
    Commit {
        #[source]
        source: CommitError,
        rolled_back: bool,
    },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Crs(#[from] CrsError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

fn commit_message(source: &CommitError, rolled_back: &bool) -> String {
    if *rolled_back {
        format!("{source}; the changes were rolled back")
    } else {
        format!("{source}; the changes remain uncommitted in the open edit session")
    }
}

impl ActionError {
    pub fn context(message: impl Into<String>) -> Self {
        Self::Context(message.into())
    }

    /// 上下文缺失、或提交失败但修改仍保留时只是警告，其余为错误。
    pub fn level(&self) -> NoticeLevel {
        match self {
            Self::Context(_) => NoticeLevel::Warning,
            Self::Commit {
                rolled_back: false,
                ..
            } => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }

    /// 通知标题。
    pub fn title(&self) -> &'static str {
        match self {
            Self::Context(_) => "Nothing to act on",
            Self::EditMode(_) => "Edit mode unavailable",
            Self::Mutation(_) => "Edit rejected",
            Self::Commit { .. } => "Commit failed",
            Self::Geometry(_) => "Geometry error",
            Self::Crs(_) => "Coordinate system error",
            Self::Export(_) => "Export failed",
        }
    }
}
