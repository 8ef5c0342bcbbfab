#![forbid(unsafe_code)]

// 纯逻辑 crate：地图右键动作框架。
//
// - 能力描述 + 注册表：动作声明自己适用的作用域与几何类型
// - 定位器 + 调度器：右键点击 → 候选要素 → 菜单 → 执行
// - 编辑会话包装：进入/提交/回滚/退出，保证图层状态一致
// - 内置动作：移动、旋转、缩放、平滑、吸附、缩放视图、量测、派生图层
//
// 宿主程序（画布、对话框、设置存储）通过 trait 端口接入。

pub mod action;
pub mod actions;
pub mod algorithms;
pub mod capability;
pub mod context;
pub mod crs;
pub mod dispatcher;
pub mod edit;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod locator;
pub mod notify;
pub mod project;
pub mod registry;
pub mod settings;

pub use action::{ActionOutcome, MapAction};
pub use capability::{CapabilityDeclaration, CapabilityDescriptor, GeometryTag, Scope};
pub use context::{ActionEnv, CanvasState, CanvasView, ClickContext, LayerExporter, MapCanvas};
pub use crs::{Crs, MapUnits};
pub use dispatcher::{DispatchConfig, Dispatcher, MenuEntry};
pub use error::ActionError;
pub use geometry::{Extent, Geometry, GeometryCategory, Point};
pub use layer::{LayerId, MapLayer, VectorLayer};
pub use notify::{DialogForm, DialogValues, NoticeLevel, Notifier, Prompt};
pub use project::Project;
pub use registry::ActionRegistry;
pub use settings::{MemorySettings, SettingValue, SettingsStore};
