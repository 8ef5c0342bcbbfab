//! 矢量地图编辑器：Bevy 画布 + 右键动作菜单。

mod editor;

pub use editor::run;
