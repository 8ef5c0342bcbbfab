//! 与 workspace/assets 路径相关的工具函数。

use std::path::PathBuf;

/// workspace 的 `assets/` 目录绝对路径。
///
/// `CARGO_MANIFEST_DIR` 指向 `crates/vecmap_editor`，因此向上两级即可到 workspace 根。
pub fn workspace_assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("assets")
}

/// 相对路径按 assets 目录解析，绝对路径原样返回。
pub fn resolve_asset_path(path: &str) -> PathBuf {
    let p = PathBuf::from(path);
    if p.is_absolute() {
        p
    } else {
        workspace_assets_dir().join(p)
    }
}
