use std::path::PathBuf;

use directories::ProjectDirs;

/// Platform data directory, falling back to `./.formula-operator` when the
/// platform has none. `OPERATOR_DATA_DIR` is resolved by the service config.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("ai", "operator", "formula-operator")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".formula-operator"))
}

pub fn database_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("db.sqlite")
}

pub fn local_store_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("local")
}
