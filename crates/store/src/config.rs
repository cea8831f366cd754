use std::path::PathBuf;
use std::sync::OnceLock;

static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Sets the directory holding the SQLite database.
///
/// # Logic
/// The first call wins; later calls are ignored so a test's temp dir cannot
/// be swapped out under a running store.
///
/// # Arguments
/// * `path` - data root directory.
pub fn set_root_dir(path: PathBuf) {
    if ROOT_DIR.set(path).is_err() {
        tracing::debug!("Store root dir already set, ignoring override");
    }
}

/// Returns the configured data root, `data` by default.
pub(crate) fn get_root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"))
}
