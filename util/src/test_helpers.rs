use crate::config::AppConfig;
use std::env;
use tempfile::TempDir;

/// Creates a unique temporary directory, points `STORAGE_ROOT` at it and
/// returns it together with a config loaded from the environment.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
/// Callers mutate the process environment, so tests using this should be `#[serial]`.
pub fn setup_test_storage_root() -> (TempDir, AppConfig) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    unsafe {
        env::set_var("STORAGE_ROOT", &abs);
    }
    let cfg = AppConfig::from_vars();
    (tmp, cfg)
}
