use crate::api::UrbanApi;
use crate::config::AppConfig;
use crate::store::fs_backend::FsBackend;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    // Keeps the directory alive until the test is done
    pub _temp_dir: TempDir,
    pub api: UrbanApi<FsBackend>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let api = UrbanApi::new(FsBackend::new(root.clone()), config);
        Self {
            _temp_dir: temp_dir,
            api,
            root,
        }
    }

    /// A second API over the same directory, as after a restart.
    pub fn reopen(&self) -> UrbanApi<FsBackend> {
        UrbanApi::new(FsBackend::new(self.root.clone()), self.api.config().clone())
    }
}
