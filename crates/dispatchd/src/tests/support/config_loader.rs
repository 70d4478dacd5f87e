//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use dispatchd_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader binding an ephemeral loopback port and logging under a temporary
/// directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    log_dir: Arc<TempDir>,
    port: u16,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for logs");
        Self {
            log_dir: Arc::new(dir),
            port: 0,
        }
    }

    /// Uses a fixed port instead of an ephemeral one.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn log_path(&self) -> Utf8PathBuf {
        let path = self.log_dir.path().join("dispatchd-output.log");
        Utf8PathBuf::from_path_buf(path).expect("temporary log path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            host: "127.0.0.1".to_owned(),
            port: self.port,
            log_path: self.log_path(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an invalid port on the CLI.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("dispatchd"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
