//! 설정 파일 위치와 JSON 읽기
//!
//! 설정은 두 범위(scope)에서 읽습니다:
//! - Global: `{config_dir}/counsel/`
//! - Project: 현재 작업 디렉토리의 `.counsel/`
//!
//! 읽기 전용입니다. 파일이 없으면 `None`, 읽거나 파싱하지 못하면
//! 범위와 경로를 담은 `Error::Config`를 반환합니다.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "counsel";

/// Where a config file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Global,
    Project,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => write!(f, "global"),
            ConfigScope::Project => write!(f, "project"),
        }
    }
}

/// Read-only view of one config directory
#[derive(Debug, Clone)]
pub struct JsonStore {
    scope: ConfigScope,
    dir: PathBuf,
}

impl JsonStore {
    pub fn at(scope: ConfigScope, dir: impl Into<PathBuf>) -> Self {
        Self {
            scope,
            dir: dir.into(),
        }
    }

    pub fn global() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("No user config directory on this platform".into()))?;
        Ok(Self::at(ConfigScope::Global, config_dir.join(APP_DIR)))
    }

    /// `.counsel/` under `root`
    pub fn project(root: impl AsRef<Path>) -> Self {
        Self::at(
            ConfigScope::Project,
            root.as_ref().join(format!(".{}", APP_DIR)),
        )
    }

    pub fn current_project() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Cannot resolve working directory: {}", e)))?;
        Ok(Self::project(cwd))
    }

    pub fn scope(&self) -> ConfigScope {
        self.scope
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Parse `filename` in this scope; `Ok(None)` when it does not exist
    pub fn read<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        read_json(&path).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} config: {}", self.scope, msg)),
            other => other,
        })
    }
}

/// Parse the JSON file at `path`; `Ok(None)` when it does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Config(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}
