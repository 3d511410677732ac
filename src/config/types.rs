use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use clipforged_av::DEFAULT_FONTFILE;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body in bytes (default: 1 GiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Where diagnostic logs are written; kept apart from downloadable outputs
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Explicit ffmpeg binary; looked up on PATH when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Per-job deadline in seconds (default: 900)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Font used by caption recipes
    #[serde(default = "default_fontfile")]
    pub fontfile: PathBuf,
}

fn default_timeout_secs() -> u64 {
    900
}
fn default_fontfile() -> PathBuf {
    PathBuf::from(DEFAULT_FONTFILE)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            timeout_secs: default_timeout_secs(),
            fontfile: default_fontfile(),
        }
    }
}

impl EngineConfig {
    /// Resolve the engine binary: configured path, then PATH, then the bare
    /// name.
    pub fn ffmpeg(&self) -> PathBuf {
        clipforged_av::get_tool_path("ffmpeg", self.ffmpeg_path.as_deref())
            .unwrap_or_else(|_| PathBuf::from("ffmpeg"))
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}
