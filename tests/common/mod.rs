//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates temporary storage directories, a
//! default config and a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Command;

use clipforged::config::Config;
use clipforged::engine::Engine;
use clipforged::server::{create_router, AppContext};
use tempfile::TempDir;

/// Test harness wrapping an [`AppContext`] backed by temporary directories.
pub struct TestHarness {
    pub dir: TempDir,
    pub ctx: AppContext,
}

impl TestHarness {
    /// Create a harness whose engine binary comes from the default config.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness that runs `program` in place of ffmpeg.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self::build(Some(program.into()))
    }

    fn build(program: Option<PathBuf>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = test_config(dir.path());
        let mut engine = Engine::from_config(&config).expect("failed to build engine");
        if let Some(program) = program {
            engine = engine.with_program(program);
        }
        let ctx = AppContext::with_engine(config, engine);
        Self { dir, ctx }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start a server whose engine is `program`.
    pub async fn with_server_program(program: impl Into<PathBuf>) -> (Self, SocketAddr) {
        Self::with_program(program).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    pub fn output_dir(&self) -> &Path {
        self.ctx.engine.output_dir()
    }

    pub fn log_dir(&self) -> &Path {
        self.ctx.engine.log_dir()
    }

    /// Names of files currently in `dir`.
    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Config rooted in `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.storage.upload_dir = dir.join("uploads");
    config.storage.output_dir = dir.join("outputs");
    config.storage.log_dir = dir.join("logs");
    config.engine.timeout_secs = 30;
    config
}

/// Write an executable shell script standing in for the engine.
///
/// The script sees the same argument vector ffmpeg would; `$out` holds the
/// last argument (the output path).
#[cfg(unix)]
pub fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!("#!/bin/sh\nfor out; do :; done\n{}\n", body);
    std::fs::write(&path, script).expect("failed to write fake engine");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod fake engine");
    path
}

/// Whether `ffmpeg` and `ffprobe` are both on PATH.
pub fn ffmpeg_available() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|tool| {
        Command::new(tool)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

/// Generate a short test clip with video and audio.
pub fn make_clip(path: &Path, seconds: u32, size: &str) {
    let status = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=duration={}:size={}:rate=10", seconds, size))
        .args(["-f", "lavfi", "-i"])
        .arg(format!("sine=frequency=440:duration={}", seconds))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(path)
        .status()
        .expect("failed to run ffmpeg");
    assert!(status.success(), "ffmpeg could not generate {:?}", path);
}

/// Probe a single stream or format field with ffprobe.
pub fn probe_entry(path: &Path, select: &str, entry: &str) -> String {
    let mut cmd = Command::new("ffprobe");
    cmd.args(["-v", "error"]);
    if !select.is_empty() {
        cmd.args(["-select_streams", select]);
    }
    let output = cmd
        .args(["-show_entries", entry, "-of", "default=noprint_wrappers=1:nokey=1"])
        .arg(path)
        .output()
        .expect("failed to run ffprobe");
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
