//! `ffmpeg`/`ffprobe` process backend.
//!
//! The system binaries are driven over pipes rather than linked, so no native FFmpeg headers or
//! libraries are needed at build time.

use std::io::Read;
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use anyhow::Context as _;

use crate::foundation::error::TranscodeResult;

/// Probed source assets.
pub mod probe;
/// Decoding reader.
pub mod reader;
/// Encoding and muxing writer.
pub mod writer;

pub use probe::FfmpegAsset;
pub use writer::FfmpegWriterFactory;

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_runs("ffmpeg")
}

/// Return `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_runs("ffprobe")
}

fn tool_runs(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TranscodeResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// A spawned `ffmpeg` child whose stderr is drained on a background thread.
///
/// Without the drain a chatty child can fill its stderr pipe and stall.
pub(crate) struct FfmpegChild {
    child: Child,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl FfmpegChild {
    pub(crate) fn spawn(cmd: &mut Command) -> anyhow::Result<Self> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        let mut child = cmd
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program} (is it installed and on PATH?)"))?;

        let mut stderr = child
            .stderr
            .take()
            .with_context(|| format!("failed to open {program} stderr"))?;
        let stderr_drain = std::thread::Builder::new()
            .name(format!("{program}-stderr"))
            .spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
            .context("failed to spawn stderr drain thread")?;

        Ok(Self {
            child,
            stderr_drain: Some(stderr_drain),
        })
    }

    pub(crate) fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub(crate) fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Wait for exit; a non-zero status becomes an error carrying the child's stderr.
    pub(crate) fn wait(mut self) -> anyhow::Result<()> {
        let status = self.child.wait().context("failed to wait for ffmpeg")?;
        let stderr = self.collect_stderr();
        if !status.success() {
            anyhow::bail!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            );
        }
        Ok(())
    }

    /// Kill and reap the child. Errors are ignored: the process may already have exited.
    pub(crate) fn kill(mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.collect_stderr();
    }

    fn collect_stderr(&mut self) -> Vec<u8> {
        match self.stderr_drain.take().map(JoinHandle::join) {
            Some(Ok(Ok(bytes))) => bytes,
            Some(Ok(Err(e))) => {
                tracing::debug!(error = %e, "ffmpeg stderr read failed");
                Vec::new()
            }
            Some(Err(_)) => {
                tracing::debug!("ffmpeg stderr drain thread panicked");
                Vec::new()
            }
            None => Vec::new(),
        }
    }
}

/// Read until `buf` is full or the stream ends; return the number of bytes read.
pub(crate) fn read_chunk(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Unique scratch path in the system temp directory.
pub(crate) fn temp_path(stem: &str, ext: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "wavyte_transcode_{stem}_{}_{}.{ext}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ))
}

/// Format seconds for `-ss`/`-t`.
pub(crate) fn secs_arg(secs: f64) -> String {
    format!("{:.6}", secs.max(0.0))
}

#[cfg(test)]
#[path = "../../../tests/unit/media/ffmpeg/mod.rs"]
mod tests;
