use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

/// A transcoding engine operating on its own private file namespace.
///
/// Mirrors the shape of an FFmpeg build: load once, then write inputs,
/// execute an argument list, read outputs, delete files.
#[async_trait::async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Make the engine usable; an error means the engine is absent.
    async fn load(&self) -> Result<()>;

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()>;

    async fn exec(&self, args: &[String]) -> Result<()>;

    async fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    async fn delete_file(&self, name: &str) -> Result<()>;

    fn name(&self) -> &str;
}

/// `ffmpeg` executable driven over a scratch directory.
pub struct FfmpegEngine {
    binary: PathBuf,
    workdir: TempDir,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self> {
        let workdir = tempfile::Builder::new()
            .prefix("practice-audio-ffmpeg")
            .tempdir()
            .context("Failed to create transcoder scratch directory")?;

        Ok(Self {
            binary: binary.into(),
            workdir,
        })
    }

    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let path = Path::new(name);
        if path.components().count() != 1 || path.is_absolute() {
            bail!("Invalid scratch file name: {name}");
        }
        Ok(self.workdir.path().join(path))
    }
}

#[async_trait::async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn load(&self) -> Result<()> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            bail!("{} -version exited with {}", self.binary.display(), output.status);
        }

        let banner = String::from_utf8_lossy(&output.stdout);
        debug!("Loaded {}", banner.lines().next().unwrap_or("ffmpeg"));
        Ok(())
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn exec(&self, args: &[String]) -> Result<()> {
        debug!("ffmpeg {}", args.join(" "));

        let output = Command::new(&self.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(args)
            .current_dir(self.workdir.path())
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            bail!(
                "ffmpeg exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.resolve(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
