//! Tar-based unpacker: spawns the configured tar binary.

use std::ffi::OsString;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Unpacker;

/// Unpacker that shells out to a tar-compatible tool (`<tool> -xf <archive>
/// -C <destination>`). Compression is left to tar's auto-detection.
#[derive(Debug, Default)]
pub struct TarUnpacker;

impl TarUnpacker {
    pub fn new() -> Self {
        Self
    }
}

fn build_args(archive: &Path, destination: &Path, strip_top_level: bool) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("-xf"),
        archive.as_os_str().to_os_string(),
        OsString::from("-C"),
        destination.as_os_str().to_os_string(),
    ];
    if strip_top_level {
        args.push(OsString::from("--strip-components=1"));
    }
    args
}

#[async_trait]
impl Unpacker for TarUnpacker {
    async fn unpack(
        &self,
        tool: &Path,
        archive: &Path,
        destination: &Path,
        strip_top_level: bool,
    ) -> Result<()> {
        tokio::fs::create_dir_all(destination)
            .await
            .with_context(|| format!("create extraction dir: {}", destination.display()))?;

        tracing::debug!(
            tool = %tool.display(),
            archive = %archive.display(),
            dest = %destination.display(),
            "extracting archive"
        );
        let output = tokio::process::Command::new(tool)
            .args(build_args(archive, destination, strip_top_level))
            .output()
            .await
            .with_context(|| format!("spawn unpack tool: {}", tool.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "unpack of {} failed ({}): {}",
                archive.display(),
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_without_strip() {
        let args = build_args(Path::new("/tmp/a.tar.gz"), Path::new("/tmp/out"), false);
        assert_eq!(args, vec!["-xf", "/tmp/a.tar.gz", "-C", "/tmp/out"]);
    }

    #[test]
    fn args_with_strip() {
        let args = build_args(Path::new("a.tar"), Path::new("out"), true);
        assert_eq!(
            args,
            vec!["-xf", "a.tar", "-C", "out", "--strip-components=1"]
        );
    }

    #[tokio::test]
    async fn missing_tool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TarUnpacker::new()
            .unpack(
                &dir.path().join("no-such-tool"),
                &dir.path().join("a.tar"),
                &dir.path().join("out"),
                false,
            )
            .await;
        assert!(result.is_err());
    }
}
