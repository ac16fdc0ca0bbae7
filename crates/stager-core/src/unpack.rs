//! Unpack seam: archive extraction via an external tool.

mod tar;

pub use self::tar::TarUnpacker;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// Extracts an archive. Invoked by the scheduler only for jobs whose transfer
/// completed and that requested unpacking; the concurrency slot has already
/// been released by then, so extraction never rate-limits transfers.
#[async_trait]
pub trait Unpacker: Send + Sync {
    /// Extracts `archive` into `destination` using `tool`. `strip_top_level`
    /// drops the archive's single top-level directory.
    async fn unpack(
        &self,
        tool: &Path,
        archive: &Path,
        destination: &Path,
        strip_top_level: bool,
    ) -> Result<()>;
}
