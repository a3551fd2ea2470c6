//! Run orchestration: acquire → assemble → tear down.
//!
//! Acquisition failures are the only fatal outcome once the configuration
//! is valid. The workspace is dropped on every path out of
//! [`ingest_repository`], including unwinding out of the assembler.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assemble::ContextAssembler;
use crate::config::Config;
use crate::models::AssembledContext;
use crate::workspace::{AcquisitionError, Workspace};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error("invalid exclude glob: {0}")]
    InvalidGlob(#[from] globset::Error),
    #[error("directory does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
}

/// Clone `url` into a temporary workspace and assemble its context.
pub fn ingest_repository(url: &str, config: &Config) -> Result<AssembledContext, IngestError> {
    let assembler = ContextAssembler::new(config)?;
    let workspace = Workspace::acquire(url, &config.acquisition)?;

    let context = assembler.assemble(workspace.root());
    let elapsed = chrono::Utc::now() - workspace.created_at();
    tracing::info!(
        url = workspace.url(),
        files = context.file_count,
        images = context.images.len(),
        elapsed_ms = elapsed.num_milliseconds(),
        "Repository ingested"
    );

    // Removal problems are logged; the context is still valid.
    let _ = workspace.close();
    Ok(context)
}

/// Assemble the context of a directory that is already on disk.
///
/// The directory is read, never modified or removed.
pub fn ingest_directory(root: &Path, config: &Config) -> Result<AssembledContext, IngestError> {
    if !root.is_dir() {
        return Err(IngestError::MissingRoot(root.to_path_buf()));
    }
    let assembler = ContextAssembler::new(config)?;
    Ok(assembler.assemble(root))
}
