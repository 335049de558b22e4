//! Document assembly: staged page images into one paginated document
//!
//! [`DocumentAssembler`] owns the ordering, persistence and cleanup rules;
//! the actual page format is delegated to a [`PageRenderer`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AssemblyError;
use crate::staging::{StagedImage, StagingArea};
use crate::utils::document_path;

mod pdf;

pub use pdf::PdfRenderer;

/// Writes pages into a document file
///
/// Called from a blocking thread. `pages` arrive already in page order and
/// each must become exactly one page.
pub trait PageRenderer: Send + Sync {
    /// Render `pages` into `output`, returning the number of pages written
    fn render(&self, pages: &[StagedImage], output: &Path) -> Result<usize, AssemblyError>;

    /// Name of this renderer, for logging
    fn name(&self) -> &'static str;
}

/// A document written by [`DocumentAssembler::assemble`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    /// Document location
    pub path: PathBuf,
    /// Number of pages
    pub pages: usize,
}

/// Turns a staging area into the document for a title
#[derive(Clone)]
pub struct DocumentAssembler {
    documents_dir: PathBuf,
    renderer: Arc<dyn PageRenderer>,
}

impl DocumentAssembler {
    /// Create an assembler writing into `documents_dir`
    pub fn new(documents_dir: impl Into<PathBuf>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
            renderer,
        }
    }

    /// Where the document for `title` lives
    pub fn document_path(&self, title: &str) -> PathBuf {
        document_path(&self.documents_dir, title)
    }

    /// Render every page in `staging`, in numeric position order, into the
    /// document for `title`
    ///
    /// The document is written beside its final location and renamed over any
    /// previous version. The staging area is removed only after that rename;
    /// on any error it is left as it was.
    pub async fn assemble(
        &self,
        staging: StagingArea,
        title: &str,
    ) -> Result<AssembledDocument, AssemblyError> {
        let pages = staging.scan().await?;
        if pages.is_empty() {
            return Err(AssemblyError::EmptyStaging {
                path: staging.path().to_path_buf(),
            });
        }

        let output = self.document_path(title);
        let temp = self.temp_path(&output, &staging);

        tokio::fs::create_dir_all(&self.documents_dir)
            .await
            .map_err(|e| AssemblyError::Persist {
                path: self.documents_dir.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            renderer = self.renderer.name(),
            pages = pages.len(),
            output = %output.display(),
            "Rendering document"
        );

        let renderer = self.renderer.clone();
        let render_target = temp.clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render(&pages, &render_target))
            .await
            .map_err(|e| AssemblyError::Render {
                path: temp.clone(),
                reason: format!("renderer task failed: {}", e),
            })
            .and_then(|result| result);

        let page_count = match rendered {
            Ok(count) => count,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&temp, &output).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(AssemblyError::Persist {
                path: output,
                reason: e.to_string(),
            });
        }

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.destroy().await {
            tracing::warn!(
                staging = %staging_path.display(),
                error = %e,
                "Document written but staging area could not be removed"
            );
        }

        tracing::info!(
            title,
            pages = page_count,
            path = %output.display(),
            "Document assembled"
        );

        Ok(AssembledDocument {
            path: output,
            pages: page_count,
        })
    }

    /// Per-run temporary file, so concurrent runs for one title never share it
    fn temp_path(&self, output: &Path, staging: &StagingArea) -> PathBuf {
        let stem = output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let run = staging
            .path()
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.documents_dir.join(format!(".{}.{}.tmp", stem, run))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
