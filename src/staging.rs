//! Per-run staging areas for retrieved page images
//!
//! A staging area is a directory holding one file per page, named
//! `<position>.<ext>`. Downloads in progress use `<position>.part` and are
//! renamed once complete, so a finished page file is never partially written.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::AssemblyError;

/// Suffix of files whose download has not finished
pub const PARTIAL_SUFFIX: &str = "part";

/// One page image on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedImage {
    /// Page position
    pub position: u32,
    /// Staged file
    pub path: PathBuf,
}

/// Directory owned by one pipeline run
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Refer to an existing staging directory without touching the filesystem
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a new staging directory under `parent`, named `<prefix>-<run id>`
    ///
    /// The directory is created exclusively, so two runs never receive the
    /// same one even when their prefixes coincide.
    pub async fn create_unique(parent: &Path, prefix: &str) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(parent).await?;

        loop {
            let root = parent.join(format!("{}-{:08x}", prefix, rand::random::<u32>()));
            match tokio::fs::create_dir(&root).await {
                Ok(()) => return Ok(Self { root }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Staging directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Final location of the page at `position`
    pub fn page_path(&self, position: u32, extension: &str) -> PathBuf {
        self.root.join(format!("{}.{}", position, extension))
    }

    /// In-progress location of the page at `position`
    pub fn partial_path(&self, position: u32) -> PathBuf {
        self.root.join(format!("{}.{}", position, PARTIAL_SUFFIX))
    }

    /// Rebuild the page list from the directory contents, ordered by position
    ///
    /// Every entry must be named `<number>.<ext>`; anything else, including an
    /// unfinished `.part` download or two files for one position, is rejected.
    pub async fn scan(&self) -> Result<Vec<StagedImage>, AssemblyError> {
        let unreadable = |e: std::io::Error| AssemblyError::Unreadable {
            path: self.root.clone(),
            reason: e.to_string(),
        };

        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(unreadable)?;
        let mut pages = Vec::new();
        let mut seen = HashSet::new();

        while let Some(entry) = dir.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let is_partial = path
                .extension()
                .is_some_and(|ext| ext == PARTIAL_SUFFIX);
            let position = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok());

            let Some(position) = position.filter(|_| !is_partial) else {
                return Err(AssemblyError::InvalidEntry { name });
            };
            if !seen.insert(position) {
                return Err(AssemblyError::InvalidEntry { name });
            }

            pages.push(StagedImage { position, path });
        }

        pages.sort_by_key(|page| page.position);
        Ok(pages)
    }

    /// Remove the staging directory and everything in it
    pub async fn destroy(self) -> std::io::Result<()> {
        tokio::fs::remove_dir_all(&self.root).await
    }
}
