//! Page image retrieval into a staging area

use futures::{StreamExt, TryStreamExt, stream};
use std::collections::HashSet;
use tokio::io::AsyncWriteExt;

use crate::config::FetchConfig;
use crate::error::{Error, RetrievalError};
use crate::retry::fetch_with_retry;
use crate::staging::{StagedImage, StagingArea};
use crate::types::ImageRef;
use crate::utils::image_extension;

/// Downloads every page of a segment, or none of them
///
/// Up to `max_concurrent_fetches` images are in flight at once. The first
/// unrecoverable failure stops the whole retrieval: no further fetches start,
/// in-flight ones are dropped and their `.part` files removed. Pages that had
/// already completed stay in the staging area for inspection.
#[derive(Clone)]
pub struct ImageRetriever {
    client: reqwest::Client,
    config: FetchConfig,
}

impl ImageRetriever {
    /// Create a retriever with its own HTTP client
    pub fn new(config: FetchConfig) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch `images` into `staging`
    ///
    /// The returned pages are ordered by position regardless of the order in
    /// which downloads completed.
    pub async fn fetch_all(
        &self,
        images: &[ImageRef],
        staging: &StagingArea,
    ) -> Result<Vec<StagedImage>, RetrievalError> {
        let mut positions = HashSet::with_capacity(images.len());
        for image in images {
            if !positions.insert(image.position) {
                return Err(RetrievalError::DuplicatePosition {
                    position: image.position,
                });
            }
        }

        let limit = self.config.max_concurrent_fetches.max(1);
        let result = stream::iter(images.iter().cloned())
            .map(|image| {
                let retriever = self.clone();
                let staging = staging.clone();
                async move { retriever.fetch_one(&image, &staging).await }
            })
            .buffer_unordered(limit)
            .try_collect::<Vec<_>>()
            .await;

        match result {
            Ok(mut pages) => {
                pages.sort_by_key(|page| page.position);
                tracing::info!(
                    staging = %staging.path().display(),
                    pages = pages.len(),
                    "All page images retrieved"
                );
                Ok(pages)
            }
            Err(e) => {
                remove_partials(images, staging).await;
                tracing::warn!(
                    staging = %staging.path().display(),
                    error = %e,
                    "Page retrieval aborted"
                );
                Err(e)
            }
        }
    }

    async fn fetch_one(
        &self,
        image: &ImageRef,
        staging: &StagingArea,
    ) -> Result<StagedImage, RetrievalError> {
        fetch_with_retry(&self.config.retry, || self.download(image, staging)).await
    }

    /// Stream one image into `<position>.part`, then rename it into place
    async fn download(
        &self,
        image: &ImageRef,
        staging: &StagingArea,
    ) -> Result<StagedImage, RetrievalError> {
        let position = image.position;
        let fetch_error = |e: reqwest::Error| RetrievalError::Fetch {
            position,
            url: image.url.clone(),
            reason: e.to_string(),
        };

        let mut response = self
            .client
            .get(&image.url)
            .timeout(self.config.image_timeout)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                position,
                url: image.url.clone(),
                status: status.as_u16(),
            });
        }

        let partial = staging.partial_path(position);
        let write_error = |path: &std::path::Path, e: std::io::Error| RetrievalError::Write {
            position,
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| write_error(&partial, e))?;

        let mut bytes = 0usize;
        while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| write_error(&partial, e))?;
            bytes += chunk.len();
        }
        file.flush().await.map_err(|e| write_error(&partial, e))?;
        drop(file);

        let target = staging.page_path(position, image_extension(&image.url));
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| write_error(&target, e))?;

        tracing::debug!(position, bytes, url = %image.url, "Page image staged");

        Ok(StagedImage {
            position,
            path: target,
        })
    }
}

async fn remove_partials(images: &[ImageRef], staging: &StagingArea) {
    for image in images {
        let partial = staging.partial_path(image.position);
        match tokio::fs::remove_file(&partial).await {
            Ok(()) => tracing::debug!(path = %partial.display(), "Removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %partial.display(),
                error = %e,
                "Failed to remove partial download"
            ),
        }
    }
}
