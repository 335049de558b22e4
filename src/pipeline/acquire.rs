//! The acquire state machine.
//!
//! `Admitted → Deduped | Fresh → Extracting → Retrieving → Persisting →
//! Assembling → Done`, with `Failed` reachable from every non-terminal state.
//! No stage is retried; the first error ends the run.

use std::sync::atomic::Ordering;

use crate::error::{Error, ExtractionError, Result};
use crate::staging::StagingArea;
use crate::types::{AcquireOutcome, AcquireRequest, Event, PipelineStage};
use crate::utils::staging_prefix;

use super::SegmentPipeline;

impl SegmentPipeline {
    /// Run one "acquire segment" request on behalf of `client_key`
    ///
    /// # Errors
    ///
    /// - [`Error::Throttled`] when the client exceeded its rate limit
    /// - [`Error::Validation`] when `work` is missing or blank
    /// - the failing stage's error otherwise; nothing partial is returned
    pub async fn acquire(
        &self,
        request: AcquireRequest,
        client_key: &str,
    ) -> Result<AcquireOutcome> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        if let Some(retry_after_secs) = self.limiter.check(client_key).await {
            tracing::warn!(client = client_key, retry_after_secs, "Request throttled");
            return Err(Error::Throttled { retry_after_secs });
        }

        let work = request
            .work
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| Error::Validation("work is required".into()))?
            .to_string();
        let segment = request
            .segment
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        self.emit_stage(&work, &segment, PipelineStage::Admitted);

        let _permit = self
            .concurrent_limit
            .acquire()
            .await
            .map_err(|_| Error::ShuttingDown)?;
        let _segment_guard = self.locks.lock(&work, &segment).await;

        let visit = match self
            .db
            .record_segment_request(&work, &segment, client_key)
            .await
        {
            Ok(visit) => visit,
            Err(e) => {
                self.emit_failure(&work, &segment, PipelineStage::Admitted, &e);
                return Err(e);
            }
        };

        if let (true, Some(title)) = (visit.is_completed(), visit.canonical_title.as_deref()) {
            let document = self.document_path(title);
            if tokio::fs::try_exists(&document).await.unwrap_or(false) {
                tracing::info!(
                    work = %work,
                    segment = %segment,
                    request_count = visit.request_count,
                    "Segment already assembled, serving cached document"
                );
                self.emit_stage(&work, &segment, PipelineStage::Deduped);
                return Ok(AcquireOutcome::Cached {
                    title: title.to_string(),
                    document,
                });
            }
            tracing::info!(
                work = %work,
                segment = %segment,
                document = %document.display(),
                "Segment record exists but its document is gone, assembling again"
            );
        }

        self.emit_stage(&work, &segment, PipelineStage::Fresh);

        let mut stage = PipelineStage::Fresh;
        match self.run_stages(&work, &segment, &mut stage).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(
                    work = %work,
                    segment = %segment,
                    stage = ?stage,
                    error = %e,
                    "Segment pipeline failed"
                );
                self.emit_failure(&work, &segment, stage, &e);
                Err(e)
            }
        }
    }

    /// Extract, retrieve, persist and assemble; `stage` tracks progress for
    /// failure reporting
    async fn run_stages(
        &self,
        work: &str,
        segment: &str,
        stage: &mut PipelineStage,
    ) -> Result<AcquireOutcome> {
        *stage = PipelineStage::Extracting;
        self.emit_stage(work, segment, *stage);

        let deadline = self.config.fetch.extraction_timeout;
        let extraction = tokio::time::timeout(deadline, self.extractor.extract(work, segment))
            .await
            .map_err(|_| ExtractionError::Timeout {
                secs: deadline.as_secs(),
            })??;
        self.db
            .set_canonical_title(work, segment, &extraction.title)
            .await?;
        tracing::info!(
            work,
            segment,
            title = %extraction.title,
            pages = extraction.images.len(),
            "Segment contents extracted"
        );

        *stage = PipelineStage::Retrieving;
        self.emit_stage(work, segment, *stage);

        let staging = StagingArea::create_unique(
            &self.config.storage.staging_dir,
            &staging_prefix(work, segment),
        )
        .await?;
        tracing::debug!(staging = %staging.path().display(), "Staging area created");
        let pages = self.retriever.fetch_all(&extraction.images, &staging).await?;

        *stage = PipelineStage::Persisting;
        self.emit_stage(work, segment, *stage);

        for page in &pages {
            self.db
                .record_image(
                    work,
                    segment,
                    page.position,
                    &page.path.to_string_lossy(),
                )
                .await?;
        }

        *stage = PipelineStage::Assembling;
        self.emit_stage(work, segment, *stage);

        let document = self.assembler.assemble(staging, &extraction.title).await?;
        self.db.mark_segment_completed(work, segment).await?;

        *stage = PipelineStage::Done;
        self.emit_event(Event::Assembled {
            work: work.to_string(),
            segment: segment.to_string(),
            title: extraction.title.clone(),
            pages: document.pages,
        });
        self.emit_stage(work, segment, *stage);

        Ok(AcquireOutcome::Assembled {
            title: extraction.title,
            document: document.path,
            pages: document.pages,
        })
    }

    fn emit_stage(&self, work: &str, segment: &str, stage: PipelineStage) {
        tracing::debug!(work, segment, stage = ?stage, "Pipeline stage");
        self.emit_event(Event::Stage {
            work: work.to_string(),
            segment: segment.to_string(),
            stage,
        });
    }

    fn emit_failure(&self, work: &str, segment: &str, stage: PipelineStage, error: &Error) {
        self.emit_event(Event::Failed {
            work: work.to_string(),
            segment: segment.to_string(),
            stage,
            error: error.to_string(),
        });
        self.emit_stage(work, segment, PipelineStage::Failed);
    }
}
