// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batched element retrieval with a multi-tier fallback ladder.
//!
//! The ladder is data: an ordered list of [`ElementSource`] strategies
//! tried in priority order. A tier that fails transiently logs and
//! falls through; a missing design aborts the ladder immediately. Each
//! tier is independently testable through the trait seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use takeoff_core::Element;

use crate::error::RetrieveError;

/// Cooperative cancellation flag, checked before each batch request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; in-flight batches complete, no new batch
    /// is issued.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

/// Which tier of the ladder produced the elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataProvenance {
    /// Rich structured query service.
    Primary,
    /// Simplified listing service.
    Simplified,
    /// Placeholder data synthesized because every real tier failed.
    /// Only possible when explicitly enabled, and always flagged.
    Synthetic,
}

impl std::fmt::Display for DataProvenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataProvenance::Primary => "primary",
            DataProvenance::Simplified => "simplified",
            DataProvenance::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Optional category/family filter for a retrieval run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementFilter {
    pub category: Option<String>,
    pub family: Option<String>,
}

/// One normalized page from a source tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementPage {
    pub elements: Vec<Element>,
    /// Total element count when the endpoint reports one.
    pub total: Option<u64>,
    /// Explicit more-data flag when the endpoint reports one.
    pub has_more: Option<bool>,
    /// Elements dropped during normalization (malformed).
    pub skipped: usize,
}

/// One tier of the fallback ladder.
///
/// Fetching is idempotent for a fixed (design, filter, offset, limit)
/// tuple barring upstream data changes.
#[async_trait]
pub trait ElementSource: Send + Sync {
    fn name(&self) -> &str;

    fn provenance(&self) -> DataProvenance;

    async fn fetch_page(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ElementPage, RetrieveError>;
}

/// Result of a full retrieval run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub elements: Vec<Element>,
    /// Upstream-reported total when available, else the fetched count.
    pub total_count: usize,
    pub provenance: DataProvenance,
    pub warnings: Vec<String>,
    /// The batch cap was hit; `elements` is a prefix of the design.
    pub truncated: bool,
    /// Cancellation was requested between batches; `elements` is
    /// partial.
    pub cancelled: bool,
    /// Malformed elements skipped during normalization.
    pub skipped: usize,
}

/// Pages through element sources in ladder order.
pub struct ElementRetriever {
    sources: Vec<Box<dyn ElementSource>>,
    batch_size: usize,
    max_batches: usize,
}

impl ElementRetriever {
    /// Build a retriever over an ordered source ladder.
    pub fn new(sources: Vec<Box<dyn ElementSource>>, batch_size: usize, max_batches: usize) -> Self {
        Self {
            sources,
            batch_size: batch_size.max(1),
            max_batches: max_batches.max(1),
        }
    }

    /// Retrieve the full element set for a design.
    ///
    /// Tries each source tier in order; the first tier that starts
    /// producing pages owns the run. Transient tier failures log the
    /// design id, offset and batch size, then fall through; a missing
    /// design aborts immediately with no fallback.
    pub async fn fetch_all(
        &self,
        design_id: &str,
        filter: &ElementFilter,
        cancel: &CancelToken,
    ) -> Result<FetchResult, RetrieveError> {
        let mut last_error: Option<RetrieveError> = None;

        for source in &self.sources {
            match self.drain_source(source.as_ref(), design_id, filter, cancel).await {
                Ok(result) => {
                    tracing::info!(
                        design_id,
                        source = source.name(),
                        provenance = %result.provenance,
                        elements = result.elements.len(),
                        skipped = result.skipped,
                        truncated = result.truncated,
                        cancelled = result.cancelled,
                        "Element retrieval complete"
                    );
                    return Ok(result);
                }
                Err(err @ RetrieveError::DesignNotFound(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        design_id,
                        source = source.name(),
                        batch_size = self.batch_size,
                        %err,
                        "Source tier failed; falling through"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RetrieveError::Transient("no element sources configured".into())))
    }

    /// Page through a single source until a short page, an explicit
    /// end-of-data flag, the batch cap, or cancellation.
    async fn drain_source(
        &self,
        source: &dyn ElementSource,
        design_id: &str,
        filter: &ElementFilter,
        cancel: &CancelToken,
    ) -> Result<FetchResult, RetrieveError> {
        let mut elements: Vec<Element> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut reported_total: Option<u64> = None;
        let mut skipped = 0usize;
        let mut truncated = false;
        let mut cancelled = false;
        let mut exhausted = false;

        for batch in 0..self.max_batches {
            if cancel.is_cancelled() {
                cancelled = true;
                warnings.push(format!("cancelled after {batch} batches; partial results"));
                break;
            }

            let offset = batch * self.batch_size;
            let page = self
                .fetch_page_with_split(source, design_id, filter, offset, &mut warnings)
                .await?;

            skipped += page.skipped;
            if page.total.is_some() {
                reported_total = page.total;
            }
            // Page fullness counts malformed-and-skipped elements: a
            // page the endpoint filled is not a terminal short page just
            // because normalization dropped some of it.
            let received = page.elements.len() + page.skipped;
            elements.extend(page.elements);

            match page.has_more {
                Some(false) => {
                    exhausted = true;
                    break;
                }
                Some(true) => {}
                None if received < self.batch_size => {
                    exhausted = true;
                    break;
                }
                None => {}
            }
        }

        if !exhausted && !cancelled {
            truncated = true;
            warnings.push(format!(
                "pagination cap of {} batches reached; results truncated",
                self.max_batches
            ));
        }
        if skipped > 0 {
            warnings.push(format!("{skipped} malformed elements skipped"));
        }
        if elements.is_empty() && !cancelled && !truncated {
            warnings.push("design returned no elements".into());
        }

        let total_count = reported_total
            .map(|t| t as usize)
            .unwrap_or(elements.len());

        Ok(FetchResult {
            elements,
            total_count,
            provenance: source.provenance(),
            warnings,
            truncated,
            cancelled,
            skipped,
        })
    }

    /// Fetch one page, splitting it once into two half-size sub-batches
    /// when the tier rejects the batch as too large.
    async fn fetch_page_with_split(
        &self,
        source: &dyn ElementSource,
        design_id: &str,
        filter: &ElementFilter,
        offset: usize,
        warnings: &mut Vec<String>,
    ) -> Result<ElementPage, RetrieveError> {
        match source.fetch_page(design_id, filter, offset, self.batch_size).await {
            Err(RetrieveError::BatchTooLarge { .. }) if self.batch_size > 1 => {
                let half = self.batch_size / 2;
                tracing::warn!(
                    design_id,
                    offset,
                    batch_size = self.batch_size,
                    half,
                    "Batch rejected as too large; splitting"
                );
                warnings.push(format!(
                    "batch of {} at offset {offset} split into two sub-batches",
                    self.batch_size
                ));

                let first = source.fetch_page(design_id, filter, offset, half).await?;
                let mut merged = first;
                // A short first half means the page is already complete.
                if merged.elements.len() + merged.skipped >= half
                    && merged.has_more != Some(false)
                {
                    let second = source
                        .fetch_page(design_id, filter, offset + half, half)
                        .await?;
                    merged.elements.extend(second.elements);
                    merged.skipped += second.skipped;
                    if second.total.is_some() {
                        merged.total = second.total;
                    }
                    merged.has_more = second.has_more;
                }
                Ok(merged)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Scripted source tier for ladder tests.
    struct FakeSource {
        name: &'static str,
        provenance: DataProvenance,
        elements: Vec<Element>,
        fail: Option<fn() -> RetrieveError>,
        calls: AtomicUsize,
        too_large_above: Option<usize>,
        skip_on_first_page: usize,
    }

    impl FakeSource {
        fn with_elements(count: usize) -> Self {
            let elements = (0..count)
                .map(|i| Element {
                    id: format!("e{i}"),
                    category: "Walls".into(),
                    volume_m3: 1.0,
                    ..Default::default()
                })
                .collect();
            Self {
                name: "fake",
                provenance: DataProvenance::Primary,
                elements,
                fail: None,
                calls: AtomicUsize::new(0),
                too_large_above: None,
                skip_on_first_page: 0,
            }
        }

        fn failing(err: fn() -> RetrieveError) -> Self {
            Self {
                name: "failing",
                provenance: DataProvenance::Primary,
                elements: Vec::new(),
                fail: Some(err),
                calls: AtomicUsize::new(0),
                too_large_above: None,
                skip_on_first_page: 0,
            }
        }
    }

    #[async_trait]
    impl ElementSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        fn provenance(&self) -> DataProvenance {
            self.provenance
        }

        async fn fetch_page(
            &self,
            _design_id: &str,
            _filter: &ElementFilter,
            offset: usize,
            limit: usize,
        ) -> Result<ElementPage, RetrieveError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(err) = self.fail {
                return Err(err());
            }
            if let Some(cap) = self.too_large_above {
                if limit > cap {
                    return Err(RetrieveError::BatchTooLarge { offset, limit });
                }
            }
            let end = (offset + limit).min(self.elements.len());
            let mut slice = if offset < end {
                self.elements[offset..end].to_vec()
            } else {
                Vec::new()
            };
            let mut skipped = 0;
            if offset == 0 && self.skip_on_first_page > 0 {
                skipped = self.skip_on_first_page.min(slice.len());
                slice.drain(..skipped);
            }
            Ok(ElementPage {
                elements: slice,
                total: Some(self.elements.len() as u64),
                has_more: Some(end < self.elements.len()),
                skipped,
            })
        }
    }

    fn retriever(sources: Vec<Box<dyn ElementSource>>) -> ElementRetriever {
        ElementRetriever::new(sources, 10, 5)
    }

    #[tokio::test]
    async fn pages_until_short_page() {
        let r = retriever(vec![Box::new(FakeSource::with_elements(25))]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.elements.len(), 25);
        assert_eq!(result.total_count, 25);
        assert_eq!(result.provenance, DataProvenance::Primary);
        assert!(!result.truncated);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn skipped_elements_do_not_end_pagination_early() {
        // First page comes back one element short because a malformed
        // element was dropped; the endpoint still says more data exists.
        let mut source = FakeSource::with_elements(20);
        source.skip_on_first_page = 1;
        let r = retriever(vec![Box::new(source)]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.elements.len(), 19);
        assert_eq!(result.skipped, 1);
        assert!(!result.truncated);
        assert!(result.warnings.iter().any(|w| w.contains("malformed")));
    }

    #[tokio::test]
    async fn batch_cap_truncates_with_warning_not_error() {
        // 5 batches × 10 covers only 50 of 80 elements.
        let r = retriever(vec![Box::new(FakeSource::with_elements(80))]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.elements.len(), 50);
        assert!(result.truncated);
        assert_eq!(result.total_count, 80);
        assert!(result.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[tokio::test]
    async fn transient_failure_falls_to_next_tier() {
        let mut fallback = FakeSource::with_elements(5);
        fallback.provenance = DataProvenance::Simplified;
        let r = retriever(vec![
            Box::new(FakeSource::failing(|| {
                RetrieveError::Transient("boom".into())
            })),
            Box::new(fallback),
        ]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.provenance, DataProvenance::Simplified);
        assert_eq!(result.elements.len(), 5);
    }

    #[tokio::test]
    async fn design_not_found_aborts_the_ladder() {
        let r = retriever(vec![
            Box::new(FakeSource::failing(|| {
                RetrieveError::DesignNotFound("d1".into())
            })),
            Box::new(FakeSource::with_elements(5)),
        ]);
        let err = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::DesignNotFound(_)));
    }

    #[tokio::test]
    async fn all_tiers_failing_surfaces_last_error() {
        let r = retriever(vec![
            Box::new(FakeSource::failing(|| {
                RetrieveError::Transient("tier 1".into())
            })),
            Box::new(FakeSource::failing(|| {
                RetrieveError::Transient("tier 2".into())
            })),
        ]);
        let err = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrieveError::Transient(_)));
    }

    #[tokio::test]
    async fn cancellation_returns_partial_results() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let r = retriever(vec![Box::new(FakeSource::with_elements(25))]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &cancel)
            .await
            .unwrap();
        assert!(result.cancelled);
        assert!(result.elements.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("cancelled")));
    }

    #[tokio::test]
    async fn oversized_batch_is_split_once() {
        let mut source = FakeSource::with_elements(8);
        source.too_large_above = Some(5);
        let r = retriever(vec![Box::new(source)]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.elements.len(), 8);
        assert!(result.warnings.iter().any(|w| w.contains("sub-batches")));
    }

    #[tokio::test]
    async fn empty_design_yields_warning_not_silence() {
        let r = retriever(vec![Box::new(FakeSource::with_elements(0))]);
        let result = r
            .fetch_all("d1", &ElementFilter::default(), &CancelToken::new())
            .await
            .unwrap();
        assert!(result.elements.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("no elements")));
    }
}
