//! Per-page text cache
//!
//! Each (document, page) is extracted at most once per session. The cache is
//! an explicit object so callers decide its lifetime and tests get isolated
//! instances.
//!
//! Extraction may complete long after it was requested. [`PageTextCache::begin`]
//! hands out an [`ExtractionTicket`]; [`PageTextCache::complete`] stores the
//! result under the ticket's key. Whether that key is still interesting is
//! the caller's decision (see the controller).

use crate::extractor::{extract_tokens, PageTextSource, Token};
use crate::geometry::Region;
use crate::regions::{detect_line_rows, detect_ship_to_region, LineRowMap};
use crate::LocatorError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identifies one page of one document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub document_id: String,
    /// 1-indexed page number
    pub page: u32,
}

impl PageKey {
    pub fn new(document_id: impl Into<String>, page: u32) -> Self {
        Self {
            document_id: document_id.into(),
            page,
        }
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.document_id, self.page)
    }
}

/// Extracted tokens and detected regions of one page. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageTextData {
    pub items: Vec<Token>,
    pub ship_to_region: Option<Region>,
    pub line_row_map: LineRowMap,
}

impl PageTextData {
    /// Run region detection over a page's tokens
    pub fn from_tokens(items: Vec<Token>) -> Self {
        let ship_to_region = detect_ship_to_region(&items);
        let line_row_map = detect_line_rows(&items);
        Self {
            items,
            ship_to_region,
            line_row_map,
        }
    }
}

/// Proof that an extraction for `key` was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionTicket {
    pub key: PageKey,
    /// Monotonic sequence number, later tickets have larger values
    pub generation: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub pages: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Session-scoped, write-once-per-key store of page text
#[derive(Debug, Default)]
pub struct PageTextCache {
    entries: RwLock<HashMap<PageKey, Arc<PageTextData>>>,
    next_generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageTextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &PageKey) -> bool {
        self.read_entries().contains_key(key)
    }

    /// Cached data for a page, if extracted already
    pub fn get(&self, key: &PageKey) -> Option<Arc<PageTextData>> {
        let found = self.read_entries().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Store page data. The first write for a key wins; later writes return
    /// the existing entry.
    pub fn insert(&self, key: PageKey, data: PageTextData) -> Arc<PageTextData> {
        let mut entries = self.write_entries();
        entries
            .entry(key)
            .or_insert_with(|| Arc::new(data))
            .clone()
    }

    /// Start an extraction for `key`, or `None` if the page is cached already.
    ///
    /// Two tickets for the same key may be outstanding; both results are
    /// equivalent and the second write is a no-op.
    pub fn begin(&self, key: &PageKey) -> Option<ExtractionTicket> {
        if self.contains(key) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("extraction {} started for {}", generation, key);
        Some(ExtractionTicket {
            key: key.clone(),
            generation,
        })
    }

    /// Finish an extraction started with [`begin`](Self::begin).
    ///
    /// A failed extraction leaves the page uncached.
    pub fn complete(
        &self,
        ticket: &ExtractionTicket,
        tokens: Result<Vec<Token>, LocatorError>,
    ) -> Result<Arc<PageTextData>, LocatorError> {
        match tokens {
            Ok(tokens) => {
                let data = PageTextData::from_tokens(tokens);
                log::debug!(
                    "cached {} tokens for {} (ship-to: {}, rows: {})",
                    data.items.len(),
                    ticket.key,
                    data.ship_to_region.is_some(),
                    data.line_row_map.len()
                );
                Ok(self.insert(ticket.key.clone(), data))
            }
            Err(e) => {
                log::warn!("text extraction failed for {}: {}", ticket.key, e);
                Err(e)
            }
        }
    }

    /// Cached data for a page, extracting it synchronously on a miss
    pub fn get_or_extract(
        &self,
        key: &PageKey,
        source: &dyn PageTextSource,
    ) -> Result<Arc<PageTextData>, LocatorError> {
        if let Some(data) = self.get(key) {
            return Ok(data);
        }
        match self.begin(key) {
            Some(ticket) => self.complete(&ticket, extract_tokens(source)),
            // Filled in between the lookup and `begin`
            None => self
                .get(key)
                .ok_or_else(|| LocatorError::Extraction(format!("{} vanished from cache", key))),
        }
    }

    /// Extract several pages of one document in parallel.
    ///
    /// Pages already cached are skipped. Returns the page numbers that
    /// failed to extract.
    pub fn prefetch<S>(&self, document_id: &str, pages: &[(u32, S)]) -> Vec<u32>
    where
        S: PageTextSource + Sync,
    {
        let pending: Vec<(PageKey, &S)> = pages
            .iter()
            .map(|(page, source)| (PageKey::new(document_id, *page), source))
            .filter(|(key, _)| !self.contains(key))
            .collect();

        let results: Vec<(PageKey, Result<Vec<Token>, LocatorError>)> = pending
            .into_par_iter()
            .map(|(key, source)| {
                let tokens = extract_tokens(source);
                (key, tokens)
            })
            .collect();

        let mut failed = Vec::new();
        for (key, tokens) in results {
            match tokens {
                Ok(tokens) => {
                    self.insert(key, PageTextData::from_tokens(tokens));
                }
                Err(e) => {
                    log::warn!("prefetch failed for {}: {}", key, e);
                    failed.push(key.page);
                }
            }
        }
        failed
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry (end of session)
    pub fn clear(&self) {
        self.write_entries().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            pages: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PageKey, Arc<PageTextData>>> {
        // Entries are immutable once inserted, so a poisoned lock still
        // guards consistent data
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_entries(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<PageKey, Arc<PageTextData>>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
