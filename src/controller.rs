//! Feature switch and highlight orchestration
//!
//! The controller owns the on/off state, the active [`HighlightRequest`] and
//! its result. It pulls page text through the injected [`PageTextCache`],
//! runs the matcher, and feeds the overlay and lens renderers.
//!
//! Extraction is split in two steps so hosts with an asynchronous renderer
//! can resolve it later: [`request`](HighlightController::request) returns a
//! ticket when the page is not cached, and
//! [`complete_extraction`](HighlightController::complete_extraction) applies
//! the result, unless the user has moved on to another page or request in
//! the meantime.

use crate::cache::{ExtractionTicket, PageKey, PageTextCache, PageTextData};
use crate::extractor::{extract_tokens, PageTextSource, Token};
use crate::lens::{LensFrame, LensInputs, MagnifyingLens, PageAnchor};
use crate::matcher::{find_match, HighlightRequest, MatchResult};
use crate::overlay::{HighlightOverlay, OverlayFrame};
use crate::settings::{EnablementStore, LocatorConfig};
use crate::transform::{PageViewport, RasterInfo};
use crate::LocatorError;
use std::sync::Arc;

/// What happened to a highlight request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestStatus {
    /// The feature is off; nothing was done
    Disabled,
    /// Page text was cached; matches are up to date
    Ready,
    /// Page text must be extracted first; pass the tokens to
    /// [`HighlightController::complete_extraction`]
    NeedsExtraction(ExtractionTicket),
}

#[derive(Debug, Clone)]
struct ActiveHighlight {
    key: PageKey,
    request: HighlightRequest,
}

pub struct HighlightController {
    config: LocatorConfig,
    cache: Arc<PageTextCache>,
    store: Box<dyn EnablementStore>,
    enabled: bool,
    current_page: Option<PageKey>,
    active: Option<ActiveHighlight>,
    matches: Vec<MatchResult>,
    diagnostic: Option<String>,
    overlay: HighlightOverlay,
    lens: MagnifyingLens,
}

impl HighlightController {
    /// Create a controller; the enabled flag is read from `store`
    pub fn new(
        cache: Arc<PageTextCache>,
        store: Box<dyn EnablementStore>,
        config: LocatorConfig,
    ) -> Self {
        let enabled = store.load();
        let overlay = HighlightOverlay::new(config.overlay.clone());
        let lens = MagnifyingLens::new(config.lens.clone(), config.overlay.clone());
        Self {
            config,
            cache,
            store,
            enabled,
            current_page: None,
            active: None,
            matches: Vec::new(),
            diagnostic: None,
            overlay,
            lens,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the feature on or off and persist the choice.
    ///
    /// Turning it off drops the active highlight.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), LocatorError> {
        if enabled == self.enabled {
            return Ok(());
        }
        self.store.save(enabled)?;
        self.enabled = enabled;
        log::info!("field highlighting {}", if enabled { "enabled" } else { "disabled" });
        if !enabled {
            self.clear();
        }
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<bool, LocatorError> {
        self.set_enabled(!self.enabled)?;
        Ok(self.enabled)
    }

    /// The page the user is looking at changed.
    ///
    /// Leaving the active page hides its matches; coming back recomputes
    /// them from the cache.
    pub fn navigate(&mut self, key: PageKey) {
        let returning = match self.active.as_ref() {
            Some(active) if active.key != key => {
                self.matches.clear();
                false
            }
            Some(_) => self.enabled && self.matches.is_empty(),
            None => false,
        };
        if returning {
            if let Some(data) = self.cache.get(&key) {
                self.apply(&data);
            }
        }
        self.current_page = Some(key);
    }

    pub fn current_page(&self) -> Option<&PageKey> {
        self.current_page.as_ref()
    }

    /// Locate `request` on page `key`
    pub fn request(&mut self, key: PageKey, request: HighlightRequest) -> RequestStatus {
        if !self.enabled {
            return RequestStatus::Disabled;
        }

        self.current_page = Some(key.clone());
        self.active = Some(ActiveHighlight {
            key: key.clone(),
            request,
        });
        self.matches.clear();
        self.diagnostic = None;

        if let Some(data) = self.cache.get(&key) {
            self.apply(&data);
            return RequestStatus::Ready;
        }
        match self.cache.begin(&key) {
            Some(ticket) => RequestStatus::NeedsExtraction(ticket),
            None => {
                // Another extraction filled the page meanwhile
                if let Some(data) = self.cache.get(&key) {
                    self.apply(&data);
                }
                RequestStatus::Ready
            }
        }
    }

    /// Deliver the outcome of an extraction started by [`request`](Self::request).
    ///
    /// The tokens are cached either way. Returns `true` when they were used
    /// for the active highlight, `false` when the result arrived for a page
    /// or request that is no longer current.
    pub fn complete_extraction(
        &mut self,
        ticket: &ExtractionTicket,
        tokens: Result<Vec<Token>, LocatorError>,
    ) -> bool {
        let stored = self.cache.complete(ticket, tokens);

        let is_current = self.enabled
            && self.current_page.as_ref() == Some(&ticket.key)
            && self.active.as_ref().is_some_and(|a| a.key == ticket.key);
        if !is_current {
            log::debug!("ignoring stale extraction {} for {}", ticket.generation, ticket.key);
            return false;
        }

        match stored {
            Ok(data) => self.apply(&data),
            Err(e) => {
                self.matches.clear();
                self.diagnostic = Some(format!("Text extraction failed for {}: {}", ticket.key, e));
            }
        }
        true
    }

    /// Request and, if needed, extract synchronously from `source`
    pub fn highlight(
        &mut self,
        key: PageKey,
        request: HighlightRequest,
        source: &dyn PageTextSource,
    ) -> &[MatchResult] {
        if let RequestStatus::NeedsExtraction(ticket) = self.request(key, request) {
            let tokens = extract_tokens(source);
            self.complete_extraction(&ticket, tokens);
        }
        &self.matches
    }

    /// Drop the active highlight
    pub fn clear(&mut self) {
        self.active = None;
        self.matches.clear();
        self.diagnostic = None;
    }

    pub fn active_request(&self) -> Option<&HighlightRequest> {
        self.active.as_ref().map(|a| &a.request)
    }

    /// Current matches (empty when nothing was found)
    pub fn matches(&self) -> &[MatchResult] {
        &self.matches
    }

    /// Why the last request found nothing; for troubleshooting display only
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn cache(&self) -> &Arc<PageTextCache> {
        &self.cache
    }

    /// Overlay layer for the current page at `viewport`
    pub fn overlay(&mut self, viewport: PageViewport) -> &OverlayFrame {
        self.overlay.update(&self.matches, viewport, self.enabled);
        self.overlay.frame()
    }

    /// Lens for the current match
    pub fn lens(
        &mut self,
        viewport: PageViewport,
        raster: Option<RasterInfo>,
        anchor: Option<PageAnchor>,
    ) -> &LensFrame {
        self.lens.update(LensInputs {
            matched: self.matches.first().cloned(),
            viewport,
            raster,
            anchor,
            enabled: self.enabled,
        });
        self.lens.frame()
    }

    fn apply(&mut self, data: &PageTextData) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let outcome = find_match(&active.request, data, &self.config.matching);
        self.matches = outcome.result.into_iter().collect();
        self.diagnostic = outcome.diagnostic;
    }
}
