use log::{debug, warn};
use crate::delay_manager::DelayManager;
use crate::domain_filter::DomainFilterPolicy;
use crate::error::Result;
use crate::extractor::decode_candidate;
use crate::record::compose_query;
use crate::search_engine::SearchTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub max_results: usize,
    pub retry_count: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_results: 2,
            retry_count: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub image_urls: Vec<String>,
    pub source_page_url: Option<String>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.image_urls.is_empty()
    }
}

/// Product image lookup as seen by the row processor.
///
/// Returned URLs have already passed `policy`. An `Err` means the lookup
/// itself broke; an exhausted retry budget is reported as an empty outcome.
pub trait ImageSearch {
    fn search(
        &self,
        description: &str,
        supplier: &str,
        brand: &str,
        policy: &DomainFilterPolicy,
    ) -> Result<SearchOutcome>;
}

pub struct ImageSearchClient<T: SearchTransport> {
    transport: T,
    settings: SearchSettings,
    delays: DelayManager,
}

impl<T: SearchTransport> ImageSearchClient<T> {
    pub fn new(transport: T, settings: SearchSettings, delays: DelayManager) -> Self {
        ImageSearchClient {
            transport,
            settings,
            delays,
        }
    }

    fn collect_candidates(
        &self,
        payloads: &[String],
        policy: &DomainFilterPolicy,
        outcome: &mut SearchOutcome,
    ) {
        let max_results = self.settings.max_results;

        // Look a little past the cap so filtered candidates can be replaced.
        for payload in payloads.iter().take(max_results.saturating_mul(3)) {
            if outcome.image_urls.len() >= max_results {
                break;
            }

            let candidate = match decode_candidate(payload) {
                Ok(c) => c,
                Err(e) => {
                    debug!("Skipping result: {}", e);
                    continue;
                }
            };

            if !policy.is_allowed(&candidate.page_url) {
                debug!("Filtered result from {}", candidate.page_url);
                continue;
            }

            if candidate.has_usable_image() {
                outcome.image_urls.push(candidate.image_url);
                if outcome.source_page_url.is_none() && !candidate.page_url.is_empty() {
                    outcome.source_page_url = Some(candidate.page_url);
                }
            }
        }
    }
}

impl<T: SearchTransport> ImageSearch for ImageSearchClient<T> {
    fn search(
        &self,
        description: &str,
        supplier: &str,
        brand: &str,
        policy: &DomainFilterPolicy,
    ) -> Result<SearchOutcome> {
        let query = compose_query(description, supplier, brand);
        let attempts = self.settings.retry_count.max(1);
        let mut outcome = SearchOutcome::default();

        for attempt in 1..=attempts {
            self.delays.request_delay();

            match self.transport.fetch_results(&query) {
                Ok(payloads) => {
                    self.collect_candidates(&payloads, policy, &mut outcome);
                    if !outcome.is_empty() {
                        break;
                    }
                    debug!("Attempt {}/{} for '{}' found no usable images", attempt, attempts, query);
                }
                Err(e) => {
                    if attempt < attempts {
                        warn!("Search attempt {}/{} for '{}' failed: {}", attempt, attempts, query, e);
                        self.delays.retry_backoff();
                    } else {
                        warn!("Search failed after {} attempts: {}", attempts, e);
                    }
                }
            }
        }

        outcome.image_urls.truncate(self.settings.max_results);
        Ok(outcome)
    }
}
