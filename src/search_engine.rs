use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use log::{debug, info};
use crate::error::{Result, ScraperError};
use crate::extractor::Extractor;

/// Executes one live image search and returns the raw result payloads in
/// engine order.
///
/// Implementations own their network session. An `Err` is a transport
/// failure and counts against the caller's retry budget.
pub trait SearchTransport {
    fn fetch_results(&self, query: &str) -> Result<Vec<String>>;
}

impl<T: SearchTransport + ?Sized> SearchTransport for &T {
    fn fetch_results(&self, query: &str) -> Result<Vec<String>> {
        (**self).fetch_results(query)
    }
}

pub struct BingImageSearch {
    client: Client,
    extractor: Extractor,
    base_url: String,
}

impl BingImageSearch {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.bing.com/images/search";

    pub fn new() -> Result<Self> {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        info!("Image search session ready ({})", base_url);

        Ok(BingImageSearch {
            client,
            extractor: Extractor::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn search_url(&self, query: &str) -> String {
        format!("{}?q={}&first=1", self.base_url, urlencoding::encode(query))
    }
}

impl SearchTransport for BingImageSearch {
    fn fetch_results(&self, query: &str) -> Result<Vec<String>> {
        let search_url = self.search_url(query);
        debug!("GET {}", search_url);

        let resp = self.client.get(&search_url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScraperError::Transport(format!(
                "search returned status {}",
                status
            )));
        }

        let text = resp.text()?;
        let payloads = self.extractor.extract_payloads(&text);
        debug!("{} raw results for '{}'", payloads.len(), query);
        Ok(payloads)
    }
}
