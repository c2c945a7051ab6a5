use std::fmt;
use chrono::Local;
use crate::domain_filter::{host_of, DomainFilterPolicy};
use crate::image_search::{ImageSearch, SearchOutcome};
use crate::record::ProductRecord;

/// Error messages are cut to this many characters in the status column.
pub const ERROR_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    Pending,
    Success,
    Filtered,
    Failed,
    Error(String),
}

impl SearchStatus {
    pub fn error(message: &str) -> Self {
        SearchStatus::Error(message.chars().take(ERROR_MESSAGE_LIMIT).collect())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SearchStatus::Success)
    }

    pub fn counts_as_failed(&self) -> bool {
        matches!(self, SearchStatus::Failed | SearchStatus::Error(_))
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStatus::Pending => Ok(()),
            SearchStatus::Success => f.write_str("Success"),
            SearchStatus::Filtered => f.write_str("Filtered - No allowed domains"),
            SearchStatus::Failed => f.write_str("Failed - No images found"),
            SearchStatus::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub selected_values: Vec<String>,
    pub image_url_1: String,
    pub image_url_2: String,
    pub product_page_url: String,
}

impl ResultRow {
    pub const URL_COLUMNS: [&'static str; 3] = ["Image_URL_1", "Image_URL_2", "Product_Page_URL"];

    pub fn pending(record: &ProductRecord) -> Self {
        ResultRow {
            selected_values: record.selected_values.clone(),
            image_url_1: String::new(),
            image_url_2: String::new(),
            product_page_url: String::new(),
        }
    }

    fn fill(&mut self, outcome: &SearchOutcome) {
        let mut urls = outcome.image_urls.iter();
        if let Some(url) = urls.next() {
            self.image_url_1 = url.clone();
        }
        if let Some(url) = urls.next() {
            self.image_url_2 = url.clone();
        }
        if let Some(page) = &outcome.source_page_url {
            self.product_page_url = page.clone();
        }
    }

    pub fn to_record(&self) -> Vec<String> {
        let mut cells = self.selected_values.clone();
        cells.push(self.image_url_1.clone());
        cells.push(self.image_url_2.clone());
        cells.push(self.product_page_url.clone());
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub product_id: String,
    pub search_query: String,
    pub source_domain: String,
    pub images_found: usize,
    pub status: SearchStatus,
    pub processed_at: String,
}

impl StatsRow {
    pub const COLUMNS: [&'static str; 6] = [
        "Product_ID",
        "Search_Query",
        "Source_Domain",
        "Images_Found",
        "Search_Status",
        "Processed_DateTime",
    ];

    pub fn pending(record: &ProductRecord) -> Self {
        StatsRow {
            product_id: record.id.clone(),
            search_query: String::new(),
            source_domain: String::new(),
            images_found: 0,
            status: SearchStatus::Pending,
            processed_at: String::new(),
        }
    }
}

pub struct RowProcessor<'a, S: ImageSearch + ?Sized> {
    search: &'a S,
    policy: &'a DomainFilterPolicy,
}

impl<'a, S: ImageSearch + ?Sized> RowProcessor<'a, S> {
    pub fn new(search: &'a S, policy: &'a DomainFilterPolicy) -> Self {
        RowProcessor { search, policy }
    }

    pub fn process(&self, record: &ProductRecord) -> (ResultRow, StatsRow) {
        let mut result = ResultRow::pending(record);
        let mut stats = StatsRow::pending(record);
        stats.search_query = record.search_query();

        match self
            .search
            .search(&record.description, record.supplier(), record.brand(), self.policy)
        {
            Ok(outcome) => {
                result.fill(&outcome);
                stats.images_found = outcome.image_urls.len();
                stats.source_domain = outcome
                    .source_page_url
                    .as_deref()
                    .and_then(host_of)
                    .unwrap_or_default();
                stats.status = self.classify(&outcome);
            }
            Err(e) => {
                stats.status = SearchStatus::error(&e.to_string());
            }
        }

        stats.processed_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        (result, stats)
    }

    fn classify(&self, outcome: &SearchOutcome) -> SearchStatus {
        if !outcome.is_empty() {
            SearchStatus::Success
        } else if self.policy.is_active() {
            SearchStatus::Filtered
        } else {
            SearchStatus::Failed
        }
    }
}
