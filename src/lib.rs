pub mod error;
pub mod logger;
pub mod config;
pub mod record;
pub mod domain_filter;
pub mod delay_manager;
pub mod extractor;
pub mod search_engine;
pub mod image_search;
pub mod row_processor;
pub mod progress;
pub mod checkpoint;
pub mod pipeline;
pub mod report;
pub mod report_writer;
pub mod input_loader;

// Exporting types for convenience
pub use error::{Result, ScraperError};
pub use record::{compose_query, ProductRecord};
pub use domain_filter::{is_allowed, DomainFilterPolicy};
pub use search_engine::{BingImageSearch, SearchTransport};
pub use image_search::{ImageSearch, ImageSearchClient, SearchOutcome, SearchSettings};
pub use row_processor::{ResultRow, RowProcessor, SearchStatus, StatsRow};
pub use progress::{LogProgressSink, ProgressSink, RowUpdate};
pub use pipeline::{BatchOutput, BatchPipeline, PipelineSettings, RunCounters};
pub use report::{Report, ReportBuilder, ReportThresholds, Table};
pub use input_loader::{ColumnSelection, InputTable};
