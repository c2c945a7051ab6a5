use std::path::PathBuf;
use std::time::Duration;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use crate::delay_manager::DelaySettings;
use crate::domain_filter::{DomainFilterPolicy, RECOMMENDED_BLACKLIST};
use crate::image_search::SearchSettings;
use crate::pipeline::PipelineSettings;
use crate::report_writer::default_workbook_name;

pub const DEFAULT_ROW_LIMIT: usize = 100;
pub const DEFAULT_CSV_DIR: &str = "results";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One workbook with Results, Summary and Statistics sheets
    Xlsx,
    /// Results.csv, Summary.csv and Statistics.csv in a directory
    Csv,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "product-image-scraper",
    about = "Find product image URLs for spreadsheet rows and write an annotated report"
)]
pub struct Cli {
    /// Input table (.xlsx/.xls/.xlsm/.ods, anything else is read as CSV)
    #[arg(long, env = "PIS_INPUT")]
    pub input: PathBuf,

    /// Sheet to process (defaults to the first sheet)
    #[arg(long, env = "PIS_SHEET")]
    pub sheet: Option<String>,

    /// List the sheets of the input file and exit
    #[arg(long, default_value_t = false)]
    pub list_sheets: bool,

    /// Product ID column (guessed from headers when omitted)
    #[arg(long, env = "PIS_ID_COLUMN")]
    pub id_column: Option<String>,

    /// Product description column (guessed from headers when omitted)
    #[arg(long, env = "PIS_DESCRIPTION_COLUMN")]
    pub description_column: Option<String>,

    /// Supplier column
    #[arg(long, env = "PIS_SUPPLIER_COLUMN")]
    pub supplier_column: Option<String>,

    /// Brand column
    #[arg(long, env = "PIS_BRAND_COLUMN")]
    pub brand_column: Option<String>,

    /// Number of rows to process (clamped to the rows available)
    #[arg(long, env = "PIS_ROWS")]
    pub rows: Option<usize>,

    /// Only accept images hosted on these domains, comma separated
    #[arg(long, env = "PIS_WHITELIST")]
    pub whitelist: Option<String>,

    /// Never accept images hosted on these domains, comma separated
    #[arg(long, env = "PIS_BLACKLIST")]
    pub blacklist: Option<String>,

    /// Add pinterest, facebook, instagram, aliexpress, temu and wish to the blacklist
    #[arg(long, default_value_t = false)]
    pub recommended_blacklist: bool,

    /// Report format
    #[arg(long, value_enum, env = "PIS_FORMAT", default_value_t = OutputFormat::Xlsx)]
    pub format: OutputFormat,

    /// Workbook path or directory (xlsx), or output directory (csv)
    #[arg(long, env = "PIS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Image URLs kept per product
    #[arg(long, default_value_t = 2)]
    pub max_results: usize,

    /// Search attempts per product
    #[arg(long, default_value_t = 2)]
    pub retry_count: usize,

    /// Milliseconds to wait after a failed search attempt
    #[arg(long, default_value_t = 3000)]
    pub retry_backoff_ms: u64,

    /// Base milliseconds to wait between rows
    #[arg(long, env = "PIS_BASE_DELAY_MS", default_value_t = 2500)]
    pub base_delay_ms: u64,

    /// Rows between in-memory checkpoints (0 disables)
    #[arg(long, default_value_t = 10)]
    pub checkpoint_interval: usize,

    /// Disable every pause (request jitter, retry backoff, row delay)
    #[arg(long, default_value_t = false)]
    pub no_delay: bool,

    /// Override the search endpoint
    #[arg(long, env = "PIS_SEARCH_URL")]
    pub search_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "PIS_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Cli {
    pub fn domain_policy(&self) -> DomainFilterPolicy {
        let mut blacklist = self.blacklist.as_deref().map(split_list);
        if self.recommended_blacklist {
            let list = blacklist.get_or_insert_with(Vec::new);
            for domain in RECOMMENDED_BLACKLIST {
                if !list.iter().any(|d| d.eq_ignore_ascii_case(domain)) {
                    list.push(domain.to_string());
                }
            }
        }
        DomainFilterPolicy::new(self.whitelist.as_deref().map(split_list), blacklist)
    }

    // An existing directory given for xlsx gets the timestamped default name.
    pub fn output_target(&self, rows: usize) -> PathBuf {
        match (self.format, &self.output) {
            (OutputFormat::Csv, Some(dir)) => dir.clone(),
            (OutputFormat::Csv, None) => PathBuf::from(DEFAULT_CSV_DIR),
            (OutputFormat::Xlsx, Some(path)) if path.is_dir() => path.join(default_workbook_name(rows)),
            (OutputFormat::Xlsx, Some(path)) => path.clone(),
            (OutputFormat::Xlsx, None) => PathBuf::from(default_workbook_name(rows)),
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            max_results: self.max_results.max(1),
            retry_count: self.retry_count.max(1),
        }
    }

    pub fn delay_settings(&self) -> DelaySettings {
        if self.no_delay {
            return DelaySettings::none();
        }
        let mut delays = DelaySettings::default()
            .with_row_delay_base(Duration::from_millis(self.base_delay_ms));
        delays.retry_backoff = Duration::from_millis(self.retry_backoff_ms);
        delays
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            checkpoint_interval: self.checkpoint_interval,
            delays: self.delay_settings(),
        }
    }

    pub fn row_limit(&self, available: usize) -> usize {
        let wanted = self.rows.unwrap_or(DEFAULT_ROW_LIMIT);
        wanted.clamp(1, available.max(1)).min(available)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["product-image-scraper", "--input", "products.xlsx"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_reference_pacing() {
        let cli = parse(&[]);
        assert_eq!(cli.search_settings(), SearchSettings::default());
        assert_eq!(cli.pipeline_settings(), PipelineSettings::default());
        assert!(!cli.domain_policy().is_active());
        assert_eq!(cli.format, OutputFormat::Xlsx);
        let target = cli.output_target(40);
        let name = target.to_string_lossy();
        assert!(name.starts_with("Product_URLs_Results_40rows_"));
        assert!(name.ends_with(".xlsx"));
    }

    #[test]
    fn output_targets_per_format() {
        assert_eq!(parse(&["--format", "csv"]).output_target(3), PathBuf::from("results"));
        assert_eq!(
            parse(&["--format", "csv", "--output", "out"]).output_target(3),
            PathBuf::from("out")
        );
        assert_eq!(
            parse(&["--output", "report.xlsx"]).output_target(3),
            PathBuf::from("report.xlsx")
        );

        let dir = tempfile::tempdir().unwrap();
        let cli = parse(&["--output", dir.path().to_str().unwrap()]);
        let target = cli.output_target(7);
        assert_eq!(target.parent(), Some(dir.path()));
        assert!(target
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Product_URLs_Results_7rows_"));
    }

    #[test]
    fn recommended_blacklist_merges_with_custom_entries() {
        let cli = parse(&["--recommended-blacklist", "--blacklist", "ebay.com, Pinterest.com"]);
        let policy = cli.domain_policy();
        let blacklist = policy.blacklist().unwrap();
        assert_eq!(blacklist.len(), 7);
        assert_eq!(blacklist[0], "ebay.com");
        assert_eq!(blacklist[1], "pinterest.com");
        assert!(blacklist.iter().any(|d| d == "wish.com"));
        assert!(!policy.is_allowed("https://www.facebook.com/marketplace/item/1"));
        assert!(policy.is_allowed("https://www.amazon.com/dp/1"));
    }

    #[test]
    fn recommended_blacklist_alone_enables_filter() {
        let policy = parse(&["--recommended-blacklist"]).domain_policy();
        assert_eq!(policy.blacklist().map(|l| l.len()), Some(RECOMMENDED_BLACKLIST.len()));
        assert!(policy.whitelist().is_none());
    }

    #[test]
    fn lists_are_split_and_blank_entries_dropped() {
        let cli = parse(&["--whitelist", "amazon.com, ,bestbuy.com", "--blacklist", " pinterest.com ,"]);
        let policy = cli.domain_policy();
        assert_eq!(
            policy.whitelist(),
            Some(&["amazon.com".to_string(), "bestbuy.com".to_string()][..])
        );
        assert_eq!(policy.blacklist(), Some(&["pinterest.com".to_string()][..]));
    }

    #[test]
    fn empty_list_disables_filter() {
        let cli = parse(&["--whitelist", " , "]);
        assert!(!cli.domain_policy().is_active());
    }

    #[test]
    fn row_limit_is_clamped() {
        assert_eq!(parse(&[]).row_limit(40), 40);
        assert_eq!(parse(&[]).row_limit(500), 100);
        assert_eq!(parse(&["--rows", "0"]).row_limit(10), 1);
        assert_eq!(parse(&["--rows", "25"]).row_limit(10), 10);
        assert_eq!(parse(&["--rows", "5"]).row_limit(0), 0);
    }

    #[test]
    fn no_delay_disables_pauses() {
        let cli = parse(&["--no-delay", "--base-delay-ms", "9000"]);
        assert_eq!(cli.delay_settings(), DelaySettings::none());
    }

    #[test]
    fn tunables_flow_into_settings() {
        let cli = parse(&["--retry-count", "4", "--retry-backoff-ms", "100", "--base-delay-ms", "500", "--checkpoint-interval", "0"]);
        assert_eq!(cli.search_settings().retry_count, 4);
        let settings = cli.pipeline_settings();
        assert_eq!(settings.checkpoint_interval, 0);
        assert_eq!(settings.delays.retry_backoff, Duration::from_millis(100));
        assert_eq!(settings.delays.row_delay_base, Duration::from_millis(500));
    }
}
