use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use log::{info, warn};
use crate::checkpoint::{CheckpointSnapshot, CheckpointTracker};
use crate::delay_manager::{DelayManager, DelaySettings};
use crate::domain_filter::DomainFilterPolicy;
use crate::image_search::ImageSearch;
use crate::progress::{ProgressSink, RowUpdate};
use crate::record::ProductRecord;
use crate::row_processor::{ResultRow, RowProcessor, SearchStatus, StatsRow};

const START_DESCRIPTION_CHARS: usize = 40;
const COMPLETE_DESCRIPTION_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub checkpoint_interval: usize,
    pub delays: DelaySettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            checkpoint_interval: 10,
            delays: DelaySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub filtered: usize,
}

impl RunCounters {
    pub fn record(&mut self, status: &SearchStatus) {
        self.processed += 1;
        if status.is_success() {
            self.success += 1;
        } else if status.counts_as_failed() {
            self.failed += 1;
        } else if *status == SearchStatus::Filtered {
            self.filtered += 1;
        }
    }

    pub fn success_rate_pct(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.success as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub results: Vec<ResultRow>,
    pub stats: Vec<StatsRow>,
    pub counters: RunCounters,
    pub last_checkpoint: Option<CheckpointSnapshot>,
}

pub struct BatchPipeline<'a, S: ImageSearch + ?Sized> {
    search: &'a S,
    policy: DomainFilterPolicy,
    settings: PipelineSettings,
    delays: DelayManager,
    stop: Option<Arc<AtomicBool>>,
}

impl<'a, S: ImageSearch + ?Sized> BatchPipeline<'a, S> {
    pub fn new(search: &'a S, policy: DomainFilterPolicy, settings: PipelineSettings) -> Self {
        let delays = DelayManager::new(settings.delays.clone());
        BatchPipeline {
            search,
            policy,
            settings,
            delays,
            stop: None,
        }
    }

    /// Rows not yet started when `stop` is set are left pending.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }

    pub fn run(&self, records: &[ProductRecord], sink: &mut dyn ProgressSink) -> BatchOutput {
        if records.is_empty() {
            return BatchOutput::default();
        }

        let total = records.len();
        let processor = RowProcessor::new(self.search, &self.policy);
        let mut checkpoints = CheckpointTracker::new(self.settings.checkpoint_interval);
        let mut counters = RunCounters::default();

        // Every row exists up front so the output stays aligned with the input.
        let mut results: Vec<ResultRow> = records.iter().map(ResultRow::pending).collect();
        let mut stats: Vec<StatsRow> = records.iter().map(StatsRow::pending).collect();

        for (i, record) in records.iter().enumerate() {
            if self.stop_requested() {
                warn!("Stop requested; {} of {} rows left unprocessed", total - i, total);
                break;
            }

            let position = i + 1;
            sink.on_row_start(position, total, &record.id, &record.short_description(START_DESCRIPTION_CHARS));

            let (result, stat) = processor.process(record);
            counters.record(&stat.status);

            sink.on_row_complete(&RowUpdate {
                index: position,
                total,
                product_id: &record.id,
                status: &stat.status,
                images_found: stat.images_found,
                source_domain: &stat.source_domain,
                short_description: &record.short_description(COMPLETE_DESCRIPTION_CHARS),
            });

            results[i] = result;
            stats[i] = stat;

            if checkpoints.maybe_capture(position, &results) {
                sink.on_checkpoint(position);
                self.delays.checkpoint_pause();
            }

            if position < total {
                self.delays.row_delay(counters.failed, counters.success);
            }
        }

        let rate = counters.success_rate_pct(total);
        sink.on_run_complete(total, counters.success, counters.failed, rate);
        info!(
            "Run finished: {} processed, {} success, {} failed, {} filtered",
            counters.processed, counters.success, counters.failed, counters.filtered
        );

        BatchOutput {
            results,
            stats,
            counters,
            last_checkpoint: checkpoints.into_latest(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScraperError};
    use crate::image_search::SearchOutcome;
    use crate::progress::NullProgressSink;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    // Succeeds for even calls, errors on every third, finds nothing otherwise.
    struct Alternating {
        calls: Cell<usize>,
    }

    impl ImageSearch for Alternating {
        fn search(&self, description: &str, _: &str, _: &str, _: &DomainFilterPolicy) -> Result<SearchOutcome> {
            let n = self.calls.get();
            self.calls.set(n + 1);
            if n % 3 == 2 {
                return Err(ScraperError::Transport(format!("boom on {}", description)));
            }
            if n % 2 == 0 {
                Ok(SearchOutcome {
                    image_urls: vec![format!("https://cdn.example.com/images/{}.jpg", description)],
                    source_page_url: Some(format!("https://shop{}.example.com/p", n)),
                })
            } else {
                Ok(SearchOutcome::default())
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<usize>,
        completed: Vec<String>,
        checkpoints: Vec<usize>,
        finished: Option<(usize, usize, usize, f64)>,
    }

    impl ProgressSink for Recorder {
        fn on_row_start(&mut self, index: usize, _: usize, _: &str, _: &str) {
            self.started.push(index);
        }
        fn on_row_complete(&mut self, update: &RowUpdate<'_>) {
            self.completed.push(update.status.to_string());
        }
        fn on_checkpoint(&mut self, index: usize) {
            self.checkpoints.push(index);
        }
        fn on_run_complete(&mut self, total: usize, success: usize, failed: usize, rate: f64) {
            self.finished = Some((total, success, failed, rate));
        }
    }

    fn records(n: usize) -> Vec<ProductRecord> {
        (0..n)
            .map(|i| ProductRecord::new(i, &format!("P{}", i), &format!("item{}", i), None, None))
            .collect()
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            checkpoint_interval: 10,
            delays: DelaySettings::none(),
        }
    }

    #[test]
    fn output_is_aligned_with_input_even_with_errors() {
        let search = Alternating { calls: Cell::new(0) };
        let input = records(23);
        let pipeline = BatchPipeline::new(&search, DomainFilterPolicy::allow_all(), settings());
        let mut sink = Recorder::default();

        let out = pipeline.run(&input, &mut sink);

        assert_eq!(out.results.len(), 23);
        assert_eq!(out.stats.len(), 23);
        for (record, stat) in input.iter().zip(&out.stats) {
            assert_eq!(record.id, stat.product_id);
            assert_ne!(stat.status, SearchStatus::Pending);
        }
        assert_eq!(out.counters.processed, 23);
        assert_eq!(
            out.counters.success + out.counters.failed + out.counters.filtered,
            23
        );
        assert_eq!(sink.started, (1..=23).collect::<Vec<_>>());
        assert_eq!(sink.checkpoints, vec![10, 20]);
        assert_eq!(out.last_checkpoint.as_ref().unwrap().last_processed_index, 19);
        assert!(sink.completed.iter().any(|s| s.starts_with("Error: ")));
    }

    #[test]
    fn counters_match_classification() {
        let search = Alternating { calls: Cell::new(0) };
        let pipeline = BatchPipeline::new(&search, DomainFilterPolicy::allow_all(), settings());
        let mut sink = Recorder::default();

        // calls 0..6: success, empty, error, empty, success, error
        let out = pipeline.run(&records(6), &mut sink);

        assert_eq!(out.counters.success, 2);
        assert_eq!(out.counters.failed, 4);
        assert_eq!(out.counters.filtered, 0);
        let (total, success, failed, rate) = sink.finished.unwrap();
        assert_eq!((total, success, failed), (6, 2, 4));
        assert!((rate - 33.333).abs() < 0.01);
    }

    #[test]
    fn empty_results_with_policy_count_as_filtered() {
        struct Nothing;
        impl ImageSearch for Nothing {
            fn search(&self, _: &str, _: &str, _: &str, _: &DomainFilterPolicy) -> Result<SearchOutcome> {
                Ok(SearchOutcome::default())
            }
        }
        let policy = DomainFilterPolicy::new(Some(vec!["amazon.com".into()]), None);
        let pipeline = BatchPipeline::new(&Nothing, policy, settings());
        let out = pipeline.run(&records(3), &mut NullProgressSink);
        assert_eq!(out.counters.filtered, 3);
        assert_eq!(out.counters.failed, 0);
    }

    #[test]
    fn zero_rows_returns_immediately() {
        let search = Alternating { calls: Cell::new(0) };
        let pipeline = BatchPipeline::new(&search, DomainFilterPolicy::allow_all(), settings());
        let mut sink = Recorder::default();
        let out = pipeline.run(&[], &mut sink);
        assert!(out.results.is_empty() && out.stats.is_empty());
        assert_eq!(search.calls.get(), 0);
        assert!(sink.finished.is_none());
    }

    #[test]
    fn stop_signal_leaves_remaining_rows_pending() {
        let search = Alternating { calls: Cell::new(0) };
        let stop = Arc::new(AtomicBool::new(true));
        let pipeline = BatchPipeline::new(&search, DomainFilterPolicy::allow_all(), settings())
            .with_stop_signal(stop);
        let out = pipeline.run(&records(4), &mut NullProgressSink);
        assert_eq!(out.stats.len(), 4);
        assert!(out.stats.iter().all(|s| s.status == SearchStatus::Pending));
        assert_eq!(out.counters.processed, 0);
    }

    struct Always(bool);

    impl ImageSearch for Always {
        fn search(&self, description: &str, _: &str, _: &str, _: &DomainFilterPolicy) -> Result<SearchOutcome> {
            if self.0 {
                Ok(SearchOutcome {
                    image_urls: vec![format!("https://cdn.example.com/images/{}.jpg", description)],
                    source_page_url: Some("https://shop.example.com/p".to_string()),
                })
            } else {
                Ok(SearchOutcome::default())
            }
        }
    }

    fn paced(base_ms: u64, backoff_ms: u64, checkpoint_interval: usize, checkpoint_pause_ms: u64) -> PipelineSettings {
        let mut delays = DelaySettings::none();
        delays.row_delay_base = Duration::from_millis(base_ms);
        delays.row_delay_backoff_min = Duration::from_millis(backoff_ms);
        delays.row_delay_backoff_max = Duration::from_millis(backoff_ms);
        delays.checkpoint_pause = Duration::from_millis(checkpoint_pause_ms);
        PipelineSettings {
            checkpoint_interval,
            delays,
        }
    }

    fn timed_run(search: &Always, rows: usize, settings: PipelineSettings) -> (BatchOutput, Duration) {
        let pipeline = BatchPipeline::new(search, DomainFilterPolicy::allow_all(), settings);
        let started = Instant::now();
        let out = pipeline.run(&records(rows), &mut NullProgressSink);
        (out, started.elapsed())
    }

    #[test]
    fn failures_widen_the_row_delay() {
        let (out, elapsed) = timed_run(&Always(false), 2, paced(20, 150, 0, 0));
        assert_eq!(out.counters.failed, 2);
        // one delay between the two rows, drawn from the backoff window
        assert!(elapsed >= Duration::from_millis(170), "{:?}", elapsed);
    }

    #[test]
    fn healthy_runs_use_the_base_window() {
        let (out, elapsed) = timed_run(&Always(true), 2, paced(20, 5_000, 0, 0));
        assert_eq!(out.counters.success, 2);
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    }

    #[test]
    fn no_row_delay_after_the_last_row() {
        let (out, elapsed) = timed_run(&Always(false), 1, paced(5_000, 5_000, 0, 0));
        assert_eq!(out.counters.processed, 1);
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    }

    #[test]
    fn checkpoints_pause_the_run() {
        let (out, elapsed) = timed_run(&Always(true), 1, paced(5_000, 5_000, 1, 60));
        assert!(out.last_checkpoint.is_some());
        assert!(elapsed >= Duration::from_millis(60));
        assert!(elapsed < Duration::from_secs(2), "{:?}", elapsed);
    }

    #[test]
    fn success_rate_of_empty_run_is_zero() {
        assert_eq!(RunCounters::default().success_rate_pct(0), 0.0);
    }
}
