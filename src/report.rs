use std::collections::HashMap;
use crate::row_processor::{ResultRow, StatsRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>) -> Self {
        Table {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    // First row whose first cell equals `key`.
    pub fn find(&self, key: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.first().map(String::as_str) == Some(key))
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub results: Table,
    pub summary: Table,
    pub statistics: Table,
}

impl Report {
    pub fn tables(&self) -> [&Table; 3] {
        [&self.results, &self.summary, &self.statistics]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportThresholds {
    pub high_filter_ratio: f64,
    pub high_failure_ratio: f64,
    pub min_unique_domains: usize,
    pub diversity_min_success: usize,
    pub top_domains: usize,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        ReportThresholds {
            high_filter_ratio: 0.3,
            high_failure_ratio: 0.2,
            min_unique_domains: 5,
            diversity_min_success: 10,
            top_domains: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetrics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub filtered: usize,
    pub errors: usize,
    pub success_rate_pct: f64,
    pub top_domains: Vec<(String, usize)>,
    pub unique_domains: usize,
}

impl SummaryMetrics {
    pub fn from_stats(stats: &[StatsRow], top_n: usize) -> Self {
        let total = stats.len();
        let mut success = 0;
        let mut failed = 0;
        let mut filtered = 0;
        let mut errors = 0;

        for row in stats {
            let status = row.status.to_string();
            if row.status.is_success() {
                success += 1;
            }
            if status.contains("Failed") {
                failed += 1;
            }
            if status.contains("Filtered") {
                filtered += 1;
            }
            if status.contains("Error") {
                errors += 1;
            }
        }

        let success_rate_pct = if total > 0 {
            success as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        // Count per domain, remembering first appearance to break ties.
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, row) in stats.iter().enumerate() {
            if row.source_domain.is_empty() {
                continue;
            }
            counts
                .entry(row.source_domain.as_str())
                .or_insert((0, position))
                .0 += 1;
        }
        let unique_domains = counts.len();

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(domain, (count, first))| (domain, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let top_domains = ranked
            .into_iter()
            .take(top_n)
            .map(|(domain, count, _)| (domain.to_string(), count))
            .collect();

        SummaryMetrics {
            total,
            success,
            failed,
            filtered,
            errors,
            success_rate_pct,
            top_domains,
            unique_domains,
        }
    }
}

pub const HIGH_FILTER_RATE: &str = "⚠ High Filter Rate";
pub const HIGH_FAILURE_RATE: &str = "⚠ High Failure Rate";
pub const LOW_DOMAIN_DIVERSITY: &str = "⚠ Low Domain Diversity";

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    result_headers: Vec<String>,
    thresholds: ReportThresholds,
}

impl ReportBuilder {
    pub fn new(selected_headers: Vec<String>) -> Self {
        let mut result_headers = selected_headers;
        result_headers.extend(ResultRow::URL_COLUMNS.iter().map(|c| c.to_string()));
        ReportBuilder {
            result_headers,
            thresholds: ReportThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: ReportThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn build(&self, results: &[ResultRow], stats: &[StatsRow]) -> Report {
        Report {
            results: self.results_table(results),
            summary: self.summary_table(stats),
            statistics: statistics_table(stats),
        }
    }

    fn results_table(&self, results: &[ResultRow]) -> Table {
        let mut table = Table::new("Results", self.result_headers.clone());
        for row in results {
            table.push(row.to_record());
        }
        table
    }

    pub fn summary_table(&self, stats: &[StatsRow]) -> Table {
        let t = &self.thresholds;
        let m = SummaryMetrics::from_stats(stats, t.top_domains);
        let mut table = Table::new("Summary", vec!["Metric".to_string(), "Value".to_string()]);
        let mut line = |metric: &str, value: String| table.push(vec![metric.to_string(), value]);

        line("Total Products Processed", m.total.to_string());
        line("Successful Searches", m.success.to_string());
        line("Failed Searches", m.failed.to_string());
        line("Filtered (Domain Rules)", m.filtered.to_string());
        line("Errors", m.errors.to_string());
        line("Success Rate (%)", format!("{:.1}%", m.success_rate_pct));
        line("", String::new());
        line(&format!("TOP {} SOURCE DOMAINS", t.top_domains), String::new());

        for (rank, (domain, count)) in m.top_domains.iter().enumerate() {
            let share = *count as f64 / m.total as f64 * 100.0;
            line(
                &format!("#{} - {}", rank + 1, domain),
                format!("{} products ({:.1}%)", count, share),
            );
        }

        line("", String::new());
        line("NOTABLE FINDINGS", String::new());

        let total = m.total as f64;
        if m.filtered as f64 > total * t.high_filter_ratio {
            line(
                HIGH_FILTER_RATE,
                format!("{} products filtered - consider relaxing domain rules", m.filtered),
            );
        }
        if m.failed as f64 > total * t.high_failure_ratio {
            line(
                HIGH_FAILURE_RATE,
                format!("{} products failed - check search query quality", m.failed),
            );
        }

        line("Source Diversity", format!("{} unique domains found", m.unique_domains));
        if m.unique_domains < t.min_unique_domains && m.success > t.diversity_min_success {
            line(
                LOW_DOMAIN_DIVERSITY,
                "Results concentrated in few sources - may indicate bias".to_string(),
            );
        }

        table
    }
}

fn statistics_table(stats: &[StatsRow]) -> Table {
    let headers = StatsRow::COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut table = Table::new("Statistics", headers);
    for row in stats {
        table.push(vec![
            row.product_id.clone(),
            row.search_query.clone(),
            row.source_domain.clone(),
            row.images_found.to_string(),
            row.status.to_string(),
            row.processed_at.clone(),
        ]);
    }
    table
}
