use log::{debug, info, warn};
use crate::row_processor::SearchStatus;

#[derive(Debug, Clone, Copy)]
pub struct RowUpdate<'a> {
    pub index: usize,
    pub total: usize,
    pub product_id: &'a str,
    pub status: &'a SearchStatus,
    pub images_found: usize,
    pub source_domain: &'a str,
    pub short_description: &'a str,
}

pub trait ProgressSink {
    fn on_row_start(&mut self, index: usize, total: usize, product_id: &str, short_description: &str);
    fn on_row_complete(&mut self, update: &RowUpdate<'_>);
    fn on_checkpoint(&mut self, index: usize);
    fn on_run_complete(&mut self, total: usize, success: usize, failed: usize, success_rate_pct: f64);
}

#[derive(Debug, Default)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn on_row_start(&mut self, index: usize, total: usize, product_id: &str, short_description: &str) {
        info!("Processing {}/{} | Product ID: {} | {}...", index, total, product_id, short_description);
    }

    fn on_row_complete(&mut self, update: &RowUpdate<'_>) {
        let id = update.product_id;
        let desc = update.short_description;
        match update.status {
            SearchStatus::Success => {
                let from = if update.source_domain.is_empty() {
                    String::new()
                } else {
                    format!(" from {}", update.source_domain)
                };
                info!("✓ [{}] Found {} image(s){} - {}...", id, update.images_found, from, desc);
            }
            SearchStatus::Filtered => warn!("[{}] No images from allowed domains - {}...", id, desc),
            SearchStatus::Failed => warn!("[{}] No images found - {}...", id, desc),
            SearchStatus::Error(msg) => warn!("✗ [{}] Error: {}", id, msg),
            SearchStatus::Pending => debug!("[{}] left pending", id),
        }
    }

    fn on_checkpoint(&mut self, index: usize) {
        info!("Checkpoint saved at row {}", index);
    }

    fn on_run_complete(&mut self, total: usize, success: usize, failed: usize, success_rate_pct: f64) {
        info!(
            "Complete! {} processed | {} successful ({:.1}%) | {} failed",
            total, success, success_rate_pct, failed
        );
    }
}

#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_row_start(&mut self, _: usize, _: usize, _: &str, _: &str) {}
    fn on_row_complete(&mut self, _: &RowUpdate<'_>) {}
    fn on_checkpoint(&mut self, _: usize) {}
    fn on_run_complete(&mut self, _: usize, _: usize, _: usize, _: f64) {}
}
