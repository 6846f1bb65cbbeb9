use std::sync::Mutex;

use geoingest_core::pipeline::{PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives a single progress bar from pipeline stage events.
pub struct BarReporter {
    bar: ProgressBar,
    stage: Mutex<Option<PipelineStage>>,
}

impl BarReporter {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template("{msg:24} [{bar:40}] {pos} {elapsed}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            bar,
            stage: Mutex::new(None),
        }
    }

    pub fn finish(&self, message: &'static str) {
        self.bar.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        if let Ok(mut current) = self.stage.lock() {
            *current = Some(stage);
        }
        self.bar.set_message(stage.to_string());
        self.bar.set_length(total_items.unwrap_or(0) as u64);
        self.bar.set_position(0);
    }

    fn advance(&self, items_done: usize) {
        if self.bar.length().unwrap_or(0) < items_done as u64 {
            self.bar.set_length(items_done as u64);
        }
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        let stage = self.stage.lock().ok().and_then(|s| *s);
        if let Some(stage) = stage {
            self.bar.set_message(format!("{stage} done"));
        }
    }
}
