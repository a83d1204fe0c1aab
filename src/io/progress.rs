//! Per-motion progress bars fed by optimizer iteration reports

use crate::algorithm::executor::IterationReport;
use crate::io::configuration::MAX_INDIVIDUAL_PROGRESS_BARS;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::LazyLock;

/// Display state of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FileState {
    name: String,
    completed: usize,
    total: usize,
    level: usize,
    level_count: usize,
}

/// Coordinates progress display for batch synthesis
///
/// Shows one bar per file for small batches and adds a batch bar once the
/// file count exceeds what fits on screen. Bars track optimizer iterations
/// across all pyramid levels.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    batch_bar: Option<ProgressBar>,
    file_bars: Vec<ProgressBar>,
    file_states: Vec<FileState>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

static PROGRESS_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{prefix:<28} [{bar:30.green/white}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
});

static BATCH_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] Motions: [{bar:40.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
});

impl ProgressManager {
    /// Manager without any bars
    pub fn new() -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            batch_bar: None,
            file_bars: Vec::new(),
            file_states: Vec::new(),
        }
    }

    /// Create bars for `file_count` files
    pub fn initialize(&mut self, file_count: usize) {
        if file_count > MAX_INDIVIDUAL_PROGRESS_BARS + 1 {
            let batch_bar = ProgressBar::new(file_count as u64);
            batch_bar.set_style(BATCH_STYLE.clone());
            self.batch_bar = Some(self.multi_progress.add(batch_bar));
        }

        for _ in 0..file_count.min(MAX_INDIVIDUAL_PROGRESS_BARS) {
            let pb = ProgressBar::new(0);
            pb.set_style(PROGRESS_STYLE.clone());
            self.file_bars.push(self.multi_progress.add(pb));
        }
    }

    /// Register a file about to be synthesized in `total_iterations` steps
    pub fn start_file(&mut self, index: usize, path: &Path, total_iterations: usize) {
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        if index >= self.file_states.len() {
            self.file_states.resize(index + 1, FileState::default());
        }
        if let Some(state) = self.file_states.get_mut(index) {
            *state = FileState {
                name,
                total: total_iterations,
                ..FileState::default()
            };
        }
        self.update_bars();
    }

    /// Record a finished iteration
    pub fn record_iteration(&mut self, index: usize, report: &IterationReport) {
        if let Some(state) = self.file_states.get_mut(index) {
            state.completed += 1;
            state.level = report.level;
            state.level_count = report.level_count;
        }
        self.update_bars();
    }

    /// Mark a file as done
    pub fn complete_file(&mut self, index: usize) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.inc(1);
        }
        if let Some(state) = self.file_states.get_mut(index) {
            state.name = format!("✓ {}", state.name);
            state.completed = state.total;
        }
        self.update_bars();
    }

    /// Finish the batch bar and clear the per-file bars
    pub fn finish(&self) {
        if let Some(ref batch_bar) = self.batch_bar {
            batch_bar.finish_with_message("All motions synthesized");
        }
        let _ = self.multi_progress.clear();
    }

    /// Show the most recent files on the available bars
    fn update_bars(&self) {
        let active: Vec<&FileState> = self
            .file_states
            .iter()
            .filter(|s| !s.name.is_empty())
            .collect();
        let start = active.len().saturating_sub(MAX_INDIVIDUAL_PROGRESS_BARS);
        let visible = active.get(start..).unwrap_or(&[]);

        for (bar_idx, state) in visible.iter().enumerate() {
            if let Some(bar) = self.file_bars.get(bar_idx) {
                bar.set_length(state.total as u64);
                bar.set_position(state.completed as u64);
                let width = state.total.to_string().len();
                bar.set_message(format!(
                    "level {}/{} {:>width$}/{}",
                    (state.level + 1).min(state.level_count.max(1)),
                    state.level_count.max(1),
                    state.completed,
                    state.total
                ));
                bar.set_prefix(state.name.clone());
            }
        }

        for bar in self.file_bars.iter().skip(visible.len()) {
            bar.set_length(0);
            bar.set_position(0);
            bar.set_message(String::new());
            bar.set_prefix(String::new());
        }
    }
}
