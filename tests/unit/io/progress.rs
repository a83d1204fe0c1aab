//! Tests for progress tracking and multi-file batch processing

#[cfg(test)]
mod tests {
    use patchmotion::IterationReport;
    use patchmotion::io::configuration::MAX_INDIVIDUAL_PROGRESS_BARS;
    use patchmotion::io::progress::ProgressManager;
    use std::path::Path;

    fn report(level: usize, iteration: usize) -> IterationReport {
        IterationReport {
            level,
            level_count: 3,
            iteration,
            frames: 40,
            patch_loss: 1.0,
            temporal_loss: 0.0,
            velocity_loss: 0.0,
            total_loss: 1.0,
            fallback_matches: 0,
            degenerate_frames: 0,
        }
    }

    // Tests ProgressManager lifecycle for a single file
    // Verified by setting wrong initial state
    #[test]
    fn test_progress_manager_single_file() {
        let mut pm = ProgressManager::new();

        pm.initialize(0);
        pm.finish();

        pm.initialize(1);
        pm.start_file(0, Path::new("walk.json"), 9);
        for level in 0..3 {
            for iteration in 0..3 {
                pm.record_iteration(0, &report(level, iteration));
            }
        }
        pm.complete_file(0);
        pm.finish();
    }

    // Tests default trait implementation
    // Verified by creating different initial states
    #[test]
    fn test_progress_manager_default() {
        let mut pm = ProgressManager::default();
        pm.initialize(2);
        pm.start_file(1, Path::new("run.json"), 6);
        pm.record_iteration(1, &report(0, 0));
        pm.complete_file(1);
        pm.finish();
    }

    // Tests batch mode with more files than individual bars
    // Verified by skipping the batch bar for large sets
    #[test]
    fn test_batch_mode() {
        let mut pm = ProgressManager::new();
        let count = MAX_INDIVIDUAL_PROGRESS_BARS + 3;
        pm.initialize(count);

        for index in 0..count {
            pm.start_file(index, Path::new(&format!("clip_{index}.json")), 3);
            pm.record_iteration(index, &report(0, 0));
            pm.complete_file(index);
        }
        pm.finish();
    }

    // Tests reports for files that were never started are ignored
    // Verified by resizing state on record_iteration
    #[test]
    fn test_unknown_file_index() {
        let mut pm = ProgressManager::new();
        pm.initialize(1);
        pm.record_iteration(7, &report(0, 0));
        pm.complete_file(7);
        pm.finish();
    }
}
