//! Tests for command-line interface parsing and file processing

#[cfg(test)]
mod tests {
    use crate::walk_motion;
    use clap::Parser;
    use patchmotion::io::cli::{Cli, FileProcessor};
    use patchmotion::io::configuration::{DEFAULT_SEED, OutputLength, SynthesisConfig};
    use patchmotion::io::motion_file::{load_motion, save_motion};
    use patchmotion::math::interpolation::ResampleKernel;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    // Tests CLI parsing with only required target file argument
    // Verified by changing default values to ensure defaults are used
    #[test]
    fn test_cli_parse_minimal_args() {
        let cli = Cli::parse_from(["program", "walk.json"]);

        assert_eq!(cli.target, PathBuf::from("walk.json"));
        assert!(cli.seed.is_none());
        assert!(cli.num_frames.is_none());
        assert!(!cli.quiet);
        assert!(!cli.report);

        let config = cli.config().expect("config");
        assert_eq!(config, SynthesisConfig::default());
        assert_eq!(config.seed, DEFAULT_SEED);
    }

    // Tests command-line values override configuration defaults
    // Verified by skipping the keyframe override block
    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "program",
            "walk.json",
            "--seed",
            "123",
            "--num-frames",
            "2x",
            "--patch-size",
            "7",
            "--resample-kernel",
            "cubic",
            "--keyframe-first-n",
            "4",
            "--keyframe-start",
            "-10",
            "--keyframe-end",
            "-1",
            "--velocity-profile",
            "linear_decel",
            "--start-speed",
            "2.0",
            "--velocity-aware-search",
            "--no-velo",
        ]);
        let config = cli.config().expect("config");

        assert_eq!(config.seed, 123);
        assert_eq!(config.num_frames, Some(OutputLength::Multiple(2.0)));
        assert_eq!(config.patch_size, 7);
        assert_eq!(config.resample_kernel, ResampleKernel::Cubic);
        assert!(!config.use_velo);
        assert!(config.use_velocity_aware_search);

        let keyframes = config.keyframes.expect("keyframes");
        assert_eq!(keyframes.first_n, Some(4));
        assert_eq!(keyframes.start, Some(-10));
        assert_eq!(keyframes.end, Some(-1));

        let profile = config.velocity_profile.expect("profile");
        assert_eq!(profile.profile_type, "linear_decel");
        assert!((profile.start_speed - 2.0).abs() < 1e-15);
    }

    // Tests speed options without a profile leave the configuration alone
    // Verified by creating a profile from --start-speed
    #[test]
    fn test_speed_without_profile() {
        let cli = Cli::parse_from(["program", "walk.json", "--start-speed", "3.0"]);
        assert!(cli.config().expect("config").velocity_profile.is_none());
    }

    // Tests invalid option values are rejected by the parser
    // Verified by accepting any kernel name
    #[test]
    fn test_cli_rejects_invalid_values() {
        assert!(
            Cli::try_parse_from(["program", "walk.json", "--resample-kernel", "sinc"]).is_err()
        );
        assert!(Cli::try_parse_from(["program", "walk.json", "--num-frames", "lots"]).is_err());
        assert!(Cli::try_parse_from(["program"]).is_err());
    }

    // Tests file skip behavior and progress display flags
    // Verified by inverting boolean logic in skip_existing method
    #[test]
    fn test_flag_logic() {
        let cli_default = Cli::parse_from(["program", "walk.json"]);
        assert!(cli_default.skip_existing());
        assert!(cli_default.should_show_progress());

        let cli_flags = Cli::parse_from(["program", "walk.json", "-n", "-q"]);
        assert!(!cli_flags.skip_existing());
        assert!(!cli_flags.should_show_progress());
    }

    // Tests command-line values win over a configuration file
    // Verified by applying the file after the overrides
    #[test]
    fn test_config_file_with_override() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "seed = 7\npatch_size = 9").expect("write");
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["program", "walk.json", "--config", path.as_str(), "--seed", "8"]);
        let config = cli.config().expect("config");
        assert_eq!(config.seed, 8);
        assert_eq!(config.patch_size, 9);
    }

    // Tests output naming follows the seed and output directory
    // Verified by omitting zero padding of the seed
    #[test]
    fn test_output_path() {
        let cli = Cli::parse_from(["program", "clips/walk.json"]);
        let processor = FileProcessor::new(cli).expect("processor");
        assert_eq!(
            processor.output_path(Path::new("clips/walk.json")),
            PathBuf::from("clips/walk_syn_seed000042.json")
        );

        let cli = Cli::parse_from(["program", "clips/walk.json", "-o", "out", "-s", "7"]);
        let processor = FileProcessor::new(cli).expect("processor");
        assert_eq!(
            processor.output_path(Path::new("clips/walk.json")),
            PathBuf::from("out/walk_syn_seed000007.json")
        );
    }

    // Tests directory scanning skips outputs, other files and finished inputs
    // Verified by listing outputs as inputs
    #[test]
    fn test_collect_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        for name in ["a.json", "b.json", "b_syn_seed000042.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").expect("write");
        }
        let target = dir.path().to_string_lossy().to_string();

        let cli = Cli::parse_from(["program", target.as_str()]);
        let files = FileProcessor::new(cli).expect("processor").collect_files().expect("files");
        assert_eq!(files, vec![dir.path().join("a.json")]);

        let cli = Cli::parse_from(["program", target.as_str(), "--no-skip"]);
        let files = FileProcessor::new(cli).expect("processor").collect_files().expect("files");
        assert_eq!(files, vec![dir.path().join("a.json"), dir.path().join("b.json")]);
    }

    // Tests non-motion targets are rejected
    // Verified by accepting any existing file
    #[test]
    fn test_collect_rejects_other_targets() {
        let dir = tempfile::tempdir().expect("temp dir");
        let text_file = dir.path().join("notes.txt");
        std::fs::write(&text_file, "hello").expect("write");

        let target = text_file.to_string_lossy().to_string();
        let cli = Cli::parse_from(["program", target.as_str()]);
        assert!(FileProcessor::new(cli).expect("processor").collect_files().is_err());

        let cli = Cli::parse_from(["program", "/nonexistent/walk.json"]);
        assert!(FileProcessor::new(cli).expect("processor").collect_files().is_err());
    }

    // Tests a full run writes a synthesized motion next to the input
    // Verified by skipping save_motion
    #[test]
    fn test_process_writes_output() {
        let dir = tempfile::tempdir().expect("temp dir");
        let input = dir.path().join("walk.json");
        save_motion(&input, &walk_motion(40, 3, 0.4)).expect("save");
        let target = input.to_string_lossy().to_string();

        let cli = Cli::parse_from([
            "program",
            target.as_str(),
            "--quiet",
            "--report",
            "--patch-size",
            "5",
            "--num-steps",
            "1",
            "--num-frames",
            "50",
        ]);
        let mut processor = FileProcessor::new(cli).expect("processor");
        processor.process().expect("process");

        let output = dir.path().join("walk_syn_seed000042.json");
        let motion = load_motion(&output).expect("output");
        assert_eq!(motion.frames(), 50);
        assert_eq!(motion.channels(), 6);
    }
}
