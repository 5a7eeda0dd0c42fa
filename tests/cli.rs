use clap::Parser;
use finger_counter::config::{config_path, load_config};
use finger_counter::{execute, Cli, Commands, ConfigSubcommand, RunArgs};
use proptest::prelude::*;
use serial_test::serial;
use std::path::PathBuf;
use tempfile::tempdir;

proptest! {
    #[test]
    fn parse_camera_index(value in 0u32..64) {
        let args = ["finger-counter", "run", "--camera", &value.to_string()];
        let cli = Cli::parse_from(&args);
        match cli.command {
            Some(Commands::Run(run)) => prop_assert_eq!(run.camera, Some(value)),
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }

    #[test]
    fn parse_confidence(value in 0.0f32..1.0) {
        let args = ["finger-counter", "run", "--confidence", &value.to_string()];
        let cli = Cli::parse_from(&args);
        match cli.command {
            Some(Commands::Run(run)) => prop_assert_eq!(run.confidence, Some(value)),
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }

    #[test]
    fn parse_detect_paths(path in "[a-zA-Z0-9][a-zA-Z0-9/_\\.-]*") {
        let out = format!("{path}.out.png");
        let args = ["finger-counter", "detect", &path, "--output", &out];
        let cli = Cli::parse_from(&args);
        match cli.command {
            Some(Commands::Detect { image, output }) => {
                prop_assert_eq!(image, PathBuf::from(&path));
                prop_assert_eq!(output, Some(PathBuf::from(out)));
            }
            _ => prop_assert!(false, "unexpected subcommand"),
        }
    }

    #[test]
    #[serial]
    fn execute_sets_camera(value in 0u32..16) {
        let dir = tempdir().unwrap();
        std::env::set_var("FINGER_COUNTER_CONFIG", dir.path().join("cfg.json"));

        let cli = Cli {
            command: Some(Commands::Config {
                setting: ConfigSubcommand::Camera { index: value },
            }),
        };
        execute(cli).unwrap();

        let cfg = load_config();
        prop_assert_eq!(cfg.camera_index, value);
        prop_assert_eq!(cfg.detection_confidence, 0.8);
    }
}

#[test]
fn no_subcommand_defaults_to_run() {
    let cli = Cli::parse_from(["finger-counter"]);
    assert!(cli.command.is_none());
}

#[test]
fn run_flags_parse() {
    let cli = Cli::parse_from([
        "finger-counter",
        "run",
        "-m",
        "hand.onnx",
        "--palm-model",
        "palm.onnx",
        "--tracking-confidence",
        "0.6",
        "--no-draw",
    ]);
    match cli.command {
        Some(Commands::Run(run)) => assert_eq!(
            run,
            RunArgs {
                tracking_confidence: Some(0.6),
                model: Some(PathBuf::from("hand.onnx")),
                palm_model: Some(PathBuf::from("palm.onnx")),
                no_draw: true,
                ..RunArgs::default()
            }
        ),
        _ => panic!("unexpected subcommand"),
    }
}

#[test]
fn run_args_override_config() {
    let args = RunArgs {
        camera: Some(2),
        confidence: Some(1.7),
        tracking_confidence: Some(0.3),
        no_draw: true,
        ..RunArgs::default()
    };
    let cfg = args.apply(finger_counter::Config::default());
    assert_eq!(cfg.camera_index, 2);
    assert_eq!(cfg.detection_confidence, 1.0);
    assert_eq!(cfg.tracking_confidence, 0.3);
    assert!(!cfg.draw);
    assert_eq!(cfg.model_path, finger_counter::Config::default().model_path);
}

#[test]
#[serial]
fn execute_clamps_confidence() {
    let dir = tempdir().unwrap();
    std::env::set_var("FINGER_COUNTER_CONFIG", dir.path().join("cfg.json"));

    let cli = Cli::parse_from(["finger-counter", "config", "confidence", "1.5"]);
    execute(cli).unwrap();

    assert_eq!(load_config().detection_confidence, 1.0);
}

#[test]
#[serial]
fn execute_sets_model_in_nested_dir() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("cfg.json");
    std::env::set_var("FINGER_COUNTER_CONFIG", &path);
    assert_eq!(config_path(), path);

    let cli = Cli {
        command: Some(Commands::Config {
            setting: ConfigSubcommand::Model {
                path: PathBuf::from("models/other.onnx"),
            },
        }),
    };
    execute(cli).unwrap();

    assert!(path.exists());
    assert_eq!(load_config().model_path, PathBuf::from("models/other.onnx"));
}

#[test]
#[serial]
fn execute_sets_palm_model() {
    let dir = tempdir().unwrap();
    std::env::set_var("FINGER_COUNTER_CONFIG", dir.path().join("cfg.json"));

    let cli = Cli::parse_from(["finger-counter", "config", "palm-model", "p.onnx"]);
    execute(cli).unwrap();

    let cfg = load_config();
    assert_eq!(cfg.palm_model_path, PathBuf::from("p.onnx"));
    assert_eq!(cfg.model_path, finger_counter::Config::default().model_path);
}

#[test]
fn camera_open_error_names_the_device() {
    let err = finger_counter::Error::CameraOpen {
        index: 3,
        reason: "no such device".to_string(),
    };
    let report = format!("{:?}", anyhow::Error::from(err));
    assert_eq!(report.matches("failed to open camera 3").count(), 1);
    assert!(report.contains("no such device"));
}

#[test]
#[serial]
fn detect_with_missing_model_fails() {
    let dir = tempdir().unwrap();
    std::env::set_var("FINGER_COUNTER_CONFIG", dir.path().join("cfg.json"));
    let img = dir.path().join("frame.png");
    image::RgbImage::new(32, 32).save(&img).unwrap();

    let cli = Cli {
        command: Some(Commands::Config {
            setting: ConfigSubcommand::Model {
                path: dir.path().join("missing.onnx"),
            },
        }),
    };
    execute(cli).unwrap();

    let cli = Cli {
        command: Some(Commands::Detect {
            image: img,
            output: None,
        }),
    };
    assert!(matches!(
        execute(cli),
        Err(finger_counter::Error::ModelNotFound { .. })
    ));
}
