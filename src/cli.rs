use crate::camera::Webcam;
use crate::config::{load_config, save_config, Config};
use crate::detector::OnnxHandDetector;
use crate::error::Result;
use crate::pipeline::{process_frame, Session};
use crate::window::VideoWindow;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "finger-counter",
    version,
    about = "Counts raised fingers on a webcam feed"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the camera and count fingers until `q` is pressed
    Run(RunArgs),
    /// Count fingers in a still image
    Detect {
        image: PathBuf,
        /// Write the annotated image here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        setting: ConfigSubcommand,
    },
}

#[derive(Args, Default, Debug, PartialEq)]
pub struct RunArgs {
    /// Camera device index
    #[arg(short, long)]
    pub camera: Option<u32>,
    /// Minimum palm detection score
    #[arg(long)]
    pub confidence: Option<f32>,
    /// Minimum hand presence score from the landmark model
    #[arg(long)]
    pub tracking_confidence: Option<f32>,
    /// Path to the hand landmark ONNX model
    #[arg(short, long)]
    pub model: Option<PathBuf>,
    /// Path to the palm detection ONNX model
    #[arg(long)]
    pub palm_model: Option<PathBuf>,
    /// Skip drawing landmarks and the hand box
    #[arg(long)]
    pub no_draw: bool,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Set the camera device index
    Camera { index: u32 },
    /// Set the detection confidence threshold
    Confidence { value: f32 },
    /// Set the hand landmark model path
    Model { path: PathBuf },
    /// Set the palm detection model path
    PalmModel { path: PathBuf },
}

impl RunArgs {
    pub fn apply(&self, mut cfg: Config) -> Config {
        if let Some(index) = self.camera {
            cfg.camera_index = index;
        }
        if let Some(value) = self.confidence {
            cfg.detection_confidence = value;
        }
        if let Some(value) = self.tracking_confidence {
            cfg.tracking_confidence = value;
        }
        if let Some(path) = &self.model {
            cfg.model_path = path.clone();
        }
        if let Some(path) = &self.palm_model {
            cfg.palm_model_path = path.clone();
        }
        if self.no_draw {
            cfg.draw = false;
        }
        cfg.sanitized()
    }
}

pub fn run_cli() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    execute(cli)
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_camera(args.apply(load_config())),
        Commands::Detect { image, output } => detect_image(image, output),
        Commands::Config { setting } => {
            configure(setting);
            Ok(())
        }
    }
}

fn run_camera(cfg: Config) -> Result<()> {
    let source = Webcam::open(cfg.camera_index)?;
    let detector = OnnxHandDetector::load(&cfg)?;
    let sink = VideoWindow::new(cfg.window_title.clone());

    let mut session = Session::new(source, detector, sink).with_draw(cfg.draw);
    let summary = session.run()?;
    info!(frames = summary.frames, stop = ?summary.stop, "stopped");
    Ok(())
}

fn detect_image(path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let cfg = load_config();
    let mut frame = image::open(&path)?.into_rgb8();
    let mut detector = OnnxHandDetector::load(&cfg)?;
    let report = process_frame(&mut detector, &mut frame, cfg.draw)?;

    match &report.fingers {
        Some(state) => {
            println!("{state}");
            if let Some(label) = state.label() {
                println!("{label}");
            }
            println!("Fingers: {}", state.count());
        }
        None => println!("no hand detected"),
    }

    if let Some(out) = output {
        frame.save(&out)?;
        info!(path = %out.display(), "annotated image written");
    }
    Ok(())
}

fn configure(setting: ConfigSubcommand) {
    let mut cfg = load_config();
    match setting {
        ConfigSubcommand::Show => {
            match serde_json::to_string_pretty(&cfg) {
                Ok(s) => println!("{s}"),
                Err(e) => error!("failed to encode config: {e}"),
            }
            return;
        }
        ConfigSubcommand::Camera { index } => {
            cfg.camera_index = index;
            info!("camera set to {index}");
        }
        ConfigSubcommand::Confidence { value } => {
            cfg.detection_confidence = value;
            cfg = cfg.sanitized();
            info!("detection confidence set to {}", cfg.detection_confidence);
        }
        ConfigSubcommand::Model { path } => {
            info!(path = %path.display(), "model path set");
            cfg.model_path = path;
        }
        ConfigSubcommand::PalmModel { path } => {
            info!(path = %path.display(), "palm model path set");
            cfg.palm_model_path = path;
        }
    }
    save_config(&cfg);
}

