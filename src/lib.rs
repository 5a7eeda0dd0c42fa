pub mod camera;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod fingers;
pub mod hand;
pub mod overlay;
pub mod pipeline;
pub mod window;

pub use cli::{execute, run_cli, Cli, Commands, ConfigSubcommand, RunArgs};
pub use config::{load_config, save_config, Config};
pub use error::{Error, Result};
pub use fingers::FingerState;
pub use pipeline::{process_frame, FrameReport, RunSummary, Session, StopReason};
