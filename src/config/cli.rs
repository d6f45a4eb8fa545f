use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the texflag binary.
#[derive(Debug, Parser)]
#[command(
    name = "texflag",
    version,
    about = "Live preview client for a TeX rendering service"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TEXFLAG_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Keep a rendered preview in sync with a source file.
    Watch(WatchArgs),
    /// Render a source file once and write the image.
    Render(RenderArgs),
    /// Print the shareable link for a source file.
    Link(LinkArgs),
}

impl Command {
    pub fn common(&self) -> &CommonOverrides {
        match self {
            Command::Watch(args) => &args.overrides.common,
            Command::Render(args) => &args.common,
            Command::Link(args) => &args.common,
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the rendering service base URL.
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct WatchOverrides {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Override the debounce window between an edit and its render.
    #[arg(long = "debounce-ms", value_name = "MILLIS")]
    pub debounce_ms: Option<u64>,

    /// Override how often the source file is checked for changes.
    #[arg(long = "poll-interval-ms", value_name = "MILLIS")]
    pub poll_interval_ms: Option<u64>,

    /// Override the directory holding the persisted document.
    #[arg(long = "storage-dir", value_name = "PATH")]
    pub storage_dir: Option<PathBuf>,

    /// Override the directory rendered images are written to.
    #[arg(long = "artifacts-dir", value_name = "PATH")]
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub overrides: WatchOverrides,

    /// Source file to watch; seeded with the last document when missing or empty.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Copy every displayed image to this path.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Source file to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Where to write the rendered image.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct LinkArgs {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Source file to link.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}
