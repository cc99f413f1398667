use clap::{Args, Parser, Subcommand};
use platewatch_core::Dimensions;
use std::path::PathBuf;

/// License plate recognition dashboard
#[derive(Debug, Parser)]
#[command(name = "platewatch", version, about)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Draw a stored recognition response over its image
    Annotate(AnnotateArgs),
    /// Send an image to the recognition service
    Recognize(RecognizeArgs),
    /// Capture frames periodically and overlay each response
    Live(LiveArgs),
    /// Show recent detections
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Manage watched plates
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    /// Source images
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Recognition response JSON, one per image or one shared by all
    #[arg(short, long)]
    pub response: Vec<PathBuf>,

    /// Display container as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_container)]
    pub container: Option<Dimensions>,

    /// Output PNG (single image only)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the draw commands as JSON instead of writing images
    #[arg(long)]
    pub plan: bool,
}

#[derive(Debug, Args)]
pub struct RecognizeArgs {
    pub image: PathBuf,

    /// Store each read plate in the detection history
    #[arg(long)]
    pub save: bool,

    /// Also write the annotated frame to this PNG
    #[arg(long)]
    pub annotate: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LiveArgs {
    /// Camera snapshot URL, e.g. http://192.168.1.50/latest
    #[arg(long, conflicts_with = "frames")]
    pub snapshot_url: Option<String>,

    /// Replay image files from a directory instead of a camera
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Stop after this many seconds; runs until Ctrl-C otherwise
    #[arg(long)]
    pub duration_secs: Option<u64>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum WatchlistAction {
    List,
    Add { plate: String },
    Remove { plate: String },
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_container(value: &str) -> Result<Dimensions, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let width: u32 = width.trim().parse().map_err(|_| format!("bad width '{width}'"))?;
    let height: u32 = height.trim().parse().map_err(|_| format!("bad height '{height}'"))?;
    if width == 0 || height == 0 {
        return Err("container must be non-empty".to_string());
    }
    Ok(Dimensions::new(width as f64, height as f64))
}
