use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ecoscan_core::DisplayRect;

#[derive(Parser, Debug)]
#[command(
    name = "ecoscanctl",
    version,
    about = "Scan product labels against an EcoScan backend"
)]
pub struct Cli {
    /// Config file (TOML or JSON); overrides ECOSCAN_CONFIG_PATH
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend origin, e.g. http://localhost:5000
    #[arg(long, global = true, env = "ECOSCAN_BASE_URL")]
    pub base_url: Option<String>,

    /// Log in as this user before running the command
    #[arg(long, short = 'u', global = true, env = "ECOSCAN_USERNAME")]
    pub username: Option<String>,

    #[arg(long, global = true, env = "ECOSCAN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a label image and wait for the analysis
    Scan(ScanArgs),
    /// Resume polling a scan task that was already accepted
    Poll {
        task_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Crop an image locally and write the JPEG that would be uploaded
    Crop {
        image: PathBuf,
        #[command(flatten)]
        crop: CropArgs,
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
    /// Check credentials against the backend
    Login,
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
    },
    /// End the backend session
    Logout,
    /// Show or edit dietary preferences
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List or clear past scans
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Ask the assistant a question about a scan
    Chat {
        query: String,
        /// Context string from a previous scan result
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Image file to upload
    #[arg(required_unless_present = "camera_snapshot")]
    pub image: Option<PathBuf>,

    /// Grab the frame from a snapshot file kept fresh by a webcam daemon
    #[arg(long, conflicts_with = "image")]
    pub camera_snapshot: Option<PathBuf>,

    #[command(flatten)]
    pub crop: CropArgs,

    /// Print the raw {success, data|message} outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CropArgs {
    /// Crop rectangle as X,Y,W,H (source pixels, or preview units with --display)
    #[arg(long, value_parser = parse_rect)]
    pub crop: Option<DisplayRect>,

    /// Size the crop was drawn at, as WxH
    #[arg(long, value_parser = parse_size, requires = "crop")]
    pub display: Option<(f64, f64)>,

    /// Preview zoom the rectangle was drawn at
    #[arg(long, default_value_t = 1.0, requires = "crop")]
    pub zoom: f64,
}

#[derive(Subcommand, Debug)]
pub enum ProfileAction {
    Show,
    Update {
        #[arg(long)]
        health_conditions: Option<String>,
        #[arg(long)]
        allergies: Option<String>,
        #[arg(long)]
        diet_type: Option<String>,
        #[arg(long)]
        ingredients_to_avoid: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    List {
        #[arg(long)]
        json: bool,
    },
    Clear,
}

fn parse_numbers(raw: &str, sep: char, count: usize) -> Result<Vec<f64>, String> {
    let parts: Vec<f64> = raw
        .split(sep)
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|err| format!("'{raw}': {err}"))?;
    if parts.len() != count {
        return Err(format!("'{raw}': expected {count} values separated by '{sep}'"));
    }
    if parts.iter().any(|v| !v.is_finite()) {
        return Err(format!("'{raw}': values must be finite"));
    }
    Ok(parts)
}

pub fn parse_rect(raw: &str) -> Result<DisplayRect, String> {
    let v = parse_numbers(raw, ',', 4)?;
    Ok(DisplayRect {
        x: v[0],
        y: v[1],
        width: v[2],
        height: v[3],
    })
}

pub fn parse_size(raw: &str) -> Result<(f64, f64), String> {
    let v = parse_numbers(&raw.to_ascii_lowercase(), 'x', 2)?;
    Ok((v[0], v[1]))
}
