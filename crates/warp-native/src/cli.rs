//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "warpfield")]
#[command(about = "Audio-reactive warp particle field", long_about = None)]
pub struct Args {
    /// WAV file to play; the built-in demo pattern plays when omitted
    #[arg(long, value_name = "WAV")]
    pub track: Option<PathBuf>,

    /// Run with the constrained (mobile) quality tier
    #[arg(long)]
    pub constrained: bool,

    /// Seed for particle and star placement
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Initial window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}
