//! CLI argument definitions using Clap v4

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Shapecache - shape text through the sub-segment cache
#[derive(Parser, Debug)]
#[command(name = "shapecache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shape text and report glyphs plus cache statistics
    #[command(alias = "s")]
    Shape(ShapeArgs),

    /// Show the cut class and boundary decision for every character
    #[command(alias = "c")]
    Classify(ClassifyArgs),
}

/// Input text and where its characters come from
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text to process
    pub text: String,

    /// Font file whose character map to use (built-in Latin map if omitted)
    #[arg(short = 'f', long = "font-file")]
    pub font_file: Option<PathBuf>,

    /// Face index for TTC/OTC collections
    #[arg(short = 'y', long = "face-index", default_value = "0")]
    pub face_index: u32,

    /// Character positions flagged as forced cuts
    #[arg(long = "force", value_delimiter = ',')]
    pub force: Vec<usize>,

    /// Character positions flagged as never cutting
    #[arg(long = "suppress", value_delimiter = ',')]
    pub suppress: Vec<usize>,

    /// Also cut at characters whose cut class is at least this value (1-3)
    #[arg(long = "min-cut-class", value_parser = clap::value_parser!(u8).range(1..=3))]
    pub min_cut_class: Option<u8>,

    /// Output JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the shape command
#[derive(Args, Debug)]
pub struct ShapeArgs {
    #[command(flatten)]
    pub input: TextArgs,

    /// Shape the text this many times through the same store
    #[arg(short = 'r', long = "repeat", default_value = "1")]
    pub repeat: usize,

    /// Entries per (script, features) cache bucket
    #[arg(long = "size")]
    pub size: Option<usize>,

    /// Shape every run whole, bypassing the cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Feature settings, e.g. "liga=1,smcp=0"
    #[arg(short = 'F', long = "features")]
    pub features: Option<String>,
}

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub input: TextArgs,
}
