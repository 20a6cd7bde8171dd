//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use harbour_translate::BuildFormat;

/// Harbour Translate - convert between C and C++ build descriptions
#[derive(Parser)]
#[command(name = "harbour-translate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags accepted by every command.
#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Enable verbose output and report unrecognized constructs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Fail instead of writing output when an error is reported
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the build format of a file or directory
    Detect(DetectArgs),

    /// Import a build description into Harbor.toml
    Import(ImportArgs),

    /// Export Harbor.toml (or any importable project) to another format
    Export(ExportArgs),

    /// Convert one build description into another
    Convert(ConvertArgs),
}

#[derive(Args)]
pub struct DetectArgs {
    /// File or directory to inspect (defaults to current directory)
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Build file or directory to import (defaults to current directory)
    pub path: Option<PathBuf>,

    /// Source format (detected from the path if omitted)
    #[arg(long)]
    pub from: Option<BuildFormat>,

    /// Where to write the manifest (defaults to Harbor.toml next to the source)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Destination file or directory
    pub output: PathBuf,

    /// Destination format (detected from the output name if omitted)
    #[arg(long)]
    pub to: Option<BuildFormat>,

    /// Project to export (defaults to current directory)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Also write compile_commands.json next to the output
    #[arg(long)]
    pub compile_commands: bool,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Build file or directory to read
    pub source: PathBuf,

    /// Destination file or directory
    pub destination: PathBuf,

    /// Source format (detected if omitted)
    #[arg(long)]
    pub from: Option<BuildFormat>,

    /// Destination format (detected if omitted)
    #[arg(long)]
    pub to: Option<BuildFormat>,

    /// Also write compile_commands.json next to the output
    #[arg(long)]
    pub compile_commands: bool,
}
