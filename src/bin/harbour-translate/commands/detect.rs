//! `harbour-translate detect` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::DetectArgs;
use harbour_translate::BuildFormat;

pub fn execute(args: DetectArgs) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));
    let (format, file) = BuildFormat::locate(&path)?;
    println!("{}\t{}", format, file.display());
    Ok(())
}
