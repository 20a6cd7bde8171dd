//! `harbour-translate export` command

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::cli::{ExportArgs, GlobalArgs};
use crate::commands::{engine, finish_export};
use harbour_translate::BuildFormat;

pub fn execute(args: ExportArgs, global: &GlobalArgs) -> Result<()> {
    let manifest = args.manifest.unwrap_or_else(|| PathBuf::from("."));
    let engine = engine(global, &manifest, args.compile_commands);

    let format = match args.to {
        Some(format) => format,
        None => BuildFormat::from_file_name(&args.output).with_context(|| {
            format!(
                "cannot tell the format of `{}`\nhelp: Pass it with `--to`",
                args.output.display()
            )
        })?,
    };

    let project = engine.import_auto(&manifest)?;
    let report = finish_export(engine.export(&project, format, &args.output), global)?;
    for path in &report.written {
        println!("{}", path.display());
    }
    Ok(())
}
