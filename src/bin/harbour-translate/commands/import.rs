//! `harbour-translate import` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::{GlobalArgs, ImportArgs};
use crate::commands::{engine, finish_export};
use harbour_translate::core::manifest::MANIFEST_NAME;
use harbour_translate::BuildFormat;

pub fn execute(args: ImportArgs, global: &GlobalArgs) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));
    let engine = engine(global, &path, false);

    let project = match args.from {
        Some(format) => engine.import(format, &path)?,
        None => engine.import_auto(&path)?,
    };

    let output = args
        .output
        .unwrap_or_else(|| project.source_root.join(MANIFEST_NAME));
    let report = finish_export(engine.export(&project, BuildFormat::Native, &output), global)?;

    println!(
        "Imported `{}` ({} targets, {} dependencies) into {}",
        project.name,
        project.targets().len(),
        project.dependencies().len(),
        report.written[0].display()
    );
    Ok(())
}
