//! `harbour-translate convert` command

use anyhow::Result;

use crate::cli::{ConvertArgs, GlobalArgs};
use crate::commands::{engine, finish_export};

pub fn execute(args: ConvertArgs, global: &GlobalArgs) -> Result<()> {
    let engine = engine(global, &args.source, args.compile_commands);
    let result = engine.translate(args.from, &args.source, args.to, &args.destination);
    let report = finish_export(result, global)?;
    for path in &report.written {
        println!("{}", path.display());
    }
    Ok(())
}
