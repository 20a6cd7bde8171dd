//! `compile_commands.json` exporter.
//!
//! Every entry runs from the source root, so paths stay relative to it
//! whatever directory the database is written to.

use serde::Serialize;

use crate::core::error::TranslateError;
use crate::core::format::BuildFormat;
use crate::core::language::Language;
use crate::core::project::Project;
use crate::core::warning::TranslationWarning;
use crate::export::{resolved_sources, shell_quote, usage_flags, ExportContext, Rendered};
use crate::util::fs::to_slash;

/// One entry of the compilation database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileCommand {
    pub directory: String,
    pub command: String,
    pub file: String,
}

/// Every compile command of the project, in target dependency order.
pub fn commands(
    project: &Project,
    ctx: &ExportContext<'_>,
    warnings: &mut Vec<TranslationWarning>,
) -> Vec<CompileCommand> {
    let directory = to_slash(&project.source_root);
    let mut entries = Vec::new();

    for target in project.targets_in_dependency_order() {
        let flags: Vec<String> = usage_flags(project, target)
            .compile_args()
            .iter()
            .map(|a| shell_quote(a))
            .collect();
        for source in resolved_sources(project, target, ctx, warnings) {
            let mut command = vec![ctx.compiler.clone()];
            let cxx = Language::from_path(&source).is_some_and(|l| l.needs_cxx_driver());
            if let Some(std) = project.cxx_standard.filter(|_| cxx) {
                command.push(format!("-std={}", std.as_flag_value()));
            }
            command.extend(flags.iter().cloned());
            command.push("-c".to_string());
            command.push(shell_quote(&source));
            entries.push(CompileCommand {
                directory: directory.clone(),
                command: command.join(" "),
                file: source,
            });
        }
    }
    entries
}

/// Render the compilation database as pretty-printed JSON.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, TranslateError> {
    let mut warnings = Vec::new();
    let entries = commands(project, ctx, &mut warnings);
    tracing::debug!("{} compile command(s) for `{}`", entries.len(), project.name);

    let mut contents =
        serde_json::to_string_pretty(&entries).map_err(|e| TranslateError::Render {
            format: BuildFormat::CompileCommands,
            message: e.to_string(),
        })?;
    contents.push('\n');
    Ok(Rendered {
        contents,
        siblings: Vec::new(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target::Target;
    use crate::test_support::{sample_project, write_tree};
    use tempfile::TempDir;

    #[test]
    fn test_sample_commands() {
        let mut warnings = Vec::new();
        let entries = commands(&sample_project(), &ExportContext::default(), &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(
            entries,
            vec![
                CompileCommand {
                    directory: "/work/demo".into(),
                    command: "c++ -std=c++17 -Iinclude -DCORE_STATIC -Wall -c src/core.cpp".into(),
                    file: "src/core.cpp".into(),
                },
                CompileCommand {
                    directory: "/work/demo".into(),
                    command: "c++ -std=c++17 -Iinclude -DCORE_STATIC -c src/main.cpp".into(),
                    file: "src/main.cpp".into(),
                },
            ]
        );
    }

    #[test]
    fn test_patterns_resolve_against_source_root() {
        let tmp = TempDir::new().unwrap();
        write_tree(
            tmp.path(),
            &[("src/a.c", ""), ("src/b.c", ""), ("src/b.h", "")],
        );
        let mut project = Project::new("globs", tmp.path());
        project.add_target(Target::executable("tool").with_sources(["src/*"]));

        let ctx = ExportContext {
            compiler: "clang".to_string(),
            ..ExportContext::default()
        };
        let rendered = render(&project, &ctx).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&rendered.contents).unwrap();
        let files: Vec<&str> = parsed.iter().map(|e| e["file"].as_str().unwrap()).collect();
        assert_eq!(files, vec!["src/a.c", "src/b.c"]);
        assert_eq!(parsed[0]["command"], "clang -c src/a.c");
    }

    #[test]
    fn test_empty_pattern_warns() {
        let tmp = TempDir::new().unwrap();
        let mut project = Project::new("none", tmp.path());
        project.add_target(Target::executable("tool").with_sources(["src/*.cpp"]));
        let rendered = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(rendered.contents.trim(), "[]");
        assert_eq!(rendered.warnings.len(), 1);
    }
}
