//! MSBuild importer: `.vcxproj` projects and the `.sln` solutions that list them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::core::error::TranslateError;
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::import::{relative_dir, Entry, ImportOptions, IncludeGuard};
use crate::util::diagnostic::suggestions;
use crate::util::fs::{absolutize, project_relative, read_source, relative_path};

/// Import a `.vcxproj` or a `.sln`.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("sln")) {
        return import_solution(&path, root, options);
    }

    let mut project = Project::new(file_stem(&path), root.clone());
    let text = read_source(&path)?;
    let name = import_vcxproj(&mut project, &text, &path, options)?;
    project.name = name;
    Ok(project)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("project")
        .to_string()
}

/// A project line of a solution file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionEntry {
    pub name: String,
    /// Path as written, with forward slashes
    pub path: String,
    pub line: usize,
}

/// Read the `Project(...) = "name", "path", "{guid}"` lines of a solution.
pub fn solution_entries(text: &str) -> Vec<SolutionEntry> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_text = line.trim();
        if !line_text.starts_with("Project(") {
            continue;
        }
        let Some((_, rhs)) = line_text.split_once('=') else { continue };
        let fields: Vec<&str> = rhs
            .split(',')
            .map(|f| f.trim().trim_matches('"'))
            .collect();
        if let [name, path, ..] = fields.as_slice() {
            entries.push(SolutionEntry {
                name: name.to_string(),
                path: path.replace('\\', "/"),
                line: idx + 1,
            });
        }
    }
    entries
}

fn import_solution(
    path: &Path,
    root: PathBuf,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    tracing::debug!("Parsing solution {}", path.display());
    let text = read_source(path)?;
    let sln_rel = relative_path(&root, path);
    let mut project = Project::new(file_stem(path), root.clone());
    let mut guard = IncludeGuard::new(options.max_depth);
    guard.enter(path, 0);

    // referenced file stem -> imported target name
    let mut names: HashMap<String, String> = HashMap::new();

    for entry in solution_entries(&text) {
        if !entry.path.to_ascii_lowercase().ends_with(".vcxproj") {
            continue;
        }
        let file = root.join(&entry.path);
        if guard.enter(&file, 1) != Entry::Enter {
            continue;
        }

        let result = read_source(&file)
            .and_then(|text| import_vcxproj(&mut project, &text, &file, options));
        match result {
            Ok(name) => {
                names.insert(file_stem(&file), name);
            }
            Err(e) if e.is_recoverable_in_subtree() => {
                tracing::debug!("Solution project failed: {}", e);
                project.warn(e.to_warning().with_location(sln_rel.clone(), Some(entry.line)));
            }
            Err(e) => return Err(e),
        }
    }

    // project references name files; point them at the imported targets
    let target_names: Vec<String> = project.targets().iter().map(|t| t.name.clone()).collect();
    for name in target_names {
        if let Some(target) = project.target_mut(&name) {
            let deps = std::mem::take(&mut target.dependencies);
            for dep in deps {
                let resolved = names.get(&dep).cloned().unwrap_or(dep);
                target.add_dependency(resolved);
            }
        }
    }

    tracing::debug!(
        "Imported solution `{}` with {} target(s)",
        project.name,
        project.targets().len()
    );
    Ok(project)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Split a `;` list, dropping `%(...)` inheritance placeholders.
fn list_items(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty() && !(item.starts_with("%(") && item.ends_with(')')))
        .map(str::to_string)
        .collect()
}

/// Map an MSBuild path onto one relative to the project root.
fn msbuild_path(root: &Path, dir: &Path, raw: &str) -> String {
    let mut path = raw.replace('\\', "/");
    for var in ["$(ProjectDir)", "$(MSBuildProjectDirectory)/", "$(MSBuildThisFileDirectory)"] {
        if let Some(rest) = path.strip_prefix(var) {
            path = rest.trim_start_matches('/').to_string();
        }
    }
    if let Some(rest) = path.strip_prefix("$(SolutionDir)") {
        return project_relative(root, Path::new(""), rest.trim_start_matches('/'));
    }
    if path.is_empty() {
        path.push('.');
    }
    project_relative(root, dir, &path)
}

/// Import one `.vcxproj` into `project`, returning the target's name.
fn import_vcxproj(
    project: &mut Project,
    text: &str,
    path: &Path,
    options: &ImportOptions,
) -> Result<String, TranslateError> {
    tracing::debug!("Parsing MSBuild project {}", path.display());
    let root = project.source_root.clone();
    let rel = relative_path(&root, path);
    let dir = relative_dir(&root, path);

    let doc = Document::parse(text)
        .map_err(|e| TranslateError::parse(&rel, Some(e.pos().row as usize), e.to_string()))?;
    let top = doc.root_element();
    if top.tag_name().name() != "Project" {
        return Err(TranslateError::parse(
            &rel,
            None,
            format!("expected a <Project> root element, found <{}>", top.tag_name().name()),
        ));
    }

    let mut name = None;
    let mut configuration = None;
    for group in children(top, "PropertyGroup") {
        if name.is_none() {
            name = text_of(group, "ProjectName").or_else(|| text_of(group, "RootNamespace"));
        }
        if configuration.is_none() {
            configuration = text_of(group, "ConfigurationType");
        }
    }
    let name = name.unwrap_or_else(|| file_stem(path));

    let kind = match configuration.as_deref() {
        None | Some("Application") => TargetKind::Executable,
        Some("StaticLibrary") => TargetKind::StaticLibrary,
        Some("DynamicLibrary") => TargetKind::SharedLibrary,
        Some(other) => {
            project.warn(
                TranslationWarning::warning(format!(
                    "configuration type `{}` of `{}` imported as an executable",
                    other, name
                ))
                .with_location(rel.clone(), None)
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            );
            TargetKind::Executable
        }
    };

    let mut target = Target::new(name.as_str(), kind);
    for group in children(top, "ItemGroup") {
        for item in group.children().filter(Node::is_element) {
            let Some(include) = item.attribute("Include") else { continue };
            match item.tag_name().name() {
                "ClCompile" => target.add_source(msbuild_path(&root, &dir, include)),
                "ClInclude" => target.add_header(msbuild_path(&root, &dir, include)),
                "ProjectReference" => {
                    let referenced = text_of(item, "Name").unwrap_or_else(|| {
                        file_stem(Path::new(&include.replace('\\', "/")))
                    });
                    target.add_dependency(referenced);
                }
                other => {
                    if options.verbose {
                        project.warn(
                            TranslationWarning::info(format!("item `{}` ignored", other))
                                .with_location(rel.clone(), Some(line_of(&doc, item))),
                        );
                    }
                }
            }
        }
    }

    // the first definition group stands for the default configuration
    if let Some(group) = children(top, "ItemDefinitionGroup").next() {
        if let Some(compile) = child(group, "ClCompile") {
            for define in text_of(compile, "PreprocessorDefinitions")
                .map(|v| list_items(&v))
                .unwrap_or_default()
            {
                target.flags.add_define(define);
            }
            for dir_item in text_of(compile, "AdditionalIncludeDirectories")
                .map(|v| list_items(&v))
                .unwrap_or_default()
            {
                target.flags.add_include_dir(msbuild_path(&root, &dir, &dir_item));
            }
            for flag in text_of(compile, "AdditionalOptions")
                .map(|v| list_items(&v.replace(' ', ";")))
                .unwrap_or_default()
            {
                target.flags.add_compiler_arg(&flag);
            }
            if let Some(std) =
                text_of(compile, "LanguageStandard").and_then(|v| CppStandard::parse_loose(&v))
            {
                if let Some(warning) = project.declare_cxx_standard(std) {
                    project.warn(warning.with_location(rel.clone(), Some(line_of(&doc, compile))));
                }
            }
        }
        for link in ["Link", "Lib"].into_iter().filter_map(|n| child(group, n)) {
            for lib in text_of(link, "AdditionalDependencies")
                .map(|v| list_items(&v))
                .unwrap_or_default()
            {
                let bare = lib
                    .strip_suffix(".lib")
                    .or_else(|| lib.strip_suffix(".LIB"))
                    .unwrap_or(&lib);
                target.flags.add_link_library(bare);
            }
            for flag in text_of(link, "AdditionalOptions")
                .map(|v| list_items(&v.replace(' ', ";")))
                .unwrap_or_default()
            {
                target.flags.add_linker_arg(&flag);
            }
        }
    }

    tracing::debug!("Found {} target `{}`", kind, name);
    project.add_target(target);
    Ok(name)
}

fn line_of(doc: &Document<'_>, node: Node<'_, '_>) -> usize {
    doc.text_pos_at(node.range().start).row as usize
}
