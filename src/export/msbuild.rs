//! MSBuild exporter: one `.vcxproj` per target, optionally tied together by
//! a `.sln` solution.
//!
//! Project GUIDs come from an [`IdGenerator`] seeded with the project name,
//! so exporting the same project twice produces the same files.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::path::PathBuf;

use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{link_closure, usage_flags, ExportContext, Rendered};
use crate::util::diagnostic::suggestions;
use crate::util::hash::IdGenerator;

/// Project type GUID of Visual C++ projects.
const VCXPROJ_TYPE: &str = "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}";

const CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];
const PLATFORM: &str = "x64";

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn windows_path(path: &str) -> String {
    xml_escape(&path.replace('/', "\\"))
}

fn configuration_type(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Executable => "Application",
        TargetKind::StaticLibrary | TargetKind::ObjectLibrary => "StaticLibrary",
        TargetKind::SharedLibrary => "DynamicLibrary",
        TargetKind::HeaderOnly | TargetKind::Interface => "Utility",
    }
}

fn library_file(lib: &str) -> String {
    let lower = lib.to_ascii_lowercase();
    if lower.ends_with(".lib") || lib.contains('/') || lib.contains('\\') || lib.starts_with('$') {
        lib.to_string()
    } else {
        format!("{}.lib", lib)
    }
}

fn file_name(target: &str) -> String {
    format!("{}.vcxproj", target)
}

/// Render `project` as MSBuild files.
///
/// A single-project export puts the last target (in dependency order) in the
/// destination and every other target in a sibling `<name>.vcxproj`. A
/// solution export renders the `.sln` and one sibling project per target.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let placeholder;
    let mut targets = project.targets_in_dependency_order();
    if targets.is_empty() {
        placeholder = Target::new(project.name.as_str(), TargetKind::Interface);
        targets.push(&placeholder);
    }

    let mut ids = IdGenerator::new(project.name.as_str());
    let guids: HashMap<&str, String> = targets
        .iter()
        .map(|t| (t.name.as_str(), ids.next_guid(&t.name)))
        .collect();

    let mut rendered = Rendered::default();
    for target in &targets {
        match target.kind {
            TargetKind::ObjectLibrary => rendered.warnings.push(
                TranslationWarning::warning(format!(
                    "object library `{}` is exported as a static library",
                    target.name
                ))
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            ),
            TargetKind::HeaderOnly | TargetKind::Interface => rendered.warnings.push(
                TranslationWarning::warning(format!(
                    "`{}` has no build output and is exported as a utility project",
                    target.name
                ))
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            ),
            _ => {}
        }
        if !target.flags.frameworks.is_empty() {
            rendered.warnings.push(TranslationWarning::warning(format!(
                "frameworks of `{}` cannot be expressed in MSBuild and were dropped",
                target.name
            )));
        }
    }

    let (primary, rest) = if ctx.solution {
        (None, &targets[..])
    } else {
        let (last, rest) = targets.split_last().ok_or(fmt::Error)?;
        (Some(*last), rest)
    };
    for target in rest {
        let text = vcxproj(project, target, &guids, ctx)?;
        rendered.siblings.push((PathBuf::from(file_name(&target.name)), text));
    }
    rendered.contents = match primary {
        Some(target) => vcxproj(project, target, &guids, ctx)?,
        None => {
            let solution_guid = ids.next_guid("solution");
            solution(&targets, &guids, &solution_guid)?
        }
    };
    Ok(rendered)
}

fn vcxproj(
    project: &Project,
    target: &Target,
    guids: &HashMap<&str, String>,
    ctx: &ExportContext<'_>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let guid = guids.get(target.name.as_str()).ok_or(fmt::Error)?;
    let name = xml_escape(&target.name);

    writeln!(out, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(
        out,
        r#"<Project DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">"#
    )?;
    writeln!(out, r#"  <ItemGroup Label="ProjectConfigurations">"#)?;
    for config in CONFIGURATIONS {
        writeln!(
            out,
            r#"    <ProjectConfiguration Include="{}|{}">"#,
            config, PLATFORM
        )?;
        writeln!(out, "      <Configuration>{}</Configuration>", config)?;
        writeln!(out, "      <Platform>{}</Platform>", PLATFORM)?;
        writeln!(out, "    </ProjectConfiguration>")?;
    }
    writeln!(out, "  </ItemGroup>")?;

    writeln!(out, r#"  <PropertyGroup Label="Globals">"#)?;
    writeln!(out, "    <VCProjectVersion>17.0</VCProjectVersion>")?;
    writeln!(out, "    <ProjectGuid>{}</ProjectGuid>", guid)?;
    writeln!(out, "    <ProjectName>{}</ProjectName>", name)?;
    writeln!(out, "    <RootNamespace>{}</RootNamespace>", name)?;
    writeln!(out, "  </PropertyGroup>")?;
    writeln!(
        out,
        r#"  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />"#
    )?;
    for config in CONFIGURATIONS {
        writeln!(
            out,
            r#"  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='{}|{}'" Label="Configuration">"#,
            config, PLATFORM
        )?;
        writeln!(
            out,
            "    <ConfigurationType>{}</ConfigurationType>",
            configuration_type(target.kind)
        )?;
        writeln!(
            out,
            "    <UseDebugLibraries>{}</UseDebugLibraries>",
            config == "Debug"
        )?;
        writeln!(out, "    <PlatformToolset>v143</PlatformToolset>")?;
        writeln!(out, "    <CharacterSet>Unicode</CharacterSet>")?;
        writeln!(out, "  </PropertyGroup>")?;
    }
    writeln!(out, r#"  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.props" />"#)?;

    write_definitions(&mut out, project, target, ctx)?;

    let sources: Vec<String> = target.sources.iter().map(|s| ctx.path(s)).collect();
    let headers: Vec<String> = target.headers.iter().map(|h| ctx.path(h)).collect();
    for (element, files) in [("ClCompile", &sources), ("ClInclude", &headers)] {
        if files.is_empty() {
            continue;
        }
        writeln!(out, "  <ItemGroup>")?;
        for file in files {
            writeln!(out, r#"    <{} Include="{}" />"#, element, windows_path(file))?;
        }
        writeln!(out, "  </ItemGroup>")?;
    }

    let referenced: Vec<&String> = if links_binary(target.kind) {
        link_closure(project, target).targets.into_iter().map(|t| &t.name).collect()
    } else {
        target.dependencies.iter().collect()
    };
    let references: Vec<(&String, &String)> = referenced
        .into_iter()
        .filter_map(|d| guids.get(d.as_str()).map(|g| (d, g)))
        .collect();
    if !references.is_empty() {
        writeln!(out, "  <ItemGroup>")?;
        for (dep, dep_guid) in references {
            writeln!(
                out,
                r#"    <ProjectReference Include="{}">"#,
                windows_path(&file_name(dep))
            )?;
            writeln!(out, "      <Project>{}</Project>", dep_guid)?;
            writeln!(out, "      <Name>{}</Name>", xml_escape(dep))?;
            writeln!(out, "    </ProjectReference>")?;
        }
        writeln!(out, "  </ItemGroup>")?;
    }

    writeln!(
        out,
        r#"  <Import Project="$(VCTargetsPath)\Microsoft.Cpp.targets" />"#
    )?;
    writeln!(out, "</Project>")?;
    Ok(out)
}

/// Executables and DLLs pull in every static library below them.
fn links_binary(kind: TargetKind) -> bool {
    matches!(kind, TargetKind::Executable | TargetKind::SharedLibrary)
}

/// The configuration-independent `ItemDefinitionGroup`.
fn write_definitions(
    out: &mut String,
    project: &Project,
    target: &Target,
    ctx: &ExportContext<'_>,
) -> fmt::Result {
    let usage = usage_flags(project, target);
    let list = |items: Vec<String>, inherit: &str| {
        let mut items = items;
        items.push(format!("%({})", inherit));
        xml_escape(&items.join(";"))
    };

    writeln!(out, "  <ItemDefinitionGroup>")?;
    writeln!(out, "    <ClCompile>")?;
    if !usage.defines.is_empty() {
        writeln!(
            out,
            "      <PreprocessorDefinitions>{}</PreprocessorDefinitions>",
            list(usage.defines.clone(), "PreprocessorDefinitions")
        )?;
    }
    let includes: Vec<String> = usage
        .include_dirs
        .iter()
        .chain(&usage.system_include_dirs)
        .map(|d| ctx.path(d).replace('/', "\\"))
        .collect();
    if !includes.is_empty() {
        writeln!(
            out,
            "      <AdditionalIncludeDirectories>{}</AdditionalIncludeDirectories>",
            list(includes, "AdditionalIncludeDirectories")
        )?;
    }
    if !usage.compile_flags.is_empty() {
        writeln!(
            out,
            "      <AdditionalOptions>{} %(AdditionalOptions)</AdditionalOptions>",
            xml_escape(&usage.compile_flags.join(" "))
        )?;
    }
    if let Some(std) = project.cxx_standard {
        writeln!(
            out,
            "      <LanguageStandard>{}</LanguageStandard>",
            std.as_msbuild_value()
        )?;
    }
    writeln!(out, "    </ClCompile>")?;

    let link = if matches!(target.kind, TargetKind::StaticLibrary | TargetKind::ObjectLibrary) {
        "Lib"
    } else {
        "Link"
    };
    let flags = if links_binary(target.kind) {
        link_closure(project, target).flags
    } else {
        target.flags.clone()
    };
    let libraries: Vec<String> = flags.link_libraries.iter().map(|l| library_file(l)).collect();
    if !libraries.is_empty() || !flags.link_flags.is_empty() {
        writeln!(out, "    <{}>", link)?;
        if !libraries.is_empty() {
            writeln!(
                out,
                "      <AdditionalDependencies>{}</AdditionalDependencies>",
                list(libraries, "AdditionalDependencies")
            )?;
        }
        if !flags.link_flags.is_empty() {
            writeln!(
                out,
                "      <AdditionalOptions>{} %(AdditionalOptions)</AdditionalOptions>",
                xml_escape(&flags.link_flags.join(" "))
            )?;
        }
        writeln!(out, "    </{}>", link)?;
    }
    writeln!(out, "  </ItemDefinitionGroup>")?;
    Ok(())
}

fn solution(
    targets: &[&Target],
    guids: &HashMap<&str, String>,
    solution_guid: &str,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out)?;
    writeln!(out, "Microsoft Visual Studio Solution File, Format Version 12.00")?;
    writeln!(out, "# Visual Studio Version 17")?;
    writeln!(out, "VisualStudioVersion = 17.0.31903.59")?;
    writeln!(out, "MinimumVisualStudioVersion = 10.0.40219.1")?;

    let mut ordered = Vec::new();
    for target in targets {
        let guid = guids.get(target.name.as_str()).ok_or(fmt::Error)?;
        writeln!(
            out,
            "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
            VCXPROJ_TYPE,
            target.name,
            file_name(&target.name),
            guid
        )?;
        writeln!(out, "EndProject")?;
        ordered.push(guid);
    }

    writeln!(out, "Global")?;
    writeln!(out, "\tGlobalSection(SolutionConfigurationPlatforms) = preSolution")?;
    for config in CONFIGURATIONS {
        writeln!(out, "\t\t{0}|{1} = {0}|{1}", config, PLATFORM)?;
    }
    writeln!(out, "\tEndGlobalSection")?;
    writeln!(out, "\tGlobalSection(ProjectConfigurationPlatforms) = postSolution")?;
    for guid in ordered {
        for config in CONFIGURATIONS {
            writeln!(out, "\t\t{0}.{1}|{2}.ActiveCfg = {1}|{2}", guid, config, PLATFORM)?;
            writeln!(out, "\t\t{0}.{1}|{2}.Build.0 = {1}|{2}", guid, config, PLATFORM)?;
        }
    }
    writeln!(out, "\tEndGlobalSection")?;
    writeln!(out, "\tGlobalSection(SolutionProperties) = preSolution")?;
    writeln!(out, "\t\tHideSolutionNode = FALSE")?;
    writeln!(out, "\tEndGlobalSection")?;
    writeln!(out, "\tGlobalSection(ExtensibilityGlobals) = postSolution")?;
    writeln!(out, "\t\tSolutionGuid = {}", solution_guid)?;
    writeln!(out, "\tEndGlobalSection")?;
    writeln!(out, "EndGlobal")?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::CppStandard;
    use crate::import::{msbuild, ImportOptions};
    use crate::test_support::{sample_project, write_tree};
    use tempfile::TempDir;

    fn write_rendered(dir: &std::path::Path, main: &str, rendered: &Rendered) {
        let mut files: Vec<(String, String)> = vec![(main.to_string(), rendered.contents.clone())];
        for (path, text) in &rendered.siblings {
            files.push((path.to_string_lossy().into_owned(), text.clone()));
        }
        let refs: Vec<(&str, &str)> = files.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
        write_tree(dir, &refs);
    }

    #[test]
    fn test_single_project_export() {
        let rendered = render(&sample_project(), &ExportContext::default()).unwrap();
        assert_eq!(rendered.siblings.len(), 1);
        assert_eq!(rendered.siblings[0].0, PathBuf::from("core.vcxproj"));

        let app = &rendered.contents;
        assert!(app.contains("<ProjectName>app</ProjectName>"));
        assert!(app.contains("<ConfigurationType>Application</ConfigurationType>"));
        assert!(app.contains(r#"<ClCompile Include="src\main.cpp" />"#));
        assert!(app.contains("<LanguageStandard>stdcpp17</LanguageStandard>"));
        assert!(app.contains(
            "<AdditionalDependencies>pthread.lib;%(AdditionalDependencies)</AdditionalDependencies>"
        ));
        assert!(app.contains(r#"<ProjectReference Include="core.vcxproj">"#));

        let core = &rendered.siblings[0].1;
        assert!(core.contains("<ConfigurationType>StaticLibrary</ConfigurationType>"));
        assert!(core.contains(r#"<ClInclude Include="include\core.h" />"#));
        assert!(core.contains("<AdditionalOptions>-Wall %(AdditionalOptions)</AdditionalOptions>"));
    }

    #[test]
    fn test_guids_are_stable() {
        let first = render(&sample_project(), &ExportContext::default()).unwrap();
        let second = render(&sample_project(), &ExportContext::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_solution_round_trip() {
        let ctx = ExportContext {
            solution: true,
            ..ExportContext::default()
        };
        let rendered = render(&sample_project(), &ctx).unwrap();
        assert!(rendered
            .contents
            .contains("Microsoft Visual Studio Solution File, Format Version 12.00"));
        assert_eq!(rendered.siblings.len(), 2);

        let tmp = TempDir::new().unwrap();
        write_rendered(tmp.path(), "demo.sln", &rendered);
        let project = msbuild::import(&tmp.path().join("demo.sln"), &ImportOptions::default()).unwrap();

        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp17));
        let core = project.target("core").unwrap();
        assert_eq!(core.kind, TargetKind::StaticLibrary);
        assert_eq!(core.sources, vec!["src/core.cpp"]);
        assert_eq!(core.headers, vec!["include/core.h"]);
        assert_eq!(core.flags.defines, vec!["CORE_STATIC"]);
        let app = project.target("app").unwrap();
        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.flags.link_libraries, vec!["pthread"]);
    }

    #[test]
    fn test_unexpressible_kinds_warn() {
        let mut project = Project::new("h", "/tmp/h");
        project.add_target(Target::new("headers", TargetKind::HeaderOnly));
        let rendered = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        assert!(rendered.contents.contains("<ConfigurationType>Utility</ConfigurationType>"));
    }

    #[test]
    fn test_links_static_chain_transitively() {
        let mut project = Project::new("chain", "/tmp/chain");
        let mut util = Target::static_library("util").with_sources(["util.c"]);
        util.flags.add_link_library("pthread");
        project.add_target(util);
        project.add_target(Target::static_library("core").with_sources(["core.c"]).with_dependency("util"));
        project.add_target(Target::executable("app").with_sources(["main.c"]).with_dependency("core"));

        let rendered = render(&project, &ExportContext::default()).unwrap();
        let app = &rendered.contents;
        assert!(app.contains(r#"<ProjectReference Include="core.vcxproj">"#));
        assert!(app.contains(r#"<ProjectReference Include="util.vcxproj">"#));
        assert!(app.contains(
            "<AdditionalDependencies>pthread.lib;%(AdditionalDependencies)</AdditionalDependencies>"
        ));

        let core = rendered
            .siblings
            .iter()
            .find(|(path, _)| path == &PathBuf::from("core.vcxproj"))
            .map(|(_, text)| text)
            .unwrap();
        assert!(!core.contains("pthread.lib"));
        assert!(!core.contains(r#"<ProjectReference Include="core.vcxproj">"#));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape(r#"A="x"&<y>"#), "A=&quot;x&quot;&amp;&lt;y&gt;");
    }
}
