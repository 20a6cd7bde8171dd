//! Xcode (`project.pbxproj`) exporter.
//!
//! Every object identifier is allocated up front from an [`IdGenerator`]
//! seeded with the project name, then the objects are written section by
//! section. Nothing depends on time or randomness, so an unchanged project
//! always renders to the same bytes.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write};

use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::export::{link_closure, resolved_sources, usage_flags, ExportContext, Rendered};
use crate::import::xcode::plist::quote;
use crate::util::diagnostic::suggestions;
use crate::util::hash::IdGenerator;

/// Sections in the order they are written.
const SECTIONS: [&str; 11] = [
    "PBXBuildFile",
    "PBXContainerItemProxy",
    "PBXFileReference",
    "PBXFrameworksBuildPhase",
    "PBXGroup",
    "PBXNativeTarget",
    "PBXProject",
    "PBXSourcesBuildPhase",
    "PBXTargetDependency",
    "XCBuildConfiguration",
    "XCConfigurationList",
];

const CONFIGURATIONS: [&str; 2] = ["Debug", "Release"];

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    Ref(String, String),
    List(Vec<Value>),
    Dict(Vec<(String, Value)>),
}

impl Value {
    fn text(value: impl Into<String>) -> Value {
        Value::Text(value.into())
    }

    fn reference(id: &str, comment: impl Into<String>) -> Value {
        Value::Ref(id.to_string(), comment.into())
    }

    fn write(&self, out: &mut String, indent: usize) -> fmt::Result {
        match self {
            Value::Text(text) => write!(out, "{}", quote(text)),
            Value::Ref(id, comment) if comment.is_empty() => write!(out, "{}", id),
            Value::Ref(id, comment) => write!(out, "{} /* {} */", id, comment),
            Value::List(items) => {
                writeln!(out, "(")?;
                for item in items {
                    write!(out, "{}", "\t".repeat(indent + 1))?;
                    item.write(out, indent + 1)?;
                    writeln!(out, ",")?;
                }
                write!(out, "{})", "\t".repeat(indent))
            }
            Value::Dict(entries) => {
                writeln!(out, "{{")?;
                for (key, value) in entries {
                    write!(out, "{}{} = ", "\t".repeat(indent + 1), quote(key))?;
                    value.write(out, indent + 1)?;
                    writeln!(out, ";")?;
                }
                write!(out, "{}}}", "\t".repeat(indent))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Object {
    id: String,
    comment: String,
    isa: &'static str,
    /// Written on one line, as Xcode does for build files and file references
    inline: bool,
    fields: Vec<(&'static str, Value)>,
}

impl Object {
    fn new(id: &str, comment: impl Into<String>, isa: &'static str) -> Self {
        Object {
            id: id.to_string(),
            comment: comment.into(),
            isa,
            inline: false,
            fields: Vec::new(),
        }
    }

    fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    fn field(mut self, key: &'static str, value: Value) -> Self {
        self.fields.push((key, value));
        self
    }

    fn write(&self, out: &mut String) -> fmt::Result {
        if self.comment.is_empty() {
            write!(out, "\t\t{} = {{", self.id)?;
        } else {
            write!(out, "\t\t{} /* {} */ = {{", self.id, self.comment)?;
        }
        if self.inline {
            write!(out, "isa = {}; ", self.isa)?;
            for (key, value) in &self.fields {
                write!(out, "{} = ", key)?;
                value.write(out, 0)?;
                write!(out, "; ")?;
            }
            return writeln!(out, "}};");
        }
        writeln!(out)?;
        writeln!(out, "\t\t\tisa = {};", self.isa)?;
        for (key, value) in &self.fields {
            write!(out, "\t\t\t{} = ", key)?;
            value.write(out, 3)?;
            writeln!(out, ";")?;
        }
        writeln!(out, "\t\t}};")
    }
}

/// Identifiers of one native target and everything hanging off it.
#[derive(Debug)]
struct TargetIds {
    target: String,
    sources_phase: String,
    frameworks_phase: String,
    config_list: String,
    configs: Vec<String>,
    product: String,
    /// (file reference, build file, path) per source
    sources: Vec<(String, String, String)>,
    /// (file reference, path) per header
    headers: Vec<(String, String)>,
    /// (container proxy, target dependency, dependency name)
    dependencies: Vec<(String, String, String)>,
    /// (build file, dependency name) per linked library product
    links: Vec<(String, String)>,
}

struct Ids {
    project: String,
    main_group: String,
    products_group: String,
    config_list: String,
    configs: Vec<String>,
    targets: Vec<TargetIds>,
}

fn product_type(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::StaticLibrary | TargetKind::ObjectLibrary => {
            "com.apple.product-type.library.static"
        }
        TargetKind::SharedLibrary => "com.apple.product-type.library.dynamic",
        _ => "com.apple.product-type.tool",
    }
}

fn product_file(target: &Target) -> (String, &'static str) {
    match target.kind {
        TargetKind::StaticLibrary | TargetKind::ObjectLibrary => {
            (target.output_filename("macos"), "archive.ar")
        }
        TargetKind::SharedLibrary => (target.output_filename("macos"), "compiled.mach-o.dylib"),
        _ => (target.name.clone(), "compiled.mach-o.executable"),
    }
}

fn file_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map(|(_, e)| e).unwrap_or_default();
    match ext {
        "c" => "sourcecode.c.c",
        "cc" | "cpp" | "cxx" | "c++" | "C" => "sourcecode.cpp.cpp",
        "m" => "sourcecode.c.objc",
        "mm" => "sourcecode.cpp.objcpp",
        "h" => "sourcecode.c.h",
        "hh" | "hpp" | "hxx" | "inl" => "sourcecode.cpp.h",
        _ => "text",
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn links_binary(kind: TargetKind) -> bool {
    matches!(kind, TargetKind::Executable | TargetKind::SharedLibrary)
}

/// Allocate every identifier before anything is written.
fn allocate(project: &Project, targets: &[(&Target, Vec<String>)]) -> Ids {
    let mut ids_gen = IdGenerator::new(project.name.as_str());
    let project_id = ids_gen.next_xcode_id("project");
    let main_group = ids_gen.next_xcode_id("group");
    let products_group = ids_gen.next_xcode_id("products");
    let config_list = ids_gen.next_xcode_id("configurations");
    let configs = CONFIGURATIONS.iter().map(|c| ids_gen.next_xcode_id(c)).collect();

    let exported: Vec<&str> = targets.iter().map(|(t, _)| t.name.as_str()).collect();
    let mut ids = Vec::new();
    for (target, sources) in targets {
        let name = target.name.as_str();
        let mut t = TargetIds {
            target: ids_gen.next_xcode_id(name),
            sources_phase: ids_gen.next_xcode_id("sources"),
            frameworks_phase: ids_gen.next_xcode_id("frameworks"),
            config_list: ids_gen.next_xcode_id("configurations"),
            configs: CONFIGURATIONS.iter().map(|c| ids_gen.next_xcode_id(c)).collect(),
            product: ids_gen.next_xcode_id("product"),
            sources: Vec::new(),
            headers: Vec::new(),
            dependencies: Vec::new(),
            links: Vec::new(),
        };
        for source in sources {
            let file_ref = ids_gen.next_xcode_id(source);
            let build_file = ids_gen.next_xcode_id(source);
            t.sources.push((file_ref, build_file, source.clone()));
        }
        for header in &target.headers {
            t.headers.push((ids_gen.next_xcode_id(header), header.clone()));
        }
        for dep in target.dependencies.iter().filter(|d| exported.contains(&d.as_str())) {
            let proxy = ids_gen.next_xcode_id(dep);
            let dependency = ids_gen.next_xcode_id(dep);
            t.dependencies.push((proxy, dependency, dep.clone()));
        }
        let linked: Vec<&String> = if links_binary(target.kind) {
            link_closure(project, target).targets.into_iter().map(|t| &t.name).collect()
        } else {
            target.dependencies.iter().collect()
        };
        for dep in linked {
            let linkable = targets
                .iter()
                .any(|(other, _)| &other.name == dep && other.kind.is_linkable());
            if linkable {
                t.links.push((ids_gen.next_xcode_id(dep), dep.clone()));
            }
        }
        ids.push(t);
    }

    Ids {
        project: project_id,
        main_group,
        products_group,
        config_list,
        configs,
        targets: ids,
    }
}

/// Render `project.pbxproj`.
pub fn render(project: &Project, ctx: &ExportContext<'_>) -> Result<Rendered, fmt::Error> {
    let mut warnings = Vec::new();
    let mut targets = Vec::new();
    for target in project.targets_in_dependency_order() {
        match target.kind {
            TargetKind::HeaderOnly | TargetKind::Interface => {
                warnings.push(
                    TranslationWarning::warning(format!(
                        "`{}` has no build output and is not exported as an Xcode target",
                        target.name
                    ))
                    .with_suggestion(suggestions::UNSUPPORTED_KIND),
                );
                continue;
            }
            TargetKind::ObjectLibrary => warnings.push(
                TranslationWarning::warning(format!(
                    "object library `{}` is exported as a static library",
                    target.name
                ))
                .with_suggestion(suggestions::UNSUPPORTED_KIND),
            ),
            _ => {}
        }
        let sources = resolved_sources(project, target, ctx, &mut warnings);
        targets.push((target, sources));
    }

    let ids = allocate(project, &targets);
    let mut sections: BTreeMap<&'static str, Vec<Object>> = BTreeMap::new();
    let mut add = |object: Object| sections.entry(object.isa).or_default().push(object);

    let product_ids: HashMap<&str, (&str, String)> = targets
        .iter()
        .zip(&ids.targets)
        .map(|((t, _), i)| (t.name.as_str(), (i.product.as_str(), product_file(t).0)))
        .collect();
    let target_ids: HashMap<&str, &str> = targets
        .iter()
        .zip(&ids.targets)
        .map(|((t, _), i)| (t.name.as_str(), i.target.as_str()))
        .collect();

    let mut group_children = Vec::new();
    let mut product_children = Vec::new();

    for ((target, _), tid) in targets.iter().zip(&ids.targets) {
        for (file_ref, build_file, path) in &tid.sources {
            let name = file_name(path);
            add(Object::new(build_file, format!("{} in Sources", name), "PBXBuildFile")
                .inline()
                .field("fileRef", Value::reference(file_ref, name)));
            add(file_reference(file_ref, &ctx.path(path)));
            group_children.push(Value::reference(file_ref, name));
        }
        for (file_ref, path) in &tid.headers {
            add(file_reference(file_ref, &ctx.path(path)));
            group_children.push(Value::reference(file_ref, file_name(path)));
        }
        for (build_file, dep) in &tid.links {
            let Some((product, file)) = product_ids.get(dep.as_str()) else { continue };
            add(Object::new(build_file, format!("{} in Frameworks", file), "PBXBuildFile")
                .inline()
                .field("fileRef", Value::reference(product, file.as_str())));
        }
        for (proxy, dependency, dep) in &tid.dependencies {
            let Some(remote) = target_ids.get(dep.as_str()) else { continue };
            add(Object::new(proxy, "PBXContainerItemProxy", "PBXContainerItemProxy")
                .field("containerPortal", Value::reference(&ids.project, "Project object"))
                .field("proxyType", Value::text("1"))
                .field("remoteGlobalIDString", Value::text(*remote))
                .field("remoteInfo", Value::text(dep.as_str())));
            add(Object::new(dependency, "PBXTargetDependency", "PBXTargetDependency")
                .field("target", Value::reference(remote, dep.as_str()))
                .field("targetProxy", Value::reference(proxy, "PBXContainerItemProxy")));
        }

        let (product_name, product_kind) = product_file(target);
        add(Object::new(&tid.product, product_name.as_str(), "PBXFileReference")
            .inline()
            .field("explicitFileType", Value::text(product_kind))
            .field("includeInIndex", Value::text("0"))
            .field("path", Value::text(product_name.as_str()))
            .field("sourceTree", Value::text("BUILT_PRODUCTS_DIR")));
        product_children.push(Value::reference(&tid.product, product_name.as_str()));

        add(Object::new(&tid.frameworks_phase, "Frameworks", "PBXFrameworksBuildPhase")
            .field("buildActionMask", Value::text("2147483647"))
            .field(
                "files",
                Value::List(
                    tid.links
                        .iter()
                        .filter_map(|(bf, dep)| {
                            let (_, file) = product_ids.get(dep.as_str())?;
                            Some(Value::reference(bf, format!("{} in Frameworks", file)))
                        })
                        .collect(),
                ),
            )
            .field("runOnlyForDeploymentPostprocessing", Value::text("0")));
        add(Object::new(&tid.sources_phase, "Sources", "PBXSourcesBuildPhase")
            .field("buildActionMask", Value::text("2147483647"))
            .field(
                "files",
                Value::List(
                    tid.sources
                        .iter()
                        .map(|(_, bf, path)| {
                            Value::reference(bf, format!("{} in Sources", file_name(path)))
                        })
                        .collect(),
                ),
            )
            .field("runOnlyForDeploymentPostprocessing", Value::text("0")));

        add(Object::new(&tid.target, target.name.as_str(), "PBXNativeTarget")
            .field(
                "buildConfigurationList",
                Value::reference(
                    &tid.config_list,
                    format!("Build configuration list for PBXNativeTarget \"{}\"", target.name),
                ),
            )
            .field(
                "buildPhases",
                Value::List(vec![
                    Value::reference(&tid.sources_phase, "Sources"),
                    Value::reference(&tid.frameworks_phase, "Frameworks"),
                ]),
            )
            .field("buildRules", Value::List(Vec::new()))
            .field(
                "dependencies",
                Value::List(
                    tid.dependencies
                        .iter()
                        .map(|(_, d, _)| Value::reference(d, "PBXTargetDependency"))
                        .collect(),
                ),
            )
            .field("name", Value::text(target.name.as_str()))
            .field("productName", Value::text(target.name.as_str()))
            .field("productReference", Value::reference(&tid.product, product_name.as_str()))
            .field("productType", Value::text(product_type(target.kind))));

        let settings = target_settings(project, target, ctx);
        for (config_id, config) in tid.configs.iter().zip(CONFIGURATIONS) {
            add(Object::new(config_id, config, "XCBuildConfiguration")
                .field("buildSettings", settings.clone())
                .field("name", Value::text(config)));
        }
        add(configuration_list(
            &tid.config_list,
            format!("Build configuration list for PBXNativeTarget \"{}\"", target.name),
            &tid.configs,
        ));
    }

    group_children.push(Value::reference(&ids.products_group, "Products"));
    add(Object::new(&ids.main_group, "", "PBXGroup")
        .field("children", Value::List(group_children))
        .field("sourceTree", Value::text("<group>")));
    add(Object::new(&ids.products_group, "Products", "PBXGroup")
        .field("children", Value::List(product_children))
        .field("name", Value::text("Products"))
        .field("sourceTree", Value::text("<group>")));

    add(Object::new(&ids.project, "Project object", "PBXProject")
        .field(
            "attributes",
            Value::Dict(vec![
                ("BuildIndependentTargetsInParallel".into(), Value::text("1")),
                ("LastUpgradeCheck".into(), Value::text("1500")),
            ]),
        )
        .field(
            "buildConfigurationList",
            Value::reference(
                &ids.config_list,
                format!("Build configuration list for PBXProject \"{}\"", project.name),
            ),
        )
        .field("compatibilityVersion", Value::text("Xcode 14.0"))
        .field("developmentRegion", Value::text("en"))
        .field("hasScannedForEncodings", Value::text("0"))
        .field("knownRegions", Value::List(vec![Value::text("en"), Value::text("Base")]))
        .field("mainGroup", Value::reference(&ids.main_group, ""))
        .field("productRefGroup", Value::reference(&ids.products_group, "Products"))
        .field("projectDirPath", Value::text(""))
        .field("projectRoot", Value::text(""))
        .field(
            "targets",
            Value::List(
                targets
                    .iter()
                    .zip(&ids.targets)
                    .map(|((t, _), i)| Value::reference(&i.target, t.name.as_str()))
                    .collect(),
            ),
        ));

    let project_settings = project_settings(project);
    for (config_id, config) in ids.configs.iter().zip(CONFIGURATIONS) {
        add(Object::new(config_id, config, "XCBuildConfiguration")
            .field("buildSettings", project_settings.clone())
            .field("name", Value::text(config)));
    }
    add(configuration_list(
        &ids.config_list,
        format!("Build configuration list for PBXProject \"{}\"", project.name),
        &ids.configs,
    ));

    let mut out = String::new();
    writeln!(out, "// !$*UTF8*$!")?;
    writeln!(out, "{{")?;
    writeln!(out, "\tarchiveVersion = 1;")?;
    writeln!(out, "\tclasses = {{")?;
    writeln!(out, "\t}};")?;
    writeln!(out, "\tobjectVersion = 56;")?;
    writeln!(out, "\tobjects = {{")?;
    for section in SECTIONS {
        let Some(objects) = sections.get_mut(section) else { continue };
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        writeln!(out)?;
        writeln!(out, "/* Begin {} section */", section)?;
        for object in objects.iter() {
            object.write(&mut out)?;
        }
        writeln!(out, "/* End {} section */", section)?;
    }
    writeln!(out, "\t}};")?;
    writeln!(out, "\trootObject = {} /* Project object */;", ids.project)?;
    writeln!(out, "}}")?;

    Ok(Rendered {
        contents: out,
        siblings: Vec::new(),
        warnings,
    })
}

fn file_reference(id: &str, path: &str) -> Object {
    let name = file_name(path);
    let mut object = Object::new(id, name, "PBXFileReference")
        .inline()
        .field("lastKnownFileType", Value::text(file_type(path)));
    if name != path {
        object = object.field("name", Value::text(name));
    }
    object
        .field("path", Value::text(path))
        .field("sourceTree", Value::text("SOURCE_ROOT"))
}

fn configuration_list(id: &str, comment: String, configs: &[String]) -> Object {
    Object::new(id, comment, "XCConfigurationList")
        .field(
            "buildConfigurations",
            Value::List(
                configs
                    .iter()
                    .zip(CONFIGURATIONS)
                    .map(|(c, name)| Value::reference(c, name))
                    .collect(),
            ),
        )
        .field("defaultConfigurationIsVisible", Value::text("0"))
        .field("defaultConfigurationName", Value::text("Release"))
}

fn settings_list(values: impl IntoIterator<Item = String>) -> Value {
    let mut items = vec![Value::text("$(inherited)")];
    items.extend(values.into_iter().map(Value::Text));
    Value::List(items)
}

fn target_settings(project: &Project, target: &Target, ctx: &ExportContext<'_>) -> Value {
    let usage = usage_flags(project, target);
    let root_path = |dir: &String| {
        let path = ctx.path(dir);
        if path.starts_with('/') || path.starts_with('$') {
            path
        } else if path == "." {
            "$(SRCROOT)".to_string()
        } else {
            format!("$(SRCROOT)/{}", path)
        }
    };

    let mut settings: BTreeMap<String, Value> = BTreeMap::new();
    settings.insert("PRODUCT_NAME".into(), Value::text("$(TARGET_NAME)"));
    if !usage.include_dirs.is_empty() {
        settings.insert(
            "HEADER_SEARCH_PATHS".into(),
            settings_list(usage.include_dirs.iter().map(root_path)),
        );
    }
    if !usage.system_include_dirs.is_empty() {
        settings.insert(
            "SYSTEM_HEADER_SEARCH_PATHS".into(),
            settings_list(usage.system_include_dirs.iter().map(root_path)),
        );
    }
    if !usage.defines.is_empty() {
        settings.insert(
            "GCC_PREPROCESSOR_DEFINITIONS".into(),
            settings_list(usage.defines.iter().cloned()),
        );
    }
    if !usage.compile_flags.is_empty() {
        settings.insert(
            "OTHER_CFLAGS".into(),
            settings_list(usage.compile_flags.iter().cloned()),
        );
    }
    let flags = if links_binary(target.kind) {
        link_closure(project, target).flags
    } else {
        target.flags.clone()
    };
    let mut link: Vec<String> = flags.link_flags.clone();
    link.extend(flags.link_libraries.iter().map(|l| {
        if l.starts_with('-') || l.contains('/') {
            l.clone()
        } else {
            format!("-l{}", l)
        }
    }));
    for framework in &flags.frameworks {
        link.push("-framework".to_string());
        link.push(framework.clone());
    }
    if !link.is_empty() {
        settings.insert("OTHER_LDFLAGS".into(), settings_list(link));
    }
    if target.kind == TargetKind::SharedLibrary {
        settings.insert("DYLIB_INSTALL_NAME_BASE".into(), Value::text("@rpath"));
        settings.insert("EXECUTABLE_PREFIX".into(), Value::text("lib"));
    }
    Value::Dict(settings.into_iter().collect())
}

fn project_settings(project: &Project) -> Value {
    let mut settings = vec![("ALWAYS_SEARCH_USER_PATHS".to_string(), Value::text("NO"))];
    if let Some(std) = project.cxx_standard {
        settings.push((
            "CLANG_CXX_LANGUAGE_STANDARD".to_string(),
            Value::text(std.as_xcode_value()),
        ));
    }
    settings.push(("SDKROOT".to_string(), Value::text("macosx")));
    Value::Dict(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::CppStandard;
    use crate::import::xcode::import_str;
    use crate::import::ImportOptions;
    use crate::test_support::sample_project;
    use std::path::{Path, PathBuf};

    fn section_order(text: &str) -> Vec<&str> {
        text.lines()
            .filter_map(|l| l.strip_prefix("/* Begin "))
            .filter_map(|l| l.strip_suffix(" section */"))
            .collect()
    }

    #[test]
    fn test_export_is_byte_identical() {
        let project = sample_project();
        let first = render(&project, &ExportContext::default()).unwrap();
        let second = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(first.contents, second.contents);
    }

    #[test]
    fn test_sections_in_order() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        assert_eq!(section_order(&text), SECTIONS.to_vec());
        assert!(text.starts_with("// !$*UTF8*$!\n{\n"));
        assert!(text.contains("productType = com.apple.product-type.library.static;"));
        assert!(text.contains("CLANG_CXX_LANGUAGE_STANDARD = \"c++17\";"));
    }

    #[test]
    fn test_export_reimports() {
        let text = render(&sample_project(), &ExportContext::default())
            .unwrap()
            .contents;
        let project = import_str(
            &text,
            Path::new("demo.xcodeproj/project.pbxproj"),
            "demo",
            PathBuf::from("/work/demo"),
            &ImportOptions::default(),
        )
        .unwrap();

        assert!(project.warnings().is_empty());
        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp17));
        let names: Vec<&str> = project.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["core", "app"]);

        let core = project.target("core").unwrap();
        assert_eq!(core.kind, TargetKind::StaticLibrary);
        assert_eq!(core.sources, vec!["src/core.cpp"]);
        assert_eq!(core.flags.include_dirs, vec!["include"]);
        assert_eq!(core.flags.defines, vec!["CORE_STATIC"]);
        assert_eq!(core.flags.compile_flags, vec!["-Wall"]);

        let app = project.target("app").unwrap();
        assert_eq!(app.kind, TargetKind::Executable);
        assert_eq!(app.sources, vec!["src/main.cpp"]);
        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.flags.link_libraries, vec!["pthread"]);
    }

    #[test]
    fn test_links_static_chain_transitively() {
        let mut project = Project::new("chain", "/tmp/chain");
        let mut util = Target::static_library("util").with_sources(["util.c"]);
        util.flags.add_link_library("pthread");
        project.add_target(util);
        project.add_target(Target::static_library("core").with_sources(["core.c"]).with_dependency("util"));
        project.add_target(Target::executable("app").with_sources(["main.c"]).with_dependency("core"));

        let text = render(&project, &ExportContext::default()).unwrap().contents;
        // core links util, and app links both
        assert_eq!(text.matches("libutil.a in Frameworks").count(), 4);
        assert_eq!(text.matches("libcore.a in Frameworks").count(), 2);
        // util and app, once per configuration
        assert_eq!(text.matches("-lpthread").count(), 2 * CONFIGURATIONS.len());
    }

    #[test]
    fn test_header_only_target_is_skipped() {
        let mut project = Project::new("h", "/tmp/h");
        project.add_target(Target::new("headers", TargetKind::HeaderOnly));
        project.add_target(Target::executable("tool").with_sources(["main.c"]).with_dependency("headers"));
        let rendered = render(&project, &ExportContext::default()).unwrap();
        assert_eq!(rendered.warnings.len(), 1);
        assert!(!rendered.contents.contains("PBXTargetDependency section"));
        assert!(rendered.contents.contains("lastKnownFileType = sourcecode.c.c; path = main.c;"));
    }

    #[test]
    fn test_value_rendering() {
        let mut out = String::new();
        Value::List(vec![Value::text("$(inherited)"), Value::text("FOO")])
            .write(&mut out, 0)
            .unwrap();
        assert_eq!(out, "(\n\t\"$(inherited)\",\n\tFOO,\n)");
    }
}
