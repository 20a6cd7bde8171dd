//! Xcode importer.
//!
//! `project.pbxproj` is an object graph keyed by 24-digit identifiers. The
//! [`plist`] reader turns it into a tree; this module walks from every
//! `PBXNativeTarget` through build phases, build files and file references
//! to concrete paths.

pub mod plist;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::core::error::TranslateError;
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::{Target, TargetKind};
use crate::core::warning::TranslationWarning;
use crate::import::ImportOptions;
use crate::util::diagnostic::suggestions;
use crate::util::fs::{absolutize, normalize_lexically, read_source, relative_path, to_slash};

use plist::Plist;

/// Name of the project file inside an `.xcodeproj` bundle.
pub const PBXPROJ: &str = "project.pbxproj";

type Objects = BTreeMap<String, Plist>;

/// Import an `.xcodeproj` bundle or the `project.pbxproj` inside it.
pub fn import(path: &Path, options: &ImportOptions) -> Result<Project, TranslateError> {
    let path = absolutize(path);
    let pbxproj = if path.extension().is_some_and(|e| e == "xcodeproj") {
        path.join(PBXPROJ)
    } else {
        path.clone()
    };
    let bundle = pbxproj
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let root = bundle
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    tracing::debug!("Parsing Xcode project {}", pbxproj.display());
    let text = read_source(&pbxproj)?;
    let rel = relative_path(&root, &pbxproj);
    let name = bundle
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| crate::import::fallback_name(&root));

    import_str(&text, &rel, &name, root, options)
}

/// Import pbxproj text. `file` is used for locations, `root` is the
/// directory holding the `.xcodeproj` bundle.
pub fn import_str(
    text: &str,
    file: &Path,
    name: &str,
    root: PathBuf,
    options: &ImportOptions,
) -> Result<Project, TranslateError> {
    let document = plist::parse(text)
        .map_err(|e| TranslateError::parse(file, Some(e.line), e.message))?;
    let objects = document
        .get("objects")
        .and_then(Plist::as_dict)
        .ok_or_else(|| TranslateError::parse(file, None, "missing `objects` dictionary"))?;

    let graph = ObjectGraph::new(objects, document.get_str("rootObject"));
    let mut project = Project::new(name, root);
    let importer = XcodeImporter {
        graph,
        options,
        file: file.to_path_buf(),
    };
    importer.run(&mut project);
    tracing::debug!(
        "Imported Xcode project `{}` with {} target(s)",
        project.name,
        project.targets().len()
    );
    Ok(project)
}

/// Lookup helpers over the `objects` map.
struct ObjectGraph<'a> {
    objects: &'a Objects,
    root_object: Option<&'a str>,
    /// Child id -> group id, from every group's `children`
    parents: HashMap<&'a str, &'a str>,
}

impl<'a> ObjectGraph<'a> {
    fn new(objects: &'a Objects, root_object: Option<&'a str>) -> Self {
        let mut parents = HashMap::new();
        for (id, object) in objects {
            if !matches!(object.get_str("isa"), Some("PBXGroup") | Some("PBXVariantGroup")) {
                continue;
            }
            for child in object.get("children").map(Plist::strings).unwrap_or_default() {
                parents.insert(child, id.as_str());
            }
        }
        ObjectGraph {
            objects,
            root_object,
            parents,
        }
    }

    fn get(&self, id: &str) -> Option<&'a Plist> {
        self.objects.get(id)
    }

    fn isa(&self, id: &str) -> Option<&'a str> {
        self.get(id).and_then(|o| o.get_str("isa"))
    }

    fn ids_of(&self, id: &str, key: &str) -> Vec<&'a str> {
        self.get(id)
            .and_then(|o| o.get(key))
            .map(Plist::strings)
            .unwrap_or_default()
    }

    fn objects_with_isa(&self, isa: &'a str) -> impl Iterator<Item = (&'a str, &'a Plist)> + '_ {
        self.objects
            .iter()
            .filter(move |(_, o)| o.get_str("isa") == Some(isa))
            .map(|(id, o)| (id.as_str(), o))
    }

    /// Resolve a file reference to a path relative to the project root.
    ///
    /// Returns `None` for references outside the source tree (SDK frameworks,
    /// build products).
    fn file_path(&self, id: &str) -> Option<String> {
        let object = self.get(id)?;
        let mut components = Vec::new();
        let mut current = Some((id, object));

        while let Some((cur_id, obj)) = current {
            if let Some(path) = obj.get_str("path") {
                components.push(path);
            }
            match obj.get_str("sourceTree").unwrap_or("<group>") {
                "<group>" => {
                    current = self
                        .parents
                        .get(cur_id)
                        .and_then(|p| self.get(p).map(|o| (*p, o)));
                }
                "SOURCE_ROOT" | "<absolute>" => break,
                _ => return None,
            }
        }

        if components.is_empty() {
            return None;
        }
        components.reverse();
        let joined: PathBuf = components.iter().collect();
        Some(to_slash(&normalize_lexically(&joined)))
    }
}

struct XcodeImporter<'a> {
    graph: ObjectGraph<'a>,
    options: &'a ImportOptions,
    file: PathBuf,
}

impl<'a> XcodeImporter<'a> {
    fn warn(&self, project: &mut Project, warning: TranslationWarning) {
        project.warn(warning.with_location(self.file.clone(), None));
    }

    fn run(&self, project: &mut Project) {
        // product file reference -> target name, to turn linked products into dependencies
        let products: HashMap<&str, &str> = self
            .graph
            .objects_with_isa("PBXNativeTarget")
            .filter_map(|(_, t)| Some((t.get_str("productReference")?, t.get_str("name")?)))
            .collect();

        let mut targets: Vec<(&str, &Plist)> =
            self.graph.objects_with_isa("PBXNativeTarget").collect();
        self.order_like_project(&mut targets);

        for (id, object) in targets {
            let Some(name) = object.get_str("name") else { continue };
            let kind = self.target_kind(project, name, object.get_str("productType"));
            let mut target = Target::new(name, kind);

            for phase in self.graph.ids_of(id, "buildPhases") {
                self.read_phase(project, &mut target, phase, &products);
            }
            for dep in self.graph.ids_of(id, "dependencies") {
                let dep_name = self
                    .graph
                    .get(dep)
                    .and_then(|d| d.get_str("target"))
                    .and_then(|t| self.graph.get(t))
                    .and_then(|t| t.get_str("name"))
                    .or_else(|| self.graph.get(dep).and_then(|d| d.get_str("name")));
                if let Some(dep_name) = dep_name {
                    target.add_dependency(dep_name);
                }
            }
            if let Some(list) = object.get_str("buildConfigurationList") {
                self.read_settings(project, &mut target, list);
            }

            tracing::debug!("Found {} target `{}`", kind, name);
            project.add_target(target);
        }

        self.read_project_standard(project);
    }

    /// Keep the order of the project's `targets` list; `objects` is sorted by id.
    fn order_like_project(&self, targets: &mut [(&'a str, &'a Plist)]) {
        let Some(root) = self.graph.root_object else { return };
        let order: HashMap<&str, usize> = self
            .graph
            .ids_of(root, "targets")
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        targets.sort_by_key(|(id, _)| order.get(id).copied().unwrap_or(usize::MAX));
    }

    fn target_kind(&self, project: &mut Project, name: &str, product: Option<&str>) -> TargetKind {
        match product.unwrap_or_default() {
            "com.apple.product-type.application" | "com.apple.product-type.tool" => {
                TargetKind::Executable
            }
            "com.apple.product-type.library.static" => TargetKind::StaticLibrary,
            "com.apple.product-type.library.dynamic" | "com.apple.product-type.framework" => {
                TargetKind::SharedLibrary
            }
            other => {
                self.warn(
                    project,
                    TranslationWarning::warning(format!(
                        "target `{}` has product type `{}`; imported as an executable",
                        name, other
                    ))
                    .with_suggestion(suggestions::UNSUPPORTED_KIND),
                );
                TargetKind::Executable
            }
        }
    }

    fn read_phase(
        &self,
        project: &mut Project,
        target: &mut Target,
        phase: &str,
        products: &HashMap<&str, &str>,
    ) {
        let isa = self.graph.isa(phase).unwrap_or_default();
        for build_file in self.graph.ids_of(phase, "files") {
            let Some(file_ref) = self.graph.get(build_file).and_then(|b| b.get_str("fileRef"))
            else {
                continue;
            };
            match isa {
                "PBXSourcesBuildPhase" => {
                    if let Some(path) = self.graph.file_path(file_ref) {
                        target.add_source(path);
                    }
                }
                "PBXHeadersBuildPhase" => {
                    if let Some(path) = self.graph.file_path(file_ref) {
                        target.add_header(path);
                    }
                }
                "PBXFrameworksBuildPhase" => {
                    if let Some(product_of) = products.get(file_ref) {
                        target.add_dependency(*product_of);
                        continue;
                    }
                    let Some(reference) = self.graph.get(file_ref) else { continue };
                    let Some(path) = reference.get_str("path").or_else(|| reference.get_str("name"))
                    else {
                        continue;
                    };
                    self.link_item(target, path);
                }
                _ => {
                    if self.options.verbose {
                        self.warn(
                            project,
                            TranslationWarning::info(format!(
                                "build phase `{}` of `{}` ignored",
                                isa, target.name
                            )),
                        );
                    }
                    return;
                }
            }
        }
    }

    fn link_item(&self, target: &mut Target, path: &str) {
        let file = path.rsplit('/').next().unwrap_or(path);
        if let Some(framework) = file.strip_suffix(".framework") {
            target.flags.add_framework(framework);
            return;
        }
        for ext in [".a", ".dylib", ".tbd"] {
            if let Some(stem) = file.strip_suffix(ext) {
                let lib = stem.strip_prefix("lib").unwrap_or(stem);
                target.flags.add_link_library(lib);
                return;
            }
        }
    }

    /// First configuration of a configuration list.
    fn first_configuration(&self, list: &str) -> Option<&'a Plist> {
        let first = self.graph.ids_of(list, "buildConfigurations").into_iter().next()?;
        self.graph.get(first)?.get("buildSettings")
    }

    fn read_settings(&self, project: &mut Project, target: &mut Target, list: &str) {
        let Some(settings) = self.first_configuration(list) else { return };

        for dir in setting_values(settings, "HEADER_SEARCH_PATHS") {
            target.flags.add_include_dir(strip_root_variable(&dir));
        }
        for dir in setting_values(settings, "SYSTEM_HEADER_SEARCH_PATHS") {
            target.flags.add_system_include_dir(strip_root_variable(&dir));
        }
        for define in setting_values(settings, "GCC_PREPROCESSOR_DEFINITIONS") {
            target.flags.add_define(define);
        }
        for key in ["OTHER_CFLAGS", "OTHER_CPLUSPLUSFLAGS"] {
            for flag in setting_values(settings, key) {
                target.flags.add_compiler_arg(&flag);
            }
        }
        let mut framework_next = false;
        for flag in setting_values(settings, "OTHER_LDFLAGS") {
            if framework_next {
                target.flags.add_framework(flag);
                framework_next = false;
            } else if flag == "-framework" {
                framework_next = true;
            } else {
                target.flags.add_linker_arg(&flag);
            }
        }
        self.declare_standard(project, settings);
    }

    /// The project's own configurations may also carry the standard.
    fn read_project_standard(&self, project: &mut Project) {
        if project.cxx_standard.is_some() {
            return;
        }
        let lists: Vec<&str> = self
            .graph
            .objects_with_isa("XCConfigurationList")
            .map(|(id, _)| id)
            .collect();
        for list in lists {
            if let Some(settings) = self.first_configuration(list) {
                self.declare_standard(project, settings);
            }
        }
    }

    fn declare_standard(&self, project: &mut Project, settings: &Plist) {
        let Some(std) = settings
            .get_str("CLANG_CXX_LANGUAGE_STANDARD")
            .and_then(CppStandard::parse_loose)
        else {
            return;
        };
        if let Some(warning) = project.declare_cxx_standard(std) {
            self.warn(project, warning);
        }
    }
}

/// Values of a build setting, split on whitespace, without `$(inherited)`.
fn setting_values(settings: &Plist, key: &str) -> Vec<String> {
    let Some(value) = settings.get(key) else {
        return Vec::new();
    };
    value
        .strings()
        .into_iter()
        .flat_map(|s| split_setting(s))
        .filter(|s| s != "$(inherited)")
        .collect()
}

/// Split a setting on whitespace, honouring double quotes.
fn split_setting(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// `$(SRCROOT)/include` -> `include`.
fn strip_root_variable(path: &str) -> String {
    for var in ["$(SRCROOT)", "$(PROJECT_DIR)", "${SRCROOT}", "${PROJECT_DIR}"] {
        if let Some(rest) = path.strip_prefix(var) {
            let rest = rest.trim_start_matches('/');
            return if rest.is_empty() {
                ".".to_string()
            } else {
                rest.to_string()
            };
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::warning::Severity;
    use crate::test_support::write_tree;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"// !$*UTF8*$!
{
	archiveVersion = 1;
	objectVersion = 56;
	objects = {
		B001 /* main.cpp in Sources */ = {isa = PBXBuildFile; fileRef = F001 /* main.cpp */; };
		B002 /* core.cpp in Sources */ = {isa = PBXBuildFile; fileRef = F002; };
		B003 /* libcore.a in Frameworks */ = {isa = PBXBuildFile; fileRef = P002; };
		B004 /* Cocoa.framework */ = {isa = PBXBuildFile; fileRef = F003; };
		B005 /* libz.tbd */ = {isa = PBXBuildFile; fileRef = F004; };
		B006 /* core.h */ = {isa = PBXBuildFile; fileRef = F005; };
		F001 = {isa = PBXFileReference; path = main.cpp; sourceTree = "<group>"; };
		F002 = {isa = PBXFileReference; path = core.cpp; sourceTree = "<group>"; };
		F003 = {isa = PBXFileReference; name = Cocoa.framework; path = System/Library/Frameworks/Cocoa.framework; sourceTree = SDKROOT; };
		F004 = {isa = PBXFileReference; name = libz.tbd; path = usr/lib/libz.tbd; sourceTree = SDKROOT; };
		F005 = {isa = PBXFileReference; path = include/core.h; sourceTree = SOURCE_ROOT; };
		P001 = {isa = PBXFileReference; path = app; sourceTree = BUILT_PRODUCTS_DIR; };
		P002 = {isa = PBXFileReference; path = libcore.a; sourceTree = BUILT_PRODUCTS_DIR; };
		G000 = {isa = PBXGroup; children = (G001, G002, F005); sourceTree = "<group>"; };
		G001 = {isa = PBXGroup; children = (F001); path = src; sourceTree = "<group>"; };
		G002 = {isa = PBXGroup; children = (F002); path = lib; sourceTree = "<group>"; };
		S001 = {isa = PBXSourcesBuildPhase; files = (B001); };
		S002 = {isa = PBXSourcesBuildPhase; files = (B002); };
		H002 = {isa = PBXHeadersBuildPhase; files = (B006); };
		W001 = {isa = PBXFrameworksBuildPhase; files = (B003, B004, B005); };
		D001 = {isa = PBXTargetDependency; target = T002; };
		T002 = {isa = PBXNativeTarget; name = core; productType = "com.apple.product-type.library.static"; buildPhases = (S002, H002); dependencies = (); productReference = P002; buildConfigurationList = L002; };
		T001 = {isa = PBXNativeTarget; name = app; productType = "com.apple.product-type.tool"; buildPhases = (S001, W001); dependencies = (D001); productReference = P001; buildConfigurationList = L001; };
		L001 = {isa = XCConfigurationList; buildConfigurations = (C001, C002); };
		L002 = {isa = XCConfigurationList; buildConfigurations = (C003); };
		C001 = {isa = XCBuildConfiguration; name = Debug; buildSettings = {
			HEADER_SEARCH_PATHS = ("$(inherited)", "$(SRCROOT)/include", );
			GCC_PREPROCESSOR_DEFINITIONS = ("$(inherited)", "DEBUG=1", );
			OTHER_CFLAGS = "-Wall -Wextra";
			OTHER_LDFLAGS = ("-framework", Metal, "-lcurl", );
			CLANG_CXX_LANGUAGE_STANDARD = "c++17";
		}; };
		C002 = {isa = XCBuildConfiguration; name = Release; buildSettings = { GCC_PREPROCESSOR_DEFINITIONS = NDEBUG; }; };
		C003 = {isa = XCBuildConfiguration; name = Debug; buildSettings = { }; };
		R001 = {isa = PBXProject; mainGroup = G000; targets = (T001, T002); };
	};
	rootObject = R001;
}
"#;

    fn import_sample() -> Project {
        import_str(
            SAMPLE,
            Path::new("Demo.xcodeproj/project.pbxproj"),
            "Demo",
            PathBuf::from("/tmp/demo"),
            &ImportOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_targets_in_project_order() {
        let project = import_sample();
        assert_eq!(project.name, "Demo");
        let names: Vec<&str> = project.targets().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["app", "core"]);
        assert_eq!(project.target("app").unwrap().kind, TargetKind::Executable);
        assert_eq!(project.target("core").unwrap().kind, TargetKind::StaticLibrary);
    }

    #[test]
    fn test_group_paths_resolve() {
        let project = import_sample();
        assert_eq!(project.target("app").unwrap().sources, vec!["src/main.cpp"]);
        let core = project.target("core").unwrap();
        assert_eq!(core.sources, vec!["lib/core.cpp"]);
        assert_eq!(core.headers, vec!["include/core.h"]);
    }

    #[test]
    fn test_frameworks_libraries_and_products() {
        let app = import_sample().target("app").unwrap().clone();
        assert_eq!(app.dependencies, vec!["core"]);
        assert_eq!(app.flags.frameworks, vec!["Cocoa", "Metal"]);
        assert_eq!(app.flags.link_libraries, vec!["z", "curl"]);
    }

    #[test]
    fn test_first_configuration_settings() {
        let project = import_sample();
        let app = project.target("app").unwrap();
        assert_eq!(app.flags.include_dirs, vec!["include"]);
        assert_eq!(app.flags.defines, vec!["DEBUG=1"]);
        assert_eq!(app.flags.compile_flags, vec!["-Wall", "-Wextra"]);
        assert_eq!(project.cxx_standard, Some(CppStandard::Cpp17));
    }

    #[test]
    fn test_unknown_product_type_warns() {
        let text = SAMPLE.replace("com.apple.product-type.tool", "com.apple.product-type.bundle");
        let project = import_str(
            &text,
            Path::new("x.pbxproj"),
            "Demo",
            PathBuf::from("/tmp"),
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(project.warnings().len(), 1);
        assert_eq!(project.warnings()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_malformed_is_parse_error() {
        let err = import_str(
            "{ objects = { A = { isa = PBXGroup; }",
            Path::new("x.pbxproj"),
            "x",
            PathBuf::from("/tmp"),
            &ImportOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TranslateError::Parse { .. }));
    }

    #[test]
    fn test_import_from_bundle_directory() {
        let tmp = TempDir::new().unwrap();
        write_tree(tmp.path(), &[("Demo.xcodeproj/project.pbxproj", SAMPLE)]);
        let project = import(&tmp.path().join("Demo.xcodeproj"), &ImportOptions::default()).unwrap();
        assert_eq!(project.name, "Demo");
        assert_eq!(project.targets().len(), 2);
    }

    #[test]
    fn test_split_setting_quotes() {
        assert_eq!(
            split_setting(r#"-DNAME="a b" -O2"#),
            vec!["-DNAME=a b".to_string(), "-O2".to_string()]
        );
        assert_eq!(strip_root_variable("$(SRCROOT)"), ".");
    }
}
