//! Canned projects shared by importer, exporter and engine tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::dependency::{Dependency, DependencyKind};
use crate::core::language::CppStandard;
use crate::core::project::Project;
use crate::core::target::Target;

/// A source tree to write to disk.
#[derive(Debug, Clone, Default)]
pub struct TreeFixture {
    /// Files (path relative to the root -> content)
    pub files: BTreeMap<PathBuf, String>,
}

impl TreeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write the tree below `base`.
    pub fn write_to(&self, base: &Path) -> std::io::Result<()> {
        for (rel, content) in &self.files {
            let path = base.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    /// A CMake project with a library in a subdirectory and an executable.
    pub fn cmake_app_with_lib() -> Self {
        TreeFixture::new()
            .with_file(
                "CMakeLists.txt",
                r#"cmake_minimum_required(VERSION 3.16)
project(Demo VERSION 1.0.0 LANGUAGES CXX)
set(CMAKE_CXX_STANDARD 17)
find_package(Threads REQUIRED)
add_subdirectory(lib)
add_executable(app src/main.cpp)
target_link_libraries(app PRIVATE greet Threads::Threads)
"#,
            )
            .with_file(
                "lib/CMakeLists.txt",
                r#"add_library(greet STATIC greet.cpp include/greet.h)
target_include_directories(greet PUBLIC include)
target_compile_definitions(greet PUBLIC GREET_STATIC)
"#,
            )
            .with_file("src/main.cpp", "int main() { return 0; }\n")
            .with_file("lib/greet.cpp", "void greet() {}\n")
            .with_file("lib/include/greet.h", "void greet();\n")
    }
}

/// A small project built in memory, used by exporter tests.
pub fn sample_project() -> Project {
    let mut project = Project::new("demo", "/work/demo");
    project.version = Some("1.2.0".to_string());
    project.description = Some("Demo project".to_string());
    project.cxx_standard = Some(CppStandard::Cpp17);

    let mut lib = Target::static_library("core").with_sources(["src/core.cpp", "include/core.h"]);
    lib.flags.add_include_dir("include");
    lib.flags.add_define("CORE_STATIC");
    lib.flags.add_compile_flag("-Wall");
    project.add_target(lib);

    let mut app = Target::executable("app")
        .with_sources(["src/main.cpp"])
        .with_dependency("core");
    app.flags.add_link_library("pthread");
    project.add_target(app);

    project.add_dependency(
        Dependency::new("zlib")
            .with_version(">=1.2.11")
            .with_kind(DependencyKind::System),
    );
    project.add_dependency(
        Dependency::new("fmt")
            .with_version("10.1.0")
            .with_source("https://github.com/fmtlib/fmt.git"),
    );
    project
}
