//! Build format identification.

use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::error::TranslateError;

/// Every build description format the translator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildFormat {
    /// Harbour's own manifest (Harbor.toml)
    Native,
    CMake,
    Meson,
    Makefile,
    Ninja,
    Xcode,
    MsBuild,
    Vcpkg,
    Conan,
    PkgConfig,
    CompileCommands,
}

/// File names probed, in order, when detecting the format of a directory.
const DIRECTORY_PROBES: &[(&str, BuildFormat)] = &[
    ("Harbor.toml", BuildFormat::Native),
    ("Harbour.toml", BuildFormat::Native),
    ("CMakeLists.txt", BuildFormat::CMake),
    ("meson.build", BuildFormat::Meson),
    ("vcpkg.json", BuildFormat::Vcpkg),
    ("conanfile.py", BuildFormat::Conan),
    ("conanfile.txt", BuildFormat::Conan),
    ("GNUmakefile", BuildFormat::Makefile),
    ("Makefile", BuildFormat::Makefile),
    ("makefile", BuildFormat::Makefile),
];

impl BuildFormat {
    /// All formats, for listing in help output.
    pub const ALL: [BuildFormat; 11] = [
        BuildFormat::Native,
        BuildFormat::CMake,
        BuildFormat::Meson,
        BuildFormat::Makefile,
        BuildFormat::Ninja,
        BuildFormat::Xcode,
        BuildFormat::MsBuild,
        BuildFormat::Vcpkg,
        BuildFormat::Conan,
        BuildFormat::PkgConfig,
        BuildFormat::CompileCommands,
    ];

    /// Short name used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildFormat::Native => "harbour",
            BuildFormat::CMake => "cmake",
            BuildFormat::Meson => "meson",
            BuildFormat::Makefile => "make",
            BuildFormat::Ninja => "ninja",
            BuildFormat::Xcode => "xcode",
            BuildFormat::MsBuild => "msbuild",
            BuildFormat::Vcpkg => "vcpkg",
            BuildFormat::Conan => "conan",
            BuildFormat::PkgConfig => "pkg-config",
            BuildFormat::CompileCommands => "compile-commands",
        }
    }

    /// Conventional file name written when exporting into a directory.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            BuildFormat::Native => "Harbor.toml",
            BuildFormat::CMake => "CMakeLists.txt",
            BuildFormat::Meson => "meson.build",
            BuildFormat::Makefile => "Makefile",
            BuildFormat::Ninja => "build.ninja",
            BuildFormat::Xcode => "project.pbxproj",
            BuildFormat::MsBuild => "project.vcxproj",
            BuildFormat::Vcpkg => "vcpkg.json",
            BuildFormat::Conan => "conanfile.txt",
            BuildFormat::PkgConfig => "project.pc",
            BuildFormat::CompileCommands => "compile_commands.json",
        }
    }

    /// Whether an importer exists for this format.
    pub fn can_import(&self) -> bool {
        !matches!(
            self,
            BuildFormat::Ninja | BuildFormat::PkgConfig | BuildFormat::CompileCommands
        )
    }

    /// Whether an exporter exists for this format.
    pub fn can_export(&self) -> bool {
        true
    }

    /// Detect a format from a file name alone.
    pub fn from_file_name(path: &Path) -> Option<BuildFormat> {
        let name = path.file_name()?.to_str()?;
        let format = match name {
            "CMakeLists.txt" => BuildFormat::CMake,
            "meson.build" => BuildFormat::Meson,
            "Makefile" | "makefile" | "GNUmakefile" => BuildFormat::Makefile,
            "build.ninja" => BuildFormat::Ninja,
            "project.pbxproj" => BuildFormat::Xcode,
            "vcpkg.json" => BuildFormat::Vcpkg,
            "conanfile.txt" | "conanfile.py" => BuildFormat::Conan,
            "Harbor.toml" | "Harbour.toml" => BuildFormat::Native,
            "compile_commands.json" => BuildFormat::CompileCommands,
            _ => match path.extension().and_then(|e| e.to_str())? {
                "cmake" => BuildFormat::CMake,
                "mk" => BuildFormat::Makefile,
                "ninja" => BuildFormat::Ninja,
                "xcodeproj" | "pbxproj" => BuildFormat::Xcode,
                "vcxproj" | "sln" => BuildFormat::MsBuild,
                "pc" => BuildFormat::PkgConfig,
                _ => return None,
            },
        };
        Some(format)
    }

    /// Detect the format of an existing path.
    ///
    /// A file (or an `.xcodeproj` bundle) is classified by name. A plain
    /// directory is probed for well-known build files, then scanned one
    /// level deep for Xcode and Visual Studio projects.
    pub fn detect(path: &Path) -> Result<BuildFormat, TranslateError> {
        Self::locate(path).map(|(format, _)| format)
    }

    /// Detect the format of a path and return the concrete file to import.
    pub fn locate(path: &Path) -> Result<(BuildFormat, PathBuf), TranslateError> {
        if !path.is_dir() || path.extension().is_some_and(|e| e == "xcodeproj") {
            return Self::from_file_name(path)
                .map(|f| (f, path.to_path_buf()))
                .ok_or_else(|| TranslateError::FormatDetection {
                    path: path.to_path_buf(),
                });
        }

        for (name, format) in DIRECTORY_PROBES {
            let candidate = path.join(name);
            if candidate.is_file() {
                tracing::debug!("Detected {} from {}", format, candidate.display());
                return Ok((*format, candidate));
            }
        }

        let mut entries: Vec<PathBuf> = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .collect();
        entries.sort();

        for ext in ["sln", "xcodeproj", "vcxproj"] {
            if let Some(found) = entries
                .iter()
                .find(|p| p.extension().is_some_and(|e| e == ext))
            {
                let format = if ext == "xcodeproj" {
                    BuildFormat::Xcode
                } else {
                    BuildFormat::MsBuild
                };
                tracing::debug!("Detected {} from {}", format, found.display());
                return Ok((format, found.clone()));
            }
        }

        Err(TranslateError::FormatDetection {
            path: path.to_path_buf(),
        })
    }
}

impl fmt::Display for BuildFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BuildFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "harbour" | "harbor" | "native" => Ok(BuildFormat::Native),
            "cmake" => Ok(BuildFormat::CMake),
            "meson" => Ok(BuildFormat::Meson),
            "make" | "makefile" => Ok(BuildFormat::Makefile),
            "ninja" => Ok(BuildFormat::Ninja),
            "xcode" | "xcodeproj" | "pbxproj" => Ok(BuildFormat::Xcode),
            "msbuild" | "vcxproj" | "visual-studio" | "sln" => Ok(BuildFormat::MsBuild),
            "vcpkg" => Ok(BuildFormat::Vcpkg),
            "conan" => Ok(BuildFormat::Conan),
            "pkg-config" | "pkgconfig" | "pc" => Ok(BuildFormat::PkgConfig),
            "compile-commands" | "compile_commands" | "compdb" => {
                Ok(BuildFormat::CompileCommands)
            }
            other => Err(format!(
                "unknown build format '{}', valid values: {}",
                other,
                BuildFormat::ALL
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_file_name() {
        let cases = [
            ("CMakeLists.txt", BuildFormat::CMake),
            ("cmake/deps.cmake", BuildFormat::CMake),
            ("meson.build", BuildFormat::Meson),
            ("Makefile", BuildFormat::Makefile),
            ("rules.mk", BuildFormat::Makefile),
            ("App.xcodeproj", BuildFormat::Xcode),
            ("App.xcodeproj/project.pbxproj", BuildFormat::Xcode),
            ("app.vcxproj", BuildFormat::MsBuild),
            ("All.sln", BuildFormat::MsBuild),
            ("vcpkg.json", BuildFormat::Vcpkg),
            ("conanfile.txt", BuildFormat::Conan),
            ("conanfile.py", BuildFormat::Conan),
            ("Harbor.toml", BuildFormat::Native),
        ];
        for (name, expected) in cases {
            assert_eq!(
                BuildFormat::from_file_name(Path::new(name)),
                Some(expected),
                "{}",
                name
            );
        }
        assert_eq!(BuildFormat::from_file_name(Path::new("README.md")), None);
    }

    #[test]
    fn test_detect_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("meson.build"), "project('x')").unwrap();
        assert_eq!(BuildFormat::detect(tmp.path()).unwrap(), BuildFormat::Meson);

        // CMakeLists.txt wins over meson.build
        std::fs::write(tmp.path().join("CMakeLists.txt"), "project(x)").unwrap();
        assert_eq!(BuildFormat::detect(tmp.path()).unwrap(), BuildFormat::CMake);
    }

    #[test]
    fn test_detect_directory_with_solution() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("App.sln"), "").unwrap();
        let (format, path) = BuildFormat::locate(tmp.path()).unwrap();
        assert_eq!(format, BuildFormat::MsBuild);
        assert_eq!(path, tmp.path().join("App.sln"));
    }

    #[test]
    fn test_detect_unknown_fails() {
        let tmp = TempDir::new().unwrap();
        let err = BuildFormat::detect(tmp.path()).unwrap_err();
        assert!(matches!(err, TranslateError::FormatDetection { .. }));

        let file = tmp.path().join("notes.txt");
        std::fs::write(&file, "").unwrap();
        assert!(BuildFormat::detect(&file).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("make".parse::<BuildFormat>().unwrap(), BuildFormat::Makefile);
        assert_eq!("XCODE".parse::<BuildFormat>().unwrap(), BuildFormat::Xcode);
        assert!("scons".parse::<BuildFormat>().is_err());
    }
}
