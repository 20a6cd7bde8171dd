//! Language standards and related types.
//!
//! Every foreign format spells the C++ standard differently
//! (`CMAKE_CXX_STANDARD 17`, `cxx_std_17`, `cpp_std=c++17`, `stdcpp17`,
//! `gnu++17`). They all parse into one [`CppStandard`] so importers converge
//! on a single value and exporters can spell it back per format.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source language of a file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// C language
    #[default]
    C,
    /// C++ language
    #[serde(alias = "cpp", alias = "cxx", alias = "c++")]
    Cxx,
    /// Objective-C
    ObjC,
    /// Objective-C++
    ObjCxx,
}

impl Language {
    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
            Language::ObjC => "objective-c",
            Language::ObjCxx => "objective-c++",
        }
    }

    /// Classify a source path by extension.
    ///
    /// Returns `None` for headers and anything that is not compiled.
    /// Uppercase `.C` is C++ on case-sensitive filesystems.
    pub fn from_path(path: &str) -> Option<Language> {
        let ext = Path::new(path).extension()?.to_str()?;
        if ext == "C" {
            return Some(Language::Cxx);
        }
        match ext.to_ascii_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "cp" | "ixx" | "cppm" => Some(Language::Cxx),
            "m" => Some(Language::ObjC),
            "mm" => Some(Language::ObjCxx),
            _ => None,
        }
    }

    /// Whether a C++ compiler driver is needed for this language.
    pub fn needs_cxx_driver(&self) -> bool {
        matches!(self, Language::Cxx | Language::ObjCxx)
    }
}

/// Check if a path names a header file.
pub fn is_header(path: &str) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "h" | "hh" | "hpp" | "hxx" | "h++" | "inl" | "ipp" | "tpp" | "inc"
    )
}

/// C++ standard version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CppStandard {
    /// C++98 / C++03
    #[serde(rename = "98", alias = "03", alias = "c++98", alias = "c++03")]
    Cpp98,
    /// C++11
    #[serde(rename = "11", alias = "c++11", alias = "cpp11")]
    Cpp11,
    /// C++14
    #[serde(rename = "14", alias = "c++14", alias = "cpp14")]
    Cpp14,
    /// C++17
    #[serde(rename = "17", alias = "c++17", alias = "cpp17")]
    Cpp17,
    /// C++20
    #[serde(rename = "20", alias = "c++20", alias = "cpp20")]
    Cpp20,
    /// C++23
    #[serde(rename = "23", alias = "c++23", alias = "cpp23")]
    Cpp23,
}

impl CppStandard {
    /// The bare year number (`"17"`), as `CMAKE_CXX_STANDARD` wants it.
    pub fn as_number(&self) -> &'static str {
        match self {
            CppStandard::Cpp98 => "98",
            CppStandard::Cpp11 => "11",
            CppStandard::Cpp14 => "14",
            CppStandard::Cpp17 => "17",
            CppStandard::Cpp20 => "20",
            CppStandard::Cpp23 => "23",
        }
    }

    /// Get the standard as a compiler flag value (e.g., "c++17").
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            CppStandard::Cpp98 => "c++98",
            CppStandard::Cpp11 => "c++11",
            CppStandard::Cpp14 => "c++14",
            CppStandard::Cpp17 => "c++17",
            CppStandard::Cpp20 => "c++20",
            CppStandard::Cpp23 => "c++23",
        }
    }

    /// Get the MSBuild `LanguageStandard` value (e.g., "stdcpp17").
    pub fn as_msbuild_value(&self) -> &'static str {
        match self {
            // MSVC has no switch below C++14
            CppStandard::Cpp98 | CppStandard::Cpp11 | CppStandard::Cpp14 => "stdcpp14",
            CppStandard::Cpp17 => "stdcpp17",
            CppStandard::Cpp20 => "stdcpp20",
            CppStandard::Cpp23 => "stdcpplatest",
        }
    }

    /// Get the Xcode `CLANG_CXX_LANGUAGE_STANDARD` value.
    pub fn as_xcode_value(&self) -> &'static str {
        match self {
            CppStandard::Cpp98 => "c++98",
            CppStandard::Cpp11 => "c++0x",
            CppStandard::Cpp14 => "c++14",
            CppStandard::Cpp17 => "c++17",
            CppStandard::Cpp20 => "c++20",
            CppStandard::Cpp23 => "c++2b",
        }
    }

    /// Parse any of the spellings used across build systems.
    ///
    /// Accepts `17`, `c++17`, `gnu++1z`, `cxx_std_17`, `stdcpp17`,
    /// `-std=c++17`, `/std:c++latest` and friends.
    pub fn parse_loose(s: &str) -> Option<CppStandard> {
        let lower = s.trim().trim_matches('"').to_ascii_lowercase();
        let mut rest = lower.as_str();
        for prefix in ["-std=", "/std:", "cpp_std=", "std="] {
            if let Some(r) = rest.strip_prefix(prefix) {
                rest = r;
                break;
            }
        }
        for prefix in ["cxx_std_", "stdcpp", "gnu++", "c++", "cpp", "cxx"] {
            if let Some(r) = rest.strip_prefix(prefix) {
                rest = r;
                break;
            }
        }
        match rest {
            "98" | "03" => Some(CppStandard::Cpp98),
            "11" | "0x" => Some(CppStandard::Cpp11),
            "14" | "1y" => Some(CppStandard::Cpp14),
            "17" | "1z" => Some(CppStandard::Cpp17),
            "20" | "2a" => Some(CppStandard::Cpp20),
            "23" | "2b" | "latest" => Some(CppStandard::Cpp23),
            _ => None,
        }
    }
}

impl std::str::FromStr for CppStandard {
    type Err = CppStandardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CppStandard::parse_loose(s).ok_or_else(|| CppStandardParseError(s.to_string()))
    }
}

/// Error returned when parsing an invalid C++ standard string.
#[derive(Debug, Clone)]
pub struct CppStandardParseError(pub String);

impl std::fmt::Display for CppStandardParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid C++ standard '{}', valid values: 98, 11, 14, 17, 20, 23",
            self.0
        )
    }
}

impl std::error::Error for CppStandardParseError {}

impl std::fmt::Display for CppStandard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "C++{}", self.as_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loose_spellings() {
        assert_eq!(CppStandard::parse_loose("17"), Some(CppStandard::Cpp17));
        assert_eq!(CppStandard::parse_loose("cxx_std_20"), Some(CppStandard::Cpp20));
        assert_eq!(CppStandard::parse_loose("gnu++1z"), Some(CppStandard::Cpp17));
        assert_eq!(CppStandard::parse_loose("stdcpplatest"), Some(CppStandard::Cpp23));
        assert_eq!(CppStandard::parse_loose("-std=c++14"), Some(CppStandard::Cpp14));
        assert_eq!(CppStandard::parse_loose("c++0x"), Some(CppStandard::Cpp11));
        assert_eq!(CppStandard::parse_loose("cpp_std=c++2a"), Some(CppStandard::Cpp20));
        assert_eq!(CppStandard::parse_loose("fortran"), None);
    }

    #[test]
    fn test_standard_ordering() {
        assert!(CppStandard::Cpp20 > CppStandard::Cpp17);
        assert_eq!(CppStandard::Cpp17.max(CppStandard::Cpp11), CppStandard::Cpp17);
    }

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path("src/main.cpp"), Some(Language::Cxx));
        assert_eq!(Language::from_path("src/util.c"), Some(Language::C));
        assert_eq!(Language::from_path("src/legacy.C"), Some(Language::Cxx));
        assert_eq!(Language::from_path("src/view.mm"), Some(Language::ObjCxx));
        assert_eq!(Language::from_path("include/api.h"), None);
        assert!(is_header("include/api.hpp"));
        assert!(!is_header("src/main.cpp"));
    }
}
