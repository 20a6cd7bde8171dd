//! Scoped CMake variables and `${}` expansion.

use std::collections::HashMap;

/// Variable bindings, one frame per directory scope.
///
/// Lookups fall through to enclosing frames. `unset` leaves a tombstone so a
/// child scope can hide a parent's value.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<HashMap<String, Option<Vec<String>>>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Scope {
            frames: vec![HashMap::new()],
        }
    }

    /// Open a child scope (`add_subdirectory`).
    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    /// Close the innermost child scope.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        for frame in self.frames.iter().rev() {
            if let Some(entry) = frame.get(name) {
                return entry.as_deref();
            }
        }
        None
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), Some(values));
        }
    }

    /// Set in the enclosing scope (`PARENT_SCOPE`). A no-op at top level.
    pub fn set_parent(&mut self, name: impl Into<String>, values: Option<Vec<String>>) {
        let len = self.frames.len();
        if len >= 2 {
            self.frames[len - 2].insert(name.into(), values);
        }
    }

    pub fn unset(&mut self, name: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), None);
        }
    }

    pub fn append(&mut self, name: &str, values: impl IntoIterator<Item = String>) {
        let mut current = self.get(name).map(<[String]>::to_vec).unwrap_or_default();
        current.extend(values);
        self.set(name, current);
    }

    pub fn prepend(&mut self, name: &str, values: Vec<String>) {
        let mut merged = values;
        merged.extend(self.get(name).map(<[String]>::to_vec).unwrap_or_default());
        self.set(name, merged);
    }

    /// Check a variable the way `if(VAR)` would.
    pub fn is_truthy(&self, name: &str) -> bool {
        self.get(name)
            .and_then(|v| v.first())
            .is_some_and(|v| is_truthy(v))
    }

    /// Replace every `${NAME}` in `text`.
    ///
    /// References nest (`${${A}_DIR}` resolves the inner one first). Values of
    /// a list variable are joined with `;`. A reference to an undefined
    /// variable is kept as written.
    pub fn expand(&self, text: &str) -> String {
        self.expand_joined(text, ";")
    }

    /// Like [`Scope::expand`], but list values are joined with an escaped
    /// `\;` so the result stays one item through [`split_list`].
    pub fn expand_embedded(&self, text: &str) -> String {
        self.expand_joined(text, "\\;")
    }

    fn expand_joined(&self, text: &str, separator: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];
            if rest.starts_with("${") {
                match matching_brace(rest) {
                    Some(close) => {
                        let name = self.expand(&rest[2..close]);
                        match self.get(&name) {
                            Some(values) => out.push_str(&values.join(separator)),
                            None => {
                                out.push_str("${");
                                out.push_str(&name);
                                out.push('}');
                            }
                        }
                        i += close + 1;
                    }
                    None => {
                        out.push_str(rest);
                        break;
                    }
                }
                continue;
            }
            let Some(c) = rest.chars().next() else { break };
            out.push(c);
            i += c.len_utf8();
        }

        out
    }
}

/// Whether `text` is exactly one `${...}` reference.
pub fn is_single_reference(text: &str) -> bool {
    text.starts_with("${") && matching_brace(text) == Some(text.len() - 1)
}

/// Byte offset of the `}` closing the `${` at the start of `text`.
fn matching_brace(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// CMake's notion of a true constant.
pub fn is_truthy(value: &str) -> bool {
    let upper = value.to_ascii_uppercase();
    if matches!(upper.as_str(), "" | "0" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND")
        || upper.ends_with("-NOTFOUND")
    {
        return false;
    }
    true
}

/// Split a CMake list on `;`.
///
/// Empty elements are dropped, `\;` is an escaped separator, and separators
/// inside `$<...>` generator expressions do not split.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut genex_depth = 0usize;
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                chars.next();
                current.push(';');
            }
            '$' if chars.peek() == Some(&'<') => {
                chars.next();
                genex_depth += 1;
                current.push_str("$<");
            }
            '>' if genex_depth > 0 => {
                genex_depth -= 1;
                current.push('>');
            }
            ';' if genex_depth == 0 => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

/// Outcome of evaluating a generator expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Genex {
    /// No generator expression in the value
    Plain(String),
    /// Expression resolved to zero or more values
    Resolved(Vec<String>),
    /// Expression could not be evaluated and was dropped
    Unsupported(String),
}

/// Approximate a value that may hold a generator expression.
///
/// `$<BUILD_INTERFACE:x>` yields `x`; `$<INSTALL_INTERFACE:..>` yields
/// nothing; anything else cannot be evaluated without a configuration.
pub fn evaluate_genex(value: &str) -> Genex {
    if !value.contains("$<") {
        return Genex::Plain(value.to_string());
    }

    let whole = value.starts_with("$<") && value.ends_with('>') && outer_genex_len(value) == Some(value.len());
    if !whole {
        return Genex::Unsupported(value.to_string());
    }

    let inner = &value[2..value.len() - 1];
    let (head, body) = match inner.find(':') {
        Some(idx) => (&inner[..idx], &inner[idx + 1..]),
        None => (inner, ""),
    };

    match head {
        "BUILD_INTERFACE" | "BUILD_LOCAL_INTERFACE" => {
            let mut out = Vec::new();
            for item in split_list(body) {
                match evaluate_genex(&item) {
                    Genex::Plain(v) => out.push(v),
                    Genex::Resolved(vs) => out.extend(vs),
                    unsupported @ Genex::Unsupported(_) => return unsupported,
                }
            }
            Genex::Resolved(out)
        }
        "INSTALL_INTERFACE" => Genex::Resolved(Vec::new()),
        _ => Genex::Unsupported(value.to_string()),
    }
}

/// Length of the generator expression starting at the beginning of `value`.
fn outer_genex_len(value: &str) -> Option<usize> {
    let bytes = value.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'<') {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == b'>' {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_variable_expands_in_order() {
        let mut scope = Scope::new();
        scope.set("X", list(&["a", "b"]));
        assert_eq!(split_list(&scope.expand("${X}")), vec!["a", "b"]);
    }

    #[test]
    fn test_embedded_reference_joins_values() {
        let mut scope = Scope::new();
        scope.set("X", list(&["a", "b"]));
        assert_eq!(scope.expand("pre${X}post"), "prea;bpost");
    }

    #[test]
    fn test_single_reference() {
        assert!(is_single_reference("${X}"));
        assert!(is_single_reference("${${A}_DIR}"));
        assert!(!is_single_reference("src/${X}.c"));
        assert!(!is_single_reference("${A}${B}"));

        let mut scope = Scope::new();
        scope.set("X", list(&["a", "b"]));
        assert_eq!(split_list(&scope.expand_embedded("-I${X}")), vec!["-Ia;b"]);
    }

    #[test]
    fn test_unresolved_is_literal() {
        let scope = Scope::new();
        assert_eq!(scope.expand("${NOPE}/x"), "${NOPE}/x");
        assert_eq!(scope.expand("$ENV{HOME}"), "$ENV{HOME}");
        assert_eq!(scope.expand("${unterminated"), "${unterminated");
    }

    #[test]
    fn test_nested_reference() {
        let mut scope = Scope::new();
        scope.set("WHICH", list(&["FOO"]));
        scope.set("FOO_DIR", list(&["include/foo"]));
        assert_eq!(scope.expand("${${WHICH}_DIR}"), "include/foo");
    }

    #[test]
    fn test_child_scope_and_parent_scope() {
        let mut scope = Scope::new();
        scope.set("A", list(&["1"]));
        scope.push();
        assert_eq!(scope.get("A"), Some(&["1".to_string()][..]));
        scope.set("A", list(&["2"]));
        scope.set_parent("B", Some(list(&["up"])));
        scope.unset("A");
        assert!(scope.get("A").is_none());
        scope.pop();
        assert_eq!(scope.get("A"), Some(&["1".to_string()][..]));
        assert_eq!(scope.get("B"), Some(&["up".to_string()][..]));
    }

    #[test]
    fn test_append() {
        let mut scope = Scope::new();
        scope.append("SRC", list(&["a.c"]));
        scope.append("SRC", list(&["b.c"]));
        scope.prepend("SRC", list(&["z.c"]));
        assert_eq!(scope.get("SRC").unwrap(), &list(&["z.c", "a.c", "b.c"])[..]);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a;;b;"), vec!["a", "b"]);
        assert_eq!(split_list(r"a\;b;c"), vec!["a;b", "c"]);
        assert_eq!(
            split_list("$<$<CONFIG:Debug>:A;B>;c"),
            vec!["$<$<CONFIG:Debug>:A;B>", "c"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy("ON"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy("FOO-NOTFOUND"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_generator_expressions() {
        assert_eq!(evaluate_genex("src/a.c"), Genex::Plain("src/a.c".into()));
        assert_eq!(
            evaluate_genex("$<BUILD_INTERFACE:include>"),
            Genex::Resolved(list(&["include"]))
        );
        assert_eq!(
            evaluate_genex("$<INSTALL_INTERFACE:include>"),
            Genex::Resolved(Vec::new())
        );
        assert!(matches!(
            evaluate_genex("$<$<CONFIG:Debug>:-g>"),
            Genex::Unsupported(_)
        ));
        assert!(matches!(
            evaluate_genex("-I$<BUILD_INTERFACE:x>"),
            Genex::Unsupported(_)
        ));
    }
}
