//! Command extraction and argument tokenization for CMake scripts.

use std::fmt;

/// One command invocation: `name(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name, lower-cased (CMake command names are case-insensitive)
    pub name: String,
    /// Raw argument text between the outer parentheses, comments removed
    pub args: String,
    /// 1-based line of the command name
    pub line: usize,
}

/// A single argument after tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub value: String,
    /// Quoted and bracket arguments are never split into list elements
    pub quoted: bool,
    /// Bracket arguments are not variable-expanded either
    pub bracket: bool,
}

/// Malformed input: unbalanced parentheses or an unterminated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Cursor {
    fn new(src: &str) -> Self {
        Cursor {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// If a bracket opener `[`, `=`*, `[` starts here, return its `=` count.
    fn bracket_open_len(&self) -> Option<usize> {
        if self.peek() != Some('[') {
            return None;
        }
        let mut eq = 0;
        while self.peek_at(1 + eq) == Some('=') {
            eq += 1;
        }
        (self.peek_at(1 + eq) == Some('[')).then_some(eq)
    }

    /// Consume a bracket block `[==[ ... ]==]`, returning its inner text.
    fn bracket_block(&mut self, eq: usize) -> Result<String, LexError> {
        let start_line = self.line;
        for _ in 0..eq + 2 {
            self.bump();
        }
        let mut inner = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError {
                        line: start_line,
                        message: "unterminated bracket argument or comment".to_string(),
                    })
                }
                Some(']') => {
                    let closes = (0..eq).all(|i| self.peek_at(1 + i) == Some('='))
                        && self.peek_at(1 + eq) == Some(']');
                    if closes {
                        for _ in 0..eq + 2 {
                            self.bump();
                        }
                        return Ok(inner);
                    }
                    inner.push(']');
                    self.bump();
                }
                Some(c) => {
                    inner.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Skip a `#` comment: a bracket comment or the rest of the line.
    fn skip_comment(&mut self) -> Result<(), LexError> {
        self.bump();
        if let Some(eq) = self.bracket_open_len() {
            self.bracket_block(eq)?;
            return Ok(());
        }
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        Ok(())
    }
}

/// Split a script into commands.
///
/// Parentheses and `#` inside quoted strings and bracket arguments do not
/// count. Comments between and inside commands are dropped.
pub fn extract_commands(src: &str) -> Result<Vec<Command>, LexError> {
    let mut cur = Cursor::new(src);
    let mut commands = Vec::new();

    while let Some(c) = cur.peek() {
        if c.is_whitespace() {
            cur.bump();
            continue;
        }
        if c == '#' {
            cur.skip_comment()?;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let line = cur.line;
            let mut name = String::new();
            while let Some(c) = cur.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    cur.bump();
                } else {
                    break;
                }
            }
            while matches!(cur.peek(), Some(' ') | Some('\t')) {
                cur.bump();
            }
            if cur.peek() != Some('(') {
                return Err(LexError {
                    line,
                    message: format!("expected `(` after command name `{}`", name),
                });
            }
            cur.bump();
            let args = command_body(&mut cur, &name, line)?;
            commands.push(Command {
                name: name.to_ascii_lowercase(),
                args,
                line,
            });
            continue;
        }
        if c == ')' {
            return Err(LexError {
                line: cur.line,
                message: "unbalanced parentheses: unexpected `)`".to_string(),
            });
        }
        return Err(LexError {
            line: cur.line,
            message: format!("unexpected character `{}`", c),
        });
    }

    Ok(commands)
}

/// Read up to the matching `)`. The opening `(` is already consumed.
fn command_body(cur: &mut Cursor, name: &str, line: usize) -> Result<String, LexError> {
    let mut depth = 1usize;
    let mut out = String::new();
    let mut in_quote = false;
    let mut quote_line = line;

    loop {
        let Some(c) = cur.peek() else {
            return Err(if in_quote {
                LexError {
                    line: quote_line,
                    message: "unterminated string".to_string(),
                }
            } else {
                LexError {
                    line,
                    message: format!("unbalanced parentheses: `{}(` is never closed", name),
                }
            });
        };

        if in_quote {
            cur.bump();
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = cur.bump() {
                        out.push(next);
                    }
                }
                '"' => in_quote = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_quote = true;
                quote_line = cur.line;
                out.push(c);
                cur.bump();
            }
            '#' => {
                cur.skip_comment()?;
                out.push(' ');
            }
            '[' if out.ends_with(|p: char| p.is_whitespace() || p == '(') || out.is_empty() => {
                match cur.bracket_open_len() {
                    Some(eq) => {
                        let marker = "=".repeat(eq);
                        let inner = cur.bracket_block(eq)?;
                        out.push('[');
                        out.push_str(&marker);
                        out.push('[');
                        out.push_str(&inner);
                        out.push(']');
                        out.push_str(&marker);
                        out.push(']');
                    }
                    None => {
                        out.push(c);
                        cur.bump();
                    }
                }
            }
            '(' => {
                depth += 1;
                out.push(c);
                cur.bump();
            }
            ')' => {
                depth -= 1;
                cur.bump();
                if depth == 0 {
                    return Ok(out);
                }
                out.push(c);
            }
            '\\' => {
                out.push(c);
                cur.bump();
                if let Some(next) = cur.bump() {
                    out.push(next);
                }
            }
            _ => {
                out.push(c);
                cur.bump();
            }
        }
    }
}

/// Split raw argument text into arguments.
///
/// A `"` only opens a quoted argument at the start of a token. Unquoted
/// parentheses become tokens of their own. A `#` at the start of an
/// unquoted token comments out the rest of the line.
pub fn tokenize_arguments(raw: &str) -> Vec<Arg> {
    let chars: Vec<char> = raw.chars().collect();
    let mut args = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '(' || c == ')' {
            args.push(Arg {
                value: c.to_string(),
                quoted: false,
                bracket: false,
            });
            i += 1;
            continue;
        }

        if c == '"' {
            i += 1;
            let mut value = String::new();
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\\' && i + 1 < chars.len() {
                    i += 1;
                    match chars[i] {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '\n' => {}
                        ';' => value.push_str("\\;"),
                        other => value.push(other),
                    }
                } else {
                    value.push(chars[i]);
                }
                i += 1;
            }
            i += 1;
            args.push(Arg {
                value,
                quoted: true,
                bracket: false,
            });
            continue;
        }

        if c == '[' {
            let mut eq = 0;
            while chars.get(i + 1 + eq) == Some(&'=') {
                eq += 1;
            }
            if chars.get(i + 1 + eq) == Some(&'[') {
                let close: String = format!("]{}]", "=".repeat(eq));
                let body_start = i + eq + 2;
                let rest: String = chars[body_start..].iter().collect();
                let (value, consumed) = match rest.find(&close) {
                    Some(end) => (rest[..end].to_string(), end + close.len()),
                    None => (rest.clone(), rest.len()),
                };
                // a newline right after the opener is not part of the value
                let value = value.strip_prefix('\n').map(str::to_string).unwrap_or(value);
                i = body_start + rest[..consumed].chars().count();
                args.push(Arg {
                    value,
                    quoted: true,
                    bracket: true,
                });
                continue;
            }
        }

        let mut value = String::new();
        while i < chars.len() {
            let c = chars[i];
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            if c == '\\' && i + 1 < chars.len() {
                i += 1;
                match chars[i] {
                    ';' => value.push_str("\\;"),
                    other => value.push(other),
                }
                i += 1;
                continue;
            }
            value.push(c);
            i += 1;
        }
        args.push(Arg {
            value,
            quoted: false,
            bracket: false,
        });
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(src: &str) -> Vec<String> {
        extract_commands(src)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    fn values(raw: &str) -> Vec<String> {
        tokenize_arguments(raw).into_iter().map(|a| a.value).collect()
    }

    #[test]
    fn test_extract_simple_commands() {
        let src = "cmake_minimum_required(VERSION 3.16)\nPROJECT(Demo)\n\nadd_executable(app main.cpp)\n";
        let cmds = extract_commands(src).unwrap();
        assert_eq!(cmds.len(), 3);
        assert_eq!(cmds[1].name, "project");
        assert_eq!(cmds[1].args, "Demo");
        assert_eq!(cmds[2].line, 4);
    }

    #[test]
    fn test_parens_and_hash_inside_strings() {
        let src = "message(\"a ) b # not a comment\")\nset(X y)";
        let cmds = extract_commands(src).unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].args, "\"a ) b # not a comment\"");
    }

    #[test]
    fn test_nested_parens_and_multiline() {
        let src = "if((A AND B)\n   OR C)\nendif()";
        let cmds = extract_commands(src).unwrap();
        assert_eq!(cmds[0].args, "(A AND B)\n   OR C");
        assert_eq!(cmds[1].line, 3);
    }

    #[test]
    fn test_comments_are_dropped() {
        let src = "# leading\n#[[ bracket\ncomment ]]\nset(X a # trailing\n  b)\n";
        let cmds = extract_commands(src).unwrap();
        assert_eq!(cmds.len(), 1);
        assert_eq!(values(&cmds[0].args), vec!["X", "a", "b"]);
    }

    #[test]
    fn test_unbalanced_parens_is_error() {
        let err = extract_commands("project(Demo\nadd_executable(app main.cpp)").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("never closed"));

        assert!(extract_commands("set(X \"abc)").is_err());
        assert!(extract_commands("set(X a))").is_err());
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        let args = tokenize_arguments(r#"NAME "with space" "esc\"aped" plain"#);
        assert_eq!(args.len(), 4);
        assert_eq!(args[1].value, "with space");
        assert!(args[1].quoted);
        assert_eq!(args[2].value, "esc\"aped");
        assert!(!args[3].quoted);
    }

    #[test]
    fn test_quote_only_at_token_start() {
        assert_eq!(values(r#"-DNAME="x""#), vec![r#"-DNAME="x""#]);
    }

    #[test]
    fn test_bracket_argument() {
        let cmds = extract_commands("set(X [=[a ) b]=])").unwrap();
        let args = tokenize_arguments(&cmds[0].args);
        assert_eq!(args[1].value, "a ) b");
        assert!(args[1].bracket);
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(names("Add_Library(x a.c)"), vec!["add_library"]);
    }
}
