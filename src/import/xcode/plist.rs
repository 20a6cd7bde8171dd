//! Reader for old-style (OpenStep) property lists, as used by `project.pbxproj`.

use std::collections::BTreeMap;
use std::fmt;

/// A property list value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plist {
    String(String),
    Array(Vec<Plist>),
    Dict(BTreeMap<String, Plist>),
}

impl Plist {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Plist::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Plist]> {
        match self {
            Plist::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Plist>> {
        match self {
            Plist::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key of a dictionary.
    pub fn get(&self, key: &str) -> Option<&Plist> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Look up a string value of a dictionary.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Plist::as_str)
    }

    /// String items of an array, or a single string as a one-item list.
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Plist::String(s) => vec![s.as_str()],
            Plist::Array(items) => items.iter().filter_map(Plist::as_str).collect(),
            Plist::Dict(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlistError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for PlistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Parse a whole property list document.
pub fn parse(text: &str) -> Result<Plist, PlistError> {
    let mut reader = Reader {
        input: text.chars().collect(),
        position: 0,
        line: 1,
    };
    let value = reader.value()?;
    reader.skip_trivia()?;
    if reader.current_char().is_some() {
        return Err(reader.error("trailing content after the root value"));
    }
    Ok(value)
}

struct Reader {
    input: Vec<char>,
    position: usize,
    line: usize,
}

impl Reader {
    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            if ch == '\n' {
                self.line += 1;
            }
            self.position += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> PlistError {
        PlistError {
            line: self.line,
            message: message.into(),
        }
    }

    /// Skip whitespace and both comment styles.
    fn skip_trivia(&mut self) -> Result<(), PlistError> {
        loop {
            match (self.current_char(), self.peek_char()) {
                (Some(c), _) if c.is_whitespace() => self.advance(),
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.current_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let line = self.line;
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current_char(), self.peek_char()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => self.advance(),
                            (None, _) => {
                                return Err(PlistError {
                                    line,
                                    message: "unterminated comment".to_string(),
                                })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), PlistError> {
        self.skip_trivia()?;
        if self.current_char() == Some(ch) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected `{}`", ch)))
        }
    }

    fn value(&mut self) -> Result<Plist, PlistError> {
        self.skip_trivia()?;
        match self.current_char() {
            Some('{') => self.dict(),
            Some('(') => self.array(),
            Some('"') | Some('\'') => self.quoted().map(Plist::String),
            Some('<') => self.data().map(Plist::String),
            Some(c) if is_bare(c) => Ok(Plist::String(self.bare())),
            Some(c) => Err(self.error(format!("unexpected character `{}`", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn dict(&mut self) -> Result<Plist, PlistError> {
        self.advance();
        let mut map = BTreeMap::new();
        loop {
            self.skip_trivia()?;
            if self.current_char() == Some('}') {
                self.advance();
                return Ok(Plist::Dict(map));
            }
            let key = match self.value()? {
                Plist::String(key) => key,
                _ => return Err(self.error("dictionary key must be a string")),
            };
            self.expect('=')?;
            let value = self.value()?;
            self.expect(';')?;
            map.insert(key, value);
        }
    }

    fn array(&mut self) -> Result<Plist, PlistError> {
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.current_char() == Some(')') {
                self.advance();
                return Ok(Plist::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.current_char() {
                Some(',') => self.advance(),
                Some(')') => {}
                _ => return Err(self.error("expected `,` or `)` in array")),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, PlistError> {
        let line = self.line;
        let quote = self.current_char().unwrap_or('"');
        self.advance();
        let mut out = String::new();
        loop {
            match self.current_char() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(out);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some(c) => out.push(c),
                        None => break,
                    }
                    self.advance();
                }
                Some(c) => {
                    out.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        Err(PlistError {
            line,
            message: "unterminated string".to_string(),
        })
    }

    /// `<hex bytes>` data, kept as its raw text.
    fn data(&mut self) -> Result<String, PlistError> {
        let line = self.line;
        let mut out = String::new();
        while let Some(c) = self.current_char() {
            out.push(c);
            self.advance();
            if c == '>' {
                return Ok(out);
            }
        }
        Err(PlistError {
            line,
            message: "unterminated data".to_string(),
        })
    }

    fn bare(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.current_char() {
            if !is_bare(c) {
                break;
            }
            out.push(c);
            self.advance();
        }
        out
    }
}

fn is_bare(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '/' | '.' | ':' | '-' | '+')
}

/// Quote a string for writing back into a property list when needed.
pub fn quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | '.'))
        && !value.contains("//");
    if bare {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
