//! Terraform variable file rendering.
//!
//! Values are written as HCL literals, one `key = value` line per variable, in
//! the order given. [`parse`] reads the same subset back so the output can be
//! checked.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::ConfigValue;
use crate::error::{DeployError, Result};

// ============================================================================
// Rendering
// ============================================================================

/// Render one value as an HCL literal
pub fn render_value(value: &ConfigValue) -> String {
    match value {
        ConfigValue::Null => "null".to_string(),
        ConfigValue::Bool(b) => b.to_string(),
        ConfigValue::Int(i) => i.to_string(),
        ConfigValue::Float(f) if f.is_finite() => f.to_string(),
        ConfigValue::Float(_) => "null".to_string(),
        ConfigValue::Str(s) => quote(s),
        ConfigValue::List(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", inner.join(", "))
        }
        ConfigValue::Map(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{} = {}", render_key(k), render_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Render a whole variable file
pub fn render(pairs: &[(String, ConfigValue)]) -> String {
    let mut text = pairs
        .iter()
        .map(|(key, value)| format!("{key} = {}", render_value(value)))
        .collect::<Vec<_>>()
        .join("\n");
    text.push('\n');
    text
}

/// Overwrite `path` with the rendered variables
pub fn write(path: &Path, pairs: &[(String, ConfigValue)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(pairs))?;
    debug!(path = %path.display(), vars = pairs.len(), "Wrote variable file");
    Ok(())
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // template sequences are not allowed in variable files
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a variable file produced by [`render`]
pub fn parse(text: &str) -> Result<Vec<(String, ConfigValue)>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let (key, rest) = line
                .split_once('=')
                .ok_or_else(|| DeployError::config(format!("Malformed tfvars line: {line}")))?;
            let mut parser = Parser::new(rest);
            let value = parser.value()?;
            parser.finish()?;
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error(&self, what: &str) -> DeployError {
        let text: String = self.chars.iter().collect();
        DeployError::config(format!("Invalid tfvars value ({what}) at {}: {text}", self.pos))
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{expected}'"))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.error("trailing characters")),
        }
    }

    fn value(&mut self) -> Result<ConfigValue> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.string().map(ConfigValue::Str),
            Some('[') => self.list(),
            Some('{') => self.map(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => match self.identifier().as_str() {
                "null" => Ok(ConfigValue::Null),
                "true" => Ok(ConfigValue::Bool(true)),
                "false" => Ok(ConfigValue::Bool(false)),
                _ => Err(self.error("unknown keyword")),
            },
            _ => Err(self.error("unexpected token")),
        }
    }

    fn identifier(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        ident
    }

    fn number(&mut self) -> Result<ConfigValue> {
        let mut literal = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                literal.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if let Ok(i) = literal.parse::<i64>() {
            return Ok(ConfigValue::Int(i));
        }
        literal
            .parse::<f64>()
            .map(ConfigValue::Float)
            .map_err(|_| self.error("bad number"))
    }

    fn string(&mut self) -> Result<String> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    _ => return Err(self.error("bad escape")),
                },
                Some(c @ ('$' | '%')) if self.peek() == Some(c) && self.peek_at(1) == Some('{') => {
                    self.pos += 1;
                    out.push(c);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn list(&mut self) -> Result<ConfigValue> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.pos += 1;
                return Ok(ConfigValue::List(items));
            }
            if !items.is_empty() {
                self.expect(',')?;
                self.skip_ws();
            }
            items.push(self.value()?);
        }
    }

    fn map(&mut self) -> Result<ConfigValue> {
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(ConfigValue::Map(entries));
            }
            if !entries.is_empty() {
                self.expect(',')?;
                self.skip_ws();
            }
            let key = match self.peek() {
                Some('"') => self.string()?,
                _ => self.identifier(),
            };
            if key.is_empty() {
                return Err(self.error("empty map key"));
            }
            self.expect('=')?;
            let value = self.value()?;
            entries.push((key, value));
        }
    }
}
