//! Permissive literal grammar for model output that is almost, but not quite, JSON.
//!
//! Accepts the literal subset of Python expression syntax, which is what
//! generative models tend to emit when asked for "a dictionary":
//!
//! - single-, double- and triple-quoted strings, with `r`/`u`/`b` prefixes
//! - adjacent string literals, concatenated (`'a' "b"` is `"ab"`)
//! - integers (decimal, `0x`, `0o`, `0b`, `_` separators) and floats
//! - `True`, `False`, `None`
//! - lists, tuples, sets and dicts, each tolerating a trailing comma
//! - `#` comments and backslash line continuations between tokens
//!
//! The result is lowered to a [`serde_json::Value`]. Dict keys are rendered to
//! strings; duplicate keys keep their first position and their last value.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Nesting bound; deeper input is rejected rather than recursed into.
const MAX_DEPTH: usize = 64;

/// Failure to read the input as a literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("literal parse error at offset {offset}: {message}")]
pub struct LiteralError {
    /// Character offset into the source.
    pub offset: usize,
    pub message: String,
}

/// Parse `source` as a single literal expression spanning the whole input.
pub fn parse_literal(source: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser::new(source);
    let literal = parser.parse_value(0)?;
    parser.skip_trivia();
    if !parser.at_end() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(literal.into_value())
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    /// Normalized decimal text; may exceed 64 bits.
    Int(String),
    Float(f64),
    Bool(bool),
    None,
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    fn is_hashable(&self) -> bool {
        match self {
            Literal::List(_) | Literal::Set(_) | Literal::Dict(_) => false,
            Literal::Tuple(items) => items.iter().all(Literal::is_hashable),
            _ => true,
        }
    }

    /// Render as a mapping key, following how the value would print.
    fn key_text(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    fn repr(&self) -> String {
        match self {
            Literal::Str(s) => format!("'{s}'"),
            Literal::Int(text) => text.clone(),
            Literal::Float(f) => float_text(*f),
            Literal::Bool(true) => "True".into(),
            Literal::Bool(false) => "False".into(),
            Literal::None => "None".into(),
            Literal::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Literal::Tuple(items) => format!("({})", join_repr(items)),
            Literal::List(items) => format!("[{}]", join_repr(items)),
            Literal::Set(items) => format!("{{{}}}", join_repr(items)),
            Literal::Dict(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        }
    }

    fn into_value(self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s),
            Literal::Int(text) => {
                if let Ok(n) = text.parse::<i64>() {
                    Value::Number(n.into())
                } else if let Ok(n) = text.parse::<u64>() {
                    Value::Number(n.into())
                } else {
                    Value::String(text)
                }
            }
            Literal::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(float_text(f))),
            Literal::Bool(b) => Value::Bool(b),
            Literal::None => Value::Null,
            Literal::List(items) | Literal::Tuple(items) | Literal::Set(items) => {
                Value::Array(items.into_iter().map(Literal::into_value).collect())
            }
            Literal::Dict(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.key_text(), value.into_value());
                }
                Value::Object(map)
            }
        }
    }
}

fn join_repr(items: &[Literal]) -> String {
    items.iter().map(Literal::repr).collect::<Vec<_>>().join(", ")
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.into(),
        }
    }

    /// Skip whitespace, comments and line continuations.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => self.pos += 1,
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some('\\') if self.peek_at(1) == Some('\n') => self.pos += 2,
                _ => break,
            }
        }
    }

    /// Consume `ch` after trivia if it is next.
    fn eat(&mut self, ch: char) -> bool {
        self.skip_trivia();
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), LiteralError> {
        if self.eat(ch) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.error(format!("expected '{ch}', found '{found}'"))),
                None => Err(self.error(format!("expected '{ch}', found end of input"))),
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_trivia();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some('{') => self.parse_brace(depth),
            Some('[') => self.parse_list(depth),
            Some('(') => self.parse_paren(depth),
            Some('\'' | '"') => self.parse_strings(),
            Some(c) if c.is_ascii_digit() || matches!(c, '.' | '-' | '+') => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                if self.string_prefix_len().is_some() {
                    self.parse_strings()
                } else {
                    self.parse_name()
                }
            }
            Some(c) => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    /// `{}` is an empty dict; `{k: v, ...}` a dict; `{a, b}` a set.
    fn parse_brace(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.pos += 1;
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }

        let first = self.parse_value(depth + 1)?;
        if !first.is_hashable() {
            return Err(self.error("unhashable key"));
        }

        if self.eat(':') {
            let value = self.parse_value(depth + 1)?;
            let mut entries = vec![(first, value)];
            loop {
                if self.eat('}') {
                    break;
                }
                self.expect(',')?;
                if self.eat('}') {
                    break;
                }
                let key = self.parse_value(depth + 1)?;
                if !key.is_hashable() {
                    return Err(self.error("unhashable key"));
                }
                self.expect(':')?;
                let value = self.parse_value(depth + 1)?;
                entries.push((key, value));
            }
            return Ok(Literal::Dict(entries));
        }

        let mut items = vec![first];
        loop {
            if self.eat('}') {
                break;
            }
            self.expect(',')?;
            if self.eat('}') {
                break;
            }
            let item = self.parse_value(depth + 1)?;
            if !item.is_hashable() {
                return Err(self.error("unhashable set element"));
            }
            items.push(item);
        }
        Ok(Literal::Set(items))
    }

    fn parse_list(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            if self.eat(']') {
                break;
            }
            items.push(self.parse_value(depth + 1)?);
            if self.eat(']') {
                break;
            }
            self.expect(',')?;
        }
        Ok(Literal::List(items))
    }

    /// `()` is an empty tuple, `(x)` is just `x`, `(x,)` a one-tuple.
    fn parse_paren(&mut self, depth: usize) -> Result<Literal, LiteralError> {
        self.pos += 1;
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.parse_value(depth + 1)?;
        if self.eat(')') {
            return Ok(first);
        }
        self.expect(',')?;

        let mut items = vec![first];
        loop {
            if self.eat(')') {
                break;
            }
            items.push(self.parse_value(depth + 1)?);
            if self.eat(')') {
                break;
            }
            self.expect(',')?;
        }
        Ok(Literal::Tuple(items))
    }

    /// Length of a string prefix (`r`, `u`, `b`, `rb`, `br`) at the cursor,
    /// if it is immediately followed by a quote.
    fn string_prefix_len(&self) -> Option<usize> {
        let is_prefix = |c: Option<char>| matches!(c, Some('r' | 'R' | 'u' | 'U' | 'b' | 'B'));
        let is_quote = |c: Option<char>| matches!(c, Some('\'' | '"'));

        if is_prefix(self.peek()) && is_quote(self.peek_at(1)) {
            return Some(1);
        }
        let pair = (
            self.peek().map(|c| c.to_ascii_lowercase()),
            self.peek_at(1).map(|c| c.to_ascii_lowercase()),
        );
        if matches!(pair, (Some('r'), Some('b')) | (Some('b'), Some('r')))
            && is_quote(self.peek_at(2))
        {
            return Some(2);
        }
        None
    }

    /// One or more adjacent string literals, concatenated.
    fn parse_strings(&mut self) -> Result<Literal, LiteralError> {
        let mut out = self.parse_one_string()?;
        loop {
            self.skip_trivia();
            let next_is_string = matches!(self.peek(), Some('\'' | '"'))
                || self.string_prefix_len().is_some();
            if !next_is_string {
                break;
            }
            out.push_str(&self.parse_one_string()?);
        }
        Ok(Literal::Str(out))
    }

    fn parse_one_string(&mut self) -> Result<String, LiteralError> {
        let prefix_len = self.string_prefix_len().unwrap_or(0);
        let raw = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .any(|c| matches!(c, 'r' | 'R'));
        self.pos += prefix_len;

        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quote")),
        };
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("unterminated string"));
            };

            if c == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(out);
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    self.pos += 3;
                    return Ok(out);
                }
                out.push(c);
                self.pos += 1;
                continue;
            }

            if c == '\n' && !triple {
                return Err(self.error("newline in single-quoted string"));
            }

            if c == '\\' {
                let Some(next) = self.peek_at(1) else {
                    return Err(self.error("unterminated string"));
                };
                self.pos += 2;
                if raw {
                    out.push('\\');
                    out.push(next);
                    continue;
                }
                self.unescape(next, &mut out)?;
                continue;
            }

            out.push(c);
            self.pos += 1;
        }
    }

    /// Decode the escape whose introducer char is `next` (already consumed).
    fn unescape(&mut self, next: char, out: &mut String) -> Result<(), LiteralError> {
        match next {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(next),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            self.pos += 1;
                        }
                        None => break,
                    }
                }
                out.push(self.char_from(value)?);
            }
            'x' => {
                let value = self.read_hex(2)?;
                out.push(self.char_from(value)?);
            }
            'u' => {
                let value = self.read_hex(4)?;
                out.push(self.char_from(value)?);
            }
            'U' => {
                let value = self.read_hex(8)?;
                out.push(self.char_from(value)?);
            }
            other => {
                // Unknown escapes are kept verbatim.
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn read_hex(&mut self, digits: usize) -> Result<u32, LiteralError> {
        let mut value = 0u32;
        for _ in 0..digits {
            let d = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("truncated hex escape"))?;
            value = value.wrapping_mul(16).wrapping_add(d);
            self.pos += 1;
        }
        Ok(value)
    }

    fn char_from(&self, value: u32) -> Result<char, LiteralError> {
        char::from_u32(value).ok_or_else(|| self.error(format!("invalid code point {value:#x}")))
    }

    fn parse_number(&mut self) -> Result<Literal, LiteralError> {
        let mut negative = false;
        while let Some(sign @ ('-' | '+')) = self.peek() {
            if sign == '-' {
                negative = !negative;
            }
            self.pos += 1;
            self.skip_trivia();
        }

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('o' | 'O')) => Some(8),
            (Some('0'), Some('b' | 'B')) => Some(2),
            _ => None,
        };

        if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
            let value = i128::from_str_radix(&cleaned, radix)
                .map_err(|_| self.error(format!("invalid base-{radix} literal")))?;
            let value = if negative { -value } else { value };
            return Ok(Literal::Int(value.to_string()));
        }

        let start = self.pos;
        let mut is_float = false;
        self.take_while(|c| c.is_ascii_digit() || c == '_');
        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            self.take_while(|c| c.is_ascii_digit() || c == '_');
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('j' | 'J')) {
            return Err(self.error("complex literals are not supported"));
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        if !text.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.error("expected a number"));
        }

        if is_float {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("invalid float '{text}'")))?;
            return Ok(Literal::Float(if negative { -value } else { value }));
        }

        if text.len() > 1 && text.starts_with('0') && text.chars().any(|c| c != '0') {
            return Err(self.error("leading zeros in decimal integer"));
        }
        let normalized = match text.parse::<i128>() {
            Ok(value) => (if negative { -value } else { value }).to_string(),
            Err(_) if negative => format!("-{text}"),
            Err(_) => text,
        };
        Ok(Literal::Int(normalized))
    }

    fn parse_name(&mut self) -> Result<Literal, LiteralError> {
        let start = self.pos;
        let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
        match name.as_str() {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            other => Err(LiteralError {
                offset: start,
                message: format!("unknown name '{other}'"),
            }),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}
