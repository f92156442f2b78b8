//! Native values and their transformations.
//!
//! [`Var`] is what users read from and write to the remote model. Its
//! literal form (see [`Var::to_literal`]) is what the journal writes, and
//! [`Var::from_literal`] reads it back.

use std::fmt;

use linked_hash_map::LinkedHashMap;

use crate::error::{Error, Result};
use crate::Float;

/// Ordered map of named values, used for struct states and named
/// command arguments.
pub type VarMap = LinkedHashMap<String, Var>;

const BOOL_VAR_TYPE_NAME: &str = "bool";
const NUMBER_VAR_TYPE_NAME: &str = "number";
const STR_VAR_TYPE_NAME: &str = "str";
const LIST_VAR_TYPE_NAME: &str = "list";
const STRUCT_VAR_TYPE_NAME: &str = "struct";
const NULL_VAR_TYPE_NAME: &str = "null";

const TRUE_LITERAL: &str = "true";
const FALSE_LITERAL: &str = "false";
const NULL_LITERAL: &str = "null";

/// Defines all possible types of values.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum VarType {
    Bool,
    Number,
    String,
    List,
    Struct,
    Null,
}

impl VarType {
    /// Returns string literal name of the `VarType`.
    pub fn to_str(&self) -> &str {
        match self {
            VarType::Bool => BOOL_VAR_TYPE_NAME,
            VarType::Number => NUMBER_VAR_TYPE_NAME,
            VarType::String => STR_VAR_TYPE_NAME,
            VarType::List => LIST_VAR_TYPE_NAME,
            VarType::Struct => STRUCT_VAR_TYPE_NAME,
            VarType::Null => NULL_VAR_TYPE_NAME,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        write!(formatter, "{}", self.to_str())
    }
}

/// Abstraction over all values the remote model can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Var {
    Bool(bool),
    Number(Float),
    String(String),
    List(Vec<Var>),
    Struct(VarMap),
    /// Explicit "no value", distinct from a value that's missing
    Null,
}

impl Var {
    pub fn get_type(&self) -> VarType {
        match self {
            Var::Bool(_) => VarType::Bool,
            Var::Number(_) => VarType::Number,
            Var::String(_) => VarType::String,
            Var::List(_) => VarType::List,
            Var::Struct(_) => VarType::Struct,
            Var::Null => VarType::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Var::Null => true,
            _ => false,
        }
    }

    pub fn is_struct(&self) -> bool {
        match self {
            Var::Struct(_) => true,
            _ => false,
        }
    }

    /// Struct built from `(name, value)` pairs, keeping their order.
    pub fn structure<K: Into<String>>(fields: Vec<(K, Var)>) -> Var {
        Var::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Type-strict `as_type` getters.
impl Var {
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Var::Bool(v) => Ok(*v),
            _ => Err(self.unexpected(VarType::Bool)),
        }
    }

    pub fn as_number(&self) -> Result<Float> {
        match self {
            Var::Number(v) => Ok(*v),
            _ => Err(self.unexpected(VarType::Number)),
        }
    }

    /// Number that holds an integral value.
    pub fn as_int(&self) -> Result<i64> {
        let n = self.as_number()?;
        if n.fract() == 0.0 && n.is_finite() {
            Ok(n as i64)
        } else {
            Err(Error::InvalidVariant(format!("expected integral number, got {}", n)))
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Var::String(v) => Ok(v),
            _ => Err(self.unexpected(VarType::String)),
        }
    }

    pub fn as_list(&self) -> Result<&Vec<Var>> {
        match self {
            Var::List(v) => Ok(v),
            _ => Err(self.unexpected(VarType::List)),
        }
    }

    pub fn as_struct(&self) -> Result<&VarMap> {
        match self {
            Var::Struct(v) => Ok(v),
            _ => Err(self.unexpected(VarType::Struct)),
        }
    }

    pub fn as_struct_mut(&mut self) -> Result<&mut VarMap> {
        match self {
            Var::Struct(v) => Ok(v),
            _ => Err(self.unexpected(VarType::Struct)),
        }
    }

    /// List of strings, as returned for child and member name queries.
    pub fn to_str_list(&self) -> Result<Vec<String>> {
        match self {
            // servers report an empty name list as null
            Var::Null => Ok(Vec::new()),
            _ => self
                .as_list()?
                .iter()
                .map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
        }
    }

    fn unexpected(&self, expected: VarType) -> Error {
        Error::InvalidVariant(format!("expected {}, got {}", expected, self.get_type()))
    }
}

impl From<bool> for Var {
    fn from(v: bool) -> Self {
        Var::Bool(v)
    }
}

impl From<Float> for Var {
    fn from(v: Float) -> Self {
        Var::Number(v)
    }
}

impl From<i32> for Var {
    fn from(v: i32) -> Self {
        Var::Number(v as Float)
    }
}

impl From<i64> for Var {
    fn from(v: i64) -> Self {
        Var::Number(v as Float)
    }
}

impl From<u32> for Var {
    fn from(v: u32) -> Self {
        Var::Number(v as Float)
    }
}

impl From<&str> for Var {
    fn from(v: &str) -> Self {
        Var::String(v.to_string())
    }
}

impl From<String> for Var {
    fn from(v: String) -> Self {
        Var::String(v)
    }
}

impl<T: Into<Var>> From<Vec<T>> for Var {
    fn from(v: Vec<T>) -> Self {
        Var::List(v.into_iter().map(|e| e.into()).collect())
    }
}

impl From<VarMap> for Var {
    fn from(v: VarMap) -> Self {
        Var::Struct(v)
    }
}

impl<T: Into<Var>> From<Option<T>> for Var {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Var::Null,
        }
    }
}

impl Var {
    /// Renders the value in journal literal form, e.g.
    /// `{'name': 'inlet', 'velocity': [1, 0.5], 'enabled': true}`.
    pub fn to_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }

    fn write_literal(&self, out: &mut String) {
        match self {
            Var::Bool(true) => out.push_str(TRUE_LITERAL),
            Var::Bool(false) => out.push_str(FALSE_LITERAL),
            Var::Number(n) => out.push_str(&n.to_string()),
            Var::String(s) => write_quoted(s, out),
            Var::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_literal(out);
                }
                out.push(']');
            }
            Var::Struct(fields) => {
                out.push('{');
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_quoted(k, out);
                    out.push_str(": ");
                    v.write_literal(out);
                }
                out.push('}');
            }
            Var::Null => out.push_str(NULL_LITERAL),
        }
    }

    /// Reads a value back from its literal form.
    pub fn from_literal(input: &str) -> Result<Var> {
        let mut reader = LiteralReader::new(input);
        let var = reader.read_var()?;
        reader.skip_whitespace();
        if !reader.is_done() {
            return Err(reader.error("trailing characters after literal"));
        }
        Ok(var)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_literal())
    }
}

/// Writes `s` in single quotes, escaping quotes, backslashes and control
/// characters.
pub(crate) fn write_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('\'');
}

pub(crate) fn quoted(s: &str) -> String {
    let mut out = String::new();
    write_quoted(s, &mut out);
    out
}

/// Character-level reader for literal values and the statements built
/// around them.
pub(crate) struct LiteralReader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralReader<'a> {
    pub fn new(src: &'a str) -> Self {
        LiteralReader { src, pos: 0 }
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves back to a position previously returned by `position`.
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    /// Consumes `c` if it's next, skipping leading whitespace.
    pub fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, c: char) -> Result<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    /// Consumes the given keyword followed by whitespace.
    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.starts_with(keyword)
            && rest[keyword.len()..]
                .chars()
                .next()
                .map(|c| c.is_whitespace())
                .unwrap_or(false)
        {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    /// Reads an identifier made of alphanumerics and underscores.
    pub fn read_ident(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || (c == '-' && self.pos > start) {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos > start {
            Some(&self.src[start..self.pos])
        } else {
            None
        }
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.skip_whitespace();
        if self.bump() != Some('\'') {
            return Err(self.error("expected quoted string"));
        }
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated escape")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    pub fn read_var(&mut self) -> Result<Var> {
        self.skip_whitespace();
        match self.peek() {
            Some('\'') => Ok(Var::String(self.read_string()?)),
            Some('[') => {
                self.bump();
                let mut items = Vec::new();
                if self.eat(']') {
                    return Ok(Var::List(items));
                }
                loop {
                    items.push(self.read_var()?);
                    if self.eat(']') {
                        return Ok(Var::List(items));
                    }
                    self.expect(',')?;
                }
            }
            Some('{') => {
                self.bump();
                let mut fields = VarMap::new();
                if self.eat('}') {
                    return Ok(Var::Struct(fields));
                }
                loop {
                    let key = self.read_string()?;
                    self.expect(':')?;
                    let value = self.read_var()?;
                    fields.insert(key, value);
                    if self.eat('}') {
                        return Ok(Var::Struct(fields));
                    }
                    self.expect(',')?;
                }
            }
            Some(_) => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_alphanumeric() || c == '.' || c == '-' || c == '+' || c == '_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                let token = &self.src[start..self.pos];
                match token {
                    TRUE_LITERAL => Ok(Var::Bool(true)),
                    FALSE_LITERAL => Ok(Var::Bool(false)),
                    NULL_LITERAL => Ok(Var::Null),
                    "" => Err(self.error("expected value")),
                    _ => token
                        .parse::<Float>()
                        .map(Var::Number)
                        .map_err(|e| self.error(&format!("invalid number {}: {}", token, e))),
                }
            }
            None => Err(self.error("expected value, got end of input")),
        }
    }

    pub fn error(&self, msg: &str) -> Error {
        Error::InvalidVariant(format!("{} at column {}", msg, self.pos + 1))
    }
}
