//! Common interface for referencing remote model nodes.
//!
//! An [`Address`] is an ordered list of [`Segment`]s. Names are kept in
//! their local form, where anything colliding with a reserved word carries
//! a trailing [`ESCAPE_SUFFIX`]. The wire form strips that suffix again.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Separates segments of the wire path.
pub const SEPARATOR_SYMBOL: &str = "/";
/// Separates segment name and instance name on the wire.
pub const INSTANCE_SYMBOL: &str = ":";
/// Appended to local names that collide with a reserved word.
pub const ESCAPE_SUFFIX: char = '_';

/// Words that can't be used as bare names in journal statements.
pub static RESERVED_WORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "false", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "nonlocal", "not", "null", "or", "pass", "raise", "return", "true", "try", "while",
    "with", "yield",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Local form of a wire name, e.g. `import` becomes `import_`.
pub fn escape(name: &str) -> String {
    if is_reserved(name) {
        format!("{}{}", name, ESCAPE_SUFFIX)
    } else {
        name.to_string()
    }
}

/// Wire form of a local name. Strips exactly one trailing suffix, and only
/// if what remains is a reserved word: `import_` becomes `import`, while
/// `import__` and `value_` are left alone.
pub fn unescape(name: &str) -> &str {
    match name.strip_suffix(ESCAPE_SUFFIX) {
        Some(stripped) if is_reserved(stripped) => stripped,
        _ => name,
    }
}

/// Single step in the model hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Local name of the node
    pub name: String,
    /// Instance name, only set when pointing at a container member
    pub instance: Option<String>,
}

impl Segment {
    pub fn new(name: &str) -> Self {
        Segment {
            name: name.to_string(),
            instance: None,
        }
    }

    pub fn with_instance(name: &str, instance: &str) -> Self {
        Segment {
            name: name.to_string(),
            instance: Some(instance.to_string()),
        }
    }

    fn to_wire(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}{}{}", unescape(&self.name), INSTANCE_SYMBOL, instance),
            None => unescape(&self.name).to_string(),
        }
    }
}

/// Unique reference to a node of the remote model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    segments: Vec<Segment>,
}

impl Address {
    /// Address of the model root.
    pub fn root() -> Self {
        Address::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Address { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Address of a child node.
    pub fn child(&self, name: &str) -> Address {
        let mut segments = self.segments.clone();
        segments.push(Segment::new(name));
        Address { segments }
    }

    /// Address of a container member. The last segment gets the instance
    /// name, replacing any instance it already had.
    pub fn member(&self, instance: &str) -> Address {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.instance = Some(instance.to_string());
        }
        Address { segments }
    }

    /// Same address with the instance name of the last segment removed.
    pub fn container(&self) -> Address {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.instance = None;
        }
        Address { segments }
    }

    /// Parent address, `None` for the root.
    pub fn parent(&self) -> Option<Address> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Address {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Encodes the address as a wire path, e.g.
    /// `/setup/boundary_conditions/velocity_inlet:cold-inlet/momentum`.
    pub fn to_wire_path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push_str(SEPARATOR_SYMBOL);
            path.push_str(&segment.to_wire());
        }
        path
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "{}", SEPARATOR_SYMBOL)
        } else {
            write!(f, "{}", self.to_wire_path())
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parses a wire path. Names are brought back into their local
    /// (escaped) form.
    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == SEPARATOR_SYMBOL {
            return Ok(Address::root());
        }
        if !trimmed.starts_with(SEPARATOR_SYMBOL) {
            return Err(Error::InvalidAddress(input.to_string()));
        }
        let mut segments = Vec::new();
        for part in trimmed[1..].split(SEPARATOR_SYMBOL) {
            let mut split = part.splitn(2, INSTANCE_SYMBOL);
            let name = split.next().unwrap_or("");
            if name.is_empty() {
                return Err(Error::InvalidAddress(input.to_string()));
            }
            segments.push(Segment {
                name: escape(name),
                instance: split.next().map(|s| s.to_string()),
            });
        }
        Ok(Address { segments })
    }
}
