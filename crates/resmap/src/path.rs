//! Field paths into YAML documents.
//!
//! A path is a `/` separated list of segments (`\/` escapes a literal slash).
//! A segment of the form `[key=value]` selects the element of a sequence whose
//! `key` field has the scalar value `value`; every other segment names a field
//! of a mapping.

use std::fmt;

use serde_yaml::{Mapping, Value};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path segment '{segment}' in '{path}'")]
    InvalidSegment { path: String, segment: String },
    #[error("cannot apply '{segment}' to a {found} node (expected a {expected})")]
    WrongKind { segment: String, expected: &'static str, found: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Match { key: String, value: String },
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self { Self::Field(name.into()) }

    pub fn matching(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Match { key: key.into(), value: value.into() }
    }

    /// The predicate value of a list-element segment (e.g. `redis` for `[name=redis]`).
    pub fn list_value(&self) -> Option<&str> {
        match self {
            Self::Match { value, .. } if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn parse(path: &str, raw: &str) -> Result<Self, PathError> {
        if let Some(inner) = raw.strip_prefix('[') {
            let invalid = || PathError::InvalidSegment { path: path.to_string(), segment: raw.to_string() };
            let inner = inner.strip_suffix(']').ok_or_else(invalid)?;
            let (key, value) = inner.split_once('=').ok_or_else(invalid)?;
            if key.is_empty() { return Err(invalid()); }
            return Ok(Self::matching(key, value));
        }
        if raw.contains('[') || raw.contains(']') {
            return Err(PathError::InvalidSegment { path: path.to_string(), segment: raw.to_string() });
        }
        Ok(Self::Field(raw.to_string()))
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(&name.replace('/', "\\/")),
            Self::Match { key, value } => write!(f, "[{}={}]", key, value),
        }
    }
}

/// Sequence of path segments, compared structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(SmallVec<[PathSegment; 8]>);

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let mut segments = SmallVec::new();
        let mut cur = String::new();
        let mut chars = path.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'/') => {
                    cur.push('/');
                    chars.next();
                }
                '/' => {
                    if !cur.is_empty() { segments.push(PathSegment::parse(path, &cur)?); }
                    cur.clear();
                }
                c => cur.push(c),
            }
        }
        if !cur.is_empty() { segments.push(PathSegment::parse(path, &cur)?); }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut next = self.clone();
        next.0.push(segment);
        next
    }

    /// Values of every list-element predicate, in path order.
    pub fn list_values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(PathSegment::list_value)
    }
}

impl FromIterator<PathSegment> for FieldPath {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self { Self(iter.into_iter().collect()) }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in self.0.iter() {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

/// Kind of node to leave at the end of a created path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Mapping,
}

pub(crate) fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) | Value::Number(_) | Value::String(_) => "scalar",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

/// Renders a scalar node the way it would be compared against a predicate value.
pub fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn element_matches(item: &Value, key: &str, value: &str) -> bool {
    item.as_mapping()
        .and_then(|m| m.get(key))
        .and_then(scalar_string)
        .map(|s| s == value)
        .unwrap_or(false)
}

fn wrong_kind(seg: &PathSegment, expected: &'static str, found: &Value) -> PathError {
    PathError::WrongKind { segment: seg.to_string(), expected, found: kind_name(found) }
}

/// Navigates to `path` without modifying anything. A missing field or list element is
/// `Ok(None)`; a segment applied to the wrong kind of node is an error.
pub fn lookup<'a>(node: &'a Value, path: &FieldPath) -> Result<Option<&'a Value>, PathError> {
    let mut cur = node;
    for seg in path.segments() {
        let next = match (seg, cur) {
            (_, Value::Null) => None,
            (PathSegment::Field(name), Value::Mapping(m)) => m.get(name.as_str()),
            (PathSegment::Match { key, value }, Value::Sequence(items)) => items.iter().find(|it| element_matches(it, key, value)),
            (PathSegment::Field(_), other) => return Err(wrong_kind(seg, "mapping", other)),
            (PathSegment::Match { .. }, other) => return Err(wrong_kind(seg, "sequence", other)),
        };
        match next {
            Some(v) => cur = v,
            None => return Ok(None),
        }
    }
    Ok(Some(cur))
}

fn step_mut<'a>(cur: &'a mut Value, seg: &PathSegment) -> Result<&'a mut Value, PathError> {
    match seg {
        PathSegment::Field(name) => {
            if cur.is_null() { *cur = Value::Mapping(Mapping::new()); }
            match cur {
                Value::Mapping(m) => Ok(m.entry(Value::String(name.clone())).or_insert(Value::Null)),
                other => Err(wrong_kind(seg, "mapping", other)),
            }
        }
        PathSegment::Match { key, value } => {
            if cur.is_null() { *cur = Value::Sequence(Vec::new()); }
            match cur {
                Value::Sequence(items) => {
                    let idx = match items.iter().position(|it| element_matches(it, key, value)) {
                        Some(i) => i,
                        None => {
                            let mut m = Mapping::new();
                            m.insert(Value::String(key.clone()), Value::String(value.clone()));
                            items.push(Value::Mapping(m));
                            items.len() - 1
                        }
                    };
                    Ok(&mut items[idx])
                }
                other => Err(wrong_kind(seg, "sequence", other)),
            }
        }
    }
}

/// Navigates to `path`, creating missing mappings and list elements along the way.
pub fn ensure<'a>(node: &'a mut Value, path: &FieldPath, leaf: NodeKind) -> Result<&'a mut Value, PathError> {
    let mut cur = node;
    for seg in path.segments() {
        cur = step_mut(cur, seg)?;
    }
    if leaf == NodeKind::Mapping && cur.is_null() {
        *cur = Value::Mapping(Mapping::new());
    }
    Ok(cur)
}

/// Sets the value at `path`, creating the path if necessary.
pub fn set(node: &mut Value, path: &FieldPath, value: Value) -> Result<(), PathError> {
    *ensure(node, path, NodeKind::Scalar)? = value;
    Ok(())
}
