//! Kubernetes label selector grammar, used for both labels and annotations.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::SelectorError;

static SET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._/-]*)\s+(in|notin)\s*\(([^)]*)\)$").unwrap()
});
static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals(k, v) => labels.get(k) == Some(v),
            Self::NotEquals(k, v) => labels.get(k) != Some(v),
            Self::In(k, vs) => labels.get(k).map(|l| vs.contains(l)).unwrap_or(false),
            Self::NotIn(k, vs) => labels.get(k).map(|l| !vs.contains(l)).unwrap_or(true),
            Self::Exists(k) => labels.contains_key(k),
            Self::DoesNotExist(k) => !labels.contains_key(k),
        }
    }
}

/// Conjunction of requirements; the empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut requirements = Vec::new();
        for raw in split_top_level(input) {
            let part = raw.trim();
            if part.is_empty() { continue; }
            requirements.push(parse_requirement(input, part)?);
        }
        Ok(Self { requirements })
    }

    pub fn is_empty(&self) -> bool { self.requirements.is_empty() }
    pub fn requirements(&self) -> &[Requirement] { &self.requirements }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}

// Commas inside `in (...)` value lists do not separate requirements.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    out.push(&input[start..]);
    out
}

fn parse_requirement(selector: &str, part: &str) -> Result<Requirement, SelectorError> {
    let invalid = || SelectorError::Label { selector: selector.to_string(), requirement: part.to_string() };
    let key = |k: &str| -> Result<String, SelectorError> {
        let k = k.trim();
        if KEY_RE.is_match(k) { Ok(k.to_string()) } else { Err(invalid()) }
    };

    if let Some(caps) = SET_RE.captures(part) {
        let values: Vec<String> = caps[3].split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect();
        let k = caps[1].to_string();
        return Ok(if &caps[2] == "in" { Requirement::In(k, values) } else { Requirement::NotIn(k, values) });
    }
    if let Some(k) = part.strip_prefix('!') {
        return Ok(Requirement::DoesNotExist(key(k)?));
    }
    if let Some((k, v)) = part.split_once("!=") {
        return Ok(Requirement::NotEquals(key(k)?, v.trim().to_string()));
    }
    if let Some((k, v)) = part.split_once("==") {
        return Ok(Requirement::Equals(key(k)?, v.trim().to_string()));
    }
    if let Some((k, v)) = part.split_once('=') {
        return Ok(Requirement::Equals(key(k)?, v.trim().to_string()));
    }
    Ok(Requirement::Exists(key(part)?))
}
