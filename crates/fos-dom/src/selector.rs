//! Element selectors
//!
//! Compound simple selectors for querySelector/closest/matches:
//! `tag`, `*`, `#id`, `.class`, `[attr]` and `[attr="value"]`, combined
//! without whitespace (`zone[name="header"]`). Combinators are not supported.

use crate::{DomError, DomResult, ElementData};

/// Attribute condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    /// `None` matches presence only
    pub value: Option<String>,
}

/// Compound selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// Tag name, `None` for `*` or when omitted
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
}

impl Selector {
    /// Parse a compound selector string
    pub fn parse(input: &str) -> DomResult<Self> {
        let s = input.trim();
        let invalid = || DomError::InvalidSelector(input.to_string());
        if s.is_empty() || s.contains(char::is_whitespace) && !s.contains('[') {
            return Err(invalid());
        }

        let mut selector = Selector::default();
        let mut rest = s;

        let tag_len = rest.find(['#', '.', '[']).unwrap_or(rest.len());
        let tag = &rest[..tag_len];
        if !tag.is_empty() && tag != "*" {
            if !tag.chars().all(is_ident_char) {
                return Err(invalid());
            }
            selector.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_len..];

        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let body = &rest[1..];
                    let len = body.find(['#', '.', '[']).unwrap_or(body.len());
                    let ident = &body[..len];
                    if ident.is_empty() || !ident.chars().all(is_ident_char) {
                        return Err(invalid());
                    }
                    if first == '#' {
                        selector.id = Some(ident.to_string());
                    } else {
                        selector.classes.push(ident.to_string());
                    }
                    rest = &body[len..];
                }
                '[' => {
                    let end = closing_bracket(rest).ok_or_else(invalid)?;
                    selector.attrs.push(parse_attr(&rest[1..end]).ok_or_else(invalid)?);
                    rest = &rest[end + 1..];
                }
                _ => return Err(invalid()),
            }
        }

        Ok(selector)
    }

    /// Selector matching a single attribute value, `[name="value"]`
    pub fn attribute(name: &str, value: &str) -> Self {
        Self {
            attrs: vec![AttrSelector { name: name.to_string(), value: Some(value.to_string()) }],
            ..Self::default()
        }
    }

    /// Check whether an element matches
    pub fn matches(&self, element: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.classes().any(|c| c == class)) {
            return false;
        }
        self.attrs.iter().all(|attr| match (&attr.value, element.get_attr(&attr.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

fn parse_attr(body: &str) -> Option<AttrSelector> {
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"').and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name.trim(), Some(unquoted.to_string()))
        }
        None => (body.trim(), None),
    };
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    Some(AttrSelector { name: name.to_string(), value })
}

/// Byte offset of the `]` closing the attribute condition at the start of
/// `rest`, skipping brackets inside quoted values
fn closing_bracket(rest: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in rest.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
