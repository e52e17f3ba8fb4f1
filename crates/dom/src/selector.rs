//! A small CSS selector matcher for recorder-supplied policy hooks.
//!
//! Supports comma-separated compound selectors built from tag names,
//! `#id`, `.class`, `*`, and attribute tests (`[a]`, `[a=v]`, `[a~=v]`,
//! `[a^=v]`, `[a$=v]`, `[a*=v]`). Combinators and pseudo-classes are out
//! of scope; `parse` returns `None` for anything it does not understand
//! and callers treat that as a selector that never matches.

use crate::arena::DomArena;
use crate::types::DomNode;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attr {
        name: String,
        op: Option<AttrOp>,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    parts: Vec<Part>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Compound>,
}

impl SelectorList {
    /// Parse a selector list; `None` when any selector is unsupported.
    pub fn parse(input: &str) -> Option<Self> {
        let mut selectors = Vec::new();
        for raw in input.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            selectors.push(parse_compound(raw)?);
        }
        if selectors.is_empty() {
            return None;
        }
        Some(Self { selectors })
    }

    /// Whether the element matches any selector in the list.
    pub fn matches(&self, arena: &DomArena, node: &DomNode) -> bool {
        if !node.is_element() {
            return false;
        }
        self.selectors
            .iter()
            .any(|compound| matches_compound(compound, arena, node))
    }

    /// The element itself or its nearest ancestor element matching the
    /// list, walking the parent chain like `Element::closest`.
    pub fn closest<'a>(&self, arena: &'a DomArena, node: &'a DomNode) -> Option<&'a DomNode> {
        if self.matches(arena, node) {
            return Some(node);
        }
        let mut current = arena.parent_element(node.node_id);
        while let Some(el) = current {
            if self.matches(arena, el) {
                return Some(el);
            }
            current = arena.parent_element(el.node_id);
        }
        None
    }
}

fn matches_compound(compound: &Compound, arena: &DomArena, node: &DomNode) -> bool {
    compound.parts.iter().all(|part| match part {
        Part::Universal => true,
        Part::Tag(tag) => node.tag().as_deref() == Some(tag.as_str()),
        Part::Id(id) => node.attr("id") == Some(id.as_str()),
        Part::Class(class) => arena.class_list(node.node_id).any(|c| c == class),
        Part::Attr { name, op, value } => {
            let Some(actual) = node.attr(name) else {
                return false;
            };
            match op {
                None => true,
                Some(AttrOp::Equals) => actual == value,
                Some(AttrOp::Includes) => actual.split_whitespace().any(|t| t == value),
                Some(AttrOp::Prefix) => actual.starts_with(value.as_str()),
                Some(AttrOp::Suffix) => actual.ends_with(value.as_str()),
                Some(AttrOp::Substring) => actual.contains(value.as_str()),
            }
        }
    })
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(input: &str) -> Option<Compound> {
    let chars: Vec<char> = input.chars().collect();
    let mut parts = Vec::new();
    let mut pos = 0;

    let scan_name = |pos: &mut usize| -> String {
        let start = *pos;
        while *pos < chars.len() && is_name_char(chars[*pos]) {
            *pos += 1;
        }
        chars[start..*pos].iter().collect()
    };

    while pos < chars.len() {
        match chars[pos] {
            '*' => {
                pos += 1;
                parts.push(Part::Universal);
            }
            '#' => {
                pos += 1;
                let name = scan_name(&mut pos);
                if name.is_empty() {
                    return None;
                }
                parts.push(Part::Id(name));
            }
            '.' => {
                pos += 1;
                let name = scan_name(&mut pos);
                if name.is_empty() {
                    return None;
                }
                parts.push(Part::Class(name));
            }
            '[' => {
                pos += 1;
                let name = scan_name(&mut pos).to_lowercase();
                if name.is_empty() {
                    return None;
                }
                let op = match chars.get(pos) {
                    Some(']') => None,
                    Some('=') => Some(AttrOp::Equals),
                    Some('~') => Some(AttrOp::Includes),
                    Some('^') => Some(AttrOp::Prefix),
                    Some('$') => Some(AttrOp::Suffix),
                    Some('*') => Some(AttrOp::Substring),
                    _ => return None,
                };
                let mut value = String::new();
                if let Some(op) = &op {
                    if *op != AttrOp::Equals {
                        pos += 1;
                        if chars.get(pos) != Some(&'=') {
                            return None;
                        }
                    }
                    pos += 1; // past '='
                    let quote = match chars.get(pos) {
                        Some(&q) if q == '"' || q == '\'' => {
                            pos += 1;
                            Some(q)
                        }
                        _ => None,
                    };
                    while pos < chars.len() {
                        let c = chars[pos];
                        match quote {
                            Some(q) if c == q => break,
                            None if c == ']' => break,
                            _ => {
                                value.push(c);
                                pos += 1;
                            }
                        }
                    }
                    if quote.is_some() {
                        pos += 1; // past closing quote
                    }
                }
                if chars.get(pos) != Some(&']') {
                    return None;
                }
                pos += 1;
                parts.push(Part::Attr { name, op, value });
            }
            c if is_name_char(c) => {
                let name = scan_name(&mut pos).to_lowercase();
                parts.push(Part::Tag(name));
            }
            // Combinators and pseudo-classes are unsupported.
            _ => return None,
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(Compound { parts })
}
