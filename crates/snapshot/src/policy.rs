//! Blocking and masking policies.
//!
//! A blocked element is replaced by an opaque sized box; masked text is
//! replaced character-by-character while structure survives. Both
//! policies are built once from the session options: string-vs-regex
//! dispatch happens at construction, and an unparseable selector simply
//! never matches.

use dom::{DomArena, DomNode, NodeId, SelectorList};
use regex::Regex;

/// Class matcher, selected at construction time.
#[derive(Debug, Clone)]
pub enum TextMatcher {
    Class(String),
    Pattern(Regex),
}

impl TextMatcher {
    pub fn class(name: impl Into<String>) -> Self {
        TextMatcher::Class(name.into())
    }

    pub fn pattern(regex: Regex) -> Self {
        TextMatcher::Pattern(regex)
    }

    /// True when any class token of the element matches.
    pub fn matches_element(&self, arena: &DomArena, node: &DomNode) -> bool {
        let mut tokens = arena.class_list(node.node_id);
        match self {
            TextMatcher::Class(name) => tokens.any(|t| t == name),
            TextMatcher::Pattern(regex) => tokens.any(|t| regex.is_match(t)),
        }
    }
}

/// Decides whether an element's subtree is replaced by a placeholder box.
#[derive(Debug, Clone)]
pub struct BlockPolicy {
    class: TextMatcher,
    selector: Option<SelectorList>,
}

impl BlockPolicy {
    /// Build from raw options. A selector that fails to parse is logged
    /// and treated as never matching.
    pub fn new(class: TextMatcher, selector: Option<&str>) -> Self {
        Self {
            class,
            selector: selector.and_then(|s| {
                let parsed = SelectorList::parse(s);
                if parsed.is_none() {
                    tracing::warn!(selector = s, "unparseable block selector, ignoring");
                }
                parsed
            }),
        }
    }

    pub fn is_blocked(&self, arena: &DomArena, node: &DomNode) -> bool {
        if !node.is_element() {
            return false;
        }
        if self.class.matches_element(arena, node) {
            return true;
        }
        self.selector
            .as_ref()
            .map_or(false, |s| s.matches(arena, node))
    }
}

/// Decides whether text content under an element must be masked.
/// Masking is inherited: once an ancestor is masked, descendants skip
/// the check.
#[derive(Debug, Clone)]
pub struct MaskTextPolicy {
    class: TextMatcher,
    selector: Option<SelectorList>,
}

impl MaskTextPolicy {
    pub fn new(class: TextMatcher, selector: Option<&str>) -> Self {
        Self {
            class,
            selector: selector.and_then(|s| {
                let parsed = SelectorList::parse(s);
                if parsed.is_none() {
                    tracing::warn!(selector = s, "unparseable mask selector, ignoring");
                }
                parsed
            }),
        }
    }

    /// Whether the node needs masking. With `check_ancestors` the whole
    /// parent chain is consulted, which initializes the verdict for a
    /// subtree root; children inherit the verdict and re-check only
    /// themselves.
    pub fn needs_mask(&self, arena: &DomArena, node: NodeId, check_ancestors: bool) -> bool {
        let Ok(n) = arena.get(node) else {
            return false;
        };
        let el = if n.is_element() {
            n
        } else {
            match arena.parent_element(node) {
                Some(parent) => parent,
                None => return false,
            }
        };

        if check_ancestors {
            let mut current = Some(el);
            while let Some(e) = current {
                if self.class.matches_element(arena, e) {
                    return true;
                }
                current = arena.parent_element(e.node_id);
            }
            if let Some(selector) = &self.selector {
                if selector.closest(arena, el).is_some() {
                    return true;
                }
            }
        } else {
            if self.class.matches_element(arena, el) {
                return true;
            }
            if let Some(selector) = &self.selector {
                if selector.matches(arena, el) {
                    return true;
                }
            }
        }
        false
    }
}

/// Default masking transform: every non-whitespace character becomes `*`.
pub fn mask_text_value(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { c } else { '*' })
        .collect()
}

/// Per-input-type masking flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskInputOptions {
    pub color: bool,
    pub date: bool,
    pub datetime_local: bool,
    pub email: bool,
    pub month: bool,
    pub number: bool,
    pub range: bool,
    pub search: bool,
    pub tel: bool,
    pub text: bool,
    pub time: bool,
    pub url: bool,
    pub week: bool,
    pub textarea: bool,
    pub select: bool,
    pub password: bool,
}

impl MaskInputOptions {
    /// Every input kind masked.
    pub fn all() -> Self {
        Self {
            color: true,
            date: true,
            datetime_local: true,
            email: true,
            month: true,
            number: true,
            range: true,
            search: true,
            tel: true,
            text: true,
            time: true,
            url: true,
            week: true,
            textarea: true,
            select: true,
            password: true,
        }
    }

    /// Only passwords masked.
    pub fn password_only() -> Self {
        Self {
            password: true,
            ..Self::default()
        }
    }

    fn flag(&self, key: &str) -> bool {
        match key {
            "color" => self.color,
            "date" => self.date,
            "datetime-local" => self.datetime_local,
            "email" => self.email,
            "month" => self.month,
            "number" => self.number,
            "range" => self.range,
            "search" => self.search,
            "tel" => self.tel,
            "text" => self.text,
            "time" => self.time,
            "url" => self.url,
            "week" => self.week,
            "textarea" => self.textarea,
            "select" => self.select,
            "password" => self.password,
            _ => false,
        }
    }
}

/// Closure replacing a masked input value; receives the raw value and the
/// live element.
pub type MaskInputFn = Box<dyn Fn(&str, &DomNode) -> String + Send + Sync>;

/// Mask a form value according to the element's tag and type flags.
pub fn mask_input_value(
    options: &MaskInputOptions,
    tag: &str,
    input_type: Option<&str>,
    value: &str,
    mask_input_fn: Option<&MaskInputFn>,
    node: &DomNode,
) -> String {
    let masked = options.flag(tag)
        || input_type.map_or(false, |t| options.flag(&t.to_lowercase()));
    if !masked {
        return value.to_string();
    }
    match mask_input_fn {
        Some(f) => f(value, node),
        None => "*".repeat(value.chars().count()),
    }
}
