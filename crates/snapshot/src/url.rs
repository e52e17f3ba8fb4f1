//! URL absolutization for attributes, srcset lists, and CSS `url(...)`
//! references.
//!
//! Attribute URLs resolve against a parsed base cached per document;
//! stylesheet references are rewritten textually so the original quote
//! style survives. The srcset tokenizer follows the HTML Living Standard
//! grammar, including commas inside parenthesised descriptors.

use ahash::{AHashMap, AHashSet};
use dom::{DomArena, NodeId};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\((?:'([^']*)'|"([^"]*)"|([^)]*))\)"#).unwrap())
}

fn absolute_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[a-z+]+:)?//").unwrap())
}

fn www_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^www\.").unwrap())
}

/// Parsed document bases, keyed by document node. Owned by the snapshot
/// session and cleared on reset.
#[derive(Debug, Default)]
pub struct DocUrlCache {
    bases: AHashMap<NodeId, Option<Url>>,
}

impl DocUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn base(&mut self, arena: &DomArena, doc: NodeId) -> Option<&Url> {
        self.bases
            .entry(doc)
            .or_insert_with(|| doc_href(arena, doc).and_then(|href| Url::parse(&href).ok()))
            .as_ref()
    }

    pub fn clear(&mut self) {
        self.bases.clear();
    }
}

/// The href a document's relative URLs resolve against.
pub(crate) fn doc_href(arena: &DomArena, doc: NodeId) -> Option<String> {
    let node = arena.get(doc).ok()?;
    node.base_url.clone().or_else(|| node.document_url.clone())
}

/// Resolve a URL against the document base. Empty input stays empty;
/// `blob:` and `data:` URLs pass through verbatim; unresolvable input is
/// returned unchanged.
pub fn absolute_to_doc(cache: &mut DocUrlCache, arena: &DomArena, doc: NodeId, url: &str) -> String {
    if url.trim().is_empty() {
        return String::new();
    }
    if url.starts_with("blob:") || url.starts_with("data:") {
        return url.to_string();
    }
    match cache.base(arena, doc) {
        Some(base) => base
            .join(url)
            .map(|joined| joined.to_string())
            .unwrap_or_else(|_| url.to_string()),
        None => url.to_string(),
    }
}

/// The scheme-and-authority prefix of a URL, query stripped.
fn extract_origin(url: &str) -> String {
    let origin = if url.contains("//") {
        url.split('/').take(3).collect::<Vec<_>>().join("/")
    } else {
        url.split('/').next().unwrap_or("").to_string()
    };
    origin.split('?').next().unwrap_or("").to_string()
}

/// Rewrite every `url(...)` reference in a stylesheet against its href,
/// preserving the original quote style. Absolute URLs, `www.` hosts, and
/// data URIs pass through; root-relative paths resolve against the
/// origin; relative paths resolve by segment pop/push.
pub fn absolute_to_stylesheet(css_text: &str, href: &str) -> String {
    css_url_regex()
        .replace_all(css_text, |caps: &regex::Captures| {
            let (quote, file_path) = if let Some(m) = caps.get(1) {
                ("'", m.as_str())
            } else if let Some(m) = caps.get(2) {
                ("\"", m.as_str())
            } else {
                ("", caps.get(3).map(|m| m.as_str()).unwrap_or(""))
            };
            if file_path.is_empty() {
                return caps[0].to_string();
            }
            format!("url({0}{1}{0})", quote, absolute_css_path(file_path, href))
        })
        .into_owned()
}

fn absolute_css_path(file_path: &str, href: &str) -> String {
    if absolute_url_regex().is_match(file_path)
        || www_regex().is_match(file_path)
        || file_path.starts_with("data:")
    {
        return file_path.to_string();
    }
    if file_path.starts_with('/') {
        return format!("{}{}", extract_origin(href), file_path);
    }
    let mut stack: Vec<&str> = href.split('/').collect();
    stack.pop(); // drop the document's own filename
    for part in file_path.split('/') {
        if part == "." {
            continue;
        } else if part == ".." {
            stack.pop();
        } else {
            stack.push(part);
        }
    }
    stack.join("/")
}

/// Tokenize a srcset value, passing each URL through `transform` and
/// preserving descriptors verbatim. Commas inside parentheses belong to
/// the descriptor, per the HTML Living Standard grammar.
pub fn rewrite_srcset(value: &str, transform: &mut dyn FnMut(&str) -> String) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }

    fn collect(chars: &[char], pos: &mut usize, pred: impl Fn(char) -> bool) -> String {
        let start = *pos;
        while *pos < chars.len() && pred(chars[*pos]) {
            *pos += 1;
        }
        chars[start..*pos].iter().collect()
    }

    let chars: Vec<char> = value.chars().collect();
    let mut pos = 0usize;
    let mut output: Vec<String> = Vec::new();

    loop {
        collect(&chars, &mut pos, |c| c.is_whitespace() || c == ',');
        if pos >= chars.len() {
            break;
        }
        let url = collect(&chars, &mut pos, |c| !c.is_whitespace());
        if let Some(stripped) = url.strip_suffix(',') {
            // URL with no descriptor; the trailing comma is a separator.
            output.push(transform(stripped));
        } else {
            let resolved = transform(&url);
            let mut descriptors = String::new();
            let mut in_parens = false;
            loop {
                if pos >= chars.len() {
                    output.push(format!("{}{}", resolved, descriptors).trim().to_string());
                    break;
                }
                let c = chars[pos];
                if !in_parens {
                    if c == ',' {
                        pos += 1;
                        output.push(format!("{}{}", resolved, descriptors).trim().to_string());
                        break;
                    } else if c == '(' {
                        in_parens = true;
                    }
                } else if c == ')' {
                    in_parens = false;
                }
                descriptors.push(c);
                pos += 1;
            }
        }
    }

    output.join(", ")
}

/// Absolutize every URL in a srcset value.
pub fn get_absolute_srcset_string(
    cache: &mut DocUrlCache,
    arena: &DomArena,
    doc: NodeId,
    value: &str,
) -> String {
    rewrite_srcset(value, &mut |url| absolute_to_doc(cache, arena, doc, url))
}

/// The deduplicated URL set referenced by a srcset value, unrewritten,
/// in source order.
pub fn get_sources_from_srcset(value: &str) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut sources = Vec::new();
    rewrite_srcset(value, &mut |url| {
        if seen.insert(url.to_string()) {
            sources.push(url.to_string());
        }
        url.to_string()
    });
    sources
}

/// Absolutize an attribute value according to `(tag, name)`. Everything
/// not URL-bearing is returned unchanged.
pub fn transform_attribute(
    cache: &mut DocUrlCache,
    arena: &DomArena,
    doc: NodeId,
    tag: &str,
    name: &str,
    value: &str,
) -> String {
    if value.is_empty() {
        return value.to_string();
    }
    if name == "src" || (name == "href" && !(tag == "use" && value.starts_with('#'))) {
        absolute_to_doc(cache, arena, doc, value)
    } else if name == "xlink:href" && !value.starts_with('#') {
        absolute_to_doc(cache, arena, doc, value)
    } else if name == "background" && matches!(tag, "table" | "td" | "th") {
        absolute_to_doc(cache, arena, doc, value)
    } else if name == "srcset" {
        get_absolute_srcset_string(cache, arena, doc, value)
    } else if name == "style" {
        let href = doc_href(arena, doc).unwrap_or_default();
        absolute_to_stylesheet(value, &href)
    } else if tag == "object" && name == "data" {
        absolute_to_doc(cache, arena, doc, value)
    } else {
        value.to_string()
    }
}

/// Attributes that must not survive into the serialized record.
pub fn ignore_attribute(tag: &str, name: &str) -> bool {
    matches!(tag, "video" | "audio") && name == "autoplay"
}
