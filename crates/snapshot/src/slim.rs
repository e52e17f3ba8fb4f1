//! Slim-DOM filtering: declarative rules dropping nodes irrelevant to
//! visual replay (scripts, meta tags, favicons, comments).
//!
//! The filter inspects the already-serialized record, so rules read the
//! same transformed attributes the output carries.

use crate::types::{AttrValue, Attributes, SerializedNode};

/// Which node categories the filter drops. Individual `head_meta_*`
/// gates are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlimDomOptions {
    pub script: bool,
    pub comment: bool,
    pub head_favicon: bool,
    pub head_whitespace: bool,
    pub head_meta_desc_keywords: bool,
    pub head_meta_social: bool,
    pub head_meta_robots: bool,
    pub head_meta_http_equiv: bool,
    pub head_meta_authorship: bool,
    pub head_meta_verification: bool,
}

impl SlimDomOptions {
    /// Everything except description/keywords meta, which some
    /// consumers still want for page titles.
    pub fn full() -> Self {
        Self {
            script: true,
            comment: true,
            head_favicon: true,
            head_whitespace: true,
            head_meta_desc_keywords: false,
            head_meta_social: true,
            head_meta_robots: true,
            head_meta_http_equiv: true,
            head_meta_authorship: true,
            head_meta_verification: true,
        }
    }

    /// Every category enabled.
    pub fn all() -> Self {
        Self {
            head_meta_desc_keywords: true,
            ..Self::full()
        }
    }
}

const VERIFICATION_NAMES: &[&str] = &[
    "google-site-verification",
    "yandex-verification",
    "csrf-token",
    "p:domain_verify",
    "verify-v1",
    "verification",
    "shopify-checkout-api-token",
];

fn lower(attributes: &Attributes, name: &str) -> String {
    attributes
        .get(name)
        .and_then(AttrValue::as_str)
        .unwrap_or("")
        .to_lowercase()
}

fn is_script_like(tag: &str, attributes: &Attributes) -> bool {
    if tag == "script" {
        return true;
    }
    if tag != "link" {
        return false;
    }
    let rel = lower(attributes, "rel");
    if (rel == "preload" || rel == "modulepreload") && lower(attributes, "as") == "script" {
        return true;
    }
    rel == "prefetch" && lower(attributes, "href").ends_with(".js")
}

fn is_favicon_like(tag: &str, attributes: &Attributes) -> bool {
    if tag == "link" {
        let rel = lower(attributes, "rel");
        return matches!(rel.as_str(), "icon" | "shortcut icon" | "apple-touch-icon");
    }
    if tag == "meta" {
        let name = lower(attributes, "name");
        return name == "application-name"
            || name == "msapplication-tileimage"
            || name == "msapplication-tilecolor";
    }
    false
}

fn is_excluded_meta(attributes: &Attributes, options: &SlimDomOptions) -> bool {
    let name = lower(attributes, "name");
    let property = lower(attributes, "property");

    if options.head_meta_desc_keywords && matches!(name.as_str(), "description" | "keywords") {
        return true;
    }
    if options.head_meta_social
        && (property.starts_with("og:")
            || property.starts_with("twitter:")
            || property.starts_with("fb:")
            || name.starts_with("twitter:")
            || name == "pinterest")
    {
        return true;
    }
    if options.head_meta_robots && matches!(name.as_str(), "robots" | "googlebot" | "bingbot") {
        return true;
    }
    if options.head_meta_http_equiv && attributes.contains_key("http-equiv") {
        return true;
    }
    if options.head_meta_authorship
        && (matches!(
            name.as_str(),
            "author" | "generator" | "framework" | "publisher" | "progid"
        ) || property.starts_with("article:")
            || property.starts_with("product:"))
    {
        return true;
    }
    if options.head_meta_verification && VERIFICATION_NAMES.contains(&name.as_str()) {
        return true;
    }
    false
}

/// Whether a serialized node is dropped by the active filter.
pub fn slim_dom_excluded(node: &SerializedNode, options: &SlimDomOptions) -> bool {
    match node {
        SerializedNode::Comment { .. } => options.comment,
        SerializedNode::Element {
            tag_name,
            attributes,
            ..
        } => {
            if options.script && is_script_like(tag_name, attributes) {
                return true;
            }
            if options.head_favicon && is_favicon_like(tag_name, attributes) {
                return true;
            }
            if tag_name == "meta" && is_excluded_meta(attributes, options) {
                return true;
            }
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)]) -> SerializedNode {
        SerializedNode::Element {
            tag_name: tag.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
                .collect(),
            child_nodes: vec![],
            is_svg: None,
            need_block: None,
            is_shadow_host: None,
            is_shadow: None,
            is_custom: None,
        }
    }

    #[test]
    fn scripts_and_script_links_are_dropped() {
        let options = SlimDomOptions {
            script: true,
            ..Default::default()
        };
        assert!(slim_dom_excluded(&element("script", &[]), &options));
        assert!(slim_dom_excluded(
            &element("link", &[("rel", "preload"), ("as", "script")]),
            &options
        ));
        assert!(slim_dom_excluded(
            &element("link", &[("rel", "modulepreload"), ("as", "script")]),
            &options
        ));
        assert!(slim_dom_excluded(
            &element("link", &[("rel", "prefetch"), ("href", "http://h/app.js")]),
            &options
        ));
        assert!(!slim_dom_excluded(
            &element("link", &[("rel", "stylesheet"), ("href", "a.css")]),
            &options
        ));
    }

    #[test]
    fn comments_are_dropped_when_enabled() {
        let node = SerializedNode::Comment {
            text_content: "x".to_string(),
        };
        assert!(slim_dom_excluded(
            &node,
            &SlimDomOptions {
                comment: true,
                ..Default::default()
            }
        ));
        assert!(!slim_dom_excluded(&node, &SlimDomOptions::default()));
    }

    #[test]
    fn favicons_are_dropped_when_enabled() {
        let options = SlimDomOptions {
            head_favicon: true,
            ..Default::default()
        };
        assert!(slim_dom_excluded(
            &element("link", &[("rel", "shortcut icon")]),
            &options
        ));
        assert!(slim_dom_excluded(
            &element("meta", &[("name", "msapplication-TileImage")]),
            &options
        ));
        assert!(!slim_dom_excluded(
            &element("link", &[("rel", "stylesheet")]),
            &options
        ));
    }

    #[test]
    fn meta_rules_are_gated_independently() {
        let desc = element("meta", &[("name", "description")]);
        assert!(slim_dom_excluded(
            &desc,
            &SlimDomOptions {
                head_meta_desc_keywords: true,
                ..Default::default()
            }
        ));
        assert!(!slim_dom_excluded(&desc, &SlimDomOptions::full()));
        assert!(slim_dom_excluded(&desc, &SlimDomOptions::all()));

        let social = element("meta", &[("property", "og:title")]);
        assert!(slim_dom_excluded(&social, &SlimDomOptions::full()));

        let robots = element("meta", &[("name", "robots")]);
        assert!(slim_dom_excluded(&robots, &SlimDomOptions::full()));

        let http_equiv = element("meta", &[("http-equiv", "refresh")]);
        assert!(slim_dom_excluded(&http_equiv, &SlimDomOptions::full()));

        let author = element("meta", &[("name", "author")]);
        assert!(slim_dom_excluded(&author, &SlimDomOptions::full()));

        let article = element("meta", &[("property", "article:author")]);
        assert!(slim_dom_excluded(&article, &SlimDomOptions::full()));

        let verification = element("meta", &[("name", "google-site-verification")]);
        assert!(slim_dom_excluded(&verification, &SlimDomOptions::full()));

        let viewport = element("meta", &[("name", "viewport")]);
        assert!(!slim_dom_excluded(&viewport, &SlimDomOptions::all()));
    }
}
