//! Stylesheet text extraction.
//!
//! Serializes a sheet's rule list to one string. Cross-origin sheets
//! refuse access to their rules; that is reported and treated as "no
//! inline capture possible", leaving the owning `<link>` intact.

use crate::url::absolute_to_stylesheet;
use dom::StyleSheet;

/// Concatenated rule text of a sheet, or `None` when the rules are
/// unreachable or empty.
pub fn stringify_stylesheet(sheet: &StyleSheet) -> Option<String> {
    if !sheet.accessible {
        tracing::debug!(href = ?sheet.href, "stylesheet rules unreachable, keeping link");
        return None;
    }
    let text = sheet.rules.concat();
    (!text.is_empty()).then_some(text)
}

/// Extracted and absolutized text for inlining, resolved against the
/// sheet's own href falling back to the document href.
pub fn inline_stylesheet_text(sheet: &StyleSheet, doc_href: &str) -> Option<String> {
    let text = stringify_stylesheet(sheet)?;
    let href = sheet.href.as_deref().unwrap_or(doc_href);
    Some(absolute_to_stylesheet(&text, href))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_rules() {
        let sheet = StyleSheet {
            href: Some("http://h/a/main.css".to_string()),
            rules: vec![".a{color:red}".to_string(), ".b{color:blue}".to_string()],
            accessible: true,
        };
        assert_eq!(
            stringify_stylesheet(&sheet).as_deref(),
            Some(".a{color:red}.b{color:blue}")
        );
    }

    #[test]
    fn inaccessible_sheet_yields_nothing() {
        let sheet = StyleSheet {
            href: Some("http://other/x.css".to_string()),
            rules: vec![".a{}".to_string()],
            accessible: false,
        };
        assert_eq!(stringify_stylesheet(&sheet), None);
    }

    #[test]
    fn empty_sheet_yields_nothing() {
        let sheet = StyleSheet::inline(vec![]);
        assert_eq!(stringify_stylesheet(&sheet), None);
    }

    #[test]
    fn inline_text_resolves_against_sheet_href() {
        let sheet = StyleSheet {
            href: Some("http://h/css/main.css".to_string()),
            rules: vec![".a{background:url(i.png)}".to_string()],
            accessible: true,
        };
        assert_eq!(
            inline_stylesheet_text(&sheet, "http://h/index.html").as_deref(),
            Some(".a{background:url(http://h/css/i.png)}")
        );
    }
}
