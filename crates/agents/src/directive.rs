//! Image directive embedded in completion text.
//!
//! The backend asks for an image by writing `///IMG:<prompt>///` anywhere in
//! its reply. The marker is stripped before the reply is shown and the prompt
//! is handed to the image generator.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)///IMG:(.*?)///").expect("directive pattern is valid"));

/// Length of the closing `///` marker.
const CLOSE_LEN: usize = 3;

/// Reply split into what the user sees and the optional image prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveParse {
    pub visible_text: String,
    pub directive: Option<String>,
}

/// Extract the first image directive from `text`.
///
/// Every directive span is removed from the visible text, including one that
/// opens on the closing marker of the previous span, but only the first
/// payload is returned. Without a directive the text comes back unchanged;
/// with one, the remaining text is trimmed.
pub fn parse_directive(text: &str) -> DirectiveParse {
    let mut visible = String::with_capacity(text.len());
    let mut directive = None;
    let mut kept_from = 0;
    let mut search_from = 0;

    while let Some(caps) = DIRECTIVE_RE.captures_at(text, search_from) {
        let Some(span) = caps.get(0) else {
            break;
        };
        if directive.is_none() {
            directive = caps.get(1).map(|m| m.as_str().trim().to_string());
        }
        visible.push_str(&text[kept_from..span.start().max(kept_from)]);
        kept_from = span.end();
        search_from = span.end() - CLOSE_LEN;
    }

    if directive.is_none() {
        return DirectiveParse {
            visible_text: text.to_string(),
            directive: None,
        };
    }

    visible.push_str(&text[kept_from..]);
    DirectiveParse {
        visible_text: visible.trim().to_string(),
        directive,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn chained_directives_strip_both_and_keep_first_payload() {
        let parsed = parse_directive("before ///IMG:cat in rain///IMG:dog/// after");
        assert_eq!(parsed.visible_text, "before  after");
        assert_eq!(parsed.directive.as_deref(), Some("cat in rain"));
    }

    #[test]
    fn plain_text_is_untouched() {
        let parsed = parse_directive("hello");
        assert_eq!(parsed.visible_text, "hello");
        assert!(parsed.directive.is_none());
    }

    #[test]
    fn untouched_text_keeps_surrounding_whitespace() {
        assert_eq!(parse_directive("  hi \n").visible_text, "  hi \n");
    }

    #[test]
    fn payload_may_span_lines() {
        let parsed = parse_directive("Here you go.\n///IMG:\n  a castle\n  at dusk\n///");
        assert_eq!(parsed.visible_text, "Here you go.");
        assert_eq!(parsed.directive.as_deref(), Some("a castle\n  at dusk"));
    }

    #[test]
    fn separate_directives_are_all_removed() {
        let parsed = parse_directive("///IMG:first/// middle ///IMG:second/// end");
        assert_eq!(parsed.visible_text, "middle  end");
        assert_eq!(parsed.directive.as_deref(), Some("first"));
    }

    #[rstest]
    #[case("///IMG:no close")]
    #[case("//IMG:two slashes///")]
    #[case("IMG:bare///")]
    fn incomplete_markers_are_ignored(#[case] input: &str) {
        let parsed = parse_directive(input);
        assert_eq!(parsed.visible_text, input);
        assert!(parsed.directive.is_none());
    }

    #[test]
    fn directive_only_reply_has_empty_visible_text() {
        let parsed = parse_directive("  ///IMG: a fox ///  ");
        assert_eq!(parsed.visible_text, "");
        assert_eq!(parsed.directive.as_deref(), Some("a fox"));
    }
}
