//! Short, bounded error text shown to chat users.
//!
//! Full diagnostics go to the log; users only see a one-line summary.

use umbra_agents::ExchangeError;

pub const QUOTA_EXCEEDED_MESSAGE: &str = "❌ Quota exceeded.";
pub const IMAGE_FAILED_MESSAGE: &str = "❌ Image generation failed.";

/// User-facing text for a failed exchange. Backend detail is cut to
/// `detail_chars` characters.
pub fn user_facing_error(err: &ExchangeError, detail_chars: usize) -> String {
    match err {
        ExchangeError::QuotaExceeded { .. } => QUOTA_EXCEEDED_MESSAGE.to_string(),
        ExchangeError::Backend(e) => {
            format!("❌ Error: {}", truncate_chars(&e.to_string(), detail_chars))
        },
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, umbra_agents::CompletionError};

    #[test]
    fn quota_message_is_fixed() {
        let err = ExchangeError::QuotaExceeded {
            attempts: 3,
            last: CompletionError::Http {
                status: 429,
                body: "a very long provider body".repeat(20),
            },
        };
        assert_eq!(user_facing_error(&err, 100), QUOTA_EXCEEDED_MESSAGE);
    }

    #[test]
    fn backend_detail_is_truncated() {
        let err = ExchangeError::Backend(CompletionError::message("x".repeat(500)));
        let text = user_facing_error(&err, 100);
        assert_eq!(text, format!("❌ Error: {}", "x".repeat(100)));
    }

    #[test]
    fn short_detail_is_kept() {
        let err = ExchangeError::Backend(CompletionError::EmptyResponse);
        assert_eq!(
            user_facing_error(&err, 100),
            "❌ Error: response contained no text"
        );
    }

    #[rstest]
    #[case("héllo", 2, "hé")]
    #[case("héllo", 10, "héllo")]
    #[case("", 3, "")]
    fn truncates_on_char_boundaries(#[case] text: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(truncate_chars(text, max), expected);
    }
}
