//! Redirect URL Normalization
//!
//! Listings carry success/cancel targets as relative paths or full URLs.
//! Both resolve against the configured public base URL, and the success URL
//! must end up carrying the processor's session-id substitution token
//! exactly once.

use url::Url;

use crate::error::{PaymentError, Result};

/// Literal the processor replaces with the real session id on redirect.
pub const SESSION_ID_TOKEN: &str = "{CHECKOUT_SESSION_ID}";

/// Resolve a redirect target against the public base URL. Relative paths
/// join the base; absolute URLs pass through. Failures here are deployment
/// configuration problems, not buyer mistakes.
pub fn resolve_redirect(base: &str, target: &str) -> Result<Url> {
    let base = Url::parse(base)
        .map_err(|e| PaymentError::Configuration(format!("public base URL invalid: {e}")))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(PaymentError::Configuration(format!(
            "public base URL must be http(s), got {}",
            base.scheme()
        )));
    }
    base.join(target)
        .map_err(|e| PaymentError::Configuration(format!("redirect target invalid: {e}")))
}

/// Append the session-id token as a query parameter unless the URL already
/// carries it. Works on the rendered string because `Url` would
/// percent-encode the braces and the processor substitutes the literal text.
pub fn ensure_session_token(url: &str) -> String {
    if url.contains(SESSION_ID_TOKEN) {
        return url.to_string();
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}session_id={SESSION_ID_TOKEN}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_joins_base() {
        let url = resolve_redirect("https://labs.example.com", "/thank-you").unwrap();
        assert_eq!(url.as_str(), "https://labs.example.com/thank-you");
    }

    #[test]
    fn test_absolute_target_passes_through() {
        let url = resolve_redirect("https://labs.example.com", "https://other.example.com/done")
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/done");
    }

    #[test]
    fn test_bad_base_is_configuration_error() {
        let err = resolve_redirect("not a url", "/thanks").unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));

        let err = resolve_redirect("ftp://files.example.com", "/thanks").unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }

    #[test]
    fn test_token_appended_with_right_separator() {
        assert_eq!(
            ensure_session_token("https://x.test/thanks"),
            "https://x.test/thanks?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(
            ensure_session_token("https://x.test/thanks?lab_id=lab_1"),
            "https://x.test/thanks?lab_id=lab_1&session_id={CHECKOUT_SESSION_ID}"
        );
    }

    #[test]
    fn test_token_append_is_idempotent() {
        let once = ensure_session_token("https://x.test/thanks");
        let twice = ensure_session_token(&once);
        assert_eq!(once, twice);
    }
}
