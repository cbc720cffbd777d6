use super::FeedError;

/// Strip the `callback( ... )` wrapper from a JSONP body.
///
/// Accepts the `/**/` prefix some servers emit, surrounding whitespace and a
/// trailing semicolon. The wrapper must call `callback` and nothing else.
pub fn unwrap_jsonp<'a>(body: &'a str, callback: &str) -> Result<&'a str, FeedError> {
    let mut rest = body.trim();
    if let Some(stripped) = rest.strip_prefix("/**/") {
        rest = stripped.trim_start();
    }
    let rest = rest.trim_end().trim_end_matches(';').trim_end();

    let Some(after_name) = rest.strip_prefix(callback) else {
        let shown: String = rest.chars().take(32).collect();
        return Err(FeedError::Jsonp(format!(
            "expected call to '{}', got '{}'",
            callback, shown
        )));
    };

    let inner = after_name
        .trim_start()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| FeedError::Jsonp("missing argument parentheses".into()))?;

    Ok(inner.trim())
}

/// A callback must be usable as a JavaScript global, so keep it to identifier characters.
pub fn is_valid_callback_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_plain_call() {
        let body = r#"liveCallback({"liveEvents":[]});"#;
        assert_eq!(unwrap_jsonp(body, "liveCallback").unwrap(), r#"{"liveEvents":[]}"#);
    }

    #[test]
    fn test_unwrap_with_comment_prefix_and_whitespace() {
        let body = "\n/**/ liveCallback ( {\"a\":1} ) ;\n";
        assert_eq!(unwrap_jsonp(body, "liveCallback").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_unwrap_rejects_other_callback() {
        let err = unwrap_jsonp("otherCallback({})", "liveCallback").unwrap_err();
        assert!(matches!(err, FeedError::Jsonp(_)));
    }

    #[test]
    fn test_unwrap_rejects_bare_json() {
        assert!(unwrap_jsonp(r#"{"liveEvents":[]}"#, "liveCallback").is_err());
    }

    #[test]
    fn test_unwrap_rejects_unclosed_call() {
        assert!(unwrap_jsonp("liveCallback({}", "liveCallback").is_err());
    }

    #[test]
    fn test_callback_name_validation() {
        assert!(is_valid_callback_name("liveCallback"));
        assert!(is_valid_callback_name("_cb$1"));
        assert!(!is_valid_callback_name(""));
        assert!(!is_valid_callback_name("1cb"));
        assert!(!is_valid_callback_name("alert(1)"));
    }
}
