use crate::error::CoreError;
use url::Url;

const DEFAULT_SCHEME_PREFIX: &str = "https://";
const MIN_HOST_LENGTH: usize = 3;

/// Normalizes user input into an absolute URL string.
///
/// The input is trimmed and `https://` is prepended when it does not already
/// start with `http://` or `https://`. The result must parse and carry a host
/// of at least three characters. The returned string is the normalized input,
/// not the re-serialized parsed URL, so `example.com` becomes
/// `https://example.com` without a trailing slash. Whitespace or control
/// characters left after trimming are rejected, so the returned string is
/// exactly the one the parser validated.
pub fn normalize_url(input: &str) -> std::result::Result<String, CoreError> {
    let trimmed = input.trim();
    if let Some(c) = trimmed
        .chars()
        .find(|c| c.is_whitespace() || c.is_control())
    {
        return Err(CoreError::InvalidUrl(format!(
            "'{}' contains disallowed character {:?}",
            input.escape_debug(),
            c
        )));
    }
    let normalized = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME_PREFIX}{trimmed}")
    };

    let parsed = Url::parse(&normalized)
        .map_err(|e| CoreError::InvalidUrl(format!("'{}': {e}", input)))?;

    match parsed.host_str() {
        Some(host) if host.len() >= MIN_HOST_LENGTH => Ok(normalized),
        Some(host) => Err(CoreError::InvalidUrl(format!(
            "host '{}' is shorter than {} characters",
            host, MIN_HOST_LENGTH
        ))),
        None => Err(CoreError::InvalidUrl(format!("'{}' has no host", input))),
    }
}

fn has_http_scheme(input: &str) -> bool {
    let lower = input
        .get(..DEFAULT_SCHEME_PREFIX.len())
        .unwrap_or(input)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_https_when_scheme_missing() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(
            normalize_url("example.com/a/b?c=d").unwrap(),
            "https://example.com/a/b?c=d"
        );
    }

    #[test]
    fn keeps_existing_http_schemes() {
        assert_eq!(normalize_url("http://example.com").unwrap(), "http://example.com");
        assert_eq!(
            normalize_url("HTTPS://Example.com/x").unwrap(),
            "HTTPS://Example.com/x"
        );
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            normalize_url("  https://example.com/path \n").unwrap(),
            "https://example.com/path"
        );
    }

    #[test]
    fn rejects_unparseable_input() {
        assert!(matches!(normalize_url("not a url"), Err(CoreError::InvalidUrl(_))));
        assert!(matches!(normalize_url(""), Err(CoreError::InvalidUrl(_))));
        assert!(matches!(normalize_url("   "), Err(CoreError::InvalidUrl(_))));
    }

    #[test]
    fn rejects_interior_whitespace_and_control_characters() {
        for input in [
            "exa\tmple.com",
            "https://exa\nmple.com/x",
            "example.com/a b",
            "https://example.com/\r\nSet-Cookie:x",
            "https://example.com/\u{7f}",
        ] {
            assert!(
                matches!(normalize_url(input), Err(CoreError::InvalidUrl(_))),
                "{input:?}"
            );
        }
    }

    #[test]
    fn rejects_short_hosts() {
        assert!(matches!(normalize_url("ab"), Err(CoreError::InvalidUrl(_))));
        assert!(matches!(normalize_url("https://a.b"), Ok(_)));
        assert!(matches!(normalize_url("https://xy/"), Err(CoreError::InvalidUrl(_))));
    }
}
