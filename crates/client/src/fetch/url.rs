//! URL normalization for consistent storage keys.

use std::fmt;

use inventory_core::Error;
use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("missing host: {0}")]
    MissingHost(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for Error {
    fn from(err: UrlError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

/// A URL in canonical form, the sole key for stored metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Leading `scheme:` token of a URL written without `//`, e.g. `mailto:a@b`.
///
/// `host:port` is not a scheme: a colon followed by digits up to the end of
/// the authority is read as a port.
fn explicit_scheme(input: &str) -> Option<&str> {
    let (scheme, rest) = input.split_once(':')?;
    let mut chars = scheme.chars();
    let first_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    if !first_alpha || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }

    let port_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let port = &rest[..port_end];
    if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(scheme)
}

/// Normalize a URL string into its storage key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Reject anything but http/https, and URLs without a host
/// 4. Lowercase scheme and host, drop the default port
/// 5. Ensure a path of at least `/`
/// 6. Remove fragment (#...), keep query string intact
///
/// Applying `normalize` to its own output yields the same value.
pub fn normalize(input: &str) -> Result<NormalizedUrl, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        match explicit_scheme(trimmed) {
            Some(scheme) if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {
                trimmed.to_string()
            }
            Some(scheme) => return Err(UrlError::UnsupportedScheme(scheme.to_lowercase())),
            None => format!("https://{trimmed}"),
        }
    };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => return Err(UrlError::MissingHost(trimmed.to_string())),
    };
    parsed
        .set_host(Some(&host))
        .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if parsed.path().is_empty() {
        parsed.set_path("/");
    }

    parsed.set_fragment(None);

    Ok(NormalizedUrl(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rejects_scheme_without_slashes() {
        for input in ["file:/etc/passwd", "mailto:user@example.com", "javascript:alert(1)", "ftp:example.com"] {
            let err = normalize(input).unwrap_err();
            assert!(matches!(err, UrlError::UnsupportedScheme(_)), "{input}: {err}");
        }
        assert!(matches!(normalize("MAILTO:x@y.z"), Err(UrlError::UnsupportedScheme(s)) if s == "mailto"));
    }

    #[test]
    fn test_normalize_host_with_port_gets_default_scheme() {
        assert_eq!(normalize("example.com:8080").unwrap().as_str(), "https://example.com:8080/");
        assert_eq!(normalize("localhost:3000/health?x=1").unwrap().as_str(), "https://localhost:3000/health?x=1");
    }

    #[test]
    fn test_normalize_http_scheme_without_slashes() {
        assert_eq!(normalize("http:example.com").unwrap().as_str(), "http://example.com/");
    }

    #[test]
    fn test_normalize_bare_host() {
        let url = normalize("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_adds_root_path() {
        let url = normalize("https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_lowercase_scheme_and_host() {
        let url = normalize("HTTPS://EXAMPLE.COM/Path").unwrap();
        assert_eq!(url.as_str(), "https://example.com/Path");
    }

    #[test]
    fn test_normalize_drops_default_port() {
        assert_eq!(normalize("https://example.com:443/a").unwrap().as_str(), "https://example.com/a");
        assert_eq!(normalize("http://example.com:80").unwrap().as_str(), "http://example.com/");
        assert_eq!(normalize("http://example.com:8080").unwrap().as_str(), "http://example.com:8080/");
    }

    #[test]
    fn test_normalize_remove_fragment() {
        let url = normalize("https://example.com#section").unwrap();
        assert_eq!(url.as_url().fragment(), None);
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_preserve_query() {
        let url = normalize("https://example.com?b=2&a=1").unwrap();
        assert_eq!(url.as_url().query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_normalize_trim_whitespace() {
        let url = normalize("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_same_resource_same_key() {
        let a = normalize("example.com").unwrap();
        let b = normalize("https://Example.com:443/#top").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_idempotent() {
        let inputs = [
            "example.com",
            "HTTP://Example.COM:80/a/b?x=1#frag",
            "https://example.com/path/",
            "https://user@example.com:8443/p?q",
            "http://127.0.0.1:3000",
            "http://[::1]/",
            "https://example.com/a%20b",
        ];
        for input in inputs {
            let once = normalize(input).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_normalize_not_a_url() {
        let result = normalize("not a url");
        assert!(matches!(result, Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_normalize_unsupported_scheme() {
        let result = normalize("ftp://example.com/file");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_normalize_missing_host() {
        assert!(normalize("https://").is_err());
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize(""), Err(UrlError::Empty)));
        assert!(matches!(normalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_url_error_into_core_error() {
        let err: Error = UrlError::Empty.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert_eq!(err.http_status(), 422);
    }
}
