// src/csrf/token.rs
use crate::config::CsrfConfig;
use hyper::header::{HeaderMap, COOKIE};
use rand::distributions::Alphanumeric;
use rand::Rng;
use subtle::ConstantTimeEq;

pub const TOKEN_LENGTH: usize = 40;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const XSRF_HEADER: &str = "x-xsrf-token";

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Constant-time comparison; an empty expected token never matches.
pub fn tokens_match(expected: &str, given: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(given.as_bytes()))
}

/// Value of the named cookie across every `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Token the client echoed back, `X-CSRF-TOKEN` first.
pub fn request_token(headers: &HeaderMap) -> Option<&str> {
    [CSRF_HEADER, XSRF_HEADER]
        .iter()
        .filter_map(|name| headers.get(*name))
        .find_map(|value| value.to_str().ok())
}

/// Attributes of the cookie handed out on the cookie route.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub route: String,
    pub lifetime_minutes: u64,
    pub secure: bool,
}

impl CookieSettings {
    pub fn from_config(config: &CsrfConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            route: config.cookie_route.clone(),
            lifetime_minutes: config.cookie_lifetime_minutes,
            secure: config.cookie_secure,
        }
    }

    /// `Set-Cookie` value. Not HttpOnly: the client script echoes it back.
    pub fn set_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            self.name,
            token,
            self.lifetime_minutes * 60
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self::from_config(&CsrfConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_generated_tokens() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("", ""));
    }

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; lang=en"));
        headers.append(COOKIE, HeaderValue::from_static("XSRF-TOKEN=tok123"));

        assert_eq!(cookie_value(&headers, "XSRF-TOKEN"), Some("tok123"));
        assert_eq!(cookie_value(&headers, "lang"), Some("en"));
        assert_eq!(cookie_value(&headers, "session"), None);
    }

    #[test]
    fn test_request_token_prefers_csrf_header() {
        let mut headers = HeaderMap::new();
        headers.insert(XSRF_HEADER, HeaderValue::from_static("from-xsrf"));
        assert_eq!(request_token(&headers), Some("from-xsrf"));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("from-csrf"));
        assert_eq!(request_token(&headers), Some("from-csrf"));
    }

    #[test]
    fn test_set_cookie() {
        let mut settings = CookieSettings::default();
        assert_eq!(
            settings.set_cookie("t0k"),
            "XSRF-TOKEN=t0k; Path=/; Max-Age=7200; SameSite=Lax"
        );

        settings.secure = true;
        assert!(settings.set_cookie("t0k").ends_with("; Secure"));
    }
}
