// src/csrf/exemptions.rs
use std::borrow::Cow;

/// URI patterns that skip CSRF verification.
///
/// Patterns are compared against the percent-decoded request path with
/// surrounding slashes trimmed, so `sanctum/csrf-cookie` matches
/// `/sanctum/csrf-cookie/`. A `*` matches any run of characters, `/` included.
/// Paths that do not decode to UTF-8 are matched as sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfExemptions {
    patterns: Vec<String>,
}

impl CsrfExemptions {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| normalize(&p.into()))
                .collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        let decoded = urlencoding::decode(path).unwrap_or(Cow::Borrowed(path));
        let path = normalize(&decoded);
        self.patterns.iter().any(|p| pattern_matches(p, &path))
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Wildcard match where `*` stands for zero or more characters.
pub fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }

    let p: Vec<char> = pattern.chars().collect();
    let v: Vec<char> = value.chars().collect();
    let (mut pi, mut vi) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while vi < v.len() {
        if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            resume = vi;
            pi += 1;
        } else if pi < p.len() && p[pi] == v[vi] {
            pi += 1;
            vi += 1;
        } else if let Some(s) = star {
            // let the last star swallow one more char
            pi = s + 1;
            resume += 1;
            vi = resume;
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
