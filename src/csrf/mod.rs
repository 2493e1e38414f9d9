// src/csrf/mod.rs
mod exemptions;
mod middleware;
mod token;

pub use exemptions::{pattern_matches, CsrfExemptions};
pub use middleware::{CsrfLayer, VerifyCsrfToken};
pub use token::{
    cookie_value, generate_token, request_token, tokens_match, CookieSettings, CSRF_HEADER,
    TOKEN_LENGTH, XSRF_HEADER,
};
