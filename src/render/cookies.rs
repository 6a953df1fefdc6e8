//! Request cookies and pending `Set-Cookie` headers.

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

const COOKIE_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b',')
    .add(b';')
    .add(b'\\')
    .add(b'%');

/// Cookie attributes used when setting a cookie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Cookies {
    incoming: BTreeMap<String, String>,
    outgoing: Vec<(String, String, CookieOptions)>,
}

impl Cookies {
    /// Parse every `Cookie` header of a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut incoming = BTreeMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(text) = value.to_str() else { continue };
            for pair in text.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    let decoded = percent_decode_str(value.trim()).decode_utf8_lossy().into_owned();
                    incoming.insert(name.trim().to_string(), decoded);
                }
            }
        }
        Self {
            incoming,
            outgoing: Vec::new(),
        }
    }

    /// Current value, including cookies set during this request.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.outgoing
            .iter()
            .rev()
            .find(|(n, _, _)| n == name)
            .map(|(_, v, opts)| (opts.max_age != Some(0)).then_some(v.as_str()))
            .unwrap_or_else(|| self.incoming.get(name).map(String::as_str))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>, options: CookieOptions) {
        self.outgoing.push((name.into(), value.into(), options));
    }

    pub fn delete(&mut self, name: impl Into<String>) {
        let options = CookieOptions {
            max_age: Some(0),
            ..Default::default()
        };
        self.outgoing.push((name.into(), String::new(), options));
    }

    /// `Set-Cookie` header values for everything set during this request.
    pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.outgoing
            .iter()
            .filter_map(|(name, value, options)| {
                let mut cookie = format!("{name}={}", utf8_percent_encode(value, COOKIE_VALUE));
                if let Some(path) = &options.path {
                    cookie.push_str(&format!("; Path={path}"));
                }
                if let Some(max_age) = options.max_age {
                    cookie.push_str(&format!("; Max-Age={max_age}"));
                }
                if options.http_only {
                    cookie.push_str("; HttpOnly");
                }
                if options.secure {
                    cookie.push_str("; Secure");
                }
                HeaderValue::from_str(&cookie).ok()
            })
            .collect()
    }
}
