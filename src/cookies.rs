use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
}

impl Cookie {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: None,
            path: None,
            http_only: false,
            secure: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect cookies from the `Set-Cookie` header lines of a response.
    ///
    /// Only the leading `name=value` pair of each line names the cookie; the
    /// remaining attributes fill in domain/path/flags. Later lines win.
    pub fn from_set_cookie_headers<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut jar = Self::new();

        for line in lines {
            let mut parts = line.as_ref().split(';');
            let Some((name, value)) = parts.next().and_then(split_pair) else {
                continue;
            };

            let mut cookie = Cookie::new(name, value);
            for attr in parts {
                let attr = attr.trim();
                let (key, val) = match attr.find('=') {
                    Some(idx) => (&attr[..idx], Some(attr[idx + 1..].trim())),
                    None => (attr, None),
                };
                match key.trim().to_ascii_lowercase().as_str() {
                    "domain" => cookie.domain = val.map(String::from),
                    "path" => cookie.path = val.map(String::from),
                    "httponly" => cookie.http_only = true,
                    "secure" => cookie.secure = true,
                    _ => {}
                }
            }
            jar.insert(cookie);
        }

        jar
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// Value of a named cookie, ignoring empty values.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.get(name)
            .map(|c| c.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Insert a cookie (replaces existing cookie with same name)
    pub fn insert(&mut self, cookie: Cookie) {
        self.cookies.insert(cookie.name.clone(), cookie);
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let pair = pair.trim();
    let idx = pair.find('=')?;
    let name = pair[..idx].trim();
    if name.is_empty() {
        return None;
    }
    Some((name, pair[idx + 1..].trim()))
}
