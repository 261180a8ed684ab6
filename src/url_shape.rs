//! Breaks a URL-shaped string into path, query and "shape" components.
//!
//! A shape is the URL with its variable parts replaced by `?`, so that
//! `/users/42?page=3` and `/users/17?page=9` share the shape
//! `/users/?` / `page=?`. Path patterns such as `/users/:id` can be
//! configured to name the variable path segments instead.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{ConfigError, UrlShapeError};

const PLACEHOLDER: &str = "?";

/// Everything extracted from one URL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shaped {
    pub uri: String,
    pub path: String,
    pub path_shape: String,
    pub path_fields: BTreeMap<String, Vec<String>>,
    pub query: String,
    pub query_shape: String,
    pub query_fields: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A path template like `/users/:id/posts/:post`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidPattern {
            pattern: raw.to_string(),
            reason,
        };
        let rest = raw.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;

        let mut segments = Vec::new();
        for part in rest.split('/') {
            match part.strip_prefix(':') {
                Some("") => return Err(invalid("empty capture name")),
                Some(name) => segments.push(Segment::Capture(name.to_string())),
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    // captures on match, None otherwise
    fn captures(&self, path: &str) -> Option<Vec<(&str, String)>> {
        let parts: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captured = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Capture(name) => captured.push((name.as_str(), part.to_string())),
            }
        }
        Some(captured)
    }
}

/// Parses URLs against an ordered list of path patterns. The first matching pattern wins.
#[derive(Debug, Clone, Default)]
pub struct UrlShaper {
    patterns: Vec<PathPattern>,
}

impl UrlShaper {
    pub fn new(patterns: Vec<PathPattern>) -> Self {
        Self { patterns }
    }

    pub fn parse(&self, raw: &str) -> Result<Shaped, UrlShapeError> {
        let (path, query) = split_request_uri(raw)?;

        let mut shaped = Shaped {
            uri: raw.to_string(),
            path: path.clone(),
            query: query.clone(),
            ..Shaped::default()
        };

        match self.patterns.iter().find_map(|p| p.captures(&path).map(|c| (p, c))) {
            Some((pattern, captures)) => {
                shaped.path_shape = pattern.raw.clone();
                for (name, value) in captures {
                    shaped.path_fields.entry(name.to_string()).or_default().push(value);
                }
            }
            None => shaped.path_shape = default_path_shape(&path),
        }

        let mut names = Vec::new();
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
            names.push(name.to_string());
            shaped
                .query_fields
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        // stable sort keeps repeated names together in arrival order
        names.sort();
        shaped.query_shape = names
            .iter()
            .map(|name| format!("{}={}", name, PLACEHOLDER))
            .collect::<Vec<_>>()
            .join("&");

        Ok(shaped)
    }
}

// Accepts "/path?query" or an absolute URL. The path keeps its original encoding.
fn split_request_uri(raw: &str) -> Result<(String, String), UrlShapeError> {
    if raw.is_empty() {
        return Err(UrlShapeError::Empty);
    }

    if raw.starts_with('/') {
        // reject what a browser would refuse as a request target
        let base = Url::parse("http://localhost/")?;
        base.join(raw)?;

        let without_fragment = raw.split('#').next().unwrap_or_default();
        let (path, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));
        return Ok((path.to_string(), query.to_string()));
    }

    match Url::parse(raw) {
        Ok(url) if url.cannot_be_a_base() => Err(UrlShapeError::NotARequestUri),
        Ok(url) => Ok((url.path().to_string(), url.query().unwrap_or_default().to_string())),
        Err(url::ParseError::RelativeUrlWithoutBase) => Err(UrlShapeError::NotARequestUri),
        Err(e) => Err(e.into()),
    }
}

fn default_path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| if is_opaque(segment) { PLACEHOLDER } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

// numeric ids, uuids and long hex tokens
fn is_opaque(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    if is_uuid(segment) {
        return true;
    }
    segment.len() >= 8
        && segment.bytes().all(|b| b.is_ascii_hexdigit())
        && segment.bytes().any(|b| b.is_ascii_digit())
}

fn is_uuid(segment: &str) -> bool {
    let groups: Vec<&str> = segment.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}
