//! Scenario file model.
//!
//! A scenario file is an ordered list of [`Matcher`] entries. Each entry pairs
//! a [`RequestDescriptor`] with the outcome to produce when it matches: a
//! canned [`ResponseDescriptor`] or a simulated [`NetworkError`].

use crate::error::NetworkErrorKind;
use crate::Body;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io;

/// One entry of a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawMatcher", into = "RawMatcher")]
pub struct Matcher {
    /// Criteria the request must satisfy
    pub request: RequestDescriptor,
    /// Outcome when the criteria are met
    pub result: RequestResult,
}

impl Matcher {
    pub fn new(request: RequestDescriptor, result: impl Into<RequestResult>) -> Self {
        Self {
            request,
            result: result.into(),
        }
    }
}

/// On-disk shape of an entry: `request` plus exactly one of `response` or `error`.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMatcher {
    #[serde(default)]
    request: RequestDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<ResponseDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<NetworkError>,
}

impl TryFrom<RawMatcher> for Matcher {
    type Error = String;

    fn try_from(raw: RawMatcher) -> Result<Self, Self::Error> {
        let result = match (raw.response, raw.error) {
            (Some(response), None) => RequestResult::Response(response),
            (None, Some(error)) => RequestResult::Error(error),
            (Some(_), Some(_)) => {
                return Err("entry cannot declare both a response and an error".to_string())
            }
            (None, None) => return Err("entry must declare a response or an error".to_string()),
        };
        Ok(Self {
            request: raw.request,
            result,
        })
    }
}

impl From<Matcher> for RawMatcher {
    fn from(matcher: Matcher) -> Self {
        let (response, error) = match matcher.result {
            RequestResult::Response(response) => (Some(response), None),
            RequestResult::Error(error) => (None, Some(error)),
        };
        Self {
            request: matcher.request,
            response,
            error,
        }
    }
}

/// Request matching criteria. An absent criterion always matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestDescriptor {
    /// HTTP method, compared case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Required headers; each value must be among the request's values for that name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Required query parameters (exact values)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,

    /// Pattern the whole request body must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyPattern>,
}

/// A header name with an optional value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Regular expression matched against the entire request body.
#[derive(Clone)]
pub struct BodyPattern {
    source: String,
    anchored: Regex,
}

impl BodyPattern {
    /// Compile a pattern. The match is anchored at both ends.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    /// Pattern as written in the scenario file.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the whole of `text` matches.
    pub fn is_full_match(&self, text: &str) -> bool {
        self.anchored.is_match(text)
    }
}

impl fmt::Debug for BodyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BodyPattern").field(&self.source).finish()
    }
}

impl Serialize for BodyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for BodyPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        BodyPattern::new(&pattern).map_err(serde::de::Error::custom)
    }
}

/// Outcome of a matched entry.
#[derive(Debug, Clone)]
pub enum RequestResult {
    Response(ResponseDescriptor),
    Error(NetworkError),
}

impl From<ResponseDescriptor> for RequestResult {
    fn from(response: ResponseDescriptor) -> Self {
        RequestResult::Response(response)
    }
}

impl From<NetworkError> for RequestResult {
    fn from(error: NetworkError) -> Self {
        RequestResult::Error(error)
    }
}

/// Canned response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ResponseDescriptor {
    /// Entry-specific delay in milliseconds (0 = use the interceptor's delay)
    #[serde(default)]
    pub delay: u64,

    /// HTTP status code
    #[serde(default = "default_code")]
    pub code: u16,

    /// Content type of the body
    #[serde(default = "default_media_type")]
    pub media_type: String,

    /// Additional headers; entries without a value are skipped
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Inline body; raw bytes once a body file has been loaded into it
    #[serde(default, with = "text_body")]
    pub body: Body,

    /// Body file, resolved relative to the scenario file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<String>,
}

fn default_code() -> u16 {
    200
}

fn default_media_type() -> String {
    "text/plain".to_string()
}

impl Default for ResponseDescriptor {
    fn default() -> Self {
        Self {
            delay: 0,
            code: default_code(),
            media_type: default_media_type(),
            headers: Vec::new(),
            body: Body::new(),
            body_file: None,
        }
    }
}

impl ResponseDescriptor {
    /// Response with the given status code and inline body.
    pub fn new(code: u16, body: impl Into<Body>) -> Self {
        Self {
            code,
            body: body.into(),
            ..Self::default()
        }
    }

    /// Whether both an inline body and a body file are declared.
    pub fn has_ambiguous_body(&self) -> bool {
        self.body_file.is_some() && !self.body.is_empty()
    }
}

/// Inline bodies are written as text in scenario files.
mod text_body {
    use crate::Body;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Body, D::Error> {
        String::deserialize(deserializer).map(String::into_bytes)
    }
}

/// A failure to simulate instead of returning a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkError {
    /// Registered failure kind
    #[serde(rename = "type")]
    pub kind: NetworkErrorKind,

    /// Optional message carried by the raised error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NetworkError {
    pub fn new(kind: NetworkErrorKind, message: Option<String>) -> Self {
        Self { kind, message }
    }

    /// The I/O error raised to the caller.
    pub fn to_io_error(&self) -> io::Error {
        match &self.message {
            Some(message) => io::Error::new(self.kind.io_kind(), message.clone()),
            None => io::Error::from(self.kind.io_kind()),
        }
    }
}
