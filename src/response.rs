//! Response synthesis.
//!
//! Turns a matched [`ResponseDescriptor`] into a [`MockResponse`].

use crate::error::InterceptError;
use crate::model::ResponseDescriptor;
use crate::Body;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, StatusCode, Uri, Version};
use std::time::Duration;

/// A fully buffered HTTP response, mocked or real.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Method of the request this response answers
    pub method: Method,
    /// URI of the request this response answers
    pub uri: Uri,
    /// Numeric status code
    pub status: u16,
    /// Protocol version
    pub version: Version,
    /// Reason phrase for the status code
    pub reason: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body bytes
    pub body: Body,
}

impl MockResponse {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// First value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Standard reason phrase for a status code.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
}

/// Descriptor answered when no scenario matches in enabled mode.
pub fn not_found() -> ResponseDescriptor {
    ResponseDescriptor::new(404, "Page not found")
}

/// Delay to apply before answering: the response's own delay wins over the global one.
pub fn effective_delay(response_delay_ms: u64, global_delay_ms: u64) -> Option<Duration> {
    match (response_delay_ms, global_delay_ms) {
        (0, 0) => None,
        (0, global) => Some(Duration::from_millis(global)),
        (own, _) => Some(Duration::from_millis(own)),
    }
}

/// Builds a [`MockResponse`] for a request from a descriptor.
///
/// The descriptor is expected to be materialized already: its body holds
/// the bytes to send and any body file has been loaded by the provider.
pub struct ResponseBuilder<'a> {
    request: &'a Request<Body>,
    descriptor: &'a ResponseDescriptor,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(request: &'a Request<Body>, descriptor: &'a ResponseDescriptor) -> Self {
        Self {
            request,
            descriptor,
        }
    }

    pub fn build(self) -> Result<MockResponse, InterceptError> {
        let code = self.descriptor.code;
        let reason = reason_phrase(code).ok_or(InterceptError::UnknownStatus(code))?;

        Ok(MockResponse {
            method: self.request.method().clone(),
            uri: self.request.uri().clone(),
            status: code,
            version: Version::HTTP_11,
            reason: reason.to_string(),
            headers: self.headers()?,
            body: self.descriptor.body.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, InterceptError> {
        let mut headers = HeaderMap::new();
        let content_type = HeaderValue::from_str(&self.descriptor.media_type).map_err(|_| {
            InterceptError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
            }
        })?;
        headers.insert(CONTENT_TYPE, content_type);

        for header in &self.descriptor.headers {
            let Some(value) = &header.value else {
                continue;
            };
            let invalid = || InterceptError::InvalidHeader {
                name: header.name.clone(),
            };
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            headers.append(name, value);
        }
        Ok(headers)
    }
}
