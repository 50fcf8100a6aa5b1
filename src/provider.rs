//! Scenario providers.
//!
//! A provider answers an intercepted request with a [`ResponseDescriptor`],
//! declines with `None`, or fails the request with a simulated network error.

use crate::loader::LoadFile;
use crate::mapper::Mapper;
use crate::matcher::find_match;
use crate::model::{RequestResult, ResponseDescriptor};
use crate::policy::FilingPolicy;
use crate::Body;
use anyhow::Context;
use http::Request;
use std::io;
use tracing::{debug, error, info, warn};

/// Source of mocked responses.
pub trait ScenarioProvider: Send + Sync {
    /// Resolve a request.
    ///
    /// `Ok(None)` lets the interceptor fall through. `Err` is reserved for
    /// simulated network failures and must reach the caller unchanged.
    fn load_response(&self, request: &Request<Body>) -> io::Result<Option<ResponseDescriptor>>;
}

/// Answers requests from scenario files.
///
/// The scenario file is located by the filing policy, read through the
/// loader and parsed by the mapper on every request, so edits are picked up
/// by the next request.
pub struct StaticMockProvider<P, L, M> {
    filing_policy: P,
    loader: L,
    mapper: M,
}

impl<P, L, M> StaticMockProvider<P, L, M>
where
    P: FilingPolicy,
    L: LoadFile,
    M: Mapper,
{
    pub fn new(filing_policy: P, loader: L, mapper: M) -> Self {
        Self {
            filing_policy,
            loader,
            mapper,
        }
    }

    fn resolve(
        &self,
        path: &str,
        content: &[u8],
        request: &Request<Body>,
    ) -> anyhow::Result<Option<RequestResult>> {
        let entries = self
            .mapper
            .read_matches(content)
            .with_context(|| format!("Failed to parse scenario file {}", path))?;

        match find_match(&entries, request).map(|entry| &entry.result) {
            None => Ok(None),
            Some(RequestResult::Error(network_error)) => {
                Ok(Some(RequestResult::Error(network_error.clone())))
            }
            Some(RequestResult::Response(response)) => {
                let response = self.materialize(path, response.clone())?;
                Ok(Some(RequestResult::Response(response)))
            }
        }
    }

    /// Replace a body file reference with the file's content.
    ///
    /// A missing body file leaves the inline body in place.
    fn materialize(
        &self,
        scenario_path: &str,
        mut response: ResponseDescriptor,
    ) -> anyhow::Result<ResponseDescriptor> {
        let Some(body_file) = response.body_file.take() else {
            return Ok(response);
        };
        if !response.body.is_empty() {
            warn!(
                body_file = %body_file,
                "Response declares both an inline body and a body file, using the file"
            );
        }

        let path = relative_path(scenario_path, &body_file);
        info!(path = %path, "Loading response body from file");
        match self
            .loader
            .load(&path)
            .with_context(|| format!("Failed to load body file {}", path))?
        {
            Some(content) => response.body = content,
            None => warn!(path = %path, "Body file not found, using inline body"),
        }
        Ok(response)
    }
}

impl<P, L, M> ScenarioProvider for StaticMockProvider<P, L, M>
where
    P: FilingPolicy,
    L: LoadFile,
    M: Mapper,
{
    fn load_response(&self, request: &Request<Body>) -> io::Result<Option<ResponseDescriptor>> {
        let path = self.filing_policy.get_path(request);
        info!(path = %path, "Loading scenarios");

        let content = match self.loader.load(&path) {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(path = %path, "Scenario file not found");
                return Ok(None);
            }
            Err(e) if is_not_found(&e) => {
                debug!(path = %path, error = %e, "Scenario file not found");
                return Ok(None);
            }
            Err(e) => {
                error!(path = %path, error = %e, "Scenario file could not be loaded");
                return Ok(Some(diagnostic_response(&e)));
            }
        };

        match self.resolve(&path, &content, request) {
            Ok(Some(RequestResult::Response(response))) => {
                info!(path = %path, code = response.code, "Match found");
                Ok(Some(response))
            }
            Ok(Some(RequestResult::Error(network_error))) => {
                info!(
                    path = %path,
                    kind = %network_error.kind,
                    "Match found, simulating network error"
                );
                Err(network_error.to_io_error())
            }
            Ok(None) => {
                info!(path = %path, "No match for request");
                Ok(None)
            }
            Err(e) => {
                error!(path = %path, error = %e, "Scenario file could not be loaded");
                Ok(Some(diagnostic_response(&e)))
            }
        }
    }
}

/// Callback deciding the outcome of a request in code rather than in a file.
pub type RequestCallback = Box<dyn Fn(&Request<Body>) -> Option<RequestResult> + Send + Sync>;

/// Answers requests through callbacks, tried in registration order.
///
/// Body file references in callback results are not resolved; the inline
/// body is used.
#[derive(Default)]
pub struct DynamicMockProvider {
    callbacks: Vec<RequestCallback>,
}

impl DynamicMockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Request<Body>) -> Option<RequestResult> + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl ScenarioProvider for DynamicMockProvider {
    fn load_response(&self, request: &Request<Body>) -> io::Result<Option<ResponseDescriptor>> {
        match self.callbacks.iter().find_map(|callback| callback(request)) {
            Some(RequestResult::Response(response)) => {
                debug!(code = response.code, "Dynamic mock answered request");
                Ok(Some(response))
            }
            Some(RequestResult::Error(network_error)) => {
                debug!(kind = %network_error.kind, "Dynamic mock simulating network error");
                Err(network_error.to_io_error())
            }
            None => Ok(None),
        }
    }
}

/// Resolve `child` against the directory of `base`.
///
/// The last segment of `base` is dropped, the segments of `child` appended,
/// and every `..` removed together with the segment before it.
pub fn relative_path(base: &str, child: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').collect();
    segments.pop();
    for segment in child.split('/') {
        if segment == ".." {
            segments.pop();
        } else {
            segments.push(segment);
        }
    }
    segments.join("/")
}

fn is_not_found(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .map(|e| e.kind() == io::ErrorKind::NotFound)
            .unwrap_or(false)
    })
}

/// Name of the concrete error type at the root of the chain.
fn classify(error: &anyhow::Error) -> &'static str {
    let root = error.root_cause();
    if root.is::<serde_json::Error>() {
        "serde_json::Error"
    } else if root.is::<serde_yaml::Error>() {
        "serde_yaml::Error"
    } else if root.is::<io::Error>() {
        "std::io::Error"
    } else {
        "anyhow::Error"
    }
}

/// 404 response whose body describes a scenario loading failure.
///
/// The body carries the error type, message, cause chain, and a backtrace
/// when one was captured.
fn diagnostic_response(error: &anyhow::Error) -> ResponseDescriptor {
    ResponseDescriptor::new(404, format!("{}: {:?}", classify(error), error))
}
