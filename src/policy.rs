//! Filing policies: where the scenario file for a request lives.

use crate::Body;
use http::Request;

/// Derive the scenario file path for a request.
///
/// Must be deterministic: the same path is also the anchor for body files
/// referenced by the scenario.
pub trait FilingPolicy: Send + Sync {
    fn get_path(&self, request: &Request<Body>) -> String;
}

impl<F> FilingPolicy for F
where
    F: Fn(&Request<Body>) -> String + Send + Sync,
{
    fn get_path(&self, request: &Request<Body>) -> String {
        self(request)
    }
}

/// Every request uses the same scenario file.
#[derive(Debug, Clone)]
pub struct SingleFilePolicy {
    path: String,
}

impl SingleFilePolicy {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FilingPolicy for SingleFilePolicy {
    fn get_path(&self, _request: &Request<Body>) -> String {
        self.path.clone()
    }
}

/// Mirrors the request URL: `<host><path>.<extension>`.
///
/// A path ending in `/` maps to `index`, so `http://api.test/users/` becomes
/// `api.test/users/index.json`.
#[derive(Debug, Clone)]
pub struct MirrorPathPolicy {
    extension: String,
}

impl MirrorPathPolicy {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for MirrorPathPolicy {
    fn default() -> Self {
        Self::new("json")
    }
}

impl FilingPolicy for MirrorPathPolicy {
    fn get_path(&self, request: &Request<Body>) -> String {
        let uri = request.uri();
        let mut path = uri.path().to_string();
        if path.ends_with('/') {
            path.push_str("index");
        }
        let path = path.trim_start_matches('/');
        match uri.host() {
            Some(host) => format!("{}/{}.{}", host, path, self.extension),
            None => format!("{}.{}", path, self.extension),
        }
    }
}
