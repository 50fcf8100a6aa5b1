//! The interceptor: decides per request whether to mock, forward, or both.

use crate::config::InterceptorConfig;
use crate::error::InterceptError;
use crate::loader::{DirectoryLoader, LoadFile};
use crate::mapper::{JsonMapper, Mapper};
use crate::model::{RequestResult, ResponseDescriptor};
use crate::policy::{FilingPolicy, MirrorPathPolicy};
use crate::provider::{DynamicMockProvider, ScenarioProvider, StaticMockProvider};
use crate::response::{effective_delay, not_found, MockResponse, ResponseBuilder};
use crate::Body;
use http::Request;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tracing::{debug, info, warn};

/// Interception mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every request goes to the network untouched
    #[default]
    Disabled,
    /// Every request is answered from scenarios, unmatched ones with a 404
    Enabled,
    /// Scenarios first, the network for anything unmatched
    Mixed,
}

impl Mode {
    fn as_u8(self) -> u8 {
        match self {
            Mode::Disabled => 0,
            Mode::Enabled => 1,
            Mode::Mixed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Mode::Enabled,
            2 => Mode::Mixed,
            _ => Mode::Disabled,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Disabled => "disabled",
            Mode::Enabled => "enabled",
            Mode::Mixed => "mixed",
        })
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" => Ok(Mode::Disabled),
            "enabled" => Ok(Mode::Enabled),
            "mixed" => Ok(Mode::Mixed),
            other => Err(format!("Unknown interception mode: {}", other)),
        }
    }
}

/// The real network call.
pub trait Transport {
    fn proceed(&self, request: Request<Body>) -> io::Result<MockResponse>;
}

impl<F> Transport for F
where
    F: Fn(Request<Body>) -> io::Result<MockResponse>,
{
    fn proceed(&self, request: Request<Body>) -> io::Result<MockResponse> {
        self(request)
    }
}

/// Intercepts outgoing requests and answers them from scenario providers.
///
/// Mode and delay can be changed at any time from any thread; each request
/// reads them once when it starts. The two settings are independent, so
/// concurrent writers are last-writer-wins per field.
pub struct MockInterceptor {
    providers: Vec<Box<dyn ScenarioProvider>>,
    mode: AtomicU8,
    /// Global fake network delay in milliseconds
    delay: AtomicU64,
}

impl MockInterceptor {
    pub fn builder() -> InterceptorBuilder {
        InterceptorBuilder::default()
    }

    /// Interceptor reading scenario files from the configured directory.
    pub fn from_config(config: &InterceptorConfig) -> Self {
        let loader = DirectoryLoader::new(&config.root);
        let policy = config.policy.clone();
        let mapper = config.format.mapper();

        info!(
            root = %config.root.display(),
            mode = %config.mode,
            delay_ms = config.delay_ms,
            format = ?config.format,
            "Mock interceptor initialized"
        );

        Self::builder()
            .decode_scenario_path_with(policy)
            .load_file_with(loader)
            .parse_scenarios_with(mapper)
            .set_interceptor_status(config.mode)
            .add_fake_network_delay(config.delay_ms)
            .build()
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.as_u8(), Ordering::Relaxed);
    }

    /// Global delay in milliseconds.
    pub fn delay(&self) -> u64 {
        self.delay.load(Ordering::Relaxed)
    }

    pub fn set_delay(&self, delay_ms: u64) {
        self.delay.store(delay_ms, Ordering::Relaxed);
    }

    /// Handle one outgoing request.
    pub fn intercept(
        &self,
        request: Request<Body>,
        transport: &dyn Transport,
    ) -> Result<MockResponse, InterceptError> {
        match self.mode() {
            Mode::Disabled => Ok(transport.proceed(request)?),
            Mode::Enabled => match self.mock_response(&request)? {
                Some(response) => Ok(response),
                None => {
                    debug!(uri = %request.uri(), "No scenario matched, answering 404");
                    ResponseBuilder::new(&request, &not_found()).build()
                }
            },
            Mode::Mixed => match self.mock_response(&request)? {
                Some(response) => Ok(response),
                None => {
                    debug!(uri = %request.uri(), "No scenario matched, forwarding request");
                    Ok(transport.proceed(request)?)
                }
            },
        }
    }

    fn mock_response(
        &self,
        request: &Request<Body>,
    ) -> Result<Option<MockResponse>, InterceptError> {
        let Some(descriptor) = self.load_response(request)? else {
            return Ok(None);
        };

        if let Some(delay) = effective_delay(descriptor.delay, self.delay()) {
            debug!(delay_ms = delay.as_millis() as u64, "Applying delay");
            std::thread::sleep(delay);
        }

        ResponseBuilder::new(request, &descriptor).build().map(Some)
    }

    fn load_response(&self, request: &Request<Body>) -> io::Result<Option<ResponseDescriptor>> {
        for provider in &self.providers {
            if let Some(response) = provider.load_response(request)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

struct BoxedPolicy(Box<dyn FilingPolicy>);

impl FilingPolicy for BoxedPolicy {
    fn get_path(&self, request: &Request<Body>) -> String {
        self.0.get_path(request)
    }
}

struct BoxedLoader(Box<dyn LoadFile>);

impl LoadFile for BoxedLoader {
    fn load(&self, path: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.0.load(path)
    }
}

/// Assembles a [`MockInterceptor`].
///
/// Scenario files are served once a loader is given. The filing policy
/// defaults to [`MirrorPathPolicy`] and the mapper to [`JsonMapper`]. The
/// scenario file provider is consulted first, then providers added with
/// [`add_provider`](Self::add_provider), then dynamic mocks.
#[derive(Default)]
pub struct InterceptorBuilder {
    filing_policy: Option<Box<dyn FilingPolicy>>,
    loader: Option<Box<dyn LoadFile>>,
    mapper: Option<Box<dyn Mapper>>,
    providers: Vec<Box<dyn ScenarioProvider>>,
    dynamic: DynamicMockProvider,
    mode: Mode,
    delay: u64,
}

impl InterceptorBuilder {
    /// Locate the scenario file for a request with `filing_policy`.
    pub fn decode_scenario_path_with(mut self, filing_policy: impl FilingPolicy + 'static) -> Self {
        self.filing_policy = Some(Box::new(filing_policy));
        self
    }

    /// Read scenario and body files through `loader`.
    pub fn load_file_with(mut self, loader: impl LoadFile + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Parse scenario files with `mapper`.
    pub fn parse_scenarios_with(mut self, mapper: impl Mapper + 'static) -> Self {
        self.mapper = Some(Box::new(mapper));
        self
    }

    /// Answer requests through a callback. Callbacks are consulted in order,
    /// after every other provider.
    pub fn use_dynamic_mocks<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Request<Body>) -> Option<RequestResult> + Send + Sync + 'static,
    {
        self.dynamic = self.dynamic.with_callback(callback);
        self
    }

    /// Add a provider; providers are consulted in the order they were added.
    pub fn add_provider(mut self, provider: impl ScenarioProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn set_interceptor_status(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Global delay in milliseconds applied to mocked responses without their own delay.
    pub fn add_fake_network_delay(mut self, delay_ms: u64) -> Self {
        self.delay = delay_ms;
        self
    }

    pub fn build(self) -> MockInterceptor {
        let mut providers: Vec<Box<dyn ScenarioProvider>> = Vec::new();
        match self.loader {
            Some(loader) => {
                let filing_policy = self
                    .filing_policy
                    .unwrap_or_else(|| Box::new(MirrorPathPolicy::default()));
                let mapper = self.mapper.unwrap_or_else(|| Box::new(JsonMapper));
                providers.push(Box::new(StaticMockProvider::new(
                    BoxedPolicy(filing_policy),
                    BoxedLoader(loader),
                    mapper,
                )));
            }
            None if self.filing_policy.is_some() || self.mapper.is_some() => {
                warn!("Scenario files need a loader, filing policy and mapper ignored");
            }
            None => {}
        }
        providers.extend(self.providers);
        if !self.dynamic.is_empty() {
            providers.push(Box::new(self.dynamic));
        }
        MockInterceptor {
            providers,
            mode: AtomicU8::new(self.mode.as_u8()),
            delay: AtomicU64::new(self.delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use crate::loader::InMemoryLoader;
    use crate::mapper::YamlMapper;
    use crate::model::NetworkError;
    use crate::policy::SingleFilePolicy;
    use http::{HeaderMap, Version};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const SCENARIO: &str = r#"[
        { "request": { "method": "GET", "params": { "slow": "yes" } },
          "response": { "code": 200, "delay": 50, "body": "slow" } },
        { "request": { "method": "GET" },
          "response": { "code": 200, "media-type": "application/json", "body": "[1, 2]" } },
        { "request": { "method": "DELETE" },
          "error": { "type": "timed_out", "message": "timeout" } },
        { "request": { "method": "PATCH" },
          "response": { "code": 299 } }
    ]"#;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Vec::new())
            .unwrap()
    }

    fn interceptor(mode: Mode) -> MockInterceptor {
        MockInterceptor::builder()
            .decode_scenario_path_with(SingleFilePolicy::new("api/users.json"))
            .load_file_with(InMemoryLoader::new().with_file("api/users.json", SCENARIO))
            .parse_scenarios_with(JsonMapper)
            .set_interceptor_status(mode)
            .build()
    }

    /// Transport that counts calls and answers 200 "network".
    struct CountingTransport {
        calls: AtomicUsize,
    }

    impl CountingTransport {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for CountingTransport {
        fn proceed(&self, request: Request<Body>) -> io::Result<MockResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut headers = HeaderMap::new();
            headers.insert("x-real", "1".parse().unwrap());
            Ok(MockResponse {
                method: request.method().clone(),
                uri: request.uri().clone(),
                status: 200,
                version: Version::HTTP_2,
                reason: "OK".to_string(),
                headers,
                body: b"network".to_vec(),
            })
        }
    }

    /// Provider that counts how often it is asked.
    struct CountingProvider(Arc<AtomicUsize>);

    impl ScenarioProvider for CountingProvider {
        fn load_response(
            &self,
            _request: &Request<Body>,
        ) -> io::Result<Option<ResponseDescriptor>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Some(ResponseDescriptor::new(200, "mocked")))
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("mixed".parse::<Mode>().unwrap(), Mode::Mixed);
        assert_eq!("ENABLED".parse::<Mode>().unwrap(), Mode::Enabled);
        assert!("sometimes".parse::<Mode>().is_err());
        assert_eq!(Mode::default(), Mode::Disabled);
        assert_eq!(Mode::Mixed.to_string(), "mixed");
    }

    #[test]
    fn test_enabled_answers_from_scenario() {
        let interceptor = interceptor(Mode::Enabled);
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.version, Version::HTTP_11);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.text(), "[1, 2]");
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_enabled_without_match_is_404() {
        let interceptor = interceptor(Mode::Enabled);
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("POST", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Not Found");
        assert_eq!(response.text(), "Page not found");
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_enabled_without_scenario_file_is_404() {
        let interceptor = MockInterceptor::builder()
            .decode_scenario_path_with(MirrorPathPolicy::default())
            .load_file_with(InMemoryLoader::new())
            .parse_scenarios_with(JsonMapper)
            .set_interceptor_status(Mode::Enabled)
            .build();
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "Page not found");
    }

    #[test]
    fn test_loader_alone_defaults_to_mirror_path_and_json() {
        let interceptor = MockInterceptor::builder()
            .load_file_with(InMemoryLoader::new().with_file("api.test/users.json", SCENARIO))
            .set_interceptor_status(Mode::Enabled)
            .build();
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.text(), "[1, 2]");
    }

    #[test]
    fn test_custom_mapper_replaces_json_default() {
        let yaml = "- request: {}\n  response:\n    code: 202\n";
        let interceptor = MockInterceptor::builder()
            .load_file_with(InMemoryLoader::new().with_file("api.test/users.yaml", yaml))
            .decode_scenario_path_with(MirrorPathPolicy::new("yaml"))
            .parse_scenarios_with(YamlMapper)
            .set_interceptor_status(Mode::Enabled)
            .build();
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.status, 202);
    }

    #[test]
    fn test_policy_without_loader_serves_no_scenarios() {
        let interceptor = MockInterceptor::builder()
            .decode_scenario_path_with(SingleFilePolicy::new("api/users.json"))
            .set_interceptor_status(Mode::Mixed)
            .build();
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.text(), "network");
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn test_mixed_without_match_forwards_once() {
        let interceptor = interceptor(Mode::Mixed);
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("POST", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(response.version, Version::HTTP_2);
        assert_eq!(response.header("x-real"), Some("1"));
        assert_eq!(response.text(), "network");
    }

    #[test]
    fn test_mixed_with_match_does_not_forward() {
        let interceptor = interceptor(Mode::Mixed);
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(response.text(), "[1, 2]");
        assert_eq!(transport.calls(), 0);
    }

    #[test]
    fn test_disabled_never_consults_providers() {
        let asked = Arc::new(AtomicUsize::new(0));
        let interceptor = MockInterceptor::builder()
            .add_provider(CountingProvider(asked.clone()))
            .build();
        let transport = CountingTransport::new();

        let response = interceptor
            .intercept(request("GET", "http://api.test/"), &transport)
            .unwrap();
        assert_eq!(response.text(), "network");
        assert_eq!(asked.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls(), 1);

        interceptor.set_mode(Mode::Enabled);
        let response = interceptor
            .intercept(request("GET", "http://api.test/"), &transport)
            .unwrap();
        assert_eq!(response.text(), "mocked");
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_simulated_error_in_every_mocking_mode() {
        for mode in [Mode::Enabled, Mode::Mixed] {
            let interceptor = interceptor(mode);
            let transport = CountingTransport::new();

            let err = interceptor
                .intercept(request("DELETE", "http://api.test/users"), &transport)
                .unwrap_err();
            match err {
                InterceptError::Network(e) => {
                    assert_eq!(e.kind(), io::ErrorKind::TimedOut);
                    assert_eq!(e.to_string(), "timeout");
                }
                other => panic!("Expected network error, got {:?}", other),
            }
            assert_eq!(transport.calls(), 0);
        }
    }

    #[test]
    fn test_transport_failure_propagates() {
        let interceptor = interceptor(Mode::Disabled);
        let transport = |_: Request<Body>| -> io::Result<MockResponse> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        };

        let err = interceptor
            .intercept(request("GET", "http://api.test/"), &transport)
            .unwrap_err();
        match err {
            InterceptError::Network(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionRefused),
            other => panic!("Expected network error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_status_is_fatal() {
        let interceptor = interceptor(Mode::Enabled);
        let transport = CountingTransport::new();

        let err = interceptor
            .intercept(request("PATCH", "http://api.test/users"), &transport)
            .unwrap_err();
        assert!(matches!(err, InterceptError::UnknownStatus(299)));
    }

    #[test]
    fn test_response_delay_wins_over_global_delay() {
        let interceptor = interceptor(Mode::Enabled);
        interceptor.set_delay(400);
        let transport = CountingTransport::new();

        let start = Instant::now();
        let response = interceptor
            .intercept(request("GET", "http://api.test/users?slow=yes"), &transport)
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(response.text(), "slow");
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[test]
    fn test_global_delay_applies_without_response_delay() {
        let interceptor = MockInterceptor::builder()
            .use_dynamic_mocks(|_| Some(ResponseDescriptor::new(200, "ok").into()))
            .set_interceptor_status(Mode::Enabled)
            .add_fake_network_delay(20)
            .build();
        assert_eq!(interceptor.delay(), 20);
        let transport = CountingTransport::new();

        let start = Instant::now();
        interceptor
            .intercept(request("GET", "http://api.test/"), &transport)
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_providers_consulted_in_order() {
        let interceptor = MockInterceptor::builder()
            .decode_scenario_path_with(SingleFilePolicy::new("api/users.json"))
            .load_file_with(InMemoryLoader::new().with_file("api/users.json", SCENARIO))
            .parse_scenarios_with(JsonMapper)
            .use_dynamic_mocks(|_| Some(ResponseDescriptor::new(201, "dynamic").into()))
            .use_dynamic_mocks(|_| {
                Some(NetworkError::new(NetworkErrorKind::ConnectionReset, None).into())
            })
            .set_interceptor_status(Mode::Enabled)
            .build();
        let transport = CountingTransport::new();

        let from_file = interceptor
            .intercept(request("GET", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(from_file.text(), "[1, 2]");

        let from_callback = interceptor
            .intercept(request("POST", "http://api.test/users"), &transport)
            .unwrap();
        assert_eq!(from_callback.status, 201);
        assert_eq!(from_callback.text(), "dynamic");
    }

    #[test]
    fn test_mode_and_delay_are_shared_across_threads() {
        let interceptor = Arc::new(interceptor(Mode::Disabled));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let interceptor = interceptor.clone();
                scope.spawn(move || {
                    let transport = CountingTransport::new();
                    interceptor
                        .intercept(request("GET", "http://api.test/users"), &transport)
                        .unwrap();
                });
            }
            interceptor.set_mode(Mode::Mixed);
            interceptor.set_delay(5);
        });

        assert_eq!(interceptor.mode(), Mode::Mixed);
        assert_eq!(interceptor.delay(), 5);
    }
}
