//! HTTP Scenario Mock
//!
//! Intercepts outgoing HTTP requests and answers them from declarative
//! scenario files instead of the network. Built for tests that need
//! reproducible responses.
//!
//! # Features
//!
//! - **Request Matching**: Match by method, headers, query params, and a full-body regex
//! - **Canned Responses**: Status, headers, media type, inline or file-based bodies
//! - **Failure Simulation**: Fail requests with registered network error kinds
//! - **Latency Simulation**: Per-response or global fake network delay
//! - **Interception Modes**: Disabled, enabled, or mixed with network fallback
//!
//! # Example Scenario
//!
//! ```json
//! [
//!   {
//!     "request": { "method": "GET", "params": { "page": "1" } },
//!     "response": {
//!       "code": 200,
//!       "media-type": "application/json",
//!       "body-file": "bodies/page1.json"
//!     }
//!   },
//!   {
//!     "request": { "method": "DELETE" },
//!     "error": { "type": "timed_out", "message": "timeout" }
//!   }
//! ]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use http_scenario_mock::{
//!     DirectoryLoader, JsonMapper, MirrorPathPolicy, MockInterceptor, MockResponse, Mode,
//! };
//! use http::Request;
//!
//! let interceptor = MockInterceptor::builder()
//!     .decode_scenario_path_with(MirrorPathPolicy::default())
//!     .load_file_with(DirectoryLoader::new("scenarios"))
//!     .parse_scenarios_with(JsonMapper)
//!     .set_interceptor_status(Mode::Mixed)
//!     .build();
//!
//! let network = |_request: Request<Vec<u8>>| -> std::io::Result<MockResponse> {
//!     Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "offline"))
//! };
//! let request = Request::get("http://api.test/users").body(Vec::new()).unwrap();
//! let response = interceptor.intercept(request, &network).unwrap();
//! println!("{} {}", response.status, response.text());
//! ```

pub mod config;
pub mod error;
pub mod interceptor;
pub mod loader;
pub mod mapper;
pub mod matcher;
pub mod model;
pub mod policy;
pub mod provider;
pub mod response;

/// Body of captured requests and synthesized responses.
pub type Body = Vec<u8>;

pub use config::InterceptorConfig;
pub use error::{InterceptError, NetworkErrorKind};
pub use interceptor::{InterceptorBuilder, MockInterceptor, Mode, Transport};
pub use loader::{DirectoryLoader, InMemoryLoader, LoadFile};
pub use mapper::{JsonMapper, Mapper, ScenarioFormat, YamlMapper};
pub use model::{Matcher, NetworkError, RequestDescriptor, RequestResult, ResponseDescriptor};
pub use policy::{FilingPolicy, MirrorPathPolicy, SingleFilePolicy};
pub use provider::{DynamicMockProvider, ScenarioProvider, StaticMockProvider};
pub use response::MockResponse;
