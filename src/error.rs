//! Error types and the registry of simulated network failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::str::FromStr;
use thiserror::Error;

/// Errors surfaced to the caller of the interceptor.
#[derive(Debug, Error)]
pub enum InterceptError {
    /// A network failure, either real (from the transport) or simulated by a scenario.
    #[error(transparent)]
    Network(#[from] io::Error),

    /// The scenario asked for a status code with no standard reason phrase.
    #[error("Unknown HTTP status code: {0}")]
    UnknownStatus(u16),

    /// A response header could not be represented on the wire.
    #[error("Invalid response header: {name}")]
    InvalidHeader { name: String },
}

/// Registered network failure kinds a scenario may simulate.
///
/// Identifiers are accepted in snake case (`timed_out`) or as the fully
/// qualified kind path (`std::io::ErrorKind::TimedOut`). Anything else is
/// rejected when the scenario file is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkErrorKind {
    TimedOut,
    ConnectionRefused,
    ConnectionReset,
    ConnectionAborted,
    NotConnected,
    AddrNotAvailable,
    BrokenPipe,
    UnexpectedEof,
    Interrupted,
    Other,
}

const REGISTRY: &[(&str, &str, NetworkErrorKind, io::ErrorKind)] = &[
    ("timed_out", "TimedOut", NetworkErrorKind::TimedOut, io::ErrorKind::TimedOut),
    (
        "connection_refused",
        "ConnectionRefused",
        NetworkErrorKind::ConnectionRefused,
        io::ErrorKind::ConnectionRefused,
    ),
    (
        "connection_reset",
        "ConnectionReset",
        NetworkErrorKind::ConnectionReset,
        io::ErrorKind::ConnectionReset,
    ),
    (
        "connection_aborted",
        "ConnectionAborted",
        NetworkErrorKind::ConnectionAborted,
        io::ErrorKind::ConnectionAborted,
    ),
    (
        "not_connected",
        "NotConnected",
        NetworkErrorKind::NotConnected,
        io::ErrorKind::NotConnected,
    ),
    (
        "addr_not_available",
        "AddrNotAvailable",
        NetworkErrorKind::AddrNotAvailable,
        io::ErrorKind::AddrNotAvailable,
    ),
    ("broken_pipe", "BrokenPipe", NetworkErrorKind::BrokenPipe, io::ErrorKind::BrokenPipe),
    (
        "unexpected_eof",
        "UnexpectedEof",
        NetworkErrorKind::UnexpectedEof,
        io::ErrorKind::UnexpectedEof,
    ),
    ("interrupted", "Interrupted", NetworkErrorKind::Interrupted, io::ErrorKind::Interrupted),
    ("other", "Other", NetworkErrorKind::Other, io::ErrorKind::Other),
];

const QUALIFIED_PREFIX: &str = "std::io::ErrorKind::";

impl NetworkErrorKind {
    /// Identifier used in scenario files.
    pub fn as_str(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, _, kind, _)| *kind == self)
            .map(|(short, _, _, _)| *short)
            .unwrap_or("other")
    }

    /// The I/O error kind raised to the caller.
    pub fn io_kind(self) -> io::ErrorKind {
        REGISTRY
            .iter()
            .find(|(_, _, kind, _)| *kind == self)
            .map(|(_, _, _, io_kind)| *io_kind)
            .unwrap_or(io::ErrorKind::Other)
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier that is not in the registry.
#[derive(Debug, Error)]
#[error("Unregistered network error type: {0}")]
pub struct UnknownErrorKind(pub String);

impl FromStr for NetworkErrorKind {
    type Err = UnknownErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let qualified = name.strip_prefix(QUALIFIED_PREFIX);
        REGISTRY
            .iter()
            .find(|(short, variant, _, _)| match qualified {
                Some(q) => q == *variant,
                None => name == *short,
            })
            .map(|(_, _, kind, _)| *kind)
            .ok_or_else(|| UnknownErrorKind(s.to_string()))
    }
}

impl TryFrom<String> for NetworkErrorKind {
    type Error = UnknownErrorKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkErrorKind> for String {
    fn from(kind: NetworkErrorKind) -> Self {
        kind.as_str().to_string()
    }
}
