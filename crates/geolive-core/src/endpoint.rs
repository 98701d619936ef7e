//! Remote channel addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::EndpointError;

/// WebSocket scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain `ws://`.
    #[default]
    Ws,
    /// TLS `wss://`.
    Wss,
}

impl Scheme {
    /// URL prefix without the `://`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }

    /// Port used when a URL omits one.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ws => 80,
            Self::Wss => 443,
        }
    }
}

/// Fixed address of one remote channel: host, port, and logical path.
///
/// Bound when a dispatcher is built and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    /// Build an endpoint. A missing leading `/` on `path` is added.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16, path: &str) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            path: normalize_path(path),
        }
    }

    /// Shorthand for a plain `ws://` endpoint.
    pub fn ws(host: impl Into<String>, port: u16, path: &str) -> Self {
        Self::new(Scheme::Ws, host, port, path)
    }

    /// Scheme of this endpoint.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Logical path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full URL, e.g. `ws://127.0.0.1:8000/countries`.
    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = self.scheme.as_str();
        if self.host.contains(':') {
            write!(f, "{scheme}://[{}]:{}{}", self.host, self.port, self.path)
        } else {
            write!(f, "{scheme}://{}:{}{}", self.host, self.port, self.path)
        }
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| EndpointError::InvalidScheme(s.to_owned()))?;
        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            other => return Err(EndpointError::InvalidScheme(other.to_owned())),
        };

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        // IPv6 literals are bracketed: `[::1]:8000`.
        let (host, port) = match authority.strip_prefix('[') {
            Some(bracketed) => {
                let (host, rest) = bracketed
                    .split_once(']')
                    .ok_or_else(|| EndpointError::MissingHost(s.to_owned()))?;
                match rest.strip_prefix(':') {
                    Some(port) => (host, parse_port(port)?),
                    None if rest.is_empty() => (host, scheme.default_port()),
                    None => return Err(EndpointError::InvalidPort(rest.to_owned())),
                }
            }
            None => match authority.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port)?),
                None => (authority, scheme.default_port()),
            },
        };
        if host.is_empty() {
            return Err(EndpointError::MissingHost(s.to_owned()));
        }

        Ok(Self::new(scheme, host, port, path))
    }
}

fn parse_port(port: &str) -> Result<u16, EndpointError> {
    port.parse::<u16>()
        .map_err(|_| EndpointError::InvalidPort(port.to_owned()))
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}
