//! Daemon address parsing.
//!
//! Accepted forms:
//! - `host`, `host:port`, `[v6addr]:port` - TCP
//! - `/absolute/path` - Unix Domain Socket
//!
//! [`Endpoint::from_env`] follows the `MPD_HOST` / `MPD_PORT` conventions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MpcError;

/// Default daemon host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default daemon port.
pub const DEFAULT_PORT: u16 = 6600;

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Endpoint {
    /// TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Unix socket endpoint.
    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Endpoint::Unix(path.into())
    }

    /// Resolve from `MPD_HOST` and `MPD_PORT`, falling back to
    /// `localhost:6600`.
    pub fn from_env() -> Result<Self, MpcError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MpcError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("MPD_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| MpcError::InvalidEndpoint(format!("Invalid MPD_PORT: {:?}", raw)))?,
            None => DEFAULT_PORT,
        };

        let Some(host) = lookup("MPD_HOST").filter(|h| !h.is_empty()) else {
            return Ok(Endpoint::tcp(DEFAULT_HOST, port));
        };

        // `password@host`: passwords are not handled here
        let host = match host.find('@') {
            Some(at) if at > 0 => host[at + 1..].to_string(),
            _ => host,
        };

        if host.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(host)));
        }

        let mut endpoint: Endpoint = host.parse()?;
        if let Endpoint::Tcp { port: p, .. } = &mut endpoint {
            if !host_has_port(&host) {
                *p = port;
            }
        }
        Ok(endpoint)
    }
}

fn host_has_port(s: &str) -> bool {
    match s.strip_prefix('[') {
        Some(rest) => rest.contains("]:"),
        None => s.matches(':').count() == 1,
    }
}

impl FromStr for Endpoint {
    type Err = MpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MpcError::InvalidEndpoint(format!("Invalid endpoint: {:?}", s));

        if s.is_empty() {
            return Err(invalid());
        }
        if s.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(s)));
        }

        // [v6]:port or [v6]
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port.parse().map_err(|_| invalid())?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(invalid()),
            };
            return Ok(Endpoint::tcp(host, port));
        }

        // a bare IPv6 address has several colons and no port
        if s.matches(':').count() > 1 {
            return Ok(Endpoint::tcp(s, DEFAULT_PORT));
        }

        match s.split_once(':') {
            Some((host, port)) if !host.is_empty() => {
                Ok(Endpoint::tcp(host, port.parse().map_err(|_| invalid())?))
            }
            Some(_) => Err(invalid()),
            None => Ok(Endpoint::tcp(s, DEFAULT_PORT)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::tcp(DEFAULT_HOST, DEFAULT_PORT)
    }
}
