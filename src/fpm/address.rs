//! Listen specification resolution.
//!
//! php-fpm accepts three `listen` syntaxes: `ip.add.re.ss:port`, a bare
//! `port`, or `/path/to/unix/socket`. [`resolve`] maps a listen string to the
//! transport and target a client uses to reach the worker. Parsing is lenient:
//! malformed input yields a best-effort result, never an error.

use std::fmt::{Display, Formatter};

/// Transport used to reach the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// TCP socket (`host:port` or `:port`).
    Tcp,
    /// Unix domain socket at a filesystem path.
    Unix,
}

impl Network {
    /// Lowercase transport name, as used by dialers (`tcp` / `unix`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Unix => "unix",
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved transport and target for a listen specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenAddress {
    /// Transport kind.
    pub network: Network,
    /// `host:port`, `:port`, or a socket path.
    pub address: String,
}

impl ListenAddress {
    /// Address a client should connect to.
    ///
    /// A port-only TCP target (`:9000`) has no host; it is dialed on the
    /// loopback interface. All other targets are returned unchanged.
    #[must_use]
    pub fn dial_target(&self) -> String {
        match self.network {
            Network::Tcp if self.address.starts_with(':') => format!("127.0.0.1{}", self.address),
            _ => self.address.clone(),
        }
    }
}

impl Display for ListenAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.network, self.address)
    }
}

/// Resolve a listen specification into a [`ListenAddress`].
///
/// Rules, applied in order:
/// 1. A non-empty string of ASCII digits is a bare port: `tcp`, `":<port>"`.
/// 2. A string without `:` is a socket path: `unix`, unchanged.
/// 3. Otherwise split on the last `:`. An empty host gives `tcp`,
///    `":<port>"`; anything else gives `tcp` with the string unchanged.
#[must_use]
pub fn resolve(listen: &str) -> ListenAddress {
    if !listen.is_empty() && listen.bytes().all(|b| b.is_ascii_digit()) {
        return ListenAddress {
            network: Network::Tcp,
            address: format!(":{listen}"),
        };
    }

    match listen.rsplit_once(':') {
        None => ListenAddress {
            network: Network::Unix,
            address: listen.to_owned(),
        },
        Some(("", port)) => ListenAddress {
            network: Network::Tcp,
            address: format!(":{port}"),
        },
        Some(_) => ListenAddress {
            network: Network::Tcp,
            address: listen.to_owned(),
        },
    }
}
