//! Service discovery
//!
//! Remote clients resolve a service name into a `host:port` address right
//! before every request, so addresses may change while the process runs.

use std::collections::HashMap;

use thiserror::Error;

use crate::protocol::BoxError;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("service {0:?} not found")]
    NotFound(String),

    #[error("error discovering service {name:?} :: {source}")]
    Lookup {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// Resolves service names into `host:port` addresses.
pub trait Discoverer: Send + Sync {
    fn discover(&self, name: &str) -> Result<String, DiscoveryError>;
}

/// A fixed name to address table.
///
/// # Example
///
/// ```
/// use nanorpc_common::discovery::{Discoverer, StaticDiscoverer};
///
/// let discoverer = StaticDiscoverer::new().with("svc1", "127.0.0.1:8000");
/// assert_eq!(discoverer.discover("svc1").unwrap(), "127.0.0.1:8000");
/// assert!(discoverer.discover("svc2").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    addrs: HashMap<String, String>,
}

impl StaticDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, addr: impl Into<String>) -> Self {
        self.insert(name, addr);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, addr: impl Into<String>) {
        self.addrs.insert(name.into(), addr.into());
    }
}

impl<N, A> FromIterator<(N, A)> for StaticDiscoverer
where
    N: Into<String>,
    A: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        Self {
            addrs: iter
                .into_iter()
                .map(|(name, addr)| (name.into(), addr.into()))
                .collect(),
        }
    }
}

impl Discoverer for StaticDiscoverer {
    fn discover(&self, name: &str) -> Result<String, DiscoveryError> {
        self.addrs
            .get(name)
            .cloned()
            .ok_or_else(|| DiscoveryError::NotFound(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_discoverer_not_found() {
        let discoverer: StaticDiscoverer = [("svc1", "localhost:8000")].into_iter().collect();
        assert_eq!(discoverer.discover("svc1").unwrap(), "localhost:8000");
        assert!(matches!(
            discoverer.discover("svc9"),
            Err(DiscoveryError::NotFound(ref name)) if name == "svc9"
        ));
    }
}
