//! Resolver capability.
//!
//! The dispatch loop does not speak DNS itself. It calls a [`Resolve`]
//! implementation per domain and treats any failure as opaque. Two backends
//! are provided:
//!
//! - [`SystemResolver`]: the operating system's resolver (`getaddrinfo`),
//!   honouring `/etc/hosts`, `nsswitch.conf` and friends
//! - [`HickoryResolver`]: a fully async resolver built on hickory-dns,
//!   configured from the system's `resolv.conf`

use crate::error::BulkDnsError;
use hickory_resolver::{
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
    TokioResolver,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

/// Future returned by [`Resolve::resolve`].
pub type Resolving = Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, BulkDnsError>> + Send>>;

/// Address lookup for a single name.
///
/// The returned future owns everything it needs so it can be moved into a
/// spawned task.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &str) -> Resolving;
}

/// Resolver using the operating system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for SystemResolver {
    fn resolve(&self, name: &str) -> Resolving {
        let domain = name.to_string();
        Box::pin(async move {
            tracing::debug!(domain = %domain, "resolving via getaddrinfo");

            let addrs = tokio::net::lookup_host((domain.as_str(), 0))
                .await
                .map_err(|e| BulkDnsError::resolution(&domain, e.to_string()))?;

            // getaddrinfo repeats an address once per socket type
            let mut ips: Vec<IpAddr> = Vec::new();
            for addr in addrs {
                let ip = addr.ip();
                if !ips.contains(&ip) {
                    ips.push(ip);
                }
            }

            if ips.is_empty() {
                return Err(BulkDnsError::resolution(&domain, "no addresses returned"));
            }
            Ok(ips)
        })
    }
}

/// Async resolver backed by hickory-dns.
///
/// Cloning is cheap; clones share the same connection pool and cache.
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    /// Build from the system DNS configuration, falling back to defaults.
    pub fn new() -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => builder,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read system DNS config, using defaults");
                TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            }
        };

        builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;

        Self {
            resolver: builder.build(),
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for HickoryResolver {
    fn resolve(&self, name: &str) -> Resolving {
        let resolver = self.resolver.clone();
        let domain = name.to_string();
        Box::pin(async move {
            tracing::debug!(domain = %domain, "resolving via hickory-dns");

            let lookup = resolver
                .lookup_ip(domain.as_str())
                .await
                .map_err(|e| BulkDnsError::resolution(&domain, e.to_string()))?;

            let ips: Vec<IpAddr> = lookup.iter().collect();
            if ips.is_empty() {
                return Err(BulkDnsError::resolution(&domain, "no addresses returned"));
            }
            Ok(ips)
        })
    }
}

/// Which resolver backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Operating system resolver (default)
    #[default]
    System,

    /// hickory-dns async resolver
    Hickory,
}

impl ResolverKind {
    /// Instantiate the selected backend.
    pub fn build(self) -> Arc<dyn Resolve> {
        match self {
            ResolverKind::System => Arc::new(SystemResolver::new()),
            ResolverKind::Hickory => Arc::new(HickoryResolver::new()),
        }
    }
}

impl FromStr for ResolverKind {
    type Err = BulkDnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" | "os" | "getaddrinfo" => Ok(ResolverKind::System),
            "hickory" => Ok(ResolverKind::Hickory),
            other => Err(BulkDnsError::config(format!(
                "Unknown resolver '{}', use 'system' or 'hickory'",
                other
            ))),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverKind::System => write!(f, "system"),
            ResolverKind::Hickory => write!(f, "hickory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_resolver_kind_parsing() {
        assert_eq!("system".parse::<ResolverKind>().unwrap(), ResolverKind::System);
        assert_eq!("HICKORY".parse::<ResolverKind>().unwrap(), ResolverKind::Hickory);
        assert_eq!(" os ".parse::<ResolverKind>().unwrap(), ResolverKind::System);
        assert!("bind".parse::<ResolverKind>().is_err());
        assert_eq!(ResolverKind::default(), ResolverKind::System);
        assert_eq!(ResolverKind::Hickory.to_string(), "hickory");
    }

    #[tokio::test]
    async fn test_system_resolver_ip_literal() {
        let resolver = SystemResolver::new();
        let ips = resolver.resolve("127.0.0.1").await.unwrap();
        assert_eq!(ips, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }

    #[tokio::test]
    async fn test_system_resolver_localhost() {
        let resolver = SystemResolver::new();
        let ips = resolver.resolve("localhost").await.unwrap();

        assert!(!ips.is_empty());
        assert!(ips.iter().all(|ip| ip.is_loopback()));

        let mut deduped = ips.clone();
        deduped.dedup();
        assert_eq!(ips.len(), deduped.len());
    }
}
