use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::lookup_host;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use crate::core::{Error, Result};

/// Highest team number that fits the `10.TE.AM.2` scheme
const MAX_SUBNET_TEAM: u32 = 25599;

/// Derives the robot host for a team
///
/// Implement this to plug in a site-specific naming scheme; the returned string
/// may be an IP literal or a hostname for the system resolver.
pub trait AddressResolver: fmt::Debug + Send + Sync {
    /// Returns the host the control packets are sent to
    fn target_host(&self, team: u32) -> String;
}

/// Built-in address strategies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TargetAddress {
    /// mDNS name `roboRIO-<team>-FRC.local`
    #[default]
    #[serde(rename = "roborio")]
    RoboRio,
    /// Static field address `10.TE.AM.2`
    TeamSubnet,
    /// Explicit host, ignoring the team number
    Literal { host: String },
}

impl TargetAddress {
    /// Checks the strategy can produce an address for `team`
    pub fn validate(&self, team: u32) -> Result<()> {
        match self {
            TargetAddress::TeamSubnet if team > MAX_SUBNET_TEAM => Err(Error::config(format!(
                "team {} does not fit a 10.TE.AM.2 address",
                team
            ))),
            TargetAddress::Literal { host } if host.trim().is_empty() => {
                Err(Error::config("literal target host is empty"))
            }
            _ => Ok(()),
        }
    }
}

impl AddressResolver for TargetAddress {
    fn target_host(&self, team: u32) -> String {
        match self {
            TargetAddress::RoboRio => format!("roboRIO-{}-FRC.local", team),
            TargetAddress::TeamSubnet => format!("10.{}.{}.2", team / 100, team % 100),
            TargetAddress::Literal { host } => host.clone(),
        }
    }
}

/// Resolves and caches the robot's socket address
///
/// Hostname lookups run on a spawned task so a slow or failing resolver never
/// holds up the caller; until the lookup completes `resolve` reports an error
/// and the caller skips that send.
#[derive(Debug)]
pub struct TargetResolver {
    resolver: Arc<dyn AddressResolver>,
    team: u32,
    port: u16,
    /// Upper bound on a single lookup
    limit: Duration,
    cached: Option<SocketAddr>,
    pending: Option<JoinHandle<Result<SocketAddr>>>,
}

impl TargetResolver {
    /// Creates a resolver for `team` on the robot's control port
    pub fn new(resolver: Arc<dyn AddressResolver>, team: u32, port: u16, limit: Duration) -> Self {
        TargetResolver {
            resolver,
            team,
            port,
            limit,
            cached: None,
            pending: None,
        }
    }

    /// Host string the current strategy produces
    pub fn host(&self) -> String {
        self.resolver.target_host(self.team)
    }

    /// Returns the cached address, or collects / starts a background lookup
    ///
    /// Never waits on the resolver. IP literals resolve immediately.
    pub async fn resolve(&mut self) -> Result<SocketAddr> {
        if let Some(addr) = self.cached {
            return Ok(addr);
        }

        let host = self.host();
        if let Ok(ip) = host.parse::<IpAddr>() {
            let addr = SocketAddr::new(ip, self.port);
            self.cached = Some(addr);
            return Ok(addr);
        }

        match self.pending.take() {
            Some(task) if task.is_finished() => {
                let addr = task
                    .await
                    .map_err(|e| Error::network(format!("Resolver task failed: {}", e)))??;
                debug!(%host, %addr, "resolved robot address");
                self.cached = Some(addr);
                Ok(addr)
            }
            Some(task) => {
                self.pending = Some(task);
                Err(Error::network(format!("Still resolving {}", host)))
            }
            None => {
                self.pending = Some(tokio::spawn(lookup(host.clone(), self.port, self.limit)));
                Err(Error::network(format!("Started resolving {}", host)))
            }
        }
    }

    /// Drops the cached address so the next send resolves again
    pub fn invalidate(&mut self) {
        self.cached = None;
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }

    /// Currently cached address, if any
    pub fn cached(&self) -> Option<SocketAddr> {
        self.cached
    }

    /// Returns true while a background lookup is outstanding
    pub fn is_resolving(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for TargetResolver {
    fn drop(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

/// Looks up `host`, preferring an IPv4 address
async fn lookup(host: String, port: u16, limit: Duration) -> Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = timeout(limit, lookup_host((host.as_str(), port)))
        .await
        .map_err(|_| Error::network(format!("Timed out resolving {}", host)))??
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| Error::network(format!("No addresses found for {}", host)))
}
