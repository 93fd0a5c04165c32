use std::fmt;

use anyhow::{Context as _, bail};
use http::{Uri, uri::Authority};

use crate::utils::combine_uris;

/// The single backend every request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub authority: Authority,
    /// Absolute base URI (`http://authority/`) that inbound paths are joined onto.
    pub root_path: Uri,
}

impl Upstream {
    /// Builds an upstream from a bare `host:port` string.
    ///
    /// # Arguments
    ///
    /// * `host_port` - The upstream as `host:port`; `:port` means this host
    ///
    /// # Returns
    ///
    /// The upstream with an `http://host:port/` base, or an error when the
    /// input is empty, carries a scheme or path, or is not a valid authority.
    pub fn from_host_port(host_port: &str) -> anyhow::Result<Self> {
        let host_port = host_port.trim();
        if host_port.is_empty() {
            bail!("upstream address is empty");
        }
        let local;
        let host_port = match host_port.strip_prefix(':') {
            Some(port) => {
                local = format!("127.0.0.1:{port}");
                local.as_str()
            }
            None => host_port,
        };
        if host_port.contains("://") || host_port.contains('/') {
            bail!("upstream must be given as host:port, got {host_port:?}");
        }

        let authority = host_port
            .parse::<Authority>()
            .with_context(|| format!("invalid upstream address {host_port:?}"))?;
        if authority.host().is_empty() {
            bail!("upstream address {host_port:?} has no host");
        }

        let root_path = Uri::builder()
            .scheme("http")
            .authority(authority.clone())
            .path_and_query("/")
            .build()
            .with_context(|| format!("invalid upstream address {host_port:?}"))?;

        Ok(Self {
            authority,
            root_path,
        })
    }

    /// Rewrites an inbound request target onto this upstream, keeping path and query.
    pub fn target_uri(&self, inbound: &Uri) -> anyhow::Result<Uri> {
        combine_uris(&self.root_path, inbound)
            .with_context(|| format!("cannot rewrite {inbound} onto {}", self.root_path))
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.authority)
    }
}
