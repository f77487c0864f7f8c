//! Locating the name server a run is checked against.
//!
//! Without an explicit server the first `nameserver` of the system resolver
//! configuration is used. A given host name is resolved once, the first
//! address wins.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::DEFAULT_RESOLV_CONF;
use crate::error::CheckError;

/// The parts of a resolv.conf(5) file this tool reads
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvConf {
    pub nameservers: Vec<IpAddr>,
    pub domain: Option<String>,
    pub search: Vec<String>,
    pub options: Vec<String>,
}

impl ResolvConf {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Parses resolv.conf content. Unknown keywords and unusable values
    /// are skipped rather than rejected, like the system resolver does.
    pub fn parse(text: &str) -> Self {
        let mut conf = ResolvConf::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let mut words = line.split_whitespace();
            let Some(keyword) = words.next() else {
                continue;
            };
            match keyword {
                "nameserver" => match words.next().map(parse_nameserver) {
                    Some(Some(addr)) => conf.nameservers.push(addr),
                    Some(None) | None => debug!("Skipping unusable resolv.conf line: {}", line),
                },
                "domain" => conf.domain = words.next().map(str::to_string),
                "search" => conf.search = words.map(str::to_string).collect(),
                "options" => conf.options.extend(words.map(str::to_string)),
                "sortlist" => {}
                other => debug!("Ignoring resolv.conf keyword {}", other),
            }
        }

        conf
    }
}

/// Accepts an address with an optional IPv6 zone suffix (`fe80::1%eth0`)
fn parse_nameserver(value: &str) -> Option<IpAddr> {
    let value = value.split('%').next().unwrap_or(value);
    value.parse().ok()
}

/// Resolves the configured or default name server to one address.
#[derive(Clone, Debug)]
pub struct NameServerLocator {
    resolv_conf: PathBuf,
}

impl Default for NameServerLocator {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLV_CONF)
    }
}

impl NameServerLocator {
    pub fn new<P: Into<PathBuf>>(resolv_conf: P) -> Self {
        Self {
            resolv_conf: resolv_conf.into(),
        }
    }

    /// Returns the address to query. Failures are fatal for the run and
    /// never retried.
    pub async fn locate(&self, nameserver: Option<&str>) -> Result<IpAddr, CheckError> {
        let addr = match nameserver {
            None => self.system_default()?,
            Some(host) => resolve_host(host).await?,
        };
        info!("Using name server {}", addr);
        Ok(addr)
    }

    fn system_default(&self) -> Result<IpAddr, CheckError> {
        let no_resolver = || CheckError::NoSystemResolver {
            path: self.resolv_conf.display().to_string(),
        };

        let conf = ResolvConf::from_file(&self.resolv_conf).map_err(|e| {
            debug!("Cannot read {}: {}", self.resolv_conf.display(), e);
            no_resolver()
        })?;
        conf.nameservers.first().copied().ok_or_else(no_resolver)
    }
}

async fn resolve_host(host: &str) -> Result<IpAddr, CheckError> {
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(addr) = literal.parse::<IpAddr>() {
        return Ok(addr);
    }

    let unable = |reason: String| CheckError::UnableToResolveNameServer {
        name: host.to_string(),
        reason,
    };

    debug!("Resolving name server {}", host);
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| unable(e.to_string()))?;
    addrs
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| unable("no addresses found".to_string()))
}
