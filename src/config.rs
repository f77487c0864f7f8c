use crate::dns::edns::DEFAULT_EDNS_PAYLOAD;
use crate::error::ConfigError;
use crate::transport::Protocol;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the system resolver configuration
pub const DEFAULT_RESOLV_CONF: &str = "/etc/resolv.conf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Origin of the zone under test
    pub zone_name: String,

    /// Zone file holding the expected records
    pub zone_file: PathBuf,

    /// Name server to query; the system resolver's first server when unset
    pub nameserver: Option<String>,

    /// Port the name server listens on
    pub port: u16,

    /// Transport used for queries
    pub protocol: Protocol,

    /// Set the RD bit on queries
    pub recursion: bool,

    /// Count TTL differences as mismatches
    pub compare_ttl: bool,

    /// Compare NS record sets
    pub compare_ns: bool,

    /// Compare SOA record sets
    pub compare_soa: bool,

    /// Bound on the wait for each answer
    pub timeout: Duration,

    /// UDP payload size advertised with EDNS0
    pub edns_payload: u16,

    /// resolv.conf consulted when no name server is given
    pub resolv_conf: PathBuf,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            zone_name: String::new(),
            zone_file: PathBuf::new(),
            nameserver: None,
            port: 53,
            protocol: Protocol::Udp,
            recursion: true,
            compare_ttl: false,
            compare_ns: false,
            compare_soa: false,
            timeout: Duration::from_secs(10),
            edns_payload: DEFAULT_EDNS_PAYLOAD,
            resolv_conf: PathBuf::from(DEFAULT_RESOLV_CONF),
        }
    }
}

impl CheckConfig {
    /// Applies overrides looked up through `var`
    pub fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(timeout) = var("DNSZONETEST_TIMEOUT") {
            let secs = parse_field::<u64>("DNSZONETEST_TIMEOUT", &timeout)?;
            self.timeout = Duration::from_secs(secs);
        }

        if let Some(port) = var("DNSZONETEST_PORT") {
            self.port = parse_field("DNSZONETEST_PORT", &port)?;
        }

        if let Some(payload) = var("DNSZONETEST_EDNS_PAYLOAD") {
            self.edns_payload = parse_field("DNSZONETEST_EDNS_PAYLOAD", &payload)?;
        }

        if let Some(path) = var("DNSZONETEST_RESOLV_CONF") {
            self.resolv_conf = PathBuf::from(path);
        }

        if let Some(tcp) = var("DNSZONETEST_TCP") {
            if parse_bool(&tcp, false) {
                self.protocol = Protocol::Tcp;
            }
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secs = self.timeout.as_secs();
        if !(1..=300).contains(&secs) {
            return Err(ConfigError::InvalidTimeout(secs));
        }

        if self.edns_payload < 512 {
            return Err(ConfigError::InvalidPayloadSize(self.edns_payload));
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        Ok(())
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::ParseError {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
