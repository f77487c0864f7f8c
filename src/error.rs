use thiserror::Error;

use crate::zone::ZoneError;

/// Failures of a single DNS exchange. These never end a run; the record
/// being checked is treated as unanswered.
#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid DNS packet: {0}")]
    InvalidPacket(String),

    #[error("Timed out waiting for a response")]
    Timeout,
}

impl From<std::io::Error> for DnsError {
    fn from(err: std::io::Error) -> Self {
        DnsError::Io(err.to_string())
    }
}

impl From<crate::dns::ParseError> for DnsError {
    fn from(err: crate::dns::ParseError) -> Self {
        DnsError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DnsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid timeout: {0} seconds (must be 1-300)")]
    InvalidTimeout(u64),

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid EDNS payload size: {0} (must be 512-65535)")]
    InvalidPayloadSize(u16),

    #[error("Failed to parse {field}: {value}")]
    ParseError { field: String, value: String },
}

/// Errors that end a run before any record is compared
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Unable to resolve name server {name}: {reason}")]
    UnableToResolveNameServer { name: String, reason: String },

    #[error("No name server configured in {path}")]
    NoSystemResolver { path: String },

    #[error("Unable to read zone file {path}: {reason}")]
    NoZoneFile { path: String, reason: String },

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
