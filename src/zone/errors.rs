use std::fmt;

/// Zone-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    /// Malformed zone file content, message carries the line
    ParseError(String),
    /// Record that parses but cannot be added to the zone
    InvalidRecord(String),
    /// No SOA record at the zone origin
    MissingSOA,
    /// Two different SOA records at the zone origin
    DuplicateSOA,
    InvalidDomainName(String),
    /// Zone file could not be opened or read
    IoError(String),
    FileTooLarge,
    InvalidTTL(String),
    InvalidRRType(String),
    /// Known type whose presentation form cannot be read, e.g. LOC
    UnsupportedType(String),
    ValidationError(String),
}

impl fmt::Display for ZoneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError(msg) => write!(f, "Zone parse error: {}", msg),
            Self::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
            Self::MissingSOA => write!(f, "Zone missing required SOA record"),
            Self::DuplicateSOA => write!(f, "Zone contains duplicate SOA records"),
            Self::InvalidDomainName(name) => write!(f, "Invalid domain name: {}", name),
            Self::IoError(msg) => write!(f, "IO error: {}", msg),
            Self::FileTooLarge => write!(f, "Zone file exceeds maximum size"),
            Self::InvalidTTL(ttl) => write!(f, "Invalid TTL value: {}", ttl),
            Self::InvalidRRType(rtype) => write!(f, "Invalid resource record type: {}", rtype),
            Self::UnsupportedType(rtype) => {
                write!(f, "{} records are only supported in the \\# generic form", rtype)
            }
            Self::ValidationError(msg) => write!(f, "Zone validation error: {}", msg),
        }
    }
}

impl std::error::Error for ZoneError {}

pub type Result<T> = std::result::Result<T, ZoneError>;
