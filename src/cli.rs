use crate::config::CheckConfig;
use crate::error::ConfigError;
use crate::transport::Protocol;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Every record set matched
pub const EXIT_OK: u8 = 0;
/// At least one record set or TTL differed
pub const EXIT_MISMATCH: u8 = 1;
/// The run could not be carried out
pub const EXIT_ERROR: u8 = 3;

/// Compare a zone file with the answers of a live name server
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Origin of the zone, e.g. example.com
    pub zonename: String,

    /// Zone file holding the expected records
    pub zonefile: PathBuf,

    /// Log more detail (-v for per-record results, -vv for queries)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Name server to query instead of the system resolver's first one
    #[arg(short = 'd', long, value_name = "HOST")]
    pub nameserver: Option<String>,

    /// Clear the recursion desired flag on queries
    #[arg(short = 'r', long)]
    pub norec: bool,

    /// Count TTL differences as mismatches
    #[arg(short = 't', long)]
    pub ttl: bool,

    /// Compare NS record sets
    #[arg(short = 'n', long)]
    pub ns: bool,

    /// Compare SOA record sets
    #[arg(short = 's', long)]
    pub soa: bool,

    /// Query over TCP instead of UDP
    #[arg(short = 'T', long)]
    pub tcp: bool,

    /// Port the name server listens on [default: 53]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds to wait for each answer [default: 10]
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Builds the run configuration from the process environment and these
    /// arguments.
    pub fn into_config(self) -> Result<CheckConfig, ConfigError> {
        self.into_config_with(|key| std::env::var(key).ok())
    }

    /// Defaults, then environment overrides looked up through `var`, then
    /// the command line.
    pub fn into_config_with<F>(self, var: F) -> Result<CheckConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CheckConfig::default();
        config.apply_env(var)?;

        config.zone_name = self.zonename;
        config.zone_file = self.zonefile;
        config.nameserver = self.nameserver;
        config.recursion = !self.norec;
        config.compare_ttl = self.ttl;
        config.compare_ns = self.ns;
        config.compare_soa = self.soa;
        if self.tcp {
            config.protocol = Protocol::Tcp;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Filter directives for the given verbosity flags. `RUST_LOG` is only
/// consulted when neither flag was given.
pub fn log_filter(verbose: u8, quiet: bool, rust_log: Option<String>) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => rust_log
            .filter(|directives| !directives.trim().is_empty())
            .unwrap_or_else(|| "warn".to_string()),
        1 => "warn,dnszonetest=info".to_string(),
        2 => "warn,dnszonetest=debug".to_string(),
        _ => "warn,dnszonetest=trace".to_string(),
    }
}

/// Install the stderr subscriber. Called once by the binary.
pub fn init_logging(verbose: u8, quiet: bool) {
    let directives = log_filter(verbose, quiet, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second install (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_level(false)
        .try_init();
}
