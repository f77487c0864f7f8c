use crate::cli::{EXIT_MISMATCH, EXIT_OK};
use crate::config::CheckConfig;
use crate::dns::enums::DNSResourceType;
use crate::error::CheckError;
use crate::nameserver::NameServerLocator;
use crate::query::{QueryExecutor, QueryOptions};
use crate::record::{Record, RecordSet, TtlMatch};
use crate::transport::{DnsTransport, NetworkTransport};
use crate::zone::load_zone;
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Which comparisons a run performs beyond record data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub ttl: bool,
    pub ns: bool,
    pub soa: bool,
}

impl From<&CheckConfig> for CompareOptions {
    fn from(config: &CheckConfig) -> Self {
        Self {
            ttl: config.compare_ttl,
            ns: config.compare_ns,
            soa: config.compare_soa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    RecordSet,
    Ttl,
}

/// One difference between the zone file and the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub name: String,
    pub rtype: String,
    pub kind: MismatchKind,
    pub expected: Vec<String>,
    pub observed: Vec<String>,
    pub expected_ttl: u32,
    pub observed_ttl: Option<u32>,
}

impl Mismatch {
    fn from_record(record: &Record, kind: MismatchKind) -> Self {
        Self {
            name: record.name().to_string(),
            rtype: record.expected().rtype.to_string(),
            kind,
            expected: record.expected().lines(),
            observed: record.observed().map(RecordSet::lines).unwrap_or_default(),
            expected_ttl: record.expected().ttl,
            observed_ttl: record.observed().map(|o| o.ttl),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AllMatched,
    MismatchesFound,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::AllMatched => EXIT_OK,
            Outcome::MismatchesFound => EXIT_MISMATCH,
        }
    }
}

/// Counters and details of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub zone: String,
    pub server: String,
    /// RFC 3339 time the comparison started
    pub started_at: String,
    pub checked: usize,
    pub skipped: usize,
    /// Zone file records whose type could not be read
    pub unsupported: usize,
    pub mismatch_recordset_count: usize,
    pub mismatch_ttl_count: usize,
    pub mismatches: Vec<Mismatch>,
    pub outcome: Outcome,
}

impl RunResult {
    fn new(zone: &str, server: SocketAddr) -> Self {
        Self {
            zone: zone.to_string(),
            server: server.to_string(),
            started_at: Utc::now().to_rfc3339(),
            checked: 0,
            skipped: 0,
            unsupported: 0,
            mismatch_recordset_count: 0,
            mismatch_ttl_count: 0,
            mismatches: Vec::new(),
            outcome: Outcome::AllMatched,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }

    fn finalize(&mut self) {
        self.outcome = if self.mismatch_recordset_count > 0 || self.mismatch_ttl_count > 0 {
            Outcome::MismatchesFound
        } else {
            Outcome::AllMatched
        };
    }
}

/// Drives the comparison of every record set of a zone, strictly one at
/// a time.
pub struct Reconciler<T: DnsTransport = NetworkTransport> {
    executor: QueryExecutor<T>,
    compare: CompareOptions,
}

impl<T: DnsTransport> Reconciler<T> {
    pub fn new(executor: QueryExecutor<T>, compare: CompareOptions) -> Self {
        Self { executor, compare }
    }

    fn should_compare(&self, rtype: DNSResourceType) -> bool {
        match rtype {
            DNSResourceType::NS => self.compare.ns,
            DNSResourceType::SOA => self.compare.soa,
            _ => true,
        }
    }

    pub async fn reconcile<I>(&self, zone: &str, record_sets: I) -> RunResult
    where
        I: IntoIterator<Item = RecordSet>,
    {
        let mut result = RunResult::new(zone, self.executor.server());

        for expected in record_sets {
            if !self.should_compare(expected.rtype) {
                debug!("Skipping {} {}", expected.name, expected.rtype);
                result.skipped += 1;
                continue;
            }

            let record = self.executor.execute(expected).await;
            result.checked += 1;
            self.account(&record, &mut result);
        }

        result.finalize();
        info!(
            "Checked {} record sets against {} ({} skipped): {} record set mismatches, {} TTL mismatches",
            result.checked,
            result.server,
            result.skipped,
            result.mismatch_recordset_count,
            result.mismatch_ttl_count
        );
        result
    }

    fn account(&self, record: &Record, result: &mut RunResult) {
        let expected = record.expected();

        if !record.rdataset_match() {
            let observed = record
                .observed()
                .map(RecordSet::to_text)
                .unwrap_or_else(|| "(no answer)".to_string());
            warn!(
                "Record set mismatch for {} {}\nexpected:\n{}\nobserved:\n{}",
                record.name(),
                expected.rtype,
                expected.to_text(),
                observed
            );
            result.mismatch_recordset_count += 1;
            result
                .mismatches
                .push(Mismatch::from_record(record, MismatchKind::RecordSet));
        }

        if !self.compare.ttl {
            return;
        }
        // An absent answer is Undefined, never a mismatch
        if let (TtlMatch::Mismatch, Some(observed)) = (record.ttl_match(), record.observed()) {
            warn!(
                "TTL mismatch for {} {}: expected {}, observed {}",
                record.name(),
                expected.rtype,
                expected.ttl,
                observed.ttl
            );
            result.mismatch_ttl_count += 1;
            result
                .mismatches
                .push(Mismatch::from_record(record, MismatchKind::Ttl));
        }
    }
}

/// Runs a full check over the network.
pub async fn run(config: &CheckConfig) -> Result<RunResult, CheckError> {
    run_with(config, NetworkTransport::new()).await
}

/// Runs a full check: resolve the server, load the zone, then compare
/// every record set. Fatal errors abort before any query is sent.
pub async fn run_with<T: DnsTransport>(
    config: &CheckConfig,
    transport: T,
) -> Result<RunResult, CheckError> {
    config.validate()?;

    let locator = NameServerLocator::new(config.resolv_conf.clone());
    let server_ip = locator.locate(config.nameserver.as_deref()).await?;

    let zone = load_zone(&config.zone_name, &config.zone_file)?;
    let origin = zone.origin.clone();
    let unsupported = zone.skipped_records;

    let executor = QueryExecutor::new(
        transport,
        SocketAddr::new(server_ip, config.port),
        QueryOptions::from(config),
    );
    let reconciler = Reconciler::new(executor, CompareOptions::from(config));
    let mut result = reconciler.reconcile(&origin, zone).await;
    result.unsupported = unsupported;
    Ok(result)
}
