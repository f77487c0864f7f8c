use crate::config::CheckConfig;
use crate::dns::DNSPacket;
use crate::dns::constants::DNSRcode;
use crate::dns::edns::DEFAULT_EDNS_PAYLOAD;
use crate::error::DnsError;
use crate::record::{Record, RecordSet};
use crate::transport::{DnsTransport, NetworkTransport, Protocol};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How each query is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub protocol: Protocol,
    /// Set the RD bit
    pub recursion: bool,
    pub timeout: Duration,
    pub edns_payload: u16,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            protocol: Protocol::Udp,
            recursion: true,
            timeout: Duration::from_secs(10),
            edns_payload: DEFAULT_EDNS_PAYLOAD,
        }
    }
}

impl From<&CheckConfig> for QueryOptions {
    fn from(config: &CheckConfig) -> Self {
        Self {
            protocol: config.protocol,
            recursion: config.recursion,
            timeout: config.timeout,
            edns_payload: config.edns_payload,
        }
    }
}

/// Queries one name server for the live counterpart of expected record
/// sets, one query per set, without retries.
pub struct QueryExecutor<T: DnsTransport = NetworkTransport> {
    transport: T,
    server: SocketAddr,
    options: QueryOptions,
}

impl<T: DnsTransport> QueryExecutor<T> {
    pub fn new(transport: T, server: SocketAddr, options: QueryOptions) -> Self {
        Self {
            transport,
            server,
            options,
        }
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Query for the owner, type and class of `expected`, with a fresh
    /// random id and an EDNS0 OPT record.
    pub fn build_query(&self, expected: &RecordSet) -> DNSPacket {
        DNSPacket::new_query(
            rand::random::<u16>(),
            &expected.name,
            expected.rtype,
            expected.rclass,
            self.options.recursion,
            Some(self.options.edns_payload),
        )
    }

    /// Looks up `expected` on the server and pairs it with the answer.
    ///
    /// Every failure to get an answer (timeout, I/O, malformed response,
    /// empty answer section) leaves the observed side empty.
    pub async fn execute(&self, expected: RecordSet) -> Record {
        let query = self.build_query(&expected);
        debug!(
            "Querying {} for {} {} {} (id {}, rd={})",
            self.server,
            expected.name,
            expected.rclass,
            expected.rtype,
            query.header.id,
            query.header.rd
        );

        let observed = match self
            .transport
            .exchange(&query, self.server, self.options.protocol, self.options.timeout)
            .await
        {
            Ok(response) => {
                let rrset = first_answer_rrset(&response);
                if rrset.is_none() {
                    info!(
                        "No result for {} {} from {} ({})",
                        expected.name,
                        expected.rtype,
                        self.server,
                        rcode_name(&response)
                    );
                }
                rrset
            }
            Err(DnsError::Timeout) => {
                warn!(
                    "Timed out after {:?} waiting for {} {} from {}",
                    self.options.timeout, expected.name, expected.rtype, self.server
                );
                None
            }
            Err(e) => {
                warn!(
                    "Query for {} {} to {} failed: {}",
                    expected.name, expected.rtype, self.server, e
                );
                None
            }
        };

        Record::new(expected, observed)
    }
}

/// The first record set of the answer section: all answers sharing name,
/// type and class with the first answer. Its TTL is the lowest member TTL.
pub fn first_answer_rrset(response: &DNSPacket) -> Option<RecordSet> {
    let mut answers = response
        .answers
        .iter()
        .filter(|answer| answer.parsed_rdata.is_some());
    let first = answers.next()?;
    let name = first.name();

    let mut rrset = RecordSet::new(name.clone(), first.rtype, first.rclass, first.ttl);
    for answer in std::iter::once(first).chain(answers) {
        if answer.rtype != first.rtype || answer.rclass != first.rclass || answer.name() != name {
            continue;
        }
        if let Some(rdata) = &answer.parsed_rdata {
            rrset.add(answer.ttl, rdata.clone());
        }
    }

    Some(rrset)
}

fn rcode_name(response: &DNSPacket) -> String {
    match u8::try_from(response.rcode()) {
        Ok(rcode) => DNSRcode::name(rcode),
        Err(_) => format!("RCODE{}", response.rcode()),
    }
}
