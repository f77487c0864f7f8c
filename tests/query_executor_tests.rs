mod common;

use common::{FakeServer, a_record, response_for};
use dnszonetest::dns::DNSPacket;
use dnszonetest::dns::enums::{DNSResourceClass, DNSResourceType};
use dnszonetest::dns::rdata::RData;
use dnszonetest::error::DnsError;
use dnszonetest::query::{QueryExecutor, QueryOptions};
use dnszonetest::record::{RecordSet, TtlMatch};
use dnszonetest::transport::{DnsTransport, NetworkTransport, Protocol};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

fn expected_a(name: &str, ttl: u32, addrs: &[[u8; 4]]) -> RecordSet {
    let mut set = RecordSet::new(
        name.to_string(),
        DNSResourceType::A,
        DNSResourceClass::IN,
        ttl,
    );
    for addr in addrs {
        set.add(ttl, RData::A(Ipv4Addr::from(*addr)));
    }
    set
}

fn options(protocol: Protocol) -> QueryOptions {
    QueryOptions {
        protocol,
        timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_udp_query_carries_edns_and_rd() {
    let server =
        FakeServer::answering(vec![a_record("www.example.com.", 300, [192, 0, 2, 1])]).await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Udp));

    let record = executor
        .execute(expected_a("www.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;

    assert!(record.rdataset_match());
    assert_eq!(record.ttl_match(), TtlMatch::Match);
    assert_eq!(server.udp_count(), 1);
    assert_eq!(server.tcp_count(), 0);

    let query = server.udp_queries.lock().unwrap()[0].clone();
    assert!(query.header.rd);
    assert!(!query.header.qr);
    assert_eq!(query.questions[0].name(), "www.example.com.");
    assert_eq!(query.edns.map(|e| e.udp_payload_size), Some(2048));
}

#[tokio::test]
async fn test_norec_clears_rd() {
    let server =
        FakeServer::answering(vec![a_record("www.example.com.", 300, [192, 0, 2, 1])]).await;
    let options = QueryOptions {
        recursion: false,
        ..options(Protocol::Udp)
    };
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options);

    executor
        .execute(expected_a("www.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;

    let query = server.udp_queries.lock().unwrap()[0].clone();
    assert!(!query.header.rd);
}

#[tokio::test]
async fn test_tcp_only() {
    let server =
        FakeServer::answering(vec![a_record("www.example.com.", 60, [192, 0, 2, 1])]).await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Tcp));

    let record = executor
        .execute(expected_a("www.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;

    assert!(record.rdataset_match());
    assert_eq!(record.ttl_match(), TtlMatch::Mismatch);
    assert_eq!(server.udp_count(), 0);
    assert_eq!(server.tcp_count(), 1);
}

#[tokio::test]
async fn test_truncated_udp_falls_back_to_tcp() {
    let answers = vec![
        a_record("big.example.com.", 300, [192, 0, 2, 1]),
        a_record("big.example.com.", 300, [192, 0, 2, 2]),
    ];
    let server = FakeServer::start(
        Arc::new(|query: &DNSPacket| {
            let mut truncated = response_for(query, vec![]);
            truncated.header.tc = true;
            vec![truncated.serialize().unwrap()]
        }),
        Arc::new(move |query: &DNSPacket| {
            response_for(query, answers.clone()).serialize().unwrap()
        }),
    )
    .await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Udp));

    let record = executor
        .execute(expected_a(
            "big.example.com.",
            300,
            &[[192, 0, 2, 2], [192, 0, 2, 1]],
        ))
        .await;

    assert!(record.rdataset_match());
    assert_eq!(server.udp_count(), 1);
    assert_eq!(server.tcp_count(), 1);
}

#[tokio::test]
async fn test_mismatched_id_is_discarded() {
    let server = FakeServer::start(
        Arc::new(|query: &DNSPacket| {
            let mut stray = response_for(query, vec![a_record("www.example.com.", 300, [198, 51, 100, 7])]);
            stray.header.id = query.header.id.wrapping_add(1);
            let genuine = response_for(query, vec![a_record("www.example.com.", 300, [192, 0, 2, 1])]);
            vec![stray.serialize().unwrap(), genuine.serialize().unwrap()]
        }),
        Arc::new(|query: &DNSPacket| response_for(query, vec![]).serialize().unwrap()),
    )
    .await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Udp));

    let record = executor
        .execute(expected_a("www.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;

    assert!(record.rdataset_match());
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let server = FakeServer::start(
        Arc::new(|_: &DNSPacket| Vec::new()),
        Arc::new(|query: &DNSPacket| response_for(query, vec![]).serialize().unwrap()),
    )
    .await;
    let query = DNSPacket::new_query(
        7,
        "www.example.com.",
        DNSResourceType::A,
        DNSResourceClass::IN,
        true,
        Some(2048),
    );

    let err = NetworkTransport::new()
        .exchange(&query, server.addr, Protocol::Udp, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, DnsError::Timeout));

    // The executor turns the timeout into an absent answer
    let executor = QueryExecutor::new(
        NetworkTransport::new(),
        server.addr,
        QueryOptions {
            timeout: Duration::from_millis(200),
            ..Default::default()
        },
    );
    let record = executor
        .execute(expected_a("www.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;
    assert!(record.observed().is_none());
    assert!(!record.rdataset_match());
    assert_eq!(record.ttl_match(), TtlMatch::Undefined);
}

#[tokio::test]
async fn test_nxdomain_leaves_observed_empty() {
    let server = FakeServer::start(
        Arc::new(|query: &DNSPacket| {
            let mut nx = response_for(query, vec![]);
            nx.header.rcode = 3;
            vec![nx.serialize().unwrap()]
        }),
        Arc::new(|query: &DNSPacket| response_for(query, vec![]).serialize().unwrap()),
    )
    .await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Udp));

    let record = executor
        .execute(expected_a("gone.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;
    assert!(record.observed().is_none());
}

#[tokio::test]
async fn test_only_first_answer_rrset_is_observed() {
    let server = FakeServer::answering(vec![
        a_record("alias.example.com.", 300, [192, 0, 2, 1]),
        a_record("other.example.com.", 300, [192, 0, 2, 2]),
    ])
    .await;
    let executor = QueryExecutor::new(NetworkTransport::new(), server.addr, options(Protocol::Udp));

    let record = executor
        .execute(expected_a("alias.example.com.", 300, &[[192, 0, 2, 1]]))
        .await;

    let observed = record.observed().unwrap();
    assert_eq!(observed.name, "alias.example.com.");
    assert_eq!(observed.rdatas.len(), 1);
    assert!(record.rdataset_match());
}
