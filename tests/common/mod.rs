//! Shared fixtures for the dnszonetest integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dnszonetest::config::CheckConfig;
use dnszonetest::dns::{
    DNSPacket,
    enums::{DNSResourceClass, DNSResourceType},
    rdata::RData,
    resource::DNSResource,
};
use dnszonetest::error::{DnsError, Result};
use dnszonetest::record::RecordSet;
use dnszonetest::transport::{DnsTransport, Protocol};
use dnszonetest::zone::ZoneParser;
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

pub const EXAMPLE_ZONE: &str = r#"$ORIGIN example.com.
$TTL 300
@       IN  SOA ns1.example.com. hostmaster.example.com. ( 2024010101 3600 900 604800 300 )
@       IN  NS  ns1.example.com.
@       IN  NS  ns2.example.com.
@       IN  A   192.0.2.1
www     IN  A   192.0.2.2
www     IN  A   192.0.2.3
mail    IN  MX  10 mx.example.com.
txt     IN  TXT "hello world"
"#;

/// Writes `contents` to `name` inside a fresh temporary directory
pub fn write_zone(contents: &str, name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

/// A configuration that queries `nameserver` without touching the
/// environment or /etc/resolv.conf
pub fn test_config(zone_name: &str, zone_file: PathBuf, nameserver: &str) -> CheckConfig {
    CheckConfig {
        zone_name: zone_name.to_string(),
        zone_file,
        nameserver: Some(nameserver.to_string()),
        resolv_conf: PathBuf::from("/nonexistent/resolv.conf"),
        timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

pub fn a_record(name: &str, ttl: u32, addr: [u8; 4]) -> DNSResource {
    DNSResource::new(
        name,
        DNSResourceClass::IN,
        ttl,
        RData::A(Ipv4Addr::from(addr)),
    )
    .unwrap()
}

/// The answer section a server holding exactly `set` would return
pub fn resources_for(set: &RecordSet) -> Vec<DNSResource> {
    set.rdatas
        .iter()
        .map(|rdata| DNSResource::new(&set.name, set.rclass, set.ttl, rdata.clone()).unwrap())
        .collect()
}

/// A response to `query` carrying `answers`
pub fn response_for(query: &DNSPacket, answers: Vec<DNSResource>) -> DNSPacket {
    let mut response = query.clone();
    response.header.qr = true;
    response.header.ra = true;
    response.answers = answers;
    response
}

/// One query seen by [`FakeTransport`]
#[derive(Debug, Clone)]
pub struct SeenQuery {
    pub name: String,
    pub qtype: DNSResourceType,
    pub protocol: Protocol,
    pub packet: DNSPacket,
}

/// In-memory name server. Answers are looked up by owner and type;
/// anything unknown gets an empty NOERROR answer.
#[derive(Clone, Default)]
pub struct FakeTransport {
    answers: HashMap<(String, DNSResourceType), Vec<DNSResource>>,
    silent: HashSet<(String, DNSResourceType)>,
    seen: Arc<Mutex<Vec<SeenQuery>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves every record set of the zone exactly as written
    pub fn serving_zone(origin: &str, contents: &str) -> Self {
        let zone = ZoneParser::new(origin).parse(contents).unwrap();
        let mut transport = Self::new();
        for set in zone.record_sets() {
            transport = transport.with_answers(&set.name, set.rtype, resources_for(set));
        }
        transport
    }

    pub fn with_answers(
        mut self,
        name: &str,
        rtype: DNSResourceType,
        answers: Vec<DNSResource>,
    ) -> Self {
        self.answers.insert((name.to_ascii_lowercase(), rtype), answers);
        self
    }

    /// Never answers queries for `name`/`rtype`
    pub fn timing_out(mut self, name: &str, rtype: DNSResourceType) -> Self {
        self.silent.insert((name.to_ascii_lowercase(), rtype));
        self
    }

    pub fn seen(&self) -> Vec<SeenQuery> {
        self.seen.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn queries_for(&self, rtype: DNSResourceType) -> usize {
        self.seen().iter().filter(|q| q.qtype == rtype).count()
    }
}

#[async_trait]
impl DnsTransport for FakeTransport {
    async fn exchange(
        &self,
        query: &DNSPacket,
        _server: SocketAddr,
        protocol: Protocol,
        _deadline: Duration,
    ) -> Result<DNSPacket> {
        let question = query
            .questions
            .first()
            .ok_or_else(|| DnsError::InvalidPacket("query without question".to_string()))?;
        let key = (question.name(), question.qtype);

        self.seen.lock().unwrap().push(SeenQuery {
            name: key.0.clone(),
            qtype: key.1,
            protocol,
            packet: query.clone(),
        });

        if self.silent.contains(&key) {
            return Err(DnsError::Timeout);
        }
        let answers = self.answers.get(&key).cloned().unwrap_or_default();
        Ok(response_for(query, answers))
    }
}

/// What a loopback server replies over UDP
pub type UdpHandler = Arc<dyn Fn(&DNSPacket) -> Vec<Vec<u8>> + Send + Sync>;
/// What a loopback server replies over TCP
pub type TcpHandler = Arc<dyn Fn(&DNSPacket) -> Vec<u8> + Send + Sync>;

/// Loopback name server listening on one port for both UDP and TCP
pub struct FakeServer {
    pub addr: SocketAddr,
    pub tcp_queries: Arc<Mutex<Vec<DNSPacket>>>,
    pub udp_queries: Arc<Mutex<Vec<DNSPacket>>>,
}

impl FakeServer {
    pub async fn start(udp: UdpHandler, tcp: TcpHandler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let socket = UdpSocket::bind(addr).await.unwrap();

        let udp_queries = Arc::new(Mutex::new(Vec::new()));
        let tcp_queries = Arc::new(Mutex::new(Vec::new()));

        let seen = udp_queries.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(query) = DNSPacket::parse(&buf[..len]) else {
                    continue;
                };
                seen.lock().unwrap().push(query.clone());
                for datagram in udp(&query) {
                    let _ = socket.send_to(&datagram, peer).await;
                }
            }
        });

        let seen = tcp_queries.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let mut len_buf = [0u8; 2];
                if stream.read_exact(&mut len_buf).await.is_err() {
                    continue;
                }
                let mut query_buf = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                if stream.read_exact(&mut query_buf).await.is_err() {
                    continue;
                }
                let Ok(query) = DNSPacket::parse(&query_buf) else {
                    continue;
                };
                seen.lock().unwrap().push(query.clone());
                let reply = tcp(&query);
                let _ = stream.write_all(&(reply.len() as u16).to_be_bytes()).await;
                let _ = stream.write_all(&reply).await;
            }
        });

        Self {
            addr,
            tcp_queries,
            udp_queries,
        }
    }

    /// Answers every query with `answers` over both transports
    pub async fn answering(answers: Vec<DNSResource>) -> Self {
        let udp_answers = answers.clone();
        Self::start(
            Arc::new(move |query: &DNSPacket| {
                vec![
                    response_for(query, udp_answers.clone())
                        .serialize()
                        .unwrap(),
                ]
            }),
            Arc::new(move |query: &DNSPacket| response_for(query, answers.clone()).serialize().unwrap()),
        )
        .await
    }

    pub fn udp_count(&self) -> usize {
        self.udp_queries.lock().unwrap().len()
    }

    pub fn tcp_count(&self) -> usize {
        self.tcp_queries.lock().unwrap().len()
    }
}
