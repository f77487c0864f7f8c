use crate::dns::DNSPacket;
use crate::error::{DnsError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, trace};

/// Largest datagram accepted from a name server
const MAX_UDP_RESPONSE: usize = 65535;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Tcp => write!(f, "TCP"),
        }
    }
}

/// Sends one query and waits for its response.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Exchanges `query` with `server`. The whole exchange, including a
    /// retry over TCP after a truncated UDP answer, is bounded by
    /// `deadline`; running out yields [`DnsError::Timeout`].
    async fn exchange(
        &self,
        query: &DNSPacket,
        server: SocketAddr,
        protocol: Protocol,
        deadline: Duration,
    ) -> Result<DNSPacket>;
}

/// Transport over real UDP and TCP sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkTransport;

impl NetworkTransport {
    pub fn new() -> Self {
        Self
    }

    /// Send query via UDP, switching to TCP when the answer is truncated
    async fn udp_with_fallback(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        server: SocketAddr,
    ) -> Result<DNSPacket> {
        let response = self.send_udp_query(query, query_bytes, server).await?;
        if response.is_truncated() {
            debug!("UDP response from {} truncated, retrying with TCP", server);
            return self.send_tcp_query(query, query_bytes, server).await;
        }
        Ok(response)
    }

    async fn send_udp_query(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        server: SocketAddr,
    ) -> Result<DNSPacket> {
        let bind_addr = if server.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; MAX_UDP_RESPONSE];
        loop {
            let response_len = socket.recv(&mut response_buf).await?;
            let datagram = &response_buf[..response_len];
            trace!(
                "Raw UDP response data ({} bytes): {:02x?}",
                response_len,
                &datagram[..response_len.min(64)]
            );

            match DNSPacket::parse(datagram) {
                Ok(response) if response.answers_query(query) => {
                    log_response_details(&response, response_len, Protocol::Udp);
                    return Ok(response);
                }
                Ok(response) => {
                    debug!(
                        "Discarding UDP datagram with id {} not matching query {}",
                        response.header.id, query.header.id
                    );
                }
                Err(e) if carries_id(datagram, query.header.id) => {
                    debug!("Failed to parse UDP response from {}: {}", server, e);
                    return Err(DnsError::Parse(format!("Failed to parse response: {}", e)));
                }
                Err(e) => {
                    debug!("Discarding malformed UDP datagram from {}: {}", server, e);
                }
            }
        }
    }

    async fn send_tcp_query(
        &self,
        query: &DNSPacket,
        query_bytes: &[u8],
        server: SocketAddr,
    ) -> Result<DNSPacket> {
        let query_length = u16::try_from(query_bytes.len())
            .map_err(|_| DnsError::InvalidPacket("query exceeds 65535 octets".to_string()))?;

        let mut stream = TcpStream::connect(server).await?;
        stream.write_all(&query_length.to_be_bytes()).await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0; response_length];
        stream.read_exact(&mut response_buf).await?;
        trace!(
            "Raw TCP response data ({} bytes): {:02x?}",
            response_length,
            &response_buf[..response_length.min(64)]
        );

        let response = DNSPacket::parse(&response_buf).map_err(|e| {
            debug!("Failed to parse TCP response from {}: {}", server, e);
            DnsError::Parse(format!("Failed to parse response: {}", e))
        })?;

        if !response.answers_query(query) {
            return Err(DnsError::InvalidPacket(format!(
                "TCP response id {} does not answer query {}",
                response.header.id, query.header.id
            )));
        }

        log_response_details(&response, response_length, Protocol::Tcp);
        Ok(response)
    }
}

#[async_trait]
impl DnsTransport for NetworkTransport {
    async fn exchange(
        &self,
        query: &DNSPacket,
        server: SocketAddr,
        protocol: Protocol,
        deadline: Duration,
    ) -> Result<DNSPacket> {
        let query_bytes = query
            .serialize()
            .map_err(|e| DnsError::Parse(format!("Failed to serialize query: {}", e)))?;
        trace!(
            "Sending {} bytes to {} over {}",
            query_bytes.len(),
            server,
            protocol
        );

        let exchange = async {
            match protocol {
                Protocol::Udp => self.udp_with_fallback(query, &query_bytes, server).await,
                Protocol::Tcp => self.send_tcp_query(query, &query_bytes, server).await,
            }
        };

        timeout(deadline, exchange)
            .await
            .map_err(|_| DnsError::Timeout)?
    }
}

fn carries_id(datagram: &[u8], id: u16) -> bool {
    datagram.len() >= 2 && u16::from_be_bytes([datagram[0], datagram[1]]) == id
}

fn log_response_details(response: &DNSPacket, response_len: usize, protocol: Protocol) {
    debug!(
        "Parsed {} response: {} bytes, rcode={}, answers={}, authorities={}, additional={}",
        protocol,
        response_len,
        response.rcode(),
        response.answers.len(),
        response.authorities.len(),
        response.resources.len()
    );

    for (i, answer) in response.answers.iter().enumerate() {
        let rdata_display = match &answer.parsed_rdata {
            Some(parsed) => parsed.to_string(),
            None => format!("raw={:02x?}", &answer.rdata[..answer.rdata.len().min(16)]),
        };
        trace!(
            "Answer {}: {} {} {} {} {}",
            i,
            answer.name(),
            answer.ttl,
            answer.rclass,
            answer.rtype,
            rdata_display
        );
    }
}
