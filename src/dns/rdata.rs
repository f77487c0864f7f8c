use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::{
    ParseError,
    common::{encode_name, labels_to_fqdn, read_name_at},
    enums::DNSResourceType,
};

/// Typed record data.
///
/// Domain names are kept fully qualified and lower-cased, so derived
/// equality is the case-insensitive comparison DNS asks for. Types without
/// a structured form are carried as opaque octets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(String),
    CNAME(String),
    PTR(String),
    DNAME(String),
    MX {
        preference: u16,
        exchange: String,
    },
    TXT(Vec<Vec<u8>>),
    /// Same layout as TXT
    SPF(Vec<Vec<u8>>),
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    NAPTR {
        order: u16,
        preference: u16,
        flags: Vec<u8>,
        services: Vec<u8>,
        regexp: Vec<u8>,
        replacement: String,
    },
    CAA {
        flags: u8,
        tag: String,
        value: Vec<u8>,
    },
    HINFO {
        cpu: Vec<u8>,
        os: Vec<u8>,
    },
    Unknown {
        rtype: u16,
        data: Vec<u8>,
    },
}

impl RData {
    pub fn rtype(&self) -> DNSResourceType {
        match self {
            RData::A(_) => DNSResourceType::A,
            RData::AAAA(_) => DNSResourceType::AAAA,
            RData::NS(_) => DNSResourceType::NS,
            RData::CNAME(_) => DNSResourceType::CNAME,
            RData::PTR(_) => DNSResourceType::PTR,
            RData::DNAME(_) => DNSResourceType::DNAME,
            RData::MX { .. } => DNSResourceType::MX,
            RData::TXT(_) => DNSResourceType::TXT,
            RData::SPF(_) => DNSResourceType::SPF,
            RData::NAPTR { .. } => DNSResourceType::NAPTR,
            RData::SOA { .. } => DNSResourceType::SOA,
            RData::SRV { .. } => DNSResourceType::SRV,
            RData::CAA { .. } => DNSResourceType::CAA,
            RData::HINFO { .. } => DNSResourceType::HINFO,
            RData::Unknown { rtype, .. } => DNSResourceType::from(*rtype),
        }
    }

    /// Decodes the rdata of a record of type `rtype`.
    ///
    /// `packet` is the whole message so that compressed names inside the
    /// rdata can be followed. Pass `rdata` itself when there is no message.
    pub fn from_wire(
        rtype: DNSResourceType,
        rdata: &[u8],
        packet: &[u8],
    ) -> Result<Self, ParseError> {
        let mut cur = Cursor::new(rdata, packet);
        let parsed = match rtype {
            DNSResourceType::A => {
                let octets: [u8; 4] = rdata
                    .try_into()
                    .map_err(|_| invalid(rtype, "expected 4 octets"))?;
                cur.pos = rdata.len();
                RData::A(Ipv4Addr::from(octets))
            }
            DNSResourceType::AAAA => {
                let octets: [u8; 16] = rdata
                    .try_into()
                    .map_err(|_| invalid(rtype, "expected 16 octets"))?;
                cur.pos = rdata.len();
                RData::AAAA(Ipv6Addr::from(octets))
            }
            DNSResourceType::NS => RData::NS(cur.name()?),
            DNSResourceType::CNAME => RData::CNAME(cur.name()?),
            DNSResourceType::PTR => RData::PTR(cur.name()?),
            DNSResourceType::DNAME => RData::DNAME(cur.name()?),
            DNSResourceType::MX => RData::MX {
                preference: cur.u16()?,
                exchange: cur.name()?,
            },
            DNSResourceType::TXT => RData::TXT(cur.character_strings()?),
            DNSResourceType::SPF => RData::SPF(cur.character_strings()?),
            DNSResourceType::NAPTR => RData::NAPTR {
                order: cur.u16()?,
                preference: cur.u16()?,
                flags: cur.character_string()?,
                services: cur.character_string()?,
                regexp: cur.character_string()?,
                replacement: cur.name()?,
            },
            DNSResourceType::SOA => RData::SOA {
                mname: cur.name()?,
                rname: cur.name()?,
                serial: cur.u32()?,
                refresh: cur.u32()?,
                retry: cur.u32()?,
                expire: cur.u32()?,
                minimum: cur.u32()?,
            },
            DNSResourceType::SRV => RData::SRV {
                priority: cur.u16()?,
                weight: cur.u16()?,
                port: cur.u16()?,
                target: cur.name()?,
            },
            DNSResourceType::CAA => {
                let flags = cur.u8()?;
                let tag = cur.character_string()?;
                let tag = String::from_utf8(tag).map_err(|_| invalid(rtype, "tag is not text"))?;
                let value = cur.rest().to_vec();
                RData::CAA {
                    flags,
                    tag: tag.to_ascii_lowercase(),
                    value,
                }
            }
            DNSResourceType::HINFO => RData::HINFO {
                cpu: cur.character_string()?,
                os: cur.character_string()?,
            },
            other => {
                cur.pos = rdata.len();
                RData::Unknown {
                    rtype: other.into(),
                    data: rdata.to_vec(),
                }
            }
        };

        if !cur.done() {
            return Err(invalid(rtype, "trailing octets"));
        }
        Ok(parsed)
    }

    /// Uncompressed wire encoding.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            RData::A(addr) => out.extend_from_slice(&addr.octets()),
            RData::AAAA(addr) => out.extend_from_slice(&addr.octets()),
            RData::NS(name) | RData::CNAME(name) | RData::PTR(name) | RData::DNAME(name) => {
                encode_name(name, &mut out)
            }
            RData::MX {
                preference,
                exchange,
            } => {
                out.extend_from_slice(&preference.to_be_bytes());
                encode_name(exchange, &mut out);
            }
            RData::TXT(strings) | RData::SPF(strings) => {
                for s in strings {
                    push_character_string(s, &mut out);
                }
            }
            RData::NAPTR {
                order,
                preference,
                flags,
                services,
                regexp,
                replacement,
            } => {
                out.extend_from_slice(&order.to_be_bytes());
                out.extend_from_slice(&preference.to_be_bytes());
                for s in [flags, services, regexp] {
                    push_character_string(s, &mut out);
                }
                encode_name(replacement, &mut out);
            }
            RData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                encode_name(mname, &mut out);
                encode_name(rname, &mut out);
                for v in [serial, refresh, retry, expire, minimum] {
                    out.extend_from_slice(&v.to_be_bytes());
                }
            }
            RData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                out.extend_from_slice(&priority.to_be_bytes());
                out.extend_from_slice(&weight.to_be_bytes());
                out.extend_from_slice(&port.to_be_bytes());
                encode_name(target, &mut out);
            }
            RData::CAA { flags, tag, value } => {
                out.push(*flags);
                push_character_string(tag.as_bytes(), &mut out);
                out.extend_from_slice(value);
            }
            RData::HINFO { cpu, os } => {
                push_character_string(cpu, &mut out);
                push_character_string(os, &mut out);
            }
            RData::Unknown { data, .. } => out.extend_from_slice(data),
        }
        out
    }
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(addr) => write!(f, "{}", addr),
            RData::AAAA(addr) => write!(f, "{}", addr),
            RData::NS(name) | RData::CNAME(name) | RData::PTR(name) | RData::DNAME(name) => {
                write!(f, "{}", name)
            }
            RData::MX {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RData::TXT(strings) | RData::SPF(strings) => {
                let quoted: Vec<String> = strings.iter().map(|s| quote(s)).collect();
                write!(f, "{}", quoted.join(" "))
            }
            RData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            RData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            RData::NAPTR {
                order,
                preference,
                flags,
                services,
                regexp,
                replacement,
            } => write!(
                f,
                "{} {} {} {} {} {}",
                order,
                preference,
                quote(flags),
                quote(services),
                quote(regexp),
                replacement
            ),
            RData::CAA { flags, tag, value } => write!(f, "{} {} {}", flags, tag, quote(value)),
            RData::HINFO { cpu, os } => write!(f, "{} {}", quote(cpu), quote(os)),
            RData::Unknown { data, .. } if data.is_empty() => write!(f, "\\# 0"),
            RData::Unknown { data, .. } => {
                write!(f, "\\# {} {}", data.len(), hex::encode_upper(data))
            }
        }
    }
}

/// Quotes a character-string, escaping `"` and `\` and writing
/// non-printable octets as `\DDD`.
fn quote(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() + 2);
    s.push('"');
    for &b in bytes {
        match b {
            b'"' | b'\\' => {
                s.push('\\');
                s.push(b as char);
            }
            0x20..=0x7E => s.push(b as char),
            _ => s.push_str(&format!("\\{:03}", b)),
        }
    }
    s.push('"');
    s
}

fn push_character_string(bytes: &[u8], out: &mut Vec<u8>) {
    // Zone parsing splits longer strings, so this only truncates bad input.
    let len = bytes.len().min(255);
    out.push(len as u8);
    out.extend_from_slice(&bytes[..len]);
}

fn invalid(rtype: DNSResourceType, reason: &str) -> ParseError {
    ParseError::InvalidRData(format!("{}: {}", rtype, reason))
}

struct Cursor<'a> {
    data: &'a [u8],
    packet: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], packet: &'a [u8]) -> Self {
        Self {
            data,
            packet,
            pos: 0,
        }
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let slice = self
            .data
            .get(self.pos..self.pos + n)
            .ok_or_else(|| ParseError::InvalidRData("truncated rdata".to_string()))?;
        self.pos += n;
        Ok(slice)
    }

    fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn character_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let len = self.u8()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn character_strings(&mut self) -> Result<Vec<Vec<u8>>, ParseError> {
        let mut strings = Vec::new();
        while !self.done() {
            strings.push(self.character_string()?);
        }
        Ok(strings)
    }

    fn name(&mut self) -> Result<String, ParseError> {
        let (labels, end) = read_name_at(self.data, self.pos, self.packet)?;
        self.pos = end;
        Ok(labels_to_fqdn(&labels))
    }
}
