use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::opaque;
use super::parser::Token;
use super::{Result, ZoneError};
use crate::dns::common::{MAX_NAME_LENGTH, escape_label, labels_to_fqdn, parse_name};
use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::rdata::RData;

/// A single resource record read from a zone file, with its owner made
/// absolute and its TTL resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Fully qualified, lower-cased owner name
    pub name: String,
    pub ttl: u32,
    pub class: DNSResourceClass,
    pub rtype: DNSResourceType,
    pub rdata: RData,
}

impl ZoneRecord {
    pub fn new(
        name: String,
        ttl: u32,
        class: DNSResourceClass,
        rtype: DNSResourceType,
        rdata: RData,
    ) -> Self {
        Self {
            name,
            ttl,
            class,
            rtype,
            rdata,
        }
    }
}

impl fmt::Display for ZoneRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.name, self.ttl, self.class, self.rtype, self.rdata
        )
    }
}

/// Parses a TTL, accepting plain seconds or unit suffixes (`s`, `m`, `h`,
/// `d`, `w`) that may be combined, as in `1h30m`.
pub fn parse_ttl(s: &str) -> Result<u32> {
    let invalid = || ZoneError::InvalidTTL(s.to_string());
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut pending_digits = false;
    for ch in s.chars() {
        if let Some(d) = ch.to_digit(10) {
            current = current * 10 + d as u64;
            if current > u32::MAX as u64 {
                return Err(invalid());
            }
            pending_digits = true;
            continue;
        }
        let unit = match ch.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            'd' => 86400,
            'w' => 604800,
            _ => return Err(invalid()),
        };
        if !pending_digits {
            return Err(invalid());
        }
        total += current * unit;
        current = 0;
        pending_digits = false;
    }
    total += current;

    u32::try_from(total).map_err(|_| invalid())
}

/// Makes `name` absolute against `origin` (itself absolute, lower-cased).
///
/// Escapes (`\.`, `\DDD`) are resolved, so the result is the canonical
/// presentation form that wire names decode to.
pub fn absolute_name(name: &str, origin: &str) -> Result<String> {
    if name == "@" {
        return Ok(origin.to_string());
    }

    let invalid = || ZoneError::InvalidDomainName(name.to_string());
    let (mut labels, absolute) = parse_name(name).map_err(|_| invalid())?;
    if !absolute {
        let (origin_labels, _) = parse_name(origin).map_err(|_| invalid())?;
        labels.extend(origin_labels);
    }

    let encoded: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if encoded > MAX_NAME_LENGTH {
        return Err(invalid());
    }
    let labels: Vec<String> = labels.iter().map(|l| escape_label(l)).collect();
    Ok(labels_to_fqdn(&labels))
}

/// Parses the presentation form of a record's data.
///
/// Types without a presentation parser are accepted only in the RFC 3597
/// `\#` form; otherwise [`ZoneError::UnsupportedType`] is returned so the
/// caller can skip the record.
pub fn parse_rdata(rtype: DNSResourceType, tokens: &[Token], origin: &str) -> Result<RData> {
    if tokens.is_empty() {
        return Err(ZoneError::ParseError("Missing RDATA".to_string()));
    }
    if tokens[0].text == "\\#" && !tokens[0].quoted {
        return parse_generic(rtype, &tokens[1..]).map_err(ZoneError::ParseError);
    }
    if !has_presentation_parser(rtype) {
        return Err(ZoneError::UnsupportedType(rtype.to_string()));
    }
    parse_presentation(rtype, tokens, origin).map_err(ZoneError::ParseError)
}

fn has_presentation_parser(rtype: DNSResourceType) -> bool {
    !matches!(
        rtype,
        DNSResourceType::LOC
            | DNSResourceType::SVCB
            | DNSResourceType::HTTPS
            | DNSResourceType::OPT
            | DNSResourceType::AXFR
            | DNSResourceType::ANY
            | DNSResourceType::Unknown(_)
    )
}

fn parse_presentation(
    rtype: DNSResourceType,
    tokens: &[Token],
    origin: &str,
) -> std::result::Result<RData, String> {
    let name = |t: &Token| absolute_name(&t.text, origin).map_err(|e| e.to_string());

    match rtype {
        DNSResourceType::A => {
            expect_fields(rtype, tokens, 1)?;
            let addr: Ipv4Addr = tokens[0]
                .text
                .parse()
                .map_err(|_| format!("Invalid IPv4 address: {}", tokens[0].text))?;
            Ok(RData::A(addr))
        }
        DNSResourceType::AAAA => {
            expect_fields(rtype, tokens, 1)?;
            let addr: Ipv6Addr = tokens[0]
                .text
                .parse()
                .map_err(|_| format!("Invalid IPv6 address: {}", tokens[0].text))?;
            Ok(RData::AAAA(addr))
        }
        DNSResourceType::NS => {
            expect_fields(rtype, tokens, 1)?;
            Ok(RData::NS(name(&tokens[0])?))
        }
        DNSResourceType::CNAME => {
            expect_fields(rtype, tokens, 1)?;
            Ok(RData::CNAME(name(&tokens[0])?))
        }
        DNSResourceType::PTR => {
            expect_fields(rtype, tokens, 1)?;
            Ok(RData::PTR(name(&tokens[0])?))
        }
        DNSResourceType::DNAME => {
            expect_fields(rtype, tokens, 1)?;
            Ok(RData::DNAME(name(&tokens[0])?))
        }
        DNSResourceType::MX => {
            expect_fields(rtype, tokens, 2)?;
            Ok(RData::MX {
                preference: number(&tokens[0], "MX preference")?,
                exchange: name(&tokens[1])?,
            })
        }
        DNSResourceType::SOA => {
            expect_fields(rtype, tokens, 7)?;
            let timer = |t: &Token| parse_ttl(&t.text).map_err(|e| e.to_string());
            Ok(RData::SOA {
                mname: name(&tokens[0])?,
                rname: name(&tokens[1])?,
                serial: number(&tokens[2], "SOA serial")?,
                refresh: timer(&tokens[3])?,
                retry: timer(&tokens[4])?,
                expire: timer(&tokens[5])?,
                minimum: timer(&tokens[6])?,
            })
        }
        DNSResourceType::SRV => {
            expect_fields(rtype, tokens, 4)?;
            Ok(RData::SRV {
                priority: number(&tokens[0], "SRV priority")?,
                weight: number(&tokens[1], "SRV weight")?,
                port: number(&tokens[2], "SRV port")?,
                target: name(&tokens[3])?,
            })
        }
        DNSResourceType::TXT => Ok(RData::TXT(character_strings(tokens)?)),
        DNSResourceType::SPF => Ok(RData::SPF(character_strings(tokens)?)),
        DNSResourceType::NAPTR => {
            expect_fields(rtype, tokens, 6)?;
            Ok(RData::NAPTR {
                order: number(&tokens[0], "NAPTR order")?,
                preference: number(&tokens[1], "NAPTR preference")?,
                flags: decode_text(&tokens[2].text)?,
                services: decode_text(&tokens[3].text)?,
                regexp: decode_text(&tokens[4].text)?,
                replacement: name(&tokens[5])?,
            })
        }
        DNSResourceType::CAA => {
            expect_fields(rtype, tokens, 3)?;
            Ok(RData::CAA {
                flags: number(&tokens[0], "CAA flags")?,
                tag: tokens[1].text.to_ascii_lowercase(),
                value: decode_text(&tokens[2].text)?,
            })
        }
        DNSResourceType::HINFO => {
            expect_fields(rtype, tokens, 2)?;
            Ok(RData::HINFO {
                cpu: decode_text(&tokens[0].text)?,
                os: decode_text(&tokens[1].text)?,
            })
        }
        DNSResourceType::DS | DNSResourceType::CDS => wire(rtype, opaque::ds(tokens)),
        DNSResourceType::SSHFP => wire(rtype, opaque::sshfp(tokens)),
        DNSResourceType::TLSA => wire(rtype, opaque::tlsa(tokens)),
        DNSResourceType::DNSKEY | DNSResourceType::CDNSKEY => wire(rtype, opaque::dnskey(tokens)),
        DNSResourceType::OPENPGPKEY => wire(rtype, opaque::openpgpkey(tokens)),
        DNSResourceType::RRSIG => wire(rtype, opaque::rrsig(tokens, origin)),
        DNSResourceType::NSEC => wire(rtype, opaque::nsec(tokens, origin)),
        DNSResourceType::NSEC3 => wire(rtype, opaque::nsec3(tokens)),
        DNSResourceType::NSEC3PARAM => wire(rtype, opaque::nsec3param(tokens)),
        DNSResourceType::URI => wire(rtype, opaque::uri(tokens)),
        other => Err(format!(
            "{} records are only supported in the \\# generic form",
            other
        )),
    }
}

/// Goes through the wire decoder so the result equals what a response
/// carrying the same octets decodes to.
fn wire(
    rtype: DNSResourceType,
    data: std::result::Result<Vec<u8>, String>,
) -> std::result::Result<RData, String> {
    let data = data?;
    RData::from_wire(rtype, &data, &data).map_err(|e| e.to_string())
}

/// One or more character-strings, longer ones split at 255 octets
fn character_strings(tokens: &[Token]) -> std::result::Result<Vec<Vec<u8>>, String> {
    let mut strings = Vec::new();
    for token in tokens {
        let bytes = decode_text(&token.text)?;
        if bytes.is_empty() {
            strings.push(Vec::new());
        }
        strings.extend(bytes.chunks(255).map(|c| c.to_vec()));
    }
    Ok(strings)
}

/// RFC 3597 `\# <length> <hex>...`
fn parse_generic(rtype: DNSResourceType, tokens: &[Token]) -> std::result::Result<RData, String> {
    let length_token = tokens
        .first()
        .ok_or_else(|| "Generic RDATA requires a length".to_string())?;
    let length: usize = length_token
        .text
        .parse()
        .map_err(|_| format!("Invalid generic RDATA length: {}", length_token.text))?;
    let hex_text: String = tokens[1..].iter().map(|t| t.text.as_str()).collect();
    let data = hex::decode(&hex_text).map_err(|e| format!("Invalid generic RDATA hex: {}", e))?;
    if data.len() != length {
        return Err(format!(
            "Generic RDATA length {} does not match {} octets of data",
            length,
            data.len()
        ));
    }
    RData::from_wire(rtype, &data, &data).map_err(|e| e.to_string())
}

fn expect_fields(
    rtype: DNSResourceType,
    tokens: &[Token],
    count: usize,
) -> std::result::Result<(), String> {
    if tokens.len() != count {
        return Err(format!(
            "{} record requires {} fields, got {}",
            rtype,
            count,
            tokens.len()
        ));
    }
    Ok(())
}

fn number<T: std::str::FromStr>(token: &Token, what: &str) -> std::result::Result<T, String> {
    token
        .text
        .parse()
        .map_err(|_| format!("Invalid {}: {}", what, token.text))
}

/// Resolves `\X` and `\DDD` escapes of a character-string.
fn decode_text(raw: &str) -> std::result::Result<Vec<u8>, String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match bytes.get(i + 1..i + 4) {
            Some(digits) if digits.iter().all(u8::is_ascii_digit) => {
                let value = digits
                    .iter()
                    .fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16);
                let value =
                    u8::try_from(value).map_err(|_| format!("Invalid escape in {}", raw))?;
                out.push(value);
                i += 4;
            }
            _ => {
                let escaped = bytes
                    .get(i + 1)
                    .ok_or_else(|| format!("Dangling escape in {}", raw))?;
                out.push(*escaped);
                i += 2;
            }
        }
    }
    Ok(out)
}
