//! Presentation parsers for record types that are compared as raw wire
//! data: DNSSEC, fingerprint and key types. Each returns the rdata octets
//! exactly as a name server would send them.

use std::collections::BTreeSet;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::NaiveDateTime;

use super::parser::Token;
use super::record::absolute_name;
use crate::dns::common::encode_name;
use crate::dns::enums::DNSResourceType;

type Result<T> = std::result::Result<T, String>;

/// Base32 with the extended hex alphabet (RFC 4648 section 7)
const BASE32HEX: &[u8; 32] = b"0123456789ABCDEFGHIJKLMNOPQRSTUV";
const BASE32: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// `key-tag algorithm digest-type digest`, for DS and CDS
pub fn ds(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 4, "DS")?;
    let mut out = Vec::new();
    out.extend_from_slice(&number::<u16>(&tokens[0], "key tag")?.to_be_bytes());
    out.push(algorithm(&tokens[1])?);
    out.push(number(&tokens[2], "digest type")?);
    out.extend(hex_field(&tokens[3..])?);
    Ok(out)
}

/// `algorithm fp-type fingerprint`
pub fn sshfp(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 3, "SSHFP")?;
    let mut out = vec![
        number(&tokens[0], "SSHFP algorithm")?,
        number(&tokens[1], "SSHFP fingerprint type")?,
    ];
    out.extend(hex_field(&tokens[2..])?);
    Ok(out)
}

/// `usage selector matching-type data`
pub fn tlsa(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 4, "TLSA")?;
    let mut out = vec![
        number(&tokens[0], "TLSA usage")?,
        number(&tokens[1], "TLSA selector")?,
        number(&tokens[2], "TLSA matching type")?,
    ];
    out.extend(hex_field(&tokens[3..])?);
    Ok(out)
}

/// `flags protocol algorithm public-key`, for DNSKEY and CDNSKEY
pub fn dnskey(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 4, "DNSKEY")?;
    let mut out = Vec::new();
    out.extend_from_slice(&number::<u16>(&tokens[0], "DNSKEY flags")?.to_be_bytes());
    out.push(number(&tokens[1], "DNSKEY protocol")?);
    out.push(algorithm(&tokens[2])?);
    out.extend(base64_field(&tokens[3..])?);
    Ok(out)
}

pub fn openpgpkey(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 1, "OPENPGPKEY")?;
    base64_field(tokens)
}

/// `type-covered algorithm labels original-ttl expiration inception
/// key-tag signer signature`
pub fn rrsig(tokens: &[Token], origin: &str) -> Result<Vec<u8>> {
    at_least(tokens, 9, "RRSIG")?;
    let covered: DNSResourceType = tokens[0].text.parse()?;
    let mut out = Vec::new();
    out.extend_from_slice(&u16::from(covered).to_be_bytes());
    out.push(algorithm(&tokens[1])?);
    out.push(number(&tokens[2], "RRSIG labels")?);
    out.extend_from_slice(&number::<u32>(&tokens[3], "RRSIG original TTL")?.to_be_bytes());
    out.extend_from_slice(&timestamp(&tokens[4])?.to_be_bytes());
    out.extend_from_slice(&timestamp(&tokens[5])?.to_be_bytes());
    out.extend_from_slice(&number::<u16>(&tokens[6], "RRSIG key tag")?.to_be_bytes());
    encode_name(&name(&tokens[7], origin)?, &mut out);
    out.extend(base64_field(&tokens[8..])?);
    Ok(out)
}

/// `next-name type...`
pub fn nsec(tokens: &[Token], origin: &str) -> Result<Vec<u8>> {
    at_least(tokens, 1, "NSEC")?;
    let mut out = Vec::new();
    encode_name(&name(&tokens[0], origin)?, &mut out);
    out.extend(type_bitmap(&tokens[1..])?);
    Ok(out)
}

/// `algorithm flags iterations salt`
pub fn nsec3param(tokens: &[Token]) -> Result<Vec<u8>> {
    if tokens.len() != 4 {
        return Err(format!(
            "NSEC3PARAM record requires 4 fields, got {}",
            tokens.len()
        ));
    }
    let mut out = nsec3_prefix(tokens)?;
    out.extend(salt(&tokens[3])?);
    Ok(out)
}

/// `algorithm flags iterations salt next-hashed-owner type...`
pub fn nsec3(tokens: &[Token]) -> Result<Vec<u8>> {
    at_least(tokens, 5, "NSEC3")?;
    let mut out = nsec3_prefix(tokens)?;
    out.extend(salt(&tokens[3])?);

    let hash = base32hex(&tokens[4].text)?;
    let len = u8::try_from(hash.len()).map_err(|_| "NSEC3 hash too long".to_string())?;
    out.push(len);
    out.extend(hash);
    out.extend(type_bitmap(&tokens[5..])?);
    Ok(out)
}

/// `priority weight "target"`
pub fn uri(tokens: &[Token]) -> Result<Vec<u8>> {
    if tokens.len() != 3 {
        return Err(format!("URI record requires 3 fields, got {}", tokens.len()));
    }
    let mut out = Vec::new();
    out.extend_from_slice(&number::<u16>(&tokens[0], "URI priority")?.to_be_bytes());
    out.extend_from_slice(&number::<u16>(&tokens[1], "URI weight")?.to_be_bytes());
    out.extend_from_slice(tokens[2].text.as_bytes());
    Ok(out)
}

fn nsec3_prefix(tokens: &[Token]) -> Result<Vec<u8>> {
    let mut out = vec![
        number(&tokens[0], "NSEC3 hash algorithm")?,
        number(&tokens[1], "NSEC3 flags")?,
    ];
    out.extend_from_slice(&number::<u16>(&tokens[2], "NSEC3 iterations")?.to_be_bytes());
    Ok(out)
}

/// Length-prefixed salt, `-` for none
fn salt(token: &Token) -> Result<Vec<u8>> {
    if token.text == "-" {
        return Ok(vec![0]);
    }
    let salt = hex::decode(&token.text).map_err(|e| format!("Invalid NSEC3 salt: {}", e))?;
    let len = u8::try_from(salt.len()).map_err(|_| "NSEC3 salt too long".to_string())?;
    let mut out = vec![len];
    out.extend(salt);
    Ok(out)
}

fn base32hex(text: &str) -> Result<Vec<u8>> {
    let invalid = || format!("Invalid NSEC3 hashed owner: {}", text);
    let standard = text
        .to_ascii_uppercase()
        .bytes()
        .map(|b| {
            BASE32HEX
                .iter()
                .position(|&c| c == b)
                .map(|i| BASE32[i] as char)
                .ok_or_else(invalid)
        })
        .collect::<Result<String>>()?;
    base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &standard).ok_or_else(invalid)
}

/// Type bitmap of RFC 4034 section 4.1.2: one window per high octet,
/// trimmed after the last non-zero octet.
pub fn type_bitmap(tokens: &[Token]) -> Result<Vec<u8>> {
    let types = tokens
        .iter()
        .map(|t| t.text.parse::<DNSResourceType>().map(u16::from))
        .collect::<Result<BTreeSet<u16>>>()?;

    let mut out = Vec::new();
    let mut window: Option<(u8, Vec<u8>)> = None;
    for code in types {
        let (block, low) = ((code >> 8) as u8, (code & 0xFF) as usize);
        if window.as_ref().is_some_and(|(b, _)| *b != block) {
            if let Some((b, bits)) = window.take() {
                push_window(b, &bits, &mut out);
            }
        }
        let (_, bits) = window.get_or_insert_with(|| (block, Vec::new()));
        if bits.len() <= low / 8 {
            bits.resize(low / 8 + 1, 0);
        }
        bits[low / 8] |= 0x80 >> (low % 8);
    }
    if let Some((b, bits)) = window {
        push_window(b, &bits, &mut out);
    }
    Ok(out)
}

fn push_window(block: u8, bits: &[u8], out: &mut Vec<u8>) {
    out.push(block);
    out.push(bits.len() as u8);
    out.extend_from_slice(bits);
}

/// `YYYYMMDDHHmmSS` in UTC, or seconds since the epoch
fn timestamp(token: &Token) -> Result<u32> {
    let text = &token.text;
    if text.len() == 14 && text.bytes().all(|b| b.is_ascii_digit()) {
        let parsed = NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S")
            .map_err(|e| format!("Invalid RRSIG time {}: {}", text, e))?;
        // Serial number arithmetic (RFC 4034 3.1.5) wraps in 2106
        return Ok(parsed.and_utc().timestamp() as u32);
    }
    number(token, "RRSIG time")
}

/// DNSSEC algorithm number or mnemonic
fn algorithm(token: &Token) -> Result<u8> {
    if let Ok(n) = token.text.parse() {
        return Ok(n);
    }
    let n = match token.text.to_ascii_uppercase().as_str() {
        "RSAMD5" => 1,
        "DH" => 2,
        "DSA" => 3,
        "RSASHA1" => 5,
        "DSA-NSEC3-SHA1" => 6,
        "RSASHA1-NSEC3-SHA1" => 7,
        "RSASHA256" => 8,
        "RSASHA512" => 10,
        "ECC-GOST" => 12,
        "ECDSAP256SHA256" => 13,
        "ECDSAP384SHA384" => 14,
        "ED25519" => 15,
        "ED448" => 16,
        "INDIRECT" => 252,
        "PRIVATEDNS" => 253,
        "PRIVATEOID" => 254,
        _ => return Err(format!("Unknown DNSSEC algorithm: {}", token.text)),
    };
    Ok(n)
}

fn hex_field(tokens: &[Token]) -> Result<Vec<u8>> {
    let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
    hex::decode(&text).map_err(|e| format!("Invalid hex data: {}", e))
}

fn base64_field(tokens: &[Token]) -> Result<Vec<u8>> {
    let text: String = tokens.iter().map(|t| t.text.as_str()).collect();
    BASE64
        .decode(text.as_bytes())
        .map_err(|e| format!("Invalid base64 data: {}", e))
}

fn name(token: &Token, origin: &str) -> Result<String> {
    absolute_name(&token.text, origin).map_err(|e| e.to_string())
}

fn number<T: std::str::FromStr>(token: &Token, what: &str) -> Result<T> {
    token
        .text
        .parse()
        .map_err(|_| format!("Invalid {}: {}", what, token.text))
}

fn at_least(tokens: &[Token], count: usize, what: &str) -> Result<()> {
    if tokens.len() < count {
        return Err(format!(
            "{} record requires at least {} fields, got {}",
            what,
            count,
            tokens.len()
        ));
    }
    Ok(())
}
