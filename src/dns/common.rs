use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::ParseError;

/// Upper bound on compression pointers followed while decoding one name
const MAX_POINTER_JUMPS: usize = 64;

/// Maximum encoded length of a domain name (RFC 1035 2.3.4)
pub const MAX_NAME_LENGTH: usize = 255;

pub const MAX_LABEL_LENGTH: usize = 63;

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError>;

    fn read_labels<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<Vec<String>, ParseError> {
        self.read_labels_with_buffer(reader, None)
    }

    /// Reads a name, following compression pointers into `packet_buf`.
    ///
    /// The reader is left right after the terminating zero octet or after
    /// the first pointer, whichever comes first.
    fn read_labels_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: Option<&[u8]>,
    ) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        loop {
            let label_len = reader.read_var::<u8>(8)?;
            if label_len == 0 {
                break;
            }
            match label_len & 0xC0 {
                0x00 => {
                    let mut buf = vec![0; label_len as usize];
                    reader.read_bytes(&mut buf)?;
                    labels.push(escape_label(&buf));
                }
                0xC0 => {
                    let low = reader.read_var::<u8>(8)?;
                    let offset = (((label_len & 0x3F) as usize) << 8) | low as usize;
                    let packet = packet_buf.ok_or(ParseError::InvalidLabel)?;
                    let (mut rest, _) = read_name_at(packet, offset, packet)?;
                    labels.append(&mut rest);
                    break;
                }
                _ => return Err(ParseError::InvalidLabel),
            }
        }
        check_name_length(&labels)?;
        Ok(labels)
    }

    /// Writes a name uncompressed, always terminated by the root label.
    /// Labels are in presentation form and are unescaped first.
    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[String],
    ) -> Result<(), ParseError> {
        for label in labels.iter().filter(|l| !l.is_empty()) {
            let octets = unescape_label(label);
            if octets.len() > MAX_LABEL_LENGTH {
                return Err(ParseError::InvalidLabel);
            }
            writer.write_var::<u8>(8, octets.len() as u8)?;
            writer.write_bytes(&octets)?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}

/// Decodes a name starting at `start` in `data`.
///
/// Labels are read from `data` until a compression pointer is met; pointers
/// are resolved against `packet`, the full message. Returns the labels and
/// the position in `data` just past the name.
pub fn read_name_at(
    data: &[u8],
    start: usize,
    packet: &[u8],
) -> Result<(Vec<String>, usize), ParseError> {
    let mut labels = Vec::new();
    let mut buf = data;
    let mut pos = start;
    let mut end = None;
    let mut jumps = 0;

    loop {
        let len = *buf.get(pos).ok_or(ParseError::InvalidLabel)?;
        match len & 0xC0 {
            0x00 => {
                if len == 0 {
                    pos += 1;
                    break;
                }
                let label = buf
                    .get(pos + 1..pos + 1 + len as usize)
                    .ok_or(ParseError::InvalidLabel)?;
                labels.push(escape_label(label));
                pos += 1 + len as usize;
            }
            0xC0 => {
                let low = *buf.get(pos + 1).ok_or(ParseError::InvalidLabel)?;
                if end.is_none() {
                    end = Some(pos + 2);
                }
                jumps += 1;
                if jumps > MAX_POINTER_JUMPS {
                    return Err(ParseError::InvalidLabel);
                }
                buf = packet;
                pos = (((len & 0x3F) as usize) << 8) | low as usize;
            }
            _ => return Err(ParseError::InvalidLabel),
        }
    }

    check_name_length(&labels)?;
    Ok((labels, end.unwrap_or(pos)))
}

fn check_name_length(labels: &[String]) -> Result<(), ParseError> {
    let total: usize = labels
        .iter()
        .map(|l| unescape_label(l).len() + 1)
        .sum::<usize>()
        + 1;
    if total > MAX_NAME_LENGTH {
        return Err(ParseError::InvalidLabel);
    }
    Ok(())
}

/// Encodes a name given in text form (`www.example.com.`) to wire format.
pub fn encode_name(name: &str, out: &mut Vec<u8>) {
    for label in name_to_labels(name) {
        let octets = unescape_label(&label);
        out.push(octets.len() as u8);
        out.extend_from_slice(&octets);
    }
    out.push(0);
}

/// Splits a textual name into its non-empty labels, each in canonical
/// presentation form. A name that does not parse is split on every dot.
pub fn name_to_labels(name: &str) -> Vec<String> {
    match parse_name(name) {
        Ok((labels, _)) => labels.iter().map(|l| escape_label(l)).collect(),
        Err(_) => name
            .split('.')
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect(),
    }
}

/// Joins labels into a lower-cased, fully qualified name (`.` for the root).
///
/// Only ASCII letters are folded (RFC 4343).
pub fn labels_to_fqdn(labels: &[String]) -> String {
    let mut name = labels
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(".");
    name.push('.');
    name
}

/// Splits a name in presentation form into label octets, resolving `\X`
/// and `\DDD` escapes. The flag is set when the name ends in an unescaped
/// dot, i.e. it is already absolute.
pub fn parse_name(name: &str) -> Result<(Vec<Vec<u8>>, bool), ParseError> {
    if name == "." {
        return Ok((Vec::new(), true));
    }
    if name.is_empty() {
        return Err(ParseError::InvalidLabel);
    }

    let bytes = name.as_bytes();
    let mut labels = Vec::new();
    let mut label = Vec::new();
    let mut absolute = false;
    let mut i = 0;
    while i < bytes.len() {
        absolute = false;
        match bytes[i] {
            b'.' => {
                if label.is_empty() {
                    return Err(ParseError::InvalidLabel);
                }
                labels.push(std::mem::take(&mut label));
                absolute = true;
                i += 1;
            }
            b'\\' => {
                let (octet, used) = unescape_at(bytes, i)?;
                label.push(octet);
                i += used;
            }
            b => {
                label.push(b);
                i += 1;
            }
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(ParseError::InvalidLabel);
        }
    }
    if !label.is_empty() {
        labels.push(label);
    }
    Ok((labels, absolute))
}

/// Presentation form of one label: specials are backslash-escaped and
/// octets outside printable ASCII become `\DDD`.
pub fn escape_label(octets: &[u8]) -> String {
    let mut s = String::with_capacity(octets.len());
    for &b in octets {
        match b {
            b'.' | b'\\' | b'"' | b'(' | b')' | b';' | b'@' | b'$' => {
                s.push('\\');
                s.push(b as char);
            }
            0x21..=0x7E => s.push(b as char),
            _ => s.push_str(&format!("\\{:03}", b)),
        }
    }
    s
}

/// Octets of one label in presentation form. A malformed escape is kept
/// as literal text.
pub fn unescape_label(label: &str) -> Vec<u8> {
    let bytes = label.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let Ok((octet, used)) = unescape_at(bytes, i) {
                out.push(octet);
                i += used;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Decodes the escape starting at `bytes[i]` (a backslash). Returns the
/// octet and the number of input bytes consumed.
fn unescape_at(bytes: &[u8], i: usize) -> Result<(u8, usize), ParseError> {
    match bytes.get(i + 1..i + 4) {
        Some(digits) if digits.iter().all(u8::is_ascii_digit) => {
            let value = digits
                .iter()
                .fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16);
            let octet = u8::try_from(value).map_err(|_| ParseError::InvalidLabel)?;
            Ok((octet, 4))
        }
        _ => bytes
            .get(i + 1)
            .map(|&b| (b, 2))
            .ok_or(ParseError::InvalidLabel),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_to_fqdn() {
        let labels = vec!["WWW".to_string(), "Example".to_string(), "com".to_string()];
        assert_eq!(labels_to_fqdn(&labels), "www.example.com.");
        assert_eq!(labels_to_fqdn(&[]), ".");
    }

    #[test]
    fn test_encode_name() {
        let mut out = Vec::new();
        encode_name("ns.example.", &mut out);
        assert_eq!(
            out,
            vec![2, b'n', b's', 7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0]
        );

        let mut root = Vec::new();
        encode_name(".", &mut root);
        assert_eq!(root, vec![0]);
    }

    #[test]
    fn test_read_name_with_pointer() {
        // "example." at offset 0, then "www" + pointer to offset 0
        let packet = vec![
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 0, 3, b'w', b'w', b'w', 0xC0, 0x00,
        ];
        let (labels, end) = read_name_at(&packet, 9, &packet).unwrap();
        assert_eq!(labels, vec!["www", "example"]);
        assert_eq!(end, packet.len());
    }

    #[test]
    fn test_escaped_dot_stays_in_label() {
        let (labels, absolute) = parse_name("a\\.b.example.").unwrap();
        assert!(absolute);
        assert_eq!(labels, vec![b"a.b".to_vec(), b"example".to_vec()]);

        let mut out = Vec::new();
        encode_name("a\\.b.example.", &mut out);
        assert_eq!(out[..4], [3, b'a', b'.', b'b']);

        let (read, _) = read_name_at(&out, 0, &out).unwrap();
        assert_eq!(labels_to_fqdn(&read), "a\\.b.example.");
    }

    #[test]
    fn test_decimal_escapes() {
        let (labels, absolute) = parse_name("\\065\\200x").unwrap();
        assert!(!absolute);
        assert_eq!(labels, vec![vec![b'A', 200, b'x']]);
        assert_eq!(escape_label(&labels[0]), "A\\200x");
        assert_eq!(name_to_labels("\\065\\200x.com"), vec!["A\\200x", "com"]);

        assert!(parse_name("\\256").is_err());
        assert!(parse_name("a..b").is_err());
        assert!(parse_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_case_folding_is_ascii_only() {
        let labels = vec!["\\195\\137T".to_string(), "\u{c9}x".to_string()];
        assert_eq!(labels_to_fqdn(&labels), "\\195\\137t.\u{c9}x.");
    }

    #[test]
    fn test_read_name_pointer_loop_is_rejected() {
        let packet = vec![0xC0, 0x00];
        assert!(read_name_at(&packet, 0, &packet).is_err());
    }
}
