pub mod common;
pub mod constants;
pub mod edns;
pub mod enums;
pub mod header;
pub mod question;
pub mod rdata;
pub mod resource;

use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use common::PacketComponent;
use edns::EdnsOpt;
use enums::{DNSResourceClass, DNSResourceType};
use header::DNSHeader;
use question::DNSQuestion;
use resource::DNSResource;
use tracing::{debug, trace};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSPacket {
    pub header: DNSHeader,
    pub questions: Vec<DNSQuestion>,
    pub answers: Vec<DNSResource>,
    pub authorities: Vec<DNSResource>,
    pub resources: Vec<DNSResource>,
    /// EDNS0 OPT record, pulled out of the additional section
    pub edns: Option<EdnsOpt>,
}

#[derive(Debug)]
pub enum ParseError {
    InvalidHeader,
    InvalidLabel,
    InvalidRData(String),
    InvalidBitStream(String),
}

impl From<std::io::Error> for ParseError {
    fn from(e: std::io::Error) -> Self {
        ParseError::InvalidBitStream(e.to_string())
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidHeader => write!(f, "Invalid DNS header"),
            ParseError::InvalidLabel => write!(f, "Invalid DNS label"),
            ParseError::InvalidRData(e) => write!(f, "Invalid record data: {}", e),
            ParseError::InvalidBitStream(e) => write!(f, "Invalid bit stream: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl DNSPacket {
    /// Builds a single-question query. `edns_payload` attaches an OPT
    /// record advertising that UDP payload size.
    pub fn new_query(
        id: u16,
        name: &str,
        qtype: DNSResourceType,
        qclass: DNSResourceClass,
        recursion_desired: bool,
        edns_payload: Option<u16>,
    ) -> Self {
        DNSPacket {
            header: DNSHeader::query(id, recursion_desired),
            questions: vec![DNSQuestion::new(name, qtype, qclass)],
            edns: edns_payload.map(EdnsOpt::with_payload_size),
            ..Default::default()
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        trace!("Parsing DNS packet, size: {} bytes", buf.len());
        if buf.len() < 12 {
            return Err(ParseError::InvalidHeader);
        }
        let mut reader = BitReader::<_, BigEndian>::new(buf);
        let mut packet = DNSPacket::default();
        packet.header.read(&mut reader)?;
        debug!(
            "Parsed DNS header: id={}, qr={}, rcode={}, answers={}",
            packet.header.id, packet.header.qr, packet.header.rcode, packet.header.ancount
        );

        for _ in 0..packet.header.qdcount {
            let mut question = DNSQuestion::default();
            question.read_with_buffer(&mut reader, buf)?;
            packet.questions.push(question);
        }

        for _ in 0..packet.header.ancount {
            let mut answer = DNSResource::default();
            answer.read_with_buffer(&mut reader, buf)?;
            packet.answers.push(answer);
        }

        for _ in 0..packet.header.nscount {
            let mut authority = DNSResource::default();
            authority.read_with_buffer(&mut reader, buf)?;
            packet.authorities.push(authority);
        }

        for _ in 0..packet.header.arcount {
            let mut resource = DNSResource::default();
            resource.read_with_buffer(&mut reader, buf)?;

            if resource.rtype == DNSResourceType::OPT && resource.labels.is_empty() {
                let edns = EdnsOpt::parse_from_resource(
                    resource.rclass.into(),
                    resource.ttl,
                    &resource.rdata,
                )?;
                trace!("Parsed {}", edns);
                packet.edns = Some(edns);
                continue;
            }

            packet.resources.push(resource);
        }

        Ok(packet)
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ParseError> {
        let mut buf = Vec::new();
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);

        let mut header = self.header.clone();
        header.qdcount = self.questions.len() as u16;
        header.ancount = self.answers.len() as u16;
        header.nscount = self.authorities.len() as u16;
        header.arcount = self.resources.len() as u16 + u16::from(self.edns.is_some());
        header.write(&mut writer)?;

        for question in self.questions.iter() {
            question.write(&mut writer)?;
        }
        for answer in self.answers.iter() {
            answer.write(&mut writer)?;
        }
        for authority in self.authorities.iter() {
            authority.write(&mut writer)?;
        }
        for resource in self.resources.iter() {
            resource.write(&mut writer)?;
        }

        if let Some(edns) = &self.edns {
            let (udp_payload_size, ttl, rdata) = edns.to_resource_format();
            // Root owner, TYPE=OPT, CLASS carries the payload size
            writer.write_var::<u8>(8, 0)?;
            writer.write_var::<u16>(16, DNSResourceType::OPT.into())?;
            writer.write_var::<u16>(16, udp_payload_size)?;
            writer.write_var::<u32>(32, ttl)?;
            writer.write_var::<u16>(16, rdata.len() as u16)?;
            writer.write_bytes(&rdata)?;
        }

        Ok(buf)
    }

    /// True when `self` is a response to `query`: QR set, same id and the
    /// same question (names compared case-insensitively).
    pub fn answers_query(&self, query: &DNSPacket) -> bool {
        if !self.header.qr || self.header.id != query.header.id {
            return false;
        }
        match (self.questions.first(), query.questions.first()) {
            (Some(ours), Some(theirs)) => {
                ours.qtype == theirs.qtype
                    && ours.qclass == theirs.qclass
                    && ours.name() == theirs.name()
            }
            // Some servers drop the question from error responses
            (None, _) => self.header.rcode != 0,
            _ => false,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.header.tc
    }

    /// Response code including the upper bits carried by EDNS
    pub fn rcode(&self) -> u16 {
        let upper = self.edns.as_ref().map_or(0, |e| e.extended_rcode as u16);
        (upper << 4) | self.header.rcode as u16
    }
}
