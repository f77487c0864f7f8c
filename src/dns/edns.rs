use super::ParseError;

/// Payload size advertised on every query
pub const DEFAULT_EDNS_PAYLOAD: u16 = 2048;

/// EDNS0 OPT pseudo-record (RFC 6891)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOpt {
    /// UDP payload size the sender can reassemble, carried in the CLASS field
    pub udp_payload_size: u16,
    /// Upper eight bits of the extended RCODE
    pub extended_rcode: u8,
    pub version: u8,
    pub flags: u16,
    pub options: Vec<EdnsOption>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Vec<u8>,
}

impl Default for EdnsOpt {
    fn default() -> Self {
        Self::with_payload_size(DEFAULT_EDNS_PAYLOAD)
    }
}

impl EdnsOpt {
    pub fn with_payload_size(payload_size: u16) -> Self {
        Self {
            udp_payload_size: payload_size,
            extended_rcode: 0,
            version: 0,
            flags: 0,
            options: Vec::new(),
        }
    }

    /// DNSSEC OK bit
    pub fn do_flag(&self) -> bool {
        (self.flags & 0x8000) != 0
    }

    /// Builds the OPT record from the CLASS, TTL and RDATA fields of a
    /// resource record of type OPT.
    pub fn parse_from_resource(class: u16, ttl: u32, rdata: &[u8]) -> Result<Self, ParseError> {
        let mut options = Vec::new();
        let mut pos = 0;

        while pos + 4 <= rdata.len() {
            let code = u16::from_be_bytes([rdata[pos], rdata[pos + 1]]);
            let len = u16::from_be_bytes([rdata[pos + 2], rdata[pos + 3]]) as usize;
            pos += 4;
            let data = rdata
                .get(pos..pos + len)
                .ok_or_else(|| ParseError::InvalidRData("OPT option overruns rdata".into()))?;
            options.push(EdnsOption {
                code,
                data: data.to_vec(),
            });
            pos += len;
        }
        if pos != rdata.len() {
            return Err(ParseError::InvalidRData("truncated OPT option header".into()));
        }

        Ok(EdnsOpt {
            udp_payload_size: class,
            extended_rcode: (ttl >> 24) as u8,
            version: (ttl >> 16) as u8,
            flags: ttl as u16,
            options,
        })
    }

    /// Returns the (CLASS, TTL, RDATA) triple for the wire.
    pub fn to_resource_format(&self) -> (u16, u32, Vec<u8>) {
        let ttl = ((self.extended_rcode as u32) << 24)
            | ((self.version as u32) << 16)
            | (self.flags as u32);

        let mut rdata = Vec::new();
        for option in &self.options {
            rdata.extend_from_slice(&option.code.to_be_bytes());
            rdata.extend_from_slice(&(option.data.len() as u16).to_be_bytes());
            rdata.extend_from_slice(&option.data);
        }

        (self.udp_payload_size, ttl, rdata)
    }
}

impl std::fmt::Display for EdnsOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "EDNS{}: payload={}, flags=0x{:04x}, options={}",
            self.version,
            self.udp_payload_size,
            self.flags,
            self.options.len()
        )
    }
}
