use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::{
    ParseError,
    common::{PacketComponent, labels_to_fqdn, name_to_labels},
    enums::{DNSResourceClass, DNSResourceType},
    rdata::RData,
};

/// One resource record as it appears on the wire.
///
/// `rdata` keeps the raw octets exactly as received; `parsed_rdata` is
/// filled by [`DNSResource::read_with_buffer`] when the full message is
/// available to resolve compressed names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DNSResource {
    pub labels: Vec<String>,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdlength: u16,
    pub rdata: Vec<u8>,
    pub parsed_rdata: Option<RData>,
}

impl DNSResource {
    pub fn new(
        name: &str,
        rclass: DNSResourceClass,
        ttl: u32,
        rdata: RData,
    ) -> Result<Self, ParseError> {
        let wire = rdata.to_wire();
        let rdlength = u16::try_from(wire.len())
            .map_err(|_| ParseError::InvalidRData("rdata longer than 65535 octets".into()))?;
        Ok(Self {
            labels: name_to_labels(name),
            rtype: rdata.rtype(),
            rclass,
            ttl,
            rdlength,
            rdata: wire,
            parsed_rdata: Some(rdata),
        })
    }

    pub fn name(&self) -> String {
        labels_to_fqdn(&self.labels)
    }

    pub fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.labels = self.read_labels_with_buffer(reader, Some(packet_buf))?;
        self.read_fixed(reader)?;
        // OPT carries no presentation form, its rdata is handled by edns.
        if self.rtype != DNSResourceType::OPT {
            self.parsed_rdata = Some(RData::from_wire(self.rtype, &self.rdata, packet_buf)?);
        }
        Ok(())
    }

    fn read_fixed<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<(), ParseError> {
        self.rtype = reader.read_var::<u16>(16)?.into();
        self.rclass = reader.read_var::<u16>(16)?.into();
        self.ttl = reader.read_var::<u32>(32)?;
        self.rdlength = reader.read_var::<u16>(16)?;
        let mut buf = vec![0_u8; self.rdlength as usize];
        reader.read_bytes(&mut buf)?;
        self.rdata = buf;
        Ok(())
    }
}

impl PacketComponent for DNSResource {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError> {
        self.write_labels(writer, &self.labels)?;
        writer.write_var::<u16>(16, self.rtype.into())?;
        writer.write_var::<u16>(16, self.rclass.into())?;
        writer.write_var::<u32>(32, self.ttl)?;
        writer.write_var::<u16>(16, self.rdata.len() as u16)?;
        writer.write_bytes(&self.rdata)?;
        Ok(())
    }

    /// Reads a record without access to the enclosing message; names in
    /// the rdata cannot be decompressed, so `parsed_rdata` stays empty.
    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError> {
        self.labels = self.read_labels(reader)?;
        self.read_fixed(reader)?;
        self.parsed_rdata = None;
        Ok(())
    }
}
