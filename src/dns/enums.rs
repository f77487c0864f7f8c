use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DNSResourceType {
    #[default]
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    HINFO,
    MX,
    TXT,
    AAAA,
    LOC,
    SRV,
    NAPTR,
    DNAME,
    OPT,
    DS,
    SSHFP,
    RRSIG,
    NSEC,
    DNSKEY,
    NSEC3,
    NSEC3PARAM,
    TLSA,
    CDS,
    CDNSKEY,
    OPENPGPKEY,
    SVCB,
    HTTPS,
    SPF,
    URI,
    CAA,
    AXFR,
    ANY,
    /// Any type code without a name of its own, kept as is
    Unknown(u16),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DNSResourceClass {
    #[default]
    IN,
    CS,
    CH,
    HS,
    Unknown(u16),
}

impl From<u16> for DNSResourceClass {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceClass::IN,
            2 => DNSResourceClass::CS,
            3 => DNSResourceClass::CH,
            4 => DNSResourceClass::HS,
            x => DNSResourceClass::Unknown(x),
        }
    }
}

impl From<DNSResourceClass> for u16 {
    fn from(class: DNSResourceClass) -> Self {
        match class {
            DNSResourceClass::IN => 1,
            DNSResourceClass::CS => 2,
            DNSResourceClass::CH => 3,
            DNSResourceClass::HS => 4,
            DNSResourceClass::Unknown(x) => x,
        }
    }
}

impl From<u16> for DNSResourceType {
    fn from(value: u16) -> Self {
        match value {
            1 => DNSResourceType::A,
            2 => DNSResourceType::NS,
            5 => DNSResourceType::CNAME,
            6 => DNSResourceType::SOA,
            12 => DNSResourceType::PTR,
            13 => DNSResourceType::HINFO,
            15 => DNSResourceType::MX,
            16 => DNSResourceType::TXT,
            28 => DNSResourceType::AAAA,
            29 => DNSResourceType::LOC,
            33 => DNSResourceType::SRV,
            35 => DNSResourceType::NAPTR,
            39 => DNSResourceType::DNAME,
            41 => DNSResourceType::OPT,
            43 => DNSResourceType::DS,
            44 => DNSResourceType::SSHFP,
            46 => DNSResourceType::RRSIG,
            47 => DNSResourceType::NSEC,
            48 => DNSResourceType::DNSKEY,
            50 => DNSResourceType::NSEC3,
            51 => DNSResourceType::NSEC3PARAM,
            52 => DNSResourceType::TLSA,
            59 => DNSResourceType::CDS,
            60 => DNSResourceType::CDNSKEY,
            61 => DNSResourceType::OPENPGPKEY,
            64 => DNSResourceType::SVCB,
            65 => DNSResourceType::HTTPS,
            99 => DNSResourceType::SPF,
            252 => DNSResourceType::AXFR,
            255 => DNSResourceType::ANY,
            256 => DNSResourceType::URI,
            257 => DNSResourceType::CAA,
            x => DNSResourceType::Unknown(x),
        }
    }
}

impl From<DNSResourceType> for u16 {
    fn from(rtype: DNSResourceType) -> Self {
        match rtype {
            DNSResourceType::A => 1,
            DNSResourceType::NS => 2,
            DNSResourceType::CNAME => 5,
            DNSResourceType::SOA => 6,
            DNSResourceType::PTR => 12,
            DNSResourceType::HINFO => 13,
            DNSResourceType::MX => 15,
            DNSResourceType::TXT => 16,
            DNSResourceType::AAAA => 28,
            DNSResourceType::LOC => 29,
            DNSResourceType::SRV => 33,
            DNSResourceType::NAPTR => 35,
            DNSResourceType::DNAME => 39,
            DNSResourceType::OPT => 41,
            DNSResourceType::DS => 43,
            DNSResourceType::SSHFP => 44,
            DNSResourceType::RRSIG => 46,
            DNSResourceType::NSEC => 47,
            DNSResourceType::DNSKEY => 48,
            DNSResourceType::NSEC3 => 50,
            DNSResourceType::NSEC3PARAM => 51,
            DNSResourceType::TLSA => 52,
            DNSResourceType::CDS => 59,
            DNSResourceType::CDNSKEY => 60,
            DNSResourceType::OPENPGPKEY => 61,
            DNSResourceType::SVCB => 64,
            DNSResourceType::HTTPS => 65,
            DNSResourceType::SPF => 99,
            DNSResourceType::AXFR => 252,
            DNSResourceType::ANY => 255,
            DNSResourceType::URI => 256,
            DNSResourceType::CAA => 257,
            DNSResourceType::Unknown(x) => x,
        }
    }
}

impl fmt::Display for DNSResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceType::Unknown(x) => write!(f, "TYPE{}", x),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Display for DNSResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DNSResourceClass::Unknown(x) => write!(f, "CLASS{}", x),
            other => write!(f, "{:?}", other),
        }
    }
}

impl FromStr for DNSResourceType {
    type Err = String;

    /// Parses a mnemonic (`MX`) or the generic `TYPE15` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        let rtype = match upper.as_str() {
            "A" => DNSResourceType::A,
            "NS" => DNSResourceType::NS,
            "CNAME" => DNSResourceType::CNAME,
            "SOA" => DNSResourceType::SOA,
            "PTR" => DNSResourceType::PTR,
            "HINFO" => DNSResourceType::HINFO,
            "MX" => DNSResourceType::MX,
            "TXT" => DNSResourceType::TXT,
            "AAAA" => DNSResourceType::AAAA,
            "LOC" => DNSResourceType::LOC,
            "SRV" => DNSResourceType::SRV,
            "NAPTR" => DNSResourceType::NAPTR,
            "DNAME" => DNSResourceType::DNAME,
            "DS" => DNSResourceType::DS,
            "SSHFP" => DNSResourceType::SSHFP,
            "RRSIG" => DNSResourceType::RRSIG,
            "NSEC" => DNSResourceType::NSEC,
            "DNSKEY" => DNSResourceType::DNSKEY,
            "NSEC3" => DNSResourceType::NSEC3,
            "NSEC3PARAM" => DNSResourceType::NSEC3PARAM,
            "TLSA" => DNSResourceType::TLSA,
            "CDS" => DNSResourceType::CDS,
            "CDNSKEY" => DNSResourceType::CDNSKEY,
            "OPENPGPKEY" => DNSResourceType::OPENPGPKEY,
            "SVCB" => DNSResourceType::SVCB,
            "HTTPS" => DNSResourceType::HTTPS,
            "SPF" => DNSResourceType::SPF,
            "URI" => DNSResourceType::URI,
            "CAA" => DNSResourceType::CAA,
            _ => {
                let code = upper
                    .strip_prefix("TYPE")
                    .and_then(|n| n.parse::<u16>().ok())
                    .ok_or_else(|| format!("Unknown record type: {}", s))?;
                DNSResourceType::from(code)
            }
        };
        Ok(rtype)
    }
}

impl FromStr for DNSResourceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_uppercase();
        match upper.as_str() {
            "IN" => Ok(DNSResourceClass::IN),
            "CS" => Ok(DNSResourceClass::CS),
            "CH" => Ok(DNSResourceClass::CH),
            "HS" => Ok(DNSResourceClass::HS),
            _ => upper
                .strip_prefix("CLASS")
                .and_then(|n| n.parse::<u16>().ok())
                .map(DNSResourceClass::from)
                .ok_or_else(|| format!("Unknown class: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_preserved() {
        let rtype = DNSResourceType::from(65280);
        assert_eq!(rtype, DNSResourceType::Unknown(65280));
        assert_eq!(u16::from(rtype), 65280);
        assert_eq!(rtype.to_string(), "TYPE65280");
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("mx".parse::<DNSResourceType>().unwrap(), DNSResourceType::MX);
        assert_eq!("TYPE28".parse::<DNSResourceType>().unwrap(), DNSResourceType::AAAA);
        assert_eq!("spf".parse::<DNSResourceType>().unwrap(), DNSResourceType::SPF);
        assert_eq!("NAPTR".parse::<DNSResourceType>().unwrap(), DNSResourceType::NAPTR);
        assert_eq!(u16::from(DNSResourceType::NSEC3PARAM), 51);
        assert_eq!(DNSResourceType::from(59), DNSResourceType::CDS);
        assert!("BOGUS".parse::<DNSResourceType>().is_err());
    }

    #[test]
    fn test_class_from_str() {
        assert_eq!("in".parse::<DNSResourceClass>().unwrap(), DNSResourceClass::IN);
        assert_eq!(
            "CLASS254".parse::<DNSResourceClass>().unwrap(),
            DNSResourceClass::Unknown(254)
        );
        assert_eq!(DNSResourceClass::CH.to_string(), "CH");
    }
}
