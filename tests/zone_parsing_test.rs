mod common;

use common::{EXAMPLE_ZONE, write_zone};
use dnszonetest::dns::enums::DNSResourceType;
use dnszonetest::dns::rdata::RData;
use dnszonetest::error::CheckError;
use dnszonetest::zone::{ZoneError, ZoneParser, load_zone};
use std::net::Ipv4Addr;
use std::path::Path;

#[test]
fn test_simple_zone_parsing() {
    let zone_content = r#"
$ORIGIN example.com.
$TTL 3600

@   IN  SOA ns1.example.com. admin.example.com. 2024010101 3600 900 604800 86400

@   IN  NS  ns1.example.com.
@   IN  NS  ns2.example.com.

@       IN  A   192.0.2.1
www     IN  A   192.0.2.2
mail    IN  A   192.0.2.3

@       IN  MX  10 mail.example.com.
"#;

    let zone = ZoneParser::new("example.com").parse(zone_content).unwrap();

    assert_eq!(zone.origin, "example.com.");
    assert!(zone.soa().is_some());

    let stats = zone.stats();
    assert_eq!(stats.soa_records, 1);
    assert_eq!(stats.ns_records, 2);
    assert_eq!(stats.a_records, 3);
    assert_eq!(stats.mx_records, 1);
    assert_eq!(stats.total_records, 7);

    // SOA, NS, A and MX at the apex, then www and mail
    assert_eq!(zone.len(), 6);
    let names: Vec<&str> = zone.names().collect();
    assert_eq!(
        names,
        vec!["example.com.", "www.example.com.", "mail.example.com."]
    );
}

#[test]
fn test_record_set_ttl_is_lowest_member() {
    let zone = ZoneParser::new("example.com")
        .parse(
            "$TTL 300
@    IN SOA ns1 admin 1 3600 900 604800 300
@    IN NS  ns1
www  600 IN A 192.0.2.1
www  120 IN A 192.0.2.2
www  900 IN A 192.0.2.1
",
        )
        .unwrap();

    let www = zone
        .get_record_set("www.example.com.", DNSResourceType::A)
        .unwrap();
    assert_eq!(www.ttl, 120);
    // The repeated address collapses into one member
    assert_eq!(www.rdatas.len(), 2);
    assert_eq!(www.lines()[0], "www.example.com. 120 IN A 192.0.2.1");
}

#[test]
fn test_owner_names_are_case_insensitive() {
    let zone = ZoneParser::new("Example.COM")
        .parse(
            "@ 300 IN SOA ns1 admin 1 3600 900 604800 300
@ IN NS ns1
WWW IN A 192.0.2.1
www IN A 192.0.2.2
",
        )
        .unwrap();

    assert_eq!(zone.origin, "example.com.");
    let www = zone
        .get_record_set("WWW.example.com.", DNSResourceType::A)
        .unwrap();
    assert_eq!(www.name, "www.example.com.");
    assert_eq!(www.rdatas.len(), 2);
}

#[test]
fn test_typed_record_data() {
    let zone = ZoneParser::new("example.com")
        .parse(
            r#"$TTL 300
@       IN SOA ns1 admin 1 3600 900 604800 300
@       IN NS  ns1
@       IN MX  10 mx
@       IN TXT "v=spf1 -all" "second"
_sip._tcp IN SRV 10 60 5060 sip
@       IN CAA 0 ISSUE "ca.example.net"
host    IN HINFO "PC" "Linux"
v6      IN AAAA 2001:db8::1
alias   IN CNAME www
raw     IN TYPE65280 \# 3 abcdef
"#,
        )
        .unwrap();

    let mx = zone.get_record_set("example.com.", DNSResourceType::MX).unwrap();
    assert_eq!(
        mx.rdatas,
        vec![RData::MX {
            preference: 10,
            exchange: "mx.example.com.".to_string()
        }]
    );

    let txt = zone.get_record_set("example.com.", DNSResourceType::TXT).unwrap();
    assert_eq!(
        txt.rdatas,
        vec![RData::TXT(vec![b"v=spf1 -all".to_vec(), b"second".to_vec()])]
    );

    let srv = zone
        .get_record_set("_sip._tcp.example.com.", DNSResourceType::SRV)
        .unwrap();
    assert_eq!(
        srv.rdatas,
        vec![RData::SRV {
            priority: 10,
            weight: 60,
            port: 5060,
            target: "sip.example.com.".to_string()
        }]
    );

    let caa = zone.get_record_set("example.com.", DNSResourceType::CAA).unwrap();
    assert_eq!(caa.lines(), vec!["example.com. 300 IN CAA 0 issue \"ca.example.net\""]);

    let alias = zone
        .get_record_set("alias.example.com.", DNSResourceType::CNAME)
        .unwrap();
    assert_eq!(alias.rdatas, vec![RData::CNAME("www.example.com.".to_string())]);

    let raw = zone
        .get_record_set("raw.example.com.", DNSResourceType::Unknown(65280))
        .unwrap();
    assert_eq!(
        raw.rdatas,
        vec![RData::Unknown {
            rtype: 65280,
            data: vec![0xab, 0xcd, 0xef]
        }]
    );
    assert!(zone.get_record_set("host.example.com.", DNSResourceType::HINFO).is_some());
    assert!(zone.get_record_set("v6.example.com.", DNSResourceType::AAAA).is_some());
}

#[test]
fn test_conflicting_soa_rejected() {
    let error = ZoneParser::new("example.com")
        .parse(
            "@ 300 IN SOA ns1 admin 1 3600 900 604800 300
@ 300 IN SOA ns1 admin 2 3600 900 604800 300
@ IN NS ns1
",
        )
        .unwrap_err();
    assert!(error.to_string().contains("Line 2"), "{}", error);
}

#[test]
fn test_load_zone_from_file() {
    let (_dir, path) = write_zone(EXAMPLE_ZONE, "db.example.com");
    let zone = load_zone("example.com.", &path).unwrap();

    assert_eq!(zone.file_path.as_deref(), path.to_str());
    let apex = zone.get_record_set("example.com.", DNSResourceType::A).unwrap();
    assert_eq!(apex.rdatas, vec![RData::A(Ipv4Addr::new(192, 0, 2, 1))]);
    assert_eq!(apex.ttl, 300);

    let txt = zone
        .get_record_set("txt.example.com.", DNSResourceType::TXT)
        .unwrap();
    assert_eq!(txt.to_text(), "txt.example.com. 300 IN TXT \"hello world\"");
}

#[test]
fn test_load_zone_missing_file() {
    let err = load_zone("example.com", Path::new("/nonexistent/db.example.com")).unwrap_err();
    match err {
        CheckError::NoZoneFile { path, .. } => assert_eq!(path, "/nonexistent/db.example.com"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_load_zone_without_soa() {
    let (_dir, path) = write_zone("www 300 IN A 192.0.2.1\n", "db.example.com");
    let err = load_zone("example.com", &path).unwrap_err();
    assert!(matches!(err, CheckError::Zone(ZoneError::MissingSOA)));
}

#[test]
fn test_zone_iterates_in_file_order() {
    let zone = ZoneParser::new("example.com").parse(EXAMPLE_ZONE).unwrap();
    let order: Vec<(String, DNSResourceType)> = zone
        .into_iter()
        .map(|set| (set.name, set.rtype))
        .collect();

    assert_eq!(
        order,
        vec![
            ("example.com.".to_string(), DNSResourceType::SOA),
            ("example.com.".to_string(), DNSResourceType::NS),
            ("example.com.".to_string(), DNSResourceType::A),
            ("www.example.com.".to_string(), DNSResourceType::A),
            ("mail.example.com.".to_string(), DNSResourceType::MX),
            ("txt.example.com.".to_string(), DNSResourceType::TXT),
        ]
    );
}

const HEAD: &str = "$ORIGIN example.com.
$TTL 300
@ IN SOA ns1 admin 1 3600 900 604800 300
@ IN NS ns1
";

fn parse_with(body: &str) -> dnszonetest::zone::Zone {
    ZoneParser::new("example.com")
        .parse(&format!("{}{}", HEAD, body))
        .unwrap()
}

fn only_rdata(zone: &dnszonetest::zone::Zone, name: &str, rtype: DNSResourceType) -> RData {
    let set = zone.get_record_set(name, rtype).unwrap();
    assert_eq!(set.rdatas.len(), 1);
    set.rdatas[0].clone()
}

#[test]
fn test_fingerprint_and_delegation_types() {
    let zone = parse_with(
        "www IN SSHFP 1 1 dd465c09cfa51fb45020cc83316fff21b9ec74ac
sub IN DS 12345 8 2 49FD46E6C4B45C55D4AC69CBD3CD34AC1AFE51DE ( 8BDC2A4EA8F1AB1C39B0BA37 )
sub IN CDS 12345 ECDSAP256SHA256 2 49FD46E6C4B45C55D4AC69CBD3CD34AC1AFE51DE8BDC2A4EA8F1AB1C39B0BA37
_443._tcp.www IN TLSA 3 1 1 0C72AC70B745AC19998811B131D662C9AC69DBDBE7CB23E5B514B56664C5D3D6
",
    );

    let sshfp = only_rdata(&zone, "www.example.com.", DNSResourceType::SSHFP);
    assert_eq!(sshfp.rtype(), DNSResourceType::SSHFP);
    assert_eq!(
        sshfp.to_string(),
        "\\# 22 0101DD465C09CFA51FB45020CC83316FFF21B9EC74AC"
    );

    let ds = only_rdata(&zone, "sub.example.com.", DNSResourceType::DS);
    match &ds {
        RData::Unknown { rtype: 43, data } => {
            assert_eq!(data[..4], [0x30, 0x39, 8, 2]);
            assert_eq!(data.len(), 4 + 32);
        }
        other => panic!("unexpected rdata {:?}", other),
    }
    // Same octets under a different type, algorithm given by mnemonic
    match only_rdata(&zone, "sub.example.com.", DNSResourceType::CDS) {
        RData::Unknown { rtype: 59, data } => {
            assert_eq!(data[..4], [0x30, 0x39, 13, 2]);
            assert_eq!(data.len(), 36);
        }
        other => panic!("unexpected rdata {:?}", other),
    }

    let tlsa = only_rdata(&zone, "_443._tcp.www.example.com.", DNSResourceType::TLSA);
    assert_eq!(tlsa.to_wire()[..3], [3, 1, 1]);
}

#[test]
fn test_dnssec_types() {
    let zone = parse_with(
        "@ IN DNSKEY 257 3 13 ( mdsswUyr3DPW132mOi8V9xESWE8jTo0d
                        xCjjnopKl+GqJxpVXckHAeF+KkxLbxILfDLUT0rAK9iUzy1L53eKGQ== )
@ IN RRSIG A 13 2 300 20240201000000 20240101000000 12345 example.com. AQID
@ IN NSEC www.example.com. A NS SOA RRSIG NSEC DNSKEY
@ IN NSEC3PARAM 1 0 0 -
",
    );

    match only_rdata(&zone, "example.com.", DNSResourceType::DNSKEY) {
        RData::Unknown { rtype: 48, data } => {
            assert_eq!(data[..4], [0x01, 0x01, 3, 13]);
            assert_eq!(data.len(), 4 + 64);
        }
        other => panic!("unexpected rdata {:?}", other),
    }

    let rrsig = only_rdata(&zone, "example.com.", DNSResourceType::RRSIG).to_wire();
    assert_eq!(rrsig[..4], [0, 1, 13, 2]);
    assert_eq!(rrsig[rrsig.len() - 3..], [1, 2, 3]);

    let nsec = only_rdata(&zone, "example.com.", DNSResourceType::NSEC).to_wire();
    let mut expected = Vec::new();
    dnszonetest::dns::common::encode_name("www.example.com.", &mut expected);
    // A NS SOA in octet 0, RRSIG NSEC DNSKEY in octets 5 and 6
    expected.extend([0, 7, 0x62, 0, 0, 0, 0, 0x03, 0x80]);
    assert_eq!(nsec, expected);

    let param = only_rdata(&zone, "example.com.", DNSResourceType::NSEC3PARAM);
    assert_eq!(param.to_wire(), vec![1, 0, 0, 0, 0]);
}

#[test]
fn test_spf_and_naptr() {
    let zone = parse_with(
        r#"@ IN SPF "v=spf1 -all"
@ IN NAPTR 100 10 "S" "SIP+D2U" "" _sip._udp
"#,
    );

    assert_eq!(
        only_rdata(&zone, "example.com.", DNSResourceType::SPF),
        RData::SPF(vec![b"v=spf1 -all".to_vec()])
    );
    assert_eq!(
        only_rdata(&zone, "example.com.", DNSResourceType::NAPTR),
        RData::NAPTR {
            order: 100,
            preference: 10,
            flags: b"S".to_vec(),
            services: b"SIP+D2U".to_vec(),
            regexp: Vec::new(),
            replacement: "_sip._udp.example.com.".to_string(),
        }
    );
}

#[test]
fn test_unparsable_type_is_skipped_not_fatal() {
    let zone = parse_with(
        "geo IN LOC 52 22 23.000 N 4 53 32.000 E -2.00m 0.00m 10000m 10m
    IN A 192.0.2.9
svc IN HTTPS 1 . alpn=h2
",
    );

    assert_eq!(zone.skipped_records, 2);
    assert_eq!(zone.stats().skipped_records, 2);
    assert!(zone.get_record_set("geo.example.com.", DNSResourceType::LOC).is_none());
    // The skipped line still names the owner of the next one
    assert!(zone.get_record_set("geo.example.com.", DNSResourceType::A).is_some());

    let error = ZoneParser::new("example.com")
        .parse(&format!("{}x IN BOGUS 1\n", HEAD))
        .unwrap_err();
    assert!(matches!(error, ZoneError::ParseError(_)), "{}", error);
}

#[test]
fn test_escaped_owner_names() {
    let zone = parse_with(
        "a\\.b IN A 192.0.2.1
\\065\\066 IN A 192.0.2.2
c IN CNAME x\\.y
",
    );

    assert!(zone.get_record_set("a\\.b.example.com.", DNSResourceType::A).is_some());
    assert!(zone.get_record_set("ab.example.com.", DNSResourceType::A).is_some());
    assert!(zone.get_record_set("b.example.com.", DNSResourceType::A).is_none());
    assert_eq!(
        only_rdata(&zone, "c.example.com.", DNSResourceType::CNAME),
        RData::CNAME("x\\.y.example.com.".to_string())
    );
}
