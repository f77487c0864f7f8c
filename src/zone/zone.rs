use super::{Result, ZoneError, ZoneRecord};
use crate::dns::common::name_to_labels;
use crate::dns::enums::DNSResourceType;
use crate::dns::rdata::RData;
use crate::record::RecordSet;
use std::collections::HashMap;

/// The record sets of one zone, kept in file order: owners in order of
/// first appearance, and within an owner, types in order of first
/// appearance.
#[derive(Debug, Clone)]
pub struct Zone {
    /// Fully qualified origin, e.g. `example.com.`
    pub origin: String,
    /// Zone file path (if loaded from file)
    pub file_path: Option<String>,
    /// Records left out because their type cannot be read
    pub skipped_records: usize,
    nodes: Vec<Node>,
    /// Owner name to position in `nodes`
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    rrsets: Vec<RecordSet>,
}

impl Zone {
    /// Create a new empty zone
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_ascii_lowercase(),
            file_path: None,
            skipped_records: 0,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Whether `name` (fully qualified) is at or below the origin
    pub fn contains_name(&self, name: &str) -> bool {
        let origin = name_to_labels(&self.origin);
        let name = name_to_labels(name);
        name.len() >= origin.len()
            && name[name.len() - origin.len()..]
                .iter()
                .zip(&origin)
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    /// Add a record to the zone, merging it into the record set of its
    /// owner, type and class.
    pub fn add_record(&mut self, record: ZoneRecord) -> Result<()> {
        if !self.contains_name(&record.name) {
            return Err(ZoneError::InvalidRecord(format!(
                "{} is outside of zone {}",
                record.name, self.origin
            )));
        }

        let node_idx = match self.index.get(&record.name) {
            Some(&idx) => idx,
            None => {
                self.nodes.push(Node {
                    name: record.name.clone(),
                    rrsets: Vec::new(),
                });
                self.index.insert(record.name.clone(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        let node = &mut self.nodes[node_idx];

        let existing = node
            .rrsets
            .iter_mut()
            .find(|set| set.rtype == record.rtype && set.rclass == record.class);
        match existing {
            Some(set) => {
                if record.rtype == DNSResourceType::SOA && !set.rdatas.contains(&record.rdata) {
                    return Err(ZoneError::DuplicateSOA);
                }
                set.add(record.ttl, record.rdata);
            }
            None => {
                let mut set =
                    RecordSet::new(record.name.clone(), record.rtype, record.class, record.ttl);
                set.add(record.ttl, record.rdata);
                node.rrsets.push(set);
            }
        }

        Ok(())
    }

    /// Record set for an owner name and type, in any class
    pub fn get_record_set(&self, name: &str, rtype: DNSResourceType) -> Option<&RecordSet> {
        let idx = *self.index.get(&name.to_ascii_lowercase())?;
        self.nodes[idx].rrsets.iter().find(|set| set.rtype == rtype)
    }

    /// The SOA record data at the origin
    pub fn soa(&self) -> Option<&RData> {
        self.get_record_set(&self.origin, DNSResourceType::SOA)
            .and_then(|set| set.rdatas.first())
    }

    /// Validate the zone
    pub fn validate(&self) -> Result<()> {
        if self.soa().is_none() {
            return Err(ZoneError::MissingSOA);
        }

        if self
            .get_record_set(&self.origin, DNSResourceType::NS)
            .is_none()
        {
            return Err(ZoneError::ValidationError(
                "Zone must have at least one NS record at the origin".to_string(),
            ));
        }

        Ok(())
    }

    /// Iterate over all record sets in file order
    pub fn record_sets(&self) -> impl Iterator<Item = &RecordSet> {
        self.nodes.iter().flat_map(|node| node.rrsets.iter())
    }

    /// Owner names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.name.as_str())
    }

    /// Number of record sets
    pub fn len(&self) -> usize {
        self.nodes.iter().map(|node| node.rrsets.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get zone statistics
    pub fn stats(&self) -> ZoneStats {
        let mut stats = ZoneStats {
            skipped_records: self.skipped_records,
            ..ZoneStats::default()
        };

        for set in self.record_sets() {
            let count = set.rdatas.len();
            stats.total_records += count;
            match set.rtype {
                DNSResourceType::A => stats.a_records += count,
                DNSResourceType::AAAA => stats.aaaa_records += count,
                DNSResourceType::NS => stats.ns_records += count,
                DNSResourceType::CNAME => stats.cname_records += count,
                DNSResourceType::MX => stats.mx_records += count,
                DNSResourceType::TXT => stats.txt_records += count,
                DNSResourceType::SOA => stats.soa_records += count,
                _ => stats.other_records += count,
            }
        }

        stats
    }
}

impl IntoIterator for Zone {
    type Item = RecordSet;
    type IntoIter = std::vec::IntoIter<RecordSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes
            .into_iter()
            .flat_map(|node| node.rrsets)
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// Zone statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ZoneStats {
    pub total_records: usize,
    pub a_records: usize,
    pub aaaa_records: usize,
    pub ns_records: usize,
    pub cname_records: usize,
    pub mx_records: usize,
    pub txt_records: usize,
    pub soa_records: usize,
    pub other_records: usize,
    pub skipped_records: usize,
}
