//! The unit of comparison: an expected record set from the zone file and
//! what the name server returned for the same name and type.

use std::collections::BTreeSet;
use std::fmt;

use tracing::info;

use crate::dns::enums::{DNSResourceClass, DNSResourceType};
use crate::dns::rdata::RData;

/// A set of records sharing owner, type and class.
///
/// Members are unique; the set TTL is the lowest TTL of its members.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordSet {
    pub name: String,
    pub rtype: DNSResourceType,
    pub rclass: DNSResourceClass,
    pub ttl: u32,
    pub rdatas: Vec<RData>,
}

impl RecordSet {
    /// An empty set; `ttl` is replaced by the first member's TTL.
    pub fn new(name: String, rtype: DNSResourceType, rclass: DNSResourceClass, ttl: u32) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdatas: Vec::new(),
        }
    }

    /// Adds a member, lowering the set TTL if needed. Duplicates collapse.
    pub fn add(&mut self, ttl: u32, rdata: RData) {
        if self.rdatas.is_empty() {
            self.ttl = ttl;
        } else {
            self.ttl = self.ttl.min(ttl);
        }
        if !self.rdatas.contains(&rdata) {
            self.rdatas.push(rdata);
        }
    }

    /// Same type, class and members, regardless of order. TTL and owner
    /// do not take part.
    pub fn same_rdata(&self, other: &RecordSet) -> bool {
        if self.rtype != other.rtype || self.rclass != other.rclass {
            return false;
        }
        let ours: BTreeSet<&RData> = self.rdatas.iter().collect();
        let theirs: BTreeSet<&RData> = other.rdatas.iter().collect();
        ours == theirs
    }

    /// One presentation-format line per member, sorted
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .rdatas
            .iter()
            .map(|rdata| {
                format!(
                    "{} {} {} {} {}",
                    self.name, self.ttl, self.rclass, self.rtype, rdata
                )
            })
            .collect();
        lines.sort();
        lines
    }

    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Outcome of comparing expected and observed TTLs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtlMatch {
    Match,
    Mismatch,
    /// Nothing was observed to compare against
    Undefined,
}

/// An expected record set paired with its observed counterpart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    name: String,
    expected: RecordSet,
    observed: Option<RecordSet>,
}

impl Record {
    pub fn new(expected: RecordSet, observed: Option<RecordSet>) -> Self {
        Self {
            name: expected.name.clone(),
            expected,
            observed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected(&self) -> &RecordSet {
        &self.expected
    }

    pub fn observed(&self) -> Option<&RecordSet> {
        self.observed.as_ref()
    }

    /// True when an answer was observed with the same type, class and
    /// record data as expected.
    pub fn rdataset_match(&self) -> bool {
        self.observed
            .as_ref()
            .is_some_and(|observed| self.expected.same_rdata(observed))
    }

    pub fn ttl_match(&self) -> TtlMatch {
        match &self.observed {
            None => {
                info!(
                    "No TTL to compare for {} {}: no answer observed",
                    self.name, self.expected.rtype
                );
                TtlMatch::Undefined
            }
            Some(observed) if observed.ttl == self.expected.ttl => TtlMatch::Match,
            Some(_) => TtlMatch::Mismatch,
        }
    }
}
