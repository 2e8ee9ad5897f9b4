use hickory_proto::op::Query;
use hickory_proto::rr::{Name, RecordType};
use std::collections::HashSet;

use crate::config::AaaaPolicy;
use crate::discovery::Address;

/// Case-insensitive set of fully-qualified names that get redirected.
#[derive(Debug, Clone, Default)]
pub struct TargetDomains {
    names: HashSet<String>,
}

impl TargetDomains {
    /// Entries without a trailing dot are treated as fully qualified.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|name| {
                let lower = name.as_ref().to_lowercase();
                if lower.ends_with('.') { lower } else { format!("{}.", lower) }
            })
            .collect();
        Self { names }
    }

    /// Match a query name as received, trailing dot included.
    pub fn contains(&self, name: &Name) -> bool {
        self.contains_str(&name.to_ascii())
    }

    pub fn contains_str(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A request's questions split by how they will be answered.
/// Each list keeps the order the questions appeared in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Answered locally with the discovered address.
    pub synthesize: Vec<Query>,
    /// Relayed to the upstream resolver unchanged.
    pub forward: Vec<Query>,
    /// Neither answered nor relayed.
    pub dropped: Vec<Query>,
}

/// Partition questions for one request.
///
/// A questions for a target are only synthesized once an address is known;
/// until then they go upstream like everything else.
pub fn classify(
    queries: &[Query],
    targets: &TargetDomains,
    address: Address,
    aaaa_policy: AaaaPolicy,
) -> Classification {
    let mut classification = Classification::default();

    for query in queries {
        let is_target = targets.contains(query.name());
        let bucket = match (query.query_type(), is_target) {
            (RecordType::A, true) if !address.is_unknown() => &mut classification.synthesize,
            (RecordType::AAAA, true) if aaaa_policy == AaaaPolicy::Drop => {
                &mut classification.dropped
            }
            _ => &mut classification.forward,
        };
        bucket.push(query.clone());
    }

    classification
}
