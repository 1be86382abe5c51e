//! In-memory tally of votes per candidate.
//!
//! The store has no interior mutability and no synchronization. It is owned
//! by the [`VoteApplier`](crate::applier::VoteApplier), which is the only
//! code that ever holds `&mut TallyStore`.

use std::collections::BTreeMap;

use ballot_types::Candidate;

/// Candidate identifier to vote count, ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyStore {
    counts: BTreeMap<String, u64>,
}

impl TallyStore {
    /// Create a store with every named candidate at zero votes.
    ///
    /// Duplicate names collapse into one entry.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counts: names.into_iter().map(|n| (n.into(), 0)).collect(),
        }
    }

    /// Add one vote for `name` and return the updated record.
    ///
    /// Returns `None` if the candidate does not exist; the store is left
    /// untouched in that case.
    pub fn increment(&mut self, name: &str) -> Option<Candidate> {
        let votes = self.counts.get_mut(name)?;
        *votes = votes.saturating_add(1);
        Some(Candidate {
            name: name.to_owned(),
            votes: *votes,
        })
    }

    /// Current count for `name`, if it exists.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.counts.get(name).copied()
    }

    /// Whether `name` is a known candidate.
    pub fn contains(&self, name: &str) -> bool {
        self.counts.contains_key(name)
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the store has no candidates.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// All candidates ordered by identifier.
    pub fn snapshot(&self) -> Vec<Candidate> {
        self.counts
            .iter()
            .map(|(name, votes)| Candidate {
                name: name.clone(),
                votes: *votes,
            })
            .collect()
    }
}
