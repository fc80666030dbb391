//! Ranking, filtering and display helpers for election results.
//!
//! Everything here is pure: the filter state is passed in explicitly and the
//! payload is never modified, so the same payload can back any number of
//! differently-filtered views.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod unique;

pub use unique::UniqueValues;

/// Candidate IDs are unique within an election.
pub type CandidateId = u32;

/// An entity standing in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub region: String,
}

/// A candidate paired with its vote count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResult {
    pub candidate: Candidate,
    pub votes: u64,
}

/// The aggregate results of an election, as served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPayload {
    pub total_votes: u64,
    pub results: Vec<ElectionResult>,
}

/// The selected party and region. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub party: Option<String>,
    pub region: Option<String>,
}

impl ResultFilter {
    /// Create a filter. Empty strings are treated as "no selection", which
    /// is what an "All" option in a drop-down submits.
    pub fn new(party: Option<String>, region: Option<String>) -> Self {
        Self {
            party: party.filter(|p| !p.is_empty()),
            region: region.filter(|r| !r.is_empty()),
        }
    }

    /// Does this filter let the candidate through?
    pub fn matches(&self, candidate: &Candidate) -> bool {
        let party_ok = self.party.as_ref().map_or(true, |p| *p == candidate.party);
        let region_ok = self
            .region
            .as_ref()
            .map_or(true, |r| *r == candidate.region);
        party_ok && region_ok
    }

    pub fn is_empty(&self) -> bool {
        self.party.is_none() && self.region.is_none()
    }
}

/// The claimed `totalVotes` differs from the sum of the individual tallies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotalsMismatch {
    pub claimed: u64,
    /// Wide enough that no number of `u64` counts can overflow it.
    pub tallied: u128,
}

impl Display for TotalsMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "payload claims {} total votes but the results add up to {}",
            self.claimed, self.tallied
        )
    }
}

impl std::error::Error for TotalsMismatch {}

/// Share of `total` taken by `votes`, as a percentage in `[0, 100]`.
///
/// A zero total gives `0.0` rather than NaN.
pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 100.0 / total as f64).clamp(0.0, 100.0)
}

impl ResultsPayload {
    /// Build a payload whose total is the sum of the given results.
    /// A sum beyond `u64::MAX` saturates, which `verify_total` then reports.
    pub fn from_results(results: Vec<ElectionResult>) -> Self {
        let total_votes = results
            .iter()
            .fold(0_u64, |total, r| total.saturating_add(r.votes));
        Self {
            total_votes,
            results,
        }
    }

    /// The entries passing `filter`, most votes first.
    /// Entries with equal votes keep their payload order.
    pub fn rank(&self, filter: &ResultFilter) -> Vec<&ElectionResult> {
        let mut ranked = self
            .results
            .iter()
            .filter(|result| filter.matches(&result.candidate))
            .collect::<Vec<_>>();
        // `sort_by` is stable.
        ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
        ranked
    }

    /// Distinct parties across all results, in first-seen order.
    pub fn parties(&self) -> UniqueValues<&str> {
        self.results
            .iter()
            .map(|r| r.candidate.party.as_str())
            .collect()
    }

    /// Distinct regions across all results, in first-seen order.
    pub fn regions(&self) -> UniqueValues<&str> {
        self.results
            .iter()
            .map(|r| r.candidate.region.as_str())
            .collect()
    }

    /// The leading entry over the whole payload, ignoring any filter.
    pub fn winner(&self) -> Option<&ElectionResult> {
        self.rank(&ResultFilter::default()).into_iter().next()
    }

    /// Sum of the individual vote counts.
    pub fn tallied_votes(&self) -> u128 {
        self.results.iter().map(|r| u128::from(r.votes)).sum()
    }

    /// Check that `total_votes` agrees with the individual counts.
    /// Nothing is corrected; the caller decides what to do with a mismatch.
    pub fn verify_total(&self) -> Result<(), TotalsMismatch> {
        let tallied = self.tallied_votes();
        if tallied == u128::from(self.total_votes) {
            Ok(())
        } else {
            Err(TotalsMismatch {
                claimed: self.total_votes,
                tallied,
            })
        }
    }

    /// Percentage of the payload's total taken by `result`.
    pub fn percentage_of(&self, result: &ElectionResult) -> f64 {
        percentage(result.votes, self.total_votes)
    }

    /// Produce the complete ranked view for the given filter.
    pub fn view(&self, filter: &ResultFilter) -> RankedResults {
        let results = self
            .rank(filter)
            .into_iter()
            .enumerate()
            .map(|(index, result)| RankedResult {
                rank: index + 1,
                candidate: result.candidate.clone(),
                votes: result.votes,
                percentage: self.percentage_of(result),
            })
            .collect();

        RankedResults {
            total_votes: self.total_votes,
            filter: filter.clone(),
            results,
            parties: self.parties().to_owned_values(),
            regions: self.regions().to_owned_values(),
        }
    }
}

/// One row of a ranked view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// 1-based position within the filtered view.
    pub rank: usize,
    pub candidate: Candidate,
    pub votes: u64,
    /// Share of the overall total, not of the filtered subset.
    pub percentage: f64,
}

/// A filtered, ranked view of a payload together with the values available
/// for filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResults {
    pub total_votes: u64,
    pub filter: ResultFilter,
    pub results: Vec<RankedResult>,
    pub parties: UniqueValues<String>,
    pub regions: UniqueValues<String>,
}
