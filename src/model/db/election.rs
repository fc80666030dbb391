use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    db::ballot::{tally, Ballot},
    mongodb::{Coll, Id},
    results::{Candidate, CandidateId, ElectionResult, ResultsPayload},
};

/// Whether an election is accepting votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    Open,
    Closed,
}

impl Display for ElectionState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Open => "open",
                Self::Closed => "closed",
            }
        )
    }
}

impl From<ElectionState> for Bson {
    fn from(state: ElectionState) -> Self {
        Bson::String(state.to_string())
    }
}

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub name: String,
    pub description: String,
    pub state: ElectionState,
    /// Candidates in the order they were registered.
    pub candidates: Vec<Candidate>,
}

impl ElectionCore {
    /// Look up a candidate by ID.
    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn is_open(&self) -> bool {
        self.state == ElectionState::Open
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Election {
    /// Count the ballots cast in this election.
    ///
    /// Every registered candidate appears in the payload, in registration
    /// order, even with zero votes. The total is the sum of the counts.
    pub async fn results(&self, ballots: &Coll<Ballot>) -> Result<ResultsPayload> {
        let counts = tally(ballots, self.id).await?;
        let results = self
            .candidates
            .iter()
            .map(|candidate| ElectionResult {
                candidate: candidate.clone(),
                votes: counts.get(&candidate.id).copied().unwrap_or(0),
            })
            .collect();
        Ok(ResultsPayload::from_results(results))
    }
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}
