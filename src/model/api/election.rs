use chrono::{DateTime, Utc};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        ballot::NewBallot,
        election::{Election, ElectionState, NewElection},
    },
    mongodb::{serde_hex_id, Id},
    results::{Candidate, CandidateId},
};

/// A candidate as submitted when creating an election. IDs are assigned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    pub party: String,
    pub region: String,
}

/// An election as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub candidates: Vec<CandidateSpec>,
}

impl TryFrom<ElectionSpec> for NewElection {
    type Error = Error;

    /// Validate the spec and number the candidates from 1 in submission order.
    fn try_from(spec: ElectionSpec) -> Result<Self> {
        let bad_request = |msg: &str| Err(Error::Status(Status::BadRequest, msg.to_string()));

        if spec.name.trim().is_empty() {
            return bad_request("Election name must not be empty");
        }
        if spec.candidates.is_empty() {
            return bad_request("An election needs at least one candidate");
        }
        for candidate in spec.candidates.iter() {
            if candidate.name.trim().is_empty()
                || candidate.party.trim().is_empty()
                || candidate.region.trim().is_empty()
            {
                return bad_request("Candidate name, party and region must not be empty");
            }
        }

        let candidates = spec
            .candidates
            .into_iter()
            .zip(1..)
            .map(|(candidate, id)| Candidate {
                id,
                name: candidate.name.trim().to_string(),
                party: candidate.party.trim().to_string(),
                region: candidate.region.trim().to_string(),
            })
            .collect();

        Ok(NewElection {
            name: spec.name.trim().to_string(),
            description: spec.description,
            state: ElectionState::Open,
            candidates,
        })
    }
}

/// Top-level election information, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub name: String,
    pub state: ElectionState,
    pub candidate_count: usize,
}

impl From<Election> for ElectionSummary {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            candidate_count: election.candidates.len(),
            name: election.election.name,
            state: election.election.state,
        }
    }
}

/// Full election information, including the candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub state: ElectionState,
    pub candidates: Vec<Candidate>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id,
            name: election.election.name,
            description: election.election.description,
            state: election.election.state,
            candidates: election.election.candidates,
        }
    }
}

/// A voter's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub candidate_id: CandidateId,
}

/// Confirmation of a cast vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotReceipt {
    #[serde(with = "serde_hex_id")]
    pub election_id: Id,
    pub candidate_id: CandidateId,
    pub cast_at: DateTime<Utc>,
}

impl From<&NewBallot> for BallotReceipt {
    fn from(ballot: &NewBallot) -> Self {
        Self {
            election_id: ballot.election_id,
            candidate_id: ballot.candidate_id,
            cast_at: ballot.cast_at,
        }
    }
}
