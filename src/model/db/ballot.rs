use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, from_document, serde_helpers::chrono_datetime_as_bson_datetime};
use rocket::futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    mongodb::{Coll, Id},
    results::CandidateId,
};

/// Core ballot data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    /// Foreign Key election ID.
    pub election_id: Id,
    /// Foreign Key user ID of the voter.
    pub voter_id: Id,
    /// The chosen candidate within the election.
    pub candidate_id: CandidateId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl BallotCore {
    /// Create a ballot cast now.
    pub fn new(election_id: Id, voter_id: Id, candidate_id: CandidateId) -> Self {
        Self {
            election_id,
            voter_id,
            candidate_id,
            cast_at: Utc::now(),
        }
    }
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

impl DerefMut for Ballot {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ballot
    }
}

/// One row of the tally aggregation.
#[derive(Deserialize)]
struct TallyRow {
    #[serde(rename = "_id")]
    candidate_id: CandidateId,
    votes: u64,
}

/// Count the votes for each candidate of an election.
/// Candidates with no votes are absent from the map.
pub async fn tally(ballots: &Coll<Ballot>, election_id: Id) -> Result<HashMap<CandidateId, u64>> {
    let pipeline = vec![
        doc! { "$match": { "election_id": election_id } },
        doc! { "$group": { "_id": "$candidate_id", "votes": { "$sum": 1 } } },
    ];
    let mut rows = ballots.aggregate(pipeline, None).await?;

    let mut counts = HashMap::new();
    while let Some(row) = rows.try_next().await? {
        let row: TallyRow = from_document(row)?;
        counts.insert(row.candidate_id, row.votes);
    }
    Ok(counts)
}
