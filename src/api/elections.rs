use log::info;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken, Voter},
        election::{
            BallotReceipt, ElectionDescription, ElectionSpec, ElectionSummary, VoteRequest,
        },
    },
    db::{
        ballot::{Ballot, NewBallot},
        election::{Election, ElectionState, NewElection},
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
    results::{RankedResults, ResultFilter, ResultsPayload},
};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        get_election,
        create_election,
        close_election,
        delete_election,
        vote,
        results,
        ranked_results,
    ]
}

/// Fetch an election or fail with 404.
async fn election_by_id(election_id: Id, elections: &Coll<Election>) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

#[get("/api/elections")]
async fn list_elections(elections: Coll<Election>) -> Result<Json<Vec<ElectionSummary>>> {
    let elections = elections
        .find(None, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/api/elections/<election_id>")]
async fn get_election(
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(election.into()))
}

#[post("/api/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let election = NewElection::try_from(spec.into_inner())?;
    let new_id: Id = new_elections
        .insert_one(&election, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| {
            Error::Status(
                Status::InternalServerError,
                "Inserted election has a non-ObjectId ID".to_string(),
            )
        })?
        .into();

    let election = election_by_id(new_id, &elections).await?;
    info!(
        "Created election '{}' ({}) with {} candidates",
        election.name,
        election.id,
        election.candidates.len()
    );
    Ok(Json(election.into()))
}

#[post("/api/elections/<election_id>/close")]
async fn close_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<ElectionDescription>> {
    let update = doc! { "$set": { "state": ElectionState::Closed } };
    let result = elections
        .update_one(election_id.as_doc(), update, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    info!("Closed election {election_id}");

    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(election.into()))
}

#[delete("/api/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
) -> Result<Status> {
    let result = elections.delete_one(election_id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("Election with ID '{election_id}'")));
    }
    let removed = ballots
        .delete_many(doc! { "election_id": election_id }, None)
        .await?;
    info!(
        "Deleted election {election_id} and {} ballots",
        removed.deleted_count
    );
    Ok(Status::NoContent)
}

#[post("/api/elections/<election_id>/vote", data = "<vote>", format = "json")]
async fn vote(
    token: AuthToken<Voter>,
    election_id: Id,
    vote: Json<VoteRequest>,
    elections: Coll<Election>,
    new_ballots: Coll<NewBallot>,
) -> Result<Json<BallotReceipt>> {
    let election = election_by_id(election_id, &elections).await?;

    if election.candidate(vote.candidate_id).is_none() {
        return Err(Error::not_found(format!(
            "Candidate '{}' in election '{election_id}'",
            vote.candidate_id
        )));
    }
    if !election.is_open() {
        return Err(Error::Status(
            Status::UnprocessableEntity,
            format!("Election '{election_id}' is closed"),
        ));
    }

    // The unique (election, voter) index rejects a second ballot.
    let ballot = NewBallot::new(election_id, token.id, vote.candidate_id);
    match new_ballots.insert_one(&ballot, None).await {
        Ok(_) => Ok(Json(BallotReceipt::from(&ballot))),
        Err(e) if is_duplicate_key_error(&e) => Err(Error::Status(
            Status::Conflict,
            format!("Already voted in election '{election_id}'"),
        )),
        Err(e) => Err(e.into()),
    }
}

#[get("/api/elections/<election_id>/results")]
async fn results(
    election_id: Id,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
) -> Result<Json<ResultsPayload>> {
    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(election.results(&ballots).await?))
}

#[get("/api/elections/<election_id>/results/ranked?<party>&<region>")]
async fn ranked_results(
    election_id: Id,
    party: Option<String>,
    region: Option<String>,
    elections: Coll<Election>,
    ballots: Coll<Ballot>,
) -> Result<Json<RankedResults>> {
    let election = election_by_id(election_id, &elections).await?;
    let payload = election.results(&ballots).await?;
    Ok(Json(payload.view(&ResultFilter::new(party, region))))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::ContentType,
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json::json,
    };

    use super::*;
    use crate::model::{
        api::{
            auth::{AuthResponse, Credentials},
            election::CandidateSpec,
        },
        db::user::Rights,
    };

    /// Insert the example election directly and return its ID.
    async fn insert_election(db: &Database, spec: ElectionSpec) -> Id {
        Coll::<NewElection>::from_db(db)
            .insert_one(NewElection::try_from(spec).unwrap(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into()
    }

    /// A spec whose results exercise both filters.
    fn regional_spec() -> ElectionSpec {
        let candidate = |name: &str, party: &str, region: &str| CandidateSpec {
            name: name.to_string(),
            party: party.to_string(),
            region: region.to_string(),
        };
        ElectionSpec {
            name: "Regional Council".to_string(),
            description: String::new(),
            candidates: vec![
                candidate("A", "X", "N"),
                candidate("B", "Y", "S"),
                candidate("C", "X", "S"),
            ],
        }
    }

    async fn cast(client: &Client, election_id: Id, candidate_id: u32) -> LocalResponse<'_> {
        client
            .post(uri!(vote(election_id)))
            .header(ContentType::JSON)
            .body(json!({ "candidateId": candidate_id }).to_string())
            .dispatch()
            .await
    }

    /// Register and sign in a fresh voter, replacing any previous session.
    async fn sign_in_voter(client: &Client, username: &str) {
        let credentials = Credentials {
            username: username.to_string(),
            password: "a long enough password".to_string(),
        };
        let response = client
            .post(uri!(crate::api::auth::register))
            .header(ContentType::JSON)
            .body(json!(credentials).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: AuthResponse = response.into_json().await.unwrap();
        assert_eq!(body.user.rights, Rights::Voter);
    }

    #[backend_test(admin)]
    async fn admin_creates_election(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let created: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(created.name, ElectionSpec::example().name);
        assert_eq!(created.state, ElectionState::Open);
        assert_eq!(created.candidates.len(), 2);

        let response = client.get(uri!(list_elections)).dispatch().await;
        let listed: Vec<ElectionSummary> = response.into_json().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].candidate_count, 2);

        let response = client.get(uri!(get_election(created.id))).dispatch().await;
        let fetched: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);
    }

    #[backend_test(admin)]
    async fn invalid_spec_is_rejected(client: Client) {
        let mut spec = ElectionSpec::example();
        spec.candidates.clear();
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(spec).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[backend_test(voter)]
    async fn voters_cannot_create_elections(client: Client) {
        let response = client
            .post(uri!(create_election))
            .header(ContentType::JSON)
            .body(json!(ElectionSpec::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[backend_test]
    async fn unknown_election_is_404(client: Client) {
        let response = client.get(uri!(get_election(Id::new()))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let response = client.get(uri!(results(Id::new()))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test]
    async fn anonymous_cannot_vote(client: Client, db: Database) {
        let election_id = insert_election(&db, ElectionSpec::example()).await;
        let response = cast(&client, election_id, 1).await;
        assert_eq!(response.status(), Status::Unauthorized);
    }

    #[backend_test(voter)]
    async fn vote_once(client: Client, db: Database) {
        let election_id = insert_election(&db, ElectionSpec::example()).await;

        let response = cast(&client, election_id, 2).await;
        assert_eq!(response.status(), Status::Ok);
        let receipt: BallotReceipt = response.into_json().await.unwrap();
        assert_eq!(receipt.election_id, election_id);
        assert_eq!(receipt.candidate_id, 2);

        let response = cast(&client, election_id, 1).await;
        assert_eq!(response.status(), Status::Conflict);

        let count = Coll::<Ballot>::from_db(&db)
            .count_documents(doc! { "election_id": election_id }, None)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[backend_test(voter)]
    async fn vote_for_unknown_candidate(client: Client, db: Database) {
        let election_id = insert_election(&db, ElectionSpec::example()).await;
        let response = cast(&client, election_id, 99).await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[backend_test(voter)]
    async fn closed_election_rejects_votes(client: Client, db: Database) {
        let election_id = insert_election(&db, ElectionSpec::example()).await;
        Coll::<Election>::from_db(&db)
            .update_one(
                election_id.as_doc(),
                doc! { "$set": { "state": ElectionState::Closed } },
                None,
            )
            .await
            .unwrap();

        let response = cast(&client, election_id, 1).await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[backend_test]
    async fn results_and_ranking(client: Client, db: Database) {
        let election_id = insert_election(&db, regional_spec()).await;

        // B gets two votes, A and C one each.
        let votes = [
            ("voter-one", 2),
            ("voter-two", 1),
            ("voter-three", 2),
            ("voter-four", 3),
        ];
        for (voter, candidate) in votes {
            sign_in_voter(&client, voter).await;
            let response = cast(&client, election_id, candidate).await;
            assert_eq!(response.status(), Status::Ok);
        }

        let response = client.get(uri!(results(election_id))).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let payload: ResultsPayload = response.into_json().await.unwrap();
        assert_eq!(payload.total_votes, 4);
        let votes = payload.results.iter().map(|r| r.votes).collect::<Vec<_>>();
        assert_eq!(votes, vec![1, 2, 1]);

        let response = client
            .get(uri!(ranked_results(election_id, None::<String>, None::<String>)))
            .dispatch()
            .await;
        let ranked: RankedResults = response.into_json().await.unwrap();
        let order = ranked
            .results
            .iter()
            .map(|r| r.candidate.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["B", "A", "C"]);
        assert_eq!(ranked.results[0].percentage, 50.0);
        assert_eq!(ranked.parties.iter().collect::<Vec<_>>(), vec!["X", "Y"]);
        assert_eq!(ranked.regions.iter().collect::<Vec<_>>(), vec!["N", "S"]);

        let response = client
            .get(uri!(ranked_results(election_id, Some("X"), Some("S"))))
            .dispatch()
            .await;
        let ranked: RankedResults = response.into_json().await.unwrap();
        assert_eq!(ranked.results.len(), 1);
        assert_eq!(ranked.results[0].candidate.name, "C");
        assert_eq!(ranked.results[0].rank, 1);
        assert_eq!(ranked.total_votes, 4);
    }

    #[backend_test(admin)]
    async fn close_and_delete(client: Client, db: Database) {
        let election_id = insert_election(&db, ElectionSpec::example()).await;
        Coll::<NewBallot>::from_db(&db)
            .insert_one(NewBallot::new(election_id, Id::new(), 1), None)
            .await
            .unwrap();

        let response = client.post(uri!(close_election(election_id))).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let closed: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(closed.state, ElectionState::Closed);

        let response = client.delete(uri!(delete_election(election_id))).dispatch().await;
        assert_eq!(response.status(), Status::NoContent);
        let remaining = Coll::<Ballot>::from_db(&db)
            .count_documents(doc! { "election_id": election_id }, None)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let response = client.delete(uri!(delete_election(election_id))).dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
    }
}
