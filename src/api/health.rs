use chrono::{DateTime, Utc};
use rocket::{serde::json::Json, Route};
use serde::{Deserialize, Serialize};

pub fn routes() -> Vec<Route> {
    routes![index, health]
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[get("/")]
pub fn index() -> &'static str {
    "Backend is running!"
}

#[get("/api/health")]
pub fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    async fn client() -> Client {
        Client::tracked(rocket::build().mount("/", routes()))
            .await
            .unwrap()
    }

    #[rocket::async_test]
    async fn index_banner() {
        let client = client().await;
        let response = client.get(uri!(index)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(
            response.into_string().await.as_deref(),
            Some("Backend is running!")
        );
    }

    #[rocket::async_test]
    async fn health_is_ok() {
        let before = Utc::now();
        let client = client().await;
        let response = client.get(uri!(health)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let health: Health = response.into_json().await.unwrap();
        assert_eq!(health.status, "ok");
        assert!(health.timestamp >= before);
    }
}
