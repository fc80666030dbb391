use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{ErrorMessage, INTERNAL_ERROR_MESSAGE};

pub mod auth;
pub mod elections;
pub mod health;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(health::routes());
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![unauthorized, forbidden, not_found, unprocessable, internal_error, default_catcher]
}

#[catch(401)]
fn unauthorized() -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Authentication required"))
}

#[catch(403)]
fn forbidden() -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Insufficient rights"))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ErrorMessage> {
    Json(ErrorMessage::new(format!("Nothing found at {}", req.uri())))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorMessage> {
    Json(ErrorMessage::new("Malformed request body"))
}

#[catch(500)]
fn internal_error() -> Json<ErrorMessage> {
    Json(ErrorMessage::new(INTERNAL_ERROR_MESSAGE))
}

#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<ErrorMessage>) {
    let message = if status.code >= 500 {
        INTERNAL_ERROR_MESSAGE.to_string()
    } else {
        status.reason_lossy().to_string()
    };
    (status, Json(ErrorMessage::new(message)))
}
