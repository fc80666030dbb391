use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::{bson::doc, Database};
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    db::user::{Rights, User},
    mongodb::{serde_hex_id, Coll, Id},
};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// A marker for which rights a route requires.
pub trait Role {
    fn permits(rights: Rights) -> bool;
}

/// Routes only voters may use.
#[derive(Debug)]
pub struct Voter;

/// Routes only admins may use.
#[derive(Debug)]
pub struct Admin;

/// Routes any signed-in user may use.
#[derive(Debug)]
pub struct AnyUser;

impl Role for Voter {
    fn permits(rights: Rights) -> bool {
        rights == Rights::Voter
    }
}

impl Role for Admin {
    fn permits(rights: Rights) -> bool {
        rights == Rights::Admin
    }
}

impl Role for AnyUser {
    fn permits(_: Rights) -> bool {
        true
    }
}

/// An authentication token representing a specific user with specific rights.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AuthToken<R> {
    #[serde(rename = "sub", with = "serde_hex_id")]
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<R>,
}

impl AuthToken<AnyUser> {
    /// Create a new [`AuthToken`] for the given user, carrying that user's rights.
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            rights: user.rights,
            phantom: PhantomData,
        }
    }
}

impl<R> AuthToken<R> {
    /// Encode this token as a signed JWT that expires after the configured TTL.
    pub fn encode(&self, config: &Config) -> Result<String> {
        let claims = Claims {
            token: AuthToken::<R> {
                id: self.id,
                rights: self.rights,
                phantom: PhantomData,
            },
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Decode and validate a JWT.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<R>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Wrap an encoded token in the auth cookie.
pub fn auth_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((AUTH_TOKEN_COOKIE, token))
        .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<R> {
    #[serde(flatten, bound = "")]
    token: AuthToken<R>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// Find the raw token, preferring the cookie over an `Authorization: Bearer` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[rocket::async_trait]
impl<'r, R> FromRequest<'r> for AuthToken<R>
where
    R: Role + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that its rights suit this route.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let (config, db) = match (req.rocket().state::<Config>(), req.rocket().state::<Database>()) {
            (Some(config), Some(db)) => (config, db),
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    Error::Status(
                        Status::InternalServerError,
                        "Config or database not managed".to_string(),
                    ),
                ))
            }
        };

        // Forward to any routes that do not require an authentication token.
        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => return Outcome::Forward(Status::Unauthorized),
        };

        // Decode the token.
        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(_) => return Outcome::Forward(Status::Unauthorized),
        };

        // Check it represents the correct rights.
        if !R::permits(token.rights) {
            return Outcome::Forward(Status::Forbidden);
        }

        // Check the user still exists with those rights.
        let filter = doc! { "_id": token.id, "rights": token.rights };
        match Coll::<User>::from_db(db).find_one(filter, None).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Forward(Status::Unauthorized),
            Err(e) => Outcome::Error((Status::InternalServerError, e.into())),
        }
    }
}
