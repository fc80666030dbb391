use log::info;
use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::auth::{
            auth_cookie, AnyUser, AuthResponse, AuthToken, Credentials, UserDescription,
            AUTH_TOKEN_COOKIE,
        },
        db::user::{NewUser, Rights, User},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, login, me, logout]
}

/// Issue a token for the user, set it as a cookie, and describe the session.
fn sign_in(user: &User, cookies: &CookieJar<'_>, config: &Config) -> Result<Json<AuthResponse>> {
    let token = AuthToken::new(user).encode(config)?;
    cookies.add(auth_cookie(token.clone(), config));
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[post("/api/auth/register", data = "<credentials>", format = "json")]
pub async fn register(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    new_users: Coll<NewUser>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    // Self-registration only ever creates voters.
    let user = credentials.into_inner().into_user(Rights::Voter)?;

    // The unique index on `username` settles races between registrations.
    let new_id: Id = match new_users.insert_one(&user, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    "Inserted user has a non-ObjectId ID".to_string(),
                )
            })?
            .into(),
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::Status(
                Status::Conflict,
                format!("Username already in use: {}", user.username),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let user = users
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User with ID '{new_id}'")))?;
    info!("Registered voter '{}'", user.username);

    sign_in(&user, cookies, config)
}

#[post("/api/auth/login", data = "<credentials>", format = "json")]
pub async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let with_username = doc! {
        "username": credentials.username.trim(),
    };

    let user = users
        .find_one(with_username, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::Status(
                Status::Unauthorized,
                "No user found with the provided username and password combination.".to_string(),
            )
        })?;

    sign_in(&user, cookies, config)
}

#[get("/api/auth/me")]
pub async fn me(token: AuthToken<AnyUser>, users: Coll<User>) -> Result<Json<UserDescription>> {
    let user = users
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("User with ID '{}'", token.id)))?;
    Ok(Json((&user).into()))
}

#[delete("/api/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::from(AUTH_TOKEN_COOKIE));
    Status::Ok
}
