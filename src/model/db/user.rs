use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use log::{info, warn};
use mongodb::bson::{doc, Bson};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    api::auth::Credentials,
    mongodb::{Coll, Id},
};

/// Different privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rights {
    Voter,
    Admin,
}

impl Display for Rights {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Voter => "voter",
                Self::Admin => "admin",
            }
        )
    }
}

impl From<Rights> for Bson {
    fn from(rights: Rights) -> Self {
        Bson::String(rights.to_string())
    }
}

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub password_hash: String,
    pub rights: Rights,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Make sure at least one admin can log in.
///
/// If no admin exists and bootstrap credentials are configured, an admin is
/// created from them. Otherwise the absence is only reported, since elections
/// can still be read and voted in.
pub async fn ensure_admin_exists(
    users: &Coll<User>,
    new_users: &Coll<NewUser>,
    config: &Config,
) -> Result<()> {
    let admin_count = users
        .count_documents(doc! { "rights": Rights::Admin }, None)
        .await?;
    if admin_count > 0 {
        return Ok(());
    }

    match config.admin_credentials() {
        Some((username, password)) => {
            let credentials = Credentials {
                username: username.to_string(),
                password: password.to_string(),
            };
            let admin = credentials.into_user(Rights::Admin)?;
            new_users.insert_one(&admin, None).await?;
            info!("Created bootstrap admin '{}'", admin.username);
        }
        None => {
            warn!("No admin account exists and ADMIN_USERNAME/ADMIN_PASSWORD are not set");
        }
    }
    Ok(())
}
