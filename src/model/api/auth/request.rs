use argon2::Config as Argon2Config;
use rand::Rng;
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::user::{NewUser, Rights, User},
    mongodb::{serde_hex_id, Id},
};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw user credentials, received from a user. These are never stored directly,
/// since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Convert into a new user by hashing the password.
    /// This enforces minimum username and password lengths.
    pub fn into_user(self, rights: Rights) -> Result<NewUser> {
        let username = self.username.trim().to_string();
        if username.chars().count() < MIN_USERNAME_LENGTH {
            return Err(Error::Status(
                Status::BadRequest,
                format!("Username must be at least {MIN_USERNAME_LENGTH} characters"),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::Status(
                Status::BadRequest,
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            ));
        }

        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(self.password.as_bytes(), &salt, &Argon2Config::default())?;
        Ok(NewUser {
            username,
            password_hash,
            rights,
        })
    }
}

/// API-friendly representation of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    #[serde(with = "serde_hex_id")]
    pub id: Id,
    pub username: String,
    pub rights: Rights,
}

impl From<&User> for UserDescription {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            rights: user.rights,
        }
    }
}

/// Returned on successful register/login. The token is also set as a cookie;
/// returning it lets non-browser clients send it as a bearer token instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDescription,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_credentials_are_hashed() {
        let user = Credentials::example_voter().into_user(Rights::Voter).unwrap();
        assert_eq!(user.username, "valerie");
        assert_eq!(user.rights, Rights::Voter);
        assert_ne!(user.password_hash, Credentials::example_voter().password);
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn short_credentials_are_rejected() {
        assert!(Credentials::empty().into_user(Rights::Voter).is_err());

        let short_password = Credentials {
            username: "valerie".into(),
            password: "short".into(),
        };
        assert!(short_password.into_user(Rights::Voter).is_err());

        let short_username = Credentials {
            username: " v ".into(),
            password: "long enough password".into(),
        };
        assert!(short_username.into_user(Rights::Admin).is_err());
    }
}
