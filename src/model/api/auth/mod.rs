mod request;
mod token;

pub use request::{
    AuthResponse, Credentials, UserDescription, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH,
};
pub use token::{auth_cookie, Admin, AnyUser, AuthToken, Role, Voter, AUTH_TOKEN_COOKIE};
