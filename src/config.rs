use chrono::Duration;
use log::{error, info};
use mongodb::{Client as MongoClient, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    figment::{
        providers::{Env, Format, Serialized, Toml},
        Figment, Profile,
    },
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::{
    db::user::ensure_admin_exists,
    mongodb::{ensure_indexes_exist, Coll},
};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 5000;

/// Seconds an auth token stays valid when `AUTH_TTL` is not set.
pub const DEFAULT_AUTH_TTL: u32 = 24 * 60 * 60;

/// Database used when the connection string does not name one.
pub const DEFAULT_DATABASE: &str = "elections";

/// Plain environment variables read on top of Rocket's own configuration.
const RAW_ENV_KEYS: [&str; 6] = [
    "port",
    "jwt_secret",
    "mongodb_uri",
    "auth_ttl",
    "admin_username",
    "admin_password",
];

/// The configuration sources for the server, lowest priority first: Rocket's
/// built-in defaults, our defaults, `Rocket.toml`, `ROCKET_*` variables, then
/// the plain `PORT`, `JWT_SECRET`, `MONGODB_URI`, ... variables.
pub fn figment() -> Figment {
    layered(
        Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global(),
        Env::raw().only(&RAW_ENV_KEYS).global(),
    )
}

/// Stack the sources with the given environment providers on top.
fn layered(rocket_env: Env, raw_env: Env) -> Figment {
    Figment::from(rocket::Config::default())
        .merge(Serialized::default("port", DEFAULT_PORT))
        .merge(Serialized::default("auth_ttl", DEFAULT_AUTH_TTL))
        .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
        .merge(rocket_env)
        .merge(raw_env)
        .select(Profile::from_env_or(
            "ROCKET_PROFILE",
            rocket::Config::DEFAULT_PROFILE,
        ))
}

/// Application configuration. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
    #[serde(default)]
    admin_username: Option<String>,
    #[serde(default)]
    admin_password: Option<String>,
}

impl Config {
    /// Extract the application config from the given sources.
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        let config: Self = figment.extract()?;
        if config.jwt_secret.is_empty() {
            return Err(rocket::figment::Error::from(
                "`jwt_secret` must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Valid lifetime of auth tokens.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Credentials for the first admin account, if configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match Config::from_figment(rocket.figment()) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config; JWT_SECRET must be set");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    mongodb_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// performs any setup necessary, and places both a `Client` and a `Database`
/// into managed state.
///
/// Must be attached after [`ConfigFairing`].
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config; MONGODB_URI must be set");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(&config.mongodb_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = database_for(&client);

        // Ensure the required indexes exist. This is the first real round trip.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }

        // Ensure there is an admin, if we know how to create one.
        let app_config = match rocket.state::<Config>() {
            Some(app_config) => app_config,
            None => {
                error!("Application config must be loaded before the database");
                return Err(rocket);
            }
        };
        if let Err(e) = ensure_admin_exists(&Coll::from_db(&db), &Coll::from_db(&db), app_config).await
        {
            error!("Failed to prepare database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// The database named in the connection string, or [`DEFAULT_DATABASE`].
fn database_for(client: &MongoClient) -> Database {
    client
        .default_database()
        .unwrap_or_else(|| client.database(DEFAULT_DATABASE))
}
