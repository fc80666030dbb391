#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// Assemble the server. Configuration is loaded and the database connected
/// when the returned instance is ignited.
pub fn build() -> Rocket<Build> {
    rocket::custom(config::figment())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Connection string for the test database, if one is available.
#[cfg(test)]
pub(crate) fn test_db_uri() -> Option<String> {
    std::env::var("MONGODB_URI").ok().filter(|uri| !uri.is_empty())
}

/// A fresh database name, so concurrent tests never share data.
#[cfg(test)]
pub(crate) fn test_database_name() -> String {
    format!("test_{}", model::mongodb::Id::new())
}

/// The server wired to an existing database, bypassing the ignite fairings.
#[cfg(test)]
pub(crate) fn rocket_for_db(
    client: mongodb::Client,
    db: mongodb::Database,
    config: Config,
) -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(config)
        .manage(client)
        .manage(db)
}
