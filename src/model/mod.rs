pub mod api;
pub mod db;
pub mod mongodb;
pub mod results;
