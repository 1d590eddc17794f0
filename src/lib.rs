pub mod auth;
pub mod client;
pub mod configuration;
pub mod contracts;
pub mod domain;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod users;
pub mod validators;
