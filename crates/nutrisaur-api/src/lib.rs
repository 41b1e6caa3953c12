pub mod alerts;
pub mod auth;
pub mod error;
pub mod events;
pub mod metrics;
pub mod middleware;
pub mod notifications;
pub mod recommendations;
pub mod routes;
pub mod screenings;
pub mod session;
pub mod state;
