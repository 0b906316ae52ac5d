pub mod api;
pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod routes;
pub mod rsvp;
pub mod util;
