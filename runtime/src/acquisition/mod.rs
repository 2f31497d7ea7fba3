//! Page acquisition: HTTP client, fetch strategies, validity predicate and
//! the orchestrator that ties them into one ladder.
//!
//! The browser is the last rung of the ladder, reached only after every
//! HTTP strategy has failed.

pub mod diagnose;
pub mod http_client;
pub mod orchestrator;
pub mod strategy;
pub mod validity;
