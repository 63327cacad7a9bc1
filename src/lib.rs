//! astar-api: bearer-token gated HTTP backend.
//!
//! Requests to `/api/v1/*` pass through one gate that verifies either a Firebase ID token
//! or a self-issued HS256 token (chosen by `AUTH_GATE`) and hands the verified identity to
//! handlers as `AuthCtx`.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
