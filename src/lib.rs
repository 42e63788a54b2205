//! Campus360 API gateway.
//!
//! Authenticates bearer credentials on protected routes and forwards each
//! request to the backend service that owns its URL prefix.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
