//! Bricky storefront library.
//!
//! The whole web application lives here so that the binary stays a thin
//! bootstrap and the router can be exercised in tests without a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
