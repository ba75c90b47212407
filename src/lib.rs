pub mod auth;
pub mod backend;
pub mod config;
pub mod focus;
pub mod logging;
pub mod routes;
pub mod store;
pub mod tasks;
pub mod tui;
