pub mod agent;
pub mod api;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod host;
pub mod logging;
pub mod ui;
pub mod utils;
