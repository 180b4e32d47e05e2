pub mod client;
pub mod models;

pub use client::{FetchClient, FetchError, Result};
pub use models::{FetchConfig, Request, Response};
