//! taskdesk-api: HTTP transport for the TaskDesk shell.
//!
//! [`ApiClient`] implements the core's [`taskdesk_core::Authenticator`] and
//! [`taskdesk_core::IdentityResolver`] against the task server and publishes
//! unauthorized signals for the session store.

mod client;
mod error;

pub use client::{ApiClient, ApiResponse, RequestBody};
pub use error::ApiError;
pub use reqwest::Method;
