//! PriceFlex HTTP API Service.
//!
//! This crate provides the HTTP API for PriceFlex, including:
//!
//! - The public marketing page and discount banner
//! - Product, customization and country discount management
//! - View analytics gated by subscription tier
//! - Clerk/Stripe webhooks
//!
//! # Authentication
//!
//! Dashboard routes require a Clerk session, sent either as a bearer token or
//! in the `__session` cookie. Requests without a valid session are redirected
//! to the sign-in page.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers without awaits stay async for routing

pub mod auth;
pub mod clerk;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stripe;

pub use auth::{AuthError, AuthUser, JwksVerifier, SessionVerifier};
pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
