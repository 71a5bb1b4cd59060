//! # signalr-auth
//!
//! Access-token authentication for the SignalR service.
//!
//! The service trusts any HS256 token signed with the access key from the
//! connection string, as long as its `aud` claim equals the URI being called:
//! - [`audience`]: role segment and the URIs tokens are scoped to
//! - [`token`]: claims and [`TokenMinter`]

#![deny(unsafe_code)]

pub mod audience;
pub mod errors;
pub mod token;

pub use audience::{AudienceRole, compute_audience, rest_base};
pub use errors::AuthError;
pub use token::{Claims, TokenMinter};
