//! Authenticated session over the login redirect chain.

mod client;
mod params;

pub use client::{AuthState, RequestOptions, Session};
pub use params::SessionParams;
