//! Bokbot - programmatic client for a legacy server-rendered booking system.
//!
//! The site authenticates through an opaque redirect chain and renders all of
//! its data as HTML, so this crate is split along that seam:
//!
//! - [`session`] owns cookies and the authenticated context, re-establishing
//!   it transparently when the server expires it.
//! - [`extract`] turns the site's fixed markup dialect back into typed
//!   records, without touching the network.
//! - [`api`] composes the two into the operations the CLI exposes.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod session;

pub use error::{Error, Result};
