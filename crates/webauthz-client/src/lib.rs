//! # Webauthz Client
//!
//! Client side of the Webauthz authorization-delegation protocol: challenge
//! detection, client registration, access requests and grant-token exchange.
//!
//! Applications depend on the [`WebauthzClient`] trait; [`Webauthz`] is the
//! HTTP-backed implementation and [`MemoryDatabase`] its in-memory storage.

pub mod challenge;
pub mod client;
pub mod database;
pub mod error;
pub mod types;

pub use client::{Webauthz, WebauthzClient, WebauthzConfig};
pub use database::{MemoryDatabase, WebauthzDatabase};
pub use error::{Result, WebauthzError};
pub use types::*;
