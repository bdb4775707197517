//! Secret lifecycle engine.
//!
//! Encrypted secrets live behind a password chosen by their creator and die
//! by one of three hands: a spent retrieval budget, a passed expiration
//! date, or an explicit password-authenticated delete.
//!
//! ## Architecture
//!
//! ```text
//! api::secrets ──► SecretService ──► SecretStore (memory | sqlite)
//!                      │
//!                      └──► EncryptionService (crypto)
//! ```
//!
//! The service is the only component that mutates records, and the only
//! mutation it performs is retrieval accounting. Everything below it is a
//! dumb byte store; everything above it is transport.

mod error;
mod service;
pub mod store;
pub mod types;

pub use error::SecretError;
pub use service::{
    AccessEvent, NewSecret, NewSecretFile, RetrievedFile, RetrievedSecret, SecretPage,
    SecretService,
};
pub use types::*;
