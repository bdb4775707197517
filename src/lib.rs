//! # Secret Manager
//!
//! Password-encrypted secret sharing with expiry and retrieval limits.
//!
//! A secret is a text payload (optionally with an attached file) encrypted
//! at rest under a password its creator chooses. Anyone holding the ID and
//! the password can retrieve it until its retrieval budget or lifetime runs
//! out, at which point the record is destroyed.
//!
//! ## Architecture
//!
//! ```text
//!        ┌────────────────────────────┐
//!        │        api (axum)          │
//!        └─────────────┬──────────────┘
//!                      ▼
//!        ┌────────────────────────────┐
//!        │  secrets::SecretService    │  lifecycle rules, per-ID locking
//!        └──────┬──────────────┬──────┘
//!               ▼              ▼
//!        ┌────────────┐ ┌─────────────┐
//!        │   crypto   │ │ SecretStore │
//!        │ PBKDF2+GCM │ │ mem | sqlite│
//!        └────────────┘ └─────────────┘
//! ```
//!
//! ## Modules
//! - `api`: HTTP surface (create, retrieve, download, delete, listings)
//! - `secrets`: lifecycle engine and storage backends
//! - `crypto`: password-based authenticated encryption
//! - `config`: environment-driven configuration

pub mod api;
pub mod config;
pub mod crypto;
pub mod secrets;

pub use config::Config;
