//! HTTP API for the secret manager.
//!
//! ## Endpoints
//!
//! - `POST /api/secrets/create` - Create a secret (multipart, optional file)
//! - `POST /api/secrets/{id}` - Retrieve and decrypt a secret
//! - `POST /api/secrets/{id}/download` - Download the decrypted file attachment
//! - `POST /api/secrets/delete/{id}` - Delete a secret (password-authenticated)
//! - `GET /api/secrets/count` - Total number of stored secrets
//! - `GET /api/secrets/user-secrets` - Page through one creator's secrets
//! - `GET /` - Service banner

mod routes;
pub mod secrets;

pub use routes::{serve, AppState};
