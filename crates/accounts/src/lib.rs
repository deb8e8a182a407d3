//! Bazaar Accounts - Account provisioning.
//!
//! Registering an account spans two independent stores: the relational
//! account store and the token cache. There is no shared transaction between
//! them, so registration runs as a saga (create account, issue a token
//! pair, persist the pair) with a compensating account deletion when the
//! final step fails. Login and refresh reuse the token steps without
//! creating anything, and therefore carry no compensation.
//!
//! # Modules
//!
//! - [`models`] - Account, claims, token pair, and input shapes
//! - [`store`] - `AccountStore` trait with Postgres and in-memory backends
//! - [`issuer`] - Dual-secret JWT signing and refresh verification
//! - [`cache`] - `TokenCache` trait with a moka backend
//! - [`saga`] - The provisioning saga itself
//! - [`error`] - `AuthError` taxonomy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod error;
pub mod issuer;
pub mod models;
pub mod saga;
pub mod store;

pub use cache::TokenCache;
pub use error::AuthError;
pub use issuer::CredentialIssuer;
pub use models::{Account, AccountClaims, LoginInput, RegisterInput, TokenPair};
pub use saga::ProvisioningSaga;
pub use store::AccountStore;
