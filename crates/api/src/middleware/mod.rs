//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated caller behind a Bearer token.
//! - [`auth::DetectCaller`] -- `AuthUser` when `/detect` requires auth, optional otherwise.

pub mod auth;
