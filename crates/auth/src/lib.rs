//! `tradegate-auth` — authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it models the
//! authenticated actor (identity + role), the JWT claims we accept, and the
//! closed role set. Token *issuance* lives outside this system.

pub mod actor;
pub mod claims;
pub mod roles;

pub use actor::Actor;
pub use claims::{Hs256JwtValidator, JwtClaims, JwtValidator, TokenValidationError};
pub use roles::Role;
