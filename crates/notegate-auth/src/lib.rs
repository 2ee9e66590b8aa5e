//! # Notegate Auth
//!
//! Identity verification for the Notegate system.
//!
//! A credential is a signed bearer token minted by an issuer keypair. The
//! verifier holds only the issuer's public key: it resolves a credential to
//! a stable [`UserId`](notegate_core::UserId) or refuses with a typed
//! [`AuthError`]. Verification is pure; the access gateway calls it before
//! touching any storage and never trusts a client-asserted identity.
//!
//! ## Key Types
//!
//! - [`IdentityVerifier`] - The trait the gateway depends on
//! - [`TokenVerifier`] - Concrete verifier: signature, expiry, revocation
//! - [`IssuerKeypair`] - Mints credentials (login flow, tests)
//! - [`AuthError`] - Why a credential was refused

pub mod crypto;
pub mod error;
pub mod token;
pub mod verifier;

pub use crypto::{CredentialSignature, IssuerKeypair, IssuerPublicKey};
pub use error::AuthError;
pub use token::AccessToken;
pub use verifier::{IdentityVerifier, TokenVerifier};
