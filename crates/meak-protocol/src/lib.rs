//! Wire types for the Meak client.
//!
//! This crate defines what the client and the remote backend exchange:
//!
//! - **Types** ([`UserIdentity`], [`AuthSession`], [`AuthChange`], table
//!   rows such as [`Task`]): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits below everything else. It doesn't know about
//! HTTP or about who is signed in; it only knows shapes.
//!
//! ```text
//! Transport (HTTP) → Protocol (types) → Session / Services
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthChange, AuthEvent, AuthResponse, AuthSession, Profile, Review, Task,
    TaskStatus, UserId, UserIdentity, UserMetadata,
};
