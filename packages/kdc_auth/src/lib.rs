//! Ticket-based three-party authentication: issuer, client, and service
//! verifier over an authenticated-encryption ticket codec.

pub mod client;
pub mod codec;
pub(crate) mod encoding;
pub mod error;
pub mod issuer;
pub mod keys;
pub mod payload;
pub mod service;

pub use client::{Client, ClientState};
pub use codec::{Credential, SealedTicket};
pub use error::{AuthError, CodecError, StateError};
pub use issuer::Issuer;
pub use keys::{InMemoryKeyStore, KeyStore, PrincipalId, PrincipalKey};
pub use payload::{FirstStagePayload, ServiceScopedPayload, TicketKind, TicketPayload};
pub use service::{Access, ServiceVerifier};
