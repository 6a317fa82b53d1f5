//! Plaintext ticket payloads, tagged by kind.
//!
//! The `kind` discriminator is serialized inside the authenticated plaintext,
//! so a credential of one kind can never be read as the other.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::keys::PrincipalId;

/// Lifetime stamped into first-stage payloads unless the issuer is told otherwise.
pub const DEFAULT_FIRST_STAGE_LIFETIME_SECS: u64 = 600;

/// Proof that the issuer has validated the client. Scoped to no service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstStagePayload {
    pub subject: PrincipalId,
    /// Carried but not enforced.
    pub lifetime: u64,
}

/// Proof that `subject` may approach `service`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceScopedPayload {
    pub subject: PrincipalId,
    pub service: PrincipalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    FirstStage,
    ServiceScoped,
}

impl fmt::Display for TicketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstStage => write!(f, "first_stage"),
            Self::ServiceScoped => write!(f, "service_scoped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketPayload {
    FirstStage(FirstStagePayload),
    ServiceScoped(ServiceScopedPayload),
}

impl TicketPayload {
    pub fn kind(&self) -> TicketKind {
        match self {
            Self::FirstStage(_) => TicketKind::FirstStage,
            Self::ServiceScoped(_) => TicketKind::ServiceScoped,
        }
    }

    pub fn subject(&self) -> &PrincipalId {
        match self {
            Self::FirstStage(p) => &p.subject,
            Self::ServiceScoped(p) => &p.subject,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, AuthError> {
        serde_json::to_vec(self).map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Parse authenticated plaintext. Only call this on bytes returned by a
    /// successful decrypt.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(bytes)
            .map_err(|e| AuthError::InvalidCredential(format!("malformed payload: {e}")))
    }

    pub fn into_first_stage(self) -> Result<FirstStagePayload, AuthError> {
        match self {
            Self::FirstStage(p) => Ok(p),
            other => Err(wrong_kind(TicketKind::FirstStage, other.kind())),
        }
    }

    pub fn into_service_scoped(self) -> Result<ServiceScopedPayload, AuthError> {
        match self {
            Self::ServiceScoped(p) => Ok(p),
            other => Err(wrong_kind(TicketKind::ServiceScoped, other.kind())),
        }
    }
}

impl From<FirstStagePayload> for TicketPayload {
    fn from(p: FirstStagePayload) -> Self {
        Self::FirstStage(p)
    }
}

impl From<ServiceScopedPayload> for TicketPayload {
    fn from(p: ServiceScopedPayload) -> Self {
        Self::ServiceScoped(p)
    }
}

fn wrong_kind(expected: TicketKind, actual: TicketKind) -> AuthError {
    AuthError::InvalidCredential(format!("expected {expected} ticket, got {actual}"))
}
