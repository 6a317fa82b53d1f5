//! Resource-server side: validates service-scoped credentials with the
//! service's own key, independently of the issuer.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::{self, Credential};
use crate::error::AuthError;
use crate::keys::{PrincipalId, PrincipalKey};
use crate::payload::TicketPayload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum Access {
    Granted { subject: PrincipalId },
    Denied { reason: String },
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Granted { subject } => write!(f, "granted to {subject}"),
            Self::Denied { reason } => write!(f, "denied: {reason}"),
        }
    }
}

/// Holds only this service's key; never consults the issuer's key store.
pub struct ServiceVerifier {
    service_id: PrincipalId,
    key: PrincipalKey,
}

impl ServiceVerifier {
    pub fn new(service_id: PrincipalId, key: PrincipalKey) -> Self {
        Self { service_id, key }
    }

    pub fn service_id(&self) -> &PrincipalId {
        &self.service_id
    }

    /// Validate a service-scoped credential addressed to this service.
    ///
    /// Every failure is an `InvalidCredential` error, so callers can tell a
    /// bad credential apart from other faults.
    pub fn verify(&self, credential: &Credential) -> Result<Access, AuthError> {
        let plaintext = codec::decrypt(credential, &self.key)?;
        let payload = TicketPayload::from_bytes(&plaintext)?.into_service_scoped()?;

        if payload.service != self.service_id {
            return Err(AuthError::InvalidCredential(format!(
                "credential is scoped to {}, not {}",
                payload.service, self.service_id
            )));
        }

        debug!(service = %self.service_id, subject = %payload.subject, "access granted");
        Ok(Access::Granted {
            subject: payload.subject,
        })
    }

    /// [`verify`](Self::verify), with any error folded into `Access::Denied`.
    pub fn check(&self, credential: &Credential) -> Access {
        self.verify(credential).unwrap_or_else(|e| {
            warn!(service = %self.service_id, error = %e, "access denied");
            Access::Denied {
                reason: e.to_string(),
            }
        })
    }
}

impl fmt::Debug for ServiceVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceVerifier")
            .field("service_id", &self.service_id)
            .finish_non_exhaustive()
    }
}
