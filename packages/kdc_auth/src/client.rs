//! Client side of the exchange: holds a first-stage credential and trades it
//! for service-scoped ones.

use std::fmt;

use tracing::debug;

use crate::codec::Credential;
use crate::error::{AuthError, StateError};
use crate::issuer::Issuer;
use crate::keys::{KeyStore, PrincipalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    NoCredential,
    HasFirstStage,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredential => write!(f, "no_credential"),
            Self::HasFirstStage => write!(f, "has_first_stage"),
        }
    }
}

pub struct Client<'a, K> {
    id: PrincipalId,
    issuer: &'a Issuer<K>,
    first_stage: Option<Credential>,
}

impl<'a, K: KeyStore> Client<'a, K> {
    pub fn new(id: PrincipalId, issuer: &'a Issuer<K>) -> Self {
        Self {
            id,
            issuer,
            first_stage: None,
        }
    }

    pub fn id(&self) -> &PrincipalId {
        &self.id
    }

    pub fn state(&self) -> ClientState {
        match self.first_stage {
            Some(_) => ClientState::HasFirstStage,
            None => ClientState::NoCredential,
        }
    }

    pub fn first_stage(&self) -> Option<&Credential> {
        self.first_stage.as_ref()
    }

    /// Obtain a first-stage credential. A later call replaces the held one.
    /// On failure the previous state is kept.
    pub fn request_first_stage(&mut self) -> Result<&Credential, AuthError> {
        debug!(client = %self.id, "requesting first-stage credential");
        let credential = self.issuer.issue_first_stage(&self.id)?;
        Ok(&*self.first_stage.insert(credential))
    }

    /// Obtain a credential for `service_id`. Repeatable; the first-stage
    /// credential stays held.
    pub fn request_service_credential(
        &self,
        service_id: &PrincipalId,
    ) -> Result<Credential, AuthError> {
        let first_stage = self
            .first_stage
            .as_ref()
            .ok_or(StateError::NoFirstStage)?;
        debug!(client = %self.id, service = %service_id, "requesting service credential");
        self.issuer
            .issue_service_scoped(first_stage, &self.id, service_id)
    }
}

impl<K> fmt::Debug for Client<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("first_stage", &self.first_stage)
            .finish_non_exhaustive()
    }
}
