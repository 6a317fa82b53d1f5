//! Ticket issuer: first-stage issuance and the exchange for service-scoped tickets.

use tracing::{debug, warn};

use crate::codec::{self, Credential};
use crate::error::AuthError;
use crate::keys::{KeyStore, PrincipalId, PrincipalKey};
use crate::payload::{
    DEFAULT_FIRST_STAGE_LIFETIME_SECS, FirstStagePayload, ServiceScopedPayload, TicketPayload,
};

/// Issues credentials from keys held in `K`.
///
/// Holds no mutable state, so one issuer can serve concurrent callers as long
/// as its key store is `Sync`.
#[derive(Debug)]
pub struct Issuer<K> {
    keys: K,
    lifetime_secs: u64,
}

impl<K: KeyStore> Issuer<K> {
    pub fn new(keys: K) -> Self {
        Self::with_lifetime(keys, DEFAULT_FIRST_STAGE_LIFETIME_SECS)
    }

    pub fn with_lifetime(keys: K, lifetime_secs: u64) -> Self {
        Self {
            keys,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime_secs
    }

    fn key_for(&self, principal: &PrincipalId) -> Result<&PrincipalKey, AuthError> {
        self.keys
            .lookup(principal)
            .ok_or_else(|| AuthError::UnknownPrincipal(principal.to_string()))
    }

    /// Issue a first-stage credential, sealed under the client's own key.
    pub fn issue_first_stage(&self, client_id: &PrincipalId) -> Result<Credential, AuthError> {
        let key = self.key_for(client_id)?;
        let payload = TicketPayload::from(FirstStagePayload {
            subject: client_id.clone(),
            lifetime: self.lifetime_secs,
        });
        let credential = codec::encrypt(&payload.to_bytes()?, key)?;
        debug!(client = %client_id, lifetime = self.lifetime_secs, "issued first-stage credential");
        Ok(credential)
    }

    /// Exchange a first-stage credential for one scoped to `service_id`,
    /// sealed under the service's key.
    ///
    /// The first-stage payload must name `client_id` exactly. A claimant with
    /// no key cannot hold a valid first-stage credential, so that is an
    /// `InvalidCredential` too.
    pub fn issue_service_scoped(
        &self,
        first_stage: &Credential,
        client_id: &PrincipalId,
        service_id: &PrincipalId,
    ) -> Result<Credential, AuthError> {
        let Some(client_key) = self.keys.lookup(client_id) else {
            warn!(client = %client_id, "first-stage credential claimed by unregistered client");
            return Err(AuthError::InvalidCredential(format!(
                "no first-stage credential can belong to unregistered client {client_id}"
            )));
        };

        let plaintext = codec::decrypt(first_stage, client_key).map_err(|e| {
            warn!(client = %client_id, error = %e, "rejected first-stage credential");
            AuthError::from(e)
        })?;
        let payload = TicketPayload::from_bytes(&plaintext)?.into_first_stage()?;

        if payload.subject != *client_id {
            warn!(
                client = %client_id,
                subject = %payload.subject,
                "first-stage subject does not match requesting client"
            );
            return Err(AuthError::InvalidCredential(format!(
                "credential subject {} does not match client {client_id}",
                payload.subject
            )));
        }

        let service_key = self.key_for(service_id)?;
        let scoped = TicketPayload::from(ServiceScopedPayload {
            subject: payload.subject,
            service: service_id.clone(),
        });
        let credential = codec::encrypt(&scoped.to_bytes()?, service_key)?;
        debug!(client = %client_id, service = %service_id, "issued service-scoped credential");
        Ok(credential)
    }
}
