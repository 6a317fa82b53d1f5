//! Drives one full exchange: first-stage issuance, one service credential per
//! configured service, verification at each service, and optionally a set of
//! presentations that must be refused.

use kdc_auth::error::ErrorResponse;
use kdc_auth::{
    AuthError, Client, Credential, InMemoryKeyStore, Issuer, PrincipalId, ServiceVerifier,
};
use serde::Serialize;
use tracing::{error, info};

use crate::config::SimConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Accepted { detail: String },
    Rejected(ErrorResponse),
}

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub name: String,
    pub expected: Expectation,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Step {
    pub fn passed(&self) -> bool {
        matches!(
            (self.expected, &self.outcome),
            (Expectation::Accept, Outcome::Accepted { .. })
                | (Expectation::Reject, Outcome::Rejected(_))
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub client: PrincipalId,
    pub lifetime_secs: u64,
    pub steps: Vec<Step>,
}

impl SimulationReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(Step::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| !s.passed())
    }

    fn record(&mut self, name: String, expected: Expectation, result: Result<String, AuthError>) {
        let outcome = match result {
            Ok(detail) => Outcome::Accepted { detail },
            Err(e) => Outcome::Rejected(ErrorResponse::from(&e)),
        };
        let step = Step {
            name,
            expected,
            outcome,
        };
        if step.passed() {
            info!(step = %step.name, outcome = ?step.outcome, "ok");
        } else {
            error!(step = %step.name, expected = ?step.expected, outcome = ?step.outcome, "unexpected outcome");
        }
        self.steps.push(step);
    }
}

/// First id of the form `<client>2`, `<client>22`, ... not already taken.
fn impostor_id(config: &SimConfig) -> PrincipalId {
    let mut name = format!("{}2", config.client);
    while config.services.iter().any(|s| s.as_str() == name) {
        name.push('2');
    }
    PrincipalId::from(name)
}

fn describe(credential: &Credential) -> String {
    format!("credential, {} chars", credential.as_str().len())
}

/// Flip one bit in the first ciphertext byte.
fn tamper(credential: &Credential) -> Result<Credential, AuthError> {
    let mut sealed = credential.decode()?;
    match sealed.ciphertext.first_mut() {
        Some(b) => *b ^= 0x01,
        None => sealed.tag[0] ^= 0x01,
    }
    Ok(Credential::from_sealed(&sealed))
}

pub fn run<R: rand::CryptoRng + rand::RngCore>(
    config: &SimConfig,
    negative_checks: bool,
    rng: &mut R,
) -> SimulationReport {
    let mut report = SimulationReport {
        client: config.client.clone(),
        lifetime_secs: config.lifetime_secs,
        steps: Vec::new(),
    };

    let mut store = InMemoryKeyStore::new();
    let client_key = store.generate_for(config.client.clone(), rng);
    let verifiers: Vec<ServiceVerifier> = config
        .services
        .iter()
        .map(|service| {
            let key = store.generate_for(service.clone(), rng);
            ServiceVerifier::new(service.clone(), key)
        })
        .collect();
    let impostor = impostor_id(config);
    if negative_checks {
        // Same key as the client: only the subject comparison can turn it away.
        store.insert(impostor.clone(), client_key);
    }
    info!(principals = store.len(), "generated principal keys");

    let issuer = Issuer::with_lifetime(store, config.lifetime_secs);
    let mut client = Client::new(config.client.clone(), &issuer);

    let first_stage = client.request_first_stage().cloned();
    report.record(
        "request first-stage credential".to_string(),
        Expectation::Accept,
        first_stage.as_ref().map(describe).map_err(Clone::clone),
    );
    let Ok(first_stage) = first_stage else {
        return report;
    };

    let mut issued: Vec<Credential> = Vec::with_capacity(verifiers.len());
    for verifier in &verifiers {
        let service = verifier.service_id();
        let credential = client.request_service_credential(service);
        report.record(
            format!("request credential for {service}"),
            Expectation::Accept,
            credential.as_ref().map(describe).map_err(Clone::clone),
        );
        let Ok(credential) = credential else {
            continue;
        };
        report.record(
            format!("verify at {service}"),
            Expectation::Accept,
            verifier.verify(&credential).map(|access| access.to_string()),
        );
        issued.push(credential);
    }

    if !negative_checks {
        return report;
    }

    let Some(first_service) = verifiers.first() else {
        return report;
    };
    if let Some(credential) = issued.first() {
        report.record(
            format!("tampered credential at {}", first_service.service_id()),
            Expectation::Reject,
            tamper(credential)
                .and_then(|t| first_service.verify(&t))
                .map(|a| a.to_string()),
        );

        if let Some(other) = verifiers.get(1) {
            report.record(
                format!(
                    "{} credential presented to {}",
                    first_service.service_id(),
                    other.service_id()
                ),
                Expectation::Reject,
                other.verify(credential).map(|a| a.to_string()),
            );
        }
    }

    report.record(
        format!("first-stage credential claimed by {impostor}"),
        Expectation::Reject,
        issuer
            .issue_service_scoped(&first_stage, &impostor, first_service.service_id())
            .map(|c| describe(&c)),
    );

    report.record(
        format!("first-stage credential presented to {}", first_service.service_id()),
        Expectation::Reject,
        first_service.verify(&first_stage).map(|a| a.to_string()),
    );

    let fresh = Client::new(config.client.clone(), &issuer);
    report.record(
        "service request without first-stage credential".to_string(),
        Expectation::Reject,
        fresh
            .request_service_credential(first_service.service_id())
            .map(|c| describe(&c)),
    );

    report
}
