use std::path::Path;

use anyhow::{Result, bail};
use kdc_auth::PrincipalId;
use kdc_auth::payload::DEFAULT_FIRST_STAGE_LIFETIME_SECS;
use serde::{Deserialize, Serialize};

// =============================================================================
// File config (figment-deserialized from defaults / TOML file / env vars)
// =============================================================================
//
//   kdc-sim.toml:    [issuer]
//                    lifetime_secs = 900
//
//   env var:         KDC_ISSUER__LIFETIME_SECS=900   (double underscore = nesting)

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kdc-sim.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub issuer: IssuerFileConfig,
    #[serde(default)]
    pub simulation: SimulationFileConfig,
}

/// Issuer tunables (lives under `[issuer]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IssuerFileConfig {
    /// Lifetime stamped into first-stage credentials. Carried, not enforced.
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,
}

impl Default for IssuerFileConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: default_lifetime_secs(),
        }
    }
}

/// Principals taking part in the run (lives under `[simulation]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationFileConfig {
    #[serde(default = "default_client")]
    pub client: String,
    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

impl Default for SimulationFileConfig {
    fn default() -> Self {
        Self {
            client: default_client(),
            services: default_services(),
        }
    }
}

fn default_lifetime_secs() -> u64 {
    DEFAULT_FIRST_STAGE_LIFETIME_SECS
}
fn default_client() -> String {
    "Alice".to_string()
}
fn default_services() -> Vec<String> {
    vec!["FileServer".to_string()]
}

/// Build a figment that layers: defaults → TOML file → KDC_* env vars.
///
/// A missing file is not an error; figment skips it.
pub fn load_config(config_path: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_path))
        .merge(Env::prefixed("KDC_").split("__"))
}

// =============================================================================
// Runtime config (validated view of FileConfig)
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    pub lifetime_secs: u64,
    pub client: PrincipalId,
    pub services: Vec<PrincipalId>,
}

impl SimConfig {
    pub fn from_file(fc: &FileConfig) -> Result<Self> {
        let client = fc.simulation.client.trim();
        if client.is_empty() {
            bail!("simulation.client must not be empty");
        }
        if fc.simulation.services.is_empty() {
            bail!("simulation.services must name at least one service");
        }

        let mut services: Vec<PrincipalId> = Vec::with_capacity(fc.simulation.services.len());
        for name in &fc.simulation.services {
            let name = name.trim();
            if name.is_empty() {
                bail!("simulation.services contains an empty name");
            }
            if name == client {
                bail!("service {name:?} has the same id as the client");
            }
            let id = PrincipalId::from(name);
            if services.contains(&id) {
                bail!("service {name:?} listed twice");
            }
            services.push(id);
        }

        Ok(Self {
            lifetime_secs: fc.issuer.lifetime_secs,
            client: PrincipalId::from(client),
            services,
        })
    }
}
