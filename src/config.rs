use crate::common::constants::*;
use crate::common::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Which record shape the run produces.
///
/// `Minimal` emits the three-field records; `Extended` additionally
/// requires the contact/count columns and emits contact data plus run totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Minimal,
    Extended,
}

/// Maps logical fields to the spreadsheet's column headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub name: String,
    pub tax_id: String,
    pub equipment: Vec<String>,
    pub timestamp: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub shirt_size: String,
    pub total_equipment: String,
    pub unique_donors: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: "NOME".to_string(),
            tax_id: "CPF".to_string(),
            equipment: vec![
                "Equipamento1".to_string(),
                "Equipamento2".to_string(),
                "Equipamento3".to_string(),
            ],
            timestamp: "CARIMBO".to_string(),
            phone: "TELEFONE".to_string(),
            address: "ENDERECO".to_string(),
            city: "CIDADE".to_string(),
            state: "ESTADO".to_string(),
            postal_code: "CEP".to_string(),
            shirt_size: "TAMANHO_CAMISA".to_string(),
            total_equipment: "TOTAL_EQUIP".to_string(),
            unique_donors: "UNICOS_CPF".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_url: String,
    pub repository: String,
    pub branch: Option<String>,
    pub output_path: String,
    pub token_env_var: String,
    pub api_base_url: String,
    pub fetch_timeout_secs: u64,
    pub profile: Profile,
    /// Overrides the column set derived from `profile` when present.
    pub required_columns: Option<Vec<String>>,
    pub invalid_tax_id_marker: String,
    pub empty_message: String,
    pub commit_message_update: String,
    pub commit_message_create: String,
    pub skip_unchanged: bool,
    /// Kept last so it serializes as a trailing `[columns]` table.
    pub columns: ColumnMap,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            repository: DEFAULT_REPOSITORY.to_string(),
            branch: None,
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            token_env_var: DEFAULT_TOKEN_ENV_VAR.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            profile: Profile::Minimal,
            required_columns: None,
            invalid_tax_id_marker: DEFAULT_INVALID_TAX_ID_MARKER.to_string(),
            empty_message: DEFAULT_EMPTY_MESSAGE.to_string(),
            commit_message_update: DEFAULT_COMMIT_MESSAGE_UPDATE.to_string(),
            commit_message_create: DEFAULT_COMMIT_MESSAGE_CREATE.to_string(),
            skip_unchanged: true,
            columns: ColumnMap::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or `doadores.toml` when it exists),
    /// then apply `DOADORES_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| {
                    SyncError::Config(format!(
                        "Failed to read config file '{}': {}",
                        p.display(),
                        e
                    ))
                })?;
                info!(path = %p.display(), "Loaded configuration file");
                Self::from_toml_str(&content)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                let content = fs::read_to_string(DEFAULT_CONFIG_FILE)?;
                info!(path = DEFAULT_CONFIG_FILE, "Loaded configuration file");
                Self::from_toml_str(&content)?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment-style overrides; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_SOURCE_URL) {
            self.source_url = v;
        }
        if let Some(v) = get(ENV_REPOSITORY) {
            self.repository = v;
        }
        if let Some(v) = get(ENV_OUTPUT_PATH) {
            self.output_path = v;
        }
        if let Some(v) = get(ENV_TOKEN_ENV) {
            self.token_env_var = v;
        }
        if let Some(v) = get(ENV_API_BASE_URL) {
            self.api_base_url = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_url.trim().is_empty() {
            return Err(SyncError::Config("source_url must not be empty".into()));
        }
        if self.output_path.trim().is_empty() {
            return Err(SyncError::Config("output_path must not be empty".into()));
        }
        if self.token_env_var.trim().is_empty() {
            return Err(SyncError::Config("token_env_var must not be empty".into()));
        }
        let parts: Vec<&str> = self.repository.split('/').collect();
        if parts.len() != 2 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(SyncError::Config(format!(
                "repository must look like 'owner/name', got '{}'",
                self.repository
            )));
        }
        let slots = self.columns.equipment.len();
        if slots == 0 || slots > MAX_EQUIPMENT_SLOTS {
            return Err(SyncError::Config(format!(
                "between 1 and {} equipment columns are supported, got {}",
                MAX_EQUIPMENT_SLOTS, slots
            )));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(SyncError::Config("fetch_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Columns that must be present in the header row.
    pub fn required_columns(&self) -> Vec<String> {
        if let Some(explicit) = &self.required_columns {
            return explicit.clone();
        }

        let c = &self.columns;
        let mut required = vec![c.name.clone(), c.tax_id.clone()];
        required.extend(c.equipment.iter().cloned());

        if self.profile == Profile::Extended {
            required.extend([
                c.timestamp.clone(),
                c.phone.clone(),
                c.address.clone(),
                c.city.clone(),
                c.state.clone(),
                c.postal_code.clone(),
                c.shirt_size.clone(),
                c.total_equipment.clone(),
                c.unique_donors.clone(),
            ]);
        }
        required
    }

    pub fn include_aggregates(&self) -> bool {
        self.profile == Profile::Extended
    }

    /// Read the access token from the configured environment variable.
    pub fn access_token(&self) -> Result<String> {
        self.access_token_with(|key| std::env::var(key).ok())
    }

    pub fn access_token_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.token_env_var)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SyncError::Credential {
                var: self.token_env_var.clone(),
            })
    }
}
