//! Defaults used when the configuration file leaves a field out.

pub const DEFAULT_SOURCE_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vRxPVwi6kwvZIc9bsTljFADsVIwzC1BFrI9WBDiaC91LCuBR5nU5HV6Tioy7LbyPwmZ6UEDxk3t_2v6/pub?gid=1513229493&single=true&output=csv";
pub const DEFAULT_REPOSITORY: &str = "meshwave65/aoaib";
pub const DEFAULT_OUTPUT_PATH: &str = "dados/doador.json";
pub const DEFAULT_TOKEN_ENV_VAR: &str = "DOADORES";
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONFIG_FILE: &str = "doadores.toml";

// Sentinels written into records
pub const UNKNOWN_NAME: &str = "DESCONHECIDO";
pub const DEFAULT_INVALID_TAX_ID_MARKER: &str = "CPF INVALIDO";
pub const DEFAULT_EMPTY_MESSAGE: &str = "Nenhum doador encontrado";

// Commit messages for the published file
pub const DEFAULT_COMMIT_MESSAGE_UPDATE: &str = "Atualização de doador";
pub const DEFAULT_COMMIT_MESSAGE_CREATE: &str = "Criação inicial de doador";

/// Masking separator between the revealed prefix and suffix.
pub const MASK: &str = "***";

pub const TAX_ID_DIGITS: usize = 11;
pub const EQUIPMENT_MASK_THRESHOLD: usize = 10;
pub const EQUIPMENT_KEEP_CHARS: usize = 5;
pub const MAX_EQUIPMENT_SLOTS: usize = 3;

/// Environment variable overrides applied after the config file.
pub const ENV_SOURCE_URL: &str = "DOADORES_SOURCE_URL";
pub const ENV_REPOSITORY: &str = "DOADORES_REPOSITORY";
pub const ENV_OUTPUT_PATH: &str = "DOADORES_OUTPUT_PATH";
pub const ENV_TOKEN_ENV: &str = "DOADORES_TOKEN_ENV";
pub const ENV_API_BASE_URL: &str = "DOADORES_API_BASE_URL";
pub const ENV_PUSHGATEWAY_URL: &str = "DOADORES_PUSHGATEWAY_URL";
