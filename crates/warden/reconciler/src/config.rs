//! Configuration for warden-reconciler

use serde::{Deserialize, Serialize};

/// Main reconciler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Table layout and batching
    #[serde(default)]
    pub storage: StorageConfig,

    /// Provisioning state vocabulary and readiness flags
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Backend configuration output
    #[serde(default)]
    pub backends: BackendConfig,

    /// Status event filtering
    #[serde(default)]
    pub events: EventConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Table names, partition keys and batch paging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_table")]
    pub state_table: String,

    #[serde(default = "default_status_table")]
    pub status_table: String,

    #[serde(default = "default_configuration_table")]
    pub configuration_table: String,

    #[serde(default = "default_state_partition")]
    pub state_partition: String,

    #[serde(default = "default_status_partition")]
    pub status_partition: String,

    #[serde(default = "default_configuration_partition")]
    pub configuration_partition: String,

    /// Maximum rows per batch call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_table: default_state_table(),
            status_table: default_status_table(),
            configuration_table: default_configuration_table(),
            state_partition: default_state_partition(),
            status_partition: default_status_partition(),
            configuration_partition: default_configuration_partition(),
            batch_size: default_batch_size(),
        }
    }
}

/// Provisioning state vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Target kind handled by state sync
    #[serde(default = "default_scale_set_kind")]
    pub scale_set_kind: String,

    /// Provisioning state of a healthy, running instance
    #[serde(default = "default_success_value")]
    pub success_value: String,

    /// Provisioning state that triggers forced deletion
    #[serde(default = "default_failure_value")]
    pub failure_value: String,

    /// Set once the tables have been created
    #[serde(default = "default_data_ready_flag")]
    pub data_ready_flag: String,

    /// Set once the engine has been initialized
    #[serde(default = "default_application_ready_flag")]
    pub application_ready_flag: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            scale_set_kind: default_scale_set_kind(),
            success_value: default_success_value(),
            failure_value: default_failure_value(),
            data_ready_flag: default_data_ready_flag(),
            application_ready_flag: default_application_ready_flag(),
        }
    }
}

/// Backend configuration output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Blob container receiving one file per frontend
    #[serde(default = "default_container")]
    pub container: String,

    /// Port written on every backend line
    #[serde(default = "default_backend_port")]
    pub port: u16,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            port: default_backend_port(),
        }
    }
}

/// Status event filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Only accept events from this topic, if set
    #[serde(default)]
    pub topic_id: Option<String>,

    /// Accepted event type
    #[serde(default = "default_event_type")]
    pub event_type: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            topic_id: None,
            event_type: default_event_type(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_state_table() -> String {
    "State".to_string()
}

fn default_status_table() -> String {
    "Status".to_string()
}

fn default_configuration_table() -> String {
    "Configuration".to_string()
}

fn default_state_partition() -> String {
    "StateEntities".to_string()
}

fn default_status_partition() -> String {
    "StatusEntities".to_string()
}

fn default_configuration_partition() -> String {
    "ConfigurationEntities".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_scale_set_kind() -> String {
    "VirtualMachineScaleSet".to_string()
}

fn default_success_value() -> String {
    "Succeeded".to_string()
}

fn default_failure_value() -> String {
    "Failed".to_string()
}

fn default_data_ready_flag() -> String {
    "data-model-system-state".to_string()
}

fn default_application_ready_flag() -> String {
    "application-model-system-state".to_string()
}

fn default_container() -> String {
    "configuration".to_string()
}

fn default_backend_port() -> u16 {
    80
}

fn default_event_type() -> String {
    "warden-status".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ReconcilerConfig {
    /// Load configuration from defaults, an optional file and the environment.
    ///
    /// Environment variables use the `WARDEN_` prefix and `__` between
    /// nested keys, e.g. `WARDEN_STORAGE__BATCH_SIZE=50`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&ReconcilerConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("WARDEN")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
