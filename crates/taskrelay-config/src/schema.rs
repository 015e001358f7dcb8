//! Configuration schema: the JSON document layout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub notifiers: NotifiersConfig,

    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    #[serde(default)]
    pub notify_api: NotifyApiConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifiersConfig {
    pub default_notifier_id: String,

    #[serde(default)]
    pub telegrams: Vec<TelegramNotifierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramNotifierConfig {
    pub id: String,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub commands: Vec<TaskCommandConfig>,

    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCommandConfig {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub scheduler: TaskSchedulerConfig,

    #[serde(default)]
    pub notifier: TaskNotifierConfig,

    pub default_notifier_id: Option<String>,

    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSchedulerConfig {
    #[serde(default)]
    pub runnable: bool,

    #[serde(default)]
    pub time_spec: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskNotifierConfig {
    #[serde(default)]
    pub usable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyApiConfig {
    #[serde(default)]
    pub ws: WebServerConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebServerConfig {
    #[serde(default)]
    pub tls_server: bool,

    #[serde(default)]
    pub tls_cert_file: String,

    #[serde(default)]
    pub tls_key_file: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            tls_server: false,
            tls_cert_file: String::new(),
            tls_key_file: String::new(),
            listen_port: default_listen_port(),
        }
    }
}

fn default_listen_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub id: String,
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub default_notifier_id: String,
    pub app_key: String,
}

impl ApplicationConfig {
    /// Converts to the wire-level `Application` DTO shared with the runtime
    /// triad, dropping `description` (a config-only field).
    pub fn to_application(&self) -> taskrelay_protocols::Application {
        taskrelay_protocols::Application {
            id: self.id.clone(),
            app_key: self.app_key.clone(),
            title: self.title.clone(),
            default_notifier_id: self.default_notifier_id.clone(),
        }
    }
}
