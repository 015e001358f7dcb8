use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("duplicate {namespace} id: {id}")]
    DuplicateId { namespace: String, id: String },

    #[error("{path} references unknown notifier '{notifier_id}'")]
    UnknownNotifierReference { path: String, notifier_id: String },

    #[error("notify_api.ws.tls_server is true but tls_cert_file is empty")]
    MissingTlsCert,

    #[error("application '{0}' is missing app_key")]
    MissingAppKey(String),

    #[error("no default notifier configured")]
    MissingDefaultNotifier,
}
