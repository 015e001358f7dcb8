//! Configuration validation: duplicate-ID, unknown-notifier-reference, and
//! TLS/app-key checks that must abort startup.

use std::collections::HashSet;

use crate::schema::Config;

/// ID of the `LogNotifier` the binary crate registers unconditionally
/// alongside whatever notifiers the config declares. It is always present
/// at runtime, so it counts as a valid notifier reference (including as
/// `default_notifier_id`) even though it never appears in this config
/// document.
const BUILTIN_LOG_NOTIFIER_ID: &str = "log";

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        let notifier_ids = Self::validate_notifiers(config, &mut result);
        Self::validate_tasks(config, &notifier_ids, &mut result);
        Self::validate_notify_api(config, &notifier_ids, &mut result);

        result
    }

    fn validate_notifiers(config: &Config, result: &mut ValidationResult) -> HashSet<String> {
        let mut seen = HashSet::new();
        seen.insert(BUILTIN_LOG_NOTIFIER_ID.to_string());

        for telegram in &config.notifiers.telegrams {
            if !seen.insert(telegram.id.clone()) {
                result.add_error(ValidationError::new(
                    "notifiers.telegrams",
                    format!("duplicate notifier id '{}'", telegram.id),
                ));
            }
        }

        if !seen.contains(&config.notifiers.default_notifier_id) {
            result.add_error(ValidationError::new(
                "notifiers.default_notifier_id",
                format!(
                    "default notifier '{}' does not match any configured notifier",
                    config.notifiers.default_notifier_id
                ),
            ));
        }

        seen
    }

    fn validate_tasks(config: &Config, notifier_ids: &HashSet<String>, result: &mut ValidationResult) {
        let mut task_ids = HashSet::new();
        for task in &config.tasks {
            if !task_ids.insert(task.id.clone()) {
                result.add_error(ValidationError::new(
                    "tasks",
                    format!("duplicate task id '{}'", task.id),
                ));
            }

            let mut command_ids = HashSet::new();
            for command in &task.commands {
                if !command_ids.insert(command.id.clone()) {
                    result.add_error(ValidationError::new(
                        format!("tasks.{}.commands", task.id),
                        format!("duplicate command id '{}'", command.id),
                    ));
                }

                if let Some(notifier_id) = &command.default_notifier_id {
                    if !notifier_ids.contains(notifier_id) {
                        result.add_error(ValidationError::new(
                            format!("tasks.{}.commands.{}.default_notifier_id", task.id, command.id),
                            format!("unknown notifier '{}'", notifier_id),
                        ));
                    }
                }

                if command.scheduler.runnable && command.scheduler.time_spec.is_empty() {
                    result.add_error(ValidationError::new(
                        format!("tasks.{}.commands.{}.scheduler.time_spec", task.id, command.id),
                        "runnable command requires a time_spec",
                    ));
                }
            }
        }
    }

    fn validate_notify_api(config: &Config, notifier_ids: &HashSet<String>, result: &mut ValidationResult) {
        let ws = &config.notify_api.ws;
        if ws.tls_server && (ws.tls_cert_file.is_empty() || ws.tls_key_file.is_empty()) {
            result.add_error(ValidationError::new(
                "notify_api.ws",
                "tls_server enabled but tls_cert_file or tls_key_file is empty",
            ));
        }

        let mut app_ids = HashSet::new();
        for app in &config.notify_api.applications {
            if !app_ids.insert(app.id.clone()) {
                result.add_error(ValidationError::new(
                    "notify_api.applications",
                    format!("duplicate application id '{}'", app.id),
                ));
            }

            if app.app_key.is_empty() {
                result.add_error(ValidationError::new(
                    format!("notify_api.applications.{}.app_key", app.id),
                    "app_key must not be empty",
                ));
            }

            if !notifier_ids.contains(&app.default_notifier_id) {
                result.add_error(ValidationError::new(
                    format!("notify_api.applications.{}.default_notifier_id", app.id),
                    format!("unknown notifier '{}'", app.default_notifier_id),
                ));
            }
        }

        if config.notify_api.applications.is_empty() {
            result.add_warning(ValidationWarning::new(
                "notify_api.applications",
                "no applications configured, the HTTP surface will reject every request",
            ));
        }
    }
}
