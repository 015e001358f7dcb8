//! Application state shared across handlers.

use std::sync::Arc;

use taskrelay_config::Config;
use taskrelay_notify::Dispatcher;
use taskrelay_protocols::Application;
use taskrelay_runtime::TaskRuntime;
use taskrelay_scheduler::Scheduler;

use crate::health::HealthEndpoint;
use crate::version::VersionInfo;

pub struct AppState {
    pub config: Arc<Config>,
    pub applications: Vec<Application>,
    pub dispatcher: Arc<Dispatcher>,
    pub runtime: Arc<TaskRuntime>,
    pub scheduler: Arc<Scheduler>,
    pub health: HealthEndpoint,
    pub version: VersionInfo,
}

impl AppState {
    pub fn new(config: Arc<Config>, dispatcher: Arc<Dispatcher>, runtime: Arc<TaskRuntime>, scheduler: Arc<Scheduler>) -> Self {
        let applications = config.notify_api.applications.iter().map(|app| app.to_application()).collect();
        Self {
            config,
            applications,
            dispatcher,
            runtime,
            scheduler,
            health: HealthEndpoint::new(),
            version: VersionInfo::current(),
        }
    }
}
