//! Server initialization, config load/validate, and component wiring for
//! taskrelay.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use taskrelay_api::{ApiLifecycleHook, AppState};
use taskrelay_config::{Config, ConfigLoader, ConfigValidator};
use taskrelay_core::LifecycleManager;
use taskrelay_notify::{BotCommand, Dispatcher, DispatcherLifecycleHook, HandlerFactory, LogNotifier, TelegramNotifier};
use taskrelay_protocols::{DispatchPort, NotifierHandler, RunRequestSource};
use taskrelay_runtime::{EchoTaskHandlerFactory, RuntimeLifecycleHook, TaskRuntime};
use taskrelay_scheduler::{ScheduleEntry, Scheduler, SchedulerLifecycleHook};

/// The `~/.taskrelay` directory used for log files, mirroring the
/// home-directory-rooted state directory convention used throughout.
fn taskrelay_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".taskrelay"))
        .unwrap_or_else(|| PathBuf::from(".taskrelay"))
}

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.taskrelay/debug/ with daily rotation.
pub(crate) fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = taskrelay_dir().join("debug");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("taskrelay")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Builds the `BotCommand` surface a Telegram notifier should expose: every
/// bot-usable command whose `default_notifier_id` names this notifier.
fn bot_commands_for(config: &Config, notifier_id: &str) -> Vec<BotCommand> {
    let mut commands = Vec::new();
    for task in &config.tasks {
        for command in &task.commands {
            if !command.notifier.usable {
                continue;
            }
            if command.default_notifier_id.as_deref() != Some(notifier_id) {
                continue;
            }
            commands.push(BotCommand {
                command_name: command.id.clone(),
                kind: task.id.clone(),
                command_kind: command.id.clone(),
                title: command.title.clone(),
            });
        }
    }
    commands
}

/// The dispatcher's `HandlerFactory` indirection point, so `Dispatcher`
/// itself never hardwires concrete notifier transports. Builds the
/// always-present `LogNotifier` plus one `TelegramNotifier` per configured
/// telegram from the loaded config.
struct ConfigHandlerFactory {
    config: Arc<Config>,
}

impl HandlerFactory for ConfigHandlerFactory {
    fn build(&self) -> Vec<Arc<dyn NotifierHandler>> {
        let mut handlers: Vec<Arc<dyn NotifierHandler>> = vec![Arc::new(LogNotifier::new("log"))];
        for telegram in &self.config.notifiers.telegrams {
            let commands = bot_commands_for(&self.config, &telegram.id);
            handlers.push(Arc::new(TelegramNotifier::new(
                telegram.id.clone(),
                telegram.bot_token.clone(),
                telegram.chat_id.clone(),
                commands,
            )));
        }
        handlers
    }
}

/// Loads and validates the config, wires the Task Runtime, Scheduler,
/// Notification Dispatcher, and HTTP entry point into a `LifecycleManager`,
/// installs OS signal handling, and runs until shutdown.
pub(crate) async fn run_server(
    config_path: PathBuf,
    host: String,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting taskrelay v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::load(&config_path)?;
    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!(path = %err.path, "{}", err.message);
        }
        return Err(format!("configuration invalid: {} error(s), refusing to start", validation.errors.len()).into());
    }
    info!(path = %config_path.display(), "configuration loaded and validated");
    let config = Arc::new(config);

    let manager = Arc::new(LifecycleManager::default());
    let shutdown = manager.shutdown_signal().clone();

    let dispatcher = Arc::new(Dispatcher::new(config.notifiers.default_notifier_id.clone(), shutdown.clone()));
    dispatcher
        .set_handler_factory(Arc::new(ConfigHandlerFactory { config: config.clone() }))
        .await;
    info!(
        "dispatcher configured with {} notifier(s)",
        config.notifiers.telegrams.len() + 1
    );

    let runtime = TaskRuntime::new(dispatcher.clone() as Arc<dyn DispatchPort>, shutdown.clone());
    runtime.register_factory(Arc::new(EchoTaskHandlerFactory));

    let mut schedule_entries = Vec::new();
    for task in &config.tasks {
        for command in &task.commands {
            if !command.scheduler.runnable {
                continue;
            }
            let notifier_id = command
                .default_notifier_id
                .clone()
                .unwrap_or_else(|| config.notifiers.default_notifier_id.clone());
            schedule_entries.push(ScheduleEntry::new(
                format!("{}:{}", task.id, command.id),
                task.id.clone(),
                command.id.clone(),
                notifier_id,
                &command.scheduler.time_spec,
            )?);
        }
    }
    info!("scheduler configured with {} schedule(s)", schedule_entries.len());
    let scheduler = Arc::new(Scheduler::new(schedule_entries, shutdown.clone()));

    let port = port_override.unwrap_or(config.notify_api.ws.listen_port);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let state = Arc::new(AppState::new(config.clone(), dispatcher.clone(), runtime.clone(), scheduler.clone()));
    let router = taskrelay_api::build_router(state, &config.notify_api.cors.allow_origins);

    manager.register_hook(Arc::new(RuntimeLifecycleHook(runtime.clone()))).await;
    manager
        .register_hook(Arc::new(SchedulerLifecycleHook {
            scheduler: scheduler.clone(),
            runtime: runtime.clone() as Arc<dyn RunRequestSource>,
            dispatch: dispatcher.clone() as Arc<dyn DispatchPort>,
        }))
        .await;
    manager
        .register_hook(Arc::new(DispatcherLifecycleHook {
            dispatcher: dispatcher.clone(),
            task_runner: runtime.clone() as Arc<dyn RunRequestSource>,
        }))
        .await;
    manager.register_hook(Arc::new(ApiLifecycleHook::new(addr, router, shutdown.clone()))).await;

    taskrelay_daemon::install(shutdown.clone()).await?;

    manager.start().await?;
    info!("taskrelay ready: http://{addr}");

    let mut wait_rx = shutdown.subscribe();
    let _ = wait_rx.recv().await;

    info!("shutdown signal received, stopping");
    manager.stop().await?;
    info!("taskrelay stopped");
    Ok(())
}
