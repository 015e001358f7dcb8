//! Telegram bot notifier: outbound `sendMessage` delivery plus the
//! `/help`, `/<task_command_name>`, `/cancel_<instanceID>` inbound
//! command surface, grounded on a
//! `TelegramChannel` HTTP send shape.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use taskrelay_protocols::error::DispatchError;
use taskrelay_protocols::{mask, Masked, NotifierHandler, NotifierId, Origin, RunRequest, RunRequestSource, TaskCommandKind, TaskContext, TaskKind, CONTEXT_MESSAGE_ID};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// One entry in the bot's `/<task_command_name>` surface.
#[derive(Debug, Clone)]
pub struct BotCommand {
    pub command_name: String,
    pub kind: TaskKind,
    pub command_kind: TaskCommandKind,
    pub title: String,
}

pub struct TelegramNotifier {
    id: NotifierId,
    bot_token: Masked<String>,
    chat_id: String,
    client: reqwest::Client,
    commands: Vec<BotCommand>,
    poll_offset: AtomicI64,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(
        id: impl Into<NotifierId>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        commands: Vec<BotCommand>,
    ) -> Self {
        Self {
            id: id.into(),
            bot_token: Masked::new(bot_token.into()),
            chat_id: chat_id.into(),
            client: reqwest::Client::new(),
            commands,
            poll_offset: AtomicI64::new(0),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API base, for testing against a
    /// local mock server instead of the real Telegram API.
    #[cfg(test)]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token.reveal(), method)
    }

    fn help_text(&self) -> String {
        let mut lines = vec!["Available commands:".to_string(), "/help".to_string()];
        lines.extend(self.commands.iter().map(|c| format!("/{} - {}", c.command_name, c.title)));
        lines.join("\n")
    }

    async fn send_raw(&self, text: &str, reply_to: Option<i64>) -> bool {
        let mut payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(message_id) = reply_to {
            payload["reply_to_message_id"] = serde_json::json!(message_id);
        }

        let response = match self.client.post(self.api_url("sendMessage")).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(notifier_id = %self.id, "telegram sendMessage transport error: {}", e);
                return false;
            }
        };

        if response.status().is_success() {
            true
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(notifier_id = %self.id, %status, "telegram sendMessage returned non-success: {}", body);
            false
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>, DispatchError> {
        let url = self.api_url("getUpdates");
        let response = self
            .client
            .get(&url)
            .query(&[("offset", offset.to_string()), ("timeout", "25".to_string())])
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let body: TelegramGetUpdatesResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Transport(format!("malformed getUpdates response: {e}")))?;

        Ok(body.result)
    }

    async fn handle_update(&self, update: &TelegramUpdate, task_runner: &Arc<dyn RunRequestSource>) {
        let Some(message) = &update.message else { return };
        if message.chat.id.to_string() != self.chat_id {
            return;
        }
        let Some(text) = &message.text else { return };

        if text == "/help" {
            self.send_raw(&self.help_text(), Some(message.message_id)).await;
            return;
        }

        if let Some(id_str) = text.strip_prefix("/cancel_") {
            match id_str.parse::<u64>() {
                Ok(instance_id) => {
                    task_runner.submit_cancel(instance_id).await;
                }
                Err(_) => {
                    self.send_raw(&self.help_text(), Some(message.message_id)).await;
                }
            }
            return;
        }

        if let Some(command_name) = text.strip_prefix('/') {
            if let Some(command) = self.commands.iter().find(|c| c.command_name == command_name) {
                let mut context = TaskContext::new();
                context.insert(CONTEXT_MESSAGE_ID.to_string(), message.message_id.to_string());
                let request = RunRequest::new(command.kind.clone(), command.command_kind.clone(), self.id.clone(), Origin::User)
                    .with_context(context)
                    .with_notify_on_start(true);
                task_runner.submit_run(request).await;
                return;
            }
        }

        self.send_raw(&self.help_text(), Some(message.message_id)).await;
    }
}

#[async_trait]
impl NotifierHandler for TelegramNotifier {
    fn id(&self) -> &NotifierId {
        &self.id
    }

    async fn notify(&self, text: &str, context: &TaskContext) -> bool {
        let reply_to = context.get(CONTEXT_MESSAGE_ID).and_then(|v| v.parse::<i64>().ok());
        self.send_raw(text, reply_to).await
    }

    fn supports_rich_text(&self) -> bool {
        true
    }

    async fn run(
        &self,
        mut stop_signal: broadcast::Receiver<()>,
        task_runner: Arc<dyn RunRequestSource>,
    ) -> Result<(), DispatchError> {
        debug!(notifier_id = %self.id, bot_token = %mask(self.bot_token.reveal()), "telegram bot poll loop starting");

        loop {
            let offset = self.poll_offset.load(Ordering::SeqCst);
            let updates = tokio::select! {
                _ = stop_signal.recv() => break,
                result = self.get_updates(offset) => result,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(notifier_id = %self.id, "getUpdates failed: {}", e);
                    tokio::select! {
                        _ = stop_signal.recv() => break,
                        _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {}
                    }
                    continue;
                }
            };

            for update in &updates {
                self.handle_update(update, &task_runner).await;
                self.poll_offset.store(update.update_id + 1, Ordering::SeqCst);
            }
        }

        debug!(notifier_id = %self.id, "telegram bot poll loop stopped");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TelegramGetUpdatesResponse {
    #[serde(default)]
    result: Vec<TelegramUpdate>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct RecordingRunner {
        runs: tokio::sync::Mutex<Vec<RunRequest>>,
        cancels: tokio::sync::Mutex<Vec<u64>>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self { runs: tokio::sync::Mutex::new(Vec::new()), cancels: tokio::sync::Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl RunRequestSource for RecordingRunner {
        async fn submit_run(&self, request: RunRequest) -> bool {
            self.runs.lock().await.push(request);
            true
        }
        async fn submit_cancel(&self, instance_id: u64) -> bool {
            self.cancels.lock().await.push(instance_id);
            true
        }
    }

    fn commands() -> Vec<BotCommand> {
        vec![BotCommand { command_name: "C".into(), kind: "T".into(), command_kind: "C".into(), title: "run it".into() }]
    }

    #[test]
    fn help_text_lists_every_registered_command() {
        let notifier = TelegramNotifier::new("tg1", "abcdefghijklmnop", "555", commands());
        let text = notifier.help_text();
        assert!(text.contains("/help"));
        assert!(text.contains("/C - run it"));
    }

    #[tokio::test]
    async fn notify_posts_send_message_to_the_configured_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken123456789/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("tg1", "token123456789", "555", commands()).with_api_base(server.uri());
        assert!(notifier.notify("hello", &TaskContext::new()).await);
    }

    #[tokio::test]
    async fn recognized_command_submits_a_run_request_with_threaded_context() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bottoken123456789/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": [{
                    "update_id": 1,
                    "message": {"message_id": 42, "chat": {"id": 555}, "text": "/C"}
                }]
            })))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new("tg1", "token123456789", "555", commands()).with_api_base(server.uri());
        let runner = Arc::new(RecordingRunner::new());
        let updates = notifier.get_updates(0).await.unwrap();
        for update in &updates {
            notifier.handle_update(update, &(runner.clone() as Arc<dyn RunRequestSource>)).await;
        }

        let runs = runner.runs.lock().await;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].kind, "T");
        assert_eq!(runs[0].context.get(CONTEXT_MESSAGE_ID), Some(&"42".to_string()));
    }

    #[tokio::test]
    async fn cancel_command_submits_a_cancel_request() {
        let server = MockServer::start().await;
        let notifier = TelegramNotifier::new("tg1", "token123456789", "555", commands()).with_api_base(server.uri());
        let runner = Arc::new(RecordingRunner::new());

        let update = TelegramUpdate {
            update_id: 1,
            message: Some(TelegramMessage { message_id: 9, chat: TelegramChat { id: 555 }, text: Some("/cancel_17".to_string()) }),
        };
        notifier.handle_update(&update, &(runner.clone() as Arc<dyn RunRequestSource>)).await;

        assert_eq!(runner.cancels.lock().await.as_slice(), [17]);
    }

    #[tokio::test]
    async fn messages_from_a_different_chat_are_ignored() {
        let server = MockServer::start().await;
        let notifier = TelegramNotifier::new("tg1", "token123456789", "555", commands()).with_api_base(server.uri());
        let runner = Arc::new(RecordingRunner::new());

        let update = TelegramUpdate {
            update_id: 1,
            message: Some(TelegramMessage { message_id: 9, chat: TelegramChat { id: 999 }, text: Some("/C".to_string()) }),
        };
        notifier.handle_update(&update, &(runner.clone() as Arc<dyn RunRequestSource>)).await;

        assert!(runner.runs.lock().await.is_empty());
    }
}
