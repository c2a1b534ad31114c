//! Notification sinks: chat webhook (embed payload) and log-only, plus the
//! per-slot console mirror.

use std::collections::BTreeMap;
use std::time::Duration;

use sentinel_core::{
    CollabError, LineMirror, Notice, NoticeLevel, NotificationSink, ServerRecord, ServerSlot,
};
use serde_json::{Value, json};
use tokio::runtime::Handle;
use tracing::{debug, info};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
/// Chat webhooks reject longer message content.
const MESSAGE_LIMIT: usize = 2000;

fn webhook_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?)
}

/// POST `payload` on `runtime` from a blocking-pool thread.
fn post_json(
    runtime: &Handle,
    client: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<(), CollabError> {
    let response = runtime
        .block_on(client.post(url).json(payload).send())
        .map_err(|e| CollabError::failed("webhook", e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(CollabError::failed("webhook", format!("HTTP {status}")));
    }
    Ok(())
}

/// Posts notices as embeds to a chat webhook.
///
/// `notify` is called from the blocking pool; the request itself runs on
/// the runtime captured at construction.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    runtime: Handle,
}

impl WebhookNotifier {
    /// Must be called from inside the tokio runtime.
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: webhook_client()?,
            url: url.into(),
            runtime: Handle::try_current()?,
        })
    }
}

impl NotificationSink for WebhookNotifier {
    fn notify(&self, server: Option<&ServerRecord>, notice: &Notice) -> Result<(), CollabError> {
        post_json(&self.runtime, &self.client, &self.url, &embed_payload(server, notice))?;
        debug!(title = %notice.title, "webhook notification sent");
        Ok(())
    }
}

/// Writes notices to the log. Used when no webhook is configured.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, server: Option<&ServerRecord>, notice: &Notice) -> Result<(), CollabError> {
        let server = server.map(|s| s.name.as_str()).unwrap_or("-");
        info!(server, level = ?notice.level, title = %notice.title, body = %notice.body, "notice");
        Ok(())
    }
}

/// Posts each console line as a plain message to its slot's webhook.
/// Slots without a webhook are not mirrored.
pub struct WebhookLineMirror {
    client: reqwest::Client,
    urls: BTreeMap<ServerSlot, String>,
    runtime: Handle,
}

impl WebhookLineMirror {
    /// Must be called from inside the tokio runtime.
    pub fn new(urls: BTreeMap<ServerSlot, String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: webhook_client()?,
            urls,
            runtime: Handle::try_current()?,
        })
    }
}

impl LineMirror for WebhookLineMirror {
    fn mirror_line(&self, slot: ServerSlot, line: &str) -> Result<(), CollabError> {
        match self.urls.get(&slot) {
            Some(url) => post_json(&self.runtime, &self.client, url, &line_payload(line)),
            None => Ok(()),
        }
    }
}

/// Plain-message payload for one console line, cut to the content limit.
pub fn line_payload(line: &str) -> Value {
    let content: String = line.chars().take(MESSAGE_LIMIT).collect();
    json!({ "content": content })
}

/// Chat-webhook embed for one notice. Ok-level notices about a server use
/// the server's colour; everything else uses the level colour.
pub fn embed_payload(server: Option<&ServerRecord>, notice: &Notice) -> Value {
    let server_color = server
        .filter(|_| notice.level == NoticeLevel::Ok)
        .and_then(|s| parse_hex_color(&s.embed_color));
    let color = server_color
        .or_else(|| parse_hex_color(notice.level.color()))
        .unwrap_or(0);

    let mut embed = json!({
        "title": notice.title,
        "description": notice.body,
        "color": color,
    });
    if let Some(at) = notice.timestamp {
        embed["timestamp"] = json!(at.to_rfc3339());
    }
    if let Some(server) = server {
        embed["footer"] = json!({ "text": format!("{} · {}", server.name, server.game) });
    }
    json!({ "content": "", "embeds": [embed] })
}

/// `#rrggbb` (leading `#` optional) to an integer colour.
pub fn parse_hex_color(hex: &str) -> Option<u32> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
