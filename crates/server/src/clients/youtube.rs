use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crowd_engine::{ChatSource, EngineError, EventSink, SessionEvent};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::YoutubeConfig;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const DEFAULT_POLL: Duration = Duration::from_secs(20);
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(30);

/// YouTube live chat poller. Polls only while open.
pub struct YoutubeChat {
    client: Client,
    api_key: String,
    video_id: String,
    base_url: String,
    sink: EventSink,
    /// Resolved by the first poller that gets it, then reused.
    live_chat_id: Arc<OnceCell<String>>,
    poller: Option<JoinHandle<()>>,
}

#[derive(Deserialize)]
struct VideoList {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    active_live_chat_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPage {
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
    #[serde(default)]
    items: Vec<ChatItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatItem {
    snippet: Option<Snippet>,
    author_details: Option<AuthorDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    display_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    channel_id: String,
}

impl YoutubeChat {
    pub fn new(config: &YoutubeConfig, sink: EventSink) -> Result<Self, EngineError> {
        let client = Client::builder()
            .user_agent("CrowdChess/1.0")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Chat(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            video_id: config.live_video_id.clone(),
            base_url: API_BASE.to_string(),
            sink,
            live_chat_id: Arc::new(OnceCell::new()),
            poller: None,
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_finished())
    }
}

#[async_trait]
impl ChatSource for YoutubeChat {
    /// Starts the poller without waiting on the network; the live chat id is
    /// looked up inside the poller on first use.
    async fn open(&mut self) -> Result<(), EngineError> {
        if self.is_polling() {
            return Ok(());
        }

        let poller = ChatPoller {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            video_id: self.video_id.clone(),
            live_chat_id: self.live_chat_id.clone(),
            sink: self.sink.clone(),
        };
        self.poller = Some(tokio::spawn(poller.run()));
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

impl Drop for YoutubeChat {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

enum PollError {
    RateLimited,
    Other(String),
}

struct ChatPoller {
    client: Client,
    base_url: String,
    api_key: String,
    video_id: String,
    live_chat_id: Arc<OnceCell<String>>,
    sink: EventSink,
}

impl ChatPoller {
    async fn resolve_live_chat_id(&self) -> Result<String, EngineError> {
        let url = format!("{}/videos", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", self.video_id.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Chat(format!("Video request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Chat(format!("Video HTTP {}", resp.status())));
        }

        let videos: VideoList = resp
            .json()
            .await
            .map_err(|e| EngineError::Chat(format!("Video body error: {e}")))?;
        videos
            .items
            .into_iter()
            .find_map(|v| v.live_streaming_details.and_then(|d| d.active_live_chat_id))
            .ok_or_else(|| EngineError::Chat(format!("Video {} has no active live chat", self.video_id)))
    }

    async fn fetch(&self, live_chat_id: &str, page_token: Option<&str>) -> Result<ChatPage, PollError> {
        let url = format!("{}/liveChat/messages", self.base_url);
        let mut req = self.client.get(&url).query(&[
            ("liveChatId", live_chat_id),
            ("part", "id,snippet,authorDetails"),
            ("key", self.api_key.as_str()),
        ]);
        req = match page_token {
            Some(token) => req.query(&[("pageToken", token)]),
            None => req.query(&[("maxResults", "200")]),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| PollError::Other(format!("Chat request error: {e}")))?;

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("sent too soon") {
                return Err(PollError::RateLimited);
            }
            return Err(PollError::Other(format!("Chat HTTP {status}")));
        }
        if !status.is_success() {
            return Err(PollError::Other(format!("Chat HTTP {status}")));
        }

        resp.json()
            .await
            .map_err(|e| PollError::Other(format!("Chat body error: {e}")))
    }

    async fn run(self) {
        let resolved = self
            .live_chat_id
            .get_or_try_init(|| async {
                let id = self.resolve_live_chat_id().await?;
                info!(live_chat_id = %id, "Resolved YouTube live chat");
                Ok::<_, EngineError>(id)
            })
            .await;
        let live_chat_id = match resolved {
            Ok(id) => id.clone(),
            Err(e) => {
                warn!(error = %e, "Could not resolve live chat, votes disabled this turn");
                return;
            }
        };

        // Prime the page token: messages sent before the turn opened are skipped.
        let mut page_token = match self.fetch(&live_chat_id, None).await {
            Ok(page) => page.next_page_token,
            Err(PollError::RateLimited) => None,
            Err(PollError::Other(e)) => {
                warn!(error = %e, "Could not prime chat, votes disabled this turn");
                return;
            }
        };
        let mut wait = DEFAULT_POLL;

        loop {
            tokio::time::sleep(wait).await;
            match self.fetch(&live_chat_id, page_token.as_deref()).await {
                Ok(page) => {
                    for event in page_events(&page) {
                        if self.sink.send(event).is_err() {
                            return;
                        }
                    }
                    if page.next_page_token.is_some() {
                        page_token = page.next_page_token;
                    }
                    wait = page
                        .polling_interval_millis
                        .map(Duration::from_millis)
                        .unwrap_or(DEFAULT_POLL);
                }
                Err(PollError::RateLimited) => {
                    warn!("YouTube chat polled too soon, backing off");
                    wait = RATE_LIMIT_BACKOFF;
                }
                Err(PollError::Other(e)) => {
                    warn!(error = %e, "Chat poll failed");
                    wait = DEFAULT_POLL;
                }
            }
        }
    }
}

/// One `Chat` event per message with an author and text.
fn page_events(page: &ChatPage) -> Vec<SessionEvent> {
    page.items
        .iter()
        .filter_map(|item| {
            let author = item.author_details.as_ref()?.channel_id.clone();
            let text = item.snippet.as_ref()?.display_message.clone()?;
            Some(SessionEvent::Chat { author, text })
        })
        .collect()
}
