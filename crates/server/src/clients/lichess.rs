use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use chess_core::game_data::color_name;
use chess_core::{Color, GameStatus, Winner};
use crowd_engine::collaborators::GameEventStream;
use crowd_engine::{Authority, DifficultyLevel, EngineError, FinalResult, GameEvent, MoveVerdict};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lichess Board API: the crowd plays against the Lichess AI.
pub struct LichessClient {
    client: Client,
    base_url: String,
    token: String,
}

impl LichessClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, EngineError> {
        // No overall timeout: the game stream stays open for the whole match.
        let client = Client::builder()
            .user_agent("CrowdChess/1.0")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::Authority(format!("HTTP client error: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct ChallengeResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Deserialize)]
struct GameExport {
    status: GameStatus,
    winner: Option<String>,
}

#[async_trait]
impl Authority for LichessClient {
    async fn create_match(&self, level: DifficultyLevel, side: Color) -> Result<String, EngineError> {
        let url = format!("{}/api/challenge/ai", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .form(&[
                ("level", level.value().to_string()),
                ("color", color_name::name(side).to_string()),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Authority(format!("Challenge request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Authority(format!("Challenge HTTP {}", resp.status())));
        }

        let challenge: ChallengeResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Authority(format!("Challenge body error: {e}")))?;
        Ok(challenge.id)
    }

    async fn stream_events(&self, match_id: &str) -> Result<GameEventStream, EngineError> {
        let url = format!("{}/api/board/game/stream/{}", self.base_url, match_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/x-ndjson")
            .send()
            .await
            .map_err(|e| EngineError::Authority(format!("Stream request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Authority(format!("Stream HTTP {}", resp.status())));
        }

        let events = ndjson_lines(resp.bytes_stream())
            .filter_map(|line| async move {
                match line {
                    Ok(line) => parse_game_line(&line).map(Ok),
                    Err(e) => Some(Err(EngineError::Authority(e))),
                }
            })
            .boxed();
        Ok(events)
    }

    async fn submit_move(&self, match_id: &str, mv: &str) -> Result<MoveVerdict, EngineError> {
        let url = format!("{}/api/board/game/{}/move/{}", self.base_url, match_id, mv);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| EngineError::Authority(format!("Move request error: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(MoveVerdict::Accepted);
        }
        if status == StatusCode::BAD_REQUEST {
            let reason = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "rejected".to_string());
            return Ok(MoveVerdict::Rejected(reason));
        }
        Err(EngineError::Authority(format!("Move HTTP {status}")))
    }

    async fn fetch_final_result(&self, match_id: &str) -> Result<FinalResult, EngineError> {
        let url = format!("{}/api/game/{}", self.base_url, match_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| EngineError::Authority(format!("Game request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::Authority(format!("Game HTTP {}", resp.status())));
        }

        let game: GameExport = resp
            .json()
            .await
            .map_err(|e| EngineError::Authority(format!("Game body error: {e}")))?;
        Ok(FinalResult {
            winner: Some(Winner::from_report(game.winner.as_deref(), &game.status)),
            status: game.status,
        })
    }
}

/// Split a byte stream into text lines. A chunk may end mid-line (or
/// mid-character), so bytes are buffered until a newline arrives.
fn ndjson_lines<S, B, E>(bytes: S) -> BoxStream<'static, Result<String, String>>
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    stream::unfold(
        (bytes.boxed(), Vec::<u8>::new(), false),
        |(mut bytes, mut buf, mut done)| async move {
            loop {
                if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let text = String::from_utf8_lossy(&line[..pos]).into_owned();
                    return Some((Ok(text), (bytes, buf, done)));
                }
                if done {
                    if buf.is_empty() {
                        return None;
                    }
                    let text = String::from_utf8_lossy(&buf).into_owned();
                    return Some((Ok(text), (bytes, Vec::new(), true)));
                }
                match bytes.next().await {
                    Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                    Some(Err(e)) => {
                        return Some((Err(format!("Stream read error: {e}")), (bytes, Vec::new(), true)));
                    }
                    None => done = true,
                }
            }
        },
    )
    .boxed()
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum StreamLine {
    #[serde(rename = "gameFull")]
    GameFull {
        #[serde(rename = "initialFen")]
        initial_fen: Option<String>,
        state: StateLine,
    },
    #[serde(rename = "gameState")]
    GameState(StateLine),
    #[serde(rename = "gameFinish")]
    GameFinish {
        #[serde(default)]
        game: Option<FinishedGame>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct StateLine {
    #[serde(default)]
    moves: String,
    status: GameStatus,
    #[serde(default)]
    winner: Option<String>,
}

#[derive(Deserialize)]
struct FinishedGame {
    status: Option<StatusField>,
    winner: Option<String>,
}

/// `status` is a bare name on game streams and `{id, name}` on event streams.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusField {
    Name(GameStatus),
    Object { name: GameStatus },
}

fn split_moves(moves: &str) -> Vec<String> {
    moves.split_whitespace().map(str::to_string).collect()
}

fn winner_color(winner: Option<&str>) -> Option<Color> {
    winner.and_then(color_name::parse)
}

/// Parse one NDJSON line. Blank keep-alives and unknown or unparsable lines
/// yield `None`.
fn parse_game_line(line: &str) -> Option<GameEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parsed: StreamLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!("Failed to parse Lichess stream line: {e}");
            return None;
        }
    };

    match parsed {
        StreamLine::GameFull { initial_fen, state } => Some(GameEvent::FullState {
            initial_fen: initial_fen.filter(|f| f != "startpos"),
            moves: split_moves(&state.moves),
            winner: winner_color(state.winner.as_deref()),
            status: state.status,
        }),
        StreamLine::GameState(state) => Some(GameEvent::StateUpdate {
            moves: split_moves(&state.moves),
            fen: None,
            winner: winner_color(state.winner.as_deref()),
            status: state.status,
        }),
        StreamLine::GameFinish { game } => {
            let (status, winner) = match game {
                Some(game) => (
                    match game.status {
                        Some(StatusField::Name(s)) | Some(StatusField::Object { name: s }) => s,
                        None => GameStatus::UnknownFinish,
                    },
                    winner_color(game.winner.as_deref()),
                ),
                None => (GameStatus::UnknownFinish, None),
            };
            Some(GameEvent::Finished { status, winner })
        }
        StreamLine::Other => {
            tracing::debug!("Ignoring stream line: {line}");
            None
        }
    }
}
