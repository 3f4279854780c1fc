//! Stockfish over UCI, streaming MultiPV progress into the session.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisInfo, Score};
use crate::collaborators::{AnalysisEngine, EventSink};
use crate::config::StockfishConfig;
use crate::error::EngineError;
use crate::events::SessionEvent;

pub struct StockfishAnalyzer {
    process: Child,
    stdin: ChildStdin,
    reader: JoinHandle<()>,
    searching: bool,
}

impl StockfishAnalyzer {
    /// Spawn the engine, complete the UCI handshake and start forwarding
    /// `info` lines to `sink`.
    pub async fn spawn(config: &StockfishConfig, sink: EventSink) -> Result<Self, EngineError> {
        let mut process = Command::new(&config.path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Stockfish(format!("Failed to spawn {}: {e}", config.path)))?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Stockfish("stdin not piped".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Stockfish("stdout not piped".into()))?;
        let mut lines = BufReader::new(stdout).lines();

        send_line(&mut stdin, "uci").await?;
        wait_for(&mut lines, "uciok").await?;
        send_line(&mut stdin, &format!("setoption name Threads value {}", config.threads)).await?;
        send_line(&mut stdin, &format!("setoption name Hash value {}", config.hash_mb)).await?;
        send_line(&mut stdin, "isready").await?;
        wait_for(&mut lines, "readyok").await?;

        info!(path = %config.path, threads = config.threads, hash_mb = config.hash_mb, "Stockfish ready");
        Ok(Self {
            process,
            stdin,
            reader: tokio::spawn(forward_info(lines, sink)),
            searching: false,
        })
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        send_line(&mut self.stdin, cmd).await
    }

    /// Send quit and wait for the process to exit.
    pub async fn quit(mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
        self.reader.abort();
    }
}

#[async_trait]
impl AnalysisEngine for StockfishAnalyzer {
    async fn start(&mut self, fen: &str, candidates: usize, depth: u32) -> Result<(), EngineError> {
        if self.searching {
            self.send("stop").await?;
        }
        self.send(&format!("setoption name MultiPV value {candidates}"))
            .await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;
        self.searching = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        if !self.searching {
            return Ok(());
        }
        self.searching = false;
        self.send("stop").await
    }
}

impl Drop for StockfishAnalyzer {
    fn drop(&mut self) {
        self.reader.abort();
        let _ = self.process.start_kill();
    }
}

async fn send_line(stdin: &mut ChildStdin, cmd: &str) -> Result<(), EngineError> {
    debug!(cmd, "SF <");
    stdin
        .write_all(format!("{cmd}\n").as_bytes())
        .await
        .map_err(|e| EngineError::Stockfish(format!("Failed to write to Stockfish: {e}")))?;
    stdin
        .flush()
        .await
        .map_err(|e| EngineError::Stockfish(format!("Failed to flush stdin: {e}")))
}

async fn wait_for(lines: &mut Lines<BufReader<ChildStdout>>, expected: &str) -> Result<(), EngineError> {
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| EngineError::Stockfish(format!("Failed to read from Stockfish: {e}")))?
            .ok_or_else(|| EngineError::Stockfish(format!("Stockfish exited before '{expected}'")))?;
        let trimmed = line.trim();
        debug!(line = trimmed, "SF >");
        if trimmed == expected {
            return Ok(());
        }
    }
}

async fn forward_info(mut lines: Lines<BufReader<ChildStdout>>, sink: EventSink) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                debug!(line = trimmed, "SF >");
                if let Some(info) = parse_info(trimmed) {
                    if sink.send(SessionEvent::Analysis(info)).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => {
                warn!("Stockfish closed its output");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read from Stockfish");
                return;
            }
        }
    }
}

/// Value following `key` in a whitespace-split info line.
fn token_after<'a>(parts: &[&'a str], key: &str) -> Option<&'a str> {
    parts
        .iter()
        .position(|p| *p == key)
        .and_then(|i| parts.get(i + 1))
        .copied()
}

/// Parse `info depth D ... multipv R score cp|mate S ... pv MOVE ...`.
/// Lines missing any of these, and bound-only scores, yield `None`.
pub fn parse_info(line: &str) -> Option<AnalysisInfo> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") || parts.contains(&"lowerbound") || parts.contains(&"upperbound") {
        return None;
    }

    let depth = token_after(&parts, "depth")?.parse().ok()?;
    let rank = token_after(&parts, "multipv")?.parse().ok()?;
    let score = match token_after(&parts, "score")? {
        "cp" => Score::Cp(token_after(&parts, "cp")?.parse().ok()?),
        "mate" => Score::Mate(token_after(&parts, "mate")?.parse().ok()?),
        _ => return None,
    };
    let mv = token_after(&parts, "pv")?.to_string();

    Some(AnalysisInfo { rank, mv, score, depth })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp_line() {
        let line = "info depth 20 seldepth 25 multipv 2 score cp 35 nodes 100000 nps 1000 pv e7e5 g1f3 b8c6";
        assert_eq!(
            parse_info(line),
            Some(AnalysisInfo {
                rank: 2,
                mv: "e7e5".into(),
                score: Score::Cp(35),
                depth: 20,
            })
        );
    }

    #[test]
    fn test_parse_mate_line() {
        let line = "info depth 12 multipv 1 score mate -3 pv h7h6 d8h4";
        let info = parse_info(line).unwrap();
        assert_eq!(info.score, Score::Mate(-3));
        assert_eq!(info.mv, "h7h6");
    }

    #[test]
    fn test_incomplete_lines_dropped() {
        assert_eq!(parse_info("info depth 5 multipv 1 score cp 10"), None);
        assert_eq!(parse_info("info depth 5 score cp 10 pv e2e4"), None);
        assert_eq!(parse_info("info string NNUE evaluation enabled"), None);
        assert_eq!(parse_info("info depth 5 multipv 1 score cp 10 lowerbound pv e2e4"), None);
        assert_eq!(parse_info("info depth x multipv 1 score cp 10 pv e2e4"), None);
        assert_eq!(parse_info("bestmove e2e4 ponder e7e5"), None);
    }
}
