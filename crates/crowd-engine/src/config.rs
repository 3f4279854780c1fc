//! Session configuration from environment variables

use std::env;

use chess_core::game_data::color_name;
use chess_core::Color;
use tracing::warn;

use crate::difficulty::DifficultyLevel;
use crate::error::EngineError;
use crate::resolution::FallbackStrategy;

/// Per-match settings. `human_side` and `difficulty` only change between
/// matches, through the match lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub human_side: Color,
    pub difficulty: DifficultyLevel,
    pub turn_deadline_secs: u32,
    pub rest_period_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            human_side: Color::White,
            difficulty: DifficultyLevel::MIN,
            turn_deadline_secs: 30,
            rest_period_secs: 60,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockfishConfig {
    /// Path to Stockfish binary
    pub path: String,

    pub threads: u32,

    pub hash_mb: u32,
}

impl Default for StockfishConfig {
    fn default() -> Self {
        Self {
            path: "/usr/local/bin/stockfish".to_string(),
            threads: 1,
            hash_mb: 64,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrowdConfig {
    pub session: SessionConfig,

    /// How a turn without a usable vote picks an analysis candidate
    pub fallback: FallbackStrategy,

    pub stockfish: StockfishConfig,
}

impl CrowdConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, EngineError> {
        let defaults = SessionConfig::default();

        let human_side = match env::var("HUMAN_SIDE") {
            Ok(raw) => color_name::parse(&raw)
                .ok_or_else(|| EngineError::Config(format!("HUMAN_SIDE must be white or black, got '{raw}'")))?,
            Err(_) => defaults.human_side,
        };

        let difficulty = match env::var("DIFFICULTY_LEVEL") {
            Ok(raw) => {
                let level: u8 = raw
                    .trim()
                    .parse()
                    .map_err(|_| EngineError::Config(format!("DIFFICULTY_LEVEL is not a number: '{raw}'")))?;
                DifficultyLevel::new(level)?
            }
            Err(_) => defaults.difficulty,
        };

        let turn_deadline_secs = parse_or("TURN_DEADLINE_SECS", defaults.turn_deadline_secs);
        let rest_period_secs = parse_or("REST_PERIOD_SECS", defaults.rest_period_secs);

        let fallback = match env::var("FALLBACK_STRATEGY") {
            Ok(raw) => raw.parse()?,
            Err(_) => FallbackStrategy::default(),
        };

        let stockfish_defaults = StockfishConfig::default();
        let stockfish = StockfishConfig {
            path: env::var("STOCKFISH_PATH").unwrap_or(stockfish_defaults.path),
            threads: parse_or("STOCKFISH_THREADS", stockfish_defaults.threads),
            hash_mb: parse_or("STOCKFISH_HASH_MB", stockfish_defaults.hash_mb),
        };

        if turn_deadline_secs == 0 {
            return Err(EngineError::Config("TURN_DEADLINE_SECS must be positive".into()));
        }

        Ok(Self {
            session: SessionConfig {
                human_side,
                difficulty,
                turn_deadline_secs,
                rest_period_secs,
            },
            fallback,
            stockfish,
        })
    }
}

fn parse_or(key: &str, default: u32) -> u32 {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "Invalid number, using default");
            default
        }),
        Err(_) => default,
    }
}
