use std::env;

use crowd_engine::{CrowdConfig, EngineError};

#[derive(Clone, Debug)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub live_video_id: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub lichess_token: String,
    pub lichess_base_url: String,
    /// Without it no votes are collected and every turn resolves from analysis.
    pub youtube: Option<YoutubeConfig>,
    pub host: String,
    pub port: u16,
    pub crowd: CrowdConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        let lichess_token = env::var("LICHESS_TOKEN")
            .map_err(|_| EngineError::Config("LICHESS_TOKEN must be set".into()))?;

        let youtube = match (env::var("YOUTUBE_API_KEY"), env::var("YOUTUBE_LIVE_VIDEO_ID")) {
            (Ok(api_key), Ok(live_video_id)) if !api_key.is_empty() && !live_video_id.is_empty() => {
                Some(YoutubeConfig { api_key, live_video_id })
            }
            _ => None,
        };

        Ok(Self {
            lichess_token,
            lichess_base_url: env::var("LICHESS_BASE_URL")
                .unwrap_or_else(|_| "https://lichess.org".to_string()),
            youtube,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            crowd: CrowdConfig::from_env()?,
        })
    }
}
