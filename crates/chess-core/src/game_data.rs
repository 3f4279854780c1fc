use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Game status as reported by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "started")]
    Started,
    #[serde(rename = "aborted")]
    Aborted,
    #[serde(rename = "mate")]
    Mate,
    #[serde(rename = "resign")]
    Resign,
    #[serde(rename = "stalemate")]
    Stalemate,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "draw")]
    Draw,
    #[serde(rename = "outoftime")]
    OutOfTime,
    #[serde(rename = "noStart")]
    NoStart,
    #[serde(rename = "variantEnd")]
    VariantEnd,
    #[serde(other, rename = "unknownFinish")]
    UnknownFinish,
}

impl GameStatus {
    /// Anything past `created`/`started` ends the game.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::Created | GameStatus::Started)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Created => "created",
            GameStatus::Started => "started",
            GameStatus::Aborted => "aborted",
            GameStatus::Mate => "mate",
            GameStatus::Resign => "resign",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Timeout => "timeout",
            GameStatus::Draw => "draw",
            GameStatus::OutOfTime => "outoftime",
            GameStatus::NoStart => "noStart",
            GameStatus::VariantEnd => "variantEnd",
            GameStatus::UnknownFinish => "unknownFinish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    White,
    Black,
    Draw,
    None,
}

impl Winner {
    pub fn from_color(color: Color) -> Self {
        match color {
            Color::White => Winner::White,
            Color::Black => Winner::Black,
        }
    }

    /// Parse the authority's `winner` field ("white"/"black"). A finished game
    /// without a winner is a draw unless it never really happened.
    pub fn from_report(winner: Option<&str>, status: &GameStatus) -> Self {
        match winner {
            Some("white") => Winner::White,
            Some("black") => Winner::Black,
            _ => match status {
                GameStatus::Created
                | GameStatus::Started
                | GameStatus::Aborted
                | GameStatus::NoStart
                | GameStatus::UnknownFinish => Winner::None,
                _ => Winner::Draw,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub winner: Winner,
    pub reason: String,
}

/// Canonical per-match state. Mutated only by the game sync, frozen once
/// `terminated` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    #[serde(with = "color_name")]
    pub side_to_move: Color,
    pub move_history: Vec<String>,
    pub terminated: bool,
    pub outcome: Option<Outcome>,
}

impl MatchState {
    pub fn new(match_id: &str) -> Self {
        Self {
            match_id: match_id.to_string(),
            side_to_move: Color::White,
            move_history: Vec::new(),
            terminated: false,
            outcome: None,
        }
    }
}

/// Serialize a shakmaty `Color` as `"white"`/`"black"`.
pub mod color_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use shakmaty::Color;

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(name(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid color '{raw}'")))
    }

    pub fn name(color: Color) -> &'static str {
        match color {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    pub fn parse(raw: &str) -> Option<Color> {
        match raw.trim().to_lowercase().as_str() {
            "white" | "w" => Some(Color::White),
            "black" | "b" => Some(Color::Black),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let s: GameStatus = serde_json::from_str("\"started\"").unwrap();
        assert!(!s.is_terminal());
        let s: GameStatus = serde_json::from_str("\"outoftime\"").unwrap();
        assert_eq!(s, GameStatus::OutOfTime);
        assert!(s.is_terminal());
        let s: GameStatus = serde_json::from_str("\"somethingNew\"").unwrap();
        assert_eq!(s, GameStatus::UnknownFinish);
    }

    #[test]
    fn test_winner_from_report() {
        assert_eq!(Winner::from_report(Some("white"), &GameStatus::Mate), Winner::White);
        assert_eq!(Winner::from_report(None, &GameStatus::Stalemate), Winner::Draw);
        assert_eq!(Winner::from_report(None, &GameStatus::Aborted), Winner::None);
    }

    #[test]
    fn test_match_state_serializes_color_name() {
        let state = MatchState::new("abc");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["side_to_move"], "white");
    }
}
