pub mod lichess;
pub mod youtube;

pub use lichess::LichessClient;
pub use youtube::YoutubeChat;
