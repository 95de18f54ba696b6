//! Crate level error

use thiserror::Error;

use crate::avi::AviError;
use crate::config::ConfigError;
use crate::decoder::DecodeError;
use crate::fs::FsError;
use crate::game::GameError;
use crate::mixer::MixerError;
use crate::resource::ResourceError;
use crate::saveload::SaveError;
use crate::scene::ParseError;
use crate::util::ReadError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Avi(#[from] AviError),

    #[error(transparent)]
    Mixer(#[from] MixerError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Short machine readable kind, used in the CLI JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::Fs(_) => "fs",
            EngineError::Decode(_) => "decode",
            EngineError::Resource(_) => "resource",
            EngineError::Parse(_) => "parse",
            EngineError::Save(_) => "save",
            EngineError::Avi(_) => "avi",
            EngineError::Mixer(_) => "mixer",
            EngineError::Read(_) => "read",
            EngineError::Game(_) => "game",
            EngineError::Io { .. } => "io",
            EngineError::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let e: EngineError = FsError::NotFound("SCN/_01.SCN".to_string()).into();
        assert_eq!(e.kind(), "fs");
        assert!(e.to_string().contains("_01.SCN"));
    }
}
