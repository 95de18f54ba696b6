//! Bermuda Syndrome engine core
//!
//! Resource decoders, scene and dialogue parsers, the object script
//! interpreter, the sound mixer, the cutscene player and save states. The
//! engine renders into 8-bit frame buffers and talks to the outside world
//! through [`system::SystemStub`], [`system::HeadlessStub`] runs it without
//! a window.

pub mod avi;
pub mod bitmap;
pub mod config;
pub mod decoder;
pub mod dialogue;
pub mod error;
pub mod fs;
pub mod game;
pub mod hashing;
pub mod logging;
pub mod mixer;
pub mod random;
pub mod report;
pub mod resource;
pub mod saveload;
pub mod scene;
pub mod system;
pub mod text;
pub mod util;

pub use config::EngineConfig;
pub use error::EngineError;
pub use game::{Game, GameError, Mode};
pub use hashing::{canonical_json, report_digest, sha256_hex};
pub use report::{run_headless, RunReport, RunRequest};
pub use system::{HeadlessStub, PlayerInput, SystemStub};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
