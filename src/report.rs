//! Headless runs
//!
//! Runs the engine against a [`HeadlessStub`] for a number of frames and
//! reports where the game ended up, with the last screen as a TGA.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bitmap::{write_tga, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::game::{Game, Mode};
use crate::hashing::{report_digest, sha256_hex};
use crate::system::{FrameRecord, HeadlessStub, PlayerInput};
use crate::ENGINE_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub frames: u64,
    #[serde(default)]
    pub skip_intro: bool,
    #[serde(default)]
    pub seed: Option<u16>,
    /// Input applied once the given number of frames has been presented.
    #[serde(default)]
    pub inputs: Vec<ScriptedInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedInput {
    pub at_frame: u64,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub space: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub tab: bool,
    #[serde(default)]
    pub escape: bool,
    #[serde(default)]
    pub dir_mask: u8,
}

impl ScriptedInput {
    fn to_player_input(&self) -> PlayerInput {
        PlayerInput {
            enter: self.enter,
            space: self.space,
            shift: self.shift,
            tab: self.tab,
            escape: self.escape,
            dir_mask: self.dir_mask,
            fast_mode: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedFrame {
    pub filename: String,
    pub format: String,
    pub size: [u32; 2],
    pub data_base64: String,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub id: String,
    pub engine_version: String,
    pub started_at: DateTime<Utc>,
    pub demo: bool,
    pub frames_run: u64,
    pub game_ended: bool,
    pub scene: String,
    pub scene_number: i16,
    pub mode: Mode,
    pub music_track: i32,
    pub game_over: bool,
    pub bag: Vec<String>,
    pub objects: usize,
    pub vars_hash: String,
    pub last_frames: Vec<FrameRecord>,
    pub screen: ExportedFrame,
    pub report_hash: String,
}

/// Last presented screen as a run-length encoded TGA.
pub fn export_screen(stub: &HeadlessStub, filename: &str) -> Result<ExportedFrame, EngineError> {
    let mut tga = Vec::new();
    write_tga(&mut tga, stub.screen_rgb(), SCREEN_WIDTH, SCREEN_HEIGHT).map_err(|source| EngineError::Io {
        path: filename.to_string(),
        source,
    })?;
    Ok(ExportedFrame {
        filename: filename.to_string(),
        format: "tga".to_string(),
        size: [SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32],
        hash: sha256_hex(&tga),
        data_base64: STANDARD.encode(&tga),
    })
}

/// Starts a game from `config` and runs `request.frames` frames.
pub fn run_headless(config: EngineConfig, request: &RunRequest) -> Result<RunReport, EngineError> {
    let started_at = Utc::now();
    let id = Uuid::new_v4().to_string();
    tracing::info!(target: "bermuda::info", run = %id, frames = request.frames, "headless run");

    let mut stub = HeadlessStub::new(config.output_rate);
    for input in &request.inputs {
        stub.schedule(input.at_frame, input.to_player_input());
    }
    let mut game = Game::new(config, stub)?;
    if let Some(seed) = request.seed {
        game.set_random_seed(seed);
    }
    if !request.skip_intro {
        game.play_intro()?;
    }
    let mut frames_run = 0;
    let mut game_ended = false;
    while frames_run < request.frames {
        frames_run += 1;
        if !game.run_frame()? {
            game_ended = true;
            break;
        }
    }

    let vars: Vec<u8> = game.vars().iter().flat_map(|v| v.to_le_bytes()).collect();
    let stub = game.stub();
    let mut report = RunReport {
        id: id.clone(),
        engine_version: ENGINE_VERSION.to_string(),
        started_at,
        demo: game.is_demo(),
        frames_run,
        game_ended,
        scene: game.scene_name().to_string(),
        scene_number: game.scene_number(),
        mode: game.mode(),
        music_track: game.music_track(),
        game_over: game.is_game_over(),
        bag: game.bag_objects().map(str::to_string).collect(),
        objects: game.objects().len(),
        vars_hash: sha256_hex(&vars),
        last_frames: stub.frames().iter().rev().take(8).rev().cloned().collect(),
        screen: export_screen(stub, &format!("{}.tga", id))?,
        report_hash: String::new(),
    };
    report.report_hash = report_digest(&report)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_defaults() {
        let request: RunRequest = serde_json::from_str(r#"{"frames": 10, "inputs": [{"at_frame": 2, "enter": true}]}"#).unwrap();
        assert_eq!(request.frames, 10);
        assert!(!request.skip_intro);
        assert_eq!(request.seed, None);
        let pi = request.inputs[0].to_player_input();
        assert!(pi.enter && pi.fast_mode && !pi.tab);
    }

    #[test]
    fn test_export_blank_screen() {
        let stub = HeadlessStub::default();
        let frame = export_screen(&stub, "blank.tga").unwrap();
        assert_eq!(frame.size, [640, 480]);
        let tga = STANDARD.decode(&frame.data_base64).unwrap();
        assert_eq!(tga[2], 10);
        assert_eq!(sha256_hex(&tga), frame.hash);
        // 640 * 480 black pixels in runs of 128
        assert_eq!(tga.len(), 18 + 4 * (640 * 480 / 128));
    }
}
