//! Game engine
//!
//! `Game` owns the scene tables and runs one frame at a time against a
//! [`SystemStub`]. A frame is either a game frame (scene switch, input,
//! object scripts, rendering), a bag menu frame or a dialogue frame.

pub mod state;

mod bag;
mod conversation;
#[cfg(test)]
mod fixture;
mod loader;
mod logic;
mod opcodes;
mod render;

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::avi::{self, AviError};
use crate::bitmap::SceneBitmap;
use crate::config::EngineConfig;
use crate::decoder::DecodeError;
use crate::fs::{DataFs, FsError};
use crate::mixer::{Mixer, DEFAULT_SOUND_ID};
use crate::random::RandomGenerator;
use crate::resource::{self, load_wgp, CommonSprites, KeyboardReplay, ResourceError, SpriteFrame};
use crate::saveload::{SaveError, SaveState, SavedMusic};
use crate::scene::ParseError;
use crate::system::{SystemStub, DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP};
use crate::util::{string_ends_with_ignore_case, ReadError};

use conversation::{Conversation, DialogueRequest};
use opcodes::ObjectScript;
use state::{
    BagObject, BoxTable, NextScene, SceneAnimation, SceneObject, SceneObjectMotion, SceneObjectStatus,
    LEFT_MOUSE_BUTTON, NUM_BOXES, NUM_SCENE_OBJECTS, NUM_SCENE_OBJECT_STATUS, NUM_VARS, RIGHT_MOUSE_BUTTON,
};

/// Delay between two game frames, in milliseconds.
pub const CYCLE_DELAY: u32 = 50;

const GAME_OVER_MUSIC: &str = "..\\midi\\gameover.mid";

#[derive(Debug, Error)]
pub enum GameError {
    #[error("Unable to find startup scene file")]
    StartupSceneNotFound,

    #[error("Scene has no objects")]
    EmptyScene,

    #[error("Invalid condition {0}")]
    InvalidCondition(i16),

    #[error("Invalid operator {0}")]
    InvalidOperator(i16),

    #[error("Invalid expression operator {0}")]
    InvalidEvalOp(i16),

    #[error("Script truncated at offset {0}")]
    ScriptTruncated(usize),

    #[error("Invalid script string at offset {0}")]
    ScriptString(usize),

    #[error("Statement at offset {offset} ends at {end}")]
    StatementEnd { offset: usize, end: usize },

    #[error("Division by zero in script at offset {0}")]
    DivisionByZero(usize),

    #[error("Index {index} out of range for {table}")]
    Index { table: &'static str, index: i32 },

    #[error("Table {0} is full")]
    TableFull(&'static str),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Avi(#[from] AviError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

fn index_error(table: &'static str, index: impl Into<i64>) -> GameError {
    let index: i64 = index.into();
    GameError::Index { table, index: index.clamp(i32::MIN as i64, i32::MAX as i64) as i32 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Game,
    Bag,
    Dialogue,
}

pub struct Game<S: SystemStub> {
    pub(crate) stub: S,
    pub(crate) fs: DataFs,
    pub(crate) config: EngineConfig,
    pub(crate) mixer: Mixer,
    pub(crate) rnd: RandomGenerator,
    pub(crate) is_demo: bool,
    pub(crate) startup_scene: &'static str,
    pub(crate) mode: Mode,

    pub(crate) sprites: CommonSprites,
    pub(crate) bag_background: SceneBitmap,
    /// Raw `bermuda.ovr`, the game over banner.
    pub(crate) game_over_image: Option<Vec<u8>>,

    pub(crate) palette: Vec<u8>,
    /// Scene background, restored into `frame` after each presented frame.
    pub(crate) background: SceneBitmap,
    pub(crate) frame: SceneBitmap,

    pub(crate) default_vars: [i16; NUM_VARS],
    pub(crate) vars: [i16; NUM_VARS],
    pub(crate) objects: Vec<SceneObject>,
    pub(crate) objects_count: usize,
    pub(crate) animations: Vec<SceneAnimation>,
    pub(crate) motions: Vec<SceneObjectMotion>,
    pub(crate) frames: Vec<SpriteFrame>,
    pub(crate) sounds: Vec<String>,
    pub(crate) boxes: BoxTable,
    pub(crate) boxes_count: [usize; NUM_BOXES],
    pub(crate) bag: Vec<BagObject>,
    pub(crate) next_scenes: Vec<NextScene>,
    pub(crate) statuses: Vec<SceneObjectStatus>,

    pub(crate) load_data_state: u8,
    pub(crate) switch_scene: bool,
    pub(crate) load_state: bool,
    pub(crate) start_dialogue: bool,
    pub(crate) game_over: bool,
    pub(crate) workaround_raft: bool,
    /// Scene, movie or save file to switch to.
    pub(crate) next_scene_file: String,
    pub(crate) current_scene_scn: String,
    pub(crate) current_scene_wgp: String,
    pub(crate) scene_number: i16,

    pub(crate) music_name: String,
    pub(crate) music_track: i32,
    pub(crate) music_file: Option<PathBuf>,

    pub(crate) bag_pos_x: i16,
    pub(crate) bag_pos_y: i16,
    pub(crate) current_bag_action: i16,
    pub(crate) previous_bag_action: i16,
    pub(crate) current_bag_object: i16,
    pub(crate) previous_bag_object: i16,
    pub(crate) life_bar_displayed: bool,
    pub(crate) life_bar_current_frame: usize,
    pub(crate) bag_object_area_blink_counter: usize,
    pub(crate) bag_weapon_area_blink_counter: usize,

    pub(crate) keys_pressed: [u8; 128],
    pub(crate) mouse_buttons_pressed: u8,
    pub(crate) keyboard_replay: Option<KeyboardReplay>,

    pub(crate) mixer_sound_id: i32,
    pub(crate) current_playing_sound_priority: i16,

    pub(crate) last_dialogue_ended_id: i32,
    pub(crate) dialogue_ended_flag: i32,
    pub(crate) dialogue_request: DialogueRequest,
    pub(crate) conversation: Option<Conversation>,

    pub(crate) script: ObjectScript,
    pub(crate) state_slot: u32,
    pub(crate) last_frame_time_stamp: u32,
    pub(crate) frames_run: u64,
}

impl<S: SystemStub> Game<S> {
    /// Indexes the data directory, detects the game version and loads the
    /// interface sprites.
    pub fn new(config: EngineConfig, stub: S) -> Result<Self, GameError> {
        let mut game = Self::with_empty_tables(config, stub);
        game.detect_version()?;
        game.load_common_sprites()?;
        game.stub.start_audio(game.mixer.clone());
        game.restart();
        Ok(game)
    }

    pub(crate) fn with_empty_tables(config: EngineConfig, stub: S) -> Self {
        let fs = DataFs::new(&config.data_path);
        let mixer = Mixer::new(stub.output_sample_rate());
        mixer.set_sound_volume(config.sound_volume);
        Self {
            stub,
            fs,
            config,
            mixer,
            rnd: RandomGenerator::from_clock(),
            is_demo: false,
            startup_scene: "",
            mode: Mode::Game,
            sprites: CommonSprites::default(),
            bag_background: SceneBitmap::new(1, 1),
            game_over_image: None,
            palette: vec![0; 256 * 4],
            background: SceneBitmap::screen(),
            frame: SceneBitmap::screen(),
            default_vars: [0; NUM_VARS],
            vars: [0; NUM_VARS],
            objects: vec![SceneObject::default(); NUM_SCENE_OBJECTS],
            objects_count: 0,
            animations: Vec::new(),
            motions: Vec::new(),
            frames: Vec::new(),
            sounds: Vec::new(),
            boxes: Default::default(),
            boxes_count: [0; NUM_BOXES],
            bag: Vec::new(),
            next_scenes: Vec::new(),
            statuses: vec![SceneObjectStatus::default(); NUM_SCENE_OBJECT_STATUS],
            load_data_state: 0,
            switch_scene: false,
            load_state: false,
            start_dialogue: false,
            game_over: false,
            workaround_raft: false,
            next_scene_file: String::new(),
            current_scene_scn: String::new(),
            current_scene_wgp: String::new(),
            scene_number: 0,
            music_name: String::new(),
            music_track: 0,
            music_file: None,
            bag_pos_x: 0,
            bag_pos_y: 0,
            current_bag_action: 0,
            previous_bag_action: 0,
            current_bag_object: -1,
            previous_bag_object: -1,
            life_bar_displayed: false,
            life_bar_current_frame: 0,
            bag_object_area_blink_counter: 0,
            bag_weapon_area_blink_counter: 0,
            keys_pressed: [0; 128],
            mouse_buttons_pressed: 0,
            keyboard_replay: None,
            mixer_sound_id: DEFAULT_SOUND_ID,
            current_playing_sound_priority: 0,
            last_dialogue_ended_id: 0,
            dialogue_ended_flag: 0,
            dialogue_request: DialogueRequest::default(),
            conversation: None,
            script: ObjectScript::default(),
            state_slot: 1,
            last_frame_time_stamp: 0,
            frames_run: 0,
        }
    }

    fn detect_version(&mut self) -> Result<(), GameError> {
        self.startup_scene = ["-01.SCN", "_01.SCN"]
            .into_iter()
            .find(|name| self.fs.exists(name))
            .ok_or(GameError::StartupSceneNotFound)?;
        self.is_demo = self.config.demo.unwrap_or_else(|| self.fs.exists("-00.SCN"));
        tracing::info!(
            target: "bermuda::info",
            startup = self.startup_scene,
            demo = self.is_demo,
            files = self.fs.len(),
            "game data detected"
        );
        Ok(())
    }

    fn load_common_sprites(&mut self) -> Result<(), GameError> {
        if !self.is_demo {
            self.game_over_image = Some(self.fs.read("..\\bermuda.ovr")?);
        }
        self.bag_background = load_wgp(&self.fs.read("..\\bermuda.wgp")?)?.bitmap;
        let data = self.fs.read("..\\bermuda.spr")?;
        self.sprites = resource::load_common_sprites(&data, self.is_demo)?;
        Ok(())
    }

    /// Back to the startup scene with fresh tables.
    pub fn restart(&mut self) {
        self.mixer.stop_all();
        self.mixer_sound_id = DEFAULT_SOUND_ID;
        self.music_file = None;
        self.life_bar_current_frame = 0;
        self.bag_object_area_blink_counter = 0;
        self.bag_weapon_area_blink_counter = 0;
        self.last_dialogue_ended_id = 0;
        self.dialogue_ended_flag = 0;
        self.default_vars = [0; NUM_VARS];
        self.vars = [0; NUM_VARS];
        self.dialogue_request = DialogueRequest::default();
        self.conversation = None;
        self.mode = Mode::Game;
        self.switch_scene = true;
        self.start_dialogue = false;
        self.load_state = false;
        self.game_over = false;
        self.load_data_state = 0;
        self.current_bag_action = 0;
        self.previous_bag_action = 0;
        self.current_bag_object = -1;
        self.previous_bag_object = -1;
        self.current_playing_sound_priority = 0;
        self.life_bar_displayed = false;
        self.keys_pressed = [0; 128];
        self.keyboard_replay = None;
        self.music_track = 0;
        self.music_name.clear();
        self.scene_number = 0;
        self.current_scene_wgp.clear();
        self.current_scene_scn.clear();
        self.bag_pos_x = 585;
        self.bag_pos_y = 23;
        self.objects_count = 0;
        self.objects.iter_mut().for_each(|o| *o = SceneObject::default());
        self.animations.clear();
        self.motions.clear();
        self.frames.clear();
        self.sounds.clear();
        self.boxes = Default::default();
        self.boxes_count = [0; NUM_BOXES];
        self.bag.clear();
        self.next_scenes.clear();
        self.statuses.iter_mut().for_each(|s| *s = SceneObjectStatus::default());
        self.next_scene_file = self.startup_scene.to_string();
        tracing::debug!(target: "bermuda::game", scene = self.startup_scene, "restart");
    }

    /// Parses and applies a scene file outside of the main loop.
    pub fn load_scene(&mut self, name: &str) -> Result<(), GameError> {
        self.current_scene_scn = name.to_string();
        self.parse_scene(name)?;
        if self.load_data_state != 0 {
            self.stub.set_palette(&self.palette, 256);
        }
        Ok(())
    }

    /// Title screens or intro videos.
    pub fn play_intro(&mut self) -> Result<(), GameError> {
        if self.is_demo {
            self.play_bitmap_sequence_demo()?;
        } else {
            self.play_video("DATA/LOGO.AVI")?;
            self.play_video("DATA/INTRO.AVI")?;
        }
        self.last_frame_time_stamp = self.stub.time_stamp();
        Ok(())
    }

    fn play_bitmap_sequence_demo(&mut self) -> Result<(), GameError> {
        for name in ["..\\title.bmp", "..\\title1.bmp", "..\\title2.bmp"] {
            let Some(data) = self.fs.read_optional(name)? else {
                tracing::warn!(target: "bermuda::game", name, "missing title bitmap");
                continue;
            };
            let bg = load_wgp(&data)?;
            self.stub.set_palette(&bg.palette, 256);
            let (w, h) = (bg.bitmap.width() as i32, bg.bitmap.height() as i32);
            self.stub.copy_rect(0, 0, w, h, &bg.bitmap.bits, bg.bitmap.pitch as usize, false);
            self.stub.update_screen();
            loop {
                self.stub.sleep(10);
                self.stub.process_events();
                if self.stub.quit_requested() {
                    return Ok(());
                }
                if self.stub.input().enter {
                    self.stub.input_mut().enter = false;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Runs the intro then frames until the stub requests quit or the game
    /// ends. Returns the number of frames run.
    pub fn run(&mut self) -> Result<u64, GameError> {
        self.play_intro()?;
        while !self.stub.quit_requested() {
            if !self.run_frame()? {
                break;
            }
        }
        self.clear_scene_data(-1)?;
        self.stop_music();
        self.stub.stop_audio();
        tracing::info!(target: "bermuda::info", frames = self.frames_run, "main loop done");
        Ok(self.frames_run)
    }

    /// One iteration of the main loop. `false` once the game has ended.
    pub fn run_frame(&mut self) -> Result<bool, GameError> {
        self.frames_run += 1;
        match self.mode {
            Mode::Game => self.game_frame(),
            Mode::Bag => {
                self.handle_bag_menu()?;
                self.end_frame();
                Ok(true)
            }
            Mode::Dialogue => {
                self.handle_dialogue()?;
                if self.mode == Mode::Game {
                    self.fini_dialogue()?;
                }
                self.end_frame();
                Ok(true)
            }
        }
    }

    fn game_frame(&mut self) -> Result<bool, GameError> {
        if self.switch_scene {
            self.switch_scene = false;
            let name = self.next_scene_file.clone();
            if string_ends_with_ignore_case(&name, "SCN") {
                self.win16_snd_play_sound(6, None)?;
                tracing::debug!(target: "bermuda::game", scene = %name, "switch to scene");
                if name == "PIC4.SCN" {
                    tracing::info!(target: "bermuda::info", "end of game");
                    return Ok(false);
                }
                self.current_scene_scn = name.clone();
                self.parse_scene(&name)?;
            } else if string_ends_with_ignore_case(&name, "SAV") {
                if self.is_demo && name == "A16.SAV" {
                    tracing::debug!(target: "bermuda::game", "end of demo interactive part");
                    self.restart();
                    return Ok(true);
                }
                tracing::warn!(target: "bermuda::game", name = %name, "ignoring savestate load");
                self.load_keyboard_replay(&name)?;
            } else {
                tracing::debug!(target: "bermuda::game", name = %name, "load mov");
                self.load_mov(&name)?;
            }
            if self.load_state {
                self.load_state = false;
                self.load_game_state(self.state_slot, false)?;
                let music = self.music_name.clone();
                self.play_music(&music);
                self.keys_pressed = [0; 128];
            }
            if self.objects_count == 0 {
                return Err(GameError::EmptyScene);
            }
            if self.current_bag_object == -1 {
                self.current_bag_object = self.bag.len() as i16 - 1;
                if self.current_bag_object > 0 {
                    self.current_bag_object = 0;
                }
            }
            if self.load_data_state != 0 {
                self.stub.set_palette(&self.palette, 256);
            }
            self.game_over = false;
            self.workaround_raft = self.current_scene_scn.starts_with("FLY");
        }
        self.update_keys_pressed_table()?;
        self.update_mouse_buttons_pressed();
        self.run_objects_script()?;
        if !self.switch_scene {
            self.end_frame();
        }
        if self.start_dialogue {
            self.start_dialogue = false;
            self.init_dialogue()?;
        }
        Ok(true)
    }

    /// Presents the screen and waits for the next cycle.
    fn end_frame(&mut self) {
        self.stub.update_screen();
        let end = self.last_frame_time_stamp.wrapping_add(CYCLE_DELAY);
        loop {
            self.stub.sleep(10);
            self.stub.process_events();
            if self.stub.input().fast_mode || self.stub.time_stamp() >= end || self.stub.quit_requested() {
                break;
            }
        }
        self.last_frame_time_stamp = self.stub.time_stamp();
    }

    fn update_keys_pressed_table(&mut self) -> Result<(), GameError> {
        let pi = self.stub.input().clone();
        self.keys_pressed[13] = pi.enter as u8;
        self.keys_pressed[16] = pi.shift as u8;
        self.keys_pressed[32] = pi.space as u8;
        self.keys_pressed[37] = (pi.dir_mask & DIR_LEFT != 0) as u8;
        self.keys_pressed[38] = (pi.dir_mask & DIR_UP != 0) as u8;
        self.keys_pressed[39] = (pi.dir_mask & DIR_RIGHT != 0) as u8;
        self.keys_pressed[40] = (pi.dir_mask & DIR_DOWN != 0) as u8;
        if let Some(record) = self.keyboard_replay.as_mut().and_then(|r| r.next_record()) {
            self.keys_pressed = *record;
        }
        if pi.tab {
            self.stub.input_mut().tab = false;
            self.mode = Mode::Bag;
        }
        if pi.ctrl {
            self.stub.input_mut().ctrl = false;
            self.life_bar_displayed = !self.life_bar_displayed;
        }
        if pi.state_slot != 0 {
            let slot = self.state_slot as i32 + pi.state_slot;
            if (1..=999).contains(&slot) {
                self.state_slot = slot as u32;
                tracing::info!(target: "bermuda::info", slot, "current game state slot");
            }
            self.stub.input_mut().state_slot = 0;
        }
        if pi.load {
            self.stub.input_mut().load = false;
            self.load_game_state(self.state_slot, true)?;
            self.load_state = self.switch_scene;
        }
        if pi.save {
            self.stub.input_mut().save = false;
            self.save_game_state(self.state_slot)?;
        }
        if self.game_over && self.stub.input().enter {
            self.stub.input_mut().enter = false;
            self.restart();
        }
        Ok(())
    }

    fn update_mouse_buttons_pressed(&mut self) {
        self.mouse_buttons_pressed = 0;
        let pi = self.stub.input_mut();
        if pi.left_mouse_button {
            pi.left_mouse_button = false;
            self.mouse_buttons_pressed |= LEFT_MOUSE_BUTTON;
        }
        if pi.right_mouse_button {
            pi.right_mouse_button = false;
            self.mouse_buttons_pressed |= RIGHT_MOUSE_BUTTON;
        }
    }

    /// Replays the key tables recorded next to a `.SAV` file, if any.
    fn load_keyboard_replay(&mut self, sav_name: &str) -> Result<(), GameError> {
        let name = format!("{}KBR", &sav_name[..sav_name.len() - 3]);
        self.keyboard_replay = match self.fs.read_optional(&name)? {
            Some(data) => {
                let replay = resource::load_kbr(&data);
                tracing::debug!(target: "bermuda::resource", name = %name, records = replay.records.len(), "keyboard replay loaded");
                Some(replay)
            }
            None => {
                tracing::warn!(target: "bermuda::resource", name = %name, "unable to open keyboard replay");
                None
            }
        };
        Ok(())
    }

    /// Windows `sndPlaySound` flavours used by the scripts: 22 polls the
    /// current sound, 3 starts one, 6 and 7 stop it. Returns `true` when no
    /// sound is playing for op 22.
    pub(crate) fn win16_snd_play_sound(&mut self, op: i32, file: Option<&str>) -> Result<bool, GameError> {
        tracing::debug!(target: "bermuda::game", op, file, "sndPlaySound");
        match op {
            22 => return Ok(!self.mixer.is_sound_playing(self.mixer_sound_id)),
            3 => {
                let Some(file) = file else {
                    return Ok(true);
                };
                let Some(data) = self.fs.read_optional(file)? else {
                    tracing::warn!(target: "bermuda::game", file, "unable to open sound file");
                    return Ok(true);
                };
                match self.mixer.play_sound(&data) {
                    Ok(id) => self.mixer_sound_id = id,
                    Err(e) => tracing::warn!(target: "bermuda::mixer", file, error = %e, "unable to play sound"),
                }
            }
            6 | 7 => self.mixer.stop_sound(self.mixer_sound_id),
            _ => tracing::warn!(target: "bermuda::game", op, "unhandled sndPlaySound operation"),
        }
        Ok(true)
    }

    /// Maps a MIDI file name to its digital track. Music decoding is left
    /// to the frontend, the engine records the track file.
    pub(crate) fn play_music(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.stop_music();
        let file = name.rsplit(['\\', '/']).next().unwrap_or(name);
        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        let Some(track) = music_track_number(stem) else {
            tracing::warn!(target: "bermuda::game", name, "no music track");
            return;
        };
        let path = self.config.music_path.join(format!("track{:02}.ogg", track));
        tracing::debug!(target: "bermuda::game", name, track, path = %path.display(), "play music");
        self.music_file = Some(path);
    }

    pub(crate) fn stop_music(&mut self) {
        self.music_file = None;
    }

    /// Plays a cutscene, skipped when the file is not part of the data.
    pub fn play_video(&mut self, name: &str) -> Result<Option<avi::PlaybackReport>, GameError> {
        let Some(path) = self.fs.find_file_path(name).map(|p| p.to_path_buf()) else {
            tracing::warn!(target: "bermuda::game", name, "video not found");
            return Ok(None);
        };
        let data = std::fs::read(&path).map_err(|source| GameError::Io { path: path.display().to_string(), source })?;
        self.stub.fill_rect(0, 0, crate::bitmap::SCREEN_WIDTH as i32, crate::bitmap::SCREEN_HEIGHT as i32, 0);
        self.stub.update_screen();
        self.mixer.stop_all();
        let report = avi::play(&data, &mut self.stub, &self.mixer)?;
        tracing::debug!(target: "bermuda::game", name, frames = report.frames_played, "video played");
        Ok(Some(report))
    }

    pub(crate) fn save_game_state(&mut self, slot: u32) -> Result<(), GameError> {
        let state = self.snapshot();
        let path = self.config.save_file(slot);
        let data = state.write()?;
        std::fs::write(&path, data).map_err(|source| GameError::Io { path: path.display().to_string(), source })?;
        tracing::info!(target: "bermuda::info", slot, path = %path.display(), "game state saved");
        Ok(())
    }

    /// Current tables as a save state.
    pub fn snapshot(&self) -> SaveState {
        SaveState {
            default_vars: self.default_vars.to_vec(),
            scene_name: self.current_scene_scn.clone(),
            objects: self.objects[..self.objects_count].to_vec(),
            boxes_count: self.boxes_count.iter().map(|&c| c as i16).collect(),
            boxes: self.boxes.to_vec(),
            vars: self.vars.to_vec(),
            statuses: self.statuses.clone(),
            bag_pos_x: self.bag_pos_x,
            bag_pos_y: self.bag_pos_y,
            current_bag_object: self.current_bag_object,
            bag: self.bag.clone(),
            current_bag_action: self.current_bag_action,
            music: Some(SavedMusic { track: self.music_track as u32, name: self.music_name.clone() }),
        }
    }

    /// Restores a slot. With `switch_scene` only the default vars and the
    /// scene name are applied, the rest is restored once the scene has been
    /// switched to.
    pub(crate) fn load_game_state(&mut self, slot: u32, switch_scene: bool) -> Result<(), GameError> {
        self.stop_music();
        let path = self.config.save_file(slot);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(target: "bermuda::game", path = %path.display(), error = %e, "unable to load game state");
                return Ok(());
            }
        };
        let header = SaveState::read_header(&data)?;
        for (dst, &v) in self.vars.iter_mut().zip(&header.default_vars) {
            *dst = v;
        }
        self.next_scene_file = header.scene_name;
        if switch_scene {
            self.switch_scene = true;
            return Ok(());
        }
        let state = SaveState::read(&data, true)?;
        self.objects_count = state.objects.len();
        for (dst, src) in self.objects.iter_mut().zip(state.objects) {
            *dst = src;
        }
        for (dst, &n) in self.boxes_count.iter_mut().zip(&state.boxes_count) {
            *dst = (n.max(0) as usize).min(state::BOXES_PER_GROUP);
        }
        for (dst, src) in self.boxes.iter_mut().zip(&state.boxes) {
            *dst = *src;
        }
        for (dst, &v) in self.vars.iter_mut().zip(&state.vars) {
            *dst = v;
        }
        self.statuses.iter_mut().for_each(|s| *s = SceneObjectStatus::default());
        for (dst, src) in self.statuses.iter_mut().zip(&state.statuses) {
            *dst = *src;
        }
        self.bag_pos_x = state.bag_pos_x;
        self.bag_pos_y = state.bag_pos_y;
        self.current_bag_object = state.current_bag_object;
        self.previous_bag_object = state.current_bag_object;
        self.bag = state.bag;
        self.current_bag_action = state.current_bag_action;
        if let Some(music) = state.music {
            self.music_track = music.track as i32;
            self.music_name = music.name;
        }
        tracing::info!(target: "bermuda::info", slot, scene = %self.next_scene_file, "game state loaded");
        Ok(())
    }

    pub fn stub(&self) -> &S {
        &self.stub
    }

    pub fn stub_mut(&mut self) -> &mut S {
        &mut self.stub
    }

    pub fn into_stub(self) -> S {
        self.stub
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn set_random_seed(&mut self, seed: u16) {
        self.rnd.set_seed(seed);
    }

    pub fn is_demo(&self) -> bool {
        self.is_demo
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn vars(&self) -> &[i16] {
        &self.vars
    }

    pub fn set_var(&mut self, index: usize, value: i16) {
        if let Some(v) = self.vars.get_mut(index) {
            *v = value;
        }
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects[..self.objects_count]
    }

    pub fn next_scenes(&self) -> &[NextScene] {
        &self.next_scenes
    }

    /// Lowercase names of the loaded MOV files.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.iter().map(|sa| sa.name.as_str())
    }

    pub fn bag_objects(&self) -> impl Iterator<Item = &str> {
        self.bag.iter().map(|b| b.name.as_str())
    }

    pub fn scene_name(&self) -> &str {
        &self.current_scene_scn
    }

    pub fn scene_number(&self) -> i16 {
        self.scene_number
    }

    pub fn music_track(&self) -> i32 {
        self.music_track
    }

    /// Digital music file of the current track, if one is playing.
    pub fn music_file(&self) -> Option<&std::path::Path> {
        self.music_file.as_deref()
    }

    pub fn frame_buffer(&self) -> &SceneBitmap {
        &self.frame
    }

    pub fn palette(&self) -> &[u8] {
        &self.palette
    }

    pub fn state_slot(&self) -> u32 {
        self.state_slot
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }
}

fn music_track_number(stem: &str) -> Option<u32> {
    const TRACKS: [(&str, u32); 12] = [
        ("flyaway", 2),
        ("jungle1", 3),
        ("sadialog", 4),
        ("caves", 5),
        ("jungle2", 6),
        ("darkcave", 7),
        ("waterdiv", 8),
        ("merian1", 9),
        ("telquad", 10),
        ("gameover", 11),
        ("complete", 12),
        ("musik", 3),
    ];
    TRACKS.iter().find(|(name, _)| name.eq_ignore_ascii_case(stem)).map(|&(_, track)| track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_track_number() {
        assert_eq!(music_track_number("JUNGLE1"), Some(3));
        assert_eq!(music_track_number("musik"), Some(3));
        assert_eq!(music_track_number("gameover"), Some(11));
        assert_eq!(music_track_number("unknown"), None);
    }

    #[test]
    fn test_index_error_clamps() {
        match index_error("frames", 70000i64 * 70000) {
            GameError::Index { table, index } => {
                assert_eq!(table, "frames");
                assert_eq!(index, i32::MAX);
            }
            e => panic!("unexpected {e:?}"),
        }
    }
}
