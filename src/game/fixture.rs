//! In-memory scene for the interpreter and object logic tests.
//!
//! One animation owning two motions: motion 0 loops over two 10x20 frames,
//! motion 1 holds a single 6x8 frame. Objects are placed on a row and start
//! visible.

use std::io::Write;
use std::sync::Arc;

use flate2::{write::ZlibEncoder, Compression as Level};

use crate::bitmap::make_sprite;
use crate::config::EngineConfig;
use crate::resource::{Compression, FrameHeader, SpriteFrame};
use crate::system::HeadlessStub;

use super::state::{SceneAnimation, SceneObject, SceneObjectMotion};
use super::Game;

pub(crate) const FRAME_W: i16 = 10;
pub(crate) const FRAME_H: i16 = 20;

fn zlib_frame(w: usize, h: usize) -> Vec<u8> {
    let sprite = make_sprite(w, h, &vec![5; w * h]);
    let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
    enc.write_all(&sprite).unwrap();
    let mut out = (sprite.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&enc.finish().unwrap());
    out
}

fn frame(num: i16, w: i16, h: i16, x_pos: i16) -> SpriteFrame {
    SpriteFrame {
        data: zlib_frame(w as usize, h as usize),
        hdr: FrameHeader { num, w, h, x_pos, y_pos: 0 },
        compression: Compression::Zlib,
    }
}

pub(crate) fn object(name: &str, x: i16, y: i16) -> SceneObject {
    SceneObject {
        name: name.to_string(),
        x_init: x,
        y_init: y,
        x,
        y,
        x_prev: x,
        y_prev: y,
        mode: 1,
        state: 1,
        state_prev: 1,
        ..Default::default()
    }
}

/// Objects named `names`, the first at (100, 50) and the next ones 100
/// pixels apart on the same row. Every object runs `script`.
pub(crate) fn scene(names: &[&str], script: Arc<[u8]>) -> Game<HeadlessStub> {
    let config = EngineConfig {
        data_path: std::env::temp_dir().join("bermuda-fixture-missing"),
        ..Default::default()
    };
    let mut game = Game::with_empty_tables(config, HeadlessStub::default());
    game.set_random_seed(1);
    game.frames = vec![frame(1, FRAME_W, FRAME_H, 0), frame(0, FRAME_W, FRAME_H, 2), frame(0, 6, 8, 0)];
    game.motions = vec![
        SceneObjectMotion { first_frame_index: 0, count: 2, anim_num: 0 },
        SceneObjectMotion { first_frame_index: 2, count: 1, anim_num: 0 },
    ];
    game.animations = vec![SceneAnimation {
        name: "..\\mov\\fixture.mov".to_string(),
        first_motion_index: 0,
        motions_count: 2,
        first_object_index: 0,
        objects_count: names.len() as i16,
        first_sound_buffer_index: 0,
        sound_buffers_count: 0,
        script,
        unk26: 0,
    }];
    for (i, name) in names.iter().enumerate() {
        game.objects[i] = object(name, 100 + 100 * i as i16, 50);
    }
    game.objects_count = names.len();
    game.load_data_state = 2;
    game
}

/// Assembles object scripts. Each statement gets its end offset patched in
/// by [`Asm::end`].
#[derive(Default)]
pub(crate) struct Asm {
    data: Vec<u8>,
    start: usize,
}

impl Asm {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(mut self) -> Self {
        self.start = self.data.len();
        self.data.extend_from_slice(&[0, 0]);
        self
    }

    pub(crate) fn w(mut self, words: &[i16]) -> Self {
        for w in words {
            self.data.extend_from_slice(&w.to_le_bytes());
        }
        self
    }

    /// Object operand by name.
    pub(crate) fn obj(mut self, name: &str) -> Self {
        self.data.extend_from_slice(&(name.len() as i16 + 1).to_le_bytes());
        self.data.extend_from_slice(name.as_bytes());
        self.data.push(0);
        self
    }

    /// Closes the conditions of the current statement.
    pub(crate) fn then(self) -> Self {
        self.w(&[0])
    }

    pub(crate) fn end(mut self) -> Self {
        let end = self.data.len() as u16;
        self.data[self.start..self.start + 2].copy_from_slice(&end.to_le_bytes());
        self
    }

    /// Statement made of plain words.
    pub(crate) fn statement(self, conditions: &[i16], operators: &[i16]) -> Self {
        self.begin().w(conditions).then().w(operators).end()
    }

    pub(crate) fn build(self) -> Arc<[u8]> {
        Arc::from(self.data)
    }
}
