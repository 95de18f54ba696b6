//! Save states
//!
//! Little-endian dump of the scene tables, compatible with the original
//! `bermuda.NNN` files and with the `.SAV` files shipped with the demo:
//!
//! | field                | encoding                                      |
//! |----------------------|-----------------------------------------------|
//! | default vars         | `u16 n`, `n` x `i16`                          |
//! | scene name           | `u16 len` (NUL included), bytes               |
//! | objects              | `u16 n`, 23 `i16`, name[20], class[20], 10 `i16` |
//! | box counts           | `u16 n`, `n` x `i16`                          |
//! | boxes                | `u16 n*10`, `x1 x2 y1 y2`, `u8 state`, `z start end` |
//! | vars                 | `u16 n`, `n` x `i16`                          |
//! | object statuses      | `u16 n`, 6 `i16` each                         |
//! | bag                  | `x y current`, `u16 size`, data, `u16 n`, (`u16 offset`, name[20]) |
//! | bag action           | `i16`                                         |
//! | music                | `u32 track` twice, `u16 len`, name            |
//!
//! The demo `.SAV` files stop after the first music track word.

use serde::Serialize;
use thiserror::Error;

use crate::game::state::{
    BagObject, BoxTable, SceneBox, SceneObject, SceneObjectStatus, BOXES_PER_GROUP, NUM_BAG_OBJECTS, NUM_BOXES,
    NUM_SCENE_OBJECTS, NUM_SCENE_OBJECT_STATUS, NUM_VARS,
};
use crate::util::{bytes_to_string, ByteReader, ReadError};

const NAME_SIZE: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("Save state has {count} {what}, at most {max} supported")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("Save state box table size {0} is not a multiple of {BOXES_PER_GROUP}")]
    BoxTableSize(usize),

    #[error("Bag object {index} offset {offset} outside of the {size} bytes bag data")]
    BagOffset { index: usize, offset: usize, size: usize },

    #[error("Bag data too large ({0} bytes)")]
    BagTooLarge(usize),

    #[error("Name '{0}' does not fit a save state field")]
    NameTooLong(String),
}

/// Music state, absent from the demo `.SAV` files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SavedMusic {
    pub track: u32,
    pub name: String,
}

/// Everything a save state restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveState {
    pub default_vars: Vec<i16>,
    pub scene_name: String,
    pub objects: Vec<SceneObject>,
    pub boxes_count: Vec<i16>,
    pub boxes: Vec<[SceneBox; BOXES_PER_GROUP]>,
    pub vars: Vec<i16>,
    pub statuses: Vec<SceneObjectStatus>,
    pub bag_pos_x: i16,
    pub bag_pos_y: i16,
    pub current_bag_object: i16,
    pub bag: Vec<BagObject>,
    pub current_bag_action: i16,
    pub music: Option<SavedMusic>,
}

/// Header of a save state: what a scene switch needs before the rest is
/// restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveHeader {
    pub default_vars: Vec<i16>,
    pub scene_name: String,
}

/// Short description of a save state for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
    pub scene_name: String,
    pub objects: usize,
    pub bag_objects: Vec<String>,
    pub current_bag_object: i16,
    pub current_bag_action: i16,
    pub music: Option<SavedMusic>,
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn count(&mut self, n: usize) {
        self.i16(n as i16);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn name(&mut self, s: &str) -> Result<(), SaveError> {
        let bytes = s.as_bytes();
        if bytes.len() >= NAME_SIZE {
            return Err(SaveError::NameTooLong(s.to_string()));
        }
        let mut field = [0u8; NAME_SIZE];
        field[..bytes.len()].copy_from_slice(bytes);
        self.buf.extend_from_slice(&field);
        Ok(())
    }
}

fn read_count(r: &mut ByteReader<'_>, what: &'static str, max: usize) -> Result<usize, SaveError> {
    let count = r.u16()? as usize;
    if count > max {
        return Err(SaveError::TooMany { what, count, max });
    }
    Ok(count)
}

fn read_i16s(r: &mut ByteReader<'_>, n: usize) -> Result<Vec<i16>, ReadError> {
    (0..n).map(|_| r.i16()).collect()
}

fn write_object(w: &mut Writer, so: &SceneObject) -> Result<(), SaveError> {
    for v in [
        so.x_init,
        so.y_init,
        so.x,
        so.y,
        so.x_prev,
        so.y_prev,
        so.z_init,
        so.z_prev,
        so.z,
        so.frame_num,
        so.frame_num_prev,
        so.flip_init,
        so.flip,
        so.flip_prev,
        so.motion_num,
        so.motion_init,
        so.motion_num1,
        so.motion_num2,
        so.motion_frame_num,
        so.mode,
        so.mode_rnd_mul,
        so.state_prev,
        so.state,
    ] {
        w.i16(v);
    }
    w.name(&so.name)?;
    w.name(&so.class_name)?;
    for v in so.vars {
        w.i16(v);
    }
    Ok(())
}

fn read_object(r: &mut ByteReader<'_>) -> Result<SceneObject, ReadError> {
    let mut so = SceneObject {
        x_init: r.i16()?,
        y_init: r.i16()?,
        x: r.i16()?,
        y: r.i16()?,
        x_prev: r.i16()?,
        y_prev: r.i16()?,
        z_init: r.i16()?,
        z_prev: r.i16()?,
        z: r.i16()?,
        frame_num: r.i16()?,
        frame_num_prev: r.i16()?,
        flip_init: r.i16()?,
        flip: r.i16()?,
        flip_prev: r.i16()?,
        motion_num: r.i16()?,
        motion_init: r.i16()?,
        motion_num1: r.i16()?,
        motion_num2: r.i16()?,
        motion_frame_num: r.i16()?,
        mode: r.i16()?,
        mode_rnd_mul: r.i16()?,
        state_prev: r.i16()?,
        state: r.i16()?,
        ..Default::default()
    };
    so.name = bytes_to_string(r.bytes(NAME_SIZE)?);
    so.class_name = bytes_to_string(r.bytes(NAME_SIZE)?);
    for v in so.vars.iter_mut() {
        *v = r.i16()?;
    }
    Ok(so)
}

fn write_box(w: &mut Writer, b: &SceneBox) {
    w.i16(b.x1);
    w.i16(b.x2);
    w.i16(b.y1);
    w.i16(b.y2);
    w.u8(b.state);
    w.i16(b.z);
    w.i16(b.start_color);
    w.i16(b.end_color);
}

fn read_box(r: &mut ByteReader<'_>) -> Result<SceneBox, ReadError> {
    Ok(SceneBox {
        x1: r.i16()?,
        x2: r.i16()?,
        y1: r.i16()?,
        y2: r.i16()?,
        state: r.u8()?,
        z: r.i16()?,
        start_color: r.i16()?,
        end_color: r.i16()?,
    })
}

fn read_header(r: &mut ByteReader<'_>) -> Result<SaveHeader, SaveError> {
    let n = read_count(r, "default vars", NUM_VARS)?;
    let default_vars = read_i16s(r, n)?;
    let scene_name = r.string16()?;
    Ok(SaveHeader { default_vars, scene_name })
}

impl SaveState {
    /// Empty tables sized like the engine's.
    pub fn empty(scene_name: &str) -> Self {
        Self {
            default_vars: vec![0; NUM_VARS],
            scene_name: scene_name.to_string(),
            objects: Vec::new(),
            boxes_count: vec![0; NUM_BOXES],
            boxes: vec![[SceneBox::default(); BOXES_PER_GROUP]; NUM_BOXES],
            vars: vec![0; NUM_VARS],
            statuses: vec![SceneObjectStatus::default(); NUM_SCENE_OBJECT_STATUS],
            bag_pos_x: 0,
            bag_pos_y: 0,
            current_bag_object: -1,
            bag: Vec::new(),
            current_bag_action: 0,
            music: Some(SavedMusic::default()),
        }
    }

    pub fn box_table(&self) -> BoxTable {
        let mut table: BoxTable = Default::default();
        for (dst, src) in table.iter_mut().zip(&self.boxes) {
            *dst = *src;
        }
        table
    }

    pub fn write(&self) -> Result<Vec<u8>, SaveError> {
        let mut w = Writer { buf: Vec::new() };
        w.count(self.default_vars.len());
        for &v in &self.default_vars {
            w.i16(v);
        }
        // the scene name length counts its terminator
        w.count(self.scene_name.len() + 1);
        w.buf.extend_from_slice(self.scene_name.as_bytes());
        w.u8(0);
        w.count(self.objects.len());
        for so in &self.objects {
            write_object(&mut w, so)?;
        }
        w.count(self.boxes_count.len());
        for &n in &self.boxes_count {
            w.i16(n);
        }
        w.count(self.boxes.len() * BOXES_PER_GROUP);
        for group in &self.boxes {
            for b in group {
                write_box(&mut w, b);
            }
        }
        w.count(self.vars.len());
        for &v in &self.vars {
            w.i16(v);
        }
        w.count(self.statuses.len());
        for s in &self.statuses {
            for v in [s.x, s.y, s.z, s.motion_num, s.frame_num, s.flip] {
                w.i16(v);
            }
        }
        w.i16(self.bag_pos_x);
        w.i16(self.bag_pos_y);
        w.i16(self.current_bag_object);
        let total: usize = self.bag.iter().map(|b| b.data.len()).sum();
        if total >= 0xFFFF {
            return Err(SaveError::BagTooLarge(total));
        }
        w.count(total);
        for b in &self.bag {
            w.buf.extend_from_slice(&b.data);
        }
        w.count(self.bag.len());
        let mut offset = 0;
        for b in &self.bag {
            w.count(offset);
            w.name(&b.name)?;
            offset += b.data.len();
        }
        w.i16(self.current_bag_action);
        let music = self.music.clone().unwrap_or_default();
        w.u32(music.track);
        w.u32(music.track);
        w.count(music.name.len());
        w.buf.extend_from_slice(music.name.as_bytes());
        Ok(w.buf)
    }

    /// Reads a full state. `with_music` is `false` for the demo `.SAV`
    /// files.
    pub fn read(data: &[u8], with_music: bool) -> Result<Self, SaveError> {
        let mut r = ByteReader::new(data);
        let header = read_header(&mut r)?;

        let n = read_count(&mut r, "objects", NUM_SCENE_OBJECTS)?;
        let objects = (0..n).map(|_| read_object(&mut r)).collect::<Result<Vec<_>, _>>()?;

        let n = read_count(&mut r, "box groups", NUM_BOXES)?;
        let boxes_count = read_i16s(&mut r, n)?;
        let n = read_count(&mut r, "boxes", NUM_BOXES * BOXES_PER_GROUP)?;
        if n % BOXES_PER_GROUP != 0 {
            return Err(SaveError::BoxTableSize(n));
        }
        let mut boxes = Vec::with_capacity(n / BOXES_PER_GROUP);
        for _ in 0..n / BOXES_PER_GROUP {
            let mut group = [SceneBox::default(); BOXES_PER_GROUP];
            for b in group.iter_mut() {
                *b = read_box(&mut r)?;
            }
            boxes.push(group);
        }

        let n = read_count(&mut r, "vars", NUM_VARS)?;
        let vars = read_i16s(&mut r, n)?;

        let n = read_count(&mut r, "object statuses", NUM_SCENE_OBJECT_STATUS)?;
        let mut statuses = Vec::with_capacity(n);
        for _ in 0..n {
            statuses.push(SceneObjectStatus {
                x: r.i16()?,
                y: r.i16()?,
                z: r.i16()?,
                motion_num: r.i16()?,
                frame_num: r.i16()?,
                flip: r.i16()?,
            });
        }

        let bag_pos_x = r.i16()?;
        let bag_pos_y = r.i16()?;
        let current_bag_object = r.i16()?;
        let bag = read_bag(&mut r)?;
        let current_bag_action = r.i16()?;
        let first_track = r.u32()?;
        let music = if with_music {
            let track = r.u32()?;
            let name = r.string16()?;
            Some(SavedMusic { track, name })
        } else {
            tracing::debug!(target: "bermuda::info", track = first_track, "no music state in .SAV file");
            None
        };
        Ok(Self {
            default_vars: header.default_vars,
            scene_name: header.scene_name,
            objects,
            boxes_count,
            boxes,
            vars,
            statuses,
            bag_pos_x,
            bag_pos_y,
            current_bag_object,
            bag,
            current_bag_action,
            music,
        })
    }

    /// Reads the leading vars and scene name only.
    pub fn read_header(data: &[u8]) -> Result<SaveHeader, SaveError> {
        read_header(&mut ByteReader::new(data))
    }

    pub fn summary(&self) -> SaveSummary {
        SaveSummary {
            scene_name: self.scene_name.clone(),
            objects: self.objects.len(),
            bag_objects: self.bag.iter().map(|b| b.name.clone()).collect(),
            current_bag_object: self.current_bag_object,
            current_bag_action: self.current_bag_action,
            music: self.music.clone(),
        }
    }
}

fn read_bag(r: &mut ByteReader<'_>) -> Result<Vec<BagObject>, SaveError> {
    let total = r.u16()? as usize;
    let data = r.bytes(total)?;
    let count = read_count(r, "bag objects", NUM_BAG_OBJECTS)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = r.u16()? as usize;
        let name = bytes_to_string(r.bytes(NAME_SIZE)?);
        entries.push((offset, name));
    }
    let mut bag = Vec::with_capacity(count);
    for (i, (offset, name)) in entries.iter().enumerate() {
        let end = entries.get(i + 1).map_or(total, |next| next.0);
        let chunk = data
            .get(*offset..end)
            .ok_or(SaveError::BagOffset { index: i, offset: *offset, size: total })?;
        bag.push(BagObject {
            name: name.clone(),
            data: chunk.to_vec(),
        });
    }
    Ok(bag)
}
