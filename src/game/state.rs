//! Scene tables
//!
//! The engine keeps fixed size tables indexed by `i16` values coming from
//! scene scripts and save files. Objects, boxes and statuses keep their
//! slots across scene switches; motions, frames and animations are truncated
//! when a scene releases its data.

use serde::Serialize;
use std::sync::Arc;

pub const NUM_VARS: usize = 310;
pub const NUM_BOXES: usize = 20;
pub const BOXES_PER_GROUP: usize = 10;
pub const NUM_SCENE_OBJECT_FRAMES: usize = 3000;
pub const NUM_SCENE_MOTIONS: usize = 300;
pub const NUM_SOUND_BUFFERS: usize = 80;
pub const NUM_SCENE_OBJECTS: usize = 50;
pub const NUM_SCENE_ANIMATIONS: usize = 50;
pub const NUM_BAG_OBJECTS: usize = 20;
pub const NUM_NEXT_SCENES: usize = 20;
pub const NUM_SCENE_OBJECT_STATUS: usize = 200;
pub const NUM_DIALOG_CHOICES: usize = 10;
pub const NUM_DIALOG_ENTRIES: usize = 40;

pub const FLIP_Y: i16 = 1;
pub const FLIP_X: i16 = 2;

pub const VAR_HAS_SWORD: usize = 1;
pub const VAR_HAS_GUN: usize = 2;
pub const VAR_AMMO: usize = 3;

pub const LEFT_MOUSE_BUTTON: u8 = 1 << 0;
pub const RIGHT_MOUSE_BUTTON: u8 = 1 << 1;

/// Bag actions, `UseObject` draws the selected bag object next to the bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i16)]
pub enum BagAction {
    Take = 0,
    Talk = 1,
    Girl = 2,
    UseObject = 3,
}

/// A scene object. `state`: 0 inactive, 1 animated, 2 static, -1 removed this
/// frame. The `*_prev` fields hold what was drawn last frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SceneObject {
    pub x_init: i16,
    pub y_init: i16,
    pub x: i16,
    pub y: i16,
    pub x_prev: i16,
    pub y_prev: i16,
    pub z_init: i16,
    pub z_prev: i16,
    pub z: i16,
    pub frame_num: i16,
    pub frame_num_prev: i16,
    pub flip_init: i16,
    pub flip: i16,
    pub flip_prev: i16,
    /// Motion relative to `motion_init` used on (re)initialisation.
    pub motion_num: i16,
    /// First motion of the animation the object was loaded from.
    pub motion_init: i16,
    /// Motion drawn last frame.
    pub motion_num1: i16,
    /// Current motion.
    pub motion_num2: i16,
    pub motion_frame_num: i16,
    pub mode: i16,
    pub mode_rnd_mul: i16,
    pub state_prev: i16,
    pub state: i16,
    pub name: String,
    pub class_name: String,
    pub vars: [i16; 10],
}

impl SceneObject {
    pub fn is_visible(&self) -> bool {
        self.state == 1 || self.state == 2
    }
}

/// One loaded MOV file and the table ranges it owns.
#[derive(Debug, Clone, Default)]
pub struct SceneAnimation {
    /// Lower cased MOV path.
    pub name: String,
    pub first_motion_index: i16,
    pub motions_count: i16,
    pub first_object_index: i16,
    pub objects_count: i16,
    pub first_sound_buffer_index: i16,
    pub sound_buffers_count: i16,
    pub script: Arc<[u8]>,
    pub unk26: i16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneObjectMotion {
    pub first_frame_index: i16,
    pub count: i16,
    pub anim_num: i16,
}

/// Hit area. `state`: 0 disabled, 1 enabled, 2 mixing area redrawn over
/// objects with a lower `z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneBox {
    pub x1: i16,
    pub x2: i16,
    pub y1: i16,
    pub y2: i16,
    pub state: u8,
    pub z: i16,
    pub start_color: i16,
    pub end_color: i16,
}

impl SceneBox {
    /// Overlap test against the rectangle spanned by two corners.
    pub fn in_rect(&self, x1: i32, x2: i32, y1: i32, y2: i32) -> bool {
        let (xmin, xmax) = (x1.min(x2), x1.max(x2));
        let (ymin, ymax) = (y1.min(y2), y1.max(y2));
        (self.x1 as i32) <= xmax && (self.x2 as i32) >= xmin && (self.y1 as i32) <= ymax && (self.y2 as i32) >= ymin
    }

    /// Whether the segment `(x1,y1)-(x2,y2)` crosses this enabled box.
    pub fn intersects(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        if self.state != 1 {
            return false;
        }
        let (bx1, bx2, by1, by2) = (self.x1 as i32, self.x2 as i32, self.y1 as i32, self.y2 as i32);
        let contains = |x: i32, y: i32| bx1 <= x && bx2 >= x && by1 <= y && by2 >= y;
        if contains(x1, y1) || contains(x2, y2) {
            return true;
        }
        let (xmin, xmax) = (x1.min(x2), x1.max(x2));
        let (ymin, ymax) = (y1.min(y2), y1.max(y2));
        if !(bx2 >= xmin && bx1 <= xmax && by2 >= ymin && by1 <= ymax) {
            return false;
        }
        if x1 == x2 || y1 == y2 {
            return true;
        }
        for bx in [bx1, bx2] {
            let iy = y1 - (y1 - y2) * (x1 - bx) / (x1 - x2);
            if by1 <= iy && by2 >= iy && ymin <= iy && ymax >= iy {
                return true;
            }
        }
        for by in [by1, by2] {
            let ix = x1 - (x1 - x2) * (y1 - by) / (y1 - y2);
            if bx1 <= ix && bx2 >= ix && xmin <= ix && xmax >= ix {
                return true;
            }
        }
        false
    }
}

/// Inventory entry, `data` is a raw sprite buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagObject {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NextScene {
    pub num: i16,
    pub name: String,
}

/// Snapshot written by the script so a later scene can restore an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SceneObjectStatus {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub motion_num: i16,
    pub frame_num: i16,
    pub flip: i16,
}

pub type BoxTable = [[SceneBox; BOXES_PER_GROUP]; NUM_BOXES];

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(x1: i16, y1: i16, x2: i16, y2: i16) -> SceneBox {
        SceneBox { x1, x2, y1, y2, state: 1, ..Default::default() }
    }

    #[test]
    fn test_box_in_rect() {
        let b = enabled(10, 10, 20, 20);
        assert!(b.in_rect(15, 30, 0, 12));
        assert!(b.in_rect(30, 15, 12, 0));
        assert!(!b.in_rect(21, 30, 0, 100));
    }

    #[test]
    fn test_box_intersects_segment() {
        let b = enabled(10, 10, 20, 20);
        // end point inside
        assert!(b.intersects(0, 0, 15, 15));
        // diagonal crossing the box
        assert!(b.intersects(0, 0, 30, 30));
        // passes beside it
        assert!(!b.intersects(0, 25, 5, 30));
        // axis aligned through it
        assert!(b.intersects(15, 0, 15, 40));

        let mut disabled = b;
        disabled.state = 0;
        assert!(!disabled.intersects(0, 0, 15, 15));
    }
}
