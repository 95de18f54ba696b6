//! Scene rendering
//!
//! Objects are drawn back to front into `frame`, mixing boxes are redrawn
//! from the background over objects behind them, then the interface icons
//! go on top. The frame is copied to the stub and reset from the
//! background for the next cycle.

use crate::bitmap::{
    copy_buffer_to_buffer, draw_box, draw_object, draw_object_vertical_flip, sprite_height, sprite_width,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};
use crate::decoder::decode_lzss;
use crate::system::SystemStub;

use super::state::{BagAction, BOXES_PER_GROUP, FLIP_X, VAR_AMMO, VAR_HAS_GUN, VAR_HAS_SWORD};
use super::{Game, GameError};

/// Scene number of the screens without interface.
const SCENE_NO_INTERFACE: i16 = -1000;

impl<S: SystemStub> Game<S> {
    /// Redraws the mixing boxes lying between the depth of the previously
    /// drawn object and the next one.
    pub(crate) fn redraw_object_boxes(&mut self, sorted: &[usize], previous: usize, current: usize) {
        let prev_z = self.objects[sorted[previous]].z;
        let cur_z = self.objects[sorted[current]].z;
        let frame_h = self.frame.h as i32;
        for g in 0..BOXES_PER_GROUP {
            for b in &self.boxes[g][..self.boxes_count[g]] {
                if b.state != 2 || b.z > prev_z {
                    continue;
                }
                if previous != current && b.z <= cur_z {
                    continue;
                }
                let w = b.x2 as i32 - b.x1 as i32 + 1;
                let h = b.y2 as i32 - b.y1 as i32 + 1;
                let (x, y) = (b.x1 as i32, frame_h + 1 - b.y2 as i32);
                if b.end_color != 0 {
                    let start = b.start_color as i32;
                    draw_box(x, y, w, h, &self.background, &mut self.frame, start, start + b.end_color as i32 - 1);
                } else {
                    copy_buffer_to_buffer(x, y, w, h, &self.background, &mut self.frame);
                }
            }
        }
    }

    pub(crate) fn redraw_objects(&mut self) -> Result<(), GameError> {
        let sorted = self.sort_objects();
        let mut previous = None;
        for (i, &index) in sorted.iter().enumerate() {
            if !self.objects[index].is_visible() {
                continue;
            }
            if let Some(p) = previous {
                self.redraw_object_boxes(&sorted, p, i);
            }
            previous = Some(i);
            // overlapping icon in the first demo scene
            if self.is_demo && self.scene_number == 1 && i == 14 {
                continue;
            }
            let so = &self.objects[index];
            let (x, y, flip, frame_num) = (so.x as i32, so.y as i32, so.flip, so.frame_num);
            let hdr = self.frame_hdr(frame_num)?;
            let sprite = self.frames[frame_num as usize].decode()?;
            let dst_y = self.frame.h as i32 + 1 - y - hdr.h as i32;
            if flip == FLIP_X {
                draw_object_vertical_flip(x, dst_y, &sprite, &mut self.frame);
            } else {
                draw_object(x, dst_y, &sprite, &mut self.frame);
            }
        }
        if let Some(p) = previous {
            self.redraw_object_boxes(&sorted, p, p);
        }
        if self.scene_number != SCENE_NO_INTERFACE && self.objects_count != 0 {
            self.draw_interface()?;
        }
        self.present_frame();
        Ok(())
    }

    fn draw_interface(&mut self) -> Result<(), GameError> {
        let frame_h = self.frame.h as i32;
        if !self.is_demo && self.game_over {
            if let Some(ovr) = &self.game_over_image {
                let banner = decode_lzss(ovr.get(2..).unwrap_or(&[]))?;
                draw_object(93, frame_h - 230, &banner, &mut self.frame);
            }
        }
        let selected = usize::try_from(self.current_bag_object).ok().and_then(|i| self.bag.get(i));
        if let (Some(obj), true) = (selected, self.current_bag_action == BagAction::UseObject as i16) {
            let icon = &self.sprites.icon_background;
            let (bag_x, bag_y) = (self.bag_pos_x as i32, self.bag_pos_y as i32);
            let (inv_w, inv_h) = (sprite_width(icon) as i32, sprite_height(icon) as i32);
            draw_object(bag_x, frame_h + 1 - bag_y - inv_h, icon, &mut self.frame);
            let (obj_w, obj_h) = (sprite_width(&obj.data) as i32, sprite_height(&obj.data) as i32);
            let y = frame_h + 1 - bag_y - (inv_h - obj_h) / 2 - obj_h;
            let x = bag_x + (inv_w - obj_w) / 2;
            draw_object(x, y, &obj.data, &mut self.frame);
        }
        if self.life_bar_displayed {
            self.draw_life_bar(frame_h);
        }
        Ok(())
    }

    fn draw_life_bar(&mut self, frame_h: i32) {
        let sprites = &self.sprites;
        let bar = &sprites.life_bar_image;
        let bar_y = frame_h - 18 - sprite_height(bar) as i32;
        draw_object(386, bar_y, bar, &mut self.frame);
        if self.vars[VAR_HAS_SWORD] == 1 {
            draw_object(150, bar_y, bar, &mut self.frame);
            if let Some(sword) = &sprites.sword_icon {
                draw_object(173, frame_h - 18 - sprite_height(sword) as i32, sword, &mut self.frame);
            }
        } else if self.vars[VAR_HAS_GUN] == 1 {
            draw_object(150, bar_y, bar, &mut self.frame);
            let index = (13 - self.vars[4] as i32).clamp(0, 13) as usize;
            if let Some(weapon) = sprites.weapon_icons.get(index) {
                draw_object(173, frame_h - 31 - sprite_height(weapon) as i32, weapon, &mut self.frame);
            }
            let ammo = self.vars[VAR_AMMO];
            if (0..5).contains(&ammo) {
                let set = if self.vars[4] <= 0 { 0 } else { 1 };
                if let Some(icon) = sprites.ammo_icons.get(set).and_then(|s| s.get(ammo as usize)) {
                    draw_object(184, frame_h - 41 - sprite_height(icon) as i32, icon, &mut self.frame);
                }
            }
        }
        let level = self.vars[0].clamp(0, 10) as usize;
        if let Some(anim) = sprites.life_bar.get(level).and_then(|l| l.get(self.life_bar_current_frame)) {
            draw_object(409, frame_h - 36 - sprite_height(anim) as i32, anim, &mut self.frame);
        }
        self.life_bar_current_frame = (self.life_bar_current_frame + 1) % 12;
    }

    /// Copies the frame to the screen and restores it from the background.
    fn present_frame(&mut self) {
        let w = self.frame.width().min(SCREEN_WIDTH) as i32;
        let h = self.frame.height().min(SCREEN_HEIGHT) as i32;
        self.stub
            .copy_rect(0, 0, w, h, &self.frame.bits, self.frame.pitch as usize, false);
        self.frame.clone_from(&self.background);
        if self.life_bar_displayed {
            let bar = &self.sprites.life_bar_image;
            let (bw, bh) = (sprite_width(bar) as i32, sprite_height(bar) as i32);
            let y = self.frame.h as i32 + 1 - 19 - bh;
            for x in [386, 150] {
                copy_buffer_to_buffer(x, y, bw, bh, &self.background, &mut self.frame);
            }
        }
        self.previous_bag_action = self.current_bag_action;
    }
}
