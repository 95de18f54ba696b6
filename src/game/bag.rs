//! Inventory window
//!
//! The bag window is drawn centered horizontally over the last presented
//! frame. It selects the current bag action (take, talk, girl or use an
//! object) and switches between the sword and the gun.

use crate::bitmap::{draw_object, sprite_height, sprite_width, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::system::{SystemStub, DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP};

use super::state::{BagAction, VAR_AMMO, VAR_HAS_GUN, VAR_HAS_SWORD};
use super::{Game, GameError, Mode};

/// Objects shown in the window.
const VISIBLE_BAG_OBJECTS: usize = 4;

/// Position of the selected action icon, relative to the window.
const BAG_ACTION_POS: [(i32, i32); 3] = [(121, 17), (164, 26), (222, 16)];

const BLINK_FRAMES: usize = 10;

impl<S: SystemStub> Game<S> {
    fn bag_window_pos(&self) -> (i32, i32) {
        let w = self.bag_background.width() as i32;
        let h = self.bag_background.height() as i32;
        ((SCREEN_WIDTH as i32 - w) / 2, (SCREEN_HEIGHT as i32 - h) / 4)
    }

    fn visible_bag_objects(&self) -> usize {
        self.bag.len().min(VISIBLE_BAG_OBJECTS)
    }

    /// Gun selected while a sword is carried.
    fn select_sword(&mut self) {
        if self.vars[VAR_HAS_GUN] == 1 && self.vars[VAR_HAS_SWORD] != 0 {
            self.vars[VAR_HAS_GUN] = 2;
            self.vars[VAR_HAS_SWORD] = 1;
        }
    }

    fn select_gun(&mut self) {
        if self.vars[VAR_HAS_SWORD] == 1 && self.vars[VAR_HAS_GUN] != 0 {
            self.vars[VAR_HAS_GUN] = 1;
            self.vars[VAR_HAS_SWORD] = 2;
        }
    }

    fn handle_bag_click(&mut self, x: i32, y: i32) {
        for i in 0..3i16 {
            let left = i as i32 * 45 + 118;
            if (left..left + 42).contains(&x) && (15..55).contains(&y) {
                self.current_bag_action = i;
            }
        }
        for i in 0..self.visible_bag_objects() {
            let left = i as i32 * 32 + 261;
            if (left..left + 32).contains(&x) && (4..44).contains(&y) {
                self.current_bag_object = i as i16;
                self.current_bag_action = BagAction::UseObject as i16;
            }
        }
        if let Some(gun) = self.sprites.weapon_icons.first() {
            let (w, h) = (sprite_width(gun) as i32, sprite_height(gun) as i32);
            if (22..22 + w).contains(&x) && (22..22 + h).contains(&y) {
                self.select_gun();
            }
        }
        if let Some(sword) = &self.sprites.sword_icon {
            let (w, h) = (sprite_width(sword) as i32, sprite_height(sword) as i32);
            if (22..22 + w).contains(&x) && (37..37 + h).contains(&y) {
                self.select_sword();
            }
        }
    }

    pub(crate) fn handle_bag_menu(&mut self) -> Result<(), GameError> {
        let (wnd_x, wnd_y) = self.bag_window_pos();
        let pi = self.stub.input().clone();
        if pi.left_mouse_button {
            self.stub.input_mut().left_mouse_button = false;
            self.handle_bag_click(pi.mouse_x - wnd_x, pi.mouse_y - wnd_y);
        }
        if pi.tab || pi.enter {
            let input = self.stub.input_mut();
            input.tab = false;
            input.enter = false;
            self.mode = Mode::Game;
            tracing::debug!(
                target: "bermuda::game",
                action = self.current_bag_action,
                object = self.current_bag_object,
                "bag closed"
            );
            return Ok(());
        }
        let use_object = BagAction::UseObject as i16;
        if pi.dir_mask & DIR_LEFT != 0 {
            self.stub.input_mut().dir_mask &= !DIR_LEFT;
            if self.current_bag_action != 0 {
                if self.current_bag_action != use_object || self.current_bag_object <= 0 {
                    self.current_bag_action -= 1;
                } else {
                    self.current_bag_object -= 1;
                }
            }
        }
        if pi.dir_mask & DIR_RIGHT != 0 {
            self.stub.input_mut().dir_mask &= !DIR_RIGHT;
            if self.current_bag_action == use_object {
                let last = self.bag.len() as i16 - 1;
                if last > self.current_bag_object && self.current_bag_object != -1 {
                    self.current_bag_object += 1;
                }
            } else {
                self.current_bag_action += 1;
            }
        }
        if pi.dir_mask & DIR_DOWN != 0 {
            self.stub.input_mut().dir_mask &= !DIR_DOWN;
            self.select_sword();
        }
        if pi.dir_mask & DIR_UP != 0 {
            self.stub.input_mut().dir_mask &= !DIR_UP;
            self.select_gun();
        }

        self.draw_bag_menu(wnd_x, wnd_y);

        self.life_bar_current_frame = (self.life_bar_current_frame + 1) % 12;
        let object_selected = (0..VISIBLE_BAG_OBJECTS as i16).contains(&self.current_bag_object);
        if object_selected && self.current_bag_action == use_object && !self.bag.is_empty() {
            self.bag_object_area_blink_counter = (self.bag_object_area_blink_counter + 1) % BLINK_FRAMES;
        }
        if self.vars[VAR_HAS_SWORD] == 1 || self.vars[VAR_HAS_GUN] == 1 {
            self.bag_weapon_area_blink_counter = (self.bag_weapon_area_blink_counter + 1) % BLINK_FRAMES;
        }
        Ok(())
    }

    fn draw_bag_menu(&mut self, wnd_x: i32, wnd_y: i32) {
        let sprites = &self.sprites;
        let demo = self.is_demo;
        let bg_h = self.bag_background.h as i32;
        let objects_x = if demo { 247 } else { 269 };

        if let Some(slot) = sprites.bag_object_area_blink.first() {
            let y = bg_h - 32 - sprite_height(slot) as i32;
            for i in 0..VISIBLE_BAG_OBJECTS as i32 {
                draw_object(objects_x + i * 32, y, slot, &mut self.bag_background);
            }
        }

        let mut wnd = self.bag_background.clone();
        if self.vars[VAR_HAS_GUN] != 0 {
            let index = (13 - self.vars[4] as i32).clamp(0, 13) as usize;
            if let Some(gun) = sprites.weapon_icons.get(index) {
                let y = bg_h - if demo { 19 } else { 21 } - sprite_height(gun) as i32;
                draw_object(22, y, gun, &mut wnd);
            }
            let ammo = self.vars[VAR_AMMO];
            if (0..5).contains(&ammo) {
                let set = if self.vars[4] <= 0 { 0 } else { 1 };
                if let Some(icon) = sprites.ammo_icons.get(set).and_then(|s| s.get(ammo as usize)) {
                    let y = bg_h - if demo { 29 } else { 31 } - sprite_height(icon) as i32;
                    draw_object(33, y, icon, &mut wnd);
                }
            }
        }
        if !demo && self.vars[VAR_HAS_SWORD] != 0 {
            if let Some(sword) = &sprites.sword_icon {
                draw_object(22, bg_h - 36 - sprite_height(sword) as i32, sword, &mut wnd);
            }
        }
        let level = self.vars[0].clamp(0, 10) as usize;
        if let Some(life) = sprites.life_bar.get(level).and_then(|l| l.get(self.life_bar_current_frame)) {
            let y = bg_h - if demo { 52 } else { 51 } - sprite_height(life) as i32;
            draw_object(if demo { 23 } else { 314 }, y, life, &mut wnd);
        }
        if let Some(&(x, y)) = usize::try_from(self.current_bag_action).ok().and_then(|a| BAG_ACTION_POS.get(a)) {
            if let Some(icon) = sprites.bag_actions.get(self.current_bag_action as usize) {
                let x = if demo { x - 22 } else { x };
                draw_object(x, bg_h - y - sprite_height(icon) as i32, icon, &mut wnd);
            }
        }
        for (i, obj) in self.bag.iter().take(VISIBLE_BAG_OBJECTS).enumerate() {
            let (w, h) = (sprite_width(&obj.data) as i32, sprite_height(&obj.data) as i32);
            let x = if demo { 239 } else { 261 } + i as i32 * 32 + (32 - w) / 2;
            let y = bg_h - 3 - (40 - h) / 2 - h;
            draw_object(x, y, &obj.data, &mut wnd);
        }
        if (0..VISIBLE_BAG_OBJECTS as i16).contains(&self.current_bag_object) && !self.bag.is_empty() {
            let frame = if self.current_bag_action == BagAction::UseObject as i16 {
                self.bag_object_area_blink_counter
            } else {
                0
            };
            if let Some(p) = sprites.bag_object_area_blink.get(frame) {
                let x = objects_x + self.current_bag_object as i32 * 32;
                draw_object(x, bg_h - 32 - sprite_height(p) as i32, p, &mut wnd);
            }
        }
        if !demo {
            let blink = &sprites.bag_weapon_area_blink;
            let frame_for = |selected: bool| {
                blink.get(if selected { self.bag_weapon_area_blink_counter } else { 0 })
            };
            if let Some(p) = frame_for(self.vars[VAR_HAS_SWORD] == 1) {
                draw_object(87, bg_h - 38 - sprite_height(p) as i32, p, &mut wnd);
            }
            if let Some(p) = frame_for(self.vars[VAR_HAS_GUN] == 1) {
                draw_object(87, bg_h - 25 - sprite_height(p) as i32, p, &mut wnd);
            }
        }

        let (w, h) = (wnd.width() as i32, wnd.height() as i32);
        self.stub.copy_rect(wnd_x, wnd_y, w, h, &wnd.bits, wnd.pitch as usize, false);
    }
}
