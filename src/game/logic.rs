//! Object logic
//!
//! Per frame bookkeeping of the scene objects and the position helpers
//! shared by the script opcodes. Script arithmetic is done on `i32` and
//! stored back as `i16`.

use crate::resource::FrameHeader;
use crate::system::SystemStub;

use super::state::{SceneAnimation, SceneObject, SceneObjectMotion, BOXES_PER_GROUP, FLIP_X, FLIP_Y, NUM_SCENE_OBJECTS};
use super::{index_error, Game, GameError, GAME_OVER_MUSIC};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

impl Axis {
    /// Flip flag mirroring this axis.
    pub(crate) fn flip(self) -> i16 {
        match self {
            Axis::X => FLIP_X,
            Axis::Y => FLIP_Y,
        }
    }

    pub(crate) fn size(self, hdr: &FrameHeader) -> i32 {
        match self {
            Axis::X => hdr.w as i32,
            Axis::Y => hdr.h as i32,
        }
    }

    pub(crate) fn offset(self, hdr: &FrameHeader) -> i32 {
        match self {
            Axis::X => hdr.x_pos as i32,
            Axis::Y => hdr.y_pos as i32,
        }
    }

    pub(crate) fn pos(self, so: &SceneObject) -> i16 {
        match self {
            Axis::X => so.x,
            Axis::Y => so.y,
        }
    }

    pub(crate) fn pos_mut(self, so: &mut SceneObject) -> &mut i16 {
        match self {
            Axis::X => &mut so.x,
            Axis::Y => &mut so.y,
        }
    }

    pub(crate) fn prev(self, so: &SceneObject) -> i16 {
        match self {
            Axis::X => so.x_prev,
            Axis::Y => so.y_prev,
        }
    }

    pub(crate) fn init(self, so: &SceneObject) -> i16 {
        match self {
            Axis::X => so.x_init,
            Axis::Y => so.y_init,
        }
    }
}

fn checked(index: i32, len: usize, table: &'static str) -> Result<usize, GameError> {
    if index >= 0 && (index as usize) < len {
        Ok(index as usize)
    } else {
        Err(index_error(table, index))
    }
}

impl<S: SystemStub> Game<S> {
    pub(crate) fn frame_hdr(&self, index: i16) -> Result<FrameHeader, GameError> {
        let i = checked(index as i32, self.frames.len(), "frames")?;
        Ok(self.frames[i].hdr)
    }

    pub(crate) fn motion(&self, index: i32) -> Result<SceneObjectMotion, GameError> {
        let i = checked(index, self.motions.len(), "motions")?;
        Ok(self.motions[i])
    }

    pub(crate) fn animation(&self, index: i16) -> Result<&SceneAnimation, GameError> {
        let i = checked(index as i32, self.animations.len(), "animations")?;
        Ok(&self.animations[i])
    }

    /// Animation the last drawn motion of an object belongs to.
    pub(crate) fn object_anim(&self, object: usize) -> Result<i16, GameError> {
        Ok(self.motion(self.objects[object].motion_num1 as i32)?.anim_num)
    }

    pub(crate) fn var_index(&self, index: i16) -> Result<usize, GameError> {
        checked(index as i32, self.vars.len(), "vars")
    }

    pub(crate) fn script_div(&self, a: i32, b: i32) -> Result<i32, GameError> {
        if b == 0 {
            return Err(GameError::DivisionByZero(self.script.offset));
        }
        Ok(a.wrapping_div(b))
    }

    pub(crate) fn script_rem(&self, a: i32, b: i32) -> Result<i32, GameError> {
        if b == 0 {
            return Err(GameError::DivisionByZero(self.script.offset));
        }
        Ok(a.wrapping_rem(b))
    }

    /// `a * size / b + c` with three script words.
    fn fetch_scaled(&mut self, size: i32) -> Result<i16, GameError> {
        let a = self.script.fetch_word()? as i32;
        let b = self.script.fetch_word()? as i32;
        let c = self.script.fetch_word()? as i32;
        Ok((self.script_div(a * size, b)? + c) as i16)
    }

    /// Point inside the last drawn frame of an object, given as a fraction
    /// of the frame size plus an offset.
    pub(crate) fn transform_pos(&mut self, object: usize, axis: Axis) -> Result<i16, GameError> {
        let so = &self.objects[object];
        let (prev, flip_prev) = (axis.prev(so), so.flip_prev);
        let size = axis.size(&self.frame_hdr(so.frame_num_prev)?);
        let mut d = self.fetch_scaled(size)?;
        if flip_prev == axis.flip() {
            d = (size - d as i32 - 1) as i16;
        }
        Ok((prev as i32 + d as i32) as i16)
    }

    /// Whether `cmp` (fetched) lies in a range of the object frame. `prev`
    /// tests what was drawn last frame.
    pub(crate) fn compare_transform(&mut self, object: usize, axis: Axis, prev: bool) -> Result<bool, GameError> {
        let so = &self.objects[object];
        let (frame, flip, state, pos) = if prev {
            (so.frame_num_prev, so.flip_prev, so.state_prev, axis.prev(so))
        } else {
            (so.frame_num, so.flip, so.state, axis.pos(so))
        };
        let size = axis.size(&self.frame_hdr(frame)?);
        let mut min = self.fetch_scaled(size)?;
        let mut max = self.fetch_scaled(size)?;
        let cmp = self.script.fetch_word()? as i32;
        if flip == axis.flip() {
            min = (size - min as i32) as i16;
            max = (size - max as i32) as i16;
        }
        if max < min {
            std::mem::swap(&mut min, &mut max);
        }
        let pos = pos as i32;
        Ok(state != 0 && pos + min as i32 <= cmp && pos + max as i32 >= cmp)
    }

    /// Position of an object relative to its initial position, modulo `div`.
    pub(crate) fn translate_pos(&self, object: usize, axis: Axis, d1: i32, div: i32, d2: i32) -> Result<i16, GameError> {
        let so = &self.objects[object];
        let di = self.motion(so.motion_num as i32 + so.motion_init as i32)?.first_frame_index as i32
            + so.motion_frame_num as i32;
        let init_frame = self.frame_hdr(di as i16)?;
        let cur_frame = self.frame_hdr(so.frame_num)?;
        let ax = if so.flip == axis.flip() {
            (axis.offset(&init_frame) - axis.offset(&cur_frame) + axis.size(&init_frame) - axis.size(&cur_frame) + d1)
                as i16
        } else {
            (axis.offset(&cur_frame) - axis.offset(&init_frame)) as i16
        };
        let dx = if so.flip_init == axis.flip() { (1 - axis.size(&init_frame) - d1) as i16 } else { 0 };
        let ax = (axis.pos(so) as i32 - axis.init(so) as i32 - dx as i32 - ax as i32 - d2) as i16;
        let mut si = self.script_rem(ax as i32, div)? as i16;
        if si < 0 {
            si = (si as i32 + div) as i16;
        }
        Ok(si)
    }

    /// Switches an object to frame `count1` of motion `count2` (both one
    /// based), keeping the previous frame anchor unless explicit offsets
    /// are given.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_motion_frame(
        &mut self,
        object: usize,
        object2: Option<usize>,
        count1: i32,
        count2: i32,
        dx: Option<i32>,
        dy: Option<i32>,
    ) -> Result<(), GameError> {
        if self.objects[object].state_prev == 0 {
            return Ok(());
        }
        let num = match object2 {
            Some(o2) => self.objects[o2].motion_init as i32,
            None => self.animation(self.object_anim(object)?)?.first_motion_index as i32,
        };
        let motion_num2 = (num + count2 - 1) as i16;
        let frame_num = (self.motion(motion_num2 as i32)?.first_frame_index as i32 + count1 - 1) as i16;
        let so = &self.objects[object];
        let prev = self.frame_hdr(so.frame_num_prev)?;
        let cur = self.frame_hdr(frame_num)?;
        let x = if so.flip_prev == FLIP_X {
            so.x_prev as i32 + prev.x_pos as i32 - dx.unwrap_or(cur.x_pos as i32) + prev.w as i32 - cur.w as i32
        } else {
            so.x_prev as i32 - prev.x_pos as i32 + dx.unwrap_or(cur.x_pos as i32)
        };
        let y = so.y_prev as i32 - prev.y_pos as i32 + dy.unwrap_or(cur.y_pos as i32);
        let so = &mut self.objects[object];
        so.motion_num2 = motion_num2;
        so.frame_num = frame_num;
        so.x = x as i16;
        so.y = y as i16;
        Ok(())
    }

    /// Moves an object to a new motion, snapping the position to a grid
    /// (`kind` 2) or to an absolute coordinate (`kind` 3) on the Y axis.
    /// Returns `false`, leaving the operands unread, when the object was not
    /// drawn last frame.
    pub(crate) fn setup_object_pos(
        &mut self,
        object: usize,
        object2: Option<usize>,
        use_data: bool,
        kind_x: i32,
        kind_y: i32,
    ) -> Result<bool, GameError> {
        let sof = self.frame_hdr(self.objects[object].frame_num_prev)?;
        if self.objects[object].state_prev == 0 {
            return Ok(false);
        }
        let (mut xmin, mut dx) = (0i16, 0i16);
        let (mut ymin, mut dy) = (0i16, 0i16);
        if kind_x == 2 {
            xmin = self.fetch_scaled(sof.w as i32)?;
            let mut xmax = self.fetch_scaled(sof.w as i32)?;
            if xmax < xmin {
                std::mem::swap(&mut xmin, &mut xmax);
            }
            dx = (xmax as i32 - xmin as i32) as i16;
        }
        if kind_y == 2 {
            ymin = self.fetch_scaled(sof.h as i32)?;
            let mut ymax = self.fetch_scaled(sof.h as i32)?;
            if ymax < ymin {
                std::mem::swap(&mut ymin, &mut ymax);
            }
            dy = (ymax as i32 - ymin as i32) as i16;
        }
        let base = match object2 {
            Some(o2) => self.objects[o2].motion_init as i32,
            None => self.animation(self.object_anim(object)?)?.first_motion_index as i32,
        };
        let motion_num2 = (base + self.script.fetch_word()? as i32 - 1) as i16;
        let mut frame_num = self.motion(motion_num2 as i32)?.first_frame_index as i32;
        if use_data {
            frame_num += self.script.fetch_word()? as i32 - 1;
        }
        let frame_num = frame_num as i16;
        let fr = self.frame_hdr(frame_num)?;

        let mut si = (fr.x_pos as i32 - sof.x_pos as i32) as i16;
        if kind_x == 2 {
            si = self.snap(si, xmin, dx)?;
        } else if kind_x == 3 {
            let a0 = self.script.fetch_word()?;
            self.script.fetch_word()?;
            si = (a0 as i32 - sof.x_pos as i32) as i16;
        }
        let mut di = (fr.y_pos as i32 - sof.y_pos as i32) as i16;
        if kind_y == 2 {
            di = self.snap(di, ymin, dy)?;
        } else if kind_y == 3 {
            self.script.fetch_word()?;
            let a2 = self.script.fetch_word()?;
            di = (a2 as i32 - sof.y_pos as i32) as i16;
        }

        let so = &mut self.objects[object];
        so.motion_num2 = motion_num2;
        so.frame_num = frame_num;
        so.x = if so.flip_prev == FLIP_X {
            (so.x_prev as i32 - si as i32 + sof.w as i32 - fr.w as i32) as i16
        } else {
            (so.x_prev as i32 + si as i32) as i16
        };
        so.y = (so.y_prev as i32 + di as i32) as i16;
        Ok(true)
    }

    fn snap(&self, value: i16, min: i16, step: i16) -> Result<i16, GameError> {
        let (min, step) = (min as i32, step as i32);
        let base = self.script_div(min - step + 1, step)? * step;
        let mut v = (base + self.script_rem(value as i32, step)?) as i16;
        if (v as i32) < min {
            v = (v as i32 + step) as i16;
        }
        Ok(v)
    }

    /// Object indices sorted by decreasing depth.
    pub(crate) fn sort_objects(&self) -> Vec<usize> {
        let n = self.objects_count;
        let mut sorted: Vec<usize> = (0..n).collect();
        let mut gap = n / 2;
        while gap > 0 {
            for j in gap..n {
                let mut k = j as isize - gap as isize;
                while k >= 0 {
                    let ku = k as usize;
                    if self.objects[sorted[ku]].z >= self.objects[sorted[ku + gap]].z {
                        break;
                    }
                    sorted.swap(ku, ku + gap);
                    k -= gap as isize;
                }
            }
            gap /= 2;
        }
        sorted
    }

    /// Truncates the tables to the data owned by animations `0..=anim`, or
    /// empties them with `-1`.
    pub(crate) fn clear_scene_data(&mut self, anim: i32) -> Result<(), GameError> {
        tracing::debug!(target: "bermuda::game", anim, "clear scene data");
        if anim == -1 {
            self.next_scenes.clear();
            self.sounds.clear();
            self.animations.clear();
            self.objects_count = 0;
            self.motions.clear();
            self.frames.clear();
            self.load_data_state = 0;
        } else {
            let a = checked(anim, self.animations.len(), "animations")?;
            self.animations.truncate(a + 1);
            let sa = &self.animations[a];
            let motions_count = (sa.first_motion_index as i32 + sa.motions_count as i32).max(0) as usize;
            let objects_count = (sa.first_object_index as i32 + sa.objects_count as i32).max(0) as usize;
            let sounds_count = (sa.first_sound_buffer_index as i32 + sa.sound_buffers_count as i32).max(0) as usize;
            self.motions.truncate(motions_count);
            let frames_count = self
                .motions
                .last()
                .map_or(0, |m| (m.first_frame_index as i32 + m.count as i32).max(0) as usize);
            self.frames.truncate(frames_count);
            self.objects_count = objects_count.min(NUM_SCENE_OBJECTS);
            self.sounds.truncate(sounds_count);
            self.next_scenes.clear();
            self.load_data_state = 2;
        }
        self.win16_snd_play_sound(7, None)?;
        for so in &mut self.objects[self.objects_count..] {
            so.state = 0;
            so.vars = [0; 10];
        }
        self.boxes_count[..BOXES_PER_GROUP].fill(0);
        Ok(())
    }

    /// Restarts an inactive object according to its init mode.
    pub(crate) fn reinitialize_object(&mut self, object: usize) -> Result<(), GameError> {
        let so = &self.objects[object];
        if so.state == 1 || so.state == 2 {
            return Ok(());
        }
        let state = match so.mode {
            1 => 1,
            2 => {
                let rnd = self.rnd.next_number() as i16 as i32;
                let t = rnd * self.objects[object].mode_rnd_mul as i32 / 0x8000;
                if t & 0xFFFF == 0 {
                    1
                } else {
                    0
                }
            }
            3 => 2,
            _ => 0,
        };
        if state == 0 {
            return Ok(());
        }
        let so = &self.objects[object];
        let motion = so.motion_num as i32 + so.motion_init as i32;
        let frame_num = (self.motion(motion)?.first_frame_index as i32 + so.motion_frame_num as i32) as i16;
        let fr = self.frame_hdr(frame_num)?;
        let so = &mut self.objects[object];
        so.x = so.x_init;
        so.y = so.y_init;
        so.z = so.z_init;
        so.z_prev = so.z_init;
        so.flip = so.flip_init;
        so.flip_prev = so.flip_init;
        so.motion_num1 = motion as i16;
        so.motion_num2 = motion as i16;
        so.frame_num = frame_num;
        if so.flip == FLIP_X {
            so.x = (so.x as i32 - (fr.w as i32 - 1)) as i16;
        }
        if so.flip == FLIP_Y {
            so.y = (so.y as i32 - (fr.h as i32 - 1)) as i16;
        }
        if so.state == 0 {
            so.x_prev = so.x;
            so.y_prev = so.y;
            so.frame_num_prev = so.frame_num;
        }
        so.state = state;
        so.state_prev = state;
        Ok(())
    }

    /// Draws the frame then advances animated objects to their next frame.
    pub(crate) fn update_objects(&mut self) -> Result<(), GameError> {
        self.redraw_objects()?;
        for so in &mut self.objects[..self.objects_count] {
            if so.state == -1 {
                so.state = 0;
            }
        }
        for i in 0..self.objects_count {
            let so = &mut self.objects[i];
            so.state_prev = so.state;
            if so.state != 1 {
                continue;
            }
            so.motion_num1 = so.motion_num2;
            so.flip_prev = so.flip;
            so.z_prev = so.z;
            so.x_prev = so.x;
            so.y_prev = so.y;
            so.frame_num_prev = so.frame_num;
            let (fnp, mn2) = (so.frame_num_prev, so.motion_num2);
            let prev = self.frame_hdr(fnp)?;
            let frame_num = (prev.num as i32 + self.motion(mn2 as i32)?.first_frame_index as i32) as i16;
            let cur = self.frame_hdr(frame_num)?;
            let dx = prev.x_pos as i32 - cur.x_pos as i32;
            let dy = prev.y_pos as i32 - cur.y_pos as i32;
            let so = &mut self.objects[i];
            so.frame_num = frame_num;
            if so.flip == FLIP_X {
                so.x = (so.x as i32 + dx + prev.w as i32 - cur.w as i32) as i16;
            } else {
                so.x = (so.x as i32 - dx) as i16;
            }
            so.y = (so.y as i32 - dy) as i16;
        }
        Ok(())
    }

    /// Runs the scripts of every active object, then applies the frame
    /// outcome: scene switch, object restarts, game over and ending.
    pub(crate) fn run_objects_script(&mut self) -> Result<(), GameError> {
        self.script.next_scene = None;
        if self.vars[309] != 0 {
            self.keys_pressed = [0; 128];
        }
        if self.load_data_state == 2 {
            let start = if self.workaround_raft { 1 } else { 0 };
            self.workaround_raft = false;
            for i in start..self.objects_count {
                let so = &self.objects[i];
                if so.state_prev == 0 || so.state_prev == -1 {
                    continue;
                }
                let anim = self.object_anim(i)?;
                let script = self.animation(anim)?.script.clone();
                self.run_object_script(i, script)?;
            }
            self.dialogue_ended_flag = 0;
            if let Some(next) = self.script.next_scene.and_then(|n| self.next_scenes.get(n)) {
                self.next_scene_file = next.name.clone();
                self.switch_scene = true;
            }
            for i in 0..self.objects_count {
                self.reinitialize_object(i)?;
            }
            if self.vars[0] >= 10 && !self.game_over {
                self.music_name = GAME_OVER_MUSIC.to_string();
                self.play_music(GAME_OVER_MUSIC);
                self.game_over = true;
                tracing::info!(target: "bermuda::info", "game over");
            }
            if self.load_data_state == 2 {
                self.update_objects()?;
            }
        }
        if self.vars[241] == 1 {
            self.stop_music();
            self.clear_scene_data(-1)?;
            self.vars[241] = 2;
            self.play_video("DATA/FINAL.AVI")?;
            self.next_scene_file = "END.SCN".to_string();
            self.switch_scene = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixture::{scene, Asm, FRAME_W};
    use crate::game::state::NextScene;

    #[test]
    fn test_reinitialize_object_modes() {
        let mut game = scene(&["SIMPLE", "PUT", "NONE", "RANDOM", "SHOWN"], Asm::new().build());
        for (i, mode) in [1, 3, 0, 2, 3].into_iter().enumerate() {
            let so = &mut game.objects[i];
            so.mode = mode;
            so.x = 5;
            if i != 4 {
                so.state = 0;
                so.state_prev = 0;
            }
        }
        game.objects[0].x_init = 120;
        game.objects[0].motion_num = 1;
        game.objects[1].flip_init = FLIP_X;
        game.objects[3].mode_rnd_mul = 0;

        for i in 0..5 {
            game.reinitialize_object(i).unwrap();
        }
        let simple = &game.objects[0];
        assert_eq!((simple.state, simple.state_prev), (1, 1));
        assert_eq!((simple.x, simple.x_prev), (120, 120));
        assert_eq!((simple.frame_num, simple.motion_num1, simple.motion_num2), (2, 1, 1));

        let put = &game.objects[1];
        assert_eq!((put.state, put.state_prev), (2, 2));
        assert_eq!(put.x, 200 - (FRAME_W - 1));
        assert_eq!(put.flip, FLIP_X);

        assert_eq!(game.objects[2].state, 0);
        assert_eq!(game.objects[3].state, 1);
        // visible objects are left alone
        assert_eq!((game.objects[4].state, game.objects[4].x), (1, 5));
    }

    #[test]
    fn test_reinitialize_rejects_missing_motion() {
        let mut game = scene(&["JACK"], Asm::new().build());
        game.objects[0].state = 0;
        game.objects[0].motion_num = 5;
        assert!(matches!(
            game.reinitialize_object(0),
            Err(GameError::Index { table: "motions", index: 5 })
        ));
    }

    #[test]
    fn test_update_objects_advances_frames() {
        let mut game = scene(&["JACK", "STILL"], Asm::new().build());
        game.objects[1].state = 2;
        game.update_objects().unwrap();
        let jack = &game.objects[0];
        assert_eq!((jack.frame_num_prev, jack.frame_num), (0, 1));
        // second frame is anchored two pixels further right
        assert_eq!((jack.x_prev, jack.x), (100, 102));
        assert_eq!(game.objects[1].frame_num, 0);

        game.update_objects().unwrap();
        assert_eq!((game.objects[0].frame_num, game.objects[0].x), (0, 100));

        game.objects[0].frame_num = 7;
        assert!(matches!(
            game.update_objects(),
            Err(GameError::Index { table: "frames", index: 7 })
        ));
    }

    #[test]
    fn test_scripts_switch_scene() {
        let script = Asm::new().statement(&[10], &[30000, 1]).build();
        let mut game = scene(&["JACK"], script);
        game.next_scenes = vec![NextScene { num: 1, name: "_02.SCN".to_string() }];
        game.run_objects_script().unwrap();
        assert!(game.switch_scene);
        assert_eq!(game.next_scene_file, "_02.SCN");
        assert_eq!(game.objects[0].frame_num, 1);
    }

    #[test]
    fn test_scripts_skip_inactive_objects() {
        let script = Asm::new().statement(&[10], &[6000, 0, 1, 5]).build();
        let mut game = scene(&["JACK", "GHOST", "DOOR"], script);
        game.objects[1].state = 0;
        game.objects[1].state_prev = 0;
        game.objects[1].mode = 0;
        game.run_objects_script().unwrap();
        assert_eq!(game.vars[0], 10);
    }

    #[test]
    fn test_game_over_at_ten() {
        let script = Asm::new().statement(&[10], &[6000, 0, 1, 5]).build();
        let mut game = scene(&["JACK"], script);
        game.run_objects_script().unwrap();
        assert!(!game.game_over);

        game.run_objects_script().unwrap();
        assert!(game.game_over);
        assert_eq!(game.music_name, GAME_OVER_MUSIC);
        assert!(game.music_file.as_ref().is_some_and(|p| p.ends_with("track11.ogg")));

        game.music_file = None;
        game.run_objects_script().unwrap();
        assert!(game.music_file.is_none());
    }

    #[test]
    fn test_ending_variable() {
        let mut game = scene(&["JACK"], Asm::new().build());
        game.vars[241] = 1;
        game.run_objects_script().unwrap();
        assert_eq!(game.vars[241], 2);
        assert!(game.switch_scene);
        assert_eq!(game.next_scene_file, "END.SCN");
        assert!(game.animations.is_empty());
        assert_eq!((game.objects_count, game.load_data_state), (0, 0));
    }

    #[test]
    fn test_sort_objects_by_depth() {
        let mut game = scene(&["A", "B", "C", "D", "E"], Asm::new().build());
        for (i, z) in [1, 5, 3, 5, 9].into_iter().enumerate() {
            game.objects[i].z = z;
        }
        game.objects_count = 4;
        let sorted = game.sort_objects();
        assert_eq!(sorted.len(), 4);
        let depths: Vec<i16> = sorted.iter().map(|&i| game.objects[i].z).collect();
        assert_eq!(depths, vec![5, 5, 3, 1]);
        assert_eq!(sorted[2], 2);
    }

    #[test]
    fn test_clear_scene_data_truncates_tables() {
        let mut game = scene(&["A", "B", "C"], Asm::new().build());
        game.animations[0].objects_count = 2;
        game.animations[0].sound_buffers_count = 1;
        let mut second = game.animations[0].clone();
        second.first_motion_index = 2;
        second.motions_count = 1;
        second.first_object_index = 2;
        second.objects_count = 1;
        second.first_sound_buffer_index = 1;
        game.animations.push(second);
        game.motions.push(SceneObjectMotion { first_frame_index: 3, count: 1, anim_num: 1 });
        game.frames.push(game.frames[2].clone());
        game.sounds = vec!["a.wav".to_string(), "b.wav".to_string()];
        game.objects[2].vars = [4; 10];
        game.next_scenes = vec![NextScene { num: 1, name: "B.SCN".to_string() }];
        game.boxes_count[0] = 3;
        game.boxes_count[BOXES_PER_GROUP] = 2;

        game.clear_scene_data(0).unwrap();
        assert_eq!(game.animations.len(), 1);
        assert_eq!((game.motions.len(), game.frames.len(), game.sounds.len()), (2, 3, 1));
        assert_eq!(game.objects_count, 2);
        assert_eq!((game.objects[2].state, game.objects[2].vars), (0, [0; 10]));
        assert!(game.next_scenes.is_empty());
        assert_eq!(game.load_data_state, 2);
        assert_eq!((game.boxes_count[0], game.boxes_count[BOXES_PER_GROUP]), (0, 2));

        assert!(matches!(
            game.clear_scene_data(3),
            Err(GameError::Index { table: "animations", index: 3 })
        ));

        game.clear_scene_data(-1).unwrap();
        assert!(game.animations.is_empty() && game.motions.is_empty() && game.frames.is_empty());
        assert_eq!((game.objects_count, game.load_data_state), (0, 0));
    }
}
