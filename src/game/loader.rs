//! Scene loading
//!
//! Wires the SCN parser to the engine tables and loads the MOV, SPR and
//! WGP files it references.

use std::sync::Arc;

use crate::resource::{self, load_wgp, spr_path_for_mov, ResourceError};
use crate::scene::{parse_scn, ParseError, SceneHost};
use crate::system::SystemStub;
use crate::text::{decode_latin1, strip_comments};

use super::state::{
    BagObject, NextScene, SceneAnimation, SceneBox, SceneObject, SceneObjectMotion, SceneObjectStatus,
    BOXES_PER_GROUP, NUM_BAG_OBJECTS, NUM_BOXES, NUM_NEXT_SCENES, NUM_SCENE_ANIMATIONS, NUM_SCENE_MOTIONS,
    NUM_SCENE_OBJECTS, NUM_SCENE_OBJECT_FRAMES, NUM_SOUND_BUFFERS,
};
use super::{index_error, Game, GameError};

impl<S: SystemStub> Game<S> {
    pub(crate) fn parse_scene(&mut self, name: &str) -> Result<(), GameError> {
        let mut data = self.fs.read(name)?;
        strip_comments(&mut data);
        let text = decode_latin1(&data);
        parse_scn(&text, self)?;
        tracing::debug!(
            target: "bermuda::game",
            scene = name,
            number = self.scene_number,
            objects = self.objects_count,
            animations = self.animations.len(),
            "scene parsed"
        );
        Ok(())
    }

    /// Loads a WGP as the scene background and palette.
    fn load_background(&mut self, name: &str) -> Result<(), GameError> {
        let bg = load_wgp(&self.fs.read(name)?)?;
        tracing::debug!(
            target: "bermuda::resource",
            name,
            width = bg.bitmap.width(),
            height = bg.bitmap.height(),
            "background loaded"
        );
        self.palette = bg.palette;
        self.frame = bg.bitmap.clone();
        self.background = bg.bitmap;
        self.load_data_state = 1;
        Ok(())
    }

    /// Appends a MOV file and its sprite bank as a new animation.
    pub(crate) fn load_mov(&mut self, name: &str) -> Result<(), GameError> {
        let mov = resource::load_mov(&self.fs.read(name)?)?;
        if self.animations.len() >= NUM_SCENE_ANIMATIONS {
            return Err(GameError::TableFull("animations"));
        }
        if self.load_data_state == 0 {
            self.load_background(&mov.wgp_name)?;
            self.current_scene_wgp = mov.wgp_name.clone();
            self.frames.clear();
            self.motions.clear();
            self.objects_count = 0;
            self.objects.iter_mut().for_each(|so| so.vars = [0; 10]);
        }
        let anim_num = self.animations.len() as i16;

        let first_sound = self.sounds.len();
        if first_sound + mov.sounds.len() > NUM_SOUND_BUFFERS {
            return Err(GameError::TableFull("sounds"));
        }
        let sounds_count = mov.sounds.len();
        self.sounds.extend(mov.sounds);

        for b in &mov.boxes {
            if b.group >= NUM_BOXES {
                return Err(index_error("boxes", b.group as i64));
            }
            let count = self.boxes_count[b.group];
            if count >= BOXES_PER_GROUP {
                return Err(GameError::TableFull("boxes"));
            }
            let slot = &mut self.boxes[b.group][count];
            slot.state = b.state;
            slot.x1 = b.x1;
            slot.y1 = b.y1;
            slot.x2 = b.x2;
            slot.y2 = b.y2;
            self.boxes_count[b.group] += 1;
        }

        let first_object = self.objects_count;
        let motion_init = self.motions.len() as i16;
        for o in mov.objects {
            if self.objects_count >= NUM_SCENE_OBJECTS {
                return Err(GameError::TableFull("objects"));
            }
            if self.objects[..self.objects_count].iter().any(|so| so.name == o.name) {
                return Err(ResourceError::DuplicateObject(o.name).into());
            }
            let so = &mut self.objects[self.objects_count];
            so.name = o.name;
            so.class_name = o.class_name;
            so.motion_frame_num = o.motion_frame_num;
            so.motion_num = o.motion_num;
            so.flip_init = o.flip_init;
            so.z_init = o.z_init;
            so.x_init = o.x_init;
            so.y_init = o.y_init;
            so.mode = o.mode;
            if o.mode == 2 {
                so.mode_rnd_mul = o.mode_rnd_mul;
            }
            so.state_prev = 0;
            so.state = 0;
            so.motion_init = motion_init;
            for (var, value) in o.vars {
                so.vars[var] = value;
            }
            self.objects_count += 1;
        }

        let spr_path = spr_path_for_mov(name, &mov.spr_name);
        let bank = resource::load_spr(&self.fs.read(&spr_path)?)?;
        let first_motion = self.motions.len();
        if first_motion + bank.motions.len() > NUM_SCENE_MOTIONS {
            return Err(GameError::TableFull("motions"));
        }
        if self.frames.len() + bank.frames_count() > NUM_SCENE_OBJECT_FRAMES {
            return Err(GameError::TableFull("frames"));
        }
        let motions_count = bank.motions.len();
        for frames in bank.motions {
            self.motions.push(SceneObjectMotion {
                first_frame_index: self.frames.len() as i16,
                count: frames.len() as i16,
                anim_num,
            });
            self.frames.extend(frames);
        }

        self.animations.push(SceneAnimation {
            name: name.to_ascii_lowercase(),
            first_motion_index: first_motion as i16,
            motions_count: motions_count as i16,
            first_object_index: first_object as i16,
            objects_count: (self.objects_count - first_object) as i16,
            first_sound_buffer_index: first_sound as i16,
            sound_buffers_count: sounds_count as i16,
            script: Arc::from(mov.script),
            unk26: mov.unk26,
        });
        self.load_data_state = 2;
        tracing::debug!(
            target: "bermuda::resource",
            name,
            anim = anim_num,
            motions = motions_count,
            objects = self.objects_count - first_object,
            "mov loaded"
        );
        Ok(())
    }

    /// Animation owning an object slot.
    fn owning_animation(&self, index: usize) -> Option<usize> {
        self.animations.iter().position(|sa| {
            let first = sa.first_object_index as usize;
            index >= first && index < first + sa.objects_count as usize
        })
    }
}

impl<S: SystemStub> SceneHost for Game<S> {
    type Error = GameError;

    fn begin_scene(&mut self) {
        self.scene_number = 0;
        self.default_vars = self.vars;
    }

    fn var(&self, index: usize) -> i16 {
        self.vars.get(index).copied().unwrap_or(0)
    }

    fn scene_number(&self) -> i16 {
        self.scene_number
    }

    fn set_scene_number(&mut self, num: i16) {
        self.scene_number = num;
    }

    fn animations_count(&self) -> usize {
        self.animations.len()
    }

    fn animation_name(&self, index: usize) -> Option<&str> {
        self.animations.get(index).map(|sa| sa.name.as_str())
    }

    fn clear_scene_data(&mut self, anim: i32) -> Result<(), GameError> {
        Game::clear_scene_data(self, anim)
    }

    fn set_load_data_state(&mut self, state: u8) {
        self.load_data_state = state;
    }

    fn load_mov(&mut self, name: &str) -> Result<(), GameError> {
        Game::load_mov(self, name)
    }

    fn load_screen(&mut self, name: &str) -> Result<(), GameError> {
        self.boxes_count[..BOXES_PER_GROUP].fill(0);
        self.load_background(name)?;
        self.current_scene_wgp = name.to_string();
        self.load_data_state = if self.objects_count == 0 { 1 } else { 2 };
        Ok(())
    }

    fn set_music(&mut self, name: Option<&str>) -> Result<(), GameError> {
        match name {
            None => self.stop_music(),
            Some(name) => {
                if name != self.music_name {
                    self.play_music(name);
                }
                self.music_name = name.to_string();
            }
        }
        Ok(())
    }

    fn set_music_track(&mut self, track: i32) {
        self.music_track = track;
    }

    fn find_object(&self, name: &str) -> Option<usize> {
        self.objects[..self.objects_count]
            .iter()
            .position(|so| so.name.eq_ignore_ascii_case(name))
    }

    fn object_mut(&mut self, index: usize) -> &mut SceneObject {
        &mut self.objects[index]
    }

    fn object_animation(&self, index: usize) -> i32 {
        let motion_init = self.objects[index].motion_init;
        match usize::try_from(motion_init).ok().and_then(|m| self.motions.get(m)) {
            Some(motion) => motion.anim_num as i32,
            None => self.owning_animation(index).map_or(i32::MAX, |a| a as i32),
        }
    }

    fn object_status(&self, index: usize) -> Option<SceneObjectStatus> {
        self.statuses.get(index).copied()
    }

    fn set_bag_position(&mut self, x: i32, y: i32) {
        self.bag_pos_x = x as i16;
        self.bag_pos_y = y as i16;
    }

    fn has_bag_object(&self, name: &str) -> bool {
        self.find_bag_object(name).is_some()
    }

    fn add_bag_object(&mut self, name: &str, file: &str) -> Result<(), GameError> {
        if self.bag.len() >= NUM_BAG_OBJECTS {
            return Err(ParseError::TooManyBagObjects.into());
        }
        let data = self.fs.read(file)?;
        self.bag.push(BagObject { name: name.to_string(), data });
        Ok(())
    }

    fn add_next_scene(&mut self, num: i16, name: String) -> Result<(), GameError> {
        if self.next_scenes.len() >= NUM_NEXT_SCENES {
            return Err(ParseError::TooManyNextScenes.into());
        }
        self.next_scenes.push(NextScene { num, name });
        Ok(())
    }

    fn box_count(&self, group: usize) -> usize {
        self.boxes_count[group]
    }

    fn box_slot(&self, group: usize, index: usize) -> SceneBox {
        self.boxes[group][index]
    }

    fn push_box(&mut self, group: usize, b: SceneBox) {
        let count = self.boxes_count[group];
        self.boxes[group][count] = b;
        self.boxes_count[group] = count + 1;
    }
}
