//! Dialogue frames
//!
//! While a dialogue runs the scene is frozen: the objects are drawn at their
//! previous positions, the dialogue area is darkened and the speaker
//! animation is drawn in a frame next to the choices. Choice text is left to
//! the frontend, see [`Game::dialogue_choices`].

use crate::bitmap::{copy_buffer_to_buffer, draw_object, draw_object_vertical_flip, sprite_height, sprite_width};
use crate::decoder::decode_lzss;
use crate::dialogue::{parse_dlg, Dialogue, DialogueEvent};
use crate::resource::load_dialogue_sprites;
use crate::system::{SystemStub, DIR_DOWN, DIR_UP};
use crate::text::{decode_latin1, strip_comments};
use crate::util::Rect;

use super::state::FLIP_X;
use super::{Game, GameError, Mode};

const DIALOGUE_MUSIC: &str = "..\\midi\\sadialog.mid";
const FRAME_SPRITE: &str = "..\\wgp\\frame.spr";
const KISS_SPRITE: &str = "..\\wgp\\kiss.spr";

/// Darkened screen area behind the speaker frame and the choices.
const BACKGROUND_RECT: Rect = Rect { x: 33, y: 165, w: 574, h: 150 };

/// Kiss animation slot.
const KISS: usize = 2;

/// Dialogue requested by script operator 25000.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DialogueRequest {
    pub(crate) id: String,
    pub(crate) file: String,
    pub(crate) sprite1: String,
    pub(crate) sprite2: String,
}

/// Resources of the running dialogue.
#[derive(Debug, Clone)]
pub(crate) struct Conversation {
    pub(crate) dialogue: Dialogue,
    /// Raw `frame.spr`.
    frame_sprite: Vec<u8>,
    /// Packed frames of Jack, the other speaker and the kiss.
    sprites: [Vec<Vec<u8>>; 3],
    current_frames: [usize; 3],
    /// Where the choices go, updated with the speaker frame.
    pub(crate) text_rect: Rect,
}

/// Speaker frame x position and the matching text area.
fn frame_layout(num: usize, frame_w: i32) -> (i32, Rect) {
    let bg = BACKGROUND_RECT;
    let (frame_x, text_x) = match num {
        0 => {
            let x = bg.x + 13;
            (x, x + frame_w + 10)
        }
        1 => (bg.x + bg.w - frame_w - 13, bg.x + 10),
        _ => (bg.x + (bg.w - frame_w) / 2, bg.x),
    };
    let text = Rect::new(text_x, bg.y + 10, bg.w - 10 - frame_w - 13, bg.h - 20);
    (frame_x, text)
}

impl<S: SystemStub> Game<S> {
    pub(crate) fn init_dialogue(&mut self) -> Result<(), GameError> {
        self.play_music(DIALOGUE_MUSIC);
        let request = self.dialogue_request.clone();
        let frame_sprite = self.fs.read(FRAME_SPRITE)?;
        let sprites = [
            load_dialogue_sprites(&self.fs.read(&request.sprite1)?)?,
            load_dialogue_sprites(&self.fs.read(&request.sprite2)?)?,
            load_dialogue_sprites(&self.fs.read(KISS_SPRITE)?)?,
        ];
        let mut data = self.fs.read(&request.file)?;
        strip_comments(&mut data);
        let mut dialogue = Dialogue::new(parse_dlg(&decode_latin1(&data))?);
        let event = dialogue.setup(&request.id);
        tracing::debug!(
            target: "bermuda::dialogue",
            id = %request.id,
            file = %request.file,
            choices = dialogue.choice_count(),
            "init dialogue"
        );
        self.conversation = Some(Conversation {
            dialogue,
            frame_sprite,
            sprites,
            current_frames: [0; 3],
            text_rect: BACKGROUND_RECT,
        });
        self.dialogue_event(event)?;

        let input = self.stub.input_mut();
        input.dir_mask = 0;
        input.escape = false;
        input.enter = false;
        self.mode = Mode::Dialogue;
        Ok(())
    }

    fn dialogue_event(&mut self, event: DialogueEvent) -> Result<(), GameError> {
        match event {
            DialogueEvent::PlaySpeech(file) => {
                self.win16_snd_play_sound(3, Some(&file))?;
            }
            DialogueEvent::StopSpeech => {
                self.win16_snd_play_sound(6, None)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// One dialogue frame. Switches back to [`Mode::Game`] once the
    /// dialogue is over.
    pub(crate) fn handle_dialogue(&mut self) -> Result<(), GameError> {
        let pi = self.stub.input().clone();
        let Some(conv) = self.conversation.as_mut() else {
            self.mode = Mode::Game;
            return Ok(());
        };
        if pi.dir_mask & DIR_DOWN != 0 {
            conv.dialogue.move_down();
        }
        if pi.dir_mask & DIR_UP != 0 {
            conv.dialogue.move_up();
        }
        self.stub.input_mut().dir_mask &= !(DIR_DOWN | DIR_UP);
        if pi.escape {
            self.stub.input_mut().escape = false;
            self.mode = Mode::Game;
            return Ok(());
        }
        if pi.enter {
            self.stub.input_mut().enter = false;
            let event = conv.dialogue.confirm();
            self.dialogue_event(event)?;
        }
        let selected = self.conversation.as_ref().map_or(false, |c| c.dialogue.selected);
        if selected && self.win16_snd_play_sound(22, None)? {
            let event = match self.conversation.as_mut() {
                Some(conv) => conv.dialogue.speech_finished(),
                None => DialogueEvent::Leave,
            };
            tracing::debug!(target: "bermuda::dialogue", ?event, "speech finished");
            match event {
                DialogueEvent::Leave => {
                    self.mode = Mode::Game;
                    return Ok(());
                }
                DialogueEvent::Ended(id) => {
                    self.dialogue_ended_flag = 1;
                    self.last_dialogue_ended_id = id;
                    self.mode = Mode::Game;
                    return Ok(());
                }
                event => self.dialogue_event(event)?,
            }
        }

        self.redraw_dialogue_background()?;
        let sprite_index = self.conversation.as_ref().map_or(0, |c| c.dialogue.sprite_index);
        self.redraw_dialogue_sprite(sprite_index)?;
        if sprite_index == KISS && self.conversation.as_ref().map_or(true, |c| c.current_frames[KISS] == 0) {
            self.dialogue_ended_flag = 1;
            self.mode = Mode::Game;
        }
        Ok(())
    }

    pub(crate) fn fini_dialogue(&mut self) -> Result<(), GameError> {
        self.conversation = None;
        let music = self.music_name.clone();
        self.play_music(&music);
        self.keys_pressed = [0; 128];
        tracing::debug!(
            target: "bermuda::dialogue",
            ended = self.dialogue_ended_flag,
            id = self.last_dialogue_ended_id,
            "fini dialogue"
        );
        Ok(())
    }

    /// Draws the objects as they were before the dialogue started and
    /// darkens the dialogue area.
    fn redraw_dialogue_background(&mut self) -> Result<(), GameError> {
        let sorted = self.sort_objects();
        let mut previous = None;
        for (i, &index) in sorted.iter().enumerate() {
            let so = &self.objects[index];
            if so.state_prev != 1 && so.state_prev != 2 {
                continue;
            }
            if let Some(p) = previous {
                self.redraw_object_boxes(&sorted, p, i);
            }
            previous = Some(i);
            let so = &self.objects[index];
            let (x, y, flip, frame_num) = (so.x_prev as i32, so.y_prev as i32, so.flip_prev, so.frame_num_prev);
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

        let bg = BACKGROUND_RECT;
        let frame_h = self.frame.height() as i32;
        if frame_h >= bg.y + bg.h && self.frame.width() as i32 >= bg.x + bg.w {
            let start = (frame_h - bg.y - bg.h) as usize * self.frame.pitch as usize + bg.x as usize;
            let pitch = self.frame.pitch as usize;
            self.stub.copy_rect(bg.x, bg.y, bg.w, bg.h, &self.frame.bits[start..], pitch, false);
        }
        self.stub.darken_rect(bg.x, bg.y, bg.w, bg.h);

        for &index in &sorted {
            let so = &self.objects[index];
            if so.state_prev != 1 {
                continue;
            }
            let hdr = self.frame_hdr(so.frame_num_prev)?;
            let y = self.frame.h as i32 + 1 - so.y_prev as i32 - hdr.h as i32;
            copy_buffer_to_buffer(so.x_prev as i32, y, hdr.w as i32, hdr.h as i32, &self.background, &mut self.frame);
        }
        Ok(())
    }

    /// Draws the speaker frame and the next frame of animation `num`.
    fn redraw_dialogue_sprite(&mut self, num: usize) -> Result<(), GameError> {
        let num = num.min(KISS);
        let Some(conv) = self.conversation.as_mut() else {
            return Ok(());
        };
        let frame = decode_lzss(conv.frame_sprite.get(2..).unwrap_or(&[]))?;
        let (fw, fh) = (sprite_width(&frame) as i32, sprite_height(&frame) as i32);
        let (mut x, text_rect) = frame_layout(num, fw);
        conv.text_rect = text_rect;
        let mut y = BACKGROUND_RECT.y + (BACKGROUND_RECT.h - fh) / 2;
        self.stub.copy_rect(x, y, fw, fh, frame.get(4..).unwrap_or(&[]), fw as usize, false);

        let frames = &conv.sprites[num];
        if frames.is_empty() {
            return Ok(());
        }
        let current = conv.current_frames[num] % frames.len();
        let sprite = decode_lzss(&frames[current])?;
        let (sw, sh) = (sprite_width(&sprite) as i32, sprite_height(&sprite) as i32);
        x += (fw - sw) / 2;
        y += (fh - sh) / 2;
        self.stub.copy_rect(x, y, sw, sh, sprite.get(4..).unwrap_or(&[]), sw as usize, false);
        conv.current_frames[num] = (current + 1) % frames.len();
        Ok(())
    }

    /// Choices offered by the running dialogue and the highlighted one.
    pub fn dialogue_choices(&self) -> Option<(Vec<&str>, usize)> {
        let conv = self.conversation.as_ref()?;
        let texts = conv.dialogue.choices().map(|c| c.text.as_str()).collect();
        Some((texts, conv.dialogue.speech_index))
    }

    /// Screen area where the frontend draws the choices.
    pub fn dialogue_text_rect(&self) -> Option<Rect> {
        self.conversation.as_ref().map(|c| c.text_rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let (x, text) = frame_layout(0, 100);
        assert_eq!(x, 46);
        assert_eq!(text.x, 156);
        assert_eq!(text.w, 574 - 10 - 100 - 13);
        assert_eq!((text.y, text.h), (175, 130));

        let (x, text) = frame_layout(1, 100);
        assert_eq!(x, 33 + 574 - 100 - 13);
        assert_eq!(text.x, 43);

        let (x, text) = frame_layout(KISS, 100);
        assert_eq!(x, 33 + 237);
        assert_eq!(text.x, 33);
    }

    #[test]
    fn test_default_request_is_empty() {
        let request = DialogueRequest::default();
        assert!(request.id.is_empty() && request.file.is_empty());
    }
}
