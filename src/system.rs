//! Platform abstraction
//!
//! The engine draws through [`SystemStub`] and polls [`PlayerInput`] from it.
//! [`HeadlessStub`] keeps an RGB frame buffer in memory, advances a virtual
//! clock on `sleep` and drains the mixer at the output rate, which is enough
//! to run scenes without a window and to compare rendered frames.

use serde::Serialize;
use std::collections::VecDeque;

use crate::bitmap::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::hashing::sha256_hex;
use crate::mixer::Mixer;
use crate::util::Rect;

pub const DIR_UP: u8 = 1 << 0;
pub const DIR_DOWN: u8 = 1 << 1;
pub const DIR_LEFT: u8 = 1 << 2;
pub const DIR_RIGHT: u8 = 1 << 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerInput {
    pub dir_mask: u8,
    /// use, current action
    pub enter: bool,
    /// take gun, shoot
    pub space: bool,
    /// put back gun, run
    pub shift: bool,
    /// toggle the life bar
    pub ctrl: bool,
    /// toggle the bag window
    pub tab: bool,
    pub escape: bool,
    pub left_mouse_button: bool,
    pub right_mouse_button: bool,
    pub mouse_x: i32,
    pub mouse_y: i32,
    pub save: bool,
    pub load: bool,
    /// Relative slot change requested by the player.
    pub state_slot: i32,
    pub fast_mode: bool,
}

pub trait SystemStub {
    /// `pal` holds `n` BGRA entries.
    fn set_palette(&mut self, pal: &[u8], n: usize);
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u8);
    /// Copies a bottom-up 8-bit buffer to the screen at `(x, y)`, color 0 is
    /// skipped when `transparent` is set.
    fn copy_rect(&mut self, x: i32, y: i32, w: i32, h: i32, buf: &[u8], pitch: usize, transparent: bool);
    fn darken_rect(&mut self, x: i32, y: i32, w: i32, h: i32);
    fn update_screen(&mut self);

    /// Switches between the paletted screen and a `w`x`h` YUY2 overlay.
    fn set_yuv(&mut self, enabled: bool, w: usize, h: usize);
    fn copy_yuv(&mut self, buf: &[u8], pitch: usize);

    fn process_events(&mut self);
    fn sleep(&mut self, ms: u32);
    fn time_stamp(&self) -> u32;

    fn input(&self) -> &PlayerInput;
    fn input_mut(&mut self) -> &mut PlayerInput;
    fn quit_requested(&self) -> bool;

    /// Hands the mixer to the audio backend.
    fn start_audio(&mut self, mixer: Mixer);
    fn stop_audio(&mut self);
    fn output_sample_rate(&self) -> u32;
}

fn clip(x: &mut i32, y: &mut i32, w: &mut i32, h: &mut i32, screen_w: i32, screen_h: i32) -> bool {
    let mut r = Rect::new(*x, *y, *w, *h);
    if !r.clip_to(&Rect::new(0, 0, screen_w, screen_h)) {
        return false;
    }
    // source rows are consumed from the original rectangle origin
    *x = r.x;
    *y = r.y;
    *w = r.w;
    *h = r.h;
    true
}

/// Summary of a presented frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRecord {
    pub index: u64,
    pub time_ms: u32,
    pub yuv: bool,
    pub sha256: String,
}

/// Scripted input applied once `at_frame` frames have been presented.
#[derive(Debug, Clone)]
pub struct ScheduledInput {
    pub at_frame: u64,
    pub input: PlayerInput,
}

#[derive(Debug)]
pub struct HeadlessStub {
    palette: [[u8; 3]; 256],
    screen: Vec<[u8; 3]>,
    yuv: Option<(usize, usize)>,
    yuv_frame: Vec<u8>,
    pi: PlayerInput,
    scheduled: VecDeque<ScheduledInput>,
    quit_at_frame: Option<u64>,
    quit: bool,
    now_ms: u32,
    frames: Vec<FrameRecord>,
    keep_frames: usize,
    mixer: Option<Mixer>,
    output_rate: u32,
    mixed_samples: u64,
}

impl Default for HeadlessStub {
    fn default() -> Self {
        Self::new(22050)
    }
}

impl HeadlessStub {
    pub fn new(output_rate: u32) -> Self {
        Self {
            palette: [[0; 3]; 256],
            screen: vec![[0; 3]; SCREEN_WIDTH * SCREEN_HEIGHT],
            yuv: None,
            yuv_frame: Vec::new(),
            pi: PlayerInput::default(),
            scheduled: VecDeque::new(),
            quit_at_frame: None,
            quit: false,
            now_ms: 0,
            frames: Vec::new(),
            keep_frames: 1024,
            mixer: None,
            output_rate,
            mixed_samples: 0,
        }
    }

    /// Requests quit once `frames` frames have been presented.
    pub fn quit_after(mut self, frames: u64) -> Self {
        self.quit_at_frame = Some(frames);
        self
    }

    pub fn schedule(&mut self, at_frame: u64, input: PlayerInput) {
        let pos = self.scheduled.iter().position(|s| s.at_frame > at_frame).unwrap_or(self.scheduled.len());
        self.scheduled.insert(pos, ScheduledInput { at_frame, input });
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames.last().map_or(0, |f| f.index + 1)
    }

    /// Most recent frames, oldest first.
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn screen_rgb(&self) -> &[[u8; 3]] {
        &self.screen
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= SCREEN_WIDTH {
            return None;
        }
        self.screen.get(y * SCREEN_WIDTH + x).copied()
    }

    pub fn palette(&self) -> &[[u8; 3]; 256] {
        &self.palette
    }

    pub fn mixed_samples(&self) -> u64 {
        self.mixed_samples
    }

    fn digest(&self) -> String {
        let mut raw = Vec::with_capacity(self.screen.len() * 3);
        if self.yuv.is_some() {
            raw.extend_from_slice(&self.yuv_frame);
        } else {
            for p in &self.screen {
                raw.extend_from_slice(p);
            }
        }
        sha256_hex(&raw)
    }
}

impl SystemStub for HeadlessStub {
    fn set_palette(&mut self, pal: &[u8], n: usize) {
        for (i, entry) in pal.chunks_exact(4).take(n.min(256)).enumerate() {
            self.palette[i] = [entry[2], entry[1], entry[0]];
        }
    }

    fn fill_rect(&mut self, mut x: i32, mut y: i32, mut w: i32, mut h: i32, color: u8) {
        if !clip(&mut x, &mut y, &mut w, &mut h, SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32) {
            return;
        }
        let rgb = self.palette[color as usize];
        for row in y..y + h {
            let start = row as usize * SCREEN_WIDTH + x as usize;
            self.screen[start..start + w as usize].fill(rgb);
        }
    }

    fn copy_rect(&mut self, x: i32, y: i32, w: i32, h: i32, buf: &[u8], pitch: usize, transparent: bool) {
        let (mut cx, mut cy, mut cw, mut ch) = (x, y, w, h);
        if !clip(&mut cx, &mut cy, &mut cw, &mut ch, SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32) {
            return;
        }
        for row in 0..ch {
            // row 0 of the screen rectangle is the last row of the buffer
            let src_row = (h - 1 - (cy - y + row)) as usize;
            let src_col = (cx - x) as usize;
            let dst = (cy + row) as usize * SCREEN_WIDTH + cx as usize;
            for i in 0..cw as usize {
                let Some(&c) = buf.get(src_row * pitch + src_col + i) else {
                    break;
                };
                if !transparent || c != 0 {
                    self.screen[dst + i] = self.palette[c as usize];
                }
            }
        }
    }

    fn darken_rect(&mut self, mut x: i32, mut y: i32, mut w: i32, mut h: i32) {
        if !clip(&mut x, &mut y, &mut w, &mut h, SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32) {
            return;
        }
        for row in y..y + h {
            let start = row as usize * SCREEN_WIDTH + x as usize;
            for p in &mut self.screen[start..start + w as usize] {
                *p = [p[0] >> 1, p[1] >> 1, p[2] >> 1];
            }
        }
    }

    fn update_screen(&mut self) {
        let record = FrameRecord {
            index: self.frames_presented(),
            time_ms: self.now_ms,
            yuv: self.yuv.is_some(),
            sha256: self.digest(),
        };
        if self.frames.len() == self.keep_frames {
            self.frames.remove(0);
        }
        self.frames.push(record);
    }

    fn set_yuv(&mut self, enabled: bool, w: usize, h: usize) {
        self.yuv = enabled.then_some((w, h));
        self.yuv_frame.clear();
    }

    fn copy_yuv(&mut self, buf: &[u8], pitch: usize) {
        if let Some((w, h)) = self.yuv {
            self.yuv_frame.clear();
            for row in 0..h {
                if let Some(line) = buf.get(row * pitch..row * pitch + w * 2) {
                    self.yuv_frame.extend_from_slice(line);
                }
            }
        }
    }

    fn process_events(&mut self) {
        let presented = self.frames_presented();
        while let Some(next) = self.scheduled.front() {
            if next.at_frame > presented {
                break;
            }
            if let Some(s) = self.scheduled.pop_front() {
                self.pi = s.input;
            }
        }
        if self.quit_at_frame.map_or(false, |n| presented >= n) {
            self.quit = true;
        }
    }

    fn sleep(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
        if let Some(mixer) = &self.mixer {
            let frames = (self.output_rate as u64 * ms as u64 / 1000) as usize;
            let mut buf = vec![0i16; frames * 2];
            mixer.mix(&mut buf);
            self.mixed_samples += frames as u64;
        }
    }

    fn time_stamp(&self) -> u32 {
        self.now_ms
    }

    fn input(&self) -> &PlayerInput {
        &self.pi
    }

    fn input_mut(&mut self) -> &mut PlayerInput {
        &mut self.pi
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }

    fn start_audio(&mut self, mixer: Mixer) {
        self.mixer = Some(mixer);
    }

    fn stop_audio(&mut self) {
        self.mixer = None;
    }

    fn output_sample_rate(&self) -> u32 {
        self.output_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grey_palette() -> Vec<u8> {
        (0..256).flat_map(|i| [i as u8, i as u8, i as u8, 0]).collect()
    }

    #[test]
    fn test_copy_rect_is_bottom_up() {
        let mut stub = HeadlessStub::default();
        stub.set_palette(&grey_palette(), 256);
        // 2x2 buffer, first row in memory is the bottom one
        stub.copy_rect(10, 20, 2, 2, &[1, 2, 3, 4], 2, false);
        assert_eq!(stub.pixel(10, 20), Some([3, 3, 3]));
        assert_eq!(stub.pixel(11, 21), Some([2, 2, 2]));

        stub.copy_rect(10, 20, 2, 2, &[0, 0, 0, 9], 2, true);
        assert_eq!(stub.pixel(10, 20), Some([3, 3, 3]));
        assert_eq!(stub.pixel(11, 20), Some([9, 9, 9]));
    }

    #[test]
    fn test_copy_rect_clipped() {
        let mut stub = HeadlessStub::default();
        stub.set_palette(&grey_palette(), 256);
        stub.copy_rect(-1, -1, 2, 2, &[1, 2, 3, 4], 2, false);
        // only the bottom right source pixel is on screen
        assert_eq!(stub.pixel(0, 0), Some([2, 2, 2]));
    }

    #[test]
    fn test_darken_and_frames() {
        let mut stub = HeadlessStub::default();
        stub.set_palette(&grey_palette(), 256);
        stub.fill_rect(0, 0, 4, 4, 200);
        stub.darken_rect(0, 0, 2, 2);
        assert_eq!(stub.pixel(0, 0), Some([100, 100, 100]));
        assert_eq!(stub.pixel(3, 3), Some([200, 200, 200]));
        stub.update_screen();
        stub.update_screen();
        assert_eq!(stub.frames_presented(), 2);
        assert_eq!(stub.frames()[0].sha256, stub.frames()[1].sha256);
        assert_eq!(stub.frames()[0].sha256.len(), 64);
    }

    #[test]
    fn test_scheduled_input_and_quit() {
        let mut stub = HeadlessStub::default().quit_after(2);
        stub.schedule(1, PlayerInput { enter: true, ..Default::default() });
        stub.process_events();
        assert!(!stub.input().enter);
        stub.update_screen();
        stub.process_events();
        assert!(stub.input().enter);
        assert!(!stub.quit_requested());
        stub.update_screen();
        stub.process_events();
        assert!(stub.quit_requested());
    }

    #[test]
    fn test_sleep_drains_mixer() {
        let mut stub = HeadlessStub::new(22050);
        let mixer = Mixer::new(22050);
        stub.start_audio(mixer.clone());
        let wav = crate::mixer::make_wav(1, 22050, 8, &[0x80; 100]);
        let id = mixer.play_sound(&wav).unwrap();
        stub.sleep(10);
        assert_eq!(stub.time_stamp(), 10);
        assert_eq!(stub.mixed_samples(), 220);
        stub.sleep(10);
        assert!(!mixer.is_sound_playing(id));
    }
}
