//! 8-bit paletted surfaces and sprite blitting
//!
//! Surfaces are stored bottom-up like Windows DIBs: row 0 is the bottom of
//! the screen. Callers convert game coordinates with `h + 1 - y - height`.
//!
//! Sprites are raw buffers: `u16 width - 1`, `u16 height - 1`, then
//! `width * height` pixels. Colour 0 is transparent.

use std::io::{self, Write};

use crate::util::read_le_u16;

pub const SCREEN_WIDTH: usize = 640;
pub const SCREEN_HEIGHT: usize = 480;

/// An 8-bit surface. `w` and `h` are the last column and row indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneBitmap {
    pub w: u16,
    pub h: u16,
    pub pitch: u16,
    pub bits: Vec<u8>,
}

impl SceneBitmap {
    pub fn new(width: usize, height: usize) -> Self {
        let pitch = (width + 3) & !3;
        Self {
            w: width.saturating_sub(1) as u16,
            h: height.saturating_sub(1) as u16,
            pitch: pitch as u16,
            bits: vec![0; pitch * height],
        }
    }

    pub fn screen() -> Self {
        Self::new(SCREEN_WIDTH, SCREEN_HEIGHT)
    }

    pub fn width(&self) -> usize {
        self.w as usize + 1
    }

    pub fn height(&self) -> usize {
        self.h as usize + 1
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        self.bits.get(y * self.pitch as usize + x).copied()
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: u8) {
        if let Some(p) = self.bits.get_mut(y * self.pitch as usize + x) {
            *p = color;
        }
    }

    /// Top-down row-major copy without the pitch padding.
    pub fn to_top_down(&self) -> Vec<u8> {
        let (w, h, pitch) = (self.width(), self.height(), self.pitch as usize);
        let mut out = Vec::with_capacity(w * h);
        for row in (0..h).rev() {
            let start = row * pitch;
            match self.bits.get(start..start + w) {
                Some(line) => out.extend_from_slice(line),
                None => out.extend(std::iter::repeat(0).take(w)),
            }
        }
        out
    }
}

pub fn sprite_width(data: &[u8]) -> usize {
    read_le_u16(data, 0).map_or(0, |v| v as usize + 1)
}

pub fn sprite_height(data: &[u8]) -> usize {
    read_le_u16(data, 2).map_or(0, |v| v as usize + 1)
}

pub fn sprite_size(data: &[u8]) -> usize {
    4 + sprite_width(data) * sprite_height(data)
}

/// Builds a sprite buffer, `pixels` holds `height` rows of `width` bytes.
pub fn make_sprite(width: usize, height: usize, pixels: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + width * height);
    data.extend_from_slice(&((width.max(1) - 1) as u16).to_le_bytes());
    data.extend_from_slice(&((height.max(1) - 1) as u16).to_le_bytes());
    data.extend_from_slice(pixels);
    data.resize(4 + width * height, 0);
    data
}

struct Clip {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
}

// Shared by the block copies: the right edge is tested with `>` and the
// bottom one with `>=`.
fn clip_block(x: i32, y: i32, w: i32, h: i32, x2: i32, y2: i32) -> Option<Clip> {
    let (mut x, mut y, mut w, mut h) = (x, y, w, h);
    if w <= 0 || x > x2 || x + w <= 0 {
        return None;
    }
    if x < 0 {
        w += x;
        x = 0;
    }
    if x + w > x2 {
        w = x2 + 1 - x;
    }
    if h <= 0 || y >= y2 || y + h <= 0 {
        return None;
    }
    if y < 0 {
        h += y;
        y = 0;
    }
    if y + h > y2 {
        h = y2 + 1 - y;
    }
    Some(Clip { x, y, w, h })
}

/// Copies a `w`x`h` block at the same position from `src` to `dst`.
pub fn copy_buffer_to_buffer(x: i32, y: i32, w: i32, h: i32, src: &SceneBitmap, dst: &mut SceneBitmap) {
    let x2 = src.w.min(dst.w) as i32;
    let y2 = src.h.min(dst.h) as i32;
    let Some(c) = clip_block(x, y, w, h, x2, y2) else {
        return;
    };
    let (sp, dp) = (src.pitch as usize, dst.pitch as usize);
    for j in 0..c.h as usize {
        let row = c.y as usize + j;
        let s = row * sp + c.x as usize;
        let d = row * dp + c.x as usize;
        let len = c.w as usize;
        if let (Some(from), true) = (src.bits.get(s..s + len), d + len <= dst.bits.len()) {
            dst.bits[d..d + len].copy_from_slice(from);
        }
    }
}

/// Like [`copy_buffer_to_buffer`] but keeps `dst` pixels whose source colour
/// lies in `start_color..end_color` (palette mixing areas).
#[allow(clippy::too_many_arguments)]
pub fn draw_box(
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    src: &SceneBitmap,
    dst: &mut SceneBitmap,
    start_color: i32,
    end_color: i32,
) {
    let x2 = src.w.min(dst.w) as i32;
    let y2 = src.h.min(dst.h) as i32;
    let Some(c) = clip_block(x, y, w, h, x2, y2) else {
        return;
    };
    let sp = src.pitch as usize;
    for j in 0..c.h as usize {
        let row = c.y as usize + j;
        for i in 0..c.w as usize {
            let col = c.x as usize + i;
            let Some(&p) = src.bits.get(row * sp + col) else {
                continue;
            };
            let p = p as i32;
            if start_color > p || end_color <= p {
                dst.set_pixel(col, row, p as u8);
            }
        }
    }
}

struct SpriteClip {
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    skip_x: i32,
    skip_y: i32,
}

fn clip_sprite(x: i32, y: i32, w: i32, h: i32, dst: &SceneBitmap) -> Option<SpriteClip> {
    let (dw, dh) = (dst.w as i32, dst.h as i32);
    let (mut x, mut y, mut cw, mut ch) = (x, y, w, h);
    let (mut skip_x, mut skip_y) = (0, 0);
    if x > dw || x + cw <= 0 {
        return None;
    }
    if x < 0 {
        cw += x;
        skip_x = -x;
        x = 0;
    }
    if x + cw > dw {
        cw = dw + 1 - x;
    }
    if y > dh || y + ch <= 0 {
        return None;
    }
    if y < 0 {
        ch += y;
        skip_y = -y;
        y = 0;
    }
    if y + ch > dh {
        ch = dh + 1 - y;
    }
    Some(SpriteClip { x, y, w: cw, h: ch, skip_x, skip_y })
}

/// Draws a sprite with its bottom-left corner at `(x, y)` in surface
/// coordinates. Rows of the sprite are stored bottom-up as well.
pub fn draw_object(x: i32, y: i32, src: &[u8], dst: &mut SceneBitmap) {
    let (w, h) = (sprite_width(src) as i32, sprite_height(src) as i32);
    if w == 0 || h == 0 {
        return;
    }
    let Some(c) = clip_sprite(x, y, w, h, dst) else {
        return;
    };
    let pixels = &src[4..];
    for j in 0..c.h {
        let row = (c.skip_y + j) * w + c.skip_x;
        for i in 0..c.w {
            if let Some(&p) = pixels.get((row + i) as usize) {
                if p != 0 {
                    dst.set_pixel((c.x + i) as usize, (c.y + j) as usize, p);
                }
            }
        }
    }
}

/// Draws a sprite mirrored around its vertical axis.
pub fn draw_object_vertical_flip(x: i32, y: i32, src: &[u8], dst: &mut SceneBitmap) {
    let (w, h) = (sprite_width(src) as i32, sprite_height(src) as i32);
    if w == 0 || h == 0 {
        return;
    }
    let Some(c) = clip_sprite(x, y, w, h, dst) else {
        return;
    };
    let pixels = &src[4..];
    for j in 0..c.h {
        let last = (c.skip_y + j) * w + w - 1 - c.skip_x;
        for i in 0..c.w {
            let index = last - i;
            if index < 0 {
                continue;
            }
            if let Some(&p) = pixels.get(index as usize) {
                if p != 0 {
                    dst.set_pixel((c.x + i) as usize, (c.y + j) as usize, p);
                }
            }
        }
    }
}

/// Converts a 256 entry BGRA palette to RGB triplets. Entry 0 is forced to
/// black.
pub fn palette_to_rgb(palette: &[u8]) -> [[u8; 3]; 256] {
    let mut out = [[0u8; 3]; 256];
    for (i, entry) in out.iter_mut().enumerate().skip(1) {
        if let Some(bgra) = palette.get(i * 4..i * 4 + 4) {
            *entry = [bgra[2], bgra[1], bgra[0]];
        }
    }
    out
}

/// Writes RGB pixels (top-down) as a run-length encoded 24-bit TGA.
pub fn write_tga<W: Write>(out: &mut W, rgb: &[[u8; 3]], w: usize, h: usize) -> io::Result<()> {
    let mut header = [0u8; 18];
    header[2] = 10;
    header[12..14].copy_from_slice(&(w as u16).to_le_bytes());
    header[14..16].copy_from_slice(&(h as u16).to_le_bytes());
    header[16] = 24;
    header[17] = 1 << 5;
    out.write_all(&header)?;
    let pixels = &rgb[..(w * h).min(rgb.len())];
    let Some((first, rest)) = pixels.split_first() else {
        return Ok(());
    };
    let mut prev = *first;
    let mut count = 0u8;
    for &color in rest {
        if color == prev && count < 127 {
            count += 1;
            continue;
        }
        out.write_all(&[count | 0x80, prev[2], prev[1], prev[0]])?;
        count = 0;
        prev = color;
    }
    out.write_all(&[count | 0x80, prev[2], prev[1], prev[0]])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_helpers() {
        let spr = make_sprite(3, 2, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(sprite_width(&spr), 3);
        assert_eq!(sprite_height(&spr), 2);
        assert_eq!(sprite_size(&spr), 10);
    }

    #[test]
    fn test_draw_object_transparent_and_clipped() {
        let mut dst = SceneBitmap::new(4, 4);
        let spr = make_sprite(2, 2, &[0, 7, 8, 9]);
        draw_object(-1, 0, &spr, &mut dst);
        assert_eq!(dst.pixel(0, 0), Some(7));
        assert_eq!(dst.pixel(0, 1), Some(9));
        assert_eq!(dst.pixel(1, 0), Some(0));

        draw_object(3, 3, &spr, &mut dst);
        // only the bottom-left pixel fits and it is transparent
        assert_eq!(dst.pixel(3, 3), Some(0));
        draw_object(10, 0, &spr, &mut dst);
    }

    #[test]
    fn test_draw_object_flipped() {
        let mut dst = SceneBitmap::new(4, 4);
        let spr = make_sprite(3, 1, &[1, 2, 3]);
        draw_object_vertical_flip(0, 0, &spr, &mut dst);
        assert_eq!(&dst.bits[0..3], &[3, 2, 1]);

        let mut clipped = SceneBitmap::new(4, 4);
        draw_object_vertical_flip(-1, 0, &spr, &mut clipped);
        assert_eq!(&clipped.bits[0..2], &[2, 1]);
    }

    #[test]
    fn test_copy_and_draw_box() {
        let mut src = SceneBitmap::new(4, 4);
        src.bits.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8);
        let mut dst = SceneBitmap::new(4, 4);
        copy_buffer_to_buffer(1, 1, 2, 2, &src, &mut dst);
        assert_eq!(dst.pixel(1, 1), Some(5));
        assert_eq!(dst.pixel(2, 2), Some(10));
        assert_eq!(dst.pixel(0, 0), Some(0));

        let mut mixed = SceneBitmap::new(4, 4);
        mixed.bits.fill(0xEE);
        draw_box(0, 0, 4, 2, &src, &mut mixed, 2, 6);
        assert_eq!(mixed.pixel(1, 0), Some(1));
        assert_eq!(mixed.pixel(2, 0), Some(0xEE));
        assert_eq!(mixed.pixel(2, 1), Some(6));
    }

    #[test]
    fn test_top_down_and_tga() {
        let mut bmp = SceneBitmap::new(2, 2);
        bmp.set_pixel(0, 0, 1);
        bmp.set_pixel(1, 1, 2);
        assert_eq!(bmp.to_top_down(), vec![0, 2, 1, 0]);

        let rgb = vec![[1, 2, 3]; 4];
        let mut out = Vec::new();
        write_tga(&mut out, &rgb, 2, 2).unwrap();
        assert_eq!(out.len(), 18 + 4);
        assert_eq!(&out[18..], &[0x83, 3, 2, 1]);
    }
}
