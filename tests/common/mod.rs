//! Synthetic game data shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;

use bermuda_core::bitmap::make_sprite;
use bermuda_core::decoder::block_checksum;
use bermuda_core::resource::{OFFSET_BITMAP_BITS, OFFSET_BITMAP_PALETTE};
use flate2::{write::ZlibEncoder, Compression};
use tempfile::TempDir;

/// Non-demo `bermuda.spr` layout.
pub const COMMON_SPRITES: usize = 3 + 11 * 12 + 10 + 14 + 2 * 5 + 1 + 1 + 1 + 10;

/// LZSS stream made of literals only, in a single block.
pub fn lzss_literals(payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8, 0];
    let mut word_pos = 0;
    let mut count = 0u32;
    let mut bit = |buf: &mut Vec<u8>, b: bool| {
        if b {
            buf[word_pos + (count / 8) as usize] |= 1 << (count % 8);
        }
        count += 1;
        if count == 16 {
            word_pos = buf.len();
            buf.extend_from_slice(&[0, 0]);
            count = 0;
        }
    };
    for &b in payload {
        bit(&mut buf, true);
        buf.push(b);
    }
    bit(&mut buf, false);
    bit(&mut buf, true);
    buf.extend_from_slice(&[0, 0]);
    buf.push(0);

    let units = (buf.len() + 2 + 15) / 16;
    assert!(units <= 256, "payload does not fit a single block");
    let mut block = vec![0u8; units * 16];
    block[2..2 + buf.len()].copy_from_slice(&buf);
    let crc = block_checksum(&block, 2, units * 8 - 1).unwrap();
    block[..2].copy_from_slice(&crc.to_le_bytes());

    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&(units as u32).to_le_bytes());
    out.extend_from_slice(&block);
    out
}

/// `u32` size followed by a zlib stream.
pub fn zlib_packed(payload: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).unwrap();
    let mut out = (payload.len() as u32).to_le_bytes().to_vec();
    out.extend_from_slice(&enc.finish().unwrap());
    out
}

pub fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_i16(out: &mut Vec<u8>, v: i16) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn put_str(out: &mut Vec<u8>, s: &str) {
    put_u16(out, (s.len() + 1) as u16);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
}

/// Zlib WGP holding a `width`x`height` bitmap filled with `color`, palette
/// entry `color` set to pure red.
pub fn wgp(width: u32, height: u32, color: u8) -> Vec<u8> {
    let pitch = ((width + 3) & !3) as usize;
    let mut dib = vec![0u8; OFFSET_BITMAP_BITS + pitch * height as usize];
    dib[0..4].copy_from_slice(&40u32.to_le_bytes());
    dib[4..8].copy_from_slice(&width.to_le_bytes());
    dib[8..12].copy_from_slice(&height.to_le_bytes());
    let entry = OFFSET_BITMAP_PALETTE + color as usize * 4;
    dib[entry..entry + 4].copy_from_slice(&[0, 0, 255, 0]);
    dib[OFFSET_BITMAP_BITS..].fill(color);
    let mut out = 0x505Au16.to_le_bytes().to_vec();
    out.extend_from_slice(&zlib_packed(&dib));
    out
}

/// Zlib SPR with one motion of `frames` 1x1 frames.
pub fn spr(frames: usize, color: u8) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, 0x355A);
    put_u16(&mut out, frames as u16);
    for num in 0..frames {
        let data = zlib_packed(&make_sprite(1, 1, &[color]));
        put_u16(&mut out, data.len() as u16);
        out.extend_from_slice(&data);
        for v in [num as i16, 1, 1, 0, 0] {
            put_i16(&mut out, v);
        }
    }
    put_u16(&mut out, 0);
    out
}

/// MOV with a single always initialised object and its script.
pub fn mov(spr_name: &str, object: &str, x: i16, y: i16, script: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u16(&mut out, 0x354D);
    put_str(&mut out, spr_name);
    put_str(&mut out, "c1.wgp");
    put_u16(&mut out, 50);

    put_u16(&mut out, 3);
    put_str(&mut out, object);
    put_u16(&mut out, 3000);
    put_i16(&mut out, 1);
    put_u16(&mut out, 3500);
    put_i16(&mut out, x);
    put_i16(&mut out, y);
    put_u16(&mut out, 5500);
    put_i16(&mut out, 1);
    put_u16(&mut out, 5000);
    put_i16(&mut out, 1);
    put_u16(&mut out, 0);

    put_u16(&mut out, 4);
    put_u16(&mut out, script.len() as u16);
    out.extend_from_slice(script);
    out
}

/// Builds object scripts statement by statement, end offsets are filled in.
#[derive(Default)]
pub struct ScriptBuilder {
    data: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement(mut self, conditions: &[i16], operators: &[i16]) -> Self {
        let start = self.data.len();
        let end = start + 2 + (conditions.len() + 1 + operators.len()) * 2;
        put_u16(&mut self.data, end as u16);
        for &w in conditions {
            put_i16(&mut self.data, w);
        }
        put_i16(&mut self.data, 0);
        for &w in operators {
            put_i16(&mut self.data, w);
        }
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.data
    }
}

/// Non-demo `bermuda.spr`: every interface sprite is a 1x1 pixel.
pub fn common_sprites() -> Vec<u8> {
    let mut packed = Vec::new();
    for i in 0..COMMON_SPRITES {
        packed.extend_from_slice(&make_sprite(1, 1, &[i as u8]));
    }
    let mut out = 0x3553u16.to_le_bytes().to_vec();
    out.extend_from_slice(&lzss_literals(&packed));
    out
}

fn write(root: &Path, name: &str, data: &[u8]) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}

/// Two scene game. `_01.SCN` runs JACK whose script counts frames in var 5
/// and leaves for scene 1 (`_02.SCN`) once the count reaches 3. `_02.SCN`
/// runs RAIN which copies the scene number to var 7.
pub fn game_data() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "bermuda.ovr", &[0u8; 16]);
    write(root, "bermuda.wgp", &wgp(4, 4, 3));
    write(root, "bermuda.spr", &common_sprites());
    write(root, "wgp/c1.wgp", &wgp(640, 480, 1));

    let jack = ScriptBuilder::new()
        .statement(&[10], &[6000, 5, 1, 1])
        .statement(&[6000, 5, -1, 1, 3, 100], &[30000, 1])
        .build();
    write(root, "mov/jack.mov", &mov("jack.spr", "JACK", 100, 100, &jack));
    write(root, "mov/jack.spr", &spr(2, 9));

    let rain = ScriptBuilder::new().statement(&[10], &[6100, 7]).build();
    write(root, "mov/rain.mov", &mov("rain.spr", "RAIN", 200, 50, &rain));
    write(root, "mov/rain.spr", &spr(1, 12));

    write(
        root,
        "SCN/_01.SCN",
        b"SceneNumber 1\r\nScreen ..\\wgp\\c1.wgp\r\nMovies\r\n..\\mov\\jack.mov\r\nMoviesEnd\r\nScene\r\n1 _02.scn\r\nSceneEnd\r\nEnd\r\n",
    );
    write(
        root,
        "SCN/_02.SCN",
        b"SceneNumber 2\r\nScreen ..\\wgp\\c1.wgp\r\nMovies\r\n..\\mov\\rain.mov\r\nMoviesEnd\r\nEnd\r\n",
    );
    dir
}
