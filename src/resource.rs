//! Resource file formats
//!
//! - WGP: scene background (palette + 8-bit DIB bits)
//! - SPR: sprite bank, motions of individually compressed frames
//! - MOV: animation description (sounds, boxes, objects, bytecode)
//! - KBR: keyboard replay records
//!
//! Loaders only parse. Wiring the results into the scene tables is done by
//! the game.

use serde::Serialize;
use thiserror::Error;

use crate::bitmap::{sprite_size, SceneBitmap};
use crate::decoder::{decode_lzss, decode_zlib, DecodeError};
use crate::util::{read_le_u32, ByteReader, ReadError};

pub const OFFSET_BITMAP_PALETTE: usize = 40;
pub const OFFSET_BITMAP_BITS: usize = OFFSET_BITMAP_PALETTE + 256 * 4;

const TAG_BMP: u16 = 0x4D42;
const TAG_WGP_LZSS: u16 = 0x5057;
const TAG_WGP_ZLIB: u16 = 0x505A;
const TAG_SPR_LZSS: u16 = 0x3553;
const TAG_SPR_ZLIB: u16 = 0x355A;
const TAG_MOV: u16 = 0x354D;

const MAX_BITMAP_DIMENSION: u32 = 4096;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid wgp format {0:X}")]
    InvalidWgp(u16),

    #[error("Invalid spr format {0:X}")]
    InvalidSpr(u16),

    #[error("Invalid mov format {0:X}")]
    InvalidMov(u16),

    #[error("Invalid bitmap dimensions {0}x{1}")]
    InvalidBitmap(u32, u32),

    #[error("Unknown mov section {0}")]
    UnknownMovSection(u16),

    #[error("Unknown object init record {0}")]
    UnknownInitRecord(u16),

    #[error("Object variable index {0} out of range")]
    ObjectVarIndex(u16),

    #[error("Duplicate object name {0}")]
    DuplicateObject(String),

    #[error("Too many dialogue sprite frames ({0})")]
    TooManyFrames(usize),

    #[error("Common sprites truncated at entry {0}")]
    CommonSprites(usize),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A decoded WGP background.
#[derive(Debug, Clone)]
pub struct Background {
    /// 256 BGRA entries.
    pub palette: Vec<u8>,
    pub bitmap: SceneBitmap,
}

pub fn load_wgp(data: &[u8]) -> Result<Background, ResourceError> {
    let mut r = ByteReader::new(data);
    let tag = r.u16()?;
    let mut offs = OFFSET_BITMAP_BITS;
    let dib = match tag {
        TAG_BMP => {
            let len = (r.u32()? as usize).saturating_sub(14);
            r.skip(8)?;
            let available = r.remaining().min(len);
            r.bytes(available)?.to_vec()
        }
        TAG_WGP_LZSS => {
            let mut out = Vec::new();
            while r.remaining() >= 2 {
                let size = r.u16()? as usize;
                if size != 0 {
                    let chunk = r.bytes(size.min(r.remaining()))?;
                    out.extend_from_slice(&decode_lzss(chunk)?);
                }
            }
            // bits start 4 bytes after the palette in this variant
            offs += 4;
            out
        }
        TAG_WGP_ZLIB => decode_zlib(&data[2..])?,
        _ => return Err(ResourceError::InvalidWgp(tag)),
    };
    let width = read_le_u32(&dib, 4).ok_or(ReadError::UnexpectedEof {
        offset: 4,
        wanted: 4,
        available: dib.len(),
    })?;
    let height = read_le_u32(&dib, 8).ok_or(ReadError::UnexpectedEof {
        offset: 8,
        wanted: 4,
        available: dib.len(),
    })?;
    if width == 0 || height == 0 || width > MAX_BITMAP_DIMENSION || height > MAX_BITMAP_DIMENSION {
        return Err(ResourceError::InvalidBitmap(width, height));
    }
    let mut palette = dib
        .get(OFFSET_BITMAP_PALETTE..OFFSET_BITMAP_BITS)
        .map(|p| p.to_vec())
        .unwrap_or_default();
    palette.resize(256 * 4, 0);

    let pitch = ((width + 3) & !3) as usize;
    let mut bits = dib.get(offs..).map(|b| b.to_vec()).unwrap_or_default();
    bits.resize(pitch * height as usize, 0);
    tracing::debug!(target: "bermuda::resource", tag = format!("{:X}", tag), width, height, "wgp loaded");
    Ok(Background {
        palette,
        bitmap: SceneBitmap {
            w: (width - 1) as u16,
            h: (height - 1) as u16,
            pitch: pitch as u16,
            bits,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Lzss,
    Zlib,
}

impl Compression {
    pub fn decode(self, data: &[u8]) -> Result<Vec<u8>, DecodeError> {
        match self {
            Compression::Lzss => decode_lzss(data),
            Compression::Zlib => decode_zlib(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FrameHeader {
    pub num: i16,
    pub w: i16,
    pub h: i16,
    pub x_pos: i16,
    pub y_pos: i16,
}

#[derive(Debug, Clone)]
pub struct SpriteFrame {
    /// Compressed sprite buffer.
    pub data: Vec<u8>,
    pub hdr: FrameHeader,
    pub compression: Compression,
}

impl SpriteFrame {
    pub fn decode(&self) -> Result<Vec<u8>, DecodeError> {
        self.compression.decode(&self.data)
    }
}

/// Motions of a sprite bank, each a run of frames.
#[derive(Debug, Clone)]
pub struct SpriteBank {
    pub compression: Compression,
    pub motions: Vec<Vec<SpriteFrame>>,
}

impl SpriteBank {
    pub fn frames_count(&self) -> usize {
        self.motions.iter().map(|m| m.len()).sum()
    }
}

pub fn load_spr(data: &[u8]) -> Result<SpriteBank, ResourceError> {
    let mut r = ByteReader::new(data);
    let tag = r.u16()?;
    let compression = match tag {
        TAG_SPR_LZSS => Compression::Lzss,
        TAG_SPR_ZLIB => Compression::Zlib,
        _ => return Err(ResourceError::InvalidSpr(tag)),
    };
    let mut motions = Vec::new();
    loop {
        let num = r.u16()?;
        if num == 0 {
            break;
        }
        let mut frames = Vec::with_capacity(num as usize);
        for _ in 0..num {
            let len = r.u16()? as usize;
            let frame_data = r.bytes(len)?.to_vec();
            let hdr = FrameHeader {
                num: r.i16()?,
                w: r.i16()?,
                h: r.i16()?,
                x_pos: r.i16()?,
                y_pos: r.i16()?,
            };
            frames.push(SpriteFrame { data: frame_data, hdr, compression });
        }
        motions.push(frames);
    }
    Ok(SpriteBank { compression, motions })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MovBox {
    /// Zero based box group.
    pub group: usize,
    pub state: u8,
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MovObject {
    pub name: String,
    pub class_name: String,
    pub mode: i16,
    pub mode_rnd_mul: i16,
    pub x_init: i16,
    pub y_init: i16,
    pub z_init: i16,
    pub flip_init: i16,
    /// Zero based.
    pub motion_num: i16,
    /// Zero based.
    pub motion_frame_num: i16,
    pub vars: Vec<(usize, i16)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MovieDescription {
    pub spr_name: String,
    pub wgp_name: String,
    /// Frame delay in milliseconds.
    pub speed: u16,
    pub sounds: Vec<String>,
    pub boxes: Vec<MovBox>,
    pub objects: Vec<MovObject>,
    #[serde(skip)]
    pub script: Vec<u8>,
    pub unk26: i16,
}

pub fn load_mov(data: &[u8]) -> Result<MovieDescription, ResourceError> {
    let mut r = ByteReader::new(data);
    let tag = r.u16()?;
    if tag != TAG_MOV {
        return Err(ResourceError::InvalidMov(tag));
    }
    let mut mov = MovieDescription {
        spr_name: r.string16()?,
        wgp_name: r.string16()?,
        speed: r.u16()?,
        ..Default::default()
    };
    loop {
        let section = r.u16()?;
        match section {
            1 => loop {
                let name = r.string16()?;
                if name.is_empty() {
                    break;
                }
                mov.sounds.push(name);
            },
            2 => loop {
                let index = r.u16()?;
                if index == 0 {
                    break;
                }
                mov.boxes.push(MovBox {
                    group: index as usize - 1,
                    state: r.u8()?,
                    x1: r.i16()?,
                    y1: r.i16()?,
                    x2: r.i16()?,
                    y2: r.i16()?,
                });
            },
            3 => {
                let object = read_mov_object(&mut r)?;
                if mov.objects.iter().any(|o| o.name == object.name) {
                    return Err(ResourceError::DuplicateObject(object.name));
                }
                mov.objects.push(object);
            }
            4 => {
                let size = r.u16()? as usize;
                mov.script = r.bytes(size)?.to_vec();
                break;
            }
            5 => mov.unk26 = r.i16()?,
            _ => return Err(ResourceError::UnknownMovSection(section)),
        }
    }
    Ok(mov)
}

fn read_mov_object(r: &mut ByteReader<'_>) -> Result<MovObject, ResourceError> {
    let mut so = MovObject {
        name: r.string16()?,
        ..Default::default()
    };
    loop {
        let init_type = r.u16()?;
        match init_type {
            0 => break,
            2000 => so.class_name = r.string16()?,
            3000 => {
                so.mode = r.i16()?;
                if so.mode == 2 {
                    so.mode_rnd_mul = r.i16()?;
                }
            }
            3500 => {
                so.x_init = r.i16()?;
                so.y_init = r.i16()?;
            }
            4000 => so.z_init = r.i16()?,
            4500 => so.flip_init = r.i16()?,
            5000 => so.motion_frame_num = r.i16()?.wrapping_sub(1),
            5500 => so.motion_num = r.i16()?.wrapping_sub(1),
            6000 => {
                let var = r.u16()?;
                if var >= 10 {
                    return Err(ResourceError::ObjectVarIndex(var));
                }
                so.vars.push((var as usize, r.i16()?));
            }
            _ => return Err(ResourceError::UnknownInitRecord(init_type)),
        }
    }
    Ok(so)
}

/// Path of the sprite bank referenced by a MOV: the last component of the
/// MOV path is replaced.
pub fn spr_path_for_mov(mov_path: &str, spr_name: &str) -> String {
    match mov_path.rfind('\\') {
        Some(pos) => format!("{}{}", &mov_path[..=pos], spr_name),
        None => spr_name.to_string(),
    }
}

/// Keyboard replay: one 128 entry key table per frame.
#[derive(Debug, Clone, Default)]
pub struct KeyboardReplay {
    pub records: Vec<[u8; 128]>,
    pub offset: usize,
}

impl KeyboardReplay {
    pub fn next_record(&mut self) -> Option<&[u8; 128]> {
        let record = self.records.get(self.offset)?;
        self.offset += 1;
        Some(record)
    }
}

pub fn load_kbr(data: &[u8]) -> KeyboardReplay {
    if data.len() % 128 != 0 {
        tracing::warn!(target: "bermuda::resource", size = data.len(), "unexpected keyboard buffer size");
    }
    let records = data
        .chunks_exact(128)
        .map(|c| {
            let mut record = [0u8; 128];
            record.copy_from_slice(c);
            record
        })
        .collect();
    KeyboardReplay { records, offset: 0 }
}

pub const MAX_DIALOGUE_SPRITE_FRAMES: usize = 105;

/// Talking head animation used by dialogues. Frames are kept LZSS packed
/// and decoded when drawn.
pub fn load_dialogue_sprites(data: &[u8]) -> Result<Vec<Vec<u8>>, ResourceError> {
    let mut r = ByteReader::new(data);
    let tag = r.u16()?;
    if tag != TAG_SPR_LZSS {
        return Err(ResourceError::InvalidSpr(tag));
    }
    let count = r.u16()? as usize;
    if count > MAX_DIALOGUE_SPRITE_FRAMES {
        return Err(ResourceError::TooManyFrames(count));
    }
    (0..count)
        .map(|_| {
            let size = r.u16()? as usize;
            Ok(r.bytes(size + 10)?.to_vec())
        })
        .collect()
}

/// Interface sprites packed in `bermuda.spr`, in file order.
#[derive(Debug, Clone, Default)]
pub struct CommonSprites {
    /// Bag actions: take, talk, girl.
    pub bag_actions: Vec<Vec<u8>>,
    /// 11 life levels of 12 animation frames.
    pub life_bar: Vec<Vec<Vec<u8>>>,
    pub bag_object_area_blink: Vec<Vec<u8>>,
    pub weapon_icons: Vec<Vec<u8>>,
    /// 2 sets of 5 ammo icons.
    pub ammo_icons: Vec<Vec<Vec<u8>>>,
    pub sword_icon: Option<Vec<u8>>,
    pub icon_background: Vec<u8>,
    pub life_bar_image: Vec<u8>,
    pub bag_weapon_area_blink: Vec<Vec<u8>>,
}

struct SpriteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    index: usize,
}

impl<'a> SpriteCursor<'a> {
    fn next(&mut self) -> Result<Vec<u8>, ResourceError> {
        let rest = self.data.get(self.pos..).unwrap_or(&[]);
        let size = sprite_size(rest);
        let sprite = rest
            .get(..size)
            .ok_or(ResourceError::CommonSprites(self.index))?;
        self.pos += size;
        self.index += 1;
        Ok(sprite.to_vec())
    }

    fn take(&mut self, n: usize) -> Result<Vec<Vec<u8>>, ResourceError> {
        (0..n).map(|_| self.next()).collect()
    }
}

/// Splits `bermuda.spr` (tag word then an LZSS buffer of packed sprites).
pub fn load_common_sprites(data: &[u8], is_demo: bool) -> Result<CommonSprites, ResourceError> {
    let decoded = decode_lzss(data.get(2..).unwrap_or(&[]))?;
    let mut cur = SpriteCursor { data: &decoded, pos: 0, index: 0 };
    let bag_actions = cur.take(3)?;
    let life_bar = (0..11).map(|_| cur.take(12)).collect::<Result<Vec<_>, _>>()?;
    let bag_object_area_blink = cur.take(10)?;
    let weapon_icons = cur.take(14)?;
    let ammo_icons = (0..2).map(|_| cur.take(5)).collect::<Result<Vec<_>, _>>()?;
    let sword_icon = if is_demo { None } else { Some(cur.next()?) };
    let icon_background = cur.next()?;
    let life_bar_image = cur.next()?;
    let bag_weapon_area_blink = if is_demo { Vec::new() } else { cur.take(10)? };
    Ok(CommonSprites {
        bag_actions,
        life_bar,
        bag_object_area_blink,
        weapon_icons,
        ammo_icons,
        sword_icon,
        icon_background,
        life_bar_image,
        bag_weapon_area_blink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::ZlibEncoder, Compression as Level};
    use std::io::Write;

    fn zlib_packed(payload: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
        enc.write_all(payload).unwrap();
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&enc.finish().unwrap());
        out
    }

    fn dib(width: u32, height: u32) -> Vec<u8> {
        let mut d = vec![0u8; OFFSET_BITMAP_BITS];
        d[0..4].copy_from_slice(&40u32.to_le_bytes());
        d[4..8].copy_from_slice(&width.to_le_bytes());
        d[8..12].copy_from_slice(&height.to_le_bytes());
        d[OFFSET_BITMAP_PALETTE + 4..OFFSET_BITMAP_PALETTE + 8].copy_from_slice(&[10, 20, 30, 0]);
        let pitch = ((width + 3) & !3) as usize;
        d.extend((0..pitch * height as usize).map(|i| i as u8));
        d
    }

    fn put_str(out: &mut Vec<u8>, s: &str) {
        out.extend_from_slice(&((s.len() + 1) as u16).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }

    fn put_u16(out: &mut Vec<u8>, v: u16) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    #[test]
    fn test_load_wgp_zlib() {
        let mut file = TAG_WGP_ZLIB.to_le_bytes().to_vec();
        file.extend_from_slice(&zlib_packed(&dib(6, 2)));
        let bg = load_wgp(&file).unwrap();
        assert_eq!(bg.bitmap.width(), 6);
        assert_eq!(bg.bitmap.height(), 2);
        assert_eq!(bg.bitmap.pitch, 8);
        assert_eq!(&bg.palette[4..8], &[10, 20, 30, 0]);
        assert_eq!(bg.bitmap.bits[9], 9);
    }

    #[test]
    fn test_load_wgp_bmp() {
        let body = dib(4, 1);
        let mut file = TAG_BMP.to_le_bytes().to_vec();
        file.extend_from_slice(&((body.len() + 14) as u32).to_le_bytes());
        file.extend_from_slice(&[0; 8]);
        file.extend_from_slice(&body);
        let bg = load_wgp(&file).unwrap();
        assert_eq!(bg.bitmap.bits, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_invalid_tags() {
        assert!(matches!(load_wgp(&[0x11, 0x22]), Err(ResourceError::InvalidWgp(0x2211))));
        assert!(matches!(load_spr(&[0, 0]), Err(ResourceError::InvalidSpr(0))));
        assert!(matches!(load_mov(&[0, 0]), Err(ResourceError::InvalidMov(0))));
    }

    #[test]
    fn test_load_spr() {
        let mut file = TAG_SPR_ZLIB.to_le_bytes().to_vec();
        put_u16(&mut file, 2);
        for n in 0..2u16 {
            let frame = zlib_packed(&crate::bitmap::make_sprite(1, 1, &[n as u8 + 1]));
            put_u16(&mut file, frame.len() as u16);
            file.extend_from_slice(&frame);
            for v in [n, 1, 1, 10, 20] {
                put_u16(&mut file, v);
            }
        }
        put_u16(&mut file, 0);
        let bank = load_spr(&file).unwrap();
        assert_eq!(bank.motions.len(), 1);
        assert_eq!(bank.frames_count(), 2);
        let f = &bank.motions[0][1];
        assert_eq!(f.hdr, FrameHeader { num: 1, w: 1, h: 1, x_pos: 10, y_pos: 20 });
        assert_eq!(f.decode().unwrap(), vec![0, 0, 0, 0, 2]);
    }

    #[test]
    fn test_load_mov() {
        let mut file = TAG_MOV.to_le_bytes().to_vec();
        put_str(&mut file, "HERO.SPR");
        put_str(&mut file, "ROOM.WGP");
        put_u16(&mut file, 80);
        put_u16(&mut file, 1);
        put_str(&mut file, "STEP.WAV");
        put_u16(&mut file, 0);
        put_u16(&mut file, 2);
        put_u16(&mut file, 3);
        file.push(1);
        for v in [1u16, 2, 3, 4] {
            put_u16(&mut file, v);
        }
        put_u16(&mut file, 0);
        put_u16(&mut file, 3);
        put_str(&mut file, "HERO");
        for v in [2000u16] {
            put_u16(&mut file, v);
        }
        put_str(&mut file, "PLAYER");
        for v in [3000u16, 2, 7, 3500, 100, 200, 5500, 2, 6000, 4, 9, 0] {
            put_u16(&mut file, v);
        }
        put_u16(&mut file, 5);
        put_u16(&mut file, 12);
        put_u16(&mut file, 4);
        put_u16(&mut file, 3);
        file.extend_from_slice(&[1, 2, 3]);

        let mov = load_mov(&file).unwrap();
        assert_eq!(mov.spr_name, "HERO.SPR");
        assert_eq!(mov.wgp_name, "ROOM.WGP");
        assert_eq!(mov.speed, 80);
        assert_eq!(mov.sounds, vec!["STEP.WAV".to_string()]);
        assert_eq!(mov.boxes[0], MovBox { group: 2, state: 1, x1: 1, y1: 2, x2: 3, y2: 4 });
        let hero = &mov.objects[0];
        assert_eq!(hero.class_name, "PLAYER");
        assert_eq!((hero.mode, hero.mode_rnd_mul), (2, 7));
        assert_eq!((hero.x_init, hero.y_init), (100, 200));
        assert_eq!(hero.motion_num, 1);
        assert_eq!(hero.vars, vec![(4, 9)]);
        assert_eq!(mov.unk26, 12);
        assert_eq!(mov.script, vec![1, 2, 3]);
    }

    #[test]
    fn test_mov_motion_records_wrap() {
        let mut file = TAG_MOV.to_le_bytes().to_vec();
        put_str(&mut file, "A.SPR");
        put_str(&mut file, "A.WGP");
        put_u16(&mut file, 50);
        put_u16(&mut file, 3);
        put_str(&mut file, "A");
        for v in [5500u16, 0x8000, 5000, 0x8000, 0] {
            put_u16(&mut file, v);
        }
        put_u16(&mut file, 4);
        put_u16(&mut file, 0);

        let mov = load_mov(&file).unwrap();
        assert_eq!(mov.objects[0].motion_num, i16::MAX);
        assert_eq!(mov.objects[0].motion_frame_num, i16::MAX);
    }

    #[test]
    fn test_spr_path_for_mov() {
        assert_eq!(spr_path_for_mov("..\\C1\\HERO.MOV", "HERO.SPR"), "..\\C1\\HERO.SPR");
        assert_eq!(spr_path_for_mov("HERO.MOV", "X.SPR"), "X.SPR");
    }

    #[test]
    fn test_load_kbr() {
        let mut data = vec![0u8; 256];
        data[128 + 13] = 1;
        let mut replay = load_kbr(&data);
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.next_record().unwrap()[13], 0);
        assert_eq!(replay.next_record().unwrap()[13], 1);
        assert!(replay.next_record().is_none());
    }

    #[test]
    fn test_load_dialogue_sprites() {
        let mut file = TAG_SPR_LZSS.to_le_bytes().to_vec();
        put_u16(&mut file, 2);
        put_u16(&mut file, 1);
        file.extend_from_slice(&[7; 11]);
        put_u16(&mut file, 0);
        file.extend_from_slice(&[8; 10]);
        let frames = load_dialogue_sprites(&file).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![7; 11]);
        assert_eq!(frames[1].len(), 10);

        let mut bad = TAG_SPR_ZLIB.to_le_bytes().to_vec();
        put_u16(&mut bad, 0);
        assert!(matches!(load_dialogue_sprites(&bad), Err(ResourceError::InvalidSpr(_))));
        let mut many = TAG_SPR_LZSS.to_le_bytes().to_vec();
        put_u16(&mut many, 106);
        assert!(matches!(load_dialogue_sprites(&many), Err(ResourceError::TooManyFrames(106))));
    }
}
