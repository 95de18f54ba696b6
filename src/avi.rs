//! AVI cutscenes
//!
//! The cutscenes are RIFF AVI files with two streams: Cinepak (`cvid`)
//! video at 320x200 and 8-bit mono PCM audio at 44100 Hz, interleaved in
//! `LIST rec ` records. Video frames are decoded to a YUY2 buffer handed to
//! [`SystemStub::copy_yuv`]; audio chunks are queued and played through the
//! mixer stream at half rate.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::mixer::{Mixer, MixerChannel};
use crate::system::SystemStub;
use crate::util::{read_le_u16, read_le_u32, ByteReader, ReadError};

pub const FRAME_WIDTH: usize = 320;
pub const FRAME_HEIGHT: usize = 200;
const SOUND_PRELOAD_SIZE: usize = 4;

const SIZE_OF_AVIH: u32 = 56;
const SIZE_OF_STRH: u32 = 56;
const SIZE_OF_WAVEFORMAT: u32 = 16;
const SIZE_OF_BITMAPINFO: u32 = 40;

const MAX_STRIPS: usize = 2;
const MAX_VECTORS: usize = 256;
const CODEBOOK_V1: usize = 0;
const CODEBOOK_V4: usize = 1;

#[derive(Debug, Error)]
pub enum AviError {
    #[error("Not an AVI file")]
    NotAvi,

    #[error("Unsupported {0} header")]
    UnsupportedHeader(&'static str),

    #[error("No movi list")]
    MissingMovi,

    #[error("Invalid frame rate")]
    FrameRate,

    #[error("Unsupported cinepak frame {w}x{h} with {strips} strips")]
    CinepakFrame { w: u16, h: u16, strips: u16 },

    #[error("Chunk of {size} bytes overruns the file ({available} bytes left)")]
    ChunkSize { size: usize, available: usize },

    #[error("Cinepak frame truncated at offset {0}")]
    CinepakTruncated(usize),

    #[error(transparent)]
    Read(#[from] ReadError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AviHeader {
    pub frames: u32,
    pub width: u32,
    pub height: u32,
    pub streams: u32,
    /// Frames per second.
    pub frame_rate: u32,
    pub audio_buffer_size: u32,
    pub video_buffer_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChunkKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy)]
pub struct AviChunk<'a> {
    pub kind: ChunkKind,
    pub data: &'a [u8],
}

pub struct AviDemuxer<'a> {
    r: ByteReader<'a>,
    header: AviHeader,
    records_list_size: i64,
}

impl<'a> AviDemuxer<'a> {
    /// Parses the headers up to the `movi` list.
    pub fn open(data: &'a [u8]) -> Result<Self, AviError> {
        let mut r = ByteReader::at(data, 8);
        if r.bytes(4)? != b"AVI " {
            return Err(AviError::NotAvi);
        }
        let mut header = AviHeader::default();
        loop {
            let tag = r.bytes(4)?;
            let len = r.u32()?;
            match tag {
                b"LIST" => {
                    if r.bytes(4)? == b"movi" {
                        tracing::debug!(target: "bermuda::info", ?header, "avi headers");
                        return Ok(Self { r, header, records_list_size: 0 });
                    }
                }
                b"avih" if len == SIZE_OF_AVIH => read_avih(&mut r, &mut header)?,
                b"strh" if len == SIZE_OF_STRH => read_strh(&mut r, &mut header)?,
                b"strf" if len == SIZE_OF_WAVEFORMAT => read_strf_auds(&mut r)?,
                b"strf" if len == SIZE_OF_BITMAPINFO => read_strf_vids(&mut r, &header)?,
                _ => {
                    if r.remaining() < len as usize {
                        return Err(AviError::MissingMovi);
                    }
                    r.skip(len as usize)?;
                }
            }
        }
    }

    pub fn header(&self) -> &AviHeader {
        &self.header
    }

    /// Next audio or video chunk of the current record. `None` ends the
    /// frame: an unknown chunk, the end of a record or the end of the file.
    pub fn read_next_chunk(&mut self) -> Result<Option<AviChunk<'a>>, AviError> {
        if self.r.remaining() < 8 {
            return Ok(None);
        }
        if self.records_list_size <= 0 {
            // 'LIST', size, 'rec '
            let list = self.r.bytes(12)?;
            self.records_list_size = read_le_u32(list, 4).unwrap_or(4) as i64 - 4;
        }
        let tag = self.r.bytes(4)?;
        let size = self.r.u32()? as usize;
        let available = self.r.remaining();
        if size > available {
            return Err(AviError::ChunkSize { size, available });
        }
        // chunks are word aligned, the pad of the last one may be missing
        let len = (size + 1) & !1;
        self.records_list_size -= len as i64 + 8;
        let kind = match &tag[2..4] {
            b"wb" => ChunkKind::Audio,
            b"dc" => ChunkKind::Video,
            _ => {
                self.r.skip(len.min(self.r.remaining()))?;
                return Ok(None);
            }
        };
        let data = self.r.bytes(len.min(self.r.remaining()))?;
        let chunk = AviChunk { kind, data };
        if self.records_list_size <= 0 {
            // the caller sees the chunk, the next call starts a new frame
            self.records_list_size = 0;
        }
        Ok(Some(chunk))
    }

    /// Chunks of the next record, empty at the end of the stream.
    pub fn next_frame_chunks(&mut self) -> Result<Vec<AviChunk<'a>>, AviError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.read_next_chunk()? {
            chunks.push(chunk);
            if self.records_list_size == 0 {
                break;
            }
        }
        Ok(chunks)
    }
}

fn read_avih(r: &mut ByteReader<'_>, header: &mut AviHeader) -> Result<(), AviError> {
    let hdr = r.bytes(SIZE_OF_AVIH as usize)?;
    let usec_per_frame = read_le_u32(hdr, 0).unwrap_or(0);
    if usec_per_frame == 0 {
        return Err(AviError::FrameRate);
    }
    header.frame_rate = 1_000_000 / usec_per_frame;
    header.frames = read_le_u32(hdr, 16).unwrap_or(0);
    header.streams = read_le_u32(hdr, 24).unwrap_or(0);
    header.width = read_le_u32(hdr, 32).unwrap_or(0);
    header.height = read_le_u32(hdr, 36).unwrap_or(0);
    if header.frame_rate == 0 {
        return Err(AviError::FrameRate);
    }
    if header.streams != 2 || header.width as usize != FRAME_WIDTH || header.height as usize != FRAME_HEIGHT {
        return Err(AviError::UnsupportedHeader("avih"));
    }
    Ok(())
}

fn read_strh(r: &mut ByteReader<'_>, header: &mut AviHeader) -> Result<(), AviError> {
    let hdr = r.bytes(SIZE_OF_STRH as usize)?;
    let buffer_size = read_le_u32(hdr, 36).unwrap_or(0);
    if &hdr[0..4] == b"auds" && read_le_u32(hdr, 4) == Some(0) {
        header.audio_buffer_size = buffer_size;
        return Ok(());
    }
    if &hdr[0..4] == b"vids" && &hdr[4..8] == b"cvid" {
        header.video_buffer_size = buffer_size;
        return Ok(());
    }
    Err(AviError::UnsupportedHeader("strh"))
}

fn read_strf_auds(r: &mut ByteReader<'_>) -> Result<(), AviError> {
    let hdr = r.bytes(SIZE_OF_WAVEFORMAT as usize)?;
    let format_tag = read_le_u16(hdr, 0);
    let channels = read_le_u16(hdr, 2);
    let sample_rate = read_le_u32(hdr, 4);
    let bits = read_le_u16(hdr, 14);
    if format_tag == Some(1) && channels == Some(1) && sample_rate == Some(44100) && bits == Some(8) {
        Ok(())
    } else {
        Err(AviError::UnsupportedHeader("strf auds"))
    }
}

fn read_strf_vids(r: &mut ByteReader<'_>, header: &AviHeader) -> Result<(), AviError> {
    let hdr = r.bytes(SIZE_OF_BITMAPINFO as usize)?;
    let width = read_le_u32(hdr, 4);
    let height = read_le_u32(hdr, 8);
    let planes = read_le_u16(hdr, 12);
    let depth = read_le_u16(hdr, 14);
    if width == Some(header.width) && height == Some(header.height) && planes == Some(1) && depth == Some(24) {
        Ok(())
    } else {
        Err(AviError::UnsupportedHeader("strf vids"))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct YuvVector {
    y: [u8; 4],
    u: u8,
    v: u8,
}

// Cinepak data is big endian.
struct CinepakReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CinepakReader<'a> {
    fn byte(&mut self) -> Result<u8, AviError> {
        let b = *self.data.get(self.pos).ok_or(AviError::CinepakTruncated(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn word(&mut self) -> Result<u16, AviError> {
        Ok(u16::from_be_bytes([self.byte()?, self.byte()?]))
    }

    fn long(&mut self) -> Result<u32, AviError> {
        Ok(u32::from_be_bytes([self.byte()?, self.byte()?, self.byte()?, self.byte()?]))
    }

    fn advance(&mut self, n: i32) {
        self.pos = (self.pos as i64 + n as i64).max(0) as usize;
    }
}

/// Cinepak decoder writing YUY2 (`u y0 v y1`) pixels.
pub struct CinepakDecoder {
    vectors: Box<[[[YuvVector; MAX_VECTORS]; MAX_STRIPS]; 2]>,
    w: usize,
    h: usize,
    x_pos: usize,
    y_pos: usize,
    frame: Vec<u8>,
    pitch: usize,
}

impl Default for CinepakDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CinepakDecoder {
    pub fn new() -> Self {
        let pitch = FRAME_WIDTH * 2;
        Self {
            vectors: Box::new([[[YuvVector::default(); MAX_VECTORS]; MAX_STRIPS]; 2]),
            w: FRAME_WIDTH,
            h: FRAME_HEIGHT,
            x_pos: 0,
            y_pos: 0,
            frame: vec![0; pitch * FRAME_HEIGHT],
            pitch,
        }
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    fn put(&mut self, row: usize, col: usize, px: [u8; 4]) {
        let offset = (self.y_pos + row) * self.pitch + (self.x_pos + col) * 2;
        if let Some(dst) = self.frame.get_mut(offset..offset + 4) {
            dst.copy_from_slice(&px);
        }
    }

    fn decode_frame_v4(&mut self, v: [YuvVector; 4]) {
        for (quad, (row, col)) in [(0, 0), (0, 2), (2, 0), (2, 2)].into_iter().enumerate() {
            let q = v[quad];
            self.put(row, col, [q.u, q.y[0], q.v, q.y[1]]);
            self.put(row + 1, col, [q.u, q.y[2], q.v, q.y[3]]);
        }
    }

    fn decode_frame_v1(&mut self, v: YuvVector) {
        let px = |y: u8| [v.u, y, v.v, y];
        for (row, (left, right)) in [(0, 1), (0, 1), (2, 3), (2, 3)].into_iter().enumerate() {
            self.put(row, 0, px(v.y[left]));
            self.put(row, 2, px(v.y[right]));
        }
    }

    fn advance_block(&mut self) {
        self.x_pos += 4;
        if self.x_pos >= self.w {
            self.x_pos = 0;
            self.y_pos += 4;
        }
    }

    fn read_vector(r: &mut CinepakReader<'_>) -> Result<YuvVector, AviError> {
        let mut v = YuvVector::default();
        for y in v.y.iter_mut() {
            *y = r.byte()?;
        }
        v.u = r.byte()?.wrapping_add(128);
        v.v = r.byte()?.wrapping_add(128);
        Ok(v)
    }

    fn read_v4(&self, r: &mut CinepakReader<'_>, strip: usize) -> Result<[YuvVector; 4], AviError> {
        let table = &self.vectors[CODEBOOK_V4][strip];
        Ok([
            table[r.byte()? as usize],
            table[r.byte()? as usize],
            table[r.byte()? as usize],
            table[r.byte()? as usize],
        ])
    }

    pub fn decode(&mut self, data: &[u8]) -> Result<(), AviError> {
        let mut r = CinepakReader { data, pos: 0 };
        let flags = r.byte()?;
        r.advance(3);
        let w = r.word()?;
        let h = r.word()?;
        let strips = r.word()?;
        if w as usize != self.w || h as usize != self.h || strips as usize != MAX_STRIPS {
            return Err(AviError::CinepakFrame { w, h, strips });
        }
        self.x_pos = 0;
        self.y_pos = 0;
        let mut y_max = 0usize;
        for strip in 0..MAX_STRIPS {
            if strip != 0 && flags & 1 == 0 {
                for book in [CODEBOOK_V1, CODEBOOK_V4] {
                    self.vectors[book][strip] = self.vectors[book][strip - 1];
                }
            }
            r.word()?;
            let mut size = r.word()? as i32;
            r.word()?;
            r.word()?;
            let strip_height = r.word()? as usize;
            r.word()?;
            size -= 12;
            self.x_pos = 0;
            y_max += strip_height;
            while size > 0 {
                let chunk_type = r.word()?;
                let chunk_total = r.word()? as i32;
                size -= chunk_total;
                let mut chunk_size = chunk_total - 4;
                match chunk_type {
                    0x2000 | 0x2200 => {
                        let book = if chunk_type == 0x2200 { CODEBOOK_V1 } else { CODEBOOK_V4 };
                        let count = (chunk_size / 6).clamp(0, MAX_VECTORS as i32) as usize;
                        for i in 0..count {
                            self.vectors[book][strip][i] = Self::read_vector(&mut r)?;
                        }
                        chunk_size -= count as i32 * 6;
                    }
                    0x2100 | 0x2300 => {
                        let book = if chunk_type == 0x2300 { CODEBOOK_V1 } else { CODEBOOK_V4 };
                        let mut i = 0usize;
                        while chunk_size > 0 {
                            let mask = r.long()?;
                            chunk_size -= 4;
                            for bit in 0..32 {
                                if mask & (1 << (31 - bit)) != 0 {
                                    let v = Self::read_vector(&mut r)?;
                                    if let Some(slot) = self.vectors[book][strip].get_mut(i) {
                                        *slot = v;
                                    }
                                    chunk_size -= 6;
                                }
                                i += 1;
                            }
                        }
                    }
                    0x3000 => {
                        while chunk_size > 0 && self.y_pos < y_max {
                            let mask = r.long()?;
                            chunk_size -= 4;
                            let mut bit = 0;
                            while bit < 32 && self.y_pos < y_max {
                                if mask & (1 << (31 - bit)) != 0 {
                                    let v = self.read_v4(&mut r, strip)?;
                                    chunk_size -= 4;
                                    self.decode_frame_v4(v);
                                } else {
                                    let v = self.vectors[CODEBOOK_V1][strip][r.byte()? as usize];
                                    chunk_size -= 1;
                                    self.decode_frame_v1(v);
                                }
                                self.advance_block();
                                bit += 1;
                            }
                        }
                    }
                    0x3100 => {
                        while chunk_size > 0 && self.y_pos < y_max {
                            let mut mask = r.long()?;
                            chunk_size -= 4;
                            let mut bit = 0;
                            while bit < 32 && chunk_size >= 0 && self.y_pos < y_max {
                                if mask & (1 << (31 - bit)) != 0 {
                                    bit += 1;
                                    if bit == 32 {
                                        mask = r.long()?;
                                        chunk_size -= 4;
                                        bit = 0;
                                    }
                                    if mask & (1 << (31 - bit)) != 0 {
                                        let v = self.read_v4(&mut r, strip)?;
                                        chunk_size -= 4;
                                        self.decode_frame_v4(v);
                                    } else {
                                        let v = self.vectors[CODEBOOK_V1][strip][r.byte()? as usize];
                                        chunk_size -= 1;
                                        self.decode_frame_v1(v);
                                    }
                                }
                                bit += 1;
                                self.advance_block();
                            }
                        }
                    }
                    0x3200 => {
                        while chunk_size > 0 && self.y_pos < y_max {
                            let v = self.vectors[CODEBOOK_V1][strip][r.byte()? as usize];
                            chunk_size -= 1;
                            self.decode_frame_v1(v);
                            self.advance_block();
                        }
                    }
                    _ => {}
                }
                r.advance(chunk_size);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct SoundQueue {
    buffers: VecDeque<(Vec<u8>, usize)>,
    preloaded: usize,
}

/// Cutscene audio: 44.1 kHz unsigned 8-bit mono played every second
/// sample, silent until a few chunks are queued.
#[derive(Clone, Default)]
pub struct AviSoundStream {
    queue: Arc<Mutex<SoundQueue>>,
}

impl AviSoundStream {
    pub fn push(&self, chunk: &[u8]) {
        let mut q = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        q.buffers.push_back((chunk.to_vec(), 0));
        if q.preloaded < SOUND_PRELOAD_SIZE {
            q.preloaded += 1;
        }
    }

    pub fn queued_chunks(&self) -> usize {
        self.queue.lock().unwrap_or_else(|p| p.into_inner()).buffers.len()
    }
}

impl MixerChannel for AviSoundStream {
    fn read(&mut self, dst: &mut [i16]) -> usize {
        let frames = dst.len() / 2;
        let mut q = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        if q.preloaded < SOUND_PRELOAD_SIZE {
            return frames;
        }
        let mut i = 0;
        while i < frames {
            let Some((buffer, offset)) = q.buffers.front_mut() else {
                break;
            };
            let sample = (((buffer.get(*offset).copied().unwrap_or(0x80) as u16) << 8) ^ 0x8000) as i16;
            dst[i * 2] = sample;
            dst[i * 2 + 1] = sample;
            // 44 kHz stream played by a 22 kHz mixer
            *offset += 2;
            if *offset >= buffer.len() {
                q.buffers.pop_front();
            }
            i += 1;
        }
        if i < frames {
            tracing::warn!(target: "bermuda::mixer", missing = frames - i, "avi sound queue underrun");
        }
        frames
    }
}

/// Outcome of [`play`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub frames_total: u32,
    pub frames_played: u32,
    pub audio_chunks: u32,
    pub video_chunks: u32,
    pub interrupted: bool,
}

/// Plays an AVI file, `enter` or a quit request stops the playback.
pub fn play<S: SystemStub>(data: &[u8], stub: &mut S, mixer: &Mixer) -> Result<PlaybackReport, AviError> {
    let mut demux = AviDemuxer::open(data)?;
    let header = *demux.header();
    let mut cinepak = CinepakDecoder::new();
    let sound = AviSoundStream::default();
    let mut report = PlaybackReport { frames_total: header.frames, ..Default::default() };

    stub.set_yuv(true, header.width as usize, header.height as usize);
    mixer.set_stream(Some(Box::new(sound.clone())));
    let result = (|| -> Result<(), AviError> {
        for _ in 0..header.frames {
            let next_frame_time = stub.time_stamp().wrapping_add(1000 / header.frame_rate);
            stub.process_events();
            if stub.quit_requested() || stub.input().enter || stub.input().escape {
                stub.input_mut().enter = false;
                stub.input_mut().escape = false;
                report.interrupted = true;
                break;
            }
            for chunk in demux.next_frame_chunks()? {
                match chunk.kind {
                    ChunkKind::Audio => {
                        sound.push(chunk.data);
                        report.audio_chunks += 1;
                    }
                    ChunkKind::Video => {
                        cinepak.decode(chunk.data)?;
                        stub.copy_yuv(cinepak.frame(), cinepak.pitch());
                        stub.update_screen();
                        report.video_chunks += 1;
                    }
                }
            }
            report.frames_played += 1;
            let diff = next_frame_time.wrapping_sub(stub.time_stamp()) as i32;
            if diff > 0 {
                stub.sleep(diff as u32);
            }
        }
        Ok(())
    })();
    mixer.set_stream(None);
    stub.set_yuv(false, 0, 0);
    result.map(|_| report)
}

/// Headers and chunk counts without decoding.
pub fn scan(data: &[u8]) -> Result<(AviHeader, u32, u32), AviError> {
    let mut demux = AviDemuxer::open(data)?;
    let header = *demux.header();
    let (mut audio, mut video) = (0, 0);
    for _ in 0..header.frames {
        let chunks = demux.next_frame_chunks()?;
        if chunks.is_empty() {
            break;
        }
        for chunk in chunks {
            match chunk.kind {
                ChunkKind::Audio => audio += 1,
                ChunkKind::Video => video += 1,
            }
        }
    }
    Ok((header, audio, video))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::system::HeadlessStub;

    fn chunk(tag: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        if payload.len() % 2 == 1 {
            out.push(0);
        }
        out
    }

    fn list(kind: &[u8], body: &[u8]) -> Vec<u8> {
        let mut payload = kind.to_vec();
        payload.extend_from_slice(body);
        chunk(b"LIST", &payload)
    }

    /// Cinepak frame filled with V1 codebook entry 0.
    pub(crate) fn solid_cinepak_frame(y: u8, u: i8, v: i8) -> Vec<u8> {
        let blocks = (FRAME_WIDTH / 4) * (FRAME_HEIGHT / 2 / 4);
        let mut strips = Vec::new();
        for _ in 0..MAX_STRIPS {
            let mut body = Vec::new();
            // V1 codebook with one vector
            body.extend_from_slice(&0x2200u16.to_be_bytes());
            body.extend_from_slice(&(4u16 + 6).to_be_bytes());
            body.extend_from_slice(&[y, y, y, y, u as u8, v as u8]);
            // V1 only image
            body.extend_from_slice(&0x3200u16.to_be_bytes());
            body.extend_from_slice(&((4 + blocks) as u16).to_be_bytes());
            body.extend(std::iter::repeat(0u8).take(blocks));
            let mut strip = Vec::new();
            strip.extend_from_slice(&0x1000u16.to_be_bytes());
            strip.extend_from_slice(&((12 + body.len()) as u16).to_be_bytes());
            strip.extend_from_slice(&[0, 0, 0, 0]);
            strip.extend_from_slice(&((FRAME_HEIGHT / 2) as u16).to_be_bytes());
            strip.extend_from_slice(&(FRAME_WIDTH as u16).to_be_bytes());
            strip.extend_from_slice(&body);
            strips.push(strip);
        }
        let mut out = vec![0u8, 0, 0, 0];
        out.extend_from_slice(&(FRAME_WIDTH as u16).to_be_bytes());
        out.extend_from_slice(&(FRAME_HEIGHT as u16).to_be_bytes());
        out.extend_from_slice(&(MAX_STRIPS as u16).to_be_bytes());
        for s in strips {
            out.extend_from_slice(&s);
        }
        out
    }

    pub(crate) fn build_avi(frames: &[Vec<u8>], audio: &[u8]) -> Vec<u8> {
        let mut avih = vec![0u8; 56];
        avih[0..4].copy_from_slice(&66_666u32.to_le_bytes());
        avih[16..20].copy_from_slice(&(frames.len() as u32).to_le_bytes());
        avih[24..28].copy_from_slice(&2u32.to_le_bytes());
        avih[32..36].copy_from_slice(&(FRAME_WIDTH as u32).to_le_bytes());
        avih[36..40].copy_from_slice(&(FRAME_HEIGHT as u32).to_le_bytes());

        let mut strh_a = vec![0u8; 56];
        strh_a[0..4].copy_from_slice(b"auds");
        strh_a[36..40].copy_from_slice(&4096u32.to_le_bytes());
        let mut strf_a = vec![0u8; 16];
        strf_a[0..2].copy_from_slice(&1u16.to_le_bytes());
        strf_a[2..4].copy_from_slice(&1u16.to_le_bytes());
        strf_a[4..8].copy_from_slice(&44100u32.to_le_bytes());
        strf_a[14..16].copy_from_slice(&8u16.to_le_bytes());

        let mut strh_v = vec![0u8; 56];
        strh_v[0..4].copy_from_slice(b"vids");
        strh_v[4..8].copy_from_slice(b"cvid");
        strh_v[36..40].copy_from_slice(&65536u32.to_le_bytes());
        let mut strf_v = vec![0u8; 40];
        strf_v[4..8].copy_from_slice(&(FRAME_WIDTH as u32).to_le_bytes());
        strf_v[8..12].copy_from_slice(&(FRAME_HEIGHT as u32).to_le_bytes());
        strf_v[12..14].copy_from_slice(&1u16.to_le_bytes());
        strf_v[14..16].copy_from_slice(&24u16.to_le_bytes());

        let mut strl_a = chunk(b"strh", &strh_a);
        strl_a.extend_from_slice(&chunk(b"strf", &strf_a));
        let mut strl_v = chunk(b"strh", &strh_v);
        strl_v.extend_from_slice(&chunk(b"strf", &strf_v));
        let mut hdrl = chunk(b"avih", &avih);
        hdrl.extend_from_slice(&list(b"strl", &strl_a));
        hdrl.extend_from_slice(&list(b"strl", &strl_v));

        let mut movi = Vec::new();
        for frame in frames {
            let mut rec = chunk(b"01wb", audio);
            rec.extend_from_slice(&chunk(b"00dc", frame));
            movi.extend_from_slice(&list(b"rec ", &rec));
        }

        let mut body = b"AVI ".to_vec();
        body.extend_from_slice(&list(b"hdrl", &hdrl));
        body.extend_from_slice(&list(b"movi", &movi));
        chunk(b"RIFF", &body)
    }

    #[test]
    fn test_demuxer_headers_and_records() {
        let frame = solid_cinepak_frame(100, 0, 0);
        let avi = build_avi(&[frame.clone(), frame], &[0x80; 64]);
        let (header, audio, video) = scan(&avi).unwrap();
        assert_eq!(header.frames, 2);
        assert_eq!(header.frame_rate, 15);
        assert_eq!(header.audio_buffer_size, 4096);
        assert_eq!((audio, video), (2, 2));
    }

    #[test]
    fn test_oversized_chunk_is_an_error() {
        let mut avi = build_avi(&[solid_cinepak_frame(100, 0, 0)], &[0x80; 64]);
        let pos = avi.windows(4).position(|w| w == b"01wb").unwrap();
        avi[pos + 4..pos + 8].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        let mut demuxer = AviDemuxer::open(&avi).unwrap();
        assert!(matches!(
            demuxer.read_next_chunk(),
            Err(AviError::ChunkSize { size: 0xFFFF_FFFF, .. })
        ));
        assert!(scan(&avi).is_err());
    }

    #[test]
    fn test_rejects_non_avi() {
        let mut data = b"RIFF\0\0\0\0WAVE".to_vec();
        data.extend_from_slice(&[0; 16]);
        assert!(matches!(AviDemuxer::open(&data), Err(AviError::NotAvi)));
    }

    #[test]
    fn test_cinepak_v1_fill() {
        let mut dec = CinepakDecoder::new();
        dec.decode(&solid_cinepak_frame(100, 10, -10)).unwrap();
        let frame = dec.frame();
        assert_eq!(&frame[0..4], &[138, 100, 118, 100]);
        let last = (FRAME_HEIGHT - 1) * dec.pitch() + (FRAME_WIDTH - 2) * 2;
        assert_eq!(&frame[last..last + 4], &[138, 100, 118, 100]);
    }

    #[test]
    fn test_cinepak_rejects_bad_dimensions() {
        let mut data = solid_cinepak_frame(0, 0, 0);
        data[4..6].copy_from_slice(&640u16.to_be_bytes());
        assert!(matches!(
            CinepakDecoder::new().decode(&data),
            Err(AviError::CinepakFrame { w: 640, .. })
        ));
        assert!(matches!(
            CinepakDecoder::new().decode(&data[..20]),
            Err(AviError::CinepakFrame { .. }) | Err(AviError::CinepakTruncated(_))
        ));
    }

    #[test]
    fn test_sound_stream_preload_and_decimation() {
        let mut stream = AviSoundStream::default();
        stream.push(&[0xC0, 0x00, 0x40, 0x00]);
        let mut buf = [1i16; 4];
        // not enough chunks queued yet, left untouched
        assert_eq!(stream.read(&mut buf), 2);
        assert_eq!(buf, [1; 4]);
        for _ in 0..3 {
            stream.push(&[0x80, 0x80]);
        }
        stream.read(&mut buf);
        assert_eq!(buf, [0x4000, 0x4000, -0x4000, -0x4000]);
        assert_eq!(stream.queued_chunks(), 3);
    }

    #[test]
    fn test_play_and_interrupt() {
        let frame = solid_cinepak_frame(50, 0, 0);
        let avi = build_avi(&[frame.clone(), frame.clone(), frame], &[0x80; 32]);
        let mixer = Mixer::new(22050);
        let mut stub = HeadlessStub::default();
        let report = play(&avi, &mut stub, &mixer).unwrap();
        assert_eq!(report.frames_played, 3);
        assert_eq!(report.video_chunks, 3);
        assert!(!report.interrupted);
        assert_eq!(stub.frames().len(), 3);
        assert!(stub.frames().iter().all(|f| f.yuv));

        let mut stub = HeadlessStub::default();
        stub.input_mut().enter = true;
        let report = play(&avi, &mut stub, &mixer).unwrap();
        assert!(report.interrupted);
        assert_eq!(report.frames_played, 0);
        assert!(!stub.input().enter);
    }
}
