//! Object script interpreter
//!
//! A script is a list of statements. A statement starts with the offset of
//! its end, then conditions up to a `0` word, then operators up to the end
//! offset. The operators only run when every condition holds. Operator
//! `100` ends the whole script.
//!
//! Object operands are encoded as a length prefixed name: `-1` for no
//! object, `0` for the object running the script.

use std::sync::Arc;

use crate::system::SystemStub;
use crate::util::{bytes_to_string, read_le_i16};

use super::logic::Axis;
use super::state::{
    BagObject, SceneBox, SceneObjectStatus, BOXES_PER_GROUP, FLIP_X, LEFT_MOUSE_BUTTON, NUM_BAG_OBJECTS, NUM_BOXES,
    RIGHT_MOUSE_BUTTON,
};
use super::{index_error, Game, GameError};

const OP_BREAK: i16 = 100;

/// Interpreter registers.
#[derive(Debug, Clone)]
pub(crate) struct ObjectScript {
    data: Arc<[u8]>,
    pub(crate) offset: usize,
    pub(crate) current_object: usize,
    /// Cleared when the last object operand referred to the current object.
    pub(crate) object_found: bool,
    /// Index into the next scenes table requested by the scripts this frame.
    pub(crate) next_scene: Option<usize>,
    pub(crate) statement: usize,
}

impl Default for ObjectScript {
    fn default() -> Self {
        Self {
            data: Arc::from(Vec::new()),
            offset: 0,
            current_object: 0,
            object_found: false,
            next_scene: None,
            statement: 0,
        }
    }
}

impl ObjectScript {
    pub(crate) fn load(&mut self, object: usize, data: Arc<[u8]>) {
        self.data = data;
        self.offset = 0;
        self.current_object = object;
        self.statement = 0;
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn fetch_word(&mut self) -> Result<i16, GameError> {
        let w = read_le_i16(&self.data, self.offset).ok_or(GameError::ScriptTruncated(self.offset))?;
        self.offset += 2;
        Ok(w)
    }

    /// Length prefixed, NUL terminated string.
    pub(crate) fn fetch_string(&mut self) -> Result<String, GameError> {
        let start = self.offset;
        let len = self.fetch_word()?;
        if len < 1 {
            return Err(GameError::ScriptString(start));
        }
        let len = len as usize;
        let raw = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or(GameError::ScriptTruncated(self.offset))?;
        if raw[len - 1] != 0 {
            return Err(GameError::ScriptString(start));
        }
        let s = bytes_to_string(raw);
        self.offset += len;
        Ok(s)
    }

    fn peek_string(&self) -> Result<String, GameError> {
        let raw = self.data.get(self.offset..).ok_or(GameError::ScriptTruncated(self.offset))?;
        Ok(bytes_to_string(raw))
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.offset += n;
    }

    pub(crate) fn rewind(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }
}

fn eval_op(op: i16, val: i16, arg: i16, offset: usize) -> Result<i16, GameError> {
    Ok(match op {
        0 => arg,
        1 => val.wrapping_add(arg),
        2 => val.wrapping_sub(arg),
        3 => val.wrapping_mul(arg),
        4 => {
            if arg == 0 {
                return Err(GameError::DivisionByZero(offset));
            }
            val.wrapping_div(arg)
        }
        _ => return Err(GameError::InvalidEvalOp(op)),
    })
}

fn compare_op(op: i16, val: i16, arg: i16) -> Result<bool, GameError> {
    Ok(match op {
        0 => arg == val,
        1 => arg != val,
        2 => arg > val,
        3 => arg < val,
        4 => arg >= val,
        5 => arg <= val,
        _ => return Err(GameError::InvalidEvalOp(op)),
    })
}

fn box_slot(group: i32, index: i32) -> Result<(usize, usize), GameError> {
    if group < 0 || group as usize >= NUM_BOXES {
        return Err(index_error("boxes", group));
    }
    if index < 0 || index as usize >= BOXES_PER_GROUP {
        return Err(index_error("boxes", index));
    }
    Ok((group as usize, index as usize))
}

impl<S: SystemStub> Game<S> {
    /// Runs every statement of `data` for `object`.
    pub(crate) fn run_object_script(&mut self, object: usize, data: Arc<[u8]>) -> Result<(), GameError> {
        tracing::trace!(target: "bermuda::opcodes", object, size = data.len(), "run object script");
        self.script.load(object, data);
        let script_end = self.script.len();
        let mut statement = 0;
        while self.script.offset < script_end {
            self.script.statement = statement;
            let start = self.script.offset;
            let end = self.script.fetch_word()? as u16 as usize;
            if end <= start {
                return Err(GameError::StatementEnd { offset: start, end });
            }
            let mut holds = true;
            loop {
                let op = self.script.fetch_word()?;
                if op == 0 {
                    break;
                }
                tracing::trace!(target: "bermuda::opcodes", statement, op, "condition");
                if !self.execute_condition(op)? {
                    holds = false;
                    break;
                }
            }
            let mut end = end;
            if holds {
                while self.script.offset < end {
                    let op = self.script.fetch_word()?;
                    if op == OP_BREAK {
                        end = script_end;
                        break;
                    }
                    tracing::trace!(target: "bermuda::opcodes", statement, op, "operator");
                    self.execute_operator(op)?;
                }
            }
            self.script.offset = end;
            statement += 1;
        }
        Ok(())
    }

    /// Reads an object operand. `None` when no scene object matches.
    pub(crate) fn find_object_by_name(&mut self) -> Result<Option<usize>, GameError> {
        self.script.object_found = true;
        let start = self.script.offset;
        let len = self.script.fetch_word()?;
        match len {
            -1 => Ok(None),
            0 => {
                self.script.object_found = false;
                Ok(Some(self.script.current_object))
            }
            n if n < 0 => Err(GameError::ScriptString(start)),
            n => {
                let name = self.script.peek_string()?;
                self.script.skip(n as usize);
                Ok(self.objects[..self.objects_count].iter().position(|so| so.name == name))
            }
        }
    }

    /// `op arg` applied to `val`.
    pub(crate) fn eval_expr(&mut self, val: i16) -> Result<i16, GameError> {
        let offset = self.script.offset;
        let op = self.script.fetch_word()?;
        let arg = self.script.fetch_word()?;
        eval_op(op, val, arg, offset)
    }

    /// Either a comparison `op arg` or, with `op == -1`, a list of ranges.
    pub(crate) fn test_expr(&mut self, val: i16) -> Result<bool, GameError> {
        let op = self.script.fetch_word()?;
        if op == -1 {
            let count = self.script.fetch_word()?;
            let mut ret = false;
            for _ in 0..count.max(0) {
                let cmp1 = self.script.fetch_word()?;
                let cmp2 = self.script.fetch_word()?;
                if cmp1 > cmp2 {
                    tracing::warn!(target: "bermuda::opcodes", cmp1, cmp2, "inverted range");
                }
                if cmp1 <= val && cmp2 >= val {
                    ret = true;
                }
            }
            Ok(ret)
        } else {
            let arg = self.script.fetch_word()?;
            compare_op(op, val, arg)
        }
    }

    pub(crate) fn find_bag_object(&self, name: &str) -> Option<usize> {
        self.bag.iter().position(|b| b.name.eq_ignore_ascii_case(name))
    }

    fn key_pressed(&mut self) -> Result<bool, GameError> {
        let key = self.script.fetch_word()?;
        let pressed = self
            .keys_pressed
            .get(key as usize)
            .filter(|_| key >= 0)
            .ok_or_else(|| index_error("keys", key))?;
        Ok(*pressed != 0)
    }

    fn object_var_index(&self, var: i16) -> Result<usize, GameError> {
        if (0..10).contains(&var) {
            Ok(var as usize)
        } else {
            Err(index_error("object vars", var))
        }
    }

    /// Corners of the object frame area spanned by two transformed points
    /// per axis, in `x1 x2 y1 y2` order.
    fn transform_rect(&mut self, object: usize) -> Result<(i16, i16, i16, i16), GameError> {
        let x1 = self.transform_pos(object, Axis::X)?;
        let x2 = self.transform_pos(object, Axis::X)?;
        let y1 = self.transform_pos(object, Axis::Y)?;
        let y2 = self.transform_pos(object, Axis::Y)?;
        Ok((x1, x2, y1, y2))
    }

    fn box_groups(&self, group: i16) -> Result<[usize; 2], GameError> {
        if !(0..BOXES_PER_GROUP as i16).contains(&group) {
            return Err(index_error("boxes", group));
        }
        Ok([group as usize, BOXES_PER_GROUP + group as usize])
    }

    fn any_box(&self, groups: [usize; 2], mut pred: impl FnMut(&SceneBox) -> bool) -> bool {
        groups
            .iter()
            .any(|&g| self.boxes[g][..self.boxes_count[g]].iter().any(&mut pred))
    }

    fn execute_condition(&mut self, op: i16) -> Result<bool, GameError> {
        match op {
            10 => Ok(true),
            100 => {
                let rnd = self.rnd.next_number() as i16 as i32;
                let t = self.script.fetch_word()? as i32;
                Ok((t * rnd / 0x8000) & 0xFFFF == 0)
            }
            500 => self.key_pressed(),
            510 => Ok(!self.key_pressed()?),
            1100 => {
                let t = self.script.fetch_word()?;
                let buttons = self.mouse_buttons_pressed;
                Ok(match t {
                    0 => buttons & LEFT_MOUSE_BUTTON != 0,
                    1 => buttons & RIGHT_MOUSE_BUTTON != 0,
                    2 => buttons & LEFT_MOUSE_BUTTON == 0,
                    3 => buttons & RIGHT_MOUSE_BUTTON == 0,
                    _ => true,
                })
            }
            2500 => {
                let index = self.find_object_by_name()?;
                Ok(index == Some(self.script.current_object))
            }
            3000 | 3010 => match self.find_object_by_name()? {
                Some(i) => {
                    let state = self.script.fetch_word()?;
                    let so = &self.objects[i];
                    Ok(state == if op == 3000 { so.state_prev } else { so.state })
                }
                None => {
                    self.script.skip(2);
                    Ok(false)
                }
            },
            3050 => {
                let index = self.find_object_by_name()?;
                let x1 = self.script.fetch_word()? as i32;
                let y1 = self.script.fetch_word()? as i32;
                let x2 = self.script.fetch_word()? as i32;
                let y2 = self.script.fetch_word()? as i32;
                let Some(i) = index else {
                    return Ok(false);
                };
                let so = &self.objects[i];
                if so.state == 0 {
                    return Ok(false);
                }
                let hdr = self.frame_hdr(so.frame_num_prev)?;
                let (x, y) = (so.x_prev as i32, so.y_prev as i32);
                Ok(x + hdr.w as i32 >= x1 && x <= x2 && y + hdr.h as i32 >= y1 && y <= y2)
            }
            3100 | 3105 | 3110 | 3150 => {
                let prev = op == 3100 || op == 3110;
                let axis = if op == 3100 || op == 3105 { Axis::X } else { Axis::Y };
                let index = self.find_object_by_name()?;
                if let Some(i) = index {
                    let so = &self.objects[i];
                    let state = if prev { so.state_prev } else { so.state };
                    if state != 0 {
                        return self.compare_transform(i, axis, prev);
                    }
                }
                self.script.skip(14);
                Ok(index.is_some())
            }
            3300 | 3310 => match self.find_object_by_name()? {
                Some(i) => {
                    let flip = self.script.fetch_word()?;
                    let so = &self.objects[i];
                    Ok(flip == if op == 3300 { so.flip_prev } else { so.flip })
                }
                None => {
                    self.script.skip(2);
                    Ok(false)
                }
            },
            3400 | 3410 => {
                let Some(i) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                let so = &self.objects[i];
                if so.state_prev == 0 {
                    return Ok(false);
                }
                let (frame, motion) = if op == 3400 {
                    (so.frame_num_prev, so.motion_num1)
                } else {
                    (so.frame_num, so.motion_num2)
                };
                let first = self.motion(motion as i32)?.first_frame_index;
                self.test_expr((frame as i32 - first as i32 + 1) as i16)
            }
            3500 | 3510 => {
                let Some(i) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                let so = &self.objects[i];
                if so.state_prev == 0 {
                    return Ok(false);
                }
                let motion = if op == 3500 { so.motion_num1 } else { so.motion_num2 };
                let motion_init = so.motion_init;
                let anim = self.object_anim(i)?;
                let sa = self.animation(anim)?;
                let dx = motion as i32 - sa.first_motion_index as i32;
                let mut ax = 0;
                if self.script.object_found && anim != self.motion(motion_init as i32)?.anim_num {
                    ax = sa.unk26 as i32;
                }
                self.test_expr((ax + dx + 1) as i16)
            }
            3600 => {
                let var = self.script.fetch_word()?;
                let Some(i) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                let v = self.object_var_index(var)?;
                self.test_expr(self.objects[i].vars[v])
            }
            3700 | 3710 => {
                let axis = if op == 3700 { Axis::X } else { Axis::Y };
                let Some(a) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                if self.objects[a].state_prev == 0 {
                    return Ok(false);
                }
                let a1 = self.transform_pos(a, axis)?;
                let a2 = self.transform_pos(a, axis)?;
                let Some(b) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                if self.objects[b].state_prev == 0 {
                    return Ok(false);
                }
                let b1 = self.transform_pos(b, axis)?;
                let b2 = self.transform_pos(b, axis)?;
                Ok(a1.min(a2) <= b1.max(b2) && a1.max(a2) >= b1.min(b2))
            }
            4110 => {
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(4);
                    return Ok(false);
                };
                let so = &self.objects[i];
                let (state, y_prev, y_init, fnp) = (so.state, so.y_prev, so.y_init, so.frame_num_prev);
                let first = self.motion(so.motion_num as i32 + so.motion_init as i32)?.first_frame_index;
                let f = (first as i32 + so.motion_frame_num as i32) as i16;
                let ax = y_prev as i32 - y_init as i32 - self.frame_hdr(fnp)?.y_pos as i32
                    + self.frame_hdr(f)?.y_pos as i32;
                let div = self.script.fetch_word()? as i32;
                let mut v = self.script_rem(ax, div)? as i16;
                if v < 0 {
                    v = (v as i32 + div) as i16;
                }
                let cmp = self.script.fetch_word()?;
                Ok(v == cmp && state == 1)
            }
            6000 => {
                let var = self.script.fetch_word()?;
                let v = self.var_index(var)?;
                self.test_expr(self.vars[v])
            }
            6500 => Ok(self.script.fetch_word()? == self.current_bag_action),
            7000 | 7500 => {
                let group = self.script.fetch_word()?;
                let Some(i) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                if self.objects[i].state_prev == 0 {
                    return Ok(false);
                }
                let (x1, x2, y1, y2) = self.transform_rect(i)?;
                let groups = self.box_groups(group)?;
                let found = self.any_box(groups, |b| {
                    b.in_rect(x1 as i32, x2 as i32, y1 as i32, y2 as i32) && b.state == 1
                });
                Ok(if op == 7000 { found } else { !found })
            }
            8500 => {
                let group = self.script.fetch_word()?;
                let Some(a) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                if self.objects[a].state_prev == 0 {
                    return Ok(false);
                }
                let x1 = self.transform_pos(a, Axis::X)? as i32;
                let y1 = self.transform_pos(a, Axis::Y)? as i32;
                let Some(b) = self.find_object_by_name()? else {
                    return Ok(false);
                };
                if self.objects[b].state_prev == 0 {
                    return Ok(false);
                }
                let x2 = self.transform_pos(b, Axis::X)? as i32;
                let y2 = self.transform_pos(b, Axis::Y)? as i32;
                let groups = self.box_groups(group)?;
                Ok(!self.any_box(groups, |b| b.intersects(x1, y1, x2, y2)))
            }
            10000 => {
                let name = self.script.fetch_string()?;
                Ok(self.find_bag_object(&name).is_some_and(|i| self.current_bag_object == i as i16))
            }
            20000 => Ok(self.life_bar_displayed),
            20010 => Ok(!self.life_bar_displayed),
            25000 => {
                let matched = self.test_expr(self.last_dialogue_ended_id as i16)?;
                Ok(matched && self.dialogue_ended_flag != 0)
            }
            30000 => {
                let num = self.script.fetch_word()?;
                Ok(self.next_scenes.iter().any(|ns| ns.num == num))
            }
            _ => Err(GameError::InvalidCondition(op)),
        }
    }

    fn execute_operator(&mut self, op: i16) -> Result<(), GameError> {
        let current = self.script.current_object;
        match op {
            3000 => {
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(2);
                    return Ok(());
                };
                match self.script.fetch_word()? {
                    0 => {
                        if self.objects[i].state != 0 {
                            let so = &mut self.objects[i];
                            so.x = so.x_prev;
                            so.y = so.y_prev;
                            so.frame_num = so.frame_num_prev;
                            if so.state == 2 {
                                let (x, y, frame) = (so.x as i32, so.y as i32, so.frame_num);
                                let hdr = self.frame_hdr(frame)?;
                                let (w, h) = (hdr.w as i32, hdr.h as i32);
                                let dst_y = self.frame.h as i32 + 1 - y - h;
                                crate::bitmap::copy_buffer_to_buffer(x, dst_y, w, h, &self.background, &mut self.frame);
                            }
                            self.objects[i].state = -1;
                        }
                    }
                    1 => {
                        let mode = self.objects[i].mode;
                        self.objects[i].mode = 1;
                        self.reinitialize_object(i)?;
                        let so = &mut self.objects[i];
                        so.mode = mode;
                        if so.state == 2 {
                            so.state = 1;
                        }
                    }
                    2 => {
                        let so = &mut self.objects[i];
                        if so.state == 1 {
                            so.x = so.x_prev;
                            so.y = so.y_prev;
                            so.frame_num = so.frame_num_prev;
                            so.state = 2;
                        } else {
                            let mode = so.mode;
                            so.mode = 3;
                            self.reinitialize_object(i)?;
                            self.objects[i].mode = mode;
                        }
                    }
                    _ => {}
                }
            }
            3100 | 3110 => {
                if self.objects[current].state != 0 {
                    self.script.skip(6);
                    let axis = if op == 3100 { Axis::X } else { Axis::Y };
                    let v = self.eval_expr(axis.pos(&self.objects[current]))?;
                    *axis.pos_mut(&mut self.objects[current]) = v;
                } else {
                    self.script.skip(6 + 4);
                }
            }
            3120 | 3130 | 3200 => {
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(4);
                    return Ok(());
                };
                let so = &self.objects[i];
                let val = match op {
                    3120 => so.x,
                    3130 => so.y,
                    _ => so.z,
                };
                let v = self.eval_expr(val)?;
                let so = &mut self.objects[i];
                match op {
                    3120 => so.x = v,
                    3130 => so.y = v,
                    _ => so.z = v,
                }
            }
            3300 => match self.find_object_by_name()? {
                Some(i) => self.objects[i].flip = self.script.fetch_word()?,
                None => self.script.skip(2),
            },
            3400 | 3410 | 3430 | 3500 | 3530 => {
                let skip = match op {
                    3400 => 4,
                    3500 => 2,
                    3530 => 6,
                    _ => 8,
                };
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(skip);
                    return Ok(());
                };
                let object2 = self.script.object_found.then_some(i);
                let (count1, count2, dx, dy) = match op {
                    3400 => {
                        let a0 = self.script.fetch_word()? as i32;
                        let a2 = self.script.fetch_word()? as i32;
                        (a2, a0, None, None)
                    }
                    3410 => {
                        let a0 = self.script.fetch_word()? as i32;
                        let a2 = self.script.fetch_word()? as i32;
                        let a4 = self.script.fetch_word()? as i32;
                        self.script.fetch_word()?;
                        (a2, a0, Some(a4), None)
                    }
                    3430 => {
                        let a0 = self.script.fetch_word()? as i32;
                        let a2 = self.script.fetch_word()? as i32;
                        let a4 = self.script.fetch_word()? as i32;
                        let a6 = self.script.fetch_word()? as i32;
                        (a2, a0, Some(a4), Some(a6))
                    }
                    3500 => (1, self.script.fetch_word()? as i32, None, None),
                    _ => {
                        let a0 = self.script.fetch_word()? as i32;
                        let a2 = self.script.fetch_word()? as i32;
                        let a4 = self.script.fetch_word()? as i32;
                        (1, a0, Some(a2), Some(a4))
                    }
                };
                self.change_motion_frame(current, object2, count1, count2, dx, dy)?;
            }
            3440 | 3460 | 3480 | 3540 | 3560 | 3580 => {
                let (use_data, kind_y, skip) = match op {
                    3440 => (true, 1, 16),
                    3460 => (true, 2, 28),
                    3480 => (true, 3, 20),
                    3540 => (false, 1, 14),
                    3560 => (false, 2, 26),
                    _ => (false, 3, 18),
                };
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(skip);
                    return Ok(());
                };
                let object2 = self.script.object_found.then_some(i);
                if !self.setup_object_pos(current, object2, use_data, 2, kind_y)? {
                    self.script.skip(skip);
                }
            }
            4000 => {
                let var = self.script.fetch_word()?;
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(4);
                    return Ok(());
                };
                let v = self.object_var_index(var)?;
                self.objects[i].vars[v] = self.eval_expr(self.objects[i].vars[v])?;
            }
            4100 | 4200 => {
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(8);
                    return Ok(());
                };
                let axis = if op == 4100 { Axis::X } else { Axis::Y };
                let a0 = self.script.fetch_word()?;
                let a2 = self.script.fetch_word()?;
                let a4 = self.script.fetch_word()?;
                let a6 = self.script.fetch_word()?;
                let v = self.translate_pos(i, axis, a0 as i32, a2 as i32, a4 as i32)?;
                let pos = axis.pos_mut(&mut self.objects[i]);
                if a2 / 2 >= v {
                    *pos = pos.wrapping_sub(a6.min(v));
                } else {
                    *pos = pos.wrapping_add(a6.min(a2.wrapping_sub(v)));
                }
            }
            5000 => {
                let index = self.find_object_by_name()?;
                let mode = self.script.fetch_word()?;
                let rnd_mul = if mode == 2 { self.script.fetch_word()? } else { 0 };
                if let Some(i) = index {
                    let so = &mut self.objects[i];
                    so.mode = mode;
                    if mode == 2 {
                        so.mode_rnd_mul = rnd_mul;
                    }
                }
            }
            5100 => match self.find_object_by_name()? {
                Some(i) => {
                    self.objects[i].x_init = self.script.fetch_word()?;
                    self.objects[i].y_init = self.script.fetch_word()?;
                }
                None => self.script.skip(4),
            },
            5110 => match self.find_object_by_name()? {
                Some(i) => {
                    let x = self.transform_pos(current, Axis::X)?;
                    let y = self.transform_pos(current, Axis::Y)?;
                    self.objects[i].x_init = x;
                    self.objects[i].y_init = y;
                }
                None => self.script.skip(12),
            },
            5112 | 5114 | 5200 => {
                let Some(i) = self.find_object_by_name()? else {
                    self.script.skip(4);
                    return Ok(());
                };
                let so = &self.objects[i];
                let val = match op {
                    5112 => so.x_init,
                    5114 => so.y_init,
                    _ => so.z_init,
                };
                let v = self.eval_expr(val)?;
                let so = &mut self.objects[i];
                match op {
                    5112 => so.x_init = v,
                    5114 => so.y_init = v,
                    _ => so.z_init = v,
                }
            }
            5300 => match self.find_object_by_name()? {
                Some(i) => self.objects[i].flip_init = self.script.fetch_word()?,
                None => self.script.skip(2),
            },
            5400 => match self.find_object_by_name()? {
                Some(i) => {
                    self.objects[i].motion_num = self.script.fetch_word()?.wrapping_sub(1);
                    self.objects[i].motion_frame_num = self.script.fetch_word()?.wrapping_sub(1);
                }
                None => self.script.skip(4),
            },
            5500 => match self.find_object_by_name()? {
                Some(i) => {
                    self.objects[i].motion_num = self.script.fetch_word()?.wrapping_sub(1);
                    self.objects[i].motion_frame_num = 0;
                }
                None => self.script.skip(2),
            },
            6000 => {
                let var = self.script.fetch_word()?;
                let v = self.var_index(var)?;
                self.vars[v] = self.eval_expr(self.vars[v])?;
            }
            6100 => {
                let var = self.script.fetch_word()?;
                let v = self.var_index(var)?;
                self.vars[v] = self.scene_number;
            }
            7000 | 7010 => {
                let group = self.script.fetch_word()? as i32;
                let index = self.script.fetch_word()? as i32;
                // the raft scenes disable a box they still need
                if op == 7000 && current == 0 && (self.script.statement == 38 || self.script.statement == 39) {
                    return Ok(());
                }
                let (g, i) = box_slot(group, index)?;
                self.boxes[g][i].state = if op == 7000 { 0 } else { 1 };
            }
            7100 | 7110 => {
                for g in 0..BOXES_PER_GROUP {
                    for i in 0..self.boxes_count[g] {
                        let b = self.boxes[g][i];
                        let (first, second) = if op == 7100 { (b.x1, b.x2) } else { (b.y1, b.y2) };
                        let first = self.eval_expr(first)?;
                        self.script.rewind(4);
                        let second = self.eval_expr(second)?;
                        self.script.rewind(4);
                        let b = &mut self.boxes[g][i];
                        if op == 7100 {
                            b.x1 = first;
                            b.x2 = second;
                        } else {
                            b.y1 = first;
                            b.y2 = second;
                        }
                    }
                }
                self.script.skip(4);
            }
            7200 => {
                let group = self.script.fetch_word()? as i32;
                let index = self.script.fetch_word()? as i32;
                let found = self.find_object_by_name()?.filter(|&i| self.objects[i].state_prev != 0);
                let Some(i) = found else {
                    self.script.skip(24);
                    return Ok(());
                };
                let (x1, x2, y1, y2) = self.transform_rect(i)?;
                let (g, n) = box_slot(group, index)?;
                let b = &mut self.boxes[g][n];
                b.x1 = x1.min(x2);
                b.x2 = x1.max(x2);
                b.y1 = y1.min(y2);
                b.y2 = y1.max(y2);
            }
            7300 => {
                let x1 = self.script.fetch_word()?;
                let y1 = self.script.fetch_word()?;
                let x2 = self.script.fetch_word()?;
                let y2 = self.script.fetch_word()?;
                let clip = |v: i16, lo: i16, hi: i16| v.max(lo).min(hi);
                for g in 0..BOXES_PER_GROUP {
                    let count = self.boxes_count[g];
                    for b in &mut self.boxes[g][..count] {
                        b.x1 = clip(b.x1, x1, x2);
                        b.x2 = clip(b.x2, x1, x2);
                        b.y1 = clip(b.y1, y1, y2);
                        b.y2 = clip(b.y2, y1, y2);
                    }
                }
            }
            8000 => {
                let so = &self.objects[current];
                let hdr = self.frame_hdr(so.frame_num_prev)?;
                let x = if so.flip_prev == FLIP_X {
                    (so.x_prev as i32 + hdr.w as i32 - 1) as i16
                } else {
                    so.x_prev
                };
                let motion = self.motion(so.motion_num1 as i32)?;
                let first_motion = self.animation(motion.anim_num)?.first_motion_index;
                let status = SceneObjectStatus {
                    x,
                    y: so.y_prev,
                    z: so.z_prev,
                    motion_num: (so.motion_num1 as i32 - first_motion as i32) as i16,
                    frame_num: (so.frame_num_prev as i32 - motion.first_frame_index as i32) as i16,
                    flip: so.flip_prev,
                };
                let index = self.script.fetch_word()?;
                let slot = self
                    .statuses
                    .get_mut(index as usize)
                    .filter(|_| index >= 0)
                    .ok_or_else(|| index_error("statuses", index))?;
                *slot = status;
            }
            10000 => {
                let Some(i) = self.find_object_by_name()? else {
                    return Ok(());
                };
                let name = self.objects[i].name.clone();
                if self.find_bag_object(&name).is_none() {
                    if self.bag.len() >= NUM_BAG_OBJECTS {
                        return Err(GameError::TableFull("bag"));
                    }
                    let fnp = self.objects[i].frame_num_prev;
                    self.frame_hdr(fnp)?;
                    let data = self.frames[fnp as usize].decode()?;
                    tracing::debug!(target: "bermuda::opcodes", name = %name, "add object to bag");
                    self.bag.push(BagObject { name, data });
                    if self.current_bag_object == -1 {
                        self.current_bag_object = 0;
                    }
                }
            }
            11000 => {
                let name = self.script.fetch_string()?;
                if let Some(index) = self.find_bag_object(&name) {
                    let index = index as i16;
                    if self.current_bag_object == index {
                        self.current_bag_object = 0;
                    } else if self.current_bag_object > index {
                        self.current_bag_object -= 1;
                    }
                    self.bag.remove(index as usize);
                    tracing::debug!(target: "bermuda::opcodes", name = %name, "remove object from bag");
                }
            }
            20000 | 20010 => {
                let num = self.script.fetch_word()? as i32;
                let priority = self.script.fetch_word()?;
                let higher = if op == 20000 {
                    priority > self.current_playing_sound_priority
                } else {
                    priority >= self.current_playing_sound_priority
                };
                if higher && !self.win16_snd_play_sound(22, None)? {
                    return Ok(());
                }
                let anim = self.object_anim(current)?;
                let num = num + self.animation(anim)?.first_sound_buffer_index as i32 - 1;
                if num < 0 || num as usize >= self.sounds.len() {
                    return Err(index_error("sounds", num));
                }
                let file = self.sounds[num as usize].clone();
                self.win16_snd_play_sound(3, Some(&file))?;
                self.current_playing_sound_priority = priority;
            }
            25000 => {
                self.dialogue_request.id = self.script.fetch_string()?;
                self.dialogue_request.file = self.script.fetch_string()?;
                self.dialogue_request.sprite1 = self.script.fetch_string()?;
                self.dialogue_request.sprite2 = self.script.fetch_string()?;
                self.start_dialogue = true;
            }
            30000 | 30010 => {
                let num = self.script.fetch_word()?;
                if let Some(i) = self.next_scenes.iter().position(|ns| ns.num == num) {
                    self.script.next_scene = Some(i);
                    for g in 0..BOXES_PER_GROUP {
                        if op == 30000 {
                            self.boxes_count[BOXES_PER_GROUP + g] = 0;
                        } else {
                            self.boxes_count[BOXES_PER_GROUP + g] = self.boxes_count[g];
                            self.boxes[BOXES_PER_GROUP + g] = self.boxes[g];
                        }
                    }
                }
            }
            _ => return Err(GameError::InvalidOperator(op)),
        }
        Ok(())
    }
}
