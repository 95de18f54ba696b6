//! SCN scene description parser
//!
//! A scene file is a list of sections (`Movies`, `Bag`, `Scene`, `Object:`,
//! `IfNewObject:`, `Box`) and single line commands (`Screen`, `Midi`,
//! `SceneNumber`, `End`). Any line may be guarded with one or more
//! `GlobalMemory [n] op value` tests followed by `->`; the line is skipped
//! when a test fails.
//!
//! Parsing is interleaved with loading: MOV and WGP files are loaded as they
//! are met, so the parser drives a [`SceneHost`] rather than building an
//! intermediate tree.

use thiserror::Error;

use crate::game::state::{SceneBox, SceneObject, SceneObjectStatus, BOXES_PER_GROUP, NUM_BOXES, NUM_VARS};
use crate::text::{parse_int, TokenError, Tokenizer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Unexpected token '{token}' in state {state:?}")]
    UnexpectedToken { token: String, state: ParserState },

    #[error("Expected '->' after condition, got '{0}'")]
    MissingThen(String),

    #[error("Invalid compare operator '{0}'")]
    CompareOperator(String),

    #[error("Unexpected mirror mode '{0}'")]
    MirrorMode(String),

    #[error("Unexpected init mode '{0}'")]
    InitMode(String),

    #[error("Global variable index {0} out of range")]
    VarIndex(i32),

    #[error("Object variable index {0} out of range")]
    ObjectVarIndex(i32),

    #[error("Object status index {0} out of range")]
    StatusIndex(i32),

    #[error("Box {group}/{index} out of range")]
    BoxIndex { group: i32, index: usize },

    #[error("Invalid box mix colors {start}+{end}")]
    BoxMixColors { start: i32, end: i32 },

    #[error("Too many next scenes")]
    TooManyNextScenes,

    #[error("Too many bag objects")]
    TooManyBagObjects,

    #[error("Unexpected dialogue keyword '{0}'")]
    DialogueKeyword(String),

    #[error("Too many dialogue entries")]
    TooManyDialogueEntries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Def,
    Movies,
    Bag,
    Scene,
    Object,
    NewObject,
    Box,
}

/// Engine side of the scene parser.
pub trait SceneHost {
    type Error: From<ParseError>;

    /// Called before the first token: resets the scene number and snapshots
    /// the global variables as the scene defaults.
    fn begin_scene(&mut self);
    fn var(&self, index: usize) -> i16;
    fn scene_number(&self) -> i16;
    fn set_scene_number(&mut self, num: i16);

    fn animations_count(&self) -> usize;
    fn animation_name(&self, index: usize) -> Option<&str>;
    /// Releases everything loaded after animation `anim` (-1 for all).
    fn clear_scene_data(&mut self, anim: i32) -> Result<(), Self::Error>;
    fn set_load_data_state(&mut self, state: u8);
    fn load_mov(&mut self, name: &str) -> Result<(), Self::Error>;
    /// `Screen` command: loads the background of the scene.
    fn load_screen(&mut self, name: &str) -> Result<(), Self::Error>;
    /// `Midi` command, `None` for `NULL`.
    fn set_music(&mut self, name: Option<&str>) -> Result<(), Self::Error>;
    fn set_music_track(&mut self, track: i32);

    /// Case insensitive lookup among the loaded objects.
    fn find_object(&self, name: &str) -> Option<usize>;
    fn object_mut(&mut self, index: usize) -> &mut SceneObject;
    /// Animation the object was loaded from.
    fn object_animation(&self, index: usize) -> i32;
    fn object_status(&self, index: usize) -> Option<SceneObjectStatus>;

    fn set_bag_position(&mut self, x: i32, y: i32);
    fn has_bag_object(&self, name: &str) -> bool;
    fn add_bag_object(&mut self, name: &str, file: &str) -> Result<(), Self::Error>;

    fn add_next_scene(&mut self, num: i16, name: String) -> Result<(), Self::Error>;

    fn box_count(&self, group: usize) -> usize;
    /// Current content of the next free slot of `group`.
    fn box_slot(&self, group: usize, index: usize) -> SceneBox;
    fn push_box(&mut self, group: usize, b: SceneBox);
}

struct Parser<'a> {
    tok: Tokenizer<'a>,
    state: ParserState,
    current_object: Option<usize>,
    anim: i32,
    load_mov_data: bool,
}

fn compare(value1: i32, value2: i32, op: &str) -> Result<bool, ParseError> {
    Ok(match op {
        "==" => value1 == value2,
        "!=" => value1 != value2,
        "<" => value1 < value2,
        "<=" => value1 <= value2,
        ">" => value1 > value2,
        ">=" => value1 >= value2,
        _ => return Err(ParseError::CompareOperator(op.to_string())),
    })
}

fn is_scene_number(token: &str) -> bool {
    // the misspelling is used by C1_07.SCN
    token == "SceneNumber" || token == "ScenenNumber"
}

/// Parses `text` (comments already stripped) against `host`.
pub fn parse_scn<H: SceneHost>(text: &str, host: &mut H) -> Result<(), H::Error> {
    host.begin_scene();
    let mut parser = Parser {
        tok: Tokenizer::new(text),
        state: ParserState::Def,
        current_object: None,
        anim: 0,
        load_mov_data: false,
    };
    parser.run(host)
}

impl<'a> Parser<'a> {
    fn run<H: SceneHost>(&mut self, host: &mut H) -> Result<(), H::Error> {
        while let Some(mut token) = self.tok.next_token() {
            if token == "GlobalMemory" {
                let mut result = true;
                while token == "GlobalMemory" {
                    if !self.global_memory(host)? {
                        result = false;
                        break;
                    }
                    token = self.tok.next_token().unwrap_or("");
                }
                if !result {
                    self.tok.next_token_eol();
                    continue;
                }
                if token != "->" {
                    return Err(ParseError::MissingThen(token.to_string()).into());
                }
                token = match self.tok.next_token() {
                    Some(t) => t,
                    None => break,
                };
            }
            if self.state == ParserState::Def {
                if !self.parse_command(token, host)? {
                    break;
                }
            } else {
                self.parse_section_line(token, host)?;
            }
        }
        Ok(())
    }

    fn global_memory<H: SceneHost>(&mut self, host: &H) -> Result<bool, ParseError> {
        let var = self.tok.next_array_index()?;
        if var < 0 || var as usize >= NUM_VARS {
            return Err(ParseError::VarIndex(var));
        }
        let op = self.tok.next_token().unwrap_or("");
        let value_token = self.tok.next_token().unwrap_or("");
        let value = if is_scene_number(value_token) {
            host.scene_number() as i32
        } else {
            parse_int(value_token)?
        };
        compare(host.var(var as usize) as i32, value, op)
    }

    /// Top level command. Returns `false` once `End` is reached.
    fn parse_command<H: SceneHost>(&mut self, token: &str, host: &mut H) -> Result<bool, H::Error> {
        match token {
            "End" => return Ok(false),
            "Movies" => self.state = ParserState::Movies,
            "Scene" => self.state = ParserState::Scene,
            "Screen" => {
                let name = self.tok.next_token().unwrap_or("");
                host.load_screen(name)?;
            }
            t if is_scene_number(t) => {
                let num = self.tok.next_int().map_err(ParseError::from)?;
                host.set_scene_number(num as i16);
            }
            "Midi" => {
                host.set_music_track(0);
                match self.tok.next_token().unwrap_or("") {
                    "NULL" => host.set_music(None)?,
                    name => {
                        host.set_music(Some(name))?;
                        let track = self.tok.next_int().map_err(ParseError::from)?;
                        host.set_music_track(track);
                    }
                }
            }
            "Object:" => {
                self.state = ParserState::Object;
                self.select_object(host, true);
            }
            "IfNewObject:" => {
                self.state = ParserState::NewObject;
                self.select_object(host, false);
            }
            "Bag" => {
                self.state = ParserState::Bag;
                let x = self.tok.next_int().map_err(ParseError::from)?;
                let y = self.tok.next_int().map_err(ParseError::from)?;
                host.set_bag_position(x, y);
            }
            "Box" => self.state = ParserState::Box,
            _ => {
                return Err(ParseError::UnexpectedToken {
                    token: token.to_string(),
                    state: self.state,
                }
                .into())
            }
        }
        Ok(true)
    }

    fn select_object<H: SceneHost>(&mut self, host: &mut H, reset: bool) {
        let name = self.tok.next_token().unwrap_or("");
        self.current_object = host.find_object(name);
        if reset {
            if let Some(index) = self.current_object {
                let so = host.object_mut(index);
                so.vars = [0; 10];
                so.state = 0;
                so.state_prev = 0;
            }
        }
        tracing::debug!(target: "bermuda::game", object = name, found = self.current_object.is_some(), "select object");
    }

    fn parse_section_line<H: SceneHost>(&mut self, token: &str, host: &mut H) -> Result<(), H::Error> {
        match self.state {
            ParserState::Movies => {
                if token == "MoviesEnd" {
                    if !self.load_mov_data {
                        host.clear_scene_data(self.anim - 1)?;
                    }
                    self.state = ParserState::Def;
                    return Ok(());
                }
                if !self.load_mov_data {
                    let already_loaded = (self.anim as usize) < host.animations_count()
                        && host
                            .animation_name(self.anim as usize)
                            .map_or(false, |name| name.eq_ignore_ascii_case(token));
                    if already_loaded {
                        self.anim += 1;
                    } else {
                        if host.animations_count() != 0 {
                            host.clear_scene_data(self.anim - 1)?;
                        }
                        host.set_load_data_state(1);
                        self.load_mov_data = true;
                    }
                }
                if self.load_mov_data {
                    host.load_mov(token)?;
                }
            }
            ParserState::Bag => {
                if token == "BagEnd" {
                    self.state = ParserState::Def;
                } else if host.has_bag_object(token) {
                    self.tok.next_token_eol();
                } else {
                    let file = self.tok.next_token().unwrap_or("");
                    host.add_bag_object(token, file)?;
                }
            }
            ParserState::Scene => {
                if token == "SceneEnd" {
                    self.state = ParserState::Def;
                } else {
                    let num = parse_int(token).map_err(ParseError::from)?;
                    let name = self.tok.next_token().unwrap_or("").to_ascii_uppercase();
                    host.add_next_scene(num as i16, name)?;
                }
            }
            ParserState::Object | ParserState::NewObject => {
                if token == "ObjectEnd" {
                    self.state = ParserState::Def;
                    return Ok(());
                }
                if self.state == ParserState::NewObject {
                    // objects of animations kept from the previous scene are
                    // not new
                    if let Some(index) = self.current_object {
                        if host.object_animation(index) < self.anim {
                            self.current_object = None;
                        }
                    }
                }
                self.parse_object(token, host)?;
            }
            ParserState::Box => {
                if token == "BoxEnd" {
                    self.state = ParserState::Def;
                } else {
                    self.parse_box(token, host)?;
                }
            }
            ParserState::Def => {}
        }
        Ok(())
    }

    fn parse_object<H: SceneHost>(&mut self, token: &str, host: &mut H) -> Result<(), ParseError> {
        let Some(index) = self.current_object else {
            self.tok.next_token_eol();
            return Ok(());
        };
        let status = match token {
            "LoadStatus" => {
                let i = self.tok.next_array_index()?;
                let status = usize::try_from(i).ok().and_then(|i| host.object_status(i));
                Some(status.ok_or(ParseError::StatusIndex(i))?)
            }
            _ => None,
        };
        let state = self.state;
        let tok = &mut self.tok;
        let so = host.object_mut(index);
        match token {
            "Class" => so.class_name = tok.next_token().unwrap_or("").to_string(),
            "Memory" => {
                let var = tok.next_array_index()?;
                let value = tok.next_int()?;
                if !(0..10).contains(&var) {
                    return Err(ParseError::ObjectVarIndex(var));
                }
                so.vars[var as usize] = value as i16;
            }
            "Coord" => {
                let (x, y) = tok.next_coord()?;
                so.x_init = x;
                so.y_init = y;
            }
            "AddCoordX" => so.x_init = so.x_init.wrapping_add(tok.next_int()? as i16),
            "AddCoordY" => so.y_init = so.y_init.wrapping_add(tok.next_int()? as i16),
            "CoordX" => so.x_init = tok.next_int()? as i16,
            "CoordY" => so.y_init = tok.next_int()? as i16,
            "Depth" => so.z_init = tok.next_int()? as i16,
            "Move" => {
                so.motion_num = tok.next_int()?.wrapping_sub(1) as i16;
                so.motion_frame_num = 0;
            }
            "Cel" => {
                so.motion_num = tok.next_int()?.wrapping_sub(1) as i16;
                so.motion_frame_num = tok.next_int()?.wrapping_sub(1) as i16;
            }
            "Mirror" => {
                so.flip_init = match tok.next_token().unwrap_or("") {
                    "No" => 0,
                    "X" => 1,
                    "Y" => 2,
                    "XY" => 3,
                    other => return Err(ParseError::MirrorMode(other.to_string())),
                };
            }
            "Init" => match tok.next_token().unwrap_or("") {
                "NoInit" => so.mode = 0,
                "Simple" => so.mode = 1,
                "Random" => {
                    so.mode = 2;
                    so.mode_rnd_mul = tok.next_int()? as i16;
                }
                "Put" => so.mode = 3,
                other => return Err(ParseError::InitMode(other.to_string())),
            },
            "LoadStatus" => {
                if let Some(sos) = status {
                    so.x_init = sos.x;
                    so.y_init = sos.y;
                    so.z_init = sos.z;
                    so.motion_num = sos.motion_num;
                    so.motion_frame_num = sos.frame_num;
                    so.flip_init = sos.flip;
                }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    token: token.to_string(),
                    state,
                })
            }
        }
        Ok(())
    }

    fn parse_box<H: SceneHost>(&mut self, token: &str, host: &mut H) -> Result<(), ParseError> {
        let group = parse_int(token)?.wrapping_sub(1);
        if group < 0 || group as usize >= NUM_BOXES {
            return Err(ParseError::BoxIndex { group, index: 0 });
        }
        let group_index = group as usize;
        let index = host.box_count(group_index);
        if index >= BOXES_PER_GROUP {
            return Err(ParseError::BoxIndex { group, index });
        }
        // fields not set by the line keep the slot's previous values
        let mut b = host.box_slot(group_index, index);
        match self.tok.next_token().unwrap_or("") {
            "Disable" => b.state = 0,
            "Enable" => b.state = 1,
            "Mix" => {
                b.state = 2;
                b.z = self.tok.next_int()? as i16;
                let start = self.tok.next_int()?;
                let end = self.tok.next_int()?;
                if !(0..=256).contains(&start) || !(0..=256).contains(&end) || start + end > 256 {
                    return Err(ParseError::BoxMixColors { start, end });
                }
                b.start_color = start as i16;
                b.end_color = end as i16;
            }
            other => {
                return Err(ParseError::UnexpectedToken {
                    token: other.to_string(),
                    state: self.state,
                })
            }
        }
        let (x1, y1) = self.tok.next_coord()?;
        let (x2, y2) = self.tok.next_coord()?;
        b.x1 = x1;
        b.y1 = y1;
        b.x2 = x2;
        b.y2 = y2;
        host.push_box(group_index, b);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::BoxTable;
    use crate::text::{decode_latin1, strip_comments};

    #[derive(Default)]
    struct MockHost {
        vars: Vec<i16>,
        default_vars: Vec<i16>,
        scene_number: i16,
        animations: Vec<String>,
        objects: Vec<(SceneObject, i32)>,
        statuses: Vec<SceneObjectStatus>,
        boxes: BoxTable,
        box_counts: [usize; NUM_BOXES],
        next_scenes: Vec<(i16, String)>,
        bag: Vec<(String, String)>,
        bag_pos: (i32, i32),
        music: Vec<Option<String>>,
        music_track: i32,
        screens: Vec<String>,
        loaded_movs: Vec<String>,
        cleared: Vec<i32>,
        load_data_state: u8,
    }

    impl MockHost {
        fn new() -> Self {
            Self { vars: vec![0; NUM_VARS], ..Default::default() }
        }

        fn with_object(mut self, name: &str, anim: i32) -> Self {
            let so = SceneObject { name: name.to_string(), state: 1, state_prev: 1, vars: [7; 10], ..Default::default() };
            self.objects.push((so, anim));
            self
        }
    }

    impl SceneHost for MockHost {
        type Error = ParseError;

        fn begin_scene(&mut self) {
            self.scene_number = 0;
            self.default_vars = self.vars.clone();
        }
        fn var(&self, index: usize) -> i16 {
            self.vars[index]
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
            self.animations.get(index).map(|s| s.as_str())
        }
        fn clear_scene_data(&mut self, anim: i32) -> Result<(), ParseError> {
            self.cleared.push(anim);
            self.animations.truncate((anim + 1).max(0) as usize);
            Ok(())
        }
        fn set_load_data_state(&mut self, state: u8) {
            self.load_data_state = state;
        }
        fn load_mov(&mut self, name: &str) -> Result<(), ParseError> {
            self.loaded_movs.push(name.to_string());
            self.animations.push(name.to_ascii_lowercase());
            Ok(())
        }
        fn load_screen(&mut self, name: &str) -> Result<(), ParseError> {
            self.screens.push(name.to_string());
            Ok(())
        }
        fn set_music(&mut self, name: Option<&str>) -> Result<(), ParseError> {
            self.music.push(name.map(str::to_string));
            Ok(())
        }
        fn set_music_track(&mut self, track: i32) {
            self.music_track = track;
        }
        fn find_object(&self, name: &str) -> Option<usize> {
            self.objects.iter().position(|(o, _)| o.name.eq_ignore_ascii_case(name))
        }
        fn object_mut(&mut self, index: usize) -> &mut SceneObject {
            &mut self.objects[index].0
        }
        fn object_animation(&self, index: usize) -> i32 {
            self.objects[index].1
        }
        fn object_status(&self, index: usize) -> Option<SceneObjectStatus> {
            self.statuses.get(index).copied()
        }
        fn set_bag_position(&mut self, x: i32, y: i32) {
            self.bag_pos = (x, y);
        }
        fn has_bag_object(&self, name: &str) -> bool {
            self.bag.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
        }
        fn add_bag_object(&mut self, name: &str, file: &str) -> Result<(), ParseError> {
            self.bag.push((name.to_string(), file.to_string()));
            Ok(())
        }
        fn add_next_scene(&mut self, num: i16, name: String) -> Result<(), ParseError> {
            self.next_scenes.push((num, name));
            Ok(())
        }
        fn box_count(&self, group: usize) -> usize {
            self.box_counts[group]
        }
        fn box_slot(&self, group: usize, index: usize) -> SceneBox {
            self.boxes[group][index]
        }
        fn push_box(&mut self, group: usize, b: SceneBox) {
            self.boxes[group][self.box_counts[group]] = b;
            self.box_counts[group] += 1;
        }
    }

    fn parse(text: &str, host: &mut MockHost) -> Result<(), ParseError> {
        let mut buf = text.as_bytes().to_vec();
        strip_comments(&mut buf);
        parse_scn(&decode_latin1(&buf), host)
    }

    #[test]
    fn test_scene_sections() {
        let text = "SceneNumber 12\r\n\
            Screen ..\\wgp\\c1.wgp\r\n\
            Midi ..\\midi\\jungle1.mid 3\r\n\
            Movies\r\n..\\mov\\jack.mov\r\n..\\mov\\door.mov\r\nMoviesEnd\r\n\
            Scene\r\n1 c1_02.scn\r\nSceneEnd\r\n\
            Bag 600 30\r\nKnife ..\\wgp\\knife.spr\r\nBagEnd\r\n\
            End\r\nScreen ignored.wgp\r\n";
        let mut host = MockHost::new();
        parse(text, &mut host).unwrap();
        assert_eq!(host.scene_number, 12);
        assert_eq!(host.screens, vec!["..\\wgp\\c1.wgp"]);
        assert_eq!(host.music, vec![Some("..\\midi\\jungle1.mid".to_string())]);
        assert_eq!(host.music_track, 3);
        assert_eq!(host.loaded_movs, vec!["..\\mov\\jack.mov", "..\\mov\\door.mov"]);
        assert_eq!(host.load_data_state, 1);
        assert_eq!(host.next_scenes, vec![(1, "C1_02.SCN".to_string())]);
        assert_eq!(host.bag_pos, (600, 30));
        assert_eq!(host.bag, vec![("Knife".to_string(), "..\\wgp\\knife.spr".to_string())]);
    }

    #[test]
    fn test_movies_already_loaded_are_kept() {
        let mut host = MockHost::new();
        host.animations = vec!["..\\mov\\jack.mov".to_string(), "..\\mov\\old.mov".to_string()];
        parse("Movies\r\n..\\MOV\\JACK.MOV\r\nMoviesEnd\r\nEnd\r\n", &mut host).unwrap();
        assert!(host.loaded_movs.is_empty());
        // everything after the first animation is released
        assert_eq!(host.cleared, vec![0]);
        assert_eq!(host.animations.len(), 1);

        let mut host = MockHost::new();
        host.animations = vec!["..\\mov\\jack.mov".to_string()];
        parse("Movies\r\n..\\mov\\jack.mov\r\n..\\mov\\new.mov\r\nMoviesEnd\r\nEnd\r\n", &mut host).unwrap();
        assert_eq!(host.cleared, vec![0]);
        assert_eq!(host.loaded_movs, vec!["..\\mov\\new.mov"]);
    }

    #[test]
    fn test_global_memory_conditions() {
        let mut host = MockHost::new();
        host.vars[4] = 2;
        let text = "GlobalMemory [5] == 2 -> SceneNumber 7\r\n\
            GlobalMemory [5] == 2 GlobalMemory [1] != 0 -> SceneNumber 99\r\n\
            GlobalMemory [5] < SceneNumber -> Midi NULL\r\n\
            End\r\n";
        parse(text, &mut host).unwrap();
        assert_eq!(host.scene_number, 7);
        assert_eq!(host.music, vec![None]);

        let mut host = MockHost::new();
        assert_eq!(
            parse("GlobalMemory [1] == 0 SceneNumber 3\r\n", &mut host),
            Err(ParseError::MissingThen("SceneNumber".to_string()))
        );
        assert_eq!(
            parse("GlobalMemory [1] =! 0 -> End\r\n", &mut MockHost::new()),
            Err(ParseError::CompareOperator("=!".to_string()))
        );
        assert_eq!(parse("GlobalMemory [400] == 0 -> End\r\n", &mut MockHost::new()), Err(ParseError::VarIndex(399)));
    }

    #[test]
    fn test_object_properties() {
        let mut host = MockHost::new().with_object("Jack", 0);
        host.statuses = vec![SceneObjectStatus { x: 1, y: 2, z: 3, motion_num: 4, frame_num: 5, flip: 2 }];
        let text = "Object: JACK\r\n\
            Class Hero\r\n\
            Memory [2] 5\r\n\
            Coord (100, 200)\r\n\
            AddCoordX 5\r\n\
            AddCoordY -10\r\n\
            Depth 4\r\n\
            Cel 3 2\r\n\
            Mirror Y\r\n\
            Init Random 4\r\n\
            ObjectEnd\r\n\
            End\r\n";
        parse(text, &mut host).unwrap();
        let so = &host.objects[0].0;
        assert_eq!(so.class_name, "Hero");
        assert_eq!(so.vars, [0, 5, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(so.state, 0);
        assert_eq!(so.state_prev, 0);
        assert_eq!((so.x_init, so.y_init, so.z_init), (105, 190, 4));
        assert_eq!((so.motion_num, so.motion_frame_num), (2, 1));
        assert_eq!(so.flip_init, 2);
        assert_eq!((so.mode, so.mode_rnd_mul), (2, 4));

        parse("Object: Jack\r\nLoadStatus [1]\r\nObjectEnd\r\nEnd\r\n", &mut host).unwrap();
        let so = &host.objects[0].0;
        assert_eq!((so.x_init, so.y_init, so.z_init, so.flip_init), (1, 2, 3, 2));
        assert_eq!((so.motion_num, so.motion_frame_num), (4, 5));
    }

    #[test]
    fn test_unknown_object_lines_are_skipped() {
        let mut host = MockHost::new();
        parse("Object: Ghost\r\nWhatever goes here\r\nObjectEnd\r\nEnd\r\n", &mut host).unwrap();

        let mut host = MockHost::new().with_object("Jack", 0);
        let err = parse("Object: Jack\r\nBogus 1\r\nObjectEnd\r\n", &mut host).unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { state: ParserState::Object, .. }));
    }

    #[test]
    fn test_if_new_object_skips_kept_objects() {
        // object from animation 0 while animation 0 was kept
        let mut host = MockHost::new().with_object("Jack", 0);
        host.animations = vec!["a.mov".to_string()];
        parse("Movies\r\na.mov\r\nMoviesEnd\r\nIfNewObject: Jack\r\nDepth 9\r\nObjectEnd\r\nEnd\r\n", &mut host).unwrap();
        assert_eq!(host.objects[0].0.z_init, 0);
        // IfNewObject does not reset the object
        assert_eq!(host.objects[0].0.vars[0], 7);

        let mut host = MockHost::new().with_object("Jack", 0);
        parse("IfNewObject: Jack\r\nDepth 9\r\nObjectEnd\r\nEnd\r\n", &mut host).unwrap();
        assert_eq!(host.objects[0].0.z_init, 9);
    }

    #[test]
    fn test_boxes() {
        let mut host = MockHost::new();
        host.boxes[1][0].z = 42;
        let text = "Box\r\n\
            1 Enable (10,20) (30,40)\r\n\
            2 Enable (0,0) (5,5)\r\n\
            1 Disable (1,2) (3,4)\r\n\
            10 Mix -1 192 64 (582,332) (640,480)\r\n\
            BoxEnd\r\nEnd\r\n";
        parse(text, &mut host).unwrap();
        assert_eq!(host.box_counts[0], 2);
        assert_eq!(host.boxes[0][0], SceneBox { x1: 10, y1: 20, x2: 30, y2: 40, state: 1, ..Default::default() });
        assert_eq!(host.boxes[0][1].state, 0);
        assert_eq!(host.boxes[1][0].z, 42);
        let mix = host.boxes[9][0];
        assert_eq!((mix.state, mix.z, mix.start_color, mix.end_color), (2, -1, 192, 64));

        assert_eq!(
            parse("Box\r\n1 Mix 0 200 100 (0,0) (1,1)\r\n", &mut MockHost::new()),
            Err(ParseError::BoxMixColors { start: 200, end: 100 })
        );
        assert!(matches!(parse("Box\r\n21 Enable (0,0) (1,1)\r\n", &mut MockHost::new()), Err(ParseError::BoxIndex { .. })));
    }

    #[test]
    fn test_extreme_integers() {
        let mut host = MockHost::new().with_object("Jack", 0);
        let text = "Object: Jack\r\n\
            Cel -2147483648 -2147483648\r\n\
            ObjectEnd\r\nEnd\r\n";
        parse(text, &mut host).unwrap();
        let so = &host.objects[0].0;
        assert_eq!((so.motion_num, so.motion_frame_num), (-1, -1));

        parse("Object: Jack\r\nMove -2147483648\r\nObjectEnd\r\nEnd\r\n", &mut host).unwrap();
        assert_eq!(host.objects[0].0.motion_num, -1);

        assert!(matches!(
            parse("Box\r\n-2147483648 Enable (0,0) (1,1)\r\n", &mut MockHost::new()),
            Err(ParseError::BoxIndex { group: i32::MAX, .. })
        ));
        assert_eq!(
            parse("Box\r\n1 Mix 0 2147483647 2147483647 (0,0) (1,1)\r\n", &mut MockHost::new()),
            Err(ParseError::BoxMixColors { start: i32::MAX, end: i32::MAX })
        );
        assert_eq!(
            parse("Box\r\n1 Mix 0 -2147483648 -1 (0,0) (1,1)\r\n", &mut MockHost::new()),
            Err(ParseError::BoxMixColors { start: i32::MIN, end: -1 })
        );
        assert!(matches!(
            parse("GlobalMemory [-2147483648] == 0 -> End\r\n", &mut MockHost::new()),
            Err(ParseError::VarIndex(_))
        ));
    }

    #[test]
    fn test_unexpected_top_level_token() {
        let err = parse("Scren foo.wgp\r\n", &mut MockHost::new()).unwrap_err();
        assert_eq!(
            err,
            ParseError::UnexpectedToken { token: "Scren".to_string(), state: ParserState::Def }
        );
        // a missing End is tolerated
        assert!(parse("SceneNumber 2\r\n", &mut MockHost::new()).is_ok());
    }
}
