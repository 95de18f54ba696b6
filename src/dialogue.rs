//! Dialogue scripts
//!
//! A DLG file is a list of choices, one per line:
//!
//! ```text
//! J01 Goto N01 ..\wav\j01.wav -> Hello there.
//! N01 End 3 ..\wav\n01.wav -> Goodbye.
//! ```
//!
//! Choices sharing an id are offered together. `Goto` continues with the
//! choices of `next_id`, `End` closes the dialogue and reports `next_id` as
//! a number to the scene scripts.

use serde::Serialize;

use crate::game::state::{NUM_DIALOG_CHOICES, NUM_DIALOG_ENTRIES};
use crate::scene::ParseError;
use crate::text::{atoi, Tokenizer};

/// `End` value playing the kiss animation instead of closing the dialogue.
pub const KISS_ENDING_ID: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueChoice {
    pub id: String,
    pub goto_flag: bool,
    pub next_id: String,
    pub speech_sound_file: String,
    pub text: String,
}

pub fn parse_dlg(text: &str) -> Result<Vec<DialogueChoice>, ParseError> {
    let mut tok = Tokenizer::new(text);
    let mut choices = Vec::new();
    loop {
        let Some(id) = tok.next_token() else {
            break;
        };
        if tok.is_exhausted() {
            break;
        }
        if choices.len() >= NUM_DIALOG_ENTRIES {
            return Err(ParseError::TooManyDialogueEntries);
        }
        let goto_flag = match tok.next_token().unwrap_or("") {
            "Goto" => true,
            "End" => false,
            other => return Err(ParseError::DialogueKeyword(other.to_string())),
        };
        let next_id = tok.next_token().unwrap_or("").to_string();
        let speech_sound_file = tok.next_token().unwrap_or("").to_string();
        match tok.next_token().unwrap_or("") {
            "->" => {}
            other => return Err(ParseError::DialogueKeyword(other.to_string())),
        }
        let text = tok.next_token_eol().unwrap_or("").trim_end().to_string();
        choices.push(DialogueChoice {
            id: id.to_string(),
            goto_flag,
            next_id,
            speech_sound_file,
            text,
        });
    }
    tracing::debug!(target: "bermuda::dialogue", entries = choices.len(), "dialogue parsed");
    Ok(choices)
}

/// What the game has to do after a dialogue step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueEvent {
    None,
    PlaySpeech(String),
    StopSpeech,
    /// No choice left, back to the game without an ending id.
    Leave,
    /// Dialogue finished with this id.
    Ended(i32),
    /// Play the kiss animation, the dialogue ends when it wraps.
    Kiss,
}

/// Choice navigation. Sprite 0 is Jack, 1 the other speaker, 2 the kiss.
#[derive(Debug, Clone, Default)]
pub struct Dialogue {
    entries: Vec<DialogueChoice>,
    choices: Vec<usize>,
    pub speech_index: usize,
    pub selected: bool,
    pub sprite_index: usize,
}

impl Dialogue {
    pub fn new(entries: Vec<DialogueChoice>) -> Self {
        Self { entries, ..Default::default() }
    }

    pub fn entries(&self) -> &[DialogueChoice] {
        &self.entries
    }

    /// Choices currently offered.
    pub fn choices(&self) -> impl Iterator<Item = &DialogueChoice> {
        self.choices.iter().filter_map(|&i| self.entries.get(i))
    }

    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    fn current(&self) -> Option<&DialogueChoice> {
        self.choices.get(self.speech_index).and_then(|&i| self.entries.get(i))
    }

    /// Offers the choices of `id`. A single choice is spoken right away.
    pub fn setup(&mut self, id: &str) -> DialogueEvent {
        self.sprite_index = if id.starts_with('J') || id.starts_with('j') { 0 } else { 1 };
        self.speech_index = 0;
        self.choices = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.id == id)
            .map(|(i, _)| i)
            .take(NUM_DIALOG_CHOICES)
            .collect();
        tracing::debug!(target: "bermuda::dialogue", id, choices = self.choices.len(), "setup dialogue");
        if self.choices.len() == 1 {
            self.selected = true;
            if let Some(choice) = self.current() {
                return DialogueEvent::PlaySpeech(choice.speech_sound_file.clone());
            }
        }
        DialogueEvent::None
    }

    pub fn move_down(&mut self) {
        if !self.selected && self.speech_index + 1 < self.choices.len() {
            self.speech_index += 1;
        }
    }

    pub fn move_up(&mut self) {
        if !self.selected && self.speech_index > 0 {
            self.speech_index -= 1;
        }
    }

    /// `enter`: speaks the highlighted choice, or interrupts the speech.
    pub fn confirm(&mut self) -> DialogueEvent {
        if self.choices.len() > 1 && !self.selected {
            self.selected = true;
            match self.current() {
                Some(choice) => DialogueEvent::PlaySpeech(choice.speech_sound_file.clone()),
                None => DialogueEvent::None,
            }
        } else {
            DialogueEvent::StopSpeech
        }
    }

    /// Called once the speech of the selected choice is over.
    pub fn speech_finished(&mut self) -> DialogueEvent {
        if !self.selected {
            return DialogueEvent::None;
        }
        self.selected = false;
        let Some(choice) = self.current().cloned() else {
            return DialogueEvent::Leave;
        };
        if choice.goto_flag {
            let event = self.setup(&choice.next_id);
            if self.choices.is_empty() {
                return DialogueEvent::Leave;
            }
            event
        } else {
            let n = atoi(&choice.next_id);
            if n == KISS_ENDING_ID {
                self.sprite_index = 2;
                DialogueEvent::Kiss
            } else {
                DialogueEvent::Ended(n)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "J01 Goto N01 ..\\wav\\j01.wav -> Hello there.\r\n\
        J01 Goto N02 ..\\wav\\j02.wav -> Go away!\r\n\
        N01 End 3 ..\\wav\\n01.wav -> Nice to meet you.\r\n\
        N02 Goto X99 ..\\wav\\n02.wav -> Fine.\r\n\
        K01 End 100 ..\\wav\\k01.wav -> Come here.\r\n";

    #[test]
    fn test_parse_dlg() {
        let entries = parse_dlg(SCRIPT).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[0],
            DialogueChoice {
                id: "J01".to_string(),
                goto_flag: true,
                next_id: "N01".to_string(),
                speech_sound_file: "..\\wav\\j01.wav".to_string(),
                text: "Hello there.".to_string(),
            }
        );
        assert!(!entries[2].goto_flag);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_dlg("J01 Jump N01 a.wav -> x\r\n"),
            Err(ParseError::DialogueKeyword("Jump".to_string()))
        );
        assert_eq!(
            parse_dlg("J01 End 1 a.wav => x\r\n"),
            Err(ParseError::DialogueKeyword("=>".to_string()))
        );
        let many: String = (0..41).map(|i| format!("J{} End 1 a.wav -> x\r\n", i)).collect();
        assert_eq!(parse_dlg(&many), Err(ParseError::TooManyDialogueEntries));
    }

    #[test]
    fn test_choice_navigation() {
        let mut d = Dialogue::new(parse_dlg(SCRIPT).unwrap());
        assert_eq!(d.setup("J01"), DialogueEvent::None);
        assert_eq!(d.sprite_index, 0);
        assert_eq!(d.choice_count(), 2);
        d.move_down();
        d.move_down();
        assert_eq!(d.speech_index, 1);
        d.move_up();
        assert_eq!(d.speech_index, 0);
        assert_eq!(d.confirm(), DialogueEvent::PlaySpeech("..\\wav\\j01.wav".to_string()));
        // locked while the speech plays
        d.move_down();
        assert_eq!(d.speech_index, 0);
        assert_eq!(d.confirm(), DialogueEvent::StopSpeech);

        // N01 has a single choice, spoken directly
        assert_eq!(d.speech_finished(), DialogueEvent::PlaySpeech("..\\wav\\n01.wav".to_string()));
        assert_eq!(d.sprite_index, 1);
        assert_eq!(d.speech_finished(), DialogueEvent::Ended(3));
    }

    #[test]
    fn test_ids_are_case_sensitive() {
        let mut d = Dialogue::new(parse_dlg(SCRIPT).unwrap());
        d.setup("j01");
        assert_eq!(d.choice_count(), 0);
        assert_eq!(d.sprite_index, 0);
    }

    #[test]
    fn test_goto_without_choices_leaves() {
        let mut d = Dialogue::new(parse_dlg(SCRIPT).unwrap());
        d.setup("N02");
        assert!(d.selected);
        assert_eq!(d.speech_finished(), DialogueEvent::Leave);
    }

    #[test]
    fn test_kiss_ending() {
        let mut d = Dialogue::new(parse_dlg(SCRIPT).unwrap());
        d.setup("K01");
        assert_eq!(d.speech_finished(), DialogueEvent::Kiss);
        assert_eq!(d.sprite_index, 2);
    }
}
