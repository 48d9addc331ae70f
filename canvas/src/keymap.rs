//! Keyboard shortcut table.
//!
//! Bindings are data: a map from [`KeyChord`] to [`Command`]. The engine
//! looks up each key press here and executes the command; the state machine
//! never matches on key names directly (text editing aside). Users override
//! or unbind entries with a JSON object such as
//! `{"ctrl+shift+z": "redo", "x": {"set_tool": "rectangle"}, "c": null}`.

#[cfg(test)]
#[path = "keymap_test.rs"]
mod keymap_test;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::input::{Key, Modifiers, Tool};

#[derive(Debug, thiserror::Error)]
pub enum KeymapError {
    #[error("empty key chord")]
    EmptyChord,
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
    #[error("invalid keymap JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Arrow-key direction for nudging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit step `(dx, dy)` in image space.
    #[must_use]
    pub fn unit(self) -> (f64, f64) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
        }
    }
}

/// Editor command bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    SetTool(Tool),
    Undo,
    Redo,
    /// Remove the selected annotation.
    Delete,
    /// Abort the current gesture or crop, else clear the selection.
    Cancel,
    Duplicate,
    /// Finish text editing or confirm a crop.
    Confirm,
    BringToFront,
    SendToBack,
    /// Move the selection by one step; shift makes it a large step.
    Nudge(Direction),
    /// Open the re-crop overlay.
    Crop,
}

/// A key plus the modifiers that must be held. Meta is folded into ctrl.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    /// Parse `"ctrl+shift+z"`-style notation. Case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns an error if the chord has no key or names an unknown modifier.
    pub fn parse(text: &str) -> Result<Self, KeymapError> {
        let lowered = text.trim().to_lowercase();
        // A trailing "+" means the plus key itself.
        let (mods, key) = match lowered.strip_suffix("++") {
            Some(rest) => (rest, "+"),
            None => lowered.rsplit_once('+').unwrap_or(("", lowered.as_str())),
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(KeymapError::EmptyChord);
        }

        let mut chord = Self { key: normalize_key(key), ctrl: false, shift: false, alt: false };
        for part in mods.split('+').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "ctrl" | "control" | "cmd" | "command" | "meta" | "mod" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                other => return Err(KeymapError::UnknownModifier(other.to_owned())),
            }
        }
        Ok(chord)
    }

    /// Chord for a key event as reported by the host.
    #[must_use]
    pub fn from_event(key: &Key, modifiers: Modifiers) -> Self {
        Self {
            key: normalize_key(&key.0.to_lowercase()),
            ctrl: modifiers.command(),
            shift: modifiers.shift,
            alt: modifiers.alt,
        }
    }
}

fn normalize_key(key: &str) -> String {
    match key {
        "esc" => "escape",
        "del" => "delete",
        "return" => "enter",
        "left" => "arrowleft",
        "right" => "arrowright",
        "up" => "arrowup",
        "down" => "arrowdown",
        "space" | "spacebar" => " ",
        other => other,
    }
    .to_owned()
}

/// Key binding table.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<KeyChord, Command>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        for (chord, command) in DEFAULT_BINDINGS {
            // Defaults are static and well-formed.
            if let Ok(chord) = KeyChord::parse(chord) {
                bindings.insert(chord, *command);
            }
        }
        Self { bindings }
    }
}

const DEFAULT_BINDINGS: &[(&str, Command)] = &[
    ("v", Command::SetTool(Tool::Select)),
    ("p", Command::SetTool(Tool::Pen)),
    ("h", Command::SetTool(Tool::Highlight)),
    ("t", Command::SetTool(Tool::Text)),
    ("b", Command::SetTool(Tool::Blur)),
    ("r", Command::SetTool(Tool::Rectangle)),
    ("c", Command::SetTool(Tool::Circle)),
    ("a", Command::SetTool(Tool::Arrow)),
    ("e", Command::SetTool(Tool::Emoji)),
    ("n", Command::SetTool(Tool::Callout)),
    ("l", Command::SetTool(Tool::Line)),
    ("x", Command::Crop),
    ("ctrl+z", Command::Undo),
    ("ctrl+y", Command::Redo),
    ("ctrl+shift+z", Command::Redo),
    ("delete", Command::Delete),
    ("backspace", Command::Delete),
    ("escape", Command::Cancel),
    ("enter", Command::Confirm),
    ("ctrl+c", Command::Duplicate),
    ("ctrl+d", Command::Duplicate),
    ("ctrl+]", Command::BringToFront),
    ("ctrl+[", Command::SendToBack),
    ("arrowleft", Command::Nudge(Direction::Left)),
    ("arrowright", Command::Nudge(Direction::Right)),
    ("arrowup", Command::Nudge(Direction::Up)),
    ("arrowdown", Command::Nudge(Direction::Down)),
];

impl Keymap {
    /// The built-in bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A keymap with no bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self { bindings: HashMap::new() }
    }

    /// Bind (or rebind) a chord.
    pub fn bind(&mut self, chord: KeyChord, command: Command) {
        self.bindings.insert(chord, command);
    }

    /// Remove a binding. Returns the command it was bound to.
    pub fn unbind(&mut self, chord: &KeyChord) -> Option<Command> {
        self.bindings.remove(chord)
    }

    /// Apply overrides parsed from JSON on top of this keymap. A `null` value
    /// unbinds the chord.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a chord does not parse.
    /// On error the keymap is left unchanged.
    pub fn override_with_json(&mut self, json: &str) -> Result<(), KeymapError> {
        let raw: BTreeMap<String, Option<Command>> = serde_json::from_str(json)?;
        let parsed = raw
            .into_iter()
            .map(|(chord, command)| Ok((KeyChord::parse(&chord)?, command)))
            .collect::<Result<Vec<_>, KeymapError>>()?;
        for (chord, command) in parsed {
            match command {
                Some(command) => self.bind(chord, command),
                None => {
                    self.unbind(&chord);
                }
            }
        }
        Ok(())
    }

    /// The default keymap with JSON overrides applied.
    ///
    /// # Errors
    ///
    /// See [`Keymap::override_with_json`].
    pub fn from_json(json: &str) -> Result<Self, KeymapError> {
        let mut keymap = Self::default();
        keymap.override_with_json(json)?;
        Ok(keymap)
    }

    /// Command for a key press. An exact chord match wins; failing that,
    /// a chord held with shift falls back to its unshifted binding.
    #[must_use]
    pub fn lookup(&self, key: &Key, modifiers: Modifiers) -> Option<Command> {
        let chord = KeyChord::from_event(key, modifiers);
        if let Some(command) = self.bindings.get(&chord) {
            return Some(*command);
        }
        if chord.shift {
            let unshifted = KeyChord { shift: false, ..chord };
            return self.bindings.get(&unshifted).copied();
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
