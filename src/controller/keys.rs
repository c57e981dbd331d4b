//! Key Bindings
//!
//! Key chords are parsed once from the configuration into a [`KeyMap`];
//! the controller looks actions up by chord and never registers handlers
//! at runtime.
//!
//! | Default chord | Action |
//! |---------------|--------|
//! | Return | Submit the current line |
//! | Ctrl+Return | Execute the buffer (or forward it as input) |
//! | Ctrl+C | Interrupt the running command |
//! | Ctrl+F6 | Restart the interpreter |

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::config::KeyBindings;
use crate::error::{Error, Result};

/// A physical key without modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Return,
    Tab,
    BackSpace,
    Escape,
    /// Printable character, stored lowercase
    Char(char),
    /// Function key F1..F24
    F(u8),
}

impl Key {
    fn parse(name: &str) -> Option<Self> {
        let key = match name.to_ascii_lowercase().as_str() {
            "return" | "enter" => Key::Return,
            "tab" => Key::Tab,
            "backspace" => Key::BackSpace,
            "escape" | "esc" => Key::Escape,
            "space" => Key::Char(' '),
            lower => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    (Some('f'), Some(_)) => {
                        let number: u8 = lower[1..].parse().ok()?;
                        if !(1..=24).contains(&number) {
                            return None;
                        }
                        Key::F(number)
                    }
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Return => write!(f, "Return"),
            Key::Tab => write!(f, "Tab"),
            Key::BackSpace => write!(f, "BackSpace"),
            Key::Escape => write!(f, "Escape"),
            Key::Char(' ') => write!(f, "Space"),
            Key::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Key::F(n) => write!(f, "F{}", n),
        }
    }
}

/// Modifier keys held with a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
    };

    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        shift: false,
        alt: false,
    };
}

/// A key plus its modifiers, e.g. `Ctrl+Return`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Chord without modifiers
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Chord with Ctrl held
    pub fn ctrl(key: Key) -> Self {
        Self::new(key, Modifiers::CTRL)
    }
}

impl FromStr for KeyChord {
    type Err = Error;

    fn from_str(chord: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidKeyChord {
            chord: chord.to_string(),
            reason: reason.to_string(),
        };

        let mut parts: Vec<&str> = chord.split('+').map(str::trim).collect();
        let key_name = parts.pop().filter(|name| !name.is_empty());
        let key_name = key_name.ok_or_else(|| invalid("missing key"))?;

        let mut modifiers = Modifiers::default();
        for part in parts {
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "shift" => modifiers.shift = true,
                "alt" => modifiers.alt = true,
                _ => return Err(invalid(&format!("unknown modifier '{}'", part))),
            }
        }

        let key = Key::parse(key_name)
            .ok_or_else(|| invalid(&format!("unknown key '{}'", key_name)))?;
        Ok(Self { key, modifiers })
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.modifiers.alt {
            write!(f, "Alt+")?;
        }
        if self.modifiers.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// What a bound key does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Line-submission heuristic (implicit execute / forward input)
    SubmitLine,
    /// Explicit execute command
    Execute,
    /// Interrupt the running command
    Interrupt,
    /// Kill and relaunch the interpreter
    Restart,
}

impl KeyAction {
    pub const ALL: [KeyAction; 4] = [
        KeyAction::SubmitLine,
        KeyAction::Execute,
        KeyAction::Interrupt,
        KeyAction::Restart,
    ];

    /// Name used in the `key_bindings` configuration table
    pub fn config_name(&self) -> &'static str {
        match self {
            KeyAction::SubmitLine => "submit_line",
            KeyAction::Execute => "execute",
            KeyAction::Interrupt => "interrupt",
            KeyAction::Restart => "restart",
        }
    }

    pub fn from_config_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.config_name() == name)
    }
}

/// Immutable chord -> action table
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    actions: HashMap<KeyChord, KeyAction>,
}

impl KeyMap {
    /// Build the table from configured bindings
    ///
    /// Disabled bindings are skipped and unknown action names are ignored
    /// with a warning. An unparsable chord is an error.
    pub fn from_bindings(bindings: &KeyBindings) -> Result<Self> {
        let mut actions = HashMap::new();

        for (name, binding) in &bindings.bindings {
            let Some(action) = KeyAction::from_config_name(name) else {
                warn!("Ignoring key binding for unknown action '{}'", name);
                continue;
            };
            if !binding.enabled {
                debug!("Key binding '{}' disabled", name);
                continue;
            }
            let chord: KeyChord = binding.key.parse()?;
            if let Some(previous) = actions.insert(chord, action) {
                warn!(
                    "Key chord {} bound to both {} and {}",
                    chord,
                    previous.config_name(),
                    action.config_name()
                );
            }
        }

        Ok(Self { actions })
    }

    /// Action bound to `chord`, if any
    pub fn lookup(&self, chord: &KeyChord) -> Option<KeyAction> {
        self.actions.get(chord).copied()
    }

    /// Chord currently bound to `action`
    pub fn chord_for(&self, action: KeyAction) -> Option<KeyChord> {
        self.actions
            .iter()
            .find(|(_, bound)| **bound == action)
            .map(|(chord, _)| *chord)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        let actions = HashMap::from([
            (KeyChord::plain(Key::Return), KeyAction::SubmitLine),
            (KeyChord::ctrl(Key::Return), KeyAction::Execute),
            (KeyChord::ctrl(Key::Char('c')), KeyAction::Interrupt),
            (KeyChord::ctrl(Key::F(6)), KeyAction::Restart),
        ]);
        Self { actions }
    }
}
