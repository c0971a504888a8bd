//! Scientific pitch notation (`C4` is middle C) and the conversions the rest
//! of the crate needs: notation tokens, solfège syllables and frequencies.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, TranscriberError};

/// Octave that renders as bare upper-case letters in notation output.
pub const REFERENCE_OCTAVE: i8 = 4;

/// Octaves accepted when parsing a label, covering MIDI notes 0 to 127.
pub const OCTAVE_RANGE: std::ops::RangeInclusive<i8> = -1..=9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
            Self::G => 'G',
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    /// Semitones above C within the same octave.
    fn semitone(self) -> i32 {
        match self {
            Self::C => 0,
            Self::D => 2,
            Self::E => 4,
            Self::F => 5,
            Self::G => 7,
            Self::A => 9,
            Self::B => 11,
        }
    }

    fn solfege(self) -> &'static str {
        match self {
            Self::C => "DO",
            Self::D => "RE",
            Self::E => "MI",
            Self::F => "FA",
            Self::G => "SOL",
            Self::A => "LA",
            Self::B => "SI",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '#' => Some(Self::Sharp),
            'b' => Some(Self::Flat),
            _ => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Natural => "",
            Self::Sharp => "#",
            Self::Flat => "b",
        }
    }

    fn offset(self) -> i32 {
        match self {
            Self::Natural => 0,
            Self::Sharp => 1,
            Self::Flat => -1,
        }
    }
}

/// Letter plus optional sharp/flat modifier, independent of octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PitchClass {
    pub letter: Letter,
    pub accidental: Accidental,
}

impl PitchClass {
    pub fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    /// Fixed-do syllable, e.g. `C#` → `DO#`, `Bb` → `SI♭`.
    pub fn solfege(&self) -> String {
        let base = self.letter.solfege();
        match self.accidental {
            Accidental::Natural => base.to_string(),
            Accidental::Sharp => format!("{base}#"),
            Accidental::Flat => format!("{base}♭"),
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_char(), self.accidental.symbol())
    }
}

/// A pitch class anchored to an octave, e.g. `C4` or `F#2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i8,
}

impl Default for Pitch {
    fn default() -> Self {
        Self::new(Letter::C, Accidental::Natural, REFERENCE_OCTAVE)
    }
}

impl Pitch {
    pub fn new(letter: Letter, accidental: Accidental, octave: i8) -> Self {
        Self {
            class: PitchClass::new(letter, accidental),
            octave,
        }
    }

    /// Encodes the pitch as a notation token.
    ///
    /// The reference octave is the bare letter, lower octaves append one `,`
    /// per octave below it, higher octaves switch to lower case and append one
    /// `'` per octave above the fifth.
    pub fn abc_token(&self) -> String {
        let class = self.class.to_string();
        let octave = i32::from(self.octave);
        let reference = i32::from(REFERENCE_OCTAVE);
        if octave < reference {
            let drops = (reference - octave) as usize;
            format!("{class}{}", ",".repeat(drops))
        } else if octave > reference {
            let raises = (octave - reference - 1) as usize;
            format!("{}{}", class.to_lowercase(), "'".repeat(raises))
        } else {
            class
        }
    }

    /// MIDI note number (C4 = 60).
    pub fn midi_number(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.class.letter.semitone() + self.class.accidental.offset()
    }

    /// Equal-tempered frequency with A4 tuned to 440 Hz.
    pub fn frequency_hz(&self) -> f64 {
        440.0 * 2f64.powf((self.midi_number() - 69) as f64 / 12.0)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}

impl FromStr for Pitch {
    type Err = TranscriberError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TranscriberError::invalid_timeline(format!("unparsable pitch `{s}`"));

        let mut chars = s.chars().peekable();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let accidental = match chars.peek().copied().and_then(Accidental::from_char) {
            Some(accidental) => {
                chars.next();
                accidental
            }
            None => Accidental::Natural,
        };

        let rest: String = chars.collect();
        if rest.is_empty() {
            return Err(invalid());
        }
        let octave = rest.parse::<i8>().map_err(|_| invalid())?;
        if !OCTAVE_RANGE.contains(&octave) {
            return Err(invalid());
        }

        Ok(Self::new(letter, accidental, octave))
    }
}

/// Returns the leading letter of a pitch label, if it is one of A–G.
pub fn leading_letter(label: &str) -> Option<Letter> {
    label.chars().next().and_then(Letter::from_char)
}

/// Strips octave digits from a pitch label: `"C#4"` → `"C#"`.
pub fn strip_octave(label: &str) -> String {
    label.chars().filter(|c| !c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(s: &str) -> Pitch {
        s.parse().unwrap()
    }

    #[test]
    fn encodes_octave_table() {
        assert_eq!(pitch("C4").abc_token(), "C");
        assert_eq!(pitch("C3").abc_token(), "C,");
        assert_eq!(pitch("C2").abc_token(), "C,,");
        assert_eq!(pitch("C5").abc_token(), "c");
        assert_eq!(pitch("C6").abc_token(), "c'");
        assert_eq!(pitch("C7").abc_token(), "c''");
    }

    #[test]
    fn keeps_accidentals_in_tokens() {
        assert_eq!(pitch("F#4").abc_token(), "F#");
        assert_eq!(pitch("Bb3").abc_token(), "Bb,");
        assert_eq!(pitch("Bb5").abc_token(), "bb");
    }

    #[test]
    fn rejects_malformed_labels() {
        for bad in ["", "H4", "C", "C#", "Cx4", "c4", "C4.5", "C-2", "C10", "C-128"] {
            assert!(bad.parse::<Pitch>().is_err(), "`{bad}` should not parse");
        }
    }

    #[test]
    fn extreme_octaves_encode_without_overflow() {
        assert_eq!(Pitch::new(Letter::C, Accidental::Natural, i8::MIN).abc_token().len(), 133);
        assert_eq!(Pitch::new(Letter::C, Accidental::Natural, i8::MAX).abc_token().len(), 123);
        assert_eq!(pitch("C-1").abc_token(), "C,,,,,");
        assert_eq!(pitch("B9").abc_token(), "b''''");
    }

    #[test]
    fn display_round_trips() {
        for label in ["C4", "F#2", "Bb6", "A0"] {
            assert_eq!(pitch(label).to_string(), label);
        }
    }

    #[test]
    fn maps_to_midi_and_frequency() {
        assert_eq!(pitch("C4").midi_number(), 60);
        assert_eq!(pitch("A4").midi_number(), 69);
        assert_eq!(pitch("Db4").midi_number(), pitch("C#4").midi_number());
        assert!((pitch("A4").frequency_hz() - 440.0).abs() < 1e-9);
        assert!((pitch("A5").frequency_hz() - 880.0).abs() < 1e-9);
    }

    #[test]
    fn solfege_follows_fixed_do() {
        assert_eq!(pitch("C4").class.solfege(), "DO");
        assert_eq!(pitch("G#3").class.solfege(), "SOL#");
        assert_eq!(pitch("Bb4").class.solfege(), "SI♭");
    }

    #[test]
    fn strips_octave_digits() {
        assert_eq!(strip_octave("C#4"), "C#");
        assert_eq!(strip_octave("A10"), "A");
        assert_eq!(leading_letter("E4"), Some(Letter::E));
        assert_eq!(leading_letter("X4"), None);
    }
}
