//! The code size state shared by encoder and decoder.
//!
//! Both sides ask the same question whenever a dictionary entry is about to be created: given
//! the next free code, what happens to the table? As long as they ask at the same logical point
//! of the stream they agree on every code size.
use crate::{Code, Header};

/// What creating the next dictionary entry does to the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Growth {
    /// There is room at the current code size.
    Append,
    /// The code size grows by one bit to make room.
    Widen,
    /// The table starts over from the single bytes.
    Reset,
    /// No entry is created.
    Full,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CodeSize {
    /// The current code length.
    width: u8,
    min: u8,
    max: u8,
    allow_reset: bool,
}

impl CodeSize {
    pub(crate) fn new(header: Header) -> Self {
        CodeSize {
            width: header.min_code_size(),
            min: header.min_code_size(),
            max: header.max_code_size(),
            allow_reset: header.allow_reset,
        }
    }

    pub(crate) fn width(&self) -> u8 {
        self.width
    }

    /// The number of codes representable with the current code size.
    pub(crate) fn limit(&self) -> Code {
        1 << self.width
    }

    pub(crate) fn growth(&self, next_code: Code) -> Growth {
        if next_code < self.limit() {
            Growth::Append
        } else if self.width < self.max {
            Growth::Widen
        } else if self.allow_reset {
            Growth::Reset
        } else {
            Growth::Full
        }
    }

    /// The code size of the code word that precedes `growth`.
    ///
    /// With a fixed width `min == max`, so this is always the current width.
    pub(crate) fn width_for(&self, growth: Growth) -> u8 {
        match growth {
            Growth::Append | Growth::Full => self.width,
            Growth::Widen => self.width + 1,
            Growth::Reset => self.min,
        }
    }

    pub(crate) fn apply(&mut self, growth: Growth) {
        match growth {
            Growth::Append | Growth::Full => {}
            Growth::Widen => self.width += 1,
            Growth::Reset => self.width = self.min,
        }
    }
}
