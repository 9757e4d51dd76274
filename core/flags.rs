/// Presence and validity flags of a decoded instruction.
///
/// The raw bit layout is part of the external interface and is only exposed
/// through [`bits`](Self::bits) and [`from_bits`](Self::from_bits).
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Flags {
    raw: u8,
}

impl Flags {
    pub const fn empty() -> Self {
        Self { raw: 0 }
    }

    pub const fn from_bits(raw: u8) -> Self {
        Self { raw }
    }

    pub const fn bits(&self) -> u8 {
        self.raw
    }

    pub fn clear(&mut self, flags: u8) -> &mut Self {
        self.raw &= !flags;
        self
    }

    pub fn set(&mut self, flags: u8) -> &mut Self {
        self.raw |= flags;
        self
    }

    pub fn set_if(&mut self, flags: u8, cond: bool) -> &mut Self {
        if cond {
            self.raw |= flags;
        } else {
            self.raw &= !flags;
        }
        self
    }

    pub fn any(&self, flags: u8) -> bool {
        self.raw & flags != 0
    }

    pub fn all(&self, flags: u8) -> bool {
        self.raw & flags == flags
    }
}
