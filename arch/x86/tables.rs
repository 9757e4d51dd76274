use core::ops::{BitOr, BitOrAssign};

use lenasm_core::error::Error;

/// Classification of one opcode byte.
///
/// Flags combine by union. The `DATA_I8` and `DATA_I16` bit values double as
/// their immediate sizes in bytes and stack on top of the base immediate, to
/// encode opcodes with two independent immediate fields (ENTER, far CALL).
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct OpFlags(u8);

impl OpFlags {
    pub const NONE: Self = Self(0);
    pub const DATA_I8: Self = Self(1 << 0);
    pub const DATA_I16: Self = Self(1 << 1);
    pub const DATA_I16_I32: Self = Self(1 << 2);
    pub const DATA_I16_I32_I64: Self = Self(1 << 3);
    /// A further opcode byte follows (extended table only).
    pub const EXTENDED: Self = Self(1 << 4);
    pub const RELATIVE: Self = Self(1 << 5);
    pub const MODRM: Self = Self(1 << 6);
    /// Legacy prefix byte. Meaningful in the primary table only; the bit is
    /// reused as `INVALID` in the extended table.
    pub const PREFIX: Self = Self(1 << 7);
    /// Unassigned opcode. Extended table only, see `PREFIX`.
    pub const INVALID: Self = Self(1 << 7);

    pub const fn from_bits(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn any(self, flags: Self) -> bool {
        self.0 & flags.0 != 0
    }

    /// Immediate bytes contributed by `DATA_I8` and `DATA_I16`.
    pub fn imm_extra(self) -> u8 {
        self.0 & (Self::DATA_I8.0 | Self::DATA_I16.0)
    }
}

impl BitOr for OpFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for OpFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Expand a run-length encoded stream into `out`.
///
/// The stream is a sequence of groups: one control byte followed by up to
/// eight blocks. Bit `i` of the control byte, least significant first,
/// selects the kind of block `i`: 0 reads one literal byte, 1 reads a
/// `{count, symbol}` pair emitting `count` copies of `symbol`. Expansion
/// stops when the input is exhausted, a trailing block is truncated, or
/// `out` is full; the caller checks the returned length.
pub fn decompress(input: &[u8], out: &mut [u8]) -> usize {
    let mut pos = 0;
    let mut len = 0;
    while pos < input.len() && len < out.len() {
        let ctrl = input[pos];
        pos += 1;
        for bit in 0..8 {
            if pos >= input.len() || len >= out.len() {
                break;
            }
            if ctrl & (1 << bit) != 0 {
                if pos + 1 >= input.len() {
                    return len;
                }
                let count = input[pos] as usize;
                let symbol = input[pos + 1];
                pos += 2;
                let count = count.min(out.len() - len);
                out[len..len + count].fill(symbol);
                len += count;
            } else {
                out[len] = input[pos];
                pos += 1;
                len += 1;
            }
        }
    }
    len
}

/// Inverse of [`decompress`]: runs of two or more equal bytes become repeat
/// blocks, capped at 255. Returns the compressed length.
///
/// Panics if `out` cannot hold the result; the worst case is
/// `input.len() + input.len() / 8 + 2` bytes.
pub fn compress(input: &[u8], out: &mut [u8]) -> usize {
    let mut pos = 0;
    let mut ctrl = 0u8;
    let mut ctrl_pos = 0;
    let mut len = 1;
    let mut bit = 0;
    while pos < input.len() {
        let mut run = 1;
        while pos + run < input.len() && input[pos] == input[pos + run] && run < 255 {
            run += 1;
        }
        if run >= 2 {
            ctrl |= 1 << bit;
            out[len] = run as u8;
            out[len + 1] = input[pos];
            len += 2;
            pos += run;
        } else {
            out[len] = input[pos];
            len += 1;
            pos += 1;
        }
        bit += 1;
        if bit == 8 {
            out[ctrl_pos] = ctrl;
            ctrl_pos = len;
            len += 1;
            ctrl = 0;
            bit = 0;
        }
    }
    if bit > 0 {
        out[ctrl_pos] = ctrl;
    }
    len
}

// Compressed opcode classification maps, produced offline by the table
// authoring tool and verified against its uncompressed source.
const RAW_PRIMARY: [u8; 144] = [
    0x99, 0x04, 0x40, 0x01, 0x04, 0x02, 0x00, 0x04, 0x40, 0x01, 0x04, 0x02,
    0x00, 0x99, 0x04, 0x40, 0x01, 0x04, 0x02, 0x00, 0x04, 0x40, 0x01, 0x04,
    0x02, 0x00, 0x21, 0x04, 0x40, 0x01, 0x04, 0x80, 0x00, 0x04, 0x40, 0x01,
    0x04, 0x84, 0x80, 0x00, 0x04, 0x40, 0x01, 0x04, 0x80, 0x00, 0x04, 0x40,
    0x38, 0x01, 0x04, 0x80, 0x23, 0x00, 0x02, 0x40, 0x04, 0x80, 0x04, 0x44,
    0xcc, 0x01, 0x41, 0x04, 0x00, 0x10, 0x21, 0x41, 0x44, 0x02, 0x41, 0x0c,
    0x40, 0x85, 0x0a, 0x00, 0x06, 0x05, 0x00, 0x01, 0x08, 0x01, 0x08, 0x04,
    0x00, 0x3c, 0x01, 0x04, 0x06, 0x00, 0x08, 0x01, 0x08, 0x08, 0x02, 0x41,
    0x02, 0x00, 0x41, 0x02, 0x40, 0x41, 0x44, 0x03, 0x00, 0x02, 0x02, 0x00,
    0x01, 0xff, 0x02, 0x00, 0x04, 0x40, 0x02, 0x01, 0x02, 0x00, 0x08, 0x40,
    0x04, 0x21, 0x04, 0x01, 0x02, 0x24, 0xe4, 0x06, 0x21, 0x04, 0x00, 0x80,
    0x00, 0x02, 0x80, 0x02, 0x00, 0x02, 0x40, 0x03, 0x06, 0x00, 0x02, 0x40,
];

const RAW_EXTENDED: [u8; 83] = [
    0x05, 0x04, 0x40, 0x80, 0x05, 0x00, 0x80, 0x00, 0x80, 0x40, 0x80, 0x16,
    0x41, 0x09, 0x40, 0x06, 0x80, 0x00, 0x04, 0x40, 0x50, 0x80, 0x40, 0x06,
    0x80, 0x08, 0x40, 0x06, 0x00, 0x80, 0x00, 0x50, 0x80, 0x51, 0xef, 0x05,
    0x80, 0x30, 0x40, 0x04, 0x41, 0x03, 0x40, 0x00, 0x02, 0x40, 0x02, 0x80,
    0x04, 0x40, 0xc7, 0x10, 0x24, 0x10, 0x40, 0x03, 0x00, 0x40, 0x41, 0x40,
    0x02, 0x80, 0x03, 0x00, 0x94, 0x40, 0x41, 0x0d, 0x40, 0x41, 0x07, 0x40,
    0x41, 0x40, 0x03, 0x41, 0x06, 0x40, 0x08, 0x00, 0x2f, 0x40, 0x80,
];

fn decompress_table(input: &[u8]) -> Result<[OpFlags; 256], Error> {
    let mut raw = [0; 256];
    let len = decompress(input, &mut raw);
    if len != raw.len() {
        return Err(Error::Table(len));
    }
    let mut table = [OpFlags::NONE; 256];
    for (flags, raw) in table.iter_mut().zip(raw.iter()) {
        *flags = OpFlags::from_bits(*raw);
    }
    Ok(table)
}

/// Opcode classification maps, immutable once built.
///
/// `primary` classifies one-byte opcodes, `extended` the 0F-escaped map.
pub struct Tables {
    primary: [OpFlags; 256],
    extended: [OpFlags; 256],
}

impl Tables {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            primary: decompress_table(&RAW_PRIMARY)?,
            extended: decompress_table(&RAW_EXTENDED)?,
        })
    }

    pub fn primary(&self, opcode: u8) -> OpFlags {
        self.primary[opcode as usize]
    }

    pub fn extended(&self, opcode: u8) -> OpFlags {
        self.extended[opcode as usize]
    }
}
