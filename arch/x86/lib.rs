#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod tables;

use core::ops::{Deref, DerefMut};

use lenasm_core::{
    bytes::Bytes,
    error::Error,
    insn::{Insn, INSN_INVALID, INSN_PREFIX, INSN_RELATIVE},
    utils::zextract,
    ArchDecoder,
};

pub use self::tables::{compress, decompress, OpFlags, Tables};

type Result<T = (), E = Error> = core::result::Result<T, E>;

const INSN_MAX_LEN: usize = 15;

// x86 prefixes
const PREFIX_OPERAND_SIZE: u8 = 0x66;
const PREFIX_ADDRESS_SIZE: u8 = 0x67;
const PREFIX_REX: u8 = 0x40;
const PREFIX_REX_MASK: u8 = 0xf0;

const OPCODE_ESCAPE: u8 = 0x0f;
const OPCODE_RETN: u8 = 0xc3;
const OPCODE_RETN_IMM16: u8 = 0xc2;
const OPCODE_INT3: u8 = 0xcc;
const OPCODE_JMP_REL32: u8 = 0xe9;

const MODE_REGISTER_DIRECT: u8 = 3;

/// Upper bound on followed jump hops. A chain that loops back on itself
/// terminates here instead of spinning forever.
const JMP_CHAIN_MAX: usize = 64;

#[derive(Copy, Clone, Debug)]
pub struct Options {
    /// Decode in 64-bit mode.
    pub amd64: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { amd64: true }
    }
}

#[derive(Default)]
struct State {
    prefix_66: bool,
    prefix_67: bool,
    rex_w: bool,
}

struct Inner<'a> {
    bytes: Bytes<'a>,
    tables: &'a Tables,
    amd64: bool,
    state: State,
}

impl<'a> Deref for Inner<'a> {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl<'a> DerefMut for Inner<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl<'a> Inner<'a> {
    fn peek(&self) -> Result<u8> {
        self.bytes
            .peek_u8()
            .ok_or(Error::More(self.bytes.offset() + 1))
    }

    fn decode(&mut self, out: &mut Insn) -> Result<usize> {
        out.clear();

        if !self.read_prefixes(out)? {
            return Ok(self.bytes.offset());
        }

        if self.amd64 && !self.read_rex(out)? {
            return Ok(self.bytes.offset());
        }

        let (op, flags) = match self.read_opcode(out)? {
            Some(x) => x,
            None => return Ok(self.bytes.offset()),
        };

        let flags = self.read_modrm(op, flags, out)?;
        self.read_imm(op, flags, out)?;

        let len = self.bytes.offset();
        if len > INSN_MAX_LEN {
            out.flags_mut().set(INSN_INVALID);
        }
        Ok(len)
    }

    /// Phase 1: legacy prefixes.
    fn read_prefixes(&mut self, out: &mut Insn) -> Result<bool> {
        while self.tables.primary(self.peek()?).any(OpFlags::PREFIX) {
            let prefix = self.bytes.read_u8()?;
            if prefix == PREFIX_OPERAND_SIZE {
                self.prefix_66 = true;
            }
            if prefix == PREFIX_ADDRESS_SIZE {
                self.prefix_67 = true;
            }
            out.flags_mut().set(INSN_PREFIX);
            if self.bytes.offset() == INSN_MAX_LEN {
                out.flags_mut().set(INSN_INVALID);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Phase 2a: REX prefix, 64-bit mode only.
    fn read_rex(&mut self, out: &mut Insn) -> Result<bool> {
        if self.peek()? & PREFIX_REX_MASK == PREFIX_REX {
            let rex = self.bytes.read_u8()?;
            self.rex_w = zextract(rex, 3, 1) != 0;
            out.set_rex(rex);
        }

        // at most one REX prefix
        if self.peek()? & PREFIX_REX_MASK == PREFIX_REX {
            self.bytes.read_u8()?;
            out.flags_mut().set(INSN_INVALID);
            return Ok(false);
        }
        Ok(true)
    }

    /// Phase 2b: opcode byte(s).
    fn read_opcode(&mut self, out: &mut Insn) -> Result<Option<(u8, OpFlags)>> {
        out.set_opcode(self.bytes.offset() as u8, 1);
        let op = self.bytes.read_u8()?;

        if op == OPCODE_ESCAPE {
            let op = self.bytes.read_u8()?;
            out.grow_opcode();
            let flags = self.tables.extended(op);
            if flags.any(OpFlags::INVALID) {
                out.flags_mut().set(INSN_INVALID);
                return Ok(None);
            }
            // a third opcode byte follows (0F 38 / 0F 3A maps)
            if flags.any(OpFlags::EXTENDED) {
                let op = self.bytes.read_u8()?;
                out.grow_opcode();
                return Ok(Some((op, flags)));
            }
            Ok(Some((op, flags)))
        } else {
            // the moffs forms A0-A3 size their offset by the address width
            if (0xa0..=0xa3).contains(&op) {
                self.prefix_66 = self.prefix_67;
            }
            Ok(Some((op, self.tables.primary(op))))
        }
    }

    /// Phase 3: ModR/M, SIB and displacement.
    fn read_modrm(&mut self, op: u8, mut flags: OpFlags, out: &mut Insn) -> Result<OpFlags> {
        if !flags.any(OpFlags::MODRM) {
            return Ok(flags);
        }

        let modrm = self.bytes.read_u8()?;
        let mode = zextract(modrm, 6, 2);
        let reg = zextract(modrm, 3, 3);
        let rm = zextract(modrm, 0, 3);
        out.set_modrm(modrm);

        // the TEST forms of F6/F7 carry an immediate the table cannot express
        if op == 0xf6 && reg <= 1 {
            flags |= OpFlags::DATA_I8;
        }
        if op == 0xf7 && reg <= 1 {
            flags |= OpFlags::DATA_I16_I32_I64;
        }

        let mut disp_size = 0;

        if mode != MODE_REGISTER_DIRECT && rm == 4 && (self.amd64 || !self.prefix_67) {
            let sib = self.bytes.read_u8()?;
            out.set_sib(sib);
            // no base register, a 4-byte displacement takes its place
            if sib & 7 == 5 && mode == 0 {
                disp_size = 4;
            }
        }

        match mode {
            0 => {
                if self.amd64 {
                    if rm == 5 {
                        // RIP-relative
                        disp_size = 4;
                        out.flags_mut().set(INSN_RELATIVE);
                    }
                } else if self.prefix_67 {
                    if rm == 6 {
                        disp_size = 2;
                    }
                } else if rm == 5 {
                    disp_size = 4;
                }
            }
            1 => disp_size = 1,
            2 => {
                disp_size = if !self.amd64 && self.prefix_67 { 2 } else { 4 };
            }
            _ => {}
        }

        if disp_size != 0 {
            let offset = self.bytes.offset() as u8;
            self.bytes.read(disp_size as usize)?;
            out.set_disp(offset, disp_size);
        }

        Ok(flags)
    }

    /// Phase 4: immediate data.
    fn read_imm(&mut self, op: u8, flags: OpFlags, out: &mut Insn) -> Result {
        let mut size = 0;

        if flags.any(OpFlags::DATA_I16_I32_I64)
            && self.amd64
            && self.rex_w
            && (0xb8..=0xbf).contains(&op)
        {
            // mov r64, imm64 is the only REX.W form with a full 8-byte immediate
            size = 8;
        } else if flags.any(OpFlags::DATA_I16_I32 | OpFlags::DATA_I16_I32_I64) {
            size = if self.prefix_66 { 2 } else { 4 };
        }

        size += flags.imm_extra();

        if size != 0 {
            let offset = self.bytes.offset() as u8;
            self.bytes.read(size as usize)?;
            out.set_imm(offset, size);
            if flags.any(OpFlags::RELATIVE) {
                out.flags_mut().set(INSN_RELATIVE);
            }
        }
        Ok(())
    }
}

/// x86/x86-64 instruction length decoder.
///
/// The classification tables are built once in [`new`](Self::new) and stay
/// immutable for the decoder's lifetime, so one instance can serve any
/// number of threads.
pub struct Decoder {
    opts: Options,
    tables: Tables,
}

impl Decoder {
    pub fn new(opts: &Options) -> Result<Self> {
        Ok(Self {
            opts: *opts,
            tables: Tables::new()?,
        })
    }
}

impl ArchDecoder for Decoder {
    fn decode(&self, bytes: &[u8], out: &mut Insn) -> Result<usize> {
        Inner {
            bytes: Bytes::new(bytes),
            tables: &self.tables,
            amd64: self.opts.amd64,
            state: State::default(),
        }
        .decode(out)
    }

    fn proc_size(&self, code: &[u8]) -> Result<usize> {
        let mut insn = Insn::default();
        let mut offset = 0;
        loop {
            let len = self.decode(&code[offset..], &mut insn)?;
            if len == 0 {
                break;
            }
            let opcode = code[offset + insn.opcode_offset() as usize];
            offset += len;
            match (len, opcode) {
                (1, OPCODE_INT3) | (1, OPCODE_RETN) | (3, OPCODE_RETN_IMM16) => break,
                _ => {}
            }
        }
        Ok(offset)
    }

    fn resolve_jmp(&self, code: &[u8], start: usize) -> usize {
        let mut insn = Insn::default();
        let mut offset = start;
        for _ in 0..JMP_CHAIN_MAX {
            let tail = match code.get(offset..) {
                Some(tail) => tail,
                None => break,
            };
            let len = match self.decode(tail, &mut insn) {
                Ok(len) => len,
                Err(_) => break,
            };
            if len != 5
                || insn.opcode_size() != 1
                || tail[insn.opcode_offset() as usize] != OPCODE_JMP_REL32
            {
                break;
            }
            let at = insn.imm_offset() as usize;
            let disp = i32::from_le_bytes([tail[at], tail[at + 1], tail[at + 2], tail[at + 3]]);
            let target = offset as i64 + len as i64 + disp as i64;
            if target < 0 || target as usize > code.len() {
                break;
            }
            offset = target as usize;
        }
        offset
    }
}

/// Boxed decoder for use behind the [`ArchDecoder`] trait.
pub fn decoder(opts: &Options) -> Result<alloc::boxed::Box<dyn ArchDecoder>> {
    Ok(alloc::boxed::Box::new(Decoder::new(opts)?))
}
