use crate::flags::Flags;

pub const INSN_INVALID: u8 = 1 << 0;
pub const INSN_PREFIX: u8 = 1 << 1;
pub const INSN_REX: u8 = 1 << 2;
pub const INSN_MODRM: u8 = 1 << 3;
pub const INSN_SIB: u8 = 1 << 4;
pub const INSN_DISP: u8 = 1 << 5;
pub const INSN_IMM: u8 = 1 << 6;
pub const INSN_RELATIVE: u8 = 1 << 7;

/// Byte layout of one decoded instruction.
///
/// Offsets and sizes are byte counts from the first byte of the instruction;
/// the architectural 15-byte cap keeps each of them in a `u8`. A field is
/// meaningful only while its presence flag is set.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Insn {
    opcode_offset: u8,
    opcode_size: u8,
    disp_offset: u8,
    disp_size: u8,
    imm_offset: u8,
    imm_size: u8,
    rex: u8,
    modrm: u8,
    sib: u8,
    flags: Flags,
}

impl Insn {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    pub fn is_invalid(&self) -> bool {
        self.flags.any(INSN_INVALID)
    }

    pub fn opcode_offset(&self) -> u8 {
        self.opcode_offset
    }

    pub fn opcode_size(&self) -> u8 {
        self.opcode_size
    }

    pub fn set_opcode(&mut self, offset: u8, size: u8) {
        self.opcode_offset = offset;
        self.opcode_size = size;
    }

    pub fn grow_opcode(&mut self) {
        self.opcode_size += 1;
    }

    pub fn rex(&self) -> u8 {
        self.rex
    }

    pub fn set_rex(&mut self, rex: u8) {
        self.rex = rex;
        self.flags.set(INSN_REX);
    }

    pub fn modrm(&self) -> u8 {
        self.modrm
    }

    pub fn set_modrm(&mut self, modrm: u8) {
        self.modrm = modrm;
        self.flags.set(INSN_MODRM);
    }

    pub fn sib(&self) -> u8 {
        self.sib
    }

    pub fn set_sib(&mut self, sib: u8) {
        self.sib = sib;
        self.flags.set(INSN_SIB);
    }

    pub fn disp_offset(&self) -> u8 {
        self.disp_offset
    }

    pub fn disp_size(&self) -> u8 {
        self.disp_size
    }

    pub fn set_disp(&mut self, offset: u8, size: u8) {
        self.disp_offset = offset;
        self.disp_size = size;
        self.flags.set(INSN_DISP);
    }

    pub fn imm_offset(&self) -> u8 {
        self.imm_offset
    }

    pub fn imm_size(&self) -> u8 {
        self.imm_size
    }

    pub fn set_imm(&mut self, offset: u8, size: u8) {
        self.imm_offset = offset;
        self.imm_size = size;
        self.flags.set(INSN_IMM);
    }
}
