#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod arch;

use alloc::boxed::Box;

use lenasm_core::ArchDecoder;

pub use lenasm_core::{
    error::Error,
    flags::Flags,
    insn::{
        Insn, INSN_DISP, INSN_IMM, INSN_INVALID, INSN_MODRM, INSN_PREFIX, INSN_RELATIVE, INSN_REX,
        INSN_SIB,
    },
};

#[non_exhaustive]
#[derive(Copy, Clone)]
pub enum Arch {
    #[cfg(feature = "x86")]
    X86(crate::arch::x86::Options),
}

impl Arch {
    pub fn addr_size(&self) -> usize {
        match self {
            #[cfg(feature = "x86")]
            Arch::X86(opts) => {
                if opts.amd64 {
                    64
                } else {
                    32
                }
            }
        }
    }

    pub fn insn_size_max(&self) -> usize {
        match self {
            #[cfg(feature = "x86")]
            Arch::X86(..) => 15,
        }
    }
}

/// Address-tracking front end over an architecture decoder.
pub struct Decoder {
    address: u64,
    arch: Arch,
    decoder: Box<dyn ArchDecoder>,
}

impl Decoder {
    pub fn new(arch: Arch, address: u64) -> Result<Self, Error> {
        use crate::arch::*;

        fn wrap<T: 'static + ArchDecoder>(x: T) -> Box<dyn ArchDecoder> {
            Box::new(x)
        }

        let decoder = match arch {
            #[cfg(feature = "x86")]
            Arch::X86(arch_opts) => wrap(x86::Decoder::new(&arch_opts)?),
        };

        Ok(Self {
            address,
            arch,
            decoder,
        })
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    /// Current decoding address.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Decode the layout of one instruction and advance the address past it.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Insn) -> Result<usize, Error> {
        let len = self.decoder.decode(bytes, out)?;
        self.address += len as u64;
        Ok(len)
    }

    /// Byte length of the routine starting at the current address,
    /// terminator included. The address is not advanced.
    pub fn proc_size(&self, code: &[u8]) -> Result<usize, Error> {
        self.decoder.proc_size(code)
    }

    /// Follow a chain of unconditional relative jumps starting at the
    /// current address, returning the address of the final target.
    /// `code` is the bytes reachable from the current address.
    pub fn resolve_jmp(&self, code: &[u8]) -> u64 {
        self.address + self.decoder.resolve_jmp(code, 0) as u64
    }

    /// Do not decode `size` bytes.
    pub fn skip(&mut self, size: u64) {
        self.address += size;
    }
}
