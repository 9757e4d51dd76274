#![cfg_attr(not(feature = "std"), no_std)]

pub mod bytes;
pub mod error;
pub mod flags;
pub mod insn;
pub mod utils;

use crate::{error::Error, insn::Insn};

/// Decodes the byte layout of machine instructions.
///
/// Implementations are pure: identical input always produces an identical
/// record and length, and no state is kept between calls, so one decoder may
/// be shared between threads.
pub trait ArchDecoder: Send + Sync {
    /// Decode the layout of the instruction at the front of `bytes`.
    ///
    /// Returns the instruction length in bytes. Malformed encodings are
    /// reported in-band via `INSN_INVALID` with a best-effort length; only a
    /// buffer too short for the encoding yields an error.
    fn decode(&self, bytes: &[u8], out: &mut Insn) -> Result<usize, Error>;

    /// Total byte length of the routine at the start of `code`, terminator
    /// included.
    fn proc_size(&self, code: &[u8]) -> Result<usize, Error>;

    /// Follow a chain of unconditional relative jumps starting at `offset`,
    /// returning the offset of the final target within `code`.
    fn resolve_jmp(&self, code: &[u8], offset: usize) -> usize;
}
