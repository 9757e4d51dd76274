//! Properties that hold for arbitrary input bytes.

use proptest::prelude::*;

use lenasm_core::{insn::Insn, ArchDecoder};
use lenasm_x86::{Decoder, Options};

fn field_in_bounds(offset: u8, size: u8, len: usize) -> bool {
    offset as usize + size as usize <= len
}

proptest! {
    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..32), amd64: bool) {
        let decoder = Decoder::new(&Options { amd64 }).unwrap();
        let mut insn = Insn::default();
        let _ = decoder.decode(&bytes, &mut insn);
    }

    #[test]
    fn decoded_length_is_bounded(bytes in prop::collection::vec(any::<u8>(), 0..32), amd64: bool) {
        let decoder = Decoder::new(&Options { amd64 }).unwrap();
        let mut insn = Insn::default();
        if let Ok(len) = decoder.decode(&bytes, &mut insn) {
            prop_assert!(len >= 1);
            prop_assert!(len <= bytes.len());
            prop_assert!(len <= 15 || insn.is_invalid());
        }
    }

    #[test]
    fn decoded_fields_are_inside_the_instruction(
        bytes in prop::collection::vec(any::<u8>(), 0..32),
        amd64: bool,
    ) {
        let decoder = Decoder::new(&Options { amd64 }).unwrap();
        let mut insn = Insn::default();
        if let Ok(len) = decoder.decode(&bytes, &mut insn) {
            if !insn.is_invalid() {
                prop_assert!(field_in_bounds(insn.opcode_offset(), insn.opcode_size(), len));
                prop_assert!(field_in_bounds(insn.disp_offset(), insn.disp_size(), len));
                prop_assert!(field_in_bounds(insn.imm_offset(), insn.imm_size(), len));
            }
        }
    }

    #[test]
    fn decode_is_deterministic(bytes in prop::collection::vec(any::<u8>(), 0..32), amd64: bool) {
        let decoder = Decoder::new(&Options { amd64 }).unwrap();
        let mut a = Insn::default();
        let mut b = Insn::default();
        let ra = decoder.decode(&bytes, &mut a);
        let rb = decoder.decode(&bytes, &mut b);
        prop_assert_eq!(ra, rb);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn resolve_jmp_stays_reachable(code in prop::collection::vec(any::<u8>(), 0..64)) {
        let decoder = Decoder::new(&Options { amd64: true }).unwrap();
        let target = decoder.resolve_jmp(&code, 0);
        prop_assert!(target <= code.len());
    }
}
