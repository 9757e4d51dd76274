use lenasm_core::{error::Error, insn::Insn, ArchDecoder};
use lenasm_x86::{Decoder, Options};

fn decoder(amd64: bool) -> Decoder {
    Decoder::new(&Options { amd64 }).unwrap()
}

#[test]
fn truncated_instruction() {
    let mut insn = Insn::default();
    let d = decoder(true);
    // mov rax, imm64 cut short, ten bytes are needed
    let err = d.decode(&[0x48, 0xb8, 0x01], &mut insn).unwrap_err();
    assert_eq!(err, Error::More(10));
    // opcode with no modrm byte
    let err = d.decode(&[0x8b], &mut insn).unwrap_err();
    assert_eq!(err, Error::More(2));
    let err = d.decode(&[], &mut insn).unwrap_err();
    assert_eq!(err, Error::More(1));
}

#[test]
fn proc_size_stops_at_ret() {
    let code = [0x48, 0x89, 0xc8, 0xc3, 0x90];
    assert_eq!(decoder(true).proc_size(&code), Ok(4));
}

#[test]
fn proc_size_stops_at_int3() {
    let code = [0x90, 0xcc, 0x90, 0x90];
    assert_eq!(decoder(true).proc_size(&code), Ok(2));
}

#[test]
fn proc_size_stops_at_ret_imm16() {
    let code = [0x90, 0xc2, 0x10, 0x00, 0x90];
    assert_eq!(decoder(true).proc_size(&code), Ok(4));
}

#[test]
fn proc_size_ret_byte_inside_operand() {
    // the c3 here is immediate data of the mov, not a terminator
    let code = [0xb8, 0xc3, 0x00, 0x00, 0x00, 0xc3];
    assert_eq!(decoder(true).proc_size(&code), Ok(6));
}

#[test]
fn proc_size_without_terminator() {
    let code = [0x90, 0x90];
    assert_eq!(decoder(true).proc_size(&code), Err(Error::More(1)));
}

#[test]
fn resolve_jmp_follows_chain() {
    #[rustfmt::skip]
    let code = [
        0xe9, 0x03, 0x00, 0x00, 0x00, // 0: jmp 8
        0x90, 0x90, 0x90,
        0xe9, 0x00, 0x00, 0x00, 0x00, // 8: jmp 13
        0xc3,                         // 13: ret
    ];
    assert_eq!(decoder(true).resolve_jmp(&code, 0), 13);
    assert_eq!(decoder(true).resolve_jmp(&code, 8), 13);
}

#[test]
fn resolve_jmp_not_a_jump() {
    let code = [0x90, 0xc3];
    assert_eq!(decoder(true).resolve_jmp(&code, 0), 0);
    assert_eq!(decoder(true).resolve_jmp(&code, 1), 1);
}

#[test]
fn resolve_jmp_cycle_terminates() {
    // jmp 0, the chain loops back on itself
    let code = [0xe9, 0xfb, 0xff, 0xff, 0xff];
    assert_eq!(decoder(true).resolve_jmp(&code, 0), 0);
}

#[test]
fn resolve_jmp_prefixed_jump_is_not_followed() {
    // an operand-size prefix changes the layout, so this is not jmp rel32
    let code = [0x66, 0xe9, 0x01, 0x00, 0x90, 0xc3];
    assert_eq!(decoder(true).resolve_jmp(&code, 0), 0);
}

#[test]
fn resolve_jmp_target_outside_code() {
    let code = [0xe9, 0x7f, 0x00, 0x00, 0x00];
    assert_eq!(decoder(true).resolve_jmp(&code, 0), 0);
}

#[test]
fn resolve_jmp_start_outside_code() {
    let code = [0x90];
    assert_eq!(decoder(true).resolve_jmp(&code, 100), 100);
}
