#[macro_use]
extern crate log;

mod cli;

use std::{
    error::Error,
    fmt::Write as _,
    fs,
    io::{self, Write},
    process,
};

use lenasm::{
    arch::x86, Arch, Decoder, Insn, INSN_DISP, INSN_IMM, INSN_INVALID, INSN_MODRM, INSN_PREFIX,
    INSN_RELATIVE, INSN_REX, INSN_SIB,
};
use object::{Object, ObjectSection, Section};

use crate::cli::{Cli, Mode};

fn unsupported_arch() -> ! {
    eprintln!("error: unsupported architecture");
    process::exit(1);
}

/// Text form of a decoded layout, one token per field.
fn push_layout(out: &mut String, insn: &Insn, len: usize) {
    let flags = insn.flags();
    let _ = write!(out, "len={len}");
    if flags.any(INSN_PREFIX) {
        out.push_str(" prefix");
    }
    if flags.any(INSN_REX) {
        let _ = write!(out, " rex={:02x}", insn.rex());
    }
    if insn.opcode_size() != 0 {
        let _ = write!(out, " opc={}:{}", insn.opcode_offset(), insn.opcode_size());
    }
    if flags.any(INSN_MODRM) {
        let _ = write!(out, " modrm={:02x}", insn.modrm());
    }
    if flags.any(INSN_SIB) {
        let _ = write!(out, " sib={:02x}", insn.sib());
    }
    if flags.any(INSN_DISP) {
        let _ = write!(out, " disp={}:{}", insn.disp_offset(), insn.disp_size());
    }
    if flags.any(INSN_IMM) {
        let _ = write!(out, " imm={}:{}", insn.imm_offset(), insn.imm_size());
    }
    if flags.any(INSN_RELATIVE) {
        out.push_str(" rel");
    }
    if flags.any(INSN_INVALID) {
        out.push_str(" invalid");
    }
}

struct App<'a> {
    cli: &'a Cli,
    arch: Arch,
}

impl<'a> App<'a> {
    fn get_arch(file: &object::File, cli: &Cli) -> Arch {
        use object::Architecture as A;

        let amd64 = match cli.mode {
            Mode::Mode32 => false,
            Mode::Mode64 => true,
            Mode::Auto => match file.architecture() {
                A::I386 => false,
                A::X86_64 | A::X86_64_X32 => true,
                _ => unsupported_arch(),
            },
        };

        Arch::X86(x86::Options { amd64 })
    }

    fn new(cli: &'a Cli, file: &object::File) -> Self {
        let arch = Self::get_arch(file, cli);

        println!();
        println!("{}:     {}-bit code", cli.path, arch.addr_size());

        Self { cli, arch }
    }

    fn raw(cli: &'a Cli) -> Self {
        let amd64 = !matches!(cli.mode, Mode::Mode32);
        Self {
            cli,
            arch: Arch::X86(x86::Options { amd64 }),
        }
    }

    fn create_decoder(&self, address: u64) -> Result<Decoder, lenasm::Error> {
        Decoder::new(self.arch, address)
    }

    fn process_section(&self, section: Section) -> Result<(), Box<dyn Error>> {
        let section_name = section.name()?;

        let mut data = section.data()?;
        let mut start_address = section.address();
        let stop_address = start_address + data.len() as u64;

        if start_address >= self.cli.stop_address || stop_address <= self.cli.start_address {
            return Ok(());
        }

        if self.cli.stop_address < stop_address {
            data = &data[..(self.cli.stop_address - start_address) as usize];
        }

        if start_address < self.cli.start_address {
            data = &data[(self.cli.start_address - start_address) as usize..];
            start_address = self.cli.start_address;
        }

        println!("\nSection {section_name}:");
        self.process_code(start_address, data)?;
        Ok(())
    }

    fn process_code(&self, address: u64, data: &[u8]) -> Result<(), Box<dyn Error>> {
        if self.cli.size_of_proc.is_empty() && self.cli.resolve_jmp.is_empty() {
            return self.list_code(address, data);
        }

        let stop = address + data.len() as u64;

        for &addr in &self.cli.size_of_proc {
            if addr < address || addr >= stop {
                continue;
            }
            let code = &data[(addr - address) as usize..];
            let decoder = self.create_decoder(addr)?;
            match decoder.proc_size(code) {
                Ok(size) => println!("{addr:#x}: proc size {size}"),
                Err(err) => eprintln!("error: {addr:#x}: {err}"),
            }
        }

        for &addr in &self.cli.resolve_jmp {
            if addr < address || addr >= stop {
                continue;
            }
            let code = &data[(addr - address) as usize..];
            let decoder = self.create_decoder(addr)?;
            println!("{addr:#x}: jmp target {:#x}", decoder.resolve_jmp(code));
        }

        Ok(())
    }

    fn list_code(&self, address: u64, data: &[u8]) -> Result<(), Box<dyn Error>> {
        // ignore broken pipe error
        fn helper(result: io::Result<()>) -> io::Result<()> {
            if matches!(result, Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe) {
                Ok(())
            } else {
                result
            }
        }

        let stdout = io::stdout();
        let mut out = stdout.lock();

        let mut decoder = self.create_decoder(address)?;
        let mut insn = Insn::default();
        let mut line = String::new();
        let mut offset = 0;

        while offset < data.len() {
            let address = decoder.address();
            let len = match decoder.decode(&data[offset..], &mut insn) {
                Ok(len) => len,
                Err(err) => {
                    warn!("{address:#x}: {err}");
                    break;
                }
            };

            if insn.is_invalid() {
                warn!("{address:#x}: invalid instruction");
            }

            line.clear();
            let _ = write!(line, "{address:8x}:\t");
            for (i, byte) in data[offset..offset + len].iter().enumerate() {
                if i != 0 {
                    line.push(' ');
                }
                let _ = write!(line, "{byte:02x}");
            }
            // layout column, 15-byte instructions are the widest
            while line.len() < 10 + 3 * self.arch.insn_size_max() {
                line.push(' ');
            }
            push_layout(&mut line, &insn, len);

            helper(writeln!(out, "{line}"))?;
            offset += len;
        }

        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = cli::parse_cli();
    let data = fs::read(&cli.path)?;

    if cli.binary {
        let app = App::raw(&cli);
        return app.process_code(cli.vma, &data);
    }

    let file = object::File::parse(&*data)?;
    let app = App::new(&cli, &file);

    if cli.sections.is_empty() {
        for section in file.sections() {
            if object::SectionKind::Text == section.kind() {
                app.process_section(section)?;
            }
        }
    } else {
        for section_name in &cli.sections {
            if let Some(section) = file.section_by_name(section_name) {
                app.process_section(section)?;
            }
        }
    }

    Ok(())
}
