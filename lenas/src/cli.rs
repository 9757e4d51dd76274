use std::num::ParseIntError;

use bpaf::*;

#[derive(Copy, Clone, Debug)]
pub enum Mode {
    Auto,
    Mode32,
    Mode64,
}

#[derive(Debug, Clone)]
pub struct Cli {
    pub sections: Vec<String>,
    pub start_address: u64,
    pub stop_address: u64,
    pub mode: Mode,
    pub binary: bool,
    pub vma: u64,
    pub size_of_proc: Vec<u64>,
    pub resolve_jmp: Vec<u64>,
    pub path: String,
}

fn parse_address(s: &str) -> Result<u64, ParseIntError> {
    if s.starts_with("0x") || s.starts_with("0X") {
        u64::from_str_radix(&s[2..], 16)
    } else {
        s.parse()
    }
}

pub fn parse_cli() -> Cli {
    let sections = short('j')
        .long("section")
        .help("Only display information for section NAME")
        .argument("NAME")
        .many();

    let start_address = long("start-address")
        .help("Only process data whose address is >= ADDR")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(0);

    let stop_address = long("stop-address")
        .help("Only process data whose address is < ADDR")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(u64::MAX);

    let mode = long("mode")
        .help("Decode in 32 or 64 bit mode [default: from the file header]")
        .argument::<String>("BITS")
        .parse(|s| match s.as_str() {
            "32" => Ok(Mode::Mode32),
            "64" => Ok(Mode::Mode64),
            _ => Err(format!("invalid mode {s}")),
        })
        .fallback(Mode::Auto);

    let binary = short('b')
        .long("binary")
        .help("Treat FILE as a raw code blob instead of an object file")
        .switch();

    let vma = long("vma")
        .help("Load address of a raw code blob [default: 0]")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .fallback(0);

    let size_of_proc = long("size-of-proc")
        .help("Print the byte size of the procedure at ADDR")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .many();

    let resolve_jmp = long("resolve-jmp")
        .help("Follow the jump chain at ADDR and print the final target")
        .argument::<String>("ADDR")
        .parse(move |s| parse_address(&s))
        .many();

    let path = positional("FILE")
        .help("File to process")
        .fallback("a.out".into());

    construct!(Cli {
        sections,
        start_address,
        stop_address,
        mode,
        binary,
        vma,
        size_of_proc,
        resolve_jmp,
        path,
    })
    .to_options()
    .version(env!("CARGO_PKG_VERSION"))
    .descr("Print the byte layout of machine instructions")
    .fallback_to_usage()
    .run()
}
