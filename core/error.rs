use core::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Need more bytes to decode an instruction.
    More(usize),
    /// A classification table did not decompress to 256 bytes.
    Table(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::More(_) => fmt.write_str("Need more data"),
            Self::Table(_) => fmt.write_str("Invalid lookup table"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
