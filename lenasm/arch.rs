#[cfg(feature = "x86")]
pub mod x86 {
    pub use lenasm_x86::*;
}
