use core::mem;

pub trait ZExtract<U>: Sized {
    fn zextract(&self, pos: u32, len: u32) -> U;
}

macro_rules! impl_extract {
    ($($uint:ty),+ $(,)?) => (
        $(
            impl ZExtract<$uint> for $uint {
                fn zextract(&self, pos: u32, len: u32) -> $uint {
                    let w = mem::size_of::<$uint>() as u32 * 8;
                    (*self as $uint << (w - pos - len)) >> (w - len)
                }
            }
        )+
    );
}

impl_extract! {
    u8,
    u16,
    u32,
    u64,
}

pub fn zextract<U, T: ZExtract<U>>(value: T, pos: u32, len: u32) -> U {
    value.zextract(pos, len)
}
