//! Uniform-random generation for every share element type, so the PRG
//! layers below can stay generic over `T: Elem` instead of hard-coding one
//! integer width.

use rand::RngCore;

pub trait RandomElem: Sized {
    fn random_from<R: RngCore + ?Sized>(rng: &mut R) -> Self;
}

macro_rules! impl_random_elem {
    ($($t:ty),*) => {
        $(
            impl RandomElem for $t {
                fn random_from<R: RngCore + ?Sized>(rng: &mut R) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$t>()];
                    rng.fill_bytes(&mut buf);
                    <$t>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_random_elem!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);
