use super::{Encode, Tail};

impl<const N: usize> Encode for [u8; N] {
    fn encode(&self) -> Vec<u8> {
        self.to_vec()
    }
}

impl Encode for u8 {
    fn encode(&self) -> Vec<u8> {
        vec![*self]
    }
}

// Fixed-width big-endian integers, so that lexicographic byte order on
// encoded keys agrees with numeric order.
macro_rules! impl_be_encode {
    ($type:ty) => {
        impl Encode for $type {
            fn encode(&self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }
        }
    };
}

impl_be_encode!(u16);
impl_be_encode!(u32);
impl_be_encode!(u64);
impl_be_encode!(i64);

impl Encode for () {
    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }
}

impl Encode for Tail {
    fn encode(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl<A: Encode> Encode for Vec<A> {
    fn encode(&self) -> Vec<u8> {
        let mut out = (self.len() as u32).encode();

        for item in self {
            out.extend(item.encode());
        }

        out
    }
}

impl<A: Encode, B: Encode> Encode for (A, B) {
    fn encode(&self) -> Vec<u8> {
        [self.0.encode(), self.1.encode()].concat()
    }
}

impl<A: Encode, B: Encode, C: Encode> Encode for (A, B, C) {
    fn encode(&self) -> Vec<u8> {
        [self.0.encode(), self.1.encode(), self.2.encode()].concat()
    }
}
