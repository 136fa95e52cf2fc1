use super::{Decode, Tail};

use thiserror::Error;

/// Failure to decode persisted bytes. Stored data is written by this crate's
/// own encoders, so hitting one of these means the store is corrupt and the
/// current operation must abort.
#[derive(Debug, Clone, Error)]
pub enum DecodingError {
    #[error("malformed input: {0} ({1:?})")]
    MalformedInput(String, Vec<u8>),
}

pub fn malformed_input<S: Into<String>>(msg: S, bytes: &[u8]) -> DecodingError {
    DecodingError::MalformedInput(msg.into(), bytes.to_vec())
}

pub type DecodingResult<'a, T> = Result<(T, &'a [u8]), DecodingError>;

impl<const N: usize> Decode for [u8; N] {
    fn decode(bytes: &[u8]) -> DecodingResult<Self> {
        match bytes.split_at_checked(N) {
            Some((head, rest)) => {
                let array = head.try_into().expect("split length mismatch");
                Ok((array, rest))
            }
            None => Err(malformed_input("array insufficient bytes", bytes)),
        }
    }
}

impl Decode for u8 {
    fn decode(bytes: &[u8]) -> DecodingResult<Self> {
        bytes
            .split_first()
            .map(|(b, rest)| (*b, rest))
            .ok_or(malformed_input("u8 insufficient bytes", bytes))
    }
}

macro_rules! impl_be_decode {
    ($type:ty) => {
        impl Decode for $type {
            fn decode(bytes: &[u8]) -> DecodingResult<Self> {
                const WIDTH: usize = size_of::<$type>();

                match bytes.split_at_checked(WIDTH) {
                    Some((head, rest)) => {
                        let be: [u8; WIDTH] = head.try_into().expect("split length mismatch");
                        Ok((<$type>::from_be_bytes(be), rest))
                    }
                    None => Err(malformed_input(
                        concat!(stringify!($type), " insufficient bytes"),
                        bytes,
                    )),
                }
            }
        }
    };
}

impl_be_decode!(u16);
impl_be_decode!(u32);
impl_be_decode!(u64);
impl_be_decode!(i64);

impl Decode for () {
    fn decode(bytes: &[u8]) -> DecodingResult<Self> {
        Ok(((), bytes))
    }
}

impl Decode for Tail {
    fn decode(bytes: &[u8]) -> DecodingResult<Self> {
        Ok((Tail(bytes.to_vec()), &bytes[bytes.len()..]))
    }
}

impl<A: Decode> Decode for Vec<A> {
    fn decode(bytes: &[u8]) -> DecodingResult<Self> {
        let (len, mut bytes) = u32::decode(bytes)?;
        let mut vec = Vec::with_capacity(len as usize);

        for _ in 0..len {
            let (item, rest) = A::decode(bytes)?;
            bytes = rest;

            vec.push(item);
        }

        Ok((vec, bytes))
    }
}
