use core::fmt::Debug;

use rand::{distributions::Standard, prelude::Distribution};
use serde::Serialize;
use uint::construct_uint;

use super::de::{Decode, Decoder};

macro_rules! impl_hex_debug {
    ($T:ident) => {
        impl Debug for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    f.write_fmt(format_args!("{:02x}", b))?;
                }
                Ok(())
            }
        }
    };
}

macro_rules! bytesN {
    ( $T:ident, $N:literal ) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
        pub struct $T(pub [u8; $N]);

        impl Serialize for $T {
            fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl Distribution<$T> for Standard {
            fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> $T {
                $T(rng.gen())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl From<[u8; $N]> for $T {
            fn from(bytes: [u8; $N]) -> Self {
                Self(bytes)
            }
        }

        impl_hex_debug!($T);
    };
}

// Output of keccak256, also used to identify channels.
bytesN!(Hash, 32);

impl Decode for Hash {
    const IS_DYNAMIC: bool = false;

    fn decode(decoder: &mut Decoder<'_>) -> super::Result<Self> {
        decoder.read_slot().map(Self)
    }
}

// We could use primitive_types:U256 or ethereum_types::U256 here, too. Both
// have the ability to serde serialize, but unfortunately to a hex string, which
// is not what we want. Since both primitive_types and ethereum_types
// internally use construct_uint and don't add much functionality it is easier
// to just create our own type.
construct_uint! {
    pub struct U256(4);
}

impl Serialize for U256 {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        serializer.serialize_bytes(&bytes)
    }
}

impl Decode for U256 {
    const IS_DYNAMIC: bool = false;

    fn decode(decoder: &mut Decoder<'_>) -> super::Result<Self> {
        decoder.read_slot().map(|slot| U256::from_big_endian(&slot))
    }
}

impl Distribution<U256> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> U256 {
        let buf: [u8; 32] = rng.gen();
        U256::from_big_endian(&buf)
    }
}

/// 20 byte identifier of a participant, a channel or an asset (token
/// contract, the zero address denotes the base asset).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);
impl_hex_debug!(Address);

impl Address {
    pub const ZERO: Address = Address([0; 20]);

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Abi encoding has addresses right aligned (like uints) instead of
        // left aligned like bytes/bytesN.
        let mut bytes = [0u8; 32];
        bytes[32 - 20..].copy_from_slice(self.0.as_slice());
        serializer.serialize_bytes(&bytes)
    }
}

impl Decode for Address {
    const IS_DYNAMIC: bool = false;

    fn decode(decoder: &mut Decoder<'_>) -> super::Result<Self> {
        decoder.read_right_aligned::<20>().map(Self)
    }
}

impl Distribution<Address> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Address {
        Address(rng.gen())
    }
}
