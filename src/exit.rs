//! Rust representation of the exit format: how the funds locked in a channel
//! are distributed, per asset.
//!
//! The layout of all types matches the Solidity structs
//!
//! ```solidity
//! struct Allocation {
//!     bytes32 destination; // address, right aligned
//!     uint256 amount;
//!     uint8 allocationType;
//!     bytes metadata;
//! }
//! struct SingleAssetExit {
//!     address asset;
//!     bytes metadata;
//!     Allocation[] allocations;
//! }
//! ```
//!
//! and an `Exit` is a `SingleAssetExit[]`. Field order matters, the encoding
//! follows declaration order.

use core::ops::{Deref, DerefMut};

use crate::{
    abiencode::{
        self, as_bytes,
        types::{Address, Hash, U256},
        Decode, Decoder, Malformed,
    },
    guarantee::{Guarantee, GUARANTEE_MARKER},
};
use alloc::vec::Vec;
use serde::Serialize;

/// How the metadata of an [Allocation] has to be interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum AllocationType {
    /// Plain payout to `destination`.
    #[default]
    Simple = 0,
    WithdrawHelper = 1,
    /// The allocation is a guarantee, its metadata holds a priority list.
    Guarantee = 2,
}

impl TryFrom<u8> for AllocationType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Simple),
            1 => Ok(Self::WithdrawHelper),
            2 => Ok(Self::Guarantee),
            other => Err(other),
        }
    }
}

// Encoded as uint8, the serializer refuses plain enum variants.
impl Serialize for AllocationType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(*self as u8)
    }
}

impl Decode for AllocationType {
    const IS_DYNAMIC: bool = false;

    fn decode(decoder: &mut Decoder<'_>) -> abiencode::Result<Self> {
        let at = decoder.position();
        let value = decoder.read_u8()?;
        Self::try_from(value).map_err(|value| Malformed::InvalidVariant { at, value }.into())
    }
}

/// One beneficiary's entitlement to an asset.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    pub destination: Address,
    pub amount: U256,
    pub allocation_type: AllocationType,
    #[serde(with = "as_bytes")]
    pub metadata: Vec<u8>,
}

/// Interpretation of [Allocation::metadata], selected by the allocation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationMetadata<'a> {
    /// Passed through untouched (simple payouts, withdraw helpers).
    Opaque(&'a [u8]),
    Guarantee(Guarantee),
}

impl Allocation {
    /// A simple payout without metadata.
    pub fn new(destination: Address, amount: U256) -> Self {
        Self {
            destination,
            amount,
            allocation_type: AllocationType::Simple,
            metadata: Vec::new(),
        }
    }

    pub fn is_guarantee(&self) -> bool {
        self.allocation_type == GUARANTEE_MARKER
    }

    /// Interpret the metadata according to the allocation type.
    pub fn metadata_kind(&self) -> abiencode::Result<AllocationMetadata<'_>> {
        match self.allocation_type {
            AllocationType::Guarantee => {
                Guarantee::decode(&self.metadata).map(AllocationMetadata::Guarantee)
            }
            AllocationType::Simple | AllocationType::WithdrawHelper => {
                Ok(AllocationMetadata::Opaque(&self.metadata))
            }
        }
    }

    pub fn encode(&self) -> abiencode::Result<Vec<u8>> {
        abiencode::to_vec(self)
    }

    pub fn decode(buf: &[u8]) -> abiencode::Result<Self> {
        abiencode::from_slice(buf)
    }
}

impl Decode for Allocation {
    const IS_DYNAMIC: bool = true;

    fn decode(decoder: &mut Decoder<'_>) -> abiencode::Result<Self> {
        Ok(Self {
            destination: decoder.read()?,
            amount: decoder.read()?,
            allocation_type: decoder.read()?,
            metadata: decoder.read_bytes()?,
        })
    }
}

/// Distribution of a single asset.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SingleAssetExit {
    /// Zero denotes the base asset of the chain.
    pub asset: Address,
    #[serde(with = "as_bytes")]
    pub metadata: Vec<u8>,
    /// Ordered by priority.
    pub allocations: Vec<Allocation>,
}

impl SingleAssetExit {
    pub fn new(asset: Address, allocations: Vec<Allocation>) -> Self {
        Self {
            asset,
            metadata: Vec::new(),
            allocations,
        }
    }

    /// Sum of all allocated amounts, `None` if it does not fit into a
    /// [U256].
    pub fn total(&self) -> Option<U256> {
        self.allocations
            .iter()
            .try_fold(U256::zero(), |sum, a| sum.checked_add(a.amount))
    }

    pub fn encode(&self) -> abiencode::Result<Vec<u8>> {
        abiencode::to_vec(self)
    }

    pub fn decode(buf: &[u8]) -> abiencode::Result<Self> {
        abiencode::from_slice(buf)
    }
}

impl Decode for SingleAssetExit {
    const IS_DYNAMIC: bool = true;

    fn decode(decoder: &mut Decoder<'_>) -> abiencode::Result<Self> {
        Ok(Self {
            asset: decoder.read()?,
            metadata: decoder.read_bytes()?,
            allocations: decoder.read()?,
        })
    }
}

/// Full outcome of a channel, one entry per asset.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Exit(pub Vec<SingleAssetExit>);

impl Exit {
    pub fn encode(&self) -> abiencode::Result<Vec<u8>> {
        abiencode::to_vec(self)
    }

    pub fn decode(buf: &[u8]) -> abiencode::Result<Self> {
        abiencode::from_slice(buf)
    }

    /// `keccak256(abi.encode(exit))`, the way outcomes are committed to
    /// on-chain.
    pub fn hash(&self) -> abiencode::Result<Hash> {
        abiencode::to_hash(self)
    }
}

impl Decode for Exit {
    const IS_DYNAMIC: bool = true;

    fn decode(decoder: &mut Decoder<'_>) -> abiencode::Result<Self> {
        Vec::<SingleAssetExit>::decode(decoder).map(Self)
    }
}

impl From<Vec<SingleAssetExit>> for Exit {
    fn from(value: Vec<SingleAssetExit>) -> Self {
        Self(value)
    }
}

impl Deref for Exit {
    type Target = Vec<SingleAssetExit>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Exit {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
