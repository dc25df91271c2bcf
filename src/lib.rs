#![cfg_attr(not(feature = "std"), no_std)]
//! Exit format of state channel outcomes and the resolution of guarantees
//! against them.
//!
//! - [abiencode]: canonical (Solidity `abi.encode` compatible) encoding and
//!   decoding.
//! - [exit]: [Allocation], [SingleAssetExit] and [Exit], the outcome of a
//!   channel.
//! - [guarantee]: the priority list carried by guarantee allocations.
//! - [claim]: paying out a guarantee channel's holdings into the outcome of
//!   the channel it guarantees.
//! - [ledger]: the seam to the storage of holdings/outcomes and to whoever
//!   executes the transfers.

extern crate alloc;

pub mod abiencode {
    mod de;
    mod error;
    mod hashing;
    mod ser;

    pub mod as_bytes;
    pub mod types;

    pub use de::{from_slice, Decode, Decoder};
    pub use error::{Error, Malformed, Result};
    pub use hashing::{to_hash, Keccak256Writer};
    pub use ser::{to_vec, to_writer, Serializer, Writer};

    #[cfg(test)]
    mod tests;
}

pub mod claim;
pub mod exit;
pub mod guarantee;
pub mod ledger;

pub use abiencode::types::{Address, Hash, U256};
pub use claim::{ClaimConfig, ClaimError, ClaimOutcome, IndexPolicy, Resolver, SingleAssetClaim};
pub use exit::{Allocation, AllocationMetadata, AllocationType, Exit, SingleAssetExit};
pub use guarantee::{decode_guarantee, encode_guarantee, Guarantee, GUARANTEE_MARKER};
