//! Guarantees: allocations that, instead of paying out, name who is entitled
//! to the holdings of the guaranteeing channel.
//!
//! The priority list is stored in the allocation's metadata as
//! `abi.encode(address[])`, in the order given by the creator of the
//! guarantee. The list is not sorted, deduplicated or otherwise validated.

use crate::{
    abiencode::{
        self,
        types::{Address, U256},
        Malformed,
    },
    exit::{Allocation, AllocationType},
};
use alloc::vec::Vec;

/// Written into the allocation type slot of an allocation, flags it as a
/// guarantee rather than a payout.
pub const GUARANTEE_MARKER: AllocationType = AllocationType::Guarantee;

/// Offset slot and length slot in front of the destinations.
const DESCRIPTOR_OVERHEAD: usize = 2 * 32;
const DESTINATION_SIZE: usize = 32;

/// Encode a priority list as guarantee metadata.
pub fn encode_guarantee(priority: &[Address]) -> abiencode::Result<Vec<u8>> {
    abiencode::to_vec(priority)
}

/// Decode guarantee metadata into its priority list.
///
/// The buffer has to contain exactly the offset, the length and one slot per
/// destination, anything else is rejected.
pub fn decode_guarantee(buf: &[u8]) -> abiencode::Result<Vec<Address>> {
    let len = buf.len();
    if len < DESCRIPTOR_OVERHEAD || (len - DESCRIPTOR_OVERHEAD) % DESTINATION_SIZE != 0 {
        return Err(Malformed::DescriptorLength { len }.into());
    }

    let priority: Vec<Address> = abiencode::from_slice(buf)?;
    if DESCRIPTOR_OVERHEAD + priority.len() * DESTINATION_SIZE != len {
        return Err(Malformed::DescriptorLength { len }.into());
    }
    Ok(priority)
}

/// Decoded guarantee, the input of the claim resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Guarantee {
    /// Destinations in the target outcome, highest priority first.
    pub priority: Vec<Address>,
}

impl Guarantee {
    pub fn new(priority: Vec<Address>) -> Self {
        Self { priority }
    }

    pub fn decode(metadata: &[u8]) -> abiencode::Result<Self> {
        decode_guarantee(metadata).map(Self::new)
    }

    pub fn encode(&self) -> abiencode::Result<Vec<u8>> {
        encode_guarantee(&self.priority)
    }

    /// The guarantee allocation as stored in the guaranteeing channel's
    /// outcome. Destination and amount are not used by guarantees and stay
    /// zero.
    pub fn to_allocation(&self) -> abiencode::Result<Allocation> {
        Ok(Allocation {
            destination: Address::ZERO,
            amount: U256::zero(),
            allocation_type: GUARANTEE_MARKER,
            metadata: self.encode()?,
        })
    }

    /// Read the guarantee out of an allocation, `None` if the allocation is
    /// not flagged as guarantee.
    pub fn from_allocation(allocation: &Allocation) -> Option<abiencode::Result<Self>> {
        allocation
            .is_guarantee()
            .then(|| Self::decode(&allocation.metadata))
    }
}
