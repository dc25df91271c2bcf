//! Resolving a guarantee against the outcome of the channel it guarantees.
//!
//! A guarantee channel holds funds on behalf of a target channel. When the
//! target channel's outcome is final, the beneficiaries named by the
//! guarantee's priority list are paid out of the guarantee channel's holdings,
//! highest priority first, up to what the target outcome allocates to them.
//! Callers may restrict a claim to some positions of the target outcome; the
//! others stay in the (updated) target outcome for a later claim.
//!
//! Everything in here is a pure function of its inputs: the caller reads the
//! holdings and the target outcome from its ledger, runs the claim and
//! commits the result (see [ledger][crate::ledger]).

mod config;
mod resolver;

pub use config::{ClaimConfig, IndexPolicy};
pub use resolver::{resolve, ClaimOutcome, Resolver, SingleAssetClaim};

use crate::abiencode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    /// The guarantee's metadata could not be decoded.
    #[error(transparent)]
    Encoding(#[from] abiencode::Error),
    #[error("allocation {index} of asset {asset} is not a guarantee")]
    NotAGuarantee { asset: usize, index: usize },
    #[error("guarantee allocation {index} does not exist for asset {asset}")]
    GuaranteeIndexOutOfRange { asset: usize, index: usize },
    #[error("guarantee has {guarantee} assets, holdings {holdings} and target outcome {target}")]
    AssetCountMismatch {
        guarantee: usize,
        holdings: usize,
        target: usize,
    },
    #[error("indices given for {got} assets, expected {expected} or none")]
    IndicesCountMismatch { expected: usize, got: usize },
    #[error("asset {asset} differs between guarantee and target outcome")]
    AssetMismatch { asset: usize },
    #[error("asset {asset} repeats an earlier asset of the guarantee")]
    DuplicateAsset { asset: usize },
    #[error("index {index} is out of range for {len} target allocations")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("index {index} requested more than once")]
    DuplicateIndex { index: usize },
    /// Amounts of the asset cannot be represented (their sum overflows a
    /// 256 bit integer).
    #[error("invalid amount for asset {asset}")]
    InvalidAmount { asset: usize },
    #[error("no outcome stored for asset {asset} of the target channel")]
    UnknownOutcome { asset: usize },
}
