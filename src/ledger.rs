//! Interface to whoever keeps track of channel funds and outcomes, and to
//! whoever moves the funds.
//!
//! The claim logic in [claim][crate::claim] never touches storage. Settling a
//! claim against a ledger means: take a snapshot of the guarantor's holdings
//! and the target's outcome, resolve, commit both updates, and only then
//! execute the transfers. [settle_claim] does exactly that on top of the
//! traits defined here.

mod memory;

pub use memory::MemoryLedger;

use crate::{
    abiencode::types::{Address, Hash, U256},
    claim::{ClaimError, ClaimOutcome, Resolver},
    exit::{Allocation, Exit, SingleAssetExit},
};
use alloc::vec::Vec;
use core::{convert::Infallible, fmt::Debug};
use thiserror::Error;

/// Channels are identified by the hash of their parameters.
pub type ChannelId = Hash;

/// Funds deposited into channels, per asset.
pub trait HoldingsStore {
    /// Zero for channels or assets that have never been funded.
    fn holdings(&self, channel: ChannelId, asset: Address) -> U256;
    fn set_holdings(&mut self, channel: ChannelId, asset: Address, amount: U256);
}

/// Finalized outcomes of channels, per asset.
pub trait OutcomeStore {
    fn outcome(&self, channel: ChannelId, asset: Address) -> Option<SingleAssetExit>;
    fn set_outcome(&mut self, channel: ChannelId, asset: Address, outcome: SingleAssetExit);
}

/// Performs the payouts of a settled claim.
pub trait SettlementExecutor {
    type Error: Debug;

    fn transfer(&mut self, asset: Address, allocation: &Allocation) -> Result<(), Self::Error>;
}

/// Records the transfers instead of executing them.
impl SettlementExecutor for Vec<(Address, Allocation)> {
    type Error = Infallible;

    fn transfer(&mut self, asset: Address, allocation: &Allocation) -> Result<(), Self::Error> {
        self.push((asset, allocation.clone()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("holdings of asset {asset:?} in channel {channel:?} would exceed 2^256-1")]
    InvalidAmount { channel: ChannelId, asset: Address },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettleError<E: Debug> {
    #[error(transparent)]
    Claim(#[from] ClaimError),
    /// The ledger was already updated when the transfer failed.
    #[error("transfer failed: {0:?}")]
    Transfer(E),
}

/// Everything needed to settle a guarantee besides the ledger's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Channel holding the guarantee and the funds.
    pub guarantor: ChannelId,
    /// Channel whose outcome is paid out.
    pub target: ChannelId,
    /// Outcome of the guarantor channel. Its assets select which holdings
    /// and target outcomes take part in the claim.
    pub guarantee: Exit,
    /// Position of the guarantee allocation in every asset of `guarantee`.
    pub guarantee_index: usize,
    /// Per asset positions of the target outcome to settle, empty for all.
    pub indices: Vec<Vec<usize>>,
}

/// Settle a claim against `ledger` and execute the resulting transfers with
/// `executor`.
///
/// Nothing is written unless every asset could be resolved. Updated holdings
/// and target outcomes are committed before the first transfer.
pub fn settle_claim<L, X>(
    ledger: &mut L,
    executor: &mut X,
    resolver: &Resolver,
    request: &ClaimRequest,
) -> Result<ClaimOutcome, SettleError<X::Error>>
where
    L: HoldingsStore + OutcomeStore,
    X: SettlementExecutor,
{
    let assets: Vec<Address> = request.guarantee.iter().map(|e| e.asset).collect();

    let holdings: Vec<U256> = assets
        .iter()
        .map(|&asset| ledger.holdings(request.guarantor, asset))
        .collect();
    let target = assets
        .iter()
        .enumerate()
        .map(|(i, &asset)| {
            ledger
                .outcome(request.target, asset)
                .ok_or(ClaimError::UnknownOutcome { asset: i })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let outcome = resolver.claim(
        &request.guarantee,
        &holdings,
        request.guarantee_index,
        &Exit(target),
        &request.indices,
    )?;

    for ((&asset, &amount), updated) in assets
        .iter()
        .zip(&outcome.updated_holdings)
        .zip(outcome.updated_target_outcome.iter())
    {
        ledger.set_holdings(request.guarantor, asset, amount);
        ledger.set_outcome(request.target, asset, updated.clone());
    }
    tracing::info!(
        guarantor = ?request.guarantor,
        target = ?request.target,
        assets = assets.len(),
        "claim committed"
    );

    for exit in outcome.exit.iter() {
        for payout in &exit.allocations {
            executor
                .transfer(exit.asset, payout)
                .map_err(SettleError::Transfer)?;
        }
    }

    Ok(outcome)
}
