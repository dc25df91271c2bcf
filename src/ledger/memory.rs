use super::{ChannelId, HoldingsStore, LedgerError, OutcomeStore};
use crate::{
    abiencode::types::{Address, U256},
    exit::SingleAssetExit,
};
use alloc::collections::BTreeMap;

/// Ledger kept in memory, for tests and simulations.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    holdings: BTreeMap<(ChannelId, Address), U256>,
    outcomes: BTreeMap<(ChannelId, Address), SingleAssetExit>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to the holdings of `channel`, returns the new holdings.
    pub fn deposit(
        &mut self,
        channel: ChannelId,
        asset: Address,
        amount: U256,
    ) -> Result<U256, LedgerError> {
        let holdings = self.holdings.entry((channel, asset)).or_default();
        *holdings = holdings
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { channel, asset })?;
        tracing::debug!(?channel, ?asset, %amount, "deposit");
        Ok(*holdings)
    }
}

impl HoldingsStore for MemoryLedger {
    fn holdings(&self, channel: ChannelId, asset: Address) -> U256 {
        self.holdings
            .get(&(channel, asset))
            .copied()
            .unwrap_or_default()
    }

    fn set_holdings(&mut self, channel: ChannelId, asset: Address, amount: U256) {
        self.holdings.insert((channel, asset), amount);
    }
}

impl OutcomeStore for MemoryLedger {
    fn outcome(&self, channel: ChannelId, asset: Address) -> Option<SingleAssetExit> {
        self.outcomes.get(&(channel, asset)).cloned()
    }

    fn set_outcome(&mut self, channel: ChannelId, asset: Address, outcome: SingleAssetExit) {
        self.outcomes.insert((channel, asset), outcome);
    }
}
