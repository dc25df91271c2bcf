//! Walkthrough: a ledger channel between Alice and Bob is funded through a
//! guarantee held by another channel. Once the ledger channel's outcome is
//! final, the guarantee is claimed in two steps.
//!
//! Run with `RUST_LOG=nitro_exit=debug` to see the resolver's decisions.

use nitro_exit::{
    ledger::{
        settle_claim, ChannelId, ClaimRequest, HoldingsStore, MemoryLedger, OutcomeStore,
        SettlementExecutor,
    },
    Address, Allocation, Exit, Guarantee, Hash, Resolver, SingleAssetExit,
};
use std::convert::Infallible;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PARTICIPANTS: [&str; 2] = ["Alice", "Bob"];

/// Helper macro to print significant places in the protocol.
macro_rules! print_bold {
    ($($arg:tt)*) => {
        print!("\x1b[1m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

/// Executor printing the transfers instead of sending transactions.
struct Chain {
    participants: [Address; 2],
}

impl SettlementExecutor for Chain {
    type Error = Infallible;

    fn transfer(&mut self, asset: Address, allocation: &Allocation) -> Result<(), Self::Error> {
        let name = self
            .participants
            .iter()
            .position(|p| *p == allocation.destination)
            .map_or("someone else", |i| PARTICIPANTS[i]);
        println!("Chain: transfer {} of {:?} to {}", allocation.amount, asset, name);
        Ok(())
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn main() {
    init_logging();

    let alice: Address = rand::random();
    let bob: Address = rand::random();
    let ledger_channel: ChannelId = rand::random();
    let guarantor: ChannelId = Hash(rand::random());
    let eth = Address::ZERO;

    let mut ledger = MemoryLedger::new();
    let mut chain = Chain {
        participants: [alice, bob],
    };

    print_bold!("Guarantor channel is funded with 6");
    ledger.deposit(guarantor, eth, 6.into()).unwrap();

    // Bob comes first, whatever is left goes to Alice.
    let guarantee = Guarantee::new(vec![bob, alice]);
    let guarantor_outcome = Exit(vec![SingleAssetExit::new(
        eth,
        vec![guarantee.to_allocation().unwrap()],
    )]);
    println!(
        "Guarantor outcome: 0x{}",
        hex::encode(guarantor_outcome.encode().unwrap())
    );

    print_bold!("Ledger channel concludes with Alice: 5, Bob: 5");
    let final_outcome = SingleAssetExit::new(
        eth,
        vec![
            Allocation::new(alice, 5.into()),
            Allocation::new(bob, 5.into()),
        ],
    );
    println!(
        "Outcome hash: {:?}",
        Exit(vec![final_outcome.clone()]).hash().unwrap()
    );
    ledger.set_outcome(ledger_channel, eth, final_outcome);

    let resolver = Resolver::default();
    let mut request = ClaimRequest {
        guarantor,
        target: ledger_channel,
        guarantee: guarantor_outcome,
        guarantee_index: 0,
        indices: vec![vec![1]],
    };

    print_bold!("Bob claims his share first");
    settle_claim(&mut ledger, &mut chain, &resolver, &request).unwrap();
    println!(
        "Guarantor holdings left: {}",
        ledger.holdings(guarantor, eth)
    );

    print_bold!("Alice claims the rest");
    request.indices = vec![];
    settle_claim(&mut ledger, &mut chain, &resolver, &request).unwrap();
    println!(
        "Guarantor holdings left: {}",
        ledger.holdings(guarantor, eth)
    );
    println!(
        "Ledger channel outcome: {:#?}",
        ledger.outcome(ledger_channel, eth).unwrap()
    );
}
