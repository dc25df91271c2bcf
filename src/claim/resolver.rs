use super::{ClaimConfig, ClaimError, IndexPolicy};
use crate::{
    abiencode::types::{Address, U256},
    exit::{Allocation, Exit, SingleAssetExit},
    guarantee::Guarantee,
};
use alloc::{collections::BTreeSet, vec::Vec};

/// Result of claiming a single asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleAssetClaim {
    /// What is left in the guarantee channel.
    pub updated_holdings: U256,
    /// The target outcome with the paid out amounts deducted.
    pub updated_target: SingleAssetExit,
    /// Payouts in the order they were resolved. Each is a copy of the matched
    /// target allocation with the paid amount.
    pub payouts: Vec<Allocation>,
}

/// Result of claiming every asset of a guarantee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimOutcome {
    /// New holdings of the guarantee channel, one per asset.
    pub updated_holdings: Vec<U256>,
    pub updated_target_outcome: Exit,
    /// Transfers to perform, one entry per asset (possibly without
    /// allocations), carrying asset and metadata of the target outcome.
    pub exit: Exit,
}

/// Pay out `holdings` to the destinations in `priority`, in order.
///
/// For every destination the first allocation of `target` to it with a
/// non-zero amount is paid as much of it as the remaining holdings allow. An
/// empty `indices` settles every position, otherwise allocations at other
/// positions are left untouched. Destinations missing from the target, and
/// indices matching nothing, have no effect.
///
/// Never pays out more than `holdings` in total, never pays an allocation more
/// than its amount.
pub fn resolve(
    priority: &[Address],
    holdings: U256,
    target: &SingleAssetExit,
    indices: &[usize],
) -> SingleAssetClaim {
    let mut remaining = holdings;
    let mut allocations = target.allocations.clone();
    let mut payouts = Vec::new();

    for destination in priority {
        let Some(j) = allocations
            .iter()
            .position(|a| a.destination == *destination && !a.amount.is_zero())
        else {
            tracing::trace!(?destination, "no unpaid allocation");
            continue;
        };

        if !indices.is_empty() && !indices.contains(&j) {
            tracing::trace!(?destination, position = j, "not requested, left for later");
            continue;
        }

        let payout = remaining.min(allocations[j].amount);
        if payout.is_zero() {
            continue;
        }

        allocations[j].amount -= payout;
        remaining -= payout;
        tracing::debug!(?destination, position = j, %payout, %remaining, "paying out");
        payouts.push(Allocation {
            amount: payout,
            ..allocations[j].clone()
        });

        if remaining.is_zero() {
            break;
        }
    }

    SingleAssetClaim {
        updated_holdings: remaining,
        updated_target: SingleAssetExit {
            asset: target.asset,
            metadata: target.metadata.clone(),
            allocations,
        },
        payouts,
    }
}

/// Applies the [ClaimConfig] around [resolve] and lifts it to whole
/// [Exit]s.
#[derive(Debug, Copy, Clone, Default)]
pub struct Resolver {
    config: ClaimConfig,
}

impl Resolver {
    pub fn new(config: ClaimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    fn check_indices(&self, indices: &[usize], len: usize) -> Result<(), ClaimError> {
        if self.config.index_policy == IndexPolicy::Ignore {
            return Ok(());
        }

        let mut seen = BTreeSet::new();
        for &index in indices {
            if index >= len {
                tracing::warn!(index, len, "rejecting out of range index");
                return Err(ClaimError::IndexOutOfRange { index, len });
            }
            if !seen.insert(index) {
                tracing::warn!(index, "rejecting duplicate index");
                return Err(ClaimError::DuplicateIndex { index });
            }
        }
        Ok(())
    }

    /// Claim a single asset of `guarantee` from `target`.
    pub fn claim_asset(
        &self,
        guarantee: &Guarantee,
        holdings: U256,
        target: &SingleAssetExit,
        indices: &[usize],
    ) -> Result<SingleAssetClaim, ClaimError> {
        self.check_indices(indices, target.allocations.len())?;
        Ok(resolve(&guarantee.priority, holdings, target, indices))
    }

    /// Claim every asset of a guarantee.
    ///
    /// `guarantee` is the guarantee channel's outcome, in which the
    /// allocation at `guarantee_index` of every asset has to be the
    /// guarantee. `holdings`, `guarantee` and `target` are aligned by asset;
    /// `indices` is too, or empty to settle everything in every asset.
    ///
    /// Assets are resolved independently of each other. Nothing is returned
    /// unless every asset could be resolved.
    pub fn claim(
        &self,
        guarantee: &Exit,
        holdings: &[U256],
        guarantee_index: usize,
        target: &Exit,
        indices: &[Vec<usize>],
    ) -> Result<ClaimOutcome, ClaimError> {
        let assets = guarantee.len();
        if holdings.len() != assets || target.len() != assets {
            return Err(ClaimError::AssetCountMismatch {
                guarantee: assets,
                holdings: holdings.len(),
                target: target.len(),
            });
        }
        if !indices.is_empty() && indices.len() != assets {
            return Err(ClaimError::IndicesCountMismatch {
                expected: assets,
                got: indices.len(),
            });
        }
        // Every asset is resolved against its own snapshot, a repeated asset
        // would pay out of the same holdings twice.
        let mut seen = BTreeSet::new();
        if let Some(asset) = guarantee.iter().position(|e| !seen.insert(e.asset)) {
            return Err(ClaimError::DuplicateAsset { asset });
        }

        let mut outcome = ClaimOutcome {
            updated_holdings: Vec::with_capacity(assets),
            updated_target_outcome: Exit(Vec::with_capacity(assets)),
            exit: Exit(Vec::with_capacity(assets)),
        };

        for (asset, (guarantee_exit, target_exit)) in guarantee.iter().zip(target.iter()).enumerate()
        {
            if guarantee_exit.asset != target_exit.asset {
                return Err(ClaimError::AssetMismatch { asset });
            }
            if target_exit.total().is_none() {
                return Err(ClaimError::InvalidAmount { asset });
            }

            let allocation = guarantee_exit.allocations.get(guarantee_index).ok_or(
                ClaimError::GuaranteeIndexOutOfRange {
                    asset,
                    index: guarantee_index,
                },
            )?;
            let decoded = Guarantee::from_allocation(allocation).ok_or(
                ClaimError::NotAGuarantee {
                    asset,
                    index: guarantee_index,
                },
            )??;

            let asset_indices = indices.get(asset).map(Vec::as_slice).unwrap_or_default();
            let claimed = self.claim_asset(&decoded, holdings[asset], target_exit, asset_indices)?;
            tracing::debug!(
                asset,
                payouts = claimed.payouts.len(),
                holdings = %claimed.updated_holdings,
                "asset claimed"
            );

            outcome.updated_holdings.push(claimed.updated_holdings);
            outcome.exit.push(SingleAssetExit {
                asset: target_exit.asset,
                metadata: target_exit.metadata.clone(),
                allocations: claimed.payouts,
            });
            outcome.updated_target_outcome.push(claimed.updated_target);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{abiencode, exit::AllocationType};
    use alloc::vec;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const A: Address = Address([0xaa; 20]);
    const B: Address = Address([0xbb; 20]);
    const C: Address = Address([0xcc; 20]);

    fn target(amounts: &[(Address, u64)]) -> SingleAssetExit {
        SingleAssetExit::new(
            Address::ZERO,
            amounts
                .iter()
                .map(|&(d, amount)| Allocation::new(d, amount.into()))
                .collect(),
        )
    }

    fn amounts(exit: &SingleAssetExit) -> Vec<(Address, u64)> {
        exit.allocations
            .iter()
            .map(|a| (a.destination, a.amount.as_u64()))
            .collect()
    }

    fn payouts(claim: &SingleAssetClaim) -> Vec<(Address, u64)> {
        claim
            .payouts
            .iter()
            .map(|a| (a.destination, a.amount.as_u64()))
            .collect()
    }

    #[test]
    fn without_indices_everything_is_settled() {
        let claim = resolve(&[B, A], 6.into(), &target(&[(A, 5), (B, 5)]), &[]);

        assert_eq!(claim.updated_holdings, U256::zero());
        assert_eq!(amounts(&claim.updated_target), vec![(A, 4), (B, 0)]);
        assert_eq!(payouts(&claim), vec![(B, 5), (A, 1)]);
    }

    #[test]
    fn indices_restrict_the_settled_positions() {
        let claim = resolve(&[B, A], 6.into(), &target(&[(A, 5), (B, 5)]), &[1]);

        assert_eq!(claim.updated_holdings, U256::one());
        assert_eq!(amounts(&claim.updated_target), vec![(A, 5), (B, 0)]);
        assert_eq!(payouts(&claim), vec![(B, 5)]);
    }

    #[test]
    fn stops_when_holdings_are_exhausted() {
        let claim = resolve(&[B, A], 5.into(), &target(&[(A, 5), (B, 5)]), &[]);

        assert_eq!(claim.updated_holdings, U256::zero());
        assert_eq!(amounts(&claim.updated_target), vec![(A, 5), (B, 0)]);
        assert_eq!(payouts(&claim), vec![(B, 5)]);
    }

    #[test]
    fn unknown_destinations_are_inert() {
        let original = target(&[(A, 5), (B, 5)]);
        let claim = resolve(&[C], 6.into(), &original, &[]);

        assert_eq!(claim.updated_holdings, 6.into());
        assert_eq!(claim.updated_target, original);
        assert!(claim.payouts.is_empty());
    }

    #[test]
    fn out_of_range_indices_are_inert() {
        let original = target(&[(A, 5), (B, 5)]);
        let claim = resolve(&[B, A], 6.into(), &original, &[7]);

        assert_eq!(claim.updated_holdings, 6.into());
        assert_eq!(claim.updated_target, original);
        assert!(claim.payouts.is_empty());
    }

    #[test]
    fn zero_holdings_pay_nothing() {
        let original = target(&[(A, 5), (B, 5)]);
        let claim = resolve(&[B, A], U256::zero(), &original, &[]);

        assert_eq!(claim.updated_target, original);
        assert!(claim.payouts.is_empty());
    }

    #[test]
    fn skips_exhausted_allocations_of_the_same_destination() {
        // The first allocation to A is already paid, the second one matches.
        let claim = resolve(&[A], 3.into(), &target(&[(A, 0), (B, 1), (A, 4)]), &[]);

        assert_eq!(amounts(&claim.updated_target), vec![(A, 0), (B, 1), (A, 1)]);
        assert_eq!(payouts(&claim), vec![(A, 3)]);
    }

    #[test]
    fn repeated_destination_in_priority_list() {
        // Every entry matches the first unpaid allocation at that time.
        let claim = resolve(&[A, A], 7.into(), &target(&[(A, 3), (A, 5)]), &[]);

        assert_eq!(amounts(&claim.updated_target), vec![(A, 0), (A, 1)]);
        assert_eq!(payouts(&claim), vec![(A, 3), (A, 4)]);
        assert_eq!(claim.updated_holdings, U256::zero());
    }

    #[test]
    fn payouts_carry_type_and_metadata() {
        let mut original = target(&[(A, 5)]);
        original.allocations[0].allocation_type = AllocationType::WithdrawHelper;
        original.allocations[0].metadata = vec![0xca, 0x11];

        let claim = resolve(&[A], 2.into(), &original, &[]);
        assert_eq!(
            claim.payouts,
            vec![Allocation {
                destination: A,
                amount: 2.into(),
                allocation_type: AllocationType::WithdrawHelper,
                metadata: vec![0xca, 0x11],
            }]
        );
    }

    #[test]
    fn complement_indices_settle_the_rest() {
        let original = target(&[(A, 5), (B, 5)]);
        let first = resolve(&[B, A], 6.into(), &original, &[1]);
        let second = resolve(
            &[B, A],
            first.updated_holdings,
            &first.updated_target,
            &[0],
        );

        assert_eq!(payouts(&second), vec![(A, 1)]);
        assert_eq!(second.updated_holdings, U256::zero());
        // Same end state as a single claim of everything.
        let all_at_once = resolve(&[B, A], 6.into(), &original, &[]);
        assert_eq!(second.updated_target, all_at_once.updated_target);
    }

    fn random_target(rng: &mut StdRng, destinations: &[Address]) -> SingleAssetExit {
        let len = rng.gen_range(0..8);
        SingleAssetExit::new(
            rng.gen(),
            (0..len)
                .map(|_| {
                    let d = destinations[rng.gen_range(0..destinations.len())];
                    Allocation::new(d, rng.gen_range(0u64..20).into())
                })
                .collect(),
        )
    }

    #[test]
    fn random_claims_conserve_value() {
        let mut rng = StdRng::seed_from_u64(0);
        let destinations: Vec<Address> = (0..4).map(|_| rng.gen()).collect();

        for _ in 0..500 {
            let original = random_target(&mut rng, &destinations);
            let priority: Vec<Address> = (0..rng.gen_range(0..6))
                .map(|_| destinations[rng.gen_range(0..destinations.len())])
                .collect();
            let holdings = U256::from(rng.gen_range(0u64..60));
            let indices: Vec<usize> = (0..rng.gen_range(0..4))
                .map(|_| rng.gen_range(0..10))
                .collect();

            let claim = resolve(&priority, holdings, &original, &indices);

            let paid = claim
                .payouts
                .iter()
                .fold(U256::zero(), |sum, p| sum + p.amount);
            assert_eq!(claim.updated_holdings + paid, holdings);

            // Every deduction shows up as a payout to the same destination.
            let mut deducted = U256::zero();
            for (j, (before, after)) in original
                .allocations
                .iter()
                .zip(&claim.updated_target.allocations)
                .enumerate()
            {
                assert!(after.amount <= before.amount);
                assert_eq!(after.destination, before.destination);
                if !indices.is_empty() && !indices.contains(&j) {
                    assert_eq!(after, before);
                }
                deducted = deducted + (before.amount - after.amount);
            }
            assert_eq!(deducted, paid);

            // Selecting every position is the same as selecting none.
            let all: Vec<usize> = (0..original.allocations.len()).collect();
            if indices.is_empty() {
                assert_eq!(resolve(&priority, holdings, &original, &all), claim);
            }
        }
    }

    fn guarantee_exit(priority: &[Address], assets: &[Address]) -> Exit {
        let allocation = Guarantee::new(priority.to_vec()).to_allocation().unwrap();
        assets
            .iter()
            .map(|&asset| SingleAssetExit::new(asset, vec![allocation.clone()]))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn claims_each_asset_independently() {
        let token = Address([0x70; 20]);
        let guarantee = guarantee_exit(&[B, A], &[Address::ZERO, token]);
        let target = Exit(vec![
            target(&[(A, 5), (B, 5)]),
            SingleAssetExit {
                asset: token,
                metadata: vec![0x01],
                allocations: vec![Allocation::new(A, 2.into()), Allocation::new(B, 9.into())],
            },
        ]);

        let outcome = Resolver::default()
            .claim(&guarantee, &[6.into(), 4.into()], 0, &target, &[vec![], vec![0]])
            .unwrap();

        assert_eq!(outcome.updated_holdings, vec![U256::zero(), 2.into()]);
        assert_eq!(
            amounts(&outcome.updated_target_outcome[0]),
            vec![(A, 4), (B, 0)]
        );
        assert_eq!(
            amounts(&outcome.updated_target_outcome[1]),
            vec![(A, 0), (B, 9)]
        );
        assert_eq!(outcome.exit[0].allocations.len(), 2);
        assert_eq!(outcome.exit[1].asset, token);
        assert_eq!(outcome.exit[1].metadata, vec![0x01]);
        assert_eq!(
            outcome.exit[1].allocations,
            vec![Allocation::new(A, 2.into())]
        );
    }

    #[test]
    fn empty_indices_settle_every_asset() {
        let guarantee = guarantee_exit(&[B, A], &[Address::ZERO]);
        let target = Exit(vec![target(&[(A, 5), (B, 5)])]);

        let with_wildcard = Resolver::default()
            .claim(&guarantee, &[6.into()], 0, &target, &[])
            .unwrap();
        let with_empty_sets = Resolver::default()
            .claim(&guarantee, &[6.into()], 0, &target, &[vec![]])
            .unwrap();
        assert_eq!(with_wildcard, with_empty_sets);
    }

    #[test]
    fn rejects_misaligned_inputs() {
        let guarantee = guarantee_exit(&[B, A], &[Address::ZERO]);
        let target = Exit(vec![target(&[(A, 5), (B, 5)])]);
        let resolver = Resolver::default();

        assert_eq!(
            resolver.claim(&guarantee, &[], 0, &target, &[]),
            Err(ClaimError::AssetCountMismatch {
                guarantee: 1,
                holdings: 0,
                target: 1
            })
        );
        assert_eq!(
            resolver.claim(&guarantee, &[6.into()], 0, &target, &[vec![], vec![]]),
            Err(ClaimError::IndicesCountMismatch {
                expected: 1,
                got: 2
            })
        );

        let mut other_asset = target.clone();
        other_asset[0].asset = Address([1; 20]);
        assert_eq!(
            resolver.claim(&guarantee, &[6.into()], 0, &other_asset, &[]),
            Err(ClaimError::AssetMismatch { asset: 0 })
        );
    }

    #[test]
    fn rejects_repeated_assets() {
        let guarantee = guarantee_exit(&[A], &[Address::ZERO, Address::ZERO]);
        let target = Exit(vec![target(&[(A, 10)]), target(&[(A, 10)])]);

        assert_eq!(
            Resolver::default().claim(&guarantee, &[5.into(), 5.into()], 0, &target, &[]),
            Err(ClaimError::DuplicateAsset { asset: 1 })
        );
    }

    #[test]
    fn strict_policy_applies_to_every_asset() {
        let token = Address([0x70; 20]);
        let guarantee = guarantee_exit(&[B, A], &[Address::ZERO, token]);
        let mut second = target(&[(A, 2), (B, 9)]);
        second.asset = token;
        let target = Exit(vec![target(&[(A, 5), (B, 5)]), second]);
        let holdings = [6.into(), 4.into()];

        let strict = Resolver::new(ClaimConfig::strict());
        assert_eq!(
            strict.claim(&guarantee, &holdings, 0, &target, &[vec![1], vec![0, 2]]),
            Err(ClaimError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            strict.claim(&guarantee, &holdings, 0, &target, &[vec![1], vec![0, 0]]),
            Err(ClaimError::DuplicateIndex { index: 0 })
        );

        // The lenient default resolves both assets with the same input.
        let outcome = Resolver::default()
            .claim(&guarantee, &holdings, 0, &target, &[vec![1], vec![0, 2]])
            .unwrap();
        assert_eq!(outcome.updated_holdings, vec![U256::one(), 2.into()]);
    }

    #[test]
    fn rejects_missing_or_broken_guarantees() {
        let target = Exit(vec![target(&[(A, 5), (B, 5)])]);
        let resolver = Resolver::default();

        let guarantee = guarantee_exit(&[B, A], &[Address::ZERO]);
        assert_eq!(
            resolver.claim(&guarantee, &[6.into()], 1, &target, &[]),
            Err(ClaimError::GuaranteeIndexOutOfRange { asset: 0, index: 1 })
        );

        let payout = Exit(vec![SingleAssetExit::new(
            Address::ZERO,
            vec![Allocation::new(A, 1.into())],
        )]);
        assert_eq!(
            resolver.claim(&payout, &[6.into()], 0, &target, &[]),
            Err(ClaimError::NotAGuarantee { asset: 0, index: 0 })
        );

        let mut broken = guarantee.clone();
        broken[0].allocations[0].metadata.pop();
        assert!(matches!(
            resolver.claim(&broken, &[6.into()], 0, &target, &[]),
            Err(ClaimError::Encoding(abiencode::Error::MalformedEncoding(_)))
        ));
    }

    #[test]
    fn rejects_unrepresentable_totals() {
        let guarantee = guarantee_exit(&[A], &[Address::ZERO]);
        let mut target = Exit(vec![target(&[(A, 1), (B, 1)])]);
        target[0].allocations[1].amount = U256::MAX;

        assert_eq!(
            Resolver::default().claim(&guarantee, &[6.into()], 0, &target, &[]),
            Err(ClaimError::InvalidAmount { asset: 0 })
        );
    }

    #[test]
    fn index_policy() {
        let guarantee = Guarantee::new(vec![B, A]);
        let original = target(&[(A, 5), (B, 5)]);

        let lenient = Resolver::default();
        assert!(lenient
            .claim_asset(&guarantee, 6.into(), &original, &[1, 1, 9])
            .is_ok());

        let strict = Resolver::new(ClaimConfig::strict());
        assert_eq!(
            strict.claim_asset(&guarantee, 6.into(), &original, &[1, 2]),
            Err(ClaimError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            strict.claim_asset(&guarantee, 6.into(), &original, &[1, 0, 1]),
            Err(ClaimError::DuplicateIndex { index: 1 })
        );
        assert_eq!(
            strict
                .claim_asset(&guarantee, 6.into(), &original, &[1])
                .unwrap(),
            resolve(&[B, A], 6.into(), &original, &[1])
        );
    }
}
