/// What to do with entries of an indices filter that cannot select a target
/// allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum IndexPolicy {
    /// Out of range and repeated indices are inert: they never match, so
    /// they neither pay out nor fail the claim.
    #[default]
    Ignore,
    /// Out of range and repeated indices fail the claim before anything is
    /// resolved.
    Reject,
}

/// Configuration of a [Resolver][super::Resolver].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ClaimConfig {
    pub index_policy: IndexPolicy,
}

impl ClaimConfig {
    /// Reject malformed indices filters instead of ignoring them.
    pub fn strict() -> Self {
        Self {
            index_policy: IndexPolicy::Reject,
        }
    }
}
