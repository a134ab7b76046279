//! Currency rules consumed by the pool: emission, fee floor, lifetimes.
//!
//! All monetary values are in atomic units (1 UMB = 10^12 atomic units).
//! The emission curve is tail-less: each block's base reward is the
//! unmined remainder shifted right by [`EMISSION_SPEED_FACTOR`], with a
//! quadratic penalty once the block grows past the median size.

pub const COIN: u64 = 1_000_000_000_000;

/// Total emission in atomic units.
pub const MONEY_SUPPLY: u64 = u64::MAX;

/// Right-shift applied to the unmined remainder per block.
pub const EMISSION_SPEED_FACTOR: u32 = 18;

/// Blocks up to this size receive the full base reward even when the
/// median is smaller.
pub const FULL_REWARD_ZONE: usize = 100_000;

/// Minimum relay fee in atomic units.
pub const MINIMUM_FEE: u64 = 1_000_000;

/// How long a relayed transaction may sit in the pool (seconds).
pub const MEMPOOL_TX_LIVE_SECS: u64 = 60 * 60 * 24;

/// How long a kept-by-block transaction may sit in the pool (seconds).
pub const MEMPOOL_TX_FROM_ALT_BLOCK_LIVE_SECS: u64 = 60 * 60 * 24 * 7;

/// Retention window for recently deleted transaction ids (seconds).
///
/// Peers that have been silent longer than this window will re-gossip
/// already-confirmed transactions.
pub const DELETED_TX_RETENTION_SECS: u64 = 60 * 60 * 24 * 7;

/// Minimum interval between expiration sweeps (seconds).
pub const POOL_SWEEP_INTERVAL_SECS: u64 = 60;

/// Consensus and pool configuration.
///
/// Plain public fields with [`Default`] mainnet values; tests override
/// with struct-update syntax.
#[derive(Clone, Debug)]
pub struct Currency {
    /// Minimum relay fee in atomic units.
    pub minimum_fee: u64,
    /// Pool lifetime for relayed transactions (seconds).
    pub mempool_tx_live_time: u64,
    /// Pool lifetime for kept-by-block transactions (seconds).
    pub mempool_tx_from_alt_block_live_time: u64,
    /// Retention window for recently deleted ids (seconds).
    pub deleted_tx_retention: u64,
    /// Minimum interval between expiration sweeps (seconds).
    pub sweep_interval: u64,
    /// Whether the payment-id and timestamp pool indices are maintained.
    pub blockchain_indices_enabled: bool,
    /// Block size granted the full base reward regardless of median.
    pub full_reward_zone: usize,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            minimum_fee: MINIMUM_FEE,
            mempool_tx_live_time: MEMPOOL_TX_LIVE_SECS,
            mempool_tx_from_alt_block_live_time: MEMPOOL_TX_FROM_ALT_BLOCK_LIVE_SECS,
            deleted_tx_retention: DELETED_TX_RETENTION_SECS,
            sweep_interval: POOL_SWEEP_INTERVAL_SECS,
            blockchain_indices_enabled: true,
            full_reward_zone: FULL_REWARD_ZONE,
        }
    }
}

impl Currency {
    /// Block reward for a candidate block, or `None` when the block is
    /// too large to be valid.
    ///
    /// The base reward is `(MONEY_SUPPLY − already_generated) >>
    /// EMISSION_SPEED_FACTOR`. Blocks up to the effective median (the
    /// larger of `median_size` and the full reward zone) earn it in full;
    /// beyond that the base is reduced by `base × ((size − median) /
    /// median)²`, and a block above twice the median earns nothing and is
    /// invalid. Fees ride on top of the penalized base.
    pub fn block_reward(
        &self,
        median_size: usize,
        current_size: usize,
        already_generated_coins: u64,
        fee: u64,
    ) -> Option<u64> {
        let base = (MONEY_SUPPLY - already_generated_coins) >> EMISSION_SPEED_FACTOR;
        let median = median_size.max(self.full_reward_zone);

        if current_size > 2 * median {
            return None;
        }

        let reward = if current_size <= median {
            base
        } else {
            let excess = (current_size - median) as u128;
            let median = median as u128;
            // excess <= median here, so penalty <= base and the cast is lossless.
            let penalty = (u128::from(base) * excess * excess) / (median * median);
            base - penalty as u64
        };

        Some(reward.saturating_add(fee))
    }
}
