//! Synthetic labelled tokens
//!
//! Each class draws its informative fields from a uniform range; every
//! other field stays at zero. Fields are addressed by name, so a range
//! always lands on the feature it describes.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{Result, RugDetectorError};
use crate::features::FeatureVector;

/// Inclusive-low, exclusive-high uniform range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds::fixed(0.0);

    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub const fn fixed(value: f64) -> Self {
        Self {
            low: value,
            high: value,
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        if self.high > self.low {
            rng.random_range(self.low..self.high)
        } else {
            self.low
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// The end of this range lying farther from `other`
    pub fn far_end(&self, other: &Bounds) -> f64 {
        let centre = other.midpoint();
        if (self.low - centre).abs() > (self.high - centre).abs() {
            self.low
        } else {
            self.high
        }
    }
}

/// Distribution of one class over the informative fields
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProfile {
    pub label: u8,
    pub contract_age_days: Bounds,
    pub is_verified: f64,
    pub mint_probability: f64,
    pub pause_probability: f64,
    pub blacklist_probability: f64,
    pub total_supply_millions: Bounds,
    pub liquidity_usd: Bounds,
    pub liquidity_locked_pct: Bounds,
    pub liquidity_lock_days: Bounds,
    pub lp_token_burned_pct: Bounds,
    pub holder_count: Bounds,
    pub top10_holders_pct: Bounds,
    pub top1_holder_pct: Bounds,
    pub creator_balance_pct: Bounds,
    pub trade_count_24h: Bounds,
    pub volume_usd_24h: Bounds,
    pub sell_pressure_ratio: Bounds,
}

/// Old, verified, deep and locked liquidity, wide holder base
pub const SAFE_PROFILE: ClassProfile = ClassProfile {
    label: 0,
    contract_age_days: Bounds::new(100.0, 500.0),
    is_verified: 1.0,
    mint_probability: 0.0,
    pause_probability: 0.0,
    blacklist_probability: 0.0,
    total_supply_millions: Bounds::new(1.0, 100.0),
    liquidity_usd: Bounds::new(50_000.0, 500_000.0),
    liquidity_locked_pct: Bounds::new(80.0, 100.0),
    liquidity_lock_days: Bounds::new(180.0, 365.0),
    lp_token_burned_pct: Bounds::new(50.0, 100.0),
    holder_count: Bounds::new(1_000.0, 10_000.0),
    top10_holders_pct: Bounds::new(10.0, 40.0),
    top1_holder_pct: Bounds::new(5.0, 15.0),
    creator_balance_pct: Bounds::ZERO,
    trade_count_24h: Bounds::new(100.0, 1_000.0),
    volume_usd_24h: Bounds::new(10_000.0, 100_000.0),
    sell_pressure_ratio: Bounds::ZERO,
};

/// Fresh, unverified, privileged functions, thin unlocked liquidity,
/// concentrated holders and heavy selling
pub const RUG_PROFILE: ClassProfile = ClassProfile {
    label: 1,
    contract_age_days: Bounds::new(0.1, 10.0),
    is_verified: 0.0,
    mint_probability: 0.7,
    pause_probability: 0.5,
    blacklist_probability: 0.4,
    total_supply_millions: Bounds::new(1_000.0, 1_000_000.0),
    liquidity_usd: Bounds::new(1_000.0, 10_000.0),
    liquidity_locked_pct: Bounds::new(0.0, 20.0),
    liquidity_lock_days: Bounds::new(0.0, 30.0),
    lp_token_burned_pct: Bounds::new(0.0, 10.0),
    holder_count: Bounds::new(10.0, 200.0),
    top10_holders_pct: Bounds::new(60.0, 95.0),
    top1_holder_pct: Bounds::new(30.0, 70.0),
    creator_balance_pct: Bounds::new(20.0, 60.0),
    trade_count_24h: Bounds::new(1.0, 50.0),
    volume_usd_24h: Bounds::new(100.0, 5_000.0),
    sell_pressure_ratio: Bounds::new(0.6, 0.9),
};

impl ClassProfile {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> FeatureVector {
        let mut features = FeatureVector::default();

        let contract = &mut features.contract;
        contract.contract_age_days = self.contract_age_days.sample(rng);
        contract.is_verified = self.is_verified;
        contract.has_mint = bernoulli(rng, self.mint_probability);
        contract.has_pause = bernoulli(rng, self.pause_probability);
        contract.has_blacklist = bernoulli(rng, self.blacklist_probability);
        contract.total_supply_millions = self.total_supply_millions.sample(rng);

        let liquidity = &mut features.liquidity;
        liquidity.liquidity_usd = self.liquidity_usd.sample(rng);
        liquidity.liquidity_locked_pct = self.liquidity_locked_pct.sample(rng);
        liquidity.liquidity_lock_days = self.liquidity_lock_days.sample(rng);
        liquidity.lp_token_burned_pct = self.lp_token_burned_pct.sample(rng);

        let holder = &mut features.holder;
        holder.holder_count = self.holder_count.sample(rng);
        holder.top10_holders_pct = self.top10_holders_pct.sample(rng);
        holder.top1_holder_pct = self.top1_holder_pct.sample(rng);
        holder.creator_balance_pct = self.creator_balance_pct.sample(rng);

        let trading = &mut features.trading;
        trading.trade_count_24h = self.trade_count_24h.sample(rng);
        trading.volume_usd_24h = self.volume_usd_24h.sample(rng);
        trading.sell_pressure_ratio = self.sell_pressure_ratio.sample(rng);

        features
    }

    /// The most typical member of this class relative to `other`: every
    /// range at its far end, every flag set if it can occur at all
    pub fn extreme(&self, other: &ClassProfile) -> FeatureVector {
        let mut features = FeatureVector::default();
        let flag = |p: f64| if p > 0.0 { 1.0 } else { 0.0 };

        let contract = &mut features.contract;
        contract.contract_age_days = self.contract_age_days.far_end(&other.contract_age_days);
        contract.is_verified = self.is_verified;
        contract.has_mint = flag(self.mint_probability);
        contract.has_pause = flag(self.pause_probability);
        contract.has_blacklist = flag(self.blacklist_probability);
        contract.total_supply_millions = self
            .total_supply_millions
            .far_end(&other.total_supply_millions);

        let liquidity = &mut features.liquidity;
        liquidity.liquidity_usd = self.liquidity_usd.far_end(&other.liquidity_usd);
        liquidity.liquidity_locked_pct = self
            .liquidity_locked_pct
            .far_end(&other.liquidity_locked_pct);
        liquidity.liquidity_lock_days = self.liquidity_lock_days.far_end(&other.liquidity_lock_days);
        liquidity.lp_token_burned_pct = self.lp_token_burned_pct.far_end(&other.lp_token_burned_pct);

        let holder = &mut features.holder;
        holder.holder_count = self.holder_count.far_end(&other.holder_count);
        holder.top10_holders_pct = self.top10_holders_pct.far_end(&other.top10_holders_pct);
        holder.top1_holder_pct = self.top1_holder_pct.far_end(&other.top1_holder_pct);
        holder.creator_balance_pct = self.creator_balance_pct.far_end(&other.creator_balance_pct);

        let trading = &mut features.trading;
        trading.trade_count_24h = self.trade_count_24h.far_end(&other.trade_count_24h);
        trading.volume_usd_24h = self.volume_usd_24h.far_end(&other.volume_usd_24h);
        trading.sell_pressure_ratio = self.sell_pressure_ratio.far_end(&other.sell_pressure_ratio);

        features
    }
}

fn bernoulli<R: Rng>(rng: &mut R, probability: f64) -> f64 {
    if probability > 0.0 && rng.random_bool(probability) {
        1.0
    } else {
        0.0
    }
}

/// Safe-end token used as a sanity input for trained models
pub fn safe_extreme() -> FeatureVector {
    SAFE_PROFILE.extreme(&RUG_PROFILE)
}

/// Rug-end token used as a sanity input for trained models
pub fn rug_extreme() -> FeatureVector {
    RUG_PROFILE.extreme(&SAFE_PROFILE)
}

/// `samples / 2` safe rows and the rest rug pulls, shuffled
pub fn generate(samples: usize, seed: u64) -> Result<Dataset> {
    if samples < 2 {
        return Err(RugDetectorError::dataset(format!(
            "need at least 2 samples to cover both classes, got {}",
            samples
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let safe = samples / 2;
    let rug = samples - safe;

    let mut records = Vec::with_capacity(samples);
    for _ in 0..safe {
        records.push((SAFE_PROFILE.sample(&mut rng), SAFE_PROFILE.label));
    }
    for _ in 0..rug {
        records.push((RUG_PROFILE.sample(&mut rng), RUG_PROFILE.label));
    }
    records.shuffle(&mut rng);

    info!(samples, safe, rug, seed, "Generated synthetic training data");
    Dataset::from_records(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    #[test]
    fn test_class_balance_and_shape() {
        let data = generate(1001, 42).unwrap();
        assert_eq!(data.len(), 1001);
        assert_eq!(data.features().ncols(), FEATURE_COUNT);
        assert_eq!(data.class_counts(), (500, 501));
    }

    #[test]
    fn test_reproducible() {
        assert_eq!(generate(100, 42).unwrap(), generate(100, 42).unwrap());
        assert_ne!(generate(100, 42).unwrap(), generate(100, 43).unwrap());
    }

    #[test]
    fn test_values_stay_in_class_ranges() {
        let data = generate(400, 42).unwrap();
        for i in 0..data.len() {
            let row = data.row(i).unwrap();
            let label = data.labels()[i];
            let profile = if label == 1 { &RUG_PROFILE } else { &SAFE_PROFILE };

            let age = row.contract.contract_age_days;
            assert!(age >= profile.contract_age_days.low && age < profile.contract_age_days.high);
            let usd = row.liquidity.liquidity_usd;
            assert!(usd >= profile.liquidity_usd.low && usd < profile.liquidity_usd.high);
            assert_eq!(row.contract.is_verified, profile.is_verified);

            // Fields outside the informative set stay at zero
            assert_eq!(row.liquidity.pool_age_days, 0.0);
            assert_eq!(row.trading.panic_sell_events, 0.0);
            if label == 0 {
                assert_eq!(row.contract.has_mint, 0.0);
                assert_eq!(row.holder.creator_balance_pct, 0.0);
            }
        }
    }

    #[test]
    fn test_labels_are_shuffled() {
        let data = generate(200, 42).unwrap();
        let first_half_rugs = data.labels().iter().take(100).filter(|&&l| l == 1).count();
        assert!(first_half_rugs > 20 && first_half_rugs < 80);
    }

    #[test]
    fn test_extremes() {
        let safe = safe_extreme();
        assert_eq!(safe.contract.contract_age_days, 500.0);
        assert_eq!(safe.liquidity.liquidity_usd, 500_000.0);
        assert_eq!(safe.holder.top10_holders_pct, 10.0);
        assert_eq!(safe.contract.has_mint, 0.0);

        let rug = rug_extreme();
        assert_eq!(rug.contract.contract_age_days, 0.1);
        assert_eq!(rug.liquidity.liquidity_locked_pct, 0.0);
        assert_eq!(rug.holder.top1_holder_pct, 70.0);
        assert_eq!(rug.trading.sell_pressure_ratio, 0.9);
        assert_eq!(rug.contract.has_blacklist, 1.0);
    }
}
