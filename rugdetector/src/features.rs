//! The 60-feature token description
//!
//! Four contiguous bands of [`BAND_SIZE`] named fields. The flat index of a
//! field is its band offset (0, 15, 30, 45) plus its position in the band,
//! so the struct declaration order below is the wire layout.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RugDetectorError};

/// Number of features per band
pub const BAND_SIZE: usize = 15;

/// Total number of features
pub const FEATURE_COUNT: usize = 4 * BAND_SIZE;

macro_rules! feature_band {
    ($(#[$meta:meta])* $name:ident { $($field:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        pub struct $name {
            $(pub $field: f64,)+
        }

        impl $name {
            /// Field names in layout order
            pub const FIELDS: [&'static str; BAND_SIZE] = [$(stringify!($field)),+];

            pub fn to_array(&self) -> [f64; BAND_SIZE] {
                [$(self.$field),+]
            }

            fn from_band(values: &[f64]) -> Self {
                let mut values = values.iter().copied();
                Self {
                    $($field: values.next().unwrap_or_default(),)+
                }
            }
        }
    };
}

feature_band! {
    /// Features 0-14: the token contract itself
    ContractFeatures {
        contract_age_days,
        is_verified,
        has_mint,
        has_pause,
        has_blacklist,
        ownership_renounced,
        is_proxy,
        is_honeypot,
        max_tx_limit_pct,
        max_wallet_limit_pct,
        buy_tax_pct,
        sell_tax_pct,
        has_anti_whale,
        creator_is_contract,
        total_supply_millions,
    }
}

feature_band! {
    /// Features 15-29: DEX liquidity
    LiquidityFeatures {
        liquidity_usd,
        liquidity_locked_pct,
        liquidity_lock_days,
        lp_token_burned_pct,
        pool_age_days,
        pool_creator_same,
        liquidity_concentrated_top1,
        price_impact_1eth,
        price_impact_10eth,
        slippage_tolerance,
        liquidity_change_24h,
        volume_to_liquidity_ratio,
        pool_token0_is_weth,
        multiple_pools_count,
        rugpull_threshold,
    }
}

feature_band! {
    /// Features 30-44: holder distribution
    HolderFeatures {
        holder_count,
        top10_holders_pct,
        top1_holder_pct,
        creator_balance_pct,
        dead_wallet_pct,
        contract_balance_pct,
        holders_growth_24h,
        whale_count,
        sniper_count,
        bot_holder_pct,
        team_wallet_count,
        team_balance_pct,
        airdrop_wallets_pct,
        holder_concentration_gini,
        new_holders_24h,
    }
}

feature_band! {
    /// Features 45-59: trading activity
    TradingFeatures {
        trade_count_24h,
        buy_count_24h,
        sell_count_24h,
        volume_usd_24h,
        price_change_1h_pct,
        price_change_24h_pct,
        price_volatility_24h,
        sell_pressure_ratio,
        large_sells_24h,
        suspicious_sells,
        flash_loan_attacks,
        sandwich_attacks,
        first_block_snipers,
        avg_hold_time_hours,
        panic_sell_events,
    }
}

impl ContractFeatures {
    /// Values used when nothing is known about the contract
    pub fn placeholder() -> Self {
        Self {
            max_tx_limit_pct: 100.0,
            max_wallet_limit_pct: 100.0,
            ..Self::default()
        }
    }
}

impl LiquidityFeatures {
    /// Pool data is not collected; these constants describe a single thin,
    /// unlocked pool below the safe threshold
    pub fn placeholder() -> Self {
        Self {
            liquidity_concentrated_top1: 100.0,
            price_impact_1eth: 5.0,
            price_impact_10eth: 15.0,
            slippage_tolerance: 1.0,
            multiple_pools_count: 1.0,
            rugpull_threshold: 1.0,
            ..Self::default()
        }
    }
}

impl HolderFeatures {
    pub fn placeholder() -> Self {
        Self {
            holder_concentration_gini: 0.5,
            ..Self::default()
        }
    }
}

impl TradingFeatures {
    pub fn placeholder() -> Self {
        Self {
            sell_pressure_ratio: 0.5,
            avg_hold_time_hours: 24.0,
            ..Self::default()
        }
    }
}

/// A complete feature record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub contract: ContractFeatures,
    pub liquidity: LiquidityFeatures,
    pub holder: HolderFeatures,
    pub trading: TradingFeatures,
}

impl FeatureVector {
    /// Every band at its placeholder values
    pub fn placeholder() -> Self {
        Self {
            contract: ContractFeatures::placeholder(),
            liquidity: LiquidityFeatures::placeholder(),
            holder: HolderFeatures::placeholder(),
            trading: TradingFeatures::placeholder(),
        }
    }

    /// Flat layout, exactly [`FEATURE_COUNT`] values
    pub fn to_vec(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(FEATURE_COUNT);
        values.extend_from_slice(&self.contract.to_array());
        values.extend_from_slice(&self.liquidity.to_array());
        values.extend_from_slice(&self.holder.to_array());
        values.extend_from_slice(&self.trading.to_array());
        values
    }

    /// Rebuild a record from the flat layout
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(RugDetectorError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        let band = |i: usize| &values[i * BAND_SIZE..(i + 1) * BAND_SIZE];
        Ok(Self {
            contract: ContractFeatures::from_band(band(0)),
            liquidity: LiquidityFeatures::from_band(band(1)),
            holder: HolderFeatures::from_band(band(2)),
            trading: TradingFeatures::from_band(band(3)),
        })
    }
}

/// Name of every feature in layout order
pub fn feature_names() -> Vec<&'static str> {
    ContractFeatures::FIELDS
        .iter()
        .chain(LiquidityFeatures::FIELDS.iter())
        .chain(HolderFeatures::FIELDS.iter())
        .chain(TradingFeatures::FIELDS.iter())
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_indices() {
        let names = feature_names();
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "contract_age_days");
        assert_eq!(names[14], "total_supply_millions");
        assert_eq!(names[15], "liquidity_usd");
        assert_eq!(names[30], "holder_count");
        assert_eq!(names[45], "trade_count_24h");
        assert_eq!(names[52], "sell_pressure_ratio");
        assert_eq!(names[59], "panic_sell_events");
    }

    #[test]
    fn test_flat_layout_positions() {
        let mut features = FeatureVector::default();
        features.liquidity.liquidity_usd = 1.0;
        features.holder.top1_holder_pct = 2.0;
        features.trading.volume_usd_24h = 3.0;

        let flat = features.to_vec();
        assert_eq!(flat[15], 1.0);
        assert_eq!(flat[32], 2.0);
        assert_eq!(flat[48], 3.0);
        assert_eq!(FeatureVector::from_slice(&flat).unwrap(), features);
    }

    #[test]
    fn test_placeholder_constants() {
        let flat = FeatureVector::placeholder().to_vec();
        assert_eq!(flat[8], 100.0); // max_tx_limit_pct
        assert_eq!(flat[9], 100.0); // max_wallet_limit_pct
        assert_eq!(flat[21], 100.0); // liquidity_concentrated_top1
        assert_eq!(flat[22], 5.0);
        assert_eq!(flat[23], 15.0);
        assert_eq!(flat[24], 1.0);
        assert_eq!(flat[28], 1.0);
        assert_eq!(flat[29], 1.0);
        assert_eq!(flat[43], 0.5); // gini
        assert_eq!(flat[52], 0.5); // sell pressure
        assert_eq!(flat[58], 24.0); // hold time
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = FeatureVector::from_slice(&[0.0; 59]).unwrap_err();
        assert!(matches!(
            err,
            RugDetectorError::FeatureCount {
                expected: 60,
                actual: 59
            }
        ));
    }
}
