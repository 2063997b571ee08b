//! Feature extraction for one token
//!
//! Only a few fields are read from chain: total supply, bytecode flags,
//! contract age and whether the deployer is a contract. Every query failure
//! is logged and replaced with that field's default, so an extraction always
//! yields a complete [`FeatureVector`].

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::format_units;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chain::ChainReader;
use crate::error::{Result, RugDetectorError};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Decimals assumed when `decimals()` cannot be read
pub const DEFAULT_DECIMALS: u8 = 18;

/// Creation block is not looked up; tokens are taken to be this many blocks old
pub const ASSUMED_AGE_BLOCKS: u64 = 1000;

/// Average block time used to turn blocks into days
pub const SECONDS_PER_BLOCK: f64 = 12.0;

/// Bytecode shorter than this (in hex characters) is flagged as a proxy
pub const PROXY_HEX_THRESHOLD: usize = 1000;

/// Stand-in top holder shares, in percent of supply
pub const PLACEHOLDER_HOLDER_SHARES: [f64; 3] = [20.0, 15.0, 10.0];

/// Parse a token address given on the command line
pub fn parse_token_address(token: &str) -> Result<Address> {
    Address::from_str(token.trim())
        .map_err(|e| RugDetectorError::InvalidAddress(format!("{}: {}", token, e)))
}

/// Features plus the names of fields that fell back to their default
#[derive(Debug, Clone)]
pub struct Extraction {
    pub features: FeatureVector,
    pub fallbacks: Vec<&'static str>,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// The `extracted_features.json` artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    pub token_address: String,
    pub features: Vec<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ExtractedFeatures {
    pub fn new(token_address: Address, features: &FeatureVector) -> Self {
        Self {
            token_address: format!("{:?}", token_address),
            features: features.to_vec(),
            timestamp: Utc::now(),
        }
    }

    /// Write as pretty JSON and return the byte count
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64> {
        Ok(zkml_graph::write_json(path, self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let extracted: Self = serde_json::from_str(&content)?;
        if extracted.features.len() != FEATURE_COUNT {
            return Err(RugDetectorError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: extracted.features.len(),
            });
        }
        Ok(extracted)
    }

    pub fn feature_vector(&self) -> Result<FeatureVector> {
        FeatureVector::from_slice(&self.features)
    }
}

/// Builds feature vectors from a [`ChainReader`]
pub struct FeatureExtractor<R: ChainReader> {
    reader: R,
}

impl<R: ChainReader> FeatureExtractor<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Extract all features for `token`; never fails
    pub async fn extract(&self, token: Address) -> Extraction {
        info!(token = %token, "Extracting features");

        let mut features = FeatureVector::placeholder();
        let mut fallbacks = Vec::new();

        // Supply and decimals fall back together
        let supply = self.reader.total_supply(token).await;
        let decimals = self.reader.decimals(token).await;
        let (total_supply, decimals) = match (&supply, decimals) {
            (Ok(supply), Ok(decimals)) => (*supply, decimals),
            (Err(e), _) => {
                fallback(&mut fallbacks, "total_supply_millions", e);
                (U256::zero(), DEFAULT_DECIMALS)
            }
            (Ok(_), Err(e)) => {
                fallback(&mut fallbacks, "total_supply_millions", &e);
                (U256::zero(), DEFAULT_DECIMALS)
            }
        };

        let contract = &mut features.contract;

        match self.reader.block_number().await {
            Ok(current) => {
                let blocks = current.min(ASSUMED_AGE_BLOCKS);
                contract.contract_age_days = blocks as f64 * SECONDS_PER_BLOCK / 86_400.0;
            }
            Err(e) => fallback(&mut fallbacks, "contract_age_days", &e),
        }

        match self.reader.code_at(token).await {
            Ok(code) => {
                let flags = BytecodeFlags::scan(&code);
                contract.has_mint = flag(flags.mint);
                contract.has_pause = flag(flags.pause);
                contract.has_blacklist = flag(flags.blacklist);
                contract.is_proxy = flag(flags.proxy);
            }
            Err(e) => fallback(&mut fallbacks, "bytecode_flags", &e),
        }

        // Deployer lookup is not implemented; the zero address stands in
        match self.reader.code_at(Address::zero()).await {
            Ok(code) => contract.creator_is_contract = flag(code.len() > 2),
            Err(e) => fallback(&mut fallbacks, "creator_is_contract", &e),
        }

        match supply_in_millions(total_supply, decimals) {
            Ok(millions) => contract.total_supply_millions = millions,
            Err(e) => fallback(&mut fallbacks, "total_supply_millions", &e),
        }

        // Holder list is mocked whenever totalSupply answered
        if supply.is_ok() {
            let holder = &mut features.holder;
            holder.holder_count = PLACEHOLDER_HOLDER_SHARES.len() as f64;
            if !total_supply.is_zero() {
                holder.top10_holders_pct = PLACEHOLDER_HOLDER_SHARES.iter().take(10).sum();
                holder.top1_holder_pct = PLACEHOLDER_HOLDER_SHARES[0];
            }
        }

        debug!(token = %token, features = ?features.to_vec(), "Feature vector");
        info!(
            token = %token,
            count = FEATURE_COUNT,
            fallbacks = fallbacks.len(),
            "Extracted features"
        );

        Extraction {
            features,
            fallbacks,
        }
    }
}

fn fallback(fallbacks: &mut Vec<&'static str>, feature: &'static str, error: &RugDetectorError) {
    warn!(feature, error = %error, "Feature query failed, using default");
    if !fallbacks.contains(&feature) {
        fallbacks.push(feature);
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Substring heuristics over the lowercase hex of deployed bytecode
///
/// The hex alphabet never contains "mint", "pause" or "blacklist", so those
/// flags only fire for bytecode rendered some other way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytecodeFlags {
    pub mint: bool,
    pub pause: bool,
    pub blacklist: bool,
    pub proxy: bool,
}

impl BytecodeFlags {
    pub fn scan(code: &Bytes) -> Self {
        let rendered = hex::encode(code);
        Self::scan_hex(&rendered)
    }

    pub fn scan_hex(rendered: &str) -> Self {
        let lower = rendered.to_lowercase();
        Self {
            mint: lower.contains("mint"),
            pause: lower.contains("pause"),
            blacklist: lower.contains("blacklist"),
            proxy: lower.len() < PROXY_HEX_THRESHOLD,
        }
    }
}

/// `supply / 10^decimals / 1e6`
pub fn supply_in_millions(total_supply: U256, decimals: u8) -> Result<f64> {
    let scale_error =
        |message: String| RugDetectorError::contract_call("totalSupply", message.as_str());

    let human = format_units(total_supply, decimals as u32)
        .map_err(|e| scale_error(format!("cannot scale supply: {}", e)))?;
    let human: f64 = human
        .parse()
        .map_err(|e| scale_error(format!("cannot parse {}: {}", human, e)))?;
    Ok(human / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainReader;

    const TOKEN: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";

    fn token() -> Address {
        parse_token_address(TOKEN).unwrap()
    }

    fn unreachable() -> RugDetectorError {
        RugDetectorError::contract_call("eth_call", "request timed out")
    }

    #[tokio::test]
    async fn test_healthy_node() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(19_000_000));
        reader
            .expect_total_supply()
            .returning(|_| Ok(U256::from(5_000_000u64) * U256::exp10(18)));
        reader.expect_decimals().returning(|_| Ok(18));
        reader.expect_code_at().returning(|address| {
            if address.is_zero() {
                Ok(Bytes::new())
            } else {
                Ok(Bytes::from(vec![0x60; 600]))
            }
        });

        let extraction = FeatureExtractor::new(reader).extract(token()).await;
        assert!(extraction.is_complete());

        let features = extraction.features;
        assert!((features.contract.contract_age_days - 1000.0 * 12.0 / 86_400.0).abs() < 1e-12);
        assert_eq!(features.contract.total_supply_millions, 5.0);
        assert_eq!(features.contract.is_verified, 0.0);
        // 600 bytes render to 1200 hex characters
        assert_eq!(features.contract.is_proxy, 0.0);
        assert_eq!(features.contract.has_mint, 0.0);
        assert_eq!(features.contract.creator_is_contract, 0.0);
        assert_eq!(features.holder.holder_count, 3.0);
        assert_eq!(features.holder.top10_holders_pct, 45.0);
        assert_eq!(features.holder.top1_holder_pct, 20.0);
        assert_eq!(features.to_vec().len(), FEATURE_COUNT);
    }

    #[tokio::test]
    async fn test_every_query_failing_still_yields_full_vector() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Err(unreachable()));
        reader.expect_total_supply().returning(|_| Err(unreachable()));
        reader.expect_decimals().returning(|_| Err(unreachable()));
        reader.expect_code_at().returning(|_| Err(unreachable()));

        let extraction = FeatureExtractor::new(reader).extract(token()).await;
        assert_eq!(extraction.features.to_vec().len(), FEATURE_COUNT);
        assert_eq!(
            extraction.fallbacks,
            vec![
                "total_supply_millions",
                "contract_age_days",
                "bytecode_flags",
                "creator_is_contract"
            ]
        );

        // Everything except the placeholders is zero
        assert_eq!(extraction.features, FeatureVector::placeholder());
    }

    #[tokio::test]
    async fn test_decimals_failure_zeroes_supply_but_keeps_holders() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(500));
        reader
            .expect_total_supply()
            .returning(|_| Ok(U256::from(1_000_000u64)));
        reader.expect_decimals().returning(|_| Err(unreachable()));
        reader.expect_code_at().returning(|_| Ok(Bytes::new()));

        let extraction = FeatureExtractor::new(reader).extract(token()).await;
        let features = extraction.features;

        assert_eq!(features.contract.total_supply_millions, 0.0);
        assert_eq!(features.holder.holder_count, 3.0);
        assert_eq!(features.holder.top10_holders_pct, 0.0);
        // Young chain: age limited by the current height
        assert!((features.contract.contract_age_days - 500.0 * 12.0 / 86_400.0).abs() < 1e-12);
        // Empty code renders shorter than the proxy threshold
        assert_eq!(features.contract.is_proxy, 1.0);
    }

    #[test]
    fn test_bytecode_flags_on_rendered_text() {
        let flags = BytecodeFlags::scan_hex("0xMintPause");
        assert!(flags.mint);
        assert!(flags.pause);
        assert!(!flags.blacklist);
        assert!(flags.proxy);

        let flags = BytecodeFlags::scan(&Bytes::from(vec![0xab; 400]));
        assert!(!flags.mint && !flags.pause && !flags.blacklist);
        assert!(!flags.proxy);
    }

    #[test]
    fn test_supply_scaling() {
        let supply = U256::from(123_456_789u64) * U256::exp10(6);
        assert!((supply_in_millions(supply, 6).unwrap() - 123.456789).abs() < 1e-9);
        assert_eq!(supply_in_millions(U256::zero(), 18).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_address() {
        let err = parse_token_address("0x1234").unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[test]
    fn test_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extracted_features.json");

        let features = FeatureVector::placeholder();
        let artifact = ExtractedFeatures::new(token(), &features);
        artifact.save(&path).unwrap();

        let loaded = ExtractedFeatures::load(&path).unwrap();
        assert_eq!(loaded.features.len(), FEATURE_COUNT);
        assert_eq!(loaded.feature_vector().unwrap(), features);
        assert_eq!(loaded.token_address, TOKEN.to_lowercase());
    }
}
