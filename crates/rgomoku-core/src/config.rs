//! 評価器の設定
//!
//! 盤サイズ・ルール・スレッド数と重みファイルの指定をまとめる。
//! 重みは両手番共通（`shared`）か手番ごと（`black` + `white`）のどちらか。
//!
//! ```toml
//! board_size = 15
//! rule = "renju"
//! threads = 4
//!
//! [weights]
//! black = "mix8_black.bin"
//! white = "mix8_white.bin"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::nnue::{Mix8Evaluator, Mix8WeightSet};
use crate::search::ReductionTable;
use crate::types::{Rule, MAX_BOARD_SIZE};

fn default_threads() -> usize {
    1
}

/// 重みファイルの指定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeightsConfig {
    /// 両手番共通
    Shared { shared: PathBuf },
    /// 手番ごと
    Distinct { black: PathBuf, white: PathBuf },
}

/// 評価器の設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorConfig {
    pub board_size: usize,
    pub rule: Rule,
    #[serde(default = "default_threads")]
    pub threads: usize,
    pub weights: WeightsConfig,
}

impl EvaluatorConfig {
    /// 値の範囲を確認
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BOARD_SIZE).contains(&self.board_size) {
            bail!("board_size must be in 1..={MAX_BOARD_SIZE}, got {}", self.board_size);
        }
        if self.threads == 0 {
            bail!("threads must be at least 1");
        }
        Ok(())
    }

    /// スレッド数に応じた LMR 表
    pub fn reduction_table(&self) -> ReductionTable {
        ReductionTable::new(self.threads)
    }
}

/// 設定に従って重みを読み込む
pub fn load_weight_set(config: &EvaluatorConfig) -> Result<Mix8WeightSet> {
    config.validate()?;
    let (rule, size) = (config.rule, config.board_size);
    let set = match &config.weights {
        WeightsConfig::Shared { shared } => Mix8WeightSet::load_shared(shared, rule, size)
            .with_context(|| format!("failed to load weights from {}", shared.display()))?,
        WeightsConfig::Distinct { black, white } => Mix8WeightSet::load_distinct(black, white, rule, size)
            .with_context(|| {
                format!("failed to load weights from {} / {}", black.display(), white.display())
            })?,
    };
    Ok(set)
}

/// 設定に従って重みを読み込み、探索ワーカー数分の評価器を作る
pub fn build_evaluators(config: &EvaluatorConfig) -> Result<Vec<Mix8Evaluator>> {
    let weights = Arc::new(load_weight_set(config)?);
    Ok((0..config.threads)
        .map(|_| Mix8Evaluator::new(config.board_size, config.rule, Arc::clone(&weights)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shared_config() {
        let config: EvaluatorConfig = toml::from_str(
            r#"
            board_size = 15
            rule = "freestyle"

            [weights]
            shared = "mix8.bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.threads, 1);
        assert_eq!(config.rule, Rule::Freestyle);
        assert_eq!(
            config.weights,
            WeightsConfig::Shared {
                shared: PathBuf::from("mix8.bin")
            }
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_distinct_config() {
        let config: EvaluatorConfig = toml::from_str(
            r#"
            board_size = 20
            rule = "renju"
            threads = 4

            [weights]
            black = "b.bin"
            white = "w.bin"
            "#,
        )
        .unwrap();
        assert!(matches!(config.weights, WeightsConfig::Distinct { .. }));
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EvaluatorConfig {
            board_size: 23,
            rule: Rule::Standard,
            threads: 1,
            weights: WeightsConfig::Shared {
                shared: PathBuf::from("mix8.bin"),
            },
        };
        assert!(config.validate().is_err());
        config.board_size = 15;
        config.threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let config = EvaluatorConfig {
            board_size: 15,
            rule: Rule::Standard,
            threads: 1,
            weights: WeightsConfig::Shared {
                shared: PathBuf::from("/nonexistent/mix8.bin"),
            },
        };
        let err = load_weight_set(&config).err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/mix8.bin"));
    }
}
