//! 設定ファイルの読み込みとロガー初期化

use std::path::Path;

use anyhow::{Context, Result};
use rgomoku_core::config::EvaluatorConfig;

/// `RUST_LOG` が未設定なら info で初期化する
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// TOML の評価器設定を読み込む
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EvaluatorConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EvaluatorConfig =
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))?;
    config.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}
