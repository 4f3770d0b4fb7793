/// 乱数の mix8 重みファイルを書き出す
///
/// 学習済み重みがない環境でのベンチマーク・動作確認用。
///
/// 使い方:
///   gen_mix8_weights -o mix8_random.bin
///
///   # 連珠の 15x15 だけに対応するファイル
///   gen_mix8_weights -o renju15.bin --rules renju --sizes 15
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rgomoku_core::nnue::{save_mix8, Mix8Header, Mix8Weights};
use rgomoku_core::types::{Rule, MAX_BOARD_SIZE};
use tools::common::init_logger;

#[derive(Parser)]
#[command(about = "乱数の mix8 重みファイルを生成")]
struct Cli {
    /// 出力ファイル
    #[arg(short, long)]
    output: PathBuf,

    /// 乱数シード
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// 対応ルール（カンマ区切り、省略時は全ルール）
    #[arg(long, value_delimiter = ',')]
    rules: Vec<Rule>,

    /// 対応盤サイズ（カンマ区切り、省略時は全サイズ）
    #[arg(long, value_delimiter = ',')]
    sizes: Vec<usize>,

    /// ヘッダの説明文
    #[arg(long, default_value = "random mix8 weights")]
    description: String,
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let mut header = Mix8Header::universal(cli.description.clone());
    if !cli.rules.is_empty() {
        header.rule_mask = cli.rules.iter().fold(0, |m, r| m | r.mask_bit());
    }
    if !cli.sizes.is_empty() {
        let mut mask = 0u32;
        for &size in &cli.sizes {
            anyhow::ensure!(
                (1..=MAX_BOARD_SIZE).contains(&size),
                "board size {size} is out of range (1..={MAX_BOARD_SIZE})"
            );
            mask |= 1 << (size - 1);
        }
        header.board_size_mask = mask;
    }

    log::info!("generating random weights (seed {})", cli.seed);
    let weights = Mix8Weights::random(cli.seed);
    save_mix8(&cli.output, &header, &weights)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    log::info!(
        "wrote {} (rule mask {:#05b}, board size mask {:#x})",
        cli.output.display(),
        header.rule_mask,
        header.board_size_mask
    );
    Ok(())
}
