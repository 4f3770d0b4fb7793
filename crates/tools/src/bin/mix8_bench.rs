/// mix8 評価器のベンチマーク / 差分更新の検証
///
/// 使い方:
///   # 乱数重みで 15x15 の自己対局を回す
///   mix8_bench --games 20
///
///   # 設定ファイルの重みを使い、毎手作り直した評価器と突き合わせる
///   mix8_bench --config engine.toml --verify
///
///   # JSON出力モード
///   mix8_bench --json
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;

use rgomoku_core::board::Board;
use rgomoku_core::config::load_weight_set;
use rgomoku_core::nnue::{Mix8Evaluator, Mix8WeightSet, Mix8Weights, PolicyBuffer};
use rgomoku_core::types::{Pos, Rule};
use tools::common::{init_logger, load_config};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(about = "mix8 評価器のベンチマーク")]
struct Cli {
    /// 評価器設定（TOML）。省略時は乱数重みを使う
    #[arg(long)]
    config: Option<PathBuf>,

    /// 盤サイズ（--config 指定時は設定側を使う）
    #[arg(long, default_value_t = 15)]
    board_size: usize,

    /// ルール（--config 指定時は設定側を使う）
    #[arg(long, default_value = "freestyle")]
    rule: Rule,

    /// 乱数シード（重みと着手選択）
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// 対局数
    #[arg(long, default_value_t = 20)]
    games: usize,

    /// 1局の最大手数
    #[arg(long, default_value_t = 80)]
    max_moves: usize,

    /// 評価後に1手戻す確率
    #[arg(long, default_value_t = 0.2)]
    undo_rate: f64,

    /// 評価を挟まずに着手して戻す手（キャッシュ上で打ち消される）を試す確率
    #[arg(long, default_value_t = 0.3)]
    probe_rate: f64,

    /// policy 最善手ではなくランダムに着手する確率
    #[arg(long, default_value_t = 0.3)]
    random_move_rate: f64,

    /// 毎手、盤面から作り直した評価器と結果を突き合わせる
    #[arg(long)]
    verify: bool,

    /// JSON出力モード
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// 集計
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct BenchReport {
    board_size: usize,
    rule: Rule,
    games: usize,
    moves: u64,
    undos: u64,
    probes: u64,
    value_evals: u64,
    policy_evals: u64,
    elapsed_sec: f64,
    evals_per_sec: f64,
    /// 黒番視点の win - loss 平均（初手直前）
    mean_first_move_rate: f64,
    verified: bool,
    mismatches: u64,
}

// ---------------------------------------------------------------------------
// 本体
// ---------------------------------------------------------------------------

fn random_empty_cell(board: &Board, rng: &mut Xoshiro256PlusPlus) -> Option<Pos> {
    let empty: Vec<Pos> = board.empty_cells().collect();
    if empty.is_empty() {
        None
    } else {
        Some(empty[rng.random_range(0..empty.len())])
    }
}

fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();
    for (name, rate) in [
        ("undo-rate", cli.undo_rate),
        ("probe-rate", cli.probe_rate),
        ("random-move-rate", cli.random_move_rate),
    ] {
        if !(0.0..=1.0).contains(&rate) {
            bail!("--{name} must be in [0, 1], got {rate}");
        }
    }

    let (board_size, rule, weights) = match &cli.config {
        Some(path) => {
            let config = load_config(path)?;
            let weights = load_weight_set(&config)?;
            (config.board_size, config.rule, weights)
        }
        None => {
            log::info!("using random weights (seed {})", cli.seed);
            let weights = Mix8WeightSet::Shared(Arc::new(Mix8Weights::random(cli.seed)));
            (cli.board_size, cli.rule, weights)
        }
    };
    let weights = Arc::new(weights);

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(cli.seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut evaluator = Mix8Evaluator::new(board_size, rule, Arc::clone(&weights));
    let mut reference = Mix8Evaluator::new(board_size, rule, Arc::clone(&weights));
    let mut policy = PolicyBuffer::new(board_size);
    let mut reference_policy = PolicyBuffer::new(board_size);

    let mut report = BenchReport {
        board_size,
        rule,
        games: cli.games,
        moves: 0,
        undos: 0,
        probes: 0,
        value_evals: 0,
        policy_evals: 0,
        elapsed_sec: 0.0,
        evals_per_sec: 0.0,
        mean_first_move_rate: 0.0,
        verified: cli.verify,
        mismatches: 0,
    };
    let mut first_move_rate_sum = 0.0f64;

    let start = Instant::now();
    for game in 0..cli.games {
        let mut board = Board::new(board_size, rule);
        evaluator.init_empty_board();
        first_move_rate_sum += evaluator.evaluate_value(&board).win_loss_rate() as f64;
        report.value_evals += 1;

        while board.ply() < cli.max_moves {
            // 評価を挟まない着手と取り消し
            if rng.random_bool(cli.probe_rate) {
                if let Some(pos) = random_empty_cell(&board, &mut rng) {
                    evaluator.before_move(&board, pos);
                    board.make_move(pos);
                    board.undo();
                    evaluator.after_undo(&board, pos);
                    report.probes += 1;
                }
            }

            evaluator.evaluate_policy(&board, &mut policy);
            report.policy_evals += 1;
            let pos = if rng.random_bool(cli.random_move_rate) {
                random_empty_cell(&board, &mut rng)
            } else {
                policy.best().map(|(pos, _)| pos)
            };
            let Some(pos) = pos else {
                break;
            };

            evaluator.before_move(&board, pos);
            board.make_move(pos);
            report.moves += 1;
            let value = evaluator.evaluate_value(&board);
            report.value_evals += 1;

            if cli.verify {
                reference.sync_with_board(&board);
                if reference.evaluate_value(&board) != value {
                    log::warn!("game {game} ply {}: value mismatch after {pos}", board.ply());
                    report.mismatches += 1;
                }
                evaluator.evaluate_policy(&board, &mut policy);
                reference.evaluate_policy(&board, &mut reference_policy);
                if !policy.iter().eq(reference_policy.iter()) {
                    log::warn!("game {game} ply {}: policy mismatch after {pos}", board.ply());
                    report.mismatches += 1;
                }
            }

            if board.ply() > 1 && rng.random_bool(cli.undo_rate) {
                if let Some(pos) = board.undo() {
                    evaluator.after_undo(&board, pos);
                    report.undos += 1;
                }
            }
        }
        log::debug!("game {game}: {} stones", board.ply());
    }

    report.elapsed_sec = start.elapsed().as_secs_f64();
    let evals = (report.value_evals + report.policy_evals) as f64;
    report.evals_per_sec = if report.elapsed_sec > 0.0 { evals / report.elapsed_sec } else { 0.0 };
    report.mean_first_move_rate = first_move_rate_sum / cli.games.max(1) as f64;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("board        : {}x{} {}", report.board_size, report.board_size, report.rule);
        println!("games        : {}", report.games);
        println!("moves        : {} (undo {}, probe {})", report.moves, report.undos, report.probes);
        println!("value evals  : {}", report.value_evals);
        println!("policy evals : {}", report.policy_evals);
        println!("elapsed      : {:.3} s", report.elapsed_sec);
        println!("evals/sec    : {:.0}", report.evals_per_sec);
        if report.verified {
            println!("mismatches   : {}", report.mismatches);
        }
    }

    if report.mismatches > 0 {
        bail!("{} mismatches between incremental and refreshed evaluation", report.mismatches);
    }
    Ok(())
}
