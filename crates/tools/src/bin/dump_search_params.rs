/// 探索パラメータの表を JSON で出力する
///
/// 深さごとのマージン・reduction をルール別に並べる。チューニング時の確認用。
///
/// 使い方:
///   dump_search_params --max-depth 20 --step 0.5
///   dump_search_params --threads 8 --pretty
use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;

use rgomoku_core::search::params::{self, ReductionTable};
use rgomoku_core::types::{Depth, Rule, Value};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(about = "探索パラメータの表を JSON で出力")]
struct Cli {
    /// 出力する最大の深さ
    #[arg(long, default_value_t = 20.0)]
    max_depth: Depth,

    /// 深さの刻み
    #[arg(long, default_value_t = 0.5)]
    step: Depth,

    /// LMR 表のスレッド数
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// LMR 表に出す最大の手数
    #[arg(long, default_value_t = 32)]
    max_move_count: usize,

    /// 整形して出力
    #[arg(long)]
    pretty: bool,
}

// ---------------------------------------------------------------------------
// 出力形式
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Dump {
    max_depth: i32,
    max_ply: usize,
    aspiration_depth: Depth,
    margin_infinite: i32,
    rules: Vec<RuleConstants>,
    depths: Vec<DepthRow>,
    reductions: Vec<ReductionRow>,
}

#[derive(Serialize)]
struct RuleConstants {
    rule: Rule,
    iid_depth: Depth,
    iir_reduction: Depth,
    iir_reduction_pv: Depth,
    se_depth: Depth,
    se_tte_depth: Depth,
    lmr_depth: Depth,
    razor_prun_depth: Depth,
    trivial_prun_depth: Depth,
    /// [trivial+distract, trivial, normal, important]
    complexity_reduction: [Depth; 4],
    policy_reduction_scale: Depth,
    policy_reduction_bias: Depth,
    policy_reduction_max: Depth,
    qvcf_delta_margin_at_zero: i32,
}

/// [improving = false, improving = true] の組
type Pair<T> = [T; 2];

#[derive(Serialize)]
struct DepthRow {
    depth: Depth,
    razor_margin: i32,
    razor_verify_margin: i32,
    futility_margin: Pair<i32>,
    null_move_margin: i32,
    null_move_reduction: Depth,
    iid_depth_reduction: Depth,
    /// [oppo4 = false, oppo4 = true]
    fail_high_margin: Pair<i32>,
    fail_low_margin: i32,
    /// [former_pv = false, former_pv = true]
    singular_margin: Pair<i32>,
    singular_reduction: Pair<Depth>,
    double_se_margin: i32,
    futility_move_count: Pair<i32>,
    late_move_count: Pair<i32>,
}

#[derive(Serialize)]
struct ReductionRow {
    depth: usize,
    /// 手数 1..=max_move_count、non-PV で improvement > 0 の値
    by_move_count: Vec<Depth>,
}

// ---------------------------------------------------------------------------
// 本体
// ---------------------------------------------------------------------------

fn both<T>(f: impl Fn(bool) -> T) -> Pair<T> {
    [f(false), f(true)]
}

fn rule_constants(rule: Rule) -> RuleConstants {
    let r = rule.index();
    RuleConstants {
        rule,
        iid_depth: params::IID_DEPTH[r],
        iir_reduction: params::IIR_REDUCTION[r],
        iir_reduction_pv: params::IIR_REDUCTION_PV[r],
        se_depth: params::SE_DEPTH[r],
        se_tte_depth: params::SE_TTE_DEPTH[r],
        lmr_depth: params::LMR_DEPTH[r],
        razor_prun_depth: params::RAZOR_PRUN_DEPTH[r],
        trivial_prun_depth: params::TRIVIAL_PRUN_DEPTH[r],
        complexity_reduction: [
            params::complexity_reduction(rule, true, false, true),
            params::complexity_reduction(rule, true, false, false),
            params::complexity_reduction(rule, false, false, false),
            params::complexity_reduction(rule, false, true, false),
        ],
        policy_reduction_scale: params::POLICY_REDUCTION_SCALE[r],
        policy_reduction_bias: params::POLICY_REDUCTION_BIAS[r],
        policy_reduction_max: params::POLICY_REDUCTION_MAX[r],
        qvcf_delta_margin_at_zero: params::qvcf_delta_margin(rule, 0.0).raw(),
    }
}

fn depth_row(d: Depth) -> DepthRow {
    DepthRow {
        depth: d,
        razor_margin: params::razor_margin(d).raw(),
        razor_verify_margin: params::razor_verify_margin(d).raw(),
        futility_margin: both(|i| params::futility_margin(d, i).raw()),
        null_move_margin: params::null_move_margin(d).raw(),
        null_move_reduction: params::null_move_reduction(d),
        iid_depth_reduction: params::iid_depth_reduction(d),
        fail_high_margin: both(|o| params::fail_high_margin(d, o).raw()),
        fail_low_margin: params::fail_low_margin(d).raw(),
        singular_margin: both(|pv| params::singular_margin(d, pv).raw()),
        singular_reduction: both(|pv| params::singular_reduction(d, pv)),
        double_se_margin: params::double_se_margin(d).raw(),
        futility_move_count: both(|i| params::futility_move_count(d, i)),
        late_move_count: both(|i| params::late_move_count(d, i)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !(cli.step > 0.0) {
        bail!("--step must be positive");
    }
    if cli.max_depth < 0.0 || cli.max_depth > params::MAX_DEPTH as Depth {
        bail!("--max-depth must be in [0, {}]", params::MAX_DEPTH);
    }
    if cli.threads == 0 {
        bail!("--threads must be at least 1");
    }

    let steps = (cli.max_depth / cli.step).floor() as usize;
    let depths = (0..=steps).map(|i| depth_row(i as Depth * cli.step)).collect();

    let table = ReductionTable::new(cli.threads);
    let max_move_count = cli.max_move_count.clamp(1, rgomoku_core::types::MAX_MOVES);
    let reductions = (1..=cli.max_depth as usize)
        .map(|depth| ReductionRow {
            depth,
            by_move_count: (1..=max_move_count)
                .map(|mc| table.reduction(false, depth as Depth, mc, 1, Value::ZERO, Value::new(1)))
                .collect(),
        })
        .collect();

    let dump = Dump {
        max_depth: params::MAX_DEPTH,
        max_ply: params::MAX_PLY,
        aspiration_depth: params::ASPIRATION_DEPTH,
        margin_infinite: Value::MARGIN_INFINITE.raw(),
        rules: Rule::ALL.into_iter().map(rule_constants).collect(),
        depths,
        reductions,
    };

    let json = if cli.pretty {
        serde_json::to_string_pretty(&dump)?
    } else {
        serde_json::to_string(&dump)?
    };
    println!("{json}");
    Ok(())
}
