//! 探索パラメータ（枝刈りマージン・reduction）
//!
//! 深さは連続値（`Depth = f32`）。関数はすべて純粋で、ルールごとの定数表を引くだけ。
//! 状態を持つのは起動時に一度だけ作る表（`FUTILITY_MC`、`ReductionTable`）のみ。
//!
//! 枝刈り対象外の深さでは `Value::MARGIN_INFINITE` を返す。

use std::sync::LazyLock;

use crate::types::{Depth, Rule, Value, MAX_MOVES};

// =============================================================================
// 探索の上限
// =============================================================================

/// 反復深化の最大深さ
pub const MAX_DEPTH: i32 = 200;

/// 探索木の最大手数
pub const MAX_PLY: usize = 256;

// =============================================================================
// 深さの定数（ルール別: Freestyle, Standard, Renju）
// =============================================================================

/// aspiration window を使い始める深さ
pub const ASPIRATION_DEPTH: Depth = 5.0;
/// Internal iterative deepening を行う深さ
pub const IID_DEPTH: [Depth; Rule::NUM] = [12.86, 12.12, 12.68];
/// Internal iterative reduction
pub const IIR_REDUCTION: [Depth; Rule::NUM] = [0.93, 0.69, 0.51];
pub const IIR_REDUCTION_PV: [Depth; Rule::NUM] = [2.15, 2.09, 1.61];
/// Singular extension を試す深さ
pub const SE_DEPTH: [Depth; Rule::NUM] = [6.68, 6.14, 8.75];
/// Singular extension で要求する置換表エントリの深さの差
pub const SE_TTE_DEPTH: [Depth; Rule::NUM] = [2.33, 2.62, 2.77];
/// LMR を行う深さ
pub const LMR_DEPTH: [Depth; Rule::NUM] = [2.78, 2.51, 2.54];
pub const RAZOR_PRUN_DEPTH: [Depth; Rule::NUM] = [2.89, 2.16, 2.74];
pub const TRIVIAL_PRUN_DEPTH: [Depth; Rule::NUM] = [5.88, 4.45, 4.95];

/// ルール別の定数を引く
#[inline]
pub fn by_rule(table: &[Depth; Rule::NUM], rule: Rule) -> Depth {
    table[rule.index()]
}

// =============================================================================
// マージン
// =============================================================================

/// aspiration window の幅
///
/// `prev_delta` が 0 なら初期幅、それ以外は失敗後に広げた幅。
#[inline]
pub fn next_aspiration_window_delta(prev_delta: Value) -> Value {
    if prev_delta == Value::ZERO {
        Value::new(17)
    } else {
        prev_delta * 3 / 2 + Value::new(5)
    }
}

/// Razoring マージン
#[inline]
pub fn razor_margin(d: Depth) -> Value {
    if d < 3.36 {
        Value::new(((0.125 * d * d + 46.0 * d) as i32 + 49).max(0))
    } else {
        Value::MARGIN_INFINITE
    }
}

/// Razoring の検証マージン
#[inline]
pub fn razor_verify_margin(d: Depth) -> Value {
    razor_margin(d - 2.9)
}

/// Static futility pruning のマージン
#[inline]
pub fn futility_margin(d: Depth, improving: bool) -> Value {
    Value::new(((54.0 * (d - improving as i32 as Depth)) as i32).max(0))
}

/// Null move pruning のマージン（深さ 8 未満では行わない）
#[inline]
pub fn null_move_margin(d: Depth) -> Value {
    if d >= 8.0 {
        Value::new(680 - 27 * (d as i32).min(20))
    } else {
        Value::MARGIN_INFINITE
    }
}

/// Null move の結果を検証する探索の depth reduction
#[inline]
pub fn null_move_reduction(d: Depth) -> Depth {
    3.21 + 0.27 * d
}

/// Internal iterative deepening の depth reduction
#[inline]
pub fn iid_depth_reduction(_d: Depth) -> Depth {
    7.0
}

/// Fail high reduction のマージン
#[inline]
pub fn fail_high_margin(d: Depth, oppo4: bool) -> Value {
    Value::new(40 * (d as i32 + oppo4 as i32 * 2))
}

/// Fail low reduction のマージン
#[inline]
pub fn fail_low_margin(d: Depth) -> Value {
    Value::new(100 + (50.0 * d) as i32)
}

/// Singular extension のマージン
#[inline]
pub fn singular_margin(d: Depth, former_pv: bool) -> Value {
    Value::new(((2 + former_pv as i32) as Depth * d) as i32)
}

/// Singular extension の検証探索の depth reduction
#[inline]
pub fn singular_reduction(d: Depth, former_pv: bool) -> Depth {
    d * 0.5 - former_pv as i32 as Depth
}

/// Double singular extension のマージン
#[inline]
pub fn double_se_margin(d: Depth) -> Value {
    Value::new(70 - (d as i32 / 2).min(20))
}

/// QVCF 探索の delta pruning マージン（`d <= 0`）
#[inline]
pub fn qvcf_delta_margin(rule: Rule, d: Depth) -> Value {
    let base = if rule == Rule::Renju { 4000 } else { 2500 };
    Value::new((base + 64 * d as i32).max(600))
}

// =============================================================================
// 手数ベースの枝刈り
// =============================================================================

/// Move count pruning の表 [depth]（起動後の初回アクセスで作成）
pub static FUTILITY_MC: LazyLock<[i32; MAX_MOVES + 1]> = LazyLock::new(|| {
    let mut table = [0i32; MAX_MOVES + 1];
    for (i, value) in table.iter_mut().enumerate().skip(1) {
        *value = 3 + (i as f64).powf(1.4) as i32;
    }
    table
});

/// Move count pruning の手数
///
/// 負けない手が既にあり、直前に相手が四を作っていなければ、これを超える手は枝刈りする。
#[inline]
pub fn futility_move_count(d: Depth, improving: bool) -> i32 {
    let index = (d as i32).max(0) as usize;
    debug_assert!(index <= MAX_MOVES);
    FUTILITY_MC[index] / (2 - improving as i32)
}

/// これを超える手は他の条件なしで LMR の対象にする（non-PV の All node）
#[inline]
pub fn late_move_count(d: Depth, improving: bool) -> i32 {
    let slope = if improving { 1.35 } else { 1.2 };
    1 + 2 * improving as i32 + (slope * d) as i32
}

// =============================================================================
// Late move reduction
// =============================================================================

/// LMR の対数表
///
/// スレッド数に依存するため、探索設定の確定時に一度だけ作る。
#[derive(Clone)]
pub struct ReductionTable {
    lut: Box<[Depth; MAX_MOVES + 1]>,
}

impl ReductionTable {
    pub fn new(num_threads: usize) -> Self {
        debug_assert!(num_threads >= 1);
        let factor = 1.0 / 1.95f64.sqrt();
        let thread_bias = 0.1 * (num_threads.max(1) as f64).ln();

        let mut lut = Box::new([0.0; MAX_MOVES + 1]);
        for (i, value) in lut.iter_mut().enumerate().skip(1) {
            *value = (factor * ((i as f64).ln() + thread_bias)) as Depth;
        }
        Self { lut }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Depth {
        self.lut[index]
    }

    /// LMR の基本 reduction
    ///
    /// PV ノードでは残りの探索窓の広さ（`delta / root_delta`）だけ差し引く。
    /// それ以外では改善していないときに 1 を足す。
    #[inline]
    pub fn reduction(
        &self,
        pv_node: bool,
        d: Depth,
        move_count: usize,
        improvement: i32,
        delta: Value,
        root_delta: Value,
    ) -> Depth {
        debug_assert!(d > 0.0);
        debug_assert!(move_count > 0 && move_count < self.lut.len());
        let r = self.lut[d as usize] * self.lut[move_count];
        if pv_node {
            (r - delta.raw() as Depth / root_delta.raw() as Depth).max(0.0)
        } else {
            r + (improvement <= 0 && r > 1.0) as i32 as Depth
        }
    }
}

impl Default for ReductionTable {
    fn default() -> Self {
        Self::new(1)
    }
}

// =============================================================================
// 手の複雑さ・policy による reduction
// =============================================================================

pub const CR1: [Depth; Rule::NUM] = [0.01 * 8.475, 0.01 * 9.0, 0.01 * 7.200];
pub const CR2: [Depth; Rule::NUM] = [0.01 * 4.143, 0.01 * 4.0, 0.01 * 3.628];
pub const CR3: [Depth; Rule::NUM] = [0.01 * 2.189, 0.01 * 2.0, 0.01 * 1.950];
pub const CR4: [Depth; Rule::NUM] = [0.01 * 0.719, 0.01 * 0.7, 0.01 * 0.681];
pub const POLICY_REDUCTION_SCALE: [Depth; Rule::NUM] = [2.818, 3.2, 3.469];
pub const POLICY_REDUCTION_BIAS: [Depth; Rule::NUM] = [3.724, 5.0, 5.205];
pub const POLICY_REDUCTION_MAX: [Depth; Rule::NUM] = [3.696, 4.0, 4.047];

/// 手の種類による reduction
#[inline]
pub fn complexity_reduction(rule: Rule, trivial_move: bool, important_move: bool, distract: bool) -> Depth {
    let table = if trivial_move {
        if distract { &CR1 } else { &CR2 }
    } else if !important_move {
        &CR3
    } else {
        &CR4
    };
    table[rule.index()]
}
