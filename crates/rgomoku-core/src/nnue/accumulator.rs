//! mix8 アキュムレータ（1手番視点の差分更新状態）
//!
//! # 状態
//!
//! - `index_table`: 盤内の各升 × 4方向の形状インデックス
//! - `map_sum`: 4方向の mapping 出力の和（i16, wrapping）
//! - `dwconv_sum`: 3x3 depthwise conv の出力升ごとの積和（i32, wrapping）。
//!   (size + 2)^2 のパディング付きグリッドに置き、境界チェックを省く
//! - `value_sum`: 盤全体の value 特徴の和
//!
//! conv は入力升からの scatter で保持するため、着手と取り消しは
//! 2^16 / 2^32 を法とする加減算だけで表せる。差分更新の結果は
//! 同じ盤面を `refresh` で作り直した状態とビット単位で一致し、
//! MOVE の直後の UNDO は元の状態を完全に復元する。
//!
//! # 特徴量
//!
//! 升ごとに `mapSum` の各チャネルへ PReLU を掛け、
//! - チャネル `0..FEATURE_DWCONV_DIM` は 3x3 depthwise conv → バイアス → ReLU を経て
//!   value 特徴（盤全体の和）と policy 特徴になる
//! - 残りのチャネルはそのまま value 特徴として盤全体で足し込む

use std::fmt;

use super::aligned::AlignedBox;
use super::constants::*;
use super::evaluator::ValueTuple;
use super::policy::PolicyBuffer;
use super::weights::Mix8Weights;
use crate::board::BoardView;
use crate::types::{Color, Pos, MAX_BOARD_SIZE};

/// 盤全体の value 特徴の和
pub type ValueSum = [i32; VALUE_DIM];

/// 差分更新の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// 石を置く
    Move,
    /// 石を取り除く
    Undo,
}

/// Policy depthwise conv のタップのオフセット
///
/// 0 番が中心、以降は方向ごとに -4, -3, -2, -1, +1, +2, +3, +4。
const POLICY_TAP_OFFSETS: [(i32, i32); POLICY_DWCONV_TAPS] = {
    let mut table = [(0, 0); POLICY_DWCONV_TAPS];
    let r = POLICY_KERNEL_RADIUS as i32;
    let mut d = 0;
    while d < DIRECTION_NUM {
        let (dx, dy) = DIRECTIONS[d];
        let mut j = 0;
        while j < 2 * r {
            let t = if j < r { j - r } else { j - r + 1 };
            table[1 + d * 2 * POLICY_KERNEL_RADIUS + j as usize] = (t * dx, t * dy);
            j += 1;
        }
        d += 1;
    }
    table
};

/// 固定小数点の丸め用オフセット（0.5）
const ROUND_HALF: i32 = 1 << (WEIGHT_SHIFT - 1);

/// mapping 後の PReLU（負側のみ傾きを掛ける）
#[inline]
fn map_prelu(x: i16, slope: i16) -> i16 {
    if x < 0 {
        ((x as i32 * slope as i32 + ROUND_HALF) >> WEIGHT_SHIFT) as i16
    } else {
        x
    }
}

/// conv 積和からの出力（バイアス加算後に [0, i16::MAX] へ制限）
#[inline]
fn conv_activation(sum: i32, bias: i16) -> i32 {
    ((sum.wrapping_add(ROUND_HALF) >> WEIGHT_SHIFT) + bias as i32).clamp(0, i16::MAX as i32)
}

/// 升の特徴量（mapSum の PReLU）
#[inline]
fn cell_features(w: &Mix8Weights, map_sum: &[i16; FEATURE_DIM]) -> [i16; FEATURE_DIM] {
    let mut out = [0i16; FEATURE_DIM];
    for ((o, &x), &slope) in out.iter_mut().zip(map_sum).zip(&w.map_prelu_weight) {
        *o = map_prelu(x, slope);
    }
    out
}

/// 全結合層（weight は (in, out) 順）
#[inline]
fn dense<const OUT: usize>(input: &[f32], weight: &[[f32; OUT]], out: &mut [f32; OUT]) {
    debug_assert_eq!(input.len(), weight.len());
    for (&x, row) in input.iter().zip(weight) {
        for (o, &w) in out.iter_mut().zip(row) {
            *o += x * w;
        }
    }
}

#[inline]
fn relu<const N: usize>(v: &mut [f32; N]) {
    for x in v.iter_mut() {
        *x = x.max(0.0);
    }
}

/// (x, y) を通る4方向のライン窓に入る升（(x, y) 自身を除く）を列挙する
///
/// コールバックには (方向, (x, y) の相対位置 t, 升 x, 升 y) を渡す。
/// (x, y) は升から見て `t` 番目（-5..=5）の位置にある。
#[inline]
fn for_each_line_cell(board_size: usize, x: i32, y: i32, mut f: impl FnMut(usize, i32, i32, i32)) {
    let n = board_size as i32;
    let half = HALF_LINE_LENGTH as i32;
    for (d, &(dx, dy)) in DIRECTIONS.iter().enumerate() {
        for t in -half..=half {
            if t == 0 {
                continue;
            }
            let (qx, qy) = (x - t * dx, y - t * dy);
            if qx >= 0 && qy >= 0 && qx < n && qy < n {
                f(d, t, qx, qy);
            }
        }
    }
}

/// mix8 アキュムレータ
#[derive(Clone, PartialEq)]
pub struct Mix8Accumulator {
    /// 自分側の色（形状の桁 1 = 自石、2 = 相手石）
    color: Color,
    board_size: usize,
    /// パディング込みの一辺（board_size + 2）
    full_size: usize,
    /// 1 / board_size^2
    board_size_scale: f32,

    value_sum: ValueSum,
    /// [size * size][4]
    index_table: Vec<[u32; DIRECTION_NUM]>,
    /// [size * size][FEATURE_DIM]
    map_sum: AlignedBox<[i16; FEATURE_DIM]>,
    /// [(size + 2)^2][FEATURE_DWCONV_DIM]
    dwconv_sum: AlignedBox<[i32; FEATURE_DWCONV_DIM]>,

    /// 差分更新で conv 出力を取り直す升の印（盤内インデックス）
    dirty: Vec<bool>,
    dirty_list: Vec<u16>,
}

impl Mix8Accumulator {
    /// 盤サイズ固定で確保する（状態は未初期化扱い。使う前に `clear` か `refresh` を呼ぶ）
    pub fn new(board_size: usize, color: Color) -> Self {
        assert!(
            (1..=MAX_BOARD_SIZE).contains(&board_size),
            "board size {board_size} is not supported (max {MAX_BOARD_SIZE})"
        );
        let cells = board_size * board_size;
        let full_size = board_size + 2;
        Self {
            color,
            board_size,
            full_size,
            board_size_scale: 1.0 / cells as f32,
            value_sum: [0; VALUE_DIM],
            index_table: vec![[0; DIRECTION_NUM]; cells],
            map_sum: AlignedBox::new_zeroed(cells),
            dwconv_sum: AlignedBox::new_zeroed(full_size * full_size),
            dirty: vec![false; cells],
            dirty_list: Vec::with_capacity(cells),
        }
    }

    /// 自分側の色
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// 盤サイズ
    #[inline]
    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// 盤全体の value 特徴の和
    #[inline]
    pub fn value_sum(&self) -> &ValueSum {
        &self.value_sum
    }

    /// value 特徴の和を保存値で置き換える（取り消し時の復元用）
    #[inline]
    pub(super) fn restore_value_sum(&mut self, value_sum: &ValueSum) {
        self.value_sum = *value_sum;
    }

    /// 升・方向の形状インデックス
    #[inline]
    pub fn shape_index(&self, pos: Pos, dir: usize) -> u32 {
        self.index_table[pos.board_index(self.board_size)][dir]
    }

    /// 升が空点か（形状の中心の桁で判定）
    #[inline]
    fn is_empty_cell(&self, index: usize) -> bool {
        let shape = self.index_table[index][0] % SHAPES_PER_WALL_CODE as u32;
        (shape / POW3[HALF_LINE_LENGTH]) % 3 == 0
    }

    #[inline]
    fn stone_digit(&self, color: Color) -> u32 {
        if color == self.color { 1 } else { 2 }
    }

    /// 升・方向の壁コード（窓の端が盤外に出るか）
    #[inline]
    fn wall_code(&self, x: i32, y: i32, dx: i32, dy: i32) -> u32 {
        let n = self.board_size as i32;
        let half = HALF_LINE_LENGTH as i32;
        let outside = |px: i32, py: i32| px < 0 || py < 0 || px >= n || py >= n;
        let neg = outside(x - half * dx, y - half * dy) as u32;
        let pos = outside(x + half * dx, y + half * dy) as u32;
        neg | (pos << 1)
    }

    #[inline]
    fn padded_index(&self, x: i32, y: i32) -> usize {
        (y + 1) as usize * self.full_size + (x + 1) as usize
    }

    /// 空の盤面の状態に初期化
    pub fn clear(&mut self, w: &Mix8Weights) {
        self.rebuild(w, |_| None);
    }

    /// 盤面から全状態を作り直す
    pub fn refresh<B: BoardView>(&mut self, w: &Mix8Weights, board: &B) {
        debug_assert_eq!(board.size(), self.board_size);
        self.rebuild(w, |pos| board.cell(pos));
    }

    fn rebuild(&mut self, w: &Mix8Weights, cell: impl Fn(Pos) -> Option<Color>) {
        let n = self.board_size as i32;
        let half = HALF_LINE_LENGTH as i32;

        // 形状インデックス
        for y in 0..n {
            for x in 0..n {
                let mut indices = [0u32; DIRECTION_NUM];
                for (d, &(dx, dy)) in DIRECTIONS.iter().enumerate() {
                    let mut index = self.wall_code(x, y, dx, dy) * SHAPES_PER_WALL_CODE as u32;
                    for s in -half..=half {
                        let (px, py) = (x + s * dx, y + s * dy);
                        if px < 0 || py < 0 || px >= n || py >= n {
                            continue;
                        }
                        if let Some(c) = cell(Pos::new(px, py)) {
                            index += self.stone_digit(c) * POW3[(s + half) as usize];
                        }
                    }
                    indices[d] = index;
                }
                self.index_table[(y * n + x) as usize] = indices;
            }
        }

        // mapSum / value 特徴（conv を通らない分）/ conv 積和
        self.value_sum = [0; VALUE_DIM];
        self.dwconv_sum.fill([0; FEATURE_DWCONV_DIM]);
        for y in 0..n {
            for x in 0..n {
                let i = (y * n + x) as usize;
                let mut sum = [0i16; FEATURE_DIM];
                for &index in &self.index_table[i] {
                    for (s, &m) in sum.iter_mut().zip(&w.mapping[index as usize]) {
                        *s = s.wrapping_add(m);
                    }
                }
                self.map_sum[i] = sum;

                let feat = cell_features(w, &sum);
                for c in FEATURE_DWCONV_DIM..VALUE_DIM {
                    self.value_sum[c] = self.value_sum[c].wrapping_add(feat[c] as i32);
                }
                let mut conv_in = [0i32; FEATURE_DWCONV_DIM];
                for (v, &f) in conv_in.iter_mut().zip(&feat) {
                    *v = f as i32;
                }
                self.scatter_dwconv(w, x, y, &conv_in);
            }
        }

        // conv 出力の盤全体の和
        for y in 0..n {
            for x in 0..n {
                let act = self.dwconv_activation(w, x, y);
                for (v, a) in self.value_sum.iter_mut().zip(act) {
                    *v = v.wrapping_add(a);
                }
            }
        }
    }

    /// 入力升 (x, y) の特徴変化 `delta` を 3x3 の出力升へ配る
    ///
    /// 出力 o はタップ (dx, dy) で入力 o + (dx, dy) を受け取る。
    #[inline]
    fn scatter_dwconv(&mut self, w: &Mix8Weights, x: i32, y: i32, delta: &[i32; FEATURE_DWCONV_DIM]) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let tap = ((dy + 1) * 3 + (dx + 1)) as usize;
                let o = self.padded_index(x - dx, y - dy);
                let kernel = &w.feature_dwconv_weight[tap];
                for ((s, &k), &d) in self.dwconv_sum[o].iter_mut().zip(kernel).zip(delta) {
                    *s = s.wrapping_add((k as i32).wrapping_mul(d));
                }
            }
        }
    }

    /// 盤内の升 (x, y) の conv 出力
    #[inline]
    fn dwconv_activation(&self, w: &Mix8Weights, x: i32, y: i32) -> [i32; FEATURE_DWCONV_DIM] {
        let sum = &self.dwconv_sum[self.padded_index(x, y)];
        let mut out = [0i32; FEATURE_DWCONV_DIM];
        for ((o, &s), &b) in out.iter_mut().zip(sum).zip(&w.feature_dwconv_bias) {
            *o = conv_activation(s, b);
        }
        out
    }

    /// (x, y) の 3x3 近傍（盤内のみ）に印を付ける
    #[inline]
    fn mark_neighborhood(&mut self, x: i32, y: i32) {
        let n = self.board_size as i32;
        for oy in (y - 1).max(0)..=(y + 1).min(n - 1) {
            for ox in (x - 1).max(0)..=(x + 1).min(n - 1) {
                let i = (oy * n + ox) as usize;
                if !self.dirty[i] {
                    self.dirty[i] = true;
                    self.dirty_list.push(i as u16);
                }
            }
        }
    }

    /// 印を付けた升の conv 出力を value_sum から引く / 足す
    fn accumulate_dirty_activations(&mut self, w: &Mix8Weights, subtract: bool) {
        let n = self.board_size;
        for k in 0..self.dirty_list.len() {
            let i = self.dirty_list[k] as usize;
            let act = self.dwconv_activation(w, (i % n) as i32, (i / n) as i32);
            for (v, a) in self.value_sum.iter_mut().zip(act) {
                *v = if subtract { v.wrapping_sub(a) } else { v.wrapping_add(a) };
            }
        }
    }

    /// 升 (x, y) の指定方向の形状インデックスを `deltas` だけ動かし、特徴の差分を反映する
    fn update_cell(&mut self, w: &Mix8Weights, ut: UpdateType, x: i32, y: i32, deltas: &[(usize, u32)]) {
        let i = y as usize * self.board_size + x as usize;
        let old_sum = self.map_sum[i];
        let old_feat = cell_features(w, &old_sum);

        let mut sum = old_sum;
        for &(d, delta) in deltas {
            let old_index = self.index_table[i][d];
            let new_index = match ut {
                UpdateType::Move => old_index + delta,
                UpdateType::Undo => old_index - delta,
            };
            debug_assert!((new_index as usize) < SHAPE_NUM);
            self.index_table[i][d] = new_index;

            let old_map = &w.mapping[old_index as usize];
            let new_map = &w.mapping[new_index as usize];
            for ((s, &o), &nw) in sum.iter_mut().zip(old_map).zip(new_map) {
                *s = s.wrapping_sub(o).wrapping_add(nw);
            }
        }
        self.map_sum[i] = sum;

        let new_feat = cell_features(w, &sum);
        for c in FEATURE_DWCONV_DIM..VALUE_DIM {
            let diff = new_feat[c] as i32 - old_feat[c] as i32;
            self.value_sum[c] = self.value_sum[c].wrapping_add(diff);
        }
        let mut conv_delta = [0i32; FEATURE_DWCONV_DIM];
        for (c, v) in conv_delta.iter_mut().enumerate() {
            *v = new_feat[c] as i32 - old_feat[c] as i32;
        }
        self.scatter_dwconv(w, x, y, &conv_delta);
    }

    /// 石1つの着手 / 取り消しを差分で反映する
    ///
    /// `value_sum_backup` には更新前の value_sum を書き出す。
    /// 盤外の座標や、空点の取り消し・石のある升への着手は呼び出し側の契約違反。
    pub fn update(
        &mut self,
        w: &Mix8Weights,
        ut: UpdateType,
        color: Color,
        pos: Pos,
        value_sum_backup: Option<&mut ValueSum>,
    ) {
        debug_assert!(pos.is_on_board(self.board_size), "{pos} is outside the board");
        debug_assert_eq!(
            self.is_empty_cell(pos.board_index(self.board_size)),
            ut == UpdateType::Move,
            "{ut:?} at {pos} does not match the cell state"
        );

        if let Some(backup) = value_sum_backup {
            *backup = self.value_sum;
        }

        let (x, y) = (pos.x as i32, pos.y as i32);
        let n = self.board_size;
        let digit = self.stone_digit(color);
        let half = HALF_LINE_LENGTH as i32;

        // 1. 形状が変わる升の 3x3 近傍の conv 出力を一旦引く
        self.mark_neighborhood(x, y);
        for_each_line_cell(n, x, y, |_, _, qx, qy| self.mark_neighborhood(qx, qy));
        self.accumulate_dirty_activations(w, true);

        // 2. 形状インデックス・mapSum・conv 積和・直接の value 特徴を更新
        let center = digit * POW3[HALF_LINE_LENGTH];
        self.update_cell(w, ut, x, y, &[(0, center), (1, center), (2, center), (3, center)]);
        for_each_line_cell(n, x, y, |d, t, qx, qy| {
            self.update_cell(w, ut, qx, qy, &[(d, digit * POW3[(t + half) as usize])]);
        });

        // 3. conv 出力を足し戻す
        self.accumulate_dirty_activations(w, false);
        for &i in &self.dirty_list {
            self.dirty[i as usize] = false;
        }
        self.dirty_list.clear();
    }

    #[inline]
    fn bucket_index(&self) -> usize {
        0
    }

    /// スケール済みの value 特徴（value ヘッドの入力半分）
    fn scaled_value_features(&self, w: &Mix8Weights, out: &mut [f32]) {
        debug_assert_eq!(out.len(), VALUE_DIM);
        let after_conv = w.value_sum_scale_after_conv * self.board_size_scale;
        let direct = w.value_sum_scale_direct * self.board_size_scale;
        for (c, (o, &v)) in out.iter_mut().zip(&self.value_sum).enumerate() {
            let scale = if c < FEATURE_DWCONV_DIM { after_conv } else { direct };
            *o = v as f32 * scale;
        }
    }

    /// 現在の状態の value（win / loss / draw のロジット）
    ///
    /// 入力は自分側の value 特徴と、相手側アキュムレータの value 特徴（相手の重みのスケール）。
    pub fn evaluate_value(
        &self,
        w: &Mix8Weights,
        oppo_w: &Mix8Weights,
        oppo: &Mix8Accumulator,
    ) -> ValueTuple {
        let bucket = w.bucket(self.bucket_index());

        let mut input = [0f32; VALUE_DIM * 2];
        self.scaled_value_features(w, &mut input[..VALUE_DIM]);
        oppo.scaled_value_features(oppo_w, &mut input[VALUE_DIM..]);

        let mut l1 = bucket.value_l1_bias;
        dense(&input, &bucket.value_l1_weight, &mut l1);
        relu(&mut l1);

        let mut l2 = bucket.value_l2_bias;
        dense(&l1, &bucket.value_l2_weight, &mut l2);
        relu(&mut l2);

        let mut out = bucket.value_l3_bias;
        dense(&l2, &bucket.value_l3_weight, &mut out);

        ValueTuple {
            win: out[0],
            loss: out[1],
            draw: out[2],
        }
    }

    /// 空点ごとの policy を `buffer` に書き込む
    ///
    /// 石のある升は未計算のまま残る。
    pub fn evaluate_policy(&self, w: &Mix8Weights, buffer: &mut PolicyBuffer) {
        debug_assert_eq!(buffer.board_size(), self.board_size);
        let bucket = w.bucket(self.bucket_index());
        let n = self.board_size as i32;

        // value 特徴から pointwise conv の重みを生成
        let mut value = [0f32; VALUE_DIM];
        self.scaled_value_features(w, &mut value);
        let mut pw_weight = bucket.policy_pwconv_weight_layer_bias;
        dense(&value, &bucket.policy_pwconv_weight_layer_weight, &mut pw_weight);

        buffer.clear();
        for y in 0..n {
            for x in 0..n {
                if !self.is_empty_cell((y * n + x) as usize) {
                    continue;
                }

                // 星型 depthwise conv
                let mut feat = [0i32; POLICY_DIM];
                for (tap, &(ox, oy)) in POLICY_TAP_OFFSETS.iter().enumerate() {
                    let (px, py) = (x + ox, y + oy);
                    if px < 0 || py < 0 || px >= n || py >= n {
                        continue;
                    }
                    let act = self.dwconv_activation(w, px, py);
                    let kernel = &bucket.policy_dwconv_weight[tap];
                    for ((f, &k), &a) in feat.iter_mut().zip(kernel).zip(&act) {
                        *f += (k as i32 * a + ROUND_HALF) >> WEIGHT_SHIFT;
                    }
                }

                let mut score = 0f32;
                for ((&f, &b), &pw) in feat.iter().zip(&bucket.policy_dwconv_bias).zip(&pw_weight) {
                    score += (f + b as i32) as f32 * POLICY_FEATURE_SCALE * pw;
                }
                score *= if score < 0.0 {
                    bucket.policy_neg_weight
                } else {
                    bucket.policy_pos_weight
                };
                buffer.set_score(Pos::new(x, y), score);
            }
        }
    }
}

impl fmt::Debug for Mix8Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mix8Accumulator")
            .field("color", &self.color)
            .field("board_size", &self.board_size)
            .field("value_sum", &self.value_sum)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_tap_offsets() {
        assert_eq!(POLICY_TAP_OFFSETS[0], (0, 0));
        // 横方向: -4..-1, 1..4
        let row: Vec<i32> = POLICY_TAP_OFFSETS[1..9].iter().map(|&(x, _)| x).collect();
        assert_eq!(row, vec![-4, -3, -2, -1, 1, 2, 3, 4]);
        // 右上がり方向の最後のタップ
        assert_eq!(POLICY_TAP_OFFSETS[32], (4, -4));
        // 中心以外に重複なし
        for (i, a) in POLICY_TAP_OFFSETS.iter().enumerate() {
            for b in &POLICY_TAP_OFFSETS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_map_prelu() {
        assert_eq!(map_prelu(100, 0), 100);
        assert_eq!(map_prelu(-100, 0), 0);
        // 傾き 0.5
        assert_eq!(map_prelu(-100, 1 << 14), -50);
        // 丸めは 0.5 を足してから算術シフト
        assert_eq!(map_prelu(-3, 1 << 14), -1);
    }

    #[test]
    fn test_conv_activation_clamps() {
        assert_eq!(conv_activation(-(1 << 20), 0), 0);
        assert_eq!(conv_activation(3 << WEIGHT_SHIFT, 2), 5);
        assert_eq!(conv_activation((i16::MAX as i32) << WEIGHT_SHIFT, i16::MAX), i16::MAX as i32);
    }

    #[test]
    fn test_for_each_line_cell_corner() {
        // 隅の升から各方向に盤内へ伸びるのは正方向の 5 升だけ
        // 右上がり方向 (1, -1) は (0, 0) からは盤内に入らない
        let mut count = 0;
        for_each_line_cell(15, 0, 0, |_, t, qx, qy| {
            assert!(t < 0);
            assert!(qx >= 0 && qy >= 0);
            count += 1;
        });
        assert_eq!(count, 15);
    }
}
