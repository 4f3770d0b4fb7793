//! History統計
//!
//! 探索中の手の成功/失敗を記録し、手の順序付けに利用する。
//! 探索の開始時にクリアし、探索中は手を調べるたびに更新する。永続化はしない。
//!
//! - `StatsEntry`: 範囲制限付き履歴エントリ
//! - `MainHistory`: [Color][cell][MoveHistoryType] -> score
//! - `CounterMoveHistory`: [Color][prev_cell] -> Pos
//! - `MoveHistory`: [cell] -> score
//! - `ContinuationHistory`: [Oppo4HistoryType][prev_cell] -> MoveHistory

use crate::types::{Color, Pos, HISTORY_CELL_COUNT};

// =============================================================================
// 定数
// =============================================================================

/// MainHistory の値の範囲
pub const MAIN_HISTORY_RANGE: i32 = 10692;

/// MoveHistory（ContinuationHistory の要素）の値の範囲
pub const MOVE_HISTORY_RANGE: i32 = 10692;

/// MainHistory に記録する手の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveHistoryType {
    /// 攻めの手（四・三など）
    Attack,
    /// 静かな手
    Quiet,
}

impl MoveHistoryType {
    pub const NUM: usize = 2;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// 直前の相手の手が四だったか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Oppo4HistoryType {
    No,
    Yes,
}

impl Oppo4HistoryType {
    pub const NUM: usize = 2;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl From<bool> for Oppo4HistoryType {
    fn from(oppo4: bool) -> Self {
        if oppo4 { Self::Yes } else { Self::No }
    }
}

// =============================================================================
// StatsEntry
// =============================================================================

/// 履歴統計の1エントリ
///
/// 値は [-D, D] に収まる。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsEntry<const D: i32> {
    value: i16,
}

impl<const D: i32> StatsEntry<D> {
    /// 値を取得
    #[inline]
    pub fn get(&self) -> i16 {
        self.value
    }

    /// 値を設定
    #[inline]
    pub fn set(&mut self, v: i16) {
        debug_assert!((v as i32).abs() <= D);
        self.value = v;
    }

    /// ボーナス値を加算
    ///
    /// 更新式: entry += bonus - entry * |bonus| / D
    ///
    /// - bonus == D のとき、entry が D に収束
    /// - bonus が小さいとき、ほぼそのまま加算
    /// - |bonus| <= D なら値は [-D, D] から出ない
    ///
    /// |bonus| > D は呼び出し側の契約違反。
    #[inline]
    pub fn update(&mut self, bonus: i32) {
        debug_assert!(bonus.abs() <= D, "bonus {bonus} exceeds range {D}");
        let value = self.value as i32;
        let updated = value + bonus - value * bonus.abs() / D;
        debug_assert!(updated.abs() <= D, "StatsEntry out of range: {updated} (D={D})");
        self.value = updated as i16;
    }
}

// =============================================================================
// MainHistory
// =============================================================================

/// MainHistory: [Color][cell][MoveHistoryType] -> score
///
/// 手の色・位置・種類ごとに、β カットを起こした頻度を記録する。
pub struct MainHistory {
    table: [[[StatsEntry<MAIN_HISTORY_RANGE>; MoveHistoryType::NUM]; HISTORY_CELL_COUNT]; Color::NUM],
}

impl MainHistory {
    pub fn new() -> Self {
        Self {
            table: [[[StatsEntry::default(); MoveHistoryType::NUM]; HISTORY_CELL_COUNT]; Color::NUM],
        }
    }

    /// 値を取得
    #[inline]
    pub fn get(&self, color: Color, pos: Pos, ty: MoveHistoryType) -> i16 {
        self.table[color.index()][pos.history_index()][ty.index()].get()
    }

    /// 値を更新
    #[inline]
    pub fn update(&mut self, color: Color, pos: Pos, ty: MoveHistoryType, bonus: i32) {
        self.table[color.index()][pos.history_index()][ty.index()].update(bonus);
    }

    /// 全エントリを `value` で埋める
    pub fn init(&mut self, value: i16) {
        for entry in self.table.as_flattened_mut().as_flattened_mut() {
            entry.set(value);
        }
    }

    /// クリア
    pub fn clear(&mut self) {
        self.init(0);
    }
}

impl Default for MainHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CounterMoveHistory
// =============================================================================

/// CounterMoveHistory: [Color][prev_cell] -> Pos
///
/// 局面によらない、直前の手に対する自然な応手。
/// 色は直前の手の色。
pub struct CounterMoveHistory {
    table: [[Pos; HISTORY_CELL_COUNT]; Color::NUM],
}

impl CounterMoveHistory {
    pub fn new() -> Self {
        Self {
            table: [[Pos::NONE; HISTORY_CELL_COUNT]; Color::NUM],
        }
    }

    /// 値を取得
    #[inline]
    pub fn get(&self, color: Color, prev: Pos) -> Pos {
        self.table[color.index()][prev.history_index()]
    }

    /// 値を設定
    #[inline]
    pub fn set(&mut self, color: Color, prev: Pos, pos: Pos) {
        self.table[color.index()][prev.history_index()] = pos;
    }

    /// 全エントリを `pos` で埋める
    pub fn init(&mut self, pos: Pos) {
        for entry in self.table.as_flattened_mut() {
            *entry = pos;
        }
    }

    /// クリア
    pub fn clear(&mut self) {
        self.init(Pos::NONE);
    }
}

impl Default for CounterMoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MoveHistory / ContinuationHistory
// =============================================================================

/// MoveHistory: [cell] -> score
#[derive(Clone)]
pub struct MoveHistory {
    table: [StatsEntry<MOVE_HISTORY_RANGE>; HISTORY_CELL_COUNT],
}

impl MoveHistory {
    pub fn new() -> Self {
        Self {
            table: [StatsEntry::default(); HISTORY_CELL_COUNT],
        }
    }

    /// 値を取得
    #[inline]
    pub fn get(&self, pos: Pos) -> i16 {
        self.table[pos.history_index()].get()
    }

    /// 値を更新
    #[inline]
    pub fn update(&mut self, pos: Pos, bonus: i32) {
        self.table[pos.history_index()].update(bonus);
    }

    /// 全エントリを `value` で埋める
    pub fn init(&mut self, value: i16) {
        for entry in self.table.iter_mut() {
            entry.set(value);
        }
    }

    /// クリア
    pub fn clear(&mut self) {
        self.init(0);
    }
}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// ContinuationHistory: [Oppo4HistoryType][prev_cell] -> MoveHistory
///
/// 局面によらない、連続する2手の組み合わせの履歴。
///
/// PERF: 約0.9MBあるため、ヒープに確保する。
pub struct ContinuationHistory {
    table: [[MoveHistory; HISTORY_CELL_COUNT]; Oppo4HistoryType::NUM],
}

impl ContinuationHistory {
    /// 新しいContinuationHistoryを作成（ヒープ確保）
    ///
    /// 大きな配列のスタック確保を避けるために `Box::new_zeroed` を使う。
    pub fn new_boxed() -> Box<Self> {
        // SAFETY: MoveHistory は StatsEntry(i16) のみで構成され、ゼロ初期化は有効。
        unsafe { Box::<Self>::new_zeroed().assume_init() }
    }

    #[inline]
    pub fn get_table(&self, oppo4: Oppo4HistoryType, prev: Pos) -> &MoveHistory {
        &self.table[oppo4.index()][prev.history_index()]
    }

    /// 内部テーブルへの可変参照を取得
    #[inline]
    pub fn get_table_mut(&mut self, oppo4: Oppo4HistoryType, prev: Pos) -> &mut MoveHistory {
        &mut self.table[oppo4.index()][prev.history_index()]
    }

    /// 値を取得
    #[inline]
    pub fn get(&self, oppo4: Oppo4HistoryType, prev: Pos, pos: Pos) -> i16 {
        self.get_table(oppo4, prev).get(pos)
    }

    /// 値を更新
    #[inline]
    pub fn update(&mut self, oppo4: Oppo4HistoryType, prev: Pos, pos: Pos, bonus: i32) {
        self.get_table_mut(oppo4, prev).update(pos, bonus);
    }

    /// 全エントリを `value` で埋める
    pub fn init(&mut self, value: i16) {
        for history in self.table.as_flattened_mut() {
            history.init(value);
        }
    }

    /// クリア
    pub fn clear(&mut self) {
        self.init(0);
    }
}

// =============================================================================
// HistoryTables
// =============================================================================

/// 探索ワーカーごとの履歴テーブル一式
pub struct HistoryTables {
    pub main_history: MainHistory,
    pub counter_move_history: CounterMoveHistory,
    pub continuation_history: ContinuationHistory,
}

impl HistoryTables {
    /// 新しいHistoryTablesを作成（ヒープ確保）
    ///
    /// `Box::new_zeroed` で一括確保し、CounterMoveHistory のみ `Pos::NONE` で埋める。
    pub fn new_boxed() -> Box<Self> {
        // SAFETY: 統計テーブルは i16 のみ、Pos は i8 2つで構成され、ゼロ初期化は有効。
        let mut history = unsafe { Box::<Self>::new_zeroed().assume_init() };
        history.counter_move_history.clear();
        history
    }

    /// すべての履歴テーブルをクリア（探索開始時）
    pub fn clear(&mut self) {
        self.main_history.clear();
        self.counter_move_history.clear();
        self.continuation_history.clear();
    }
}
