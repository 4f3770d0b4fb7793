//! 探索から呼ばれる純粋なパラメータ関数と、ワーカーごとの履歴テーブル
//!
//! 探索本体（alpha-beta、反復深化、時間管理）は持たない。

pub mod history;
pub mod params;

pub use history::{
    ContinuationHistory, CounterMoveHistory, HistoryTables, MainHistory, MoveHistory, MoveHistoryType,
    Oppo4HistoryType, StatsEntry, MAIN_HISTORY_RANGE, MOVE_HISTORY_RANGE,
};
pub use params::ReductionTable;
