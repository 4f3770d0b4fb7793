//! rgomoku-core: 五目並べ / 連珠エンジンの判断コア
//!
//! 探索の各ノードから呼ばれる3つの部品をまとめる。
//!
//! - `nnue`: 差分更新型の mix8 NNUE 評価器（value / policy）
//! - `search::params`: 連続値の深さを受け取る枝刈りマージンと reduction
//! - `search::history`: 手の順序付けに使う飽和型の履歴統計
//!
//! 盤面は `board::BoardView` 越しに読むだけで、合法手判定や勝敗判定は持たない。

pub mod board;
pub mod config;
pub mod nnue;
pub mod search;
pub mod types;
