//! 基本型
//!
//! - `Color`: 石の色
//! - `Pos`: 盤上の座標
//! - `Rule`: 対局ルール
//! - `Value` / `Depth`: 評価値と連続値の探索深さ

mod color;
mod pos;
mod rule;
mod value;

pub use color::Color;
pub use pos::{Pos, HISTORY_CELL_COUNT, MAX_BOARD_SIZE, MAX_MOVES};
pub use rule::Rule;
pub use value::{Depth, Value};
