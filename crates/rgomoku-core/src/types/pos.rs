//! 盤上の座標（Pos）

use serde::{Deserialize, Serialize};

/// 対応する最大盤サイズ
pub const MAX_BOARD_SIZE: usize = 22;

/// 最大手数（= 最大盤面の升数）
pub const MAX_MOVES: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE;

/// History テーブルのセル数
///
/// 末尾の1要素は `Pos::NONE`（直前の手がない）用。
pub const HISTORY_CELL_COUNT: usize = MAX_MOVES + 1;

/// 盤上の座標
///
/// `x` が列、`y` が行。盤内かどうかは盤サイズに依存するため、
/// 範囲チェックは `is_on_board` で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i8,
    pub y: i8,
}

impl Pos {
    /// 無効な座標（直前の手がない、など）
    pub const NONE: Pos = Pos { x: -1, y: -1 };

    #[inline]
    pub const fn new(x: i32, y: i32) -> Pos {
        Pos {
            x: x as i8,
            y: y as i8,
        }
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.x < 0 || self.y < 0
    }

    /// 指定サイズの盤内か
    #[inline]
    pub const fn is_on_board(self, board_size: usize) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as usize) < board_size && (self.y as usize) < board_size
    }

    /// 盤サイズ `board_size` の盤面配列上のインデックス（y * size + x）
    #[inline]
    pub fn board_index(self, board_size: usize) -> usize {
        debug_assert!(self.is_on_board(board_size), "{self:?} is outside {board_size}x{board_size}");
        self.y as usize * board_size + self.x as usize
    }

    /// History テーブル用インデックス
    ///
    /// 盤サイズに依存しないよう `MAX_BOARD_SIZE` 基準で並べる。
    /// `Pos::NONE` は `MAX_MOVES` に割り当てる。
    #[inline]
    pub fn history_index(self) -> usize {
        if self.is_none() {
            MAX_MOVES
        } else {
            debug_assert!(self.is_on_board(MAX_BOARD_SIZE));
            self.y as usize * MAX_BOARD_SIZE + self.x as usize
        }
    }
}

impl std::fmt::Display for Pos {
    /// 列は a, b, c...、行は 1 始まりで表示する（例: h8）
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }
        write!(f, "{}{}", (b'a' + self.x as u8) as char, self.y as i32 + 1)
    }
}
