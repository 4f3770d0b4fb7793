//! 盤面（評価コアから見た読み取り専用インターフェース）
//!
//! 評価器が盤面に求めるのは以下だけ:
//! - 盤サイズ
//! - ルール
//! - 手番
//! - 各升の石（`None` は空点）
//!
//! 合法手判定や勝敗判定は持たない。`Board` はテストやツールで使う最小実装で、
//! 着手・巻き戻しの前後で評価器のフック（`before_move` / `after_undo`）を
//! 呼ぶのは呼び出し側の責務。

use crate::types::{Color, Pos, Rule, MAX_BOARD_SIZE};

/// 評価器が参照する盤面
pub trait BoardView {
    /// 盤サイズ（一辺の升数）
    fn size(&self) -> usize;

    /// ルール
    fn rule(&self) -> Rule;

    /// 手番
    fn side_to_move(&self) -> Color;

    /// 升の石（盤内の座標のみ有効）
    fn cell(&self, pos: Pos) -> Option<Color>;
}

/// 最小の盤面実装
#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    rule: Rule,
    cells: Vec<Option<Color>>,
    history: Vec<Pos>,
}

impl Board {
    /// 空の盤面を作成
    pub fn new(size: usize, rule: Rule) -> Self {
        assert!(
            (1..=MAX_BOARD_SIZE).contains(&size),
            "board size {size} is not supported (max {MAX_BOARD_SIZE})"
        );
        Self {
            size,
            rule,
            cells: vec![None; size * size],
            history: Vec::with_capacity(size * size),
        }
    }

    /// 手番側の石を置く
    pub fn make_move(&mut self, pos: Pos) {
        let idx = pos.board_index(self.size);
        debug_assert!(self.cells[idx].is_none(), "{pos} is already occupied");
        self.cells[idx] = Some(self.side_to_move());
        self.history.push(pos);
    }

    /// 直前の手を取り消す
    ///
    /// 取り消した座標を返す。履歴が空なら `None`。
    pub fn undo(&mut self) -> Option<Pos> {
        let pos = self.history.pop()?;
        self.cells[pos.board_index(self.size)] = None;
        Some(pos)
    }

    /// これまでの手数
    #[inline]
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// 直前の手
    #[inline]
    pub fn last_move(&self) -> Pos {
        self.history.last().copied().unwrap_or(Pos::NONE)
    }

    /// 空点かどうか
    #[inline]
    pub fn is_empty(&self, pos: Pos) -> bool {
        self.cells[pos.board_index(self.size)].is_none()
    }

    /// 全ての空点
    pub fn empty_cells(&self) -> impl Iterator<Item = Pos> + '_ {
        let size = self.size;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(move |(i, _)| Pos::new((i % size) as i32, (i / size) as i32))
    }

    /// 盤の中央
    #[inline]
    pub fn center(&self) -> Pos {
        let c = (self.size / 2) as i32;
        Pos::new(c, c)
    }
}

impl BoardView for Board {
    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn rule(&self) -> Rule {
        self.rule
    }

    #[inline]
    fn side_to_move(&self) -> Color {
        if self.history.len() % 2 == 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    #[inline]
    fn cell(&self, pos: Pos) -> Option<Color> {
        self.cells[pos.board_index(self.size)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_move_and_undo() {
        let mut board = Board::new(15, Rule::Freestyle);
        let center = board.center();
        assert_eq!(board.side_to_move(), Color::Black);

        board.make_move(center);
        assert_eq!(board.cell(center), Some(Color::Black));
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.last_move(), center);

        assert_eq!(board.undo(), Some(center));
        assert!(board.is_empty(center));
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.undo(), None);
    }

    #[test]
    fn test_empty_cells_count() {
        let mut board = Board::new(9, Rule::Renju);
        board.make_move(Pos::new(0, 0));
        board.make_move(Pos::new(8, 8));
        assert_eq!(board.empty_cells().count(), 81 - 2);
        assert!(board.empty_cells().all(|p| board.is_empty(p)));
    }
}
