//! mix8 評価器
//!
//! 手番ごとのアキュムレータ2つと、未反映の着手キャッシュを持つ。
//! `before_move` / `after_undo` はキャッシュに積むだけで、
//! 実際の差分更新は評価を要求されたときにまとめて行う。
//!
//! 着手の直後にその取り消しが来た場合（同じ升で色の変化が逆）は、
//! キャッシュ上で打ち消してアキュムレータには触れない。
//! 評価を挟むとキャッシュは空になるので、打ち消しは評価をまたがない。

use std::sync::Arc;

use super::accumulator::{Mix8Accumulator, UpdateType, ValueSum};
use super::constants::VALUE_DIM;
use super::policy::PolicyBuffer;
use super::weights::Mix8WeightSet;
use crate::board::BoardView;
use crate::types::{Color, Pos, Rule};

/// value ヘッドの出力（win / loss / draw のロジット）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ValueTuple {
    pub win: f32,
    pub loss: f32,
    pub draw: f32,
}

impl ValueTuple {
    /// softmax で確率に変換（win, loss, draw）
    pub fn probabilities(self) -> (f32, f32, f32) {
        let max = self.win.max(self.loss).max(self.draw);
        let win = (self.win - max).exp();
        let loss = (self.loss - max).exp();
        let draw = (self.draw - max).exp();
        let inv = 1.0 / (win + loss + draw);
        (win * inv, loss * inv, draw * inv)
    }

    /// 勝率 - 敗率（[-1, 1]）
    pub fn win_loss_rate(self) -> f32 {
        let (win, loss, _) = self.probabilities();
        win - loss
    }
}

/// 未反映の盤面変化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MoveCache {
    old_color: Option<Color>,
    new_color: Option<Color>,
    x: i8,
    y: i8,
}

impl MoveCache {
    /// 同じ升で色の変化が逆向きか
    #[inline]
    fn is_contrary(self, other: MoveCache) -> bool {
        let same_coord = self.x == other.x && self.y == other.y;
        let contrary = self.old_color == other.new_color && self.new_color == other.old_color;
        same_coord && contrary
    }
}

/// mix8 評価器（探索ワーカーごとに1つ）
pub struct Mix8Evaluator {
    board_size: usize,
    rule: Rule,
    weights: Arc<Mix8WeightSet>,
    accumulator: [Box<Mix8Accumulator>; Color::NUM],
    move_cache: [Vec<MoveCache>; Color::NUM],
    /// MOVE 反映前の value_sum（取り消し時に戻す）
    value_sum_history: [Vec<ValueSum>; Color::NUM],
}

impl Mix8Evaluator {
    /// 空の盤面で初期化した評価器を作成
    pub fn new(board_size: usize, rule: Rule, weights: Arc<Mix8WeightSet>) -> Self {
        let cells = board_size * board_size;
        let mut evaluator = Self {
            board_size,
            rule,
            weights,
            accumulator: [
                Box::new(Mix8Accumulator::new(board_size, Color::Black)),
                Box::new(Mix8Accumulator::new(board_size, Color::White)),
            ],
            move_cache: [Vec::with_capacity(cells), Vec::with_capacity(cells)],
            value_sum_history: [Vec::with_capacity(cells), Vec::with_capacity(cells)],
        };
        evaluator.init_empty_board();
        log::debug!(
            "mix8 evaluator created: {board_size}x{board_size} {rule} ({} weights)",
            if evaluator.weights.is_shared() { "shared" } else { "distinct" }
        );
        evaluator
    }

    #[inline]
    pub fn board_size(&self) -> usize {
        self.board_size
    }

    #[inline]
    pub fn rule(&self) -> Rule {
        self.rule
    }

    #[inline]
    pub fn weights(&self) -> &Arc<Mix8WeightSet> {
        &self.weights
    }

    /// 指定手番視点のアキュムレータ（キャッシュ未反映の状態）
    #[inline]
    pub fn accumulator(&self, side: Color) -> &Mix8Accumulator {
        &self.accumulator[side.index()]
    }

    /// 指定手番の未反映の盤面変化の数
    #[inline]
    pub fn pending_moves(&self, side: Color) -> usize {
        self.move_cache[side.index()].len()
    }

    /// 空の盤面に戻す
    pub fn init_empty_board(&mut self) {
        for side in Color::ALL {
            let s = side.index();
            self.move_cache[s].clear();
            self.value_sum_history[s].clear();
            self.accumulator[s].clear(self.weights.side(side));
        }
    }

    /// 盤面から全状態を作り直す
    pub fn sync_with_board<B: BoardView>(&mut self, board: &B) {
        debug_assert_eq!(board.size(), self.board_size);
        for side in Color::ALL {
            let s = side.index();
            self.move_cache[s].clear();
            self.value_sum_history[s].clear();
            self.accumulator[s].refresh(self.weights.side(side), board);
        }
        log::debug!("mix8 evaluator synced with board");
    }

    /// 着手の直前に呼ぶ（`board` は着手前の盤面）
    pub fn before_move<B: BoardView>(&mut self, board: &B, pos: Pos) {
        debug_assert!(pos.is_on_board(self.board_size));
        let color = board.side_to_move();
        let record = MoveCache {
            old_color: None,
            new_color: Some(color),
            x: pos.x,
            y: pos.y,
        };
        for side in Color::ALL {
            self.add_cache(side, record);
        }
    }

    /// 取り消しの直後に呼ぶ（`board` は取り消し後の盤面）
    pub fn after_undo<B: BoardView>(&mut self, board: &B, pos: Pos) {
        debug_assert!(pos.is_on_board(self.board_size));
        let color = board.side_to_move();
        let record = MoveCache {
            old_color: Some(color),
            new_color: None,
            x: pos.x,
            y: pos.y,
        };
        for side in Color::ALL {
            self.add_cache(side, record);
        }
    }

    /// 手番側から見た value
    pub fn evaluate_value<B: BoardView>(&mut self, board: &B) -> ValueTuple {
        self.clear_cache(Color::Black);
        self.clear_cache(Color::White);

        let own = board.side_to_move();
        let oppo = !own;
        self.accumulator[own.index()].evaluate_value(
            self.weights.side(own),
            self.weights.side(oppo),
            &self.accumulator[oppo.index()],
        )
    }

    /// 手番側の policy を `buffer` に書き込む
    pub fn evaluate_policy<B: BoardView>(&mut self, board: &B, buffer: &mut PolicyBuffer) {
        let own = board.side_to_move();
        self.clear_cache(own);
        self.accumulator[own.index()].evaluate_policy(self.weights.side(own), buffer);
    }

    /// 盤面変化をキャッシュに積む（直前と逆向きなら打ち消す）
    fn add_cache(&mut self, side: Color, record: MoveCache) {
        let cache = &mut self.move_cache[side.index()];
        match cache.last() {
            Some(&last) if last.is_contrary(record) => {
                cache.pop();
            }
            _ => cache.push(record),
        }
    }

    /// キャッシュを積んだ順にアキュムレータへ反映する
    fn clear_cache(&mut self, side: Color) {
        let s = side.index();
        let weights = self.weights.side(side);
        let accumulator = &mut self.accumulator[s];
        let history = &mut self.value_sum_history[s];

        for record in self.move_cache[s].drain(..) {
            let pos = Pos {
                x: record.x,
                y: record.y,
            };
            match (record.old_color, record.new_color) {
                (None, Some(color)) => {
                    let mut backup: ValueSum = [0; VALUE_DIM];
                    accumulator.update(weights, UpdateType::Move, color, pos, Some(&mut backup));
                    history.push(backup);
                }
                (Some(color), None) => {
                    accumulator.update(weights, UpdateType::Undo, color, pos, None);
                    // sync_with_board より前の着手の取り消しなら履歴はない
                    if let Some(backup) = history.pop() {
                        debug_assert_eq!(&backup, accumulator.value_sum());
                        accumulator.restore_value_sum(&backup);
                    }
                }
                _ => debug_assert!(false, "invalid move cache record: {record:?}"),
            }
        }
    }
}
