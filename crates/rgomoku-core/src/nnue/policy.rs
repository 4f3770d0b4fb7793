//! Policy バッファ
//!
//! 評価器が空点ごとの policy スコアを書き込む、呼び出し側所有のバッファ。
//! 盤サイズ分だけ一度確保し、評価のたびに使い回す。

use crate::types::Pos;

/// 升ごとの policy スコア
#[derive(Debug, Clone)]
pub struct PolicyBuffer {
    board_size: usize,
    scores: Vec<f32>,
    computed: Vec<bool>,
}

impl PolicyBuffer {
    pub fn new(board_size: usize) -> Self {
        let cells = board_size * board_size;
        Self {
            board_size,
            scores: vec![0.0; cells],
            computed: vec![false; cells],
        }
    }

    #[inline]
    pub fn board_size(&self) -> usize {
        self.board_size
    }

    /// 全升を未計算に戻す
    pub fn clear(&mut self) {
        self.computed.fill(false);
        self.scores.fill(0.0);
    }

    #[inline]
    pub fn set_score(&mut self, pos: Pos, score: f32) {
        let i = pos.board_index(self.board_size);
        self.scores[i] = score;
        self.computed[i] = true;
    }

    /// 升のスコア（未計算なら `None`）
    #[inline]
    pub fn score(&self, pos: Pos) -> Option<f32> {
        let i = pos.board_index(self.board_size);
        self.computed[i].then_some(self.scores[i])
    }

    #[inline]
    pub fn is_computed(&self, pos: Pos) -> bool {
        self.computed[pos.board_index(self.board_size)]
    }

    /// 計算済みの升とスコア
    pub fn iter(&self) -> impl Iterator<Item = (Pos, f32)> + '_ {
        let n = self.board_size;
        self.computed
            .iter()
            .zip(&self.scores)
            .enumerate()
            .filter(|(_, (c, _))| **c)
            .map(move |(i, (_, &s))| (Pos::new((i % n) as i32, (i / n) as i32), s))
    }

    /// 計算済みの升の数
    pub fn computed_count(&self) -> usize {
        self.computed.iter().filter(|&&c| c).count()
    }

    /// スコア最大の升（同点は先に現れた升）
    pub fn best(&self) -> Option<(Pos, f32)> {
        self.iter().fold(None, |best, (pos, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((pos, s)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_buffer_set_and_clear() {
        let mut buffer = PolicyBuffer::new(15);
        assert_eq!(buffer.computed_count(), 0);
        assert_eq!(buffer.best(), None);

        buffer.set_score(Pos::new(7, 7), 1.5);
        buffer.set_score(Pos::new(0, 14), -2.0);
        buffer.set_score(Pos::new(3, 4), 1.5);
        assert_eq!(buffer.score(Pos::new(7, 7)), Some(1.5));
        assert_eq!(buffer.score(Pos::new(1, 1)), None);
        assert_eq!(buffer.computed_count(), 3);
        // 同点は盤面順で先の升
        assert_eq!(buffer.best(), Some((Pos::new(3, 4), 1.5)));

        buffer.clear();
        assert!(!buffer.is_computed(Pos::new(7, 7)));
        assert_eq!(buffer.iter().count(), 0);
    }
}
