//! mix8 NNUE 統合テスト

use std::io::Cursor;
use std::sync::{Arc, LazyLock};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::*;
use crate::board::{Board, BoardView};
use crate::types::{Color, Pos, Rule};

/// テスト全体で共有する乱数重み（mapping だけで約136MBあるので1つだけ作る）
static RANDOM_WEIGHTS: LazyLock<Arc<Mix8Weights>> =
    LazyLock::new(|| Arc::new(Mix8Weights::random(0x6d69_7838)));

fn shared_set() -> Arc<Mix8WeightSet> {
    Arc::new(Mix8WeightSet::Shared(Arc::clone(&RANDOM_WEIGHTS)))
}

/// ランダムな空点
fn random_empty_cell(board: &Board, rng: &mut Xoshiro256PlusPlus) -> Pos {
    let empty: Vec<Pos> = board.empty_cells().collect();
    empty[rng.random_range(0..empty.len())]
}

/// 盤面を作り直したアキュムレータ
fn refreshed(board: &Board, color: Color) -> Mix8Accumulator {
    let mut acc = Mix8Accumulator::new(board.size(), color);
    acc.refresh(&RANDOM_WEIGHTS, board);
    acc
}

// =============================================================================
// アキュムレータ
// =============================================================================

/// 空の盤面の形状インデックス（壁コードのみ）
#[test]
fn test_empty_board_shape_index() {
    let w = &*RANDOM_WEIGHTS;
    let mut acc = Mix8Accumulator::new(15, Color::Black);
    acc.clear(w);

    // 中央は窓が盤内に収まる
    for d in 0..DIRECTION_NUM {
        assert_eq!(acc.shape_index(Pos::new(7, 7), d), 0);
    }
    // 左上隅: 横方向は負側だけ壁
    assert_eq!(acc.shape_index(Pos::new(0, 0), 0), SHAPES_PER_WALL_CODE as u32);
    // 右上がり方向は両側とも壁
    assert_eq!(acc.shape_index(Pos::new(0, 0), 3), 3 * SHAPES_PER_WALL_CODE as u32);
}

/// 石の桁（自石 1 / 相手石 2）
#[test]
fn test_stone_digits() {
    let w = &*RANDOM_WEIGHTS;
    let mut black = Mix8Accumulator::new(15, Color::Black);
    let mut white = Mix8Accumulator::new(15, Color::White);
    black.clear(w);
    white.clear(w);

    let center = Pos::new(7, 7);
    black.update(w, UpdateType::Move, Color::Black, center, None);
    white.update(w, UpdateType::Move, Color::Black, center, None);

    assert_eq!(black.shape_index(center, 0), POW3[5]);
    assert_eq!(white.shape_index(center, 0), 2 * POW3[5]);
    // (8, 7) から見て中央は横方向の -1 の位置
    assert_eq!(black.shape_index(Pos::new(8, 7), 0), POW3[4]);
    // 縦方向は変わらない
    assert_eq!(black.shape_index(Pos::new(8, 7), 1), 0);
}

/// 差分更新と作り直しの一致（複数の盤サイズ）
#[test]
fn test_incremental_matches_refresh() {
    let w = &*RANDOM_WEIGHTS;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);

    for size in [1, 5, 9, 15, 20, 22] {
        let mut board = Board::new(size, Rule::Freestyle);
        let mut acc = [
            Mix8Accumulator::new(size, Color::Black),
            Mix8Accumulator::new(size, Color::White),
        ];
        for a in acc.iter_mut() {
            a.clear(w);
        }

        let moves = (size * size).min(40);
        for _ in 0..moves {
            let pos = random_empty_cell(&board, &mut rng);
            let color = board.side_to_move();
            for a in acc.iter_mut() {
                a.update(w, UpdateType::Move, color, pos, None);
            }
            board.make_move(pos);

            for (a, color) in acc.iter().zip(Color::ALL) {
                assert!(*a == refreshed(&board, color), "size {size}: mismatch after {pos}");
            }
        }

        // 取り消しでも一致
        for _ in 0..moves / 2 {
            let pos = board.undo().unwrap();
            let color = board.side_to_move();
            for a in acc.iter_mut() {
                a.update(w, UpdateType::Undo, color, pos, None);
            }
            for (a, color) in acc.iter().zip(Color::ALL) {
                assert!(*a == refreshed(&board, color), "size {size}: mismatch after undo {pos}");
            }
        }
    }
}

/// 着手直後の取り消しで元の状態に戻る
#[test]
fn test_move_undo_inverse() {
    let w = &*RANDOM_WEIGHTS;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
    let mut board = Board::new(15, Rule::Standard);
    for _ in 0..30 {
        let pos = random_empty_cell(&board, &mut rng);
        board.make_move(pos);
    }

    let mut acc = refreshed(&board, Color::White);
    let before = acc.clone();

    // 隅・辺・ランダムな空点
    let mut cells = vec![Pos::new(0, 0), Pos::new(14, 7), Pos::new(14, 14)];
    cells.extend((0..20).map(|_| random_empty_cell(&board, &mut rng)));
    for pos in cells {
        if !board.is_empty(pos) {
            continue;
        }
        for color in Color::ALL {
            let mut backup = [0; VALUE_DIM];
            acc.update(w, UpdateType::Move, color, pos, Some(&mut backup));
            assert_eq!(&backup, before.value_sum());
            acc.update(w, UpdateType::Undo, color, pos, None);
            assert!(acc == before, "{color:?} at {pos} was not restored");
        }
    }
}

// =============================================================================
// 評価器
// =============================================================================

/// 15x15 の中央に黒を置いて評価すると、新しいアキュムレータで同じ手を反映した値と一致する
#[test]
fn test_center_stone_value() {
    let w = &*RANDOM_WEIGHTS;
    let mut board = Board::new(15, Rule::Freestyle);
    let mut evaluator = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());

    let center = board.center();
    evaluator.before_move(&board, center);
    board.make_move(center);
    let value = evaluator.evaluate_value(&board);

    let mut black = Mix8Accumulator::new(15, Color::Black);
    let mut white = Mix8Accumulator::new(15, Color::White);
    black.clear(w);
    white.clear(w);
    black.update(w, UpdateType::Move, Color::Black, center, None);
    white.update(w, UpdateType::Move, Color::Black, center, None);
    // 着手後の手番は白
    let expected = white.evaluate_value(w, w, &black);

    assert_eq!(value, expected);
    let (win, loss, draw) = value.probabilities();
    assert!((win + loss + draw - 1.0).abs() < 1e-5);
}

/// 評価を繰り返しても結果は変わらない
#[test]
fn test_evaluate_is_idempotent() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let mut board = Board::new(15, Rule::Renju);
    let mut evaluator = Mix8Evaluator::new(15, Rule::Renju, shared_set());
    for _ in 0..12 {
        let pos = random_empty_cell(&board, &mut rng);
        evaluator.before_move(&board, pos);
        board.make_move(pos);
    }

    let v1 = evaluator.evaluate_value(&board);
    let v2 = evaluator.evaluate_value(&board);
    assert_eq!(v1, v2);

    let mut p1 = PolicyBuffer::new(15);
    let mut p2 = PolicyBuffer::new(15);
    evaluator.evaluate_policy(&board, &mut p1);
    evaluator.evaluate_policy(&board, &mut p2);
    assert_eq!(p1.iter().collect::<Vec<_>>(), p2.iter().collect::<Vec<_>>());
    assert_eq!(evaluator.evaluate_value(&board), v1);
}

/// 着手と取り消しの打ち消しは、個別に反映した場合と同じ結果になる
#[test]
fn test_cache_coalescing_is_transparent() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
    let mut board = Board::new(15, Rule::Freestyle);
    let mut coalesced = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());
    let mut flushed = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());

    for _ in 0..8 {
        let pos = random_empty_cell(&board, &mut rng);
        coalesced.before_move(&board, pos);
        flushed.before_move(&board, pos);
        board.make_move(pos);
    }
    assert_eq!(coalesced.evaluate_value(&board), flushed.evaluate_value(&board));

    for _ in 0..10 {
        let pos = random_empty_cell(&board, &mut rng);

        // 評価を挟まない: キャッシュ上で打ち消される
        coalesced.before_move(&board, pos);
        // 評価を挟む: 着手と取り消しを個別に反映
        flushed.before_move(&board, pos);
        board.make_move(pos);
        flushed.evaluate_value(&board);

        board.undo();
        coalesced.after_undo(&board, pos);
        flushed.after_undo(&board, pos);

        for side in Color::ALL {
            assert_eq!(coalesced.pending_moves(side), 0);
            assert_eq!(flushed.pending_moves(side), 1);
        }
        assert_eq!(coalesced.evaluate_value(&board), flushed.evaluate_value(&board));
        for side in Color::ALL {
            assert!(coalesced.accumulator(side) == flushed.accumulator(side));
        }
    }
}

/// 評価を挟まずに複数手進めてから戻しても、作り直した状態と一致する
#[test]
fn test_deep_undo_restores_state() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    let mut board = Board::new(13, Rule::Standard);
    let mut evaluator = Mix8Evaluator::new(13, Rule::Standard, shared_set());

    for _ in 0..6 {
        let pos = random_empty_cell(&board, &mut rng);
        evaluator.before_move(&board, pos);
        board.make_move(pos);
        evaluator.evaluate_value(&board);
    }
    let base = evaluator.evaluate_value(&board);

    for _ in 0..5 {
        let pos = random_empty_cell(&board, &mut rng);
        evaluator.before_move(&board, pos);
        board.make_move(pos);
    }
    evaluator.evaluate_value(&board);
    for _ in 0..7 {
        let pos = board.undo().unwrap();
        evaluator.after_undo(&board, pos);
    }
    let value = evaluator.evaluate_value(&board);

    let mut fresh = Mix8Evaluator::new(13, Rule::Standard, shared_set());
    fresh.sync_with_board(&board);
    assert_eq!(value, fresh.evaluate_value(&board));
    assert_ne!(value, base);
}

/// 盤面からの同期後に、同期前の着手を取り消せる
#[test]
fn test_sync_with_board_then_undo() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
    let mut board = Board::new(15, Rule::Freestyle);
    for _ in 0..10 {
        board.make_move(random_empty_cell(&board, &mut rng));
    }

    let mut evaluator = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());
    evaluator.sync_with_board(&board);
    for side in Color::ALL {
        assert!(*evaluator.accumulator(side) == refreshed(&board, side));
    }

    let pos = board.undo().unwrap();
    evaluator.after_undo(&board, pos);
    let value = evaluator.evaluate_value(&board);

    let mut fresh = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());
    fresh.sync_with_board(&board);
    assert_eq!(value, fresh.evaluate_value(&board));
}

/// Policy は空点だけに書き込まれる
#[test]
fn test_policy_covers_empty_cells() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let mut board = Board::new(15, Rule::Freestyle);
    let mut evaluator = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());
    for _ in 0..20 {
        let pos = random_empty_cell(&board, &mut rng);
        evaluator.before_move(&board, pos);
        board.make_move(pos);
    }

    let mut buffer = PolicyBuffer::new(15);
    evaluator.evaluate_policy(&board, &mut buffer);
    assert_eq!(buffer.computed_count(), 15 * 15 - 20);
    for (pos, score) in buffer.iter() {
        assert!(board.is_empty(pos));
        assert!(score.is_finite());
    }
    let (best, _) = buffer.best().unwrap();
    assert!(board.is_empty(best));

    // policy は手番側だけ反映する
    let own = board.side_to_move();
    assert_eq!(evaluator.pending_moves(own), 0);
    assert_eq!(evaluator.pending_moves(!own), 20);
}

/// 共通の重みと手番ごとの重み
#[test]
fn test_shared_and_distinct_weights() {
    let black_w = Arc::clone(&RANDOM_WEIGHTS);
    // mapping はゼロのまま、ヘッドとスケールだけ共通
    let mut white = Mix8Weights::new();
    white.buckets = black_w.buckets.clone();
    white.value_sum_scale_after_conv = black_w.value_sum_scale_after_conv;
    white.value_sum_scale_direct = black_w.value_sum_scale_direct;
    let white_w = Arc::new(white);

    let distinct = Arc::new(Mix8WeightSet::Distinct {
        black: Arc::clone(&black_w),
        white: Arc::clone(&white_w),
    });
    // 同じ実体を両手番に持たせた Distinct は Shared と同じ結果
    let aliased = Arc::new(Mix8WeightSet::Distinct {
        black: Arc::clone(&black_w),
        white: Arc::clone(&black_w),
    });

    let mut board = Board::new(15, Rule::Freestyle);
    let mut ev_shared = Mix8Evaluator::new(15, Rule::Freestyle, shared_set());
    let mut ev_aliased = Mix8Evaluator::new(15, Rule::Freestyle, aliased);
    let mut ev_distinct = Mix8Evaluator::new(15, Rule::Freestyle, distinct);

    for pos in [Pos::new(7, 7), Pos::new(8, 8), Pos::new(6, 8), Pos::new(7, 9)] {
        ev_shared.before_move(&board, pos);
        ev_aliased.before_move(&board, pos);
        ev_distinct.before_move(&board, pos);
        board.make_move(pos);
    }
    assert_eq!(board.side_to_move(), Color::Black);

    let v_shared = ev_shared.evaluate_value(&board);
    assert_eq!(ev_aliased.evaluate_value(&board), v_shared);

    // 黒視点: 自分は黒の重み、相手は白の重み
    let v_distinct = ev_distinct.evaluate_value(&board);
    let black_acc = {
        let mut a = Mix8Accumulator::new(15, Color::Black);
        a.refresh(&black_w, &board);
        a
    };
    let white_acc = {
        let mut a = Mix8Accumulator::new(15, Color::White);
        a.refresh(&white_w, &board);
        a
    };
    assert_eq!(v_distinct, black_acc.evaluate_value(&black_w, &white_w, &white_acc));
    assert_ne!(v_distinct, v_shared);

    drop(ev_distinct);
    assert_eq!(Arc::strong_count(&white_w), 1);
}

// =============================================================================
// 重みファイル
// =============================================================================

/// 書き出したファイルを読み戻すと同じ重みになる
#[test]
fn test_write_read_weights() {
    let mut w = Mix8Weights::new();
    w.mapping[0][0] = 123;
    w.mapping[SHAPE_NUM - 1][FEATURE_DIM - 1] = -77;
    w.map_prelu_weight[5] = 4096;
    w.feature_dwconv_weight[4][31] = -1000;
    w.value_sum_scale_after_conv = 0.25;
    w.value_sum_scale_direct = 0.125;
    let bucket = &mut w.buckets[0];
    bucket.policy_dwconv_weight[32][0] = 9;
    bucket.value_l1_weight[191][95] = 1.5;
    bucket.value_l3_bias = [0.1, 0.2, 0.3];
    bucket.policy_neg_weight = 0.25;
    bucket.policy_pos_weight = 1.0;

    let header = Mix8Header::universal("round trip");
    let mut bytes = Vec::with_capacity(SHAPE_NUM * FEATURE_DIM * 2 + (1 << 20));
    write_mix8(&mut bytes, &header, &w).unwrap();

    let (read_header, read) = read_mix8(&mut Cursor::new(bytes)).unwrap();
    assert_eq!(read_header, header);
    assert!(read.mapping == w.mapping);
    assert_eq!(read.map_prelu_weight, w.map_prelu_weight);
    assert_eq!(read.feature_dwconv_weight, w.feature_dwconv_weight);
    assert_eq!(read.value_sum_scale_after_conv, 0.25);
    assert_eq!(read.value_sum_scale_direct, 0.125);
    let rb = &read.buckets[0];
    assert_eq!(rb.policy_dwconv_weight[32][0], 9);
    assert_eq!(rb.value_l1_weight[191][95], 1.5);
    assert_eq!(rb.value_l3_bias, [0.1, 0.2, 0.3]);
    assert_eq!(rb.policy_neg_weight, 0.25);
    assert_eq!(rb.policy_pos_weight, 1.0);
}
