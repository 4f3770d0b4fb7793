//! mix8 重み構造体
//!
//! 重みファイルから読み込んだ1手番分のパラメータを保持する。
//! 読み込み後は探索全体を通して読み取り専用で、ワーカー間で共有される。

use std::sync::Arc;

use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::aligned::AlignedBox;
use super::constants::*;
use crate::types::Color;

/// ヘッド（バケット）ごとの重み
#[derive(Clone)]
pub struct HeadBucket {
    /// Policy depthwise conv: i16[33][32]（中心 + 4方向 × ±4）
    pub policy_dwconv_weight: [[i16; POLICY_DIM]; POLICY_DWCONV_TAPS],
    /// Policy depthwise conv のバイアス
    pub policy_dwconv_bias: [i16; POLICY_DIM],

    /// Policy dynamic pointwise conv の重み生成層: f32[96][32]（in, out）
    pub policy_pwconv_weight_layer_weight: Box<[[f32; POLICY_DIM]]>,
    /// Policy dynamic pointwise conv の重み生成層のバイアス
    pub policy_pwconv_weight_layer_bias: [f32; POLICY_DIM],

    /// Value MLP layer1: f32[192][96]（in, out）
    pub value_l1_weight: Box<[[f32; VALUE_DIM]]>,
    pub value_l1_bias: [f32; VALUE_DIM],
    /// Value MLP layer2: f32[96][96]
    pub value_l2_weight: Box<[[f32; VALUE_DIM]]>,
    pub value_l2_bias: [f32; VALUE_DIM],
    /// Value MLP layer3: f32[96][3]
    pub value_l3_weight: Box<[[f32; VALUE_OUT]]>,
    pub value_l3_bias: [f32; VALUE_OUT],

    /// Policy PReLU（負側 / 正側の傾き）
    pub policy_neg_weight: f32,
    pub policy_pos_weight: f32,
}

impl HeadBucket {
    /// 新規作成（ゼロ初期化）
    pub fn new() -> Self {
        Self {
            policy_dwconv_weight: [[0; POLICY_DIM]; POLICY_DWCONV_TAPS],
            policy_dwconv_bias: [0; POLICY_DIM],
            policy_pwconv_weight_layer_weight: vec![[0.0; POLICY_DIM]; VALUE_DIM].into_boxed_slice(),
            policy_pwconv_weight_layer_bias: [0.0; POLICY_DIM],
            value_l1_weight: vec![[0.0; VALUE_DIM]; VALUE_DIM * 2].into_boxed_slice(),
            value_l1_bias: [0.0; VALUE_DIM],
            value_l2_weight: vec![[0.0; VALUE_DIM]; VALUE_DIM].into_boxed_slice(),
            value_l2_bias: [0.0; VALUE_DIM],
            value_l3_weight: vec![[0.0; VALUE_OUT]; VALUE_DIM].into_boxed_slice(),
            value_l3_bias: [0.0; VALUE_OUT],
            policy_neg_weight: 0.0,
            policy_pos_weight: 0.0,
        }
    }
}

impl Default for HeadBucket {
    fn default() -> Self {
        Self::new()
    }
}

/// mix8 の重み（1手番分）
#[derive(Clone)]
pub struct Mix8Weights {
    /// Mapping: i16[SHAPE_NUM][96]
    pub mapping: AlignedBox<[i16; FEATURE_DIM]>,
    /// Mapping 後の PReLU 負側の傾き（1.0 = 2^15）
    pub map_prelu_weight: [i16; FEATURE_DIM],
    /// 3x3 depthwise conv: i16[9][32]（タップは (dy+1)*3 + (dx+1)）
    pub feature_dwconv_weight: [[i16; FEATURE_DWCONV_DIM]; FEATURE_DWCONV_TAPS],
    pub feature_dwconv_bias: [i16; FEATURE_DWCONV_DIM],
    /// conv 経由の value 特徴和のスケール
    pub value_sum_scale_after_conv: f32,
    /// conv を通らない value 特徴和のスケール
    pub value_sum_scale_direct: f32,
    /// ヘッド（NUM_BUCKETS 個）
    pub buckets: Vec<HeadBucket>,
}

impl Mix8Weights {
    /// 新規作成（ゼロ初期化）
    ///
    /// mapping テーブルは約136MBあるため、ゼロページのまま確保する。
    pub fn new() -> Self {
        Self {
            mapping: AlignedBox::new_zeroed(SHAPE_NUM),
            map_prelu_weight: [0; FEATURE_DIM],
            feature_dwconv_weight: [[0; FEATURE_DWCONV_DIM]; FEATURE_DWCONV_TAPS],
            feature_dwconv_bias: [0; FEATURE_DWCONV_DIM],
            value_sum_scale_after_conv: 0.0,
            value_sum_scale_direct: 0.0,
            buckets: (0..NUM_BUCKETS).map(|_| HeadBucket::new()).collect(),
        }
    }

    /// 乱数で埋めた重みを作成
    ///
    /// 学習済み重みがない環境でのベンチマーク・テスト用。
    /// 量子化層は i16 の飽和が起きない程度の小さな値に抑える。
    pub fn random(seed: u64) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut w = Self::new();

        // mapping は要素数が多いので 1 回の乱数から 4 要素ずつ取り出す
        for row in w.mapping.iter_mut() {
            for chunk in row.chunks_mut(4) {
                let bits = rng.next_u64();
                for (i, v) in chunk.iter_mut().enumerate() {
                    *v = ((bits >> (16 * i)) as u16 % 513) as i16 - 256;
                }
            }
        }
        for v in w.map_prelu_weight.iter_mut() {
            *v = rng.random_range(0..=16384);
        }
        for tap in w.feature_dwconv_weight.iter_mut() {
            for v in tap.iter_mut() {
                *v = rng.random_range(-8192..=8192);
            }
        }
        for v in w.feature_dwconv_bias.iter_mut() {
            *v = rng.random_range(-64..=64);
        }
        w.value_sum_scale_after_conv = 1.0 / 64.0;
        w.value_sum_scale_direct = 1.0 / 256.0;

        for bucket in w.buckets.iter_mut() {
            for tap in bucket.policy_dwconv_weight.iter_mut() {
                for v in tap.iter_mut() {
                    *v = rng.random_range(-4096..=4096);
                }
            }
            for v in bucket.policy_dwconv_bias.iter_mut() {
                *v = rng.random_range(-64..=64);
            }
            fill_f32(&mut rng, bucket.policy_pwconv_weight_layer_weight.as_flattened_mut(), 0.1);
            fill_f32(&mut rng, &mut bucket.policy_pwconv_weight_layer_bias, 0.1);
            fill_f32(&mut rng, bucket.value_l1_weight.as_flattened_mut(), 0.1);
            fill_f32(&mut rng, &mut bucket.value_l1_bias, 0.1);
            fill_f32(&mut rng, bucket.value_l2_weight.as_flattened_mut(), 0.1);
            fill_f32(&mut rng, &mut bucket.value_l2_bias, 0.1);
            fill_f32(&mut rng, bucket.value_l3_weight.as_flattened_mut(), 0.1);
            fill_f32(&mut rng, &mut bucket.value_l3_bias, 0.1);
            bucket.policy_neg_weight = rng.random_range(0.0..0.5);
            bucket.policy_pos_weight = rng.random_range(0.5..1.5);
        }
        w
    }

    /// 使用するヘッド
    #[inline]
    pub fn bucket(&self, index: usize) -> &HeadBucket {
        &self.buckets[index]
    }
}

impl Default for Mix8Weights {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_f32<R: Rng>(rng: &mut R, dst: &mut [f32], range: f32) {
    for v in dst.iter_mut() {
        *v = rng.random_range(-range..range);
    }
}

/// 両手番の重み
///
/// 黒白で同じ重みを使う対称ネットワーク（`Shared`）と、
/// 手番ごとに別の重みを持つ非対称ネットワーク（`Distinct`）を明示的に区別する。
/// どちらも `Arc` で参照するため、解放は実体ごとに一度だけ行われる。
#[derive(Clone)]
pub enum Mix8WeightSet {
    /// 両手番で共通
    Shared(Arc<Mix8Weights>),
    /// 手番ごとに別
    Distinct {
        black: Arc<Mix8Weights>,
        white: Arc<Mix8Weights>,
    },
}

impl Mix8WeightSet {
    /// 指定手番の重み
    #[inline]
    pub fn side(&self, color: Color) -> &Mix8Weights {
        match self {
            Self::Shared(w) => w,
            Self::Distinct { black, white } => match color {
                Color::Black => black,
                Color::White => white,
            },
        }
    }

    /// 両手番で同じ重みか
    #[inline]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl std::ops::Index<Color> for Mix8WeightSet {
    type Output = Mix8Weights;

    #[inline]
    fn index(&self, color: Color) -> &Mix8Weights {
        self.side(color)
    }
}
