//! mix8 NNUE 評価器
//!
//! 五目並べ / 連珠用の差分更新型の量子化ネットワーク。
//!
//! # アーキテクチャ概要
//!
//! ```text
//! 升 × 4方向のライン形状（3^11 × 壁コード4）
//!          ↓ mapping [708588 → 96]（i16）
//!     4方向の和 mapSum [96] → PReLU
//!          ↓                         ↓
//!   ch 0..32: 3x3 depthwise conv   ch 32..96
//!          ↓ bias + ReLU             ↓
//!   ┌──────┴───────┐                 │
//!   ↓              ↓ 盤全体の和      ↓ 盤全体の和
//! Policy          value_sum [96]（自分側 + 相手側 = 192）
//! 星型 dwconv          ↓
//! (33 taps)       Value MLP 192 → 96 → 96 → 3（win / loss / draw）
//!   ↓
//! 動的 pointwise conv（重みは value 特徴から生成）→ PReLU → 空点ごとのスコア
//! ```
//!
//! - `weights`: 重み（1手番分）と手番ごとの所有形態
//! - `io`: 重みファイルの読み書き
//! - `accumulator`: 1手番視点の差分更新状態と value / policy ヘッド
//! - `evaluator`: 2つのアキュムレータと着手キャッシュ
//! - `policy`: policy の出力バッファ

mod accumulator;
mod aligned;
mod constants;
mod evaluator;
mod io;
mod policy;
mod weights;

pub use accumulator::{Mix8Accumulator, UpdateType, ValueSum};
pub use constants::*;
pub use evaluator::{Mix8Evaluator, ValueTuple};
pub use io::{load_mix8, read_mix8, save_mix8, write_mix8, Mix8Header, MIX8_MAGIC};
pub use policy::PolicyBuffer;
pub use weights::{HeadBucket, Mix8WeightSet, Mix8Weights};

#[cfg(test)]
mod tests;
