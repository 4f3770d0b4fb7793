//! mix8 ネットワークの定数
//!
//! 重みファイルのレイアウトと推論の量子化スケールはすべてここで決まる。

/// アーキテクチャハッシュの基準値
pub const ARCH_HASH_BASE: u32 = 0x0071_2850;

/// バッファのアラインメント（bytes）
pub const ALIGNMENT: usize = 32;

/// ライン形状の長さ（注目升 ± 5）
pub const LINE_LENGTH: usize = 11;

/// ライン形状の片側の長さ
pub const HALF_LINE_LENGTH: usize = LINE_LENGTH / 2;

/// 壁を含まない形状の数（3^11）
pub const SHAPES_PER_WALL_CODE: usize = 177_147;

/// 壁コードの数（なし / 負方向 / 正方向 / 両側）
pub const WALL_CODE_NUM: usize = 4;

/// 形状インデックスの総数
pub const SHAPE_NUM: usize = SHAPES_PER_WALL_CODE * WALL_CODE_NUM;

/// 方向の数（横・縦・右下がり・右上がり）
pub const DIRECTION_NUM: usize = 4;

/// 方向ベクトル（dx, dy）
pub const DIRECTIONS: [(i32, i32); DIRECTION_NUM] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// 3 のべき乗（ライン上の位置ごとの桁の重み）
pub const POW3: [u32; LINE_LENGTH] = {
    let mut table = [1u32; LINE_LENGTH];
    let mut i = 1;
    while i < LINE_LENGTH {
        table[i] = table[i - 1] * 3;
        i += 1;
    }
    table
};

/// Policy 特徴の次元
pub const POLICY_DIM: usize = 32;

/// Value 特徴の次元
pub const VALUE_DIM: usize = 96;

/// Mapping 出力の次元（max(POLICY_DIM, VALUE_DIM)）
pub const FEATURE_DIM: usize = if POLICY_DIM > VALUE_DIM { POLICY_DIM } else { VALUE_DIM };

/// 3x3 depthwise conv を通す特徴の次元（先頭チャネル）
pub const FEATURE_DWCONV_DIM: usize = 32;

/// 3x3 depthwise conv のタップ数
pub const FEATURE_DWCONV_TAPS: usize = 9;

/// ヘッドのバケット数（この構成では 1 固定）
pub const NUM_BUCKETS: usize = 1;

/// Policy depthwise conv の片側の長さ（4方向 × ±4 + 中心）
pub const POLICY_KERNEL_RADIUS: usize = 4;

/// Policy depthwise conv のタップ数
pub const POLICY_DWCONV_TAPS: usize = 1 + DIRECTION_NUM * 2 * POLICY_KERNEL_RADIUS;

/// Value MLP の出力（win / loss / draw）
pub const VALUE_OUT: usize = 3;

/// 整数 PReLU / conv の固定小数点シフト（重み 1.0 = 2^15）
pub const WEIGHT_SHIFT: u32 = 15;

/// Policy conv 出力を float に戻すスケール
pub const POLICY_FEATURE_SCALE: f32 = 1.0 / 256.0;

const _: () = assert!(SHAPE_NUM == 708_588);
const _: () = assert!(POW3[LINE_LENGTH - 1] as usize * 3 == SHAPES_PER_WALL_CODE);
const _: () = assert!(FEATURE_DWCONV_DIM <= FEATURE_DIM && POLICY_DIM <= FEATURE_DWCONV_DIM);
const _: () = assert!(POLICY_DWCONV_TAPS == 33);

/// アーキテクチャハッシュ
///
/// 次元が変わるとハッシュも変わるので、異なる構成の重みファイルを読み込み時に弾ける。
pub const fn arch_hash() -> u32 {
    ARCH_HASH_BASE ^ ((VALUE_DIM as u32) << 16) ^ ((POLICY_DIM as u32) << 8) ^ (NUM_BUCKETS as u32)
}
