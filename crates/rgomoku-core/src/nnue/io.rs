//! mix8 重みファイル I/O
//!
//! # フォーマット（リトルエンディアン）
//!
//! ```text
//! u32  magic            0xacd8cc6a
//! u32  arch_hash        constants::arch_hash()
//! u32  rule_mask        対応ルールのビット集合（Rule::mask_bit）
//! u32  board_size_mask  対応盤サイズのビット集合（サイズ s は bit s-1）
//! u32  desc_len
//! u8   description[desc_len]（UTF-8）
//! ---- 本体（Mix8Weights のフィールド順）
//! i16  mapping[SHAPE_NUM][96]
//! i16  map_prelu_weight[96]
//! i16  feature_dwconv_weight[9][32], feature_dwconv_bias[32]
//! f32  value_sum_scale_after_conv, value_sum_scale_direct
//! u8   padding[24]
//! ---- バケットごと
//! i16  policy_dwconv_weight[33][32], policy_dwconv_bias[32]
//! f32  policy_pwconv_weight_layer_weight[96][32], _bias[32]
//! f32  value_l1_weight[192][96], value_l1_bias[96]
//! f32  value_l2_weight[96][96],  value_l2_bias[96]
//! f32  value_l3_weight[96][3],   value_l3_bias[3]
//! f32  policy_neg_weight, policy_pos_weight
//! u8   padding[12]
//! ```
//!
//! 構造の不一致は読み込み時に一度だけ `InvalidData` として報告する。
//! 読み込み後に重みの内容を再検証することはない。

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use super::constants::*;
use super::weights::{HeadBucket, Mix8WeightSet, Mix8Weights};
use crate::types::{Rule, MAX_BOARD_SIZE};

/// ファイルマジックナンバー
pub const MIX8_MAGIC: u32 = 0xacd8_cc6a;

/// value sum スケールの後ろのパディング（32 bytes 境界）
const PADDING_AFTER_SCALES: usize = 24;
/// バケット末尾のパディング（32 bytes 境界）
const PADDING_AFTER_BUCKET: usize = 12;

/// 読み書き時のチャンクサイズ（要素数）
const CHUNK_ELEMS: usize = 1 << 15;

/// 説明文の最大長
const MAX_DESCRIPTION_LEN: u32 = 1 << 16;

/// 重みファイルのヘッダ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mix8Header {
    pub arch_hash: u32,
    pub rule_mask: u32,
    pub board_size_mask: u32,
    pub description: String,
}

impl Mix8Header {
    /// 全ルール・全盤サイズに対応するヘッダ
    pub fn universal(description: impl Into<String>) -> Self {
        Self {
            arch_hash: arch_hash(),
            rule_mask: Rule::ALL.iter().fold(0, |m, r| m | r.mask_bit()),
            board_size_mask: (1u32 << MAX_BOARD_SIZE) - 1,
            description: description.into(),
        }
    }

    /// ルールに対応しているか
    #[inline]
    pub fn supports_rule(&self, rule: Rule) -> bool {
        self.rule_mask & rule.mask_bit() != 0
    }

    /// 盤サイズに対応しているか
    #[inline]
    pub fn supports_board_size(&self, board_size: usize) -> bool {
        (1..=32).contains(&board_size) && self.board_size_mask & (1u32 << (board_size - 1)) != 0
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let magic = read_u32(reader)?;
        if magic != MIX8_MAGIC {
            return Err(invalid_data(format!("Invalid mix8 magic: {magic:#010x}")));
        }

        let arch_hash = read_u32(reader)?;
        if arch_hash != super::constants::arch_hash() {
            return Err(invalid_data(format!(
                "Architecture hash mismatch: {arch_hash:#010x}, expected {:#010x}",
                super::constants::arch_hash()
            )));
        }

        let rule_mask = read_u32(reader)?;
        let board_size_mask = read_u32(reader)?;

        let desc_len = read_u32(reader)?;
        if desc_len > MAX_DESCRIPTION_LEN {
            return Err(invalid_data(format!("Description too long: {desc_len} bytes")));
        }
        let mut desc = vec![0u8; desc_len as usize];
        reader.read_exact(&mut desc)?;
        let description = String::from_utf8(desc)
            .map_err(|e| invalid_data(format!("Description is not UTF-8: {e}")))?;

        Ok(Self {
            arch_hash,
            rule_mask,
            board_size_mask,
            description,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&MIX8_MAGIC.to_le_bytes())?;
        writer.write_all(&self.arch_hash.to_le_bytes())?;
        writer.write_all(&self.rule_mask.to_le_bytes())?;
        writer.write_all(&self.board_size_mask.to_le_bytes())?;
        writer.write_all(&(self.description.len() as u32).to_le_bytes())?;
        writer.write_all(self.description.as_bytes())
    }
}

/// 重みファイルを読み込み
pub fn read_mix8<R: Read>(reader: &mut R) -> io::Result<(Mix8Header, Mix8Weights)> {
    let header = Mix8Header::read(reader)?;
    let mut w = Mix8Weights::new();

    read_i16_into(reader, w.mapping.as_flattened_mut())?;
    read_i16_into(reader, &mut w.map_prelu_weight)?;
    read_i16_into(reader, w.feature_dwconv_weight.as_flattened_mut())?;
    read_i16_into(reader, &mut w.feature_dwconv_bias)?;
    let mut scales = [0f32; 2];
    read_f32_into(reader, &mut scales)?;
    w.value_sum_scale_after_conv = scales[0];
    w.value_sum_scale_direct = scales[1];
    skip_padding(reader, PADDING_AFTER_SCALES)?;

    for bucket in w.buckets.iter_mut() {
        read_bucket(reader, bucket)?;
    }

    Ok((header, w))
}

fn read_bucket<R: Read>(reader: &mut R, b: &mut HeadBucket) -> io::Result<()> {
    read_i16_into(reader, b.policy_dwconv_weight.as_flattened_mut())?;
    read_i16_into(reader, &mut b.policy_dwconv_bias)?;
    read_f32_into(reader, b.policy_pwconv_weight_layer_weight.as_flattened_mut())?;
    read_f32_into(reader, &mut b.policy_pwconv_weight_layer_bias)?;
    read_f32_into(reader, b.value_l1_weight.as_flattened_mut())?;
    read_f32_into(reader, &mut b.value_l1_bias)?;
    read_f32_into(reader, b.value_l2_weight.as_flattened_mut())?;
    read_f32_into(reader, &mut b.value_l2_bias)?;
    read_f32_into(reader, b.value_l3_weight.as_flattened_mut())?;
    read_f32_into(reader, &mut b.value_l3_bias)?;
    let mut prelu = [0f32; 2];
    read_f32_into(reader, &mut prelu)?;
    b.policy_neg_weight = prelu[0];
    b.policy_pos_weight = prelu[1];
    skip_padding(reader, PADDING_AFTER_BUCKET)
}

/// 重みファイルを書き出し
pub fn write_mix8<W: Write>(writer: &mut W, header: &Mix8Header, w: &Mix8Weights) -> io::Result<()> {
    header.write(writer)?;

    write_i16s(writer, w.mapping.as_flattened())?;
    write_i16s(writer, &w.map_prelu_weight)?;
    write_i16s(writer, w.feature_dwconv_weight.as_flattened())?;
    write_i16s(writer, &w.feature_dwconv_bias)?;
    write_f32s(writer, &[w.value_sum_scale_after_conv, w.value_sum_scale_direct])?;
    writer.write_all(&[0u8; PADDING_AFTER_SCALES])?;

    for b in &w.buckets {
        write_i16s(writer, b.policy_dwconv_weight.as_flattened())?;
        write_i16s(writer, &b.policy_dwconv_bias)?;
        write_f32s(writer, b.policy_pwconv_weight_layer_weight.as_flattened())?;
        write_f32s(writer, &b.policy_pwconv_weight_layer_bias)?;
        write_f32s(writer, b.value_l1_weight.as_flattened())?;
        write_f32s(writer, &b.value_l1_bias)?;
        write_f32s(writer, b.value_l2_weight.as_flattened())?;
        write_f32s(writer, &b.value_l2_bias)?;
        write_f32s(writer, b.value_l3_weight.as_flattened())?;
        write_f32s(writer, &b.value_l3_bias)?;
        write_f32s(writer, &[b.policy_neg_weight, b.policy_pos_weight])?;
        writer.write_all(&[0u8; PADDING_AFTER_BUCKET])?;
    }
    Ok(())
}

/// ファイルから読み込み、ルールと盤サイズへの対応を確認する
pub fn load_mix8<P: AsRef<Path>>(path: P, rule: Rule, board_size: usize) -> io::Result<Mix8Weights> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let (header, weights) = read_mix8(&mut reader)?;

    if !header.supports_rule(rule) {
        log::warn!("{}: rule mask {:#05b} does not include {rule}", path.display(), header.rule_mask);
        return Err(invalid_data(format!("{} does not support rule {rule}", path.display())));
    }
    if !header.supports_board_size(board_size) {
        log::warn!(
            "{}: board size mask {:#x} does not include {board_size}",
            path.display(),
            header.board_size_mask
        );
        return Err(invalid_data(format!(
            "{} does not support board size {board_size}",
            path.display()
        )));
    }

    log::info!("loaded mix8 weights from {} ({})", path.display(), header.description);
    Ok(weights)
}

/// ファイルへ書き出し
pub fn save_mix8<P: AsRef<Path>>(path: P, header: &Mix8Header, weights: &Mix8Weights) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_mix8(&mut writer, header, weights)?;
    writer.flush()
}

impl Mix8WeightSet {
    /// 両手番共通の重みファイルを読み込み
    pub fn load_shared<P: AsRef<Path>>(path: P, rule: Rule, board_size: usize) -> io::Result<Self> {
        Ok(Self::Shared(Arc::new(load_mix8(path, rule, board_size)?)))
    }

    /// 手番ごとの重みファイルを読み込み
    pub fn load_distinct<P: AsRef<Path>, Q: AsRef<Path>>(
        black: P,
        white: Q,
        rule: Rule,
        board_size: usize,
    ) -> io::Result<Self> {
        Ok(Self::Distinct {
            black: Arc::new(load_mix8(black, rule, board_size)?),
            white: Arc::new(load_mix8(white, rule, board_size)?),
        })
    }
}

fn invalid_data(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn skip_padding<R: Read>(reader: &mut R, len: usize) -> io::Result<()> {
    let mut buf = [0u8; 32];
    reader.read_exact(&mut buf[..len])
}

fn read_i16_into<R: Read>(reader: &mut R, dst: &mut [i16]) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_ELEMS.min(dst.len()) * 2];
    for chunk in dst.chunks_mut(CHUNK_ELEMS) {
        let bytes = &mut buf[..chunk.len() * 2];
        reader.read_exact(bytes)?;
        for (v, b) in chunk.iter_mut().zip(bytes.chunks_exact(2)) {
            *v = i16::from_le_bytes([b[0], b[1]]);
        }
    }
    Ok(())
}

fn read_f32_into<R: Read>(reader: &mut R, dst: &mut [f32]) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_ELEMS.min(dst.len()) * 4];
    for chunk in dst.chunks_mut(CHUNK_ELEMS) {
        let bytes = &mut buf[..chunk.len() * 4];
        reader.read_exact(bytes)?;
        for (v, b) in chunk.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        }
    }
    Ok(())
}

fn write_i16s<W: Write>(writer: &mut W, src: &[i16]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(CHUNK_ELEMS.min(src.len()) * 2);
    for chunk in src.chunks(CHUNK_ELEMS) {
        buf.clear();
        for v in chunk {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        writer.write_all(&buf)?;
    }
    Ok(())
}

fn write_f32s<W: Write>(writer: &mut W, src: &[f32]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(CHUNK_ELEMS.min(src.len()) * 4);
    for chunk in src.chunks(CHUNK_ELEMS) {
        buf.clear();
        for v in chunk {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        writer.write_all(&buf)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header_bytes(magic: u32, hash: u32, rule_mask: u32, size_mask: u32, desc: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&magic.to_le_bytes());
        out.extend_from_slice(&hash.to_le_bytes());
        out.extend_from_slice(&rule_mask.to_le_bytes());
        out.extend_from_slice(&size_mask.to_le_bytes());
        out.extend_from_slice(&(desc.len() as u32).to_le_bytes());
        out.extend_from_slice(desc.as_bytes());
        out
    }

    #[test]
    fn test_header_parse() {
        let bytes = header_bytes(MIX8_MAGIC, arch_hash(), 0b101, 1 << 14, "mix8 test");
        let header = Mix8Header::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.description, "mix8 test");
        assert!(header.supports_rule(Rule::Freestyle));
        assert!(!header.supports_rule(Rule::Standard));
        assert!(header.supports_rule(Rule::Renju));
        assert!(header.supports_board_size(15));
        assert!(!header.supports_board_size(20));
    }

    #[test]
    fn test_header_invalid_magic() {
        let bytes = header_bytes(0xdead_beef, arch_hash(), 0b111, !0, "");
        assert!(Mix8Header::read(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_header_arch_hash_mismatch() {
        let bytes = header_bytes(MIX8_MAGIC, arch_hash() ^ 1, 0b111, !0, "");
        let err = Mix8Header::read(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_body_is_rejected() {
        let mut bytes = header_bytes(MIX8_MAGIC, arch_hash(), 0b111, !0, "truncated");
        bytes.extend_from_slice(&[0u8; 1024]);
        let err = read_mix8(&mut Cursor::new(bytes)).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_universal_header_supports_everything() {
        let header = Mix8Header::universal("all");
        for rule in Rule::ALL {
            assert!(header.supports_rule(rule));
        }
        for size in 1..=MAX_BOARD_SIZE {
            assert!(header.supports_board_size(size));
        }
        assert!(!header.supports_board_size(MAX_BOARD_SIZE + 1));
    }
}
