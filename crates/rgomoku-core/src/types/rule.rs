//! 対局ルール（Rule）

use serde::{Deserialize, Serialize};

/// 対局ルール
///
/// 探索パラメータの定数表はこの3ルールごとに持つ。
/// 禁手判定などの合法性はボード側の責務で、コアでは区別のタグとしてのみ使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Rule {
    /// 五連以上で勝ち
    Freestyle = 0,
    /// ちょうど五連で勝ち
    Standard = 1,
    /// 連珠（黒に禁手あり）
    Renju = 2,
}

impl Rule {
    /// ルールの数（RULE_NB）
    pub const NUM: usize = 3;

    /// 全ルール
    pub const ALL: [Rule; Rule::NUM] = [Rule::Freestyle, Rule::Standard, Rule::Renju];

    /// インデックスとして使用（定数表アクセス用）
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 重みファイルのルールマスク上のビット
    #[inline]
    pub const fn mask_bit(self) -> u32 {
        1 << (self as u32)
    }

    /// ルール名
    pub const fn name(self) -> &'static str {
        match self {
            Rule::Freestyle => "freestyle",
            Rule::Standard => "standard",
            Rule::Renju => "renju",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Rule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "freestyle" | "f" | "0" => Ok(Rule::Freestyle),
            "standard" | "s" | "1" => Ok(Rule::Standard),
            "renju" | "r" | "2" => Ok(Rule::Renju),
            _ => Err(format!("unknown rule: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_str() {
        assert_eq!("renju".parse::<Rule>(), Ok(Rule::Renju));
        assert_eq!("Standard".parse::<Rule>(), Ok(Rule::Standard));
        assert_eq!("0".parse::<Rule>(), Ok(Rule::Freestyle));
        assert!("caro".parse::<Rule>().is_err());
    }

    #[test]
    fn test_rule_mask_bits_are_distinct() {
        let mask = Rule::ALL.iter().fold(0u32, |m, r| m | r.mask_bit());
        assert_eq!(mask, 0b111);
    }
}
