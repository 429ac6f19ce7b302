//! FormatSection Module
//!
//! Excel Number Format Stringのセクション定義を提供します。

use super::tokens::FormatToken;

/// セクションの種類（定義順で決まる）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// 正数（単一セクションの場合はすべての数値）
    Positive,
    /// 負数
    Negative,
    /// ゼロ
    Zero,
    /// テキスト
    Text,
}

impl SectionKind {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SectionKind::Positive),
            1 => Some(SectionKind::Negative),
            2 => Some(SectionKind::Zero),
            3 => Some(SectionKind::Text),
            _ => None,
        }
    }
}

/// 比較演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
}

/// 条件（例: `[>100]`, `[<=0]`）
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    pub comparison: Comparison,
    pub threshold: f64,
}

impl Condition {
    /// ブラケット内の文字列（`>100` など）を解析
    pub fn parse(content: &str) -> Option<Self> {
        let (comparison, rest) = if let Some(rest) = content.strip_prefix("<=") {
            (Comparison::LessOrEqual, rest)
        } else if let Some(rest) = content.strip_prefix(">=") {
            (Comparison::GreaterOrEqual, rest)
        } else if let Some(rest) = content.strip_prefix("<>") {
            (Comparison::NotEqual, rest)
        } else if let Some(rest) = content.strip_prefix('<') {
            (Comparison::Less, rest)
        } else if let Some(rest) = content.strip_prefix('>') {
            (Comparison::Greater, rest)
        } else if let Some(rest) = content.strip_prefix('=') {
            (Comparison::Equal, rest)
        } else {
            return None;
        };

        let threshold = rest.trim().parse::<f64>().ok()?;
        Some(Self {
            comparison,
            threshold,
        })
    }

    pub fn matches(&self, value: f64) -> bool {
        match self.comparison {
            Comparison::Less => value < self.threshold,
            Comparison::LessOrEqual => value <= self.threshold,
            Comparison::Greater => value > self.threshold,
            Comparison::GreaterOrEqual => value >= self.threshold,
            Comparison::Equal => value == self.threshold,
            Comparison::NotEqual => value != self.threshold,
        }
    }
}

/// フォーマットのセクション（正数、負数、ゼロ、テキスト）
///
/// Excel Number Format Stringは `;` で最大4つのセクションに分割されます。
#[derive(Debug, Clone)]
pub(crate) struct FormatSection {
    /// セクションの種類
    pub kind: SectionKind,

    /// 条件（例: `[>100]`）
    pub condition: Option<Condition>,

    /// フォーマットトークン
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    /// 新しいセクションを生成
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            condition: None,
            tokens: Vec::new(),
        }
    }

    /// セクションが日付・時刻書式かどうかを判定
    pub fn is_datetime(&self) -> bool {
        self.tokens.iter().any(FormatToken::is_datetime)
    }

    /// セクションが数値書式かどうかを判定
    pub fn is_numeric(&self) -> bool {
        self.tokens.iter().any(FormatToken::is_numeric)
    }

    /// テキスト用のセクションかどうか（4番目のセクション、または `@` を含む）
    pub fn is_text(&self) -> bool {
        self.kind == SectionKind::Text
            || self
                .tokens
                .iter()
                .any(|t| matches!(t, FormatToken::TextPlaceholder))
    }
}
