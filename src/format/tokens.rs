//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// 数字プレースホルダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DigitPlaceholder {
    /// `0`: 桁がなければ `0` で埋める
    Zero,
    /// `#`: 桁がなければ何も出力しない
    Hash,
    /// `?`: 桁がなければ空白で埋める
    Question,
}

/// 午前・午後表記
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AmPmStyle {
    /// `AM/PM`
    Full,
    /// `A/P`
    Short,
}

/// フォーマットトークン
///
/// Excel Number Format Stringを解析した際に生成されるトークンです。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（例: "yyyy" -> 4, "yy" -> 2）
    Year(usize),

    /// 月（"m" -> 1, "mm" -> 2, "mmm" -> 略称, "mmmm" -> 正式名称, "mmmmm" -> 頭文字）
    Month(usize),

    /// 日（"d" -> 1, "dd" -> 2, "ddd" -> 曜日略称, "dddd" -> 曜日）
    Day(usize),

    /// 時
    Hour(usize),

    /// 分（解析後に月トークンから変換される）
    Minute(usize),

    /// 秒
    Second(usize),

    /// 秒の小数部（例: "ss.00" の ".00" -> 2）
    SubSecond(usize),

    /// 午前・午後
    AmPm(AmPmStyle),

    /// 数字プレースホルダー（1文字ごとに1トークン）
    Digit(DigitPlaceholder),

    /// 小数点
    DecimalPoint,

    /// 千の位区切り（末尾に置かれた場合は1000での除算）
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// 指数表記（"E+" -> true, "E-" -> false）
    Exponent { show_plus: bool },

    /// リテラル文字列（例: "$", "-", " "）
    Literal(String),

    /// 色指定（例: "[Red]"）。出力では無視されます
    Color(String),

    /// テキストプレースホルダー（"@"）
    TextPlaceholder,
}

impl FormatToken {
    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::SubSecond(_)
                | FormatToken::AmPm(_)
        )
    }

    /// トークンが数値関連かどうかを判定
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FormatToken::Digit(_)
                | FormatToken::DecimalPoint
                | FormatToken::ThousandSeparator
                | FormatToken::Percent
                | FormatToken::Exponent { .. }
        )
    }

    pub fn is_digit(&self) -> bool {
        matches!(self, FormatToken::Digit(_))
    }
}
