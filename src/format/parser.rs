//! FormatParser Module
//!
//! Excel Number Format Stringの構文解析と、数値・日付・文字列への適用を提供します。

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::error::XlsxToCsvError;

use super::sections::{Comparison, Condition, FormatSection, SectionKind};
use super::tokens::{AmPmStyle, DigitPlaceholder, FormatToken};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// General書式で表示する有効桁数
const GENERAL_SIGNIFICANT_DIGITS: i32 = 15;

/// 解析済みのNumber Format
///
/// Excel Number Format Stringを解析し、セルの値を表示テキストに変換します。
#[derive(Debug, Clone)]
pub(crate) struct NumberFormat {
    /// パースされたセクション（General書式の場合は空）
    sections: Vec<FormatSection>,

    /// General書式かどうか
    general: bool,
}

impl NumberFormat {
    /// General書式
    pub fn general() -> Self {
        Self {
            sections: Vec::new(),
            general: true,
        }
    }

    /// フォーマット文字列をパース
    ///
    /// # 引数
    ///
    /// * `format_string` - Excel Number Format String
    ///
    /// # 戻り値
    ///
    /// * `Ok(Self)` - パース成功
    /// * `Err(XlsxToCsvError)` - ブラケットが閉じられていない場合
    pub fn parse(format_string: &str) -> Result<Self, XlsxToCsvError> {
        let trimmed = format_string.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("General") {
            return Ok(Self::general());
        }

        let mut sections = Vec::new();
        for (idx, section_str) in Self::split_sections(format_string).into_iter().enumerate() {
            let Some(kind) = SectionKind::from_index(idx) else {
                break;
            };
            sections.push(Self::parse_section(section_str, kind)?);
        }

        Ok(Self {
            sections,
            general: false,
        })
    }

    /// General書式かどうか
    pub fn is_general(&self) -> bool {
        self.general
    }

    /// セクションに分割
    ///
    /// 引用符・ブラケット内とバックスラッシュでエスケープされた `;` は区切りとみなしません。
    fn split_sections(format_string: &str) -> Vec<&str> {
        let mut sections = Vec::new();
        let mut start = 0;
        let mut in_quotes = false;
        let mut in_brackets = false;
        let mut escaped = false;

        for (idx, ch) in format_string.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' if !in_quotes => escaped = true,
                '"' if !in_brackets => in_quotes = !in_quotes,
                '[' if !in_quotes => in_brackets = true,
                ']' if !in_quotes => in_brackets = false,
                ';' if !in_quotes && !in_brackets => {
                    sections.push(&format_string[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        sections.push(&format_string[start..]);

        sections
    }

    /// セクションをパース
    fn parse_section(section_str: &str, kind: SectionKind) -> Result<FormatSection, XlsxToCsvError> {
        let chars: Vec<char> = section_str.chars().collect();
        let mut section = FormatSection::new(kind);
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            let mut advance = 1;

            match ch {
                '"' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == '"')
                        .map_or(chars.len(), |p| i + 1 + p);
                    let literal: String = chars[i + 1..end].iter().collect();
                    push_literal(&mut section.tokens, &literal);
                    advance = end + 1 - i;
                }
                '\\' => {
                    if let Some(&next) = chars.get(i + 1) {
                        push_literal(&mut section.tokens, &next.to_string());
                    }
                    advance = 2;
                }
                '_' => {
                    // 次の文字の幅の空白
                    push_literal(&mut section.tokens, " ");
                    advance = 2;
                }
                '*' => {
                    // 繰り返し文字（セル幅に依存するため出力しない）
                    advance = 2;
                }
                '[' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|p| i + 1 + p)
                        .ok_or_else(|| {
                            XlsxToCsvError::Config(format!(
                                "Invalid number format '{}': unterminated bracket",
                                section_str
                            ))
                        })?;
                    let content: String = chars[i + 1..end].iter().collect();
                    Self::parse_bracket(&content, &mut section);
                    advance = end + 1 - i;
                }
                '@' => section.tokens.push(FormatToken::TextPlaceholder),
                '0' => section.tokens.push(FormatToken::Digit(DigitPlaceholder::Zero)),
                '#' => section.tokens.push(FormatToken::Digit(DigitPlaceholder::Hash)),
                '?' => section
                    .tokens
                    .push(FormatToken::Digit(DigitPlaceholder::Question)),
                '.' => {
                    let zeros = chars[i + 1..].iter().take_while(|&&c| c == '0').count();
                    let after_seconds = section
                        .tokens
                        .iter()
                        .rev()
                        .find(|t| t.is_datetime())
                        .is_some_and(|t| matches!(t, FormatToken::Second(_)));
                    if zeros > 0 && after_seconds {
                        section.tokens.push(FormatToken::SubSecond(zeros));
                        advance = 1 + zeros;
                    } else {
                        section.tokens.push(FormatToken::DecimalPoint);
                    }
                }
                ',' => section.tokens.push(FormatToken::ThousandSeparator),
                '%' => section.tokens.push(FormatToken::Percent),
                'E' | 'e' if matches!(chars.get(i + 1).copied(), Some('+' | '-')) => {
                    section.tokens.push(FormatToken::Exponent {
                        show_plus: chars[i + 1] == '+',
                    });
                    advance = 2;
                }
                'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                    advance = run_length(&chars, i);
                    let token = match ch.to_ascii_lowercase() {
                        'y' => FormatToken::Year(advance),
                        'm' => FormatToken::Month(advance),
                        'd' => FormatToken::Day(advance),
                        'h' => FormatToken::Hour(advance),
                        _ => FormatToken::Second(advance),
                    };
                    section.tokens.push(token);
                }
                'a' | 'A' if starts_with_ignore_case(&chars[i..], "AM/PM") => {
                    section.tokens.push(FormatToken::AmPm(AmPmStyle::Full));
                    advance = 5;
                }
                'a' | 'A' if starts_with_ignore_case(&chars[i..], "A/P") => {
                    section.tokens.push(FormatToken::AmPm(AmPmStyle::Short));
                    advance = 3;
                }
                _ => push_literal(&mut section.tokens, &ch.to_string()),
            }

            i += advance;
        }

        resolve_minutes(&mut section.tokens);
        Ok(section)
    }

    /// ブラケット内の指定を解析（通貨・ロケール、条件、経過時間、色）
    fn parse_bracket(content: &str, section: &mut FormatSection) {
        if let Some(locale) = content.strip_prefix('$') {
            // [$€-407] の "€" 部分のみを出力
            let symbol = locale.split('-').next().unwrap_or_default();
            push_literal(&mut section.tokens, symbol);
        } else if let Some(condition) = Condition::parse(content) {
            section.condition = Some(condition);
        } else if !content.is_empty()
            && content
                .chars()
                .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
        {
            // 経過時間（[h], [mm], [ss]）は通常の時刻として扱う
            let width = content.chars().count();
            let token = match content.chars().next().map(|c| c.to_ascii_lowercase()) {
                Some('h') => FormatToken::Hour(width),
                Some('m') => FormatToken::Minute(width),
                _ => FormatToken::Second(width),
            };
            section.tokens.push(token);
        } else if !content.is_empty() {
            section.tokens.push(FormatToken::Color(content.to_string()));
        }
    }

    /// 数値をフォーマット
    ///
    /// # 引数
    ///
    /// * `value` - フォーマットする数値
    ///
    /// # 戻り値
    ///
    /// 表示テキスト
    pub fn format_number(&self, value: f64) -> String {
        if self.general {
            return format_general(value);
        }

        let Some((section, auto_sign)) = self.select_section(value) else {
            return format_general(value);
        };

        if section.is_datetime() {
            return match serial_to_datetime(value) {
                Some(dt) => render_datetime(section, dt),
                None => format_general(value),
            };
        }

        render_number(section, value, auto_sign)
    }

    /// 日付・時刻をフォーマット
    ///
    /// 日付書式を含まない場合は `m/d/yyyy`（時刻があれば `m/d/yyyy h:mm`）で表示します。
    pub fn format_datetime(&self, dt: NaiveDateTime) -> String {
        match self.sections.iter().find(|s| s.is_datetime()) {
            Some(section) => render_datetime(section, dt),
            None => default_datetime_text(dt),
        }
    }

    /// 文字列をフォーマット
    ///
    /// テキストセクションがない場合は文字列をそのまま返します。
    pub fn format_text(&self, text: &str) -> String {
        let Some(section) = self.sections.iter().find(|s| s.is_text()) else {
            return text.to_string();
        };

        let mut result = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::TextPlaceholder => result.push_str(text),
                FormatToken::Literal(literal) => result.push_str(literal),
                _ => {}
            }
        }
        result
    }

    /// 数値に適用するセクションを選択
    ///
    /// 戻り値の2番目は、負数に `-` を付ける必要があるかどうかです。
    fn select_section(&self, value: f64) -> Option<(&FormatSection, bool)> {
        let numeric: Vec<&FormatSection> = self.sections.iter().filter(|s| !s.is_text()).collect();

        if numeric.iter().any(|s| s.condition.is_some()) {
            for section in numeric.iter().copied() {
                match &section.condition {
                    Some(condition) if condition.matches(value) => {
                        let signed_by_condition = matches!(
                            condition.comparison,
                            Comparison::Less | Comparison::LessOrEqual
                        );
                        return Some((section, !signed_by_condition));
                    }
                    Some(_) => continue,
                    None => return Some((section, true)),
                }
            }
            return numeric.last().map(|s| (*s, true));
        }

        match numeric.len() {
            0 => None,
            1 => Some((numeric[0], true)),
            2 if value < 0.0 => Some((numeric[1], false)),
            2 => Some((numeric[0], true)),
            _ if value > 0.0 => Some((numeric[0], true)),
            _ if value < 0.0 => Some((numeric[1], false)),
            _ => Some((numeric[2], true)),
        }
    }
}

/// 直前のトークンがリテラルなら連結し、そうでなければ新しいリテラルを追加
fn push_literal(tokens: &mut Vec<FormatToken>, literal: &str) {
    if literal.is_empty() {
        return;
    }
    if let Some(FormatToken::Literal(last)) = tokens.last_mut() {
        last.push_str(literal);
    } else {
        tokens.push(FormatToken::Literal(literal.to_string()));
    }
}

/// 連続する同じ文字の数（大文字小文字を区別しない）
fn run_length(chars: &[char], start: usize) -> usize {
    let target = chars[start].to_ascii_lowercase();
    chars[start..]
        .iter()
        .take_while(|c| c.to_ascii_lowercase() == target)
        .count()
}

fn starts_with_ignore_case(chars: &[char], pattern: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    chars.len() >= pattern.len()
        && chars
            .iter()
            .zip(&pattern)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// `m` / `mm` のうち、時の直後または秒の直前にあるものを分に変換
fn resolve_minutes(tokens: &mut [FormatToken]) {
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            matches!(
                t,
                FormatToken::Year(_)
                    | FormatToken::Month(_)
                    | FormatToken::Day(_)
                    | FormatToken::Hour(_)
                    | FormatToken::Minute(_)
                    | FormatToken::Second(_)
            )
        })
        .map(|(idx, _)| idx)
        .collect();

    for (k, &idx) in positions.iter().enumerate() {
        let FormatToken::Month(width) = tokens[idx] else {
            continue;
        };
        if width > 2 {
            continue;
        }
        let after_hour = k > 0 && matches!(tokens[positions[k - 1]], FormatToken::Hour(_));
        let before_second = positions
            .get(k + 1)
            .is_some_and(|&next| matches!(tokens[next], FormatToken::Second(_)));
        if after_hour || before_second {
            tokens[idx] = FormatToken::Minute(width);
        }
    }
}

/// General書式で数値を表示（有効数字15桁）
pub(crate) fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }

    let exponent = value.abs().log10().floor() as i32;
    if !(-5..GENERAL_SIGNIFICANT_DIGITS).contains(&exponent) {
        let formatted = format!("{:.*e}", (GENERAL_SIGNIFICANT_DIGITS - 1) as usize, value);
        return match formatted.split_once('e') {
            Some((mantissa, exp)) => {
                let exp: i32 = exp.parse().unwrap_or(0);
                let sign = if exp < 0 { '-' } else { '+' };
                format!("{}E{}{:02}", trim_fraction(mantissa), sign, exp.abs())
            }
            None => formatted,
        };
    }

    let decimals = (GENERAL_SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value))
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

/// 四捨五入（0から遠い方向へ丸める）
fn round_half_away(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// 整数部に桁区切りを挿入
fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut result = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

fn empty_slot(kind: DigitPlaceholder) -> &'static str {
    match kind {
        DigitPlaceholder::Zero => "0",
        DigitPlaceholder::Question => " ",
        DigitPlaceholder::Hash => "",
    }
}

fn digit_kind(token: &FormatToken) -> Option<DigitPlaceholder> {
    match token {
        FormatToken::Digit(kind) => Some(*kind),
        _ => None,
    }
}

/// 整数部のトークンをそれぞれ文字列に変換
///
/// 桁は右端のプレースホルダーから順に割り当て、余った上位桁は最左の
/// プレースホルダーにまとめて出力します。
fn render_integer(tokens: &[FormatToken], digits: &str, grouping: bool) -> Vec<String> {
    let mut rendered: Vec<String> = tokens
        .iter()
        .map(|token| match token {
            FormatToken::Literal(literal) => literal.clone(),
            FormatToken::Percent => "%".to_string(),
            _ => String::new(),
        })
        .collect();

    let slots: Vec<(usize, DigitPlaceholder)> = tokens
        .iter()
        .enumerate()
        .filter_map(|(idx, t)| digit_kind(t).map(|kind| (idx, kind)))
        .collect();
    let Some(&(first_slot, _)) = slots.first() else {
        return rendered;
    };

    if grouping {
        let min_width = slots
            .iter()
            .filter(|(_, kind)| *kind == DigitPlaceholder::Zero)
            .count();
        let padded = format!("{:0>width$}", digits, width = min_width);
        rendered[first_slot] = group_thousands(&padded);
        return rendered;
    }

    let mut remaining: Vec<char> = digits.chars().collect();
    for (n, &(idx, kind)) in slots.iter().enumerate().rev() {
        rendered[idx] = if n == 0 {
            if remaining.is_empty() {
                empty_slot(kind).to_string()
            } else {
                remaining.drain(..).collect()
            }
        } else {
            match remaining.pop() {
                Some(digit) => digit.to_string(),
                None => empty_slot(kind).to_string(),
            }
        };
    }

    rendered
}

/// 小数部の桁をプレースホルダーに割り当てる（末尾の不要な0を除去）
fn render_fraction(slots: &[DigitPlaceholder], digits: &str) -> Vec<String> {
    let mut rendered: Vec<String> = digits.chars().map(|c| c.to_string()).collect();
    rendered.resize(slots.len(), String::new());

    for (idx, kind) in slots.iter().enumerate().rev() {
        if rendered[idx] != "0" || *kind == DigitPlaceholder::Zero {
            break;
        }
        rendered[idx] = empty_slot(*kind).to_string();
    }

    rendered
}

/// 指数表記の仮数部と指数を求める
fn scientific(magnitude: f64, int_slots: usize, decimals: usize) -> (f64, i32) {
    if magnitude == 0.0 {
        return (0.0, 0);
    }

    let step = int_slots.max(1) as i32;
    let mut exponent = magnitude.log10().floor() as i32;
    if step > 1 {
        exponent = exponent.div_euclid(step) * step;
    }

    let mut mantissa = round_half_away(magnitude / 10f64.powi(exponent), decimals);
    if mantissa >= 10f64.powi(step) {
        exponent += step;
        mantissa = round_half_away(magnitude / 10f64.powi(exponent), decimals);
    }

    (mantissa, exponent)
}

/// 数値セクションで数値を表示テキストに変換
fn render_number(section: &FormatSection, value: f64, auto_sign: bool) -> String {
    let tokens = &section.tokens;

    if !section.is_numeric() {
        // リテラルのみのセクション（例: "-" や空のゼロセクション）
        return tokens
            .iter()
            .filter_map(|t| match t {
                FormatToken::Literal(literal) => Some(literal.as_str()),
                _ => None,
            })
            .collect();
    }

    let exponent_idx = tokens
        .iter()
        .position(|t| matches!(t, FormatToken::Exponent { .. }));
    let mantissa_end = exponent_idx.unwrap_or(tokens.len());
    let point = tokens[..mantissa_end]
        .iter()
        .position(|t| matches!(t, FormatToken::DecimalPoint));
    let int_end = point.unwrap_or(mantissa_end);

    let first_int_digit = tokens[..int_end].iter().position(FormatToken::is_digit);
    let last_digit = tokens[..mantissa_end].iter().rposition(FormatToken::is_digit);

    let mut scale = 0;
    let mut grouping = false;
    for (idx, token) in tokens[..mantissa_end].iter().enumerate() {
        if !matches!(token, FormatToken::ThousandSeparator) {
            continue;
        }
        match (first_int_digit, last_digit) {
            (_, Some(last)) if idx > last => scale += 1,
            (Some(first), _) if idx > first && idx < int_end => grouping = true,
            _ => {}
        }
    }

    let percent = tokens
        .iter()
        .filter(|t| matches!(t, FormatToken::Percent))
        .count();
    let frac_slots: Vec<DigitPlaceholder> = point
        .map(|p| tokens[p + 1..mantissa_end].iter().filter_map(digit_kind).collect())
        .unwrap_or_default();
    let int_slots = tokens[..int_end].iter().filter(|t| t.is_digit()).count();

    let mut magnitude = value.abs() * 100f64.powi(percent as i32) / 1000f64.powi(scale);
    let mut exponent = 0;
    if exponent_idx.is_some() {
        (magnitude, exponent) = scientific(magnitude, int_slots, frac_slots.len());
    }

    let rounded = format!(
        "{:.*}",
        frac_slots.len(),
        round_half_away(magnitude, frac_slots.len())
    );
    let (int_str, frac_str) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let int_digits = if int_str == "0" { "" } else { int_str };
    let is_zero = rounded.chars().all(|c| c == '0' || c == '.');

    let int_rendered = render_integer(&tokens[..int_end], int_digits, grouping);
    let frac_rendered = render_fraction(&frac_slots, frac_str);

    let mut result = String::new();
    if auto_sign && value < 0.0 && !is_zero {
        result.push('-');
    }
    if int_slots == 0 {
        result.push_str(int_digits);
    }

    let mut frac_iter = frac_rendered.iter();
    for (idx, token) in tokens.iter().enumerate() {
        if idx < int_end {
            result.push_str(&int_rendered[idx]);
            continue;
        }
        let after_exponent = exponent_idx.is_some_and(|e| idx > e);
        match token {
            FormatToken::DecimalPoint if Some(idx) == point => result.push('.'),
            FormatToken::Digit(_) if !after_exponent => {
                if let Some(piece) = frac_iter.next() {
                    result.push_str(piece);
                }
            }
            FormatToken::Exponent { show_plus } => {
                let width = tokens[idx + 1..].iter().filter(|t| t.is_digit()).count();
                result.push('E');
                if exponent < 0 {
                    result.push('-');
                } else if *show_plus {
                    result.push('+');
                }
                result.push_str(&format!("{:0>width$}", exponent.abs(), width = width.max(1)));
            }
            FormatToken::Literal(literal) => result.push_str(literal),
            FormatToken::Percent => result.push('%'),
            _ => {}
        }
    }

    result
}

/// 秒未満を四捨五入
fn round_to_second(dt: NaiveDateTime) -> NaiveDateTime {
    let nanos = i64::from(dt.nanosecond());
    let truncated = dt
        .checked_sub_signed(Duration::nanoseconds(nanos))
        .unwrap_or(dt);
    if nanos >= 500_000_000 {
        truncated
            .checked_add_signed(Duration::seconds(1))
            .unwrap_or(truncated)
    } else {
        truncated
    }
}

/// 秒未満を `digits` 桁に四捨五入（繰り上がりは秒以上に反映）
fn round_to_subsecond(dt: NaiveDateTime, digits: usize) -> NaiveDateTime {
    let unit = 10i64.pow(9 - digits.min(9) as u32);
    let nanos = i64::from(dt.nanosecond());
    let rounded = (nanos + unit / 2) / unit * unit;
    dt.checked_add_signed(Duration::nanoseconds(rounded - nanos))
        .unwrap_or(dt)
}

/// 日付セクションで日付・時刻を表示テキストに変換
fn render_datetime(section: &FormatSection, dt: NaiveDateTime) -> String {
    let subsecond_digits = section
        .tokens
        .iter()
        .filter_map(|t| match t {
            FormatToken::SubSecond(width) => Some(*width),
            _ => None,
        })
        .max();
    let dt = match subsecond_digits {
        Some(digits) => round_to_subsecond(dt, digits),
        None => round_to_second(dt),
    };
    let twelve_hour = section
        .tokens
        .iter()
        .any(|t| matches!(t, FormatToken::AmPm(_)));

    let month_name = MONTH_NAMES[dt.month0() as usize];
    let weekday_name = WEEKDAY_NAMES[dt.weekday().num_days_from_monday() as usize];

    let mut result = String::new();
    for token in &section.tokens {
        match token {
            FormatToken::Year(width) if *width <= 2 => {
                result.push_str(&format!("{:02}", dt.year().rem_euclid(100)));
            }
            FormatToken::Year(_) => result.push_str(&format!("{:04}", dt.year())),
            FormatToken::Month(1) => result.push_str(&dt.month().to_string()),
            FormatToken::Month(2) => result.push_str(&format!("{:02}", dt.month())),
            FormatToken::Month(3) => result.push_str(&month_name[..3]),
            FormatToken::Month(5) => result.push_str(&month_name[..1]),
            FormatToken::Month(_) => result.push_str(month_name),
            FormatToken::Day(1) => result.push_str(&dt.day().to_string()),
            FormatToken::Day(2) => result.push_str(&format!("{:02}", dt.day())),
            FormatToken::Day(3) => result.push_str(&weekday_name[..3]),
            FormatToken::Day(_) => result.push_str(weekday_name),
            FormatToken::Hour(width) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                push_padded(&mut result, hour, *width);
            }
            FormatToken::Minute(width) => push_padded(&mut result, dt.minute(), *width),
            FormatToken::Second(width) => push_padded(&mut result, dt.second(), *width),
            FormatToken::SubSecond(width) => {
                let digits = format!("{:09}", dt.nanosecond());
                result.push('.');
                result.push_str(&digits[..(*width).min(9)]);
            }
            FormatToken::AmPm(style) => {
                let morning = dt.hour() < 12;
                let marker = match (style, morning) {
                    (AmPmStyle::Full, true) => "AM",
                    (AmPmStyle::Full, false) => "PM",
                    (AmPmStyle::Short, true) => "A",
                    (AmPmStyle::Short, false) => "P",
                };
                result.push_str(marker);
            }
            FormatToken::Literal(literal) => result.push_str(literal),
            FormatToken::ThousandSeparator => result.push(','),
            FormatToken::DecimalPoint => result.push('.'),
            _ => {}
        }
    }

    result
}

fn push_padded(result: &mut String, value: u32, width: usize) {
    if width >= 2 {
        result.push_str(&format!("{:02}", value));
    } else {
        result.push_str(&value.to_string());
    }
}

/// 日付書式が特定できない場合の表示（`m/d/yyyy` または `m/d/yyyy h:mm`）
pub(crate) fn default_datetime_text(dt: NaiveDateTime) -> String {
    let dt = round_to_second(dt);
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format("%-m/%-d/%Y").to_string()
    } else {
        dt.format("%-m/%-d/%Y %-H:%M").to_string()
    }
}

/// Excelのシリアル値（1900年基準）を日付・時刻に変換
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    // 1900年2月29日（実在しない日付）より前はシリアル値が1日ずれる
    let base = if serial < 60.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(code: &str, value: f64) -> String {
        NumberFormat::parse(code).unwrap().format_number(value)
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_split_sections() {
        let sections = NumberFormat::split_sections("#,##0;[Red]-#,##0;\"zero\";@");
        assert_eq!(sections, vec!["#,##0", "[Red]-#,##0", "\"zero\"", "@"]);

        let sections = NumberFormat::split_sections("0\";\"0");
        assert_eq!(sections.len(), 1);

        let sections = NumberFormat::split_sections("0;;");
        assert_eq!(sections, vec!["0", "", ""]);
    }

    #[test]
    fn test_general() {
        assert!(NumberFormat::parse("General").unwrap().is_general());
        assert!(NumberFormat::parse("").unwrap().is_general());
        assert!(!NumberFormat::parse("0.00").unwrap().is_general());
    }

    #[test]
    fn test_zero_padding_distributes_digits_from_the_right() {
        assert_eq!(format("00000", 1234.0), "01234");
        assert_eq!(format("00000", 123456.0), "123456");
        assert_eq!(format("000-0000", 5551234.0), "555-1234");
        assert_eq!(format("000-0000", 1234.0), "000-1234");
    }

    #[test]
    fn test_format_number_integer() {
        assert_eq!(format("0", 1234.6), "1235");
        assert_eq!(format("0", 2.5), "3");
        assert_eq!(format("0", 0.0), "0");
    }

    #[test]
    fn test_format_number_decimal() {
        assert_eq!(format("0.00", 3.14159), "3.14");
        assert_eq!(format("0.00", 3.0), "3.00");
        assert_eq!(format("0.0#", 1.5), "1.5");
        assert_eq!(format("0.0#", 1.25), "1.25");
        assert_eq!(format("#.##", 5.0), "5.");
        assert_eq!(format(".00", 0.5), ".50");
    }

    #[test]
    fn test_format_number_thousand_separator() {
        assert_eq!(format("#,##0", 1234567.0), "1,234,567");
        assert_eq!(format("#,##0", 5.0), "5");
        assert_eq!(format("#,##0", 0.0), "0");
        assert_eq!(format("#,##0.00", 1234.5), "1,234.50");
    }

    #[test]
    fn test_format_number_scaling() {
        assert_eq!(format("0.0,", 12345.0), "12.3");
        assert_eq!(format("#,##0,,\"M\"", 12_345_678.0), "12M");
    }

    #[test]
    fn test_format_number_percent() {
        assert_eq!(format("0%", 0.256), "26%");
        assert_eq!(format("0.00%", 0.5), "50.00%");
        assert_eq!(format("0%", -0.1), "-10%");
    }

    #[test]
    fn test_format_number_exponent() {
        assert_eq!(format("0.00E+00", 12345.0), "1.23E+04");
        assert_eq!(format("0.00E+00", 0.00012), "1.20E-04");
        assert_eq!(format("0.0E-0", 1500.0), "1.5E3");
        assert_eq!(format("0.00E+00", 9.999), "1.00E+01");
    }

    #[test]
    fn test_format_number_currency() {
        assert_eq!(format("\"$\"#,##0.00", 1234.5), "$1,234.50");
        assert_eq!(format("[$€-407]#,##0.00", 1234.5), "€1,234.50");
        assert_eq!(format("\"$\"#,##0.00", -1234.5), "-$1,234.50");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format("0.00", -3.14159), "-3.14");
        assert_eq!(format("#,##0;(#,##0)", -1234.0), "(1,234)");
        assert_eq!(format("#,##0;(#,##0)", 1234.0), "1,234");
        assert_eq!(format("0.00", -0.001), "0.00");
    }

    #[test]
    fn test_format_number_zero_section() {
        assert_eq!(format("0;-0;\"zero\"", 0.0), "zero");
        assert_eq!(format("0;-0;;@", 0.0), "");
        assert_eq!(format("0;-0;\"zero\"", -2.0), "-2");
    }

    #[test]
    fn test_format_number_padding_and_fill() {
        assert_eq!(format("0.00_);(0.00)", 1.5), "1.50 ");
        assert_eq!(format("0.00_);(0.00)", -1.5), "(1.50)");
        assert_eq!(format("* #,##0", 1234.0), "1,234");
    }

    #[test]
    fn test_format_number_conditions() {
        assert_eq!(format("[>100]\"big\";\"small\"", 150.0), "big");
        assert_eq!(format("[>100]\"big\";\"small\"", 50.0), "small");
        assert_eq!(format("[Red][<0]0.0;0", -1.25), "1.3");
    }

    #[test]
    fn test_format_color_ignored() {
        assert_eq!(format("[Red]0.00", 3.14159), "3.14");
        assert_eq!(format("[Blue]#,##0;[Red]-#,##0", -5.0), "-5");
    }

    #[test]
    fn test_format_unterminated_bracket() {
        assert!(NumberFormat::parse("[Red0.00").is_err());
    }

    #[test]
    fn test_format_text() {
        let fmt = NumberFormat::parse("@").unwrap();
        assert_eq!(fmt.format_text("Bob"), "Bob");
        assert_eq!(fmt.format_number(1.5), "1.5");

        let fmt = NumberFormat::parse("\"Name: \"@").unwrap();
        assert_eq!(fmt.format_text("Bob"), "Name: Bob");

        let fmt = NumberFormat::parse("0.00;-0.00;0;\"[\"@\"]\"").unwrap();
        assert_eq!(fmt.format_text("x"), "[x]");

        let fmt = NumberFormat::parse("0.00").unwrap();
        assert_eq!(fmt.format_text("plain"), "plain");
    }

    #[test]
    fn test_format_general_numbers() {
        assert_eq!(format_general(20.0), "20");
        assert_eq!(format_general(10.5), "10.5");
        assert_eq!(format_general(0.1 + 0.2), "0.3");
        assert_eq!(format_general(-1234.5), "-1234.5");
        assert_eq!(format_general(1e20), "1E+20");
        assert_eq!(format_general(1.5e-7), "1.5E-07");
        assert_eq!(format_general(123_456_789_012_345_678.0), "1.23456789012346E+17");
        assert_eq!(format_general(0.0), "0");
    }

    #[test]
    fn test_minute_disambiguation() {
        let fmt = NumberFormat::parse("h:mm").unwrap();
        assert_eq!(
            fmt.sections[0].tokens,
            vec![
                FormatToken::Hour(1),
                FormatToken::Literal(":".to_string()),
                FormatToken::Minute(2),
            ]
        );

        let fmt = NumberFormat::parse("mm:ss").unwrap();
        assert_eq!(fmt.sections[0].tokens[0], FormatToken::Minute(2));

        let fmt = NumberFormat::parse("mm/dd/yyyy").unwrap();
        assert_eq!(fmt.sections[0].tokens[0], FormatToken::Month(2));
    }

    #[test]
    fn test_format_date_patterns() {
        let dt = datetime(2021, 5, 3, 0, 0, 0);
        let render = |code: &str| NumberFormat::parse(code).unwrap().format_datetime(dt);

        assert_eq!(render("yyyy-mm-dd"), "2021-05-03");
        assert_eq!(render("m/d/yyyy"), "5/3/2021");
        assert_eq!(render("mm/dd/yyyy"), "05/03/2021");
        assert_eq!(render("dd-mmm-yy"), "03-May-21");
        assert_eq!(render("mmmm d, yyyy"), "May 3, 2021");
        assert_eq!(render("dd.mm.yyyy"), "03.05.2021");
        assert_eq!(render("dddd"), "Monday");
        assert_eq!(render("ddd mmmmm"), "Mon M");
        assert_eq!(render("yyyy\\-mm"), "2021-05");
        assert_eq!(render("[$-409]m/d/yyyy"), "5/3/2021");
    }

    #[test]
    fn test_format_time_patterns() {
        let dt = datetime(2021, 5, 3, 14, 5, 9);
        let render = |code: &str| NumberFormat::parse(code).unwrap().format_datetime(dt);

        assert_eq!(render("hh:mm:ss"), "14:05:09");
        assert_eq!(render("h:mm AM/PM"), "2:05 PM");
        assert_eq!(render("h:mm a/p"), "2:05 P");
        assert_eq!(render("yyyy-mm-dd hh:mm"), "2021-05-03 14:05");

        let midnight = datetime(2021, 5, 3, 0, 30, 0);
        let fmt = NumberFormat::parse("h:mm AM/PM").unwrap();
        assert_eq!(fmt.format_datetime(midnight), "12:30 AM");
    }

    #[test]
    fn test_format_subsecond_and_rounding() {
        let dt = datetime(2021, 5, 3, 10, 0, 0) + Duration::milliseconds(1_250);
        let fmt = NumberFormat::parse("hh:mm:ss.00").unwrap();
        assert_eq!(fmt.format_datetime(dt), "10:00:01.25");

        let almost = datetime(2021, 5, 3, 10, 0, 59) + Duration::milliseconds(999);
        let fmt = NumberFormat::parse("hh:mm:ss").unwrap();
        assert_eq!(fmt.format_datetime(almost), "10:01:00");
    }

    #[test]
    fn test_format_subsecond_carries_into_seconds() {
        let dt = datetime(2021, 5, 3, 0, 0, 0) + Duration::microseconds(999_600);
        let fmt = NumberFormat::parse("hh:mm:ss.000").unwrap();
        assert_eq!(fmt.format_datetime(dt), "00:00:01.000");

        let end_of_day = datetime(2021, 5, 3, 23, 59, 59) + Duration::microseconds(999_960);
        let fmt = NumberFormat::parse("yyyy-mm-dd hh:mm:ss.00").unwrap();
        assert_eq!(fmt.format_datetime(end_of_day), "2021-05-04 00:00:00.00");
    }

    #[test]
    fn test_format_number_with_date_format() {
        // 44319 = 2021-05-03
        assert_eq!(format("yyyy-mm-dd", 44319.0), "2021-05-03");
        assert_eq!(format("yyyy-mm-dd hh:mm", 44319.5), "2021-05-03 12:00");
    }

    #[test]
    fn test_format_datetime_without_date_tokens() {
        let fmt = NumberFormat::parse("0.00").unwrap();
        assert_eq!(fmt.format_datetime(datetime(2021, 5, 3, 0, 0, 0)), "5/3/2021");
        assert_eq!(
            fmt.format_datetime(datetime(2021, 5, 3, 9, 15, 0)),
            "5/3/2021 9:15"
        );
    }

    #[test]
    fn test_serial_to_datetime() {
        assert_eq!(
            serial_to_datetime(1.0),
            Some(datetime(1900, 1, 1, 0, 0, 0))
        );
        assert_eq!(
            serial_to_datetime(44197.0),
            Some(datetime(2021, 1, 1, 0, 0, 0))
        );
        assert_eq!(serial_to_datetime(-1.0), None);
    }
}
