//! Value formatting shared by the HTML and text renderers.

use serde_json::Value;

pub const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Leading decimal number of `text`, ignoring anything after it.
///
/// `" 12.5mm"` is 12.5; `"mm 12"` is not a number.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        let negative = bytes.first() == Some(&b'-');
        return Some(if negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

/// Fixed-point notation with halfway cases rounded away from zero.
pub fn to_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }

    let scale = 10f64.powi(decimals as i32);
    let scaled = value.abs() * scale;
    let formatted = if scaled.fract() == 0.5 {
        format!("{:.*}", decimals, (scaled.trunc() + 1.0) / scale)
    } else {
        format!("{:.*}", decimals, value.abs())
    };

    let is_zero = formatted.bytes().all(|b| b == b'0' || b == b'.');
    if value < 0.0 && !is_zero {
        format!("-{}", formatted)
    } else {
        formatted
    }
}

/// Two-decimal rendering for anything that reads as a number; other
/// values are shown as they are.
pub fn round_any(value: &Value) -> String {
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(|f| to_fixed(f, 2))
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => match parse_leading_float(s) {
            Some(f) => to_fixed(f, 2),
            None => s.clone(),
        },
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Coordinate box value: 6 decimals.
pub fn format_coord(value: f64) -> String {
    to_fixed(value, 6)
}

/// Map click value: 4 decimals.
pub fn format_click_coord(value: f64) -> String {
    to_fixed(value, 4)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Month named by the last `_` segment of a service key.
pub fn month_index(key: &str) -> Option<usize> {
    let suffix = key.rsplit('_').next()?;
    MONTHS.iter().position(|m| m.eq_ignore_ascii_case(suffix))
}

/// Stable sort putting month-suffixed keys in calendar order; keys without
/// a month keep their relative order after them.
pub fn sort_by_month<T>(items: &mut [T], key: impl Fn(&T) -> &str) {
    items.sort_by_key(|item| month_index(key(item)).unwrap_or(MONTHS.len()));
}

/// Upper-case first letter: `service` becomes `Service`.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
