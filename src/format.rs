use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike};

/// Shown wherever a value is absent or cannot be computed.
pub const PLACEHOLDER: &str = "\u{2014}";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn month_abbrev(month0: u32) -> &'static str {
    MONTHS[(month0 as usize) % 12]
}

/// `19 Oct 2026 at 09:05` in whatever zone `dt` carries.
pub fn format_long_date<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    format!(
        "{} {} {} at {:02}:{:02}",
        dt.day(),
        month_abbrev(dt.month0()),
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

/// Calendar date from a `YYYY-MM-DD` string, no zone shift. Absent, empty or
/// unparsable input yields the placeholder.
pub fn format_short_date(date: Option<&str>) -> String {
    let Some(s) = date.map(str::trim).filter(|s| !s.is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => format!("{} {} {}", d.day(), month_abbrev(d.month0()), d.year()),
        Err(_) => PLACEHOLDER.to_string(),
    }
}

/// Round half up, like the browser's `Math.round`.
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Whole percent of a fraction: `0.456` -> `46%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{}%", whole(round_half_up(fraction * 100.0)))
}

/// `+` for zero or positive values; negatives already carry their sign.
pub fn format_signed_delta(value: f64) -> String {
    let shown = format_number(value);
    if value >= 0.0 || shown == "0" { format!("+{}", shown) } else { shown }
}

/// Signed whole percent of a fraction: `0.05` -> `+5%`.
pub fn format_signed_percent(fraction: f64) -> String {
    format!("{}%", format_signed_delta(round_half_up(fraction * 100.0)))
}

/// Integers without a decimal point, everything else as-is.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        whole(value)
    } else {
        format!("{}", value)
    }
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn whole(v: f64) -> String {
    // `+ 0.0` folds negative zero
    format!("{}", (v + 0.0) as i64)
}
