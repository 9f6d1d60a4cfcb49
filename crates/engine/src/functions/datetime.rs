//! Date/time values and the functions over them.
//!
//! Lexical forms follow ISO 8601. Values stay in their lexical form inside
//! [`AtomicValue`]; this module parses them into component structs on
//! demand and serializes results back to canonical strings.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use sylva_tree::TreeNode;

use super::{Arity, arg_atomic, check_arity};
use crate::error::{EngineError, ErrorKind};
use crate::types::{AtomicValue, Value};

/// xs:dateTime
#[derive(Debug, Clone, PartialEq)]
pub struct DateTime {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
    pub timezone: Option<Timezone>,
}

/// xs:date
#[derive(Debug, Clone, PartialEq)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub timezone: Option<Timezone>,
}

/// xs:time
#[derive(Debug, Clone, PartialEq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
    pub timezone: Option<Timezone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone {
    pub offset_minutes: i32,
}

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(-?\d{4,})-(\d{2})-(\d{2})T(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$",
    )
    .expect("BUG: invalid DATETIME_RE regex literal")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?\d{4,})-(\d{2})-(\d{2})(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid DATE_RE regex literal")
});

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:\d{2})?$")
        .expect("BUG: invalid TIME_RE regex literal")
});

impl Timezone {
    pub fn parse(s: &str) -> Option<Self> {
        if s == "Z" {
            return Some(Timezone { offset_minutes: 0 });
        }
        let sign = match s.as_bytes().first()? {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        let (hours, minutes) = s[1..].split_once(':')?;
        let hours: i32 = hours.parse().ok()?;
        let minutes: i32 = minutes.parse().ok()?;
        if hours > 14 || minutes > 59 {
            return None;
        }
        Some(Timezone {
            offset_minutes: sign * (hours * 60 + minutes),
        })
    }

    /// The equivalent dayTimeDuration lexical form, e.g. `-PT5H30M`.
    pub fn to_duration_string(&self) -> String {
        if self.offset_minutes == 0 {
            return "PT0S".to_string();
        }
        let sign = if self.offset_minutes < 0 { "-" } else { "" };
        let abs = self.offset_minutes.abs();
        let hours = abs / 60;
        let minutes = abs % 60;
        let mut out = format!("{}PT", sign);
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        out
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset_minutes == 0 {
            return write!(f, "Z");
        }
        let sign = if self.offset_minutes < 0 { '-' } else { '+' };
        let abs = self.offset_minutes.abs();
        write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

fn format_second(second: f64) -> String {
    if second.fract() == 0.0 {
        format!("{:02}", second as u8)
    } else {
        let mut s = format!("{:09.6}", second);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

fn tz_suffix(timezone: &Option<Timezone>) -> String {
    timezone.map(|tz| tz.to_string()).unwrap_or_default()
}

impl DateTime {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = DATETIME_RE.captures(s.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let day: u8 = caps.get(3)?.as_str().parse().ok()?;
        let hour: u8 = caps.get(4)?.as_str().parse().ok()?;
        let minute: u8 = caps.get(5)?.as_str().parse().ok()?;
        let second: f64 = caps.get(6)?.as_str().parse().ok()?;
        let timezone = caps.get(7).and_then(|m| Timezone::parse(m.as_str()));

        if !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
            || hour > 24
            || minute > 59
            || second >= 60.0
        {
            return None;
        }
        Some(DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            timezone,
        })
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{}{}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            format_second(self.second),
            tz_suffix(&self.timezone)
        )
    }
}

impl Date {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = DATE_RE.captures(s.trim())?;
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u8 = caps.get(2)?.as_str().parse().ok()?;
        let day: u8 = caps.get(3)?.as_str().parse().ok()?;
        let timezone = caps.get(4).and_then(|m| Timezone::parse(m.as_str()));

        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Date {
            year,
            month,
            day,
            timezone,
        })
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}{}",
            self.year,
            self.month,
            self.day,
            tz_suffix(&self.timezone)
        )
    }
}

impl Time {
    pub fn parse(s: &str) -> Option<Self> {
        let caps = TIME_RE.captures(s.trim())?;
        let hour: u8 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u8 = caps.get(2)?.as_str().parse().ok()?;
        let second: f64 = caps.get(3)?.as_str().parse().ok()?;
        let timezone = caps.get(4).and_then(|m| Timezone::parse(m.as_str()));

        if hour > 24 || minute > 59 || second >= 60.0 {
            return None;
        }
        Some(Time {
            hour,
            minute,
            second,
            timezone,
        })
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{}{}",
            self.hour,
            self.minute,
            format_second(self.second),
            tz_suffix(&self.timezone)
        )
    }
}

fn date_arg<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<Date, EngineError> {
    let atom = arg_atomic(function, position, args)?;
    let lexical = match &atom {
        AtomicValue::Date(s) => s.clone(),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
        other => {
            return Err(EngineError::argument(
                function,
                position,
                "xs:date",
                other.type_name(),
            ));
        }
    };
    Date::parse(&lexical).ok_or_else(|| {
        EngineError::argument(function, position, "xs:date", format!("'{}'", lexical))
    })
}

fn time_arg<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<Time, EngineError> {
    let atom = arg_atomic(function, position, args)?;
    let lexical = match &atom {
        AtomicValue::Time(s) => s.clone(),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
        other => {
            return Err(EngineError::argument(
                function,
                position,
                "xs:time",
                other.type_name(),
            ));
        }
    };
    Time::parse(&lexical).ok_or_else(|| {
        EngineError::argument(function, position, "xs:time", format!("'{}'", lexical))
    })
}

fn datetime_arg<'a, N: TreeNode<'a> + 'a>(
    function: &str,
    position: usize,
    args: &[Value<N>],
) -> Result<DateTime, EngineError> {
    let atom = arg_atomic(function, position, args)?;
    let lexical = match &atom {
        AtomicValue::DateTime(s) => s.clone(),
        AtomicValue::String(s) | AtomicValue::UntypedAtomic(s) => s.clone(),
        other => {
            return Err(EngineError::argument(
                function,
                position,
                "xs:dateTime",
                other.type_name(),
            ));
        }
    };
    DateTime::parse(&lexical).ok_or_else(|| {
        EngineError::argument(function, position, "xs:dateTime", format!("'{}'", lexical))
    })
}

/// fn:dateTime($date, $time): combines a date and a time into a dateTime.
/// When both carry a timezone the zones must agree; differing zones are the
/// inconsistent-timezone error.
pub fn fn_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:dateTime", args.len(), Arity::Exact(2))?;
    if args[0].is_empty() || args[1].is_empty() {
        return Ok(Value::empty());
    }
    let date = date_arg("fn:dateTime", 1, &args)?;
    let time = time_arg("fn:dateTime", 2, &args)?;

    let timezone = match (date.timezone, time.timezone) {
        (Some(d), Some(t)) => {
            if d != t {
                return Err(EngineError::new(ErrorKind::InconsistentTimezone {
                    left: d.to_string(),
                    right: t.to_string(),
                }));
            }
            Some(d)
        }
        (tz, None) | (None, tz) => tz,
    };

    let combined = DateTime {
        year: date.year,
        month: date.month,
        day: date.day,
        hour: time.hour,
        minute: time.minute,
        second: time.second,
        timezone,
    };
    Ok(Value::from_atomic(AtomicValue::DateTime(
        combined.to_string(),
    )))
}

fn empty_guard<N: Clone>(args: &[Value<N>]) -> bool {
    args[0].is_empty()
}

pub fn fn_year_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:year-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:year-from-dateTime", 1, &args)?;
    Ok(Value::from_integer(dt.year as i64))
}

pub fn fn_month_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:month-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:month-from-dateTime", 1, &args)?;
    Ok(Value::from_integer(dt.month as i64))
}

pub fn fn_day_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:day-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:day-from-dateTime", 1, &args)?;
    Ok(Value::from_integer(dt.day as i64))
}

pub fn fn_hours_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:hours-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:hours-from-dateTime", 1, &args)?;
    Ok(Value::from_integer(dt.hour as i64))
}

pub fn fn_minutes_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:minutes-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:minutes-from-dateTime", 1, &args)?;
    Ok(Value::from_integer(dt.minute as i64))
}

pub fn fn_seconds_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:seconds-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:seconds-from-dateTime", 1, &args)?;
    Ok(Value::from_double(dt.second))
}

pub fn fn_timezone_from_datetime<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:timezone-from-dateTime", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let dt = datetime_arg("fn:timezone-from-dateTime", 1, &args)?;
    Ok(timezone_value(dt.timezone))
}

pub fn fn_year_from_date<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:year-from-date", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let date = date_arg("fn:year-from-date", 1, &args)?;
    Ok(Value::from_integer(date.year as i64))
}

pub fn fn_month_from_date<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:month-from-date", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let date = date_arg("fn:month-from-date", 1, &args)?;
    Ok(Value::from_integer(date.month as i64))
}

pub fn fn_day_from_date<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:day-from-date", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let date = date_arg("fn:day-from-date", 1, &args)?;
    Ok(Value::from_integer(date.day as i64))
}

pub fn fn_hours_from_time<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:hours-from-time", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let time = time_arg("fn:hours-from-time", 1, &args)?;
    Ok(Value::from_integer(time.hour as i64))
}

pub fn fn_minutes_from_time<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:minutes-from-time", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let time = time_arg("fn:minutes-from-time", 1, &args)?;
    Ok(Value::from_integer(time.minute as i64))
}

pub fn fn_seconds_from_time<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:seconds-from-time", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let time = time_arg("fn:seconds-from-time", 1, &args)?;
    Ok(Value::from_double(time.second))
}

pub fn fn_timezone_from_time<'a, N: TreeNode<'a> + 'a>(
    args: Vec<Value<N>>,
) -> Result<Value<N>, EngineError> {
    check_arity("fn:timezone-from-time", args.len(), Arity::Exact(1))?;
    if empty_guard(&args) {
        return Ok(Value::empty());
    }
    let time = time_arg("fn:timezone-from-time", 1, &args)?;
    Ok(timezone_value(time.timezone))
}

fn timezone_value<N: Clone>(timezone: Option<Timezone>) -> Value<N> {
    match timezone {
        Some(tz) => Value::from_atomic(AtomicValue::Duration(tz.to_duration_string())),
        None => Value::empty(),
    }
}
