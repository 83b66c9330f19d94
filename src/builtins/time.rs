// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{Expr, Ref};
use crate::builtins::utils::ensure_args_count;
use crate::builtins::{BuiltinEnv, BuiltinFcn};
use crate::lexer::Span;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;

pub fn register(m: &mut HashMap<&'static str, BuiltinFcn>) {
    m.insert("daysSince", (days_since, 1));
    m.insert("duration", (duration, 1));
    m.insert("getDate", (get_date, 1));
    m.insert("getDayOfWeek", (get_day_of_week, 1));
    m.insert("getFullYear", (get_full_year, 1));
    m.insert("getHours", (get_hours, 1));
    m.insert("getMinutes", (get_minutes, 1));
    m.insert("getMonth", (get_month, 1));
    m.insert("getSeconds", (get_seconds, 1));
    m.insert("now", (now, 0));
    m.insert("timeSince", (time_since, 1));
    m.insert("timestamp", (timestamp, 1));
}

/// Interpret epoch milliseconds, RFC 3339 strings and plain dates.
pub fn to_datetime(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Number(ms) if ms.is_finite() => DateTime::from_timestamp_millis(*ms as i64),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt.and_utc());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}

fn millis(dt: &DateTime<Utc>) -> Value {
    Value::from(dt.timestamp_millis())
}

/// Parse Go-style durations such as `1h30m`, `-90s`, `2d` or `250ms` into
/// milliseconds.
pub fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    let (sign, mut rest) = match text.strip_prefix('-') {
        Some(r) => (-1.0, r),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    if rest == "0" {
        return Some(0.0);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total = 0.0;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let n: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "ns" => 1e-6,
            "us" | "µs" => 1e-3,
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            "d" => MS_PER_DAY,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += n * factor;
    }
    Some(sign * total)
}

fn now(span: &Span, params: &[Ref<Expr>], args: &[Value], env: &BuiltinEnv) -> Result<Value> {
    ensure_args_count(span, "now", params, args, 0)?;
    Ok(millis(&env.clock.now()))
}

fn timestamp(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "timestamp", params, args, 1)?;
    Ok(to_datetime(&args[0]).map_or(Value::Null, |dt| millis(&dt)))
}

fn duration(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "duration", params, args, 1)?;
    Ok(match &args[0] {
        Value::Number(n) if n.is_finite() => Value::Number(*n),
        Value::String(s) => parse_duration(s).map_or(Value::Null, Value::Number),
        _ => Value::Null,
    })
}

fn elapsed_millis(v: &Value, env: &BuiltinEnv) -> Option<f64> {
    let then = to_datetime(v)?;
    Some((env.clock.now() - then).num_milliseconds() as f64)
}

fn time_since(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "timeSince", params, args, 1)?;
    Ok(elapsed_millis(&args[0], env).map_or(Value::Null, Value::Number))
}

fn days_since(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "daysSince", params, args, 1)?;
    Ok(elapsed_millis(&args[0], env)
        .map_or(Value::Null, |ms| Value::Number((ms / MS_PER_DAY).floor())))
}

fn component(
    name: &'static str,
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    f: fn(&DateTime<Utc>) -> u32,
) -> Result<Value> {
    ensure_args_count(span, name, params, args, 1)?;
    Ok(to_datetime(&args[0]).map_or(Value::Null, |dt| Value::from(u64::from(f(&dt)))))
}

fn get_full_year(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    ensure_args_count(span, "getFullYear", params, args, 1)?;
    Ok(to_datetime(&args[0]).map_or(Value::Null, |dt| Value::from(dt.year())))
}

fn get_month(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getMonth", span, params, args, |dt| dt.month())
}

fn get_date(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getDate", span, params, args, |dt| dt.day())
}

fn get_day_of_week(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getDayOfWeek", span, params, args, |dt| {
        dt.weekday().num_days_from_sunday()
    })
}

fn get_hours(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getHours", span, params, args, |dt| dt.hour())
}

fn get_minutes(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getMinutes", span, params, args, |dt| dt.minute())
}

fn get_seconds(
    span: &Span,
    params: &[Ref<Expr>],
    args: &[Value],
    _env: &BuiltinEnv,
) -> Result<Value> {
    component("getSeconds", span, params, args, |dt| dt.second())
}
