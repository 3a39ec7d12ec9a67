//! `timef` template helper: timestamp formatting with German presets

use crate::error::{MailError, MailResult};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, FixedOffset, Month, TimeZone, Timelike, Weekday};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext, RenderErrorReason,
};
use serde_json::Value;
use std::fmt::Display;

fn weekday_de(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

fn month_de(month: Month) -> &'static str {
    match month {
        Month::January => "Januar",
        Month::February => "Februar",
        Month::March => "März",
        Month::April => "April",
        Month::May => "Mai",
        Month::June => "Juni",
        Month::July => "Juli",
        Month::August => "August",
        Month::September => "September",
        Month::October => "Oktober",
        Month::November => "November",
        Month::December => "Dezember",
    }
}

fn long_date_de<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    let day = weekday_de(t.weekday());
    let month = Month::try_from(t.month() as u8).map_or("", month_de);

    format!("{}, {:02}. {} {}", &day[..2], t.day(), month, t.year())
}

fn long_time_de<Tz: TimeZone>(t: &DateTime<Tz>) -> String {
    format!(
        "{} {:02}:{:02}:{:02}",
        long_date_de(t),
        t.hour(),
        t.minute(),
        t.second()
    )
}

/// Format `t` using one of the named presets or a strftime layout.
///
/// | format          | example                      |
/// |-----------------|------------------------------|
/// | `date-short-de` | `03.05.2021`                 |
/// | `date-long-de`  | `Mo, 03. Mai 2021`           |
/// | `time-short-de` | `03.05.2021 14:05:09`        |
/// | `time-long-de`  | `Mo, 03. Mai 2021 14:05:09`  |
///
/// Any other value is used as a strftime layout, e.g. `%Y-%m-%d`.
pub fn timef<Tz>(t: &DateTime<Tz>, format: &str) -> MailResult<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let formatted = match format {
        "date-short-de" => t.format("%d.%m.%Y").to_string(),
        "date-long-de" => long_date_de(t),
        "time-short-de" => t.format("%d.%m.%Y %H:%M:%S").to_string(),
        "time-long-de" => long_time_de(t),
        layout => {
            let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
            if items.iter().any(|item| matches!(item, Item::Error)) {
                return Err(MailError::TimeFormat(layout.to_string()));
            }
            t.format_with_items(items.iter()).to_string()
        }
    };

    Ok(formatted)
}

/// Parse a template value into a timestamp.
///
/// Accepts RFC 3339 strings (how chrono serializes `DateTime`) and unix seconds.
fn parse_time(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok(),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|t| t.fixed_offset()),
        _ => None,
    }
}

/// Handlebars helper exposing [`timef`] as `{{timef time "date-long-de"}}`
#[derive(Clone, Copy, Debug, Default)]
pub struct TimefHelper;

impl HelperDef for TimefHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let time = h
            .param(0)
            .ok_or(RenderErrorReason::ParamNotFoundForIndex("timef", 0))?;
        let format = h
            .param(1)
            .ok_or(RenderErrorReason::ParamNotFoundForIndex("timef", 1))?;

        let time = parse_time(time.value()).ok_or_else(|| {
            RenderErrorReason::InvalidParamType("RFC 3339 timestamp or unix seconds")
        })?;
        let format = format
            .value()
            .as_str()
            .ok_or(RenderErrorReason::InvalidParamType("string"))?;

        let formatted =
            timef(&time, format).map_err(|e| RenderErrorReason::Other(e.to_string()))?;
        out.write(&formatted)?;
        Ok(())
    }
}
