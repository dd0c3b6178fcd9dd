use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Duration,
  Local,
  NaiveDate,
  NaiveDateTime,
  TimeDelta,
  Timelike,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

pub const ISO_DATE_FORMAT: &str =
  "%Y-%m-%d";

/// Resolves the configured IANA zone.
/// `None` means the host's local zone.
pub fn resolve_timezone(
  raw: Option<&str>
) -> anyhow::Result<Option<Tz>> {
  let Some(raw) = raw else {
    return Ok(None);
  };
  let trimmed = raw.trim();
  if trimmed.is_empty()
    || trimmed.eq_ignore_ascii_case(
      "local"
    )
  {
    return Ok(None);
  }
  let tz = trimmed
    .parse::<Tz>()
    .map_err(|e| {
      anyhow!(
        "invalid timezone \
         '{trimmed}': {e}"
      )
    })?;
  debug!(timezone = %tz, "resolved planner timezone");
  Ok(Some(tz))
}

#[must_use]
pub fn today_in(
  tz: Option<&Tz>
) -> NaiveDate {
  match tz {
    | Some(tz) => {
      Utc::now()
        .with_timezone(tz)
        .date_naive()
    }
    | None => Local::now().date_naive()
  }
}

#[must_use]
pub fn now_in(
  tz: Option<&Tz>
) -> NaiveDateTime {
  match tz {
    | Some(tz) => {
      Utc::now()
        .with_timezone(tz)
        .naive_local()
    }
    | None => Local::now().naive_local()
  }
}

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(
  date: NaiveDate
) -> NaiveDate {
  let offset = date
    .weekday()
    .num_days_from_monday();
  date - Duration::days(i64::from(offset))
}

#[must_use]
pub fn days_of_week(
  date: NaiveDate
) -> [NaiveDate; 7] {
  let monday = week_start(date);
  std::array::from_fn(|i| {
    monday + Duration::days(i as i64)
  })
}

#[must_use]
pub fn format_date(
  date: NaiveDate,
  fmt: &str
) -> String {
  date.format(fmt).to_string()
}

/// Accepts a plain date or any of the date-time shapes the planner
/// document has historically held and keeps the calendar date.
pub fn parse_iso_date(
  raw: &str
) -> anyhow::Result<NaiveDate> {
  let token = raw.trim();
  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      ISO_DATE_FORMAT
    )
  {
    return Ok(date);
  }
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.date_naive());
  }
  if let Ok(ndt) =
    parse_naive_datetime(token)
  {
    return Ok(ndt.date());
  }
  Err(anyhow!(
    "invalid ISO-8601 date: {raw}"
  ))
}

pub fn parse_iso_datetime(
  raw: &str
) -> anyhow::Result<NaiveDateTime> {
  let token = raw.trim();
  if let Ok(ndt) =
    parse_naive_datetime(token)
  {
    return Ok(ndt);
  }
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(dt.naive_local());
  }
  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      ISO_DATE_FORMAT
    )
  {
    return date
      .and_hms_opt(0, 0, 0)
      .ok_or_else(|| {
        anyhow!(
          "failed to construct \
           midnight for {raw}"
        )
      });
  }
  Err(anyhow!(
    "invalid ISO-8601 date-time: \
     {raw}"
  ))
}

fn parse_naive_datetime(
  token: &str
) -> Result<NaiveDateTime, chrono::ParseError>
{
  NaiveDateTime::parse_from_str(
    token,
    "%Y-%m-%dT%H:%M:%S%.f"
  )
  .or_else(|_| {
    NaiveDateTime::parse_from_str(
      token,
      "%Y-%m-%dT%H:%M"
    )
  })
  .or_else(|_| {
    NaiveDateTime::parse_from_str(
      token,
      "%Y-%m-%d %H:%M:%S%.f"
    )
  })
  .or_else(|_| {
    NaiveDateTime::parse_from_str(
      token,
      "%Y-%m-%d %H:%M"
    )
  })
}

/// Microsecond precision, fraction omitted when zero.
#[must_use]
pub fn format_iso_datetime(
  ndt: &NaiveDateTime
) -> String {
  if ndt.nanosecond() / 1_000 == 0 {
    ndt
      .format("%Y-%m-%dT%H:%M:%S")
      .to_string()
  } else {
    ndt
      .format("%Y-%m-%dT%H:%M:%S%.6f")
      .to_string()
  }
}

#[tracing::instrument(skip(today), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" | "now" => {
      return Ok(today)
    }
    | "tomorrow" => {
      return Ok(
        today + Duration::days(1)
      )
    }
    | "yesterday" => {
      return Ok(
        today - Duration::days(1)
      )
    }
    | _ => {}
  }

  if let Some(target) =
    parse_weekday_name(&lower)
  {
    return Ok(next_weekday_date(
      today, target
    ));
  }

  let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dw])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let days = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => Some(num),
      | Some("w") => num.checked_mul(7),
      | other => {
        return Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ))
      }
    };
    let negative = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");
    let shifted = days
      .and_then(TimeDelta::try_days)
      .and_then(|delta| {
        if negative {
          today.checked_sub_signed(delta)
        } else {
          today.checked_add_signed(delta)
        }
      });
    return shifted.ok_or_else(|| {
      anyhow!(
        "date offset out of range: \
         {token}"
      )
    });
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%d/%m/%Y"
    )
  {
    return Ok(date);
  }

  parse_iso_date(token).with_context(|| {
    "supported formats: \
     today/tomorrow/yesterday, \
     weekday names (e.g. monday), \
     +Nd/-Nd/+Nw/-Nw, YYYY-MM-DD, \
     DD/MM/YYYY, RFC3339, \
     YYYY-MM-DDTHH:MM[:SS]"
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

fn next_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_monday()
    as i64;
  let target_idx = target
    .num_days_from_monday()
    as i64;
  let mut delta =
    (7 + target_idx - from_idx) % 7;
  if delta == 0 {
    delta = 7;
  }
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}

pub mod iso_date_serde {
  pub mod option {
    use chrono::NaiveDate;
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    use crate::datetime::{
      ISO_DATE_FORMAT,
      parse_iso_date
    };

    pub fn serialize<S>(
      date: &Option<NaiveDate>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match date {
        | Some(value) => {
          serializer.serialize_str(
            &value
              .format(ISO_DATE_FORMAT)
              .to_string()
          )
        }
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<Option<NaiveDate>, D::Error>
    where
      D: Deserializer<'de>
    {
      let raw = Option::<String>::deserialize(
        deserializer
      )?;
      match raw.as_deref().map(str::trim) {
        | None | Some("") => Ok(None),
        | Some(text) => {
          parse_iso_date(text)
            .map(Some)
            .map_err(
              serde::de::Error::custom
            )
        }
      }
    }
  }
}

pub mod iso_datetime_serde {
  use chrono::NaiveDateTime;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use crate::datetime::{
    format_iso_datetime,
    parse_iso_datetime
  };

  pub fn serialize<S>(
    dt: &NaiveDateTime,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &format_iso_datetime(dt)
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDateTime, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    parse_iso_datetime(&raw)
      .map_err(serde::de::Error::custom)
  }
}
