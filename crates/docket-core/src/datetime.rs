use std::fmt;
use std::str::FromStr;

use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike
};

use crate::error::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMAT: &str =
  "%Y-%m-%d %H:%M";
const TIME_FORMAT: &str = "%H:%M";

const DATE_TIME_INPUT_FORMATS: &[&str] = &[
  DATE_TIME_FORMAT,
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%dT%H:%M:%S"
];

/// A due timestamp, either a whole day or a day plus a clock time.
/// Recurrence keeps whichever granularity the task was created with.
/// Clock times carry minute precision; parsing drops any seconds.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash,
)]
pub enum Due {
  Date(NaiveDate),
  DateTime(NaiveDateTime)
}

impl Due {
  #[tracing::instrument(fields(input = raw))]
  pub fn parse(
    raw: &str
  ) -> Result<Self, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(
        ValidationError::InvalidDue(
          raw.to_string()
        )
      );
    }

    for fmt in DATE_TIME_INPUT_FORMATS {
      if let Ok(dt) =
        NaiveDateTime::parse_from_str(
          trimmed, fmt
        )
      {
        let minute = dt
          .with_second(0)
          .and_then(|t| t.with_nanosecond(0))
          .unwrap_or(dt);
        return Ok(Self::DateTime(minute));
      }
    }

    NaiveDate::parse_from_str(
      trimmed,
      DATE_FORMAT
    )
    .map(Self::Date)
    .map_err(|err| {
      tracing::debug!(error = %err, "due parse failed");
      ValidationError::InvalidDue(
        raw.to_string()
      )
    })
  }

  /// Combines the separate date and time inputs of a task form.
  ///
  /// No date means no due date; a time without a date is ignored.
  /// A date alone yields a whole-day due, the same on add and on edit.
  pub fn from_parts(
    date: Option<&str>,
    time: Option<&str>
  ) -> Result<Option<Self>, ValidationError>
  {
    let date = date
      .map(str::trim)
      .filter(|d| !d.is_empty());
    let Some(date) = date else {
      return Ok(None);
    };

    let day = NaiveDate::parse_from_str(
      date,
      DATE_FORMAT
    )
    .map_err(|_| {
      ValidationError::InvalidDue(
        date.to_string()
      )
    })?;

    match time
      .map(str::trim)
      .filter(|t| !t.is_empty())
    {
      | Some(time) => {
        let clock =
          NaiveTime::parse_from_str(
            time,
            TIME_FORMAT
          )
          .map_err(|_| {
            ValidationError::InvalidDue(
              format!("{date} {time}")
            )
          })?;
        Ok(Some(Self::DateTime(
          day.and_time(clock)
        )))
      }
      | None => {
        Ok(Some(Self::Date(day)))
      }
    }
  }

  #[must_use]
  pub fn date(&self) -> NaiveDate {
    match self {
      | Self::Date(d) => *d,
      | Self::DateTime(dt) => dt.date()
    }
  }

  /// A date-only due is overdue once its whole day has passed.
  #[must_use]
  pub fn is_before(
    &self,
    now: NaiveDateTime
  ) -> bool {
    match self {
      | Self::Date(d) => *d < now.date(),
      | Self::DateTime(dt) => *dt < now
    }
  }
}

impl fmt::Display for Due {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::Date(d) => {
        write!(
          f,
          "{}",
          d.format(DATE_FORMAT)
        )
      }
      | Self::DateTime(dt) => {
        write!(
          f,
          "{}",
          dt.format(DATE_TIME_FORMAT)
        )
      }
    }
  }
}

impl FromStr for Due {
  type Err = ValidationError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

/// Serde adapter for the persisted `dueDate` field. An empty string is
/// how the blob has always spelled "no due date".
pub mod due_serde {
  pub mod option {
    use serde::{
      Deserialize,
      Deserializer,
      Serializer
    };

    use crate::datetime::Due;

    pub fn serialize<S>(
      due: &Option<Due>,
      serializer: S
    ) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {
      match due {
        | Some(value) => serializer
          .serialize_str(
            &value.to_string()
          ),
        | None => {
          serializer.serialize_none()
        }
      }
    }

    pub fn deserialize<'de, D>(
      deserializer: D
    ) -> Result<Option<Due>, D::Error>
    where
      D: Deserializer<'de>
    {
      let opt =
        Option::<String>::deserialize(
          deserializer
        )?;
      match opt {
        | Some(raw)
          if !raw.trim().is_empty() =>
        {
          Due::parse(&raw)
            .map(Some)
            .map_err(
              serde::de::Error::custom
            )
        }
        | _ => Ok(None)
      }
    }
  }
}
