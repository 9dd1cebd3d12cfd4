// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Months;
use chrono::NaiveDate;
use chrono::SecondsFormat;
use chrono::SubsecRound;
use chrono::TimeDelta;
use chrono::TimeZone;
use chrono::Utc;
use rusqlite::ToSql;
use rusqlite::types::FromSql;
use rusqlite::types::FromSqlError;
use rusqlite::types::FromSqlResult;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Serialize;

use crate::error::Error;
use crate::error::Fallible;

/// An instant in UTC.
///
/// In the database, timestamps are stored as fixed-width RFC 3339 strings
/// (millisecond precision, `Z` suffix), so that comparing the strings in SQL
/// gives the same answer as comparing the instants. Sub-millisecond
/// precision is dropped on construction so a value equals its stored form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(ts: DateTime<Utc>) -> Self {
        Self(ts.trunc_subsecs(3))
    }

    #[cfg(feature = "clock")]
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    pub fn parse(s: &str) -> Fallible<Self> {
        let ts = DateTime::parse_from_rfc3339(s)
            .map_err(|e| Error::InvalidInput(format!("invalid timestamp {s:?}: {e}")))?;
        Ok(Self::new(ts.with_timezone(&Utc)))
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Add a number of minutes. Saturates at the end of year 9999 rather than
    /// overflowing, which keeps the stored form fixed-width.
    pub fn plus_minutes(self, minutes: i64) -> Self {
        TimeDelta::try_minutes(minutes)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(|ts| Self(ts).min(Self::far_future()))
            .unwrap_or_else(Self::far_future)
    }

    pub fn minus_minutes(self, minutes: i64) -> Self {
        TimeDelta::try_minutes(minutes)
            .and_then(|delta| self.0.checked_sub_signed(delta))
            .map(Self)
            .unwrap_or(self)
    }

    pub fn minus_days(self, days: i64) -> Self {
        self.minus_minutes(days * 24 * 60)
    }

    /// Go back a number of calendar months. The day of the month is clamped
    /// to the length of the target month (e.g. March 31 → February 28).
    pub fn minus_months(self, months: u32) -> Self {
        self.0
            .checked_sub_months(Months::new(months))
            .map(Self)
            .unwrap_or(self)
    }

    /// The instant of midnight, at the given UTC offset, of the calendar day
    /// that contains this timestamp.
    pub fn start_of_day(self, offset: FixedOffset) -> Self {
        let local = self.0.with_timezone(&offset);
        let midnight = local.date_naive().and_hms_opt(0, 0, 0);
        match midnight.and_then(|naive| offset.from_local_datetime(&naive).single()) {
            Some(ts) => Self(ts.with_timezone(&Utc)),
            None => self,
        }
    }

    pub fn to_rfc3339(self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn far_future() -> Self {
        let ts = NaiveDate::from_ymd_opt(9999, 12, 31)
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .map(|naive| naive.and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self(ts)
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_rfc3339()))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let string: String = FromSql::column_result(value)?;
        let ts =
            DateTime::parse_from_rfc3339(&string).map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(Timestamp(ts.with_timezone(&Utc)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_rfc3339())
    }
}
