//! View analytics: chart intervals, timezone-aware day bucketing and zero-filling.
//!
//! Views are stored as UTC instants. Charts bucket them by calendar day in the
//! viewer's timezone, so the same view can land on different days for viewers
//! in different zones.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use jiff::tz::TimeZone;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{ProductId, UserId};

/// Time span of a views chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartInterval {
    /// The last 7 days including today.
    Last7Days,
    /// The last 30 days including today.
    #[default]
    Last30Days,
    /// The last 365 days including today.
    Last365Days,
    /// From the first recorded view until today.
    AllTime,
}

impl ChartInterval {
    /// All intervals in menu order.
    pub const ALL: [ChartInterval; 4] = [
        ChartInterval::Last7Days,
        ChartInterval::Last30Days,
        ChartInterval::Last365Days,
        ChartInterval::AllTime,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Last7Days => "Last 7 Days",
            Self::Last30Days => "Last 30 Days",
            Self::Last365Days => "Last 365 Days",
            Self::AllTime => "All Time",
        }
    }

    /// Number of days covered, or `None` for `AllTime`.
    #[must_use]
    pub const fn days(&self) -> Option<i64> {
        match self {
            Self::Last7Days => Some(7),
            Self::Last30Days => Some(30),
            Self::Last365Days => Some(365),
            Self::AllTime => None,
        }
    }

    /// The inclusive range of local days charted on `today`.
    ///
    /// `first_view` is only consulted for `AllTime`; without it the range is
    /// just today.
    #[must_use]
    pub fn range(&self, today: NaiveDate, first_view: Option<NaiveDate>) -> DayRange {
        let start = match self.days() {
            Some(days) => today - Duration::days(days - 1),
            None => first_view.map_or(today, |first| first.min(today)),
        };
        DayRange { start, end: today }
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayRange {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl DayRange {
    /// Iterate over every day in the range in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    /// Number of days in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    /// Whether the range contains no days.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `day` falls inside the range.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Views counted on one local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyViews {
    /// The local calendar day.
    pub date: NaiveDate,
    /// Short chart label, e.g. `Oct 18`.
    pub label: String,
    /// Number of views.
    pub views: u64,
}

/// Expand sparse per-day counts into one entry per day of `range`.
///
/// Days without a count get zero; counts outside the range are dropped.
#[must_use]
pub fn zero_fill(
    range: DayRange,
    counts: impl IntoIterator<Item = (NaiveDate, u64)>,
) -> Vec<DailyViews> {
    let mut by_day: HashMap<NaiveDate, u64> = HashMap::new();
    for (day, views) in counts {
        if range.contains(day) {
            *by_day.entry(day).or_default() += views;
        }
    }

    range
        .days()
        .map(|date| DailyViews {
            date,
            label: date.format("%b %-d").to_string(),
            views: by_day.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

/// Views attributed to one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryViews {
    /// ISO country code.
    pub country_code: String,
    /// Country display name.
    pub country_name: String,
    /// Number of views.
    pub views: u64,
}

/// Views attributed to one purchasing-power group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryGroupViews {
    /// Group name.
    pub country_group_name: String,
    /// Number of views.
    pub views: u64,
}

/// Scope of an analytics query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFilter {
    /// Only views of products owned by this user.
    pub owner: UserId,
    /// Only views of this product, if set.
    pub product_id: Option<ProductId>,
    /// Only views at or after this instant, if set.
    pub since: Option<DateTime<Utc>>,
}

impl ViewFilter {
    /// All views of every product owned by `owner`.
    #[must_use]
    pub fn owner(owner: UserId) -> Self {
        Self {
            owner,
            product_id: None,
            since: None,
        }
    }

    /// Restrict to one product.
    #[must_use]
    pub fn with_product(mut self, product_id: Option<ProductId>) -> Self {
        self.product_id = product_id;
        self
    }

    /// Restrict to views at or after `since`.
    #[must_use]
    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

// ============================================================================
// Timezones
// ============================================================================

/// The IANA timezone a chart is bucketed in.
#[derive(Debug, Clone)]
pub struct DisplayTimezone {
    name: String,
    tz: TimeZone,
}

impl DisplayTimezone {
    /// Look up an IANA timezone by name (e.g. `America/New_York`).
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnknownTimezone` if the name is not in the tz database.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        let tz =
            TimeZone::get(name).map_err(|_| CoreError::UnknownTimezone(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            tz,
        })
    }

    /// Coordinated Universal Time.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            name: "UTC".to_string(),
            tz: TimeZone::UTC,
        }
    }

    /// The IANA name, as accepted by PostgreSQL `AT TIME ZONE`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The local calendar day of an instant.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DateOutOfRange` for instants outside the supported range.
    pub fn local_date(&self, instant: DateTime<Utc>) -> Result<NaiveDate> {
        let nanos = i32::try_from(instant.timestamp_subsec_nanos()).map_err(out_of_range)?;
        let timestamp =
            jiff::Timestamp::new(instant.timestamp(), nanos).map_err(out_of_range)?;
        let date = timestamp.to_zoned(self.tz.clone()).date();

        NaiveDate::from_ymd_opt(
            i32::from(date.year()),
            u32::try_from(date.month()).map_err(out_of_range)?,
            u32::try_from(date.day()).map_err(out_of_range)?,
        )
        .ok_or_else(|| CoreError::DateOutOfRange(date.to_string()))
    }

    /// The UTC instant at which `day` begins in this timezone.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DateOutOfRange` for days outside the supported range.
    pub fn start_of_day(&self, day: NaiveDate) -> Result<DateTime<Utc>> {
        let date = jiff::civil::Date::new(
            i16::try_from(day.year()).map_err(out_of_range)?,
            i8::try_from(day.month()).map_err(out_of_range)?,
            i8::try_from(day.day()).map_err(out_of_range)?,
        )
        .map_err(out_of_range)?;
        let start = date.to_zoned(self.tz.clone()).map_err(out_of_range)?.timestamp();

        let nanos = u32::try_from(start.subsec_nanosecond()).map_err(out_of_range)?;
        DateTime::from_timestamp(start.as_second(), nanos)
            .ok_or_else(|| CoreError::DateOutOfRange(day.to_string()))
    }

    /// Today's date in this timezone.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::DateOutOfRange` if `now` is outside the supported range.
    pub fn today(&self, now: DateTime<Utc>) -> Result<NaiveDate> {
        self.local_date(now)
    }
}

impl Default for DisplayTimezone {
    fn default() -> Self {
        Self::utc()
    }
}

fn out_of_range(err: impl std::fmt::Display) -> CoreError {
    CoreError::DateOutOfRange(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn last_n_days_has_exactly_n_entries() {
        let today = day(2024, 3, 15);
        for (interval, n) in [
            (ChartInterval::Last7Days, 7),
            (ChartInterval::Last30Days, 30),
            (ChartInterval::Last365Days, 365),
        ] {
            let range = interval.range(today, None);
            assert_eq!(range.len(), n);
            assert_eq!(range.end, today);
            assert_eq!(range.days().count(), n);
        }
    }

    #[test]
    fn all_time_starts_at_first_view() {
        let today = day(2024, 3, 15);
        let range = ChartInterval::AllTime.range(today, Some(day(2024, 3, 1)));
        assert_eq!(range.start, day(2024, 3, 1));
        assert_eq!(range.len(), 15);

        let empty = ChartInterval::AllTime.range(today, None);
        assert_eq!(empty.len(), 1);
    }

    #[test]
    fn zero_fill_covers_every_day_in_order() {
        let range = ChartInterval::Last7Days.range(day(2024, 3, 15), None);
        let filled = zero_fill(
            range,
            vec![
                (day(2024, 3, 10), 2),
                (day(2024, 3, 15), 5),
                (day(2024, 1, 1), 99),
            ],
        );

        assert_eq!(filled.len(), 7);
        assert_eq!(filled[0].date, day(2024, 3, 9));
        assert_eq!(filled[0].label, "Mar 9");
        assert_eq!(filled[1].views, 2);
        assert_eq!(filled[6].views, 5);
        assert_eq!(filled.iter().map(|d| d.views).sum::<u64>(), 7);
        assert!(filled.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn interval_parses_from_camel_case() {
        let interval: ChartInterval = serde_json::from_str("\"last7Days\"").unwrap();
        assert_eq!(interval, ChartInterval::Last7Days);
        let interval: ChartInterval = serde_json::from_str("\"allTime\"").unwrap();
        assert_eq!(interval, ChartInterval::AllTime);
    }

    #[test]
    fn local_date_follows_timezone() {
        let tz = DisplayTimezone::parse("America/New_York").unwrap();
        let view = instant("2024-03-10T02:30:00Z");
        assert_eq!(tz.local_date(view).unwrap(), day(2024, 3, 9));
        assert_eq!(DisplayTimezone::utc().local_date(view).unwrap(), day(2024, 3, 10));

        let tokyo = DisplayTimezone::parse("Asia/Tokyo").unwrap();
        assert_eq!(
            tokyo.local_date(instant("2024-03-09T16:00:00Z")).unwrap(),
            day(2024, 3, 10)
        );
    }

    #[test]
    fn start_of_day_is_local_midnight() {
        let tz = DisplayTimezone::parse("America/New_York").unwrap();
        assert_eq!(
            tz.start_of_day(day(2024, 1, 15)).unwrap(),
            instant("2024-01-15T05:00:00Z")
        );
        assert_eq!(
            tz.start_of_day(day(2024, 7, 15)).unwrap(),
            instant("2024-07-15T04:00:00Z")
        );
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        assert!(matches!(
            DisplayTimezone::parse("Mars/Olympus_Mons"),
            Err(CoreError::UnknownTimezone(_))
        ));
    }
}
