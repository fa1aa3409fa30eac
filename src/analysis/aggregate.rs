//! Calendar bucketing of normalized series.
//!
//! Month and year buckets cover every calendar unit between the first and
//! last observation, so they partition the series' date range; units with no
//! observations are kept with a zero sum and no mean. Season buckets pool all
//! years of the series into four fixed buckets (winter, spring, summer, fall).

use chrono::{Datelike, NaiveDate};

use crate::classify::tables::GrowingSeason;
use crate::logging::{self, Component};
use crate::model::Series;

/// Calendar unit used to bucket a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Month,
    Season,
    Year,
}

/// Meteorological seasons in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Season containing calendar month `month` (1-12).
    pub fn from_month(month: u32) -> Season {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
        }
    }
}

/// Season and the year it is attributed to.
///
/// December stays in its own calendar year: 2021-12-15 is winter 2021, the
/// same winter as 2021-01-15.
pub fn season_of(date: NaiveDate) -> (Season, i32) {
    (Season::from_month(date.month()), date.year())
}

/// Aggregated values of one calendar unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub sum: f64,
    pub count: usize,
}

impl Bucket {
    fn empty(key: String) -> Self {
        Self { key, sum: 0.0, count: 0 }
    }

    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Mean of contained observations; `None` for an empty bucket.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Calendar month of a `"YYYY-MM"` key.
    pub fn month(&self) -> Option<u32> {
        self.key.get(5..7).and_then(|m| m.parse().ok())
    }
}

fn month_key(year: i32, month: u32) -> String {
    format!("{:04}-{:02}", year, month)
}

/// Months elapsed from (y0, m0) to (y1, m1).
fn month_offset(y0: i32, m0: u32, y1: i32, m1: u32) -> usize {
    ((y1 - y0) * 12 + m1 as i32 - m0 as i32).max(0) as usize
}

/// Buckets `series` at `granularity`. Buckets are returned in calendar order.
pub fn aggregate(series: &Series, granularity: Granularity) -> Vec<Bucket> {
    let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
        return Vec::new();
    };

    match granularity {
        Granularity::Month => {
            let span = month_offset(first.year(), first.month(), last.year(), last.month()) + 1;
            let mut buckets: Vec<Bucket> = (0..span)
                .map(|i| {
                    let m0 = first.month0() as usize + i;
                    let year = first.year() + (m0 / 12) as i32;
                    Bucket::empty(month_key(year, (m0 % 12) as u32 + 1))
                })
                .collect();
            for obs in series.observations() {
                let i = month_offset(first.year(), first.month(), obs.date.year(), obs.date.month());
                buckets[i].add(obs.value);
            }
            let gaps = buckets.iter().filter(|b| b.is_empty()).count();
            if gaps > 0 {
                logging::debug(
                    Component::Aggregator,
                    Some(series.variable().label()),
                    &format!("{} of {} months have no observations", gaps, buckets.len()),
                );
            }
            buckets
        }
        Granularity::Year => {
            let mut buckets: Vec<Bucket> = (first.year()..=last.year())
                .map(|y| Bucket::empty(format!("{:04}", y)))
                .collect();
            for obs in series.observations() {
                buckets[(obs.date.year() - first.year()) as usize].add(obs.value);
            }
            buckets
        }
        Granularity::Season => {
            let mut buckets: Vec<Bucket> = Season::ALL
                .iter()
                .map(|s| Bucket::empty(s.key().to_string()))
                .collect();
            for obs in series.observations() {
                let (season, _) = season_of(obs.date);
                buckets[season as usize].add(obs.value);
            }
            buckets
        }
    }
}

/// Sum of month buckets whose month falls in the growing season.
pub fn growing_season_total(month_buckets: &[Bucket], season: &GrowingSeason) -> f64 {
    month_buckets
        .iter()
        .filter(|b| b.month().is_some_and(|m| season.contains_month(m)))
        .map(|b| b.sum)
        .sum()
}

/// `(month offset, mean)` for every non-empty month bucket.
///
/// The offset counts from the first bucket, so a gap month keeps the series'
/// spacing instead of being collapsed.
pub fn monthly_mean_series(month_buckets: &[Bucket]) -> Vec<(f64, f64)> {
    month_buckets
        .iter()
        .enumerate()
        .filter_map(|(i, b)| b.mean().map(|m| (i as f64, m)))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
