//! Date-range iteration for the date-keyed stages.
//!
//! A stage is invoked with one or two `YYYYMMDD` values. One value runs the
//! stage once; two values run it on every step of the closed interval between
//! them, in ascending order, and collect the failures instead of stopping at
//! the first one.

use crate::error::{AggregateError, Error, Result};
use chrono::{Days, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

/// Literal format of a date value on the command line.
pub const DATE_FORMAT: &str = "%Y%m%d";

static DAY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());
static MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})(\d{2})$").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

/// The period a date range is stepped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Period {
    /// The first date of the next period, using calendar arithmetic.
    ///
    /// Month based steps clamp to the last day of a shorter month
    /// (`2024-01-31` steps to `2024-02-29`). Returns `None` on overflow.
    pub fn step(self, d: NaiveDate) -> Option<NaiveDate> {
        match self {
            Period::Daily => d.checked_add_days(Days::new(1)),
            Period::Weekly => d.checked_add_days(Days::new(7)),
            Period::Monthly => d.checked_add_months(Months::new(1)),
            Period::Quarterly => d.checked_add_months(Months::new(3)),
            Period::Yearly => d.checked_add_months(Months::new(12)),
        }
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "quarterly" => Ok(Period::Quarterly),
            "yearly" => Ok(Period::Yearly),
            other => Err(Error::Config(format!("invalid period: {other}"))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
        };
        f.write_str(s)
    }
}

/// Parse a strict `YYYYMMDD` value.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let err = || Error::DateParse {
        value: value.to_string(),
        format: "YYYYMMDD",
    };
    if !DAY_RE.is_match(value) {
        return Err(err());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| err())
}

/// Format a date the way it appears in directory and file names.
pub fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Rewrite `YYYYMM` values to the first day of that month. Other values are
/// left for [`parse_date`] to judge.
fn normalize_months(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| match MONTH_RE.captures(v) {
            Some(caps) => format!("{}{}01", &caps[1], &caps[2]),
            None => v.clone(),
        })
        .collect()
}

/// Rewrite `YYYY` values to January 1st of that year.
fn normalize_years(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| {
            if YEAR_RE.is_match(v) {
                format!("{v}0101")
            } else {
                v.clone()
            }
        })
        .collect()
}

/// Run `op` on every date described by `dates`, advancing with `step`.
///
/// # Arguments
///
/// * `dates` - One `YYYYMMDD` value, or the two endpoints of a range in any order
/// * `step` - The date following a given one, or `None` to stop
/// * `op` - The stage to run for each date
///
/// # Returns
///
/// `Ok(())` when every date succeeded. A single date returns `op`'s result
/// unchanged.
///
/// # Errors
///
/// * zero values, or more than two, is a configuration error and `op` never
///   runs; so is a value that is not a valid date
/// * in a range, failures are collected in order and returned together as
///   [`Error::Aggregate`] once every date has run
/// * a fatal failure (see [`Error::is_fatal`]) stops the range and is
///   returned as is; later dates do not run
pub async fn each_by_step<S, F, Fut>(dates: &[String], step: S, mut op: F) -> Result<()>
where
    S: Fn(NaiveDate) -> Option<NaiveDate>,
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match dates {
        [] => Err(Error::Config(
            "one or two date values must be specified".to_string(),
        )),
        [single] => {
            let d = parse_date(single)?;
            op(d).await
        }
        [since, until] => {
            let mut since = parse_date(since)?;
            let mut until = parse_date(until)?;
            if since > until {
                std::mem::swap(&mut since, &mut until);
            }
            info!(%since, %until, "Running over date range");

            let mut errors = AggregateError::new();
            let mut current = Some(since);
            while let Some(d) = current.filter(|d| *d <= until) {
                debug!(date = %d, "Running date");
                if let Err(e) = op(d).await {
                    if e.is_fatal() {
                        error!(date = %d, error = %e, "Fatal failure; stopping the range");
                        return Err(e);
                    }
                    warn!(date = %d, error = %e, "Date failed; continuing with the rest of the range");
                    errors.push(e);
                }
                current = step(d);
            }
            if !errors.is_empty() {
                warn!(failed = errors.len(), %since, %until, "Some dates failed");
            }
            errors.into_result()
        }
        _ => Err(Error::Config(
            "more than 2 values cannot be specified for date".to_string(),
        )),
    }
}

/// Run `op` once per day.
pub async fn each_date<F, Fut>(dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    each_by_step(dates, |d| Period::Daily.step(d), op).await
}

/// Run `op` once per week.
pub async fn each_week<F, Fut>(dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    each_by_step(dates, |d| Period::Weekly.step(d), op).await
}

/// Run `op` once per month. Accepts `YYYYMM` as well as `YYYYMMDD`.
pub async fn each_month<F, Fut>(dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let dates = normalize_months(dates);
    each_by_step(&dates, |d| Period::Monthly.step(d), op).await
}

/// Run `op` once per quarter. Accepts `YYYYMM` as well as `YYYYMMDD`.
pub async fn each_quarter<F, Fut>(dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let dates = normalize_months(dates);
    each_by_step(&dates, |d| Period::Quarterly.step(d), op).await
}

/// Run `op` once per year. Accepts `YYYY` as well as `YYYYMMDD`.
pub async fn each_year<F, Fut>(dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let dates = normalize_years(dates);
    each_by_step(&dates, |d| Period::Yearly.step(d), op).await
}

/// Dispatch to the runner for `period`.
pub async fn each_by_period<F, Fut>(period: Period, dates: &[String], op: F) -> Result<()>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    match period {
        Period::Daily => each_date(dates, op).await,
        Period::Weekly => each_week(dates, op).await,
        Period::Monthly => each_month(dates, op).await,
        Period::Quarterly => each_quarter(dates, op).await,
        Period::Yearly => each_year(dates, op).await,
    }
}
