//! mothra-stats - user sign-up and activity statistics
//!
//! Buckets account creation and last login dates per day (`YYYY_MM_DD`) and
//! per month (`YYYY_MM`), and reports how many users joined after a cutoff
//! month together with the average per month since then.

pub mod db;

use chrono::{Datelike, NaiveDate};
use mothra_common::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Whole months from `earlier` to `self`
    pub fn months_since(&self, earlier: &YearMonth) -> i64 {
        (self.year as i64 - earlier.year as i64) * 12 + self.month as i64 - earlier.month as i64
    }
}

impl FromStr for YearMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || Error::invalid(format!("cutoff '{}' is not in YYYY_MM form", s));
        let (year, month) = s.trim().split_once('_').ok_or_else(malformed)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(malformed());
        }
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let month: u32 = month.parse().map_err(|_| malformed())?;
        if !(1..=12).contains(&month) {
            return Err(malformed());
        }
        Ok(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}", self.year, self.month)
    }
}

fn day_key(date: NaiveDate) -> String {
    format!("{:04}_{:02}_{:02}", date.year(), date.month(), date.day())
}

/// One `auth_user` row
#[derive(Debug, Clone, PartialEq)]
pub struct UserActivity {
    pub date_joined: NaiveDate,
    /// Users who never logged in have none
    pub last_login: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageStats {
    pub monthly_joined: BTreeMap<String, u64>,
    pub daily_joined: BTreeMap<String, u64>,
    pub monthly_active: BTreeMap<String, u64>,
    pub daily_active: BTreeMap<String, u64>,
    /// Users whose join month is strictly after the cutoff
    pub joined_after_cutoff: u64,
    pub cutoff: String,
    pub months_since_cutoff: i64,
}

impl UsageStats {
    /// The cutoff must lie strictly before the month of `today`
    pub fn collect(users: &[UserActivity], cutoff: YearMonth, today: NaiveDate) -> Result<Self> {
        let months_since_cutoff = YearMonth::of(today).months_since(&cutoff);
        if months_since_cutoff <= 0 {
            return Err(Error::invalid(format!(
                "cutoff {} must be before the current month {}",
                cutoff,
                YearMonth::of(today)
            )));
        }

        let mut stats = UsageStats {
            cutoff: cutoff.to_string(),
            months_since_cutoff,
            ..Default::default()
        };
        for user in users {
            let joined = YearMonth::of(user.date_joined);
            if joined > cutoff {
                stats.joined_after_cutoff += 1;
            }
            *stats.monthly_joined.entry(joined.to_string()).or_default() += 1;
            *stats.daily_joined.entry(day_key(user.date_joined)).or_default() += 1;

            if let Some(login) = user.last_login {
                *stats
                    .monthly_active
                    .entry(YearMonth::of(login).to_string())
                    .or_default() += 1;
                *stats.daily_active.entry(day_key(login)).or_default() += 1;
            }
        }
        Ok(stats)
    }

    pub fn average_per_month(&self) -> f64 {
        self.joined_after_cutoff as f64 / self.months_since_cutoff as f64
    }

    /// Plain-text report with monthly joins in chronological order
    pub fn report(&self) -> String {
        let mut out = String::from("New users per month:\n");
        for (month, count) in &self.monthly_joined {
            out.push_str(&format!("{}: {}\n", month, count));
        }
        out.push_str(&format!(
            "New users since {}: {}\n",
            self.cutoff, self.joined_after_cutoff
        ));
        out.push_str(&format!(
            "Average new users per month: {}\n",
            self.average_per_month()
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user(joined: NaiveDate, login: Option<NaiveDate>) -> UserActivity {
        UserActivity {
            date_joined: joined,
            last_login: login,
        }
    }

    #[test]
    fn test_cutoff_parsing() {
        assert_eq!(
            "2013_04".parse::<YearMonth>().unwrap(),
            YearMonth { year: 2013, month: 4 }
        );
        for bad in ["2013-04", "2013_4", "2013_13", "13_04", "abcd_ef"] {
            assert!(bad.parse::<YearMonth>().is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_months_since() {
        let a: YearMonth = "2014_02".parse().unwrap();
        let b: YearMonth = "2013_11".parse().unwrap();
        assert_eq!(a.months_since(&b), 3);
        assert_eq!(b.months_since(&a), -3);
    }

    #[test]
    fn test_two_months_two_keys() {
        let users = vec![
            user(date(2014, 1, 5), Some(date(2014, 3, 1))),
            user(date(2014, 1, 20), None),
            user(date(2014, 2, 2), Some(date(2014, 2, 2))),
        ];
        let cutoff = "2014_01".parse().unwrap();
        let stats = UsageStats::collect(&users, cutoff, date(2014, 5, 10)).unwrap();

        assert_eq!(stats.monthly_joined.len(), 2);
        assert_eq!(stats.monthly_joined["2014_01"], 2);
        assert_eq!(stats.monthly_joined["2014_02"], 1);
        assert_eq!(stats.daily_joined["2014_01_05"], 1);
        assert_eq!(stats.joined_after_cutoff, 1);
        assert_eq!(stats.monthly_active.values().sum::<u64>(), 2);
        assert_eq!(stats.months_since_cutoff, 4);
        assert!((stats.average_per_month() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_cutoff_in_current_month_is_rejected() {
        let cutoff = "2014_05".parse().unwrap();
        let err = UsageStats::collect(&[], cutoff, date(2014, 5, 10)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_report_is_chronological() {
        let users = vec![
            user(date(2014, 3, 1), None),
            user(date(2013, 12, 1), None),
        ];
        let stats = UsageStats::collect(&users, "2013_12".parse().unwrap(), date(2014, 4, 1)).unwrap();
        assert_eq!(
            stats.report(),
            "New users per month:\n2013_12: 1\n2014_03: 1\n\
             New users since 2013_12: 1\nAverage new users per month: 0.25\n"
        );
    }
}
