//! Observable view of a UTC instant.
//!
//! Every accessor tracks one marker, `Key::Value`. Setters compare the
//! instant before and after and trigger `Value` plus `Iterate` only when it
//! moved. Calendar components follow `chrono` (months and days are
//! 1-based).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};

use super::Wrapped;
use crate::error::{Result, StoreError};
use crate::graph::{Key, TargetId};
use crate::value::Value;

/// A wrapped `DateTime<Utc>`.
#[derive(Clone)]
pub struct ReactiveDate {
    pub(crate) inner: Arc<Wrapped<DateTime<Utc>>>,
}

impl ReactiveDate {
    pub fn id(&self) -> TargetId {
        self.inner.target.id()
    }

    fn read(&self) -> DateTime<Utc> {
        self.inner.scope.track(self.id(), Key::Value);
        *self.inner.target.read()
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.read()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.read().timestamp_millis()
    }

    pub fn year(&self) -> i32 {
        self.read().year()
    }

    pub fn month(&self) -> u32 {
        self.read().month()
    }

    pub fn day(&self) -> u32 {
        self.read().day()
    }

    pub fn hour(&self) -> u32 {
        self.read().hour()
    }

    pub fn minute(&self) -> u32 {
        self.read().minute()
    }

    pub fn second(&self) -> u32 {
        self.read().second()
    }

    pub fn millisecond(&self) -> u32 {
        self.read().timestamp_subsec_millis()
    }

    /// Day of the week, Sunday = 0.
    pub fn weekday(&self) -> u32 {
        self.read().weekday().num_days_from_sunday()
    }

    pub fn to_rfc3339(&self) -> String {
        self.read().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Replace the instant. Returns `false` if it did not move.
    pub fn set_instant(&self, instant: DateTime<Utc>) -> bool {
        {
            let mut current = self.inner.target.write();
            if *current == instant {
                return false;
            }
            *current = instant;
        }
        self.inner.scope.notify(self.id(), &[Key::Value, Key::Iterate]);
        true
    }

    fn update<F>(&self, component: &str, f: F) -> Result<bool>
    where
        F: FnOnce(DateTime<Utc>) -> Option<DateTime<Utc>>,
    {
        let current = *self.inner.target.read();
        let next = f(current).ok_or_else(|| {
            StoreError::InvalidDate(format!("{component} out of range for {current}"))
        })?;
        Ok(self.set_instant(next))
    }

    pub fn set_timestamp_millis(&self, millis: i64) -> Result<bool> {
        self.update("timestamp", |_| DateTime::from_timestamp_millis(millis))
    }

    pub fn set_year(&self, year: i32) -> Result<bool> {
        self.update("year", |d| d.with_year(year))
    }

    pub fn set_month(&self, month: u32) -> Result<bool> {
        self.update("month", |d| d.with_month(month))
    }

    pub fn set_day(&self, day: u32) -> Result<bool> {
        self.update("day", |d| d.with_day(day))
    }

    pub fn set_hour(&self, hour: u32) -> Result<bool> {
        self.update("hour", |d| d.with_hour(hour))
    }

    pub fn set_minute(&self, minute: u32) -> Result<bool> {
        self.update("minute", |d| d.with_minute(minute))
    }

    pub fn set_second(&self, second: u32) -> Result<bool> {
        self.update("second", |d| d.with_second(second))
    }

    pub fn to_raw(&self) -> Value {
        Value::Date(self.inner.target.clone())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<ReactiveDate> for Value {
    fn from(date: ReactiveDate) -> Self {
        date.to_raw()
    }
}

/// Tracks like any other accessor.
impl fmt::Display for ReactiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl fmt::Debug for ReactiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveDate")
            .field("id", &self.id())
            .field("instant", &*self.inner.target.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, Runtime, StoreTrigger};
    use crate::wrap::wrap;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixture(rt: &Runtime) -> (ReactiveDate, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let trigger = StoreTrigger::new(rt, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        let instant = Utc.with_ymd_and_hms(2024, 1, 31, 12, 30, 0).unwrap();
        let field = wrap(Value::date(instant), Some(trigger), rt);
        (field.as_date().cloned().expect("date"), fired)
    }

    #[test]
    fn getters_read_components() {
        let rt = Runtime::new();
        let (date, _) = fixture(&rt);
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 31);
        assert_eq!(date.hour(), 12);
        assert_eq!(date.minute(), 30);
        assert_eq!(date.weekday(), 3);
        assert_eq!(date.to_string(), "2024-01-31T12:30:00.000Z");
    }

    #[test]
    fn setting_the_same_instant_is_a_noop() {
        let rt = Runtime::new();
        let (date, fired) = fixture(&rt);
        assert!(!date.set_hour(12).unwrap());
        assert!(!date.set_timestamp_millis(date.timestamp_millis()).unwrap());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn setters_trigger_readers() {
        let rt = Runtime::new();
        let (date, fired) = fixture(&rt);
        let reader = date.clone();
        let year = Computed::new(&rt, move || reader.year());

        assert!(date.set_year(2025).unwrap());
        assert!(year.is_dirty());
        assert_eq!(year.get().unwrap(), 2025);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_components_are_rejected() {
        let rt = Runtime::new();
        let (date, fired) = fixture(&rt);
        // January 31st has no February counterpart.
        assert!(matches!(date.set_month(2), Err(StoreError::InvalidDate(_))));
        assert!(date.set_hour(24).is_err());
        assert_eq!(date.month(), 1);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
