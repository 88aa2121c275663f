use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use coloriz_macros::Storage;
use coloriz_storage::{Compress, MsgPack, Stored};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use twilight_model::id::marker::{GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::util::Result;

/// A guild member, keyed by guild and user.
pub type Member = (Id<GuildMarker>, Id<UserMarker>);

coloriz_macros::global! {
    /// The locks that serialize access to each member's stored history.
    static LOCKS: Mutex<HashMap<Member, Arc<tokio::sync::Mutex<()>>>> = Mutex::default();
}

/// A single span of time during which a member held one color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRecord {
    /// The canonical hex of the held color.
    pub color: Box<str>,
    /// When the color was assigned.
    pub started: OffsetDateTime,
    /// When the color was replaced or cleared, or `None` if it is still held.
    pub ended: Option<OffsetDateTime>,
}

impl ColorRecord {
    /// Returns whether the color is still held.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.ended.is_none()
    }

    /// Returns how long the color was held, counting an active record up to `now`.
    #[must_use]
    pub fn duration(&self, now: OffsetDateTime) -> Duration {
        (self.ended.unwrap_or(now) - self.started).max(Duration::ZERO)
    }
}

/// A record paired with its measured duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Held<'h> {
    /// The measured record.
    pub record: &'h ColorRecord,
    /// How long the color was held.
    pub duration: Duration,
}

impl Held<'_> {
    /// Returns whether this is the member's current color.
    #[must_use]
    pub const fn is_current(&self) -> bool {
        self.record.is_active()
    }
}

/// A member's color history within a single guild.
///
/// At most one record is active, and it is always the last one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Storage)]
#[format(Compress<MsgPack, 3>)]
#[location("history/{}/{}", Id<GuildMarker>, Id<UserMarker>)]
pub struct History {
    records: Vec<ColorRecord>,
}

impl History {
    /// Returns every record, oldest first.
    #[must_use]
    pub fn records(&self) -> &[ColorRecord] {
        &self.records
    }

    /// Returns whether no color has ever been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records a color change at `now`, where `None` means the color was cleared.
    ///
    /// Setting the color that is already held changes nothing. Returns whether the history was
    /// modified.
    pub fn record(&mut self, color: Option<&str>, now: OffsetDateTime) -> bool {
        let active = self.records.last_mut().filter(|r| r.is_active());

        if let Some(active) = active {
            if color.is_some_and(|c| c.eq_ignore_ascii_case(&active.color)) {
                return false;
            }

            active.ended = Some(now);
        } else if color.is_none() {
            return false;
        }

        if let Some(color) = color {
            let color = color.to_ascii_uppercase().into_boxed_str();

            self.records.push(ColorRecord { color, started: now, ended: None });
        }

        true
    }

    /// Returns every record paired with its duration as of `now`.
    fn held(&self, now: OffsetDateTime) -> impl Iterator<Item = Held<'_>> {
        self.records.iter().map(move |record| Held { record, duration: record.duration(now) })
    }

    /// Returns the currently held color.
    #[must_use]
    pub fn current(&self, now: OffsetDateTime) -> Option<Held<'_>> {
        self.held(now).last().filter(Held::is_current)
    }

    /// Returns the color held for the longest time, preferring the earliest on ties.
    #[must_use]
    pub fn longest(&self, now: OffsetDateTime) -> Option<Held<'_>> {
        self.held(now).reduce(|best, next| if next.duration > best.duration { next } else { best })
    }

    /// Returns the color held for the shortest time, preferring the earliest on ties.
    #[must_use]
    pub fn shortest(&self, now: OffsetDateTime) -> Option<Held<'_>> {
        self.held(now).reduce(|best, next| if next.duration < best.duration { next } else { best })
    }
}

/// Returns the lock guarding the given member's stored history.
///
/// Locks that nobody else holds a handle to are dropped from the map along the way.
fn lock(member: Member) -> Arc<tokio::sync::Mutex<()>> {
    // the map is never left half-updated, so a poisoned lock is still usable
    let mut locks = locks().lock().unwrap_or_else(PoisonError::into_inner);

    locks.retain(|_, lock| Arc::strong_count(lock) > 1);

    Arc::clone(locks.entry(member).or_default())
}

impl History {
    /// Reads a member's stored history, or an empty one if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored history could not be read.
    pub async fn load(member: Member) -> Result<Self> {
        let lock = self::lock(member);
        let _guard = lock.lock().await;

        Ok(tokio::task::spawn_blocking(move || Self::stored(member).read_or_default()).await??)
    }

    /// Applies a change to a member's stored history and writes it back.
    ///
    /// Changes to the same member are applied one at a time, on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// This function will return an error if the stored history could not be read or written.
    pub async fn update<R, F>(member: Member, change: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Self) -> R + Send + 'static,
    {
        let lock = self::lock(member);
        let _guard = lock.lock().await;

        Ok(tokio::task::spawn_blocking(move || Self::stored(member).modify(change)).await??)
    }
}

/// Describes a duration in its largest whole unit, such as `3 days` or `1 hour`.
#[must_use]
pub fn humanize(duration: Duration) -> String {
    const UNITS: [(i64, i64, &str); 7] = [
        (60, 1, "second"),
        (3_600, 60, "minute"),
        (86_400, 3_600, "hour"),
        (604_800, 86_400, "day"),
        (2_628_000, 604_800, "week"),
        (31_540_000, 2_628_000, "month"),
        (i64::MAX, 31_540_000, "year"),
    ];

    let seconds = duration.whole_seconds().max(0);
    let (_, size, unit) = UNITS.into_iter().find(|(limit, ..)| seconds < *limit).unwrap_or(UNITS[6]);
    let count = seconds / size;

    if count == 1 { format!("{count} {unit}") } else { format!("{count} {unit}s") }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const START: OffsetDateTime = datetime!(2023-06-01 12:00 UTC);

    #[test]
    fn same_color_is_ignored() {
        let mut history = History::default();

        assert!(history.record(Some("#ff0000"), START));
        assert!(!history.record(Some("#FF0000"), START + Duration::hours(1)));
        assert_eq!(history.records().len(), 1);
        assert_eq!(&*history.records()[0].color, "#FF0000");
    }

    #[test]
    fn changes_close_the_active_record() {
        let mut history = History::default();

        history.record(Some("#FF0000"), START);
        history.record(Some("#00FF00"), START + Duration::minutes(5));

        let records = history.records();

        assert_eq!(records[0].ended, Some(START + Duration::minutes(5)));
        assert!(records[1].is_active());
        assert_eq!(records.iter().filter(|r| r.is_active()).count(), 1);
    }

    #[test]
    fn clearing_closes_without_pushing() {
        let mut history = History::default();

        assert!(!history.record(None, START));
        assert!(history.record(Some("#FF0000"), START));
        assert!(history.record(None, START + Duration::DAY));
        assert!(!history.record(None, START + Duration::WEEK));
        assert_eq!(history.records().len(), 1);
        assert!(history.current(START + Duration::WEEK).is_none());
    }

    #[test]
    fn extremes_include_the_live_record() {
        let mut history = History::default();

        history.record(Some("#111111"), START);
        history.record(Some("#222222"), START + Duration::hours(2));
        history.record(Some("#333333"), START + Duration::hours(3));

        let early = START + Duration::minutes(200);
        let late = START + Duration::DAY;

        assert_eq!(&*history.longest(early).unwrap().record.color, "#111111");
        assert_eq!(&*history.shortest(early).unwrap().record.color, "#333333");
        assert!(history.shortest(early).unwrap().is_current());

        assert!(history.longest(late).unwrap().is_current());
        assert_eq!(&*history.shortest(late).unwrap().record.color, "#222222");
        assert_eq!(history.current(late).unwrap().duration, Duration::hours(21));
    }

    #[test]
    fn ties_prefer_the_earliest_record() {
        let mut history = History::default();

        history.record(Some("#111111"), START);
        history.record(Some("#222222"), START + Duration::HOUR);
        history.record(None, START + Duration::hours(2));

        let now = START + Duration::DAY;

        assert_eq!(&*history.longest(now).unwrap().record.color, "#111111");
        assert_eq!(&*history.shortest(now).unwrap().record.color, "#111111");
    }

    #[test]
    fn humanizes_by_largest_unit() {
        assert_eq!(humanize(Duration::ZERO), "0 seconds");
        assert_eq!(humanize(Duration::SECOND), "1 second");
        assert_eq!(humanize(Duration::seconds(59)), "59 seconds");
        assert_eq!(humanize(Duration::seconds(60)), "1 minute");
        assert_eq!(humanize(Duration::seconds(7_199)), "1 hour");
        assert_eq!(humanize(Duration::days(3)), "3 days");
        assert_eq!(humanize(Duration::days(8)), "1 week");
        assert_eq!(humanize(Duration::days(40)), "1 month");
        assert_eq!(humanize(Duration::days(800)), "2 years");
        assert_eq!(humanize(Duration::seconds(-5)), "0 seconds");
    }

    #[test]
    fn members_share_one_lock() {
        let guild = Id::new(1);
        let first = lock((guild, Id::new(2)));
        let again = lock((guild, Id::new(2)));
        let other = lock((guild, Id::new(3)));

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));

        let _guard = first.try_lock().expect("the lock should be free");

        assert!(again.try_lock().is_err());
        assert!(other.try_lock().is_ok());
    }
}
