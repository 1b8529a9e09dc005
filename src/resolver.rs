use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::db::{self, Database};
use crate::lookup::GenreLookup;

/// Time source for the lookup throttle.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Enforces a minimum gap between consecutive external calls.
pub struct Throttle<C: Clock> {
    clock: C,
    interval: Duration,
    last_call: Option<Instant>,
}

impl<C: Clock> Throttle<C> {
    pub fn new(clock: C, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            last_call: None,
        }
    }

    /// Block until `interval` has passed since the previous call, then
    /// record this one. The first call never waits.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.interval {
                self.clock.sleep(self.interval - elapsed);
            }
        }
        self.last_call = Some(self.clock.now());
    }
}

/// Result of resolving a batch of artists.
#[derive(Debug, Default)]
pub struct ResolveSummary {
    /// Distinct non-empty names after trimming.
    pub distinct: usize,
    /// Already in the cache, no lookup needed.
    pub cached: usize,
    pub looked_up: usize,
    /// Lookups that failed and were cached as empty.
    pub failed: usize,
}

/// Resolves artists to genres through the cache, falling back to a
/// throttled external lookup.
pub struct GenreResolver<L: GenreLookup, C: Clock> {
    lookup: L,
    throttle: Throttle<C>,
    show_progress: bool,
}

impl<L: GenreLookup, C: Clock> GenreResolver<L, C> {
    pub fn new(lookup: L, clock: C, interval: Duration) -> Self {
        Self {
            lookup,
            throttle: Throttle::new(clock, interval),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Make sure every distinct artist in `artists` has a cache entry.
    ///
    /// Names are trimmed and deduplicated in first-seen order; blank names
    /// are skipped. A failed lookup is logged and cached as an empty genre
    /// list, so the artist is never retried against this store.
    pub fn resolve_all<S: AsRef<str>>(
        &mut self,
        db: &Database,
        artists: &[S],
    ) -> db::Result<ResolveSummary> {
        let names = distinct_names(artists);
        let mut summary = ResolveSummary {
            distinct: names.len(),
            ..Default::default()
        };

        let mut pending = Vec::new();
        for name in names {
            if db.get_cached_genres(name)?.is_some() {
                summary.cached += 1;
            } else {
                pending.push(name);
            }
        }
        log::info!(
            "{} distinct artists, {} cached, {} to look up",
            summary.distinct,
            summary.cached,
            pending.len()
        );

        let pb = if self.show_progress {
            ProgressBar::new(pending.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} artists ({eta} remaining) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );

        for name in pending {
            pb.set_message(name.to_string());
            self.throttle.wait();

            let genres = match self.lookup.lookup(name) {
                Ok(set) => {
                    log::debug!("{name}: {} genres", set.len());
                    set.into_iter().collect::<Vec<_>>().join(",")
                }
                Err(e) => {
                    log::warn!("Genre lookup failed, caching as empty: {e}");
                    summary.failed += 1;
                    String::new()
                }
            };

            db.put_cached_genres(name, &genres)?;
            summary.looked_up += 1;
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(summary)
    }
}

/// Trimmed, non-empty, deduplicated names in first-seen order.
fn distinct_names<S: AsRef<str>>(artists: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    artists
        .iter()
        .map(|a| a.as_ref().trim())
        .filter(|a| !a.is_empty() && seen.insert(*a))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lookup::LookupError;
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeSet, HashMap};
    use std::rc::Rc;

    /// Clock that advances only when slept on, recording each sleep.
    #[derive(Clone)]
    pub struct FakeClock {
        start: Instant,
        offset: Rc<Cell<Duration>>,
        pub sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
                sleeps: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn advance(&self, d: Duration) {
            self.offset.set(self.offset.get() + d);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.start + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    /// Lookup backed by a fixed table; unknown artists fail.
    #[derive(Clone, Default)]
    pub struct FakeLookup {
        table: HashMap<String, Vec<String>>,
        pub calls: Rc<RefCell<Vec<String>>>,
    }

    impl FakeLookup {
        pub fn with(mut self, artist: &str, genres: &[&str]) -> Self {
            self.table.insert(
                artist.to_string(),
                genres.iter().map(|g| g.to_string()).collect(),
            );
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl GenreLookup for FakeLookup {
        fn lookup(&mut self, artist: &str) -> Result<BTreeSet<String>, LookupError> {
            self.calls.borrow_mut().push(artist.to_string());
            match self.table.get(artist) {
                Some(genres) => Ok(genres.iter().cloned().collect()),
                None => Err(LookupError::UnexpectedResponse {
                    artist: artist.to_string(),
                    reason: "not in fake table".to_string(),
                }),
            }
        }
    }

    fn resolver(lookup: FakeLookup, clock: FakeClock) -> GenreResolver<FakeLookup, FakeClock> {
        GenreResolver::new(lookup, clock, Duration::from_secs(1))
    }

    #[test]
    fn test_throttle_first_call_does_not_wait() {
        let clock = FakeClock::new();
        let mut throttle = Throttle::new(clock.clone(), Duration::from_secs(1));
        throttle.wait();
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_throttle_waits_remaining_interval() {
        let clock = FakeClock::new();
        let mut throttle = Throttle::new(clock.clone(), Duration::from_secs(1));
        throttle.wait();
        clock.advance(Duration::from_millis(300));
        throttle.wait();
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_millis(700)]);
    }

    #[test]
    fn test_throttle_no_wait_after_interval_elapsed() {
        let clock = FakeClock::new();
        let mut throttle = Throttle::new(clock.clone(), Duration::from_secs(1));
        throttle.wait();
        clock.advance(Duration::from_secs(2));
        throttle.wait();
        assert!(clock.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_distinct_names_trims_and_dedups() {
        let input = vec![" Queen", "David Bowie", "Queen ", "", "  ", "David Bowie"];
        assert_eq!(distinct_names(&input), vec!["Queen", "David Bowie"]);
    }

    #[test]
    fn test_one_entry_per_distinct_artist() {
        let db = Database::open_in_memory().unwrap();
        let lookup = FakeLookup::default()
            .with("Queen", &["rock", "glam rock"])
            .with("David Bowie", &["art rock"]);
        let mut r = resolver(lookup.clone(), FakeClock::new());

        let summary = r
            .resolve_all(&db, &["Queen", " Queen ", "David Bowie", "Queen"])
            .unwrap();

        assert_eq!(summary.distinct, 2);
        assert_eq!(summary.looked_up, 2);
        assert_eq!(lookup.call_count(), 2);
        assert_eq!(db.cache_entries().unwrap().len(), 2);
        // Sorted labels, comma-joined
        assert_eq!(
            db.get_cached_genres("Queen").unwrap().as_deref(),
            Some("glam rock,rock")
        );
    }

    #[test]
    fn test_second_run_does_no_lookups() {
        let db = Database::open_in_memory().unwrap();
        let lookup = FakeLookup::default().with("Queen", &["rock"]);
        let artists = ["Queen", "Nobody Knows Me"];

        resolver(lookup.clone(), FakeClock::new())
            .resolve_all(&db, &artists)
            .unwrap();
        assert_eq!(lookup.call_count(), 2);

        let summary = resolver(lookup.clone(), FakeClock::new())
            .resolve_all(&db, &artists)
            .unwrap();
        assert_eq!(lookup.call_count(), 2);
        assert_eq!(summary.cached, 2);
        assert_eq!(summary.looked_up, 0);
    }

    #[test]
    fn test_failed_lookup_cached_as_empty() {
        let db = Database::open_in_memory().unwrap();
        let lookup = FakeLookup::default().with("Queen", &["rock"]);

        let summary = resolver(lookup, FakeClock::new())
            .resolve_all(&db, &["Obscure Demo Band", "Queen"])
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.looked_up, 2);
        assert_eq!(
            db.get_cached_genres("Obscure Demo Band").unwrap().as_deref(),
            Some("")
        );
        assert_eq!(db.get_cached_genres("Queen").unwrap().as_deref(), Some("rock"));
    }

    #[test]
    fn test_empty_result_cached() {
        let db = Database::open_in_memory().unwrap();
        let lookup = FakeLookup::default().with("Unknown", &[]);

        let summary = resolver(lookup, FakeClock::new())
            .resolve_all(&db, &["Unknown"])
            .unwrap();

        assert_eq!(summary.failed, 0);
        assert_eq!(db.get_cached_genres("Unknown").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_lookups_are_throttled() {
        let db = Database::open_in_memory().unwrap();
        let clock = FakeClock::new();
        let lookup = FakeLookup::default()
            .with("A", &["a"])
            .with("B", &["b"])
            .with("C", &["c"]);

        resolver(lookup, clock.clone())
            .resolve_all(&db, &["A", "B", "C"])
            .unwrap();

        // Fake lookups take no time, so every call after the first waits the full second
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_secs(1), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_cache_hits_do_not_consume_throttle() {
        let db = Database::open_in_memory().unwrap();
        db.put_cached_genres("A", "a").unwrap();
        let clock = FakeClock::new();
        let lookup = FakeLookup::default().with("B", &["b"]);

        resolver(lookup, clock.clone())
            .resolve_all(&db, &["A", "B"])
            .unwrap();

        assert!(clock.sleeps.borrow().is_empty());
    }
}
