use std::fmt::Display;

use chrono::{DateTime, Utc};

use super::FetchError;

/// The lifecycle states of a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// No request issued yet.
    Idle,
    /// A page request is in flight.
    Requesting,
    /// A fetched page is being committed to storage.
    Committing,
    /// The run completed normally.
    Done,
    /// The run stopped early, keeping committed progress.
    Aborted,
}

impl Display for CrawlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CrawlState::Idle => "Idle",
            CrawlState::Requesting => "Requesting",
            CrawlState::Committing => "Committing",
            CrawlState::Done => "Done",
            CrawlState::Aborted => "Aborted",
        };
        write!(f, "{label}")
    }
}

/// Why a crawl run stopped before reaching its target.
#[derive(Debug)]
pub enum AbortReason {
    /// The fetcher surfaced a terminal failure.
    Fetch(FetchError),
    /// A page commit failed past the persister's retry bound.
    Storage(String),
    /// An external stop signal was observed between pages.
    Cancelled,
}

impl Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::Fetch(error) => write!(f, "fetch failure: {error}"),
            AbortReason::Storage(error) => write!(f, "storage failure: {error}"),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The terminal state of a crawl run.
#[derive(Debug)]
pub enum CrawlOutcome {
    /// Target reached or results exhausted.
    Done,
    /// Stopped early; committed pages are kept.
    Aborted(AbortReason),
}

impl Display for CrawlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlOutcome::Done => write!(f, "Done"),
            CrawlOutcome::Aborted(reason) => write!(f, "Aborted ({reason})"),
        }
    }
}

/// The summary produced on every termination path of a crawl run.
#[derive(Debug)]
pub struct CrawlReport {
    /// Records committed across all pages.
    pub collected: u32,
    /// Records newly inserted (the rest refreshed existing rows).
    pub inserted: u32,
    /// Pages committed.
    pub pages: u32,
    /// How the run ended.
    pub outcome: CrawlOutcome,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl CrawlReport {
    /// Whether the run completed normally.
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, CrawlOutcome::Done)
    }

    /// Records that refreshed an already stored repository.
    pub fn updated(&self) -> u32 {
        self.collected - self.inserted
    }
}

impl Display for CrawlReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Crawl {}: collected={} (inserted={}, updated={}), pages={}",
            self.outcome,
            self.collected,
            self.inserted,
            self.updated(),
            self.pages
        )
    }
}

/// Bookkeeping for one bounded crawl run. Owns the cursor position for its
/// duration; no two concurrent runs share one.
#[derive(Debug)]
pub struct CrawlRun {
    target: u32,
    collected: u32,
    inserted: u32,
    pages: u32,
    cursor: Option<String>,
    state: CrawlState,
    started_at: DateTime<Utc>,
}

impl CrawlRun {
    /// Creates a new run toward the given record target.
    pub fn new(target: u32) -> Self {
        Self {
            target,
            collected: 0,
            inserted: 0,
            pages: 0,
            cursor: None,
            state: CrawlState::Idle,
            started_at: Utc::now(),
        }
    }

    /// The record target for this run.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Records committed so far.
    pub fn collected(&self) -> u32 {
        self.collected
    }

    /// The cursor the next request continues from.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// The current lifecycle state.
    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Marks a page request in flight.
    pub fn begin_request(&mut self) {
        self.state = CrawlState::Requesting;
    }

    /// Marks a fetched page being committed.
    pub fn begin_commit(&mut self) {
        self.state = CrawlState::Committing;
    }

    /// Advances the run past a committed page.
    pub fn record_page(&mut self, fetched: u32, inserted: u32, end_cursor: Option<String>) {
        self.collected += fetched;
        self.inserted += inserted;
        self.pages += 1;
        self.cursor = end_cursor;
    }

    /// Whether the run has collected at least its target.
    pub fn has_reached_target(&self) -> bool {
        self.collected >= self.target
    }

    /// Ends the run normally.
    pub fn finish(mut self) -> CrawlReport {
        self.state = CrawlState::Done;
        self.into_report(CrawlOutcome::Done)
    }

    /// Ends the run early, keeping committed progress.
    pub fn abort(mut self, reason: AbortReason) -> CrawlReport {
        self.state = CrawlState::Aborted;
        self.into_report(CrawlOutcome::Aborted(reason))
    }

    fn into_report(self, outcome: CrawlOutcome) -> CrawlReport {
        CrawlReport {
            collected: self.collected,
            inserted: self.inserted,
            pages: self.pages,
            outcome,
            started_at: self.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_starts_idle_without_cursor() {
        let run = CrawlRun::new(250);

        assert_eq!(CrawlState::Idle, run.state());
        assert_eq!(None, run.cursor());
        assert_eq!(0, run.collected());
    }

    #[test]
    fn record_page_advances_counters_and_cursor() {
        let mut run = CrawlRun::new(250);

        run.begin_request();
        assert_eq!(CrawlState::Requesting, run.state());
        run.begin_commit();
        assert_eq!(CrawlState::Committing, run.state());
        run.record_page(100, 80, Some("cursor-1".to_string()));

        assert_eq!(100, run.collected());
        assert_eq!(Some("cursor-1"), run.cursor());
        assert!(!run.has_reached_target());
    }

    #[test]
    fn target_reached_after_enough_pages() {
        let mut run = CrawlRun::new(150);

        run.record_page(100, 100, Some("cursor-1".to_string()));
        run.record_page(100, 90, Some("cursor-2".to_string()));

        assert!(run.has_reached_target());
    }

    #[test]
    fn finish_produces_done_report() {
        let mut run = CrawlRun::new(100);
        run.record_page(100, 60, None);

        let report = run.finish();

        assert!(report.is_done());
        assert_eq!(100, report.collected);
        assert_eq!(60, report.inserted);
        assert_eq!(40, report.updated());
        assert_eq!(1, report.pages);
    }

    #[test]
    fn abort_keeps_committed_progress() {
        let mut run = CrawlRun::new(300);
        run.record_page(100, 100, Some("cursor-1".to_string()));
        run.record_page(100, 100, Some("cursor-2".to_string()));

        let report = run.abort(AbortReason::Storage("connection lost".to_string()));

        assert!(!report.is_done());
        assert_eq!(200, report.collected);
        assert!(matches!(
            report.outcome,
            CrawlOutcome::Aborted(AbortReason::Storage(_))
        ));
    }

    #[test]
    fn report_display_names_outcome_and_counts() {
        let mut run = CrawlRun::new(100);
        run.record_page(50, 50, None);

        let rendered = run.finish().to_string();

        assert!(rendered.contains("Done"));
        assert!(rendered.contains("collected=50"));
    }
}
