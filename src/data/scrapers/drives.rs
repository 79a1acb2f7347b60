//! Drive scoring attribution
//!
//! Correlates a team's drive log with the game's scoring table. A drive is
//! matched to the scoring play that happened at the moment the drive ended;
//! the running-score delta on that play says who scored and how much.

/// Minutes in a regulation period
const PERIOD_MINUTES: i64 = 15;

/// Game period; `OT` and `5` both label overtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Period {
    First,
    Second,
    Third,
    Fourth,
    Overtime,
}

impl Period {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "1" => Some(Period::First),
            "2" => Some(Period::Second),
            "3" => Some(Period::Third),
            "4" => Some(Period::Fourth),
            "5" | "OT" => Some(Period::Overtime),
            _ => None,
        }
    }

    /// Following period; overtime is terminal
    pub fn next(self) -> Self {
        match self {
            Period::First => Period::Second,
            Period::Second => Period::Third,
            Period::Third => Period::Fourth,
            Period::Fourth | Period::Overtime => Period::Overtime,
        }
    }
}

/// Which side of the scoring table a team occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Away,
    Home,
}

/// Split `M:SS` into minutes and seconds
fn split_clock(clock: &str) -> Option<(i64, i64)> {
    let (min, sec) = clock.trim().split_once(':')?;
    let min = if min.is_empty() { 0 } else { min.parse().ok()? };
    let sec = if sec.is_empty() { 0 } else { sec.parse().ok()? };
    Some((min, sec))
}

/// `M:SS` as total seconds
pub fn clock_seconds(clock: &str) -> Option<i64> {
    split_clock(clock).map(|(m, s)| m * 60 + s)
}

/// Period and clock (in seconds) at which a drive ended.
///
/// Subtracting the duration from the start clock borrows seconds from
/// minutes; if minutes still go negative the drive ran into the next period.
pub fn drive_end(period: Period, time_start: &str, time_total: &str) -> Option<(Period, i64)> {
    let (start_min, start_sec) = split_clock(time_start)?;
    let (total_min, total_sec) = split_clock(time_total)?;

    let mut end_sec = start_sec - total_sec;
    let mut end_min = start_min - total_min;
    if end_sec < 0 {
        end_sec += 60;
        end_min -= 1;
    }

    let mut period = period;
    if end_min < 0 {
        end_min += PERIOD_MINUTES;
        period = period.next();
    }

    Some((period, end_min * 60 + end_sec))
}

/// One row of the scoring table with the running score after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringEvent {
    pub period: Period,
    pub clock: i64,
    pub away_score: i64,
    pub home_score: i64,
}

/// Points attributed to a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveOutcome {
    pub points_scored: i64,
    /// The other team scored during this possession (pick-six, return TD...)
    pub opposing_touchdown: bool,
}

/// The game's scoring plays in chronological order
#[derive(Debug, Clone, Default)]
pub struct ScoringLog {
    events: Vec<ScoringEvent>,
}

impl ScoringLog {
    pub fn new(events: Vec<ScoringEvent>) -> Self {
        ScoringLog { events }
    }

    pub fn events(&self) -> &[ScoringEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Build from scoring-table cell texts:
    /// `[quarter, time, team, description, away score, home score, ...]`.
    ///
    /// The quarter cell is only filled on the first play of each period;
    /// blank cells inherit it. Rows with fewer than six cells are skipped,
    /// as are rows that cannot be read (and blank-quarter rows following an
    /// unreadable quarter label). Returns `None` when scoring rows exist but
    /// none of them can be read.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Option<Self>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut events = Vec::new();
        let mut current: Option<Period> = None;
        let mut skipped = 0;

        for (i, row) in rows.into_iter().enumerate() {
            let cells = row.as_ref();
            if cells.len() < 6 {
                continue;
            }
            let label = cells[0].as_ref().trim();
            if !label.is_empty() {
                current = Period::parse(label);
            }
            match read_event(current, cells) {
                Some(event) => events.push(event),
                None => {
                    log::debug!("Skipping unreadable scoring row {}", i);
                    skipped += 1;
                }
            }
        }

        if events.is_empty() && skipped > 0 {
            return None;
        }
        Some(ScoringLog { events })
    }

    /// Attribute points to a drive held by `side`
    pub fn attribute(
        &self,
        quarter: &str,
        time_start: &str,
        time_total: &str,
        side: Side,
    ) -> DriveOutcome {
        let Some(period) = Period::parse(quarter) else {
            return DriveOutcome::default();
        };
        let Some((end_period, end_clock)) = drive_end(period, time_start, time_total) else {
            return DriveOutcome::default();
        };
        let Some(idx) = self
            .events
            .iter()
            .position(|e| e.period == end_period && e.clock == end_clock)
        else {
            return DriveOutcome::default();
        };

        let event = self.events[idx];
        let (prev_away, prev_home) = match idx.checked_sub(1).map(|i| self.events[i]) {
            Some(prev) => (prev.away_score, prev.home_score),
            None => (0, 0),
        };

        let away_delta = event.away_score - prev_away;
        let home_delta = event.home_score - prev_home;
        let (scorer, points) = if away_delta > 0 {
            (Side::Away, away_delta)
        } else if home_delta > 0 {
            (Side::Home, home_delta)
        } else {
            return DriveOutcome::default();
        };

        DriveOutcome {
            points_scored: points,
            opposing_touchdown: scorer != side,
        }
    }
}

fn read_event<S: AsRef<str>>(period: Option<Period>, cells: &[S]) -> Option<ScoringEvent> {
    Some(ScoringEvent {
        period: period?,
        clock: clock_seconds(cells[1].as_ref())?,
        away_score: parse_score(cells[4].as_ref())?,
        home_score: parse_score(cells[5].as_ref())?,
    })
}

fn parse_score(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    if cell.is_empty() {
        Some(0)
    } else {
        cell.parse().ok()
    }
}
