use crate::config::PercentRange;
use crate::interpolate::{base_is_free, fill_above_line};
use crate::model::{Assignment, KnownAnchor};

/// Best-seen result of the base-diluent search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub assignment: Assignment,
    /// Retained base value; `None` when slot 0 is not a search parameter.
    pub base: Option<f64>,
    /// `|sum - 100|` of `assignment`.
    pub error: f64,
    pub rounds_run: u32,
}

/// Search interval for the base value.
///
/// The profile range, lifted so the base never sits below a known value
/// declared after it.
pub fn search_bounds(range: PercentRange, anchors: &[KnownAnchor]) -> (f64, f64) {
    let highest = anchors.iter().map(|a| a.percentage).fold(0.0_f64, f64::max);
    let lo = range.min.max(highest);
    let hi = range.max.max(lo);
    (lo, hi)
}

/// Bounded bisection over the base value.
///
/// Each round interpolates the above-line zone from the midpoint candidate
/// and compares the total to 100: too high lowers the interval, too low
/// raises it. The assignment with the smallest `|sum - 100|` over all
/// rounds is returned, not the last one.
///
/// `seed` must already hold anchors and the sub-line zone.
pub fn bisect_base(
    seed: &Assignment,
    anchors: &[KnownAnchor],
    line: usize,
    range: PercentRange,
    rounds: u32,
) -> SearchOutcome {
    if !base_is_free(seed, line) {
        let mut assignment = seed.clone();
        fill_above_line(&mut assignment, anchors, line, 0.0);
        let error = (assignment.total() - 100.0).abs();
        return SearchOutcome {
            assignment,
            base: None,
            error,
            rounds_run: 0,
        };
    }

    let (mut lo, mut hi) = search_bounds(range, anchors);
    let mut best: Option<SearchOutcome> = None;
    let rounds = rounds.max(1);

    for round in 1..=rounds {
        let candidate = (lo + hi) / 2.0;
        let mut assignment = seed.clone();
        fill_above_line(&mut assignment, anchors, line, candidate);
        let total = assignment.total();
        let error = (total - 100.0).abs();

        log::trace!("round {round}: base {candidate:.6} -> total {total:.6}");

        if best.as_ref().map_or(true, |b| error < b.error) {
            best = Some(SearchOutcome {
                assignment,
                base: Some(candidate),
                error,
                rounds_run: round,
            });
        }

        if total > 100.0 {
            hi = candidate;
        } else {
            lo = candidate;
        }
    }

    // rounds >= 1, so at least one candidate was recorded.
    let mut outcome = best.unwrap_or_else(|| SearchOutcome {
        assignment: seed.clone(),
        base: None,
        error: f64::INFINITY,
        rounds_run: 0,
    });
    outcome.rounds_run = rounds;
    log::debug!(
        "base search: {:?} after {} rounds, error {:.6}",
        outcome.base,
        rounds,
        outcome.error
    );
    outcome
}
