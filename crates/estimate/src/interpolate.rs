use crate::model::{Assignment, KnownAnchor, PercentSource};
use crate::zone::SUB_LINE_CAP;

/// A fixed point bounding an interpolation segment.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bound {
    position: usize,
    value: f64,
}

/// True when slot 0 is free and above the line, i.e. the base diluent is a
/// search parameter rather than a known value.
pub fn base_is_free(assignment: &Assignment, line: usize) -> bool {
    line > 0 && !assignment.is_empty() && !assignment.is_anchor(0)
}

/// Fill every unanchored slot before `line`.
///
/// Segments run between: slot 0 (the candidate `base`, or its anchor), each
/// anchor before the line, and a synthetic end bound at `line`. Slots inside
/// a segment get an equal-step progression that never touches either bound.
pub fn fill_above_line(assignment: &mut Assignment, anchors: &[KnownAnchor], line: usize, base: f64) {
    if line == 0 || assignment.is_empty() {
        return;
    }

    let start = if assignment.is_anchor(0) {
        Bound {
            position: 0,
            value: assignment.values[0],
        }
    } else {
        assignment.values[0] = base;
        assignment.sources[0] = PercentSource::Base;
        Bound {
            position: 0,
            value: base,
        }
    };

    let mut bounds = vec![start];
    bounds.extend(
        anchors
            .iter()
            .filter(|a| a.position > 0 && a.position < line)
            .map(|a| Bound {
                position: a.position,
                value: a.percentage,
            }),
    );
    let last = bounds.last().map_or(SUB_LINE_CAP, |b| b.value);
    bounds.push(Bound {
        position: line,
        value: SUB_LINE_CAP.min(last),
    });

    for segment in bounds.windows(2) {
        let (from, to) = (segment[0], segment[1]);
        let span = (to.position - from.position) as f64;
        let step = (to.value - from.value) / span;
        for position in from.position + 1..to.position {
            let offset = (position - from.position) as f64;
            assignment.values[position] = from.value + step * offset;
            assignment.sources[position] = PercentSource::Interpolated;
        }
    }
}
