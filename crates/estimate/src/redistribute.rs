use crate::model::{Assignment, PercentSource};

/// Residuals smaller than this are left alone.
const RESIDUAL_EPSILON: f64 = 1e-12;

/// Where the residual ended up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResidualTarget {
    /// Nothing to distribute.
    None,
    /// Spread over the free prefix `0..len`.
    Prefix { len: usize },
    /// Applied entirely to one slot.
    FirstFree { position: usize },
    /// No unanchored slot exists.
    Unabsorbed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Redistribution {
    pub residual: f64,
    pub target: ResidualTarget,
}

/// Length of the run of unanchored slots from position 0, stopping at the
/// first anchor or at `line`, whichever comes first.
pub fn free_prefix_len(assignment: &Assignment, line: usize) -> usize {
    (0..line.min(assignment.len()))
        .take_while(|&i| !assignment.is_anchor(i))
        .count()
}

/// Close the gap between the assignment total and 100.
///
/// The residual is spread over the free prefix in proportion to each slot's
/// share of the prefix. If the prefix is empty or has no mass, the first
/// unanchored slot takes all of it. Negative drift is clamped to zero; if
/// clamping leaves the total above 100, every unanchored slot shrinks
/// proportionally. Anchors are never touched.
pub fn redistribute(assignment: &mut Assignment, line: usize) -> Redistribution {
    let residual = 100.0 - assignment.total();
    if residual.abs() < RESIDUAL_EPSILON {
        return Redistribution {
            residual,
            target: ResidualTarget::None,
        };
    }

    let prefix = free_prefix_len(assignment, line);
    let prefix_total: f64 = assignment.values[..prefix].iter().sum();

    let target = if prefix > 0 && prefix_total > 0.0 {
        for value in &mut assignment.values[..prefix] {
            *value += residual * (*value / prefix_total);
        }
        ResidualTarget::Prefix { len: prefix }
    } else if let Some(position) = (0..assignment.len()).find(|&i| !assignment.is_anchor(i)) {
        assignment.values[position] += residual;
        ResidualTarget::FirstFree { position }
    } else {
        ResidualTarget::Unabsorbed
    };

    clamp_negative(assignment);
    shrink_overflow(assignment);

    log::debug!("residual {residual:.6} redistributed to {target:?}");
    Redistribution { residual, target }
}

/// Clamp floating-point drift below zero.
pub fn clamp_negative(assignment: &mut Assignment) {
    for value in &mut assignment.values {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// Scale unanchored slots down until the total is 100. Only ever shrinks,
/// so it cannot push a slot negative or above a cap.
fn shrink_overflow(assignment: &mut Assignment) {
    let excess = assignment.total() - 100.0;
    if excess <= RESIDUAL_EPSILON {
        return;
    }

    let free_total: f64 = assignment
        .values
        .iter()
        .zip(&assignment.sources)
        .filter(|(_, s)| **s != PercentSource::Anchor)
        .map(|(v, _)| *v)
        .sum();
    if free_total <= 0.0 {
        return;
    }

    let scale = ((free_total - excess) / free_total).max(0.0);
    for (value, source) in assignment.values.iter_mut().zip(&assignment.sources) {
        if *source != PercentSource::Anchor {
            *value *= scale;
        }
    }
}
