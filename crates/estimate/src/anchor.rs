//! Known-percentage validation and attachment.
//!
//! Everything here runs before the search. Any failure rejects the whole
//! request; nothing is guessed around.

use crate::error::EstimateError;
use crate::model::{IngredientSlot, KnownAnchor, KnownPercentage};
use crate::normalize::normalize_name;
use crate::resolver::{similarity_ratio, IdentityResolver};

/// Slack for floating-point sums of caller values.
const SUM_TOLERANCE: f64 = 1e-9;

/// Reject non-finite or negative values, then an over-100 total.
///
/// A single value above 100 is an overflow like any other total above 100.
pub fn check_values(known: &[KnownPercentage]) -> Result<(), EstimateError> {
    for k in known {
        if !k.percentage.is_finite() || k.percentage < 0.0 {
            return Err(EstimateError::InvalidAnchor {
                name: k.name.clone(),
                value: k.percentage,
            });
        }
    }

    let total: f64 = known.iter().map(|k| k.percentage).sum();
    if total > 100.0 + SUM_TOLERANCE {
        return Err(EstimateError::AnchorOverflow { total });
    }
    Ok(())
}

/// Attach each known percentage to the first unconsumed slot it matches.
///
/// A slot matches when both sides resolve to the same identity, or, when
/// either side is unresolved, when the normalized names reach `threshold`.
/// Returns anchors sorted by position.
pub fn attach(
    known: &[KnownPercentage],
    slots: &[IngredientSlot],
    resolver: &dyn IdentityResolver,
    threshold: f64,
) -> Result<Vec<KnownAnchor>, EstimateError> {
    let mut consumed = vec![false; slots.len()];
    let mut anchors = Vec::with_capacity(known.len());

    for k in known {
        let name = normalize_name(&k.name);
        let resolution = resolver.resolve(&k.name);
        let identity = resolution.accepted(threshold);

        let hit = slots
            .iter()
            .enumerate()
            .position(|(i, slot)| !consumed[i] && matches_slot(&name, identity, slot, threshold));

        let Some(index) = hit else {
            return Err(EstimateError::UnresolvedAnchor { name: k.name.clone() });
        };
        consumed[index] = true;

        log::debug!(
            "known '{}' = {}% attached to position {} ('{}')",
            k.name,
            k.percentage,
            slots[index].position,
            slots[index].raw_name
        );
        anchors.push(KnownAnchor {
            position: slots[index].position,
            percentage: k.percentage,
            name: k.name.clone(),
        });
    }

    anchors.sort_by_key(|a| a.position);
    Ok(anchors)
}

fn matches_slot(name: &str, identity: Option<&str>, slot: &IngredientSlot, threshold: f64) -> bool {
    match (identity, slot.identity.as_deref()) {
        (Some(a), Some(s)) => a == s,
        _ => similarity_ratio(name, &slot.raw_name) >= threshold,
    }
}

/// Anchors read in position order must be non-increasing.
pub fn check_order(anchors: &[KnownAnchor]) -> Result<(), EstimateError> {
    for pair in anchors.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if later.percentage > earlier.percentage {
            return Err(EstimateError::OrderViolation {
                earlier: earlier.name.clone(),
                earlier_value: earlier.percentage,
                later: later.name.clone(),
                later_value: later.percentage,
            });
        }
    }
    Ok(())
}

/// An anchor above 1% declared after the one-percent line contradicts the
/// marker, which implies 1% or less from that point on.
pub fn check_line(
    anchors: &[KnownAnchor],
    slots: &[IngredientSlot],
    line: usize,
) -> Result<(), EstimateError> {
    let Some(marker) = slots.get(line) else {
        return Ok(());
    };
    match anchors.iter().find(|a| a.position > line && a.percentage > 1.0) {
        Some(offender) => Err(EstimateError::OrderViolation {
            earlier: marker.raw_name.clone(),
            earlier_value: 1.0,
            later: offender.name.clone(),
            later_value: offender.percentage,
        }),
        None => Ok(()),
    }
}

/// A fully anchored list has nowhere to put a gap to 100.
pub fn check_balance(anchors: &[KnownAnchor], slot_count: usize) -> Result<(), EstimateError> {
    if slot_count == 0 || anchors.len() < slot_count {
        return Ok(());
    }
    let total: f64 = anchors.iter().map(|a| a.percentage).sum();
    if (total - 100.0).abs() > 1e-6 {
        return Err(EstimateError::FullyAnchored { total });
    }
    Ok(())
}
