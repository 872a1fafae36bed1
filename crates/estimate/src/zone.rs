use crate::config::{FormulaContext, UsageSource};
use crate::model::{Assignment, EstimateNote, IngredientSlot, PercentSource};

/// Ceiling for every unanchored slot at or after the one-percent line.
pub const SUB_LINE_CAP: f64 = 1.0;

/// Position of the first unanchored slot whose identity is a marker, or
/// `slots.len()` when there is none.
pub fn locate_line(slots: &[IngredientSlot], assignment: &Assignment, context: &FormulaContext) -> usize {
    slots
        .iter()
        .find(|slot| {
            !assignment.is_anchor(slot.position)
                && slot.identity.as_deref().is_some_and(|id| context.is_marker(id))
        })
        .map_or(slots.len(), |slot| slot.position)
}

/// Give every unanchored slot at or after `line` the midpoint of its usage
/// range, capped at [`SUB_LINE_CAP`].
pub fn populate_sub_line(
    assignment: &mut Assignment,
    slots: &[IngredientSlot],
    line: usize,
    context: &FormulaContext,
    category: &str,
    notes: &mut Vec<EstimateNote>,
) {
    for slot in slots.iter().skip(line) {
        if assignment.is_anchor(slot.position) {
            continue;
        }

        let (range, source) = context.usage_range(slot.identity.as_deref(), category);
        if source == UsageSource::ContextDefault {
            log::warn!(
                "no usage range for '{}' at position {}; using default [{}, {}]",
                slot.raw_name,
                slot.position,
                range.min,
                range.max
            );
            notes.push(EstimateNote::DefaultUsageRange {
                position: slot.position,
                raw_name: slot.raw_name.clone(),
            });
        }

        assignment.values[slot.position] = range.midpoint().min(SUB_LINE_CAP);
        assignment.sources[slot.position] = PercentSource::SubLine;
    }
}
