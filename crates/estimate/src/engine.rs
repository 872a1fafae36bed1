use crate::anchor;
use crate::config::FormulaContext;
use crate::error::EstimateError;
use crate::interpolate::base_is_free;
use crate::model::{
    Assignment, EstimateMeta, EstimateNote, EstimateRequest, EstimateSummary, IngredientSlot,
    Reconstruction, SlotEstimate,
};
use crate::normalize::normalize_name;
use crate::redistribute::{redistribute, ResidualTarget};
use crate::resolver::IdentityResolver;
use crate::search::bisect_base;
use crate::summary::compute_summary;
use crate::zone::{locate_line, populate_sub_line, SUB_LINE_CAP};

/// Run reconstruction with the context's own catalog resolver.
pub fn run(context: &FormulaContext, request: &EstimateRequest) -> Result<Reconstruction, EstimateError> {
    let resolver = context.resolver();
    reconstruct(context, request, &resolver)
}

/// Reconstruct a percentage for every declared position.
///
/// Phases: validate (all fatal errors surface here), search-and-interpolate,
/// redistribute. Pure: no state survives the call.
pub fn reconstruct(
    context: &FormulaContext,
    request: &EstimateRequest,
    resolver: &dyn IdentityResolver,
) -> Result<Reconstruction, EstimateError> {
    let settings = &context.settings;
    let profile = context.profile(&request.category)?;

    // Validate
    anchor::check_values(&request.known)?;
    let slots = build_slots(&request.ingredients, resolver, settings.match_threshold);
    let anchors = anchor::attach(&request.known, &slots, resolver, settings.anchor_threshold)?;
    anchor::check_order(&anchors)?;

    let seed = Assignment::seeded(slots.len(), &anchors);
    let line = locate_line(&slots, &seed, context);
    anchor::check_line(&anchors, &slots, line)?;
    anchor::check_balance(&anchors, slots.len())?;

    let mut notes: Vec<EstimateNote> = slots
        .iter()
        .filter(|s| s.identity.is_none())
        .map(|s| EstimateNote::UnresolvedIdentity {
            position: s.position,
            raw_name: s.raw_name.clone(),
            best_score: s.score,
        })
        .collect();

    let line_position = (line < slots.len()).then_some(line);
    let meta = |base_value: Option<f64>, search_error: f64| EstimateMeta {
        context_name: context.name.clone(),
        profile: profile.category.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        search_rounds: settings.search_rounds,
        base_value,
        line_position,
        search_error,
    };

    if slots.is_empty() {
        return Ok(Reconstruction {
            meta: meta(None, 0.0),
            slots: Vec::new(),
            notes,
            summary: EstimateSummary::default(),
        });
    }

    log::debug!(
        "reconstructing {} slots, {} anchors, line at {line}",
        slots.len(),
        anchors.len()
    );

    // Search and interpolate
    let mut seed = seed;
    populate_sub_line(&mut seed, &slots, line, context, &profile.category, &mut notes);
    if base_is_free(&seed, line) {
        log::debug!(
            "searching base in [{}, {}] for '{}'",
            profile.base_range.min,
            profile.base_range.max,
            slots[0].raw_name
        );
    }
    let outcome = bisect_base(&seed, &anchors, line, profile.base_range, settings.search_rounds);

    // Redistribute
    let mut assignment = outcome.assignment;
    let redistribution = redistribute(&mut assignment, line);
    if let ResidualTarget::FirstFree { position } = redistribution.target {
        notes.push(EstimateNote::ResidualToFirstFree {
            position,
            residual: redistribution.residual,
        });
    }

    for position in line..assignment.len() {
        let value = assignment.values[position];
        if !assignment.is_anchor(position) && value > SUB_LINE_CAP + 1e-9 {
            log::warn!("position {position} ends at {value:.4}%, above the one-percent line cap");
            notes.push(EstimateNote::CapExceeded {
                position,
                percentage: value,
            });
        }
    }

    let estimates: Vec<SlotEstimate> = slots
        .into_iter()
        .zip(assignment.values.iter().zip(&assignment.sources))
        .map(|(slot, (percentage, source))| SlotEstimate {
            position: slot.position,
            raw_name: slot.raw_name,
            identity: slot.identity,
            percentage: *percentage,
            source: *source,
        })
        .collect();

    let summary = compute_summary(&estimates, &notes, redistribution.residual);
    Ok(Reconstruction {
        meta: meta(outcome.base, outcome.error),
        slots: estimates,
        notes,
        summary,
    })
}

/// One slot per declared name, resolved against `threshold`.
pub fn build_slots(
    ingredients: &[String],
    resolver: &dyn IdentityResolver,
    threshold: f64,
) -> Vec<IngredientSlot> {
    ingredients
        .iter()
        .enumerate()
        .map(|(position, raw)| {
            let resolution = resolver.resolve(raw);
            IngredientSlot {
                position,
                raw_name: normalize_name(raw),
                identity: resolution.accepted(threshold).map(String::from),
                score: resolution.score,
            }
        })
        .collect()
}
