use crate::model::{EstimateNote, EstimateSummary, PercentSource, SlotEstimate};

/// Compute summary statistics from finished slot estimates.
pub fn compute_summary(slots: &[SlotEstimate], notes: &[EstimateNote], residual: f64) -> EstimateSummary {
    let mut summary = EstimateSummary {
        total_slots: slots.len(),
        residual,
        ..EstimateSummary::default()
    };

    for s in slots {
        match s.source {
            PercentSource::Anchor => summary.anchored += 1,
            PercentSource::Base => summary.base += 1,
            PercentSource::Interpolated => summary.interpolated += 1,
            PercentSource::SubLine => summary.sub_line += 1,
        }
        summary.total_percentage += s.percentage;
    }

    for n in notes {
        match n {
            EstimateNote::DefaultUsageRange { .. } => summary.degraded += 1,
            EstimateNote::UnresolvedIdentity { .. } => summary.unresolved += 1,
            EstimateNote::ResidualToFirstFree { .. } | EstimateNote::CapExceeded { .. } => {}
        }
    }

    summary
}
