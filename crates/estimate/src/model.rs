use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A caller assertion: "the ingredient named `name` is at `percentage`".
#[derive(Debug, Clone, PartialEq)]
pub struct KnownPercentage {
    pub name: String,
    pub percentage: f64,
}

/// One reconstruction request. Built fresh per analysis.
#[derive(Debug, Clone, Default)]
pub struct EstimateRequest {
    /// Profile category, e.g. `serum`.
    pub category: String,
    /// Raw ingredient names in declared order.
    pub ingredients: Vec<String>,
    pub known: Vec<KnownPercentage>,
}

impl EstimateRequest {
    pub fn new<I, S>(category: &str, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.to_string(),
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            known: Vec::new(),
        }
    }

    pub fn with_known(mut self, name: &str, percentage: f64) -> Self {
        self.known.push(KnownPercentage {
            name: name.to_string(),
            percentage,
        });
        self
    }
}

// ---------------------------------------------------------------------------
// Slots + anchors
// ---------------------------------------------------------------------------

/// One declared position. Addressed by `position`, never by name.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientSlot {
    pub position: usize,
    /// Normalized declared name.
    pub raw_name: String,
    /// Resolved identity, if the resolver score reached the match threshold.
    pub identity: Option<String>,
    /// Best resolver score, kept even when below threshold.
    pub score: f64,
}

/// A known percentage attached to exactly one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownAnchor {
    pub position: usize,
    pub percentage: f64,
    /// Name as the caller typed it.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Working assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentSource {
    /// Caller-supplied known value.
    Anchor,
    /// The base diluent, set by the search.
    Base,
    /// Interpolated between two bounds above the one-percent line.
    Interpolated,
    /// Usage-range midpoint at or after the one-percent line.
    SubLine,
}

impl std::fmt::Display for PercentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anchor => write!(f, "anchor"),
            Self::Base => write!(f, "base"),
            Self::Interpolated => write!(f, "interpolated"),
            Self::SubLine => write!(f, "sub_line"),
        }
    }
}

/// Position-indexed percentages plus where each one came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub values: Vec<f64>,
    pub sources: Vec<PercentSource>,
}

impl Assignment {
    /// All zeros except the anchors.
    pub fn seeded(len: usize, anchors: &[KnownAnchor]) -> Self {
        let mut values = vec![0.0; len];
        let mut sources = vec![PercentSource::Interpolated; len];
        for anchor in anchors {
            values[anchor.position] = anchor.percentage;
            sources[anchor.position] = PercentSource::Anchor;
        }
        Self { values, sources }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn is_anchor(&self, position: usize) -> bool {
        self.sources[position] == PercentSource::Anchor
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SlotEstimate {
    pub position: usize,
    pub raw_name: String,
    pub identity: Option<String>,
    pub percentage: f64,
    pub source: PercentSource,
}

/// Non-fatal provenance recorded while estimating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimateNote {
    /// No usage data; the context-wide default range was used.
    DefaultUsageRange { position: usize, raw_name: String },
    /// The resolver found nothing above the match threshold.
    UnresolvedIdentity { position: usize, raw_name: String, best_score: f64 },
    /// The free prefix had no mass, so one slot absorbed the residual.
    ResidualToFirstFree { position: usize, residual: f64 },
    /// A slot at or after the one-percent line ended above 1%.
    CapExceeded { position: usize, percentage: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateMeta {
    pub context_name: String,
    pub profile: String,
    pub engine_version: String,
    pub search_rounds: u32,
    /// Retained base-diluent value; `None` when the base was not searched.
    pub base_value: Option<f64>,
    /// First position of the sub-one-percent zone; `None` when no marker was found.
    pub line_position: Option<usize>,
    /// `|sum - 100|` of the retained search result, before redistribution.
    pub search_error: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EstimateSummary {
    pub total_slots: usize,
    pub anchored: usize,
    pub base: usize,
    pub interpolated: usize,
    pub sub_line: usize,
    pub unresolved: usize,
    pub degraded: usize,
    pub total_percentage: f64,
    pub residual: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconstruction {
    pub meta: EstimateMeta,
    pub slots: Vec<SlotEstimate>,
    pub notes: Vec<EstimateNote>,
    pub summary: EstimateSummary,
}

impl Reconstruction {
    /// `(position, percentage)` pairs in declared order.
    pub fn percentages(&self) -> Vec<(usize, f64)> {
        self.slots.iter().map(|s| (s.position, s.percentage)).collect()
    }
}
