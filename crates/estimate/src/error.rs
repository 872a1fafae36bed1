use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EstimateError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Context validation error (inverted range, bad threshold, etc.).
    ConfigValidation(String),
    /// The requested product category has no profile in the context.
    UnknownProfile(String),
    /// A known percentage is negative or not a finite number.
    InvalidAnchor { name: String, value: f64 },
    /// Known percentages add up to more than 100.
    AnchorOverflow { total: f64 },
    /// A known percentage name matches no declared ingredient.
    UnresolvedAnchor { name: String },
    /// A later declared ingredient carries a higher known value than an earlier one.
    OrderViolation {
        earlier: String,
        earlier_value: f64,
        later: String,
        later_value: f64,
    },
    /// Every slot is anchored, so nothing can absorb the gap to 100.
    FullyAnchored { total: f64 },
}

impl fmt::Display for EstimateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "context parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "context validation error: {msg}"),
            Self::UnknownProfile(category) => write!(f, "unknown profile: {category}"),
            Self::InvalidAnchor { name, value } => {
                write!(f, "known percentage for '{name}' must be a finite, non-negative number, got {value}")
            }
            Self::AnchorOverflow { total } => {
                write!(f, "known percentages sum to {total}%, which exceeds 100%")
            }
            Self::UnresolvedAnchor { name } => {
                write!(f, "known percentage '{name}' does not match any declared ingredient")
            }
            Self::OrderViolation { earlier, earlier_value, later, later_value } => write!(
                f,
                "'{later}' ({later_value}%) is declared after '{earlier}' ({earlier_value}%) but has a higher value"
            ),
            Self::FullyAnchored { total } => write!(
                f,
                "every ingredient has a known percentage but they sum to {total}%, not 100%"
            ),
        }
    }
}

impl std::error::Error for EstimateError {}

impl EstimateError {
    /// True for errors caused by the caller's known-percentage input rather
    /// than by the context or the declaration.
    pub fn is_anchor_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidAnchor { .. }
                | Self::AnchorOverflow { .. }
                | Self::UnresolvedAnchor { .. }
                | Self::OrderViolation { .. }
                | Self::FullyAnchored { .. }
        )
    }
}
