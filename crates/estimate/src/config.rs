use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::EstimateError;
use crate::normalize::normalize_name;
use crate::resolver::CatalogResolver;

// ---------------------------------------------------------------------------
// Top-level context
// ---------------------------------------------------------------------------

/// Immutable lookup tables for one analysis deployment: category profiles,
/// sub-one-percent markers, aliases and usage ranges.
///
/// Loaded once by the caller and shared by reference across requests.
#[derive(Debug, Clone, Deserialize)]
pub struct FormulaContext {
    pub name: String,
    #[serde(default)]
    pub settings: EstimateSettings,
    pub profiles: HashMap<String, ProfileConfig>,
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub usage: HashMap<String, UsageEntry>,
    /// Extra canonical names known to the resolver but without usage data.
    #[serde(default)]
    pub catalog: Vec<String>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateSettings {
    /// Minimum resolver score (0-100) for a declared name to count as resolved.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// Minimum score for a known-percentage name to attach to a slot.
    #[serde(default = "default_anchor_threshold")]
    pub anchor_threshold: f64,
    /// Bisection budget for the base-diluent search.
    #[serde(default = "default_search_rounds")]
    pub search_rounds: u32,
    /// Range used when the usage table has nothing for an ingredient.
    #[serde(default = "default_usage_range")]
    pub default_usage: PercentRange,
}

fn default_match_threshold() -> f64 {
    90.0
}

fn default_anchor_threshold() -> f64 {
    95.0
}

fn default_search_rounds() -> u32 {
    15
}

fn default_usage_range() -> PercentRange {
    PercentRange { min: 0.1, max: 1.0 }
}

impl Default for EstimateSettings {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            anchor_threshold: default_anchor_threshold(),
            search_rounds: default_search_rounds(),
            default_usage: default_usage_range(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranges, profiles, usage
// ---------------------------------------------------------------------------

/// Closed percentage interval, written `[min, max]` in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct PercentRange {
    pub min: f64,
    pub max: f64,
}

impl From<[f64; 2]> for PercentRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<PercentRange> for [f64; 2] {
    fn from(range: PercentRange) -> Self {
        [range.min, range.max]
    }
}

impl PercentRange {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn check(&self, what: &str) -> Result<(), EstimateError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(EstimateError::ConfigValidation(format!(
                "{what}: range bounds must be finite"
            )));
        }
        if self.min < 0.0 || self.max > 100.0 {
            return Err(EstimateError::ConfigValidation(format!(
                "{what}: range [{}, {}] must lie within 0..=100",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(EstimateError::ConfigValidation(format!(
                "{what}: range min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    /// Expected percentage of the base diluent for this category.
    pub base_range: PercentRange,
}

/// A resolved profile: the category name plus its base-diluent range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub category: String,
    pub base_range: PercentRange,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageEntry {
    #[serde(default)]
    pub default: Option<PercentRange>,
    /// Category-specific ranges, keyed by profile category.
    #[serde(default)]
    pub profiles: HashMap<String, PercentRange>,
}

/// Where a usage range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageSource {
    Profile,
    IngredientDefault,
    ContextDefault,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl FormulaContext {
    pub fn from_toml(input: &str) -> Result<Self, EstimateError> {
        let context: FormulaContext =
            toml::from_str(input).map_err(|e| EstimateError::ConfigParse(e.to_string()))?;
        context.prepare()
    }

    /// Normalize table keys, then validate.
    fn prepare(mut self) -> Result<Self, EstimateError> {
        self.markers = self.markers.iter().map(|m| normalize_name(m)).collect();
        self.aliases = self
            .aliases
            .into_iter()
            .map(|(from, to)| (normalize_name(&from), normalize_name(&to)))
            .collect();
        self.profiles = self
            .profiles
            .into_iter()
            .map(|(category, profile)| (category.trim().to_lowercase(), profile))
            .collect();
        self.usage = self
            .usage
            .into_iter()
            .map(|(identity, mut entry)| {
                entry.profiles = entry
                    .profiles
                    .into_iter()
                    .map(|(category, range)| (category.trim().to_lowercase(), range))
                    .collect();
                (normalize_name(&identity), entry)
            })
            .collect();
        self.catalog = self.catalog.iter().map(|c| normalize_name(c)).collect();

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), EstimateError> {
        if self.profiles.is_empty() {
            return Err(EstimateError::ConfigValidation(
                "at least one profile is required".into(),
            ));
        }

        let s = &self.settings;
        for (label, value) in [
            ("match_threshold", s.match_threshold),
            ("anchor_threshold", s.anchor_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(EstimateError::ConfigValidation(format!(
                    "{label} must be within 0..=100, got {value}"
                )));
            }
        }
        if s.search_rounds == 0 {
            return Err(EstimateError::ConfigValidation(
                "search_rounds must be at least 1".into(),
            ));
        }
        s.default_usage.check("settings.default_usage")?;

        for (category, profile) in &self.profiles {
            profile.base_range.check(&format!("profile '{category}'"))?;
        }

        for (from, to) in &self.aliases {
            if from.is_empty() || to.is_empty() {
                return Err(EstimateError::ConfigValidation(format!(
                    "alias '{from}' -> '{to}' has an empty side"
                )));
            }
        }

        for (identity, entry) in &self.usage {
            if let Some(range) = &entry.default {
                range.check(&format!("usage '{identity}'"))?;
            }
            for (category, range) in &entry.profiles {
                range.check(&format!("usage '{identity}' for '{category}'"))?;
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn profile(&self, category: &str) -> Result<Profile, EstimateError> {
        let key = category.trim().to_lowercase();
        let config = self
            .profiles
            .get(&key)
            .ok_or_else(|| EstimateError::UnknownProfile(category.to_string()))?;
        Ok(Profile {
            category: key,
            base_range: config.base_range,
        })
    }

    /// Usage range for an identity: category-specific, then the identity's
    /// default, then the context-wide default.
    pub fn usage_range(&self, identity: Option<&str>, category: &str) -> (PercentRange, UsageSource) {
        let entry = identity.and_then(|id| self.usage.get(id));
        if let Some(entry) = entry {
            if let Some(range) = entry.profiles.get(category) {
                return (*range, UsageSource::Profile);
            }
            if let Some(range) = entry.default {
                return (range, UsageSource::IngredientDefault);
            }
        }
        (self.settings.default_usage, UsageSource::ContextDefault)
    }

    /// Marker names are compared normalized, so entries added after loading
    /// count as written.
    pub fn is_marker(&self, identity: &str) -> bool {
        self.markers.iter().any(|m| normalize_name(m) == identity)
    }

    /// Every canonical name the resolver can map to.
    pub fn canonical_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .usage
            .keys()
            .chain(self.markers.iter())
            .chain(self.aliases.values())
            .chain(self.catalog.iter())
            .cloned()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn resolver(&self) -> CatalogResolver {
        CatalogResolver::new(self.canonical_names(), self.aliases.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
