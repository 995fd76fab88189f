use rust_decimal::Decimal;
use serde::Deserialize;
use soiaudit_sanitize::SanitizeConfig;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One named, versioned configuration object for a validation run. Every
/// heuristic threshold in the pipeline lives here so behavior is
/// reproducible per configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub name: String,
    pub tolerance: ToleranceConfig,
    pub sanitizer: SanitizeConfig,
    pub plausibility: PlausibilityConfig,
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Numeric fields the engine reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    FairValue,
    Cost,
    Percent,
}

impl std::fmt::Display for NumericField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FairValue => write!(f, "fair_value"),
            Self::Cost => write!(f, "cost"),
            Self::Percent => write!(f, "percent"),
        }
    }
}

/// Per-field slack: a comparison passes if EITHER bound is satisfied.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct FieldTolerance {
    /// Absolute tolerance, in the field's own units.
    pub abs: Decimal,
    /// Relative tolerance as a fraction of the larger magnitude.
    pub rel: Decimal,
}

impl Default for FieldTolerance {
    fn default() -> Self {
        Self {
            abs: Decimal::ONE,
            rel: Decimal::new(1, 3), // 0.001
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub fair_value: FieldTolerance,
    pub cost: FieldTolerance,
    pub percent: FieldTolerance,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            fair_value: FieldTolerance::default(),
            cost: FieldTolerance::default(),
            percent: FieldTolerance {
                abs: Decimal::new(1, 2), // 0.01
                rel: Decimal::ZERO,
            },
        }
    }
}

impl ToleranceConfig {
    pub fn for_field(&self, field: NumericField) -> FieldTolerance {
        match field {
            NumericField::FairValue => self.fair_value,
            NumericField::Cost => self.cost,
            NumericField::Percent => self.percent,
        }
    }

    /// Symmetric tolerance compare in exact decimal arithmetic. `None`
    /// values never reach this — absence is routed to the missing-numeric
    /// codes instead.
    pub fn within(&self, computed: Decimal, reported: Decimal, field: NumericField) -> bool {
        let diff = (computed - reported).abs();
        let tol = self.for_field(field);
        if diff <= tol.abs {
            return true;
        }
        let scale = computed.abs().max(reported.abs());
        diff <= tol.rel * scale
    }
}

// ---------------------------------------------------------------------------
// Plausibility
// ---------------------------------------------------------------------------

/// Bounds for the value-sanity checks on holdings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlausibilityConfig {
    /// Implied unit price (fair_value / quantity) below this is suspicious.
    pub min_price: Decimal,
    /// Implied unit price above this is suspicious.
    pub max_price: Decimal,
    /// Rows whose section or name mention these carry legitimately negative
    /// values (written options, shorts, swaps).
    pub derivative_keywords: Vec<String>,
}

impl Default for PlausibilityConfig {
    fn default() -> Self {
        Self {
            min_price: Decimal::new(1, 4), // $0.0001
            max_price: Decimal::from(1_000_000),
            derivative_keywords: vec![
                "option".into(),
                "options".into(),
                "put".into(),
                "puts".into(),
                "call".into(),
                "calls".into(),
                "swap".into(),
                "swaps".into(),
                "forward".into(),
                "forwards".into(),
                "future".into(),
                "futures".into(),
                "short".into(),
                "written".into(),
                "collateralized".into(),
                "covered".into(),
                "liability".into(),
                "liabilities".into(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ValidationConfig {
    pub fn from_toml(input: &str) -> Result<Self, ValidationError> {
        let config: ValidationConfig =
            toml::from_str(input).map_err(|e| ValidationError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, tol) in [
            ("fair_value", self.tolerance.fair_value),
            ("cost", self.tolerance.cost),
            ("percent", self.tolerance.percent),
        ] {
            if tol.abs < Decimal::ZERO {
                return Err(ValidationError::ConfigValidation(format!(
                    "tolerance.{name}.abs must be non-negative, got {}",
                    tol.abs
                )));
            }
            if tol.rel < Decimal::ZERO {
                return Err(ValidationError::ConfigValidation(format!(
                    "tolerance.{name}.rel must be non-negative, got {}",
                    tol.rel
                )));
            }
        }

        let coverage = self.sanitizer.page_repair.coverage_threshold;
        if !(0.0..=1.0).contains(&coverage) {
            return Err(ValidationError::ConfigValidation(format!(
                "sanitizer.page_repair.coverage_threshold must be in [0, 1], got {coverage}"
            )));
        }

        let pct = self.sanitizer.summary_table.percent_threshold;
        if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
            return Err(ValidationError::ConfigValidation(format!(
                "sanitizer.summary_table.percent_threshold must be in [0, 100], got {pct}"
            )));
        }

        if self.plausibility.min_price > self.plausibility.max_price {
            return Err(ValidationError::ConfigValidation(
                "plausibility.min_price exceeds plausibility.max_price".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Quarterly N-CSR batch"

[tolerance.fair_value]
abs = 1
rel = 0.001

[tolerance.percent]
abs = 0.01
rel = 0

[sanitizer]
drop_summary_tables = true

[sanitizer.summary_table]
percent_threshold = 50
keywords = ["top", "largest"]

[sanitizer.page_repair]
coverage_threshold = 0.7
max_gap_fill = 3
"#;

    #[test]
    fn parse_valid() {
        let config = ValidationConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Quarterly N-CSR batch");
        assert_eq!(config.tolerance.fair_value.abs, Decimal::ONE);
        assert_eq!(config.tolerance.percent.abs, Decimal::new(1, 2));
        assert_eq!(config.sanitizer.summary_table.keywords.len(), 2);
    }

    #[test]
    fn defaults_are_complete() {
        let config = ValidationConfig::from_toml("").unwrap();
        assert_eq!(config.tolerance.fair_value.abs, Decimal::ONE);
        assert_eq!(config.tolerance.cost.abs, Decimal::ONE);
        assert_eq!(config.tolerance.percent.rel, Decimal::ZERO);
        assert!(config.sanitizer.drop_summary_tables);
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = r#"
[tolerance.cost]
abs = -1
"#;
        let err = ValidationConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("cost.abs"));
    }

    #[test]
    fn reject_bad_coverage_threshold() {
        let input = r#"
[sanitizer.page_repair]
coverage_threshold = 1.5
"#;
        let err = ValidationConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("coverage_threshold"));
    }

    #[test]
    fn within_passes_on_either_bound() {
        let tol = ToleranceConfig::default();
        // Inside the $1 absolute bound.
        assert!(tol.within(
            Decimal::from(300),
            "300.5".parse().unwrap(),
            NumericField::FairValue
        ));
        // Outside $1 but inside 0.1% relative.
        assert!(tol.within(
            Decimal::from(10_000_000),
            Decimal::from(10_000_500),
            NumericField::FairValue
        ));
        // Outside both.
        assert!(!tol.within(
            Decimal::from(300),
            Decimal::from(250),
            NumericField::FairValue
        ));
    }

    #[test]
    fn within_is_symmetric() {
        let tol = ToleranceConfig::default();
        for (a, b) in [(300, 250), (100, 100), (0, 2)] {
            let a = Decimal::from(a);
            let b = Decimal::from(b);
            assert_eq!(
                tol.within(a, b, NumericField::FairValue),
                tol.within(b, a, NumericField::FairValue)
            );
        }
    }
}
