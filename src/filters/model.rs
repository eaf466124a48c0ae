//! Canonical filter model
//!
//! A `FilterModel` is only ever produced by `FilterModelBuilder::build` or
//! `FilterSpec::into_model`, both of which validate. Relaxation and
//! restriction return new values; nothing mutates a built model.

use crate::errors::{ResolveError, Result};
use crate::filters::formula;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Recognized filter keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Formula,
    Elements,
    SpaceGroup,
    BandGap,
    Energy,
    MaterialType,
}

impl FilterKey {
    pub const ALL: [FilterKey; 6] = [
        FilterKey::Formula,
        FilterKey::Elements,
        FilterKey::SpaceGroup,
        FilterKey::BandGap,
        FilterKey::Energy,
        FilterKey::MaterialType,
    ];

    /// Least certain first: numeric ranges, then categorical, then composition
    pub const RELAXATION_ORDER: [FilterKey; 6] = [
        FilterKey::BandGap,
        FilterKey::Energy,
        FilterKey::SpaceGroup,
        FilterKey::MaterialType,
        FilterKey::Formula,
        FilterKey::Elements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Formula => "formula",
            FilterKey::Elements => "elements",
            FilterKey::SpaceGroup => "space_group",
            FilterKey::BandGap => "band_gap",
            FilterKey::Energy => "energy",
            FilterKey::MaterialType => "material_type",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        FilterKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ResolveError::extraction(format!("unknown filter key: {}", s)))
    }
}

/// Material class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    Crystal,
    Mof,
    #[default]
    Unknown,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Crystal => "crystal",
            MaterialType::Mof => "mof",
            MaterialType::Unknown => "unknown",
        }
    }
}

impl FromStr for MaterialType {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crystal" => Ok(MaterialType::Crystal),
            "mof" => Ok(MaterialType::Mof),
            "unknown" | "" => Ok(MaterialType::Unknown),
            other => Err(ResolveError::extraction(format!(
                "material_type must be crystal, mof or unknown, got {:?}",
                other
            ))),
        }
    }
}

/// Closed numeric interval with optional bounds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    /// Create a validated range
    pub fn new(min: Option<f64>, max: Option<f64>) -> std::result::Result<Self, String> {
        for bound in [min, max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(format!("range bound {} is not finite", bound));
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(format!("min {} is greater than max {}", lo, hi));
            }
        }
        Ok(Self { min, max })
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |lo| value >= lo) && self.max.map_or(true, |hi| value <= hi)
    }
}

/// Validated, immutable structured query
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    formula: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    elements: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    space_group: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    band_gap: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<Range>,
    material_type: MaterialType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    keywords: Vec<String>,
}

impl FilterModel {
    pub fn builder() -> FilterModelBuilder {
        FilterModelBuilder::default()
    }

    pub fn formula(&self) -> Option<&str> {
        self.formula.as_deref()
    }

    pub fn elements(&self) -> &BTreeSet<String> {
        &self.elements
    }

    pub fn space_group(&self) -> Option<u16> {
        self.space_group
    }

    pub fn band_gap(&self) -> Option<Range> {
        self.band_gap
    }

    pub fn energy(&self) -> Option<Range> {
        self.energy
    }

    pub fn material_type(&self) -> MaterialType {
        self.material_type
    }

    /// Free-text fallback terms; never sent to backends as filters
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Whether `key` currently holds a usable value
    pub fn has(&self, key: FilterKey) -> bool {
        match key {
            FilterKey::Formula => self.formula.is_some(),
            FilterKey::Elements => !self.elements.is_empty(),
            FilterKey::SpaceGroup => self.space_group.is_some(),
            FilterKey::BandGap => self.band_gap.is_some(),
            FilterKey::Energy => self.energy.is_some(),
            FilterKey::MaterialType => self.material_type != MaterialType::Unknown,
        }
    }

    /// Keys holding a usable value
    pub fn active_keys(&self) -> BTreeSet<FilterKey> {
        FilterKey::ALL
            .iter()
            .copied()
            .filter(|key| self.has(*key))
            .collect()
    }

    /// At least one usable filter or fallback term
    pub fn is_routable(&self) -> bool {
        !self.active_keys().is_empty() || !self.keywords.is_empty()
    }

    /// Copy with `key` cleared
    pub fn without(&self, key: FilterKey) -> FilterModel {
        let mut next = self.clone();
        match key {
            FilterKey::Formula => next.formula = None,
            FilterKey::Elements => next.elements.clear(),
            FilterKey::SpaceGroup => next.space_group = None,
            FilterKey::BandGap => next.band_gap = None,
            FilterKey::Energy => next.energy = None,
            FilterKey::MaterialType => next.material_type = MaterialType::Unknown,
        }
        next
    }

    /// Copy keeping only the keys in `supported`; others are dropped, not coerced
    pub fn restricted_to(&self, supported: &BTreeSet<FilterKey>) -> FilterModel {
        FilterKey::ALL
            .iter()
            .filter(|key| !supported.contains(*key))
            .fold(self.clone(), |acc, key| acc.without(*key))
    }

    /// Next filter to drop during degradation, if any
    pub fn next_relaxation(&self) -> Option<FilterKey> {
        FilterKey::RELAXATION_ORDER
            .iter()
            .copied()
            .find(|key| self.has(*key))
    }
}

/// Validating builder for `FilterModel`
#[derive(Debug, Clone, Default)]
pub struct FilterModelBuilder {
    formula: Option<String>,
    elements: Vec<String>,
    space_group: Option<i64>,
    band_gap: Option<(Option<f64>, Option<f64>)>,
    energy: Option<(Option<f64>, Option<f64>)>,
    material_type: MaterialType,
    keywords: Vec<String>,
}

impl FilterModelBuilder {
    pub fn formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn elements<I, S>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.elements.extend(elements.into_iter().map(Into::into));
        self
    }

    pub fn space_group(mut self, number: i64) -> Self {
        self.space_group = Some(number);
        self
    }

    pub fn band_gap(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.band_gap = Some((min, max));
        self
    }

    pub fn energy(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.energy = Some((min, max));
        self
    }

    pub fn material_type(mut self, material_type: MaterialType) -> Self {
        self.material_type = material_type;
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Validate and freeze
    ///
    /// When a formula is given without elements, elements are derived
    /// from the formula.
    pub fn build(self) -> Result<FilterModel> {
        let formula = self
            .formula
            .map(|f| formula::normalize_formula(&f))
            .filter(|f| !f.is_empty());
        if let Some(f) = &formula {
            if formula::parse_formula(f).is_none() {
                return Err(ResolveError::extraction(format!(
                    "formula: {:?} is not a chemical formula",
                    f
                )));
            }
        }

        let mut elements = BTreeSet::new();
        for raw in &self.elements {
            if raw.trim().is_empty() {
                continue;
            }
            let symbol = formula::normalize_element(raw).ok_or_else(|| {
                ResolveError::extraction(format!("elements: {:?} is not an element symbol", raw))
            })?;
            elements.insert(symbol);
        }
        if elements.is_empty() {
            if let Some(f) = &formula {
                elements.extend(formula::elements_of(f));
            }
        }

        let space_group = match self.space_group {
            None | Some(0) => None,
            Some(n) if (1..=230).contains(&n) => Some(n as u16),
            Some(n) => {
                return Err(ResolveError::extraction(format!(
                    "space_group must be between 1 and 230, got {}",
                    n
                )))
            }
        };

        let band_gap = build_range("band_gap", self.band_gap)?;
        if let Some(Range { min: Some(lo), .. }) = band_gap {
            if lo < 0.0 {
                return Err(ResolveError::extraction(format!(
                    "band_gap.min must be non-negative, got {}",
                    lo
                )));
            }
        }
        let energy = build_range("energy", self.energy)?;

        let keywords = self
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(FilterModel {
            formula,
            elements,
            space_group,
            band_gap,
            energy,
            material_type: self.material_type,
            keywords,
        })
    }
}

fn build_range(name: &str, bounds: Option<(Option<f64>, Option<f64>)>) -> Result<Option<Range>> {
    let Some((min, max)) = bounds else {
        return Ok(None);
    };
    let range = Range::new(min, max)
        .map_err(|reason| ResolveError::extraction(format!("{}: {}", name, reason)))?;
    Ok((!range.is_unbounded()).then_some(range))
}

/// Loosely typed filter payload as produced by the language model
///
/// Unknown keys are rejected. Empty strings, zero space groups and
/// unbounded ranges all mean "not set".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub elements: Option<Vec<String>>,
    #[serde(default)]
    pub space_group: Option<i64>,
    #[serde(default)]
    pub band_gap: Option<Range>,
    #[serde(default)]
    pub energy: Option<Range>,
    #[serde(default)]
    pub material_type: Option<String>,
}

impl FilterSpec {
    /// Validate into a `FilterModel`, attaching fallback keywords
    pub fn into_model(self, keywords: Vec<String>) -> Result<FilterModel> {
        let mut builder = FilterModel::builder().keywords(keywords);

        if let Some(f) = self.formula {
            builder = builder.formula(f);
        }
        if let Some(elements) = self.elements {
            builder = builder.elements(elements);
        }
        if let Some(n) = self.space_group {
            builder = builder.space_group(n);
        }
        if let Some(r) = self.band_gap {
            builder = builder.band_gap(r.min, r.max);
        }
        if let Some(r) = self.energy {
            builder = builder.energy(r.min, r.max);
        }
        if let Some(mt) = self.material_type {
            builder = builder.material_type(mt.parse()?);
        }

        builder.build()
    }
}
