//! Normalized result records

use crate::errors::ResolveError;
use crate::filters::formula;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structure file format requested from backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Cif,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Cif => "cif",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cif" => Ok(OutputFormat::Cif),
            "json" => Ok(OutputFormat::Json),
            other => Err(ResolveError::ConfigError(format!(
                "unsupported output format: {}",
                other
            ))),
        }
    }
}

/// One structure returned by a backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// Backend id that produced the record
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_group: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_atoms: Option<u32>,

    /// Path or URI of the structure file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_file: Option<String>,

    /// eV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band_gap: Option<f64>,

    /// eV/atom
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formation_energy: Option<f64>,

    /// Backend-provided relevance in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,

    /// Untouched source payload
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub raw: serde_json::Value,
}

impl SearchResult {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Set formula; elements are derived when not already set
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        if self.elements.is_empty() {
            self.elements = formula::elements_of(&formula);
        }
        self.formula = Some(formula);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_space_group(mut self, space_group: u16) -> Self {
        self.space_group = Some(space_group);
        self
    }

    pub fn with_n_atoms(mut self, n_atoms: u32) -> Self {
        self.n_atoms = Some(n_atoms);
        self
    }

    pub fn with_band_gap(mut self, band_gap: f64) -> Self {
        self.band_gap = Some(band_gap);
        self
    }

    pub fn with_formation_energy(mut self, energy: f64) -> Self {
        self.formation_energy = Some(energy);
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn with_structure_file(mut self, path: impl Into<String>) -> Self {
        self.structure_file = Some(path.into());
        self
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    /// Display label: name, then formula, then id
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.formula.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }
}
