//! Static database descriptors

use crate::filters::{FilterKey, MaterialType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn default_cost() -> u32 {
    1
}

/// One registered materials database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    /// Stable backend id ("bohriumpublic", "optimade", ...)
    pub id: String,

    /// Human-readable name
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Filter keys the backend can evaluate natively
    pub supported_filters: BTreeSet<FilterKey>,

    /// Material classes the backend holds
    pub material_types: Vec<MaterialType>,

    /// Application domains the backend is suited for
    #[serde(default)]
    pub domains: Vec<String>,

    /// Relative query cost; lower is cheaper
    #[serde(default = "default_cost")]
    pub cost: u32,

    /// 1 = highest priority
    pub priority: u32,
}

impl DatabaseDescriptor {
    pub fn supports(&self, key: FilterKey) -> bool {
        self.supported_filters.contains(&key)
    }

    /// Whether the backend can hold materials of `material_type`
    ///
    /// `Unknown` is compatible with every backend.
    pub fn serves(&self, material_type: MaterialType) -> bool {
        material_type == MaterialType::Unknown || self.material_types.contains(&material_type)
    }

    /// Explicit material type match (never true for `Unknown`)
    pub fn matches_material(&self, material_type: MaterialType) -> bool {
        material_type != MaterialType::Unknown && self.material_types.contains(&material_type)
    }

    pub fn matches_domain(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }
}

/// Built-in descriptors for the four supported databases
pub fn builtin_descriptors() -> Vec<DatabaseDescriptor> {
    use FilterKey::{BandGap, Elements, Energy, Formula, SpaceGroup};

    vec![
        DatabaseDescriptor {
            id: "bohriumpublic".to_string(),
            name: "Bohrium Public".to_string(),
            description: "Large-scale crystal structure database with formation energy and band gap data"
                .to_string(),
            supported_filters: [Formula, Elements, SpaceGroup, BandGap, Energy].into(),
            material_types: vec![MaterialType::Crystal],
            domains: domains(&["semiconductor", "catalyst", "battery", "perovskite", "other"]),
            cost: 1,
            priority: 1,
        },
        DatabaseDescriptor {
            id: "mofdbsql".to_string(),
            name: "MOFdb SQL".to_string(),
            description: "Metal-organic framework database with an SQL query interface".to_string(),
            supported_filters: [Formula, Elements].into(),
            material_types: vec![MaterialType::Mof],
            domains: domains(&["catalyst", "gas_storage", "separation", "other"]),
            cost: 2,
            priority: 2,
        },
        DatabaseDescriptor {
            id: "openlam".to_string(),
            name: "OpenLAM".to_string(),
            description: "Open crystal structure database with computed energies".to_string(),
            supported_filters: [Formula, Elements, Energy].into(),
            material_types: vec![MaterialType::Crystal],
            domains: domains(&["semiconductor", "battery", "perovskite", "other"]),
            cost: 2,
            priority: 2,
        },
        DatabaseDescriptor {
            id: "optimade".to_string(),
            name: "OPTIMADE".to_string(),
            description: "Multi-provider materials databases behind the OPTIMADE API".to_string(),
            supported_filters: [Formula, Elements, SpaceGroup, BandGap].into(),
            material_types: vec![MaterialType::Crystal, MaterialType::Mof],
            domains: domains(&["semiconductor", "catalyst", "battery", "perovskite", "other"]),
            cost: 3,
            priority: 3,
        },
    ]
}

fn domains(names: &[&str]) -> Vec<String> {
    names.iter().map(|d| d.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_descriptors() {
        let descriptors = builtin_descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[0].id, "bohriumpublic");
        assert!(descriptors[0].supports(FilterKey::BandGap));
        assert!(!descriptors[1].supports(FilterKey::BandGap));
    }

    #[test]
    fn test_builtin_material_types() {
        let descriptors = builtin_descriptors();
        assert_eq!(descriptors[0].material_types, vec![MaterialType::Crystal]);
        assert_eq!(descriptors[1].material_types, vec![MaterialType::Mof]);
        assert_eq!(
            descriptors[3].material_types,
            vec![MaterialType::Crystal, MaterialType::Mof]
        );
        assert!(descriptors
            .iter()
            .all(|d| !d.supports(FilterKey::MaterialType)));
    }

    #[test]
    fn test_serves_material_type() {
        let descriptors = builtin_descriptors();
        let mofdb = &descriptors[1];
        assert!(mofdb.serves(MaterialType::Mof));
        assert!(mofdb.serves(MaterialType::Unknown));
        assert!(!mofdb.serves(MaterialType::Crystal));
        assert!(!mofdb.matches_material(MaterialType::Unknown));
    }

    #[test]
    fn test_descriptor_toml_roundtrip_shape() {
        let descriptor: DatabaseDescriptor = toml::from_str(
            r#"
            id = "local"
            name = "Local"
            supported_filters = ["formula", "band_gap"]
            material_types = ["crystal"]
            priority = 4
            "#,
        )
        .unwrap();
        assert_eq!(descriptor.cost, 1);
        assert!(descriptor.domains.is_empty());
        assert!(descriptor.supports(FilterKey::BandGap));
    }
}
