//! Database router
//!
//! Picks the backends able to serve a filter model and orders them:
//! - material type is a gate, never a reason to qualify
//! - filter intersection qualifies a backend
//! - domain affinity qualifies only when nothing matched by filters
//!
//! Ordering is affinity (desc), cost (asc), then registration order.

use crate::errors::{ResolveError, Result};
use crate::filters::{FilterKey, FilterModel};
use crate::registry::{DatabaseDescriptor, DatabaseRegistry};
use crate::retriever::OutputFormat;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// One backend's restricted query
#[derive(Debug, Clone, PartialEq)]
pub struct BackendQuery {
    pub descriptor: Arc<DatabaseDescriptor>,
    /// Filters limited to what the backend supports
    pub filters: FilterModel,
    pub n_results: usize,
    pub output_format: OutputFormat,
    /// Routing strength used for ordering
    pub affinity: u32,
}

impl BackendQuery {
    pub fn backend_id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn priority(&self) -> u32 {
        self.descriptor.priority
    }
}

/// Selects and orders backends for a filter model
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<DatabaseRegistry>,
    max_backends: Option<usize>,
}

impl Router {
    pub fn new(registry: Arc<DatabaseRegistry>) -> Self {
        Self {
            registry,
            max_backends: None,
        }
    }

    /// Cap the number of backends queried per request
    pub fn with_max_backends(mut self, max_backends: Option<usize>) -> Self {
        self.max_backends = max_backends;
        self
    }

    /// Route without a preferred backend
    pub fn route(
        &self,
        filters: &FilterModel,
        domain_hint: Option<&str>,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Vec<BackendQuery>> {
        self.route_with_preference(filters, domain_hint, None, n_results, output_format)
    }

    /// Route, moving `preferred` to the front when it qualifies
    ///
    /// Returns `NoRoute` when no backend qualifies. The input filter model
    /// is never modified; each query carries its own restricted copy.
    pub fn route_with_preference(
        &self,
        filters: &FilterModel,
        domain_hint: Option<&str>,
        preferred: Option<&str>,
        n_results: usize,
        output_format: OutputFormat,
    ) -> Result<Vec<BackendQuery>> {
        let material_type = filters.material_type();
        let mut requested: BTreeSet<FilterKey> = filters.active_keys();
        requested.remove(&FilterKey::MaterialType);

        let domain_hint = domain_hint.map(str::trim).filter(|d| !d.is_empty());

        let gated: Vec<&Arc<DatabaseDescriptor>> = self
            .registry
            .iter()
            .filter(|d| d.serves(material_type))
            .collect();

        let by_filters: Vec<(&Arc<DatabaseDescriptor>, u32)> = gated
            .iter()
            .filter_map(|d| {
                let shared = requested.intersection(&d.supported_filters).count() as u32;
                (shared > 0).then_some((*d, shared))
            })
            .collect();

        let matched = if !by_filters.is_empty() {
            by_filters
        } else if let Some(hint) = domain_hint {
            debug!(domain = hint, "no filter match, falling back to domain affinity");
            gated
                .iter()
                .filter(|d| d.matches_domain(hint))
                .map(|d| (*d, 0))
                .collect()
        } else {
            Vec::new()
        };

        if matched.is_empty() {
            return Err(ResolveError::NoRoute(format!(
                "no registered database serves {} with filters [{}]",
                material_type.as_str(),
                requested
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut queries: Vec<BackendQuery> = matched
            .into_iter()
            .map(|(descriptor, shared)| {
                let mut affinity = shared;
                if descriptor.matches_material(material_type) {
                    affinity += 1;
                }
                if domain_hint.map_or(false, |hint| descriptor.matches_domain(hint)) {
                    affinity += 1;
                }

                BackendQuery {
                    descriptor: Arc::clone(descriptor),
                    filters: filters.restricted_to(&descriptor.supported_filters),
                    n_results,
                    output_format,
                    affinity,
                }
            })
            .collect();

        // stable: equal keys keep registration order
        queries.sort_by(|a, b| {
            b.affinity
                .cmp(&a.affinity)
                .then(a.descriptor.cost.cmp(&b.descriptor.cost))
        });

        if let Some(preferred) = preferred {
            promote(&mut queries, preferred);
        }

        if let Some(max) = self.max_backends {
            queries.truncate(max.max(1));
        }

        info!(
            backends = ?queries.iter().map(|q| q.backend_id()).collect::<Vec<_>>(),
            "routed query"
        );

        Ok(queries)
    }
}

/// Move the query for `backend_id` to the front, keeping the rest in order
pub fn promote(queries: &mut Vec<BackendQuery>, backend_id: &str) -> bool {
    match queries.iter().position(|q| q.backend_id() == backend_id) {
        Some(0) => true,
        Some(index) => {
            let query = queries.remove(index);
            queries.insert(0, query);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::MaterialType;

    fn router() -> Router {
        Router::new(Arc::new(DatabaseRegistry::builtin()))
    }

    fn ids(queries: &[BackendQuery]) -> Vec<&str> {
        queries.iter().map(|q| q.backend_id()).collect()
    }

    #[test]
    fn test_crystal_band_gap_routing() {
        let filters = FilterModel::builder()
            .elements(["Fe", "O"])
            .band_gap(Some(2.0), Some(3.0))
            .material_type(MaterialType::Crystal)
            .build()
            .unwrap();

        let queries = router()
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap();

        // mofdbsql is gated out by material type
        assert_eq!(ids(&queries), vec!["bohriumpublic", "optimade", "openlam"]);

        let openlam = &queries[2];
        assert!(openlam.filters.band_gap().is_none());
        assert!(!openlam.filters.elements().is_empty());
        // original untouched
        assert!(filters.band_gap().is_some());
    }

    #[test]
    fn test_mof_gate() {
        let filters = FilterModel::builder()
            .formula("Zn(C4H4N2)")
            .material_type(MaterialType::Mof)
            .build()
            .unwrap();

        let queries = router()
            .route(&filters, None, 5, OutputFormat::Json)
            .unwrap();
        assert_eq!(ids(&queries), vec!["mofdbsql", "optimade"]);
        assert!(queries.iter().all(|q| q.output_format == OutputFormat::Json));
    }

    #[test]
    fn test_domain_fallback_only_without_filter_match() {
        let filters = FilterModel::builder()
            .keywords(["porous"])
            .build()
            .unwrap();

        let queries = router()
            .route(&filters, Some("gas_storage"), 5, OutputFormat::Cif)
            .unwrap();
        assert_eq!(ids(&queries), vec!["mofdbsql"]);

        let err = router()
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoRoute(_)));
    }

    #[test]
    fn test_no_route_when_nothing_supports_filters() {
        let registry = DatabaseRegistry::new(vec![DatabaseDescriptor {
            id: "formula-only".to_string(),
            name: "Formula only".to_string(),
            description: String::new(),
            supported_filters: [FilterKey::Formula].into(),
            material_types: vec![MaterialType::Crystal],
            domains: vec![],
            cost: 1,
            priority: 1,
        }])
        .unwrap();
        let router = Router::new(Arc::new(registry));

        let filters = FilterModel::builder()
            .space_group(225)
            .build()
            .unwrap();
        assert!(router.route(&filters, None, 5, OutputFormat::Cif).is_err());
    }

    #[test]
    fn test_preferred_backend_promoted() {
        let filters = FilterModel::builder().formula("SiO2").build().unwrap();
        let queries = router()
            .route_with_preference(&filters, None, Some("optimade"), 5, OutputFormat::Cif)
            .unwrap();
        assert_eq!(queries[0].backend_id(), "optimade");
        assert_eq!(queries.len(), 4);
    }

    #[test]
    fn test_max_backends_cap() {
        let filters = FilterModel::builder().formula("SiO2").build().unwrap();
        let queries = router()
            .with_max_backends(Some(2))
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap();
        assert_eq!(ids(&queries), vec!["bohriumpublic", "mofdbsql"]);
    }

    #[test]
    fn test_promote_missing_backend() {
        let filters = FilterModel::builder().formula("SiO2").build().unwrap();
        let mut queries = router()
            .route(&filters, None, 5, OutputFormat::Cif)
            .unwrap();
        assert!(!promote(&mut queries, "unknown"));
        assert_eq!(queries[0].backend_id(), "bohriumpublic");
    }
}
