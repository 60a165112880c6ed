//! Catalog of published contracts.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use wayline_protocols::contract::{Journey, Solution};

use crate::error::EngineError;

/// Registry of published solutions the engine can execute against.
pub struct ContractCatalog {
    solutions: DashMap<String, Arc<Solution>>,
}

impl ContractCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            solutions: DashMap::new(),
        }
    }

    /// Register a solution. Only published (frozen) contracts are accepted;
    /// registering the same id again replaces the prior version.
    pub fn register(&self, solution: Solution) -> Result<(), EngineError> {
        if !solution.published {
            return Err(EngineError::ContractResolution(format!(
                "solution {} is not published",
                solution.id
            )));
        }
        info!(
            "Registering solution {} v{} with {} journeys",
            solution.id,
            solution.version,
            solution.journeys.len()
        );
        self.solutions
            .insert(solution.id.clone(), Arc::new(solution));
        Ok(())
    }

    /// Get a solution by id.
    pub fn get(&self, solution_id: &str) -> Option<Arc<Solution>> {
        self.solutions.get(solution_id).map(|s| s.clone())
    }

    /// Resolve a journey within a solution.
    pub fn resolve(
        &self,
        solution_id: &str,
        journey_id: &str,
    ) -> Result<(Arc<Solution>, Journey), EngineError> {
        let solution = self.get(solution_id).ok_or_else(|| {
            EngineError::ContractResolution(format!("solution {} not found", solution_id))
        })?;
        let journey = solution.journey(journey_id).cloned().ok_or_else(|| {
            EngineError::ContractResolution(format!(
                "journey {} not found in solution {}",
                journey_id, solution_id
            ))
        })?;
        Ok((solution, journey))
    }

    /// List registered solution ids.
    pub fn list_ids(&self) -> Vec<String> {
        self.solutions.iter().map(|s| s.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

impl Default for ContractCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayline_protocols::contract::{Intent, Journey};

    fn published_solution() -> Solution {
        Solution::new("sol", "Demo")
            .with_journey(
                Journey::new("j1", "Journey", "graph")
                    .with_intent(Intent::new("i1", "Step", "agent")),
            )
            .publish()
            .unwrap()
    }

    #[test]
    fn test_register_published() {
        let catalog = ContractCatalog::new();
        catalog.register(published_solution()).unwrap();
        assert_eq!(catalog.len(), 1);

        let (solution, journey) = catalog.resolve("sol", "j1").unwrap();
        assert_eq!(solution.id, "sol");
        assert_eq!(journey.journey_type, "graph");
    }

    #[test]
    fn test_register_unpublished_rejected() {
        let catalog = ContractCatalog::new();
        let result = catalog.register(Solution::new("sol", "Demo"));
        assert!(matches!(result, Err(EngineError::ContractResolution(_))));
    }

    #[test]
    fn test_resolve_unknown_solution() {
        let catalog = ContractCatalog::new();
        assert!(matches!(
            catalog.resolve("missing", "j1"),
            Err(EngineError::ContractResolution(_))
        ));
    }

    #[test]
    fn test_resolve_unknown_journey() {
        let catalog = ContractCatalog::new();
        catalog.register(published_solution()).unwrap();
        assert!(matches!(
            catalog.resolve("sol", "j9"),
            Err(EngineError::ContractResolution(_))
        ));
    }
}
