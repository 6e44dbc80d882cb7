//! Migration Catalog - the ordered set of known migration steps

use std::collections::HashSet;

use super::definitions::MigrationStep;
use crate::error::{MigrationError, MigrationResult};

/// Validated, version-ordered list of migration steps
#[derive(Debug, Clone)]
pub struct MigrationCatalog {
    steps: Vec<MigrationStep>,
}

impl MigrationCatalog {
    /// Sort steps by version and reject duplicates, empty steps and bad names
    pub fn new(mut steps: Vec<MigrationStep>) -> MigrationResult<Self> {
        steps.sort_by_key(|step| step.version);

        let mut versions = HashSet::new();
        let mut names = HashSet::new();
        for step in &steps {
            let valid_name = !step.name.is_empty()
                && step
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid_name {
                return Err(MigrationError::InvalidCatalog(format!(
                    "migration name '{}' must be non-empty and contain only \
                     letters, digits and underscores",
                    step.name
                )));
            }
            if !versions.insert(step.version) {
                return Err(MigrationError::InvalidCatalog(format!(
                    "duplicate migration version {}",
                    step.version
                )));
            }
            if !names.insert(step.name.as_str()) {
                return Err(MigrationError::InvalidCatalog(format!(
                    "duplicate migration name {}",
                    step.name
                )));
            }
            if step.operations.is_empty() {
                return Err(MigrationError::InvalidCatalog(format!(
                    "migration {} has no operations",
                    step.id()
                )));
            }
        }

        Ok(Self { steps })
    }

    /// Steps in ascending version order
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn find(&self, id: &str) -> Option<&MigrationStep> {
        self.steps.iter().find(|step| step.id() == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::definitions::Operation;
    use crate::migrations::schema_builder::ColumnDescriptor;

    fn step(version: u64, name: &str) -> MigrationStep {
        MigrationStep::new(version, name).operation(Operation::add_column(
            "users",
            ColumnDescriptor::varchar(name.to_lowercase(), 255),
        ))
    }

    #[test]
    fn test_catalog_sorts_by_version() {
        let catalog =
            MigrationCatalog::new(vec![step(300, "Third"), step(100, "First"), step(200, "Second")])
                .unwrap();
        let versions: Vec<u64> = catalog.steps().iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![100, 200, 300]);
        assert_eq!(catalog.find("200_Second").unwrap().name, "Second");
        assert!(catalog.find("200_Missing").is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicate_versions() {
        let err = MigrationCatalog::new(vec![step(100, "First"), step(100, "Other")]).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidCatalog(_)));
    }

    #[test]
    fn test_catalog_rejects_duplicate_names() {
        let err = MigrationCatalog::new(vec![step(100, "Same"), step(200, "Same")]).unwrap_err();
        assert!(err.to_string().contains("duplicate migration name"));
    }

    #[test]
    fn test_catalog_rejects_empty_steps_and_bad_names() {
        let err = MigrationCatalog::new(vec![MigrationStep::new(100, "Empty")]).unwrap_err();
        assert!(err.to_string().contains("no operations"));

        let err = MigrationCatalog::new(vec![step(100, "has space")]).unwrap_err();
        assert!(matches!(err, MigrationError::InvalidCatalog(_)));
    }
}
