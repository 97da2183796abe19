//! Manifest reader: the declared side of a clean run

use crate::definition::{DeclaredDefinition, ManifestError, ResourceType};
use crate::runner::ProjectRunner;
use dbtclean_core::{MaterializationKind, ObjectIdentifier};
use std::collections::HashMap;

/// Declared objects keyed by identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeclaredObjects {
    objects: HashMap<ObjectIdentifier, MaterializationKind>,
}

impl DeclaredObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a declaration, returning the materialization it replaced
    pub fn insert(
        &mut self,
        identifier: ObjectIdentifier,
        materialization: MaterializationKind,
    ) -> Option<MaterializationKind> {
        self.objects.insert(identifier, materialization)
    }

    pub fn contains(&self, identifier: &ObjectIdentifier) -> bool {
        self.objects.contains_key(identifier)
    }

    pub fn get(&self, identifier: &ObjectIdentifier) -> Option<&MaterializationKind> {
        self.objects.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectIdentifier, &MaterializationKind)> {
        self.objects.iter()
    }
}

impl FromIterator<(ObjectIdentifier, MaterializationKind)> for DeclaredObjects {
    fn from_iter<T: IntoIterator<Item = (ObjectIdentifier, MaterializationKind)>>(iter: T) -> Self {
        Self {
            objects: iter.into_iter().collect(),
        }
    }
}

/// A declaration that replaced an earlier one with the same identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadowed {
    pub identifier: ObjectIdentifier,
    pub previous: MaterializationKind,
    pub replacement: MaterializationKind,
    pub by: ResourceType,
}

/// Declared objects plus the collisions seen while merging them
#[derive(Debug, Clone, Default)]
pub struct DeclaredState {
    pub objects: DeclaredObjects,
    pub shadowed: Vec<Shadowed>,
}

/// Reads model and seed declarations through a [`ProjectRunner`]
pub struct ManifestReader<R> {
    runner: R,
}

impl<R: ProjectRunner> ManifestReader<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// List every model and seed as `database.schema.name`
    ///
    /// Models are read first, then seeds. On an identifier collision the
    /// later definition wins; collisions are returned in
    /// [`DeclaredState::shadowed`].
    pub async fn list_declared_objects(&self, database: &str) -> Result<DeclaredState, ManifestError> {
        let mut state = DeclaredState::default();

        for resource_type in [ResourceType::Model, ResourceType::Seed] {
            let lines = self.runner.list(resource_type).await?;
            tracing::debug!(
                runner = self.runner.name(),
                resource_type = resource_type.as_str(),
                count = lines.len(),
                "listed dbt resources"
            );

            for line in &lines {
                let definition = DeclaredDefinition::parse(line, resource_type)?;
                let identifier = definition.identifier(database);
                let replacement = definition.materialization;

                if let Some(previous) = state.objects.insert(identifier.clone(), replacement.clone()) {
                    tracing::warn!(
                        identifier = %identifier,
                        previous = %previous,
                        replacement = %replacement,
                        "{} definition shadows an earlier declaration",
                        resource_type
                    );
                    state.shadowed.push(Shadowed {
                        identifier,
                        previous,
                        replacement,
                        by: resource_type,
                    });
                }
            }
        }

        Ok(state)
    }
}
