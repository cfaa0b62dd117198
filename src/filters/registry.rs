//! Filter registry for creating nodes by name.
//!
//! Configuration files and the CLI refer to filters by their metadata ID
//! (`"bilateral"`, `"gaussian"`, ...). The registry maps those IDs to
//! factories producing fresh, default-parameterized nodes.

use crate::core::node::{Category, NodeMetadata, PassthroughNode, PipelineNode};
use crate::core::pixel::Pixel;
use crate::filters::bilateral::BilateralImageFilter;
use crate::filters::gaussian::GaussianSmoothingFilter;
use indexmap::IndexMap;
use std::sync::Arc;

/// Factory function for creating filter instances.
pub type FilterFactory<P, const D: usize> = Arc<dyn Fn() -> Box<dyn PipelineNode<P, D>> + Send + Sync>;

/// Registry entry containing metadata and factory.
pub struct RegistryEntry<P: Pixel, const D: usize> {
    /// Factory function to create instances.
    pub factory: FilterFactory<P, D>,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: NodeMetadata,
}

impl<P: Pixel, const D: usize> Clone for RegistryEntry<P, D> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Registry for all available filter types of one pixel type and
/// dimension.
pub struct FilterRegistry<P: Pixel, const D: usize> {
    /// Filters indexed by their unique ID.
    filters: IndexMap<String, RegistryEntry<P, D>>,
    /// Filters grouped by category.
    categories: IndexMap<Category, Vec<String>>,
}

impl<P: Pixel, const D: usize> FilterRegistry<P, D> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            filters: IndexMap::new(),
            categories: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(|| Box::new(BilateralImageFilter::<D>::new()));
        registry.register(|| Box::new(GaussianSmoothingFilter::<D>::new()));
        registry.register(|| Box::new(PassthroughNode::new()));
        registry
    }

    /// Register a filter type. A later registration with the same ID
    /// replaces the earlier one.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn PipelineNode<P, D>> + Send + Sync + 'static,
    {
        let metadata = factory().metadata();
        let id = metadata.id.clone();
        let category = metadata.category;

        let previous = self.filters.insert(
            id.clone(),
            RegistryEntry {
                factory: Arc::new(factory),
                metadata,
            },
        );
        if let Some(previous) = previous {
            if let Some(ids) = self.categories.get_mut(&previous.metadata.category) {
                ids.retain(|i| *i != id);
            }
        }

        self.categories.entry(category).or_default().push(id);
    }

    /// Create a new instance of a filter by ID.
    pub fn create(&self, id: &str) -> Option<Box<dyn PipelineNode<P, D>>> {
        self.filters.get(id).map(|e| (e.factory)())
    }

    /// Get metadata for a filter without creating an instance.
    pub fn get_metadata(&self, id: &str) -> Option<&NodeMetadata> {
        self.filters.get(id).map(|e| &e.metadata)
    }

    /// Check if a filter is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.filters.contains_key(id)
    }

    /// Get all registered filter IDs.
    pub fn filter_ids(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(|s| s.as_str())
    }

    /// Get filters by category.
    pub fn filters_by_category(&self, category: &Category) -> Vec<&str> {
        self.categories
            .get(category)
            .map(|ids| ids.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    /// Search filters by ID, name or description.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();

        self.filters
            .iter()
            .filter(|(_, entry)| {
                entry.metadata.id.to_lowercase().contains(&query)
                    || entry.metadata.name.to_lowercase().contains(&query)
                    || entry.metadata.description.to_lowercase().contains(&query)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Unregister a filter.
    pub fn unregister(&mut self, id: &str) -> bool {
        if let Some(entry) = self.filters.shift_remove(id) {
            if let Some(ids) = self.categories.get_mut(&entry.metadata.category) {
                ids.retain(|i| i != id);
            }
            true
        } else {
            false
        }
    }

    /// Get the total number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Metadata of every filter grouped by category, sorted by name.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&NodeMetadata>> {
        let mut grouped: IndexMap<Category, Vec<&NodeMetadata>> = IndexMap::new();

        for entry in self.filters.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }

        for filters in grouped.values_mut() {
            filters.sort_by(|a, b| a.name.cmp(&b.name));
        }

        grouped
    }
}

impl<P: Pixel, const D: usize> Default for FilterRegistry<P, D> {
    fn default() -> Self {
        Self::with_builtins()
    }
}
