//! # Type Registries
//!
//! The [`NodeTypeCatalog`] maps type ids to node definitions (default ports,
//! theme, default payload) and the [`TypeCompatibilityRegistry`] records the
//! implicit conversions among named data types.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::GraphError;
use crate::math::Color;
use crate::model::{ANY_TYPE, EXEC_TYPE, PortDefinition};

/// Colors a renderer uses for nodes of a type.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeTheme {
    pub header_color: Color,
    pub body_color: Color,
    pub text_color: Color,
}

impl Default for NodeTheme {
    fn default() -> Self {
        Self {
            header_color: Color::new(0.25, 0.25, 0.35, 1.0),
            body_color: Color::new(0.15, 0.15, 0.15, 1.0),
            text_color: Color::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

/// Everything the graph needs to materialize a node of a type.
#[derive(Clone, Debug)]
pub struct NodeTypeDefinition {
    pub type_id: String,
    pub display_name: String,
    pub category: String,
    pub description: Option<String>,
    /// Ports synthesized on every new node of this type.
    pub default_ports: Vec<PortDefinition>,
    pub theme: NodeTheme,
    /// Template cloned into each new node's `user_data`.
    pub default_user_data: Value,
    /// Whether nodes of this type accept dynamic ports.
    pub allow_dynamic_ports: bool,
}

impl NodeTypeDefinition {
    pub fn new(type_id: &str, display_name: &str, category: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            display_name: display_name.to_string(),
            category: category.to_string(),
            description: None,
            default_ports: Vec::new(),
            theme: NodeTheme::default(),
            default_user_data: Value::Null,
            allow_dynamic_ports: false,
        }
    }

    pub fn with_port(mut self, definition: PortDefinition) -> Self {
        self.default_ports.push(definition);
        self
    }

    pub fn with_default_data(mut self, data: Value) -> Self {
        self.default_user_data = data;
        self
    }

    pub fn with_dynamic_ports(mut self) -> Self {
        self.allow_dynamic_ports = true;
        self
    }

    /// The declared default port matching a live port's display identity.
    pub fn find_port(&self, name: &str, direction: crate::model::PortDirection) -> Option<&PortDefinition> {
        self.default_ports
            .iter()
            .find(|d| d.name == name && d.direction == direction)
    }
}

/// The catalog of registered node types. Never mutated by the graph itself.
#[derive(Clone, Debug, Default)]
pub struct NodeTypeCatalog {
    definitions: IndexMap<String, NodeTypeDefinition>,
}

impl NodeTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition. Registering the same type id twice is an API
    /// error and leaves the catalog unchanged.
    pub fn register(&mut self, definition: NodeTypeDefinition) -> Result<(), GraphError> {
        if self.definitions.contains_key(&definition.type_id) {
            return Err(GraphError::DuplicateNodeType(definition.type_id));
        }
        self.definitions
            .insert(definition.type_id.clone(), definition);
        Ok(())
    }

    pub fn get(&self, type_id: &str) -> Option<&NodeTypeDefinition> {
        self.definitions.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.definitions.contains_key(type_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &NodeTypeDefinition> {
        self.definitions.values()
    }

    /// Case-insensitive keyword search over name, type id and category.
    pub fn search(&self, keyword: &str) -> Vec<&NodeTypeDefinition> {
        let needle = keyword.to_lowercase();
        self.definitions
            .values()
            .filter(|d| {
                d.display_name.to_lowercase().contains(&needle)
                    || d.type_id.to_lowercase().contains(&needle)
                    || d.category.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Distinct categories in registration order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = IndexSet::new();
        for def in self.definitions.values() {
            seen.insert(def.category.as_str());
        }
        seen.into_iter().collect()
    }
}

/// Records which data types implicitly convert into which others.
///
/// Built-in rules apply before the registered set: identical types always
/// match, `exec` matches only `exec`, and `any` (or the empty string)
/// matches every non-`exec` type in both directions.
#[derive(Clone, Debug, Default)]
pub struct TypeCompatibilityRegistry {
    conversions: HashMap<String, IndexSet<String>>,
}

impl TypeCompatibilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `source` values to flow into `target` ports.
    pub fn register_conversion(&mut self, source: &str, target: &str) {
        self.conversions
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }

    fn is_wildcard(ty: &str) -> bool {
        ty == ANY_TYPE || ty.is_empty()
    }

    /// Whether a `source`-typed output may connect to a `target`-typed input.
    pub fn is_compatible(&self, source: &str, target: &str) -> bool {
        if source == target {
            return true;
        }
        if source == EXEC_TYPE || target == EXEC_TYPE {
            // exec never converts; the identical case was handled above.
            return false;
        }
        if Self::is_wildcard(source) || Self::is_wildcard(target) {
            return true;
        }
        self.conversions
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    /// The type itself, plus `any` (unless the type is `any` or `exec`),
    /// plus the registered conversion set. Wildcard matches are not
    /// enumerated.
    pub fn compatible_types(&self, ty: &str) -> IndexSet<String> {
        let mut out = IndexSet::new();
        out.insert(ty.to_string());
        if !Self::is_wildcard(ty) && ty != EXEC_TYPE {
            out.insert(ANY_TYPE.to_string());
        }
        if let Some(targets) = self.conversions.get(ty) {
            for t in targets {
                out.insert(t.clone());
            }
        }
        out
    }
}
