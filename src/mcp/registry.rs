//! Tool registry.
//!
//! Tools are registered once at startup through [`ToolRegistryBuilder`]. The
//! built registry is immutable and is borrowed by the server for the life of
//! the process.

use crate::core::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Future returned by a tool handler.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// A tool handler: raw JSON arguments in, JSON result out.
pub type ToolHandler = Box<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// A named tool and its handler.
pub struct ToolDescriptor {
    name: String,
    description: String,
    handler: ToolHandler,
}

impl ToolDescriptor {
    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Invokes the handler.
    pub async fn call(&self, arguments: Value) -> Result<Value> {
        (self.handler)(arguments).await
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from tool name to descriptor.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Iterates over registered tools in name order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Calls the named tool.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| Error::UnknownTool {
            name: name.to_string(),
        })?;
        tool.call(arguments).await
    }
}

/// Builder for [`ToolRegistry`].
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolRegistryBuilder {
    /// Registers a tool. A later registration under the same name replaces
    /// the earlier one.
    #[must_use]
    pub fn tool<F, Fut>(mut self, name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let handler: ToolHandler = Box::new(move |args| Box::pin(handler(args)));
        let previous = self.tools.insert(
            name.to_string(),
            ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                handler,
            },
        );
        if previous.is_some() {
            tracing::warn!(tool = name, "Tool registered twice, keeping the latest");
        }
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        ToolRegistry { tools: self.tools }
    }
}

impl fmt::Debug for ToolRegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistryBuilder")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
