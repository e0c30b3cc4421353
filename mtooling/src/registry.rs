//! Function Registry: resolves model-requested names to tool definitions.
//!
//! ```rust
//! use mconfig::McpConfig;
//! use mtooling::FunctionRegistry;
//!
//! let config = McpConfig::from_json_str(
//!     r#"{
//!         "mcp_server": {"base_url": "https://mcp.example.com"},
//!         "functions": [{"name": "search", "tool": "kb"}],
//!         "tools": {"kb": {"remote_name": "search_documents"}}
//!     }"#,
//! )
//! .expect("document should load");
//!
//! let registry = FunctionRegistry::from_config(&config).expect("registry");
//! let search = registry.resolve("search").expect("registered");
//! assert_eq!(search.binding.remote_name, "search_documents");
//! ```

use std::sync::Arc;

use mcommon::Registry;
use mconfig::{ConfigError, McpConfig};

use crate::{FunctionDeclaration, ToolDefinition, ToolError};

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Registry<String, Arc<ToolDefinition>>,
}

impl FunctionRegistry {
    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Compiles every declared function against its `tools` entry. The load
    /// fails on duplicate names, missing bindings, or bad extraction paths.
    pub fn from_config(config: &McpConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::builder();
        for function in &config.functions {
            let tool = config.tool(function.tool_name()).ok_or_else(|| {
                ConfigError::invalid(format!(
                    "function '{}' is bound to unknown tool '{}'",
                    function.name,
                    function.tool_name()
                ))
            })?;
            builder = builder.function(ToolDefinition::from_config(function, tool, config)?);
        }
        builder.build()
    }

    /// Definition for `name`, whether or not it is enabled.
    pub fn resolve(&self, name: &str) -> Result<Arc<ToolDefinition>, ToolError> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::not_found(format!("function '{name}' is not registered")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Declarations for enabled functions, sorted by name.
    pub fn definitions(&self) -> Vec<FunctionDeclaration> {
        let mut declarations: Vec<_> = self
            .functions
            .values()
            .filter(|definition| definition.enabled)
            .map(|definition| definition.declaration())
            .collect();
        declarations.sort_by(|left, right| left.name.cmp(&right.name));
        declarations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolDefinition>> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FunctionRegistryBuilder {
    definitions: Vec<ToolDefinition>,
}

impl FunctionRegistryBuilder {
    pub fn function(mut self, definition: ToolDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> Result<FunctionRegistry, ConfigError> {
        let mut functions = Registry::new();
        for definition in self.definitions {
            let name = definition.name.clone();
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("function name must not be empty"));
            }
            functions
                .insert_unique(name, Arc::new(definition))
                .map_err(|(name, _)| {
                    ConfigError::invalid(format!("function '{name}' is declared more than once"))
                })?;
        }

        Ok(FunctionRegistry { functions })
    }
}
