//! Whitelisted template functions.
//!
//! Templates can only call functions that were explicitly registered here;
//! identifiers in a template are never resolved to arbitrary code.

use std::{collections::HashMap, fmt, sync::Arc};

/// A template callable: resolved arguments in, cell text out.
pub type TemplateFn = Arc<dyn Fn(&[String]) -> String + Send + Sync>;

/// Name to callable table. Names are matched case-insensitively.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, TemplateFn>,
}

impl FunctionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `upper`, `lower`, `trim`, `concat`, `default` and `truncate`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("upper", |args| first(args).to_uppercase());
        registry.register("lower", |args| first(args).to_lowercase());
        registry.register("trim", |args| first(args).trim().to_string());
        registry.register("concat", |args| args.concat());
        registry.register("default", |args| {
            args.iter()
                .find(|arg| !arg.trim().is_empty())
                .cloned()
                .unwrap_or_default()
        });
        registry.register("truncate", truncate);
        registry
    }

    /// Register (or replace) a function.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        self.functions
            .insert(name.trim().to_lowercase(), Arc::new(function));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.trim().to_lowercase())
    }

    /// Invoke `name`, or `None` if it is not registered.
    #[must_use]
    pub fn call(&self, name: &str, args: &[String]) -> Option<String> {
        self.functions
            .get(&name.trim().to_lowercase())
            .map(|function| function(args))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn first(args: &[String]) -> &str {
    args.first().map_or("", String::as_str)
}

/// `truncate(value, n)`: the first `n` characters of `value`.
fn truncate(args: &[String]) -> String {
    let value = first(args);
    match args.get(1).and_then(|n| n.trim().parse::<usize>().ok()) {
        Some(limit) => value.chars().take(limit).collect(),
        None => value.to_string(),
    }
}
