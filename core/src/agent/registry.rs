use crate::config::ConfigIssue;
use crate::traits::{Tool, ToolSpec};
use anyhow::{Result, bail};
use std::sync::Arc;

/// Every tool constructed at startup, keyed by unique name in registration
/// order. Immutable once built and shared between conversations.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    issues: Vec<ConfigIssue>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.get(tool.name()).is_some() {
            bail!("Tool '{}' is already registered", tool.name());
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Records a tool that could not be made available.
    pub fn report_issue(&mut self, tool: impl Into<String>, message: impl Into<String>) {
        let issue = ConfigIssue {
            tool: tool.into(),
            message: message.into(),
        };
        tracing::info!(tool = %issue.tool, "tool unavailable: {}", issue.message);
        self.issues.push(issue);
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Narrows the registry to `enabled`, in that order. Names that are not
    /// registered come back in `unknown` instead of failing.
    pub fn select<S: AsRef<str>>(&self, enabled: &[S]) -> Selection {
        self.select_with(enabled, |name| self.get(name))
    }

    /// Like [`select`](Self::select), but `resolve` decides which instance
    /// backs each enabled name.
    pub fn select_with<S: AsRef<str>>(
        &self,
        enabled: &[S],
        resolve: impl Fn(&str) -> Option<Arc<dyn Tool>>,
    ) -> Selection {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
        let mut unknown = Vec::new();

        for name in enabled {
            let name = name.as_ref().trim();
            if tools.iter().any(|t| t.name() == name) {
                continue;
            }
            match resolve(name) {
                Some(tool) => tools.push(tool),
                None => {
                    tracing::warn!(tool = name, "tool not found in available tools");
                    unknown.push(name.to_string());
                }
            }
        }

        Selection {
            tools: ToolSet::new(tools),
            unknown,
        }
    }
}

pub struct Selection {
    pub tools: ToolSet,
    pub unknown: Vec<String>,
}

/// The tools one executor may call.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn list_available(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        async fn invoke(&self, input: &str) -> anyhow::Result<String> {
            Ok(input.to_string())
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in ["ddg-search", "wikipedia", "arxiv"] {
            registry.register(Arc::new(Named(name))).unwrap();
        }
        registry
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = registry();
        assert!(registry.register(Arc::new(Named("arxiv"))).is_err());
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn select_follows_enabled_order() {
        let selection = registry().select(&["arxiv", "ddg-search", "arxiv"]);
        assert_eq!(selection.tools.names(), ["arxiv", "ddg-search"]);
        assert!(selection.unknown.is_empty());

        let specs = selection.tools.list_available();
        assert_eq!(specs[0].name, "arxiv");
        assert_eq!(specs[0].description, "test tool");
    }

    #[test]
    fn select_reports_unknown_names() {
        let selection = registry().select(&["wikipedia", "python_repl"]);
        assert_eq!(selection.tools.names(), ["wikipedia"]);
        assert_eq!(selection.unknown, ["python_repl"]);
        assert!(selection.tools.lookup("python_repl").is_none());
        assert!(selection.tools.lookup("ddg-search").is_none());
    }

    #[test]
    fn issues_are_kept() {
        let mut registry = registry();
        registry.report_issue("openweathermap", "OWM_API_KEY not set");
        assert_eq!(registry.issues().len(), 1);
        assert_eq!(registry.issues()[0].to_string(), "openweathermap: OWM_API_KEY not set");
    }
}
