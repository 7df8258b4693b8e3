use super::LiteralComparison;
use super::context::RouteContext;
use super::entry::RouteEntry;
use super::template::TemplateParser;
use crate::error::RouteError;
use indexmap::{IndexMap, IndexSet};
use modula_api::{ComponentType, RouteParameters};
use serde::Serialize;
use smol_str::SmolStr;

/// Result of matching a path against a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMatch {
    pub handler: ComponentType,
    pub template: String,
    pub parameters: RouteParameters,
}

/// Ordered route entries; replaced wholesale, never edited in place.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
    comparison: LiteralComparison,
}

impl RouteTable {
    /// Builds a table from component types in discovery order.
    ///
    /// Each route template of each type yields one entry. Any malformed
    /// template fails the whole build.
    pub fn create(
        types: impl IntoIterator<Item = ComponentType>,
        comparison: LiteralComparison,
    ) -> Result<Self, RouteError> {
        let mut templates_by_handler: IndexMap<ComponentType, Vec<_>> = IndexMap::new();
        for ty in types {
            if ty.routes.is_empty() || templates_by_handler.contains_key(&ty) {
                continue;
            }
            let templates = ty
                .routes
                .iter()
                .map(|t| TemplateParser::parse(t))
                .collect::<Result<Vec<_>, _>>()?;
            templates_by_handler.insert(ty, templates);
        }

        let mut routes = Vec::new();
        for (handler, templates) in templates_by_handler {
            let all_names: IndexSet<SmolStr> = templates
                .iter()
                .flat_map(|t| t.parameter_names().map(SmolStr::new))
                .collect();

            for template in templates {
                let own: IndexSet<&str> = template.parameter_names().collect();
                let unused = all_names
                    .iter()
                    .filter(|name| !own.contains(name.as_str()))
                    .cloned()
                    .collect();
                routes.push(RouteEntry::new(template, handler.clone(), unused));
            }
        }

        tracing::debug!("Built route table with {} entries", routes.len());
        Ok(Self { routes, comparison })
    }

    /// Copy of the table holding only the entries whose handler satisfies `keep`.
    pub fn retain(&self, keep: impl Fn(&ComponentType) -> bool) -> Self {
        Self {
            routes: self
                .routes
                .iter()
                .filter(|entry| keep(&entry.handler))
                .cloned()
                .collect(),
            comparison: self.comparison,
        }
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn comparison(&self) -> LiteralComparison {
        self.comparison
    }

    /// Fills `context` from the first matching entry.
    pub fn route(&self, context: &mut RouteContext) {
        for entry in &self.routes {
            if entry.matches(context, self.comparison) {
                return;
            }
        }
    }

    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let mut context = RouteContext::new(path);
        for entry in &self.routes {
            if entry.matches(&mut context, self.comparison) {
                return Some(RouteMatch {
                    handler: entry.handler.clone(),
                    template: entry.template.template.to_string(),
                    parameters: context.parameters,
                });
            }
        }
        None
    }
}
