//! Route templates, the route table, and the routers built on top of them.

pub mod constraint;
pub mod context;
pub mod entry;
pub mod modular;
pub mod router;
pub mod table;
pub mod template;

use serde::{Deserialize, Serialize};

pub use constraint::RouteConstraint;
pub use context::RouteContext;
pub use entry::RouteEntry;
pub use modular::{AssemblyRouteSource, ModularRouter};
pub use router::{RoutableComponents, RouteData, Router, RouterParameters, RouterPhase, StaticRoutes};
pub use table::{RouteMatch, RouteTable};
pub use template::{RouteTemplate, TemplateParser, TemplateSegment};

/// How literal template segments are compared with path segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralComparison {
    #[default]
    Ordinal,
    IgnoreCase,
}

impl LiteralComparison {
    pub fn matches(self, literal: &str, segment: &str) -> bool {
        match self {
            LiteralComparison::Ordinal => literal == segment,
            LiteralComparison::IgnoreCase => literal.to_lowercase() == segment.to_lowercase(),
        }
    }
}
