use modula_api::{ManifestAssembly, RenderedView};
use modula_core::routing::RouteEntry;
use tabled::Tabled;

/// One row of the route table listing.
#[derive(Tabled)]
pub struct RouteRow {
    #[tabled(rename = "#")]
    pub order: usize,
    pub template: String,
    pub handler: String,
    pub assembly: String,
    pub unused: String,
}

impl RouteRow {
    pub fn from_entry(order: usize, entry: &RouteEntry) -> Self {
        let unused = if entry.unused_route_parameter_names.is_empty() {
            "-".to_string()
        } else {
            entry
                .unused_route_parameter_names
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        Self {
            order,
            template: entry.template.to_string(),
            handler: entry.handler.name.to_string(),
            assembly: entry.handler.assembly.to_string(),
            unused,
        }
    }
}

#[derive(Tabled)]
pub struct ManifestRow {
    pub assembly: String,
    pub version: String,
    pub component: bool,
}

impl From<&ManifestAssembly> for ManifestRow {
    fn from(entry: &ManifestAssembly) -> Self {
        Self {
            assembly: entry.assembly_name.clone(),
            version: entry.assembly_version.clone(),
            component: entry.is_component_assembly,
        }
    }
}

/// Short description of a rendered view for log lines.
pub fn describe(view: &RenderedView) -> String {
    match view {
        RenderedView::Page { page_type, .. } => format!("page {page_type}"),
        RenderedView::Fallback { component, path } => format!("fallback {component} for '{path}'"),
        RenderedView::NotFound { path } => format!("not found '{path}'"),
        RenderedView::Extensions { items } => format!("{} extensions", items.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modula_api::ComponentType;
    use modula_core::routing::TemplateParser;
    use smol_str::SmolStr;

    #[test]
    fn test_route_row_lists_unused_parameters() {
        let entry = RouteEntry::new(
            TemplateParser::parse("/users/{id:int}").unwrap(),
            ComponentType::component("App", "App.Users"),
            vec![SmolStr::new("tab")],
        );
        let row = RouteRow::from_entry(1, &entry);
        assert_eq!(row.template, "/users/{id:int}");
        assert_eq!(row.assembly, "App");
        assert_eq!(row.unused, "tab");
    }
}
