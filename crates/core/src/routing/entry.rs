use super::LiteralComparison;
use super::context::RouteContext;
use super::template::{RouteTemplate, SegmentMatch};
use modula_api::{ComponentType, RouteParameters};
use smol_str::SmolStr;

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub template: RouteTemplate,
    pub handler: ComponentType,
    /// Parameters the handler declares on its other templates; set to `None`
    /// when this entry matches so the handler sees a stable parameter set.
    pub unused_route_parameter_names: Vec<SmolStr>,
}

impl RouteEntry {
    pub fn new(
        template: RouteTemplate,
        handler: ComponentType,
        unused_route_parameter_names: Vec<SmolStr>,
    ) -> Self {
        Self {
            template,
            handler,
            unused_route_parameter_names,
        }
    }

    /// Fills `context` with the handler and parameters if this entry matches.
    pub fn matches(&self, context: &mut RouteContext, comparison: LiteralComparison) -> bool {
        if self.template.segments.len() != context.segments.len() {
            return false;
        }

        let mut parameters = RouteParameters::new();
        for (segment, path_segment) in self.template.segments.iter().zip(&context.segments) {
            match segment.matches(path_segment, comparison) {
                SegmentMatch::Miss => return false,
                SegmentMatch::Literal => {}
                SegmentMatch::Parameter(value) => {
                    parameters.insert(SmolStr::new(segment.value()), Some(value));
                }
            }
        }

        for name in &self.unused_route_parameter_names {
            parameters.insert(name.clone(), None);
        }

        context.parameters = parameters;
        context.handler = Some(self.handler.clone());
        true
    }
}
