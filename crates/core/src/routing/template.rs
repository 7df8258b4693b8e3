//! Route template parsing: `/literal/{param}/{param:constraint}`.

use super::LiteralComparison;
use super::constraint::RouteConstraint;
use crate::error::RouteError;
use modula_api::RouteValue;
use smol_str::SmolStr;
use std::fmt;

/// One `/`-separated piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Literal(SmolStr),
    Parameter {
        name: SmolStr,
        /// Applied in order; every one must accept the segment.
        constraints: Vec<RouteConstraint>,
    },
}

/// Outcome of matching one path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentMatch {
    Miss,
    Literal,
    Parameter(RouteValue),
}

impl TemplateSegment {
    pub fn is_parameter(&self) -> bool {
        matches!(self, TemplateSegment::Parameter { .. })
    }

    /// The literal text or the parameter name.
    pub fn value(&self) -> &str {
        match self {
            TemplateSegment::Literal(text) => text,
            TemplateSegment::Parameter { name, .. } => name,
        }
    }

    pub fn matches(&self, segment: &str, comparison: LiteralComparison) -> SegmentMatch {
        match self {
            TemplateSegment::Literal(text) => {
                if comparison.matches(text, segment) {
                    SegmentMatch::Literal
                } else {
                    SegmentMatch::Miss
                }
            }
            TemplateSegment::Parameter { constraints, .. } => {
                let mut value = RouteValue::Str(segment.to_string());
                for constraint in constraints {
                    match constraint.try_convert(segment) {
                        Some(converted) => value = converted,
                        None => return SegmentMatch::Miss,
                    }
                }
                SegmentMatch::Parameter(value)
            }
        }
    }

    /// `{name}` body parsed as `name[:constraint]*`.
    fn parameter(template: &str, segment: &str, body: &str) -> Result<Self, RouteError> {
        let mut tokens = body.split(':');
        let name = tokens.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed(
                template,
                format!("Empty parameter name in segment '{segment}' is not allowed."),
            ));
        }

        let constraints = tokens
            .map(|keyword| RouteConstraint::parse(template, segment, keyword))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TemplateSegment::Parameter {
            name: SmolStr::new(name),
            constraints,
        })
    }
}

impl fmt::Display for TemplateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSegment::Literal(text) => f.write_str(text),
            TemplateSegment::Parameter { name, constraints } => {
                write!(f, "{{{name}")?;
                for constraint in constraints {
                    write!(f, ":{constraint}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A parsed template. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTemplate {
    /// The template text as written on the component.
    pub template: SmolStr,
    pub segments: Vec<TemplateSegment>,
}

impl RouteTemplate {
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter(|s| s.is_parameter())
            .map(|s| s.value())
    }
}

/// Canonical form: `/` followed by the segments joined with `/`.
impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

pub struct TemplateParser;

impl TemplateParser {
    pub const INVALID_PARAMETER_NAME_CHARACTERS: [char; 6] = ['*', '?', '{', '}', '=', '.'];

    pub fn parse(template: &str) -> Result<RouteTemplate, RouteError> {
        let trimmed = template.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(RouteTemplate {
                template: SmolStr::new(template),
                segments: Vec::new(),
            });
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('/') {
            segments.push(Self::parse_segment(template, segment)?);
        }

        for (i, current) in segments.iter().enumerate() {
            if !current.is_parameter() {
                continue;
            }
            let duplicate = segments[i + 1..]
                .iter()
                .filter(|s| s.is_parameter())
                .any(|s| s.value().to_lowercase() == current.value().to_lowercase());
            if duplicate {
                return Err(malformed(
                    template,
                    format!("The parameter '{}' appears multiple times.", current.value()),
                ));
            }
        }

        Ok(RouteTemplate {
            template: SmolStr::new(template),
            segments,
        })
    }

    fn parse_segment(template: &str, segment: &str) -> Result<TemplateSegment, RouteError> {
        if segment.is_empty() {
            return Err(malformed(template, "Empty segments are not allowed.".to_string()));
        }

        let Some(rest) = segment.strip_prefix('{') else {
            if segment.ends_with('}') {
                return Err(malformed(
                    template,
                    format!("Missing '{{' in parameter segment '{segment}'."),
                ));
            }
            if segment.contains(['{', '}']) {
                return Err(malformed(
                    template,
                    format!("Complex segment '{segment}' is not supported."),
                ));
            }
            return Ok(TemplateSegment::Literal(SmolStr::new(segment)));
        };

        let Some(body) = rest.strip_suffix('}') else {
            return Err(malformed(
                template,
                format!("Missing '}}' in parameter segment '{segment}'."),
            ));
        };

        if body.is_empty() {
            return Err(malformed(
                template,
                format!("Empty parameter name in segment '{segment}' is not allowed."),
            ));
        }

        if let Some(invalid) = body
            .chars()
            .find(|c| Self::INVALID_PARAMETER_NAME_CHARACTERS.contains(c))
        {
            return Err(malformed(
                template,
                format!("The character '{invalid}' in parameter segment '{segment}' is not allowed."),
            ));
        }

        TemplateSegment::parameter(template, segment, body)
    }
}

fn malformed(template: &str, reason: String) -> RouteError {
    RouteError::MalformedTemplate {
        template: template.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(template: &str) -> String {
        match TemplateParser::parse(template) {
            Err(RouteError::MalformedTemplate { reason, .. }) => reason,
            other => panic!("expected malformed template, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_literals_and_parameters() {
        let template = TemplateParser::parse("/users/{id:int}/edit").unwrap();
        assert_eq!(
            template.segments,
            vec![
                TemplateSegment::Literal("users".into()),
                TemplateSegment::Parameter {
                    name: "id".into(),
                    constraints: vec![RouteConstraint::Int],
                },
                TemplateSegment::Literal("edit".into()),
            ]
        );
        assert_eq!(template.to_string(), "/users/{id:int}/edit");
        assert_eq!(template.parameter_names().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn test_root_template_has_no_segments() {
        assert!(TemplateParser::parse("/").unwrap().segments.is_empty());
        assert!(TemplateParser::parse("").unwrap().segments.is_empty());
        assert_eq!(TemplateParser::parse("//").unwrap().to_string(), "/");
    }

    #[test]
    fn test_malformed_templates() {
        assert!(reason("/a//b").contains("Empty segments"));
        assert!(reason("/a/id}").contains("Missing '{'"));
        assert!(reason("/a/{id").contains("Missing '}'"));
        assert!(reason("/a/{}").contains("Empty parameter name"));
        assert!(reason("/a/{:int}").contains("Empty parameter name"));
        assert!(reason("/a/{i.d}").contains("'.'"));
        assert!(reason("/a/{id?}").contains("'?'"));
        assert!(reason("/a/{id}/{ID}").contains("appears multiple times"));
        assert!(reason("/a/{id:}").contains("empty constraint"));
        assert!(reason("/a/x{id}x").contains("Complex segment"));
    }

    #[test]
    fn test_unsupported_constraint() {
        assert_eq!(
            TemplateParser::parse("/a/{id:uint}"),
            Err(RouteError::UnsupportedConstraint {
                template: "/a/{id:uint}".to_string(),
                constraint: "uint".to_string(),
            })
        );
    }

    #[test]
    fn test_chained_constraints_must_all_accept() {
        let template = TemplateParser::parse("/{id:long:int}").unwrap();
        let segment = &template.segments[0];
        assert_eq!(
            segment.matches("12", LiteralComparison::Ordinal),
            SegmentMatch::Parameter(RouteValue::Int(12))
        );
        assert_eq!(
            segment.matches("3000000000", LiteralComparison::Ordinal),
            SegmentMatch::Miss
        );
    }

    #[test]
    fn test_unconstrained_parameter_captures_string() {
        let template = TemplateParser::parse("/{slug}").unwrap();
        assert_eq!(
            template.segments[0].matches("hello world", LiteralComparison::Ordinal),
            SegmentMatch::Parameter(RouteValue::Str("hello world".into()))
        );
    }
}
