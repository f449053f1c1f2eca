//! Minimal placeholder template engine
//!
//! The generator core only needs a small rendering surface: named and
//! inline templates over a parameter mapping, `{{ path | filter }}`
//! substitution, `{% if %}` / `{% for %}` blocks, and two custom filters
//! (`double_quote_escape` and a control-character-preserving `indent`).
//! Parameter values may themselves contain template markers, so named
//! templates are re-rendered to a fixpoint, with a hard iteration cap to
//! turn circular parameter references into a diagnosable error.

use std::collections::HashMap;

use serde_yaml::Value;

use crate::error::DefinitionError;
use crate::macros::double_quote_escape;
use crate::params::{self, ParamMap};

/// Hard cap on fixpoint re-rendering. Exceeding it means the parameters
/// reference each other circularly.
pub const MAX_RENDER_ITERATIONS: usize = 10;

/// A registry of named templates plus the rendering implementation.
#[derive(Debug, Default)]
pub struct TemplateEngine {
    templates: HashMap<String, String>,
}

impl TemplateEngine {
    /// Create an engine with no registered templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine pre-loaded with the built-in output templates.
    pub fn with_builtins() -> Self {
        let mut engine = Self::new();
        crate::templates::register_builtins(&mut engine);
        engine
    }

    /// Register (or replace) a named template.
    pub fn add_template(&mut self, name: &str, text: &str) {
        self.templates.insert(name.to_string(), text.to_string());
    }

    /// Render a named template to a fixpoint against `params`.
    pub fn render(&self, name: &str, params: &ParamMap) -> Result<String, DefinitionError> {
        let text = self
            .templates
            .get(name)
            .ok_or_else(|| DefinitionError::UnknownTemplate(name.to_string()))?;
        self.render_str_fixpoint(text, params, name)
    }

    /// Render an inline template string once.
    pub fn render_str(&self, text: &str, params: &ParamMap) -> Result<String, DefinitionError> {
        let nodes = parse(text)?;
        let mut out = String::with_capacity(text.len());
        eval_nodes(&nodes, &Scope::root(params), &mut out)?;
        Ok(out)
    }

    /// Render an inline template string until the output stops changing
    /// or carries no more markers. Parameter values referring to other
    /// parameters converge here; circular references hit the cap.
    pub fn render_str_fixpoint(
        &self,
        text: &str,
        params: &ParamMap,
        hint: &str,
    ) -> Result<String, DefinitionError> {
        let mut rendered = self.render_str(text, params)?;
        let mut previous = String::new();
        let mut iterations = 0;
        while rendered != previous && has_markers(&rendered) {
            iterations += 1;
            if iterations > MAX_RENDER_ITERATIONS {
                return Err(DefinitionError::TemplateNonConvergence {
                    limit: MAX_RENDER_ITERATIONS,
                    hint: hint.to_string(),
                });
            }
            previous = rendered.clone();
            rendered = self.render_str(&rendered, params)?;
        }
        Ok(rendered)
    }
}

/// True when the text still contains template markers.
pub fn has_markers(text: &str) -> bool {
    text.contains("{{") || text.contains("{%")
}

/// Indent every line of `s` except the first, skipping blank lines.
///
/// Splits on `\n` only: `\r`, `\f` and other control characters pass
/// through untouched instead of being normalized to newlines.
pub fn indent_filter(s: &str, width: usize) -> String {
    let indentation = " ".repeat(width);
    let mut out = String::with_capacity(s.len());
    for (i, line) in s.split_inclusive('\n').enumerate() {
        let is_blank = line.trim().is_empty();
        if i > 0 && !is_blank {
            out.push_str(&indentation);
        }
        out.push_str(line);
    }
    out
}

enum Node {
    Text(String),
    Var {
        path: Vec<String>,
        filters: Vec<Filter>,
    },
    If {
        path: Vec<String>,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    For {
        var: String,
        path: Vec<String>,
        body: Vec<Node>,
    },
}

struct Filter {
    name: String,
    arg: Option<usize>,
}

enum Token {
    Text(String),
    Var(String),
    Tag(String),
}

fn lex(text: &str) -> Result<Vec<Token>, DefinitionError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    loop {
        let var_at = rest.find("{{");
        let tag_at = rest.find("{%");
        let (at, open, close, is_tag) = match (var_at, tag_at) {
            (None, None) => {
                if !rest.is_empty() {
                    tokens.push(Token::Text(rest.to_string()));
                }
                return Ok(tokens);
            }
            (Some(v), Some(t)) if t < v => (t, "{%", "%}", true),
            (Some(v), _) => (v, "{{", "}}", false),
            (None, Some(t)) => (t, "{%", "%}", true),
        };
        if at > 0 {
            tokens.push(Token::Text(rest[..at].to_string()));
        }
        let after = &rest[at + open.len()..];
        let end = after.find(close).ok_or_else(|| {
            DefinitionError::TemplateSyntax(format!("unterminated '{open}' marker"))
        })?;
        let inner = after[..end].trim().to_string();
        tokens.push(if is_tag {
            Token::Tag(inner)
        } else {
            Token::Var(inner)
        });
        rest = &after[end + close.len()..];
    }
}

fn parse(text: &str) -> Result<Vec<Node>, DefinitionError> {
    let tokens = lex(text)?;
    let mut pos = 0;
    let (nodes, stop) = parse_nodes(&tokens, &mut pos, false)?;
    if let Some(tag) = stop {
        return Err(DefinitionError::TemplateSyntax(format!(
            "unexpected '{{% {tag} %}}' outside a block"
        )));
    }
    Ok(nodes)
}

/// Parse nodes until a block-closing tag (when `in_block`) or the end of
/// input. Returns the nodes and the closing tag that stopped the parse.
fn parse_nodes(
    tokens: &[Token],
    pos: &mut usize,
    in_block: bool,
) -> Result<(Vec<Node>, Option<String>), DefinitionError> {
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Text(text) => {
                nodes.push(Node::Text(text.clone()));
                *pos += 1;
            }
            Token::Var(inner) => {
                let (path, filters) = parse_var(inner)?;
                nodes.push(Node::Var { path, filters });
                *pos += 1;
            }
            Token::Tag(inner) => {
                let words: Vec<&str> = inner.split_whitespace().collect();
                match words.as_slice() {
                    ["if", path] => {
                        *pos += 1;
                        let path = parse_path(path)?;
                        let (then, stop) = parse_nodes(tokens, pos, true)?;
                        let otherwise = match stop.as_deref() {
                            Some("endif") => Vec::new(),
                            Some("else") => {
                                let (otherwise, stop) = parse_nodes(tokens, pos, true)?;
                                if stop.as_deref() != Some("endif") {
                                    return Err(DefinitionError::TemplateSyntax(
                                        "'{% else %}' without '{% endif %}'".to_string(),
                                    ));
                                }
                                otherwise
                            }
                            _ => {
                                return Err(DefinitionError::TemplateSyntax(
                                    "'{% if %}' without '{% endif %}'".to_string(),
                                ))
                            }
                        };
                        nodes.push(Node::If {
                            path,
                            then,
                            otherwise,
                        });
                    }
                    ["for", var, "in", path] => {
                        *pos += 1;
                        let path = parse_path(path)?;
                        let (body, stop) = parse_nodes(tokens, pos, true)?;
                        if stop.as_deref() != Some("endfor") {
                            return Err(DefinitionError::TemplateSyntax(
                                "'{% for %}' without '{% endfor %}'".to_string(),
                            ));
                        }
                        nodes.push(Node::For {
                            var: var.to_string(),
                            path,
                            body,
                        });
                    }
                    ["else"] | ["endif"] | ["endfor"] => {
                        if !in_block {
                            return Ok((nodes, Some(words[0].to_string())));
                        }
                        *pos += 1;
                        return Ok((nodes, Some(words[0].to_string())));
                    }
                    _ => {
                        return Err(DefinitionError::TemplateSyntax(format!(
                            "unrecognized tag '{{% {inner} %}}'"
                        )))
                    }
                }
            }
        }
    }
    Ok((nodes, None))
}

fn parse_path(path: &str) -> Result<Vec<String>, DefinitionError> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DefinitionError::TemplateSyntax(format!(
            "malformed value path '{path}'"
        )));
    }
    Ok(segments)
}

fn parse_var(inner: &str) -> Result<(Vec<String>, Vec<Filter>), DefinitionError> {
    let mut parts = inner.split('|').map(str::trim);
    let path = parse_path(parts.next().unwrap_or(""))?;
    let mut filters = Vec::new();
    for part in parts {
        let (name, arg) = match part.find('(') {
            Some(open) => {
                let close = part.rfind(')').ok_or_else(|| {
                    DefinitionError::TemplateSyntax(format!("malformed filter '{part}'"))
                })?;
                let arg = part[open + 1..close].trim().parse::<usize>().map_err(|_| {
                    DefinitionError::TemplateSyntax(format!(
                        "filter argument must be an integer in '{part}'"
                    ))
                })?;
                (part[..open].trim().to_string(), Some(arg))
            }
            None => (part.to_string(), None),
        };
        filters.push(Filter { name, arg });
    }
    Ok((path, filters))
}

/// Lookup scope: the parameter mapping plus any enclosing loop bindings.
struct Scope<'a> {
    params: &'a ParamMap,
    locals: Vec<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    fn root(params: &'a ParamMap) -> Self {
        Self {
            params,
            locals: Vec::new(),
        }
    }

    fn with_local(&self, name: &'a str, value: &'a Value) -> Scope<'a> {
        let mut locals = self.locals.clone();
        locals.push((name, value));
        Scope {
            params: self.params,
            locals,
        }
    }

    fn lookup(&self, path: &[String]) -> Option<&'a Value> {
        let first = path.first()?;
        let mut current = self
            .locals
            .iter()
            .rev()
            .find(|(name, _)| name == first)
            .map(|(_, value)| *value)
            .or_else(|| self.params.get(&params::key(first)))?;
        for segment in &path[1..] {
            current = match current {
                Value::Mapping(map) => map.get(&params::key(segment))?,
                Value::Sequence(seq) => seq.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Sequence(seq)) => !seq.is_empty(),
        Some(Value::Mapping(map)) => !map.is_empty(),
        Some(Value::Tagged(_)) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(stringify).collect();
            items.join(", ")
        }
        Value::Mapping(_) | Value::Tagged(_) => String::new(),
    }
}

fn apply_filter(filter: &Filter, text: String) -> Result<String, DefinitionError> {
    match filter.name.as_str() {
        "double_quote_escape" => Ok(double_quote_escape(&text)),
        "indent" => Ok(indent_filter(&text, filter.arg.unwrap_or(4))),
        other => Err(DefinitionError::UnknownFilter(other.to_string())),
    }
}

fn eval_nodes(nodes: &[Node], scope: &Scope, out: &mut String) -> Result<(), DefinitionError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { path, filters } => {
                let mut text = scope
                    .lookup(path)
                    .map(stringify)
                    .unwrap_or_default();
                for filter in filters {
                    text = apply_filter(filter, text)?;
                }
                out.push_str(&text);
            }
            Node::If {
                path,
                then,
                otherwise,
            } => {
                if truthy(scope.lookup(path)) {
                    eval_nodes(then, scope, out)?;
                } else {
                    eval_nodes(otherwise, scope, out)?;
                }
            }
            Node::For { var, path, body } => {
                if let Some(Value::Sequence(items)) = scope.lookup(path) {
                    for item in items {
                        let inner = scope.with_local(var, item);
                        eval_nodes(body, &inner, out)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::set;
    use pretty_assertions::assert_eq;
    use serde_yaml::Value;

    fn params(pairs: &[(&str, Value)]) -> ParamMap {
        let mut map = ParamMap::new();
        for (k, v) in pairs {
            set(&mut map, k, v.clone());
        }
        map
    }

    #[test]
    fn test_substitution_and_missing_values() {
        let engine = TemplateEngine::new();
        let p = params(&[("name", Value::from("2d.fill"))]);
        assert_eq!(
            engine.render_str("test: {{ name }}!{{ missing }}", &p).unwrap(),
            "test: 2d.fill!"
        );
    }

    #[test]
    fn test_sequence_indexing() {
        let engine = TemplateEngine::new();
        let p = params(&[(
            "size",
            Value::Sequence(vec![Value::from(100), Value::from(50)]),
        )]);
        assert_eq!(
            engine
                .render_str("width={{ size.0 }} height={{ size.1 }}", &p)
                .unwrap(),
            "width=100 height=50"
        );
    }

    #[test]
    fn test_double_quote_escape_filter() {
        let engine = TemplateEngine::new();
        let p = params(&[("desc", Value::from(r#"say "hi" \ bye"#))]);
        assert_eq!(
            engine
                .render_str(r#""{{ desc | double_quote_escape }}""#, &p)
                .unwrap(),
            r#""say \"hi\" \\ bye""#
        );
    }

    #[test]
    fn test_indent_filter_skips_first_and_blank_lines() {
        assert_eq!(indent_filter("a\n\nb\n", 2), "a\n\n  b\n");
    }

    #[test]
    fn test_indent_filter_preserves_control_characters() {
        // \r and \f are not line separators here and must pass through.
        assert_eq!(indent_filter("a\rb\n\u{c}c", 2), "a\rb\n  \u{c}c");
    }

    #[test]
    fn test_if_else() {
        let engine = TemplateEngine::new();
        let p = params(&[("notes", Value::from("be careful"))]);
        let tpl = "{% if notes %}[{{ notes }}]{% else %}none{% endif %}";
        assert_eq!(engine.render_str(tpl, &p).unwrap(), "[be careful]");
        assert_eq!(
            engine.render_str(tpl, &ParamMap::new()).unwrap(),
            "none"
        );
    }

    #[test]
    fn test_empty_string_is_falsy() {
        let engine = TemplateEngine::new();
        let p = params(&[("attributes", Value::from(""))]);
        assert_eq!(
            engine
                .render_str("{% if attributes %}yes{% else %}no{% endif %}", &p)
                .unwrap(),
            "no"
        );
    }

    #[test]
    fn test_for_over_variant_mappings() {
        let engine = TemplateEngine::new();
        let mut v1 = ParamMap::new();
        set(&mut v1, "id", Value::from(0));
        let mut v2 = ParamMap::new();
        set(&mut v2, "id", Value::from(1));
        let p = params(&[(
            "variants",
            Value::Sequence(vec![Value::Mapping(v1), Value::Mapping(v2)]),
        )]);
        assert_eq!(
            engine
                .render_str("{% for v in variants %}<c{{ v.id }}>{% endfor %}", &p)
                .unwrap(),
            "<c0><c1>"
        );
    }

    #[test]
    fn test_fixpoint_resolves_parameter_references() {
        let engine = TemplateEngine::new();
        let p = params(&[
            ("color", Value::from("{{ base_color }}")),
            ("base_color", Value::from("#0f0")),
        ]);
        assert_eq!(
            engine
                .render_str_fixpoint("fill: {{ color }}", &p, "inline")
                .unwrap(),
            "fill: #0f0"
        );
    }

    #[test]
    fn test_fixpoint_cap_on_circular_references() {
        let engine = TemplateEngine::new();
        let p = params(&[
            ("a", Value::from("{{ b }}x")),
            ("b", Value::from("{{ a }}y")),
        ]);
        let err = engine.render_str_fixpoint("{{ a }}", &p, "inline").unwrap_err();
        assert!(matches!(err, DefinitionError::TemplateNonConvergence { .. }));
    }

    #[test]
    fn test_named_template_registry() {
        let mut engine = TemplateEngine::new();
        engine.add_template("greeting", "hello {{ name }}");
        let p = params(&[("name", Value::from("world"))]);
        assert_eq!(engine.render("greeting", &p).unwrap(), "hello world");
        assert!(matches!(
            engine.render("nope", &p).unwrap_err(),
            DefinitionError::UnknownTemplate(_)
        ));
    }

    #[test]
    fn test_unterminated_marker_is_an_error() {
        let engine = TemplateEngine::new();
        let err = engine.render_str("{{ name", &ParamMap::new()).unwrap_err();
        assert!(matches!(err, DefinitionError::TemplateSyntax(_)));
    }

    #[test]
    fn test_unknown_filter_is_an_error() {
        let engine = TemplateEngine::new();
        let p = params(&[("x", Value::from("v"))]);
        let err = engine.render_str("{{ x | shout }}", &p).unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownFilter(name) if name == "shout"));
    }
}
