//! Compiled nodes and the built-in host tags (`for`, `if`, `with`).

use std::fmt;

use minijinja::context;
use minijinja::value::{Value, ValueKind};

use super::context::{Context, Scope};
use super::expr::Expression;
use super::lexer::Token;
use super::library::TagLibrary;
use super::parser::Parser;
use crate::attributes::split_keyword;
use crate::error::{Error, Result};
use crate::util::render_output;

/// A compiled piece of a template.
///
/// Nodes hold only compiled structure, never per-render state, so one tree
/// can render concurrently against many contexts.
pub trait Node: fmt::Debug + Send + Sync {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()>;

    /// Whitespace-only text.
    fn is_blank(&self) -> bool {
        false
    }
}

pub type NodeList = Vec<Box<dyn Node>>;

pub fn render_nodes(nodes: &[Box<dyn Node>], ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
    for node in nodes {
        node.render(ctx, out)?;
    }
    Ok(())
}

pub fn render_to_string(nodes: &[Box<dyn Node>], ctx: &mut Context<'_>) -> Result<String> {
    let mut out = String::new();
    render_nodes(nodes, ctx, &mut out)?;
    Ok(out)
}

#[derive(Debug)]
pub struct TextNode(pub String);

impl Node for TextNode {
    fn render(&self, _ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        out.push_str(&self.0);
        Ok(())
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// `{{ expr }}`
#[derive(Debug)]
pub struct VariableNode(pub Expression);

impl Node for VariableNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let value = self.0.resolve(ctx)?;
        out.push_str(&render_output(&value));
        Ok(())
    }
}

#[derive(Debug)]
struct ForNode {
    targets: Vec<String>,
    iterable: Expression,
    body: NodeList,
    empty: NodeList,
}

impl ForNode {
    fn items(&self, ctx: &Context<'_>) -> Result<Vec<Value>> {
        let value = self.iterable.resolve(ctx)?;
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => return Ok(Vec::new()),
            ValueKind::Map if self.targets.len() == 2 => {
                let keys = value.try_iter().map_err(|e| Error::Render(e.to_string()))?;
                return Ok(keys
                    .map(|key| {
                        let item = value.get_item(&key).unwrap_or(Value::UNDEFINED);
                        Value::from(vec![key, item])
                    })
                    .collect());
            }
            _ => {}
        }
        let items = value
            .try_iter()
            .map_err(|_| Error::Render(format!("cannot iterate over {}", value.kind())))?;
        Ok(items.collect())
    }

    fn bind(&self, scope: &mut Scope, item: Value) {
        if let [single] = self.targets.as_slice() {
            scope.insert(single.clone(), item);
            return;
        }
        for (index, target) in self.targets.iter().enumerate() {
            let part = item
                .get_item(&Value::from(index))
                .unwrap_or(Value::UNDEFINED);
            scope.insert(target.clone(), part);
        }
    }
}

impl Node for ForNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let items = self.items(ctx)?;
        if items.is_empty() {
            return render_nodes(&self.empty, ctx, out);
        }

        let len = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let mut scope = Scope::new();
            self.bind(&mut scope, item);
            scope.insert(
                "forloop".into(),
                context! {
                    counter => index + 1,
                    counter0 => index,
                    revcounter => len - index,
                    first => index == 0,
                    last => index + 1 == len,
                },
            );
            ctx.with_scope(scope, |ctx| render_nodes(&self.body, ctx, out))?;
        }
        Ok(())
    }
}

/// `{% for x in items %}…{% empty %}…{% endfor %}`
pub fn parse_for(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    let bits = token.split_contents();
    let Some(in_pos) = bits.iter().position(|b| b == "in") else {
        return Err(parser.error(token, "'for' statements should use the format 'for x in y'"));
    };
    let targets: Vec<String> = bits[1..in_pos]
        .join(" ")
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if targets.is_empty() || targets.len() > 2 || in_pos + 2 != bits.len() {
        return Err(parser.error(token, format!("invalid 'for' statement: '{}'", token.contents)));
    }
    let iterable = parser.compile_filter(&bits[in_pos + 1], token)?;

    let (body, end) = parser.parse_until(token, &["empty", "endfor"])?;
    let empty = if end.tag_name() == "empty" {
        parser.parse_until(token, &["endfor"])?.0
    } else {
        NodeList::new()
    };

    Ok(Box::new(ForNode {
        targets,
        iterable,
        body,
        empty,
    }))
}

#[derive(Debug)]
enum Comparison {
    Truthy,
    Eq(Expression),
    Ne(Expression),
}

#[derive(Debug)]
struct Condition {
    negated: bool,
    left: Expression,
    comparison: Comparison,
}

impl Condition {
    fn parse(parser: &Parser<'_>, token: &Token, bits: &[String]) -> Result<Self> {
        let (negated, bits) = match bits.split_first() {
            Some((first, rest)) if first == "not" => (true, rest),
            _ => (false, bits),
        };
        let right_operand = |op: &str| -> Result<Expression> {
            match bits.get(2) {
                Some(right) if bits.len() == 3 => parser.compile_filter(right, token),
                _ => Err(parser.error(token, format!("'{}' needs exactly one right-hand operand", op))),
            }
        };
        let Some(left) = bits.first() else {
            return Err(parser.error(token, "missing condition"));
        };
        let left = parser.compile_filter(left, token)?;
        let comparison = match bits.get(1).map(String::as_str) {
            None => Comparison::Truthy,
            Some("==") => Comparison::Eq(right_operand("==")?),
            Some("!=") => Comparison::Ne(right_operand("!=")?),
            Some(other) => {
                return Err(parser.error(token, format!("unsupported operator '{}'", other)))
            }
        };
        Ok(Self {
            negated,
            left,
            comparison,
        })
    }

    fn evaluate(&self, ctx: &Context<'_>) -> Result<bool> {
        let left = self.left.resolve(ctx)?;
        let result = match &self.comparison {
            Comparison::Truthy => left.is_true(),
            Comparison::Eq(right) => left == right.resolve(ctx)?,
            Comparison::Ne(right) => left != right.resolve(ctx)?,
        };
        Ok(result != self.negated)
    }
}

#[derive(Debug)]
struct IfNode {
    branches: Vec<(Option<Condition>, NodeList)>,
}

impl Node for IfNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        for (condition, body) in &self.branches {
            let taken = match condition {
                Some(condition) => condition.evaluate(ctx)?,
                None => true,
            };
            if taken {
                return render_nodes(body, ctx, out);
            }
        }
        Ok(())
    }
}

/// `{% if [not] x [== y] %}…{% elif … %}…{% else %}…{% endif %}`
pub fn parse_if(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    let mut branches = Vec::new();
    let mut current = token.clone();
    loop {
        let condition = match current.tag_name() {
            "else" => None,
            _ => Some(Condition::parse(parser, &current, &current.split_contents()[1..])?),
        };
        let until: &[&str] = if condition.is_some() {
            &["elif", "else", "endif"]
        } else {
            &["endif"]
        };
        let (body, end) = parser.parse_until(token, until)?;
        branches.push((condition, body));
        if end.tag_name() == "endif" {
            break;
        }
        current = end;
    }
    Ok(Box::new(IfNode { branches }))
}

#[derive(Debug)]
struct WithNode {
    bindings: Vec<(String, Expression)>,
    body: NodeList,
}

impl Node for WithNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let mut scope = Scope::new();
        for (name, expr) in &self.bindings {
            scope.insert(name.clone(), expr.resolve(ctx)?);
        }
        ctx.with_scope(scope, |ctx| render_nodes(&self.body, ctx, out))
    }
}

/// `{% with name=expr … %}…{% endwith %}`
pub fn parse_with(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    let mut bindings = Vec::new();
    for bit in &token.split_contents()[1..] {
        let Some((name, value)) = split_keyword(bit) else {
            return Err(parser.error(token, format!("'with' expects name=value, got '{}'", bit)));
        };
        bindings.push((name.to_string(), parser.compile_filter(value, token)?));
    }
    if bindings.is_empty() {
        return Err(parser.error(token, "'with' expects at least one name=value binding"));
    }
    let (body, _) = parser.parse_until(token, &["endwith"])?;
    Ok(Box::new(WithNode { bindings, body }))
}

/// Rejects a tag that is only valid as part of an enclosing block.
pub fn unexpected_tag(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    Err(parser.error(token, format!("unexpected '{}' tag", token.tag_name())))
}

/// Installs `for`, `if` and `with` along with guards for their inner tags.
pub fn install_builtins(library: &mut TagLibrary) {
    library.insert_builtin("for", parse_for);
    library.insert_builtin("if", parse_if);
    library.insert_builtin("with", parse_with);
    for inner in ["empty", "endfor", "elif", "else", "endif", "endwith"] {
        library.insert_builtin(inner, unexpected_tag);
    }
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use minijinja::context;

    fn render(source: &str, data: minijinja::Value) -> String {
        Engine::new().render_str(source, &data).unwrap()
    }

    #[test]
    fn test_for_loop_with_forloop_vars() {
        let out = render(
            "{% for x in items %}{{ forloop.counter }}:{{ x }}{% if not forloop.last %},{% endif %}{% endfor %}",
            context! { items => vec!["a", "b", "c"] },
        );
        assert_eq!(out, "1:a,2:b,3:c");
    }

    #[test]
    fn test_for_empty_branch() {
        let out = render(
            "{% for x in items %}{{ x }}{% empty %}nothing{% endfor %}",
            context! { items => Vec::<String>::new() },
        );
        assert_eq!(out, "nothing");
    }

    #[test]
    fn test_for_over_map_pairs() {
        let data = minijinja::Value::from_serialize(&serde_json::json!({"m": {"a": 1, "b": 2}}));
        let out = render("{% for k, v in m %}{{ k }}={{ v }};{% endfor %}", data);
        assert_eq!(out, "a=1;b=2;");
    }

    #[test]
    fn test_loop_variable_does_not_leak() {
        let out = render(
            "{% for x in items %}{% endfor %}[{{ x }}]",
            context! { items => vec![1, 2] },
        );
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_if_elif_else() {
        let source = "{% if kind == \"a\" %}A{% elif kind != \"b\" %}not B{% else %}B{% endif %}";
        assert_eq!(render(source, context! { kind => "a" }), "A");
        assert_eq!(render(source, context! { kind => "c" }), "not B");
        assert_eq!(render(source, context! { kind => "b" }), "B");
    }

    #[test]
    fn test_with_binds_locally() {
        let out = render(
            "{% with greeting=\"hi\" who=name %}{{ greeting }} {{ who }}{% endwith %}{{ greeting }}",
            context! { name => "Ann" },
        );
        assert_eq!(out, "hi Ann");
    }

    #[test]
    fn test_output_is_escaped() {
        assert_eq!(render("{{ x }}", context! { x => "<b>" }), "&lt;b&gt;");
        assert_eq!(render("{{ x|safe }}", context! { x => "<b>" }), "<b>");
    }

    #[test]
    fn test_stray_end_tag_is_error() {
        let err = Engine::new().compile("a\n{% endif %}").unwrap_err();
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }

    #[test]
    fn test_unclosed_for_is_error() {
        assert!(Engine::new().compile("{% for x in y %}").is_err());
    }
}
