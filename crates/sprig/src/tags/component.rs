//! Component invocation tags.
//!
//! Each registered component gets three tags from the engine's formatter. The
//! block form compiles its body into slots:
//!
//! ```text
//! {% card title="Hi" %}
//!   {% slot "header" class="bold" %}Header{% endslot %}
//!   Body text goes to the default slot.
//! {% endcard %}
//! ```
//!
//! Content outside any `{% slot %}` is collected into the default slot
//! (`inner_block` unless configured otherwise). Slot tags are only valid as
//! direct children of the component body.

use minijinja::value::Value;

use super::kwargs::{parse_invocation_args, unquote, AttrArg};
use crate::attributes::AttributeBag;
use crate::component::render_component;
use crate::error::Result;
use crate::slots::{SlotTemplate, Slots};
use crate::template::{Context, Node, NodeList, Parser, TagHandler, Token};

/// Parse handler installed for a component's block-start or inline tag.
#[derive(Debug, Clone)]
pub(crate) struct ComponentTag {
    name: String,
    end_tag: Option<String>,
}

impl ComponentTag {
    pub(crate) fn block(name: impl Into<String>, end_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_tag: Some(end_tag.into()),
        }
    }

    pub(crate) fn inline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            end_tag: None,
        }
    }
}

impl TagHandler for ComponentTag {
    fn parse(&self, parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
        let bits = token.split_contents();
        let (attributes, bind) = parse_invocation_args(parser, token, &bits[1..])?;

        let slots = match &self.end_tag {
            Some(end_tag) => parse_body(parser, token, end_tag, bind)?,
            None if bind.is_some() => {
                return Err(parser.error(
                    token,
                    format!("':let' needs a body, use the block form of '{}'", self.name),
                ));
            }
            None => Vec::new(),
        };

        Ok(Box::new(ComponentNode {
            name: self.name.clone(),
            attributes,
            slots,
        }))
    }
}

/// Splits a component body into slot templates.
///
/// Named slots keep document order. The default slot is created when the
/// body holds anything besides slots and whitespace, or holds no slots at
/// all; it takes the position of its first content.
fn parse_body(
    parser: &mut Parser<'_>,
    start: &Token,
    end_tag: &str,
    bind: Option<String>,
) -> Result<Vec<SlotTemplate>> {
    let mut slots = Vec::new();
    let mut default_body = NodeList::new();
    let mut default_position = None;

    loop {
        let (nodes, end) = parser.parse_until(start, &[end_tag, "slot"])?;
        for node in nodes {
            if default_position.is_none() && !node.is_blank() {
                default_position = Some(slots.len());
            }
            default_body.push(node);
        }
        if end.tag_name() == end_tag {
            break;
        }
        slots.push(parse_slot(parser, &end)?);
    }

    if default_position.is_some() || slots.is_empty() {
        let name = parser.engine().settings().default_slot_name.clone();
        let default = SlotTemplate::new(name, Vec::new(), bind, default_body);
        slots.insert(default_position.unwrap_or(0), default);
    } else if let Some(bind) = bind {
        return Err(parser.error(
            start,
            format!("':let={}' binds the default slot, but the body only has named slots", bind),
        ));
    }

    Ok(slots)
}

/// `{% slot name [attr=value …] [:let=var] %}…{% endslot %}`
fn parse_slot(parser: &mut Parser<'_>, token: &Token) -> Result<SlotTemplate> {
    let bits = token.split_contents();
    let Some(raw_name) = bits.get(1) else {
        return Err(parser.error(token, "'slot' tag requires a slot name"));
    };
    let name = unquote(raw_name);
    if name.is_empty() || name.contains('=') {
        return Err(parser.error(token, format!("invalid slot name '{}'", raw_name)));
    }
    let (attributes, bind) = parse_invocation_args(parser, token, &bits[2..])?;
    let (body, _) = parser.parse_until(token, &["endslot"])?;
    Ok(SlotTemplate::new(name, attributes, bind, body))
}

/// One compiled invocation site.
#[derive(Debug)]
pub(crate) struct ComponentNode {
    name: String,
    attributes: Vec<(String, AttrArg)>,
    slots: Vec<SlotTemplate>,
}

impl ComponentNode {
    fn attribute_bag(&self, ctx: &Context<'_>) -> Result<AttributeBag> {
        let mut bag = AttributeBag::new();
        for (key, arg) in &self.attributes {
            let value: Value = arg.resolve(ctx)?;
            bag.insert(key.clone(), value);
        }
        Ok(bag)
    }
}

impl Node for ComponentNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let attributes = self.attribute_bag(ctx)?;
        let slots = Slots::resolve(&self.slots, ctx)?;
        let html = render_component(&self.name, attributes, slots, ctx)?;
        out.push_str(&html);
        Ok(())
    }
}
