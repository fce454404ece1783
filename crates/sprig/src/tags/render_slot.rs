//! `{% render_slot slot [value] %}`
//!
//! Renders a slot instance, or every instance of a slot collection in order.
//! The optional second argument is bound to the slot's `:let` name:
//!
//! ```text
//! {% for entry in entries %}
//!   {% for col in slots.column %}<td>{% render_slot col entry %}</td>{% endfor %}
//! {% endfor %}
//! ```
//!
//! A missing slot (undefined or `None`) renders nothing. A slot declaring
//! `:let` must be given a value; undefined or `None` is an error.

use minijinja::value::{Value, ValueKind};

use crate::error::{Error, Result};
use crate::slots::{Slot, SlotList};
use crate::template::{Context, Expression, Node, Parser, Token};

#[derive(Debug)]
struct RenderSlotNode {
    slot: Expression,
    value: Option<Expression>,
}

impl Node for RenderSlotNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let target = self.slot.resolve(ctx)?;
        let value = match &self.value {
            Some(expr) => Some(expr.resolve(ctx)?),
            None => None,
        };

        if let Some(slot) = target.downcast_object_ref::<Slot>() {
            out.push_str(&slot.render(ctx, value.as_ref())?);
        } else if let Some(list) = target.downcast_object_ref::<SlotList>() {
            out.push_str(&list.render(ctx, value.as_ref())?);
        } else if !matches!(target.kind(), ValueKind::Undefined | ValueKind::None) {
            return Err(Error::Render(format!(
                "render_slot expects a slot, got {} ({})",
                target.kind(),
                describe(&target)
            )));
        }
        Ok(())
    }
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        format!("{}…", text.chars().take(40).collect::<String>())
    } else {
        text
    }
}

pub(crate) fn parse_render_slot(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    let bits = token.split_contents();
    let (slot, value) = match bits.as_slice() {
        [_, slot] => (slot, None),
        [_, slot, value] => (slot, Some(value)),
        _ => {
            return Err(parser.error(
                token,
                "'render_slot' takes a slot and an optional value",
            ))
        }
    };
    Ok(Box::new(RenderSlotNode {
        slot: parser.compile_filter(slot, token)?,
        value: value
            .map(|v| parser.compile_filter(v, token))
            .transpose()?,
    }))
}
