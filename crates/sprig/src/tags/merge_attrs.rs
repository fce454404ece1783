//! `{% merge_attrs attributes key=default key+=appended … %}`
//!
//! Renders `attributes` merged over the tag's defaults: the bag's own keys
//! override defaults, `class` is always concatenated (defaults first), and
//! `+=` values are joined onto whatever the result holds.
//!
//! ```text
//! <div {% merge_attrs attributes class="card" data-action+="close" %}>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use super::kwargs::AttrArg;
use crate::attributes::{is_valid_key, merge_attributes, AttributeBag};
use crate::error::Result;
use crate::template::{Context, Expression, Node, Parser, Token};

static MERGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([@\w:.\-]+)(\+?=)(.+)$").expect("valid merge pattern"));

#[derive(Debug)]
struct MergeAttrsNode {
    attributes: Expression,
    defaults: Vec<(String, AttrArg)>,
    appends: Vec<(String, AttrArg)>,
}

fn evaluate(args: &[(String, AttrArg)], ctx: &Context<'_>) -> Result<AttributeBag> {
    let mut bag = AttributeBag::new();
    for (key, arg) in args {
        bag.insert(key.clone(), arg.resolve(ctx)?);
    }
    Ok(bag)
}

impl Node for MergeAttrsNode {
    fn render(&self, ctx: &mut Context<'_>, out: &mut String) -> Result<()> {
        let attributes = AttributeBag::from_value(&self.attributes.resolve(ctx)?)?;
        let defaults = evaluate(&self.defaults, ctx)?;
        let appends = evaluate(&self.appends, ctx)?;
        out.push_str(&merge_attributes(&attributes, &defaults, &appends).to_html());
        Ok(())
    }
}

pub(crate) fn parse_merge_attrs(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    let bits = token.split_contents();
    let Some(source) = bits.get(1) else {
        return Err(parser.error(token, "'merge_attrs' requires an attribute bag"));
    };
    let attributes = parser.compile_filter(source, token)?;

    let mut defaults = Vec::new();
    let mut appends = Vec::new();
    for bit in &bits[2..] {
        if let Some(caps) = MERGE_PATTERN.captures(bit) {
            let key = caps[1].to_string();
            let expr = parser.compile_filter(&caps[3], token)?;
            if &caps[2] == "+=" {
                appends.push((key, AttrArg::Expr(expr)));
            } else {
                defaults.push((key, AttrArg::Expr(expr)));
            }
        } else if is_valid_key(bit) {
            defaults.push((bit.clone(), AttrArg::Flag));
        } else {
            return Err(parser.error(token, format!("malformed attribute '{}'", bit)));
        }
    }

    Ok(Box::new(MergeAttrsNode {
        attributes,
        defaults,
        appends,
    }))
}
