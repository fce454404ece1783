//! The component tag compiler.
//!
//! Component tags are installed per registration by
//! [`Engine::register`](crate::Engine::register); this module installs the
//! global ones:
//!
//! - `render_slot`: renders a slot passed to the current component
//! - `merge_attrs`: renders an attribute bag merged over defaults
//! - guards rejecting `slot`/`endslot` outside a component body

pub(crate) mod component;
pub mod kwargs;
mod merge_attrs;
mod render_slot;

use crate::error::Result;
use crate::template::{Node, Parser, TagLibrary, Token};

pub(crate) use component::ComponentTag;

fn misplaced_slot(parser: &mut Parser<'_>, token: &Token) -> Result<Box<dyn Node>> {
    Err(parser.error(
        token,
        format!(
            "'{}' is only allowed directly inside a component block",
            token.tag_name()
        ),
    ))
}

/// Installs `render_slot`, `merge_attrs` and the `slot` guards.
pub fn install(library: &mut TagLibrary) {
    library.insert_builtin("render_slot", render_slot::parse_render_slot);
    library.insert_builtin("merge_attrs", merge_attrs::parse_merge_attrs);
    library.insert_builtin("slot", misplaced_slot);
    library.insert_builtin("endslot", misplaced_slot);
}
