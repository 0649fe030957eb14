use crate::environment::Environment;
use crate::evaluator::{apply_fully, Error, Result};
use crate::types::MalObject;
use std::rc::Rc;

/// Successive expansions of a single form before we give up on it.
pub const MAX_MACRO_EXPANSIONS: usize = 10_000;

/// The macro a form invokes, if its head symbol is bound to one.
pub fn is_macro_call(ast: &MalObject, env: &Environment) -> Option<MalObject> {
    let head = ast.as_list().ok()?.first()?.as_symbol().ok()?;
    env.get(head).filter(MalObject::is_macro)
}

pub fn macroexpand(ast: &MalObject, env: &Rc<Environment>) -> Result {
    let mut ast = ast.clone();
    let mut expansions = 0;
    while let Some(macro_fn) = is_macro_call(&ast, env) {
        if expansions == MAX_MACRO_EXPANSIONS {
            return Err(Error::MacroExpansionLimit(MAX_MACRO_EXPANSIONS));
        }
        expansions += 1;
        let args = ast.as_list()?[1..].to_vec();
        ast = apply_fully(&macro_fn, &args)?;
        log::trace!("macroexpand produced {}", ast);
    }
    Ok(ast)
}
