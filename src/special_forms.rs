use crate::types::{
    truthy, Arity, BadClosureParameters, Closure, ClosureParameters, MalObject, MalSymbol,
};
use itertools::Itertools;

use crate::environment::Environment;
use crate::evaluator::{Error, EvalContext, Result, EVAL};
use FnError::{BadVariadic, ParameterNotASymbol};
use std::rc::Rc;

/// `def!` and `defmacro!`. A macro is the evaluated closure with its macro flag set;
/// the original closure value is left untouched.
pub fn apply_def(args: &[MalObject], env: &Rc<Environment>, make_macro: bool) -> Result {
    let form = if make_macro { "defmacro!" } else { "def!" };
    Arity::exactly(2).validate_for(args.len(), form)?;
    let mut value = EVAL(&args[1], env)?;
    if make_macro {
        let closure = value.as_closure()?;
        value = MalObject::Closure(Rc::new(Closure {
            is_macro: true,
            ..closure.clone()
        }));
    }
    let value = env.bind(&args[0], value)?;
    log::debug!("{} {} = {}", form, args[0], value);
    Ok(value)
}

#[derive(Debug)]
pub enum LetError {
    BindingsNotSequence,
    BindingsOddLength,
}

pub fn apply_let(args: &[MalObject], env: &Rc<Environment>) -> Result<EvalContext> {
    Arity::exactly(2).validate_for(args.len(), "let*")?;
    let bindings = args[0]
        .as_seq()
        .or(Err(Error::Let(LetError::BindingsNotSequence)))?;
    match bindings.len() % 2 == 0 {
        true => make_let_environment(bindings, env).map(|child| (args[1].clone(), child)),
        false => Err(Error::Let(LetError::BindingsOddLength)),
    }
}

fn make_let_environment(
    bindings: &[MalObject],
    parent: &Rc<Environment>,
) -> Result<Rc<Environment>> {
    let child = Environment::spawn_from(parent);
    for (key, value) in bindings.iter().tuples() {
        // Evaluate in the child so that later bindings can refer to earlier ones
        let value = EVAL(value, &child)?;
        child.bind(key, value)?;
    }
    Ok(child)
}

/// Evaluates all but the last form, which is handed back for the caller to
/// evaluate in tail position.
pub fn apply_do(args: &[MalObject], env: &Rc<Environment>) -> Result {
    match args.split_last() {
        None => Ok(MalObject::Nil),
        Some((last, init)) => {
            for obj in init {
                EVAL(obj, env)?;
            }
            Ok(last.clone())
        }
    }
}

/// The branch to evaluate next. A missing else branch is `nil`, which
/// evaluates to itself.
pub fn apply_if(args: &[MalObject], env: &Rc<Environment>) -> Result {
    Arity::Between(2..=3).validate_for(args.len(), "if")?;
    let condition = EVAL(&args[0], env)?;
    if truthy(&condition) {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or(MalObject::Nil))
    }
}

#[derive(Debug)]
pub enum FnError {
    ParametersNotGivenAsList,
    ParameterNotASymbol,
    BadVariadic(BadClosureParameters),
}

fn parameter_symbols(parameters: &MalObject) -> std::result::Result<Vec<MalSymbol>, FnError> {
    let parameters = parameters
        .as_seq()
        .map_err(|_| FnError::ParametersNotGivenAsList)?;
    parameters
        .iter()
        .map(|p| p.as_symbol().cloned().map_err(|_| ParameterNotASymbol))
        .collect()
}

/// `(fn* PARAMS BODY)` closes over `env`.
pub fn apply_fn(args: &[MalObject], env: &Rc<Environment>) -> Result {
    Arity::exactly(2).validate_for(args.len(), "fn*")?;
    let symbols = parameter_symbols(&args[0]).map_err(Error::Fn)?;
    let parameters = ClosureParameters::new(symbols).map_err(|e| Error::Fn(BadVariadic(e)))?;
    Ok(MalObject::Closure(Rc::new(Closure {
        parameters,
        body: args[1].clone(),
        parent: env.clone(),
        is_macro: false,
    })))
}
