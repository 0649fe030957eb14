use crate::environment::{Environment, UnboundSymbol};
use crate::types::{Arity, MalMap, MalObject, PrimitiveFn, RootedPrimitive, TypeMismatch};
use crate::{macros, quasiquote, reader, special_forms, types};
use itertools::Itertools;

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

pub type Result<T = MalObject> = std::result::Result<T, Error>;
#[derive(Debug)]
pub enum Error {
    UnboundSymbol(UnboundSymbol),
    Let(special_forms::LetError),
    Fn(special_forms::FnError),
    TypeMismatch(types::TypeMismatch),
    BadArgCount(types::BadArgCount),
    BadQuasiquote(types::BadArgCount),
    BadIndex(isize, Range<usize>),
    Map(types::MapError),
    DivideByZero,
    MacroExpansionLimit(usize),
    DetachedEnvironment(&'static str),
    ReadError(reader::Error),
    IOError(std::io::Error),
    UserException(MalObject),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnboundSymbol(e) => write!(f, "{}", e),
            Error::TypeMismatch(e) => write!(f, "type mismatch: {:?}", e),
            Error::Let(e) => write!(f, "let*: {:?}", e),
            Error::Fn(e) => write!(f, "fn*: {:?}", e),
            Error::BadArgCount(e) => write!(f, "{}", e),
            Error::BadQuasiquote(e) => write!(f, "quasiquote: {}", e),
            Error::DivideByZero => write!(f, "cannot divide by zero!"),
            Error::MacroExpansionLimit(n) => {
                write!(f, "macro expansion did not finish after {} steps", n)
            }
            Error::DetachedEnvironment(name) => {
                write!(f, "{}: the environment it was defined in no longer exists", name)
            }
            Error::ReadError(e) => write!(f, "read error: {}", e),
            Error::IOError(e) => write!(f, "io error: {}", e),
            Error::BadIndex(i, r) => {
                write!(f, "bad index: {} not in range [{}, {})", i, r.start, r.end)
            }
            Error::Map(types::MapError::MissingValue) => write!(f, "map is missing a value"),
            Error::Map(types::MapError::UnhashableKey) => {
                write!(f, "map keys must be strings or keywords")
            }
            Error::UserException(e) => write!(f, "UserException: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<types::TypeMismatch> for Error {
    fn from(t: TypeMismatch) -> Self {
        Self::TypeMismatch(t)
    }
}

impl From<UnboundSymbol> for Error {
    fn from(e: UnboundSymbol) -> Self {
        Self::UnboundSymbol(e)
    }
}

impl From<types::BadArgCount> for Error {
    fn from(e: types::BadArgCount) -> Self {
        Self::BadArgCount(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

pub(crate) type EvalContext = (MalObject, Rc<Environment>);

/// Evaluate `ast` in `env`. The entry point for everything outside the evaluator.
pub fn evaluate(ast: &MalObject, env: &Rc<Environment>) -> Result {
    EVAL(ast, env)
}

#[allow(non_snake_case)]
pub(crate) fn EVAL(orig_ast: &MalObject, orig_env: &Rc<Environment>) -> Result {
    use MalObject::Symbol;
    let mut ast = orig_ast.clone();
    let mut env = orig_env.clone();
    loop {
        ast = macros::macroexpand(&ast, &env)?;
        let argv = match &ast {
            MalObject::List(argv) => argv.clone(),
            _ => return evaluate_ast(&ast, &env),
        };
        if argv.is_empty() {
            return Ok(ast);
        }
        log::trace!("apply {}", &ast);
        let operands = &argv[1..];
        if let Symbol(name) = &argv[0] {
            match name.as_str() {
                "def!" => return special_forms::apply_def(operands, &env, false),
                "defmacro!" => return special_forms::apply_def(operands, &env, true),
                "let*" => {
                    let (new_ast, new_env) = special_forms::apply_let(operands, &env)?;
                    env = new_env;
                    ast = new_ast;
                    continue;
                }
                "do" => {
                    ast = special_forms::apply_do(operands, &env)?;
                    continue;
                }
                "if" => {
                    ast = special_forms::apply_if(operands, &env)?;
                    continue;
                }
                "fn*" => return special_forms::apply_fn(operands, &env),
                "quote" => {
                    Arity::exactly(1).validate_for(operands.len(), "quote")?;
                    return Ok(operands[0].clone());
                }
                "quasiquoteexpand" => {
                    Arity::exactly(1).validate_for(operands.len(), "quasiquoteexpand")?;
                    return quasiquote::quasiquote(&operands[0]).map_err(Error::BadQuasiquote);
                }
                "quasiquote" => {
                    Arity::exactly(1).validate_for(operands.len(), "quasiquote")?;
                    ast = quasiquote::quasiquote(&operands[0]).map_err(Error::BadQuasiquote)?;
                    continue;
                }
                "macroexpand" => {
                    Arity::exactly(1).validate_for(operands.len(), "macroexpand")?;
                    return macros::macroexpand(&operands[0], &env);
                }
                // Any other initial symbol will be interpreted as a function call and
                // handled below
                _ => (),
            };
        };
        let evaluated = evaluate_sequence_elementwise(&argv, &env)?;
        let (callable, args) = match evaluated.split_first() {
            Some(split) => split,
            None => return Ok(MalObject::new_list()),
        };
        match apply(callable, args)? {
            ApplyOutcome::Finished(obj) => return Ok(obj),
            ApplyOutcome::EvaluateFurther(next_ast, next_env) => {
                ast = next_ast;
                env = next_env;
                continue;
            }
        }
    }
}

/// Closures don't evaluate their bodies here: they hand back the body and the
/// environment to evaluate it in, so that EVAL can loop rather than recurse.
pub(crate) enum ApplyOutcome {
    Finished(MalObject),
    EvaluateFurther(MalObject, Rc<Environment>),
}

/// Apply and evaluate to completion, for callers outside the EVAL loop
/// (macro expansion, builtins taking functions).
pub(crate) fn apply_fully(callable: &MalObject, args: &[MalObject]) -> Result {
    apply(callable, args).and_then(|outcome| match outcome {
        ApplyOutcome::Finished(obj) => Ok(obj),
        ApplyOutcome::EvaluateFurther(ast, env) => EVAL(&ast, &env),
    })
}

pub(crate) fn apply(callable: &MalObject, args: &[MalObject]) -> Result<ApplyOutcome> {
    use MalObject::{Closure, Primitive, Rooted};
    match callable {
        Primitive(f) => call_primitive(f, args).map(ApplyOutcome::Finished),
        Rooted(f) => call_rooted(f, args).map(ApplyOutcome::Finished),
        Closure(f) => {
            log::trace!("Call {} with {}", f, pretty_print_args(args));
            let env = Environment::bind_parameters(&f.parent, &f.parameters, args)?;
            Ok(ApplyOutcome::EvaluateFurther(f.body.clone(), env))
        }
        _ => Err(Error::TypeMismatch(TypeMismatch::NotCallable)),
    }
}

pub(crate) fn evaluate_ast(ast: &MalObject, env: &Rc<Environment>) -> Result {
    log::trace!("evaluate_ast {}", ast);
    match ast {
        MalObject::Symbol(s) => env.fetch(s).map_err(Error::UnboundSymbol),
        MalObject::List(list) => evaluate_sequence_elementwise(list, env).map(MalObject::wrap_list),
        MalObject::Vector(vec) => {
            evaluate_sequence_elementwise(vec, env).map(MalObject::wrap_vector)
        }
        MalObject::Map(map) => evaluate_map(map, env),
        _ => Ok(ast.clone()),
    }
}

fn evaluate_map(map: &MalMap, env: &Rc<Environment>) -> Result {
    let mut evaluated = HashMap::new();
    for (key, old_value) in map.iter() {
        let new_value = EVAL(old_value, env)?;
        evaluated.insert(key.clone(), new_value);
    }
    Ok(MalObject::wrap_map(evaluated))
}

pub fn evaluate_sequence_elementwise(
    seq: &[MalObject],
    env: &Rc<Environment>,
) -> Result<Vec<MalObject>> {
    seq.iter().map(|obj| EVAL(obj, env)).collect()
}

pub(crate) fn pretty_print_args(args: &[MalObject]) -> String {
    match args.len() {
        0 => "no args".into(),
        1 => args[0].to_string(),
        _ => format!("\n\t{}", args.iter().join("\n\t")),
    }
}

pub fn call_primitive(func: &PrimitiveFn, args: &[MalObject]) -> Result {
    func.arity.validate_for(args.len(), func.name)?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    let result = (func.fn_ptr)(args);
    match &result {
        Ok(val) => log::trace!("Call to {} resulted in {}", func.name, val),
        Err(e) => log::trace!("Call to {} failed: {}", func.name, e),
    }
    result
}

fn call_rooted(rooted: &RootedPrimitive, args: &[MalObject]) -> Result {
    let func = rooted.func;
    func.arity.validate_for(args.len(), func.name)?;
    let env = rooted
        .env
        .upgrade()
        .ok_or(Error::DetachedEnvironment(func.name))?;
    log::trace!("Call {} with {}", func.name, pretty_print_args(args));
    (func.fn_ptr)(args, &env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::repl_env;
    use crate::reader::read_str;

    fn eval_str(src: &str, env: &Rc<Environment>) -> Result {
        EVAL(&read_str(src).unwrap(), env)
    }

    #[test]
    fn empty_list_evaluates_to_itself() {
        let env = repl_env().unwrap();
        assert_eq!(eval_str("()", &env).unwrap(), MalObject::new_list());
    }

    #[test]
    fn vectors_and_maps_evaluate_their_elements() {
        let env = repl_env().unwrap();
        assert_eq!(eval_str("[(+ 1 1) 3]", &env).unwrap().to_string(), "[2 3]");
        assert_eq!(eval_str("{:a (+ 1 1)}", &env).unwrap().to_string(), "{:a 2}");
    }

    #[test]
    fn calling_a_non_function_fails() {
        let env = repl_env().unwrap();
        assert!(matches!(
            eval_str("(1 2 3)", &env),
            Err(Error::TypeMismatch(TypeMismatch::NotCallable))
        ));
    }

    #[test]
    fn special_forms_check_their_operand_count() {
        let env = repl_env().unwrap();
        for src in &["(def! a)", "(let* (a 1))", "(if true)", "(quote)", "(fn* (a))"] {
            assert!(
                matches!(eval_str(src, &env), Err(Error::BadArgCount(_))),
                "{} should be an arity error",
                src
            );
        }
    }

    #[test]
    fn an_error_in_one_element_aborts_the_whole_form() {
        let env = repl_env().unwrap();
        assert!(matches!(
            eval_str("(list 1 (undefined) 3)", &env),
            Err(Error::UnboundSymbol(_))
        ));
    }

    #[test]
    fn runaway_macros_hit_the_expansion_limit() {
        let env = repl_env().unwrap();
        eval_str("(defmacro! forever (fn* () (list 'forever)))", &env).unwrap();
        assert!(matches!(
            eval_str("(forever)", &env),
            Err(Error::MacroExpansionLimit(_))
        ));
    }
}
