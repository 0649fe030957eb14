use crate::environment::Environment;
use crate::printer::{pr_str, PrintMode};
use crate::{evaluator, reader, MalObject};
use std::fmt;
use std::rc::Rc;

pub type Result<T = MalObject> = std::result::Result<T, Error>;
#[derive(Debug)]
pub enum Error {
    Read(reader::Error),
    Eval(evaluator::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

pub fn read(line: &str) -> Result {
    reader::read_str(line).map_err(Error::Read)
}

pub fn eval(obj: &MalObject, env: &Rc<Environment>) -> Result {
    evaluator::evaluate(obj, env).map_err(Error::Eval)
}

pub fn print(obj: &MalObject) -> String {
    pr_str(obj, PrintMode::ReadableRepresentation)
}

/// Read, evaluate and print a single line.
pub fn rep(line: &str, env: &Rc<Environment>) -> Result<String> {
    let ast = read(line)?;
    let result = eval(&ast, env)?;
    Ok(print(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::repl_env;

    #[test]
    fn rep_prints_readably() {
        let env = repl_env().unwrap();
        assert_eq!(rep(r#"(str "a" "b")"#, &env).unwrap(), r#""ab""#);
    }

    #[test]
    fn errors_keep_their_stage() {
        let env = repl_env().unwrap();
        assert!(matches!(rep("(+ 1", &env), Err(Error::Read(_))));
        assert!(matches!(rep("(+ 1 x)", &env), Err(Error::Eval(_))));
    }
}
