use crate::types::{BadArgCount, ClosureParameters, MalObject, MalSymbol, TypeMismatch};
use crate::{core, evaluator};
use derive_more::Display;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Display)]
#[display(fmt = "'{}' not found", _0)]
pub struct UnboundSymbol(pub MalSymbol);

/// One lexical scope. Frames only ever point outwards, so a chain of them
/// never forms a cycle on its own.
#[derive(Default)]
pub struct Environment {
    data: RefCell<HashMap<MalSymbol, MalObject>>,
    outer: Option<Rc<Environment>>,
}

impl fmt::Debug for Environment {
    // Bindings may hold closures over this very environment, so only list names.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        let mut names: Vec<&str> = data.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("outer", &self.outer.is_some())
            .finish()
    }
}

impl Environment {
    pub fn spawn_from(outer: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Self {
            data: RefCell::new(HashMap::new()),
            outer: Some(outer.clone()),
        })
    }

    /// Bind in this frame only, replacing any earlier binding here.
    pub fn set(&self, key: MalSymbol, value: MalObject) -> MalObject {
        self.data.borrow_mut().insert(key, value.clone());
        value
    }

    pub fn bind(&self, key: &MalObject, value: MalObject) -> Result<MalObject, TypeMismatch> {
        let key = key.as_symbol()?;
        Ok(self.set(key.clone(), value))
    }

    pub fn get(&self, key: &MalSymbol) -> Option<MalObject> {
        let mut env = self;
        loop {
            if let Some(value) = env.data.borrow().get(key) {
                return Some(value.clone());
            }
            env = env.outer.as_deref()?;
        }
    }

    pub fn fetch(&self, key: &MalSymbol) -> Result<MalObject, UnboundSymbol> {
        self.get(key).ok_or_else(|| UnboundSymbol(key.clone()))
    }

    /// A fresh frame below `outer` binding each parameter to its argument.
    /// A variadic parameter collects the remaining arguments into a list.
    pub fn bind_parameters(
        outer: &Rc<Environment>,
        parameters: &ClosureParameters,
        args: &[MalObject],
    ) -> Result<Rc<Environment>, BadArgCount> {
        parameters.arity().validate_for(args.len(), "closure")?;
        let env = Environment::spawn_from(outer);

        let (positional, rest) = args.split_at(parameters.positional.len());
        for (key, value) in parameters.positional.iter().zip(positional) {
            env.set(key.clone(), value.clone());
        }
        if let Some(rest_key) = &parameters.others {
            env.set(rest_key.clone(), MalObject::wrap_list(rest.to_vec()));
        }
        Ok(env)
    }
}

const PRELUDE: &str = include_str!("prelude.mal");

/// The root environment: core functions, an empty `*ARGV*` and the prelude.
pub fn repl_env() -> evaluator::Result<Rc<Environment>> {
    let env = Rc::new(Environment::default());
    core::install(&env);
    env.set("*ARGV*".into(), MalObject::new_list());
    read_prelude(&env)?;
    Ok(env)
}

pub fn read_prelude(env: &Rc<Environment>) -> evaluator::Result<()> {
    let source = format!("(do {}\nnil)", PRELUDE);
    let ast = crate::reader::read_str(&source).map_err(evaluator::Error::ReadError)?;
    evaluator::evaluate(&ast, env)?;
    log::debug!("prelude loaded");
    Ok(())
}
