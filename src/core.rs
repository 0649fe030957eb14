use crate::environment::Environment;
use crate::printer::{self, PrintMode};
use crate::types::{
    self, callable, Arity, Atom, HashKey, MalFloat, MalInt, MalObject, Number, PrimitiveFn,
    RootedFn, RootedPrimitive, TypeMismatch,
};
use crate::{evaluator, reader};
use itertools::Itertools;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs::read_to_string;
use std::rc::Rc;

fn grab_numbers(args: &[MalObject]) -> evaluator::Result<Vec<Number>> {
    let type_check: Result<Vec<_>, _> = args.iter().map(MalObject::as_number).collect();
    type_check.map_err(evaluator::Error::TypeMismatch)
}

// Integers stay integers; anything involving a float becomes a float.
fn combine(
    x: Number,
    y: Number,
    int_op: fn(MalInt, MalInt) -> MalInt,
    float_op: fn(MalFloat, MalFloat) -> MalFloat,
) -> Number {
    match (x, y) {
        (Number::Int(x), Number::Int(y)) => Number::Int(int_op(x, y)),
        (x, y) => Number::Float(float_op(x.as_float(), y.as_float())),
    }
}

static SUM: PrimitiveFn = PrimitiveFn {
    name: "+",
    fn_ptr: sum_,
    arity: Arity::at_least(0),
};

fn sum_(args: &[MalObject]) -> evaluator::Result {
    let value = grab_numbers(args)?
        .into_iter()
        .fold(Number::Int(0), |acc, x| {
            combine(acc, x, MalInt::wrapping_add, |x, y| x + y)
        });
    Ok(value.into())
}

static SUB: PrimitiveFn = PrimitiveFn {
    name: "-",
    fn_ptr: sub_,
    arity: Arity::at_least(1),
};

fn sub_(args: &[MalObject]) -> evaluator::Result {
    let subtract = |x, y| combine(x, y, MalInt::wrapping_sub, |x, y| x - y);
    let value = match grab_numbers(args)?.as_slice() {
        [x] => subtract(Number::Int(0), *x),
        [first, rest @ ..] => rest.iter().copied().fold(*first, subtract),
        [] => Number::Int(0),
    };
    Ok(value.into())
}

static MUL: PrimitiveFn = PrimitiveFn {
    name: "*",
    fn_ptr: mul_,
    arity: Arity::at_least(0),
};

fn mul_(args: &[MalObject]) -> evaluator::Result {
    let value = grab_numbers(args)?
        .into_iter()
        .fold(Number::Int(1), |acc, x| {
            combine(acc, x, MalInt::wrapping_mul, |x, y| x * y)
        });
    Ok(value.into())
}

static DIV: PrimitiveFn = PrimitiveFn {
    name: "/",
    fn_ptr: div_,
    arity: Arity::at_least(1),
};

fn divide(x: Number, y: Number) -> evaluator::Result<Number> {
    match (x, y) {
        (Number::Int(_), Number::Int(0)) => Err(evaluator::Error::DivideByZero),
        (Number::Int(x), Number::Int(y)) => Ok(Number::Int(x.wrapping_div(y))),
        (x, y) => Ok(Number::Float(x.as_float() / y.as_float())),
    }
}

fn div_(args: &[MalObject]) -> evaluator::Result {
    let value = match grab_numbers(args)?.as_slice() {
        [x] => divide(Number::Int(1), *x)?,
        [first, rest @ ..] => rest
            .iter()
            .try_fold(*first, |acc, &x| divide(acc, x))?,
        [] => Number::Int(1),
    };
    Ok(value.into())
}

fn comparison_(
    args: &[MalObject],
    int_comp: fn(&MalInt, &MalInt) -> bool,
    float_comp: fn(&MalFloat, &MalFloat) -> bool,
) -> evaluator::Result {
    let result = match (args[0].as_number()?, args[1].as_number()?) {
        (Number::Int(x), Number::Int(y)) => int_comp(&x, &y),
        (x, y) => float_comp(&x.as_float(), &y.as_float()),
    };
    Ok(MalObject::Bool(result))
}

// Each comparison borrows the matching PartialOrd method for both number types.
macro_rules! comparison_primitive {
    ($SYMBOL:tt, $NAME:ident) => {
        paste::item! {
            static $NAME: PrimitiveFn = PrimitiveFn {
                name: stringify!($SYMBOL),
                fn_ptr: |args: &[MalObject]| {
                    comparison_(args, MalInt:: [<$NAME:lower>], MalFloat:: [<$NAME:lower>])
                },
                arity: Arity::exactly(2),
            };
        }
    };
}

comparison_primitive!(<, LT);
comparison_primitive!(<=, LE);
comparison_primitive!(>, GT);
comparison_primitive!(>=, GE);

static EQUAL: PrimitiveFn = PrimitiveFn {
    name: "=",
    fn_ptr: equal,
    arity: Arity::exactly(2),
};

fn equal(args: &[MalObject]) -> evaluator::Result {
    Ok(MalObject::Bool(args[0] == args[1]))
}

static LIST: PrimitiveFn = PrimitiveFn {
    name: "list",
    fn_ptr: |args| Ok(MalObject::wrap_list(args.to_vec())),
    arity: Arity::at_least(0),
};

static LIST_TEST: PrimitiveFn = PrimitiveFn {
    name: "list?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].is_list())),
    arity: Arity::exactly(1),
};

static VECTOR: PrimitiveFn = PrimitiveFn {
    name: "vector",
    fn_ptr: |args| Ok(MalObject::wrap_vector(args.to_vec())),
    arity: Arity::at_least(0),
};

static VECTOR_TEST: PrimitiveFn = PrimitiveFn {
    name: "vector?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].is_vector())),
    arity: Arity::exactly(1),
};

static VEC: PrimitiveFn = PrimitiveFn {
    name: "vec",
    fn_ptr: vec_,
    arity: Arity::exactly(1),
};

fn vec_(args: &[MalObject]) -> evaluator::Result {
    match &args[0] {
        MalObject::Vector(_) => Ok(args[0].clone()),
        MalObject::Nil => Ok(MalObject::wrap_vector(Vec::new())),
        other => Ok(MalObject::wrap_vector(other.as_seq()?.to_vec())),
    }
}

static SEQUENTIAL_TEST: PrimitiveFn = PrimitiveFn {
    name: "sequential?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_seq().is_ok())),
    arity: Arity::exactly(1),
};

static EMPTY_TEST: PrimitiveFn = PrimitiveFn {
    name: "empty?",
    fn_ptr: empty_test_,
    arity: Arity::exactly(1),
};

fn empty_test_(args: &[MalObject]) -> evaluator::Result {
    if args[0].is_nil() {
        return Ok(MalObject::Bool(true));
    }
    let seq = args[0].as_seq()?;
    Ok(MalObject::Bool(seq.is_empty()))
}

static COUNT: PrimitiveFn = PrimitiveFn {
    name: "count",
    fn_ptr: count_,
    arity: Arity::exactly(1),
};

fn count_(args: &[MalObject]) -> evaluator::Result {
    let count = match &args[0] {
        MalObject::Nil => 0,
        other => other.as_seq()?.len(),
    };
    Ok(MalObject::Integer(count as MalInt))
}

static CONS: PrimitiveFn = PrimitiveFn {
    name: "cons",
    fn_ptr: cons_,
    arity: Arity::exactly(2),
};

fn cons_(args: &[MalObject]) -> evaluator::Result {
    let tail: &[MalObject] = match &args[1] {
        MalObject::Nil => &[],
        other => other.as_seq()?,
    };
    Ok(types::cons(&args[0], tail))
}

static CONCAT: PrimitiveFn = PrimitiveFn {
    name: "concat",
    fn_ptr: concat_,
    arity: Arity::at_least(0),
};

fn concat_(args: &[MalObject]) -> evaluator::Result {
    let seqs: Result<Vec<&[MalObject]>, _> = args
        .iter()
        .filter(|arg| !arg.is_nil())
        .map(MalObject::as_seq)
        .collect();
    Ok(types::concat(seqs?))
}

static NTH: PrimitiveFn = PrimitiveFn {
    name: "nth",
    fn_ptr: nth_,
    arity: Arity::exactly(2),
};

fn nth_(args: &[MalObject]) -> evaluator::Result {
    let seq = args[0].as_seq()?;
    let orig_index = args[1].as_int()?;
    nth_internal(seq, orig_index)
}

fn nth_internal(seq: &[MalObject], orig_index: MalInt) -> evaluator::Result {
    let value = usize::try_from(orig_index)
        .ok()
        .and_then(|index| seq.get(index))
        .cloned();
    value.ok_or_else(|| evaluator::Error::BadIndex(orig_index, 0..seq.len()))
}

static FIRST: PrimitiveFn = PrimitiveFn {
    name: "first",
    fn_ptr: first_,
    arity: Arity::exactly(1),
};

fn first_(args: &[MalObject]) -> evaluator::Result {
    if args[0].is_nil() {
        return Ok(MalObject::Nil);
    }
    let seq = args[0].as_seq()?;
    Ok(seq.first().cloned().unwrap_or(MalObject::Nil))
}

static REST: PrimitiveFn = PrimitiveFn {
    name: "rest",
    fn_ptr: rest_,
    arity: Arity::exactly(1),
};

fn rest_(args: &[MalObject]) -> evaluator::Result {
    if args[0].is_nil() {
        return Ok(MalObject::new_list());
    }
    let seq = args[0].as_seq()?;
    Ok(MalObject::wrap_list(seq.iter().skip(1).cloned().collect()))
}

fn print_string_internal(
    args: &[MalObject],
    mode: PrintMode,
    sep: &'static str,
    to_screen: bool,
) -> evaluator::Result {
    let text = args.iter().map(|arg| printer::pr_str(arg, mode)).join(sep);
    if to_screen {
        println!("{}", text);
        Ok(MalObject::Nil)
    } else {
        Ok(MalObject::String(text))
    }
}

static PR_STR: PrimitiveFn = PrimitiveFn {
    name: "pr-str",
    fn_ptr: |args| print_string_internal(args, PrintMode::ReadableRepresentation, " ", false),
    arity: Arity::at_least(0),
};

static STR: PrimitiveFn = PrimitiveFn {
    name: "str",
    fn_ptr: |args| print_string_internal(args, PrintMode::Directly, "", false),
    arity: Arity::at_least(0),
};

static PRN: PrimitiveFn = PrimitiveFn {
    name: "prn",
    fn_ptr: |args| print_string_internal(args, PrintMode::ReadableRepresentation, " ", true),
    arity: Arity::at_least(0),
};

static PRINTLN: PrimitiveFn = PrimitiveFn {
    name: "println",
    fn_ptr: |args| print_string_internal(args, PrintMode::Directly, " ", true),
    arity: Arity::at_least(0),
};

static READ_STRING: PrimitiveFn = PrimitiveFn {
    name: "read-string",
    fn_ptr: read_string_,
    arity: Arity::exactly(1),
};

fn read_string_(args: &[MalObject]) -> evaluator::Result {
    let string = args[0].as_string()?;
    match reader::read_str(string) {
        Err(reader::Error::NothingToRead) => Ok(MalObject::Nil),
        result => result.map_err(evaluator::Error::ReadError),
    }
}

static SLURP: PrimitiveFn = PrimitiveFn {
    name: "slurp",
    fn_ptr: slurp_,
    arity: Arity::exactly(1),
};

fn slurp_(args: &[MalObject]) -> evaluator::Result {
    let path = args[0].as_string()?;
    log::info!("slurp {}", path);
    let contents = read_to_string(path)?;
    Ok(MalObject::String(contents))
}

static ATOM: PrimitiveFn = PrimitiveFn {
    name: "atom",
    fn_ptr: |args| Ok(MalObject::Atom(Atom::new(&args[0]))),
    arity: Arity::exactly(1),
};

static ATOM_TEST: PrimitiveFn = PrimitiveFn {
    name: "atom?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_atom().is_ok())),
    arity: Arity::exactly(1),
};

static DEREF: PrimitiveFn = PrimitiveFn {
    name: "deref",
    fn_ptr: deref_,
    arity: Arity::exactly(1),
};

fn deref_(args: &[MalObject]) -> evaluator::Result {
    Ok(args[0].as_atom()?.clone_payload())
}

static RESET: PrimitiveFn = PrimitiveFn {
    name: "reset!",
    fn_ptr: reset_,
    arity: Arity::exactly(2),
};

fn reset_(args: &[MalObject]) -> evaluator::Result {
    let atom = args[0].as_atom()?;
    atom.replace(&args[1]);
    Ok(args[1].clone())
}

static HASH_MAP: PrimitiveFn = PrimitiveFn {
    name: "hash-map",
    fn_ptr: |args| types::build_map(args.to_vec()).map_err(evaluator::Error::Map),
    arity: Arity::at_least(0),
};

static ASSOC: PrimitiveFn = PrimitiveFn {
    name: "assoc",
    fn_ptr: assoc_,
    arity: Arity::at_least(1),
};

fn assoc_(args: &[MalObject]) -> evaluator::Result {
    let mut map = args[0].as_map()?.0.clone();
    let additions = types::build_map(args[1..].to_vec()).map_err(evaluator::Error::Map)?;
    map.extend(additions.as_map()?.0.clone());
    Ok(MalObject::wrap_map(map))
}

static DISSOC: PrimitiveFn = PrimitiveFn {
    name: "dissoc",
    fn_ptr: dissoc_,
    arity: Arity::at_least(1),
};

fn dissoc_(args: &[MalObject]) -> evaluator::Result {
    let mut map = args[0].as_map()?.0.clone();
    for arg in &args[1..] {
        map.remove(&arg.as_hashkey()?);
    }
    Ok(MalObject::wrap_map(map))
}

static GET: PrimitiveFn = PrimitiveFn {
    name: "get",
    fn_ptr: get_,
    arity: Arity::exactly(2),
};

fn get_(args: &[MalObject]) -> evaluator::Result {
    if args[0].is_nil() {
        return Ok(MalObject::Nil);
    }
    let map = args[0].as_map()?;
    let key = args[1].as_hashkey()?;
    Ok(map.get(&key).cloned().unwrap_or(MalObject::Nil))
}

static CONTAINS: PrimitiveFn = PrimitiveFn {
    name: "contains?",
    fn_ptr: contains_,
    arity: Arity::exactly(2),
};

fn contains_(args: &[MalObject]) -> evaluator::Result {
    let map = args[0].as_map()?;
    let key = args[1].as_hashkey()?;
    Ok(MalObject::Bool(map.contains_key(&key)))
}

static KEYS: PrimitiveFn = PrimitiveFn {
    name: "keys",
    fn_ptr: |args| {
        let keys = args[0].as_map()?.keys().map(HashKey::into_mal_object).collect();
        Ok(MalObject::wrap_list(keys))
    },
    arity: Arity::exactly(1),
};

static VALS: PrimitiveFn = PrimitiveFn {
    name: "vals",
    fn_ptr: |args| Ok(MalObject::wrap_list(args[0].as_map()?.values().cloned().collect())),
    arity: Arity::exactly(1),
};

static MAP_TEST: PrimitiveFn = PrimitiveFn {
    name: "map?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_map().is_ok())),
    arity: Arity::exactly(1),
};

static SYMBOL: PrimitiveFn = PrimitiveFn {
    name: "symbol",
    fn_ptr: |args| Ok(MalObject::new_symbol(args[0].as_string()?)),
    arity: Arity::exactly(1),
};

static SYMBOL_TEST: PrimitiveFn = PrimitiveFn {
    name: "symbol?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_symbol().is_ok())),
    arity: Arity::exactly(1),
};

static KEYWORD: PrimitiveFn = PrimitiveFn {
    name: "keyword",
    fn_ptr: keyword_,
    arity: Arity::exactly(1),
};

fn keyword_(args: &[MalObject]) -> evaluator::Result {
    match &args[0] {
        MalObject::String(s) => Ok(MalObject::new_keyword(s)),
        MalObject::Keyword(_) => Ok(args[0].clone()),
        _ => Err(evaluator::Error::TypeMismatch(TypeMismatch::NotIntoKeyword)),
    }
}

static KEYWORD_TEST: PrimitiveFn = PrimitiveFn {
    name: "keyword?",
    fn_ptr: |args| Ok(MalObject::Bool(matches!(args[0], MalObject::Keyword(_)))),
    arity: Arity::exactly(1),
};

static STRING_TEST: PrimitiveFn = PrimitiveFn {
    name: "string?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_string().is_ok())),
    arity: Arity::exactly(1),
};

static NUMBER_TEST: PrimitiveFn = PrimitiveFn {
    name: "number?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].as_number().is_ok())),
    arity: Arity::exactly(1),
};

static FUNCTION_TEST: PrimitiveFn = PrimitiveFn {
    name: "fn?",
    fn_ptr: |args| Ok(MalObject::Bool(callable(&args[0]) && !args[0].is_macro())),
    arity: Arity::exactly(1),
};

static MACRO_TEST: PrimitiveFn = PrimitiveFn {
    name: "macro?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].is_macro())),
    arity: Arity::exactly(1),
};

static NIL_TEST: PrimitiveFn = PrimitiveFn {
    name: "nil?",
    fn_ptr: |args| Ok(MalObject::Bool(args[0].is_nil())),
    arity: Arity::exactly(1),
};

static TRUE_TEST: PrimitiveFn = PrimitiveFn {
    name: "true?",
    fn_ptr: |args| Ok(MalObject::Bool(matches!(args[0], MalObject::Bool(true)))),
    arity: Arity::exactly(1),
};

static FALSE_TEST: PrimitiveFn = PrimitiveFn {
    name: "false?",
    fn_ptr: |args| Ok(MalObject::Bool(matches!(args[0], MalObject::Bool(false)))),
    arity: Arity::exactly(1),
};

static THROW: PrimitiveFn = PrimitiveFn {
    name: "throw",
    fn_ptr: |args| Err(evaluator::Error::UserException(args[0].clone())),
    arity: Arity::exactly(1),
};

static EVAL: RootedFn = RootedFn {
    name: "eval",
    fn_ptr: eval_,
    arity: Arity::exactly(1),
};

fn eval_(args: &[MalObject], env: &Rc<Environment>) -> evaluator::Result {
    log::info!("Call from mal to EVAL with {}", args[0]);
    evaluator::evaluate(&args[0], env)
}

static SWAP: RootedFn = RootedFn {
    name: "swap!",
    fn_ptr: swap_,
    arity: Arity::at_least(2),
};

// (swap! a f x y) evaluates (reset! a (f (quote @a) (quote x) (quote y))).
// The operands are already values, so they are quoted to stop them being
// evaluated a second time.
fn swap_(swap_args: &[MalObject], env: &Rc<Environment>) -> evaluator::Result {
    let atom = swap_args[0].as_atom()?;
    let f = &swap_args[1];
    if !callable(f) {
        return Err(evaluator::Error::TypeMismatch(TypeMismatch::NotCallable));
    }
    let mut call = vec![f.clone(), MalObject::quoted(atom.clone_payload())];
    call.extend(swap_args[2..].iter().cloned().map(MalObject::quoted));
    let form = MalObject::wrap_list(vec![
        MalObject::new_symbol("reset!"),
        swap_args[0].clone(),
        MalObject::wrap_list(call),
    ]);
    log::trace!("swap! evaluates {}", form);
    evaluator::evaluate(&form, env)
}

type Namespace = HashMap<&'static str, &'static PrimitiveFn>;
lazy_static! {
    pub static ref CORE: Namespace = {
        let mut map = Namespace::new();
        for &func in [
            // Arithmetic
            &SUM,
            &SUB,
            &MUL,
            &DIV,
            // Comparisons
            &EQUAL,
            &GT,
            &GE,
            &LT,
            &LE,
            // Working with strings
            &PR_STR,
            &STR,
            &PRN,
            &PRINTLN,
            &READ_STRING,
            &SLURP,
            // Working with lists
            &LIST,
            &VECTOR,
            &VEC,
            &CONS,
            &CONCAT,
            &NTH,
            &FIRST,
            &REST,
            &EMPTY_TEST,
            &COUNT,
            // Working with maps
            &HASH_MAP,
            &ASSOC,
            &DISSOC,
            &GET,
            &CONTAINS,
            &KEYS,
            &VALS,
            // Working with atoms
            &ATOM,
            &DEREF,
            &RESET,
            // Casting and testing
            &NIL_TEST,
            &TRUE_TEST,
            &FALSE_TEST,
            &LIST_TEST,
            &VECTOR_TEST,
            &SEQUENTIAL_TEST,
            &ATOM_TEST,
            &SYMBOL,
            &SYMBOL_TEST,
            &KEYWORD,
            &KEYWORD_TEST,
            &MAP_TEST,
            &FUNCTION_TEST,
            &MACRO_TEST,
            &STRING_TEST,
            &NUMBER_TEST,
            // Exceptions
            &THROW,
        ].iter() {
            map.insert(func.name, func);
        }
        map
    };
}

static ROOTED: [&RootedFn; 2] = [&EVAL, &SWAP];

/// Bind every builtin into `env`.
pub(crate) fn install(env: &Rc<Environment>) {
    for (&name, &func) in CORE.iter() {
        env.set(name.into(), MalObject::Primitive(func));
    }
    for &func in ROOTED.iter() {
        let rooted = RootedPrimitive {
            func,
            env: Rc::downgrade(env),
        };
        env.set(func.name.into(), MalObject::Rooted(rooted));
    }
}
