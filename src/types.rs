use crate::environment::Environment;
use crate::evaluator;
use derive_more::{Deref, Display};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;

use std::fmt::Formatter;
use std::ops::{RangeFrom, RangeInclusive};
use std::rc::Rc;
use std::{fmt, rc};

#[derive(Deref, Debug)]
pub struct MalList(pub Vec<MalObject>);
#[derive(Deref, Debug)]
pub struct MalVector(pub Vec<MalObject>);

#[derive(Deref, Debug, Clone)]
pub struct MalMap(pub HashMap<HashKey, MalObject>);
pub type MalInt = isize;
pub type MalFloat = f64;

#[derive(Deref, Display, Debug, PartialEq, Eq, Hash, Clone)]
pub struct MalSymbol(pub String);

impl AsRef<str> for MalSymbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MalSymbol {
    fn from(name: &str) -> Self {
        Self(name.into())
    }
}

#[derive(Debug, Clone)]
pub enum Arity {
    Between(RangeInclusive<usize>),
    AtLeast(RangeFrom<usize>),
}

#[derive(Debug)]
pub struct BadArgCount {
    name: &'static str,
    expected: Arity,
    got: usize,
}

impl fmt::Display for BadArgCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "When evaluating {} expected {} arguments, but received {} arguments",
            self.name, self.expected, self.got
        )
    }
}

impl Arity {
    pub(crate) const fn exactly(n: usize) -> Self {
        Self::Between(n..=n)
    }

    pub(crate) const fn at_least(n: usize) -> Self {
        Self::AtLeast(n..)
    }

    pub(crate) fn contains(&self, n: usize) -> bool {
        match self {
            Self::Between(range) => range.contains(&n),
            Self::AtLeast(range) => range.contains(&n),
        }
    }

    pub(crate) fn validate_for(&self, n: usize, name: &'static str) -> Result<(), BadArgCount> {
        match self.contains(n) {
            true => Ok(()),
            false => Err(BadArgCount {
                name,
                expected: self.clone(),
                got: n,
            }),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Between(r) => {
                if r.start() == r.end() {
                    write!(f, "exactly {}", r.start())
                } else {
                    write!(f, "from {} to {}", r.start(), r.end())
                }
            }
            Arity::AtLeast(r) => write!(f, "at least {}", r.start),
        }
    }
}

/// A native function which only needs its (already evaluated) arguments.
pub struct PrimitiveFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&[MalObject]) -> evaluator::Result,
}

impl fmt::Debug for PrimitiveFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primitive function #<{}>", self.name)
    }
}

/// A native function which re-enters the evaluator, so it also needs the
/// environment it was installed into.
pub struct RootedFn {
    pub name: &'static str,
    pub arity: Arity,
    pub fn_ptr: fn(&[MalObject], &Rc<Environment>) -> evaluator::Result,
}

// Weak so that the root environment doesn't own itself.
#[derive(Clone)]
pub struct RootedPrimitive {
    pub func: &'static RootedFn,
    pub env: rc::Weak<Environment>,
}

impl fmt::Debug for RootedPrimitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "rooted primitive function #<{}>", self.func.name)
    }
}

#[derive(Clone, Debug)]
pub struct ClosureParameters {
    pub positional: Vec<MalSymbol>,
    pub others: Option<MalSymbol>,
}

impl fmt::Display for ClosureParameters {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.positional.iter().join(" "))?;
        if let Some(rest) = &self.others {
            if !self.positional.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "& {}", rest)?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum BadClosureParameters {
    TooManyAmpersands(usize),
    TooShortForAmpersand,
    AmpersandPositionNotPenultimate,
}

pub const VARIADIC_MARKER: &str = "&";

impl ClosureParameters {
    pub fn new(mut symbols: Vec<MalSymbol>) -> Result<Self, BadClosureParameters> {
        let is_ampersand = |s: &&MalSymbol| s.as_str() == VARIADIC_MARKER;
        let ampersand_count = symbols.iter().filter(is_ampersand).count();

        match ampersand_count {
            0 => Ok(ClosureParameters {
                positional: symbols,
                others: None,
            }),
            1 => {
                if symbols.len() < 2 {
                    return Err(BadClosureParameters::TooShortForAmpersand);
                }
                match is_ampersand(&&symbols[symbols.len() - 2]) {
                    false => Err(BadClosureParameters::AmpersandPositionNotPenultimate),
                    true => {
                        let variadic_name = symbols.pop();
                        let _ampersand = symbols.pop();
                        Ok(ClosureParameters {
                            positional: symbols,
                            others: variadic_name,
                        })
                    }
                }
            }
            _ => Err(BadClosureParameters::TooManyAmpersands(ampersand_count)),
        }
    }

    pub fn arity(&self) -> Arity {
        match self.others {
            None => Arity::exactly(self.positional.len()),
            Some(_) => Arity::at_least(self.positional.len()),
        }
    }
}

#[derive(Clone)]
pub struct Closure {
    pub parameters: ClosureParameters,
    pub body: MalObject,
    pub parent: Rc<Environment>,
    pub is_macro: bool,
}

impl fmt::Debug for Closure {
    // Not derived because we want to skip the parent: the parent may well contain this Closure!
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Closure{{parameters: {:?}, body: {:?}, is_macro: {:?}}}",
            self.parameters, self.body, self.is_macro
        )
    }
}

impl fmt::Display for Closure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let head = if self.is_macro { "macro" } else { "fn*" };
        write!(f, "({} ({}) {})", head, self.parameters, self.body)
    }
}

/// The only mutable value. Cloning an `Atom` clones the handle, never the
/// payload, and two atoms are equal only if they are the same cell.
#[derive(Debug, Clone)]
pub struct Atom {
    payload: Rc<RefCell<MalObject>>,
}

impl Atom {
    pub(crate) fn new(obj: &MalObject) -> Self {
        Self {
            payload: Rc::new(RefCell::new(obj.clone())),
        }
    }

    pub(crate) fn clone_payload(&self) -> MalObject {
        self.payload.borrow().clone()
    }

    pub(crate) fn replace(&self, obj: &MalObject) {
        self.payload.replace(obj.clone());
    }

    pub(crate) fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.payload, &other.payload)
    }
}

#[derive(Debug, Clone)]
pub enum MalObject {
    Nil,
    Integer(MalInt),
    Float(MalFloat),
    Bool(bool),
    String(String),
    Symbol(MalSymbol),
    Keyword(String),
    List(Rc<MalList>),
    Vector(Rc<MalVector>),
    Map(Rc<MalMap>),
    Primitive(&'static PrimitiveFn),
    Rooted(RootedPrimitive),
    Closure(Rc<Closure>),
    Atom(Atom),
}

/// Everything except `nil` and `false` counts as true.
pub(crate) fn truthy(obj: &MalObject) -> bool {
    !matches!(obj, MalObject::Nil | MalObject::Bool(false))
}

pub(crate) fn callable(obj: &MalObject) -> bool {
    matches!(
        obj,
        MalObject::Primitive(_) | MalObject::Rooted(_) | MalObject::Closure(_)
    )
}

#[derive(Debug)]
pub enum TypeMismatch {
    NotANumber,
    NotAnInt,
    NotAList,
    NotASequence,
    NotASymbol,
    NotAString,
    NotAnAtom,
    NotAMap,
    NotAValidKey,
    NotIntoKeyword,
    NotCallable,
    NotAClosure,
}

/// A number pulled out of a `MalObject` for arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(MalInt),
    Float(MalFloat),
}

impl Number {
    pub(crate) fn as_float(self) -> MalFloat {
        match self {
            Number::Int(x) => x as MalFloat,
            Number::Float(x) => x,
        }
    }
}

impl From<Number> for MalObject {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(x) => MalObject::Integer(x),
            Number::Float(x) => MalObject::Float(x),
        }
    }
}

// Borrow the payload of one variant, or report which kind was expected.
macro_rules! accessor {
    ($name:ident, $variant:ident, $target:ty, $mismatch:ident) => {
        pub(crate) fn $name(&self) -> Result<&$target, TypeMismatch> {
            match self {
                MalObject::$variant(x) => Ok(x),
                _ => Err(TypeMismatch::$mismatch),
            }
        }
    };
}

impl MalObject {
    accessor!(as_list, List, MalList, NotAList);
    accessor!(as_symbol, Symbol, MalSymbol, NotASymbol);
    accessor!(as_string, String, str, NotAString);
    accessor!(as_atom, Atom, Atom, NotAnAtom);
    accessor!(as_map, Map, MalMap, NotAMap);
    accessor!(as_closure, Closure, Closure, NotAClosure);

    pub(crate) fn as_int(&self) -> Result<MalInt, TypeMismatch> {
        match *self {
            MalObject::Integer(x) => Ok(x),
            _ => Err(TypeMismatch::NotAnInt),
        }
    }

    pub(crate) fn as_number(&self) -> Result<Number, TypeMismatch> {
        match *self {
            MalObject::Integer(x) => Ok(Number::Int(x)),
            MalObject::Float(x) => Ok(Number::Float(x)),
            _ => Err(TypeMismatch::NotANumber),
        }
    }

    /// Lists and vectors alike.
    pub(crate) fn as_seq(&self) -> Result<&[MalObject], TypeMismatch> {
        match self {
            MalObject::List(x) => Ok(x),
            MalObject::Vector(x) => Ok(x),
            _ => Err(TypeMismatch::NotASequence),
        }
    }

    pub(crate) fn as_hashkey(&self) -> Result<HashKey, TypeMismatch> {
        match self {
            MalObject::String(s) => Ok(HashKey::String(s.clone())),
            MalObject::Keyword(s) => Ok(HashKey::Keyword(s.clone())),
            _ => Err(TypeMismatch::NotAValidKey),
        }
    }

    pub(crate) fn is_nil(&self) -> bool {
        matches!(self, MalObject::Nil)
    }

    pub(crate) fn is_list(&self) -> bool {
        matches!(self, MalObject::List(_))
    }

    pub(crate) fn is_vector(&self) -> bool {
        matches!(self, MalObject::Vector(_))
    }

    pub(crate) fn is_macro(&self) -> bool {
        matches!(self, MalObject::Closure(c) if c.is_macro)
    }

    /// True for a list whose first element is the symbol `name`.
    pub fn begins_with(&self, name: &str) -> bool {
        match self {
            MalObject::List(list) => {
                matches!(list.first(), Some(MalObject::Symbol(s)) if s.as_str() == name)
            }
            _ => false,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum HashKey {
    String(String),
    Keyword(String),
}

impl HashKey {
    pub(crate) fn into_mal_object(&self) -> MalObject {
        match self {
            HashKey::String(s) => MalObject::String(s.clone()),
            HashKey::Keyword(s) => MalObject::Keyword(s.clone()),
        }
    }
}

#[derive(Debug)]
pub enum MapError {
    MissingValue,
    UnhashableKey,
}

pub(crate) fn build_map(entries: Vec<MalObject>) -> Result<MalObject, MapError> {
    if entries.len() % 2 == 1 {
        return Err(MapError::MissingValue);
    }
    let mut map = HashMap::new();
    for (key, value) in entries.into_iter().tuples() {
        let key = key.as_hashkey().map_err(|_| MapError::UnhashableKey)?;
        map.insert(key, value);
    }
    Ok(MalObject::wrap_map(map))
}

impl MalObject {
    pub fn new_list() -> Self {
        Self::List(Rc::new(MalList(Vec::new())))
    }
    pub fn wrap_list(elements: Vec<MalObject>) -> Self {
        Self::List(Rc::new(MalList(elements)))
    }
    pub fn wrap_vector(elements: Vec<MalObject>) -> Self {
        Self::Vector(Rc::new(MalVector(elements)))
    }
    pub fn wrap_map(map: HashMap<HashKey, MalObject>) -> Self {
        Self::Map(Rc::new(MalMap(map)))
    }
    pub fn new_symbol(name: &str) -> Self {
        Self::Symbol(MalSymbol::from(name))
    }
    pub fn new_keyword(name: &str) -> Self {
        Self::Keyword(String::from(name))
    }
    /// `(quote obj)`
    pub(crate) fn quoted(obj: MalObject) -> Self {
        Self::wrap_list(vec![Self::new_symbol("quote"), obj])
    }
}

/// A new list with `head` in front of the elements of `tail`.
pub(crate) fn cons(head: &MalObject, tail: &[MalObject]) -> MalObject {
    let mut elements = Vec::with_capacity(tail.len() + 1);
    elements.push(head.clone());
    elements.extend_from_slice(tail);
    MalObject::wrap_list(elements)
}

/// A new list holding the elements of each sequence in turn.
pub(crate) fn concat<'a>(seqs: impl IntoIterator<Item = &'a [MalObject]>) -> MalObject {
    MalObject::wrap_list(seqs.into_iter().flatten().cloned().collect())
}

impl PartialEq for MalObject {
    fn eq(&self, other: &Self) -> bool {
        use MalObject::*;
        if let (Ok(x), Ok(y)) = (self.as_seq(), other.as_seq()) {
            return equal_sequences(x, y);
        }
        match (self, other) {
            (Integer(x), Integer(y)) => x == y,
            (Float(x), Float(y)) => x == y,
            (Integer(x), Float(y)) | (Float(y), Integer(x)) => (*x as MalFloat) == *y,
            (Bool(x), Bool(y)) => x == y,
            (String(x), String(y)) => x == y,
            (Keyword(x), Keyword(y)) => x == y,
            (Symbol(x), Symbol(y)) => x == y,
            (Map(x), Map(y)) => equal_maps(x, y),
            (Nil, Nil) => true,
            (Atom(x), Atom(y)) => x.ptr_eq(y),
            (Closure(x), Closure(y)) => Rc::ptr_eq(x, y),
            (Primitive(x), Primitive(y)) => std::ptr::eq(*x, *y),
            (Rooted(x), Rooted(y)) => std::ptr::eq(x.func, y.func) && x.env.ptr_eq(&y.env),
            (_, _) => false,
        }
    }
}

fn equal_sequences(xs: &[MalObject], ys: &[MalObject]) -> bool {
    xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x == y)
}

fn equal_maps(xs: &MalMap, ys: &MalMap) -> bool {
    xs.len() == ys.len()
        && xs
            .iter()
            .all(|(key, x)| ys.get(key).map_or(false, |y| x == y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(xs: &[MalInt]) -> Vec<MalObject> {
        xs.iter().copied().map(MalObject::Integer).collect()
    }

    #[test]
    fn list_and_vector_compare_by_elements() {
        let list = MalObject::wrap_list(ints(&[1, 2]));
        let vector = MalObject::wrap_vector(ints(&[1, 2]));
        assert_eq!(list, vector);
        assert_ne!(list, MalObject::wrap_vector(ints(&[1, 2, 3])));
    }

    #[test]
    fn nil_is_only_nil() {
        assert_eq!(MalObject::Nil, MalObject::Nil);
        assert_ne!(MalObject::Nil, MalObject::Bool(false));
        assert_ne!(MalObject::Nil, MalObject::new_list());
    }

    #[test]
    fn atoms_compare_by_identity() {
        let a = Atom::new(&MalObject::Integer(1));
        let b = Atom::new(&MalObject::Integer(1));
        assert_ne!(MalObject::Atom(a.clone()), MalObject::Atom(b));
        assert_eq!(MalObject::Atom(a.clone()), MalObject::Atom(a.clone()));

        let handle = a.clone();
        handle.replace(&MalObject::Integer(7));
        assert_eq!(a.clone_payload(), MalObject::Integer(7));
    }

    #[test]
    fn symbols_and_keywords_are_distinct() {
        assert_eq!(MalObject::new_symbol("a"), MalObject::new_symbol("a"));
        assert_ne!(MalObject::new_symbol("a"), MalObject::new_keyword("a"));
        assert_ne!(MalObject::new_symbol("a"), MalObject::String("a".into()));
    }

    #[test]
    fn numbers_compare_across_representations() {
        assert_eq!(MalObject::Integer(2), MalObject::Float(2.0));
        assert_ne!(MalObject::Integer(2), MalObject::Float(2.5));
    }

    #[test]
    fn maps_compare_structurally() {
        let build = |v| {
            build_map(vec![MalObject::new_keyword("a"), MalObject::Integer(v)]).unwrap()
        };
        assert_eq!(build(1), build(1));
        assert_ne!(build(1), build(2));
    }

    #[test]
    fn begins_with_checks_head_symbol() {
        let form = MalObject::wrap_list(vec![MalObject::new_symbol("unquote"), MalObject::Nil]);
        assert!(form.begins_with("unquote"));
        assert!(!form.begins_with("quote"));
        assert!(!MalObject::new_list().begins_with("unquote"));
        assert!(!MalObject::new_symbol("unquote").begins_with("unquote"));
    }

    #[test]
    fn variadic_parameters_must_be_penultimate() {
        let symbols = |names: &[&str]| -> Vec<MalSymbol> {
            names.iter().map(|&n| MalSymbol::from(n)).collect()
        };
        let params = ClosureParameters::new(symbols(&["a", "&", "rest"])).unwrap();
        assert_eq!(params.positional, vec![MalSymbol::from("a")]);
        assert_eq!(params.others, Some(MalSymbol::from("rest")));
        assert!(params.arity().contains(5));
        assert!(!params.arity().contains(0));

        assert!(matches!(
            ClosureParameters::new(symbols(&["&", "a", "b"])),
            Err(BadClosureParameters::AmpersandPositionNotPenultimate)
        ));
        assert!(matches!(
            ClosureParameters::new(symbols(&["&"])),
            Err(BadClosureParameters::TooShortForAmpersand)
        ));
        assert!(matches!(
            ClosureParameters::new(symbols(&["&", "&"])),
            Err(BadClosureParameters::TooManyAmpersands(2))
        ));
    }
}
