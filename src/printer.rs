use crate::strings;
use crate::types::{HashKey, MalFloat, MalObject};
use itertools::Itertools;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintMode {
    /// Strings quoted and escaped, so the output reads back in as the same value.
    ReadableRepresentation,
    /// Strings as their raw contents.
    Directly,
}

pub fn pr_str(object: &MalObject, mode: PrintMode) -> String {
    let seq = |elements: &[MalObject]| elements.iter().map(|x| pr_str(x, mode)).join(" ");
    match object {
        MalObject::Nil => String::from("nil"),
        MalObject::Integer(value) => value.to_string(),
        MalObject::Float(value) => float_repr(*value),
        MalObject::Bool(value) => value.to_string(),
        MalObject::String(s) => match mode {
            PrintMode::ReadableRepresentation => strings::string_repr(s),
            PrintMode::Directly => s.clone(),
        },
        MalObject::Symbol(name) => name.to_string(),
        MalObject::Keyword(name) => format!(":{}", name),
        MalObject::List(elements) => format!("({})", seq(elements)),
        MalObject::Vector(elements) => format!("[{}]", seq(elements)),
        MalObject::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(key, value)| format!("{} {}", key_repr(key, mode), pr_str(value, mode)))
                .join(" ")
        ),
        MalObject::Primitive(f) => format!("#<builtin {}>", f.name),
        MalObject::Rooted(f) => format!("#<builtin {}>", f.func.name),
        MalObject::Closure(c) if c.is_macro => String::from("#<macro>"),
        MalObject::Closure(_) => String::from("#<function>"),
        MalObject::Atom(a) => format!("(atom {})", pr_str(&a.clone_payload(), mode)),
    }
}

fn key_repr(key: &HashKey, mode: PrintMode) -> String {
    pr_str(&key.into_mal_object(), mode)
}

// Always keep a decimal point or exponent so the text reads back as a float.
fn float_repr(value: MalFloat) -> String {
    let text = format!("{:?}", value);
    if value.is_finite() && !text.contains(|c: char| c == '.' || c == 'e' || c == 'E') {
        format!("{}.0", text)
    } else {
        text
    }
}

impl fmt::Display for MalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", pr_str(self, PrintMode::ReadableRepresentation))
    }
}
