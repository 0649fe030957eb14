//! Rewrites `quasiquote` templates into plain `cons`/`concat` construction
//! code, so that evaluating the result rebuilds the template with the
//! unquoted parts filled in.

use crate::types::{Arity, BadArgCount, MalObject};

pub fn quasiquote(ast: &MalObject) -> Result<MalObject, BadArgCount> {
    match ast {
        MalObject::List(list) if ast.begins_with("unquote") => {
            Arity::exactly(2).validate_for(list.len(), "unquote")?;
            Ok(list[1].clone())
        }
        MalObject::List(list) => quasiquote_elements(list),
        MalObject::Vector(vec) => Ok(MalObject::wrap_list(vec![
            MalObject::new_symbol("vec"),
            quasiquote_elements(vec)?,
        ])),
        MalObject::Symbol(_) | MalObject::Map(_) => Ok(MalObject::quoted(ast.clone())),
        _ => Ok(ast.clone()),
    }
}

// Folding from the right means each step only ever prepends.
fn quasiquote_elements(elements: &[MalObject]) -> Result<MalObject, BadArgCount> {
    let mut result = MalObject::new_list();
    for element in elements.iter().rev() {
        result = match element {
            MalObject::List(inner) if element.begins_with("splice-unquote") => {
                Arity::exactly(2).validate_for(inner.len(), "splice-unquote")?;
                MalObject::wrap_list(vec![
                    MalObject::new_symbol("concat"),
                    inner[1].clone(),
                    result,
                ])
            }
            _ => MalObject::wrap_list(vec![
                MalObject::new_symbol("cons"),
                quasiquote(element)?,
                result,
            ]),
        };
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn expand(src: &str) -> String {
        quasiquote(&read_str(src).unwrap()).unwrap().to_string()
    }

    #[test]
    fn self_evaluating_forms_pass_through() {
        assert_eq!(expand("7"), "7");
        assert_eq!(expand("\"s\""), "\"s\"");
        assert_eq!(expand(":k"), ":k");
        assert_eq!(expand("nil"), "nil");
    }

    #[test]
    fn symbols_are_quoted() {
        assert_eq!(expand("a"), "(quote a)");
    }

    #[test]
    fn unquote_is_returned_unevaluated() {
        assert_eq!(expand("(unquote (+ 1 2))"), "(+ 1 2)");
    }

    #[test]
    fn lists_become_cons_chains() {
        assert_eq!(expand("(1 (unquote a) 3)"), "(cons 1 (cons a (cons 3 ())))");
        assert_eq!(expand("()"), "()");
    }

    #[test]
    fn splice_unquote_becomes_concat() {
        assert_eq!(
            expand("(1 (splice-unquote xs) 4)"),
            "(cons 1 (concat xs (cons 4 ())))"
        );
    }

    #[test]
    fn vectors_are_rebuilt_with_vec() {
        assert_eq!(expand("[a]"), "(vec (cons (quote a) ()))");
    }

    #[test]
    fn bare_unquote_is_an_arity_error() {
        assert!(quasiquote(&read_str("(unquote)").unwrap()).is_err());
    }
}
