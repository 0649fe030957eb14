use rusty_mal::environment::{repl_env, Environment};
use rusty_mal::evaluator::Error as EvalError;
use rusty_mal::interpreter::{rep, Error};
use std::rc::Rc;

fn run(env: &Rc<Environment>, lines: &[&str]) -> String {
    let mut last = String::new();
    for line in lines {
        last = rep(line, env).unwrap_or_else(|e| panic!("{} failed: {}", line, e));
    }
    last
}

fn eval_one(src: &str) -> String {
    let env = repl_env().unwrap();
    run(&env, &[src])
}

#[test]
fn scalars_evaluate_to_themselves() {
    for src in &["1", "-3", "2.5", "nil", "true", "false", ":kw", "\"text\""] {
        assert_eq!(eval_one(src), *src);
    }
}

#[test]
fn arithmetic() {
    assert_eq!(eval_one("(+ 1 2)"), "3");
    assert_eq!(eval_one("(- 5)"), "-5");
    assert_eq!(eval_one("(* 2 3 4)"), "24");
    assert_eq!(eval_one("(/ 1 2.0)"), "0.5");
    assert_eq!(eval_one("(+ 1 2.0)"), "3.0");
}

#[test]
fn let_bindings_are_sequential_and_local() {
    let env = repl_env().unwrap();
    assert_eq!(run(&env, &["(let* (a 1 b (+ a 1)) (list a b))"]), "(1 2)");
    assert!(matches!(
        rep("a", &env),
        Err(Error::Eval(EvalError::UnboundSymbol(_)))
    ));
}

#[test]
fn closures_capture_their_environment() {
    let env = repl_env().unwrap();
    let result = run(
        &env,
        &[
            "(def! make-adder (fn* (n) (fn* (x) (+ x n))))",
            "(def! add3 (make-adder 3))",
            "(add3 4)",
        ],
    );
    assert_eq!(result, "7");
    assert_eq!(run(&env, &["add3"]), "#<function>");
}

#[test]
fn closure_arity_is_strict() {
    let env = repl_env().unwrap();
    run(&env, &["(def! id (fn* (a) a))"]);
    assert!(matches!(
        rep("(id)", &env),
        Err(Error::Eval(EvalError::BadArgCount(_)))
    ));
    assert!(matches!(
        rep("(id 1 2)", &env),
        Err(Error::Eval(EvalError::BadArgCount(_)))
    ));
    assert_eq!(run(&env, &["((fn* (& xs) (count xs)) 1 2 3)"]), "3");
}

#[test]
fn tail_calls_run_in_constant_stack() {
    let env = repl_env().unwrap();
    let result = run(
        &env,
        &[
            "(def! sum-to (fn* (n acc) (if (= n 0) acc (sum-to (- n 1) (+ n acc)))))",
            "(sum-to 100000 0)",
        ],
    );
    assert_eq!(result, "5000050000");
}

#[test]
fn do_and_if() {
    assert_eq!(eval_one("(do 1 2 3)"), "3");
    assert_eq!(eval_one("(do)"), "nil");
    assert_eq!(eval_one("(if false 1)"), "nil");
    assert_eq!(eval_one("(if nil 1 2)"), "2");
    assert_eq!(eval_one("(if 0 1 2)"), "1");
    assert_eq!(eval_one("(if \"\" 1 2)"), "1");
}

#[test]
fn quasiquote_unquotes_and_splices() {
    let env = repl_env().unwrap();
    run(&env, &["(def! lst (quote (b c)))"]);
    assert_eq!(run(&env, &["`(a ~@lst d)"]), "(a b c d)");
    assert_eq!(run(&env, &["`(1 ~(+ 1 1))"]), "(1 2)");
    assert_eq!(run(&env, &["`[1 ~@lst]"]), "[1 b c]");
    assert_eq!(run(&env, &["`lst"]), "lst");
    assert_eq!(run(&env, &["(quasiquoteexpand (a ~b))"]), "(cons (quote a) (cons b ()))");
}

#[test]
fn cond_expands_one_clause_at_a_time() {
    let env = repl_env().unwrap();
    assert_eq!(
        run(&env, &["(macroexpand (cond a b c d))"]),
        "(if a b (cond c d))"
    );
    assert_eq!(run(&env, &["(cond false 1 true 2)"]), "2");
    assert_eq!(run(&env, &["(cond false 1)"]), "nil");
    assert!(matches!(
        rep("(cond true)", &env),
        Err(Error::Eval(EvalError::UserException(_)))
    ));
}

#[test]
fn user_macros_receive_unevaluated_forms() {
    let env = repl_env().unwrap();
    run(
        &env,
        &["(defmacro! unless (fn* (p a b) `(if ~p ~b ~a)))"],
    );
    assert_eq!(run(&env, &["(unless false 7 (undefined))"]), "7");
    assert_eq!(run(&env, &["(macroexpand (unless x y z))"]), "(if x z y)");
    assert_eq!(run(&env, &["(macro? unless)"]), "true");
    assert_eq!(run(&env, &["(fn? unless)"]), "false");
}

#[test]
fn equality_is_structural_for_data() {
    assert_eq!(eval_one("(= [1 2] (list 1 2))"), "true");
    assert_eq!(eval_one("(= 1 1.0)"), "true");
    assert_eq!(eval_one("(= {:a 1} {:a 1})"), "true");
    assert_eq!(eval_one("(= \"a\" :a)"), "false");
    assert_eq!(eval_one("(= (atom 1) (atom 1))"), "false");
    assert_eq!(eval_one("(let* (a (atom 1)) (= a a))"), "true");
}

#[test]
fn unbound_symbols_name_themselves() {
    let env = repl_env().unwrap();
    match rep("(undefined-thing 1)", &env) {
        Err(e) => assert_eq!(e.to_string(), "'undefined-thing' not found"),
        Ok(v) => panic!("expected an error, got {}", v),
    }
}

#[test]
fn atoms_swap_and_deref() {
    let env = repl_env().unwrap();
    let result = run(&env, &["(def! a (atom 10))", "(swap! a + 5)"]);
    assert_eq!(result, "15");
    assert_eq!(run(&env, &["(deref a)"]), "15");
    assert_eq!(run(&env, &["@a"]), "15");
    let result = run(&env, &["(reset! a (list 1 2))", "(swap! a concat (list 3))"]);
    assert_eq!(result, "(1 2 3)");
    assert_eq!(
        run(&env, &["(swap! a (fn* (xs y) (concat xs (list y))) (list 9))"]),
        "(1 2 3 (9))"
    );
}

#[test]
fn eval_and_read_string() {
    assert_eq!(eval_one("(eval (read-string \"(+ 1 2)\"))"), "3");
    assert_eq!(eval_one("(read-string \"(1 [2])\")"), "(1 [2])");
}

#[test]
fn thrown_values_are_user_exceptions() {
    let env = repl_env().unwrap();
    match rep("(throw {:msg \"boom\"})", &env) {
        Err(Error::Eval(EvalError::UserException(value))) => {
            assert_eq!(value.to_string(), "{:msg \"boom\"}")
        }
        other => panic!("expected a user exception, got {:?}", other),
    }
}

#[test]
fn load_file_evaluates_every_form() {
    let path = std::env::temp_dir().join("rusty_mal_load_file_test.mal");
    std::fs::write(&path, "(def! x 1)\n; comment\n(def! y (+ x 1))\n").unwrap();
    let env = repl_env().unwrap();
    let command = format!("(load-file \"{}\")", path.display());
    assert_eq!(run(&env, &[&command]), "nil");
    assert_eq!(run(&env, &["y"]), "2");
    std::fs::remove_file(&path).ok();
}

#[test]
fn reader_errors_stay_separate_from_evaluation_errors() {
    let env = repl_env().unwrap();
    assert!(matches!(rep("(1 2", &env), Err(Error::Read(_))));
    assert!(matches!(rep("", &env), Err(Error::Read(_))));
}
