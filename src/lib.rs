#[macro_use]
extern crate lazy_static;

pub mod cmdline;
pub mod environment;
pub mod evaluator;
pub mod interpreter;
pub mod macros;
pub mod printer;
pub mod quasiquote;
pub mod reader;
pub mod types;

mod core;
mod special_forms;
mod strings;
mod tokens;

pub use types::MalObject;
