use crate::environment::Environment;
use crate::{interpreter, reader, strings, MalObject};
use ansi_term::Colour::Red;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Interpreter(interpreter::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Interpreter(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("mal")?;
    interface.set_prompt("user> ")?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|mut path| {
        path.push(".mal_history");
        path
    })
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

fn describe_error(e: &interpreter::Error) -> String {
    let text = format!("Error: {}", e);
    if atty::is(atty::Stream::Stdout) {
        Red.paint(text).to_string()
    } else {
        text
    }
}

pub fn repl<T: Terminal>(interface: &Interface<T>, env: &Rc<Environment>) {
    loop {
        match interface.read_line() {
            Ok(ReadResult::Eof) => break,
            Ok(ReadResult::Signal(sig)) => {
                writeln!(interface, "Received signal {:?}", sig).ok();
            }
            Ok(ReadResult::Input(line)) => {
                interface.add_history_unique(line.clone());
                match interpreter::rep(&line, env) {
                    Ok(output) => writeln!(interface, "{}", output).ok(),
                    Err(interpreter::Error::Read(reader::Error::NothingToRead)) => continue,
                    Err(e) => writeln!(interface, "{}", describe_error(&e)).ok(),
                };
            }
            Err(e) => {
                writeln!(interface, "Error: {}", e).ok();
                break;
            }
        }
    }
}

/// Run the script named by `args[1]`, or start a REPL if there isn't one.
/// Anything after the script path is bound to `*ARGV*` as strings.
pub fn launch(args: Vec<String>, env: &Rc<Environment>) -> Result<(), Error> {
    let argv = args.iter().skip(2).cloned().map(MalObject::String).collect();
    env.set("*ARGV*".into(), MalObject::wrap_list(argv));
    match args.get(1) {
        Some(path) => run_script(path, env),
        None => {
            let interface = setup()?;
            repl(&interface, env);
            save_history(&interface)?;
            Ok(())
        }
    }
}

fn run_script(path: &str, env: &Rc<Environment>) -> Result<(), Error> {
    log::info!("running script {}", path);
    let command = format!("(load-file {})", strings::string_repr(path));
    interpreter::rep(&command, env)
        .map(|_| ())
        .map_err(Error::Interpreter)
}
