use rusty_mal::{cmdline, environment};

fn main() -> Result<(), cmdline::Error> {
    pretty_env_logger::init();
    let env = match environment::repl_env() {
        Ok(env) => env,
        Err(e) => panic!("error reading prelude: {}", e),
    };
    let args = std::env::args().collect();
    cmdline::launch(args, &env)
}
