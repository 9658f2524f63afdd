use std::process::ExitCode;

fn main() -> ExitCode {
    let env = env_logger::Env::default().default_filter_or(ising_curves::app::DEFAULT_LOG_FILTER);
    env_logger::Builder::from_env(env).init();

    match ising_curves::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
