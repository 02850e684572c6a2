use std::{env, path::PathBuf};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "bower-locker")]
struct Cli {
    /// Project directory containing `bower.json`. Default is current directory.
    #[structopt(short = "C", long, parse(from_os_str))]
    dir: Option<PathBuf>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Lock the current bower usage in a new `bower.json`
    Lock(Opt),
    /// Unlock the current bower usage back to the original `bower.json`
    Unlock,
    /// Validate that the currently locked `bower.json` matches `bower_components`
    Validate(Opt),
}

#[derive(StructOpt)]
struct Opt {
    /// Turn on verbose output
    #[structopt(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let Cli { dir, command } = Cli::from_args();

    let verbose = matches!(
        command,
        Command::Lock(Opt { verbose: true }) | Command::Validate(Opt { verbose: true })
    );
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "info" } else { "warn" }),
    )
    .init();

    let root = dir.unwrap_or_else(default_project_dir);
    match command {
        Command::Lock(Opt { verbose }) => bower_locker::lock_project(&root, verbose),
        Command::Unlock => bower_locker::unlock_project(&root),
        Command::Validate(Opt { verbose }) => bower_locker::validate_project(&root, verbose),
    }
}

fn default_project_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
