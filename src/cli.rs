use std::env;
use std::io::{self, Write};
use std::process::{Command, ExitStatus};

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::config::{Config, DEFAULT_URL, KEY_ENV, POSIX_ENV, URL_ENV};
use crate::env::{display_line, resolve, sanitize};
use crate::error::{EXIT_USAGE, EnvredisError, Result};
use crate::store::{HashStore, RedisStore};

#[derive(Debug, Parser)]
#[command(name = "envredis", version, about = "Load process environments from Redis")]
pub struct Cli {
    /// Redis connection URL
    #[arg(short = 'u', long, env = URL_ENV, default_value = DEFAULT_URL, global = true)]
    url: String,

    /// Name of the Redis hash storing the configuration [default: current directory name]
    #[arg(short = 'k', long, env = KEY_ENV, global = true)]
    key: Option<String>,

    /// Make all variable names follow the POSIX standard
    #[arg(
        long,
        env = POSIX_ENV,
        global = true,
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    posix: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

// Positionals are optional here so missing ones surface as our own usage
// errors instead of clap's.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a command with the stored variables added to its environment
    Run {
        #[arg(
            value_name = "COMMAND",
            num_args = 1..,
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        argv: Vec<String>,
    },
    /// List environment variables
    List,
    /// Print the value of an environment variable
    Get {
        #[arg(value_name = "NAME")]
        args: Vec<String>,
    },
    /// Set an environment variable (`NAME VALUE` or `NAME=VALUE`)
    Set {
        #[arg(value_name = "ARGS")]
        args: Vec<String>,
    },
    /// Delete an environment variable
    Delete {
        #[arg(value_name = "NAME")]
        args: Vec<String>,
    },
    /// Clear all environment variables of the hash
    Clear,
    /// Any other first argument is a program to run, as if `run` preceded it
    #[command(external_subcommand)]
    Exec(Vec<String>),
}

/// Parses the process arguments and runs the selected verb against Redis.
///
/// Returns the exit code for a successful run. Errors are left to the
/// caller, which maps them through `EnvredisError::exit_code`.
pub fn run() -> Result<i32> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { EXIT_USAGE } else { 0 };
            err.print()?;
            return Ok(code);
        }
    };

    let Some(command) = cli.command else {
        return Err(EnvredisError::usage("missing command; see `envredis --help`"));
    };

    let config = Config::new(cli.url, cli.key, cli.posix, &env::current_dir()?)?;
    tracing::debug!(url = %config.url, key = %config.key, posix = config.posix, "resolved config");

    let store = RedisStore::new(config.url.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(&command, &config, &store, &mut out)
}

/// Runs one verb. All arguments are validated before the store is touched.
pub fn dispatch(
    command: &Commands,
    config: &Config,
    store: &dyn HashStore,
    out: &mut dyn Write,
) -> Result<i32> {
    match command {
        Commands::Run { argv } | Commands::Exec(argv) => return cmd_run(config, store, argv),
        Commands::List => cmd_list(config, store, out)?,
        Commands::Get { args } => cmd_get(config, store, args, out)?,
        Commands::Set { args } => cmd_set(config, store, args, out)?,
        Commands::Delete { args } => cmd_delete(config, store, args, out)?,
        Commands::Clear => cmd_clear(config, store, out)?,
    }
    out.flush()?;
    Ok(0)
}

fn cmd_run(config: &Config, store: &dyn HashStore, argv: &[String]) -> Result<i32> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| EnvredisError::usage("you must provide a command name"))?;

    let remote = store.read_all(&config.key)?;
    let child_env = resolve(env::vars_os(), remote, config.posix)?;

    tracing::debug!(program = %program, vars = child_env.len(), "starting child");
    let status = Command::new(program)
        .args(args)
        .env_clear()
        .envs(child_env)
        .status()
        .map_err(|source| EnvredisError::Spawn { program: program.clone(), source })?;

    Ok(exit_code(status))
}

fn cmd_list(config: &Config, store: &dyn HashStore, out: &mut dyn Write) -> Result<()> {
    let mut entries = store.read_all(&config.key)?;
    if config.posix {
        for entry in &mut entries {
            entry.0 = sanitize(&entry.0);
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut rendered = String::new();
    for (name, value) in &entries {
        rendered.push_str(&display_line(name, value));
        rendered.push('\n');
    }
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

fn cmd_get(
    config: &Config,
    store: &dyn HashStore,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let name = first_name(args)?;
    let value = store.read_one(&config.key, name)?;
    writeln!(out, "{value}")?;
    Ok(())
}

fn cmd_set(
    config: &Config,
    store: &dyn HashStore,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let (name, value) = parse_set_args(args)?;
    let name = if config.posix { sanitize(&name) } else { name };

    let is_new = store.write_one(&config.key, &name, &value)?;
    let state = if is_new { "new" } else { "existing" };
    writeln!(out, "set {state} variable {name}={value}")?;
    Ok(())
}

fn cmd_delete(
    config: &Config,
    store: &dyn HashStore,
    args: &[String],
    out: &mut dyn Write,
) -> Result<()> {
    let name = first_name(args)?;
    let removed = store.delete_field(&config.key, name)?;
    writeln!(out, "deleted {removed} variable(s) from key {}", config.key)?;
    Ok(())
}

fn cmd_clear(config: &Config, store: &dyn HashStore, out: &mut dyn Write) -> Result<()> {
    let removed = store.delete_key(&config.key)?;
    writeln!(out, "deleted {removed} key(s)")?;
    Ok(())
}

fn first_name(args: &[String]) -> Result<&str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| EnvredisError::usage("you must provide a variable name"))
}

/// Accepts `NAME=VALUE` as a single argument, or `NAME VALUE` with any
/// further arguments ignored. A single argument with more than one `=` is
/// rejected.
fn parse_set_args(args: &[String]) -> Result<(String, String)> {
    let missing = || EnvredisError::usage("you must provide a variable name and value");

    let (name, value) = match args {
        [] => return Err(missing()),
        [single] => {
            let parts: Vec<&str> = single.split('=').collect();
            match parts.as_slice() {
                [name, value] => (name.to_string(), value.to_string()),
                _ => return Err(missing()),
            }
        }
        [name, value, ..] => (name.clone(), value.clone()),
    };

    if name.is_empty() {
        return Err(EnvredisError::usage("variable name cannot be empty"));
    }
    Ok((name, value))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;

        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
