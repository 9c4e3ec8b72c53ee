use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{arg, command, value_parser, ArgAction, ArgMatches, Command};

use backup_your_code::candidates::CandidateOptions;
use backup_your_code::{logger, probe, Backend, Config, Error, Scanner};

const EXIT_GIT_NOT_INSTALLED: u8 = 1;
const EXIT_FAILED: u8 = 2;

fn cli() -> Command {
    command!()
        .arg(arg!(--pattern <PATTERN> "Glob pattern of folders to check, relative to --cwd. \
            Without one, every git repository below --cwd is checked"))
        .arg(
            arg!(--cwd <CWD> "Directory to start searching from [default: current directory]")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--config <FILE> "Config file to use instead of the default location")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--backend <BACKEND> "How to talk to git")
                .value_parser(["command", "libgit2"]),
        )
        .arg(arg!(--exclude <GLOB> "Skip directories matching this glob (repeatable)")
            .action(ArgAction::Append))
        .arg(arg!(--"include-hidden" "Also check dot-directories").action(ArgAction::SetTrue))
        .arg(
            arg!(--"max-depth" <N> "How deep to look for repositories when no pattern is given")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            arg!(--"git-timeout" <SECS> "Give up on a single git command after this many seconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(arg!(--json "Print one JSON object per line").action(ArgAction::SetTrue))
        .arg(arg!(--"log-json" "Write logs to stderr as JSON").action(ArgAction::SetTrue))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    logger::init(matches.get_flag("log-json"));

    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            if let Some(Error::GitNotInstalled { .. }) = err.downcast_ref::<Error>() {
                eprintln!("Could not use git, is it installed?");
                return ExitCode::from(EXIT_GIT_NOT_INSTALLED);
            }
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let config = load_config(matches)?;
    let cwd = match matches.get_one::<PathBuf>("cwd") {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir().context("cannot read the current directory")?,
    };

    let scanner = Scanner::new(probe::from_config(&config))
        .options(CandidateOptions::from(&config))
        .pattern(matches.get_one::<String>("pattern"))
        .cwd(&cwd);
    let verdicts = scanner.scan()?;

    let json = matches.get_flag("json");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for result in verdicts {
        match result {
            Ok(verdict) if json => {
                serde_json::to_writer(&mut out, &verdict)?;
                writeln!(out)?;
            }
            Ok(verdict) => writeln!(out, "{verdict}")?,
            Err(err) => {
                failures += 1;
                eprintln!("error: {err}");
            }
        }
    }
    out.flush()?;

    if failures > 0 {
        eprintln!("{failures} path(s) could not be checked");
        return Ok(ExitCode::from(EXIT_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Config file values, overridden by whatever was given on the command line.
fn load_config(matches: &ArgMatches) -> anyhow::Result<Config> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => Config::load_file(path)?,
        None => Config::load()?,
    };
    apply_flags(&mut config, matches);
    Ok(config)
}

fn apply_flags(config: &mut Config, matches: &ArgMatches) {
    if let Some(backend) = matches.get_one::<String>("backend") {
        config.backend = match backend.as_str() {
            "libgit2" => Backend::Libgit2,
            _ => Backend::Command,
        };
    }
    if let Some(exclude) = matches.get_many::<String>("exclude") {
        config.exclude.extend(exclude.cloned());
    }
    if matches.get_flag("include-hidden") {
        config.include_hidden = true;
    }
    if let Some(depth) = matches.get_one::<usize>("max-depth") {
        config.max_depth = *depth;
    }
    if let Some(secs) = matches.get_one::<u64>("git-timeout") {
        config.git_timeout_secs = Some(*secs);
    }
}
