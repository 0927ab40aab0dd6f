use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use reconfig_cli::{OutputFormat, VERSION};
use reconfig_engine::Reconfigurer;
use tracing_subscriber::EnvFilter;

fn constraint_arg() -> Arg {
    Arg::new("constraint")
        .long("constraint")
        .short('c')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Constraint file (YAML or JSON)")
}

fn bundle_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("reconfig")
        .version(VERSION)
        .about("Diff, validate and edit database configuration bundles")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("engine-config")
                .long("engine-config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Engine settings file (YAML)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .default_value("warn")
                .help("Log filter used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .global(true)
                .default_value("table")
                .value_parser(["table", "json"])
                .help("Output format"),
        )
        .subcommand(
            Command::new("diff")
                .about("Show parameter changes between two bundles")
                .arg(constraint_arg())
                .arg(bundle_arg("old", "Current files or directories"))
                .arg(bundle_arg("new", "Candidate files or directories"))
                .arg(
                    Arg::new("only")
                        .long("only")
                        .num_args(1..)
                        .help("Restrict the diff to these file names"),
                )
                .arg(
                    Arg::new("reformat-only")
                        .long("reformat-only")
                        .action(ArgAction::SetTrue)
                        .help("Report files whose text changed without value changes"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check a bundle against the constraint schema")
                .arg(constraint_arg())
                .arg(bundle_arg("config", "Files or directories to check")),
        )
        .subcommand(
            Command::new("merge")
                .about("Apply parameter edits to a bundle")
                .arg(constraint_arg())
                .arg(bundle_arg("config", "Files or directories to edit"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .short('f')
                        .help("File for edits given without a file: prefix"),
                )
                .arg(
                    Arg::new("set")
                        .long("set")
                        .action(ArgAction::Append)
                        .help("Edit as [file:]key=value"),
                )
                .arg(
                    Arg::new("unset")
                        .long("unset")
                        .action(ArgAction::Append)
                        .help("Remove [file:]key"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write changed files here instead of printing them"),
                )
                .arg(
                    Arg::new("no-validate")
                        .long("no-validate")
                        .action(ArgAction::SetTrue)
                        .help("Skip schema validation of edited files"),
                ),
        )
        .subcommand(
            Command::new("explain")
                .about("Classify parameters and report constraint problems")
                .arg(constraint_arg())
                .arg(Arg::new("params").num_args(0..).help("Parameter names")),
        )
}

fn init_logging(matches: &ArgMatches) {
    let level = matches.get_one::<String>("log-level").map_or("warn", String::as_str);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if matches.get_flag("log-json") {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn strings(args: &ArgMatches, id: &str) -> Vec<String> {
    args.get_many::<String>(id).map(|v| v.cloned().collect()).unwrap_or_default()
}

fn paths(args: &ArgMatches, id: &str) -> Vec<PathBuf> {
    args.get_many::<PathBuf>(id).map(|v| v.cloned().collect()).unwrap_or_default()
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let output: OutputFormat = matches
        .get_one::<String>("output")
        .map_or(Ok(OutputFormat::Table), |s| s.parse())?;
    let engine_config =
        reconfig_cli::load_engine_config(matches.get_one::<PathBuf>("engine-config").map(PathBuf::as_path))?;
    let engine = Reconfigurer::new().with_config(engine_config);

    let Some((name, args)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };
    let constraint_path = args.get_one::<PathBuf>("constraint").context("--constraint is required")?;
    let constraint = reconfig_cli::load_constraint(constraint_path)?;

    match name {
        "diff" => {
            let old = reconfig_cli::load_bundle(&paths(args, "old"))?;
            let new = reconfig_cli::load_bundle(&paths(args, "new"))?;
            let report = reconfig_cli::diff(
                &engine,
                &constraint,
                &old,
                &new,
                &strings(args, "only"),
                args.get_flag("reformat-only"),
            )?;
            print!("{}", report.render(output)?);
            Ok(ExitCode::SUCCESS)
        }
        "validate" => {
            let bundle = reconfig_cli::load_bundle(&paths(args, "config"))?;
            let violations = engine.validate(&constraint, &bundle, None)?;
            print!("{}", reconfig_cli::render_violations(&violations, output)?);
            Ok(if violations.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        "merge" => {
            let base = reconfig_cli::load_bundle(&paths(args, "config"))?;
            let default_file = args.get_one::<String>("file").map(String::as_str);
            let pairs = reconfig_cli::param_pairs(&strings(args, "set"), &strings(args, "unset"), default_file)?;
            let merged = reconfig_cli::merge(&engine, &constraint, &base, &pairs, args.get_flag("no-validate"))?;

            if let Some(dir) = args.get_one::<PathBuf>("out") {
                for file in reconfig_cli::write_changed(dir, &base, &merged)? {
                    println!("wrote {}", dir.join(file).display());
                }
            } else {
                for (file, text) in reconfig_cli::changed_files(&base, &merged) {
                    println!("# {file}");
                    print!("{text}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        "explain" => {
            let explanations = reconfig_cli::explain(&constraint, &strings(args, "params"));
            print!(
                "{}",
                reconfig_cli::render_explanations(&constraint, &explanations, output)?
            );
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(&matches);

    match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
