use std::fs;
use std::io;
use std::time::{Duration, Instant};

use clap::{command, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vcpp::rules::{self, Composite, RuleSource, Static};
use vcpp::vcs::{NullVcs, Vcs};
use vcpr::json::Json;
use vcpr::perforce::Perforce;
use vcpr::report::Report;
use vcpr::ConsumeDisplay;

#[macro_use]
extern crate clap;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const PATH: &str = "PATH";
const EXT_DESCR: &str = "Visual C++ project file extension";
const DEFAULT_PROJECT_EXT: &str = "vcproj";

fn main() {
    miette::set_panic_hook();
    init_logging();
    let app = build_cli();
    let matches = app.get_matches();

    let code = match matches.subcommand() {
        Some(("rewrite", cmd)) => scan_path(cmd, &all_rules()),
        Some(("boost", cmd)) => scan_path(cmd, &rules::BoostSource),
        Some(("cache", cmd)) => scan_path(cmd, &Static(rules::cache())),
        Some(("exceptions", cmd)) => scan_path(cmd, &Static(rules::exception_handling())),
        Some(("warnings", cmd)) => scan_path(cmd, &Static(rules::warnings())),
        Some(("completion", cmd)) => {
            print_completions(cmd);
            exitcode::OK
        }
        _ => exitcode::OK,
    };
    std::process::exit(code);
}

fn all_rules() -> Composite {
    Composite(vec![
        Box::new(rules::BoostSource),
        Box::new(Static(rules::cache())),
        Box::new(Static(rules::exception_handling())),
        Box::new(Static(rules::warnings())),
    ])
}

fn scan_path(cmd: &ArgMatches, source: &dyn RuleSource) -> i32 {
    let empty = String::default();
    let path = cmd.get_one::<String>(PATH).unwrap_or(&empty);
    let extension = cmd.get_one::<String>("ext").unwrap_or(&empty);
    let dry_run = cmd.get_flag("dry-run");
    let json = cmd.get_flag("json");

    let Ok(metadata) = fs::metadata(path) else {
        eprintln!("Path {path} does not exist or is not accessible");
        return exitcode::USAGE;
    };

    let vcs: Box<dyn Vcs> = if cmd.get_flag("perforce") {
        Box::new(Perforce::new(cmd.get_one::<String>("port").cloned()))
    } else {
        Box::new(NullVcs)
    };

    let mut consumer: Box<dyn ConsumeDisplay> = if json {
        Json::new_box(dry_run)
    } else {
        Report::new_box(dry_run)
    };

    let now = Instant::now();
    if metadata.is_dir() {
        vcpp::rewrite_dir_tree(
            path,
            extension,
            source,
            vcs.as_ref(),
            dry_run,
            consumer.as_mut(),
        );
    } else {
        // a single file was given; per-file conditions are still reported
        // through the consumer rather than the exit code
        if let Err(e) = vcpp::rewrite_file(path, source, vcs.as_ref(), dry_run, consumer.as_mut())
        {
            eprintln!("{e:?}");
        }
    }
    print!("{consumer}");

    if !json {
        let duration = now.elapsed().as_millis();
        let duration = Duration::from_millis(duration as u64);
        println!("{:>2} {}", "elapsed:", humantime::format_duration(duration));
    }
    exitcode::OK
}

fn print_completions(matches: &ArgMatches) {
    let mut cmd = build_cli();
    let bin_name = cmd.get_name().to_string();
    if let Some(generator) = matches.get_one::<Shell>("generator") {
        generate(*generator, &mut cmd, bin_name, &mut io::stdout());
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_default();
    let layer = fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn build_cli() -> Command {
    command!(crate_name!())
        .arg_required_else_help(true)
        .version(crate_version!())
        .author(crate_authors!("\n"))
        .about(crate_description!())
        .subcommand(rule_command(
            "rewrite",
            "rw",
            "Apply every built-in housekeeping rule to projects within directory or file specified",
        ))
        .subcommand(rule_command(
            "boost",
            "b",
            "Wire the sandbox Boost tree into compiler and linker search paths",
        ))
        .subcommand(rule_command(
            "cache",
            "c",
            "Add the cache include directory next to the VS.NET entry",
        ))
        .subcommand(rule_command(
            "exceptions",
            "x",
            "Force asynchronous C++ exception handling in every configuration",
        ))
        .subcommand(rule_command(
            "warnings",
            "w",
            "Silence the canonical set of benign compiler warnings",
        ))
        .subcommand(
            Command::new("completion")
                .about("Generate the autocompletion script for the specified shell")
                .arg(
                    arg!([generator])
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .index(1),
                ),
        )
}

fn rule_command(name: &'static str, alias: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .aliases([alias])
        .about(about)
        .arg(
            arg!([PATH])
                .help("Sets project path or directory to process")
                .default_value("."),
        )
        .arg(
            arg!(-e --ext <EXTENSION>)
                .required(false)
                .default_value(DEFAULT_PROJECT_EXT)
                .help(EXT_DESCR),
        )
        .arg(
            arg!(-d --"dry-run")
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Report files that would change without writing them"),
        )
        .arg(
            arg!(-j --json)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON instead of tables"),
        )
        .arg(
            arg!(-p --perforce)
                .required(false)
                .action(ArgAction::SetTrue)
                .help("Open files for edit in Perforce before writing"),
        )
        .arg(
            arg!(--port <ADDR>)
                .required(false)
                .help("Perforce server address (defaults to P4PORT from the environment)"),
        )
}
