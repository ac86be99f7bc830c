//! Command-line interface for propconf
//! This binary checks, normalizes and dumps typed properties configuration files.
//!
//! Usage:
//!   propconf check `<path>`                             - Read the file and report errors
//!   propconf format `<path>` [-o `<file>`]              - Rewrite the file in canonical form
//!   propconf dump `<path>` [--format json|yaml]       - Print the property store
//!
//! Global options tune the reader (`--include-dir`, `--allow-override`, `--activate`, `--param`)
//! and the writer (`--prefer-unit`, `--no-wrap`). `--config` layers a TOML file over the
//! built-in defaults; without it, `propconf.toml` in the working directory is used if present.

use clap::{Arg, ArgAction, ArgMatches, Command};
use propconf_config::{LoadError, Loader, PropconfConfig};
use propconf_parser::{PropertyStore, Reader, VariantRepository, Writer};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Picked up from the working directory when `--config` is not given
const LOCAL_CONFIG: &str = "propconf.toml";

fn main() {
    let matches = cli().get_matches();

    let config = load_config(&matches).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });
    init_logging(&config.logging.filter);

    match matches.subcommand() {
        Some(("check", sub)) => handle_check_command(&config, sub),
        Some(("format", sub)) => handle_format_command(&config, sub),
        Some(("dump", sub)) => handle_dump_command(&config, sub),
        _ => unreachable!("a subcommand is required"),
    }
}

fn cli() -> Command {
    let path_arg = Arg::new("path")
        .help("Path to the properties file")
        .required(true)
        .index(1);

    Command::new("propconf")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for checking and processing typed properties configuration files")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML configuration file layered over the defaults [default: ./propconf.toml if present]")
                .global(true),
        )
        .arg(
            Arg::new("include-dir")
                .long("include-dir")
                .short('I')
                .help("Directory searched for included files (repeatable)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("allow-override")
                .long("allow-override")
                .help("Allow keys to be declared more than once")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("activate")
                .long("activate")
                .help("Activate a variant, as registry:path (repeatable)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("param")
                .long("param")
                .help("Set a variant parameter, as registry:path=value (repeatable)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("prefer-unit")
                .long("prefer-unit")
                .help("Unit symbol to write reals in when the unit label matches (repeatable)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("no-wrap")
                .long("no-wrap")
                .help("Write vectors on a single line")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("check")
                .about("Read a file and report the first error")
                .arg(path_arg.clone()),
        )
        .subcommand(
            Command::new("format")
                .about("Rewrite a file in canonical form")
                .arg(path_arg.clone())
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Write to this file instead of stdout"),
                ),
        )
        .subcommand(
            Command::new("dump")
                .about("Print the property store as JSON or YAML")
                .arg(path_arg)
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["json", "yaml"])
                        .default_value("json"),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<PropconfConfig, LoadError> {
    let sub = matches.subcommand().map(|(_, sub)| sub).unwrap_or(matches);
    let mut loader = match sub.get_one::<String>("config") {
        Some(path) => Loader::new().with_file(path),
        None => Loader::new().with_optional_file(LOCAL_CONFIG),
    };
    if sub.get_flag("allow-override") {
        loader = loader.set_override("reader.allow_key_override", true)?;
    }
    if sub.get_flag("no-wrap") {
        loader = loader.set_override("writer.smart_modulo", false)?;
    }
    loader.build()
}

/// RUST_LOG wins over the configured filter
fn init_logging(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn values<'a>(matches: &'a ArgMatches, id: &str) -> impl Iterator<Item = &'a String> {
    matches.get_many::<String>(id).into_iter().flatten()
}

fn build_reader(config: &PropconfConfig, matches: &ArgMatches, path: &Path) -> Result<Reader, String> {
    let mut resolver = config.reader.include_resolver();
    for dir in values(matches, "include-dir") {
        resolver = resolver.with_search_dir(dir);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        resolver = resolver.with_search_dir(parent);
    }

    let mut variants = VariantRepository::new();
    for spec in values(matches, "activate") {
        variants.activate(spec)?;
    }
    for spec in values(matches, "param") {
        variants.assign(spec)?;
    }
    debug!(active = variants.is_active(), "variant repository ready");

    Ok(Reader::new()
        .with_options(config.reader.options())
        .with_variants(variants)
        .with_include_setup(resolver))
}

fn build_writer(config: &PropconfConfig, matches: &ArgMatches) -> Writer {
    let options = values(matches, "prefer-unit").fold(config.writer.options(), |options, symbol| {
        options.with_preferred_unit(symbol)
    });
    Writer::new(options)
}

/// Read the file named by the `path` argument, exiting on failure
fn read_store(config: &PropconfConfig, matches: &ArgMatches) -> (String, PropertyStore) {
    let path = matches
        .get_one::<String>("path")
        .expect("path is a required argument")
        .clone();
    let reader = build_reader(config, matches, Path::new(&path)).unwrap_or_else(|e| {
        eprintln!("Invalid variant setting: {}", e);
        std::process::exit(1);
    });
    let outcome = reader.read_path(&path).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    (path, outcome.store)
}

/// Handle the check command
fn handle_check_command(config: &PropconfConfig, matches: &ArgMatches) {
    let (path, store) = read_store(config, matches);
    println!("{}: ok ({} properties)", path, store.len());
}

/// Handle the format command
fn handle_format_command(config: &PropconfConfig, matches: &ArgMatches) {
    let (_, store) = read_store(config, matches);
    let writer = build_writer(config, matches);
    let result = match matches.get_one::<String>("output") {
        Some(output) => writer.write_path(output, &store),
        None => writer.write_string(&store).map(|text| print!("{}", text)),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Handle the dump command
fn handle_dump_command(config: &PropconfConfig, matches: &ArgMatches) {
    let (_, store) = read_store(config, matches);
    let format = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("json");
    let dumped = match format {
        "yaml" => serde_yaml::to_string(&store).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(&store)
            .map(|text| text + "\n")
            .map_err(|e| e.to_string()),
    };
    match dumped {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Error formatting store: {}", e);
            std::process::exit(1);
        }
    }
}
