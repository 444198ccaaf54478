//! Command-line interface for usfm
//! Converts USFM books to verse objects JSON and back, and derives indexes from them.
//!
//! Usage:
//!   usfm to-json `<path>` [--chunk] [--content-source `<id>`]   - Parse USFM, print JSON
//!   usfm to-usfm `<path>` [--forced-new-lines]                - Read JSON, print USFM
//!   usfm convert `<path>` --format `<format>`                   - Parse USFM, print in a registered format
//!   usfm strip `<text>`                                       - Print the displayed text of a verse fragment
//!   usfm index `<path>` [--original-language]                 - Print the book index
//!   usfm tw-groups `<path>` --book `<id>`                       - Print translationWords check data
//!   usfm list-formats                                         - List output formats

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;
use usfm::usfm::config::{Loader, UsfmConfig};
use usfm::usfm::formats::{to_usfm, FormatRegistry, UsfmFormatter};
use usfm::usfm::indexing::{index_book, tw_group_data, IndexMode};
use usfm::usfm::{parse, remove_markup, Document, Result};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_arg = Arg::new("config")
        .long("config")
        .short('c')
        .help("TOML configuration layered over the built-in defaults");

    let matches = Command::new("usfm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert between USFM and verse objects JSON")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("to-json")
                .about("Parse a USFM file and print verse objects JSON")
                .arg(path_arg("Path to the USFM file"))
                .arg(
                    Arg::new("chunk")
                        .long("chunk")
                        .help("Parse a fragment without a chapter marker")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("content-source")
                        .long("content-source")
                        .help("Record a content-source attribute on words and milestones"),
                )
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("to-usfm")
                .about("Read verse objects JSON and print USFM")
                .arg(path_arg("Path to the JSON file"))
                .arg(
                    Arg::new("forced-new-lines")
                        .long("forced-new-lines")
                        .help("Put verses, milestones and words on their own lines")
                        .action(ArgAction::SetTrue),
                )
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("convert")
                .about("Parse a USFM file and print it in a registered format")
                .arg(path_arg("Path to the USFM file"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format (see list-formats)")
                        .default_value("json"),
                )
                .arg(config_arg.clone()),
        )
        .subcommand(
            Command::new("strip")
                .about("Print the displayed text of a verse fragment")
                .arg(
                    Arg::new("text")
                        .help("USFM verse text")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("index")
                .about("Print verse counts (or word counts) of a USFM book")
                .arg(path_arg("Path to the USFM file"))
                .arg(
                    Arg::new("original-language")
                        .long("original-language")
                        .help("Count words per verse instead of verses per chapter")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("tw-groups")
                .about("Print translationWords check data of an aligned original language book")
                .arg(path_arg("Path to the USFM file"))
                .arg(
                    Arg::new("book")
                        .long("book")
                        .short('b')
                        .help("Book id recorded in each check, e.g. 'tit'")
                        .required(true),
                ),
        )
        .subcommand(Command::new("list-formats").about("List available output formats"))
        .get_matches();

    let result = match matches.subcommand() {
        Some(("to-json", sub)) => handle_to_json(sub),
        Some(("to-usfm", sub)) => handle_to_usfm(sub),
        Some(("convert", sub)) => handle_convert(sub),
        Some(("strip", sub)) => {
            let text = sub.get_one::<String>("text").unwrap();
            println!("{}", remove_markup(text));
            Ok(())
        }
        Some(("index", sub)) => handle_index(sub),
        Some(("tw-groups", sub)) => handle_tw_groups(sub),
        Some(("list-formats", _)) => {
            handle_list_formats();
            Ok(())
        }
        _ => unreachable!(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn path_arg(help: &'static str) -> Arg {
    Arg::new("path").help(help).required(true).index(1)
}

fn load_config(matches: &ArgMatches) -> Result<UsfmConfig> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    Ok(loader.build()?)
}

fn read_usfm(matches: &ArgMatches, config: &UsfmConfig) -> Result<Document> {
    let path = matches.get_one::<String>("path").unwrap();
    let source = std::fs::read_to_string(path)?;
    tracing::info!(path = %path, bytes = source.len(), "parsing USFM");
    Ok(parse(&source, &config.parse))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_to_json(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;
    if matches.get_flag("chunk") {
        config.parse.chunk = true;
    }
    if let Some(source) = matches.get_one::<String>("content-source") {
        config.parse.content_source = Some(source.clone());
    }
    let doc = read_usfm(matches, &config)?;
    print_json(&doc)
}

fn handle_to_usfm(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;
    if matches.get_flag("forced-new-lines") {
        config.serialize.forced_new_lines = true;
    }
    let path = matches.get_one::<String>("path").unwrap();
    let doc = Document::from_json(&std::fs::read_to_string(path)?)?;
    print!("{}", to_usfm(&doc, &config.serialize));
    Ok(())
}

fn handle_convert(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let format = matches.get_one::<String>("format").unwrap();
    let doc = read_usfm(matches, &config)?;

    let mut registry = FormatRegistry::with_defaults();
    registry.register(UsfmFormatter::new(config.serialize.clone()));
    let output = registry.serialize(&doc, format)?;
    print!("{output}");
    Ok(())
}

fn handle_index(matches: &ArgMatches) -> Result<()> {
    let config = Loader::new().build()?;
    let doc = read_usfm(matches, &config)?;
    let mode = if matches.get_flag("original-language") {
        IndexMode::OriginalLanguage
    } else {
        IndexMode::Gateway
    };
    print_json(&index_book(&doc, mode))
}

fn handle_tw_groups(matches: &ArgMatches) -> Result<()> {
    let config = Loader::new().build()?;
    let book = matches.get_one::<String>("book").unwrap();
    let doc = read_usfm(matches, &config)?;
    print_json(&tw_group_data(&doc, book))
}

fn handle_list_formats() {
    println!("Available formats:\n");
    for (name, description) in FormatRegistry::with_defaults().describe() {
        println!("  {name}");
        if !description.is_empty() {
            println!("    {description}");
        }
    }
}
