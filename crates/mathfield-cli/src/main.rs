use anyhow::{Context, Result, bail};
use mathfield_config::{Config, ModeSetting};
use mathfield_engine::editing::{InsertOptions, Model, NormalizeOptions, RawRange, mode_editor};
use mathfield_engine::export::{ExportOptions, OutputFormat};
use mathfield_engine::models::ParseMode;
use std::{env, process};

const USAGE: &str = "\
Usage: mathfield-cli <command> <markup> [args]

Commands:
  tokenize <markup>                  print the token stream
  positions <markup>                 print the caret position table
  value <markup> [format]            print the document as latex, latex-expanded, math-json or math-ml
  normalize <markup> <start> [end]   print the canonical form of a range
  copy <markup> [start end]          print the clipboard content for a copy";

#[derive(Debug, PartialEq)]
enum Command {
    Tokenize(String),
    Positions(String),
    Value { markup: String, format: OutputFormat },
    Normalize { markup: String, start: i64, end: Option<i64> },
    Copy { markup: String, range: Option<(i64, i64)> },
}

fn parse_offset(arg: &str) -> Result<i64> {
    arg.parse()
        .with_context(|| format!("invalid position `{arg}`"))
}

fn parse_args(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        ["tokenize", markup] => Command::Tokenize(markup.to_string()),
        ["positions", markup] => Command::Positions(markup.to_string()),
        ["value", markup] => Command::Value {
            markup: markup.to_string(),
            format: OutputFormat::Latex,
        },
        ["value", markup, format] => Command::Value {
            markup: markup.to_string(),
            format: format.parse()?,
        },
        ["normalize", markup, start] => Command::Normalize {
            markup: markup.to_string(),
            start: parse_offset(start)?,
            end: None,
        },
        ["normalize", markup, start, end] => Command::Normalize {
            markup: markup.to_string(),
            start: parse_offset(start)?,
            end: Some(parse_offset(end)?),
        },
        ["copy", markup] => Command::Copy {
            markup: markup.to_string(),
            range: None,
        },
        ["copy", markup, start, end] => Command::Copy {
            markup: markup.to_string(),
            range: Some((parse_offset(start)?, parse_offset(end)?)),
        },
        [] => bail!("no command given"),
        [command, ..] => bail!("unknown command or wrong arguments for `{command}`"),
    };
    Ok(command)
}

fn parse_mode(mode: ModeSetting) -> ParseMode {
    match mode {
        ModeSetting::Math => ParseMode::Math,
        ModeSetting::Text => ParseMode::Text,
        ModeSetting::Latex => ParseMode::Latex,
    }
}

/// Build a document from markup read in the configured mode.
fn build_model(markup: &str, config: &Config) -> Model {
    let model = match parse_mode(config.default_mode) {
        ParseMode::Math => Model::from_latex(markup),
        mode => {
            let mut model = Model::new();
            model.set_mode(mode);
            model.insert(markup, InsertOptions::default());
            model
        }
    };
    for error in model.parse_errors() {
        log::warn!("{error}");
    }
    model
}

fn run(command: Command, config: &Config) -> Result<String> {
    let output = match command {
        Command::Tokenize(markup) => mathfield_syntax::tokenize_with_spans(&markup)
            .iter()
            .map(|(token, span)| format!("{:?}@{}..{} {:?}", token.kind(), span.start, span.end, token.to_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Positions(markup) => {
            let model = build_model(&markup, config);
            let iter = model.iter();
            iter.positions()
                .iter()
                .enumerate()
                .filter_map(|(position, entry)| {
                    let atom = model.tree().get(entry.atom)?;
                    Some(format!(
                        "{position:>3} depth={} {:?} {:?}",
                        entry.depth, atom.kind, atom.value
                    ))
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Command::Value { markup, format } => {
            let model = build_model(&markup, config);
            model.get_value(&model.whole_range(), format)
        }
        Command::Normalize { markup, start, end } => {
            let model = build_model(&markup, config);
            let raw = match end {
                Some(end) => RawRange::new(start, end),
                None => RawRange::caret(start),
            };
            let options = NormalizeOptions {
                accessible_atoms_only: config.accessible_atoms_only,
            };
            serde_json::to_string_pretty(&model.normalize_with(raw, options))?
        }
        Command::Copy { markup, range } => {
            let mut model = build_model(&markup, config);
            if let Some((start, end)) = range {
                model.set_selection(&[RawRange::new(start, end)]);
            }
            let options = ExportOptions {
                begin: config.clipboard_wrapper.begin.clone(),
                end: config.clipboard_wrapper.end.clone(),
            };
            serde_json::to_string_pretty(&mode_editor::on_copy(&model, &options))?
        }
    };
    Ok(output)
}

fn init_logging(config: &Config) {
    let mut builder = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        let level = config
            .log_level
            .as_deref()
            .and_then(|level| level.parse().ok())
            .unwrap_or(log::LevelFilter::Warn);
        builder.filter_level(level);
    }
    builder.init();
}

fn main() -> Result<()> {
    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Fix or remove {}", Config::config_path().display());
            process::exit(1);
        }
    };
    init_logging(&config);
    log::debug!("Config path: {}", Config::config_path().display());

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    println!("{}", run(command, &config)?);
    Ok(())
}
