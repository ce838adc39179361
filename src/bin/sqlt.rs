use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sql_template::prelude::*;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run parameterized SQL against a SQLite database")]
struct Args {
    /// Database path or `file:` URI
    #[arg(long, required_unless_present = "config", conflicts_with = "config")]
    db: Option<String>,
    /// JSON file with connection options
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    journal_mode: Option<JournalMode>,
    #[arg(long, default_value = "warn")]
    log_level: Level,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an INSERT/UPDATE/DELETE and print the affected-row count
    Update {
        sql: String,
        #[arg(value_parser = parse_arg, allow_negative_numbers = true)]
        args: Vec<RowValues>,
    },
    /// Run a SELECT and print the rows as a JSON array
    Query {
        sql: String,
        #[arg(value_parser = parse_arg, allow_negative_numbers = true)]
        args: Vec<RowValues>,
    },
    /// Run a script of statements without arguments
    Batch { sql: String },
}

/// `null`, integers, floats and `true`/`false` are recognised; anything else is text.
/// A `text:`, `int:`, `float:` or `bool:` prefix forces the kind.
fn parse_arg(raw: &str) -> Result<RowValues, String> {
    if let Some((prefix, rest)) = raw.split_once(':') {
        match prefix {
            "text" => return Ok(RowValues::Text(rest.to_string())),
            "int" => return rest.parse().map(RowValues::Int).map_err(|e| format!("{raw}: {e}")),
            "float" => {
                return rest.parse().map(RowValues::Float).map_err(|e| format!("{raw}: {e}"));
            }
            "bool" => return rest.parse().map(RowValues::Bool).map_err(|e| format!("{raw}: {e}")),
            _ => {}
        }
    }
    if raw == "null" {
        return Ok(RowValues::Null);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(RowValues::Int(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(RowValues::Float(f));
    }
    match raw {
        "true" => Ok(RowValues::Bool(true)),
        "false" => Ok(RowValues::Bool(false)),
        _ => Ok(RowValues::Text(raw.to_string())),
    }
}

fn options(args: &Args) -> Result<SqliteOptions, DataAccessError> {
    let mut opts = match (&args.config, &args.db) {
        (Some(path), _) => SqliteOptions::from_json_file(path)?,
        (None, Some(db)) => SqliteOptions::new(db.clone()),
        (None, None) => {
            return Err(DataAccessError::new(
                ErrorKind::Configuration,
                "either --db or --config is required",
            ));
        }
    };
    if let Some(mode) = args.journal_mode {
        opts.journal_mode = mode;
    }
    Ok(opts)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let executor = StatementExecutor::new(SqliteDataSource::new(options(&args)?));
    match args.command {
        Command::Update { sql, args } => {
            let affected = executor.update(&sql, &args)?;
            println!("{affected}");
        }
        Command::Query { sql, args } => {
            let to_json = row_mapper(|row, _| {
                let mut obj = serde_json::Map::new();
                for (i, col) in row.columns().iter().enumerate() {
                    // unmapped declared types still print, as stored
                    let value = row.get(i).or_else(|_| row.get_raw(i))?;
                    obj.insert(col.name.clone(), value.to_json());
                }
                Ok(serde_json::Value::Object(obj))
            });
            let rows = executor.query(&sql, to_json, &args)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Batch { sql } => executor.execute_batch(&sql)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(args.log_level)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sqlt: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_untagged_arguments() {
        assert_eq!(parse_arg("5"), Ok(RowValues::Int(5)));
        assert_eq!(parse_arg("-2.5"), Ok(RowValues::Float(-2.5)));
        assert_eq!(parse_arg("true"), Ok(RowValues::Bool(true)));
        assert_eq!(parse_arg("null"), Ok(RowValues::Null));
        assert_eq!(parse_arg("Ann"), Ok(RowValues::Text("Ann".into())));
    }

    #[test]
    fn prefixes_force_the_kind() {
        assert_eq!(parse_arg("text:5"), Ok(RowValues::Text("5".into())));
        assert_eq!(parse_arg("int:7"), Ok(RowValues::Int(7)));
        assert!(parse_arg("int:seven").is_err());
        assert_eq!(parse_arg("bool:false"), Ok(RowValues::Bool(false)));
        // unknown prefixes stay text
        assert_eq!(parse_arg("a:b"), Ok(RowValues::Text("a:b".into())));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
