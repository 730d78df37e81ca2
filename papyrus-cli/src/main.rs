use clap::{Parser, Subcommand, ValueEnum};
use papyrus::{Query, Store};
use std::process;

/// Papyrus CLI: query and modify a Papyrus data directory from the command line
#[derive(Parser)]
#[command(name = "papyrus", version, about)]
struct Cli {
    /// Path to the data directory holding papyrus.yaml
    #[arg(long, env = "PAPYRUS_DATA_DIR", default_value = ".")]
    data_dir: String,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch records from a file
    Get {
        /// File name
        file: String,
        /// Primary key condition (e.g. --where dni=1)
        #[arg(long = "where", value_parser = parse_key_value)]
        condition: Option<(String, String)>,
        /// Comma-separated fields to keep (e.g. --select name,lastName)
        #[arg(long)]
        select: Option<String>,
        /// Field to sort by
        #[arg(long)]
        order_by: Option<String>,
        /// Sort descending instead of ascending
        #[arg(long, requires = "order_by")]
        desc: bool,
        /// Maximum number of records (0 = all)
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Insert a record
    Insert {
        /// File name
        file: String,
        /// Field values (e.g. --field name="Ana")
        #[arg(long = "field", value_parser = parse_key_value, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Update one record by key, or every record when no condition is given
    Update {
        /// File name
        file: String,
        /// Primary key condition (e.g. --where dni=1)
        #[arg(long = "where", value_parser = parse_key_value)]
        condition: Option<(String, String)>,
        /// Field values to update (e.g. --field lastName=Ruiz)
        #[arg(long = "field", value_parser = parse_key_value, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Delete one record by key, or every record when no condition is given
    Delete {
        /// File name
        file: String,
        /// Primary key condition (e.g. --where dni=1)
        #[arg(long = "where", value_parser = parse_key_value)]
        condition: Option<(String, String)>,
        /// Show what would be deleted without actually deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show configured files, their keys and record counts
    Status,

    /// Check every stored record against its file definition
    Validate,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s.find('=').ok_or_else(|| {
        format!("Invalid key=value pair: no '=' found in '{s}'")
    })?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    log::debug!("Opening store at: {}", cli.data_dir);
    let store = Store::open(&cli.data_dir)?;

    match cli.command {
        Command::Get {
            file,
            condition,
            select,
            order_by,
            desc,
            limit,
        } => {
            let mut query = store.query();
            query.from(&file).limit(limit);
            if let Some(select) = select {
                query.select(select.split(','));
            }
            if let Some(field) = order_by {
                query.order_by(&field, if desc { "DESC" } else { "ASC" });
            }
            apply_condition(&mut query, condition);
            let result = query.execute()?;
            print_output(&result.to_json(), &cli.format)?;
        }

        Command::Insert { file, fields } => {
            let result = store
                .query()
                .insert_into(&file)
                .values(fields_to_value(&fields))
                .execute()?;
            print_output(&result.to_json(), &cli.format)?;
        }

        Command::Update {
            file,
            condition,
            fields,
        } => {
            let mut query = store.query();
            query.update(&file).set(fields_to_value(&fields));
            apply_condition(&mut query, condition);
            let result = query.execute()?;
            print_output(&result.to_json(), &cli.format)?;
        }

        Command::Delete {
            file,
            condition,
            dry_run,
        } => {
            if dry_run {
                let mut query = store.query();
                query.from(&file);
                apply_condition(&mut query, condition);
                let matched = query.execute()?;
                print_output(
                    &serde_json::json!({
                        "dry_run": true,
                        "file": file,
                        "would_delete": matched.to_json(),
                    }),
                    &cli.format,
                )?;
            } else {
                let mut query = store.query();
                query.delete_from(&file);
                apply_condition(&mut query, condition);
                let result = query.execute()?;
                print_output(&result.to_json(), &cli.format)?;
            }
        }

        Command::Status => {
            print_output(&store.status()?, &cli.format)?;
        }

        Command::Validate => {
            print_output(&store.validate_all()?, &cli.format)?;
        }
    }

    Ok(())
}

fn apply_condition(query: &mut Query<'_>, condition: Option<(String, String)>) {
    if let Some((field, value)) = condition {
        query.where_eq(&field, parse_value(&value));
    }
}

fn print_output(
    value: &serde_json::Value,
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(())
}

/// Interpret a CLI value as JSON (numbers, booleans, null), falling back to a string.
fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

fn fields_to_value(fields: &[(String, String)]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (key, val) in fields {
        map.insert(key.clone(), parse_value(val));
    }
    serde_json::Value::Object(map)
}
