//! Command-line front end for the point-get fast path.
//!
//! Loads a catalog from JSON table definitions, then plans statements either
//! one-shot (`-e`) or interactively, printing the explain rows of the fast
//! plan or noting that the statement falls back to the general optimizer.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use catalog::Catalog;
use clap::{Parser, ValueEnum};
use common::pretty::{self, TableStyleKind};
use parser::parse_sql;
use planner::explain::render_explain;
use planner::{PlanContext, SessionContext, try_fast_plan};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use types::Value;

const DEMO_CATALOG: &str = include_str!("../demo_catalog.json");
const DEMO_DB: &str = "shop";
const FALLBACK: &str = "fallback: general optimizer";

#[derive(Parser, Debug)]
#[command(name = "fastplan", about = "Plan point lookups without the general optimizer")]
struct Args {
    /// JSON array of table definitions (defaults to a built-in demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Current database for unqualified table names
    #[arg(long, default_value = DEMO_DB)]
    db: String,

    /// Plan as if an explicit transaction is open
    #[arg(long)]
    in_txn: bool,

    /// Plan with autocommit turned off
    #[arg(long)]
    no_autocommit: bool,

    /// Plan as if the transaction uses pessimistic locking
    #[arg(long)]
    pessimistic: bool,

    /// Active role, repeatable
    #[arg(long = "role")]
    roles: Vec<String>,

    /// Value for the next `?` placeholder, repeatable (NULL, numbers, else text)
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,

    /// Table style for explain output
    #[arg(long, value_enum, default_value_t = Style::Modern)]
    style: Style,

    /// Plan the provided SQL and exit
    #[arg(short = 'e', long)]
    execute: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Style {
    Modern,
    Ascii,
    Plain,
}

impl From<Style> for TableStyleKind {
    fn from(style: Style) -> Self {
        match style {
            Style::Modern => TableStyleKind::Modern,
            Style::Ascii => TableStyleKind::Ascii,
            Style::Plain => TableStyleKind::Plain,
        }
    }
}

/// Everything a planning run needs, owned by the CLI.
struct Shell {
    catalog: Catalog,
    session: SessionContext,
    params: Vec<Value>,
    style: TableStyleKind,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let catalog = load_catalog(args.catalog.as_ref())?;
    let session = SessionContext::builder()
        .current_db(args.db)
        .autocommit(!args.no_autocommit)
        .in_txn(args.in_txn)
        .pessimistic(args.pessimistic)
        .active_roles(args.roles)
        .build();
    let mut shell = Shell {
        catalog,
        session,
        params: args.params.iter().map(|p| parse_param(p)).collect(),
        style: args.style.into(),
    };

    if let Some(sql) = args.execute {
        shell.plan_and_print(&sql)
    } else {
        interactive_loop(&mut shell)
    }
}

fn load_catalog(path: Option<&PathBuf>) -> Result<Catalog> {
    let catalog = match path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            Catalog::from_definitions(&json)
                .with_context(|| format!("loading catalog {}", path.display()))?
        }
        None => Catalog::from_definitions(DEMO_CATALOG).context("loading demo catalog")?,
    };
    info!(tables = catalog.tables().count(), "catalog loaded");
    Ok(catalog)
}

/// `NULL`, a number, or text with optional single quotes.
fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Some(number) = Value::parse_number(raw) {
        return number;
    }
    let text = raw
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);
    Value::Text(text.to_string())
}

impl Shell {
    fn plan_and_print(&self, sql: &str) -> Result<()> {
        let statements = parse_sql(sql)?;
        let ctx = PlanContext::new(&self.catalog, &self.session);
        for mut stmt in statements {
            if !self.params.is_empty() {
                stmt.bind_params(&self.params)?;
                println!("params: {}", pretty::format_row(&self.params));
            }
            match try_fast_plan(&ctx, &stmt) {
                Some(plan) => println!("{}", render_explain(plan.as_physical(), self.style)),
                None => println!("{FALLBACK}"),
            }
        }
        Ok(())
    }

    /// Handle a `.command`. Returns false to leave the loop.
    fn meta_command(&mut self, line: &str) -> Result<bool> {
        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some(".quit" | ".exit"), None, None) => return Ok(false),
            (Some(".help"), None, None) => print_help(),
            (Some(".tables"), None, None) => self.print_tables(),
            (Some(".session"), None, None) => println!("{:#?}", self.session),
            (Some(".use"), Some(db), None) => self.session.current_db = db.to_lowercase(),
            (Some(".params"), ..) => {
                self.params = words_after(line, ".params").map(parse_param).collect();
            }
            (Some(".set"), Some(flag), Some(value)) => self.set_flag(flag, value)?,
            _ => bail!("unknown command {line:?}; try .help"),
        }
        Ok(true)
    }

    fn set_flag(&mut self, flag: &str, value: &str) -> Result<()> {
        let on = match value {
            "on" | "true" | "1" => true,
            "off" | "false" | "0" => false,
            other => bail!("expected on or off, got {other:?}"),
        };
        match flag {
            "autocommit" => self.session.autocommit = on,
            "in_txn" => self.session.in_txn = on,
            "pessimistic" => self.session.pessimistic = on,
            other => bail!("unknown session flag {other:?}"),
        }
        debug!(flag, on, "session flag changed");
        Ok(())
    }

    fn print_tables(&self) {
        let rows = self
            .catalog
            .tables()
            .map(|t| {
                let indexes = t
                    .indexes
                    .iter()
                    .map(|i| {
                        let kind = if i.unique { "unique " } else { "" };
                        format!("{kind}{}({})", i.name, i.column_names().collect::<Vec<_>>().join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                vec![
                    format!("{}.{}", t.db, t.name),
                    t.handle_column().map(|c| c.name.clone()).unwrap_or_default(),
                    indexes,
                ]
            })
            .collect();
        println!(
            "{}",
            pretty::render_string_table(&["table", "handle", "indexes"], rows, self.style)
        );
    }
}

fn words_after<'a>(line: &'a str, command: &str) -> impl Iterator<Item = &'a str> {
    line.trim_start()
        .strip_prefix(command)
        .unwrap_or_default()
        .split_whitespace()
}

/// Read statements until `.quit` or end of input.
fn interactive_loop(shell: &mut Shell) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!();
    println!("Type '.help' for commands or '.quit' to exit");
    println!();

    loop {
        match rl.readline("fastplan> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                let outcome = if line.starts_with('.') {
                    shell.meta_command(line)
                } else {
                    shell.plan_and_print(line).map(|()| true)
                };
                match outcome {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    Ok(())
}

fn print_help() {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║                      fastplan Help                         ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Commands:                                                 ║");
    println!("║    .help                 Show this help message            ║");
    println!("║    .tables               List tables, handles and indexes  ║");
    println!("║    .session              Show the session state            ║");
    println!("║    .use <db>             Change the current database       ║");
    println!("║    .params <v> ...       Values for ? placeholders         ║");
    println!("║    .set <flag> on|off    autocommit, in_txn, pessimistic   ║");
    println!("║    .quit, .exit          Exit                              ║");
    println!("║                                                            ║");
    println!("║  Statements planned:                                       ║");
    println!("║    SELECT ... WHERE pk = 1                                 ║");
    println!("║    SELECT ... WHERE a = 1 AND b = 'x'   (unique index)     ║");
    println!("║    SELECT ... WHERE pk IN (1, 2, 3)                        ║");
    println!("║    UPDATE ... SET c = c + 1 WHERE pk = 1                   ║");
    println!("║    DELETE FROM ... WHERE pk = 1                            ║");
    println!("╚════════════════════════════════════════════════════════════╝");
}
