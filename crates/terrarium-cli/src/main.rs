// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod render;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use runtime::{ScopedRows, open_prefs, require_scope};
use std::env;
use std::fmt::Write as _;
use std::path::PathBuf;
use terrarium_app::{KeyValueStore, Scope};
use terrarium_table::{Explorer, RowSource};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TERRARIUM_LOG";
const DEMO_SEED: u64 = 2026;
const DEMO_ROWS: usize = 120;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `terrarium --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    init_logging(config.log_level());

    print!("{}", execute(&options, &config)?);
    Ok(())
}

fn init_logging(config_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(config_level));
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("logging disabled: {error}");
    }
}

/// Runs one explorer session for the parsed flags and returns what should be
/// printed.
fn execute(options: &CliOptions, config: &Config) -> Result<String> {
    let source = if options.demo {
        ScopedRows::new(
            terrarium_testkit::plant_rows(DEMO_SEED, DEMO_ROWS),
            config.scope_field(),
        )
    } else if let Some(path) = &options.rows_path {
        ScopedRows::from_json_file(path, config.scope_field())?
    } else if options.check_only {
        ScopedRows::new(Vec::new(), config.scope_field())
    } else {
        bail!("no rows to explore; pass --rows <file.json> or --demo");
    };

    let prefs = open_prefs(config, options.demo)?;
    if options.check_only {
        return Ok(String::new());
    }

    let mut out = String::new();
    if options.list_scopes {
        for scope in source.scopes()? {
            writeln!(out, "{}", scope.label())?;
        }
        return Ok(out);
    }

    require_scope(&source, &options.scope)?;
    let mut explorer = Explorer::new(prefs, config.explorer_options());
    explorer.refresh_from(&source, options.scope.clone())?;
    apply_actions(&mut explorer, options)?;

    out.push_str(&render::render_page(&explorer.view()));
    if let Some((column, text)) = &options.preview {
        let count = explorer.preview_column_filter(column, text);
        writeln!(out, "preview {column}={text}: {count} rows")?;
    }
    Ok(out)
}

fn apply_actions<S: KeyValueStore>(explorer: &mut Explorer<S>, options: &CliOptions) -> Result<()> {
    if options.reset {
        explorer.reset_all();
    }

    for (column, text) in &options.filters {
        require_column(explorer, column)?;
        explorer.set_column_filter(column, text);
    }
    if let Some(query) = &options.query {
        explorer.set_query(query);
    }
    for column in &options.sorts {
        require_column(explorer, column)?;
        explorer.toggle_sort(column);
    }
    if let Some((column, _)) = &options.preview {
        require_column(explorer, column)?;
    }

    if let Some(shown) = options.all_columns {
        explorer.set_all_columns(shown);
    }
    for column in &options.toggle_columns {
        require_column(explorer, column)?;
        explorer.toggle_column(column);
    }

    if let Some(page) = options.page {
        explorer.set_page(page);
    }
    Ok(())
}

fn require_column<S: KeyValueStore>(explorer: &Explorer<S>, column: &str) -> Result<()> {
    if explorer.registry().contains(column) || explorer.registry().is_empty() {
        return Ok(());
    }
    bail!(
        "unknown column {column:?}; available: {}",
        explorer.registry().names().join(", ")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    rows_path: Option<PathBuf>,
    scope: Scope,
    query: Option<String>,
    filters: Vec<(String, String)>,
    preview: Option<(String, String)>,
    sorts: Vec<String>,
    page: Option<usize>,
    toggle_columns: Vec<String>,
    all_columns: Option<bool>,
    reset: bool,
    demo: bool,
    list_scopes: bool,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

impl CliOptions {
    fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            rows_path: None,
            scope: Scope::All,
            query: None,
            filters: Vec::new(),
            preview: None,
            sorts: Vec::new(),
            page: None,
            toggle_columns: Vec::new(),
            all_columns: None,
            reset: false,
            demo: false,
            list_scopes: false,
            print_config_path: false,
            print_example: false,
            check_only: false,
            show_help: false,
        }
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions::new(default_config_path);

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let flag = arg.as_ref();
        let mut value = |what: &str| {
            iter.next()
                .map(|value| value.as_ref().to_owned())
                .ok_or_else(|| anyhow!("{flag} requires {what}"))
        };
        match flag {
            "--config" => {
                options.config_path = PathBuf::from(value("a file path")?);
            }
            "--rows" => {
                options.rows_path = Some(PathBuf::from(value("a file path")?));
            }
            "--scope" => {
                options.scope = Scope::parse(&value("a scope name")?);
            }
            "--query" => {
                options.query = Some(value("search text")?);
            }
            "--filter" => {
                options
                    .filters
                    .push(parse_assignment(flag, &value("COLUMN=TEXT")?)?);
            }
            "--preview" => {
                options.preview = Some(parse_assignment(flag, &value("COLUMN=TEXT")?)?);
            }
            "--sort" => {
                options.sorts.push(value("a column name")?);
            }
            "--page" => {
                let raw = value("a page number")?;
                let page = raw
                    .parse::<usize>()
                    .ok()
                    .filter(|page| *page >= 1)
                    .ok_or_else(|| anyhow!("--page expects a number starting at 1, got {raw:?}"))?;
                options.page = Some(page - 1);
            }
            "--toggle-column" => {
                options.toggle_columns.push(value("a column name")?);
            }
            "--show-all-columns" => {
                options.all_columns = Some(true);
            }
            "--hide-all-columns" => {
                options.all_columns = Some(false);
            }
            "--reset" => {
                options.reset = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--list-scopes" => {
                options.list_scopes = true;
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn parse_assignment(flag: &str, raw: &str) -> Result<(String, String)> {
    let (column, text) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("{flag} expects COLUMN=TEXT, got {raw:?}"))?;
    let column = column.trim();
    if column.is_empty() {
        bail!("{flag} expects a column name before '=', got {raw:?}");
    }
    Ok((column.to_owned(), text.to_owned()))
}

fn print_help() {
    println!("terrarium: explore a plant inventory table");
    println!("  --rows <file.json>       Rows to explore (array, or {{\"plants\": [...]}})");
    println!("  --demo                   Explore generated demo rows (preferences kept in memory)");
    println!("  --scope <name>           Load one scope (for example \"Desert Dome\"); default All");
    println!("  --list-scopes            Print available scopes");
    println!("  --query <text>           Search every column");
    println!("  --filter <col>=<text>    Filter one column (saved); empty text clears it");
    println!("  --preview <col>=<text>   Count rows a column filter would leave, without saving");
    println!("  --sort <col>             Cycle sort on a column (repeat for descending)");
    println!("  --page <n>               Show page n (1-based)");
    println!("  --toggle-column <col>    Show or hide a column (saved)");
    println!("  --show-all-columns       Show every column (saved)");
    println!("  --hide-all-columns       Hide every column (saved)");
    println!("  --reset                  Clear search, filters, sort and hidden columns first");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --check                  Validate config + preference storage");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, execute, parse_cli_args};
    use crate::config::Config;
    use anyhow::Result;
    use std::path::PathBuf;
    use terrarium_app::Scope;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/terrarium-config.toml")
    }

    fn file_config(dir: &tempfile::TempDir) -> Result<Config> {
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "version = 1\n[storage]\nbackend = \"file\"\npath = {:?}\n[table]\npage_size = 2\n",
                dir.path().join("prefs.json").display().to_string()
            ),
        )?;
        Config::load(&path)
    }

    fn rows_file(dir: &tempfile::TempDir) -> Result<PathBuf> {
        let path = dir.path().join("plants.json");
        std::fs::write(
            &path,
            r#"{"plants":[
                {"common_name":"Agave","qty":"6+","dome":"Desert Dome","display":true},
                {"common_name":"Banana","qty":"10","dome":"Tropical Dome","display":false},
                {"common_name":"Cacao","qty":"5","dome":"Tropical Dome","display":true},
                {"common_name":"Ocotillo","qty":"unknown","dome":"Desert Dome","display":true}
            ]}"#,
        )?;
        Ok(path)
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(options, CliOptions::new(default_options_path()));
        Ok(())
    }

    #[test]
    fn parse_cli_args_collects_explorer_actions() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--rows",
                "plants.json",
                "--scope",
                "Desert Dome",
                "--filter",
                "notes=needs water",
                "--filter",
                "dome=",
                "--sort",
                "qty",
                "--sort",
                "qty",
                "--page",
                "2",
                "--preview",
                "status=healthy",
                "--hide-all-columns",
                "--toggle-column",
                "qty",
            ],
            default_options_path(),
        )?;
        assert_eq!(options.rows_path, Some(PathBuf::from("plants.json")));
        assert_eq!(options.scope, Scope::Named("Desert Dome".to_owned()));
        assert_eq!(
            options.filters,
            vec![
                ("notes".to_owned(), "needs water".to_owned()),
                ("dome".to_owned(), String::new()),
            ]
        );
        assert_eq!(options.sorts, vec!["qty", "qty"]);
        assert_eq!(options.page, Some(1));
        assert_eq!(
            options.preview,
            Some(("status".to_owned(), "healthy".to_owned()))
        );
        assert_eq!(options.all_columns, Some(false));
        assert_eq!(options.toggle_columns, vec!["qty"]);
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));

        let error = parse_cli_args(vec!["--filter", "dome"], default_options_path())
            .expect_err("filter without '=' should fail");
        assert!(error.to_string().contains("COLUMN=TEXT"));

        let error = parse_cli_args(vec!["--page", "0"], default_options_path())
            .expect_err("page 0 should fail");
        assert!(error.to_string().contains("starting at 1"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn execute_renders_scope_sorted_page_and_preview() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = file_config(&dir)?;
        let mut options = CliOptions::new(default_options_path());
        options.rows_path = Some(rows_file(&dir)?);
        options.scope = Scope::Named("Tropical Dome".to_owned());
        options.sorts = vec!["qty".to_owned()];
        options.preview = Some(("display".to_owned(), "yes".to_owned()));

        let out = execute(&options, &config)?;

        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Tropical Dome | 2 rows | page 1/1 | sort qty asc");
        assert_eq!(lines[1], "common_name\tqty ↑\tdome\tdisplay");
        assert_eq!(lines[2], "Cacao\t5\tTropical Dome\ttrue");
        assert_eq!(lines[3], "Banana\t10\tTropical Dome\tfalse");
        assert_eq!(lines[4], "preview display=yes: 1 rows");
        Ok(())
    }

    #[test]
    fn execute_persists_filters_between_runs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = file_config(&dir)?;
        let mut options = CliOptions::new(default_options_path());
        options.rows_path = Some(rows_file(&dir)?);
        options.filters = vec![("dome".to_owned(), "desert".to_owned())];
        execute(&options, &config)?;

        options.filters.clear();
        let out = execute(&options, &config)?;
        assert!(out.starts_with("2 rows (4 total in store) | page 1/1"), "{out}");
        assert!(out.contains("dome *"), "{out}");

        options.reset = true;
        let out = execute(&options, &config)?;
        assert!(out.starts_with("4 rows | page 1/2"), "{out}");
        Ok(())
    }

    #[test]
    fn execute_rejects_unknown_column_and_scope() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = file_config(&dir)?;
        let mut options = CliOptions::new(default_options_path());
        options.rows_path = Some(rows_file(&dir)?);
        options.sorts = vec!["height".to_owned()];
        let error = execute(&options, &config).expect_err("unknown column should fail");
        assert!(error.to_string().contains("unknown column \"height\""));

        options.sorts.clear();
        options.scope = Scope::Named("Moon Dome".to_owned());
        let error = execute(&options, &config).expect_err("unknown scope should fail");
        assert!(error.to_string().contains("unknown scope"));
        Ok(())
    }

    #[test]
    fn execute_lists_scopes_and_requires_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = file_config(&dir)?;
        let mut options = CliOptions::new(default_options_path());
        let error = execute(&options, &config).expect_err("missing rows should fail");
        assert!(error.to_string().contains("--rows"));

        options.rows_path = Some(rows_file(&dir)?);
        options.list_scopes = true;
        assert_eq!(
            execute(&options, &config)?,
            "All\nDesert Dome\nTropical Dome\n"
        );
        Ok(())
    }

    #[test]
    fn demo_runs_without_touching_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = file_config(&dir)?;
        let mut options = CliOptions::new(default_options_path());
        options.demo = true;
        options.toggle_columns = vec!["image_url".to_owned()];

        let out = execute(&options, &config)?;
        assert!(out.starts_with("120 rows | page 1/60 | 1 hidden"), "{out}");
        assert!(!dir.path().join("prefs.json").exists());
        Ok(())
    }
}
