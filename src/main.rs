use std::{
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser as ClapParser, Subcommand};
use rql_fixtures::{
    Language, RunConfig,
    cli::{
        self, CasesOptions, CliError, EvalOptions, EvalResult, RunOptions,
        logging::{self, Verbosity},
    },
    language,
};

#[derive(ClapParser)]
#[command(name = "rql-fixtures")]
#[command(about = "Validate and run polyglot ReQL driver test fixtures")]
#[command(version)]
struct Cli {
    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fixtures against the reference evaluator
    Run {
        /// Fixture files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Comma separated languages (py,js,rb); defaults to $RQL_FIXTURES_LANGS or all
        #[arg(short, long)]
        lang: Option<String>,

        /// YAML file with languages, fail_fast and filter
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop at the first failing case
        #[arg(long)]
        fail_fast: bool,

        /// Only run cases whose expression contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check fixtures for schema, syntax and definition-order problems
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show how a fixture resolves for one language
    Cases {
        file: PathBuf,

        #[arg(short, long, default_value = "py")]
        lang: Language,
    },

    /// Evaluate one expression
    Eval {
        /// The expression (reads from stdin if not provided)
        expression: Option<String>,

        #[arg(short, long, default_value = "py")]
        lang: Language,

        /// Bind a name to a JSON value before evaluating (NAME=JSON)
        #[arg(short, long = "bind")]
        bindings: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only parse and compile, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet));

    let result = match cli.command {
        Commands::Run {
            files,
            lang,
            config,
            fail_fast,
            filter,
            json,
        } => run_fixtures(files, lang, config, fail_fast, filter, json),
        Commands::Validate { files } => run_validate(&files),
        Commands::Cases { file, lang } => cli::list_cases(&CasesOptions {
            file,
            language: lang,
        })
        .map(|lines| lines.iter().for_each(|line| println!("{}", line))),
        Commands::Eval {
            expression,
            lang,
            bindings,
            pretty,
            syntax_only,
        } => run_eval(expression, lang, bindings, pretty, syntax_only),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_fixtures(
    files: Vec<PathBuf>,
    lang: Option<String>,
    config: Option<PathBuf>,
    fail_fast: bool,
    filter: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    // Flags override the config file, which overrides the environment.
    let mut config = match config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::from_env()?,
    };
    if let Some(lang) = lang {
        config.languages = language::parse_list(&lang)?;
    }
    config.fail_fast |= fail_fast;
    if filter.is_some() {
        config.filter = filter;
    }

    let reports = cli::execute_run(&RunOptions { files, config })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", report);
        }
    }

    let failed: usize = reports.iter().map(|r| r.failed).sum();
    if failed > 0 {
        return Err(CliError::Failed(failed));
    }
    Ok(())
}

fn run_validate(files: &[PathBuf]) -> Result<(), CliError> {
    let mut total = 0;
    for (name, issues) in cli::execute_validate(files)? {
        if issues.is_empty() {
            println!("{}: ok", name);
        }
        for issue in &issues {
            println!("{}: {}", name, issue);
        }
        total += issues.len();
    }
    if total > 0 {
        return Err(CliError::Failed(total));
    }
    Ok(())
}

fn run_eval(
    expression: Option<String>,
    language: Language,
    bindings: Vec<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let expression = match expression {
        Some(s) => s,
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
        None => return Err(CliError::NoInput),
    };

    let options = EvalOptions {
        expression,
        language,
        bindings,
        syntax_only,
    };

    match cli::execute_eval(&options)? {
        EvalResult::SyntaxValid => println!("Syntax is valid"),
        EvalResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
