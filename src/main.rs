//! ruleinf - command-line front end
//!
//! Parses rule files, binds them to data and prints results.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ruleinf::{EngineConfig, InfGraph, LogLevel, Reasoner, RuleParser, Store, Triple, TripleStore};

#[derive(Parser)]
#[command(name = "ruleinf")]
#[command(version)]
#[command(about = "Rule inference over triple graphs", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the standard search paths)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging; repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Step budget per forward run or backward query (0 for unlimited)
    #[arg(long, global = true, value_name = "N")]
    max_steps: Option<usize>,

    /// Table every backward goal
    #[arg(long, global = true)]
    table_all: bool,

    /// Log every rule firing
    #[arg(long, global = true)]
    trace: bool,

    /// Show triples with functor objects
    #[arg(long, global = true)]
    show_functors: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse rule files and print each rule in canonical form
    Check {
        /// Rule files
        #[arg(required = true, value_name = "RULES")]
        rules: Vec<PathBuf>,
    },

    /// Materialize the forward closure and print every triple
    Run {
        #[command(flatten)]
        input: Input,

        /// Print only triples concluded by rules
        #[arg(long)]
        deductions: bool,
    },

    /// Answer a pattern such as "(?x p *)"
    Query {
        #[command(flatten)]
        input: Input,

        /// Query pattern
        #[arg(short, long)]
        pattern: String,
    },

    /// Explain why a triple holds
    Why {
        #[command(flatten)]
        input: Input,

        /// Ground triple "(s p o)"
        #[arg(short, long)]
        triple: String,

        /// Print the proof tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration file
    Config,
}

#[derive(Args)]
struct Input {
    /// Rule files
    #[arg(required = true, value_name = "RULES")]
    rules: Vec<PathBuf>,

    /// Data files of "(s p o)" triples
    #[arg(short, long, value_name = "FILE")]
    data: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&cli, config.general.log_level);

    match &cli.command {
        Commands::Check { rules } => check(rules, &config),
        Commands::Run { input, deductions } => {
            let graph = bind(input, &config)?;
            let triples = if *deductions { graph.deductions() } else { graph.materialized() };
            print_triples(triples);
            info!(fired = graph.n_rules_fired(), "done");
            Ok(())
        }
        Commands::Query { input, pattern } => {
            let graph = bind(input, &config)?;
            let goal = parser(&config).parse_goal(pattern).context("Invalid query pattern")?;
            let answers = graph.find_all(&goal)?;
            print_triples(answers);
            Ok(())
        }
        Commands::Why { input, triple, json } => {
            let mut config = config.clone();
            config.reasoning.derivation_logging = true;
            let graph = bind(input, &config)?;
            let target = parse_triple(triple, &config)?;
            if !graph.contains(&target)? {
                bail!("{} does not hold", target);
            }
            let explanation = if *json { graph.explain_json(&target) } else { graph.explain(&target) };
            match explanation {
                Some(text) => print!("{}", text),
                None => println!("{} is a base fact", target),
            }
            Ok(())
        }
        Commands::Config => {
            print!("{}", EngineConfig::default_config_content());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = EngineConfig::load_from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => EngineConfig::load()?,
    };
    if let Some(steps) = cli.max_steps {
        config.reasoning.max_steps = steps;
    }
    config.reasoning.table_all |= cli.table_all;
    config.reasoning.trace |= cli.trace;
    if cli.show_functors {
        config.reasoning.hide_functor_triples = false;
    }
    if cli.quiet {
        config.general.log_level = LogLevel::Quiet;
    }
    Ok(config)
}

/// Install the subscriber; `RUST_LOG` wins over the configured level
fn init_logging(cli: &Cli, level: LogLevel) {
    let mut level = level.raised(cli.verbose);
    if cli.trace && level != LogLevel::Debug {
        level = LogLevel::Debug;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ruleinf={}", level.filter())));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn parser(config: &EngineConfig) -> RuleParser {
    RuleParser::with_prefixes(&config.prefixes)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn check(paths: &[PathBuf], config: &EngineConfig) -> Result<()> {
    let mut parser = parser(config);
    for path in paths {
        let rules = parser
            .parse_rules(&read(path)?)
            .with_context(|| format!("Parse error in {}", path.display()))?;
        for rule in &rules {
            rule.validate().with_context(|| format!("Invalid rule in {}", path.display()))?;
            println!("{}", rule);
        }
        debug!(file = %path.display(), rules = rules.len(), "checked");
    }
    Ok(())
}

fn bind(input: &Input, config: &EngineConfig) -> Result<InfGraph> {
    let mut parser = parser(config);
    let mut rules = Vec::new();
    for path in &input.rules {
        let parsed = parser
            .parse_rules(&read(path)?)
            .with_context(|| format!("Parse error in {}", path.display()))?;
        rules.extend(parsed);
    }
    let mut data = Store::new();
    for path in &input.data {
        let triples = parser
            .parse_triples(&read(path)?)
            .with_context(|| format!("Parse error in data file {}", path.display()))?;
        data.add_all(triples);
    }
    info!(rules = rules.len(), triples = data.len(), "loaded input");
    let graph = Reasoner::new(rules)
        .with_config(config.clone())
        .bind(data)
        .context("Failed to bind rules")?;
    Ok(graph)
}

fn parse_triple(text: &str, config: &EngineConfig) -> Result<Triple> {
    let mut triples = parser(config).parse_triples(text).context("Invalid triple")?;
    match (triples.pop(), triples.is_empty()) {
        (Some(triple), true) => Ok(triple),
        _ => bail!("expected exactly one triple, got {:?}", text),
    }
}

fn print_triples(mut triples: Vec<Triple>) {
    triples.sort_by_key(|t| t.to_string());
    for triple in triples {
        println!("{} .", triple);
    }
}
