//! dlrule: CLI tool for checking and evaluating download organizer rules.

use clap::{Parser, Subcommand};
use dlrule::{
    default_rules, export_rules, DownloadItem, EngineConfig, EngineProfile, Evaluation,
    JsonFileRuleStore, Organizer, RuleStore,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dlrule")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Check and evaluate download organizer rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a download item against a rule file
    Evaluate {
        /// Rule file (JSON array, or local/sync storage shape)
        #[arg(short, long)]
        rules: PathBuf,

        /// Download item JSON file
        #[arg(short, long)]
        item: PathBuf,

        /// URL of the active tab
        #[arg(short, long)]
        tab_url: Option<String>,

        /// Engine config file (JSON or YAML)
        #[arg(short, long, conflicts_with = "profile")]
        config: Option<PathBuf>,

        /// Engine profile: strict, lenient or legacy
        #[arg(short, long)]
        profile: Option<String>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Report problems in a rule file
    Check {
        /// Rule file
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Write the default rule list
    Defaults {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a rule file in any storage shape to the export format
    Export {
        /// Input rule file
        #[arg(short, long)]
        rules: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Evaluate {
            rules,
            item,
            tab_url,
            config,
            profile,
            verbose,
        } => evaluate(
            &rules,
            &item,
            tab_url.as_deref(),
            config.as_deref(),
            profile.as_deref(),
            verbose,
        ),
        Commands::Check { rules } => check(&rules),
        Commands::Defaults { output } => defaults(output.as_deref()),
        Commands::Export { rules, output } => export(&rules, &output),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_config(
    config: Option<&Path>,
    profile: Option<&str>,
) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config {
        return Ok(EngineConfig::load(path)?);
    }
    match profile {
        Some(name) => EngineProfile::parse(name)
            .map(|p| p.config())
            .ok_or_else(|| format!("unknown profile: {}", name).into()),
        None => Ok(EngineConfig::default()),
    }
}

fn evaluate(
    rules: &Path,
    item: &Path,
    tab_url: Option<&str>,
    config: Option<&Path>,
    profile: Option<&str>,
    verbose: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let config = load_config(config, profile)?;
    let store = JsonFileRuleStore::new(rules);
    let organizer = Organizer::from_store(&store, config)?;

    if verbose {
        println!("Loaded {} rules from {:?}", organizer.rules().len(), rules);
    }

    let item: DownloadItem = serde_json::from_str(&fs::read_to_string(item)?)?;

    match organizer.evaluate_with_tab(&item, tab_url) {
        Evaluation::Suggested {
            rule_index,
            suggestion,
        } => {
            if verbose {
                println!("Matched rule {}", rule_index);
            }
            println!("{}", serde_json::to_string_pretty(&suggestion)?);
        }
        Evaluation::RenderFailed { rule_index, error } => {
            if verbose {
                println!("Rule {} matched but did not render: {}", rule_index, error);
            }
            println!("no suggestion");
        }
        Evaluation::NoMatch => println!("no suggestion"),
    }
    Ok(true)
}

fn check(rules: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let rules = JsonFileRuleStore::new(rules).get_rules()?;
    let mut ok = true;

    for (index, rule) in rules.iter().enumerate() {
        let issues = rule.validate();
        if issues.is_empty() {
            continue;
        }

        let label = rule.description.as_deref().unwrap_or(&rule.pattern);
        println!("Rule {} ({}):", index, label);
        for issue in issues {
            let level = if issue.is_error() { "error" } else { "warning" };
            println!("  {}: {}", level, issue);
            if issue.is_error() {
                ok = false;
            }
        }
    }

    println!("Checked {} rules", rules.len());
    Ok(ok)
}

fn defaults(output: Option<&Path>) -> Result<bool, Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            JsonFileRuleStore::new(path).set_rules(&default_rules())?;
            println!("Default rules written to {:?}", path);
        }
        None => println!("{}", export_rules(&default_rules())?),
    }
    Ok(true)
}

fn export(rules: &Path, output: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let list = JsonFileRuleStore::new(rules).get_rules()?;
    JsonFileRuleStore::new(output).set_rules(&list)?;
    println!("Exported {} rules: {:?} -> {:?}", list.len(), rules, output);
    Ok(true)
}
