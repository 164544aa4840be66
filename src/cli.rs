//! Non-interactive command line front end over [`Session`].

use std::{io::Write, path::PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use fin_config::{Config, ConfigManager};
use fin_domain::parse_date;

use crate::{
    errors::{FinError, Result},
    session::Session,
    utils::build_info,
};

#[derive(Debug, Parser)]
#[command(name = "fintrack_cli", about = "Recurring transactions and category suggestions")]
pub struct Cli {
    /// Data directory. Defaults to `$FINTRACK_HOME` or `~/.fintrack`.
    #[arg(long = "data-root", global = true)]
    pub data_root: Option<PathBuf>,

    /// Act as this user instead of the configured one.
    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate every recurring transaction due up to today.
    DueCheck {
        #[arg(long, value_parser = parse_day)]
        today: Option<NaiveDate>,
    },
    /// Suggest a category for a transaction description.
    Suggest {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// Retrain the category classifier from the full history.
    Retrain,
    /// Print build information.
    Version,
}

fn parse_day(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("`{raw}` is not a YYYY-MM-DD date"))
}

/// Parses the process arguments and runs the selected command against stdout.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

pub fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    if let Command::Version = cli.command {
        crate::init();
        writeln!(out, "{}", build_info::current().summary())?;
        return Ok(());
    }

    let config = resolve_config(&cli)?;
    crate::init_with_filter(config.log_filter.as_deref());
    let mut session = Session::open(config)?;

    match cli.command {
        Command::DueCheck { today } => {
            let today = today.unwrap_or_else(|| session.today());
            let report = session.run_due_check_on(today)?;
            writeln!(
                out,
                "Generated {} transaction(s) from {} rule(s) as of {}",
                report.generated, report.rules_checked, today
            )?;
            for skipped in &report.skipped {
                writeln!(out, "Skipped rule {}: {}", skipped.rule_id, skipped.error)?;
            }
            for run in report.runs.iter().filter(|run| !run.is_complete()) {
                if let Some(err) = &run.error {
                    writeln!(out, "Rule {} stopped early: {}", run.rule_id, err)?;
                }
            }
        }
        Command::Suggest { description } => {
            let description = description.join(" ");
            if description.trim().is_empty() {
                return Err(FinError::InvalidInput("description must not be blank".into()));
            }
            match session.suggest_category(&description) {
                Some(suggestion) => writeln!(
                    out,
                    "{} ({:.0}%)",
                    suggestion.category,
                    suggestion.probability * 100.0
                )?,
                None => writeln!(out, "No suggestion")?,
            }
        }
        Command::Retrain => {
            session.retrain()?;
            if let Some(model) = session.classifier().model() {
                writeln!(
                    out,
                    "Classifier trained on {} example(s) across {} categories",
                    model.examples(),
                    model.categories().len()
                )?;
            }
        }
        Command::Version => {}
    }
    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let root = match &cli.data_root {
        Some(root) => root.clone(),
        None => Config::default().resolve_data_root(),
    };
    let mut config = ConfigManager::with_base_dir(root.clone())?.load()?;
    if config.data_root.is_none() || cli.data_root.is_some() {
        config.data_root = Some(root);
    }
    if let Some(user) = &cli.user {
        config.user_id = user.clone();
    }
    config.validate()?;
    Ok(config)
}
