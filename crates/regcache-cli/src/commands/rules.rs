//! Rules command - inspect and reset the rule cache.

use clap::{Args, Subcommand};
use console::style;

use regcache_core::store::RuleRecord;
use regcache_core::{RuleAssignment, RuleStore, SqliteRuleStore};

use super::GlobalOptions;

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List cached rules and conflicts
    List {
        /// Only show this document type
        #[arg(short, long)]
        label: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the state of one (label, field) key
    Show {
        /// Document type
        label: String,
        /// Field name
        field: String,
    },

    /// Delete the rule cache and recreate it empty
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(args: RulesArgs, global: &GlobalOptions) -> anyhow::Result<()> {
    let config = global.load_config()?;

    match args.command {
        RulesCommand::List { label, json } => {
            let store = global.open_store(&config)?;
            let records: Vec<RuleRecord> = store
                .records()?
                .into_iter()
                .filter(|r| label.as_deref().is_none_or(|l| r.label == l))
                .collect();
            list_rules(&records, json)
        }
        RulesCommand::Show { label, field } => {
            let store = global.open_store(&config)?;
            let assignment = store.assignment(&label, &field)?;
            println!("{} / {}: {}", label, field, describe(&assignment));
            Ok(())
        }
        RulesCommand::Reset { yes } => {
            let path = global.db_path(&config);
            if !yes {
                anyhow::bail!(
                    "Refusing to delete {} without --yes",
                    path.display()
                );
            }
            SqliteRuleStore::reset(&path, config.store.busy_timeout())?;
            println!(
                "{} Rule cache reset at {}",
                style("✓").green(),
                path.display()
            );
            Ok(())
        }
    }
}

fn list_rules(records: &[RuleRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No rules cached.", style("ℹ").blue());
        return Ok(());
    }

    println!("{:<16} {:<24} {:<16} UPDATED", "LABEL", "FIELD", "RULE");
    for record in records {
        println!(
            "{:<16} {:<24} {:<16} {}",
            record.label,
            record.field,
            describe(&record.assignment),
            record.updated_at.as_deref().unwrap_or("-")
        );
    }

    let conflicts = records
        .iter()
        .filter(|r| r.assignment.is_conflicting())
        .count();
    println!();
    println!(
        "{} active, {} conflicting",
        style(records.len() - conflicts).green(),
        style(conflicts).yellow()
    );
    Ok(())
}

fn describe(assignment: &RuleAssignment) -> String {
    match assignment {
        RuleAssignment::Unassigned => "unassigned".to_string(),
        RuleAssignment::Active(rule) => rule.clone(),
        RuleAssignment::Conflicting => "conflicting".to_string(),
    }
}
