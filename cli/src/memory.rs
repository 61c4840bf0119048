use aether_ledger::Ledger;
use aether_ledger::LedgerConfig;
use aether_ledger::factory;
use aether_ledger::types::*;
use anyhow::Context;
use chrono::DateTime;
use chrono::Utc;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::io::Read as _;
use std::path::PathBuf;

/// Inspect and edit the local experience ledger.
#[derive(Debug, Parser)]
#[command(name = "aether-ledger", version)]
pub struct Cli {
    /// Ledger home directory (default `~/.aether/ledger`).
    #[arg(long, env = "AETHER_LEDGER_HOME", global = true)]
    pub home: Option<PathBuf>,
    /// Storage backend: `file` or `sqlite`.
    #[arg(long, global = true)]
    pub backend: Option<String>,
    /// Storage key the document lives under.
    #[arg(long, global = true)]
    pub key: Option<String>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record and query experiences.
    Experience {
        #[command(subcommand)]
        cmd: ExperienceCommand,
    },
    /// Learned preferences.
    #[command(alias = "pref")]
    Preference {
        #[command(subcommand)]
        cmd: PreferenceCommand,
    },
    /// Tracked goals.
    Goal {
        #[command(subcommand)]
        cmd: GoalCommand,
    },
    /// Tracked learnings.
    Learning {
        #[command(subcommand)]
        cmd: LearningCommand,
    },
    /// Relationships with external entities.
    Relationship {
        #[command(subcommand)]
        cmd: RelationshipCommand,
    },
    /// Print the derived analytics.
    Stats,
    /// Write the whole document to stdout.
    Export,
    /// Replace the whole document with JSON read from stdin.
    Import,
    /// Copy the file-backed document into a SQLite database.
    Migrate {
        /// Directory of the file backend
        #[arg(long)]
        dir: PathBuf,
        /// Destination SQLite database file
        #[arg(long)]
        db: PathBuf,
    },
    /// Remove every record.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ExperienceCommand {
    Add {
        content: String,
        #[arg(long = "type", value_parser = parse_enum::<ExperienceKind>, default_value = "interaction")]
        kind: ExperienceKind,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        impact: f64,
        #[arg(long, default_value_t = 0.0)]
        learning: f64,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Context entry as `key=value`; values that parse as JSON are stored as JSON.
        #[arg(long = "context", value_parser = parse_key_value)]
        context: Vec<(String, String)>,
    },
    List {
        #[arg(long = "type", value_parser = parse_enum::<ExperienceKind>)]
        kind: Option<ExperienceKind>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        #[arg(long, allow_negative_numbers = true)]
        min_impact: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        max_impact: Option<f64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    Search {
        text: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum PreferenceCommand {
    Set {
        #[arg(value_parser = parse_enum::<PreferenceCategory>)]
        category: PreferenceCategory,
        name: String,
        value: f64,
        #[arg(long)]
        evidence: Option<String>,
    },
    List {
        #[arg(long, value_parser = parse_enum::<PreferenceCategory>)]
        category: Option<PreferenceCategory>,
    },
}

#[derive(Debug, Subcommand)]
pub enum GoalCommand {
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_enum::<GoalCategory>, default_value = "personal")]
        category: GoalCategory,
        #[arg(long, default_value_t = 5)]
        priority: u8,
        #[arg(long)]
        deadline: Option<DateTime<Utc>>,
        /// Title of a sub-goal; repeatable.
        #[arg(long = "sub")]
        sub_goals: Vec<String>,
    },
    Progress {
        id: String,
        progress: f64,
        /// Metric as `name=number`; repeatable.
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, f64)>,
    },
    Status {
        id: String,
        #[arg(value_parser = parse_enum::<GoalStatus>)]
        status: GoalStatus,
    },
    List {
        #[arg(long, value_parser = parse_enum::<GoalStatus>)]
        status: Option<GoalStatus>,
    },
}

#[derive(Debug, Subcommand)]
pub enum LearningCommand {
    Add {
        topic: String,
        concept: String,
        #[arg(long, default_value_t = 0.0)]
        understanding: f64,
        #[arg(long, default_value_t = 0.0)]
        confidence: f64,
        #[arg(long = "application")]
        applications: Vec<String>,
        #[arg(long = "related")]
        related_topics: Vec<String>,
    },
    /// Record a review, optionally updating understanding or confidence.
    Review {
        id: String,
        #[arg(long)]
        understanding: Option<f64>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    List {
        #[arg(long)]
        topic: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RelationshipCommand {
    Update {
        name: String,
        #[arg(value_parser = parse_enum::<EntityType>)]
        entity_type: EntityType,
        #[arg(long)]
        trust: Option<f64>,
        #[arg(long)]
        familiarity: Option<f64>,
        #[arg(long)]
        strength: Option<f64>,
        /// Preference entry as `key=value`; repeatable.
        #[arg(long = "pref", value_parser = parse_key_value)]
        preferences: Vec<(String, String)>,
    },
    List {
        #[arg(long = "type", value_parser = parse_enum::<EntityType>)]
        entity_type: Option<EntityType>,
    },
}

/// Parse a lowercase enum name the same way the on-disk format spells it.
fn parse_enum<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown value: {s}"))
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected key=value, got {s}")),
    }
}

fn parse_metric(s: &str) -> Result<(String, f64), String> {
    let (k, v) = parse_key_value(s)?;
    let n = v
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("metric {k}: not a number: {v}"))?;
    Ok((k, n))
}

fn to_context(pairs: Vec<(String, String)>) -> ContextMap {
    pairs
        .into_iter()
        .map(|(k, v)| {
            let value = serde_json::from_str(&v).unwrap_or(serde_json::Value::String(v));
            (k, value)
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_home(home: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(h) = home {
        return Ok(h);
    }
    let Some(dir) = dirs::home_dir() else {
        anyhow::bail!("cannot determine home directory; pass --home");
    };
    Ok(dir.join(".aether").join("ledger"))
}

/// Ledger home plus its config: `config.toml`, then env, then `--key`.
fn resolve_config(cli: &Cli) -> anyhow::Result<(PathBuf, LedgerConfig)> {
    let home = resolve_home(cli.home.clone())?;
    let mut config = LedgerConfig::load(&home.join("config.toml"))
        .context("reading ledger config")?
        .with_env_overrides()?;
    if let Some(key) = &cli.key {
        config.storage_key = key.clone();
    }
    Ok((home, config))
}

fn open_ledger(cli: &Cli) -> anyhow::Result<Ledger> {
    let (home, config) = resolve_config(cli)?;
    let backend = match cli.backend.as_deref() {
        Some(name) => match factory::parse_backend(name) {
            Some(be) => Some(be),
            None => anyhow::bail!("unknown backend: {name}"),
        },
        None => None,
    };
    tracing::debug!("opening ledger {:?} in {}", config.storage_key, home.display());
    Ok(Ledger::open(factory::open_store(&home, backend), config))
}

/// Execute a ledger command.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    if let Command::Migrate { dir, db } = &cli.cmd {
        let key = resolve_config(&cli)?.1.storage_key;
        if aether_ledger::migrate::migrate_file_to_sqlite(dir, db, &key)? {
            println!("Migrated {key}");
        } else {
            println!("Nothing stored under {key}");
        }
        return Ok(());
    }

    let mut ledger = open_ledger(&cli)?;
    match cli.cmd {
        Command::Experience { cmd } => match cmd {
            ExperienceCommand::Add {
                content,
                kind,
                impact,
                learning,
                tags,
                context,
            } => {
                let id = ledger.add_experience(ExperienceInput {
                    kind,
                    content,
                    emotional_impact: impact,
                    learning_value: learning,
                    tags,
                    context: to_context(context),
                });
                println!("{id}");
            }
            ExperienceCommand::List {
                kind,
                tags,
                since,
                until,
                min_impact,
                max_impact,
                limit,
            } => {
                let mut items = ledger.get_experiences(&ExperienceFilter {
                    kind,
                    tags,
                    since,
                    until,
                    min_emotional_impact: min_impact,
                    max_emotional_impact: max_impact,
                });
                if let Some(n) = limit {
                    items.truncate(n);
                }
                print_json(&items)?;
            }
            ExperienceCommand::Search { text } => {
                print_json(&ledger.search_experiences(&text))?;
            }
        },
        Command::Preference { cmd } => match cmd {
            PreferenceCommand::Set {
                category,
                name,
                value,
                evidence,
            } => {
                let id = ledger.update_preference(category, &name, value, evidence.as_deref());
                println!("{id}");
            }
            PreferenceCommand::List { category } => {
                print_json(&ledger.get_preferences(category))?;
            }
        },
        Command::Goal { cmd } => match cmd {
            GoalCommand::Add {
                title,
                description,
                category,
                priority,
                deadline,
                sub_goals,
            } => {
                let sub_goals = sub_goals
                    .into_iter()
                    .map(|title| GoalInput {
                        title,
                        category,
                        priority,
                        ..Default::default()
                    })
                    .collect();
                let id = ledger.add_goal(GoalInput {
                    title,
                    description,
                    category,
                    priority,
                    deadline,
                    sub_goals,
                    metrics: BTreeMap::new(),
                });
                println!("{id}");
            }
            GoalCommand::Progress {
                id,
                progress,
                metrics,
            } => {
                let metrics = (!metrics.is_empty()).then(|| metrics.into_iter().collect());
                if !ledger.update_goal_progress(&id, progress, metrics) {
                    anyhow::bail!("goal id not found: {id}");
                }
            }
            GoalCommand::Status { id, status } => {
                if !ledger.set_goal_status(&id, status) {
                    anyhow::bail!("goal id not found: {id}");
                }
            }
            GoalCommand::List { status } => {
                print_json(&ledger.get_goals(status))?;
            }
        },
        Command::Learning { cmd } => match cmd {
            LearningCommand::Add {
                topic,
                concept,
                understanding,
                confidence,
                applications,
                related_topics,
            } => {
                let id = ledger.add_learning(LearningInput {
                    topic,
                    concept,
                    understanding,
                    confidence,
                    applications,
                    related_topics,
                });
                println!("{id}");
            }
            LearningCommand::Review {
                id,
                understanding,
                confidence,
            } => {
                let patch = LearningPatch {
                    understanding,
                    confidence,
                    ..Default::default()
                };
                if !ledger.update_learning(&id, patch) {
                    anyhow::bail!("learning id not found: {id}");
                }
            }
            LearningCommand::List { topic } => {
                print_json(&ledger.get_learnings(topic.as_deref()))?;
            }
        },
        Command::Relationship { cmd } => match cmd {
            RelationshipCommand::Update {
                name,
                entity_type,
                trust,
                familiarity,
                strength,
                preferences,
            } => {
                let id = ledger.update_relationship(
                    &name,
                    entity_type,
                    RelationshipPatch {
                        trust_level: trust,
                        familiarity,
                        relationship_strength: strength,
                        shared_experiences: Vec::new(),
                        preferences: to_context(preferences),
                    },
                );
                println!("{id}");
            }
            RelationshipCommand::List { entity_type } => {
                print_json(&ledger.get_relationships(entity_type))?;
            }
        },
        Command::Stats => {
            print_json(&ledger.get_memory_analytics())?;
        }
        Command::Export => {
            println!("{}", ledger.export_memory()?);
        }
        Command::Import => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            ledger
                .import_memory(&input)
                .context("importing memory document")?;
            let n = ledger.document().experiences.len();
            println!("Imported {n} experiences");
        }
        Command::Clear => {
            ledger.clear_memory();
        }
        Command::Migrate { .. } => unreachable!(),
    }

    if !ledger.is_durable() {
        ledger.flush().context("saving ledger")?;
    }
    Ok(())
}
