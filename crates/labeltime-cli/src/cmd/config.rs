use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand, ValueEnum};
use labeltime_core::config::{
    EffectiveConfig, project_config_path, resolve_config, user_config_path,
};
use std::path::{Path, PathBuf};
use toml::Value;

use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show resolved or raw configuration
    Show(ShowArgs),
    /// Set a configuration key in project or user scope
    Set(SetArgs),
    /// Unset a configuration key in project or user scope
    Unset(UnsetArgs),
}

#[derive(Args, Debug, Default)]
struct ShowArgs {
    /// Show raw project config only
    #[arg(long, conflicts_with = "user")]
    project: bool,

    /// Show raw user config only
    #[arg(long)]
    user: bool,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. gitlab.project, analysis.days, user.output)
    key: String,

    /// New value (comma-separated for analysis.lane_labels)
    value: String,
}

#[derive(Args, Debug)]
struct UnsetArgs {
    /// Scope to mutate
    #[arg(long, default_value = "project")]
    scope: ConfigScope,

    /// Dot path key (e.g. gitlab.project, analysis.days, user.output)
    key: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigScope {
    Project,
    User,
}

/// Where a known key lives inside its file: a `[section]` table, or the
/// top level for user keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeySlot<'a> {
    section: Option<&'a str>,
    leaf: &'a str,
}

pub fn run_config(args: &ConfigArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    match &args.command {
        None => run_show(&ShowArgs::default(), project_root, output),
        Some(ConfigCommand::Show(show)) => run_show(show, project_root, output),
        Some(ConfigCommand::Set(set)) => run_set(set, project_root, output),
        Some(ConfigCommand::Unset(unset)) => run_unset(unset, project_root, output),
    }
}

fn run_show(args: &ShowArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    if args.project {
        let value = load_toml_table(&project_config_path(project_root))?;
        print_toml_or_json(&value, output)?;
        return Ok(());
    }

    if args.user {
        let value = load_toml_table(&scope_path(ConfigScope::User, project_root)?)?;
        print_toml_or_json(&value, output)?;
        return Ok(());
    }

    let effective = resolve_config(project_root)?;
    print_effective(&effective, output)
}

fn run_set(args: &SetArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, project_root)?;
    let mut value = load_toml_table(&path)?;
    apply_set(&mut value, args.scope, &args.key, &args.value)?;
    write_toml_table(&path, &value)?;
    render_mutation(output, "set", scope_label(args.scope), &args.key)
}

fn run_unset(args: &UnsetArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let path = scope_path(args.scope, project_root)?;
    let mut value = load_toml_table(&path)?;
    apply_unset(&mut value, args.scope, &args.key)?;
    write_toml_table(&path, &value)?;
    render_mutation(output, "unset", scope_label(args.scope), &args.key)
}

fn scope_path(scope: ConfigScope, project_root: &Path) -> Result<PathBuf> {
    match scope {
        ConfigScope::Project => Ok(project_config_path(project_root)),
        ConfigScope::User => {
            user_config_path().ok_or_else(|| anyhow!("Unable to resolve user config directory"))
        }
    }
}

fn apply_set(root: &mut Value, scope: ConfigScope, key: &str, raw: &str) -> Result<()> {
    let slot = known_key(scope, key)?;
    let parsed = parse_value(slot, key, raw)?;

    let mut table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    if let Some(section) = slot.section {
        table = table
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(toml::map::Map::new()))
            .as_table_mut()
            .ok_or_else(|| anyhow!("Section {section} must be a TOML table"))?;
    }

    table.insert(slot.leaf.to_string(), parsed);
    Ok(())
}

fn apply_unset(root: &mut Value, scope: ConfigScope, key: &str) -> Result<()> {
    let slot = known_key(scope, key)?;
    let table = root
        .as_table_mut()
        .ok_or_else(|| anyhow!("Config root must be a TOML table"))?;

    let Some(section) = slot.section else {
        table.remove(slot.leaf);
        return Ok(());
    };

    if let Some(section_entry) = table.get_mut(section)
        && let Some(section_table) = section_entry.as_table_mut()
    {
        section_table.remove(slot.leaf);
        if section_table.is_empty() {
            table.remove(section);
        }
    }

    Ok(())
}

fn known_key(scope: ConfigScope, key: &str) -> Result<KeySlot<'_>> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| anyhow!("Key must use section.key format"))?;

    let slot = match (scope, section, leaf) {
        (ConfigScope::Project, "gitlab", "url" | "project")
        | (ConfigScope::Project, "analysis", "days" | "lane_labels") => Some(KeySlot {
            section: Some(section),
            leaf,
        }),
        // User config keeps its keys at the top level.
        (ConfigScope::User, "user", "output" | "gitlab_url") => Some(KeySlot {
            section: None,
            leaf,
        }),
        _ => None,
    };

    slot.ok_or_else(|| anyhow!("Unsupported key `{key}` for {} scope", scope_label(scope)))
}

fn parse_value(slot: KeySlot<'_>, key: &str, raw: &str) -> Result<Value> {
    match (slot.section, slot.leaf) {
        (Some("analysis"), "days") => {
            let days: u32 = raw
                .parse()
                .with_context(|| format!("{key} expects a non-negative whole number"))?;
            Ok(Value::Integer(i64::from(days)))
        }
        (Some("analysis"), "lane_labels") => Ok(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(|label| Value::String(label.to_string()))
                .collect(),
        )),
        (None, "output") => match raw.trim().to_ascii_lowercase().as_str() {
            mode @ ("pretty" | "text" | "json") => Ok(Value::String(mode.to_string())),
            _ => bail!("{key} expects pretty, text or json"),
        },
        _ => {
            if raw.trim().is_empty() {
                bail!("{key} must not be empty");
            }
            Ok(Value::String(raw.trim().to_string()))
        }
    }
}

fn load_toml_table(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Ok(Value::Table(toml::map::Map::new()));
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if !value.is_table() {
        bail!("{} must contain a top-level TOML table", path.display());
    }

    Ok(value)
}

fn write_toml_table(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let serialized = toml::to_string_pretty(value)?;
    std::fs::write(path, serialized).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_toml_or_json(value: &Value, output: OutputMode) -> Result<()> {
    match output {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputMode::Text | OutputMode::Pretty => println!("{}", toml::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_effective(value: &EffectiveConfig, output: OutputMode) -> Result<()> {
    let url = value.gitlab_url();
    let project = value.project(None).ok();
    let lanes = &value.project.analysis.lane_labels;

    match output {
        OutputMode::Json => {
            let mut json = serde_json::to_value(value)?;
            json["effective"] = serde_json::json!({
                "output": output.as_str(),
                "gitlab_url": url,
                "project": project,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputMode::Text => {
            println!("output={}", output.as_str());
            println!("gitlab.url={url}");
            if let Some(project) = &project {
                println!("gitlab.project={project}");
            }
            println!("analysis.days={}", value.project.analysis.days);
            println!("analysis.lane_labels={}", lanes.join(","));
            if let Some(out) = &value.user.output {
                println!("user.output={out}");
            }
        }
        OutputMode::Pretty => {
            println!("output = \"{}\"", output.as_str());
            println!();
            println!("[gitlab]");
            println!("url = \"{url}\"");
            match &project {
                Some(project) => println!("project = \"{project}\""),
                None => println!("# project not configured"),
            }
            println!();
            println!("[analysis]");
            println!("days = {}", value.project.analysis.days);
            println!("lane_labels = {}", Value::try_from(lanes.clone())?);
            println!();
            println!("[user]");
            if let Some(out) = &value.user.output {
                println!("output = \"{out}\"");
            }
        }
    }

    Ok(())
}

fn render_mutation(output: OutputMode, action: &str, scope: &str, key: &str) -> Result<()> {
    match output {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "ok": true,
                    "action": action,
                    "scope": scope,
                    "key": key,
                }))?
            );
        }
        OutputMode::Text => {
            println!("ok=true action={action} scope={scope} key={key}");
        }
        OutputMode::Pretty => {
            println!("{} {} in {} config", action_to_title(action), key, scope);
        }
    }
    Ok(())
}

fn action_to_title(action: &str) -> &'static str {
    match action {
        "set" => "Set",
        "unset" => "Unset",
        _ => "Updated",
    }
}

const fn scope_label(scope: ConfigScope) -> &'static str {
    match scope {
        ConfigScope::Project => "project",
        ConfigScope::User => "user",
    }
}
