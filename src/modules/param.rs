//! Instance parameter files
//!
//! `create`, `modify` and `delete` manage the text of a PFILE/SPFILE as
//! `name = value` lines; `convert` asks the instance to build one file from
//! the other. Lines the request does not mention (comments included) are
//! kept as they are.

use anyhow::{Context, Result};
use declarative::{Action, ApplyContext, Attributes, Desired, Resource, ResourceState};
use orakit::{SqlScript, quote};
use serde_json::Value;
use similar::TextDiff;
use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Integer,
    Size,
    Choice(&'static [&'static str]),
    Text,
}

const KNOWN_PARAMETERS: &[(&str, ParamKind)] = &[
    ("processes", ParamKind::Integer),
    ("db_files", ParamKind::Integer),
    ("db_block_size", ParamKind::Integer),
    ("open_cursors", ParamKind::Integer),
    ("db_cache_size", ParamKind::Size),
    ("shared_pool_size", ParamKind::Size),
    ("sga_target", ParamKind::Size),
    ("pga_aggregate_target", ParamKind::Size),
    ("log_buffer", ParamKind::Size),
    ("memory_target", ParamKind::Size),
    ("db_recovery_file_dest_size", ParamKind::Size),
    ("audit_trail", ParamKind::Choice(&["DB", "OS", "NONE"])),
    ("undo_management", ParamKind::Choice(&["AUTO", "MANUAL"])),
    (
        "remote_login_passwordfile",
        ParamKind::Choice(&["EXCLUSIVE", "SHARED", "NONE"]),
    ),
    ("log_archive_format", ParamKind::Text),
    ("db_name", ParamKind::Text),
    ("control_files", ParamKind::Text),
    ("compatible", ParamKind::Text),
    ("db_recovery_file_dest", ParamKind::Text),
];

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Plain,
        &[
            "action",
            "pfile",
            "spfile",
            "parameters",
            "backup",
            "convert_to",
            "state",
        ],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let action = args.choice("action", &["create", "modify", "delete", "convert"], None)?;
    // Accepted for compatibility; `action` decides what happens
    args.state()?;

    let pfile = args.str("pfile")?.map(|p| crate::paths::expand(&p));
    let spfile = args.str("spfile")?.map(|p| crate::paths::expand(&p));
    if pfile.is_none() && spfile.is_none() {
        return Err(orakit::Error::validation(
            "one of the following is required: pfile, spfile",
        )
        .into());
    }

    if action == "convert" {
        return convert(args, ctx, pfile, spfile);
    }

    let mode = match action {
        "create" => FileMode::Create,
        "modify" => FileMode::Modify,
        _ => FileMode::Delete,
    };
    let parameters = match mode {
        FileMode::Delete => Attributes::new(),
        FileMode::Create | FileMode::Modify => {
            let parameters = validate_parameters(&args.map_values("parameters")?)?;
            if parameters.is_empty() {
                return Err(orakit::Error::validation(format!(
                    "parameters are required when action is {}",
                    action
                ))
                .into());
            }
            parameters
        }
    };
    let backup = args.flag("backup", false)?;

    let results = [pfile, spfile]
        .into_iter()
        .flatten()
        .map(|path| {
            let file = ParamFile::new(path, mode, parameters.clone(), backup);
            reconcile_file(&file, ctx)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(combine(results))
}

fn reconcile_file(file: &ParamFile, ctx: &ModuleContext) -> Result<ModuleResult> {
    let mut result = super::reconcile(file, ctx)?;
    if !result.changed {
        return Ok(result);
    }

    let before = file.content().unwrap_or_default();
    let after = match file.mode {
        FileMode::Delete => String::new(),
        FileMode::Create | FileMode::Modify => file.render().join("\n") + "\n",
    };
    let path = file.path.display().to_string();
    let diff = TextDiff::from_lines(&before, &after)
        .unified_diff()
        .header(&path, &path)
        .to_string();
    result = result.with_extra("diff", diff);

    if let Some(backup) = file.backup_file() {
        result = result.with_extra("backup_file", backup.display().to_string());
    }
    Ok(result)
}

/// Merge the results for the PFILE and SPFILE of one request
fn combine(results: Vec<ModuleResult>) -> ModuleResult {
    let mut combined = ModuleResult::default();
    let mut messages = Vec::new();
    let mut diffs = String::new();
    let mut backups = Vec::new();

    for result in results {
        combined.changed |= result.changed;
        if combined.action.is_none() || result.changed {
            combined.action = result.action;
        }
        messages.push(result.msg);
        combined.commands.extend(result.commands);
        if let Some(Value::String(diff)) = result.extra.get("diff") {
            diffs.push_str(diff);
        }
        if let Some(Value::String(backup)) = result.extra.get("backup_file") {
            backups.push(backup.clone());
        }
    }

    combined.msg = messages.join(" ");
    if !diffs.is_empty() {
        combined = combined.with_extra("diff", diffs);
    }
    match backups.len() {
        0 => {}
        1 => combined = combined.with_extra("backup_file", backups.remove(0)),
        _ => combined = combined.with_extra("backup_file", backups),
    }
    combined
}

/// Check names against the known-parameter table and render values
fn validate_parameters(parameters: &[(String, Value)]) -> orakit::Result<Attributes> {
    let mut rendered = Attributes::new();
    for (name, value) in parameters {
        let key = name.trim().to_lowercase();
        let kind = kind_of(&key).ok_or_else(|| {
            orakit::Error::validation(format!(
                "Invalid parameter: {}. This parameter is not recognized.",
                name
            ))
        })?;
        rendered.insert(key.clone(), render_value(&key, kind, value)?);
    }
    Ok(rendered)
}

fn kind_of(key: &str) -> Option<ParamKind> {
    KNOWN_PARAMETERS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

fn render_value(key: &str, kind: ParamKind, value: &Value) -> orakit::Result<String> {
    let scalar = |value: &Value| -> orakit::Result<String> {
        match value {
            Value::String(s) => Ok(s.trim().to_string()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(orakit::Error::validation(format!(
                "Invalid type for {}: expected a string or a number",
                key
            ))),
        }
    };

    match kind {
        ParamKind::Integer => {
            let text = scalar(value)?;
            text.parse::<u64>().map(|n| n.to_string()).map_err(|_| {
                orakit::Error::validation(format!(
                    "Invalid type for {}: {}. Expected an integer.",
                    key, text
                ))
            })
        }
        ParamKind::Size => quote::size(&scalar(value)?, key),
        ParamKind::Choice(choices) => {
            quote::choice(&scalar(value)?, key, choices).map(str::to_string)
        }
        ParamKind::Text => {
            let items = match value {
                Value::Array(items) => items.iter().map(scalar).collect::<orakit::Result<Vec<_>>>()?,
                other => vec![scalar(other)?],
            };
            let quoted = items
                .iter()
                .map(|item| quote::literal(unquote(item)))
                .collect::<orakit::Result<Vec<_>>>()?;
            Ok(quoted.join(", "))
        }
    }
}

/// Strip one level of surrounding single quotes
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

/// Split `[*.]name = value` into the normalized name and the value
fn parse_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (name, value) = trimmed.split_once('=')?;
    let name = name.trim();
    let name = name.strip_prefix("*.").unwrap_or(name).to_lowercase();
    Some((name, value.trim().to_string()))
}

/// Observed values in the same shape as rendered ones
fn normalize_observed(key: &str, value: &str) -> String {
    match kind_of(key) {
        Some(ParamKind::Text) | None => value
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", "),
        Some(_) => value.to_uppercase(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileMode {
    Create,
    Modify,
    Delete,
}

#[derive(Debug)]
pub struct ParamFile {
    path: PathBuf,
    mode: FileMode,
    parameters: Attributes,
    backup: bool,
    content: RefCell<Option<String>>,
    backup_file: RefCell<Option<PathBuf>>,
}

impl ParamFile {
    fn new(path: PathBuf, mode: FileMode, parameters: Attributes, backup: bool) -> Self {
        Self {
            path,
            mode,
            parameters,
            backup,
            content: RefCell::new(None),
            backup_file: RefCell::new(None),
        }
    }

    /// File text as read by the last probe
    fn content(&self) -> Option<String> {
        self.content.borrow().clone()
    }

    fn backup_file(&self) -> Option<PathBuf> {
        self.backup_file.borrow().clone()
    }

    /// New file lines: existing lines with managed values replaced, then
    /// the parameters the file did not mention
    fn render(&self) -> Vec<String> {
        let content = self.content().unwrap_or_default();
        let mut seen: Vec<String> = Vec::new();

        let mut lines: Vec<String> = content
            .lines()
            .map(|line| match parse_line(line) {
                Some((key, _)) => match self.parameters.get(&key) {
                    Some(value) => {
                        seen.push(key.clone());
                        let prefix = if line.trim_start().starts_with("*.") { "*." } else { "" };
                        format!("{}{} = {}", prefix, key, value)
                    }
                    None => line.to_string(),
                },
                None => line.to_string(),
            })
            .collect();

        lines.extend(
            self.parameters
                .iter()
                .filter(|(key, _)| !seen.iter().any(|s| s == key))
                .map(|(key, value)| format!("{} = {}", key, value)),
        );
        lines
    }

    fn write_backup(&self) -> Result<()> {
        if !self.backup || !self.path.exists() {
            return Ok(());
        }
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
        let backup = PathBuf::from(format!("{}.{}.bak", self.path.display(), stamp));
        fs::copy(&self.path, &backup).with_context(|| {
            format!(
                "Could not back up {} to {}",
                self.path.display(),
                backup.display()
            )
        })?;
        log::info!("Backed up {} to {}", self.path.display(), backup.display());
        *self.backup_file.borrow_mut() = Some(backup);
        Ok(())
    }
}

impl Resource for ParamFile {
    fn id(&self) -> String {
        self.path.display().to_string()
    }

    fn kind(&self) -> &'static str {
        "Parameter file"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_param_file"
    }

    fn location(&self) -> &'static str {
        "this host"
    }

    fn desired(&self) -> Desired {
        match self.mode {
            FileMode::Delete => Desired::absent(),
            FileMode::Create | FileMode::Modify => Desired::present(self.parameters.clone()),
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        // A binary SPFILE can still be deleted; its text is only kept for the diff
        if self.mode == FileMode::Delete {
            let exists = self
                .path
                .try_exists()
                .with_context(|| format!("Could not inspect {}", self.path.display()))?;
            *self.content.borrow_mut() = if exists {
                fs::read_to_string(&self.path).ok()
            } else {
                None
            };
            return Ok(if exists {
                ResourceState::present()
            } else {
                ResourceState::Absent
            });
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                *self.content.borrow_mut() = None;
                if self.mode == FileMode::Modify {
                    return Err(orakit::Error::validation(format!(
                        "The file {} does not exist.",
                        self.path.display()
                    ))
                    .into());
                }
                return Ok(ResourceState::Absent);
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(orakit::Error::validation(format!(
                    "{} is not a text parameter file",
                    self.path.display()
                ))
                .into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", self.path.display()));
            }
        };

        let attributes = content
            .lines()
            .filter_map(parse_line)
            .map(|(key, value)| {
                let value = normalize_observed(&key, &value);
                (key, value)
            })
            .collect();
        *self.content.borrow_mut() = Some(content);
        Ok(ResourceState::Present { attributes })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create | Action::Modify { .. } => self.render(),
            Action::Drop => vec![format!("delete {}", self.path.display())],
        })
    }

    fn execute(&self, action: &Action, commands: &[String], _ctx: &mut ApplyContext) -> Result<()> {
        match action {
            Action::NoOp => Ok(()),
            Action::Create | Action::Modify { .. } => {
                self.write_backup()?;
                let mut text = commands.join("\n");
                text.push('\n');
                fs::write(&self.path, text)
                    .with_context(|| format!("Could not write {}", self.path.display()))
            }
            Action::Drop => {
                self.write_backup()?;
                fs::remove_file(&self.path)
                    .with_context(|| format!("Could not delete {}", self.path.display()))
            }
        }
    }
}

/// Build one parameter file from the other through the instance
fn convert(
    args: &ModuleArgs,
    ctx: &ModuleContext,
    pfile: Option<PathBuf>,
    spfile: Option<PathBuf>,
) -> Result<ModuleResult> {
    let (Some(pfile), Some(spfile)) = (pfile, spfile) else {
        return Err(orakit::Error::validation("convert requires both pfile and spfile").into());
    };
    let target = args.choice("convert_to", &["spfile", "pfile"], Some("spfile"))?;

    let literal = |path: &Path| quote::literal(&path.display().to_string());
    let (command, created, source) = match target {
        "spfile" => (
            format!("CREATE SPFILE={} FROM PFILE={}", literal(&spfile)?, literal(&pfile)?),
            format!("SPFILE {}", spfile.display()),
            format!("PFILE {}", pfile.display()),
        ),
        _ => (
            format!("CREATE PFILE={} FROM SPFILE={}", literal(&pfile)?, literal(&spfile)?),
            format!("PFILE {}", pfile.display()),
            format!("SPFILE {}", spfile.display()),
        ),
    };

    let client = connection::client(args, ctx, Login::Plain)?;
    if ctx.check_mode {
        return Ok(ModuleResult::changed(format!(
            "{} would be created from {}.",
            created, source
        ))
        .with_commands(vec![client.redact(&command)]));
    }

    client.execute(&SqlScript::new().sql(command))?;
    Ok(ModuleResult::changed(format!(
        "{} has been created from {}.",
        created, source
    )))
}
