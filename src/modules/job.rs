//! DBMS_SCHEDULER jobs
//!
//! Jobs are PL/SQL blocks. The action and schedule are compared with
//! whitespace collapsed, so reformatting a block does not count as drift.

use anyhow::Result;
use declarative::{Action, ApplyContext, Attributes, Desired, DesiredState, Resource, ResourceState};
use orakit::{Client, quote};

use super::args::ModuleArgs;
use super::connection::{self, Login};
use super::{ModuleContext, ModuleResult, sql_script};

const JOB_ACTION: &str = "JOB_ACTION";
const REPEAT_INTERVAL: &str = "REPEAT_INTERVAL";
const ENABLED: &str = "ENABLED";

pub fn params() -> Vec<&'static str> {
    connection::params(
        Login::Plain,
        &["job_name", "job_action", "schedule", "enabled", "state"],
    )
}

pub fn run(args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let client = connection::client(args, ctx, Login::Plain)?;
    let job = SchedulerJob::from_args(args, client)?;
    super::reconcile(&job, ctx)
}

#[derive(Debug)]
pub struct SchedulerJob {
    name: String,
    ident: String,
    action: Option<String>,
    schedule: Option<String>,
    enabled: bool,
    state: DesiredState,
    client: Client,
}

impl SchedulerJob {
    pub fn from_args(args: &ModuleArgs, client: Client) -> orakit::Result<Self> {
        let name = args.required("job_name")?;
        let ident = quote::identifier(&name, "job_name")?;
        let state = args.state()?;

        let raw_action = args.str("job_action")?;
        if let Some(raw) = &raw_action
            && raw.contains('\n')
            && raw.contains("--")
        {
            return Err(orakit::Error::validation(
                "job_action spanning several lines must not contain -- comments",
            ));
        }
        let action = raw_action.map(|a| collapse(&a));
        if state == DesiredState::Present && action.as_deref().is_none_or(str::is_empty) {
            return Err(orakit::Error::validation(
                "job_action is required when state is present",
            ));
        }
        let schedule = args
            .str("schedule")?
            .map(|s| collapse(&s))
            .filter(|s| !s.is_empty());

        if let Some(action) = &action {
            quote::literal(action)?;
        }
        if let Some(schedule) = &schedule {
            quote::literal(schedule)?;
        }

        Ok(Self {
            name,
            ident,
            action,
            schedule,
            enabled: args.flag("enabled", true)?,
            state,
            client,
        })
    }

    fn set_attribute(&self, attribute: &str, value: &str) -> Result<String> {
        Ok(format!(
            "BEGIN DBMS_SCHEDULER.SET_ATTRIBUTE(name => {}, attribute => {}, value => {}); END;",
            quote::literal(&self.ident)?,
            quote::literal(attribute)?,
            quote::literal(value)?
        ))
    }

    fn call(&self, procedure: &str) -> Result<String> {
        Ok(format!(
            "BEGIN DBMS_SCHEDULER.{}({}); END;",
            procedure,
            quote::literal(&self.ident)?
        ))
    }
}

/// Collapse runs of whitespace to single spaces
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn bool_literal(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

impl Resource for SchedulerJob {
    fn id(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "Job"
    }

    fn resource_type(&self) -> &'static str {
        "oracle_job"
    }

    fn desired(&self) -> Desired {
        match self.state {
            DesiredState::Absent => Desired::absent(),
            DesiredState::Present => {
                let mut attributes = Attributes::new();
                if let Some(action) = &self.action {
                    attributes.insert(JOB_ACTION, action.as_str());
                }
                if let Some(schedule) = &self.schedule {
                    attributes.insert(REPEAT_INTERVAL, schedule.as_str());
                }
                attributes.insert(ENABLED, bool_literal(self.enabled));
                Desired::present(attributes)
            }
        }
    }

    fn current_state(&self, _ctx: &ApplyContext) -> Result<ResourceState> {
        let rows = self.client.query_fields(
            &format!(
                "SELECT enabled || '|' || repeat_interval || '|' || \
                 REPLACE(REPLACE(job_action, CHR(13), ' '), CHR(10), ' ') \
                 FROM dba_scheduler_jobs WHERE job_name = {} \
                 AND owner = SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA')",
                quote::literal(&self.ident)?
            ),
            3,
        )?;

        Ok(match rows.first() {
            None => ResourceState::Absent,
            Some(row) => ResourceState::Present {
                attributes: Attributes::new()
                    .with(ENABLED, row[0].to_uppercase())
                    .with(REPEAT_INTERVAL, collapse(&row[1]))
                    .with(JOB_ACTION, collapse(&row[2])),
            },
        })
    }

    fn synthesize(&self, action: &Action, _observed: &ResourceState) -> Result<Vec<String>> {
        Ok(match action {
            Action::NoOp => Vec::new(),
            Action::Create => {
                let job_action = self.action.as_deref().ok_or_else(|| {
                    orakit::Error::validation("job_action is required to create a job")
                })?;
                let repeat_interval = match &self.schedule {
                    Some(schedule) => quote::literal(schedule)?,
                    None => "NULL".to_string(),
                };
                vec![format!(
                    "BEGIN DBMS_SCHEDULER.CREATE_JOB(job_name => {}, job_type => 'PLSQL_BLOCK', \
                     job_action => {}, start_date => SYSTIMESTAMP, repeat_interval => {}, \
                     enabled => {}); END;",
                    quote::literal(&self.ident)?,
                    quote::literal(job_action)?,
                    repeat_interval,
                    bool_literal(self.enabled)
                )]
            }
            Action::Modify { changes } => {
                let mut commands = Vec::new();
                for change in changes {
                    match change.key.as_str() {
                        JOB_ACTION => commands.push(self.set_attribute("job_action", &change.to)?),
                        REPEAT_INTERVAL => {
                            commands.push(self.set_attribute("repeat_interval", &change.to)?)
                        }
                        ENABLED if change.to == "TRUE" => commands.push(self.call("ENABLE")?),
                        ENABLED => commands.push(self.call("DISABLE")?),
                        _ => {}
                    }
                }
                commands
            }
            Action::Drop => vec![self.call("DROP_JOB")?],
        })
    }

    fn execute(&self, _action: &Action, commands: &[String], _ctx: &mut ApplyContext) -> Result<()> {
        self.client.execute(&sql_script(commands))?;
        Ok(())
    }

    fn secrets(&self) -> Vec<String> {
        self.client.target().secrets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing;
    use orakit::backend::scripted::ScriptedBackend;

    fn args() -> ModuleArgs {
        ModuleArgs::new()
            .with("job_name", "nightly_stats")
            .with("job_action", "BEGIN DBMS_STATS.GATHER_SCHEMA_STATS('APP'); END;")
            .with("schedule", "FREQ=DAILY; BYHOUR=2")
    }

    #[test]
    fn test_create_job() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        let result = run(&args(), &ctx).unwrap();

        assert!(result.changed);
        let scripts = backend.scripts_containing("CREATE_JOB");
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains(
            "BEGIN DBMS_SCHEDULER.CREATE_JOB(job_name => 'NIGHTLY_STATS', job_type => 'PLSQL_BLOCK', \
             job_action => 'BEGIN DBMS_STATS.GATHER_SCHEMA_STATS(''APP''); END;', \
             start_date => SYSTIMESTAMP, repeat_interval => 'FREQ=DAILY; BYHOUR=2', \
             enabled => TRUE); END;\n/\n"
        ));
    }

    #[test]
    fn test_converged_job_is_unchanged() {
        let (backend, ctx) = testing::context(ScriptedBackend::new().respond(
            "FROM dba_scheduler_jobs",
            "TRUE|FREQ=DAILY;  BYHOUR=2|BEGIN  DBMS_STATS.GATHER_SCHEMA_STATS('APP'); END;\n",
        ));
        let result = run(&args(), &ctx).unwrap();
        assert!(!result.changed);
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_lookup_is_scoped_to_session_schema() {
        let (backend, ctx) = testing::context(ScriptedBackend::new());
        run(&args(), &ctx).unwrap();

        let lookup = &backend.calls()[0].script;
        assert!(lookup.contains(
            "WHERE job_name = 'NIGHTLY_STATS' AND owner = SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA')"
        ));
    }

    #[test]
    fn test_schedule_and_enabled_drift() {
        let (backend, ctx) = testing::context(ScriptedBackend::new().respond(
            "FROM dba_scheduler_jobs",
            "TRUE|FREQ=HOURLY|BEGIN DBMS_STATS.GATHER_SCHEMA_STATS('APP'); END;\n",
        ));
        let result = run(&args().with("enabled", false), &ctx).unwrap();

        assert!(result.changed);
        let scripts = backend.scripts_containing("SET_ATTRIBUTE");
        assert_eq!(scripts.len(), 1);
        let script = &scripts[0];
        assert!(script.contains(
            "SET_ATTRIBUTE(name => 'NIGHTLY_STATS', attribute => 'repeat_interval', value => 'FREQ=DAILY; BYHOUR=2')"
        ));
        assert!(script.contains("BEGIN DBMS_SCHEDULER.DISABLE('NIGHTLY_STATS'); END;"));
        assert!(!script.contains("'job_action'"));
    }

    #[test]
    fn test_drop_job() {
        let (backend, ctx) = testing::context(
            ScriptedBackend::new().respond("FROM dba_scheduler_jobs", "TRUE||NULL;\n"),
        );
        let args = ModuleArgs::new()
            .with("job_name", "nightly_stats")
            .with("state", "absent");
        assert!(run(&args, &ctx).unwrap().changed);
        assert_eq!(
            backend
                .scripts_containing("BEGIN DBMS_SCHEDULER.DROP_JOB('NIGHTLY_STATS'); END;")
                .len(),
            1
        );
    }

    #[test]
    fn test_action_required_when_present() {
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let args = ModuleArgs::new().with("job_name", "nightly_stats");
        assert!(run(&args, &ctx).is_err());
    }

    #[test]
    fn test_multiline_action_is_collapsed() {
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let args = args().with("job_action", "BEGIN\n  purge_logs;\nEND;");
        let result = run(&args, &ctx.with_check_mode(true)).unwrap();
        assert!(result.commands[0].contains("job_action => 'BEGIN purge_logs; END;'"));
    }
}
