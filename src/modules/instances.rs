//! Running instance discovery

use anyhow::Result;

use super::args::ModuleArgs;
use super::{ModuleContext, ModuleResult};

pub fn params() -> Vec<&'static str> {
    Vec::new()
}

pub fn run(_args: &ModuleArgs, ctx: &ModuleContext) -> Result<ModuleResult> {
    let mut databases = ctx.running_instances()?;
    databases.sort();
    databases.dedup();

    let msg = if databases.is_empty() {
        "No running Oracle databases found".to_string()
    } else {
        format!("Running Oracle databases: {}", databases.join(", "))
    };
    Ok(ModuleResult::unchanged(msg).with_extra("databases", databases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing;
    use orakit::backend::scripted::ScriptedBackend;
    use serde_json::json;

    #[test]
    fn test_lists_running_instances() {
        let (_, ctx) = testing::context(ScriptedBackend::new().with_instances(["ORCL", "CDB1"]));
        let result = run(&ModuleArgs::new(), &ctx).unwrap();

        assert!(!result.changed);
        assert_eq!(result.msg, "Running Oracle databases: CDB1, ORCL");
        assert_eq!(result.extra["databases"], json!(["CDB1", "ORCL"]));
    }

    #[test]
    fn test_no_instances() {
        let (_, ctx) = testing::context(ScriptedBackend::new());
        let result = run(&ModuleArgs::new(), &ctx).unwrap();

        assert!(!result.changed);
        assert_eq!(result.msg, "No running Oracle databases found");
        assert_eq!(result.extra["databases"], json!([]));
    }
}
