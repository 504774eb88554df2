//! Real backend executing `sqlplus` and `rman`.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::instances;
use crate::types::{CommandOutput, OracleEnv, Tool};
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// How the tool process is started.
///
/// With a `become_user` the tool runs through `sudo -n -u <user> env ...`;
/// `-n` makes sudo fail instead of prompting. No shell is involved either
/// way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Launcher {
    /// OS account to run the tools as
    pub become_user: Option<String>,
}

impl Launcher {
    /// Launch as the current user.
    pub fn direct() -> Self {
        Self::default()
    }

    /// Launch as `user` through sudo.
    pub fn become_user(user: impl Into<String>) -> Self {
        Self {
            become_user: Some(user.into()),
        }
    }

    /// Program and arguments for running `tool`.
    pub fn argv(&self, tool: Tool, env: &OracleEnv) -> (OsString, Vec<OsString>) {
        let program = env.tool_path(tool).into_os_string();
        let tool_args = tool.args().iter().map(OsString::from);

        match &self.become_user {
            Some(user) => {
                let mut args: Vec<OsString> = ["-n", "-u", user.as_str(), "--", "env"]
                    .iter()
                    .map(OsString::from)
                    .collect();
                args.extend(
                    env.vars()
                        .into_iter()
                        .map(|(k, v)| OsString::from(format!("{}={}", k, v))),
                );
                args.push(program);
                args.extend(tool_args);
                (OsString::from("sudo"), args)
            }
            None => (program, tool_args.collect()),
        }
    }

    fn command(&self, tool: Tool, env: &OracleEnv) -> Command {
        let (program, args) = self.argv(tool, env);
        let mut cmd = Command::new(program);
        cmd.args(args);
        if self.become_user.is_none() {
            cmd.envs(env.vars());
        }
        cmd
    }
}

/// Backend that executes the real Oracle tools.
#[derive(Debug, Clone)]
pub struct CliBackend {
    launcher: Launcher,
    proc_root: PathBuf,
}

impl CliBackend {
    /// Create a backend using `launcher` and the host's `/proc`.
    pub fn new(launcher: Launcher) -> Self {
        Self {
            launcher,
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Read the process table from another root.
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }
}

impl Backend for CliBackend {
    fn run(&self, tool: Tool, script: &str, env: &OracleEnv) -> Result<CommandOutput> {
        let mut child = self
            .launcher
            .command(tool, env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ToolNotFound {
                    tool: match &self.launcher.become_user {
                        Some(_) => "sudo".to_string(),
                        None => env.tool_path(tool).display().to_string(),
                    },
                },
                _ => Error::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits early (sudo refusing) closes the pipe
            if let Err(e) = stdin.write_all(script.as_bytes())
                && e.kind() != ErrorKind::BrokenPipe
            {
                return Err(Error::Io(e));
            }
        }

        let output = child.wait_with_output()?;
        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };

        if let Some(user) = &self.launcher.become_user {
            if sudo_refused(&result) {
                return Err(Error::Become {
                    user: user.clone(),
                    message: result.stderr.trim().to_string(),
                });
            }
            if result.code == Some(127) {
                return Err(Error::ToolNotFound {
                    tool: env.tool_path(tool).display().to_string(),
                });
            }
        }

        Ok(result)
    }

    fn running_instances(&self) -> Result<Vec<String>> {
        instances::running_instances(&self.proc_root)
    }
}

fn sudo_refused(output: &CommandOutput) -> bool {
    !output.success()
        && output.stdout.trim().is_empty()
        && output.stderr.starts_with("sudo:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> OracleEnv {
        OracleEnv {
            oracle_sid: Some("ORCL".into()),
            oracle_home: Some(PathBuf::from("/u01/app/oracle/product/19c")),
            oracle_base: None,
        }
    }

    #[test]
    fn test_direct_argv() {
        let (program, args) = Launcher::direct().argv(Tool::Sqlplus, &env());
        assert_eq!(program, "/u01/app/oracle/product/19c/bin/sqlplus");
        assert_eq!(args, vec!["-s", "-L", "/nolog"]);
    }

    #[test]
    fn test_become_argv_carries_env_explicitly() {
        let (program, args) = Launcher::become_user("oracle").argv(Tool::Rman, &env());
        assert_eq!(program, "sudo");
        assert_eq!(
            args,
            vec![
                "-n",
                "-u",
                "oracle",
                "--",
                "env",
                "ORACLE_SID=ORCL",
                "ORACLE_HOME=/u01/app/oracle/product/19c",
                "/u01/app/oracle/product/19c/bin/rman",
            ]
        );
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let env = OracleEnv {
            oracle_home: Some(PathBuf::from("/nonexistent/oracle/home")),
            ..Default::default()
        };
        let backend = CliBackend::new(Launcher::direct());
        let err = backend.run(Tool::Sqlplus, "EXIT\n", &env).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn test_sudo_refusal_detection() {
        let refused = CommandOutput {
            stdout: String::new(),
            stderr: "sudo: a password is required\n".into(),
            code: Some(1),
        };
        assert!(sudo_refused(&refused));
        assert!(!sudo_refused(&CommandOutput::failed("ORA-01017", 1)));
    }

    #[test]
    fn test_proc_root_override() {
        let temp = tempfile::TempDir::new().unwrap();
        let pid = temp.path().join("42");
        std::fs::create_dir(&pid).unwrap();
        std::fs::write(pid.join("cmdline"), b"ora_pmon_TEST\0").unwrap();

        let backend = CliBackend::new(Launcher::direct()).with_proc_root(temp.path());
        assert_eq!(backend.running_instances().unwrap(), vec!["TEST"]);
    }
}
