//! Discovery of running instances from their pmon background process.

use crate::error::Result;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const PMON_PREFIX: &str = "ora_pmon_";

/// SIDs with a running `ora_pmon_<SID>` process under `proc_root`.
///
/// `proc_root` is normally `/proc`. The full name is taken from `cmdline`
/// because `comm` is truncated to 15 bytes; `comm` is the fallback for
/// processes whose command line is unreadable. Sorted, without duplicates.
pub fn running_instances(proc_root: &Path) -> Result<Vec<String>> {
    let mut sids = Vec::new();

    for entry in WalkDir::new(proc_root).min_depth(1).max_depth(1) {
        // Processes can exit while the table is being read
        let Ok(entry) = entry else { continue };
        let is_pid = entry
            .file_name()
            .to_str()
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if !is_pid {
            continue;
        }
        if let Some(sid) = process_name(entry.path()).as_deref().and_then(pmon_sid) {
            sids.push(sid.to_string());
        }
    }

    sids.sort();
    sids.dedup();
    Ok(sids)
}

fn process_name(pid_dir: &Path) -> Option<String> {
    let from_cmdline = fs::read(pid_dir.join("cmdline")).ok().and_then(|raw| {
        raw.split(|b| *b == 0)
            .next()
            .map(|arg| String::from_utf8_lossy(arg).trim().to_string())
            .filter(|arg| !arg.is_empty())
    });
    from_cmdline.or_else(|| {
        fs::read_to_string(pid_dir.join("comm"))
            .ok()
            .map(|s| s.trim().to_string())
    })
}

fn pmon_sid(name: &str) -> Option<&str> {
    name.strip_prefix(PMON_PREFIX)
        .filter(|sid| !sid.is_empty() && sid.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn add_process(root: &Path, pid: &str, cmdline: &[u8], comm: &str) {
        let dir = root.join(pid);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("cmdline"), cmdline).unwrap();
        fs::write(dir.join("comm"), comm).unwrap();
    }

    #[test]
    fn test_finds_pmon_processes() {
        let temp = TempDir::new().unwrap();
        add_process(temp.path(), "101", b"ora_pmon_ORCL\0", "ora_pmon_ORCL\n");
        add_process(temp.path(), "102", b"ora_smon_ORCL\0", "ora_smon_ORCL\n");
        add_process(temp.path(), "103", b"ora_pmon_CDB1\0", "ora_pmon_CDB1\n");
        add_process(temp.path(), "104", b"bash\0-l\0", "bash\n");

        assert_eq!(
            running_instances(temp.path()).unwrap(),
            vec!["CDB1".to_string(), "ORCL".to_string()]
        );
    }

    #[test]
    fn test_long_sid_read_from_cmdline() {
        let temp = TempDir::new().unwrap();
        add_process(temp.path(), "200", b"ora_pmon_ORCLCDB01\0", "ora_pmon_ORCLCD\n");

        assert_eq!(running_instances(temp.path()).unwrap(), vec!["ORCLCDB01"]);
    }

    #[test]
    fn test_falls_back_to_comm() {
        let temp = TempDir::new().unwrap();
        add_process(temp.path(), "300", b"", "ora_pmon_XE\n");

        assert_eq!(running_instances(temp.path()).unwrap(), vec!["XE"]);
    }

    #[test]
    fn test_ignores_non_pid_entries() {
        let temp = TempDir::new().unwrap();
        add_process(temp.path(), "self", b"ora_pmon_FAKE\0", "ora_pmon_FAKE\n");

        assert!(running_instances(temp.path()).unwrap().is_empty());
    }
}
