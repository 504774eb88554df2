//! Grant probes shared by the role and privilege modules

use orakit::{Client, quote};

/// A privilege or role held by a grantee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Held {
    pub privilege: String,
    /// ADMIN OPTION for system privileges and roles, GRANT OPTION for objects
    pub with_option: bool,
}

/// Validate and normalize a privilege list, keeping the first occurrence
pub fn normalize(privileges: &[String]) -> orakit::Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for privilege in privileges {
        let privilege = quote::keywords(privilege, "privilege")?;
        // Oracle stores ALL as the individual privileges, so it never shows up as held
        if privilege == "ALL" || privilege == "ALL PRIVILEGES" {
            return Err(orakit::Error::validation(format!(
                "{} cannot be managed idempotently; list the privileges explicitly",
                privilege
            )));
        }
        if !out.contains(&privilege) {
            out.push(privilege);
        }
    }
    if out.is_empty() {
        return Err(orakit::Error::validation("privileges must not be empty"));
    }
    Ok(out)
}

/// System privileges and roles granted directly to `grantee`
pub fn system_and_roles(client: &Client, grantee: &str) -> orakit::Result<Vec<Held>> {
    let grantee = quote::literal(grantee)?;
    let sql = format!(
        "SELECT privilege || '|' || admin_option FROM dba_sys_privs WHERE grantee = {g} \
         UNION ALL \
         SELECT granted_role || '|' || admin_option FROM dba_role_privs WHERE grantee = {g}",
        g = grantee
    );
    probe(client, &sql)
}

/// Privileges on `owner.object` granted to `grantee`
pub fn on_object(
    client: &Client,
    grantee: &str,
    owner: &str,
    object: &str,
) -> orakit::Result<Vec<Held>> {
    let sql = format!(
        "SELECT privilege || '|' || grantable FROM dba_tab_privs \
         WHERE grantee = {} AND owner = {} AND table_name = {}",
        quote::literal(grantee)?,
        quote::literal(owner)?,
        quote::literal(object)?
    );
    probe(client, &sql)
}

fn probe(client: &Client, sql: &str) -> orakit::Result<Vec<Held>> {
    Ok(client
        .query_fields(sql, 2)?
        .into_iter()
        .map(|row| Held {
            privilege: row[0].to_uppercase(),
            with_option: row[1].eq_ignore_ascii_case("YES"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orakit::backend::scripted::ScriptedBackend;
    use orakit::{ConnectTarget, OracleEnv};
    use std::sync::Arc;

    #[test]
    fn test_normalize_dedups_and_uppercases() {
        let privileges = vec![
            "create session".to_string(),
            "CREATE  SESSION".to_string(),
            "select".to_string(),
        ];
        assert_eq!(normalize(&privileges).unwrap(), vec!["CREATE SESSION", "SELECT"]);
        assert!(normalize(&[]).is_err());
        assert!(normalize(&["SELECT; DROP".to_string()]).is_err());
    }

    #[test]
    fn test_normalize_rejects_all() {
        for privilege in ["all", "ALL PRIVILEGES", "all  privileges"] {
            let err = normalize(&[privilege.to_string()]).unwrap_err();
            assert!(err.to_string().contains("list the privileges explicitly"));
        }
        assert!(normalize(&["alter".to_string()]).is_ok());
    }

    #[test]
    fn test_system_probe_parses_admin_option() {
        let backend = Arc::new(
            ScriptedBackend::new().respond("dba_sys_privs", "CREATE SESSION|NO\nDBA|YES\n"),
        );
        let client = Client::new(backend, ConnectTarget::local("ORCL"), OracleEnv::default());
        let held = system_and_roles(&client, "APP").unwrap();
        assert_eq!(
            held,
            vec![
                Held {
                    privilege: "CREATE SESSION".into(),
                    with_option: false
                },
                Held {
                    privilege: "DBA".into(),
                    with_option: true
                },
            ]
        );
    }
}
