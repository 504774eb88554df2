//! Plan preview display

use colored::{ColoredString, Colorize};
use declarative::Action;

use crate::modules::{ModuleKind, ModuleResult};

/// Check-mode outcome of one task
#[derive(Debug, Clone)]
pub struct Preview {
    pub name: String,
    pub kind: ModuleKind,
    pub result: ModuleResult,
}

/// Marker for a predicted outcome
///
/// `+` create, `-` drop, `~` modify, `→` one-shot operation.
pub fn marker(result: &ModuleResult) -> &'static str {
    if result.failed {
        return "✗";
    }
    if !result.changed {
        return "○";
    }
    match &result.action {
        Some(Action::Create) => "+",
        Some(Action::Drop) => "-",
        Some(Action::Modify { .. }) => "~",
        Some(Action::NoOp) | None => "→",
    }
}

fn colored_marker(result: &ModuleResult) -> ColoredString {
    let marker = marker(result);
    match marker {
        "+" => marker.green(),
        "-" => marker.red(),
        "~" => marker.yellow(),
        "→" => marker.cyan(),
        "✗" => marker.red().bold(),
        _ => marker.dimmed(),
    }
}

/// Display the predicted outcome of every task
pub fn display_preview(previews: &[Preview]) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Plan".bold()
    );
    println!("│");

    for preview in previews {
        println!(
            "│ {} {:<30} {}",
            colored_marker(&preview.result),
            preview.name,
            format!("[{}]", preview.kind).dimmed()
        );
        println!("│     {}", preview.result.msg.dimmed());
        for command in &preview.result.commands {
            println!("│       {}", command.dimmed());
        }
    }

    let changes = previews.iter().filter(|p| p.result.changed).count();
    let failures = previews.iter().filter(|p| p.result.failed).count();
    let unchanged = previews.len() - changes - failures;

    println!("│");
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to change, {} unchanged, {} failing",
        changes.to_string().bold(),
        unchanged.to_string().green(),
        failures.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Change;

    fn with_action(action: Action) -> ModuleResult {
        ModuleResult {
            action: Some(action),
            ..ModuleResult::changed("x")
        }
    }

    #[test]
    fn test_markers() {
        assert_eq!(marker(&with_action(Action::Create)), "+");
        assert_eq!(marker(&with_action(Action::Drop)), "-");
        assert_eq!(
            marker(&with_action(Action::Modify {
                changes: vec![Change {
                    key: "LOCKED".into(),
                    from: Some("NO".into()),
                    to: "YES".into(),
                }],
            })),
            "~"
        );
        assert_eq!(marker(&ModuleResult::changed("backup")), "→");
        assert_eq!(marker(&ModuleResult::unchanged("ok")), "○");

        let failed = ModuleResult::failure(&anyhow::anyhow!("boom"));
        assert_eq!(marker(&failed), "✗");
    }
}
