//! `oractl modules` - what can be run

use colored::Colorize;

use crate::Context;
use crate::modules::ModuleKind;
use crate::ui;

pub fn run(ctx: &Context) {
    if !ctx.quiet {
        ui::header("Modules");
    }

    for kind in ModuleKind::ALL {
        let style = if kind.is_stateful() {
            "reconciled"
        } else {
            "one-shot"
        };
        println!(
            "  {:<12} {} {}",
            kind.name().bold(),
            kind.description(),
            format!("({})", style).dimmed()
        );
        let params = kind.params();
        if !params.is_empty() {
            ui::dim(&format!("             {}", params.join(", ")));
        }
    }
}
