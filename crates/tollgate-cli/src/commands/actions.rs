//! `tollgate actions` - list registered action types.

use anyhow::Result;
use tollgate_core::ProfileKind;
use tollgate_engine::{ActionRegistry, ActionType};

/// Print every action type, or only those usable in `kind`.
pub fn run(kind: Option<ProfileKind>) -> Result<()> {
    let registry = ActionRegistry::with_builtins()?;
    let types = match kind {
        Some(kind) => registry.types_for(kind),
        None => registry.types(),
    };

    match kind {
        Some(kind) => println!("\n🔧 Actions for {} profiles ({}):", kind, types.len()),
        None => println!("\n🔧 Actions ({}):", types.len()),
    }
    for action_type in types {
        println!();
        print!("{}", describe(action_type));
    }
    println!();
    Ok(())
}

fn describe(action_type: &ActionType) -> String {
    let mut out = format!(
        "  {} [{}]\n     {}\n",
        action_type.name, action_type.scope, action_type.description
    );
    for param in action_type.params {
        let mut flags = Vec::new();
        if !param.mandatory {
            flags.push("optional");
        }
        if param.variadic {
            flags.push("repeatable");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        out.push_str(&format!(
            "     - {}: {}{}\n",
            param.name,
            param.kind.describe(),
            flags
        ));
    }
    out
}
