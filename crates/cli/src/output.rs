use engine_core::registry::Registry;
use std::fmt::Write;

/// Renders every category with its sorted keys and labels, `(none)` for empty categories.
pub fn render_registry(registry: &Registry) -> String {
    let mut out = String::new();
    for (category, entries) in registry.list() {
        let title = category.to_string().to_uppercase();
        let _ = writeln!(out, "\n{title}");
        let _ = writeln!(out, "{}", "-".repeat(title.len()));
        if entries.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for (key, label) in entries {
            let _ = writeln!(out, "  {key:<30} {label}");
        }
    }
    out
}

pub fn print_registry(registry: &Registry) {
    println!("{}", render_registry(registry));
}
