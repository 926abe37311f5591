//! Output formatting for the shell
//!
//! Tables for node and profile listings, pretty JSON, and coloured status
//! lines written with crossterm.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use serde_json::Value;
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use janus_core::types::scalar_string;
use janus_core::{Node, Profile};

use crate::nav::Entry;

/// Format controller nodes as an ASCII table
///
/// Returns "No nodes" for an empty listing.
pub fn format_nodes(nodes: &[Node]) -> String {
    if nodes.is_empty() {
        return "No nodes".to_string();
    }

    #[derive(Tabled)]
    struct NodeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "TYPE")]
        node_type: String,
        #[tabled(rename = "URL")]
        url: String,
        #[tabled(rename = "PUBLIC URL")]
        public_url: String,
    }

    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|n| NodeRow {
            id: n.id_string(),
            name: n.name.clone(),
            node_type: n
                .node_type
                .as_ref()
                .map(scalar_string)
                .unwrap_or_else(|| "-".to_string()),
            url: or_dash(n.url.as_deref()),
            public_url: or_dash(n.public_url.as_deref()),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Format profiles as an ASCII table, settings rendered as compact JSON
pub fn format_profiles(profiles: &[Profile]) -> String {
    if profiles.is_empty() {
        return "No profiles".to_string();
    }

    #[derive(Tabled)]
    struct ProfileRow {
        #[tabled(rename = "NAME")]
        name: String,
        #[tabled(rename = "SETTINGS")]
        settings: String,
    }

    let rows: Vec<ProfileRow> = profiles
        .iter()
        .map(|p| ProfileRow {
            name: p.name.clone(),
            settings: Value::Object(p.settings.clone()).to_string(),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Pretty-printed JSON, falling back to the compact form
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn or_dash(s: Option<&str>) -> String {
    s.filter(|s| !s.is_empty()).unwrap_or("-").to_string()
}

fn print_colored(mut out: impl Write, color: Color, prefix: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(prefix),
        Print(msg),
        ResetColor,
        Print("\n")
    );
}

/// Print one `ls` line, directories in blue
pub fn print_entry(entry: &Entry) {
    if entry.is_dir {
        print_colored(std::io::stdout(), Color::Blue, "", &entry.display);
    } else {
        println!("{}", entry.display);
    }
}

pub fn print_success(msg: &str) {
    print_colored(std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Failures go to stderr in red, without a prefix
pub fn print_error(msg: &str) {
    print_colored(std::io::stderr(), Color::Red, "", msg);
}

pub fn print_warning(msg: &str) {
    print_colored(std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

pub fn print_info(msg: &str) {
    print_colored(std::io::stdout(), Color::Cyan, "", msg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_nodes_empty() {
        assert_eq!(format_nodes(&[]), "No nodes");
        assert_eq!(format_profiles(&[]), "No profiles");
    }

    #[test]
    fn test_format_nodes_table() {
        let nodes: Vec<Node> = serde_json::from_value(json!([
            {"id": 1, "name": "dtn-a", "url": "tcp://10.0.0.1:2376", "type": "docker"},
            {"id": 2, "name": "dtn-b"}
        ]))
        .unwrap();

        let table = format_nodes(&nodes);
        assert!(table.contains("NAME"));
        assert!(table.contains("dtn-a"));
        assert!(table.contains("docker"));
        assert!(table.contains("dtn-b"));
    }

    #[test]
    fn test_format_profiles_table() {
        let profiles: Vec<Profile> =
            serde_json::from_value(json!([{"name": "small", "settings": {"cpu": 2}}])).unwrap();
        let table = format_profiles(&profiles);
        assert!(table.contains("small"));
        assert!(table.contains(r#"{"cpu":2}"#));
    }

    #[test]
    fn test_pretty() {
        assert_eq!(pretty(&json!({"a": 1})), "{\n  \"a\": 1\n}");
    }
}
