use anyhow::{anyhow, bail, Result};

pub const HELP: &[(&str, &str)] = &[
    ("tree", "print the explorer rows"),
    ("select <path>...", "replace the selection"),
    ("add <path>", "add a row to the selection"),
    ("clear", "clear the selection"),
    ("delete", "destroy the selected instances"),
    ("new <Class> <parent-path> [name]", "create an instance"),
    ("rename <path> <name>", "rename an instance"),
    ("move <path> <parent-path|nil>", "re-parent an instance"),
    ("lock <path> on|off", "toggle ParentLocked"),
    ("props", "show the property sheet"),
    ("save <path> <file>", "write an instance subtree as a scene file"),
    ("history", "list previous commands"),
    ("help", "this list"),
    ("quit", "leave the studio"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tree,
    Select(Vec<String>),
    Add(String),
    Clear,
    Delete,
    New { class_name: String, parent: String, name: Option<String> },
    Rename { path: String, name: String },
    Move { path: String, parent: Option<String> },
    Lock { path: String, locked: bool },
    Props,
    Save { path: String, file: String },
    History,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("Empty command"))?;
        let args: Vec<&str> = words.collect();
        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("tree", []) => Command::Tree,
            ("select", paths) if !paths.is_empty() => {
                Command::Select(paths.iter().map(|path| path.to_string()).collect())
            }
            ("add", [path]) => Command::Add(path.to_string()),
            ("clear", []) => Command::Clear,
            ("delete", []) => Command::Delete,
            ("new", [class_name, parent]) => {
                Command::New { class_name: class_name.to_string(), parent: parent.to_string(), name: None }
            }
            ("new", [class_name, parent, name @ ..]) if !name.is_empty() => Command::New {
                class_name: class_name.to_string(),
                parent: parent.to_string(),
                name: Some(name.join(" ")),
            },
            ("rename", [path, name @ ..]) if !name.is_empty() => {
                Command::Rename { path: path.to_string(), name: name.join(" ") }
            }
            ("move", [path, parent]) => {
                let parent = (!parent.eq_ignore_ascii_case("nil")).then(|| parent.to_string());
                Command::Move { path: path.to_string(), parent }
            }
            ("lock", [path, state]) => Command::Lock { path: path.to_string(), locked: parse_switch(state)? },
            ("props", []) => Command::Props,
            ("save", [path, file]) => Command::Save { path: path.to_string(), file: file.to_string() },
            ("history", []) => Command::History,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (
                "tree" | "select" | "add" | "clear" | "delete" | "new" | "rename" | "move" | "lock" | "props"
                | "save" | "history" | "help" | "quit" | "exit",
                _,
            ) => bail!("Wrong arguments for '{verb}'. Type 'help' for usage."),
            _ => bail!("Unknown command '{verb}'. Type 'help' for the list."),
        };
        Ok(command)
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid switch '{other}'. Use on/off or true/false."),
    }
}
