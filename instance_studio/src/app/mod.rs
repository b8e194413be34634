mod commands;
mod console;

pub use commands::{Command, HELP};
pub use console::{ConsoleEntry, ConsoleKind, ConsoleLog, CONSOLE_CAPACITY, HISTORY_CAPACITY};

use anyhow::{anyhow, Context, Result};
use bevy_ecs::prelude::Entity;
use instance_mirror::config::StudioConfig;
use instance_mirror::ecs::EcsWorld;
use instance_mirror::panel::PropertySheet;
use instance_mirror::scene::Scene;
use instance_mirror::session::{ExplorerSession, PumpReport};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Console-driven studio: one engine world, one explorer session and the property sheet.
pub struct StudioApp {
    engine: EcsWorld,
    session: ExplorerSession,
    sheet: PropertySheet,
    console: ConsoleLog,
    quit_requested: bool,
}

impl StudioApp {
    pub fn new(config: &StudioConfig) -> Result<Self> {
        let mut engine = EcsWorld::with_default_services();
        let root = engine.root().ok_or_else(|| anyhow!("Engine world has no data model root"))?;
        let mut session = ExplorerSession::from_config(config);
        let rows = session.attach(&mut engine, root, config.explorer.show_root);
        info!(target: "studio", "explorer ready with {} top-level row(s)", rows.len());
        Ok(Self {
            engine,
            session,
            sheet: PropertySheet::new(),
            console: ConsoleLog::new(),
            quit_requested: false,
        })
    }

    pub fn engine(&self) -> &EcsWorld {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EcsWorld {
        &mut self.engine
    }

    pub fn session(&self) -> &ExplorerSession {
        &self.session
    }

    pub fn sheet(&self) -> &PropertySheet {
        &self.sheet
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut ConsoleLog {
        &mut self.console
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn load_scene(&mut self, scene: &Scene) -> Result<usize> {
        let spawned = self.engine.load_scene(scene)?;
        self.pump();
        Ok(spawned.len())
    }

    pub fn load_scene_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let scene = Scene::load_from_path(path)?;
        self.load_scene(&scene)
    }

    /// Runs one command per line; blank lines and `#` comments are skipped.
    /// Returns the number of commands executed.
    pub fn run_script(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("Reading script {}", path.display()))?;
        let mut executed = 0;
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#')) {
            self.execute(line);
            executed += 1;
            if self.quit_requested {
                break;
            }
        }
        info!(target: "studio", "ran {executed} command(s) from {}", path.display());
        Ok(executed)
    }

    /// Reads commands until `quit` or end of input, echoing new console output to `out`.
    pub fn run_repl(&mut self, input: impl BufRead, out: &mut dyn Write) -> Result<()> {
        for line in input.lines() {
            let line = line.context("Reading console input")?;
            let before = self.console.entries().len();
            self.execute(&line);
            let entries = self.console.entries();
            let start = before.min(entries.len());
            for entry in entries.iter().skip(start).filter(|entry| entry.kind != ConsoleKind::Input) {
                match entry.kind {
                    ConsoleKind::Warning => writeln!(out, "warning: {}", entry.text)?,
                    ConsoleKind::Error => writeln!(out, "error: {}", entry.text)?,
                    _ => writeln!(out, "{}", entry.text)?,
                }
            }
            if self.quit_requested {
                break;
            }
        }
        Ok(())
    }

    /// Executes one console line, logging input, output and errors to the console.
    pub fn execute(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        self.console.record_history(trimmed);
        self.console.push(ConsoleKind::Input, format!("> {trimmed}"));
        let result = Command::parse(trimmed).and_then(|command| self.run(command));
        match result {
            Ok(lines) => {
                for line in lines {
                    self.console.push(ConsoleKind::Output, line);
                }
            }
            Err(err) => {
                debug!(target: "studio", "command failed: {err:#}");
                self.console.push(ConsoleKind::Error, format!("{err:#}"));
            }
        }
        self.pump();
    }

    fn run(&mut self, command: Command) -> Result<Vec<String>> {
        let output = match command {
            Command::Tree => self.session.mirror().outline().lines().map(str::to_string).collect(),
            Command::Select(paths) => {
                let nodes = paths.iter().map(|path| self.resolve(path)).collect::<Result<Vec<_>>>()?;
                let selected = self.session.select_nodes(&self.engine, &nodes, &mut self.sheet);
                vec![format!("{selected} row(s) selected")]
            }
            Command::Add(path) => {
                let node = self.resolve(&path)?;
                let row = self
                    .session
                    .mirror()
                    .view_of(node)
                    .ok_or_else(|| anyhow!("'{path}' is not shown in the explorer"))?;
                if !self.session.select(&self.engine, row, true, &mut self.sheet) {
                    warn!(target: "studio", "'{path}' cannot be selected");
                }
                vec![format!("{} row(s) selected", self.session.selection().nodes().len())]
            }
            Command::Clear => {
                self.session.clear_selection(&self.engine, &mut self.sheet);
                Vec::new()
            }
            Command::Delete => {
                let report = self.session.delete_selection(&mut self.engine);
                for skipped in &report.skipped {
                    self.console.push(ConsoleKind::Warning, skipped.to_string());
                }
                vec![format!("Deleted {} instance(s)", report.destroyed.len())]
            }
            Command::New { class_name, parent, name } => {
                let parent_node = self.resolve(&parent)?;
                let name = name.unwrap_or_else(|| class_name.clone());
                let created = self.engine.spawn_instance(&class_name, &name, Some(parent_node))?;
                vec![format!("Created {}", self.describe(created))]
            }
            Command::Rename { path, name } => {
                let node = self.resolve(&path)?;
                self.engine.set_name(node, &name);
                vec![format!("Renamed to {}", self.describe(node))]
            }
            Command::Move { path, parent } => {
                let node = self.resolve(&path)?;
                let parent_node = parent.as_deref().map(|parent| self.resolve(parent)).transpose()?;
                self.engine.set_parent(node, parent_node)?;
                match parent_node {
                    Some(_) => vec![format!("Moved to {}", self.describe(node))],
                    None => vec![format!("Removed '{path}' from the tree")],
                }
            }
            Command::Lock { path, locked } => {
                let node = self.resolve(&path)?;
                self.engine.set_parent_locked(node, locked);
                vec![format!("ParentLocked = {locked}")]
            }
            Command::Props => {
                self.sheet.refresh(&self.engine);
                if self.sheet.rows().is_empty() {
                    vec!["Nothing selected".to_string()]
                } else {
                    self.sheet
                        .rows()
                        .iter()
                        .map(|row| format!("{} = {}", row.property, row.value.as_deref().unwrap_or("<multiple>")))
                        .collect()
                }
            }
            Command::Save { path, file } => {
                let node = self.resolve(&path)?;
                let scene = Scene::export(&self.engine, node);
                scene.save_to_path(&file)?;
                info!(target: "studio", "saved {} instance(s) to {file}", scene.instances.len());
                vec![format!("Saved {} instance(s) to {file}", scene.instances.len())]
            }
            Command::History => self.console.history().map(str::to_string).collect(),
            Command::Help => HELP.iter().map(|(usage, about)| format!("{usage:<36} {about}")).collect(),
            Command::Quit => {
                self.quit_requested = true;
                Vec::new()
            }
        };
        Ok(output)
    }

    /// Applies queued engine notifications to the explorer.
    pub fn pump(&mut self) -> PumpReport {
        let report = self.session.pump(&mut self.engine, &mut self.sheet);
        for refused in &report.refused {
            self.console.push(ConsoleKind::Warning, refused.to_string());
        }
        if report.selection_refreshed {
            debug!(target: "studio", "selection now {} instance(s)", self.session.selection().nodes().len());
        }
        if self.sheet.is_dirty() {
            self.sheet.refresh(&self.engine);
        }
        report
    }

    fn resolve(&self, path: &str) -> Result<Entity> {
        self.engine.find_path(path).ok_or_else(|| anyhow!("No instance at '{path}'"))
    }

    fn describe(&self, node: Entity) -> String {
        self.engine.path_of(node).unwrap_or_else(|| format!("{node:?}"))
    }
}
