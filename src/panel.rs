use crate::ecs::{NAME_PROPERTY, PARENT_LOCKED_PROPERTY, PARENT_PROPERTY};
use crate::source::{PropertyPanel, SceneSource};
use bevy_ecs::prelude::Entity;
use std::collections::BTreeSet;

pub const CLASS_NAME_PROPERTY: &str = "ClassName";

/// Properties shown for every instance, in display order.
pub const SHEET_PROPERTIES: &[&str] = &[NAME_PROPERTY, CLASS_NAME_PROPERTY, PARENT_PROPERTY, PARENT_LOCKED_PROPERTY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyRow {
    pub property: &'static str,
    /// `None` when the selected instances disagree on the value.
    pub value: Option<String>,
}

/// Property panel model backing the studio's `props` view.
///
/// Notifications only mark rows dirty; values are read from the engine on `refresh`,
/// so a burst of changes to one property costs a single read.
#[derive(Debug, Default)]
pub struct PropertySheet {
    nodes: Vec<Entity>,
    rows: Vec<PropertyRow>,
    dirty: BTreeSet<&'static str>,
    selection_updates: usize,
    value_updates: usize,
}

impl PropertySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    pub fn rows(&self) -> &[PropertyRow] {
        &self.rows
    }

    pub fn value(&self, property: &str) -> Option<&str> {
        self.rows.iter().find(|row| row.property == property).and_then(|row| row.value.as_deref())
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn selection_updates(&self) -> usize {
        self.selection_updates
    }

    pub fn value_updates(&self) -> usize {
        self.value_updates
    }

    /// Re-reads dirty rows. Returns the properties that were refreshed.
    pub fn refresh(&mut self, source: &dyn SceneSource) -> Vec<&'static str> {
        let dirty = std::mem::take(&mut self.dirty);
        for property in &dirty {
            let value = Self::shared_value(source, &self.nodes, property);
            if let Some(row) = self.rows.iter_mut().find(|row| row.property == *property) {
                row.value = value;
            }
        }
        dirty.into_iter().collect()
    }

    fn shared_value(source: &dyn SceneSource, nodes: &[Entity], property: &str) -> Option<String> {
        let mut values = nodes.iter().map(|&node| Self::read(source, node, property));
        let first = values.next()??;
        values.all(|value| value.as_deref() == Some(first.as_str())).then_some(first)
    }

    fn read(source: &dyn SceneSource, node: Entity, property: &str) -> Option<String> {
        match property {
            NAME_PROPERTY => source.name(node).map(str::to_string),
            CLASS_NAME_PROPERTY => source.class_name(node).map(str::to_string),
            PARENT_PROPERTY => {
                let name = source.parent(node).and_then(|parent| source.name(parent)).unwrap_or("nil");
                Some(name.to_string())
            }
            PARENT_LOCKED_PROPERTY => Some(source.is_parent_locked(node).to_string()),
            _ => None,
        }
    }
}

impl PropertyPanel for PropertySheet {
    fn update_selection(&mut self, nodes: &[Entity]) {
        self.selection_updates += 1;
        self.nodes = nodes.to_vec();
        self.dirty.clear();
        if self.nodes.is_empty() {
            self.rows.clear();
            return;
        }
        self.rows = SHEET_PROPERTIES.iter().map(|&property| PropertyRow { property, value: None }).collect();
        self.dirty.extend(SHEET_PROPERTIES.iter().copied());
    }

    fn update_value(&mut self, property: &str) {
        self.value_updates += 1;
        if let Some(known) = SHEET_PROPERTIES.iter().find(|known| **known == property) {
            if !self.nodes.is_empty() {
                self.dirty.insert(*known);
            }
        }
    }
}
