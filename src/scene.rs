use crate::ecs::EcsWorld;
use anyhow::{bail, Context, Result};
use bevy_ecs::prelude::Entity;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

/// A flat list of instances to seed the engine with, parents before children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Path of the instance the top-level entries are parented to. Defaults to `Workspace`.
    #[serde(default = "Scene::default_service")]
    pub service: String,
    #[serde(default)]
    pub instances: Vec<SceneInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneInstance {
    pub id: String,
    pub name: String,
    pub class_name: String,
    /// `id` of an earlier entry; `None` places the instance directly under the scene's service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub parent_locked: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self { service: Self::default_service(), instances: Vec::new() }
    }
}

impl Scene {
    fn default_service() -> String {
        "Workspace".to_string()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading scene file {}", path.display()))?;
        let scene = serde_json::from_slice::<Scene>(&bytes)
            .with_context(|| format!("Parsing scene file {}", path.display()))?;
        scene.validate().with_context(|| format!("Validating scene file {}", path.display()))?;
        Ok(scene)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating scene directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing scene file {}", path.display()))?;
        Ok(())
    }

    /// Checks ids are unique and every parent refers to an earlier entry.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for instance in &self.instances {
            if let Some(parent) = &instance.parent {
                if !seen.contains(parent.as_str()) {
                    bail!("Instance '{}' refers to unknown or later parent '{parent}'", instance.id);
                }
            }
            if !seen.insert(instance.id.as_str()) {
                bail!("Duplicate instance id '{}'", instance.id);
            }
        }
        Ok(())
    }

    /// Captures `root` and everything below it. `root` itself becomes a top-level entry.
    pub fn export(ecs: &EcsWorld, root: Entity) -> Self {
        let mut ids = HashMap::new();
        let mut instances = Vec::new();
        for entity in ecs.descendants(root) {
            let Some(info) = ecs.instance_info(entity) else {
                continue;
            };
            let id = format!("{}", instances.len() + 1);
            let parent = if entity == root { None } else { info.parent.and_then(|p| ids.get(&p).cloned()) };
            ids.insert(entity, id.clone());
            instances.push(SceneInstance {
                id,
                name: info.name,
                class_name: info.class_name,
                parent,
                parent_locked: info.parent_locked,
            });
        }
        let service = ecs
            .instance_info(root)
            .and_then(|info| info.parent)
            .and_then(|parent| ecs.path_of(parent))
            .unwrap_or_else(Self::default_service);
        Self { service, instances }
    }
}

impl EcsWorld {
    /// Spawns every scene instance, returning the new entities in scene order.
    pub fn load_scene(&mut self, scene: &Scene) -> Result<Vec<Entity>> {
        scene.validate()?;
        let service = self
            .find_path(&scene.service)
            .with_context(|| format!("Scene service '{}' does not exist", scene.service))?;
        let mut spawned: HashMap<&str, Entity> = HashMap::new();
        let mut order = Vec::with_capacity(scene.instances.len());
        for instance in &scene.instances {
            let parent = match &instance.parent {
                Some(id) => spawned
                    .get(id.as_str())
                    .copied()
                    .with_context(|| format!("Instance '{}' refers to unknown parent '{id}'", instance.id))?,
                None => service,
            };
            let entity = self.spawn_instance(&instance.class_name, &instance.name, Some(parent))?;
            if instance.parent_locked {
                self.set_parent_locked(entity, true);
            }
            spawned.insert(instance.id.as_str(), entity);
            order.push(entity);
        }
        info!(target: "engine", "loaded {} instance(s) under {}", order.len(), scene.service);
        Ok(order)
    }
}
