use bevy_ecs::prelude::*;
use std::collections::HashSet;

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);
#[derive(Component, Default)]
pub struct Children(pub Vec<Entity>);
#[derive(Component, Clone)]
pub struct InstanceName(pub String);
/// Fixed at spawn time; nothing mutates it afterwards.
#[derive(Component, Clone)]
pub struct InstanceClass(pub String);
#[derive(Component, Clone, Copy, Default)]
pub struct ParentLocked(pub bool);

/// Instances whose notifications are currently delivered.
#[derive(Resource, Default)]
pub struct Subscriptions(pub HashSet<Entity>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub name: String,
    pub class_name: String,
    pub parent: Option<Entity>,
    pub child_count: usize,
    pub parent_locked: bool,
}

/// Services created under the data model root of a fresh session.
pub const DEFAULT_SERVICES: &[&str] =
    &["Workspace", "Lighting", "ContentProvider", "LogService", "RunService", "ReplicatedFirst"];
