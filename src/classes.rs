use crate::source::ClassHierarchy;
use std::collections::HashMap;

/// Built-in instance classes as `(class, parent class)`. `Instance` is the only root.
const BUILTIN_CLASSES: &[(&str, Option<&str>)] = &[
    ("Instance", None),
    ("ServiceProvider", Some("Instance")),
    ("DataModel", Some("ServiceProvider")),
    ("Workspace", Some("Model")),
    ("Lighting", Some("Instance")),
    ("ContentProvider", Some("Instance")),
    ("LogService", Some("Instance")),
    ("RunService", Some("Instance")),
    ("ReplicatedFirst", Some("Instance")),
    ("PVInstance", Some("Instance")),
    ("BasePart", Some("PVInstance")),
    ("Part", Some("BasePart")),
    ("Model", Some("PVInstance")),
    ("Folder", Some("Instance")),
    ("Camera", Some("Instance")),
    ("Sound", Some("Instance")),
    ("LuaSourceContainer", Some("Instance")),
    ("BaseScript", Some("LuaSourceContainer")),
    ("Script", Some("BaseScript")),
    ("LocalScript", Some("Script")),
    ("ModuleScript", Some("LuaSourceContainer")),
    ("Light", Some("Instance")),
    ("PointLight", Some("Light")),
];

/// Class name to parent class name table.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    parents: HashMap<String, Option<String>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_classes() -> Self {
        let mut registry = Self::new();
        for (class_name, parent) in BUILTIN_CLASSES {
            registry.register(class_name, *parent);
        }
        registry
    }

    /// Registers or replaces a class. Registering an existing class overrides its parent.
    pub fn register(&mut self, class_name: &str, parent: Option<&str>) {
        self.parents.insert(class_name.to_string(), parent.map(str::to_string));
    }

    pub fn extend<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (class_name, parent) in entries {
            let parent = (!parent.is_empty()).then_some(parent.as_str());
            self.register(class_name, parent);
        }
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.parents.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// True when `class_name` is `ancestor` or inherits from it.
    pub fn is_a(&self, class_name: &str, ancestor: &str) -> bool {
        let mut cursor = Some(class_name.to_string());
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.parents.len() {
                return false;
            }
            cursor = self.parent_class_name(&current);
        }
        false
    }
}

impl ClassHierarchy for ClassRegistry {
    fn parent_class_name(&self, class_name: &str) -> Option<String> {
        self.parents.get(class_name).cloned().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_chain_reaches_instance() {
        let classes = ClassRegistry::with_builtin_classes();
        assert_eq!(classes.parent_class_name("Part").as_deref(), Some("BasePart"));
        assert!(classes.is_a("Part", "Instance"));
        assert!(classes.is_a("Workspace", "PVInstance"));
        assert!(!classes.is_a("Sound", "BasePart"));
        assert_eq!(classes.parent_class_name("Instance"), None);
        assert_eq!(classes.parent_class_name("Unknown"), None);
    }

    #[test]
    fn extend_overrides_and_treats_empty_parent_as_root() {
        let mut classes = ClassRegistry::with_builtin_classes();
        let extra: std::collections::BTreeMap<String, String> = [
            ("Truss".to_string(), "BasePart".to_string()),
            ("Sound".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        classes.extend(&extra);
        assert!(classes.is_a("Truss", "Instance"));
        assert_eq!(classes.parent_class_name("Sound"), None);
    }

    #[test]
    fn is_a_terminates_on_cycles() {
        let mut classes = ClassRegistry::new();
        classes.register("A", Some("B"));
        classes.register("B", Some("A"));
        assert!(!classes.is_a("A", "Instance"));
    }
}
