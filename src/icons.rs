use crate::source::ClassHierarchy;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MAX_SOLID_ICON_SIZE: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconImage {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decoded class icon. The default value is the empty icon shown when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icon(Option<Arc<IconImage>>);

impl Icon {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn from_image(image: IconImage) -> Self {
        Self(Some(Arc::new(image)))
    }

    /// Square single-colour icon, handy for embedded defaults. The side is clamped to
    /// [`MAX_SOLID_ICON_SIZE`].
    pub fn solid(source: impl Into<String>, color: [u8; 4], size: u32) -> Self {
        let size = size.min(MAX_SOLID_ICON_SIZE);
        let len = size as usize * size as usize * color.len();
        let rgba = color.iter().copied().cycle().take(len).collect();
        Self::from_image(IconImage { source: source.into(), width: size, height: size, rgba })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn image(&self) -> Option<&IconImage> {
        self.0.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.0.as_ref().map(|image| image.source.as_str())
    }

    /// True when both handles share the same decoded image.
    pub fn ptr_eq(&self, other: &Icon) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Where icon resources come from, keyed by exact class name.
pub trait IconSource {
    fn load(&self, class_name: &str) -> Option<Icon>;
}

/// Reads `<root>/<ClassName>.<extension>` and decodes it to RGBA8.
pub struct DirectoryIconSource {
    root: PathBuf,
    extension: String,
}

impl DirectoryIconSource {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { root: root.into(), extension: extension.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, class_name: &str) -> PathBuf {
        self.root.join(format!("{class_name}.{}", self.extension))
    }
}

impl IconSource for DirectoryIconSource {
    fn load(&self, class_name: &str) -> Option<Icon> {
        let path = self.path_for(class_name);
        if !path.is_file() {
            return None;
        }
        match image::open(&path) {
            Ok(decoded) => {
                let rgba = decoded.to_rgba8();
                let (width, height) = rgba.dimensions();
                Some(Icon::from_image(IconImage {
                    source: path.display().to_string(),
                    width,
                    height,
                    rgba: rgba.into_raw(),
                }))
            }
            Err(err) => {
                warn!(target: "icons", "failed to decode {}: {err}", path.display());
                None
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryIconSource {
    icons: HashMap<String, Icon>,
}

impl MemoryIconSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_name: impl Into<String>, icon: Icon) {
        self.icons.insert(class_name.into(), icon);
    }

    pub fn with(mut self, class_name: impl Into<String>, icon: Icon) -> Self {
        self.insert(class_name, icon);
        self
    }
}

impl IconSource for MemoryIconSource {
    fn load(&self, class_name: &str) -> Option<Icon> {
        self.icons.get(class_name).cloned()
    }
}

/// Memoized class name to icon lookup with fallback through parent classes.
pub struct ClassIconResolver {
    classes: Box<dyn ClassHierarchy>,
    source: Box<dyn IconSource>,
    cache: HashMap<String, Icon>,
    walks: usize,
    resource_lookups: usize,
}

impl ClassIconResolver {
    pub fn new(classes: Box<dyn ClassHierarchy>, source: Box<dyn IconSource>) -> Self {
        Self { classes, source, cache: HashMap::new(), walks: 0, resource_lookups: 0 }
    }

    pub fn resolve(&mut self, class_name: &str) -> Icon {
        if class_name.is_empty() {
            return Icon::empty();
        }
        if let Some(icon) = self.cache.get(class_name) {
            return icon.clone();
        }
        self.walks += 1;

        let mut visited = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(class_name.to_string());
        let resolved = loop {
            let Some(current) = cursor.take() else {
                break Icon::empty();
            };
            if let Some(icon) = self.cache.get(&current) {
                break icon.clone();
            }
            if !seen.insert(current.clone()) {
                warn!(target: "icons", "class hierarchy of '{class_name}' loops back to '{current}'");
                break Icon::empty();
            }
            self.resource_lookups += 1;
            if let Some(icon) = self.source.load(&current) {
                visited.push(current);
                break icon;
            }
            cursor = self.classes.parent_class_name(&current).filter(|parent| !parent.is_empty());
            visited.push(current);
        };

        debug!(
            target: "icons",
            "resolved '{class_name}' via {} class(es) to {}",
            visited.len(),
            resolved.source().unwrap_or("<default>")
        );
        for name in visited {
            self.cache.insert(name, resolved.clone());
        }
        resolved
    }

    pub fn is_cached(&self, class_name: &str) -> bool {
        self.cache.contains_key(class_name)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of cache misses that required a hierarchy walk.
    pub fn walks(&self) -> usize {
        self.walks
    }

    pub fn resource_lookups(&self) -> usize {
        self.resource_lookups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassRegistry;

    fn resolver(source: MemoryIconSource) -> ClassIconResolver {
        ClassIconResolver::new(Box::new(ClassRegistry::with_builtin_classes()), Box::new(source))
    }

    #[test]
    fn falls_back_to_parent_class_and_memoizes_every_step() {
        let base = Icon::solid("BasePart", [200, 200, 200, 255], 2);
        let mut icons = resolver(MemoryIconSource::new().with("BasePart", base.clone()));

        let part = icons.resolve("Part");
        assert!(part.ptr_eq(&base));
        assert!(icons.is_cached("Part"));
        assert!(icons.is_cached("BasePart"));
        assert!(!icons.is_cached("PVInstance"));

        let lookups = icons.resource_lookups();
        assert!(icons.resolve("BasePart").ptr_eq(&base));
        assert_eq!(icons.resource_lookups(), lookups);
        assert_eq!(icons.walks(), 1);
    }

    #[test]
    fn solid_icons_clamp_oversized_sides() {
        let icon = Icon::solid("Huge", [1, 2, 3, 4], 40_000);
        let image = icon.image().expect("image");
        assert_eq!(image.width, MAX_SOLID_ICON_SIZE);
        assert_eq!(image.rgba.len(), (MAX_SOLID_ICON_SIZE * MAX_SOLID_ICON_SIZE * 4) as usize);
        assert_eq!(&image.rgba[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn exact_match_wins_over_parent() {
        let base = Icon::solid("BasePart", [1, 1, 1, 255], 1);
        let part = Icon::solid("Part", [2, 2, 2, 255], 1);
        let mut icons =
            resolver(MemoryIconSource::new().with("BasePart", base).with("Part", part.clone()));
        assert!(icons.resolve("Part").ptr_eq(&part));
    }

    #[test]
    fn unknown_and_empty_classes_get_the_default_icon() {
        let mut icons = resolver(MemoryIconSource::new());
        assert!(icons.resolve("").is_empty());
        assert_eq!(icons.walks(), 0);
        assert!(icons.resolve("NoSuchClass").is_empty());
        assert!(icons.resolve("Sound").is_empty());
        assert!(icons.is_cached("Instance"));
    }

    #[test]
    fn walk_reuses_memoized_ancestors() {
        let instance = Icon::solid("Instance", [9, 9, 9, 255], 1);
        let mut icons = resolver(MemoryIconSource::new().with("Instance", instance.clone()));
        icons.resolve("BasePart");
        let before = icons.resource_lookups();
        assert!(icons.resolve("Part").ptr_eq(&instance));
        assert_eq!(icons.resource_lookups(), before + 1, "only Part itself should be looked up");
    }

    #[test]
    fn cyclic_hierarchy_terminates_with_default_icon() {
        let mut classes = ClassRegistry::new();
        classes.register("A", Some("B"));
        classes.register("B", Some("A"));
        let mut icons = ClassIconResolver::new(Box::new(classes), Box::new(MemoryIconSource::new()));
        assert!(icons.resolve("A").is_empty());
        assert!(icons.is_cached("A"));
        assert!(icons.is_cached("B"));
    }

    #[test]
    fn directory_source_decodes_png_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
        image.save(dir.path().join("Folder.png")).expect("write png");

        let source = DirectoryIconSource::new(dir.path(), "png");
        let icon = source.load("Folder").expect("folder icon");
        let decoded = icon.image().expect("decoded image");
        assert_eq!((decoded.width, decoded.height), (4, 4));
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 255]);
        assert!(source.load("Part").is_none());
    }
}
