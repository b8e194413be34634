use instance_mirror::classes::ClassRegistry;
use instance_mirror::ecs::EcsWorld;
use instance_mirror::icons::{ClassIconResolver, Icon, MemoryIconSource};
use instance_mirror::mirror::TreeMirror;

#[test]
fn repeated_class_resolves_with_one_walk() {
    let generic = Icon::solid("Instance", [90, 90, 90, 255], 2);
    let mut icons = ClassIconResolver::new(
        Box::new(ClassRegistry::with_builtin_classes()),
        Box::new(MemoryIconSource::new().with("Instance", generic.clone())),
    );
    let first = icons.resolve("Sound");
    let lookups = icons.resource_lookups();
    let second = icons.resolve("Sound");
    assert!(first.ptr_eq(&generic));
    assert!(second.ptr_eq(&first));
    assert_eq!(icons.walks(), 1);
    assert_eq!(icons.resource_lookups(), lookups, "second resolve is served from the cache");
}

#[test]
fn mirroring_many_parts_walks_once_per_class() {
    let mut ecs = EcsWorld::with_default_services();
    let root = ecs.root().expect("root");
    let workspace = ecs.find_path("Workspace").expect("workspace");
    for i in 0..20 {
        ecs.spawn_instance("Part", &format!("Part{i}"), Some(workspace)).expect("spawn");
    }
    let part_icon = Icon::solid("BasePart", [200, 120, 40, 255], 2);
    let mut mirror = TreeMirror::new(ClassIconResolver::new(
        Box::new(ClassRegistry::with_builtin_classes()),
        Box::new(MemoryIconSource::new().with("BasePart", part_icon.clone())),
    ));
    mirror.mirror(&mut ecs, root);

    let icons = mirror.icons();
    // DataModel, the six services and Part.
    assert_eq!(icons.walks(), 8);
    let part = ecs.find_path("Workspace.Part7").expect("part");
    let row = mirror.view().get(mirror.view_of(part).expect("row")).expect("node");
    assert!(row.icon().ptr_eq(&part_icon));
}
