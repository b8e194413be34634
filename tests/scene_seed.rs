use instance_mirror::config::StudioConfig;
use instance_mirror::ecs::EcsWorld;
use instance_mirror::panel::PropertySheet;
use instance_mirror::scene::Scene;
use instance_mirror::session::ExplorerSession;
use std::fs;

#[test]
fn scene_file_seeds_a_mirrored_world() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("place.json");
    fs::write(
        &path,
        r#"{
            "service": "Workspace",
            "instances": [
                { "id": "1", "name": "Baseplate", "class_name": "Part", "parent_locked": true },
                { "id": "2", "name": "Spawn", "class_name": "Model" },
                { "id": "3", "name": "Pad", "class_name": "Part", "parent": "2" }
            ]
        }"#,
    )
    .expect("write scene");

    let mut ecs = EcsWorld::with_default_services();
    let root = ecs.root().expect("root");
    let mut session = ExplorerSession::from_config(&StudioConfig::default());
    session.attach(&mut ecs, root, true);
    let mut sheet = PropertySheet::new();

    let scene = Scene::load_from_path(&path).expect("load scene");
    ecs.load_scene(&scene).expect("seed");
    let report = session.pump(&mut ecs, &mut sheet);
    assert_eq!(report.stale, 0);

    let outline = session.mirror().outline();
    assert!(outline.contains("    Baseplate [Part]"), "{outline}");
    assert!(outline.contains("      Pad [Part]"), "{outline}");
    assert_eq!(session.mirror().registry().len(), ecs.instance_count());
}

#[test]
fn malformed_scene_reports_its_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ \"instances\": [ { \"id\": \"1\" } ] }").expect("write scene");
    let err = Scene::load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}
