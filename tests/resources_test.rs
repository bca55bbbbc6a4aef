use tee_studio::{
    StudioConfig,
    data_structures::instance::Instance,
    resources::{GarmentAsset, load_garment_asset},
};

use crate::common::test_utils::{gltf_document, scratch_dir};

mod common;

#[test]
fn embedded_gltf_keeps_material_names_and_node_transforms() {
    let asset = GarmentAsset::from_slice(&gltf_document(&["Front", "Back"]), Instance::new()).unwrap();
    assert_eq!(asset.slot_names().collect::<Vec<_>>(), vec!["Front", "Back"]);
    assert_eq!(asset.meshes.len(), 2);

    let front = &asset.meshes[0];
    assert_eq!(front.material, 0);
    assert_eq!(front.indices, vec![0, 1, 2]);
    // The first node is translated one unit up.
    assert_eq!(front.vertices[2].position, [0.0, 2.0, 0.0]);
    assert_eq!(asset.meshes[1].vertices[2].position, [0.0, 1.0, 0.0]);
}

#[test]
fn garbage_is_not_a_garment() {
    assert!(GarmentAsset::from_slice(b"definitely not gltf", Instance::new()).is_err());
}

#[test]
fn loads_the_configured_garment_from_the_asset_root() {
    let root = scratch_dir("assets");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("shirt.gltf"), gltf_document(&["Front", "Back"])).unwrap();
    let config = StudioConfig {
        asset_root: root.clone(),
        model_path: "shirt.gltf".to_string(),
        model_offset: [0.0, -12.0, 0.0],
        model_scale: 0.9,
        ..Default::default()
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let asset = runtime.block_on(load_garment_asset(&config)).unwrap();
    assert_eq!(asset.placement.scale.x, 0.9);
    assert_eq!(asset.placement.position.y, -12.0);
    assert_eq!(asset.slot_names().count(), 2);

    let missing = StudioConfig {
        model_path: "hoodie.glb".to_string(),
        ..config
    };
    assert!(runtime.block_on(load_garment_asset(&missing)).is_err());
    let _ = std::fs::remove_dir_all(root);
}
