//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ur10cam::ViewerOptions;

/// Packs a JSON document and a binary chunk into a GLB container.
pub fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut json = json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let mut bin = bin.to_vec();
    while bin.len() % 4 != 0 {
        bin.push(0);
    }
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

/// A red 20x20 quad standing on the origin in the XY plane.
///
/// With the default model transform (scale 0.1, offset (0, -3, 0)) it covers
/// x in [-1, 1], y in [-3, -1] in front of the default camera.
pub fn red_quad_glb() -> Vec<u8> {
    let json = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "name": "base_link", "mesh": 0 } ],
        "meshes": [ { "name": "quad", "primitives": [ { "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 } ] } ],
        "materials": [ { "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } } ],
        "buffers": [ { "byteLength": 60 } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 48 },
            { "buffer": 0, "byteOffset": 48, "byteLength": 12 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
              "min": [-10.0, 0.0, 0.0], "max": [10.0, 20.0, 0.0] },
            { "bufferView": 1, "componentType": 5123, "count": 6, "type": "SCALAR" }
        ]
    }"#;

    let positions: [f32; 12] = [
        -10.0, 0.0, 0.0, //
        10.0, 0.0, 0.0, //
        10.0, 20.0, 0.0, //
        -10.0, 20.0, 0.0,
    ];
    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
    let mut bin: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
    bin.extend(indices.iter().flat_map(|i| i.to_le_bytes()));
    glb(json, &bin)
}

/// A fresh per-test directory under the system temp dir.
pub fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ur10cam-it-{tag}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Options loading `file` from `dir` with capture disabled.
pub fn options_for(dir: &Path, file: &str) -> ViewerOptions {
    let mut options = ViewerOptions::default();
    options.model.asset_root = dir.to_path_buf();
    options.model.path = PathBuf::from(file);
    options.capture.backend = ur10cam::CaptureBackend::None;
    options
}

/// Options pointing at a model file that does not exist.
pub fn options_without_model(tag: &str) -> ViewerOptions {
    options_for(&temp_dir(tag), "missing.glb")
}
