//! glTF model import and the background fetch that feeds it to the scene.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

use glam::{Quat, Vec3, Vec4};
use thiserror::Error;

use crate::scene::{MeshData, SceneNode, Transform};

/// Errors from loading a model asset.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    /// The file could not be read or parsed.
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    /// The document has no scene to instantiate.
    #[error("glTF document contains no scene")]
    EmptyScene,

    /// The loader thread could not be started or died.
    #[error("model loader worker failed: {0}")]
    Worker(String),
}

/// Imports a glTF (`.gltf` or `.glb`) file into a single root node.
pub fn import_gltf(path: impl AsRef<Path>) -> Result<SceneNode, ModelLoadError> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)?;
    let name = path
        .file_stem()
        .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned());
    convert_document(&name, &document, &buffers)
}

/// Imports glTF data already in memory.
pub fn import_gltf_slice(name: &str, bytes: &[u8]) -> Result<SceneNode, ModelLoadError> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    convert_document(name, &document, &buffers)
}

fn convert_document(
    name: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<SceneNode, ModelLoadError> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(ModelLoadError::EmptyScene)?;

    let mut root = SceneNode::group(name);
    for node in scene.nodes() {
        root.children.push(convert_node(&node, buffers));
    }
    Ok(root)
}

fn convert_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let name = node
        .name()
        .map_or_else(|| format!("node {}", node.index()), str::to_owned);
    let (translation, rotation, scale) = node.transform().decomposed();

    let mut out = SceneNode::group(name);
    out.transform = Transform::from_trs(
        Vec3::from(translation),
        Quat::from_array(rotation),
        Vec3::from(scale),
    );

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .map_or_else(|| format!("mesh {}", mesh.index()), str::to_owned);
        for primitive in mesh.primitives() {
            if let Some(data) = convert_primitive(&primitive, buffers) {
                let label = format!("{mesh_name}/{}", primitive.index());
                out.children.push(SceneNode::mesh(label, Arc::new(data)));
            }
        }
    }

    for child in node.children() {
        out.children.push(convert_node(&child, buffers));
    }
    out
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
) -> Option<MeshData> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::debug!("skipping non-triangle primitive ({:?})", primitive.mode());
        return None;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
    let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from).collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..u32::try_from(positions.len()).ok()?).collect(),
    };
    let base_color = Vec4::from(
        primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_factor(),
    );

    Some(MeshData {
        positions,
        indices,
        base_color,
    })
}

/// Result of polling a [`ModelFetch`].
#[derive(Debug)]
pub enum FetchPoll {
    /// Still loading.
    Pending,
    /// Finished; the result is handed over exactly once.
    Ready(Result<SceneNode, ModelLoadError>),
    /// Nothing to wait for: already delivered or cancelled.
    Idle,
}

/// A model load running on a worker thread.
pub struct ModelFetch {
    path: PathBuf,
    receiver: Option<Receiver<Result<SceneNode, ModelLoadError>>>,
    cancelled: Arc<AtomicBool>,
}

impl ModelFetch {
    /// Starts loading `path` in the background.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_path = path.clone();
        let worker_cancelled = cancelled.clone();
        let spawned = std::thread::Builder::new()
            .name("model loader".into())
            .spawn(move || {
                let result = import_gltf(&worker_path);
                if worker_cancelled.load(Ordering::Acquire) {
                    log::debug!("discarding model {} loaded after cancel", worker_path.display());
                    return;
                }
                let _ = tx.send(result);
            });

        let receiver = match spawned {
            Ok(_) => rx,
            Err(e) => {
                let (tx, rx) = mpsc::channel();
                let _ = tx.send(Err(ModelLoadError::Worker(e.to_string())));
                rx
            }
        };

        Self {
            path,
            receiver: Some(receiver),
            cancelled,
        }
    }

    /// Path being loaded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until the result is delivered or the fetch is cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }

    /// Checks for a result without blocking.
    pub fn poll(&mut self) -> FetchPoll {
        let Some(receiver) = &self.receiver else {
            return FetchPoll::Idle;
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                FetchPoll::Ready(result)
            }
            Err(TryRecvError::Empty) => FetchPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                if self.cancelled.load(Ordering::Acquire) {
                    FetchPoll::Idle
                } else {
                    FetchPoll::Ready(Err(ModelLoadError::Worker(
                        "loader exited without a result".into(),
                    )))
                }
            }
        }
    }

    /// Blocks until the load finishes. Returns `None` if cancelled.
    pub fn wait(mut self) -> Option<Result<SceneNode, ModelLoadError>> {
        let receiver = self.receiver.take()?;
        receiver.recv().ok()
    }

    /// Abandons the load; a late result is dropped by the worker.
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if self.receiver.take().is_some() {
            log::debug!("cancelled model fetch for {}", self.path.display());
        }
    }
}

impl std::fmt::Debug for ModelFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFetch")
            .field("path", &self.path)
            .field("pending", &self.is_pending())
            .finish()
    }
}
