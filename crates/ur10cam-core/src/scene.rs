//! Scene graph: nodes, transforms, lights and the background slot.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::capture::FrameSource;

/// A transformation represented as separate components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform from translation, rotation and scale.
    #[must_use]
    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Converts to a Mat4.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// CPU-side triangle mesh, one per glTF primitive.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Linear RGBA base color of the material.
    pub base_color: Vec4,
}

/// Uniform light applied equally to every surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl AmbientLight {
    /// Color scaled by intensity.
    #[must_use]
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

/// What a node contributes to the scene.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure transform node.
    Group,
    Mesh(Arc<MeshData>),
    AmbientLight(AmbientLight),
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Creates an empty group node.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    /// Creates a mesh node.
    pub fn mesh(name: impl Into<String>, mesh: Arc<MeshData>) -> Self {
        Self {
            kind: NodeKind::Mesh(mesh),
            ..Self::group(name)
        }
    }

    /// Creates an ambient light node.
    pub fn ambient_light(name: impl Into<String>, light: AmbientLight) -> Self {
        Self {
            kind: NodeKind::AmbientLight(light),
            ..Self::group(name)
        }
    }

    /// Adds a child and returns `self` for chaining.
    #[must_use]
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Sets a uniform scale.
    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.transform.scale = Vec3::splat(scale);
    }

    /// Sets the translation.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
    }

    /// Number of nodes in this subtree, including `self`.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SceneNode::subtree_len).sum::<usize>()
    }

    /// Calls `f` for every mesh in this subtree with its world matrix.
    pub fn visit_meshes<F>(&self, parent: Mat4, f: &mut F)
    where
        F: FnMut(&Arc<MeshData>, Mat4),
    {
        let world = parent * self.transform.to_matrix();
        if let NodeKind::Mesh(mesh) = &self.kind {
            f(mesh, world);
        }
        for child in &self.children {
            child.visit_meshes(world, f);
        }
    }
}

/// Texture filtering mode for sampled backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// A texture whose pixels come live from a [`FrameSource`].
#[derive(Clone)]
pub struct VideoTexture {
    source: Arc<dyn FrameSource>,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl VideoTexture {
    /// Creates a video texture with linear min/mag filtering.
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self {
            source,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
        }
    }

    /// The frame source sampled on every draw.
    pub fn source(&self) -> &Arc<dyn FrameSource> {
        &self.source
    }
}

impl std::fmt::Debug for VideoTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoTexture")
            .field("min_filter", &self.min_filter)
            .field("mag_filter", &self.mag_filter)
            .finish_non_exhaustive()
    }
}

/// What is drawn behind the scene.
#[derive(Debug, Clone)]
pub enum Background {
    Color(Vec3),
    Video(VideoTexture),
}

/// Root of the scene graph.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    /// Unset until a camera stream is bound.
    pub background: Option<Background>,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level node and returns its index.
    pub fn add(&mut self, node: SceneNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Number of top-level nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Top-level nodes.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Finds a top-level node by name.
    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Sum of all ambient lights anywhere in the graph.
    #[must_use]
    pub fn ambient_radiance(&self) -> Vec3 {
        fn walk(node: &SceneNode, acc: &mut Vec3) {
            if let NodeKind::AmbientLight(light) = &node.kind {
                *acc += light.radiance();
            }
            for child in &node.children {
                walk(child, acc);
            }
        }
        let mut acc = Vec3::ZERO;
        for node in &self.nodes {
            walk(node, &mut acc);
        }
        acc
    }

    /// Calls `f` for every mesh in the scene with its world matrix.
    pub fn visit_meshes<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<MeshData>, Mat4),
    {
        for node in &self.nodes {
            node.visit_meshes(Mat4::IDENTITY, &mut f);
        }
    }

    /// Removes every node and the background.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.background = None;
    }
}
