//! Scene snapshots
//!
//! The renderer never discovers nodes on its own. Whatever owns the scene
//! hands it an ordered snapshot once per frame through [`SceneSource`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::node::SdfNode;

/// Errors that can occur when loading or saving scene files
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scene file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Produces the active node set for a frame.
pub trait SceneSource {
    /// Active nodes, ordered by their `order` key.
    ///
    /// Nodes sharing a key keep their relative position, so the result is
    /// stable from frame to frame as long as the scene does not change.
    fn snapshot(&self) -> Vec<SdfNode>;
}

/// A flat list of SDF nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub nodes: Vec<SdfNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<SdfNode>) -> Self {
        Self { nodes }
    }

    /// Append a node, assigning it the next order key after the current maximum.
    ///
    /// Once some node holds `i32::MAX` the new node shares that key and
    /// lands after it by insertion order.
    pub fn push(&mut self, node: SdfNode) {
        let order = self
            .nodes
            .iter()
            .map(|n| n.order.saturating_add(1))
            .max()
            .unwrap_or(0);
        self.nodes.push(node.with_order(order));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let contents = std::fs::read_to_string(path)?;
        let scene = Self::from_json(&contents)?;
        tracing::debug!(
            "Loaded {} nodes from {}",
            scene.nodes.len(),
            path.display()
        );
        Ok(scene)
    }

    pub fn save(&self, path: &Path) -> Result<(), SceneError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl SceneSource for Scene {
    fn snapshot(&self) -> Vec<SdfNode> {
        self.nodes.snapshot()
    }
}

impl SceneSource for [SdfNode] {
    fn snapshot(&self) -> Vec<SdfNode> {
        let mut nodes: Vec<SdfNode> = self.iter().filter(|n| n.active).cloned().collect();
        // stable sort: equal keys keep insertion order
        nodes.sort_by_key(|n| n.order);
        nodes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::node::{SdfKind, SdfOperation};
    use glam::Vec3;

    #[test]
    fn test_snapshot_sorts_by_order() {
        let scene = Scene::with_nodes(vec![
            SdfNode::sphere(1.0).named("c").with_order(2),
            SdfNode::sphere(1.0).named("a").with_order(-1),
            SdfNode::sphere(1.0).named("b").with_order(0),
        ]);
        let labels: Vec<String> = scene
            .snapshot()
            .iter()
            .map(|n| n.label().to_string())
            .collect();

        assert_eq!(labels, ["a", "b", "c"]);
    }

    #[test]
    fn test_snapshot_is_stable_for_equal_keys() {
        let scene = Scene::with_nodes(vec![
            SdfNode::sphere(1.0).named("first"),
            SdfNode::cuboid(Vec3::ONE).named("second"),
            SdfNode::torus(1.0, 0.2).named("third"),
        ]);

        let a = scene.snapshot();
        let b = scene.snapshot();
        assert_eq!(a, b);
        assert_eq!(a[0].label(), "first");
        assert_eq!(a[2].label(), "third");
    }

    #[test]
    fn test_snapshot_skips_inactive() {
        let scene = Scene::with_nodes(vec![
            SdfNode::sphere(1.0),
            SdfNode::sphere(2.0).inactive(),
        ]);

        assert_eq!(scene.snapshot().len(), 1);
    }

    #[test]
    fn test_push_assigns_increasing_order() {
        let mut scene = Scene::new();
        scene.push(SdfNode::sphere(1.0).with_order(10));
        scene.push(SdfNode::sphere(1.0));

        assert_eq!(scene.nodes[0].order, 0);
        assert_eq!(scene.nodes[1].order, 1);
    }

    #[test]
    fn test_push_after_max_order_stays_last() {
        let mut scene = Scene::with_nodes(vec![
            SdfNode::sphere(1.0).named("base").with_order(i32::MAX),
        ]);
        scene.push(SdfNode::cuboid(Vec3::ONE).named("cut").with_operation(SdfOperation::Cut));

        assert_eq!(scene.nodes[1].order, i32::MAX);
        let labels: Vec<String> = scene
            .snapshot()
            .iter()
            .map(|n| n.label().to_string())
            .collect();
        assert_eq!(labels, ["base", "cut"]);
    }

    #[test]
    fn test_scene_json_round_trip() {
        let mut scene = Scene::new();
        scene.push(SdfNode::sphere(0.5).named("ball"));
        scene.push(
            SdfNode::cuboid(Vec3::splat(0.3))
                .with_operation(SdfOperation::Cut)
                .at(Vec3::X),
        );

        let parsed = Scene::from_json(&scene.to_json().unwrap()).unwrap();
        assert_eq!(parsed, scene);
    }

    #[test]
    fn test_scene_json_minimal() {
        let json = r#"{
            "nodes": [
                { "kind": "box", "operation": "mask", "transform": { "position": [0, 1, 0] } },
                { "kind": "mandelbulb", "data": [8, 10, 0, 0], "material": { "color": [1, 0, 0] } }
            ]
        }"#;
        let scene = Scene::from_json(json).unwrap();

        assert_eq!(scene.len(), 2);
        assert_eq!(scene.nodes[0].kind, SdfKind::Box);
        assert_eq!(scene.nodes[0].transform.position, Vec3::Y);
        assert_eq!(scene.nodes[0].transform.scale, Vec3::ONE);
        assert_eq!(scene.nodes[1].material.color, [1.0, 0.0, 0.0]);
        assert_eq!(scene.nodes[1].material.roughness, 1.0);
    }

    #[test]
    fn test_scene_json_rejects_unknown_kind() {
        let result = Scene::from_json(r#"{ "nodes": [ { "kind": "teapot" } ] }"#);
        assert!(matches!(result, Err(SceneError::Parse(_))));
    }
}
