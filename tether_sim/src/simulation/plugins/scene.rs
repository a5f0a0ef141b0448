// tether_sim/src/simulation/plugins/scene.rs

//! The engine's scene graph, backed by Bevy entities.
//!
//! `SimSceneGraph` keeps the state the engine queries synchronously (anchor
//! transforms, attached objects) and forwards every mutation as a
//! [`SceneCommand`]. The `apply_scene_commands` system replays those commands
//! onto the ECS world once per frame.

use crossbeam_channel::{Receiver, Sender};
use nalgebra::Point3;
use std::collections::{HashMap, HashSet};
use tether_core::math::world_to_local;
use tether_core::types::Transform;

use crate::prelude::*;
use crate::simulation::core::transforms::{
    matrix_to_bevy_transform, object_to_bevy_transform, point_to_bevy,
};
use crate::simulation::plugins::engine::TetherEngine;

// =========================================================================
// == Commands ==
// =========================================================================

#[derive(Debug, Clone)]
pub enum SceneCommand {
    SyncAnchor { anchor: AnchorId, transform: Transform },
    RemoveAnchor(AnchorId),
    AttachPlane(Plane),
    UpdatePlane(Plane),
    DetachPlane(AnchorId),
    AttachObject(ObjectNode),
    SyncObject(ObjectNode),
    DetachObject(ObjectId),
    EnvironmentIntensity(f64),
}

/// The renderable state of a virtual object.
#[derive(Debug, Clone)]
pub struct ObjectNode {
    pub id: ObjectId,
    pub name: String,
    pub bevy_transform: bevy::prelude::Transform,
}

impl From<&VirtualObject> for ObjectNode {
    fn from(object: &VirtualObject) -> Self {
        Self {
            id: object.id,
            name: object.descriptor.name.clone(),
            bevy_transform: object_to_bevy_transform(&object.position, &object.orientation, object.scale),
        }
    }
}

// =========================================================================
// == SceneGraph Implementation ==
// =========================================================================

#[derive(Debug)]
pub struct SimSceneGraph {
    commands: Sender<SceneCommand>,
    anchors: HashMap<AnchorId, Transform>,
    objects: HashSet<ObjectId>,
}

impl SimSceneGraph {
    pub fn channel() -> (Self, SceneCommandQueue) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let scene = Self {
            commands: sender,
            anchors: HashMap::new(),
            objects: HashSet::new(),
        };
        (scene, SceneCommandQueue(receiver))
    }

    fn send(&self, command: SceneCommand) {
        if self.commands.send(command).is_err() {
            warn!("Scene command queue is closed");
        }
    }
}

impl SceneGraph for SimSceneGraph {
    fn sync_anchor_node(&mut self, anchor: &PlaneAnchor) -> NodeHandle {
        self.anchors.insert(anchor.id, anchor.transform);
        self.send(SceneCommand::SyncAnchor {
            anchor: anchor.id,
            transform: anchor.transform,
        });
        NodeHandle(anchor.id.0)
    }

    fn remove_anchor_node(&mut self, anchor: AnchorId) {
        if self.anchors.remove(&anchor).is_some() {
            self.send(SceneCommand::RemoveAnchor(anchor));
        }
    }

    fn node_for_anchor(&self, anchor: AnchorId) -> Option<NodeHandle> {
        self.anchors.contains_key(&anchor).then_some(NodeHandle(anchor.0))
    }

    fn attach_plane(&mut self, _parent: NodeHandle, plane: &Plane) {
        self.send(SceneCommand::AttachPlane(plane.clone()));
    }

    fn update_plane(&mut self, plane: &Plane) {
        self.send(SceneCommand::UpdatePlane(plane.clone()));
    }

    fn detach_plane(&mut self, anchor: AnchorId) {
        self.send(SceneCommand::DetachPlane(anchor));
    }

    fn attach_object(&mut self, object: &VirtualObject) {
        self.objects.insert(object.id);
        self.send(SceneCommand::AttachObject(object.into()));
    }

    fn detach_object(&mut self, object: ObjectId) {
        if self.objects.remove(&object) {
            self.send(SceneCommand::DetachObject(object));
        }
    }

    fn is_object_attached(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    fn sync_object(&mut self, object: &VirtualObject) {
        self.send(SceneCommand::SyncObject(object.into()));
    }

    fn convert_to_local(&self, node: NodeHandle, world: &Point3<f64>) -> Option<Point3<f64>> {
        let transform = self.anchors.get(&AnchorId(node.0))?;
        world_to_local(transform, world)
    }

    fn set_environment_intensity(&mut self, intensity: f64) {
        self.send(SceneCommand::EnvironmentIntensity(intensity));
    }
}

// =========================================================================
// == Bevy Side ==
// =========================================================================

#[derive(Resource)]
pub struct SceneCommandQueue(pub Receiver<SceneCommand>);

/// Marks the node that follows a plane anchor.
#[derive(Component, Debug)]
pub struct AnchorNode(pub AnchorId);

/// The visual of a detected plane, a child of its anchor node.
#[derive(Component, Debug, Clone)]
pub struct PlaneVisual {
    pub anchor: AnchorId,
    pub extent: PlaneExtent,
    pub show_debug: bool,
}

#[derive(Component, Debug)]
pub struct VirtualObjectNode(pub ObjectId);

/// Where the crosshair's hit test landed, shown while hit-test visualization is on.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct HitTestMarker {
    pub source: HitSource,
    pub on_surface: bool,
}

/// Entity lookup for everything the engine has put in the scene.
#[derive(Resource, Debug, Default)]
pub struct SceneIndex {
    pub anchors: HashMap<AnchorId, Entity>,
    pub planes: HashMap<AnchorId, Entity>,
    pub objects: HashMap<ObjectId, Entity>,
}

/// Intensity of the environment light, as last set by the engine.
#[derive(Resource, Debug, Default)]
pub struct EnvironmentLighting(pub f64);

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneIndex>()
            .init_resource::<EnvironmentLighting>()
            .add_systems(
                Update,
                (apply_scene_commands, sync_hit_test_marker)
                    .chain()
                    .in_set(SimulationSet::Scene),
            );
    }
}

fn plane_transform(plane: &Plane) -> bevy::prelude::Transform {
    bevy::prelude::Transform::from_xyz(plane.center.x as f32, plane.center.y as f32, plane.center.z as f32)
}

fn plane_visual(plane: &Plane) -> PlaneVisual {
    PlaneVisual {
        anchor: plane.anchor(),
        extent: plane.extent,
        show_debug: plane.show_debug,
    }
}

fn apply_scene_commands(
    mut commands: Commands,
    queue: Option<Res<SceneCommandQueue>>,
    mut index: ResMut<SceneIndex>,
    mut lighting: ResMut<EnvironmentLighting>,
    mut nodes: Query<&mut bevy::prelude::Transform>,
    mut visuals: Query<&mut PlaneVisual>,
) {
    let Some(queue) = queue else {
        return;
    };
    for command in queue.0.try_iter() {
        match command {
            SceneCommand::SyncAnchor { anchor, transform } => {
                let bevy_transform = matrix_to_bevy_transform(&transform);
                match index.anchors.get(&anchor) {
                    Some(&entity) => {
                        if let Ok(mut node) = nodes.get_mut(entity) {
                            *node = bevy_transform;
                        }
                    }
                    None => {
                        let entity = commands
                            .spawn((
                                Name::new(format!("anchor-{}", anchor.0)),
                                AnchorNode(anchor),
                                bevy_transform,
                            ))
                            .id();
                        index.anchors.insert(anchor, entity);
                    }
                }
            }
            SceneCommand::RemoveAnchor(anchor) => {
                index.planes.remove(&anchor);
                if let Some(entity) = index.anchors.remove(&anchor) {
                    commands.entity(entity).despawn();
                }
            }
            SceneCommand::AttachPlane(plane) => {
                let Some(&parent) = index.anchors.get(&plane.anchor()) else {
                    warn!("Plane for {:?} has no anchor node", plane.anchor());
                    continue;
                };
                let child = commands
                    .spawn((
                        Name::new(format!("plane-{}", plane.anchor().0)),
                        plane_visual(&plane),
                        plane_transform(&plane),
                    ))
                    .id();
                commands.entity(parent).add_child(child);
                index.planes.insert(plane.anchor(), child);
            }
            SceneCommand::UpdatePlane(plane) => {
                if let Some(&entity) = index.planes.get(&plane.anchor()) {
                    if let Ok(mut visual) = visuals.get_mut(entity) {
                        *visual = plane_visual(&plane);
                    }
                    if let Ok(mut node) = nodes.get_mut(entity) {
                        *node = plane_transform(&plane);
                    }
                }
            }
            SceneCommand::DetachPlane(anchor) => {
                if let Some(entity) = index.planes.remove(&anchor) {
                    commands.entity(entity).despawn();
                }
            }
            SceneCommand::AttachObject(node) => {
                let entity = commands
                    .spawn((Name::new(node.name), VirtualObjectNode(node.id), node.bevy_transform))
                    .id();
                index.objects.insert(node.id, entity);
            }
            SceneCommand::SyncObject(node) => {
                if let Some(&entity) = index.objects.get(&node.id) {
                    if let Ok(mut transform) = nodes.get_mut(entity) {
                        *transform = node.bevy_transform;
                    }
                }
            }
            SceneCommand::DetachObject(id) => {
                if let Some(entity) = index.objects.remove(&id) {
                    commands.entity(entity).despawn();
                }
            }
            SceneCommand::EnvironmentIntensity(intensity) => lighting.0 = intensity,
        }
    }
}

/// Keeps at most one marker entity in step with the engine's crosshair hit.
fn sync_hit_test_marker(
    mut commands: Commands,
    engine: Res<TetherEngine>,
    mut markers: Query<(Entity, &mut HitTestMarker, &mut bevy::prelude::Transform)>,
) {
    let Some(hit) = engine.0.hit_test_visualization() else {
        for (entity, _, _) in &markers {
            commands.entity(entity).despawn();
        }
        return;
    };
    let marker = HitTestMarker {
        source: hit.source,
        on_surface: hit.hit_confirmed_surface,
    };
    let translation = point_to_bevy(&hit.position);
    match markers.single_mut() {
        Ok((_, mut current, mut transform)) => {
            if *current != marker {
                debug!("[SCENE] Hit-test marker now from {:?}", marker.source);
                *current = marker;
            }
            transform.translation = translation;
        }
        Err(_) => {
            commands.spawn((
                marker,
                bevy::prelude::Transform::from_translation(translation),
                Name::new("hit-test-marker"),
            ));
        }
    }
}
