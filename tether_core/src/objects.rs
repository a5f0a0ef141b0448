// tether_core/src/objects.rs

//! The single active virtual object: its load lifecycle, placement and the
//! snap-to-surface animation.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, RecvError, TryRecvError};
use nalgebra::{Point3, UnitQuaternion};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::abstractions::{ObjectLoader, SceneGraph};
use crate::config::SNAP_ANIMATION_SECS;
use crate::error::LoadError;
use crate::math::ease_in_out;
use crate::smoothing::PlacementSmoother;
use crate::types::ObjectId;

// =========================================================================
// == Object Data ==
// =========================================================================

/// What to load: an entry of the host's object catalog.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObjectDescriptor {
    pub name: String,
    pub model_path: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Model data produced by an `ObjectLoader`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub name: String,
    pub vertex_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VirtualObject {
    pub id: ObjectId,
    pub descriptor: ObjectDescriptor,
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub scale: f64,
    model: Option<LoadedModel>,
}

impl VirtualObject {
    pub fn new(id: ObjectId, descriptor: ObjectDescriptor, model: LoadedModel) -> Self {
        Self {
            id,
            scale: descriptor.scale,
            descriptor,
            position: Point3::origin(),
            orientation: UnitQuaternion::identity(),
            model: Some(model),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn unload_model(&mut self) {
        self.model = None;
    }
}

// =========================================================================
// == Slot State ==
// =========================================================================

/// A model load running on a background worker. Its result is delivered once,
/// over a single-slot channel, and only read from the per-frame context.
#[derive(Debug)]
pub struct LoadTask {
    pub id: ObjectId,
    pub descriptor: ObjectDescriptor,
    receiver: Receiver<Result<LoadedModel, LoadError>>,
    worker: Option<JoinHandle<()>>,
}

/// The one arena slot for the active object.
/// Transitions: Empty -> Loading -> Placed, and back to Empty on reset.
#[derive(Debug, Default)]
pub enum ObjectSlot {
    #[default]
    Empty,
    Loading(LoadTask),
    Placed(VirtualObject),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadRequest {
    Started(ObjectId),
    /// Another load is still in progress.
    Rejected,
}

/// A vertical correction in progress, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightAnimation {
    pub from: f64,
    pub to: f64,
    pub start: f64,
    pub duration: f64,
}

impl HeightAnimation {
    pub fn height_at(&self, now: f64) -> f64 {
        let t = if self.duration > 0.0 {
            (now - self.start) / self.duration
        } else {
            1.0
        };
        self.from + (self.to - self.from) * ease_in_out(t)
    }

    pub fn is_finished(&self, now: f64) -> bool {
        now >= self.start + self.duration
    }
}

// =========================================================================
// == Object Manager ==
// =========================================================================

#[derive(Debug, Default)]
pub struct ObjectManager {
    slot: ObjectSlot,
    smoother: PlacementSmoother,
    animation: Option<HeightAnimation>,
    next_id: u64,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> &ObjectSlot {
        &self.slot
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.slot, ObjectSlot::Loading(_))
    }

    /// True while an object is loading or placed.
    pub fn has_object(&self) -> bool {
        !matches!(self.slot, ObjectSlot::Empty)
    }

    pub fn object(&self) -> Option<&VirtualObject> {
        match &self.slot {
            ObjectSlot::Placed(object) => Some(object),
            _ => None,
        }
    }

    pub fn smoother(&self) -> &PlacementSmoother {
        &self.smoother
    }

    pub fn animation(&self) -> Option<&HeightAnimation> {
        self.animation.as_ref()
    }

    // --- Loading ---

    /// Starts loading `descriptor` on a background worker. Any previously placed
    /// object is unloaded and detached first. Rejected while another load runs.
    pub fn begin_load(
        &mut self,
        descriptor: &ObjectDescriptor,
        loader: &(dyn ObjectLoader + 'static),
        scene: &mut dyn SceneGraph,
    ) -> LoadRequest {
        if self.is_loading() {
            debug!("Rejecting load of '{}': a load is in progress", descriptor.name);
            return LoadRequest::Rejected;
        }
        self.reset(scene);

        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let (sender, receiver) = bounded(1);
        let worker_loader = dyn_clone::clone_box(loader);
        let worker_descriptor = descriptor.clone();
        let spawned = thread::Builder::new()
            .name(format!("object-loader-{}", id.0))
            .spawn(move || {
                let result = worker_loader.load(&worker_descriptor);
                // The receiver is gone if the task was discarded; nothing to report then.
                let _ = sender.send(result);
            });

        let worker = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Could not spawn load worker for '{}': {}", descriptor.name, e);
                let (sender, receiver) = bounded(1);
                let _ = sender.send(Err(LoadError::WorkerSpawn(e.to_string())));
                self.slot = ObjectSlot::Loading(LoadTask {
                    id,
                    descriptor: descriptor.clone(),
                    receiver,
                    worker: None,
                });
                return LoadRequest::Started(id);
            }
        };

        info!("Loading object '{}' as {:?}", descriptor.name, id);
        self.slot = ObjectSlot::Loading(LoadTask {
            id,
            descriptor: descriptor.clone(),
            receiver,
            worker,
        });
        LoadRequest::Started(id)
    }

    /// Non-blocking check for load completion. On success the slot moves to
    /// `Placed` (not yet attached); on failure it returns to `Empty`.
    pub fn poll_load(&mut self) -> Option<Result<ObjectId, LoadError>> {
        let result = match &self.slot {
            ObjectSlot::Loading(task) => match task.receiver.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => Err(LoadError::WorkerLost),
            },
            _ => return None,
        };
        Some(self.finish_load(result))
    }

    /// Blocks until the in-flight load completes. `None` if nothing is loading.
    pub fn wait_for_load(&mut self) -> Option<Result<ObjectId, LoadError>> {
        let result = match &self.slot {
            ObjectSlot::Loading(task) => match task.receiver.recv() {
                Ok(result) => result,
                Err(RecvError) => Err(LoadError::WorkerLost),
            },
            _ => return None,
        };
        Some(self.finish_load(result))
    }

    fn finish_load(&mut self, result: Result<LoadedModel, LoadError>) -> Result<ObjectId, LoadError> {
        let mut task = match std::mem::take(&mut self.slot) {
            ObjectSlot::Loading(task) => task,
            other => {
                self.slot = other;
                return Err(LoadError::WorkerLost);
            }
        };
        if let Some(worker) = task.worker.take() {
            // The worker has already sent its result, so this returns promptly.
            let _ = worker.join();
        }
        match result {
            Ok(model) => {
                info!("Loaded object '{}' ({} vertices)", task.descriptor.name, model.vertex_count);
                let id = task.id;
                self.slot = ObjectSlot::Placed(VirtualObject::new(id, task.descriptor, model));
                Ok(id)
            }
            Err(e) => {
                warn!("Failed to load object '{}': {}", task.descriptor.name, e);
                Err(e)
            }
        }
    }

    /// Unloads and detaches the placed object. A load in flight is left alone:
    /// it must complete before the slot can change.
    pub fn reset(&mut self, scene: &mut dyn SceneGraph) {
        if let ObjectSlot::Placed(object) = &mut self.slot {
            object.unload_model();
            scene.detach_object(object.id);
            debug!("Reset virtual object {:?}", object.id);
            self.slot = ObjectSlot::Empty;
        }
        self.animation = None;
        self.smoother = PlacementSmoother::new();
    }

    // --- Placement ---

    /// Immediate placement: clamps to the maximum distance, clears the distance
    /// history and attaches the object if needed. `false` if nothing is placed.
    pub fn place(
        &mut self,
        camera: &Point3<f64>,
        target: &Point3<f64>,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        let ObjectSlot::Placed(object) = &mut self.slot else {
            return false;
        };
        self.animation = None;
        object.position = self.smoother.place(camera, target);
        if !scene.is_object_attached(object.id) {
            scene.attach_object(object);
        } else {
            scene.sync_object(object);
        }
        true
    }

    /// Incremental move through the distance smoother.
    pub fn update(
        &mut self,
        camera: &Point3<f64>,
        target: &Point3<f64>,
        filtered: bool,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        let ObjectSlot::Placed(object) = &mut self.slot else {
            return false;
        };
        self.animation = None;
        object.position = self.smoother.update(camera, target, filtered);
        scene.sync_object(object);
        true
    }

    /// Applies an orientation and scale produced by the host's gesture handling.
    pub fn set_transform(
        &mut self,
        orientation: UnitQuaternion<f64>,
        scale: f64,
        scene: &mut dyn SceneGraph,
    ) -> bool {
        let ObjectSlot::Placed(object) = &mut self.slot else {
            return false;
        };
        object.orientation = orientation;
        object.scale = scale;
        scene.sync_object(object);
        true
    }

    /// Starts animating the object's world height to `target_height`.
    pub fn start_height_animation(&mut self, target_height: f64, now: f64) {
        if let ObjectSlot::Placed(object) = &self.slot {
            self.animation = Some(HeightAnimation {
                from: object.position.y,
                to: target_height,
                start: now,
                duration: SNAP_ANIMATION_SECS,
            });
        }
    }

    /// Advances the snap animation, if any.
    pub fn advance_animation(&mut self, now: f64, scene: &mut dyn SceneGraph) {
        let Some(animation) = self.animation else {
            return;
        };
        let ObjectSlot::Placed(object) = &mut self.slot else {
            self.animation = None;
            return;
        };
        object.position.y = animation.height_at(now);
        scene.sync_object(object);
        if animation.is_finished(now) {
            object.position.y = animation.to;
            self.animation = None;
        }
    }
}
