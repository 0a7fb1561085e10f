use crate::events::{EventBus, InteractionEvent, Subscription, Topic};
use crate::model::movable::props as movable_props;
use crate::model::value::EntityId;
use crate::projection::{canvas_distance, ProjectionPlane, CANVAS_UNITS_PER_METER};
use crate::spatial::transfer::remove_movable;
use crate::store::access;
use crate::store::EntityStore;
use futures::task::{LocalSpawn, LocalSpawnExt};
use glam::DVec3;
use log::{debug, error, info};
use std::cell::Cell;
use std::rc::Rc;

/// Drop distance (world units) below which a trashcan deletes an entity.
pub const DEFAULT_TRASH_DISTANCE: f64 = 0.2;

/// Coordinate space distances are measured in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProximityMetric {
    /// 3D Euclidean distance, used by the scene view.
    World,
    /// Planar distance after projection, used by the canvas view.
    Canvas(ProjectionPlane),
}

impl ProximityMetric {
    /// Distance between two world points in this metric's units.
    pub fn distance(&self, a: DVec3, b: DVec3) -> f64 {
        match self {
            Self::World => a.distance(b),
            Self::Canvas(plane) => canvas_distance(a, b, plane),
        }
    }

    /// `max_distance` (world units) expressed in this metric's units.
    pub fn threshold(&self, max_distance: f64) -> f64 {
        match self {
            Self::World => max_distance,
            Self::Canvas(_) => max_distance * CANVAS_UNITS_PER_METER,
        }
    }

    pub fn within(&self, a: DVec3, b: DVec3, max_distance: f64) -> bool {
        self.distance(a, b) < self.threshold(max_distance)
    }
}

/// Result of evaluating one drag-end against one trashcan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropVerdict {
    Deleted,
    OutOfRange,
    /// Trashcan itself, missing entity, or missing position.
    Ignored,
}

/// Deletes `target` when it rests closer than `max_distance` to the
/// trashcan. Reads live positions of both at evaluation time.
pub async fn evaluate_drop(
    store: &dyn EntityStore,
    trashcan_id: &str,
    target: &str,
    metric: ProximityMetric,
    max_distance: f64,
) -> DropVerdict {
    if target == trashcan_id {
        return DropVerdict::Ignored;
    }
    let Some(trashcan_at) = live_position(store, trashcan_id).await else {
        return DropVerdict::Ignored;
    };
    let Some(target_at) = live_position(store, target).await else {
        return DropVerdict::Ignored;
    };

    if !metric.within(trashcan_at, target_at, max_distance) {
        debug!(
            "event=trashcan_drop module=spatial status=skip reason=out_of_range trashcan={} entity={}",
            trashcan_id, target
        );
        return DropVerdict::OutOfRange;
    }

    match remove_movable(store, target).await {
        Ok(true) => {
            info!(
                "event=trashcan_drop module=spatial status=ok trashcan={} entity={}",
                trashcan_id, target
            );
            DropVerdict::Deleted
        }
        Ok(false) => DropVerdict::Ignored,
        Err(err) => {
            error!(
                "event=trashcan_drop module=spatial status=error trashcan={} entity={} error={}",
                trashcan_id, target, err
            );
            DropVerdict::Ignored
        }
    }
}

async fn live_position(store: &dyn EntityStore, id: &str) -> Option<DVec3> {
    let handle = access::resolve(store, id).await?;
    access::read_vec3(store, &handle, movable_props::POSITION).await
}

/// One active trashcan instance listening for drag-end events.
///
/// Dropping the watcher releases its bus subscription.
pub struct TrashcanWatcher {
    trashcan_id: EntityId,
    metric: Rc<Cell<ProximityMetric>>,
    subscription: Subscription,
}

impl TrashcanWatcher {
    pub fn attach(
        bus: &EventBus,
        store: Rc<dyn EntityStore>,
        spawner: Rc<dyn LocalSpawn>,
        trashcan_id: impl Into<EntityId>,
        metric: ProximityMetric,
        max_distance: f64,
    ) -> Self {
        let trashcan_id = trashcan_id.into();
        let metric = Rc::new(Cell::new(metric));
        let subscription = {
            let trashcan_id = trashcan_id.clone();
            let metric = metric.clone();
            bus.subscribe(Topic::DragEnd, move |event: &InteractionEvent| {
                if event.target == trashcan_id {
                    return;
                }
                let store = store.clone();
                let trashcan_id = trashcan_id.clone();
                let target = event.target.clone();
                let metric = metric.get();
                let spawned = spawner.spawn_local(async move {
                    evaluate_drop(store.as_ref(), &trashcan_id, &target, metric, max_distance)
                        .await;
                });
                if let Err(err) = spawned {
                    error!(
                        "event=trashcan_drop module=spatial status=error reason=spawn error={}",
                        err
                    );
                }
            })
        };
        debug!(
            "event=trashcan_attach module=spatial status=ok trashcan={}",
            trashcan_id
        );
        Self {
            trashcan_id,
            metric,
            subscription,
        }
    }

    pub fn trashcan_id(&self) -> &str {
        &self.trashcan_id
    }

    /// Replaces the metric, e.g. after the space's projection changed.
    pub fn set_metric(&self, metric: ProximityMetric) {
        self.metric.set(metric);
    }

    pub fn metric(&self) -> ProximityMetric {
        self.metric.get()
    }

    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluate_drop, DropVerdict, ProximityMetric, DEFAULT_TRASH_DISTANCE};
    use crate::model::value::{PropertyMap, PropertyValue};
    use crate::projection::ProjectionPlane;
    use crate::store::{EntityStore, SqliteEntityStore};
    use futures::executor::block_on;
    use glam::DVec3;

    fn placed(store: &SqliteEntityStore, kind: &str, at: DVec3) -> String {
        let mut initial = PropertyMap::new();
        initial.insert("position".to_string(), PropertyValue::Vec3(at));
        block_on(store.create(kind, initial)).expect("create")
    }

    #[test]
    fn canvas_metric_scales_threshold() {
        let plane = ProjectionPlane::top_down(DVec3::ZERO);
        let metric = ProximityMetric::Canvas(plane);
        let a = DVec3::ZERO;
        let near = DVec3::new(0.1, 5.0, 0.0);
        assert!(metric.within(a, near, DEFAULT_TRASH_DISTANCE));
        assert!(!ProximityMetric::World.within(a, near, DEFAULT_TRASH_DISTANCE));
    }

    #[test]
    fn trashcan_ignores_itself_and_missing_targets() {
        let store = SqliteEntityStore::open_in_memory().expect("store");
        let can = placed(&store, "Trashcan", DVec3::ZERO);
        let verdict = block_on(evaluate_drop(
            &store,
            &can,
            &can,
            ProximityMetric::World,
            DEFAULT_TRASH_DISTANCE,
        ));
        assert_eq!(verdict, DropVerdict::Ignored);

        let verdict = block_on(evaluate_drop(
            &store,
            &can,
            "ghost",
            ProximityMetric::World,
            DEFAULT_TRASH_DISTANCE,
        ));
        assert_eq!(verdict, DropVerdict::Ignored);
    }

    #[test]
    fn threshold_is_strict() {
        let store = SqliteEntityStore::open_in_memory().expect("store");
        let can = placed(&store, "Trashcan", DVec3::ZERO);
        let edge = placed(&store, "Note", DVec3::new(0.25, 0.0, 0.0));
        let verdict = block_on(evaluate_drop(&store, &can, &edge, ProximityMetric::World, 0.25));
        assert_eq!(verdict, DropVerdict::OutOfRange);
    }
}
