//! Plane detection: orientation filter, bounding box, at-most-once

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sal_core::config::SessionConfig;
use sal_core::planes::PlaneEventCoordinator;
use sal_core::types::{
    DetectedPlane, Geometry, PlaneId, PlaneOrientation, PolygonPoint, Pose, Vec3,
};
use sal_test_utils::{horizontal_plane, session, vertical_plane, Rig};
use std::collections::HashSet;

#[test]
fn vertical_plane_becomes_transparent_box() {
    let rig = Rig::new();
    let session = session();
    let pose = Pose::at(Vec3::new(0.0, 1.5, -3.0));
    session.set_plane_pose(PlaneId(1), pose);

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    let created = planes.on_detected(&[vertical_plane(1)]);

    assert_eq!(created.len(), 1);
    let spec = rig.scene.marker(created[0]).unwrap();
    assert_eq!(spec.name, "plane-vertical");
    assert_eq!(
        spec.geometry,
        Geometry::Box {
            width: 2.0,
            height: 0.01,
            depth: 1.0
        }
    );
    assert_eq!(spec.material.opacity, 0.0);
    assert_eq!(spec.transform, pose.transform);
    assert!(planes.is_recorded(PlaneId(1)));
}

#[test]
fn horizontal_plane_is_skipped_by_default() {
    let rig = Rig::new();
    let session = session();
    session.set_plane_pose(PlaneId(1), Pose::default());

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    assert!(planes.on_detected(&[horizontal_plane(1)]).is_empty());
    assert!(planes.is_empty());
    assert!(rig.scene.is_empty());
}

#[test]
fn horizontal_plane_drawn_when_enabled() {
    let rig = Rig::with_config(SessionConfig::default().with_horizontal_planes(true));
    let session = session();
    session.set_plane_pose(PlaneId(1), Pose::default());

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    let created = planes.on_detected(&[horizontal_plane(1)]);

    assert_eq!(created.len(), 1);
    assert_eq!(rig.scene.marker(created[0]).unwrap().name, "plane-horizontal");
}

#[test]
fn redetection_is_a_noop() {
    let rig = Rig::new();
    let session = session();
    session.set_plane_pose(PlaneId(1), Pose::default());

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    planes.on_detected(&[vertical_plane(1)]);
    assert!(planes.on_detected(&[vertical_plane(1)]).is_empty());
    assert_eq!(rig.scene.len(), 1);
}

#[test]
fn degenerate_polygon_is_not_recorded() {
    let rig = Rig::new();
    let session = session();
    session.set_plane_pose(PlaneId(1), Pose::default());

    let sliver = DetectedPlane {
        id: PlaneId(1),
        orientation: PlaneOrientation::Vertical,
        polygon: vec![PolygonPoint::new(0.0, 0.0), PolygonPoint::new(1.0, 0.0)],
    };

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    assert!(planes.on_detected(&[sliver]).is_empty());
    assert!(!planes.is_recorded(PlaneId(1)));

    // A later, complete polygon for the same plane is drawn
    assert_eq!(planes.on_detected(&[vertical_plane(1)]).len(), 1);
}

#[test]
fn plane_without_pose_waits_for_next_detection() {
    let rig = Rig::new();
    let session = session();

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    assert!(planes.on_detected(&[vertical_plane(3)]).is_empty());

    session.set_plane_pose(PlaneId(3), Pose::default());
    assert_eq!(planes.on_detected(&[vertical_plane(3)]).len(), 1);
}

#[test]
fn observability_events_do_not_touch_scene() {
    let rig = Rig::new();
    let planes = PlaneEventCoordinator::new(rig.context(), session().shared());

    planes.on_added(&vertical_plane(1));
    planes.on_changed(&vertical_plane(1));
    planes.on_removed(&vertical_plane(1));

    assert!(rig.scene.is_empty());
    assert!(planes.is_empty());
}

#[test]
fn mixed_case_orientation_payloads_are_filtered() {
    let rig = Rig::new();
    let session = session();
    session.set_plane_pose(PlaneId(1), Pose::default());
    session.set_plane_pose(PlaneId(2), Pose::default());

    let square = r#"[{"x":0,"z":0},{"x":1,"z":0},{"x":1,"z":1},{"x":0,"z":1}]"#;
    let payload = format!(
        r#"[{{"id":1,"orientation":"Vertical","polygon":{square}}},
            {{"id":2,"orientation":"HORIZONTAL","polygon":{square}}}]"#
    );
    let detected: Vec<DetectedPlane> = serde_json::from_str(&payload).unwrap();
    assert_eq!(detected[1].orientation, PlaneOrientation::Horizontal);

    let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());
    let created = planes.on_detected(&detected);

    assert_eq!(created.len(), 1);
    assert_eq!(rig.scene.marker(created[0]).unwrap().name, "plane-vertical");
    assert!(planes.is_recorded(PlaneId(1)));
    assert!(!planes.is_recorded(PlaneId(2)));
}

fn plane_for(id: u64) -> DetectedPlane {
    if id % 2 == 0 {
        horizontal_plane(id)
    } else {
        vertical_plane(id)
    }
}

proptest! {
    #[test]
    fn only_vertical_planes_once_each(
        batches in prop::collection::vec(prop::collection::hash_set(0u64..12, 0..6), 1..10)
    ) {
        let rig = Rig::new();
        let session = session();
        for id in 0..12 {
            session.set_plane_pose(PlaneId(id), Pose::default());
        }
        let mut planes = PlaneEventCoordinator::new(rig.context(), session.shared());

        for batch in &batches {
            let detected: Vec<DetectedPlane> = batch.iter().copied().map(plane_for).collect();
            planes.on_detected(&detected);
        }

        let vertical: HashSet<u64> = batches
            .iter()
            .flatten()
            .copied()
            .filter(|id| id % 2 == 1)
            .collect();
        prop_assert_eq!(planes.len(), vertical.len());
        prop_assert_eq!(rig.scene.named("plane-vertical").len(), vertical.len());
        prop_assert!(rig.scene.named("plane-horizontal").is_empty());
    }
}
