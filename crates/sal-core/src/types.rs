//! Core types for SAL
//!
//! Defines the fundamental value types exchanged with the tracking session
//! and the rendering engine:
//! - Opaque identities (anchors, planes, markers, layers)
//! - Poses and reference spaces
//! - Plane payloads and bounding boxes
//! - Input sources and handedness
//! - Marker descriptions handed to the scene

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use glam::{Mat4, Quat, Vec3};
pub use sal_store::AnchorHandle;

/// Live anchor identity assigned by the tracking session
///
/// Distinct from [`AnchorHandle`]: an identity is only valid inside the
/// session that detected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub u64);

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anchor#{}", self.0)
    }
}

/// Live plane identity assigned by the tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaneId(pub u64);

impl fmt::Display for PlaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plane#{}", self.0)
    }
}

/// Visual object owned by the scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Composition layer created by the overlay API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(pub u64);

/// Media binding created by the overlay API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaBindingId(pub u64);

/// Coordinate frame against which poses are expressed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceSpace(pub String);

impl ReferenceSpace {
    /// The `local` space immersive sessions default to
    #[must_use]
    pub fn local() -> Self {
        Self("local".to_string())
    }
}

impl Default for ReferenceSpace {
    fn default() -> Self {
        Self::local()
    }
}

/// Space whose pose can be queried from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceRef {
    /// Space of a tracked anchor
    Anchor(AnchorId),
    /// Space of a tracked plane
    Plane(PlaneId),
}

/// Rigid pose carried by tracking events
///
/// The transform is the column-major 4x4 matrix the runtime reports.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Pose transform
    pub transform: Mat4,
}

impl Pose {
    /// Pose from a transform matrix
    #[inline]
    #[must_use]
    pub fn new(transform: Mat4) -> Self {
        Self { transform }
    }

    /// Pose from the 16 column-major floats of a runtime matrix
    #[inline]
    #[must_use]
    pub fn from_matrix_array(matrix: &[f32; 16]) -> Self {
        Self::new(Mat4::from_cols_array(matrix))
    }

    /// Pure translation pose
    #[inline]
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self::new(Mat4::from_translation(position))
    }

    /// Translation component
    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }

    /// Rotation component
    #[must_use]
    pub fn orientation(&self) -> Quat {
        let (_, rotation, _) = self.transform.to_scale_rotation_translation();
        rotation
    }
}

/// Yaw (rotation about +Y) that turns an object at `position` to face `viewpoint`
#[inline]
#[must_use]
pub fn yaw_towards(viewpoint: Vec3, position: Vec3) -> f32 {
    (viewpoint.x - position.x).atan2(viewpoint.z - position.z)
}

/// Detected plane orientation
///
/// Runtimes disagree on casing, so deserialization accepts any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneOrientation {
    /// Floors, tables, ceilings
    Horizontal,
    /// Walls, doors
    Vertical,
}

impl PlaneOrientation {
    /// Lowercase name used in marker names
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
        }
    }
}

impl fmt::Display for PlaneOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown plane orientation string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plane orientation: {0}")]
pub struct ParseOrientationError(pub String);

impl FromStr for PlaneOrientation {
    type Err = ParseOrientationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            _ => Err(ParseOrientationError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for PlaneOrientation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Polygon vertex in plane space (the plane lies in its local XZ plane)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonPoint {
    /// X coordinate
    pub x: f32,
    /// Z coordinate
    pub z: f32,
}

impl PolygonPoint {
    /// Create vertex
    #[inline]
    #[must_use]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// Plane payload of a `planes-detected` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPlane {
    /// Plane identity
    pub id: PlaneId,
    /// Orientation reported by the runtime
    pub orientation: PlaneOrientation,
    /// Boundary polygon
    pub polygon: Vec<PolygonPoint>,
}

/// Axis-aligned bounding box of a plane polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum X
    pub min_x: f32,
    /// Maximum X
    pub max_x: f32,
    /// Minimum Z
    pub min_z: f32,
    /// Maximum Z
    pub max_z: f32,
}

impl BoundingBox {
    /// Bounding box of a polygon
    ///
    /// Returns `None` for fewer than three vertices, which do not describe
    /// a surface.
    #[must_use]
    pub fn from_polygon(polygon: &[PolygonPoint]) -> Option<Self> {
        if polygon.len() < 3 {
            return None;
        }

        let init = Self {
            min_x: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            min_z: f32::INFINITY,
            max_z: f32::NEG_INFINITY,
        };

        Some(polygon.iter().fold(init, |acc, p| Self {
            min_x: acc.min_x.min(p.x),
            max_x: acc.max_x.max(p.x),
            min_z: acc.min_z.min(p.z),
            max_z: acc.max_z.max(p.z),
        }))
    }

    /// Extent along X
    #[inline]
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Extent along Z
    #[inline]
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max_z - self.min_z
    }
}

/// Which hand an input source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    /// No handedness (gaze, screen taps)
    #[default]
    None,
    /// Left controller or hand
    Left,
    /// Right controller or hand
    Right,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Input device as seen by an input event
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSource {
    /// Controller slot (0 or 1)
    pub index: u8,
    /// Handedness reported by the device
    pub handedness: Handedness,
    /// World position sampled at event time
    pub position: Vec3,
    /// World orientation sampled at event time
    pub orientation: Quat,
}

impl InputSource {
    /// Input source at the origin with identity orientation
    #[must_use]
    pub fn new(index: u8, handedness: Handedness) -> Self {
        Self {
            index,
            handedness,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }

    /// With sampled world pose
    #[must_use]
    pub fn with_pose(mut self, position: Vec3, orientation: Quat) -> Self {
        self.position = position;
        self.orientation = orientation;
        self
    }
}

/// Marker geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Axis-aligned box
    Box {
        /// Extent along X
        width: f32,
        /// Extent along Y
        height: f32,
        /// Extent along Z
        depth: f32,
    },
    /// Flat ring lying in XZ
    Ring {
        /// Inner radius
        inner_radius: f32,
        /// Outer radius
        outer_radius: f32,
    },
    /// Upright cylinder standing on its base
    Cylinder {
        /// Radius
        radius: f32,
        /// Height
        height: f32,
    },
}

/// Marker surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 0xRRGGBB colour
    pub color: u32,
    /// 0.0 transparent, 1.0 opaque
    pub opacity: f32,
}

impl Material {
    /// Fully opaque material
    #[inline]
    #[must_use]
    pub const fn opaque(color: u32) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    /// Opaque material with a random colour
    #[must_use]
    pub fn random_opaque() -> Self {
        Self::opaque(rand::random::<u32>() & 0x00ff_ffff)
    }

    /// Fully transparent material
    #[inline]
    #[must_use]
    pub const fn transparent(color: u32) -> Self {
        Self {
            color,
            opacity: 0.0,
        }
    }
}

/// Description of a marker to add to the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Scene object name
    pub name: String,
    /// Shape
    pub geometry: Geometry,
    /// Surface
    pub material: Material,
    /// World transform (the scene must not recompute it)
    pub transform: Mat4,
    /// Initial visibility
    pub visible: bool,
}

impl MarkerSpec {
    /// Visible marker at `transform`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        geometry: Geometry,
        material: Material,
        transform: Mat4,
    ) -> Self {
        Self {
            name: name.into(),
            geometry,
            material,
            transform,
            visible: true,
        }
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn bounding_box_of_rectangle() {
        let polygon = [
            PolygonPoint::new(0.0, 0.0),
            PolygonPoint::new(2.0, 0.0),
            PolygonPoint::new(2.0, 1.0),
            PolygonPoint::new(0.0, 1.0),
        ];
        let bbox = BoundingBox::from_polygon(&polygon).unwrap();
        assert_eq!(bbox.width(), 2.0);
        assert_eq!(bbox.height(), 1.0);
    }

    #[test]
    fn bounding_box_negative_coordinates() {
        let polygon = [
            PolygonPoint::new(-1.5, -0.5),
            PolygonPoint::new(0.5, -0.5),
            PolygonPoint::new(0.0, 2.5),
        ];
        let bbox = BoundingBox::from_polygon(&polygon).unwrap();
        assert_eq!(bbox.min_x, -1.5);
        assert_eq!(bbox.max_z, 2.5);
        assert_eq!(bbox.width(), 2.0);
        assert_eq!(bbox.height(), 3.0);
    }

    #[test]
    fn bounding_box_requires_three_points() {
        assert!(BoundingBox::from_polygon(&[]).is_none());
        assert!(BoundingBox::from_polygon(&[PolygonPoint::new(0.0, 0.0), PolygonPoint::new(1.0, 1.0)]).is_none());
    }

    #[test]
    fn orientation_parses_case_insensitively() {
        assert_eq!("Horizontal".parse::<PlaneOrientation>().unwrap(), PlaneOrientation::Horizontal);
        assert_eq!("VERTICAL".parse::<PlaneOrientation>().unwrap(), PlaneOrientation::Vertical);
        assert!("diagonal".parse::<PlaneOrientation>().is_err());
    }

    #[test]
    fn plane_payload_orientation_is_case_insensitive() {
        let plane: DetectedPlane = serde_json::from_str(
            r#"{"id":1,"orientation":"Vertical","polygon":[{"x":0,"z":0},{"x":1,"z":0},{"x":1,"z":1}]}"#,
        )
        .unwrap();
        assert_eq!(plane.orientation, PlaneOrientation::Vertical);

        let orientation: PlaneOrientation = serde_json::from_str(r#""HORIZONTAL""#).unwrap();
        assert_eq!(orientation, PlaneOrientation::Horizontal);
        assert_eq!(serde_json::to_string(&orientation).unwrap(), r#""horizontal""#);

        assert!(serde_json::from_str::<PlaneOrientation>(r#""diagonal""#).is_err());
    }

    #[test]
    fn yaw_faces_viewpoint() {
        let origin = Vec3::ZERO;
        assert!((yaw_towards(origin, Vec3::new(0.0, 0.0, -1.0)) - 0.0).abs() < 1e-6);
        assert!((yaw_towards(origin, Vec3::new(-1.0, 0.0, 0.0)) - FRAC_PI_2).abs() < 1e-6);
        assert!((yaw_towards(origin, Vec3::new(0.0, 0.0, 1.0)).abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn pose_position_from_column_major_array() {
        let mut matrix = Mat4::IDENTITY.to_cols_array();
        matrix[12] = 1.0;
        matrix[13] = 2.0;
        matrix[14] = 3.0;
        let pose = Pose::from_matrix_array(&matrix);
        assert_eq!(pose.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn random_material_stays_in_rgb_range() {
        for _ in 0..32 {
            assert!(Material::random_opaque().color <= 0x00ff_ffff);
        }
    }
}
