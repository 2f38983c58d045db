//! Immutable per-frame snapshot records handed to downstream rendering
//! (§3 "Snapshot", §6 "Snapshot contract"). Colours round-trip through a
//! CSS-style textual form so persisted snapshot streams stay JSON-
//! compatible value trees, matching the contract the external drawing
//! layer is specified against.

use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyId, BodyKind};
use crate::vector::Vector;

/// An RGBA colour that serialises as `"rgb(r,g,b)"` / `"rgba(r,g,b,a)"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn to_css(self) -> String {
        if (self.a - 1.0).abs() < f32::EPSILON {
            format!("rgb({},{},{})", self.r, self.g, self.b)
        } else {
            format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
        }
    }

    fn from_css(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let (is_rgba, inner) = if let Some(rest) = s.strip_prefix("rgba(") {
            (true, rest.strip_suffix(')').ok_or("missing closing paren")?)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (false, rest.strip_suffix(')').ok_or("missing closing paren")?)
        } else {
            return Err(format!("not a css colour: {s}"));
        };
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let expected = if is_rgba { 4 } else { 3 };
        if parts.len() != expected {
            return Err(format!("expected {expected} components, got {}", parts.len()));
        }
        let r: u8 = parts[0].parse().map_err(|_| "bad r")?;
        let g: u8 = parts[1].parse().map_err(|_| "bad g")?;
        let b: u8 = parts[2].parse().map_err(|_| "bad b")?;
        let a: f32 = if is_rgba {
            parts[3].parse().map_err(|_| "bad a")?
        } else {
            1.0
        };
        Ok(Color { r, g, b, a })
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_css())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::from_css(&s).map_err(serde::de::Error::custom)
    }
}

/// The payload a renderer needs to draw this body: a single position for
/// a point mass, or the full belayer→deflections→climber polyline for a
/// rope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Visible {
    PointMass { position: [f64; 3] },
    Rope { polyline: Vec<[f64; 3]> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SnapshotBodyType {
    #[serde(rename = "point-mass")]
    PointMass,
    #[serde(rename = "rope")]
    Rope,
}

/// A single body's record within a [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodySnapshot {
    #[serde(rename = "type")]
    pub body_type: SnapshotBodyType,
    pub id: u64,
    pub name: String,
    pub instantaneous_force: f64,
    pub average_force: f64,
    pub force_avg_window: f64,
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub elastic_energy: f64,
    pub total_energy: f64,
    pub max_speed: f64,
    pub max_average_force: f64,
    pub visible: Visible,
    pub color: Color,
    pub radius: f64,
    pub thickness: f64,
}

/// An immutable, append-only per-time-point record (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub bodies: Vec<BodySnapshot>,
}

pub(crate) fn color_for_kind(kind: BodyKind) -> Color {
    match kind {
        BodyKind::Anchor => Color::opaque(120, 120, 120),
        BodyKind::Quickdraw => Color::opaque(200, 160, 40),
        BodyKind::Climber => Color::opaque(200, 40, 40),
        BodyKind::RopeJoint => Color::rgba(40, 40, 200, 0.6),
        BodyKind::Generic => Color::opaque(80, 80, 80),
    }
}

pub(crate) fn name_for_kind(kind: BodyKind) -> &'static str {
    match kind {
        BodyKind::Anchor => "anchor",
        BodyKind::Quickdraw => "quickdraw",
        BodyKind::Climber => "climber",
        BodyKind::RopeJoint => "rope-joint",
        BodyKind::Generic => "body",
    }
}

pub(crate) fn point_mass_snapshot(body: &Body, gravity: Vector) -> BodySnapshot {
    let pos = body.position();
    BodySnapshot {
        body_type: SnapshotBodyType::PointMass,
        id: body.id().raw(),
        name: name_for_kind(body.kind()).to_string(),
        instantaneous_force: body.instantaneous_force(),
        average_force: body.average_force(),
        force_avg_window: crate::body::DEFAULT_FORCE_AVG_WINDOW,
        kinetic_energy: body.kinetic_energy(),
        potential_energy: body.potential_energy(gravity),
        elastic_energy: 0.0,
        total_energy: body.kinetic_energy() + body.potential_energy(gravity),
        max_speed: body.max_speed(),
        max_average_force: body.max_average_force(),
        visible: Visible::PointMass {
            position: [pos.x(), pos.y(), pos.z()],
        },
        color: color_for_kind(body.kind()),
        radius: 0.05,
        thickness: 0.0,
    }
}

pub fn body_id_for_snapshot(id: BodyId) -> u64 {
    id.raw()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_color_round_trips_as_rgb() {
        let c = Color::opaque(10, 20, 30);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"rgb(10,20,30)\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn transparent_color_round_trips_as_rgba() {
        let c = Color::rgba(1, 2, 3, 0.5);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"rgba(1,2,3,0.5)\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snap = Snapshot {
            time: 1.25,
            bodies: vec![BodySnapshot {
                body_type: SnapshotBodyType::PointMass,
                id: 3,
                name: "climber".to_string(),
                instantaneous_force: 10.0,
                average_force: 9.5,
                force_avg_window: 0.05,
                kinetic_energy: 1.0,
                potential_energy: 2.0,
                elastic_energy: 0.0,
                total_energy: 3.0,
                max_speed: 4.0,
                max_average_force: 12.0,
                visible: Visible::PointMass {
                    position: [1.0, 2.0, 3.0],
                },
                color: Color::opaque(200, 40, 40),
                radius: 0.05,
                thickness: 0.0,
            }],
        };
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.time, snap.time);
        assert_eq!(back.bodies[0].color, snap.bodies[0].color);
        assert_eq!(back.bodies[0].id, snap.bodies[0].id);
    }
}
