use serde::{Deserialize, Serialize};

///Represents a point or direction in 3D world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec3 {
    pub x: f32,
    ///Height above the track surface.
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec3 {
        Vec3 {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }

    ///Returns the difference of two vectors.
    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3 {
            x: self.x - other.x,
            y: self.y - other.y,
            z: self.z - other.z,
        }
    }

    ///Returns the straight-line distance to another point.
    pub fn distance(&self, other: &Vec3) -> f32 {
        self.sub(other).magnitude()
    }

    ///Returns the distance to another point ignoring height.
    pub fn horizontal_distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    ///Returns a point moved a fraction of the way toward a target.
    pub fn lerp(&self, target: &Vec3, t: f32) -> Vec3 {
        self.add(&target.sub(self).scale(t))
    }
}

///Unit quaternion describing a vehicle's orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    ///Builds a rotation about the vertical axis from a heading in radians.
    pub fn from_yaw(yaw: f32) -> Quat {
        let half = yaw / 2.0;
        Quat {
            x: 0.0,
            y: half.sin(),
            z: 0.0,
            w: half.cos(),
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

///Position, orientation and velocity of a vehicle at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Transform {
            position,
            ..Transform::default()
        }
    }

    ///Speed over the ground plane, ignoring vertical motion.
    pub fn horizontal_speed(&self) -> f32 {
        let vx = self.velocity.x;
        let vz = self.velocity.z;
        (vx * vx + vz * vz).sqrt()
    }
}
