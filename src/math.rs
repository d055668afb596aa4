//! Vector and angle primitives shared by every other module.
//!
//! Directions are unit vectors on the sphere, expressed either in cartesian
//! form or as azimuth/elevation in degrees. All functions here are pure.

/// A direction in 3-D cartesian space.
///
/// Panning code keeps these at unit length; the type itself does not enforce
/// it because intermediate cross products and sums are unnormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianVector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared length, for comparisons that do not need the `sqrt`.
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Angle between two vectors in radians, in [0, π].
    ///
    /// The normalized dot product is clamped to [-1, 1] before `acos`;
    /// floating-point overshoot on near-parallel vectors would otherwise
    /// produce NaN.
    pub fn angle_between(&self, other: &Self) -> f64 {
        let lengths = self.length() * other.length();
        if lengths < 1e-12 {
            return 0.0;
        }
        (self.dot(other) / lengths).clamp(-1.0, 1.0).acos()
    }

    /// Normalized cross product of two vectors.
    ///
    /// Returns the zero vector for (near-)parallel inputs.
    pub fn cross(&self, other: &Self) -> Self {
        let raw = self.cross_raw(other);
        let len = raw.length();
        if len < 1e-12 {
            return Self::new(0.0, 0.0, 0.0);
        }
        Self::new(raw.x / len, raw.y / len, raw.z / len)
    }

    /// Unnormalized cross product, used where the magnitude carries meaning
    /// (parallelepiped volumes during triangulation).
    pub(crate) fn cross_raw(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Scale to unit length. Near-zero vectors are returned unchanged.
    pub(crate) fn normalized(&self) -> Self {
        let len = self.length();
        if len < 1e-12 {
            return *self;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }

    /// Component-wise midpoint of two vectors, normalized.
    pub(crate) fn mean(&self, other: &Self) -> Self {
        Self::new(
            (self.x + other.x) * 0.5,
            (self.y + other.y) * 0.5,
            (self.z + other.z) * 0.5,
        )
        .normalized()
    }
}

/// A direction in angular form: azimuth and elevation in degrees.
///
/// `length` is normally 1.0 for a unit direction; panning itself never reads
/// it, but the spread paths carry it when rebuilding auxiliary directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularVector {
    /// Horizontal angle in degrees. 0 = front, positive counter-clockwise.
    pub azimuth: f64,
    /// Vertical angle in degrees above the horizontal plane.
    pub elevation: f64,
    /// Vector length, normally 1.0.
    pub length: f64,
}

impl AngularVector {
    pub const fn new(azimuth: f64, elevation: f64) -> Self {
        Self {
            azimuth,
            elevation,
            length: 1.0,
        }
    }

    /// Convert to a unit cartesian direction.
    ///
    /// Convention: x = cos(az)·cos(el), y = sin(az)·cos(el), z = sin(el).
    pub fn to_cartesian(&self) -> CartesianVector {
        let azi = self.azimuth.to_radians();
        let ele = self.elevation.to_radians();
        CartesianVector::new(
            azi.cos() * ele.cos(),
            azi.sin() * ele.cos(),
            ele.sin(),
        )
    }

    /// Same conversion with the Y and Z axes exchanged, for callers whose
    /// up-axis convention differs (head-centric vs room-centric frames).
    pub fn to_cartesian_flip_y_z(&self) -> CartesianVector {
        let direct = self.to_cartesian();
        CartesianVector::new(direct.x, direct.z, direct.y)
    }
}
