use crate::LocalBounds;
use bevy_math::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

/// The geometric shape tiles are draped over.
///
/// Display space is right handed with `z` pointing towards the north pole
/// (or straight up for planes). Curved shapes are centered at the origin.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum SurfaceShape {
    Plane { scale: f64 },
    Sphere { radius: f64 },
    Spheroid { major_axis: f64, minor_axis: f64 },
}

impl SurfaceShape {
    pub const WGS84: Self = Self::Spheroid {
        major_axis: 6378137.0,
        minor_axis: 6356752.314245,
    };

    pub const UNIT_SPHERE: Self = Self::Sphere { radius: 1.0 };

    pub fn scale(self) -> DVec3 {
        match self {
            Self::Plane { scale } => DVec3::new(scale, scale, 1.0),
            Self::Sphere { radius } => DVec3::splat(radius),
            Self::Spheroid {
                major_axis,
                minor_axis,
            } => DVec3::new(major_axis, major_axis, minor_axis),
        }
    }

    pub fn is_curved(self) -> bool {
        match self {
            Self::Plane { .. } => false,
            Self::Sphere { .. } => true,
            Self::Spheroid { .. } => true,
        }
    }

    /// Converts a geographic `(longitude, latitude)` in radians to display space,
    /// raised by `height` along the surface normal.
    ///
    /// Planes interpret the coordinate as plane coordinates instead.
    pub fn geographic_to_display(self, geographic: DVec2, height: f64) -> DVec3 {
        if !self.is_curved() {
            return self.scale() * geographic.extend(0.0) + DVec3::new(0.0, 0.0, height);
        }

        let (sin_lon, cos_lon) = geographic.x.sin_cos();
        let (sin_lat, cos_lat) = geographic.y.sin_cos();
        let unit_position = DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);
        let surface_position = self.scale() * unit_position;

        surface_position + height * self.normal(surface_position)
    }

    /// The outward surface normal at a display space position on the surface.
    pub fn normal(self, display_position: DVec3) -> DVec3 {
        if !self.is_curved() {
            return DVec3::Z;
        }

        let scale = self.scale();
        (display_position / (scale * scale)).normalize_or(DVec3::Z)
    }

    /// The north or south pole of a curved shape.
    pub fn pole(self, north: bool) -> DVec3 {
        let z = if north { self.scale().z } else { -self.scale().z };

        if self.is_curved() {
            DVec3::new(0.0, 0.0, z)
        } else {
            DVec3::ZERO
        }
    }
}

/// Maps the local coordinates of the quadtree to geographic coordinates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
    /// Local coordinates are longitude and latitude in radians.
    #[default]
    PlateCarree,
    /// Spherical mercator with coordinates scaled to radians at the equator.
    SphericalMercator,
}

impl Projection {
    pub fn local_to_geographic(self, local: DVec2) -> DVec2 {
        match self {
            Self::PlateCarree => local,
            Self::SphericalMercator => DVec2::new(local.x, local.y.sinh().atan()),
        }
    }

    pub fn geographic_to_local(self, geographic: DVec2) -> DVec2 {
        match self {
            Self::PlateCarree => geographic,
            Self::SphericalMercator => DVec2::new(geographic.x, geographic.y.tan().asinh()),
        }
    }

    /// The region of local space covering the whole globe.
    pub fn extents(self) -> LocalBounds {
        match self {
            Self::PlateCarree => LocalBounds::new(DVec2::new(-PI, -FRAC_PI_2), DVec2::new(PI, FRAC_PI_2)),
            Self::SphericalMercator => LocalBounds::new(DVec2::splat(-PI), DVec2::splat(PI)),
        }
    }
}

/// A shape together with the projection of its local coordinate system.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub shape: SurfaceShape,
    pub projection: Projection,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            shape: SurfaceShape::UNIT_SPHERE,
            projection: Projection::SphericalMercator,
        }
    }
}

impl Surface {
    pub fn new(shape: SurfaceShape, projection: Projection) -> Self {
        Self { shape, projection }
    }

    pub fn plane(scale: f64) -> Self {
        Self::new(SurfaceShape::Plane { scale }, Projection::PlateCarree)
    }

    pub fn is_curved(&self) -> bool {
        self.shape.is_curved()
    }

    /// The point every skirt is pulled towards.
    pub fn center(&self) -> DVec3 {
        DVec3::ZERO
    }

    /// The extents of the local coordinate system: the whole globe for curved
    /// shapes and the unit square around the origin for planes.
    pub fn extents(&self) -> LocalBounds {
        if self.is_curved() {
            self.projection.extents()
        } else {
            LocalBounds::new(DVec2::splat(-1.0), DVec2::ONE)
        }
    }

    /// Converts a local coordinate to display space. Planes take local
    /// coordinates as is, ignoring the projection.
    pub fn local_to_display(&self, local: DVec2, height: f64) -> DVec3 {
        let geographic = if self.is_curved() {
            self.projection.local_to_geographic(local)
        } else {
            local
        };

        self.shape.geographic_to_display(geographic, height)
    }

    pub fn normal(&self, display_position: DVec3) -> DVec3 {
        self.shape.normal(display_position)
    }

    pub fn pole(&self, north: bool) -> DVec3 {
        self.shape.pole(north)
    }
}
