//! 坐标参考系（CRS）与点/几何/范围的坐标转换。
//!
//! 只内置 EPSG:4326 <-> EPSG:3857 的换算；其它投影代码只能转换到自身。

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::CrsError;
use crate::geometry::{Extent, Geometry, Point};

const EARTH_RADIUS_M: f64 = 6_378_137.0;
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// 地图单位。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapUnits {
    Meters,
    Feet,
    Degrees,
}

impl MapUnits {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Feet => "ft",
            Self::Degrees => "°",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Crs {
    pub code: u32,
    pub units: MapUnits,
}

impl Crs {
    pub const WGS84: Crs = Crs {
        code: 4326,
        units: MapUnits::Degrees,
    };
    pub const WEB_MERCATOR: Crs = Crs {
        code: 3857,
        units: MapUnits::Meters,
    };

    /// 本地/投影坐标系（只能转换到自身）。
    pub const fn projected(code: u32, units: MapUnits) -> Crs {
        Crs { code, units }
    }

    pub fn authid(&self) -> String {
        format!("EPSG:{}", self.code)
    }

    pub fn is_geographic(&self) -> bool {
        self.units == MapUnits::Degrees
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WEB_MERCATOR
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.code)
    }
}

impl FromStr for Crs {
    type Err = CrsError;

    /// 接受 `EPSG:4326` 或纯数字；未知代码按米制投影处理。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let code: u32 = digits
            .parse()
            .map_err(|_| CrsError::Parse(trimmed.to_string()))?;
        Ok(match code {
            4326 => Crs::WGS84,
            3857 => Crs::WEB_MERCATOR,
            other => Crs::projected(other, MapUnits::Meters),
        })
    }
}

/// 一次确定方向的坐标转换。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CrsTransform {
    pub source: Crs,
    pub destination: Crs,
}

impl CrsTransform {
    pub fn new(source: Crs, destination: Crs) -> Result<Self, CrsError> {
        let supported = source.code == destination.code
            || matches!(
                (source.code, destination.code),
                (4326, 3857) | (3857, 4326)
            );
        if !supported {
            return Err(CrsError::Unsupported {
                from: source.authid(),
                to: destination.authid(),
            });
        }
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.source.code == self.destination.code
    }

    pub fn inverse(&self) -> CrsTransform {
        CrsTransform {
            source: self.destination,
            destination: self.source,
        }
    }

    pub fn point(&self, p: Point) -> Result<Point, CrsError> {
        match (self.source.code, self.destination.code) {
            (a, b) if a == b => Ok(p),
            (4326, 3857) => {
                if p.y.abs() > MERCATOR_MAX_LAT || p.x.abs() > 180.0 {
                    return Err(CrsError::OutOfRange {
                        crs: self.source.authid(),
                        x: p.x.to_string(),
                        y: p.y.to_string(),
                    });
                }
                let x = EARTH_RADIUS_M * p.x.to_radians();
                let y = EARTH_RADIUS_M * p.y.to_radians().tan().asinh();
                Ok(Point::new(x, y))
            }
            (3857, 4326) => {
                let lon = (p.x / EARTH_RADIUS_M).to_degrees();
                let lat = (p.y / EARTH_RADIUS_M).sinh().atan().to_degrees();
                Ok(Point::new(lon, lat))
            }
            _ => Err(CrsError::Unsupported {
                from: self.source.authid(),
                to: self.destination.authid(),
            }),
        }
    }

    pub fn geometry(&self, geometry: &Geometry) -> Result<Geometry, CrsError> {
        if self.is_identity() {
            return Ok(geometry.clone());
        }
        geometry.try_map_points(|p| self.point(p))
    }

    /// 变换四角后取外包范围。
    pub fn extent(&self, extent: &Extent) -> Result<Extent, CrsError> {
        if self.is_identity() {
            return Ok(*extent);
        }
        let corners = [
            Point::new(extent.min_x, extent.min_y),
            Point::new(extent.max_x, extent.min_y),
            Point::new(extent.max_x, extent.max_y),
            Point::new(extent.min_x, extent.max_y),
        ];
        let mut out = Vec::with_capacity(4);
        for c in corners {
            out.push(self.point(c)?);
        }
        Extent::from_points(out).ok_or(CrsError::Unsupported {
            from: self.source.authid(),
            to: self.destination.authid(),
        })
    }
}

/// 球面大圆距离（米），用于地理坐标系下的量测。
pub fn haversine_m(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.x - a.x).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
