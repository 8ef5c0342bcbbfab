//! 纯几何算法：Chaikin 平滑、最近点、线段拆分、内角。
//!
//! 所有函数都是 `(几何, 参数) -> 结果`，不依赖任何全局状态。

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::geometry::{
    closest_point_on_segment, open_ring, signed_ring_area, Geometry, Point, Ring,
};

/// 采样法缺省采样数（沿线均匀取 `samples + 1` 个点）。
pub const DEFAULT_NEAREST_SAMPLES: usize = 100;

pub const MAX_SMOOTH_ITERATIONS: u32 = 10;

fn chaikin_ring_once(ring: &[Point], offset: f64) -> Ring {
    let ring = open_ring(ring);
    let n = ring.len();
    let mut out = Vec::with_capacity(n * 2 + 1);
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        out.push(a.lerp(b, offset));
        out.push(a.lerp(b, 1.0 - offset));
    }
    if let Some(first) = out.first().copied() {
        out.push(first);
    }
    out
}

fn chaikin_line_once(line: &[Point], offset: f64) -> Vec<Point> {
    if line.len() < 3 {
        return line.to_vec();
    }
    let mut out = Vec::with_capacity(line.len() * 2);
    out.push(line[0]);
    for w in line.windows(2) {
        out.push(w[0].lerp(w[1], offset));
        out.push(w[0].lerp(w[1], 1.0 - offset));
    }
    // 端点保持不动
    out.remove(1);
    out.pop();
    if let Some(last) = line.last() {
        out.push(*last);
    }
    out
}

fn smooth_rings(rings: &[Ring], iterations: u32, offset: f64) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            if open_ring(ring).len() < 3 {
                return ring.clone();
            }
            (0..iterations).fold(ring.clone(), |r, _| chaikin_ring_once(&r, offset))
        })
        .collect()
}

fn smooth_line(line: &[Point], iterations: u32, offset: f64) -> Vec<Point> {
    (0..iterations).fold(line.to_vec(), |l, _| chaikin_line_once(&l, offset))
}

/// Chaikin 割角平滑。
///
/// - `iterations`：1..=10
/// - `offset`：割角比例，(0, 0.5]
///
/// 点类几何没有可平滑的边，返回 `Unsupported`。
pub fn smooth_chaikin(
    geometry: &Geometry,
    iterations: u32,
    offset: f64,
) -> Result<Geometry, GeometryError> {
    if !(1..=MAX_SMOOTH_ITERATIONS).contains(&iterations) {
        return Err(GeometryError::InvalidParameter(format!(
            "iterations must be between 1 and {MAX_SMOOTH_ITERATIONS}, got {iterations}"
        )));
    }
    if !(offset > 0.0 && offset <= 0.5) {
        return Err(GeometryError::InvalidParameter(format!(
            "offset must be in (0, 0.5], got {offset}"
        )));
    }
    if geometry.is_empty() {
        return Err(GeometryError::Empty);
    }
    Ok(match geometry {
        Geometry::Point(_) | Geometry::MultiPoint(_) => {
            return Err(GeometryError::Unsupported(geometry.category().to_string()));
        }
        Geometry::Line(line) => Geometry::Line(smooth_line(line, iterations, offset)),
        Geometry::MultiLine(lines) => Geometry::MultiLine(
            lines
                .iter()
                .map(|l| smooth_line(l, iterations, offset))
                .collect(),
        ),
        Geometry::Polygon(rings) => Geometry::Polygon(smooth_rings(rings, iterations, offset)),
        Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(
            polys
                .iter()
                .map(|rings| smooth_rings(rings, iterations, offset))
                .collect(),
        ),
    })
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NearestMethod {
    /// 逐线段精确求解。
    Exact,
    /// 沿线（面取边界）按长度均匀采样，取最近的采样点。
    Sampled { samples: usize },
}

impl Default for NearestMethod {
    fn default() -> Self {
        Self::Sampled {
            samples: DEFAULT_NEAREST_SAMPLES,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestHit {
    /// 几何上的吸附目标点。
    pub point: Point,
    /// `target` 到几何的精确距离（面内部为 0）。
    pub distance: f64,
}

/// 按累计长度在线/面边界上插值。距离超出总长时夹到末端。
pub fn interpolate(geometry: &Geometry, distance: f64) -> Option<Point> {
    let segments = geometry.segments();
    if segments.is_empty() {
        return geometry.as_point();
    }
    let mut remaining = distance.max(0.0);
    for (a, b) in &segments {
        let len = a.distance(*b);
        if remaining <= len {
            if len <= f64::EPSILON {
                return Some(*a);
            }
            return Some(a.lerp(*b, remaining / len));
        }
        remaining -= len;
    }
    segments.last().map(|(_, b)| *b)
}

/// 几何上距 `target` 最近的点。
pub fn nearest_point(
    geometry: &Geometry,
    target: Point,
    method: NearestMethod,
) -> Option<NearestHit> {
    let distance = geometry.distance_to(target)?;
    let segments = geometry.segments();
    if segments.is_empty() {
        // 点类几何：直接取最近顶点
        let point = geometry
            .points()
            .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))?;
        return Some(NearestHit { point, distance });
    }
    let point = match method {
        NearestMethod::Exact => segments
            .iter()
            .map(|(a, b)| closest_point_on_segment(target, *a, *b))
            .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))?,
        NearestMethod::Sampled { samples } => {
            let samples = samples.max(1);
            let total = geometry.length();
            (0..=samples)
                .filter_map(|i| interpolate(geometry, total * i as f64 / samples as f64))
                .min_by(|a, b| a.distance(target).total_cmp(&b.distance(target)))?
        }
    };
    Some(NearestHit { point, distance })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentInfo {
    /// 在整条几何中的序号（从 1 开始）。
    pub index: usize,
    pub start: Point,
    pub end: Point,
    pub midpoint: Point,
    pub length: f64,
}

pub fn segment_lengths(geometry: &Geometry) -> Vec<SegmentInfo> {
    geometry
        .segments()
        .into_iter()
        .enumerate()
        .map(|(i, (a, b))| SegmentInfo {
            index: i + 1,
            start: a,
            end: b,
            midpoint: a.lerp(b, 0.5),
            length: a.distance(b),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VertexAngle {
    pub index: usize,
    pub vertex: Point,
    /// 内角（弧度），范围 [0, 2π)。
    pub radians: f64,
}

/// 环的各顶点内角，与环的绕向无关。
pub fn interior_angles(ring: &[Point]) -> Vec<VertexAngle> {
    let ring = open_ring(ring);
    let n = ring.len();
    if n < 3 {
        return Vec::new();
    }
    let ccw = signed_ring_area(ring) >= 0.0;
    let tau = std::f64::consts::TAU;
    (0..n)
        .map(|i| {
            let v = ring[i];
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            let a = Point::new(prev.x - v.x, prev.y - v.y);
            let b = Point::new(next.x - v.x, next.y - v.y);
            let dot = a.x * b.x + a.y * b.y;
            let cross_ba = b.x * a.y - b.y * a.x;
            let raw = if ccw {
                cross_ba.atan2(dot)
            } else {
                (-cross_ba).atan2(dot)
            };
            VertexAngle {
                index: i,
                vertex: v,
                radians: raw.rem_euclid(tau),
            }
        })
        .collect()
}

/// 面/多面的外环与内环的所有顶点内角（按环顺序拼接）。
pub fn polygon_angles(geometry: &Geometry) -> Vec<VertexAngle> {
    let rings: Vec<&Ring> = match geometry {
        Geometry::Polygon(rings) => rings.iter().collect(),
        Geometry::MultiPolygon(polys) => polys.iter().flatten().collect(),
        _ => return Vec::new(),
    };
    rings.into_iter().flat_map(|r| interior_angles(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn chaikin_doubles_ring_vertices_per_iteration() {
        let square = Geometry::Polygon(vec![unit_square()]);
        let once = smooth_chaikin(&square, 1, 0.25).unwrap();
        assert_eq!(once.vertex_count(), 8);
        let twice = smooth_chaikin(&square, 2, 0.25).unwrap();
        assert_eq!(twice.vertex_count(), 16);
        // 割角后面积变小，但仍然闭合
        assert!(once.area() < square.area());
        let Geometry::Polygon(rings) = once else {
            panic!("smoothing changed the geometry type");
        };
        assert_eq!(rings[0].first(), rings[0].last());
    }

    #[test]
    fn chaikin_keeps_line_endpoints() {
        let line = Geometry::Line(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
        ]);
        let Geometry::Line(out) = smooth_chaikin(&line, 3, 0.25).unwrap() else {
            panic!("smoothing changed the geometry type");
        };
        assert_eq!(out.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(out.last(), Some(&Point::new(2.0, 0.0)));
    }

    #[test]
    fn chaikin_rejects_bad_parameters() {
        let square = Geometry::Polygon(vec![unit_square()]);
        assert!(smooth_chaikin(&square, 0, 0.25).is_err());
        assert!(smooth_chaikin(&square, 11, 0.25).is_err());
        assert!(smooth_chaikin(&square, 1, 0.75).is_err());
        assert!(smooth_chaikin(&Geometry::Point(Point::new(0.0, 0.0)), 1, 0.25).is_err());
    }

    #[test]
    fn exact_and_sampled_nearest_points() {
        let line = Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        let target = Point::new(33.3, 7.0);
        let exact = nearest_point(&line, target, NearestMethod::Exact).unwrap();
        assert!((exact.point.x - 33.3).abs() < 1e-9);
        assert!((exact.distance - 7.0).abs() < 1e-9);

        // 100 段采样：最近采样点在 33.0
        let sampled = nearest_point(&line, target, NearestMethod::default()).unwrap();
        assert!((sampled.point.x - 33.0).abs() < 1e-9);
        assert!((sampled.distance - 7.0).abs() < 1e-9);
    }

    #[test]
    fn interior_angles_do_not_depend_on_winding() {
        let mut ring = unit_square();
        let ccw: Vec<f64> = interior_angles(&ring).iter().map(|a| a.radians).collect();
        ring.reverse();
        let cw: Vec<f64> = interior_angles(&ring).iter().map(|a| a.radians).collect();
        for a in ccw.iter().chain(cw.iter()) {
            assert!((a - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        }
    }

    #[test]
    fn reflex_angle_is_reported() {
        // L 形：在 (1,1) 处为 270°
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let angles = interior_angles(&ring);
        let reflex = angles
            .iter()
            .find(|a| a.vertex == Point::new(1.0, 1.0))
            .unwrap();
        assert!((reflex.radians.to_degrees() - 270.0).abs() < 1e-9);
        let sum: f64 = angles.iter().map(|a| a.radians.to_degrees()).sum();
        assert!((sum - 720.0).abs() < 1e-6);
    }

    #[test]
    fn segment_lengths_number_from_one() {
        let line = Geometry::Line(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 10.0),
        ]);
        let segs = segment_lengths(&line);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].index, 1);
        assert!((segs[0].length - 5.0).abs() < 1e-9);
        assert_eq!(segs[1].midpoint, Point::new(3.0, 7.0));
    }
}
