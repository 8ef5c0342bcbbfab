//! 平面几何：点、范围、六类要素几何以及基础量测/仿射变换。
//!
//! 约定：
//! - 坐标均为平面坐标（地图单位），不做椭球计算。
//! - 面的环（ring）不要求首尾重复；若首尾相同，计算时会自动忽略重复的闭合点。
//! - 面的第一个环为外环，其余为内环（洞）。

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// 绕 `pivot` 顺时针旋转 `degrees` 度（与地图软件中“旋转要素”的习惯一致）。
    pub fn rotated_about(self, pivot: Point, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let dx = self.x - pivot.x;
        let dy = self.y - pivot.y;
        Self::new(pivot.x + dx * cos + dy * sin, pivot.y - dx * sin + dy * cos)
    }

    pub fn scaled_about(self, pivot: Point, factor: f64) -> Self {
        Self::new(
            pivot.x + (self.x - pivot.x) * factor,
            pivot.y + (self.y - pivot.y) * factor,
        )
    }
}

#[cfg(feature = "bevy")]
impl From<Point> for bevy::math::Vec2 {
    fn from(p: Point) -> Self {
        bevy::math::Vec2::new(p.x as f32, p.y as f32)
    }
}

#[cfg(feature = "bevy")]
impl From<bevy::math::Vec2> for Point {
    fn from(v: bevy::math::Vec2) -> Self {
        Point::new(v.x as f64, v.y as f64)
    }
}

/// 轴对齐矩形范围。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    pub fn around(center: Point, half_width: f64, half_height: f64) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut ext = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            ext.include(p);
        }
        Some(ext)
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// 每边向外扩展 `fraction` 倍的宽/高。
    pub fn buffered(&self, fraction: f64) -> Extent {
        let bx = self.width() * fraction;
        let by = self.height() * fraction;
        Extent::new(
            self.min_x - bx,
            self.min_y - by,
            self.max_x + bx,
            self.max_y + by,
        )
    }

    /// 保持中心不变，把较长边放大到至少 `min_size`。
    ///
    /// 单点或水平/垂直线的范围宽高可能为 0，缩放前需要给出一个最小尺寸。
    pub fn with_min_size(&self, min_size: f64) -> Extent {
        let w = self.width().max(min_size);
        let h = self.height().max(min_size);
        Extent::around(self.center(), w * 0.5, h * 0.5)
    }
}

/// 六类几何类别（tag 与注册表的几何类型词汇一致）。
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryCategory {
    Point,
    MultiPoint,
    Line,
    MultiLine,
    Polygon,
    MultiPolygon,
}

impl GeometryCategory {
    pub const ALL: [GeometryCategory; 6] = [
        Self::Point,
        Self::MultiPoint,
        Self::Line,
        Self::MultiLine,
        Self::Polygon,
        Self::MultiPolygon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::MultiPoint => "multipoint",
            Self::Line => "line",
            Self::MultiLine => "multiline",
            Self::Polygon => "polygon",
            Self::MultiPolygon => "multipolygon",
        }
    }

    pub fn is_polygonal(self) -> bool {
        matches!(self, Self::Polygon | Self::MultiPolygon)
    }

    pub fn is_linear(self) -> bool {
        matches!(self, Self::Line | Self::MultiLine)
    }

    pub fn is_puntal(self) -> bool {
        matches!(self, Self::Point | Self::MultiPoint)
    }

    /// 单/多部件视为同一“家族”，例如点图层可以接收多点几何。
    pub fn same_family(self, other: GeometryCategory) -> bool {
        (self.is_polygonal() && other.is_polygonal())
            || (self.is_linear() && other.is_linear())
            || (self.is_puntal() && other.is_puntal())
    }
}

impl std::fmt::Display for GeometryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Ring = Vec<Point>;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Point(Point),
    MultiPoint(Vec<Point>),
    Line(Vec<Point>),
    MultiLine(Vec<Vec<Point>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

/// 去掉环末尾重复的闭合点。
pub(crate) fn open_ring(ring: &[Point]) -> &[Point] {
    if ring.len() > 1 && ring.first() == ring.last() {
        &ring[..ring.len() - 1]
    } else {
        ring
    }
}

/// 环的边（包含最后一点回到第一点的闭合边）。
pub(crate) fn ring_segments(ring: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let ring = open_ring(ring);
    let n = ring.len();
    (0..if n >= 2 { n } else { 0 }).map(move |i| (ring[i], ring[(i + 1) % n]))
}

fn line_segments(line: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    line.windows(2).map(|w| (w[0], w[1]))
}

/// 鞋带公式，CCW 为正。
pub(crate) fn signed_ring_area(ring: &[Point]) -> f64 {
    ring_segments(ring)
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum::<f64>()
        * 0.5
}

fn ring_contains(ring: &[Point], p: Point) -> bool {
    // 射线法
    let mut inside = false;
    for (a, b) in ring_segments(ring) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

fn polygon_contains(rings: &[Ring], p: Point) -> bool {
    let Some((exterior, holes)) = rings.split_first() else {
        return false;
    };
    ring_contains(exterior, p) && !holes.iter().any(|h| ring_contains(h, p))
}

fn polygon_area(rings: &[Ring]) -> f64 {
    let Some((exterior, holes)) = rings.split_first() else {
        return 0.0;
    };
    let holes: f64 = holes.iter().map(|h| signed_ring_area(h).abs()).sum();
    (signed_ring_area(exterior).abs() - holes).max(0.0)
}

/// 面的面积加权质心（带洞时把洞的贡献减掉），面积退化时返回 None。
fn polygon_centroid_parts(rings: &[Ring]) -> Option<(Point, f64)> {
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut total = 0.0;
    for (i, ring) in rings.iter().enumerate() {
        let signed = signed_ring_area(ring);
        if signed.abs() < f64::EPSILON {
            continue;
        }
        let mut rx = 0.0;
        let mut ry = 0.0;
        for (a, b) in ring_segments(ring) {
            let cross = a.x * b.y - b.x * a.y;
            rx += (a.x + b.x) * cross;
            ry += (a.y + b.y) * cross;
        }
        rx /= 6.0 * signed;
        ry /= 6.0 * signed;
        let weight = if i == 0 { signed.abs() } else { -signed.abs() };
        cx += rx * weight;
        cy += ry * weight;
        total += weight;
    }
    if total.abs() < f64::EPSILON {
        return None;
    }
    Some((Point::new(cx / total, cy / total), total))
}

/// 点到线段的最近点。
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;
    if len2 <= f64::EPSILON {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    a.lerp(b, t)
}

impl Geometry {
    pub fn category(&self) -> GeometryCategory {
        match self {
            Self::Point(_) => GeometryCategory::Point,
            Self::MultiPoint(_) => GeometryCategory::MultiPoint,
            Self::Line(_) => GeometryCategory::Line,
            Self::MultiLine(_) => GeometryCategory::MultiLine,
            Self::Polygon(_) => GeometryCategory::Polygon,
            Self::MultiPolygon(_) => GeometryCategory::MultiPolygon,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points().next().is_none()
    }

    /// 所有顶点（面环不去重闭合点）。
    pub fn points(&self) -> Box<dyn Iterator<Item = Point> + '_> {
        match self {
            Self::Point(p) => Box::new(std::iter::once(*p)),
            Self::MultiPoint(ps) | Self::Line(ps) => Box::new(ps.iter().copied()),
            Self::MultiLine(lines) => Box::new(lines.iter().flatten().copied()),
            Self::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Self::MultiPolygon(polys) => Box::new(polys.iter().flatten().flatten().copied()),
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Polygon(rings) => rings.iter().map(|r| open_ring(r).len()).sum(),
            Self::MultiPolygon(polys) => polys
                .iter()
                .flatten()
                .map(|r| open_ring(r).len())
                .sum(),
            _ => self.points().count(),
        }
    }

    pub fn part_count(&self) -> usize {
        match self {
            Self::Point(_) | Self::Line(_) | Self::Polygon(_) => 1,
            Self::MultiPoint(ps) => ps.len(),
            Self::MultiLine(lines) => lines.len(),
            Self::MultiPolygon(polys) => polys.len(),
        }
    }

    /// 单点几何返回该点；多点返回第一个点。
    pub fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            Self::MultiPoint(ps) => ps.first().copied(),
            _ => None,
        }
    }

    pub fn map_points<F: FnMut(Point) -> Point>(&self, mut f: F) -> Geometry {
        match self {
            Self::Point(p) => Self::Point(f(*p)),
            Self::MultiPoint(ps) => Self::MultiPoint(ps.iter().map(|p| f(*p)).collect()),
            Self::Line(ps) => Self::Line(ps.iter().map(|p| f(*p)).collect()),
            Self::MultiLine(lines) => Self::MultiLine(
                lines
                    .iter()
                    .map(|l| l.iter().map(|p| f(*p)).collect())
                    .collect(),
            ),
            Self::Polygon(rings) => Self::Polygon(
                rings
                    .iter()
                    .map(|r| r.iter().map(|p| f(*p)).collect())
                    .collect(),
            ),
            Self::MultiPolygon(polys) => Self::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| {
                        rings
                            .iter()
                            .map(|r| r.iter().map(|p| f(*p)).collect())
                            .collect()
                    })
                    .collect(),
            ),
        }
    }

    pub fn try_map_points<E, F>(&self, mut f: F) -> Result<Geometry, E>
    where
        F: FnMut(Point) -> Result<Point, E>,
    {
        let mut err = None;
        let mapped = self.map_points(|p| match f(p) {
            Ok(q) => q,
            Err(e) => {
                if err.is_none() {
                    err = Some(e);
                }
                p
            }
        });
        match err {
            Some(e) => Err(e),
            None => Ok(mapped),
        }
    }

    pub fn bounds(&self) -> Option<Extent> {
        Extent::from_points(self.points())
    }

    /// 线段序列：线取相邻顶点，面取各环的边（含闭合边），点类为空。
    pub fn segments(&self) -> Vec<(Point, Point)> {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => Vec::new(),
            Self::Line(ps) => line_segments(ps).collect(),
            Self::MultiLine(lines) => lines.iter().flat_map(|l| line_segments(l)).collect(),
            Self::Polygon(rings) => rings.iter().flat_map(|r| ring_segments(r)).collect(),
            Self::MultiPolygon(polys) => polys
                .iter()
                .flatten()
                .flat_map(|r| ring_segments(r))
                .collect(),
        }
    }

    /// 线长度；面返回周长；点为 0。
    pub fn length(&self) -> f64 {
        self.segments().iter().map(|(a, b)| a.distance(*b)).sum()
    }

    pub fn area(&self) -> f64 {
        match self {
            Self::Polygon(rings) => polygon_area(rings),
            Self::MultiPolygon(polys) => polys.iter().map(|r| polygon_area(r)).sum(),
            _ => 0.0,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        match self {
            Self::Polygon(rings) => polygon_contains(rings, p),
            Self::MultiPolygon(polys) => polys.iter().any(|r| polygon_contains(r, p)),
            _ => false,
        }
    }

    /// 点到几何的最小平面距离；面内部的点距离为 0。
    pub fn distance_to(&self, p: Point) -> Option<f64> {
        if self.contains(p) {
            return Some(0.0);
        }
        match self {
            Self::Point(_) | Self::MultiPoint(_) => self
                .points()
                .map(|q| q.distance(p))
                .min_by(f64::total_cmp),
            _ => {
                let segs = self.segments();
                if segs.is_empty() {
                    // 只有一个顶点的退化线
                    return self.points().map(|q| q.distance(p)).min_by(f64::total_cmp);
                }
                segs.iter()
                    .map(|(a, b)| closest_point_on_segment(p, *a, *b).distance(p))
                    .min_by(f64::total_cmp)
            }
        }
    }

    /// 质心：面为面积加权，线为长度加权，点为平均值。
    pub fn centroid(&self) -> Option<Point> {
        let mean = || {
            let (n, sx, sy) = self
                .points()
                .fold((0usize, 0.0, 0.0), |(n, sx, sy), p| (n + 1, sx + p.x, sy + p.y));
            (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
        };
        match self {
            Self::Point(p) => Some(*p),
            Self::MultiPoint(_) => mean(),
            Self::Line(_) | Self::MultiLine(_) => {
                let mut total = 0.0;
                let mut cx = 0.0;
                let mut cy = 0.0;
                for (a, b) in self.segments() {
                    let len = a.distance(b);
                    let mid = a.lerp(b, 0.5);
                    cx += mid.x * len;
                    cy += mid.y * len;
                    total += len;
                }
                if total <= f64::EPSILON {
                    return mean();
                }
                Some(Point::new(cx / total, cy / total))
            }
            Self::Polygon(rings) => polygon_centroid_parts(rings).map(|(c, _)| c).or_else(mean),
            Self::MultiPolygon(polys) => {
                let mut cx = 0.0;
                let mut cy = 0.0;
                let mut total = 0.0;
                for rings in polys {
                    if let Some((c, w)) = polygon_centroid_parts(rings) {
                        cx += c.x * w;
                        cy += c.y * w;
                        total += w;
                    }
                }
                if total.abs() < f64::EPSILON {
                    return mean();
                }
                Some(Point::new(cx / total, cy / total))
            }
        }
    }

    /// 面的边界（闭合环组成的多线）；其它类型返回 None。
    pub fn boundary(&self) -> Option<Geometry> {
        let close = |ring: &Ring| {
            let mut r = ring.clone();
            if let (Some(first), Some(last)) = (r.first().copied(), r.last().copied())
                && first != last
            {
                r.push(first);
            }
            r
        };
        match self {
            Self::Polygon(rings) => Some(Self::MultiLine(rings.iter().map(close).collect())),
            Self::MultiPolygon(polys) => Some(Self::MultiLine(
                polys.iter().flatten().map(close).collect(),
            )),
            _ => None,
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        self.map_points(|p| p.translated(dx, dy))
    }

    /// 绕质心顺时针旋转。
    pub fn rotated(&self, degrees: f64) -> Result<Geometry, GeometryError> {
        if !degrees.is_finite() {
            return Err(GeometryError::InvalidParameter(format!(
                "rotation angle must be finite, got {degrees}"
            )));
        }
        let pivot = self.centroid().ok_or(GeometryError::Empty)?;
        Ok(self.map_points(|p| p.rotated_about(pivot, degrees)))
    }

    /// 以 `pivot`（缺省为质心）为原点缩放。
    pub fn scaled(&self, factor: f64, pivot: Option<Point>) -> Result<Geometry, GeometryError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(GeometryError::InvalidParameter(format!(
                "scale factor must be greater than zero, got {factor}"
            )));
        }
        let pivot = match pivot {
            Some(p) => p,
            None => self.centroid().ok_or(GeometryError::Empty)?,
        };
        Ok(self.map_points(|p| p.scaled_about(pivot, factor)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::Polygon(vec![vec![
            Point::new(x0, y0),
            Point::new(x0 + size, y0),
            Point::new(x0 + size, y0 + size),
            Point::new(x0, y0 + size),
            Point::new(x0, y0),
        ]])
    }

    #[test]
    fn polygon_measurements() {
        let sq = square(0.0, 0.0, 10.0);
        assert!((sq.area() - 100.0).abs() < 1e-9);
        assert!((sq.length() - 40.0).abs() < 1e-9);
        assert_eq!(sq.vertex_count(), 4);
        let c = sq.centroid().unwrap();
        assert!((c.x - 5.0).abs() < 1e-9 && (c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn hole_is_not_inside() {
        let poly = Geometry::Polygon(vec![
            vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(10.0, 10.0),
                Point::new(0.0, 10.0),
            ],
            vec![
                Point::new(4.0, 4.0),
                Point::new(6.0, 4.0),
                Point::new(6.0, 6.0),
                Point::new(4.0, 6.0),
            ],
        ]);
        assert!(poly.contains(Point::new(1.0, 1.0)));
        assert!(!poly.contains(Point::new(5.0, 5.0)));
        assert!((poly.distance_to(Point::new(5.0, 5.0)).unwrap() - 1.0).abs() < 1e-9);
        assert!((poly.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn distance_to_line_uses_segments() {
        let line = Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        assert!((line.distance_to(Point::new(5.0, 3.0)).unwrap() - 3.0).abs() < 1e-9);
        assert!((line.distance_to(Point::new(13.0, 4.0)).unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_is_clockwise_about_centroid() {
        let line = Geometry::Line(vec![Point::new(-1.0, 0.0), Point::new(1.0, 0.0)]);
        let rotated = line.rotated(90.0).unwrap();
        let Geometry::Line(ps) = rotated else {
            panic!("rotation changed the geometry type");
        };
        // 顺时针 90°：(-1,0) -> (0,1)
        assert!((ps[0].x - 0.0).abs() < 1e-9 && (ps[0].y - 1.0).abs() < 1e-9);
        assert!((ps[1].x - 0.0).abs() < 1e-9 && (ps[1].y + 1.0).abs() < 1e-9);
    }

    #[test]
    fn scale_rejects_non_positive_factor() {
        let line = Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0)]);
        assert!(line.scaled(0.0, None).is_err());
        let doubled = line.scaled(2.0, None).unwrap();
        assert!((doubled.length() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn extent_buffer_and_min_size() {
        let ext = Extent::new(0.0, 0.0, 10.0, 20.0).buffered(0.1);
        assert_eq!(ext, Extent::new(-1.0, -2.0, 11.0, 22.0));
        let pt = Extent::new(5.0, 5.0, 5.0, 5.0).with_min_size(2.0);
        assert_eq!(pt, Extent::new(4.0, 4.0, 6.0, 6.0));
    }
}
