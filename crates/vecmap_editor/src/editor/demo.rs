//! 没有图层文件时使用的示例工程。

use vecmap_core::geometry::{Geometry, GeometryCategory, Point};
use vecmap_core::layer::{AttributeValue, Attributes, Field, FieldKind, RasterLayer};
use vecmap_core::{Crs, Project, VectorLayer};

fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        Point::new(x, y),
        Point::new(x + size, y),
        Point::new(x + size, y + size),
        Point::new(x, y + size),
        Point::new(x, y),
    ]])
}

pub fn demo_project(crs: Crs) -> Project {
    let mut project = Project::new();

    let id = project.allocate_layer_id();
    let mut stations = VectorLayer::new(id, "stations", GeometryCategory::Point, crs).with_fields(vec![
        Field::new("name", FieldKind::Text),
        Field::new("kind", FieldKind::Text),
    ]);
    for (name, kind, x, y) in [
        ("Central", "rail", 120.0, 340.0),
        ("Harbour", "rail", 610.0, 80.0),
        ("Market", "bus", 300.0, 180.0),
        ("Hill", "bus", 450.0, 420.0),
    ] {
        stations.add_committed(
            Some(Geometry::Point(Point::new(x, y))),
            attrs(&[
                ("name", AttributeValue::Text(name.into())),
                ("kind", AttributeValue::Text(kind.into())),
            ]),
        );
    }
    project.push_vector(stations);

    let id = project.allocate_layer_id();
    let mut roads = VectorLayer::new(id, "roads", GeometryCategory::Line, crs)
        .with_fields(vec![Field::new("name", FieldKind::Text)]);
    roads.add_committed(
        Some(Geometry::Line(vec![
            Point::new(0.0, 300.0),
            Point::new(200.0, 320.0),
            Point::new(420.0, 260.0),
            Point::new(700.0, 300.0),
        ])),
        attrs(&[("name", AttributeValue::Text("Ring Road".into()))]),
    );
    roads.add_committed(
        Some(Geometry::Line(vec![Point::new(300.0, 0.0), Point::new(320.0, 500.0)])),
        attrs(&[("name", AttributeValue::Text("North Street".into()))]),
    );
    project.push_vector(roads);

    let id = project.allocate_layer_id();
    let mut parcels = VectorLayer::new(id, "parcels", GeometryCategory::Polygon, crs)
        .with_fields(vec![Field::new("lot", FieldKind::Int)]);
    for (lot, (x, y, size)) in [(40.0, 40.0, 120.0), (200.0, 60.0, 80.0), (480.0, 120.0, 150.0)]
        .into_iter()
        .enumerate()
    {
        parcels.add_committed(Some(square(x, y, size)), attrs(&[("lot", AttributeValue::Int(lot as i64 + 1))]));
    }
    project.push_vector(parcels);

    let id = project.allocate_layer_id();
    project.push_raster(RasterLayer {
        id,
        name: "basemap".to_string(),
        visible: true,
        basemap: true,
    });

    project
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_has_one_layer_per_geometry_family_and_a_basemap() {
        let project = demo_project(Crs::WEB_MERCATOR);
        let names: Vec<&str> = project.layer_names().collect();
        assert_eq!(names, ["stations", "roads", "parcels", "basemap"]);
        assert!(project.layers()[3].is_basemap());
        assert_eq!(project.vector_layers().map(|l| l.feature_count()).sum::<usize>(), 9);
    }
}
