mod common;

use pretty_assertions::assert_eq;

use common::{layer_with, point_layer, square, RecordingNotifier, ScriptedPrompt};
use vecmap_core::actions::{builtin_actions, MoveByDistanceDirection};
use vecmap_core::capability::{GeometryTag, Scope};
use vecmap_core::error::ConfigurationError;
use vecmap_core::geometry::{Extent, Geometry, GeometryCategory, Point};
use vecmap_core::layer::{LayerId, RasterLayer};
use vecmap_core::locator::locate;
use vecmap_core::notify::NoticeLevel;
use vecmap_core::settings::MemorySettings;
use vecmap_core::{
    ActionEnv, ActionOutcome, CanvasView, ClickContext, Crs, Dispatcher, Project,
};

fn view() -> CanvasView {
    CanvasView {
        crs: Crs::WEB_MERCATOR,
        extent: Extent::new(0.0, 0.0, 1000.0, 1000.0),
        map_units_per_pixel: 1.0,
    }
}

fn dispatcher() -> Dispatcher {
    let mut dispatcher = Dispatcher::default();
    let errors = dispatcher.register_all(builtin_actions());
    assert!(errors.is_empty(), "{errors:?}");
    dispatcher
}

fn line_project() -> Project {
    let mut project = Project::new();
    project.push_vector(layer_with(
        1,
        "roads",
        GeometryCategory::Line,
        vec![Geometry::Line(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)])],
    ));
    project
}

#[test]
fn polygon_containment_beats_nearby_point() {
    let mut project = Project::new();
    project.push_vector(point_layer(1, "L1", &[(101.0, 201.0)]));
    project.push_vector(layer_with(
        2,
        "L2",
        GeometryCategory::Polygon,
        vec![square(50.0, 150.0, 100.0)],
    ));

    let hits = locate(Point::new(100.0, 200.0), &project, Crs::WEB_MERCATOR, 5.0);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].layer_id, LayerId(2));
    assert_eq!(hits[0].distance, 0.0);
    assert_eq!(hits[1].layer_id, LayerId(1));
    assert!((hits[1].distance - 2f64.sqrt()).abs() < 1e-9);
}

#[test]
fn locator_orders_by_distance_for_overlapping_features() {
    let mut project = Project::new();
    project.push_vector(point_layer(
        1,
        "points",
        &[(3.0, 0.0), (0.0, 1.0), (-2.0, -2.0), (4.0, 4.0), (0.5, 0.5)],
    ));
    project.push_vector(layer_with(
        2,
        "lines",
        GeometryCategory::Line,
        vec![
            Geometry::Line(vec![Point::new(-5.0, 2.0), Point::new(5.0, 2.0)]),
            Geometry::Line(vec![Point::new(-1.5, -5.0), Point::new(-1.5, 5.0)]),
        ],
    ));
    project.push_vector(layer_with(
        3,
        "zones",
        GeometryCategory::Polygon,
        vec![square(-1.0, -1.0, 2.0), square(10.0, 10.0, 1.0)],
    ));

    for (x, y) in [(0.0, 0.0), (0.9, -0.9), (2.0, 2.0), (-1.5, 0.0), (3.0, 3.0)] {
        let click = Point::new(x, y);
        let hits = locate(click, &project, Crs::WEB_MERCATOR, 5.0);
        assert!(!hits.is_empty());
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance, "{hits:?}");
        }
        for hit in &hits {
            assert!(hit.distance <= 5.0);
            if hit.geometry_type.is_polygonal() {
                let layer = project.vector(hit.layer_id).unwrap();
                let geometry = layer.feature(hit.feature_id).unwrap().geometry.as_ref().unwrap();
                if geometry.contains(click) {
                    assert_eq!(hit.distance, 0.0);
                }
            }
        }
    }
}

#[test]
fn equal_distances_prefer_the_topmost_layer() {
    let mut project = Project::new();
    project.push_vector(point_layer(1, "top", &[(1.0, 0.0)]));
    project.push_vector(point_layer(2, "bottom", &[(-1.0, 0.0)]));
    let hits = locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, 5.0);
    let layers: Vec<LayerId> = hits.iter().map(|h| h.layer_id).collect();
    assert_eq!(layers, vec![LayerId(1), LayerId(2)]);
}

#[test]
fn locator_skips_raster_and_invalid_layers() {
    let mut project = Project::new();
    project.push_raster(RasterLayer {
        id: LayerId(9),
        name: "basemap".into(),
        visible: true,
        basemap: true,
    });
    let mut broken = point_layer(1, "broken", &[(0.0, 0.0)]);
    broken.set_valid(false);
    project.push_vector(broken);
    assert!(locate(Point::new(0.0, 0.0), &project, Crs::WEB_MERCATOR, 5.0).is_empty());
}

#[test]
fn locator_transforms_layer_crs_into_canvas_crs() {
    let mut project = Project::new();
    let mut layer = point_layer(1, "wgs", &[]);
    layer.crs = Crs::WGS84;
    layer.add_committed(
        Some(Geometry::Point(Point::new(0.0, 0.0))),
        Default::default(),
    );
    project.push_vector(layer);
    let hits = locate(Point::new(3.0, 4.0), &project, Crs::WEB_MERCATOR, 6.0);
    assert_eq!(hits.len(), 1);
    assert!((hits[0].distance - 5.0).abs() < 1e-6);
}

#[test]
fn line_click_offers_line_and_universal_actions_in_registration_order() {
    let dispatcher = dispatcher();
    let project = line_project();
    let settings = MemorySettings::new();
    let (ctx, ids) = dispatcher
        .build_menu(Point::new(50.0, 2.0), &project, Some(view()), &settings)
        .unwrap();
    assert_eq!(ctx.detected_features.len(), 1);
    assert_eq!(
        ids,
        vec![
            "rotate_line",
            "scale_line",
            "scale_line_layer",
            "zoom_to_line",
            "zoom_to_line_layer",
            "show_line_segment_lengths",
            "show_line_layer_segment_lengths",
            "measure_distance",
            "zoom_to_visible_data_layers",
            "toggle_all_layers",
        ]
    );
}

#[test]
fn menu_matches_capability_gating_for_every_category() {
    let dispatcher = dispatcher();
    let settings = MemorySettings::new();
    for category in GeometryCategory::ALL {
        let geometry = match category {
            GeometryCategory::Point => Geometry::Point(Point::new(10.0, 10.0)),
            GeometryCategory::MultiPoint => Geometry::MultiPoint(vec![Point::new(10.0, 10.0)]),
            GeometryCategory::Line => {
                Geometry::Line(vec![Point::new(0.0, 10.0), Point::new(20.0, 10.0)])
            }
            GeometryCategory::MultiLine => {
                Geometry::MultiLine(vec![vec![Point::new(0.0, 10.0), Point::new(20.0, 10.0)]])
            }
            GeometryCategory::Polygon => square(0.0, 0.0, 20.0),
            GeometryCategory::MultiPolygon => match square(0.0, 0.0, 20.0) {
                Geometry::Polygon(rings) => Geometry::MultiPolygon(vec![rings]),
                other => other,
            },
        };
        let mut project = Project::new();
        project.push_vector(layer_with(1, "data", category, vec![geometry]));
        let (_, ids) = dispatcher
            .build_menu(Point::new(10.0, 10.0), &project, Some(view()), &settings)
            .unwrap();

        let tag = GeometryTag::Category(category);
        let expected: Vec<String> = dispatcher
            .registry()
            .descriptors()
            .filter(|d| {
                d.enabled
                    && (d.scope == Scope::Universal
                        || d.supported_scopes.contains(&Scope::Feature)
                        || d.supported_scopes.contains(&Scope::Layer))
                    && (d.supported_geometry_types.contains(&tag)
                        || d.supported_geometry_types.contains(&GeometryTag::Universal))
            })
            .map(|d| d.action_id.clone())
            .collect();
        assert_eq!(ids, expected, "category {category}");
        assert!(ids.iter().all(|id| {
            let d = dispatcher.registry().descriptor(id).unwrap();
            d.scope == Scope::Universal || d.accepts_geometry(category)
        }));
    }
}

#[test]
fn empty_click_offers_universal_actions_only() {
    let dispatcher = dispatcher();
    let project = line_project();
    let settings = MemorySettings::new();
    let (ctx, ids) = dispatcher
        .build_menu(Point::new(500.0, 500.0), &project, Some(view()), &settings)
        .unwrap();
    assert!(ctx.detected_features.is_empty());
    assert_eq!(
        ids,
        vec!["measure_distance", "zoom_to_visible_data_layers", "toggle_all_layers"]
    );
    let names: Vec<String> = dispatcher
        .menu_entries(&ids)
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(
        names,
        vec!["Measure Distance", "Zoom to Visible Data Layers", "Toggle All Layers"]
    );
}

#[test]
fn disabled_actions_never_appear() {
    let mut dispatcher = dispatcher();
    let project = line_project();
    let click = Point::new(50.0, 0.0);

    let settings = MemorySettings::new().with("MapActions/rotate_line/enabled", false);
    let (_, ids) = dispatcher
        .build_menu(click, &project, Some(view()), &settings)
        .unwrap();
    assert!(!ids.iter().any(|id| id == "rotate_line"));
    assert!(ids.iter().any(|id| id == "scale_line"));

    // 每次分发都重新读取
    let settings = MemorySettings::new();
    dispatcher.registry_mut().set_enabled("scale_line", false);
    let (_, ids) = dispatcher
        .build_menu(click, &project, Some(view()), &settings)
        .unwrap();
    assert!(ids.iter().any(|id| id == "rotate_line"));
    assert!(!ids.iter().any(|id| id == "scale_line"));

    // 设置可以重新启用被描述关闭的动作
    let settings = MemorySettings::new().with("MapActions/scale_line/enabled", true);
    let (_, ids) = dispatcher
        .build_menu(click, &project, Some(view()), &settings)
        .unwrap();
    assert!(ids.iter().any(|id| id == "scale_line"));
}

#[test]
fn search_radius_scales_with_map_units_per_pixel() {
    let dispatcher = dispatcher();
    let project = line_project();
    let settings = MemorySettings::new();
    let zoomed_out = CanvasView {
        map_units_per_pixel: 10.0,
        ..view()
    };
    let (ctx, _) = dispatcher
        .build_menu(Point::new(50.0, 30.0), &project, Some(zoomed_out), &settings)
        .unwrap();
    assert_eq!(ctx.detected_features.len(), 1);
    let (ctx, _) = dispatcher
        .build_menu(Point::new(50.0, 30.0), &project, Some(view()), &settings)
        .unwrap();
    assert!(ctx.detected_features.is_empty());
}

#[test]
fn non_finite_click_is_a_context_error() {
    let dispatcher = dispatcher();
    let project = line_project();
    let settings = MemorySettings::new();
    assert!(dispatcher
        .build_menu(Point::new(f64::NAN, 0.0), &project, Some(view()), &settings)
        .is_err());
}

#[test]
fn duplicate_registration_keeps_the_first() {
    let mut dispatcher = Dispatcher::default();
    dispatcher
        .register(Box::new(MoveByDistanceDirection::point()))
        .unwrap();
    let err = dispatcher
        .register(Box::new(MoveByDistanceDirection::point()))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::DuplicateActionId("move_point_by_distance_direction".into())
    );
    assert_eq!(dispatcher.registry().len(), 1);
}

#[test]
fn feature_action_without_candidates_reports_and_does_not_edit() {
    let dispatcher = dispatcher();
    let mut project = Project::new();
    project.push_vector(point_layer(1, "points", &[(0.0, 0.0)]));
    let settings = MemorySettings::new();
    let mut notifier = RecordingNotifier::agreeing();
    let mut prompt = ScriptedPrompt::default();

    let ctx = ClickContext::new(Point::new(500.0, 500.0), Some(view()), Vec::new()).unwrap();
    let result = {
        let mut env = ActionEnv::new(&mut project, &mut notifier, &mut prompt, &settings);
        dispatcher
            .execute("move_point_by_distance_direction", &ctx, &mut env)
            .unwrap()
    };

    assert!(result.is_err());
    assert_eq!(notifier.levels(), vec![NoticeLevel::Warning]);
    assert_eq!(notifier.last_text(), "No point features found at this location");
    assert!(prompt.forms.is_empty());
    assert!(notifier.confirmations.is_empty());
    let layer = project.vector(LayerId(1)).unwrap();
    assert!(!layer.is_editable());
}

#[test]
fn unknown_action_is_a_dispatch_error() {
    let dispatcher = dispatcher();
    let mut project = Project::new();
    let settings = MemorySettings::new();
    let mut notifier = RecordingNotifier::agreeing();
    let mut prompt = ScriptedPrompt::default();
    let ctx = ClickContext::new(Point::new(0.0, 0.0), None, Vec::new()).unwrap();
    let mut env = ActionEnv::new(&mut project, &mut notifier, &mut prompt, &settings);
    assert!(dispatcher.execute("does_not_exist", &ctx, &mut env).is_err());
}

#[test]
fn cancelled_dialog_is_not_an_error() {
    let dispatcher = dispatcher();
    let mut project = line_project();
    let settings = MemorySettings::new();
    let mut notifier = RecordingNotifier::agreeing();
    let mut prompt = ScriptedPrompt::cancelling();
    let (ctx, _) = dispatcher
        .build_menu(Point::new(50.0, 0.0), &project, Some(view()), &settings)
        .unwrap();
    let outcome = {
        let mut env = ActionEnv::new(&mut project, &mut notifier, &mut prompt, &settings);
        dispatcher.execute("rotate_line", &ctx, &mut env).unwrap()
    };
    assert_eq!(outcome, Ok(ActionOutcome::Cancelled));
    assert!(notifier.notices.is_empty());
    assert!(!project.vector(LayerId(1)).unwrap().is_editable());
}
