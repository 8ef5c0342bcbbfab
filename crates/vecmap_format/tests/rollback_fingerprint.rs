use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use vecmap_core::edit;
use vecmap_core::error::{MutationError, ProviderError};
use vecmap_core::geometry::{Geometry, GeometryCategory, Point};
use vecmap_core::layer::{
    AttributeValue, Attributes, DataProvider, Feature, FeatureId, LayerId, ProviderCapabilities,
};
use vecmap_core::{Crs, VectorLayer};
use vecmap_format::{decode_layer_ron, encode_layer_ron, layer_fingerprint};

/// 接受修改，但拒绝写入。
struct ReadOnlyDisk;

impl DataProvider for ReadOnlyDisk {
    fn name(&self) -> &str {
        "read-only-disk"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities { editable: true }
    }

    fn persist(&mut self, _features: &BTreeMap<FeatureId, Feature>) -> Result<(), ProviderError> {
        Err(ProviderError::new(self.name(), "device is write protected"))
    }
}

fn parcels() -> VectorLayer {
    let mut layer = VectorLayer::new(LayerId(1), "parcels", GeometryCategory::Polygon, Crs::WEB_MERCATOR)
        .with_provider(Box::new(ReadOnlyDisk));
    for (i, x) in [0.0, 20.0, 40.0].into_iter().enumerate() {
        let ring = vec![
            Point::new(x, 0.0),
            Point::new(x + 10.0, 0.0),
            Point::new(x + 10.0, 10.0),
            Point::new(x, 10.0),
            Point::new(x, 0.0),
        ];
        let attributes: Attributes = [("lot".to_string(), AttributeValue::Int(i as i64))].into();
        layer.add_committed(Some(Geometry::Polygon(vec![ring])), attributes);
    }
    layer
}

#[test]
fn failed_commit_and_rollback_leave_identical_bytes() {
    let mut layer = parcels();
    let before_text = encode_layer_ron(&layer).unwrap();
    let before = layer_fingerprint(&layer);

    let mut record = edit::enter(&mut layer).unwrap();
    layer
        .update_geometry(2, Geometry::Polygon(vec![vec![Point::new(0.0, 0.0); 4]]))
        .unwrap();
    layer
        .set_attribute(3, "lot", AttributeValue::Text("changed".into()))
        .unwrap();
    layer.delete_feature(1).unwrap();
    assert!(edit::commit(&mut layer, &mut record).is_err());
    edit::rollback(&mut layer, &mut record);
    edit::exit(&mut layer, &mut record);

    assert!(!layer.is_editable());
    assert_eq!(layer_fingerprint(&layer), before);
    assert_eq!(encode_layer_ron(&layer).unwrap(), before_text);
}

#[test]
fn failed_mutation_rollback_matches_a_fresh_load() {
    let mut layer = parcels();
    let saved = encode_layer_ron(&layer).unwrap();

    let mut record = edit::enter(&mut layer).unwrap();
    layer.delete_feature(2).unwrap();
    let err = layer
        .update_geometry(3, Geometry::Point(Point::new(1.0, 1.0)))
        .unwrap_err();
    assert!(matches!(err, MutationError::GeometryMismatch { .. }));
    edit::rollback(&mut layer, &mut record);
    edit::exit(&mut layer, &mut record);

    let reloaded = decode_layer_ron(&saved, LayerId(1)).unwrap();
    assert_eq!(layer.committed_features(), reloaded.committed_features());
    assert_eq!(layer_fingerprint(&layer), layer_fingerprint(&reloaded));
}
