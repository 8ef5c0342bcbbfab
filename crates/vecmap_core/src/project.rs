//! 工程：按绘制顺序排列的图层列表，下标 0 为最上层。

use crate::layer::{LayerId, MapLayer, RasterLayer, VectorLayer};

#[derive(Debug, Default)]
pub struct Project {
    layers: Vec<MapLayer>,
    next_layer_id: u32,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配一个未使用过的图层 id。
    pub fn allocate_layer_id(&mut self) -> LayerId {
        let used = self.layers.iter().map(|l| l.id().0 + 1).max().unwrap_or(0);
        self.next_layer_id = self.next_layer_id.max(used);
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }

    /// 放到最底层。
    pub fn push_layer(&mut self, layer: MapLayer) -> LayerId {
        let id = layer.id();
        self.layers.push(layer);
        id
    }

    /// 放到最上层（派生图层默认位置）。
    pub fn insert_top(&mut self, layer: MapLayer) -> LayerId {
        let id = layer.id();
        self.layers.insert(0, layer);
        id
    }

    pub fn push_vector(&mut self, layer: VectorLayer) -> LayerId {
        self.push_layer(MapLayer::Vector(layer))
    }

    pub fn push_raster(&mut self, layer: RasterLayer) -> LayerId {
        self.push_layer(MapLayer::Raster(layer))
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<MapLayer> {
        let idx = self.draw_index(id)?;
        Some(self.layers.remove(idx))
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [MapLayer] {
        &mut self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// 绘制顺序下标（0 = 最上层）。
    pub fn draw_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn layer(&self, id: LayerId) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut MapLayer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn vector(&self, id: LayerId) -> Option<&VectorLayer> {
        self.layer(id).and_then(MapLayer::as_vector)
    }

    pub fn vector_mut(&mut self, id: LayerId) -> Option<&mut VectorLayer> {
        self.layer_mut(id).and_then(MapLayer::as_vector_mut)
    }

    pub fn vector_layers(&self) -> impl Iterator<Item = &VectorLayer> {
        self.layers.iter().filter_map(MapLayer::as_vector)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(MapLayer::name)
    }

    /// 名称冲突时追加 `_2`、`_3`……
    pub fn unique_layer_name(&self, base: &str) -> String {
        if !self.layer_names().any(|n| n == base) {
            return base.to_string();
        }
        (2..)
            .map(|i| format!("{base}_{i}"))
            .find(|candidate| !self.layer_names().any(|n| n == candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::geometry::GeometryCategory;

    #[test]
    fn top_insert_and_draw_order() {
        let mut project = Project::new();
        let a = project.allocate_layer_id();
        project.push_vector(VectorLayer::new(a, "a", GeometryCategory::Point, Crs::default()));
        let b = project.allocate_layer_id();
        project.insert_top(MapLayer::Vector(VectorLayer::new(
            b,
            "b",
            GeometryCategory::Line,
            Crs::default(),
        )));
        assert_eq!(project.draw_index(b), Some(0));
        assert_eq!(project.draw_index(a), Some(1));
        assert_ne!(a, b);
    }

    #[test]
    fn unique_names_get_a_suffix() {
        let mut project = Project::new();
        let id = project.allocate_layer_id();
        project.push_vector(VectorLayer::new(id, "roads", GeometryCategory::Line, Crs::default()));
        assert_eq!(project.unique_layer_name("roads"), "roads_2");
        assert_eq!(project.unique_layer_name("rivers"), "rivers");
    }
}
