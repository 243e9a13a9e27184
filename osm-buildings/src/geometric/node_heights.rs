use std::collections::HashMap;

/// Height carried by a standalone OSM node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeHeight {
    pub height: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Heights of tagged point primitives, keyed by node id
///
/// Used to give a building without a `height` tag the mean height of the
/// tagged nodes on its outline.
#[derive(Debug, Default)]
pub struct NodeHeightIndex {
    nodes: HashMap<i64, NodeHeight>,
}

impl NodeHeightIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64, height: f64, lat: f64, lon: f64) {
        self.nodes.insert(id, NodeHeight { height, lat, lon });
    }

    pub fn get(&self, id: i64) -> Option<&NodeHeight> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mean height of the indexed nodes among `node_ids`
    /// Returns None when none of them carries a height.
    pub fn average_height(&self, node_ids: &[i64]) -> Option<f64> {
        let (sum, count) = node_ids
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .fold((0.0, 0usize), |(sum, count), node| (sum + node.height, count + 1));

        (count > 0).then(|| sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_height() {
        let mut index = NodeHeightIndex::new();
        index.insert(1, 10.0, 19.0, 72.8);
        index.insert(3, 20.0, 19.0, 72.8);
        index.insert(99, 500.0, 19.0, 72.8);

        assert_eq!(index.len(), 3);
        assert_eq!(index.average_height(&[1, 2, 3, 4]), Some(15.0));
    }

    #[test]
    fn test_average_height_without_tagged_nodes() {
        let mut index = NodeHeightIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.average_height(&[1, 2]), None);

        index.insert(5, 8.0, 0.0, 0.0);
        assert_eq!(index.average_height(&[]), None);
        assert_eq!(index.get(5).map(|n| n.height), Some(8.0));
    }
}
