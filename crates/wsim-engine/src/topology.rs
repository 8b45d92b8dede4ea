//! Network topology handed to the simulation constructor.

use serde::{Deserialize, Serialize};
use wsim_common::RandomSource;
use wsim_radio::Position;

/// One node of a topology: where it sits and which device logic it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Identifier the device is registered under.
    pub node_type: String,
}

impl TopologyNode {
    pub fn new(x: f64, y: f64, node_type: impl Into<String>) -> Self {
        TopologyNode {
            x,
            y,
            z: 0.0,
            node_type: node_type.into(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Ordered node list plus the shared transmit range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    pub base_transmit_range: f64,
}

impl Topology {
    pub fn new(base_transmit_range: f64) -> Self {
        Topology {
            nodes: Vec::new(),
            base_transmit_range,
        }
    }

    pub fn with_node(mut self, x: f64, y: f64, node_type: impl Into<String>) -> Self {
        self.nodes.push(TopologyNode::new(x, y, node_type));
        self
    }

    pub fn push(&mut self, node: TopologyNode) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `count` nodes of one type placed uniformly in an `area` x `area` square.
    pub fn scattered(
        count: usize,
        area: f64,
        base_transmit_range: f64,
        node_type: &str,
        rng: &mut RandomSource,
    ) -> Self {
        let mut topology = Topology::new(base_transmit_range);
        for _ in 0..count {
            let x = rng.gen_range_f64(0.0..area);
            let y = rng.gen_range_f64(0.0..area);
            topology.push(TopologyNode::new(x, y, node_type));
        }
        topology
    }
}
