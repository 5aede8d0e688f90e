//! Adjacency structure for hydraulic flow networks.
//!
//! Independent from the triangulation kernel: elements come from the
//! domain topology (pipes between zone nodes), not from the mesh. Each
//! element connects an inlet node to an outlet node; nodes keep the
//! element indices attached on either side so solvers can sum fluxes per
//! node without searching the element list.

/// A flow element, directed from its inlet node to its outlet node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowElement {
    pub inlet_node: usize,
    pub outlet_node: usize,
}

impl FlowElement {
    pub fn new(inlet_node: usize, outlet_node: usize) -> Self {
        Self {
            inlet_node,
            outlet_node,
        }
    }
}

/// A node with the indices of the elements connected on either side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkNode {
    /// elements discharging into this node (the node is their outlet)
    pub inlet_elements: Vec<usize>,
    /// elements fed from this node (the node is their inlet)
    pub outlet_elements: Vec<usize>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NetworkError {
    #[error("element {element} references node {node}, but only {node_count} nodes exist")]
    InvalidNode {
        element: usize,
        node: usize,
        node_count: usize,
    },

    #[error("node {node} and element {element} disagree about their connection")]
    Inconsistent { node: usize, element: usize },
}

/// The assembled network: the flat element list plus per-node adjacency.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: Vec<NetworkNode>,
    elements: Vec<FlowElement>,
}

impl Network {
    /// Build the node adjacency for `elements` over `node_count` nodes.
    pub fn new(node_count: usize, elements: Vec<FlowElement>) -> Result<Self, NetworkError> {
        let mut nodes = vec![NetworkNode::default(); node_count];
        for (index, element) in elements.iter().enumerate() {
            for node in [element.inlet_node, element.outlet_node] {
                if node >= node_count {
                    return Err(NetworkError::InvalidNode {
                        element: index,
                        node,
                        node_count,
                    });
                }
            }
            nodes[element.outlet_node].inlet_elements.push(index);
            nodes[element.inlet_node].outlet_elements.push(index);
        }
        Ok(Self { nodes, elements })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &NetworkNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn elements(&self) -> &[FlowElement] {
        &self.elements
    }

    /// Check the adjacency invariant: every element appears exactly once
    /// in the inlet list of its outlet node and exactly once in the
    /// outlet list of its inlet node, and node lists reference only
    /// elements that point back at them.
    pub fn verify(&self) -> Result<(), NetworkError> {
        for (index, element) in self.elements.iter().enumerate() {
            let outlet_side = &self.nodes[element.outlet_node];
            if outlet_side
                .inlet_elements
                .iter()
                .filter(|&&e| e == index)
                .count()
                != 1
            {
                return Err(NetworkError::Inconsistent {
                    node: element.outlet_node,
                    element: index,
                });
            }
            let inlet_side = &self.nodes[element.inlet_node];
            if inlet_side
                .outlet_elements
                .iter()
                .filter(|&&e| e == index)
                .count()
                != 1
            {
                return Err(NetworkError::Inconsistent {
                    node: element.inlet_node,
                    element: index,
                });
            }
        }
        for (node_index, node) in self.nodes.iter().enumerate() {
            for &e in &node.inlet_elements {
                if self.elements.get(e).map(|el| el.outlet_node) != Some(node_index) {
                    return Err(NetworkError::Inconsistent {
                        node: node_index,
                        element: e,
                    });
                }
            }
            for &e in &node.outlet_elements {
                if self.elements.get(e).map(|el| el.inlet_node) != Some(node_index) {
                    return Err(NetworkError::Inconsistent {
                        node: node_index,
                        element: e,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacency_built_from_elements() {
        // 0 --e0--> 1 --e1--> 2
        //           1 --e2--> 2
        let network = Network::new(
            3,
            vec![
                FlowElement::new(0, 1),
                FlowElement::new(1, 2),
                FlowElement::new(1, 2),
            ],
        )
        .unwrap();

        assert_eq!(network.node(0).outlet_elements, vec![0]);
        assert!(network.node(0).inlet_elements.is_empty());
        assert_eq!(network.node(1).inlet_elements, vec![0]);
        assert_eq!(network.node(1).outlet_elements, vec![1, 2]);
        assert_eq!(network.node(2).inlet_elements, vec![1, 2]);

        network.verify().unwrap();
    }

    #[test]
    fn test_closed_loop() {
        let network = Network::new(
            2,
            vec![FlowElement::new(0, 1), FlowElement::new(1, 0)],
        )
        .unwrap();
        network.verify().unwrap();
        assert_eq!(network.node(0).inlet_elements, vec![1]);
        assert_eq!(network.node(0).outlet_elements, vec![0]);
    }

    #[test]
    fn test_invalid_node_index() {
        let result = Network::new(2, vec![FlowElement::new(0, 5)]);
        assert_eq!(
            result.unwrap_err(),
            NetworkError::InvalidNode {
                element: 0,
                node: 5,
                node_count: 2
            }
        );
    }

    #[test]
    fn test_verify_detects_tampering() {
        let mut network = Network::new(2, vec![FlowElement::new(0, 1)]).unwrap();
        network.verify().unwrap();

        // break the invariant: element 0 now claims a different outlet
        network.elements[0].outlet_node = 0;
        assert!(matches!(
            network.verify(),
            Err(NetworkError::Inconsistent { .. })
        ));
    }
}
