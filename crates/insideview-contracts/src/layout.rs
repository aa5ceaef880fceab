use std::f64::consts::PI;

/// Position of a part node in the exploded 3D view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Places part `index` of `total` on a rising spiral cone around the core.
pub fn spiral_layout(index: usize, total: usize) -> NodePosition {
    let t = index as f64 / total.max(1) as f64;
    let angle = t * PI * 4.0;
    let radius = 2.5 + t * 3.0;
    let height = t * 6.0 - 3.0;
    NodePosition {
        x: angle.cos() * radius,
        y: height,
        z: angle.sin() * radius,
    }
}

pub fn layout_all(total: usize) -> Vec<NodePosition> {
    (0..total).map(|index| spiral_layout(index, total)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_node_sits_on_inner_ring_at_bottom() {
        let first = spiral_layout(0, 10);
        assert!(close(first.x, 2.5));
        assert!(close(first.y, -3.0));
        assert!(close(first.z, 0.0));
    }

    #[test]
    fn halfway_node_has_completed_one_turn() {
        let mid = spiral_layout(5, 10);
        assert!(close(mid.x, 4.0));
        assert!(close(mid.y, 0.0));
        assert!(mid.z.abs() < 1e-9);
    }

    #[test]
    fn nodes_climb_monotonically() {
        let nodes = layout_all(12);
        assert_eq!(nodes.len(), 12);
        for pair in nodes.windows(2) {
            assert!(pair[1].y > pair[0].y);
        }
    }

    #[test]
    fn zero_total_does_not_divide_by_zero() {
        let node = spiral_layout(0, 0);
        assert!(node.x.is_finite() && node.y.is_finite() && node.z.is_finite());
    }
}
