use crate::aabb::{calculate_aabb_for_object, Aabb};
use crate::geometry::{intersect_ray_with_object3d, Fp, Intersection, Object3D, Ray};

const MAX_LEAF_SIZE: usize = 4;

#[derive(Clone, Debug)]
pub struct Primitive {
    pub object3d: Object3D,
    pub aabb: Aabb,
}

impl From<Object3D> for Primitive {
    fn from(object3d: Object3D) -> Self {
        let aabb = calculate_aabb_for_object(&object3d);
        Primitive { object3d, aabb }
    }
}

#[derive(Debug)]
pub struct BvhNode {
    aabb: Aabb,
    left_child_index: usize,
    right_child_index: usize,
    content_start: usize,
    content_length: usize,
}

impl BvhNode {
    fn is_leaf(&self) -> bool {
        self.left_child_index == usize::MAX
    }
}

#[derive(Debug, Default)]
pub struct BvhTree {
    nodes: Vec<BvhNode>,
    primitives: Vec<Primitive>,
    root: usize,
}

pub fn create_bvh_tree(mut primitives: Vec<Primitive>) -> BvhTree {
    let mut nodes = vec![];
    if primitives.is_empty() {
        return BvhTree::default();
    }
    let length = primitives.len();
    let root = create_bvh_node(&mut nodes, &mut primitives, 0, length);
    BvhTree {
        nodes,
        primitives,
        root,
    }
}

// children are pushed before their parent, so the root is always the last node
fn create_bvh_node(
    result: &mut Vec<BvhNode>,
    primitives: &mut [Primitive],
    start: usize,
    length: usize,
) -> usize {
    let aabb = primitives[start..start + length]
        .iter()
        .fold(Aabb::default(), |acc, p| acc.extend_aabb(&p.aabb));
    let split = if length > MAX_LEAF_SIZE {
        try_split(&aabb, &mut primitives[start..start + length])
    } else {
        None
    };
    let (left_child_index, right_child_index) = match split {
        Some(first_part_len) => {
            let left = create_bvh_node(result, primitives, start, first_part_len);
            let right = create_bvh_node(
                result,
                primitives,
                start + first_part_len,
                length - first_part_len,
            );
            (left, right)
        }
        None => (usize::MAX, usize::MAX),
    };
    result.push(BvhNode {
        aabb,
        left_child_index,
        right_child_index,
        content_start: start,
        content_length: length,
    });
    result.len() - 1
}

fn partition_in_place(
    primitives: &mut [Primitive],
    predicate: impl Fn(&Primitive) -> bool,
) -> usize {
    let mut first = 0;
    for i in 0..primitives.len() {
        if predicate(&primitives[i]) {
            primitives.swap(first, i);
            first += 1;
        }
    }
    first
}

// returns the length of the first part, if the split was successful
fn try_split(aabb: &Aabb, primitives: &mut [Primitive]) -> Option<usize> {
    let diff = aabb.max - aabb.min;
    let axis = if diff.x >= diff.y && diff.x >= diff.z {
        0
    } else if diff.y >= diff.z {
        1
    } else {
        2
    };
    let middle = aabb.min[axis] + diff[axis] * 0.5;
    let first_part = partition_in_place(primitives, |p| p.aabb.center()[axis] <= middle);
    if 0usize < first_part && first_part < primitives.len() {
        Some(first_part)
    } else {
        // degenerate centroids: fall back to a median split by count
        primitives.sort_by(|a, b| a.aabb.center()[axis].total_cmp(&b.aabb.center()[axis]));
        Some(primitives.len() / 2)
    }
}

impl BvhTree {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    /// Closest hit with offset in `(0, upper_bound)`.
    pub fn closest_hit(&self, ray: &Ray, upper_bound: Fp) -> Option<Intersection> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best: Option<Intersection> = None;
        self.closest_hit_in_node(ray, self.root, upper_bound, &mut best);
        best
    }

    pub fn occluded(&self, ray: &Ray, max_distance: Fp) -> bool {
        self.closest_hit(ray, max_distance).is_some()
    }

    fn closest_hit_in_node(
        &self,
        ray: &Ray,
        node_index: usize,
        upper_bound: Fp,
        best: &mut Option<Intersection>,
    ) {
        let current_node = &self.nodes[node_index];
        let bound = best.as_ref().map_or(upper_bound, |hit| hit.offset);
        if current_node.aabb.hit(ray, bound).is_none() {
            return;
        }
        if current_node.is_leaf() {
            let start = current_node.content_start;
            let node_primitives = &self.primitives[start..start + current_node.content_length];
            for primitive in node_primitives {
                let bound = best.as_ref().map_or(upper_bound, |hit| hit.offset);
                if let Some(hit) = intersect_ray_with_object3d(ray, &primitive.object3d, bound) {
                    *best = Some(hit);
                }
            }
        } else {
            self.closest_hit_in_node(ray, current_node.left_child_index, upper_bound, best);
            self.closest_hit_in_node(ray, current_node.right_child_index, upper_bound, best);
        }
    }
}
