//! Quadtree spatial index over node positions.
//!
//! Rebuilt from scratch every tick. Each cell stores the aggregate mass and
//! center of mass of its subtree, accumulated on insertion, so that distant
//! clusters can stand in for their members (Barnes–Hut), and the largest
//! radius below it, so that collision queries can prune whole cells.
//!
//! Cells live in a flat arena; leaves hold the indices of their entries.
//! A leaf holds several entries only when they share one position or the
//! depth limit is reached.

use drift_core::geometry::{Bounds, Point};

/// Subdivision limit guarding against pathological near-coincident inputs.
const MAX_DEPTH: usize = 48;

/// One indexed item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub position: Point,
    /// Weight in the aggregate (the many-body charge).
    pub mass: f64,
    pub radius: f64,
}

impl Entry {
    pub fn new(position: Point, mass: f64, radius: f64) -> Self {
        Self {
            position,
            mass,
            radius,
        }
    }
}

/// A square cell of the tree.
#[derive(Debug, Clone)]
pub struct Cell {
    origin: Point,
    size: f64,
    children: Option<[usize; 4]>,
    entries: Vec<usize>,
    count: usize,
    mass: f64,
    abs_mass: f64,
    weighted: Point,
    position_sum: Point,
    max_radius: f64,
}

impl Cell {
    fn new(origin: Point, size: f64) -> Self {
        Self {
            origin,
            size,
            children: None,
            entries: Vec::new(),
            count: 0,
            mass: 0.0,
            abs_mass: 0.0,
            weighted: Point::ORIGIN,
            position_sum: Point::ORIGIN,
            max_radius: 0.0,
        }
    }

    fn accumulate(&mut self, entry: &Entry) {
        self.count += 1;
        self.mass += entry.mass;
        self.abs_mass += entry.mass.abs();
        self.weighted = self
            .weighted
            .add_point(entry.position.scale(entry.mass.abs()));
        self.position_sum = self.position_sum.add_point(entry.position);
        self.max_radius = self.max_radius.max(entry.radius);
    }

    fn quadrant(&self, point: Point) -> usize {
        let half = self.size / 2.0;
        let right = point.x() >= self.origin.x() + half;
        let bottom = point.y() >= self.origin.y() + half;
        usize::from(right) | (usize::from(bottom) << 1)
    }

    /// Side length of the cell.
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.origin,
            self.origin.add_point(Point::new(self.size, self.size)),
        )
    }

    /// Number of entries in the subtree.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of the entries' masses.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Center of mass, weighted by absolute mass; the plain centroid when all masses are zero.
    pub fn center_of_mass(&self) -> Point {
        if self.abs_mass > 0.0 {
            self.weighted.scale(1.0 / self.abs_mass)
        } else {
            self.position_sum.scale(1.0 / self.count.max(1) as f64)
        }
    }

    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Entry indices held directly by a leaf; empty for internal cells.
    pub fn entries(&self) -> &[usize] {
        &self.entries
    }
}

/// What [`QuadTree::visit`] does after a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// One term of a Barnes–Hut query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    /// A distant cell acting as a single pseudo-body.
    Aggregate { center: Point, mass: f64 },
    /// An individual entry, by index.
    Entry(usize),
}

/// Quadtree over a slice of [`Entry`] values.
#[derive(Debug, Clone, Default)]
pub struct QuadTree {
    cells: Vec<Cell>,
    entries: Vec<Entry>,
    depth: usize,
}

impl QuadTree {
    /// Builds the tree. Entries with non-finite positions are left out.
    pub fn build(entries: &[Entry]) -> Self {
        let mut tree = Self {
            cells: Vec::new(),
            entries: entries.to_vec(),
            depth: 0,
        };

        let bounds = Bounds::from_points(
            entries
                .iter()
                .map(|entry| entry.position)
                .filter(|p| p.is_finite()),
        );
        let Some(bounds) = bounds else {
            return tree;
        };

        // Square root cell, padded so the maximum corner falls strictly inside.
        let extent = bounds.width().max(bounds.height()).max(1.0);
        let size = extent * (1.0 + 1e-9) + f64::EPSILON;
        tree.cells.push(Cell::new(bounds.min(), size));

        for index in 0..entries.len() {
            if entries[index].position.is_finite() {
                tree.insert(index);
            }
        }
        tree
    }

    fn insert(&mut self, index: usize) {
        let entry = self.entries[index];
        let mut cell = 0;
        let mut depth = 0;

        loop {
            self.cells[cell].accumulate(&entry);

            if let Some(children) = self.cells[cell].children {
                cell = children[self.cells[cell].quadrant(entry.position)];
                depth += 1;
                continue;
            }

            let coincident = self.cells[cell]
                .entries
                .first()
                .is_none_or(|&first| self.entries[first].position == entry.position);
            if coincident || depth >= MAX_DEPTH {
                self.cells[cell].entries.push(index);
                self.depth = self.depth.max(depth);
                return;
            }

            let children = self.split(cell);
            cell = children[self.cells[cell].quadrant(entry.position)];
            depth += 1;
        }
    }

    /// Turns a leaf into an internal cell, moving its entries one level down.
    fn split(&mut self, cell: usize) -> [usize; 4] {
        let origin = self.cells[cell].origin;
        let half = self.cells[cell].size / 2.0;
        let first = self.cells.len();
        for quadrant in 0..4 {
            let offset = Point::new(
                if quadrant & 1 == 1 { half } else { 0.0 },
                if quadrant & 2 == 2 { half } else { 0.0 },
            );
            self.cells.push(Cell::new(origin.add_point(offset), half));
        }
        let children = [first, first + 1, first + 2, first + 3];

        let moved = std::mem::take(&mut self.cells[cell].entries);
        self.cells[cell].children = Some(children);
        for index in moved {
            let entry = self.entries[index];
            let child = children[self.cells[cell].quadrant(entry.position)];
            self.cells[child].accumulate(&entry);
            self.cells[child].entries.push(index);
        }
        children
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.cells.first().map_or(0, Cell::count)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn root(&self) -> Option<&Cell> {
        self.cells.first()
    }

    pub fn entry(&self, index: usize) -> &Entry {
        &self.entries[index]
    }

    /// Deepest level any entry was stored at.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Pre-order traversal; `f` decides whether to descend into each cell's children.
    pub fn visit(&self, mut f: impl FnMut(&Cell) -> Visit) {
        let mut stack = Vec::new();
        if !self.cells.is_empty() {
            stack.push(0);
        }
        while let Some(cell) = stack.pop() {
            let cell = &self.cells[cell];
            if cell.count == 0 {
                continue;
            }
            if f(cell) == Visit::Skip {
                continue;
            }
            if let Some(children) = cell.children {
                stack.extend(children.iter().rev());
            }
        }
    }

    /// Barnes–Hut query around `query`.
    ///
    /// An internal cell is reported as one [`Interaction::Aggregate`] once
    /// `size / distance < theta`, distance being measured to its center of
    /// mass; otherwise its children are examined. Leaves report their entries
    /// individually, including any entry located at `query` itself.
    pub fn approximate(&self, query: Point, theta: f64, mut f: impl FnMut(Interaction)) {
        let theta2 = theta * theta;
        self.visit(|cell| {
            if cell.is_leaf() {
                for &index in &cell.entries {
                    f(Interaction::Entry(index));
                }
                return Visit::Skip;
            }

            let center = cell.center_of_mass();
            let distance2 = center.sub_point(query).length_squared();
            if cell.size * cell.size < theta2 * distance2 {
                f(Interaction::Aggregate {
                    center,
                    mass: cell.mass,
                });
                Visit::Skip
            } else {
                Visit::Descend
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn entries(points: &[(f64, f64)]) -> Vec<Entry> {
        points
            .iter()
            .map(|&(x, y)| Entry::new(Point::new(x, y), 1.0, 1.0))
            .collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = QuadTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.root().is_none());

        let mut calls = 0;
        tree.visit(|_| {
            calls += 1;
            Visit::Descend
        });
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_root_aggregates() {
        let tree = QuadTree::build(&entries(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)]));
        let root = tree.root().unwrap();

        assert_eq!(root.count(), 4);
        assert_approx_eq!(f64, root.mass(), 4.0);
        let com = root.center_of_mass();
        assert_approx_eq!(f64, com.x(), 5.0);
        assert_approx_eq!(f64, com.y(), 5.0);
        assert!(!root.is_leaf());
    }

    #[test]
    fn test_every_entry_lands_in_exactly_one_leaf() {
        let points: Vec<(f64, f64)> = (0..50)
            .map(|i| ((i * 37 % 101) as f64, (i * 53 % 97) as f64))
            .collect();
        let tree = QuadTree::build(&entries(&points));

        let mut seen = vec![0usize; points.len()];
        tree.visit(|cell| {
            if cell.is_leaf() {
                for &index in cell.entries() {
                    seen[index] += 1;
                    assert!(cell.bounds().contains(tree.entry(index).position));
                }
            }
            Visit::Descend
        });
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn test_coincident_entries_share_a_leaf() {
        let tree = QuadTree::build(&entries(&[(3.0, 3.0), (3.0, 3.0), (3.0, 3.0), (9.0, 1.0)]));
        assert_eq!(tree.len(), 4);
        assert!(tree.depth() < MAX_DEPTH);

        let mut largest_leaf = 0;
        tree.visit(|cell| {
            if cell.is_leaf() {
                largest_leaf = largest_leaf.max(cell.entries().len());
            }
            Visit::Descend
        });
        assert_eq!(largest_leaf, 3);
    }

    #[test]
    fn test_weighted_center_of_mass() {
        let tree = QuadTree::build(&[
            Entry::new(Point::new(0.0, 0.0), -3.0, 1.0),
            Entry::new(Point::new(4.0, 0.0), -1.0, 5.0),
        ]);
        let root = tree.root().unwrap();

        assert_approx_eq!(f64, root.center_of_mass().x(), 1.0);
        assert_approx_eq!(f64, root.mass(), -4.0);
        assert_approx_eq!(f64, root.max_radius(), 5.0);
    }

    #[test]
    fn test_non_finite_entries_are_skipped() {
        let tree = QuadTree::build(&[
            Entry::new(Point::new(f64::NAN, 0.0), 1.0, 1.0),
            Entry::new(Point::new(1.0, 1.0), 1.0, 1.0),
        ]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_tiny_theta_reports_every_entry() {
        let points: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 3.0, (i % 4) as f64)).collect();
        let tree = QuadTree::build(&entries(&points));

        let mut reported = Vec::new();
        tree.approximate(Point::new(0.0, 0.0), 1e-6, |interaction| match interaction {
            Interaction::Entry(index) => reported.push(index),
            Interaction::Aggregate { .. } => panic!("no cell should be accepted"),
        });
        reported.sort_unstable();
        assert_eq!(reported, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_far_query_uses_single_aggregate() {
        let points: Vec<(f64, f64)> = (0..16).map(|i| ((i % 4) as f64, (i / 4) as f64)).collect();
        let tree = QuadTree::build(&entries(&points));

        let mut aggregates = Vec::new();
        tree.approximate(Point::new(1000.0, 1000.0), 0.9, |interaction| {
            if let Interaction::Aggregate { mass, .. } = interaction {
                aggregates.push(mass);
            } else {
                panic!("entries should not be visited individually");
            }
        });
        assert_eq!(aggregates.len(), 1);
        assert_approx_eq!(f64, aggregates[0], 16.0);
    }
}
