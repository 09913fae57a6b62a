use engine::Vec2;
use tracing::warn;

/// Grid dimensions the linear open-set scan is sized for.
const LINEAR_OPEN_SET_MAX_CELLS: (u32, u32) = (40, 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GridCell {
    pub(crate) x: u32,
    pub(crate) y: u32,
}

/// Waypoints consumed front to back. Never restarted once complete.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct NavigationPath {
    waypoints: Vec<Vec2>,
    next_waypoint_index: usize,
}

impl NavigationPath {
    pub(crate) fn new(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints,
            next_waypoint_index: 0,
        }
    }

    pub(crate) fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.next_waypoint_index).copied()
    }

    pub(crate) fn advance_waypoint(&mut self) {
        if self.next_waypoint_index < self.waypoints.len() {
            self.next_waypoint_index = self.next_waypoint_index.saturating_add(1);
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.next_waypoint_index >= self.waypoints.len()
    }

    pub(crate) fn remaining(&self) -> &[Vec2] {
        let start = self.next_waypoint_index.min(self.waypoints.len());
        &self.waypoints[start..]
    }

    pub(crate) fn final_waypoint(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PathfindingEngine {
    map_width: f32,
    map_height: f32,
    cell_size: f32,
    width: u32,
    height: u32,
}

impl PathfindingEngine {
    pub(crate) fn new(map_width: f32, map_height: f32, cell_size: f32) -> Self {
        let width = cells_along(map_width, cell_size);
        let height = cells_along(map_height, cell_size);
        if width > LINEAR_OPEN_SET_MAX_CELLS.0 || height > LINEAR_OPEN_SET_MAX_CELLS.1 {
            warn!(
                grid_width = width,
                grid_height = height,
                max_width = LINEAR_OPEN_SET_MAX_CELLS.0,
                max_height = LINEAR_OPEN_SET_MAX_CELLS.1,
                "pathfinding_grid_exceeds_linear_open_set_size"
            );
        }
        Self {
            map_width,
            map_height,
            cell_size,
            width,
            height,
        }
    }

    pub(crate) fn grid_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn world_to_cell(&self, world: Vec2) -> Option<GridCell> {
        if self.width == 0 || self.height == 0 || !world.is_finite() {
            return None;
        }
        if world.x < 0.0 || world.y < 0.0 || world.x > self.map_width || world.y > self.map_height
        {
            return None;
        }
        // Points on the far edge fold into the last cell.
        let x = ((world.x / self.cell_size).floor() as u32).min(self.width - 1);
        let y = ((world.y / self.cell_size).floor() as u32).min(self.height - 1);
        Some(GridCell { x, y })
    }

    pub(crate) fn cell_center_world(&self, cell: GridCell) -> Vec2 {
        Vec2 {
            x: cell.x as f32 * self.cell_size + self.cell_size * 0.5,
            y: cell.y as f32 * self.cell_size + self.cell_size * 0.5,
        }
    }

    /// World-space route from `start` to `goal`: the centre of every cell on
    /// the A* route except the last, then `goal` itself. Empty when either
    /// endpoint is outside the grid or no route exists.
    pub(crate) fn find_path(&self, start: Vec2, goal: Vec2) -> Vec<Vec2> {
        let (Some(start_cell), Some(goal_cell)) =
            (self.world_to_cell(start), self.world_to_cell(goal))
        else {
            return Vec::new();
        };
        let Some(cells) = self.find_path_cells(start_cell, goal_cell) else {
            return Vec::new();
        };

        let mut waypoints: Vec<Vec2> = cells
            .iter()
            .take(cells.len().saturating_sub(1))
            .map(|cell| self.cell_center_world(*cell))
            .collect();
        waypoints.push(goal);
        waypoints
    }

    fn index_of(&self, cell: GridCell) -> Option<usize> {
        if cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        Some(cell.y as usize * self.width as usize + cell.x as usize)
    }

    pub(crate) fn find_path_cells(&self, start: GridCell, goal: GridCell) -> Option<Vec<GridCell>> {
        let start_index = self.index_of(start)?;
        let goal_index = self.index_of(goal)?;
        if start == goal {
            return Some(vec![start]);
        }

        let node_count = self.width as usize * self.height as usize;
        let mut closed = vec![false; node_count];
        let mut best_g = vec![u32::MAX; node_count];
        let mut parent = vec![None::<usize>; node_count];
        let mut open = Vec::new();
        let mut next_insertion = 0u64;

        open.push(OpenNode {
            cell: start,
            f_cost: manhattan_distance(start, goal),
            insertion_order: next_insertion,
        });
        next_insertion = next_insertion.saturating_add(1);
        best_g[start_index] = 0;

        while !open.is_empty() {
            let best_index = pick_best_open_node_index(&open);
            let current = open.swap_remove(best_index);
            let Some(current_index) = self.index_of(current.cell) else {
                continue;
            };
            if closed[current_index] {
                continue;
            }
            closed[current_index] = true;

            if current.cell == goal {
                return reconstruct_cell_path(&parent, self.width, start_index, goal_index);
            }

            let current_g = best_g[current_index];
            for neighbor in self.neighbors(current.cell).into_iter().flatten() {
                let Some(neighbor_index) = self.index_of(neighbor) else {
                    continue;
                };
                if closed[neighbor_index] {
                    continue;
                }

                let tentative_g = current_g.saturating_add(1);
                if tentative_g >= best_g[neighbor_index] {
                    continue;
                }

                best_g[neighbor_index] = tentative_g;
                parent[neighbor_index] = Some(current_index);
                let f_cost = tentative_g.saturating_add(manhattan_distance(neighbor, goal));
                if upsert_open_node(&mut open, neighbor, f_cost, next_insertion) {
                    next_insertion = next_insertion.saturating_add(1);
                }
            }
        }

        None
    }

    /// N, E, S, W, NE, SE, SW, NW with `y` growing southward.
    fn neighbors(&self, cell: GridCell) -> [Option<GridCell>; 8] {
        const DIRECTIONS: [(i32, i32); 8] = [
            (0, -1),
            (1, 0),
            (0, 1),
            (-1, 0),
            (1, -1),
            (1, 1),
            (-1, 1),
            (-1, -1),
        ];
        DIRECTIONS.map(|(dx, dy)| {
            let x = cell.x as i64 + dx as i64;
            let y = cell.y as i64 + dy as i64;
            if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
                None
            } else {
                Some(GridCell {
                    x: x as u32,
                    y: y as u32,
                })
            }
        })
    }
}

fn cells_along(extent: f32, cell_size: f32) -> u32 {
    if !(extent > 0.0) || !(cell_size > 0.0) {
        return 0;
    }
    (extent / cell_size).ceil() as u32
}

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: GridCell,
    f_cost: u32,
    insertion_order: u64,
}

/// Lowers the cost of a cell already in the open set without moving it in
/// discovery order. Returns `true` when a new node was pushed.
fn upsert_open_node(
    open: &mut Vec<OpenNode>,
    cell: GridCell,
    f_cost: u32,
    insertion_order: u64,
) -> bool {
    if let Some(existing) = open.iter_mut().find(|node| node.cell == cell) {
        existing.f_cost = existing.f_cost.min(f_cost);
        return false;
    }
    open.push(OpenNode {
        cell,
        f_cost,
        insertion_order,
    });
    true
}

// Lowest f wins; ties go to the node discovered first.
fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        let current = open[index];
        let best = open[best_index];
        if (current.f_cost, current.insertion_order) < (best.f_cost, best.insertion_order) {
            best_index = index;
        }
    }
    best_index
}

fn reconstruct_cell_path(
    parent: &[Option<usize>],
    width: u32,
    start_index: usize,
    goal_index: usize,
) -> Option<Vec<GridCell>> {
    let mut cursor = goal_index;
    let mut indices = vec![cursor];

    while cursor != start_index {
        let next = parent.get(cursor).and_then(|value| *value)?;
        cursor = next;
        indices.push(cursor);
    }
    indices.reverse();
    Some(
        indices
            .into_iter()
            .map(|index| GridCell {
                x: (index as u32) % width,
                y: (index as u32) / width,
            })
            .collect(),
    )
}

fn manhattan_distance(a: GridCell, b: GridCell) -> u32 {
    a.x.abs_diff(b.x).saturating_add(a.y.abs_diff(b.y))
}
