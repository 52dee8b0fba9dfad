use std::time::Duration;

pub mod gpucompute;

/// Compute shader workgroup extent along each grid axis. Must match the
/// `@workgroup_size` declaration in `shader.wgsl`.
pub const WORKGROUP_SIZE: u32 = 8;

/// Startup constants for one simulation. Fixed once the GPU resources are
/// built; the grid is never resized or reseeded at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub width: u32,
    pub height: u32,
    pub tick_interval: Duration,
    pub seed: SeedPattern,
}

impl GridConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn cell_count(&self) -> u32 {
        self.width * self.height
    }

    /// Workgroup counts for one compute dispatch. Rounds up so every cell
    /// is covered when an axis is not a multiple of [`WORKGROUP_SIZE`];
    /// the kernel discards invocations past the grid edge.
    pub fn dispatch_extent(&self) -> (u32, u32) {
        (
            self.width.div_ceil(WORKGROUP_SIZE),
            self.height.div_ceil(WORKGROUP_SIZE),
        )
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            tick_interval: Duration::from_millis(400),
            seed: SeedPattern::EveryThird,
        }
    }
}

/// Deterministic starting patterns, as functions of the row-major cell index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedPattern {
    /// Every third cell alive.
    EveryThird,
    /// Alternating cells alive by index parity.
    Checkerboard,
}

impl SeedPattern {
    pub fn value(&self, index: u32) -> u32 {
        match self {
            SeedPattern::EveryThird => (index % 3 == 0) as u32,
            SeedPattern::Checkerboard => (index % 2 == 0) as u32,
        }
    }
}

/// Identifies one of the two cell-state buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateBuffer {
    A,
    B,
}

/// The (read, write) buffer orientation for one simulation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferRoles {
    pub read: StateBuffer,
    pub write: StateBuffer,
}

/// Which buffer a step reads and which it writes. Even steps read A and
/// write B; odd steps the reverse. This is the only place the ping-pong
/// orientation is decided; the bind groups are built from it and the
/// readback path consults it, so the two can never disagree.
pub fn buffer_roles(step: u64) -> BufferRoles {
    if step % 2 == 0 {
        BufferRoles {
            read: StateBuffer::A,
            write: StateBuffer::B,
        }
    } else {
        BufferRoles {
            read: StateBuffer::B,
            write: StateBuffer::A,
        }
    }
}

const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// CPU implementation of the compute kernel's rule: classic Life
/// (survive on 2-3 neighbors, birth on exactly 3) with toroidal wrap.
/// Serves as the oracle for the GPU path in tests.
pub fn advance_reference(cells: &[u32], width: u32, height: u32) -> Vec<u32> {
    assert_eq!(cells.len(), (width * height) as usize);
    let (w, h) = (width as i64, height as i64);
    let mut next = vec![0u32; cells.len()];
    for y in 0..h {
        for x in 0..w {
            let mut alive = 0u32;
            for (dr, dc) in NEIGHBOR_OFFSETS {
                let nx = (x + dc).rem_euclid(w);
                let ny = (y + dr).rem_euclid(h);
                alive += cells[(ny * w + nx) as usize];
            }
            let i = (y * w + x) as usize;
            next[i] = match alive {
                2 => cells[i],
                3 => 1,
                _ => 0,
            };
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_never_overlap() {
        for step in 0..100 {
            let r = buffer_roles(step);
            assert_ne!(r.read, r.write, "step {step} reads and writes the same buffer");
        }
    }

    #[test]
    fn roles_alternate_each_step() {
        for step in 0..100 {
            let cur = buffer_roles(step);
            let next = buffer_roles(step + 1);
            assert_eq!(next.read, cur.write, "step {} must read what step {step} wrote", step + 1);
            assert_eq!(next.write, cur.read);
        }
    }

    #[test]
    fn adjacent_parities_assign_each_role_to_different_buffers() {
        // select(step) and select(step + 1) never put the same physical
        // buffer in the same role.
        for step in 0..100 {
            assert_ne!(buffer_roles(step).read, buffer_roles(step + 1).read);
            assert_ne!(buffer_roles(step).write, buffer_roles(step + 1).write);
        }
    }

    #[test]
    fn dispatch_extent_covers_grid() {
        assert_eq!(GridConfig::new(32, 32).dispatch_extent(), (4, 4));
        assert_eq!(GridConfig::new(33, 20).dispatch_extent(), (5, 3));
        assert_eq!(GridConfig::new(1, 1).dispatch_extent(), (1, 1));
    }

    #[test]
    fn seed_patterns_are_deterministic() {
        let first: Vec<u32> = (0..64).map(|i| SeedPattern::EveryThird.value(i)).collect();
        let second: Vec<u32> = (0..64).map(|i| SeedPattern::EveryThird.value(i)).collect();
        assert_eq!(first, second);
        assert_eq!(SeedPattern::EveryThird.value(0), 1);
        assert_eq!(SeedPattern::EveryThird.value(1), 0);
        assert_eq!(SeedPattern::Checkerboard.value(4), 1);
        assert_eq!(SeedPattern::Checkerboard.value(5), 0);
    }
}
