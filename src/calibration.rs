use crate::sample::Extent;

/// Fraction of each axis where the 3x3 target grid sits
pub const GRID_STOPS: [f64; 3] = [0.1, 0.5, 0.9];
pub const TARGET_COUNT: usize = 9;
pub const DEFAULT_REQUIRED_CLICKS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTarget {
    pub id: usize,
    pub normalized_x: f64,
    pub normalized_y: f64,
    pub confirm_count: u32,
}

impl CalibrationTarget {
    pub fn is_satisfied(&self, required_clicks: u32) -> bool {
        self.confirm_count >= required_clicks
    }

    /// Target centre in the pixel space of `extent`
    pub fn screen_point(&self, extent: Extent) -> (f64, f64) {
        (
            self.normalized_x * extent.width as f64,
            self.normalized_y * extent.height as f64,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Counted,
    AlreadySatisfied,
    UnknownTarget,
}

/// Counts confirmed fixations per target and derives overall progress
#[derive(Debug, Clone)]
pub struct CalibrationTracker {
    targets: Vec<CalibrationTarget>,
    required_clicks: u32,
}

impl CalibrationTracker {
    pub fn new(required_clicks: u32) -> Self {
        let targets = GRID_STOPS
            .iter()
            .flat_map(|&y| GRID_STOPS.iter().map(move |&x| (x, y)))
            .enumerate()
            .map(|(id, (x, y))| CalibrationTarget {
                id,
                normalized_x: x,
                normalized_y: y,
                confirm_count: 0,
            })
            .collect();

        Self {
            targets,
            required_clicks: required_clicks.max(1),
        }
    }

    pub fn required_clicks(&self) -> u32 {
        self.required_clicks
    }

    pub fn targets(&self) -> &[CalibrationTarget] {
        &self.targets
    }

    pub fn target(&self, id: usize) -> Option<&CalibrationTarget> {
        self.targets.get(id)
    }

    pub fn reset(&mut self) {
        for t in &mut self.targets {
            t.confirm_count = 0;
        }
    }

    pub fn confirm(&mut self, target_id: usize) -> ConfirmOutcome {
        let required = self.required_clicks;
        match self.targets.get_mut(target_id) {
            None => ConfirmOutcome::UnknownTarget,
            Some(t) if t.is_satisfied(required) => ConfirmOutcome::AlreadySatisfied,
            Some(t) => {
                t.confirm_count += 1;
                ConfirmOutcome::Counted
            }
        }
    }

    pub fn total_confirms(&self) -> u32 {
        self.targets.iter().map(|t| t.confirm_count).sum()
    }

    /// Confirmations needed across all targets
    pub fn required_total(&self) -> u64 {
        self.targets.len() as u64 * self.required_clicks as u64
    }

    /// Global effort-based progress in [0, 1]
    pub fn progress(&self) -> f64 {
        let needed = self.required_total() as f64;
        if needed == 0.0 {
            return 0.0;
        }
        (self.total_confirms() as f64 / needed).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.targets
            .iter()
            .all(|t| t.is_satisfied(self.required_clicks))
    }

    /// Nearest target whose centre lies within `tolerance` pixels of the point
    pub fn target_at(&self, x: f64, y: f64, extent: Extent, tolerance: f64) -> Option<usize> {
        self.targets
            .iter()
            .map(|t| {
                let (tx, ty) = t.screen_point(extent);
                (t.id, ((tx - x).powi(2) + (ty - y).powi(2)).sqrt())
            })
            .filter(|&(_, d)| d <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

impl Default for CalibrationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED_CLICKS)
    }
}
