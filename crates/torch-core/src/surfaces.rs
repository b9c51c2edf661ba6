//! Feedback surface bookkeeping: shared shape, view geometry and the
//! read/write roles of the two feedback surfaces.
//!
//! Backends own the actual pixel storage; this module only decides which
//! surface each pass targets and when storage must be reallocated.

use glam::Vec2;

/// Named handle of a render surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    FeedbackA,
    FeedbackB,
    /// The presentation target.
    Screen,
}

impl SurfaceId {
    /// The other surface of the feedback pair. `Screen` has no partner.
    pub fn partner(self) -> Option<Self> {
        match self {
            Self::FeedbackA => Some(Self::FeedbackB),
            Self::FeedbackB => Some(Self::FeedbackA),
            Self::Screen => None,
        }
    }
}

/// Pixel dimensions of the feedback pair, never smaller than 1x1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
}

impl Shape {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn texel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Pixel resolution as floats.
    pub fn view_res(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// "Contain" aspect: the resolution divided by its shorter side, so the
    /// shorter axis spans 1 and the longer one spans the aspect ratio.
    pub fn view_size(self) -> Vec2 {
        let res = self.view_res();
        res / res.min_element()
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Which feedback surface each pass writes this frame.
///
/// Form writes one surface while reading the surface Draw wrote last frame;
/// Draw then overwrites that same surface from Form's fresh output. Form's
/// input in frame N is therefore always Draw's output from frame N-1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeedbackRoles {
    last_draw: SurfaceId,
}

impl FeedbackRoles {
    pub fn new() -> Self {
        Self {
            last_draw: SurfaceId::FeedbackB,
        }
    }

    /// Surface Draw wrote in the previous frame (zeroed before frame 0).
    pub fn past(&self) -> SurfaceId {
        self.last_draw
    }

    pub fn form_target(&self) -> SurfaceId {
        self.last_draw.partner().unwrap_or(SurfaceId::FeedbackA)
    }

    pub fn draw_target(&self) -> SurfaceId {
        self.last_draw
    }

    /// Record this frame's Draw target; called once at the frame boundary.
    pub fn finish_frame(&mut self, drawn: SurfaceId) {
        debug_assert!(drawn != SurfaceId::Screen);
        self.last_draw = drawn;
    }
}

impl Default for FeedbackRoles {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the current surface shape and decides when storage is stale.
#[derive(Clone, Debug, Default)]
pub struct SurfaceManager {
    shape: Shape,
    roles: FeedbackRoles,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn roles(&self) -> &FeedbackRoles {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut FeedbackRoles {
        &mut self.roles
    }

    /// Adopt a new size. Returns the new shape only if it differs from the
    /// current one, i.e. only when surfaces need reallocating.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<Shape> {
        let next = Shape::new(width, height);
        if next == self.shape {
            return None;
        }
        self.shape = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_clamp_to_one() {
        assert_eq!(Shape::new(0, 0), Shape::new(1, 1));
        assert_eq!(Shape::new(0, 7).width, 1);
    }

    #[test]
    fn contain_aspect() {
        let s = Shape::new(800, 600).view_size();
        assert!((s.x - 800.0 / 600.0).abs() < 1e-6);
        assert!((s.y - 1.0).abs() < 1e-6);
        let s = Shape::new(300, 900).view_size();
        assert!((s.x - 1.0).abs() < 1e-6);
        assert!((s.y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn resize_reports_only_changes() {
        let mut m = SurfaceManager::new();
        assert_eq!(m.resize(1, 1), None);
        assert_eq!(m.resize(4, 3), Some(Shape::new(4, 3)));
        assert_eq!(m.resize(4, 3), None);
        assert_eq!(m.resize(0, 0), Some(Shape::new(1, 1)));
    }

    #[test]
    fn targets_are_distinct_every_frame() {
        let mut roles = FeedbackRoles::new();
        for _ in 0..4 {
            assert_ne!(roles.form_target(), roles.past());
            assert_eq!(roles.draw_target(), roles.past());
            let drawn = roles.draw_target();
            roles.finish_frame(drawn);
        }
    }
}
