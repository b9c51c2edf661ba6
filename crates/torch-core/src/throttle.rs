//! Resize coalescing for hosts that emit bursts of size notifications.

use crate::constants::RESIZE_THROTTLE_SEC;

/// Leading- and trailing-edge throttle over `(width, height)` notifications.
///
/// The first notification after a quiet period passes straight through;
/// later ones within `wait` seconds are held and only the most recent is
/// released once the window closes. Hosts call [`ResizeThrottle::poll`]
/// once per frame.
#[derive(Clone, Debug)]
pub struct ResizeThrottle {
    wait: f64,
    last_emit: Option<f64>,
    pending: Option<(u32, u32)>,
}

impl ResizeThrottle {
    pub fn new(wait: f64) -> Self {
        Self {
            wait: wait.max(0.0),
            last_emit: None,
            pending: None,
        }
    }

    pub fn wait(&self) -> f64 {
        self.wait
    }

    /// Report a new size at time `now`; returns a size to apply right away.
    pub fn notify(&mut self, size: (u32, u32), now: f64) -> Option<(u32, u32)> {
        match self.last_emit {
            Some(at) if now - at < self.wait => {
                self.pending = Some(size);
                None
            }
            _ => {
                self.pending = None;
                self.last_emit = Some(now);
                Some(size)
            }
        }
    }

    /// Release the held size once the window has elapsed.
    pub fn poll(&mut self, now: f64) -> Option<(u32, u32)> {
        let at = self.last_emit?;
        if now - at < self.wait {
            return None;
        }
        let size = self.pending.take()?;
        self.last_emit = Some(now);
        Some(size)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for ResizeThrottle {
    fn default() -> Self {
        Self::new(RESIZE_THROTTLE_SEC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_edge_passes() {
        let mut t = ResizeThrottle::new(0.2);
        assert_eq!(t.notify((10, 10), 0.0), Some((10, 10)));
        assert!(!t.has_pending());
    }

    #[test]
    fn burst_collapses_to_last() {
        let mut t = ResizeThrottle::new(0.2);
        t.notify((10, 10), 0.0);
        assert_eq!(t.notify((11, 10), 0.05), None);
        assert_eq!(t.notify((12, 10), 0.1), None);
        assert_eq!(t.poll(0.15), None);
        assert_eq!(t.poll(0.25), Some((12, 10)));
        assert_eq!(t.poll(0.5), None);
    }

    #[test]
    fn quiet_period_resets() {
        let mut t = ResizeThrottle::new(0.2);
        t.notify((10, 10), 0.0);
        assert_eq!(t.notify((20, 20), 1.0), Some((20, 20)));
    }
}
