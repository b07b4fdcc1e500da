use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Puts the local terminal into raw mode for its lifetime.
pub struct RawModeGuard(bool);

impl RawModeGuard {
    pub fn new(enable: bool) -> Self {
        if !enable {
            return Self(false);
        }
        match enable_raw_mode() {
            Ok(()) => Self(true),
            Err(err) => {
                tracing::warn!(target: "pier::terminal", error = %err, "failed to enable raw mode");
                Self(false)
            }
        }
    }

    pub fn is_raw(&self) -> bool {
        self.0
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.0 {
            let _ = disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_guard_is_inert() {
        let guard = RawModeGuard::new(false);
        assert!(!guard.is_raw());
    }
}
