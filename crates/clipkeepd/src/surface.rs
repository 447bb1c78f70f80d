use clipkeep_core::ActivationSurface;
use tracing::info;

/// Stand-in used when no picker window is attached to the daemon. The list
/// is served over the control socket; show and hide are only logged so
/// front ends following the daemon can react to them.
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl ActivationSurface for HeadlessSurface {
    fn show_centered(&mut self) {
        info!(surface = "shown", "activation surface");
    }

    fn hide(&mut self) {
        info!(surface = "hidden", "activation surface");
    }
}
