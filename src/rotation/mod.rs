pub mod scheduler;
pub mod selector;

pub use scheduler::RotationScheduler;
pub use selector::{select_top, Candidate, RotationOutcome, RotationSelector, RotationStatus};

/// Why the scheduler is asked to rotate outside its timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationRequest {
    /// The pin store rebuilt the container; re-apply after the next frame
    PinOrderApplied,
}

/// Whether the page is currently shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}
