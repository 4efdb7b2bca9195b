pub mod controller;
pub mod state;

pub use controller::{StoryController, StoryEvent, StorySnapshot};
pub use state::{SegmentPhase, SegmentState, ViewerStatus};
