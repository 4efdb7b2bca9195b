pub mod session;
pub mod story;

pub use session::{SessionOutcome, ViewerSession};
pub use story::StoryItem;
