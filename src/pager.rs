use anyhow::{bail, Result};
use log::debug;

use crate::{
    config::StoryConfig,
    models::StoryItem,
    timer::{StoryController, StorySnapshot},
};

// Tap zones as fractions of the viewer width. Taps in the middle band are
// ignored so grazing touches do not navigate.
const PREVIOUS_TAP_ZONE: f32 = 0.25;
const NEXT_TAP_ZONE: f32 = 0.60;

/// Navigation shell around the timer engine: owns the story items, maps taps
/// and press-holds onto engine operations, and clamps navigation at both ends.
pub struct StoryPager {
    controller: StoryController,
    items: Vec<StoryItem>,
}

impl StoryPager {
    pub fn new(items: Vec<StoryItem>, step_duration_ms: u64) -> Result<Self> {
        if items.is_empty() {
            bail!("a story viewer needs at least one item");
        }
        let config = StoryConfig::new(items.len(), step_duration_ms)?;

        Ok(Self {
            controller: StoryController::new(config),
            items,
        })
    }

    pub fn controller(&self) -> &StoryController {
        &self.controller
    }

    pub fn items(&self) -> &[StoryItem] {
        &self.items
    }

    pub async fn start(&self) -> Result<StorySnapshot> {
        self.controller.start_session().await
    }

    pub async fn dismiss(&self) -> Result<StorySnapshot> {
        self.controller.end_session().await
    }

    /// The item behind the active segment; the image layer reloads whenever
    /// this changes.
    pub async fn current_item(&self) -> StoryItem {
        let snapshot = self.controller.snapshot().await;
        self.items[snapshot.step_index].clone()
    }

    /// Press-hold pauses the active segment while held.
    pub async fn press_start(&self) -> Result<StorySnapshot> {
        self.controller.pause().await
    }

    pub async fn press_end(&self) -> Result<StorySnapshot> {
        self.controller.resume().await
    }

    /// Clamped at the first step; a clamped no-move does not restart the
    /// active segment.
    pub async fn navigate_previous(&self) -> Result<StorySnapshot> {
        let snapshot = self.controller.snapshot().await;
        let target = snapshot.step_index.saturating_sub(1);
        if target == snapshot.step_index {
            return Ok(snapshot);
        }
        self.controller.jump_to(target).await
    }

    /// Clamped at the last step.
    pub async fn navigate_next(&self) -> Result<StorySnapshot> {
        let snapshot = self.controller.snapshot().await;
        let target = (snapshot.step_index + 1).min(self.items.len() - 1);
        if target == snapshot.step_index {
            return Ok(snapshot);
        }
        self.controller.jump_to(target).await
    }

    pub async fn handle_tap(&self, x_fraction: f32) -> Result<StorySnapshot> {
        if x_fraction < PREVIOUS_TAP_ZONE {
            debug!("tap at {x_fraction:.2}: previous");
            self.navigate_previous().await
        } else if x_fraction > NEXT_TAP_ZONE {
            debug!("tap at {x_fraction:.2}: next");
            self.navigate_next().await
        } else {
            Ok(self.controller.snapshot().await)
        }
    }
}
