use anyhow::Result;
use log::info;
use storypager::{
    images::ImageLoader,
    models::StoryItem,
    timer::StoryEvent,
    StoryPager,
};
use tokio::time::{sleep, Duration};

// Scripted demo session: starts a five-story viewer, holds to pause, releases,
// taps around, then lets the remaining segments run out on their own.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    let items: Vec<StoryItem> = if paths.is_empty() {
        (0..5)
            .map(|index| StoryItem::new(format!("story-{index}.png")))
            .collect()
    } else {
        paths.into_iter().map(StoryItem::new).collect()
    };

    let pager = StoryPager::new(items, 2_000)?;

    // Render-layer stand-in: subscribe and log every discrete transition.
    let mut events = pager.controller().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StoryEvent::StateChanged { snapshot }) => {
                    info!(
                        "state: step {}/{} {:?}, progress {:.2}, {}ms remaining",
                        snapshot.step_index + 1,
                        snapshot.step_count,
                        snapshot.status,
                        snapshot.progress,
                        snapshot.remaining_ms
                    );
                }
                Ok(StoryEvent::StepChanged { step_index }) => {
                    info!("advanced to step {step_index}");
                }
                Ok(StoryEvent::Completed) => info!("story completed"),
                Ok(StoryEvent::SessionEnded { session }) => {
                    info!(
                        "session {} ended: {} after {} steps",
                        session.id,
                        session.outcome.as_str(),
                        session.steps_viewed
                    );
                    break;
                }
                Ok(StoryEvent::Tick { .. }) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });

    pager.start().await?;

    let first = pager.current_item().await;
    let loaded = ImageLoader::load(&first).await;
    info!(
        "first item tint: background {}, progress fill {}{}",
        loaded.palette.background.to_hex(),
        loaded.palette.progress_fill.to_hex(),
        if loaded.placeholder {
            " (placeholder)"
        } else {
            ""
        }
    );

    sleep(Duration::from_millis(700)).await;
    pager.press_start().await?;
    info!(
        "press-hold: {}ms remaining",
        pager.controller().snapshot().await.remaining_ms
    );
    sleep(Duration::from_millis(600)).await;
    pager.press_end().await?;

    sleep(Duration::from_millis(500)).await;
    pager.handle_tap(0.9).await?;
    pager.handle_tap(0.1).await?;

    printer.await?;
    Ok(())
}
