//! The front page controller.
//!
//! A single task owns the [`RenderState`] and applies events one at a time:
//! commands from the host (resize, section changes, refresh) and results of
//! the fetches it spawned. Every state change publishes a new [`Frame`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::api::{load_batch, load_image, Article, ContentClient};
use crate::config::Config;
use crate::debounce::{Debouncer, Decision};
use crate::view::{compose, PageSettings};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// Everything a render is derived from.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub phase: Phase,
    pub loading: bool,
    pub stories: Vec<Article>,
    /// Resolved image URLs keyed by article id
    pub images: HashMap<u64, String>,
    pub viewport_width: f64,
    /// Selected section (API category id); `None` shows every section
    pub section: Option<u64>,
    /// Fetch generation; results tagged with an older one are dropped
    pub generation: u64,
}

impl RenderState {
    pub fn new(viewport_width: f64) -> Self {
        Self {
            phase: Phase::Idle,
            loading: false,
            stories: Vec::new(),
            images: HashMap::new(),
            viewport_width,
            section: None,
            generation: 0,
        }
    }
}

/// Requests from the host environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Resize { width: f64 },
    SelectSection { section: Option<u64> },
    Refresh,
}

#[derive(Debug)]
enum Event {
    Command(Command),
    FetchCompleted {
        generation: u64,
        stories: Vec<Article>,
    },
    ImageResolved {
        generation: u64,
        article_id: u64,
        url: Option<String>,
    },
}

/// Output of one render.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub html: String,
    pub phase: Phase,
    pub generation: u64,
    pub story_count: usize,
    pub images_resolved: usize,
    pub scale: f64,
    pub viewport_width: f64,
    pub section: Option<u64>,
    /// Increments on every render
    pub sequence: u64,
}

#[derive(Debug, Error)]
#[error("front page controller has stopped")]
pub struct AppStopped;

pub struct App {
    state: RenderState,
    settings: PageSettings,
    client: ContentClient,
    debouncer: Debouncer,
    events_tx: mpsc::Sender<Event>,
    frames: watch::Sender<Arc<Frame>>,
    rng: StdRng,
    sequence: u64,
}

impl App {
    /// Start the controller and kick off the first fetch.
    ///
    /// The returned handle owns the controller task; it must be called from
    /// within a tokio runtime.
    pub fn start(config: &Config, client: ContentClient) -> AppHandle {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (frames, frames_rx) = watch::channel(Arc::new(Frame::default()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let mut app = App {
            state: RenderState::new(config.initial_viewport_width),
            settings: PageSettings::from_config(config),
            client,
            debouncer: Debouncer::new(Duration::from_millis(config.resize_debounce_ms)),
            events_tx: events_tx.clone(),
            frames,
            rng: StdRng::from_entropy(),
            sequence: 0,
        };
        app.begin_fetch();

        let task = tokio::spawn(app.run(events_rx, shutdown_rx));

        AppHandle {
            remote: AppRemote {
                events: events_tx,
                frames: frames_rx,
            },
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
                _ = sleep_until_deadline(deadline) => {
                    if self.debouncer.fire_due(Instant::now()) {
                        self.render();
                    }
                }
            }
        }
        info!("Front page controller stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Command(Command::Resize { width }) => self.on_resize(width),
            Event::Command(Command::SelectSection { section }) => self.on_select_section(section),
            Event::Command(Command::Refresh) => self.begin_fetch(),
            Event::FetchCompleted {
                generation,
                stories,
            } => self.on_fetch_completed(generation, stories),
            Event::ImageResolved {
                generation,
                article_id,
                url,
            } => self.on_image_resolved(generation, article_id, url),
        }
    }

    /// Enter `Loading` under a fresh generation and spawn the fetch.
    fn begin_fetch(&mut self) {
        self.state.generation += 1;
        self.state.loading = true;
        self.state.phase = Phase::Loading;
        self.render();

        let generation = self.state.generation;
        let section = self.state.section;
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        info!("Starting fetch cycle {} (section: {:?})", generation, section);

        tokio::spawn(async move {
            let stories = load_batch(&client, section).await;
            let _ = tx
                .send(Event::FetchCompleted {
                    generation,
                    stories,
                })
                .await;
        });
    }

    fn on_fetch_completed(&mut self, generation: u64, stories: Vec<Article>) {
        if generation != self.state.generation {
            debug!(
                "Discarding stale fetch result (generation {}, current {})",
                generation, self.state.generation
            );
            return;
        }

        self.state.stories = stories;
        self.state.images.clear();
        self.state.loading = false;
        self.state.phase = Phase::Ready;
        self.render();
        self.spawn_image_fetches();
    }

    fn spawn_image_fetches(&self) {
        let generation = self.state.generation;
        for article in &self.state.stories {
            let Some(media_id) = article.image else {
                continue;
            };
            let article_id = article.id;
            let client = self.client.clone();
            let tx = self.events_tx.clone();

            tokio::spawn(async move {
                let url = load_image(&client, media_id).await;
                let _ = tx
                    .send(Event::ImageResolved {
                        generation,
                        article_id,
                        url,
                    })
                    .await;
            });
        }
    }

    fn on_image_resolved(&mut self, generation: u64, article_id: u64, url: Option<String>) {
        if generation != self.state.generation {
            debug!("Discarding stale image for article {}", article_id);
            return;
        }
        if let Some(url) = url {
            self.state.images.insert(article_id, url);
            self.render();
        }
    }

    fn on_resize(&mut self, width: f64) {
        self.state.viewport_width = width;
        match self.debouncer.call(Instant::now()) {
            Decision::RunNow => self.render(),
            Decision::Scheduled(_) => {}
        }
    }

    fn on_select_section(&mut self, section: Option<u64>) {
        if let Some(id) = section {
            if !self.settings.sections.iter().any(|s| s.id == id) {
                warn!("Ignoring unknown section {}", id);
                return;
            }
        }
        self.state.section = section;
        self.begin_fetch();
    }

    fn render(&mut self) {
        let sequence = self.sequence + 1;
        let mut page = compose(&self.state, &self.settings, Utc::now(), &mut self.rng);
        page.sequence = sequence;
        let scale = page.scale;

        match page.render() {
            Ok(html) => {
                self.sequence = sequence;
                let frame = Frame {
                    html,
                    phase: self.state.phase,
                    generation: self.state.generation,
                    story_count: self.state.stories.len(),
                    images_resolved: self.state.images.len(),
                    scale,
                    viewport_width: self.state.viewport_width,
                    section: self.state.section,
                    sequence,
                };
                self.frames.send_replace(Arc::new(frame));
            }
            Err(e) => error!("Failed to render front page: {}", e),
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cloneable access to a running controller.
#[derive(Clone)]
pub struct AppRemote {
    events: mpsc::Sender<Event>,
    frames: watch::Receiver<Arc<Frame>>,
}

impl AppRemote {
    pub async fn send(&self, command: Command) -> Result<(), AppStopped> {
        self.events
            .send(Event::Command(command))
            .await
            .map_err(|_| AppStopped)
    }

    pub fn current_frame(&self) -> Arc<Frame> {
        self.frames.borrow().clone()
    }

    pub fn frames(&self) -> watch::Receiver<Arc<Frame>> {
        self.frames.clone()
    }

    /// Wait until a published frame satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<Arc<Frame>, AppStopped>
    where
        F: FnMut(&Frame) -> bool,
    {
        let mut frames = self.frames.clone();
        let frame = frames
            .wait_for(|frame| predicate(frame))
            .await
            .map_err(|_| AppStopped)?;
        Ok(frame.clone())
    }
}

/// Lifecycle handle returned by [`App::start`].
pub struct AppHandle {
    remote: AppRemote,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AppHandle {
    pub fn remote(&self) -> AppRemote {
        self.remote.clone()
    }

    pub async fn send(&self, command: Command) -> Result<(), AppStopped> {
        self.remote.send(command).await
    }

    pub fn current_frame(&self) -> Arc<Frame> {
        self.remote.current_frame()
    }

    /// Stop the controller and wait for its task to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            error!("Front page controller task failed: {}", e);
        }
    }
}
