pub mod surface;

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::fit::{ProfileCache, ProfileKind};
use crate::frame;
use crate::layout::LayoutOptions;
use crate::tiles::{RawRecord, TimeframeChain};

pub use self::surface::{RenderSurface, SurfaceBox, SurfaceEvent, SurfaceId};

/// Stability gate configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Consecutive reads of the same size needed before drawing
    pub settle_frames: u32,
    /// Size changes tolerated before a draw is forced
    pub max_retries: u32,
    /// Per-axis change (px) that counts as a resize
    pub size_tolerance_px: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            settle_frames: 2,
            max_retries: 12,
            size_tolerance_px: 0.5,
        }
    }
}

/// Stability phase of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    /// Size changed on the latest read
    Sizing,
    /// Size held for `settle_frames` reads; last draw is current
    Settled,
}

/// Everything the scheduler remembers about one surface.
#[derive(Debug)]
pub struct SurfaceState {
    surface: Weak<dyn RenderSurface>,
    pub records: Vec<RawRecord>,
    pub timeframe: TimeframeChain,
    pub options: LayoutOptions,
    /// Box seen on the latest read (`None` before the first tick)
    pub last_seen: Option<SurfaceBox>,
    pub settle_count: u32,
    pub retry_count: u32,
    pub profiles: ProfileCache,
    pub pending_draw: bool,
    pub listeners_installed: bool,
    pub phase: SurfacePhase,
}

impl SurfaceState {
    fn new(surface: Weak<dyn RenderSurface>) -> Self {
        Self {
            surface,
            records: Vec::new(),
            timeframe: TimeframeChain::default(),
            options: LayoutOptions::default(),
            last_seen: None,
            settle_count: 0,
            retry_count: 0,
            profiles: ProfileCache::default(),
            pending_draw: false,
            listeners_installed: false,
            phase: SurfacePhase::Sizing,
        }
    }

    /// Whether the surface is still alive.
    pub fn is_attached(&self) -> bool {
        self.surface.strong_count() > 0
    }
}

/// What one animation tick did for one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Layout computed and presented
    Drawn {
        id: SurfaceId,
        tiles: usize,
        /// Drawn because the retry cap was hit, not because size settled
        forced: bool,
    },
    /// Nothing to show (no records or zero-size surface); output cleared
    Cleared { id: SurfaceId },
    /// Size changed; rescheduled
    Resizing { id: SurfaceId, retry: u32 },
    /// Size unchanged but not yet stable long enough; rescheduled
    Settling { id: SurfaceId, settle: u32 },
    /// Surface was dropped; its state is gone
    Dropped { id: SurfaceId },
}

/// Per-surface draw scheduler.
///
/// Draw requests are single-flight per surface: any number of requests
/// between two ticks result in one pending draw. On each tick the surface is
/// measured and the draw only runs once its size has held steady.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    config: SchedulerConfig,
    surfaces: HashMap<SurfaceId, SurfaceState>,
}

impl RenderScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            surfaces: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Store the latest inputs for `surface` and request a draw.
    ///
    /// The first call for a surface creates its state and installs its
    /// listeners; later calls only replace the inputs.
    pub fn render<S: RenderSurface + 'static>(
        &mut self,
        surface: &Rc<S>,
        records: Vec<RawRecord>,
        timeframe: TimeframeChain,
        options: LayoutOptions,
    ) {
        self.prune();

        let id = surface.id();
        let weak: Weak<S> = Rc::downgrade(surface);
        let weak: Weak<dyn RenderSurface> = weak;
        let state = self.surfaces.entry(id).or_insert_with(|| {
            tracing::debug!("Attaching surface {:?}", id);
            SurfaceState::new(weak.clone())
        });
        if !Weak::ptr_eq(&state.surface, &weak) {
            tracing::debug!("Surface id {:?} reused by a new surface, resetting state", id);
            *state = SurfaceState::new(weak);
        }

        state.records = records;
        state.timeframe = timeframe;
        state.options = options;

        if !state.listeners_installed {
            surface.install_listeners();
            state.listeners_installed = true;
        }

        self.request_draw(id);
    }

    /// Mark `id` as needing a draw. Returns true when this call scheduled a
    /// new animation frame, false when one was already pending (or the
    /// surface is unknown).
    pub fn request_draw(&mut self, id: SurfaceId) -> bool {
        let Some(state) = self.surfaces.get_mut(&id) else {
            return false;
        };
        if state.pending_draw {
            return false;
        }
        match state.surface.upgrade() {
            Some(surface) => {
                state.pending_draw = true;
                surface.request_animation_frame();
                true
            }
            None => {
                self.surfaces.remove(&id);
                false
            }
        }
    }

    /// Entry point for the listeners installed on a surface.
    pub fn notify(&mut self, id: SurfaceId, event: SurfaceEvent) -> bool {
        tracing::trace!("Surface {:?} event {:?}", id, event);
        self.request_draw(id)
    }

    /// Process one animation tick for every surface with a pending draw.
    /// Surfaces dropped since the last tick are discarded first and reported
    /// as [`FrameOutcome::Dropped`].
    pub fn on_animation_frame(&mut self) -> Vec<FrameOutcome> {
        let mut outcomes: Vec<FrameOutcome> = self
            .drain_dropped()
            .into_iter()
            .map(|id| FrameOutcome::Dropped { id })
            .collect();

        let mut due: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|(_, state)| state.pending_draw)
            .map(|(id, _)| *id)
            .collect();
        due.sort();

        outcomes.extend(due.into_iter().filter_map(|id| self.tick(id)));
        outcomes
    }

    fn tick(&mut self, id: SurfaceId) -> Option<FrameOutcome> {
        let config = self.config;
        let state = self.surfaces.get_mut(&id)?;
        state.pending_draw = false;

        let Some(surface) = state.surface.upgrade() else {
            tracing::debug!("Surface {:?} dropped, discarding its state", id);
            self.surfaces.remove(&id);
            return Some(FrameOutcome::Dropped { id });
        };

        let current = surface.measure();
        let changed = state
            .last_seen
            .map_or(true, |prev| prev.differs(&current, config.size_tolerance_px));

        let mut forced = false;
        if changed {
            // This read is the first observation of the new size
            state.last_seen = Some(current);
            state.phase = SurfacePhase::Sizing;
            state.settle_count = 1;
            state.retry_count += 1;
            if state.retry_count > config.max_retries {
                tracing::info!(
                    "Surface {:?} still resizing after {} reads, forcing a draw",
                    id,
                    state.retry_count
                );
                forced = true;
            }
        } else {
            state.settle_count = state.settle_count.saturating_add(1);
        }

        if !forced && state.settle_count < config.settle_frames.max(1) {
            state.pending_draw = true;
            surface.request_animation_frame();
            return Some(if changed {
                tracing::debug!(
                    "Surface {:?} resized to {}x{} (retry {})",
                    id,
                    current.width,
                    current.height,
                    state.retry_count
                );
                FrameOutcome::Resizing {
                    id,
                    retry: state.retry_count,
                }
            } else {
                FrameOutcome::Settling {
                    id,
                    settle: state.settle_count,
                }
            });
        }

        state.phase = SurfacePhase::Settled;
        state.retry_count = 0;

        let profile = state
            .profiles
            .resolve(state.options.profile, surface.content_sizer());
        let frame = frame::build_frame(
            &state.records,
            &state.timeframe,
            current.width,
            current.height,
            &state.options,
            &profile,
        );

        if frame.is_empty() {
            tracing::debug!("Surface {:?} has nothing to draw, clearing", id);
            surface.clear();
            return Some(FrameOutcome::Cleared { id });
        }

        tracing::debug!(
            "Drawing {} tiles on surface {:?} ({}x{})",
            frame.len(),
            id,
            current.width,
            current.height
        );
        surface.present(&frame);
        Some(FrameOutcome::Drawn {
            id,
            tiles: frame.len(),
            forced,
        })
    }

    /// Forget a surface. Returns whether it was known.
    pub fn detach(&mut self, id: SurfaceId) -> bool {
        self.surfaces.remove(&id).is_some()
    }

    /// Drop the state of every surface that no longer exists.
    pub fn prune(&mut self) -> usize {
        self.drain_dropped().len()
    }

    fn drain_dropped(&mut self) -> Vec<SurfaceId> {
        let mut dropped: Vec<SurfaceId> = self
            .surfaces
            .iter()
            .filter(|(_, state)| !state.is_attached())
            .map(|(id, _)| *id)
            .collect();
        dropped.sort();
        for id in &dropped {
            tracing::debug!("Surface {:?} dropped, discarding its state", id);
            self.surfaces.remove(id);
        }
        dropped
    }

    /// Forget the cached baseline for `kind` and redraw so it is measured again.
    pub fn invalidate_profile(&mut self, id: SurfaceId, kind: ProfileKind) -> bool {
        let Some(state) = self.surfaces.get_mut(&id) else {
            return false;
        };
        if state.profiles.invalidate(kind) {
            self.request_draw(id);
            true
        } else {
            false
        }
    }

    pub fn state(&self, id: SurfaceId) -> Option<&SurfaceState> {
        self.surfaces.get(&id)
    }

    pub fn phase(&self, id: SurfaceId) -> Option<SurfacePhase> {
        self.surfaces.get(&id).map(|state| state.phase)
    }

    pub fn is_pending(&self, id: SurfaceId) -> bool {
        self.surfaces.get(&id).is_some_and(|state| state.pending_draw)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::fit::{ContentBox, ContentSizer};
    use crate::frame::FrameTile;

    struct CountingSizer {
        calls: Cell<u32>,
    }

    impl ContentSizer for CountingSizer {
        fn measure(&self, _kind: ProfileKind) -> Option<ContentBox> {
            self.calls.set(self.calls.get() + 1);
            Some(ContentBox {
                width: 60.0,
                height: 40.0,
            })
        }
    }

    struct FakeSurface {
        id: SurfaceId,
        sizes: RefCell<VecDeque<SurfaceBox>>,
        current: Cell<SurfaceBox>,
        listeners: Cell<u32>,
        frame_requests: Cell<u32>,
        presented: RefCell<Vec<Vec<String>>>,
        clears: Cell<u32>,
        sizer: CountingSizer,
    }

    impl FakeSurface {
        fn new(id: u64, sizes: &[(f64, f64)]) -> Rc<Self> {
            Rc::new(Self {
                id: SurfaceId(id),
                sizes: RefCell::new(sizes.iter().map(|&(w, h)| SurfaceBox::new(w, h)).collect()),
                current: Cell::new(SurfaceBox::default()),
                listeners: Cell::new(0),
                frame_requests: Cell::new(0),
                presented: RefCell::new(Vec::new()),
                clears: Cell::new(0),
                sizer: CountingSizer { calls: Cell::new(0) },
            })
        }

        fn draws(&self) -> usize {
            self.presented.borrow().len()
        }
    }

    impl RenderSurface for FakeSurface {
        fn id(&self) -> SurfaceId {
            self.id
        }

        fn measure(&self) -> SurfaceBox {
            // Scripted sizes, then the last one forever
            if let Some(next) = self.sizes.borrow_mut().pop_front() {
                self.current.set(next);
            }
            self.current.get()
        }

        fn install_listeners(&self) {
            self.listeners.set(self.listeners.get() + 1);
        }

        fn request_animation_frame(&self) {
            self.frame_requests.set(self.frame_requests.get() + 1);
        }

        fn content_sizer(&self) -> Option<&dyn ContentSizer> {
            Some(&self.sizer)
        }

        fn present(&self, frame: &[FrameTile]) {
            let symbols = frame.iter().map(|t| t.tile.symbol.to_string()).collect();
            self.presented.borrow_mut().push(symbols);
        }

        fn clear(&self) {
            self.clears.set(self.clears.get() + 1);
        }
    }

    fn records(symbols: &[&str]) -> Vec<RawRecord> {
        symbols
            .iter()
            .enumerate()
            .map(|(i, s)| RawRecord::new(s).with_weight((symbols.len() - i) as f64))
            .collect()
    }

    fn render(scheduler: &mut RenderScheduler, surface: &Rc<FakeSurface>, symbols: &[&str]) {
        scheduler.render(
            surface,
            records(symbols),
            TimeframeChain::standard("1D"),
            LayoutOptions::default(),
        );
    }

    #[test]
    fn draw_fires_on_second_stable_read() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(1, &[(100.0, 98.0), (140.0, 140.0), (140.0, 140.0)]);
        render(&mut scheduler, &surface, &["A", "B", "C"]);
        let id = surface.id;

        assert_eq!(
            scheduler.on_animation_frame(),
            vec![FrameOutcome::Resizing { id, retry: 1 }]
        );
        assert_eq!(
            scheduler.on_animation_frame(),
            vec![FrameOutcome::Resizing { id, retry: 2 }]
        );
        assert_eq!(surface.draws(), 0);
        assert_eq!(scheduler.phase(id), Some(SurfacePhase::Sizing));

        assert_eq!(
            scheduler.on_animation_frame(),
            vec![FrameOutcome::Drawn { id, tiles: 3, forced: false }]
        );
        assert_eq!(surface.draws(), 1);
        assert_eq!(scheduler.phase(id), Some(SurfacePhase::Settled));

        // Nothing pending afterwards
        assert!(scheduler.on_animation_frame().is_empty());
        assert_eq!(surface.draws(), 1);
    }

    #[test]
    fn requests_coalesce_into_one_frame() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(7, &[(200.0, 100.0)]);
        render(&mut scheduler, &surface, &["A"]);
        let id = surface.id;

        assert!(!scheduler.request_draw(id));
        assert!(!scheduler.notify(id, SurfaceEvent::Resize));
        assert!(!scheduler.notify(id, SurfaceEvent::OrientationChange));
        assert!(!scheduler.notify(id, SurfaceEvent::ViewportScroll));
        assert_eq!(surface.frame_requests.get(), 1);

        assert_eq!(scheduler.on_animation_frame().len(), 1);
        assert!(!scheduler.request_draw(SurfaceId(99)));
    }

    #[test]
    fn listeners_install_once() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(2, &[(200.0, 100.0)]);
        render(&mut scheduler, &surface, &["A"]);
        render(&mut scheduler, &surface, &["A", "B"]);
        render(&mut scheduler, &surface, &["B"]);
        assert_eq!(surface.listeners.get(), 1);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn latest_input_wins() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(3, &[(300.0, 200.0)]);
        render(&mut scheduler, &surface, &["OLD"]);
        render(&mut scheduler, &surface, &["NEW1", "NEW2"]);

        scheduler.on_animation_frame();
        scheduler.on_animation_frame();
        assert_eq!(
            surface.presented.borrow().last().cloned(),
            Some(vec!["NEW1".to_string(), "NEW2".to_string()])
        );
    }

    #[test]
    fn endless_resizing_forces_a_draw() {
        let sizes: Vec<(f64, f64)> = (0..20).map(|i| (100.0 + 10.0 * i as f64, 100.0)).collect();
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(4, &sizes);
        render(&mut scheduler, &surface, &["A", "B"]);
        let id = surface.id;

        for retry in 1..=12 {
            assert_eq!(
                scheduler.on_animation_frame(),
                vec![FrameOutcome::Resizing { id, retry }]
            );
        }
        assert_eq!(
            scheduler.on_animation_frame(),
            vec![FrameOutcome::Drawn { id, tiles: 2, forced: true }]
        );
        assert_eq!(scheduler.state(id).map(|s| s.retry_count), Some(0));
    }

    #[test]
    fn settled_surface_redraws_new_data_next_tick() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(5, &[(300.0, 200.0)]);
        render(&mut scheduler, &surface, &["A"]);
        scheduler.on_animation_frame();
        scheduler.on_animation_frame();
        assert_eq!(surface.draws(), 1);

        render(&mut scheduler, &surface, &["A", "B"]);
        let outcomes = scheduler.on_animation_frame();
        assert!(matches!(outcomes[..], [FrameOutcome::Drawn { tiles: 2, .. }]));
    }

    #[test]
    fn empty_inputs_and_zero_size_clear_output() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(6, &[(300.0, 200.0)]);
        render(&mut scheduler, &surface, &[]);
        scheduler.on_animation_frame();
        assert_eq!(
            scheduler.on_animation_frame(),
            vec![FrameOutcome::Cleared { id: surface.id }]
        );
        assert_eq!(surface.clears.get(), 1);

        let collapsed = FakeSurface::new(8, &[(0.0, 200.0)]);
        render(&mut scheduler, &collapsed, &["A"]);
        scheduler.on_animation_frame();
        scheduler.on_animation_frame();
        assert_eq!(collapsed.clears.get(), 1);
        assert_eq!(collapsed.draws(), 0);
    }

    #[test]
    fn dropped_surfaces_are_discarded() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(9, &[(300.0, 200.0)]);
        let id = surface.id;
        render(&mut scheduler, &surface, &["A"]);
        drop(surface);

        assert_eq!(scheduler.on_animation_frame(), vec![FrameOutcome::Dropped { id }]);
        assert!(scheduler.is_empty());

        let other = FakeSurface::new(10, &[(300.0, 200.0)]);
        render(&mut scheduler, &other, &["A"]);
        assert!(scheduler.detach(other.id));
        assert!(!scheduler.detach(other.id));

        let gone = FakeSurface::new(11, &[(300.0, 200.0)]);
        render(&mut scheduler, &gone, &["A"]);
        drop(gone);
        assert_eq!(scheduler.prune(), 1);
    }

    #[test]
    fn idle_dropped_surfaces_are_discarded_on_next_tick() {
        let mut scheduler = RenderScheduler::default();
        let idle = FakeSurface::new(13, &[(300.0, 200.0)]);
        let busy = FakeSurface::new(14, &[(300.0, 200.0)]);
        render(&mut scheduler, &idle, &["A"]);
        render(&mut scheduler, &busy, &["B"]);
        scheduler.on_animation_frame();
        scheduler.on_animation_frame();
        assert!(!scheduler.is_pending(idle.id));

        let idle_id = idle.id;
        drop(idle);
        assert!(scheduler.request_draw(busy.id));
        let outcomes = scheduler.on_animation_frame();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], FrameOutcome::Dropped { id: idle_id });
        assert!(matches!(outcomes[1], FrameOutcome::Drawn { tiles: 1, .. }));
        assert!(scheduler.state(idle_id).is_none());
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn profiles_are_measured_once_per_surface() {
        let mut scheduler = RenderScheduler::default();
        let surface = FakeSurface::new(12, &[(300.0, 200.0)]);
        let id = surface.id;
        render(&mut scheduler, &surface, &["A"]);
        scheduler.on_animation_frame();
        scheduler.on_animation_frame();
        render(&mut scheduler, &surface, &["A", "B"]);
        scheduler.on_animation_frame();
        assert_eq!(surface.draws(), 2);
        assert_eq!(surface.sizer.calls.get(), 1);

        assert!(scheduler.invalidate_profile(id, ProfileKind::LogoAndText));
        assert!(scheduler.is_pending(id));
        scheduler.on_animation_frame();
        assert_eq!(surface.sizer.calls.get(), 2);
        assert!(!scheduler.invalidate_profile(id, ProfileKind::TextOnly));
    }
}
