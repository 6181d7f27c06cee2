mod audio;
mod cli;
mod render;
mod worker;

use std::time::{Duration, Instant};

use clap::Parser;
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use warp_core::constants::ANALYSIS_INTERVAL_MS;
use warp_core::{
    AnalyserConfig, AudioError, AudioPipeline, DeviceProfile, FrameChannel, NoHaptics, Scene,
    SceneClock,
};

use audio::{Player, RingTapHost, Track};
use cli::Args;
use render::GpuState;
use worker::AnalysisWorker;

/// Everything that must be stopped when the session ends.
struct Session {
    player: Player,
    worker: AnalysisWorker<RingTapHost>,
    scene: Scene,
    clock: SceneClock,
    closed: bool,
}

impl Session {
    /// The "begin" gesture: start playback and analysis. Repeats are harmless.
    fn begin(&mut self) {
        if self.closed {
            return;
        }
        if !self.player.is_playing() {
            if let Err(e) = self.player.start() {
                log::warn!("[audio] playback failed: {e}");
            }
        }
        match self.worker.begin() {
            Ok(()) | Err(AudioError::DuplicateInit) => {}
            Err(e) => log::debug!("[audio] begin refused ({:?}): {e}", self.worker.state()),
        }
    }

    fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.worker.shutdown();
        self.player.stop();
        self.scene.teardown();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let profile = DeviceProfile::select(args.constrained);
    let track = Track::load(args.track.as_deref(), args.seed)?;

    let channel = FrameChannel::new();
    let player = Player::new(track);
    let pipeline = AudioPipeline::new(player.tap_host(), channel.clone(), AnalyserConfig::default())?;
    let worker = AnalysisWorker::spawn(pipeline, Duration::from_millis(ANALYSIS_INTERVAL_MS))?;
    let scene = Scene::with_haptics(
        profile.clone(),
        channel,
        args.seed,
        Some(Box::new(NoHaptics)),
    );
    let mut session = Session {
        player,
        worker,
        scene,
        clock: SceneClock::new(),
        closed: false,
    };

    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("warpfield")
        .with_inner_size(winit::dpi::PhysicalSize::new(args.width, args.height))
        .build(&event_loop)?;

    let mut state = pollster::block_on(GpuState::new(&window, &profile))?;
    let mut last_frame = Instant::now();
    log::info!("[app] press Space or click to start the audio");

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            event: WindowEvent::Resized(size),
            ..
        } => state.resize(size),
        Event::WindowEvent {
            event: WindowEvent::CloseRequested,
            ..
        } => {
            session.teardown();
            elwt.exit();
        }
        Event::WindowEvent {
            event:
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            logical_key,
                            state: ElementState::Pressed,
                            repeat: false,
                            ..
                        },
                    ..
                },
            ..
        } => match logical_key {
            Key::Named(NamedKey::Space) => session.begin(),
            Key::Named(NamedKey::Escape) => {
                session.teardown();
                elwt.exit();
            }
            _ => {}
        },
        Event::WindowEvent {
            event:
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    ..
                },
            ..
        } => session.begin(),
        Event::AboutToWait => {
            let now = Instant::now();
            let dt = (now - last_frame).as_secs_f32();
            last_frame = now;
            let Some(frame) = session.scene.render_tick(session.clock.now()) else {
                return;
            };
            match state.render(&frame, dt) {
                Ok(_) => state.window().request_redraw(),
                Err(wgpu::SurfaceError::Lost) => state.resize(state.window().inner_size()),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    session.teardown();
                    elwt.exit();
                }
                Err(e) => log::debug!("[render] skipped frame: {e}"),
            }
        }
        _ => {}
    })?;
    Ok(())
}
