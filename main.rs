//! main.rs - Desktop simulator for packscape fountains
//! Drives the engine from a synthetic count feed and draws an oblique view

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
    Pixel,
};
use embedded_graphics_simulator::{
    OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
};
use log::{error, info};

use packscape::rng::Rng;
use packscape::{Packscape, ReleaseSink, Settings, Snapshot, DORMANT_COLOR};

const SCREEN_WIDTH: u32 = 480;
const SCREEN_HEIGHT: u32 = 320;
const HORIZON_Y: f32 = 250.0;
const WORLD_SCALE: f32 = 0.2;
const FEED_PERIOD_MS: u64 = 1000;

// Maps activity onto a tone, standing in for an audio backend
#[derive(Default)]
struct ToneSink {
    tone_hz: f32,
    launches: u64,
}

impl ReleaseSink for ToneSink {
    fn released(&mut self, _label: &str, count: usize, rate: f32) {
        self.tone_hz = 220.0 * rate.clamp(0.25, 8.0);
        self.launches += count as u64;
    }
}

struct Layer {
    name: String,
    count: u64,
    per_second: f32,
    silent: bool,
}

// Synthetic replacement for the packet-count feed
struct DemoFeed {
    layers: Vec<Layer>,
    reserve: Vec<(&'static str, f32)>,
    burst: Option<usize>,
    rng: Rng,
}

impl DemoFeed {
    fn new(seed: u32) -> Self {
        let layers = [
            ("eth-ip-tcp", 120.0),
            ("eth-ip-udp", 40.0),
            ("eth-ip-tcp-http", 25.0),
            ("eth-arp", 2.0),
        ]
        .into_iter()
        .map(|(name, per_second)| Layer {
            name: name.to_string(),
            count: 1,
            per_second,
            silent: false,
        })
        .collect();

        Self {
            layers,
            reserve: vec![
                ("eth-ip-udp-dns", 15.0),
                ("eth-ip-icmp", 3.0),
                ("eth-ipv6-tcp-tls", 60.0),
                ("eth-ip-udp-ntp", 1.0),
            ],
            burst: None,
            rng: Rng::new(seed),
        }
    }

    fn advance(&mut self) {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            if layer.silent {
                continue;
            }
            let jitter = self.rng.random_range(0.5, 1.5);
            let boost = if self.burst == Some(index) { 20.0 } else { 1.0 };
            layer.count += (layer.per_second * jitter * boost) as u64;
        }
        self.burst = None;
    }

    fn counts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.layers.iter().map(|layer| (layer.name.as_str(), layer.count))
    }

    fn add_layer(&mut self) -> Option<&str> {
        let (name, per_second) = self.reserve.pop()?;
        self.layers.push(Layer {
            name: name.to_string(),
            count: 1,
            per_second,
            silent: false,
        });
        Some(name)
    }

    fn remove_layer(&mut self) -> Option<String> {
        let layer = self.layers.pop()?;
        Some(layer.name)
    }

    fn burst_random(&mut self) -> Option<&str> {
        if self.layers.is_empty() {
            return None;
        }
        let last = self.layers.len() - 1;
        let index = ((self.rng.random() * self.layers.len() as f32) as usize).min(last);
        self.burst = Some(index);
        Some(self.layers[index].name.as_str())
    }

    fn toggle_silence(&mut self) -> Option<(&str, bool)> {
        let layer = self.layers.first_mut()?;
        layer.silent = !layer.silent;
        Some((layer.name.as_str(), layer.silent))
    }
}

#[derive(Default)]
struct UiState {
    verbose: bool,
    info_message: String,
}

fn to_rgb565(color: [f32; 3]) -> Rgb565 {
    let [r, g, b] = color.map(|c| c.clamp(0.0, 1.0));
    Rgb565::new((r * 31.0) as u8, (g * 63.0) as u8, (b * 31.0) as u8)
}

// Oblique projection: x across, z into the screen, y up
fn project(base: [f32; 3], offset: [f32; 3]) -> Point {
    let x = base[0] + offset[0];
    let y = base[1] + offset[1];
    let z = base[2] + offset[2];
    Point::new(
        (SCREEN_WIDTH as f32 / 2.0 + x * WORLD_SCALE) as i32,
        (HORIZON_Y + z * WORLD_SCALE * 0.4 - y * WORLD_SCALE * 0.4) as i32,
    )
}

fn draw_fountain<D>(display: &mut D, fountain: &Snapshot<'_>, ui: &UiState) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let color = if fountain.is_active() {
        to_rgb565(fountain.color)
    } else {
        to_rgb565(DORMANT_COLOR)
    };

    // Spinning base, drawn as a cross rotated by the fountain's angle
    let center = project(fountain.position, [0.0, 5.0, 0.0]);
    let (sin, cos) = fountain.rotation.sin_cos();
    for (dx, dy) in [(cos, sin), (-sin, cos)] {
        let arm = Point::new((dx * 6.0) as i32, (dy * 3.0) as i32);
        Line::new(center - arm, center + arm)
            .into_styled(PrimitiveStyle::with_stroke(color, 1))
            .draw(display)?;
    }

    let label_style = MonoTextStyle::new(&FONT_6X10, color);
    let centered = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Top)
        .build();
    Text::with_text_style(fountain.label, center + Point::new(0, 6), label_style, centered)
        .draw(display)?;

    if ui.verbose {
        let rate = format!("{:.2}", fountain.rate);
        Text::with_text_style(&rate, center + Point::new(0, 16), label_style, centered)
            .draw(display)?;
    }

    if !fountain.is_active() {
        return Ok(());
    }

    // Hidden slots are skipped, pool order is irrelevant here
    for particle in fountain.visible_particles() {
        Pixel(project(fountain.position, particle.position), color).draw(display)?;
    }
    Ok(())
}

fn render_scene<D>(
    display: &mut D,
    scene: &Packscape<ToneSink>,
    ui: &UiState,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    // Theme colors
    let bg_color = Rgb565::BLACK;
    let ground_color = Rgb565::new(0, 10, 15);
    let text_color = Rgb565::new(0, 31, 63);

    display.clear(bg_color)?;

    // Ground line through the layout circle
    let radius = scene.settings().circle_radius;
    Line::new(
        project([-radius * 1.2, 0.0, 0.0], [0.0; 3]),
        project([radius * 1.2, 0.0, 0.0], [0.0; 3]),
    )
    .into_styled(PrimitiveStyle::with_stroke(ground_color, 1))
    .draw(display)?;

    for fountain in scene.snapshots() {
        draw_fountain(display, &fountain, ui)?;
    }

    // HUD
    let style = MonoTextStyle::new(&FONT_6X10, text_color);
    let active = scene.snapshots().filter(|s| s.is_active()).count();
    let status = format!(
        "Fountains: {} ({} live)  Tone: {:.0}Hz",
        scene.len(),
        active,
        scene.sink().tone_hz
    );
    Text::with_baseline(&status, Point::new(5, 5), style, Baseline::Top).draw(display)?;

    if ui.verbose {
        let launches = format!("Droplets launched: {}", scene.sink().launches);
        Text::with_baseline(&launches, Point::new(5, 17), style, Baseline::Top).draw(display)?;
        Text::with_baseline(&ui.info_message, Point::new(5, 29), style, Baseline::Top)
            .draw(display)?;
    }

    let instructions_style = MonoTextStyle::new(&FONT_6X10, Rgb565::new(0, 20, 40));
    Text::with_baseline(
        "Space: Verbose | A: Add | R: Remove | B: Burst | S: Silence | Q: Quit",
        Point::new(5, SCREEN_HEIGHT as i32 - 12),
        instructions_style,
        Baseline::Top,
    )
    .draw(display)?;
    Ok(())
}

/// Desktop simulator for packscape fountains
#[derive(Parser, Debug)]
#[command(name = "packscape-sim", version, about)]
struct Args {
    /// JSON settings file; missing fields keep their defaults
    settings: Option<PathBuf>,
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
    settings
        .validate()
        .with_context(|| format!("Invalid settings in {}", path.display()))?;

    info!("loaded settings from {}", path.display());
    Ok(settings)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = load_settings(args.settings.as_deref())?;
    let mut scene: Packscape<ToneSink> = Packscape::new(settings, ToneSink::default())?;

    let mut display: SimulatorDisplay<Rgb565> =
        SimulatorDisplay::new(Size::new(SCREEN_WIDTH, SCREEN_HEIGHT));
    let output_settings = OutputSettingsBuilder::new().scale(2).build();
    let mut window = Window::new("Packscape - Fountains", &output_settings);

    let mut feed = DemoFeed::new(settings.rng_seed);
    let mut ui = UiState::default();

    // Timing
    let start = Instant::now();
    let target_fps = 60;
    let frame_duration = Duration::from_secs_f32(1.0 / target_fps as f32);
    let mut next_feed = 0;

    info!("packscape simulator started");
    info!("controls: Space verbose, A add layer, R remove layer, B burst, S silence, Q quit");

    'main_loop: loop {
        let frame_start = Instant::now();
        let now = start.elapsed().as_millis() as u64;

        // Feed delivers roughly once a second, like the packet counter
        if now >= next_feed {
            feed.advance();
            if let Err(err) = scene.ingest(feed.counts(), now) {
                error!("feed rejected: {}", err);
            }
            next_feed = now + FEED_PERIOD_MS;
        }

        scene.tick(now).context("Failed to advance fountains")?;

        if let Err(err) = render_scene(&mut display, &scene, &ui) {
            match err {}
        }
        window.update(&display);

        for event in window.events() {
            match event {
                SimulatorEvent::Quit => break 'main_loop,
                SimulatorEvent::KeyDown { keycode, .. } => {
                    let key = format!("{:?}", keycode).to_lowercase();
                    let message = match key.as_str() {
                        "space" => {
                            ui.verbose = !ui.verbose;
                            format!("Verbose mode: {}", if ui.verbose { "ON" } else { "OFF" })
                        }
                        "a" => match feed.add_layer() {
                            Some(name) => format!("Added layer {}", name),
                            None => "No more layers to add".to_string(),
                        },
                        "r" => match feed.remove_layer() {
                            Some(name) => format!("Removed layer {}", name),
                            None => "No layers left".to_string(),
                        },
                        "b" => match feed.burst_random() {
                            Some(name) => format!("Burst on {}", name),
                            None => "Nothing to burst".to_string(),
                        },
                        "s" => match feed.toggle_silence() {
                            Some((name, true)) => format!("Silenced {}", name),
                            Some((name, false)) => format!("Resumed {}", name),
                            None => "Nothing to silence".to_string(),
                        },
                        "q" => break 'main_loop,
                        _ => continue,
                    };
                    info!("{}", message);
                    ui.info_message = message;
                }
                _ => {}
            }
        }

        // Frame rate limiting
        let elapsed = frame_start.elapsed();
        if elapsed < frame_duration {
            thread::sleep(frame_duration - elapsed);
        }
    }

    info!("packscape simulator stopped");
    Ok(())
}
