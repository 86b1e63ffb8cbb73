use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::catalog::{Catalog, CatalogEntry};
use crate::coordinator::Coordinator;
use crate::surface::PlayerSurface;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::warn;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const VOLUME_STEP: f32 = 0.05;

#[derive(Debug, Default)]
pub struct AppOptions {
    pub catalog_path: Option<PathBuf>,
    pub silent: bool,
}

/// Everything the shell needs per frame. The coordinator and the surface
/// live here for the application's lifetime; pages never own either.
pub struct App {
    pub catalog: Catalog,
    pub coordinator: Coordinator,
    pub surface: PlayerSurface,
    pub categories: Vec<String>,
    pub category_index: usize,
    pub selected: usize,
    pub status: String,
    pub dirty: bool,
}

impl App {
    pub fn new(catalog: Catalog, coordinator: Coordinator, surface: PlayerSurface) -> Self {
        let categories = catalog.categories();
        Self {
            catalog,
            coordinator,
            surface,
            categories,
            category_index: 0,
            selected: 0,
            status: String::from("Ready"),
            dirty: true,
        }
    }

    pub fn current_category(&self) -> &str {
        self.categories
            .get(self.category_index)
            .map(String::as_str)
            .unwrap_or("All")
    }

    pub fn visible_entries(&self) -> Vec<&CatalogEntry> {
        self.catalog.entries_in(self.current_category())
    }

    pub fn select_next(&mut self) {
        let count = self.visible_entries().len();
        if count == 0 {
            return;
        }
        self.selected = (self.selected + 1).min(count - 1);
        self.dirty = true;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.dirty = true;
    }

    pub fn cycle_category(&mut self) {
        self.category_index = (self.category_index + 1) % self.categories.len();
        self.selected = 0;
        let category = self.current_category().to_string();
        self.set_status(&format!("Category: {category}"));
    }

    /// The dual-mode play control: pause when the selected item is the
    /// current playing track, otherwise request playback of it. This is the
    /// one place that reads coordinator state to decide which operation to
    /// call.
    pub fn request_selected(&mut self) {
        let Some(entry) = self.visible_entries().get(self.selected).copied() else {
            self.set_status("Nothing selected");
            return;
        };
        let track = entry.to_track(&self.catalog.artist);

        let state = self.coordinator.state();
        if state.is_current(&track) && state.is_playing {
            self.coordinator.toggle_play_pause();
            self.set_status(&format!("Paused: {}", track.title));
        } else {
            let title = track.title.clone();
            self.coordinator.play_track(Some(&track));
            self.set_status(&format!("Playing: {title}"));
        }
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}

pub fn run(options: AppOptions) -> Result<()> {
    let catalog = match Catalog::resolve_path(options.catalog_path.as_deref()) {
        Some(path) => Catalog::load(&path)?,
        None => Catalog::sample(),
    };

    let mut coordinator = Coordinator::new();
    let watcher = coordinator.subscribe();

    let engine: Box<dyn AudioEngine> = if options.silent {
        Box::new(NullAudioEngine::new())
    } else {
        match RodioAudioEngine::new() {
            Ok(engine) => Box::new(engine),
            Err(err) => {
                warn!("no audio output, falling back to the null engine: {err:#}");
                Box::new(NullAudioEngine::new())
            }
        }
    };
    let surface = PlayerSurface::new(engine, watcher);
    let mut app = App::new(catalog, coordinator, surface);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut last_tick = Instant::now();

    let result: Result<()> = loop {
        if app.surface.tick() {
            app.dirty = true;
        }

        if app.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| crate::ui::draw(frame, &app))?;
            app.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Down => app.select_next(),
            KeyCode::Up => app.select_prev(),
            KeyCode::Enter => app.request_selected(),
            KeyCode::Char(' ') => {
                app.coordinator.toggle_play_pause();
                let playing = app.coordinator.state().is_playing;
                app.set_status(if playing { "Resumed" } else { "Paused" });
            }
            KeyCode::Char('p') => {
                app.coordinator.pause_track();
                app.set_status("Paused");
            }
            KeyCode::Tab => app.cycle_category(),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                app.surface.adjust_volume(VOLUME_STEP);
                let volume = app.surface.volume();
                app.set_status(&format!("Volume: {}%", (volume * 100.0).round() as u16));
            }
            KeyCode::Char('-') => {
                app.surface.adjust_volume(-VOLUME_STEP);
                let volume = app.surface.volume();
                app.set_status(&format!("Volume: {}%", (volume * 100.0).round() as u16));
            }
            KeyCode::Char('m') => {
                app.surface.toggle_mute();
                app.set_status(if app.surface.is_muted() {
                    "Muted"
                } else {
                    "Unmuted"
                });
            }
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}
