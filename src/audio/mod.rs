use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
#[cfg(unix)]
use std::ffi::CString;
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a load started with [`AudioEngine::load`]. Every event carries
/// the sequence number of the load that produced it so callers can discard
/// outcomes that were superseded by a later load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Loaded { seq: u64, duration: Option<Duration> },
    Failed { seq: u64, message: String },
}

impl EngineEvent {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Loaded { seq, .. } | Self::Failed { seq, .. } => *seq,
        }
    }
}

/// The playback resource owned by the player surface. One instance per
/// application; all commands go through the owning surface, never two call
/// sites at once.
///
/// `load` begins loading a media locator and replaces whatever was loaded
/// before; it never blocks. Completion or failure is reported by `poll`.
/// A loaded source sits paused until `play`.
pub trait AudioEngine {
    fn load(&mut self, url: &str, seq: u64);
    fn play(&mut self);
    fn pause(&mut self);
    fn unload(&mut self);
    fn set_level(&mut self, level: f32);
    fn level(&self) -> f32;
    fn position(&self) -> Option<Duration>;
    fn poll(&mut self) -> Option<EngineEvent>;
}

struct LoadOutcome {
    seq: u64,
    bytes: Result<Vec<u8>>,
}

/// rodio-backed engine: one output stream for the engine's lifetime, one
/// sink per bound track. Media bytes are read on a worker thread; binding
/// happens in `poll`, and only for the most recent load.
pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Option<Sink>,
    level: f32,
    latest_seq: Option<u64>,
    outcome_tx: Sender<LoadOutcome>,
    outcome_rx: Receiver<LoadOutcome>,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let stream = open_output_stream()?;
        let (outcome_tx, outcome_rx) = channel();
        Ok(Self {
            stream,
            sink: None,
            level: 1.0,
            latest_seq: None,
            outcome_tx,
            outcome_rx,
        })
    }

    fn bind(&mut self, seq: u64, bytes: Vec<u8>) -> EngineEvent {
        let source = match Decoder::new(Cursor::new(bytes)) {
            Ok(source) => source,
            Err(err) => {
                return EngineEvent::Failed {
                    seq,
                    message: format!("failed to decode media: {err}"),
                };
            }
        };
        let duration = source.total_duration();

        if let Some(old) = self.sink.take() {
            old.stop();
        }
        let sink = Sink::connect_new(self.stream.mixer());
        sink.pause();
        sink.set_volume(self.level);
        sink.append(source);
        self.sink = Some(sink);

        EngineEvent::Loaded { seq, duration }
    }
}

impl AudioEngine for RodioAudioEngine {
    fn load(&mut self, url: &str, seq: u64) {
        self.latest_seq = Some(seq);
        let tx = self.outcome_tx.clone();
        let path = PathBuf::from(url);
        thread::spawn(move || {
            let bytes = fs::read(&path)
                .with_context(|| format!("failed to read media {}", path.display()));
            let _ = tx.send(LoadOutcome { seq, bytes });
        });
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn unload(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.latest_seq = None;
    }

    fn set_level(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.level);
        }
    }

    fn level(&self) -> f32 {
        self.level
    }

    fn position(&self) -> Option<Duration> {
        self.sink.as_ref().map(Sink::get_pos)
    }

    fn poll(&mut self) -> Option<EngineEvent> {
        let outcome = self.outcome_rx.try_recv().ok()?;
        let bytes = match outcome.bytes {
            Ok(bytes) => bytes,
            Err(err) => {
                return Some(EngineEvent::Failed {
                    seq: outcome.seq,
                    message: format!("{err:#}"),
                });
            }
        };

        if self.latest_seq != Some(outcome.seq) {
            // A newer load superseded this one; report completion without
            // binding so the stale media can never reach the sink.
            return Some(EngineEvent::Loaded {
                seq: outcome.seq,
                duration: None,
            });
        }

        Some(self.bind(outcome.seq, bytes))
    }
}

fn open_output_stream() -> Result<OutputStream> {
    let mut stream = with_silenced_stderr(|| {
        OutputStreamBuilder::from_default_device()
            .context("failed to open default system output device")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start output stream")
    })?;
    stream.log_on_drop(false);
    Ok(stream)
}

// cpal backends print probe noise on stderr, which corrupts the terminal UI.
#[cfg(unix)]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    let saved = unsafe { libc::dup(libc::STDERR_FILENO) };
    if saved < 0 {
        return operation();
    }

    let devnull = CString::new("/dev/null")
        .ok()
        .map(|path| unsafe { libc::open(path.as_ptr(), libc::O_WRONLY) })
        .unwrap_or(-1);

    if devnull >= 0 {
        unsafe {
            libc::dup2(devnull, libc::STDERR_FILENO);
            libc::close(devnull);
        }
    }

    let result = operation();

    unsafe {
        libc::dup2(saved, libc::STDERR_FILENO);
        libc::close(saved);
    }

    result
}

#[cfg(not(unix))]
fn with_silenced_stderr<T>(operation: impl FnOnce() -> T) -> T {
    operation()
}

/// Engine without an audio device: loads complete on the next `poll`, the
/// playback position is wall-clock arithmetic. Used when no output device
/// opens and by tests.
pub struct NullAudioEngine {
    pending: Option<(u64, String)>,
    current: Option<String>,
    paused: bool,
    level: f32,
    started_at: Option<Instant>,
    position_offset: Duration,
    duration: Option<Duration>,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            pending: None,
            current: None,
            paused: true,
            level: 1.0,
            started_at: None,
            position_offset: Duration::ZERO,
            duration: None,
        }
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn load(&mut self, url: &str, seq: u64) {
        // A newer load replaces the pending one outright.
        self.pending = Some((seq, url.to_string()));
    }

    fn play(&mut self) {
        if self.current.is_some() {
            self.started_at = Some(Instant::now());
        }
        self.paused = false;
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn unload(&mut self) {
        self.pending = None;
        self.current = None;
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.duration = None;
    }

    fn set_level(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
    }

    fn level(&self) -> f32 {
        self.level
    }

    fn position(&self) -> Option<Duration> {
        self.current.as_ref()?;
        Some(self.current_position())
    }

    fn poll(&mut self) -> Option<EngineEvent> {
        let (seq, url) = self.pending.take()?;
        let duration = probe_duration(Path::new(&url));
        self.current = Some(url);
        self.paused = true;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.duration = duration;
        Some(EngineEvent::Loaded { seq, duration })
    }
}

/// Decoded duration of a local media file, via the symphonia probe.
pub fn probe_duration(path: &Path) -> Option<Duration> {
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;
    use symphonia::default::get_probe;

    let file = File::open(path).ok()?;
    let source = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(OsStr::to_str) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let params = &probed.format.default_track()?.codec_params;
    if let (Some(time_base), Some(frame_count)) = (params.time_base, params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(Duration::from_secs_f64(time.seconds as f64 + time.frac));
    }

    params
        .n_frames
        .zip(params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frame_count, sample_rate)| {
            Duration::from_secs_f64(frame_count as f64 / f64::from(sample_rate))
        })
}
