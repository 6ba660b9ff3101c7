use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;
use sweepscope::playback::{MediaClock, TransportEvent, spawn_media_clock};
use sweepscope::render::RecordingSurface;
use sweepscope::settings::{Domain, SettingsManager};
use sweepscope::source::{SampleSource, UploadedRecording};
use sweepscope::util::telemetry;
use tracing::{error, info, warn};

const SURFACE_SIZE: (f32, f32) = (1280.0, 480.0);

const USAGE: &str = "usage: sweepscope [--domain ecg|eeg|doppler|speech|recurrence] \
[--input recording.json] [--realtime] [--metrics-json]";

#[derive(Debug, Default)]
struct Args {
    domain: Option<Domain>,
    input: Option<PathBuf>,
    realtime: bool,
    metrics_json: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--domain" => {
                let name = args.next().context("--domain needs a value")?;
                parsed.domain =
                    Some(Domain::parse(&name).with_context(|| format!("unknown domain '{name}'"))?);
            }
            "--input" => parsed.input = Some(args.next().context("--input needs a path")?.into()),
            "--realtime" => parsed.realtime = true,
            "--metrics-json" => parsed.metrics_json = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn main() {
    telemetry::init();
    if let Err(err) = run() {
        error!("[sweepscope] {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let settings = SettingsManager::load_or_default();
    let domain = args.domain.unwrap_or(settings.domain());
    let viewer = settings.viewer(domain);

    let channels = match &args.input {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
            let recording: UploadedRecording = serde_json::from_str(&text)
                .with_context(|| format!("{path:?} is not an uploaded recording"))?;
            SampleSource::Uploaded(recording).into_channels()
        }
        None => settings.source(domain).sample_source().into_channels(),
    };
    info!(
        "[sweepscope] {domain} viewer: {} projection, {} channel(s)",
        viewer.projection,
        channels.len()
    );

    let mut surface = RecordingSurface::new(SURFACE_SIZE.0, SURFACE_SIZE.1);
    let mut renderer = viewer.build_renderer();
    renderer.load(channels, &mut surface);

    let (events, mut clock) = spawn_media_clock(MediaClock {
        duration: renderer.cursor().duration(),
        realtime: args.realtime,
        ..MediaClock::default()
    })
    .context("starting media clock")?;

    let mut handled = 0u64;
    while let Ok(event) = events.recv_blocking() {
        handled += u64::from(renderer.handle(event, &mut surface));
        if matches!(event, TransportEvent::Ended | TransportEvent::Stop) {
            break;
        }
    }
    clock.stop();

    let metrics = renderer.metrics();
    info!(
        "[sweepscope] {handled} transport frames, {} presented, {} bytes in the last frame",
        surface.presented(),
        surface.front_bytes().len()
    );
    if let Some(err) = &metrics.placeholder {
        warn!("[sweepscope] last frame was a placeholder: {err}");
    }
    if args.metrics_json {
        println!("{}", serde_json::to_string_pretty(metrics)?);
    }
    Ok(())
}
