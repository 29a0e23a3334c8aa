//! CLI command implementations

use crate::output;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use dal_core::{
    events, AdsPlugin, EventPayload, HeadlessConfig, HeadlessSurface, InsertionPoint, Player,
    PlayerConfig, Plugin,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Events written to the simulation log. Time updates are left out.
const LOGGED_EVENTS: &[&str] = &[
    events::PLAY,
    events::PAUSE,
    events::ENDED,
    events::LOADED_METADATA,
    events::STALLED,
    events::ERROR,
    events::AD_START,
    events::AD_END,
    events::AD_SKIPPABLE,
    events::LOOP,
    events::PIP,
    events::CAPTION_CUE_CHANGE,
];

/// Simulation settings
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub speed: f64,
    pub max_seconds: f64,
    pub skip: bool,
    pub tick: f64,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            max_seconds: 3600.0,
            skip: false,
            tick: 0.25,
        }
    }
}

/// One published event, as seen by the harness
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    /// Simulated seconds since playback started
    pub clock: f64,
    pub event: String,
    /// Source on the surface when the event was published
    pub source: String,
    pub position: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    pub events: Vec<EventRecord>,
    /// Simulated seconds elapsed
    pub elapsed: f64,
    pub final_source: String,
    pub final_position: f64,
    pub ads_started: usize,
    pub ads_skipped: usize,
    /// Whether the run stopped at `max_seconds`
    pub truncated: bool,
}

fn describe(payload: &EventPayload) -> Option<String> {
    match payload {
        EventPayload::Ad(ad) => Some(format!("{} ({})", ad.source, ad.insertion_point)),
        EventPayload::Duration(Some(duration)) => Some(format!("duration {:.2}s", duration)),
        EventPayload::Flag(flag) => Some(flag.to_string()),
        EventPayload::Cues(cues) => Some(
            cues.iter()
                .map(|cue| cue.text.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        ),
        EventPayload::Error(message) => Some(message.clone()),
        _ => None,
    }
}

/// Record every logged event of `player` against the shared simulated clock
fn record_events(player: &Player, clock: &Arc<Mutex<f64>>) -> Arc<Mutex<Vec<EventRecord>>> {
    let log = Arc::new(Mutex::new(Vec::new()));

    for &name in LOGGED_EVENTS {
        let log = Arc::clone(&log);
        let clock = Arc::clone(clock);
        let weak = player.downgrade();
        player.on(name, move |payload| {
            let Some(player) = weak.upgrade() else {
                return;
            };
            log.lock().push(EventRecord {
                clock: *clock.lock(),
                event: name.to_string(),
                source: player.source(),
                position: player.current_time(),
                detail: describe(payload),
            });
        });
    }

    log
}

/// Play `config` on a headless surface until playback stops or
/// `max_seconds` of simulated time have passed
pub async fn run_simulation(
    config: &PlayerConfig,
    options: &SimulateOptions,
) -> anyhow::Result<SimulationReport> {
    if !(options.speed.is_finite() && options.speed > 0.0) {
        bail!("speed must be a positive number, got {}", options.speed);
    }
    if !(options.tick.is_finite() && options.tick > 0.0) {
        bail!("tick must be a positive number, got {}", options.tick);
    }

    let source = config
        .player
        .source
        .clone()
        .context("configuration has no player.source")?;
    if !config.media.contains_key(&source) {
        warn!(%source, "No duration for content, playback will run until max_seconds");
    }
    for ad in config.ads.iter().filter(|ad| !config.media.contains_key(&ad.source)) {
        warn!(src = %ad.source, "No duration for ad, it will never end on its own");
    }

    let surface = Arc::new(HeadlessSurface::new(HeadlessConfig {
        tick: options.tick,
        ..Default::default()
    }));
    for (media, duration) in &config.media {
        surface.add_media(media.clone(), *duration);
    }

    let started_at = Utc::now();
    let player = config.build_player(surface.clone())?;
    let clock = Arc::new(Mutex::new(0.0));
    let log = record_events(&player, &clock);
    let ads = player.plugin::<AdsPlugin>(AdsPlugin::NAME);

    info!(%source, ads = config.ads.len(), speed = options.speed, "Starting simulation");
    if player.is_paused() {
        player.play()?;
    }

    let mut interval = tokio::time::interval(Duration::from_secs_f64(options.tick / options.speed));
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let mut ads_skipped = 0;
    let mut truncated = false;
    loop {
        interval.tick().await;

        if player.is_paused() {
            break;
        }
        if *clock.lock() >= options.max_seconds {
            truncated = true;
            break;
        }

        *clock.lock() += options.tick;
        surface.advance(options.tick);

        if options.skip {
            if let Some(ads) = &ads {
                if ads.skip_ad() {
                    ads_skipped += 1;
                }
            }
        }
    }

    let events = log.lock().clone();
    let ads_started = events
        .iter()
        .filter(|record| record.event == events::AD_START)
        .count();
    let report = SimulationReport {
        started_at,
        elapsed: *clock.lock(),
        final_source: player.source(),
        final_position: player.current_time(),
        ads_started,
        ads_skipped,
        truncated,
        events,
    };

    player.destroy();
    info!(elapsed = report.elapsed, ads_started, "Simulation finished");
    Ok(report)
}

/// Simulate a configuration file and print the event log
pub async fn simulate(path: &Path, options: &SimulateOptions, format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::from_path(path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let report = run_simulation(&config, options).await?;
    println!("{}", output::format_report(&report, format)?);
    Ok(())
}

/// Summary of a validated configuration
#[derive(Debug, Clone, Serialize)]
pub struct ValidationSummary {
    pub source: Option<String>,
    pub pre_rolls: usize,
    pub mid_rolls: Vec<f64>,
    pub post_rolls: usize,
    pub plugins: Vec<String>,
    pub media: usize,
}

impl ValidationSummary {
    pub fn from_config(config: &PlayerConfig) -> Self {
        let count = |point: InsertionPoint| {
            config
                .ads
                .iter()
                .filter(|ad| ad.insertion_point == point)
                .count()
        };
        let mut mid_rolls: Vec<f64> = config
            .ads
            .iter()
            .filter(|ad| ad.insertion_point == InsertionPoint::Mid)
            .filter_map(|ad| ad.trigger_time)
            .collect();
        mid_rolls.sort_by(f64::total_cmp);

        let mut plugins: Vec<String> = config
            .plugins()
            .iter()
            .map(|plugin| plugin.name().to_string())
            .collect();
        plugins.sort();

        Self {
            source: config.player.source.clone(),
            pre_rolls: count(InsertionPoint::Pre),
            mid_rolls,
            post_rolls: count(InsertionPoint::Post),
            plugins,
            media: config.media.len(),
        }
    }
}

/// Validate a configuration file
pub fn validate(path: &Path, format: &str) -> anyhow::Result<()> {
    let config = PlayerConfig::from_path(path)
        .with_context(|| format!("invalid configuration {}", path.display()))?;

    let summary = ValidationSummary::from_config(&config);
    println!("{}", output::format_summary(&summary, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "player": { "source": "content.mp4" },
        "ads": [
            { "src": "pre1.mp4", "position": "pre" },
            { "src": "mid1.mp4", "position": "mid", "time": 3, "skipAfter": 1 }
        ],
        "media": { "content.mp4": 5, "pre1.mp4": 1, "mid1.mp4": 4 }
    }"#;

    fn fast() -> SimulateOptions {
        SimulateOptions {
            speed: 1000.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_simulation_plays_ads_and_content() {
        let config = PlayerConfig::from_json_str(CONFIG).unwrap();
        let report = run_simulation(&config, &fast()).await.unwrap();

        assert_eq!(report.ads_started, 2);
        assert_eq!(report.ads_skipped, 0);
        assert!(!report.truncated);
        assert_eq!(report.final_source, "content.mp4");
        assert_eq!(report.final_position, 5.0);

        let ad_events: Vec<&str> = report
            .events
            .iter()
            .filter(|record| record.event.starts_with("ad"))
            .map(|record| record.event.as_str())
            .collect();
        assert_eq!(
            ad_events,
            vec!["adstart", "adend", "adstart", "adskippable", "adend"]
        );
    }

    #[tokio::test]
    async fn test_simulation_skips_when_asked() {
        let config = PlayerConfig::from_json_str(CONFIG).unwrap();
        let options = SimulateOptions {
            skip: true,
            ..fast()
        };
        let report = run_simulation(&config, &options).await.unwrap();

        assert_eq!(report.ads_skipped, 1);
        // 1s pre-roll, 5s content, 1s of the skipped mid-roll
        assert_eq!(report.elapsed, 7.0);
    }

    #[tokio::test]
    async fn test_simulation_stops_at_max_seconds() {
        let config = PlayerConfig::from_json_str(
            r#"{"player": {"source": "live.m3u8"}}"#,
        )
        .unwrap();
        let options = SimulateOptions {
            max_seconds: 2.0,
            ..fast()
        };
        let report = run_simulation(&config, &options).await.unwrap();

        assert!(report.truncated);
        assert_eq!(report.elapsed, 2.0);
    }

    #[tokio::test]
    async fn test_simulation_requires_source() {
        let config = PlayerConfig::from_json_str("{}").unwrap();
        assert!(run_simulation(&config, &fast()).await.is_err());
    }

    #[test]
    fn test_validation_summary() {
        let config = PlayerConfig::from_json_str(CONFIG).unwrap();
        let summary = ValidationSummary::from_config(&config);

        assert_eq!(summary.pre_rolls, 1);
        assert_eq!(summary.mid_rolls, vec![3.0]);
        assert_eq!(summary.post_rolls, 0);
        assert_eq!(summary.plugins, vec!["ads"]);
        assert_eq!(summary.media, 3);
    }

    #[test]
    fn test_validate_reads_file() {
        let path = std::env::temp_dir().join(format!("dal-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, CONFIG).unwrap();
        assert!(validate(&path, "json").is_ok());

        std::fs::write(&path, r#"{"ads": [{"src": "", "position": "pre"}]}"#).unwrap();
        assert!(validate(&path, "text").is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
