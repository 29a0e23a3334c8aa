//! Integration tests for DAL Core

use dal_core::{
    events, AdItem, AdsPlugin, CaptionTrack, CaptionsPlugin, EventPayload, HeadlessSurface,
    LoopPlugin, Player, PlayerConfig, PlayerOptions, Plugin,
};
use parking_lot::Mutex;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

/// Records ad events as `(event, ad source)` pairs
fn record_ad_events(player: &Player) -> Arc<Mutex<Vec<(String, String)>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for name in [events::AD_START, events::AD_END, events::AD_SKIPPABLE] {
        let log = Arc::clone(&log);
        player.on(name, move |payload| {
            let src = payload.as_ad().map(|ad| ad.source.clone()).unwrap_or_default();
            log.lock().push((name.to_string(), src));
        });
    }
    log
}

fn scenario() -> (Arc<HeadlessSurface>, Player, Arc<AdsPlugin>) {
    let surface = Arc::new(
        HeadlessSurface::default()
            .with_media("content.mp4", 60.0)
            .with_media("pre1.mp4", 10.0)
            .with_media("mid1.mp4", 10.0),
    );
    let player = Player::new(surface.clone(), PlayerOptions::with_source("content.mp4"));
    let ads = player.register(Arc::new(AdsPlugin::new(vec![
        AdItem::pre("pre1.mp4"),
        AdItem::mid("mid1.mp4", 30.0).with_skip_after(5.0),
    ])));
    (surface, player, ads)
}

fn entry(event: &str, src: &str) -> (String, String) {
    (event.to_string(), src.to_string())
}

// =============================================================================
// Ad Insertion Tests
// =============================================================================

#[test]
fn test_pre_and_mid_roll_scenario() {
    let (surface, player, ads) = scenario();
    let log = record_ad_events(&player);

    // play -> pre-roll starts
    player.play().unwrap();
    assert_eq!(*log.lock(), vec![entry(events::AD_START, "pre1.mp4")]);
    assert_eq!(player.source(), "pre1.mp4");

    // ended -> content restored
    player.emit(events::ENDED, EventPayload::None);
    assert_eq!(log.lock().last(), Some(&entry(events::AD_END, "pre1.mp4")));
    assert_eq!(player.source(), "content.mp4");
    assert_eq!(player.current_time(), 0.0);
    assert!(!ads.is_ad_playing());

    // 29 -> 31 crosses the mid-roll at 30
    player.set_current_time(29.0);
    surface.advance_to(31.0);
    assert_eq!(log.lock().last(), Some(&entry(events::AD_START, "mid1.mp4")));
    assert_eq!(player.source(), "mid1.mp4");
    assert_eq!(ads.resume_checkpoint(), Some(30.0));

    // ad-local position reaches 6 -> exactly one skippable notification
    surface.advance_to(6.0);
    let skippable = log
        .lock()
        .iter()
        .filter(|(event, _)| event == events::AD_SKIPPABLE)
        .count();
    assert_eq!(skippable, 1);

    // skip resumes the content at the checkpoint
    assert!(ads.skip_ad());
    assert_eq!(player.source(), "content.mp4");
    assert_eq!(player.current_time(), 30.0);
    assert!(!ads.is_ad_playing());
    assert_eq!(log.lock().last(), Some(&entry(events::AD_END, "mid1.mp4")));
}

#[test]
fn test_pre_roll_fires_once() {
    let (surface, player, _ads) = scenario();
    let log = record_ad_events(&player);

    player.play().unwrap();
    surface.advance(10.0);
    player.pause();
    player.play().unwrap();

    let starts = log
        .lock()
        .iter()
        .filter(|(event, _)| event == events::AD_START)
        .count();
    assert_eq!(starts, 1);
}

#[test]
fn test_mid_roll_does_not_retrigger_after_seek_back() {
    let (surface, player, ads) = scenario();
    let log = record_ad_events(&player);

    player.play().unwrap();
    surface.advance(10.0);

    player.set_current_time(29.0);
    surface.advance_to(31.0);
    surface.advance(10.0);
    assert_eq!(player.source(), "content.mp4");

    player.set_current_time(20.0);
    surface.advance_to(35.0);
    assert!(!ads.is_ad_playing());

    let mid_starts = log
        .lock()
        .iter()
        .filter(|entry| **entry == (events::AD_START.to_string(), "mid1.mp4".to_string()))
        .count();
    assert_eq!(mid_starts, 1);
}

#[test]
fn test_resume_position_ignores_ad_progress() {
    let (surface, player, _ads) = scenario();
    player.play().unwrap();
    surface.advance(10.0);

    player.set_current_time(29.0);
    surface.advance_to(31.0);

    // Play the mid-roll through to its end
    surface.advance(10.0);
    assert_eq!(player.source(), "content.mp4");
    assert_eq!(player.current_time(), 30.0);
}

#[test]
fn test_skip_ad_false_cases() {
    let (surface, player, ads) = scenario();

    // Not playing an ad
    assert!(!ads.skip_ad());

    // Pre-roll has no skip offset
    player.play().unwrap();
    surface.advance(3.0);
    assert!(!ads.skip_ad());
    surface.advance(10.0);

    // Mid-roll before its skip offset
    player.set_current_time(29.0);
    surface.advance_to(31.0);
    surface.advance_to(4.75);
    assert!(!ads.skip_ad());
    assert!(ads.is_ad_playing());
}

#[test]
fn test_reset_replays_ads() {
    let (surface, player, ads) = scenario();
    let log = record_ad_events(&player);

    player.play().unwrap();
    surface.advance(10.0);
    assert!(!ads.is_ad_playing());

    ads.reset();
    player.pause();
    player.play().unwrap();

    let starts: Vec<(String, String)> = log
        .lock()
        .iter()
        .filter(|(event, _)| event == events::AD_START)
        .cloned()
        .collect();
    assert_eq!(
        starts,
        vec![
            entry(events::AD_START, "pre1.mp4"),
            entry(events::AD_START, "pre1.mp4")
        ]
    );
}

#[test]
fn test_post_roll_after_content() {
    let surface = Arc::new(
        HeadlessSurface::default()
            .with_media("content.mp4", 5.0)
            .with_media("post.mp4", 2.0),
    );
    let player = Player::new(surface.clone(), PlayerOptions::with_source("content.mp4"));
    let ads = player.register(Arc::new(AdsPlugin::new(vec![AdItem::post("post.mp4")])));
    let log = record_ad_events(&player);

    player.play().unwrap();
    surface.advance(10.0);
    assert_eq!(*log.lock(), vec![entry(events::AD_START, "post.mp4")]);

    surface.advance(10.0);
    assert!(!ads.is_ad_playing());
    assert_eq!(player.source(), "content.mp4");
    assert_eq!(player.current_time(), 5.0);
}

#[test]
fn test_mid_roll_past_content_end_never_fires() {
    let surface = Arc::new(
        HeadlessSurface::default()
            .with_media("content.mp4", 60.0)
            .with_media("late.mp4", 5.0)
            .with_media("post.mp4", 2.0),
    );
    let player = Player::new(surface.clone(), PlayerOptions::with_source("content.mp4"));
    let ads = player.register(Arc::new(AdsPlugin::new(vec![
        AdItem::mid("late.mp4", 120.0).with_id("late"),
        AdItem::post("post.mp4").with_id("post"),
    ])));
    let log = record_ad_events(&player);

    player.play().unwrap();
    surface.advance_to(60.0);
    assert_eq!(*log.lock(), vec![entry(events::AD_START, "post.mp4")]);

    surface.advance(10.0);
    assert!(!ads.is_ad_playing());
    assert!(ads.has_played("post"));
    assert!(!ads.has_played("late"));
    assert!(log
        .lock()
        .iter()
        .all(|(_, src)| src != "late.mp4"));
}

// =============================================================================
// Plugin Registry Tests
// =============================================================================

#[test]
fn test_register_get_round_trip() {
    let (_, player, ads) = scenario();

    let found = player.get(AdsPlugin::NAME).unwrap();
    assert_eq!(found.name(), "ads");

    let typed = player.plugin::<AdsPlugin>(AdsPlugin::NAME).unwrap();
    assert!(Arc::ptr_eq(&typed, &ads));

    assert!(player.plugin::<LoopPlugin>(AdsPlugin::NAME).is_none());
    let err = player.require::<LoopPlugin>("loop").unwrap_err();
    assert_eq!(err.error_code(), "PLUGIN_NOT_FOUND");
}

#[test]
fn test_shadowed_plugin_still_torn_down() {
    let surface = Arc::new(HeadlessSurface::default());
    let player = Player::new(surface, PlayerOptions::default());

    let first = player.register(Arc::new(CaptionsPlugin::new(vec![CaptionTrack::new("a.vtt")])));
    let second = player.register(Arc::new(CaptionsPlugin::new(vec![CaptionTrack::new("b.vtt")])));

    let visible = player.plugin::<CaptionsPlugin>(CaptionsPlugin::NAME).unwrap();
    assert!(Arc::ptr_eq(&visible, &second));
    assert_eq!(player.plugins().len(), 1);

    player.destroy();
    assert!(!first.has_captions());
    assert!(!second.has_captions());
}

#[test]
fn test_destroy_detaches_everything() {
    let (_, player, ads) = scenario();
    player.destroy();

    assert!(player.get(AdsPlugin::NAME).is_none());
    assert!(player.plugins().is_empty());

    // Handlers are gone, a manual publish causes no transition
    player.emit(events::PLAY, EventPayload::None);
    player.emit(events::TIME_UPDATE, EventPayload::Time(45.0));
    assert!(!ads.is_ad_playing());
    assert!(ads.ads().is_empty());
}

#[test]
fn test_unregister_tears_down() {
    let (_, player, ads) = scenario();
    assert!(player.unregister(AdsPlugin::NAME).is_some());
    assert!(!player.has_plugin(AdsPlugin::NAME));

    player.play().unwrap();
    assert!(!ads.is_ad_playing());
    assert_eq!(player.source(), "content.mp4");
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_config_builds_player() {
    let config = PlayerConfig::from_json_str(
        r#"{
            "player": { "source": "content.mp4" },
            "ads": [{ "src": "pre1.mp4", "position": "pre" }],
            "loop": true,
            "download": true
        }"#,
    )
    .unwrap();

    let surface = Arc::new(HeadlessSurface::default().with_media("content.mp4", 60.0));
    let player = config.build_player(surface).unwrap();

    assert!(player.has_plugin(AdsPlugin::NAME));
    assert!(player.has_plugin(LoopPlugin::NAME));
    assert!(player.has_plugin("download"));
    assert!(player.is_looping());
    assert_eq!(player.source(), "content.mp4");
}
