// Query parsing, fallbacks and serialisation of renderer parameters.

use torch_core::params::{track_source, ParamStore, ParamValue, Params, QueryOverrides, PARAM_NAMES};
use torch_core::AudioMode;

#[test]
fn empty_query_gives_defaults() {
    assert_eq!(Params::from_query(""), Params::default());
    assert_eq!(Params::from_query("?"), Params::default());
}

#[test]
fn overrides_replace_defaults() {
    let p = Params::from_query("?grow=0.01&audioMode=waveform&audioOrders=3&ambient=[0,0.5,1,1]");
    assert!((p.grow - 0.01).abs() < 1e-9);
    assert_eq!(p.audio_mode, AudioMode::Waveform);
    assert_eq!(p.audio_orders, 3);
    assert_eq!(p.ambient, [0.0, 0.5, 1.0, 1.0]);
    assert!((p.radius - 0.3).abs() < 1e-9);
}

#[test]
fn malformed_values_fall_back_silently() {
    let p = Params::from_query("grow=lots&audioMode=loud&audioOrders=-1&emit=1,2&radius=");
    let d = Params::default();
    assert_eq!(p.grow, d.grow);
    assert_eq!(p.audio_mode, d.audio_mode);
    assert_eq!(p.audio_orders, d.audio_orders);
    assert_eq!(p.emit, d.emit);
    assert_eq!(p.radius, d.radius);
}

#[test]
fn order_count_is_capped() {
    let p = Params::from_query("audioOrders=99");
    assert_eq!(p.audio_orders, torch_core::constants::MAX_AUDIO_ORDERS);
}

#[test]
fn first_occurrence_wins_and_flags_are_presence() {
    let p = Params::from_query("spin=1&spin=2&muted");
    assert_eq!(p.spin, 1.0);
    assert!(p.muted);
    assert!(!Params::from_query("spin=1").muted);
}

#[test]
fn track_is_percent_decoded() {
    let p = Params::from_query("track=https%3A%2F%2Fexample.com%2Fa%20b.mp3");
    assert_eq!(p.track, "https://example.com/a b.mp3");
}

#[test]
fn serialisation_follows_name_order() {
    let pairs = Params::default().serialize();
    let names: Vec<&str> = pairs
        .iter()
        .map(|pair| pair.split('=').next().unwrap_or_default())
        .collect();
    assert_eq!(names, PARAM_NAMES);
    assert!(pairs.contains(&"ambient=1,1,1,1".to_string()));
    assert!(pairs.contains(&"audioMode=frequencies".to_string()));
}

#[test]
fn query_string_round_trips_through_overrides() {
    let original = Params::from_query("track=a%20b&grow=0.002&emit=0.5,0.25,1,1&muted");
    let again = Params::from_query(&original.query_string());
    assert_eq!(original, again);
}

#[test]
fn share_url_replaces_existing_query() {
    let p = Params::from_query("spin=0.5");
    let url = p.share_url("https://host/torch/?spin=1#x");
    assert!(url.starts_with("https://host/torch/?track=&audioMode=frequencies"));
    assert!(url.contains("&spin=0.5&"));
    assert!(!url.contains('#'));
}

#[test]
fn store_resolves_by_name() {
    let mut store = ParamStore::from_query("harmonies=3");
    assert_eq!(store.resolve("harmonies"), Some(ParamValue::Float(3.0)));
    assert_eq!(store.resolve("audioOrders"), Some(ParamValue::Count(2)));
    assert_eq!(store.resolve("unknown"), None);

    let mut next = QueryOverrides::default();
    next.insert("harmonies", "5");
    let params = store.apply(next);
    assert_eq!(params.harmonies, 5.0);
    assert_eq!(store.resolve("harmonies"), Some(ParamValue::Float(5.0)));
}

#[test]
fn dropbox_share_links_become_direct() {
    assert_eq!(
        track_source("https://www.dropbox.com/s/abc123/song.mp3?dl=0"),
        "https://dl.dropboxusercontent.com/s/abc123/song.mp3?dl=1&raw=1"
    );
    assert_eq!(track_source("song.mp3"), "song.mp3");
}
