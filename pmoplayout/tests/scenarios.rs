//! Scénarios de bout en bout S1-S6 (spec.md §8), conduits via
//! `build_playout` plutôt que des fonctions de module individuelles.

use std::collections::HashMap;

use chrono::{Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use pmoplayout::builder::build_playout;
use pmoplayout::enumerator::{CollectionEnumerator, VecEnumerator};
use pmoplayout::error::TracingBuildLog;
use pmoplayout::filler::{FillerKind, FillerPreset};
use pmoplayout::media::{MediaChapter, MediaItem, MediaItemId};
use pmoplayout::schedule::{CollectionKey, ProgramScheduleItem, ScheduleItemBase, StartType, TailMode};
use pmoplayout::state::PlayoutBuilderState;
use pmoplayout::time::FixedClock;

type Registry = HashMap<CollectionKey, Box<dyn CollectionEnumerator>>;

fn media(id: &str, minutes: i64) -> MediaItem {
    MediaItem::without_chapters(MediaItemId::new(id), Duration::minutes(minutes))
}

fn utc() -> FixedClock {
    FixedClock(FixedOffset::east_opt(0).unwrap())
}

fn t(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 27, hour, minute, 0).unwrap()
}

#[test]
fn s1_fixed_start_once_no_filler() {
    let key = CollectionKey::Collection(1);
    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![media("m1", 30)])));

    let base =
        ScheduleItemBase::new(0, key, StartType::Fixed).with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    let schedule = vec![ProgramScheduleItem::once(base)];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (_final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].start, t(20, 0));
    assert_eq!(items[0].finish, t(20, 30));
    assert_eq!(items[0].filler_kind, FillerKind::None);
}

#[test]
fn s2_flood_with_tail_filler() {
    let primary_key = CollectionKey::Collection(1);
    let tail_key = CollectionKey::Collection(2);
    let next_key = CollectionKey::Collection(3);

    let mut registry: Registry = HashMap::new();
    registry.insert(primary_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("p", 25)])));
    registry.insert(tail_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("tail", 2)])));
    registry.insert(next_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("next", 10)])));

    let flood_base = ScheduleItemBase::new(0, primary_key, StartType::Fixed)
        .with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
        .with_tail_filler(FillerPreset::duration(FillerKind::Tail, tail_key, Duration::minutes(2), true).unwrap());
    let flood = ProgramScheduleItem::flood(flood_base);

    let next_base = ScheduleItemBase::new(1, next_key, StartType::Fixed)
        .with_start_time(NaiveTime::from_hms_opt(22, 0, 0).unwrap());
    let next = ProgramScheduleItem::once(next_base);

    let schedule = vec![flood, next];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 0),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    // Primaires bout à bout depuis 20:00 par tranches de 25 minutes :
    // [20:00,20:25), [20:25,20:50), [20:50,21:15), [21:15,21:40) — quatre
    // tranches, 100 minutes. Une cinquième finirait à 22:05, après le
    // départ fixe de 22:00, donc elle est sautée ; les 20 minutes
    // restantes (21:40-22:00) vont au filler de queue.
    let primaries: Vec<_> = items.iter().filter(|i| i.filler_kind == FillerKind::None).collect();
    let tails: Vec<_> = items.iter().filter(|i| i.filler_kind == FillerKind::Tail).collect();

    assert_eq!(primaries.len(), 4);
    assert!(!tails.is_empty());
    assert!(tails.iter().all(|i| i.finish <= t(22, 0)));
    assert_eq!(final_state.schedule_index, 2);

    let next_item = items.last().unwrap();
    assert_eq!(next_item.media_item_id, MediaItemId::new("next"));
    assert_eq!(next_item.start, t(22, 0));
}

#[test]
fn flood_followed_by_dynamic_item_drains_to_the_hard_stop() {
    // Un successeur à démarrage Dynamic n'a aucune borne d'horloge propre,
    // donc il ne doit pas réduire à zéro la fenêtre de drainage du flood :
    // le flood doit continuer d'émettre des primaires jusqu'au hard stop
    // du build, comme s'il n'y avait aucun élément suivant du tout.
    let primary_key = CollectionKey::Collection(1);
    let next_key = CollectionKey::Collection(2);

    let mut registry: Registry = HashMap::new();
    registry.insert(primary_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("p", 25)])));
    registry.insert(next_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("next", 10)])));

    let flood = ProgramScheduleItem::flood(ScheduleItemBase::new(0, primary_key, StartType::Dynamic));
    let next = ProgramScheduleItem::once(ScheduleItemBase::new(1, next_key, StartType::Dynamic));
    let schedule = vec![flood, next];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (_final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(11, 0),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    // Avec le bogue, `mode_hard_stop` s'effondrait au propre démarrage du
    // flood (10:00) car le « prochain départ » du successeur Dynamic
    // n'est autre que `state.current_time` ; le flood n'émettait alors
    // plus rien du tout. Corrigé, il draine deux primaires de 25 minutes
    // (10:00, 10:25) jusqu'au hard stop de 60 minutes, puis le successeur
    // Dynamic reprend où il s'était arrêté.
    let primaries: Vec<_> = items.iter().filter(|i| i.media_item_id == MediaItemId::new("p")).collect();
    assert_eq!(primaries.len(), 2);
    assert_eq!(primaries[0].start, t(10, 0));
    assert_eq!(primaries[1].start, t(10, 25));

    let next_item = items.last().unwrap();
    assert_eq!(next_item.media_item_id, MediaItemId::new("next"));
    assert_eq!(next_item.start, t(10, 50));
    assert_eq!(next_item.finish, t(11, 0));
}

#[test]
fn s3_pad_to_nearest_30_minutes_post_roll() {
    let key = CollectionKey::Collection(1);
    let post_roll_key = CollectionKey::Collection(2);
    let fallback_key = CollectionKey::Collection(3);

    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![media("primary", 40)])));
    registry.insert(
        post_roll_key.clone(),
        Box::new(VecEnumerator::once_through(vec![media("post", 10)])),
    );
    registry.insert(fallback_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("fb", 1)])));

    let base = ScheduleItemBase::new(0, key, StartType::Fixed)
        .with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
        .with_post_roll_filler(FillerPreset::pad(FillerKind::PostRoll, post_roll_key, 30, true).unwrap())
        .with_fallback_filler(
            FillerPreset::duration(FillerKind::Fallback, fallback_key, Duration::minutes(1), true).unwrap(),
        );
    let schedule = vec![ProgramScheduleItem::once(base)];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (_final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    assert_eq!(items[0].start, t(20, 0));
    assert_eq!(items[0].finish, t(20, 40));

    let last = items.last().unwrap();
    assert_eq!(last.filler_kind, FillerKind::Fallback);
    assert_eq!(last.out_point, Duration::zero());
    assert_eq!(last.finish, t(21, 0));
    assert_eq!(last.finish.timestamp() % 60, 0);
}

fn chaptered(id: &str, minutes: i64) -> MediaItem {
    let chapters = vec![
        MediaChapter { start: Duration::zero(), end: Duration::minutes(10) },
        MediaChapter { start: Duration::minutes(10), end: Duration::minutes(25) },
        MediaChapter { start: Duration::minutes(25), end: Duration::minutes(minutes) },
    ];
    MediaItem::new(MediaItemId::new(id), Duration::minutes(minutes), chapters).unwrap()
}

#[test]
fn s4_mid_roll_with_chapters_frames_every_gap() {
    let key = CollectionKey::Collection(1);
    let enter_key = CollectionKey::Collection(2);
    let mid_key = CollectionKey::Collection(3);
    let exit_key = CollectionKey::Collection(4);

    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![chaptered("primary", 40)])));
    registry.insert(enter_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("enter", 0)])));
    registry.insert(mid_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("mid", 1)])));
    registry.insert(exit_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("exit", 0)])));

    let base = ScheduleItemBase::new(0, key, StartType::Fixed)
        .with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
        .with_mid_roll_enter_filler(FillerPreset::count(FillerKind::MidRollEnter, enter_key, 1, true).unwrap())
        .with_mid_roll_filler(FillerPreset::count(FillerKind::MidRoll, mid_key, 1, true).unwrap())
        .with_mid_roll_exit_filler(FillerPreset::count(FillerKind::MidRollExit, exit_key, 1, true).unwrap());
    let schedule = vec![ProgramScheduleItem::once(base)];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (_final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    assert_eq!(items.len(), 9);
    let kinds: Vec<FillerKind> = items.iter().map(|i| i.filler_kind).collect();
    assert_eq!(
        kinds,
        vec![
            FillerKind::None,
            FillerKind::MidRollEnter,
            FillerKind::MidRoll,
            FillerKind::MidRollExit,
            FillerKind::None,
            FillerKind::MidRollEnter,
            FillerKind::MidRoll,
            FillerKind::MidRollExit,
            FillerKind::None,
        ]
    );
}

#[test]
fn s5_mid_roll_rollback_when_body_empty() {
    let key = CollectionKey::Collection(1);
    let enter_key = CollectionKey::Collection(2);
    let mid_key = CollectionKey::Collection(3);
    let exit_key = CollectionKey::Collection(4);

    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![chaptered("primary", 40)])));
    registry.insert(enter_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("enter", 0)])));
    registry.insert(mid_key.clone(), Box::new(VecEnumerator::cyclic(Vec::new())));
    registry.insert(exit_key.clone(), Box::new(VecEnumerator::cyclic(vec![media("exit", 0)])));

    let base = ScheduleItemBase::new(0, key, StartType::Fixed)
        .with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap())
        .with_mid_roll_enter_filler(FillerPreset::count(FillerKind::MidRollEnter, enter_key, 1, true).unwrap())
        .with_mid_roll_filler(FillerPreset::duration(FillerKind::MidRoll, mid_key, Duration::zero(), true).unwrap())
        .with_mid_roll_exit_filler(FillerPreset::count(FillerKind::MidRollExit, exit_key, 1, true).unwrap());
    let schedule = vec![ProgramScheduleItem::once(base)];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (_final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    let kinds: Vec<FillerKind> = items.iter().map(|i| i.filler_kind).collect();
    assert_eq!(kinds, vec![FillerKind::None, FillerKind::None, FillerKind::None]);
}

#[test]
fn s6_multiple_with_cancellation_mid_block() {
    let key = CollectionKey::Collection(1);
    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![media("m", 10)])));

    let base = ScheduleItemBase::new(0, key, StartType::Dynamic);
    let schedule = vec![ProgramScheduleItem::multiple(base, 10)];

    // Reprend depuis un état qui porte déjà MultipleRemaining = Some(5),
    // comme si 5 éléments avaient déjà été émis par un appel antérieur non
    // annulé ; le jeton est déjà annulé, donc cet appel doit renvoyer
    // immédiatement l'état porté et zéro nouvel élément.
    let state = PlayoutBuilderState::new(t(10, 0)).with_multiple_remaining(Some(5));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let err = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap_err();

    match err {
        pmoplayout::PlayoutError::ScanCanceled { state: carried, items } => {
            assert_eq!(carried.multiple_remaining, Some(5));
            assert!(items.is_empty());
        }
        other => panic!("expected ScanCanceled, got {other:?}"),
    }
}

#[test]
fn duration_mode_offline_tail_jumps_clock() {
    let key = CollectionKey::Collection(1);
    let mut registry: Registry = HashMap::new();
    registry.insert(key.clone(), Box::new(VecEnumerator::cyclic(vec![media("m", 20)])));

    let base = ScheduleItemBase::new(0, key, StartType::Dynamic);
    let schedule = vec![ProgramScheduleItem::duration(base, Duration::minutes(50), TailMode::Offline)];

    let state = PlayoutBuilderState::new(t(10, 0));
    let log = TracingBuildLog;
    let cancellation = CancellationToken::new();

    let (final_state, items) = build_playout(
        &schedule,
        &mut registry,
        state,
        t(23, 59),
        &cancellation,
        &utc(),
        &log,
    )
    .unwrap();

    assert_eq!(final_state.current_time, t(10, 50));
    assert_eq!(items.len(), 2);
}

#[test]
fn playout_item_round_trips_through_serde_json() {
    let item = pmoplayout::PlayoutItem {
        media_item_id: MediaItemId::new("m1"),
        start: t(20, 0),
        finish: t(20, 30),
        in_point: Duration::zero(),
        out_point: Duration::minutes(30),
        guide_group: 3,
        filler_kind: FillerKind::None,
        disable_watermarks: false,
    };

    let json = serde_json::to_string(&item).unwrap();
    let round_tripped: pmoplayout::PlayoutItem = serde_json::from_str(&json).unwrap();
    assert_eq!(item, round_tripped);
}
