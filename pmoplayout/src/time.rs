//! Arithmétique d'horloge murale pour les débuts d'éléments de planning.
//!
//! `start_time_after` et `filler_start_time_after` implémentent spec §4.1 :
//! un élément de planning `Fixed` s'ancre à minuit local de la date
//! candidate plus son heure du jour, sauf si l'élément est déjà « en
//! cours de progression » (un bloc flood/duration/multiple en vol), auquel
//! cas l'ancrage est suspendu pour que le bloc continue depuis l'horloge
//! courante. L'arithmétique en temps local résout le décalage UTC depuis
//! la date *candidate*, pas la date courante de l'état, pour rester
//! correcte à travers les changements d'heure.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::schedule::{ProgramScheduleItem, ScheduleItemKind, StartType};
use crate::state::PlayoutBuilderState;

/// Résout le décalage UTC en vigueur pour une date de calendrier locale
/// donnée.
///
/// Abstrait derrière un trait, de la même façon que `stateful_client.rs`
/// de `pmoradiofrance` enveloppe l'état vivant derrière une frontière de
/// trait, pour que les tests puissent fixer un décalage sans dépendre de
/// la base de données de fuseaux horaires de l'hôte.
pub trait LocalClock: std::fmt::Debug {
    fn offset_for_date(&self, date: NaiveDate) -> FixedOffset;
}

/// Résout les décalages depuis le fuseau horaire local de l'hôte via
/// `chrono::Local`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLocalClock;

impl LocalClock for SystemLocalClock {
    fn offset_for_date(&self, date: NaiveDate) -> FixedOffset {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        match Local.from_local_datetime(&midnight) {
            chrono::LocalResult::Single(dt) => *dt.offset(),
            chrono::LocalResult::Ambiguous(dt, _) => *dt.offset(),
            chrono::LocalResult::None => {
                // Tombe dans un trou d'avancement d'heure ; l'instant
                // représentable suivant porte encore un décalage utilisable.
                Local
                    .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                    .earliest()
                    .map(|dt| *dt.offset())
                    .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
            }
        }
    }
}

/// Une horloge fixée à un décalage constant, pour des tests déterministes.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub FixedOffset);

impl LocalClock for FixedClock {
    fn offset_for_date(&self, _date: NaiveDate) -> FixedOffset {
        self.0
    }
}

/// `true` ssi `item` est un bloc flood/duration/multiple en vol, selon
/// spec §4.1 : l'ancrage Fixed est suspendu en cours de progression pour
/// que le bloc continue depuis `state.current_time` plutôt que de se
/// réancrer.
fn is_mid_progress(state: &PlayoutBuilderState, item: &ProgramScheduleItem) -> bool {
    match item.kind() {
        ScheduleItemKind::Once => false,
        ScheduleItemKind::Flood => state.in_flood,
        ScheduleItemKind::Multiple { .. } => state.multiple_remaining.is_some(),
        ScheduleItemKind::Duration { .. } => {
            state.duration_finish.is_some() || state.in_duration_filler
        }
    }
}

/// Ancre `time_of_day` au prochain minuit-local-plus-décalage qui n'est
/// pas antérieur à `current`, en résolvant le décalage UTC depuis chaque
/// date candidate tour à tour pour qu'une transition d'heure à minuit ne
/// produise jamais un décalage périmé.
fn fixed_anchor(current: DateTime<Utc>, time_of_day: NaiveTime, clock: &dyn LocalClock) -> DateTime<Utc> {
    let today_offset = clock.offset_for_date(current.date_naive());
    let mut candidate_date = current.with_timezone(&today_offset).date_naive();

    loop {
        let offset = clock.offset_for_date(candidate_date);
        let naive = candidate_date.and_time(time_of_day);
        let local = match offset.from_local_datetime(&naive) {
            chrono::LocalResult::Single(dt) => dt,
            chrono::LocalResult::Ambiguous(dt, _) => dt,
            chrono::LocalResult::None => offset.from_local_datetime(&naive).earliest().unwrap_or_else(|| {
                offset.from_utc_datetime(&naive)
            }),
        };
        let candidate_utc = local.with_timezone(&Utc);
        if candidate_utc >= current {
            return candidate_utc;
        }
        candidate_date = candidate_date
            .succ_opt()
            .expect("calendar date arithmetic does not overflow within a build's lifetime");
    }
}

/// spec §4.1 `GetStartTimeAfter` (en français dans le texte : heure de
/// départ à utiliser après `state.current_time`).
pub fn start_time_after(
    state: &PlayoutBuilderState,
    item: &ProgramScheduleItem,
    clock: &dyn LocalClock,
) -> DateTime<Utc> {
    let base = item.base();
    if base.start_type == StartType::Fixed && !is_mid_progress(state, item) {
        if let Some(start_time) = base.start_time {
            return fixed_anchor(state.current_time, start_time, clock);
        }
    }
    state.current_time
}

/// spec §4.1 `GetFillerStartTimeAfter` = `min(GetStartTimeAfter, hardStop)`
/// — la borne à ne pas dépasser quand on drape un filler.
pub fn filler_start_time_after(
    state: &PlayoutBuilderState,
    item: &ProgramScheduleItem,
    hard_stop: DateTime<Utc>,
    clock: &dyn LocalClock,
) -> DateTime<Utc> {
    start_time_after(state, item, clock).min(hard_stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{CollectionKey, ScheduleItemBase};
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(FixedOffset::east_opt(0).unwrap())
    }

    fn fixed_item(start_time: NaiveTime) -> ProgramScheduleItem {
        let base = ScheduleItemBase::new(0, CollectionKey::Collection(1), StartType::Fixed)
            .with_start_time(start_time);
        ProgramScheduleItem::once(base)
    }

    #[test]
    fn fixed_start_anchors_to_today_when_not_yet_passed() {
        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap());
        let item = fixed_item(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let start = start_time_after(&state, &item, &clock());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 27, 20, 0, 0).unwrap());
    }

    #[test]
    fn fixed_start_rolls_to_tomorrow_when_already_passed() {
        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 21, 0, 0).unwrap());
        let item = fixed_item(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let start = start_time_after(&state, &item, &clock());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 7, 28, 20, 0, 0).unwrap());
    }

    #[test]
    fn mid_progress_suppresses_fixed_anchor() {
        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 21, 5, 0).unwrap())
            .with_multiple_remaining(Some(3));
        let base = ScheduleItemBase::new(0, CollectionKey::Collection(1), StartType::Fixed)
            .with_start_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let item = ProgramScheduleItem::multiple(base, 5);
        let start = start_time_after(&state, &item, &clock());
        assert_eq!(start, state.current_time);
    }

    #[test]
    fn filler_start_clamps_to_hard_stop() {
        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap());
        let item = fixed_item(NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let hard_stop = Utc.with_ymd_and_hms(2026, 7, 27, 18, 0, 0).unwrap();
        let start = filler_start_time_after(&state, &item, hard_stop, &clock());
        assert_eq!(start, hard_stop);
    }
}
