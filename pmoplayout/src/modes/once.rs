//! L'ordonnanceur de mode `Once` (spec §4.3) : consomme exactement un
//! élément primaire et efface tous les drapeaux de progression en cours en
//! sortant.

use crate::error::{BuildLog, PlayoutError, Result};
use crate::filler;
use crate::item::PlayoutItem;
use crate::schedule::ProgramScheduleItem;
use crate::state::PlayoutBuilderState;
use crate::time::{self, LocalClock};

use super::{peek_primary, ModeContext, ModeScheduler};

pub struct OnceScheduler;

impl ModeScheduler for OnceScheduler {
    fn schedule(
        &self,
        state: &PlayoutBuilderState,
        item: &ProgramScheduleItem,
        ctx: &mut ModeContext,
    ) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
        schedule(state, item, ctx.registry, ctx.clock, ctx.log)
    }
}

pub fn schedule(
    state: &PlayoutBuilderState,
    item: &ProgramScheduleItem,
    registry: &mut dyn crate::enumerator::EnumeratorRegistry,
    clock: &dyn LocalClock,
    log: &dyn BuildLog,
) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
    let base = item.base();
    let item_start = time::start_time_after(state, item, clock);

    let Some(primary) = peek_primary(registry, &base.collection_key) else {
        log.log_warn(&PlayoutError::CollectionEmpty(base.collection_key.clone()).to_string());
        return Ok((clear_mid_progress(state), Vec::new()));
    };

    let (state_after_group, guide_group) = state.advance_guide_group();
    let items = filler::compose(registry, item, &primary, item_start, guide_group, log)?;
    super::advance_primary(registry, &base.collection_key);

    let finish = items.last().map(|i| i.finish).unwrap_or(item_start);
    let next_state = clear_mid_progress(&state_after_group.with_current_time(finish));

    Ok((next_state, items))
}

fn clear_mid_progress(state: &PlayoutBuilderState) -> PlayoutBuilderState {
    state
        .with_multiple_remaining(None)
        .with_duration_finish(None)
        .with_in_duration_filler(false)
        .exit_flood()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerator::{CollectionEnumerator, VecEnumerator};
    use crate::error::test_support::RecordingBuildLog;
    use crate::media::{MediaItem, MediaItemId};
    use crate::schedule::{CollectionKey, ScheduleItemBase, StartType};
    use crate::time::FixedClock;
    use chrono::{Duration, FixedOffset, TimeZone, Utc};
    use std::collections::HashMap;

    fn registry(key: CollectionKey, items: Vec<MediaItem>) -> HashMap<CollectionKey, Box<dyn CollectionEnumerator>> {
        let mut map: HashMap<CollectionKey, Box<dyn CollectionEnumerator>> = HashMap::new();
        map.insert(key, Box::new(VecEnumerator::cyclic(items)));
        map
    }

    #[test]
    fn s1_fixed_start_once_no_filler() {
        let key = CollectionKey::Collection(1);
        let mut reg = registry(
            key.clone(),
            vec![MediaItem::without_chapters(MediaItemId::new("m1"), Duration::minutes(30))],
        );
        let base = ScheduleItemBase::new(0, key, StartType::Fixed)
            .with_start_time(chrono::NaiveTime::from_hms_opt(20, 0, 0).unwrap());
        let item = ProgramScheduleItem::once(base);

        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap());
        let clock = FixedClock(FixedOffset::east_opt(0).unwrap());
        let log = RecordingBuildLog::default();

        let (next_state, items) = schedule(&state, &item, &mut reg, &clock, &log).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].start, Utc.with_ymd_and_hms(2026, 7, 27, 20, 0, 0).unwrap());
        assert_eq!(items[0].finish, Utc.with_ymd_and_hms(2026, 7, 27, 20, 30, 0).unwrap());
        assert_eq!(items[0].filler_kind, crate::filler::FillerKind::None);
        assert_eq!(next_state.current_time, items[0].finish);
    }

    #[test]
    fn empty_collection_is_skipped_without_error() {
        let key = CollectionKey::Collection(1);
        let mut reg = registry(key.clone(), Vec::new());
        let base = ScheduleItemBase::new(0, key, StartType::Dynamic);
        let item = ProgramScheduleItem::once(base);
        let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap());
        let clock = FixedClock(FixedOffset::east_opt(0).unwrap());
        let log = RecordingBuildLog::default();

        let (next_state, items) = schedule(&state, &item, &mut reg, &clock, &log).unwrap();

        assert!(items.is_empty());
        assert_eq!(next_state.current_time, state.current_time);
        assert_eq!(log.warnings.borrow().len(), 1);
    }
}
