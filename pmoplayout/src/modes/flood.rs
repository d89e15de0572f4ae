//! L'ordonnanceur de mode `Flood` (spec §4.3) : continue d'émettre des
//! primaires jusqu'à ce que le prochain élément à démarrage fixe soit dû,
//! puis comble l'écart restant avec du filler de queue. `in_flood` n'est
//! posé qu'une fois le premier primaire effectivement consommé, donc un
//! bloc flood dont la collection se révèle vide ne se signale jamais
//! comme étant entré en flood.

use tokio_util::sync::CancellationToken;

use crate::enumerator::EnumeratorRegistry;
use crate::error::{BuildLog, PlayoutError, Result};
use crate::filler;
use crate::item::PlayoutItem;
use crate::schedule::ProgramScheduleItem;
use crate::state::PlayoutBuilderState;
use crate::time::{self, LocalClock};

use super::{peek_primary, ModeContext, ModeScheduler};

pub struct FloodScheduler;

impl ModeScheduler for FloodScheduler {
    fn schedule(
        &self,
        state: &PlayoutBuilderState,
        item: &ProgramScheduleItem,
        ctx: &mut ModeContext,
    ) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
        schedule(state, item, ctx.registry, ctx.hard_stop, ctx.clock, ctx.cancellation, ctx.log)
    }
}

pub fn schedule(
    state: &PlayoutBuilderState,
    item: &ProgramScheduleItem,
    registry: &mut dyn EnumeratorRegistry,
    hard_stop: chrono::DateTime<chrono::Utc>,
    clock: &dyn LocalClock,
    cancellation: &CancellationToken,
    log: &dyn BuildLog,
) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
    let base = item.base();
    let mut current_state = state.clone();
    let mut items = Vec::new();

    loop {
        if cancellation.is_cancelled() {
            return Err(PlayoutError::ScanCanceled {
                state: Box::new(current_state),
                items,
            });
        }
        if current_state.current_time >= hard_stop {
            break;
        }

        let Some(primary) = peek_primary(registry, &base.collection_key) else {
            log.log_warn(&PlayoutError::CollectionEmpty(base.collection_key.clone()).to_string());
            break;
        };

        // L'admission n'utilise que la durée intrinsèque du primaire,
        // comme l'ordonnanceur Duration : la durée enveloppée de filler
        // n'est connue qu'après la composition.
        if current_state.current_time + primary.duration > hard_stop {
            break;
        }

        let item_start = time::start_time_after(&current_state, item, clock);
        let (state_after_group, guide_group) = current_state.advance_guide_group();
        let drafted = filler::compose(registry, item, &primary, item_start, guide_group, log)?;
        super::advance_primary(registry, &base.collection_key);

        let finish = drafted.last().map(|i| i.finish).unwrap_or(item_start);
        current_state = state_after_group.with_current_time(finish).enter_flood();
        items.extend(drafted);
    }

    if current_state.current_time < hard_stop {
        if let Some(tail) = &base.tail_filler {
            let (state_after_group, guide_group) = current_state.advance_guide_group();
            let tail_items =
                filler::add_tail_filler(registry, tail, current_state.current_time, hard_stop, guide_group);
            let finish = tail_items.last().map(|i| i.finish).unwrap_or(current_state.current_time);
            current_state = state_after_group.with_current_time(finish);
            items.extend(tail_items);
        }
    }

    let final_state = current_state
        .exit_flood()
        .with_multiple_remaining(None)
        .with_duration_finish(None)
        .with_in_duration_filler(false);

    Ok((final_state, items))
}
