//! L'ordonnanceur de mode `Duration` (spec §4.3) : joue des primaires tant
//! qu'ils tiennent encore avant `DurationFinish`, puis dispose du reste
//! selon `tail_mode`.

use tokio_util::sync::CancellationToken;

use crate::enumerator::EnumeratorRegistry;
use crate::error::{BuildLog, PlayoutError, Result};
use crate::filler;
use crate::item::PlayoutItem;
use crate::schedule::{ProgramScheduleItem, ScheduleItemKind, TailMode};
use crate::state::PlayoutBuilderState;
use crate::time::{self, LocalClock};

use super::{peek_primary, ModeContext, ModeScheduler};

pub struct DurationScheduler;

impl ModeScheduler for DurationScheduler {
    fn schedule(
        &self,
        state: &PlayoutBuilderState,
        item: &ProgramScheduleItem,
        ctx: &mut ModeContext,
    ) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
        schedule(state, item, ctx.registry, ctx.clock, ctx.cancellation, ctx.log)
    }
}

pub fn schedule(
    state: &PlayoutBuilderState,
    item: &ProgramScheduleItem,
    registry: &mut dyn EnumeratorRegistry,
    clock: &dyn LocalClock,
    cancellation: &CancellationToken,
    log: &dyn BuildLog,
) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
    let base = item.base();
    let ScheduleItemKind::Duration { playout_duration, tail_mode } = item.kind() else {
        return Err(PlayoutError::Fatal("duration scheduler invoked on non-Duration item".into()));
    };

    let mut current_state = state.clone();
    let duration_finish = state.duration_finish.unwrap_or(state.current_time + *playout_duration);
    if state.duration_finish.is_none() {
        current_state = current_state.with_duration_finish(Some(duration_finish));
    }

    let mut items = Vec::new();

    loop {
        if cancellation.is_cancelled() {
            return Err(PlayoutError::ScanCanceled {
                state: Box::new(current_state),
                items,
            });
        }
        if current_state.current_time >= duration_finish {
            break;
        }

        let Some(primary) = peek_primary(registry, &base.collection_key) else {
            log.log_warn(&PlayoutError::CollectionEmpty(base.collection_key.clone()).to_string());
            break;
        };

        // L'admission n'utilise que la durée intrinsèque du primaire : la
        // durée finale enveloppée de filler n'est connue qu'après
        // `filler::compose`.
        if current_state.current_time + primary.duration > duration_finish {
            break;
        }

        let item_start = time::start_time_after(&current_state, item, clock);
        let (state_after_group, guide_group) = current_state.advance_guide_group();
        let drafted = filler::compose(registry, item, &primary, item_start, guide_group, log)?;
        super::advance_primary(registry, &base.collection_key);

        let finish = drafted.last().map(|i| i.finish).unwrap_or(item_start);
        current_state = state_after_group.with_current_time(finish);
        items.extend(drafted);
    }

    if current_state.current_time < duration_finish {
        match tail_mode {
            TailMode::Filler => {
                if let Some(tail) = &base.tail_filler {
                    let (state_after_group, guide_group) = current_state.advance_guide_group();
                    let tail_items = filler::add_tail_filler(
                        registry,
                        tail,
                        current_state.current_time,
                        duration_finish,
                        guide_group,
                    );
                    let finish = tail_items.last().map(|i| i.finish).unwrap_or(current_state.current_time);
                    current_state = state_after_group.with_current_time(finish);
                    items.extend(tail_items);
                }
            }
            TailMode::Offline => {
                current_state = current_state.with_current_time(duration_finish);
            }
        }
    }

    let final_state = current_state
        .with_duration_finish(None)
        .with_in_duration_filler(false)
        .with_multiple_remaining(None)
        .exit_flood();

    Ok((final_state, items))
}
