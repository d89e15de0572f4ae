//! La boucle de construction de haut niveau (spec §4.6) : parcourt le
//! planning dans l'ordre, route chaque élément vers son ordonnanceur de
//! mode, et fusionne les résultats en un seul playout.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::enumerator::EnumeratorRegistry;
use crate::error::{BuildLog, PlayoutError, Result};
use crate::item::PlayoutItem;
use crate::modes::{scheduler_for, ModeContext, ScheduleItemKindTag};
use crate::schedule::{ProgramScheduleItem, StartType};
use crate::state::PlayoutBuilderState;
use crate::time::{self, LocalClock};

/// Construit un playout à partir de `initial_state`, en traitant `schedule`
/// dans l'ordre des index jusqu'à ce que le planning soit épuisé, que
/// `hard_stop` soit atteint, ou que `cancellation` se déclenche.
///
/// En cas d'annulation, renvoie `Err(PlayoutError::ScanCanceled)` portant
/// tous les éléments déjà produits sur l'ensemble des éléments de planning,
/// ainsi que l'état nécessaire pour reprendre (spec §7 : « l'état jusqu'au
/// dernier élément de planning validé est conservé »).
pub fn build_playout(
    schedule: &[ProgramScheduleItem],
    registry: &mut dyn EnumeratorRegistry,
    initial_state: PlayoutBuilderState,
    hard_stop: DateTime<Utc>,
    cancellation: &CancellationToken,
    clock: &dyn LocalClock,
    log: &dyn BuildLog,
) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)> {
    let mut state = initial_state;
    let mut items = Vec::new();

    while state.schedule_index < schedule.len() {
        if cancellation.is_cancelled() {
            return Err(PlayoutError::ScanCanceled {
                state: Box::new(state),
                items,
            });
        }
        if state.current_time >= hard_stop {
            break;
        }

        let item = &schedule[state.schedule_index];
        let tag = ScheduleItemKindTag::of(item.kind());
        let scheduler = scheduler_for(tag);

        let next_item = schedule.get(state.schedule_index + 1);
        // Seul un successeur à démarrage Fixed muni d'une heure de départ
        // donne un véritable `nextItemStart` vers lequel vider ; un
        // successeur Dynamic démarre dès que l'élément courant se termine,
        // il ne porte donc aucune borne propre et ne doit pas écraser le
        // hard stop de l'élément courant.
        let mode_hard_stop = match next_item {
            Some(next) if next.base().start_type == StartType::Fixed && next.base().start_time.is_some() => {
                time::filler_start_time_after(&state, next, hard_stop, clock)
            }
            _ => hard_stop,
        };

        let mut ctx = ModeContext {
            registry,
            next_item,
            hard_stop: mode_hard_stop,
            clock,
            cancellation,
            log,
        };

        match scheduler.schedule(&state, item, &mut ctx) {
            Ok((next_state, produced)) => {
                items.extend(produced);
                state = next_state.with_schedule_index(state.schedule_index + 1);
            }
            Err(PlayoutError::ScanCanceled { state: carried, items: partial }) => {
                items.extend(partial);
                return Err(PlayoutError::ScanCanceled { state: carried, items });
            }
            Err(other) => return Err(other),
        }
    }

    Ok((state, items))
}
