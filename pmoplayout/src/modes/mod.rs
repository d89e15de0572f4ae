//! Ordonnanceurs de mode (spec §4.3) : un par variante de
//! `ScheduleItemKind`, chacun transformant un unique élément de planning en
//! le prochain état du builder plus les `PlayoutItem`s qu'il a produits.
//!
//! `build_playout` distribue via [`scheduler_for`] plutôt qu'un `match`
//! en ligne répété à chaque site d'appel, suivant la note de factorisation
//! de SPEC_FULL ; les quatre fonctions par variante restent néanmoins des
//! fonctions libres dessous, pour que chacune reste testable unitairement
//! sans passer par le trait.

pub mod duration;
pub mod flood;
pub mod multiple;
pub mod once;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::enumerator::EnumeratorRegistry;
use crate::error::{BuildLog, Result};
use crate::item::PlayoutItem;
use crate::media::MediaItem;
use crate::schedule::{CollectionKey, ProgramScheduleItem, ScheduleItemKind};
use crate::state::PlayoutBuilderState;
use crate::time::LocalClock;

/// Tout ce qu'un ordonnanceur de mode pourrait nécessiter au-delà de
/// `state` et `item`, regroupé pour que [`ModeScheduler::schedule`] ait une
/// seule signature uniforme même si chaque variante n'en utilise qu'un
/// sous-ensemble.
pub struct ModeContext<'a> {
    pub registry: &'a mut dyn EnumeratorRegistry,
    pub next_item: Option<&'a ProgramScheduleItem>,
    pub hard_stop: DateTime<Utc>,
    pub clock: &'a dyn LocalClock,
    pub cancellation: &'a CancellationToken,
    pub log: &'a dyn BuildLog,
}

pub trait ModeScheduler {
    fn schedule(
        &self,
        state: &PlayoutBuilderState,
        item: &ProgramScheduleItem,
        ctx: &mut ModeContext,
    ) -> Result<(PlayoutBuilderState, Vec<PlayoutItem>)>;
}

/// Vers quel ordonnanceur par variante un élément de planning est routé ;
/// reprend un pour un le tableau des règles de terminaison de spec §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleItemKindTag {
    Once,
    Flood,
    Multiple,
    Duration,
}

impl ScheduleItemKindTag {
    pub fn of(kind: &ScheduleItemKind) -> Self {
        match kind {
            ScheduleItemKind::Once => Self::Once,
            ScheduleItemKind::Flood => Self::Flood,
            ScheduleItemKind::Multiple { .. } => Self::Multiple,
            ScheduleItemKind::Duration { .. } => Self::Duration,
        }
    }
}

pub fn scheduler_for(tag: ScheduleItemKindTag) -> &'static dyn ModeScheduler {
    match tag {
        ScheduleItemKindTag::Once => &once::OnceScheduler,
        ScheduleItemKindTag::Flood => &flood::FloodScheduler,
        ScheduleItemKindTag::Multiple => &multiple::MultipleScheduler,
        ScheduleItemKindTag::Duration => &duration::DurationScheduler,
    }
}

/// Regarde l'élément courant de l'énumérateur pour `key` sans le consommer ;
/// partagé par l'étape « récupérer-courant-ou-sauter » de chaque
/// ordonnanceur de mode (note de conception : factoriser les branches
/// quasi identiques de chaque variante en une seule routine).
pub(crate) fn peek_primary(registry: &mut dyn EnumeratorRegistry, key: &CollectionKey) -> Option<MediaItem> {
    registry.enumerator_mut(key).and_then(|e| e.current())
}

pub(crate) fn advance_primary(registry: &mut dyn EnumeratorRegistry, key: &CollectionKey) {
    if let Some(enumerator) = registry.enumerator_mut(key) {
        enumerator.move_next();
    }
}
