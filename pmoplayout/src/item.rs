//! L'unique type de sortie du builder.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::filler::FillerKind;
use crate::media::MediaItemId;

/// Une tranche d'antenne : un élément média (ou un filler) avec un début et
/// une fin concrets en UTC. C'est la forme de ligne persistée par les
/// appelants ; l'aller-retour via `serde_json` doit être sans perte
/// (`in_point`/`out_point` inclus), car la ligne persistée, pas cette
/// struct, fait foi d'un redémarrage de processus à l'autre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoutItem {
    pub media_item_id: MediaItemId,
    pub start: DateTime<Utc>,
    pub finish: DateTime<Utc>,
    pub in_point: Duration,
    pub out_point: Duration,
    pub guide_group: i32,
    pub filler_kind: FillerKind,
    pub disable_watermarks: bool,
}

impl PlayoutItem {
    /// `finish - start`, c'est-à-dire la durée d'horloge que couvre cet
    /// élément. Pour un élément de bourrage de repli, c'est le manque qu'il
    /// a été dimensionné à combler, pas `out_point - in_point` (qui vaut
    /// zéro par convention pour le repli).
    pub fn span(&self) -> Duration {
        self.finish - self.start
    }
}
