//! Le planning de programme : une liste étiquetée de règles décrivant
//! comment peupler les plages du playout (spec §3, §4.3).

use chrono::{Duration, NaiveTime};

use crate::filler::FillerPreset;

/// Clé hachable à égalité structurelle identifiant une collection média.
///
/// Spec §3 laisse la forme exacte ouverte (« un composite de
/// `{collectionType, ids…}` ») ; ceci la réalise comme l'ensemble concret
/// de genres de collection qu'un scanner adossé à une bibliothèque
/// exposerait, puisque les ordonnanceurs de mode ont besoin d'une clé de
/// map concrète pour indexer leurs énumérateurs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Collection(u64),
    Show(u64),
    Season(u64),
    Artist(u64),
    MultiCollection(Vec<u64>),
}

/// Quand commence la plage de lecture d'un élément de planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    /// Continue là où l'élément précédent s'est arrêté.
    Dynamic,
    /// S'ancre à une heure locale précise (spec §4.1), sauf si l'élément
    /// est en cours de progression.
    Fixed,
}

/// Ce qui se passe une fois le contenu primaire d'un élément `Duration`
/// épuisé mais avant `DurationFinish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    /// Draine `TailFiller` jusqu'à `DurationFinish`.
    Filler,
    /// Laisse la plage restante vide et fait sauter l'horloge à `DurationFinish`.
    Offline,
}

/// Le contenu étiqueté par variante d'un élément de planning (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleItemKind {
    /// Joue exactement un élément primaire.
    Once,
    /// Continue d'émettre des primaires jusqu'à ce que le prochain élément
    /// à démarrage fixe soit dû.
    Flood,
    /// Joue exactement `count` primaires.
    Multiple { count: u32 },
    /// Remplit l'équivalent de `playout_duration` de primaires, puis
    /// applique `tail_mode`.
    Duration {
        playout_duration: Duration,
        tail_mode: TailMode,
    },
}

/// Champs partagés par chaque variante d'élément de planning : quelle
/// collection piocher, quand démarrer, et les cinq emplacements de filler
/// (plus tail/fallback) qui enveloppent les primaires que cet élément
/// sélectionne.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleItemBase {
    pub index: usize,
    pub collection_key: CollectionKey,
    pub start_type: StartType,
    pub start_time: Option<NaiveTime>,
    pub pre_roll_filler: Option<FillerPreset>,
    pub mid_roll_enter_filler: Option<FillerPreset>,
    pub mid_roll_filler: Option<FillerPreset>,
    pub mid_roll_exit_filler: Option<FillerPreset>,
    pub post_roll_filler: Option<FillerPreset>,
    pub tail_filler: Option<FillerPreset>,
    pub fallback_filler: Option<FillerPreset>,
}

impl ScheduleItemBase {
    pub fn new(index: usize, collection_key: CollectionKey, start_type: StartType) -> Self {
        Self {
            index,
            collection_key,
            start_type,
            start_time: None,
            pre_roll_filler: None,
            mid_roll_enter_filler: None,
            mid_roll_filler: None,
            mid_roll_exit_filler: None,
            post_roll_filler: None,
            tail_filler: None,
            fallback_filler: None,
        }
    }

    pub fn with_start_time(mut self, start_time: NaiveTime) -> Self {
        self.start_time = Some(start_time);
        self
    }

    pub fn with_pre_roll_filler(mut self, filler: FillerPreset) -> Self {
        self.pre_roll_filler = Some(filler);
        self
    }

    pub fn with_mid_roll_enter_filler(mut self, filler: FillerPreset) -> Self {
        self.mid_roll_enter_filler = Some(filler);
        self
    }

    pub fn with_mid_roll_filler(mut self, filler: FillerPreset) -> Self {
        self.mid_roll_filler = Some(filler);
        self
    }

    pub fn with_mid_roll_exit_filler(mut self, filler: FillerPreset) -> Self {
        self.mid_roll_exit_filler = Some(filler);
        self
    }

    pub fn with_post_roll_filler(mut self, filler: FillerPreset) -> Self {
        self.post_roll_filler = Some(filler);
        self
    }

    pub fn with_tail_filler(mut self, filler: FillerPreset) -> Self {
        self.tail_filler = Some(filler);
        self
    }

    pub fn with_fallback_filler(mut self, filler: FillerPreset) -> Self {
        self.fallback_filler = Some(filler);
        self
    }
}

/// Une règle du planning de programme (spec §3 `ProgramScheduleItem`).
///
/// Variantes à champs nommés partout, suivant la note de conception
/// contre les fuites de tuples positionnels : `base` porte les attributs
/// partagés, `kind` le contenu propre à la variante.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramScheduleItem {
    base: ScheduleItemBase,
    kind: ScheduleItemKind,
}

impl ProgramScheduleItem {
    pub fn once(base: ScheduleItemBase) -> Self {
        Self {
            base,
            kind: ScheduleItemKind::Once,
        }
    }

    pub fn flood(base: ScheduleItemBase) -> Self {
        Self {
            base,
            kind: ScheduleItemKind::Flood,
        }
    }

    pub fn multiple(base: ScheduleItemBase, count: u32) -> Self {
        Self {
            base,
            kind: ScheduleItemKind::Multiple { count },
        }
    }

    pub fn duration(base: ScheduleItemBase, playout_duration: Duration, tail_mode: TailMode) -> Self {
        Self {
            base,
            kind: ScheduleItemKind::Duration {
                playout_duration,
                tail_mode,
            },
        }
    }

    pub fn base(&self) -> &ScheduleItemBase {
        &self.base
    }

    pub fn kind(&self) -> &ScheduleItemKind {
        &self.kind
    }

    pub fn index(&self) -> usize {
        self.base.index
    }
}
