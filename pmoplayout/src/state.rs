//! État immuable du builder.
//!
//! `PlayoutBuilderState` n'est jamais muté sur place. Chaque transition
//! est une méthode `&self -> Self` qui renvoie le prochain état, de la
//! même façon que les aides d'avancement de piste de `pmoplaylist`
//! renvoient un nouveau `Track` plutôt que d'en muter un derrière un
//! verrou. Cela garde la boucle de build principale exempte de mutabilité
//! interne et rend trivial un build annulé-puis-repris : l'appelant n'a
//! qu'à conserver le dernier `PlayoutBuilderState` qu'il a reçu.

use chrono::{DateTime, Utc};

use crate::config::PlayoutBuilderConfig;

/// Instantané de tout ce dont le builder a besoin pour reprendre un build :
/// où l'on en est en temps d'horloge, quel élément de planning vient
/// ensuite, le compteur de guide group courant, et quel que soit le
/// suivi de progression en cours que porte l'ordonnanceur de mode de
/// l'élément de planning actuel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayoutBuilderState {
    pub current_time: DateTime<Utc>,
    pub schedule_index: usize,
    pub next_guide_group: i32,
    pub in_flood: bool,
    pub multiple_remaining: Option<u32>,
    pub duration_finish: Option<DateTime<Utc>>,
    pub in_duration_filler: bool,
}

impl PlayoutBuilderState {
    pub fn new(current_time: DateTime<Utc>) -> Self {
        Self {
            current_time,
            schedule_index: 0,
            next_guide_group: 0,
            in_flood: false,
            multiple_remaining: None,
            duration_finish: None,
            in_duration_filler: false,
        }
    }

    /// Amorce le compteur de guide group depuis `config` plutôt que zéro,
    /// pour un build qui continue la numérotation des guide groups d'une
    /// chaîne d'une exécution à l'autre.
    pub fn new_with_config(current_time: DateTime<Utc>, config: &PlayoutBuilderConfig) -> Self {
        Self {
            next_guide_group: config.guide_group_seed,
            ..Self::new(current_time)
        }
    }

    pub fn with_current_time(&self, current_time: DateTime<Utc>) -> Self {
        Self {
            current_time,
            ..self.clone()
        }
    }

    pub fn with_schedule_index(&self, schedule_index: usize) -> Self {
        Self {
            schedule_index,
            ..self.clone()
        }
    }

    /// Renvoie le prochain état (compteur incrémenté) et le guide group que
    /// l'appelant doit estampiller sur l'élément primaire qu'il s'apprête à
    /// construire. Appelée une fois par sélection de primaire distincte,
    /// jamais une fois par élément de filler, de sorte que les guide
    /// groups partitionnent des séquences primaire+filler plutôt que des
    /// éléments individuels.
    pub fn advance_guide_group(&self) -> (Self, i32) {
        let group = self.next_guide_group;
        (
            Self {
                next_guide_group: group + 1,
                ..self.clone()
            },
            group,
        )
    }

    pub fn enter_flood(&self) -> Self {
        Self {
            in_flood: true,
            ..self.clone()
        }
    }

    pub fn exit_flood(&self) -> Self {
        Self {
            in_flood: false,
            ..self.clone()
        }
    }

    pub fn with_multiple_remaining(&self, remaining: Option<u32>) -> Self {
        Self {
            multiple_remaining: remaining,
            ..self.clone()
        }
    }

    pub fn with_duration_finish(&self, finish: Option<DateTime<Utc>>) -> Self {
        Self {
            duration_finish: finish,
            ..self.clone()
        }
    }

    pub fn with_in_duration_filler(&self, flag: bool) -> Self {
        Self {
            in_duration_filler: flag,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 27, hour, minute, 0).unwrap()
    }

    #[test]
    fn guide_group_increments_monotonically() {
        let state = PlayoutBuilderState::new(t(0, 0));
        let (state, g0) = state.advance_guide_group();
        let (state, g1) = state.advance_guide_group();
        let (_state, g2) = state.advance_guide_group();
        assert_eq!([g0, g1, g2], [0, 1, 2]);
    }

    #[test]
    fn transitions_never_mutate_the_source() {
        let original = PlayoutBuilderState::new(t(0, 0));
        let advanced = original.with_current_time(t(1, 0));
        assert_eq!(original.current_time, t(0, 0));
        assert_eq!(advanced.current_time, t(1, 0));
    }
}
