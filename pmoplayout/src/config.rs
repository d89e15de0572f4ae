//! Configuration du builder et son point d'injection.
//!
//! Reprend le motif d'extension par trait que `pmoplaylist::config_ext` et
//! ses semblables utilisent pour accrocher une config de domaine sur un
//! type de config partagé : ici il n'y a pas de type de config partagé à
//! étendre, donc `ConfigSource` est le point d'injection lui-même — un
//! appelant branché sur un fichier, l'environnement, ou une constante peut
//! tous le satisfaire sans que `pmoplayout` dépende directement de
//! `pmoconfig`.

use crate::error::Result;

/// Configuration globale du builder. Démarre volontairement réduite
/// (spec.md laisse la plupart de ceci implicite) ; `Default` couvre le cas
/// courant où les guide groups démarrent à zéro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayoutBuilderConfig {
    pub guide_group_seed: i32,
}

impl Default for PlayoutBuilderConfig {
    fn default() -> Self {
        Self { guide_group_seed: 0 }
    }
}

/// Charge une [`PlayoutBuilderConfig`] depuis l'endroit où un appelant la
/// conserve.
pub trait ConfigSource {
    fn load(&self) -> Result<PlayoutBuilderConfig>;
}

/// [`ConfigSource`] trivial qui renvoie toujours la même valeur, pour les
/// appelants qui construisent leur config en code plutôt que de la charger.
#[derive(Debug, Clone, Copy)]
pub struct StaticConfigSource(pub PlayoutBuilderConfig);

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<PlayoutBuilderConfig> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_seeds_guide_group_at_zero() {
        assert_eq!(PlayoutBuilderConfig::default().guide_group_seed, 0);
    }

    #[test]
    fn static_source_returns_its_value() {
        let config = PlayoutBuilderConfig { guide_group_seed: 7 };
        let source = StaticConfigSource(config);
        assert_eq!(source.load().unwrap(), config);
    }
}
