//! Taxonomie d'erreurs et point d'injection de log pour le builder de
//! playout.
//!
//! Reprend la forme des modules `error.rs` des autres crates de cet espace
//! de travail : une enum `thiserror::Error` avec un alias `Result<T>` local
//! à la crate, plus un fourre-tout transparent pour tout ce qui remonte
//! d'un collaborateur.

use crate::item::PlayoutItem;
use crate::schedule::CollectionKey;
use crate::state::PlayoutBuilderState;

/// Erreurs produites pendant la construction d'un playout.
///
/// `CollectionEmpty` et `BadConfiguration` sont toujours récupérées
/// localement par le composant qui les rencontre (journalisées via
/// [`BuildLog`], jamais renvoyées à l'appelant de
/// [`crate::build_playout`]) ; elles figurent ici parce qu'elles font
/// quand même partie de la taxonomie sur laquelle le builder raisonne en
/// interne.
#[derive(Debug, thiserror::Error)]
pub enum PlayoutError {
    /// Annulation coopérative observée entre deux éléments de planning.
    /// Porte tout ce qui a déjà été construit pour qu'un build annulé ne
    /// soit pas une perte totale.
    #[error("playout build was canceled")]
    ScanCanceled {
        state: Box<PlayoutBuilderState>,
        items: Vec<PlayoutItem>,
    },

    /// La configuration de filler d'un élément de planning est invalide
    /// (par ex. plus d'un emplacement pad-to-nearest-minute, ou un filler
    /// de type count sans compte).
    #[error("bad filler configuration: {0}")]
    BadConfiguration(String),

    /// L'énumérateur d'une collection n'a produit aucun élément courant.
    #[error("collection is empty: {0:?}")]
    CollectionEmpty(CollectionKey),

    /// Un collaborateur (métadonnées, illustrations, sous-titres) a levé
    /// une erreur pendant que le builder assemblait un élément. L'élément
    /// concerné est sauté.
    #[error("collaborator fault: {0}")]
    CollaboratorFault(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Un invariant a été violé dont le builder ne peut pas se remettre.
    #[error("fatal invariant violation: {0}")]
    Fatal(String),
}

pub type Result<T> = std::result::Result<T, PlayoutError>;

/// Puits pour les diagnostics levés pendant un build.
///
/// Injecté plutôt qu'utilisé comme un logger global au processus, suivant
/// la note de conception contre les globales mutables `_logger` : c'est à
/// l'appelant de décider si cela veut dire relayer vers `tracing`,
/// collecter dans un tampon de test, ou tout simplement jeter.
pub trait BuildLog: std::fmt::Debug {
    fn log_warn(&self, message: &str);
    fn log_error(&self, message: &str);
}

/// [`BuildLog`] par défaut qui relaie vers `tracing`, dans le même style où
/// `pmoparadise`/`pmoradiofrance` appellent `tracing::{warn, error}` sur le
/// site d'appel plutôt que via un handle de logger conservé.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBuildLog;

impl BuildLog for TracingBuildLog {
    fn log_warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn log_error(&self, message: &str) {
        tracing::error!("{message}");
    }
}
