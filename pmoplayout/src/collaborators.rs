//! Contrats des collaborateurs (spec.md §6) : interfaces qu'un appelant
//! implémente et fournit à [`crate::builder::build_playout`], mais dont
//! l'implémentation sort du périmètre de cette crate — ni système de
//! fichiers, ni backend de recherche, ni UI de progression ne vivent ici,
//! seulement les traits sur lesquels le code en aval se construit.

use std::error::Error;

/// Accès en lecture aux fichiers média qu'un
/// [`MediaItem`](crate::media::MediaItem) référence. Hors périmètre :
/// `pmoplayout` n'a besoin que de la durée et des chapitres d'un élément,
/// déjà portés par `MediaItem` lui-même : ce trait existe pour que la couche
/// système de fichiers d'un appelant ait un contrat nommé à implémenter, pas
/// parce que le builder l'appelle.
pub trait LocalFileSystem {
    fn exists(&self, path: &str) -> bool;
}

/// Le collaborateur d'index de recherche que spec.md §6 décrit comme
/// recevant le commit des lignes de playout une fois un build terminé.
pub trait SearchIndex {
    fn commit(&mut self) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Puits de rapport de progression pour un build de longue durée.
pub trait ProgressSink {
    fn report(&mut self, schedule_index: usize, schedule_len: usize);
}

/// Garantit que [`SearchIndex::commit`] s'exécute exactement une fois par
/// build, sur chaque chemin de sortie, y compris un retour anticipé ou un
/// déroulement de panique — fondé sur la forme take-then-join de
/// `pmoparadise::paradise::channel::ParadiseChannel::shutdown`, généralisée
/// ici en garde puisque le cœur n'a pas de tâche worker à joindre, seulement
/// un unique appel de collaborateur à garantir.
///
/// Appeler [`CommitGuard::finish`] sur le chemin de succès pour committer
/// immédiatement et observer son `Result` ; sinon `Drop` committe au mieux
/// et avale l'erreur (il n'y a plus personne à qui la rapporter à ce
/// stade).
pub struct CommitGuard<'a, I: SearchIndex> {
    index: &'a mut I,
    committed: bool,
}

impl<'a, I: SearchIndex> CommitGuard<'a, I> {
    pub fn new(index: &'a mut I) -> Self {
        Self { index, committed: false }
    }

    /// Committe immédiatement et marque la garde comme réglée, pour que
    /// `Drop` ne committe pas une seconde fois.
    pub fn finish(mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.committed = true;
        self.index.commit()
    }
}

impl<'a, I: SearchIndex> Drop for CommitGuard<'a, I> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.index.commit();
        }
    }
}
