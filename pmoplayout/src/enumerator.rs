//! Le curseur de collection que consomment les ordonnanceurs de mode et le
//! compositeur de filler.
//!
//! Les collections de production (dossiers de bibliothèque, séries,
//! saisons, playlists) vivent hors de cette crate ; `pmoplayout` ne dépend
//! que de ce trait, et fournit en plus [`VecEnumerator`] comme
//! implémentation de référence pour que la crate soit exécutable et
//! testable seule.

use std::collections::HashMap;

use chrono::Duration;

use crate::media::MediaItem;
use crate::schedule::CollectionKey;

/// Un curseur sur une séquence ordonnée d'éléments média.
///
/// L'ordre (séquentiel, mélangé, aléatoire, adossé à une playlist) est
/// interne à l'implémentation ; l'ordonnanceur ne compte que sur « finit par
/// produire assez d'éléments ». Pas sûr pour un accès concurrent — le build
/// possède chaque énumérateur qu'il touche pour toute sa durée (spec §5).
pub trait CollectionEnumerator: std::fmt::Debug {
    /// L'élément au curseur, ou `None` seulement pour une collection vide.
    fn current(&self) -> Option<MediaItem>;

    /// Avance le curseur. Renvoie `false` si la collection est épuisée et
    /// continuera de renvoyer `None` depuis `current`.
    fn move_next(&mut self) -> bool;

    /// Une borne inférieure sur la durée de tout élément que le curseur
    /// pourrait encore produire, utilisée par le drainage de filler en mode
    /// Duration pour s'arrêter sans parcourir tous les éléments restants.
    /// `None` signifie que la collection est (ou est devenue) vide.
    fn minimum_duration(&self) -> Option<Duration>;
}

/// Recherche l'énumérateur associé à une [`CollectionKey`].
///
/// Les ordonnanceurs de mode et le compositeur de filler sont génériques
/// sur ce trait plutôt que sur une `HashMap` concrète, pour que les tests
/// puissent substituer un registre plus petit sans construire la forme
/// complète de la map.
pub trait EnumeratorRegistry {
    fn enumerator_mut(&mut self, key: &CollectionKey) -> Option<&mut dyn CollectionEnumerator>;
}

impl EnumeratorRegistry for HashMap<CollectionKey, Box<dyn CollectionEnumerator>> {
    fn enumerator_mut(&mut self, key: &CollectionKey) -> Option<&mut dyn CollectionEnumerator> {
        self.get_mut(key).map(|boxed| boxed.as_mut())
    }
}

/// Énumérateur en mémoire, cyclique par défaut, sur un `Vec<MediaItem>`
/// fixe.
///
/// Ce n'est pas l'énumérateur du scanner de production (hors périmètre
/// selon spec §1) — il existe pour que les propres tests de `pmoplayout`,
/// et tout appelant sans énumérateur adossé à une bibliothèque, aient
/// quelque chose de concret contre quoi construire.
#[derive(Debug, Clone)]
pub struct VecEnumerator {
    items: Vec<MediaItem>,
    position: usize,
    cyclic: bool,
}

impl VecEnumerator {
    /// Revient au premier élément une fois le dernier consommé.
    pub fn cyclic(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            position: 0,
            cyclic: true,
        }
    }

    /// S'épuise après le dernier élément au lieu de boucler.
    pub fn once_through(items: Vec<MediaItem>) -> Self {
        Self {
            items,
            position: 0,
            cyclic: false,
        }
    }
}

impl CollectionEnumerator for VecEnumerator {
    fn current(&self) -> Option<MediaItem> {
        self.items.get(self.position).cloned()
    }

    fn move_next(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.position += 1;
        if self.position >= self.items.len() {
            if self.cyclic {
                self.position = 0;
                true
            } else {
                self.position = self.items.len();
                false
            }
        } else {
            true
        }
    }

    fn minimum_duration(&self) -> Option<Duration> {
        if self.position >= self.items.len() && !self.cyclic {
            return None;
        }
        self.items.iter().map(|item| item.duration).min()
    }
}
