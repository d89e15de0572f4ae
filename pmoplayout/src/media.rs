//! La vue du builder sur un élément média unique : juste assez pour le
//! planifier, jamais assez pour le jouer. Décodage, transcodage et
//! résolution de fichier restent hors périmètre.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{PlayoutError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaItemId(pub String);

impl MediaItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MediaItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Un marqueur de chapitre dans la propre ligne de temps d'un élément
/// média, exprimé comme une plage de décalage depuis le début du fichier.
/// `start < end <= item.duration` est imposé dans [`MediaItem::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaChapter {
    pub start: Duration,
    pub end: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaItemId,
    pub duration: Duration,
    chapters: Vec<MediaChapter>,
}

impl MediaItem {
    /// Construit un élément média, en rejetant les listes de chapitres qui
    /// ne sont pas des plages triées, non adjacentes, sûres, dans
    /// `[0, duration]`.
    pub fn new(id: MediaItemId, duration: Duration, chapters: Vec<MediaChapter>) -> Result<Self> {
        let mut previous_end = Duration::zero();
        for chapter in &chapters {
            if chapter.start < previous_end || chapter.end <= chapter.start {
                return Err(PlayoutError::Fatal(
                    "media chapters must be sorted, non-overlapping and non-empty".into(),
                ));
            }
            if chapter.end > duration {
                return Err(PlayoutError::Fatal(
                    "media chapter extends past the item's duration".into(),
                ));
            }
            previous_end = chapter.end;
        }
        Ok(Self {
            id,
            duration,
            chapters,
        })
    }

    pub fn without_chapters(id: MediaItemId, duration: Duration) -> Self {
        Self {
            id,
            duration,
            chapters: Vec::new(),
        }
    }

    pub fn chapters(&self) -> &[MediaChapter] {
        &self.chapters
    }
}
