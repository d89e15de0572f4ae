//! # pmoplayout - moteur de planification de diffusion linéaire
//!
//! Construit une séquence de `PlayoutItem` horodatée à partir d'un
//! planning de diffusion (`ProgramScheduleItem`) et d'un jeu de collections
//! de médias accessibles via `CollectionEnumerator`. Le cœur du moteur est
//! synchrone et mono-thread (§5) ; l'annulation coopérative se vérifie par
//! `tokio_util::sync::CancellationToken::is_cancelled()`, jamais via `.await`.
//!
//! Les scanners de bibliothèque, les dépôts persistants, la maintenance de
//! l'index de recherche et tout ce qui touche à l'UI/HTTP restent hors
//! champ : seules les interfaces consommées sont exposées (`collaborators`).
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use pmoplayout::enumerator::{CollectionEnumerator, VecEnumerator};
//! use pmoplayout::error::TracingBuildLog;
//! use pmoplayout::media::{MediaItem, MediaItemId};
//! use pmoplayout::schedule::{CollectionKey, ProgramScheduleItem, ScheduleItemBase, StartType};
//! use pmoplayout::state::PlayoutBuilderState;
//! use pmoplayout::time::SystemLocalClock;
//! use std::collections::HashMap;
//! use tokio_util::sync::CancellationToken;
//!
//! let key = CollectionKey::Collection(1);
//! let mut registry: HashMap<CollectionKey, Box<dyn CollectionEnumerator>> = HashMap::new();
//! registry.insert(
//!     key.clone(),
//!     Box::new(VecEnumerator::cyclic(vec![MediaItem::without_chapters(
//!         MediaItemId::new("m1"),
//!         chrono::Duration::minutes(30),
//!     )])),
//! );
//!
//! let schedule = vec![ProgramScheduleItem::once(ScheduleItemBase::new(
//!     0,
//!     key,
//!     StartType::Dynamic,
//! ))];
//!
//! let state = PlayoutBuilderState::new(Utc.with_ymd_and_hms(2026, 7, 27, 10, 0, 0).unwrap());
//! let hard_stop = Utc.with_ymd_and_hms(2026, 7, 27, 12, 0, 0).unwrap();
//! let (_final_state, items) = pmoplayout::builder::build_playout(
//!     &schedule,
//!     &mut registry,
//!     state,
//!     hard_stop,
//!     &CancellationToken::new(),
//!     &SystemLocalClock,
//!     &TracingBuildLog,
//! )
//! .unwrap();
//! assert_eq!(items.len(), 1);
//! ```

pub mod builder;
pub mod collaborators;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod filler;
pub mod item;
pub mod media;
pub mod modes;
pub mod schedule;
pub mod state;
pub mod time;

pub use builder::build_playout;
pub use error::{PlayoutError, Result};
pub use item::PlayoutItem;
