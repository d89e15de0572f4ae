//! Le compositeur de filler (spec §4.4) — le sous-système le plus ardu :
//! enveloppe un élément média primaire de filler pre-roll, mid-roll
//! entrelacé aux chapitres, post-roll, tail et fallback, puis rembourre le
//! résultat jusqu'à une borne d'horloge.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::enumerator::EnumeratorRegistry;
use crate::error::{BuildLog, PlayoutError, Result};
use crate::item::PlayoutItem;
use crate::media::{MediaChapter, MediaItem, MediaItemId};
use crate::schedule::{CollectionKey, ProgramScheduleItem, ScheduleItemBase};

/// Quel rôle joue un filler (ou le primaire) dans la séquence composée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillerKind {
    None,
    PreRoll,
    MidRoll,
    MidRollEnter,
    MidRollExit,
    PostRoll,
    Tail,
    Fallback,
}

/// Comment un emplacement de filler décide combien de sa collection
/// consommer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerMode {
    /// Draine des éléments tant qu'ils tiennent dans un budget de durée
    /// cible.
    Duration,
    /// Draine exactement un nombre fixe d'éléments.
    Count,
    /// Étend la durée totale jusqu'au prochain multiple d'horloge de N
    /// minutes.
    Pad,
}

/// Une configuration de filler validée pour un emplacement d'un élément de
/// planning.
///
/// Construite uniquement via les constructeurs intelligents ci-dessous,
/// qui imposent les invariants de mode de spec §3 (`Duration` a besoin
/// d'une durée, `Count` a besoin d'un compte, `Pad` a besoin d'une cible
/// de remplissage et n'est légal que sur pre/mid/post-roll) dès la
/// construction plutôt qu'en échouant à l'usage — résolvant la Question
/// Ouverte 3 de spec §9 au niveau du typage.
#[derive(Debug, Clone, PartialEq)]
pub struct FillerPreset {
    pub kind: FillerKind,
    pub mode: FillerMode,
    pub duration: Option<Duration>,
    pub count: Option<u32>,
    pub pad_to_nearest_minute: Option<u32>,
    pub allow_watermarks: bool,
    pub collection_key: CollectionKey,
}

impl FillerPreset {
    pub fn duration(
        kind: FillerKind,
        collection_key: CollectionKey,
        duration: Duration,
        allow_watermarks: bool,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            mode: FillerMode::Duration,
            duration: Some(duration),
            count: None,
            pad_to_nearest_minute: None,
            allow_watermarks,
            collection_key,
        })
    }

    pub fn count(
        kind: FillerKind,
        collection_key: CollectionKey,
        count: u32,
        allow_watermarks: bool,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            mode: FillerMode::Count,
            duration: None,
            count: Some(count),
            pad_to_nearest_minute: None,
            allow_watermarks,
            collection_key,
        })
    }

    pub fn pad(
        kind: FillerKind,
        collection_key: CollectionKey,
        pad_to_nearest_minute: u32,
        allow_watermarks: bool,
    ) -> Result<Self> {
        if !matches!(kind, FillerKind::PreRoll | FillerKind::MidRoll | FillerKind::PostRoll) {
            return Err(PlayoutError::BadConfiguration(
                "pad filler must be pre-roll, mid-roll or post-roll".into(),
            ));
        }
        if pad_to_nearest_minute == 0 {
            return Err(PlayoutError::BadConfiguration(
                "pad-to-nearest-minute must be positive".into(),
            ));
        }
        Ok(Self {
            kind,
            mode: FillerMode::Pad,
            duration: None,
            count: None,
            pad_to_nearest_minute: Some(pad_to_nearest_minute),
            allow_watermarks,
            collection_key,
        })
    }
}

/// Un élément composé avant le réestampillage temporel : tout sauf
/// `start`/`finish`.
#[derive(Debug, Clone)]
struct Draft {
    kind: FillerKind,
    /// `Some(i)` marque ce brouillon comme la i-ème tranche de chapitre du
    /// primaire ; utilisé par la passe de remplissage mid-roll pour
    /// trouver les points d'insertion des écarts.
    chapter_index: Option<usize>,
    media_item_id: MediaItemId,
    span: Duration,
    in_point: Duration,
    out_point: Duration,
    disable_watermarks: bool,
}

impl Draft {
    fn primary(item: &MediaItem) -> Self {
        Self {
            kind: FillerKind::None,
            chapter_index: None,
            media_item_id: item.id.clone(),
            span: item.duration,
            in_point: Duration::zero(),
            out_point: item.duration,
            disable_watermarks: false,
        }
    }

    fn chapter(item: &MediaItem, index: usize, chapter: MediaChapter) -> Self {
        Self {
            kind: FillerKind::None,
            chapter_index: Some(index),
            media_item_id: item.id.clone(),
            span: chapter.end - chapter.start,
            in_point: chapter.start,
            out_point: chapter.end,
            disable_watermarks: false,
        }
    }

    fn media(kind: FillerKind, item: &MediaItem, allow_watermarks: bool) -> Self {
        Self {
            kind,
            chapter_index: None,
            media_item_id: item.id.clone(),
            span: item.duration,
            in_point: Duration::zero(),
            out_point: item.duration,
            disable_watermarks: !allow_watermarks,
        }
    }

    /// Un élément de repli couvrant exactement `span`, avec `out_point = 0`
    /// (spec §4.5, §9 : un contrat documenté « jouer jusqu'à Finish »).
    fn fallback(media_item_id: MediaItemId, span: Duration, allow_watermarks: bool) -> Self {
        Self {
            kind: FillerKind::Fallback,
            chapter_index: None,
            media_item_id,
            span,
            in_point: Duration::zero(),
            out_point: Duration::zero(),
            disable_watermarks: !allow_watermarks,
        }
    }
}

/// Draine l'énumérateur de `registry` pour `preset.collection_key` tant
/// que l'élément au curseur tient dans `budget`. Les éléments trop longs
/// pour le budget restant sont sautés (jamais tronqués) mais l'énumérateur
/// avance quand même au-delà ; le drainage se termine une fois qu'aucun
/// élément restant ne pourrait tenir, selon l'indice `minimum_duration` de
/// l'énumérateur, ou une fois l'énumérateur épuisé (sémantique du mode
/// Duration de spec §4.4).
fn drain_duration_filler(
    registry: &mut dyn EnumeratorRegistry,
    preset: &FillerPreset,
    budget: Duration,
    kind: FillerKind,
) -> Vec<Draft> {
    let mut drafts = Vec::new();
    let Some(enumerator) = registry.enumerator_mut(&preset.collection_key) else {
        return drafts;
    };
    let mut remaining = budget;
    while remaining > Duration::zero() {
        let Some(min_duration) = enumerator.minimum_duration() else {
            break;
        };
        if remaining < min_duration {
            break;
        }
        let Some(candidate) = enumerator.current() else {
            break;
        };
        if candidate.duration <= remaining {
            remaining = remaining - candidate.duration;
            drafts.push(Draft::media(kind, &candidate, preset.allow_watermarks));
        }
        if !enumerator.move_next() {
            break;
        }
    }
    drafts
}

/// Ajoute exactement `preset.count` éléments sans égard à leur propre
/// durée (sémantique du mode Count de spec §4.4).
fn drain_count_filler(
    registry: &mut dyn EnumeratorRegistry,
    preset: &FillerPreset,
    kind: FillerKind,
) -> Vec<Draft> {
    let mut drafts = Vec::new();
    let Some(count) = preset.count else {
        return drafts;
    };
    let Some(enumerator) = registry.enumerator_mut(&preset.collection_key) else {
        return drafts;
    };
    for _ in 0..count {
        let Some(candidate) = enumerator.current() else {
            break;
        };
        drafts.push(Draft::media(kind, &candidate, preset.allow_watermarks));
        if !enumerator.move_next() {
            break;
        }
    }
    drafts
}

/// Distribue un emplacement de filler non-pad vers la routine de
/// drainage de son mode.
fn drain_filler(registry: &mut dyn EnumeratorRegistry, preset: &FillerPreset, kind: FillerKind) -> Vec<Draft> {
    match preset.mode {
        FillerMode::Duration => {
            drain_duration_filler(registry, preset, preset.duration.unwrap_or_else(Duration::zero), kind)
        }
        FillerMode::Count => drain_count_filler(registry, preset, kind),
        FillerMode::Pad => Vec::new(),
    }
}

/// Construit un brouillon de repli en regardant l'id de l'élément courant
/// de la collection de repli (si une est configurée) et en dimensionnant
/// le brouillon à exactement `span`.
fn fallback_draft(
    registry: &mut dyn EnumeratorRegistry,
    fallback: &Option<FillerPreset>,
    span: Duration,
) -> Option<Draft> {
    if span <= Duration::zero() {
        return None;
    }
    let preset = fallback.as_ref()?;
    let media_item_id = registry
        .enumerator_mut(&preset.collection_key)
        .and_then(|e| e.current())
        .map(|m| m.id)
        .unwrap_or_else(|| MediaItemId::new("fallback"));
    Some(Draft::fallback(media_item_id, span, preset.allow_watermarks))
}

/// Entrelace les chapitres avec l'enter/body/exit mid-roll dans les
/// écarts entre eux (spec §4.4 « Cadrage mid-roll »). Quand le filler
/// mid-roll configuré est lui-même l'emplacement pad, chaque écart est
/// laissé vide ici — il est rempli entièrement par la passe de
/// remplissage, qui possède le placement des écarts mid-roll dans ce
/// cas.
fn interleave_chapters(
    registry: &mut dyn EnumeratorRegistry,
    base: &ScheduleItemBase,
    primary: &MediaItem,
    chapters: &[MediaChapter],
    drafts: &mut Vec<Draft>,
) {
    let mid_is_pad = base
        .mid_roll_filler
        .as_ref()
        .map(|p| p.mode == FillerMode::Pad)
        .unwrap_or(false);

    for (index, chapter) in chapters.iter().enumerate() {
        drafts.push(Draft::chapter(primary, index, *chapter));

        if index + 1 == chapters.len() || mid_is_pad {
            continue;
        }

        let enter_start = drafts.len();
        if let Some(enter) = &base.mid_roll_enter_filler {
            drafts.extend(drain_filler(registry, enter, FillerKind::MidRollEnter));
        }

        let body = base
            .mid_roll_filler
            .as_ref()
            .map(|mid| drain_filler(registry, mid, FillerKind::MidRoll))
            .unwrap_or_default();

        if body.is_empty() {
            // Spec §4.4 : « si un MidRollEnter est émis mais que le
            // contenu mid-roll suivant ne tient pas, le MidRollEnter est
            // annulé et aucun MidRollExit n'est émis. »
            drafts.truncate(enter_start);
        } else {
            drafts.extend(body);
            if let Some(exit) = &base.mid_roll_exit_filler {
                drafts.extend(drain_filler(registry, exit, FillerKind::MidRollExit));
            }
        }
    }
}

/// Arrondit `instant` à la prochaine minute d'horloge multiple de
/// `pad_minutes`, selon spec §4.4 étape 2 (« `endMinute` ... arrondir au
/// prochain multiple de M ; ancrer `targetTime` à cette minute d'horloge
/// avec second=0 »). Opère sur la minute-de-l'heure, donc un arrondi qui
/// dépasse 60 bascule dans l'heure suivante (et au-delà) via
/// l'arithmétique `DateTime` ordinaire.
fn round_up_to_pad_minute(instant: DateTime<Utc>, pad_minutes: u32) -> DateTime<Utc> {
    let hour_floor = instant
        - Duration::minutes(instant.minute() as i64)
        - Duration::seconds(instant.second() as i64)
        - Duration::nanoseconds(instant.nanosecond() as i64);
    let minute = instant.minute();
    let exactly_on_boundary =
        minute % pad_minutes == 0 && instant.second() == 0 && instant.nanosecond() == 0;
    let target_minute = if exactly_on_boundary {
        minute
    } else {
        (minute / pad_minutes + 1) * pad_minutes
    };
    hour_floor + Duration::minutes(target_minute as i64)
}

/// La branche de remplissage mid-roll (spec §4.4) : répartit
/// `remaining_to_fill` également entre les écarts de chapitres, en plaçant
/// enter/body/exit par écart sous réserve d'un plafond par écart
/// (`average`) et d'un plafond global (`remaining_to_fill`). Met de côté
/// tout élément post-roll déjà placé pour que le contenu d'écart ne se
/// retrouve jamais après eux, en restaurant la queue une fois chaque
/// écart traité.
///
/// Résout la question ouverte de spec §9 : avec moins de deux chapitres
/// effectifs, il n'y a aucun écart où placer du contenu mid-roll, donc
/// tout le manque est poussé vers un repli post-roll plutôt que
/// silencieusement abandonné.
fn apply_mid_roll_pad(
    registry: &mut dyn EnumeratorRegistry,
    base: &ScheduleItemBase,
    chapters: &[MediaChapter],
    remaining_to_fill: Duration,
    drafts: &mut Vec<Draft>,
    log: &dyn BuildLog,
) {
    if chapters.len() < 2 {
        match fallback_draft(registry, &base.fallback_filler, remaining_to_fill) {
            Some(fb) => drafts.push(fb),
            None => log.log_warn(
                "mid-roll pad has no chapter gaps to fill and no fallback filler configured; shortfall dropped",
            ),
        }
        return;
    }

    let gaps = chapters.len() - 1;
    let average = remaining_to_fill / gaps as i32;
    let has_framing = base.mid_roll_enter_filler.is_some() || base.mid_roll_exit_filler.is_some();

    let mut lifted_post_roll = Vec::new();
    while matches!(drafts.last(), Some(d) if d.kind == FillerKind::PostRoll) {
        lifted_post_roll.push(drafts.pop().unwrap());
    }
    lifted_post_roll.reverse();

    let mut filled = Duration::zero();
    let mut rebuilt = Vec::with_capacity(drafts.len() * 2);
    let mut chapters_seen = 0usize;

    for draft in drafts.drain(..) {
        let is_chapter = draft.chapter_index.is_some();
        rebuilt.push(draft);
        if !is_chapter {
            continue;
        }
        let gap_index = chapters_seen;
        chapters_seen += 1;
        if gap_index + 1 >= chapters.len() {
            continue;
        }

        let mut gap_block = Vec::new();
        let mut enter_placed = false;
        if let Some(enter) = &base.mid_roll_enter_filler {
            let items = drain_filler(registry, enter, FillerKind::MidRollEnter);
            if !items.is_empty() {
                gap_block.extend(items);
                enter_placed = true;
            }
        }

        let mut gap_filled = Duration::zero();
        if let Some(mid) = &base.mid_roll_filler {
            if let Some(enumerator) = registry.enumerator_mut(&mid.collection_key) {
                loop {
                    if filled >= remaining_to_fill || gap_filled >= average {
                        break;
                    }
                    let Some(candidate) = enumerator.current() else {
                        break;
                    };
                    let cap = (average - gap_filled).min(remaining_to_fill - filled);
                    if candidate.duration <= cap && candidate.duration > Duration::zero() {
                        gap_block.push(Draft::media(FillerKind::MidRoll, &candidate, mid.allow_watermarks));
                        gap_filled = gap_filled + candidate.duration;
                        filled = filled + candidate.duration;
                        if !enumerator.move_next() {
                            break;
                        }
                    } else if !enumerator.move_next() {
                        break;
                    }
                }
            }
        }

        if gap_filled == Duration::zero() {
            if has_framing {
                if enter_placed {
                    gap_block.clear();
                }
            } else {
                let cap = average.min(remaining_to_fill - filled);
                if let Some(fb) = fallback_draft(registry, &base.fallback_filler, cap) {
                    filled = filled + cap;
                    gap_block.push(fb);
                }
            }
        } else if let Some(exit) = &base.mid_roll_exit_filler {
            gap_block.extend(drain_filler(registry, exit, FillerKind::MidRollExit));
        }

        rebuilt.extend(gap_block);
    }

    *drafts = rebuilt;
    drafts.extend(lifted_post_roll);
}

/// La passe de remplissage complète (spec §4.4 « Pad pass ») : calcule le
/// manque jusqu'à la prochaine borne d'horloge et distribue vers la
/// branche PreRoll/PostRoll/MidRoll selon l'emplacement en mode pad.
fn apply_pad_pass(
    registry: &mut dyn EnumeratorRegistry,
    base: &ScheduleItemBase,
    chapters: &[MediaChapter],
    pad_kind: FillerKind,
    drafts: &mut Vec<Draft>,
    start_offset: DateTime<Utc>,
    log: &dyn BuildLog,
) {
    let pad_preset = match pad_kind {
        FillerKind::PreRoll => base.pre_roll_filler.as_ref(),
        FillerKind::MidRoll => base.mid_roll_filler.as_ref(),
        FillerKind::PostRoll => base.post_roll_filler.as_ref(),
        _ => None,
    };
    let Some(pad_preset) = pad_preset else {
        return;
    };
    let Some(pad_minutes) = pad_preset.pad_to_nearest_minute.filter(|m| *m > 0) else {
        return;
    };

    let total_duration: Duration = drafts.iter().map(|d| d.span).sum();
    let projected_finish = start_offset + total_duration;
    let target_time = round_up_to_pad_minute(projected_finish, pad_minutes);
    let remaining_to_fill = target_time - projected_finish;
    if remaining_to_fill <= Duration::zero() {
        return;
    }

    match pad_kind {
        FillerKind::PreRoll => {
            let filled = drain_duration_filler(registry, pad_preset, remaining_to_fill, FillerKind::PreRoll);
            let filled_total: Duration = filled.iter().map(|d| d.span).sum();
            let shortfall = remaining_to_fill - filled_total;
            let mut block = filled;
            match fallback_draft(registry, &base.fallback_filler, shortfall) {
                Some(fb) => block.insert(0, fb),
                None if shortfall > Duration::zero() => {
                    log.log_warn("pre-roll pad shortfall could not be covered: no fallback filler configured");
                }
                None => {}
            }
            for draft in block.into_iter().rev() {
                drafts.insert(0, draft);
            }
        }
        FillerKind::PostRoll => {
            let filled = drain_duration_filler(registry, pad_preset, remaining_to_fill, FillerKind::PostRoll);
            let filled_total: Duration = filled.iter().map(|d| d.span).sum();
            let shortfall = remaining_to_fill - filled_total;
            drafts.extend(filled);
            match fallback_draft(registry, &base.fallback_filler, shortfall) {
                Some(fb) => drafts.push(fb),
                None if shortfall > Duration::zero() => {
                    log.log_warn("post-roll pad shortfall could not be covered: no fallback filler configured");
                }
                None => {}
            }
        }
        FillerKind::MidRoll => {
            apply_mid_roll_pad(registry, base, chapters, remaining_to_fill, drafts, log);
        }
        _ => {}
    }
}

/// Parcourt `drafts` dans l'ordre en assignant `start`/`finish` pour que le
/// `finish` de chaque élément égale le `start` du suivant et que chaque
/// durée soit préservée (spec §4.4 « Réestampillage temporel », toujours
/// la dernière étape).
fn restamp(drafts: Vec<Draft>, start_offset: DateTime<Utc>, guide_group: i32) -> Vec<PlayoutItem> {
    let mut cursor = start_offset;
    drafts
        .into_iter()
        .map(|draft| {
            let start = cursor;
            let finish = start + draft.span;
            cursor = finish;
            PlayoutItem {
                media_item_id: draft.media_item_id,
                start,
                finish,
                in_point: draft.in_point,
                out_point: draft.out_point,
                guide_group,
                filler_kind: draft.kind,
                disable_watermarks: draft.disable_watermarks,
            }
        })
        .collect()
}

/// Compose la liste d'éléments ordonnée complète pour une sélection de
/// primaire : pre-roll, mid-roll entrelacé aux chapitres (ou une seule
/// tranche), post-roll, et la passe de remplissage, puis réestampille tout
/// depuis `start_offset` (spec §4.4).
///
/// Si plus d'un des emplacements pre/mid/post-roll est en mode pad, tout
/// le jeu de filler est abandonné et le primaire est renvoyé seul
/// (validation de spec §4.4, journalisée au niveau erreur).
pub fn compose(
    registry: &mut dyn EnumeratorRegistry,
    item: &ProgramScheduleItem,
    primary: &MediaItem,
    start_offset: DateTime<Utc>,
    guide_group: i32,
    log: &dyn BuildLog,
) -> Result<Vec<PlayoutItem>> {
    let base = item.base();

    let pad_kinds: Vec<FillerKind> = [&base.pre_roll_filler, &base.mid_roll_filler, &base.post_roll_filler]
        .into_iter()
        .filter_map(|slot| slot.as_ref())
        .filter(|preset| preset.mode == FillerMode::Pad)
        .map(|preset| preset.kind)
        .collect();

    if pad_kinds.len() > 1 {
        log.log_error(&PlayoutError::BadConfiguration(
            "more than one pad-to-nearest-minute filler configured on one schedule item".into(),
        )
        .to_string());
        return Ok(vec![PlayoutItem {
            media_item_id: primary.id.clone(),
            start: start_offset,
            finish: start_offset + primary.duration,
            in_point: Duration::zero(),
            out_point: primary.duration,
            guide_group,
            filler_kind: FillerKind::None,
            disable_watermarks: false,
        }]);
    }

    let mid_roll_family_present = base.mid_roll_filler.is_some()
        || base.mid_roll_enter_filler.is_some()
        || base.mid_roll_exit_filler.is_some();
    let effective_chapters: Vec<MediaChapter> = if mid_roll_family_present && primary.chapters().len() > 1 {
        primary.chapters().to_vec()
    } else {
        Vec::new()
    };

    let mut drafts: Vec<Draft> = Vec::new();

    if let Some(preset) = &base.pre_roll_filler {
        if preset.mode != FillerMode::Pad {
            drafts.extend(drain_filler(registry, preset, FillerKind::PreRoll));
        }
    }

    if effective_chapters.is_empty() {
        drafts.push(Draft::primary(primary));
    } else {
        interleave_chapters(registry, base, primary, &effective_chapters, &mut drafts);
    }

    if let Some(preset) = &base.post_roll_filler {
        if preset.mode != FillerMode::Pad {
            drafts.extend(drain_filler(registry, preset, FillerKind::PostRoll));
        }
    }

    if let Some(pad_kind) = pad_kinds.first().copied() {
        apply_pad_pass(registry, base, &effective_chapters, pad_kind, &mut drafts, start_offset, log);
    }

    let items = restamp(drafts, start_offset, guide_group);
    for item in &items {
        if item.finish < item.start {
            return Err(PlayoutError::Fatal(format!(
                "filler composition produced finish before start for {}",
                item.media_item_id
            )));
        }
    }
    Ok(items)
}

/// spec §4.5 « Tail » : ajoute des éléments bornés en durée depuis
/// `preset` en partant de `from`, en s'arrêtant au premier élément qui
/// finirait après `until`.
pub fn add_tail_filler(
    registry: &mut dyn EnumeratorRegistry,
    preset: &FillerPreset,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
    guide_group: i32,
) -> Vec<PlayoutItem> {
    let mut cursor = from;
    let mut out = Vec::new();
    let Some(enumerator) = registry.enumerator_mut(&preset.collection_key) else {
        return out;
    };
    loop {
        let Some(candidate) = enumerator.current() else {
            break;
        };
        let finish = cursor + candidate.duration;
        if finish > until {
            break;
        }
        out.push(PlayoutItem {
            media_item_id: candidate.id.clone(),
            start: cursor,
            finish,
            in_point: Duration::zero(),
            out_point: candidate.duration,
            guide_group,
            filler_kind: FillerKind::Tail,
            disable_watermarks: !preset.allow_watermarks,
        });
        cursor = finish;
        if !enumerator.move_next() {
            break;
        }
    }
    out
}
