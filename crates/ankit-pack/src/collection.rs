//! Typed JSON structures stored in the singleton `col` row.
//!
//! The `conf`, `models`, `decks`, and `dconf` columns hold JSON whose shape
//! is fixed by Anki's schema version 11. Each blob has a serde type here so
//! the shape lives in one place; only the id-keyed dictionaries are maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deck::Deck;
use crate::id::{DEFAULT_DECK_CONFIG_ID, DEFAULT_DECK_ID};
use crate::model::{Field, Model, Template};

/// Schema version written to `col.ver`.
pub const SCHEMA_VERSION: i64 = 11;

/// LaTeX preamble for generated models.
pub const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";

/// LaTeX postamble for generated models.
pub const LATEX_POST: &str = "\\end{document}";

/// Model dictionary keyed by stringified model id.
pub type ModelMap = BTreeMap<String, ModelRecord>;

/// Deck dictionary keyed by stringified deck id.
pub type DeckMap = BTreeMap<String, DeckRecord>;

/// Deck options dictionary keyed by stringified options id.
pub type DeckConfigMap = BTreeMap<String, DeckConfig>;

/// The whole `col` row, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    /// Creation time, seconds.
    pub crt: i64,
    /// Modification time, milliseconds.
    pub modified: i64,
    /// Schema modification time, milliseconds.
    pub scm: i64,
    /// Schema version.
    pub ver: i64,
    /// Collection configuration.
    pub conf: CollectionConfig,
    /// Models by id.
    pub models: ModelMap,
    /// Decks by id.
    pub decks: DeckMap,
    /// Deck options by id.
    pub dconf: DeckConfigMap,
    /// Tag registry.
    pub tags: BTreeMap<String, i64>,
}

/// The `conf` column: global scheduler and browser settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectionConfig {
    /// Position given to the next new card.
    pub next_pos: i64,
    /// Show next-interval estimates on answer buttons.
    pub est_times: bool,
    /// Decks included in the current study session.
    pub active_decks: Vec<i64>,
    /// Browser sort column.
    pub sort_type: String,
    /// Session time limit in seconds, `0` for none.
    pub time_lim: i64,
    /// Reverse the browser sort.
    pub sort_backwards: bool,
    /// Add new notes to the current deck.
    pub add_to_cur: bool,
    /// Currently selected deck.
    pub cur_deck: i64,
    /// How new cards mix with reviews.
    pub new_spread: i64,
    /// Show due counts.
    pub due_counts: bool,
    /// Currently selected model.
    pub cur_model: Option<i64>,
    /// Learning-ahead limit in seconds.
    pub collapse_time: i64,
    /// Scheduler version.
    pub sched_ver: i64,
    /// Bury new siblings.
    pub new_bury: bool,
    /// Note type counter.
    #[serde(rename = "_nt_")]
    pub nt: i64,
    /// Last model used in the default deck.
    #[serde(
        rename = "_deck_1_lastNotetype",
        skip_serializing_if = "Option::is_none"
    )]
    pub deck_1_last_notetype: Option<i64>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            next_pos: 1,
            est_times: true,
            active_decks: vec![DEFAULT_DECK_ID],
            sort_type: "noteFld".to_string(),
            time_lim: 0,
            sort_backwards: false,
            add_to_cur: true,
            cur_deck: DEFAULT_DECK_ID,
            new_spread: 0,
            due_counts: true,
            cur_model: None,
            collapse_time: 1200,
            sched_ver: 1,
            new_bury: true,
            nt: 0,
            deck_1_last_notetype: None,
        }
    }
}

impl CollectionConfig {
    /// Point the "current model" settings at `model_id`.
    pub fn select_model(&mut self, model_id: i64) {
        self.cur_model = Some(model_id);
        self.deck_1_last_notetype = Some(model_id);
    }
}

/// One entry of the `models` dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRecord {
    /// Model id.
    pub id: i64,
    /// Model name.
    pub name: String,
    /// `0` standard, `1` cloze.
    #[serde(rename = "type")]
    pub kind: i32,
    /// Modification time, seconds.
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Update sequence number.
    pub usn: i64,
    /// Index of the browser sort field.
    pub sortf: usize,
    /// Deck new cards go to by default.
    pub did: Option<i64>,
    /// Legacy version list.
    #[serde(default)]
    pub vers: Vec<Value>,
    /// Legacy tag list.
    #[serde(default)]
    pub tags: Vec<Value>,
    /// Card stylesheet.
    pub css: String,
    /// LaTeX preamble.
    pub latex_pre: String,
    /// LaTeX postamble.
    pub latex_post: String,
    /// Render LaTeX as SVG.
    #[serde(default)]
    pub latexsvg: bool,
    /// Card generation requirements, one per template.
    pub req: Vec<Requirement>,
    /// Fields in order.
    pub flds: Vec<FieldRecord>,
    /// Templates in order.
    pub tmpls: Vec<TemplateRecord>,
    /// Stock note type this model derives from.
    #[serde(default)]
    pub original_stock_kind: i64,
}

impl ModelRecord {
    /// Build the record for `model`, stamped with `now` (seconds).
    pub fn from_model(model: &Model, now: i64) -> Self {
        Self {
            id: model.id(),
            name: model.name().to_string(),
            kind: model.kind().as_i32(),
            modified: now,
            usn: 0,
            sortf: model.sort_field_index(),
            did: Some(DEFAULT_DECK_ID),
            vers: Vec::new(),
            tags: Vec::new(),
            css: model.css().to_string(),
            latex_pre: LATEX_PRE.to_string(),
            latex_post: LATEX_POST.to_string(),
            latexsvg: false,
            req: requirements(model),
            flds: model.fields().iter().map(FieldRecord::from).collect(),
            tmpls: model.templates().iter().map(TemplateRecord::from).collect(),
            original_stock_kind: 1,
        }
    }
}

/// A `req` entry: `[template ord, "any" | "all", [field ords]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement(
    /// Template ordinal.
    pub usize,
    /// `"any"` or `"all"`.
    pub String,
    /// Field ordinals.
    pub Vec<usize>,
);

/// Fields each template's question side needs to produce a card.
///
/// A template that feeds a field through the `cloze` filter needs only its
/// cloze fields. Any other template needs any one of the fields it
/// references, falling back to the first field.
pub fn requirements(model: &Model) -> Vec<Requirement> {
    model
        .templates()
        .iter()
        .map(|template| {
            let refs = field_references(&template.qfmt);
            let cloze: Vec<&str> = refs
                .iter()
                .filter(|r| r.cloze)
                .map(|r| r.name)
                .collect();
            let needed = |name: &str| {
                if cloze.is_empty() {
                    refs.iter().any(|r| r.name == name)
                } else {
                    cloze.contains(&name)
                }
            };

            let referenced: Vec<usize> = model
                .fields()
                .iter()
                .filter(|f| needed(&f.name))
                .map(|f| f.ord)
                .collect();

            if referenced.is_empty() {
                Requirement(template.ord, "any".to_string(), vec![0])
            } else {
                Requirement(template.ord, "any".to_string(), referenced)
            }
        })
        .collect()
}

/// A `{{...}}` tag naming a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldRef<'a> {
    name: &'a str,
    cloze: bool,
}

/// Field names in the `{{...}}` tags of `format`.
///
/// Section markers (`#`, `^`, `/`) and filter prefixes (`text:`, `hint:`,
/// `cloze:`) are stripped; the name is whatever follows the last `:`.
fn field_references(format: &str) -> Vec<FieldRef<'_>> {
    let mut refs = Vec::new();
    let mut rest = format;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            break;
        };
        let tag = after[..end].trim().trim_start_matches(['#', '^', '/']).trim();
        let (filters, name) = match tag.rsplit_once(':') {
            Some((filters, name)) => (filters, name.trim()),
            None => ("", tag),
        };
        refs.push(FieldRef {
            name,
            cloze: filters.split(':').any(|f| f.trim() == "cloze"),
        });
        rest = &after[end + 2..];
    }
    refs
}

/// A model field as stored in `flds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRecord {
    /// Field name.
    pub name: String,
    /// Position in the model.
    pub ord: usize,
    /// Keep the value between adds.
    pub sticky: bool,
    /// Right-to-left text.
    pub rtl: bool,
    /// Editor font.
    pub font: String,
    /// Editor font size.
    pub size: u32,
    /// Legacy media list.
    #[serde(default)]
    pub media: Vec<String>,
    /// Editor text color.
    #[serde(default)]
    pub color: String,
    /// Editor alignment.
    #[serde(default)]
    pub align: String,
    /// Edit as plain text.
    #[serde(default)]
    pub plain_text: bool,
}

impl From<&Field> for FieldRecord {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            ord: field.ord,
            sticky: field.sticky,
            rtl: field.rtl,
            font: field.font.clone(),
            size: field.size,
            media: Vec::new(),
            color: field.color.clone(),
            align: field.align.clone(),
            plain_text: false,
        }
    }
}

/// A card template as stored in `tmpls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Template name.
    pub name: String,
    /// Position in the model.
    pub ord: usize,
    /// Question format.
    pub qfmt: String,
    /// Answer format.
    pub afmt: String,
    /// Browser question format.
    pub bqfmt: String,
    /// Browser answer format.
    pub bafmt: String,
    /// Deck override for generated cards.
    pub did: Option<i64>,
    /// Browser font.
    pub bfont: String,
    /// Browser font size.
    pub bsize: u32,
}

impl From<&Template> for TemplateRecord {
    fn from(template: &Template) -> Self {
        Self {
            name: template.name.clone(),
            ord: template.ord,
            qfmt: template.qfmt.clone(),
            afmt: template.afmt.clone(),
            bqfmt: template.bqfmt.clone().unwrap_or_default(),
            bafmt: template.bafmt.clone().unwrap_or_default(),
            did: None,
            bfont: String::new(),
            bsize: 0,
        }
    }
}

/// One entry of the `decks` dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckRecord {
    /// Deck id.
    pub id: i64,
    /// Modification time, seconds.
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Full deck name, `::` separated.
    pub name: String,
    /// Update sequence number.
    pub usn: i64,
    /// Day number and learning cards studied.
    pub lrn_today: [i64; 2],
    /// Day number and reviews done.
    pub rev_today: [i64; 2],
    /// Day number and new cards studied.
    pub new_today: [i64; 2],
    /// Day number and milliseconds studied.
    pub time_today: [i64; 2],
    /// Collapsed in the deck list.
    pub collapsed: bool,
    /// Collapsed in the browser sidebar.
    pub browser_collapsed: bool,
    /// Description.
    pub desc: String,
    /// `1` for filtered decks.
    #[serde(rename = "dyn")]
    pub dynamic: i32,
    /// Deck options group id.
    pub conf: i64,
    /// Extra new cards for a custom study session.
    pub extend_new: i64,
    /// Extra reviews for a custom study session.
    pub extend_rev: i64,
}

impl DeckRecord {
    /// Build the record for `deck`, stamped with `now` (seconds).
    pub fn from_deck(deck: &Deck, now: i64) -> Self {
        Self {
            id: deck.id(),
            modified: now,
            name: deck.name().to_string(),
            usn: -1,
            lrn_today: [0, 0],
            rev_today: [0, 0],
            new_today: [0, 0],
            time_today: [0, 0],
            collapsed: false,
            browser_collapsed: false,
            desc: deck.description().to_string(),
            dynamic: 0,
            conf: DEFAULT_DECK_CONFIG_ID,
            extend_new: 10,
            extend_rev: 50,
        }
    }
}

/// One entry of the `dconf` dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckConfig {
    /// Options group id.
    pub id: i64,
    /// Modification time, seconds.
    #[serde(rename = "mod")]
    pub modified: i64,
    /// Group name.
    pub name: String,
    /// Update sequence number.
    pub usn: i64,
    /// Seconds after which an answer stops counting.
    pub max_taken: i64,
    /// Play audio automatically.
    pub autoplay: bool,
    /// Show the answer timer.
    pub timer: i64,
    /// Replay question audio with the answer.
    pub replayq: bool,
    /// New-card options.
    pub new: NewCardConfig,
    /// Review options.
    pub rev: ReviewConfig,
    /// Lapse options.
    pub lapse: LapseConfig,
    /// Whether the group belongs to a filtered deck.
    #[serde(rename = "dyn")]
    pub dynamic: bool,
    /// How new cards mix with reviews.
    pub new_mix: i64,
    /// Minimum new cards per day.
    pub new_per_day_minimum: i64,
    /// How interday learning cards mix with reviews.
    pub interday_learning_mix: i64,
    /// Review sort order.
    pub review_order: i64,
    /// New-card sort order.
    pub new_sort_order: i64,
    /// New-card gather order.
    pub new_gather_priority: i64,
    /// Bury interday learning siblings.
    pub bury_interday_learning: bool,
    /// FSRS weights, empty when unset.
    pub fsrs_weights: Vec<f64>,
    /// FSRS-5 parameters, empty when unset.
    pub fsrs_params5: Vec<f64>,
    /// FSRS target retention.
    pub desired_retention: f64,
    /// Reviews before this date are ignored by FSRS.
    pub ignore_revlogs_before_date: String,
    /// Per-weekday workload scaling.
    pub easy_days_percentages: Vec<f64>,
    /// Stop the timer on answer.
    pub stop_timer_on_answer: bool,
    /// Auto-advance delay for the question.
    pub seconds_to_show_question: f64,
    /// Auto-advance delay for the answer.
    pub seconds_to_show_answer: f64,
    /// Auto-advance action for the question.
    pub question_action: i64,
    /// Auto-advance action for the answer.
    pub answer_action: i64,
    /// Wait for audio before auto-advancing.
    pub wait_for_audio: bool,
    /// Historical retention used by SM-2.
    pub sm2_retention: f64,
    /// Search used when optimizing FSRS.
    pub weight_search: String,
}

impl DeckConfig {
    /// The "Default" options group, stamped with `now` (seconds).
    pub fn default_group(now: i64) -> Self {
        Self {
            id: DEFAULT_DECK_CONFIG_ID,
            modified: now,
            name: "Default".to_string(),
            usn: -1,
            max_taken: 60,
            autoplay: true,
            timer: 0,
            replayq: true,
            new: NewCardConfig::default(),
            rev: ReviewConfig::default(),
            lapse: LapseConfig::default(),
            dynamic: false,
            new_mix: 0,
            new_per_day_minimum: 0,
            interday_learning_mix: 0,
            review_order: 0,
            new_sort_order: 0,
            new_gather_priority: 0,
            bury_interday_learning: false,
            fsrs_weights: Vec::new(),
            fsrs_params5: Vec::new(),
            desired_retention: 0.9,
            ignore_revlogs_before_date: String::new(),
            easy_days_percentages: vec![1.0; 7],
            stop_timer_on_answer: false,
            seconds_to_show_question: 0.0,
            seconds_to_show_answer: 0.0,
            question_action: 0,
            answer_action: 0,
            wait_for_audio: true,
            sm2_retention: 0.9,
            weight_search: String::new(),
        }
    }

    /// A dictionary holding only the default group under key `"1"`.
    pub fn default_map(now: i64) -> DeckConfigMap {
        let mut map = DeckConfigMap::new();
        map.insert(
            DEFAULT_DECK_CONFIG_ID.to_string(),
            Self::default_group(now),
        );
        map
    }
}

/// New-card options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCardConfig {
    /// Learning steps in minutes.
    pub delays: Vec<f64>,
    /// Graduating, easy, and unused intervals in days.
    pub ints: Vec<i64>,
    /// Starting ease, permille.
    pub initial_factor: i64,
    /// Legacy flag.
    pub separate: bool,
    /// `0` random, `1` in order added.
    pub order: i64,
    /// New cards per day.
    pub per_day: i64,
    /// Bury related new cards.
    pub bury: bool,
}

impl Default for NewCardConfig {
    fn default() -> Self {
        Self {
            delays: vec![1.0, 10.0],
            ints: vec![1, 4, 7],
            initial_factor: 2500,
            separate: true,
            order: 0,
            per_day: 20,
            bury: false,
        }
    }
}

/// Review options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    /// Reviews per day.
    pub per_day: i64,
    /// Interval modifier.
    pub ivl_fct: f64,
    /// Easy bonus.
    pub ease4: f64,
    /// Interval fuzz factor.
    pub fuzz: f64,
    /// Legacy minimum spacing.
    pub min_space: i64,
    /// Maximum interval in days.
    pub max_ivl: i64,
    /// Hard interval multiplier.
    pub hard_factor: f64,
    /// Bury related reviews.
    pub bury: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            per_day: 100,
            ivl_fct: 1.0,
            ease4: 1.3,
            fuzz: 0.05,
            min_space: 1,
            max_ivl: 36500,
            hard_factor: 1.2,
            bury: false,
        }
    }
}

/// Lapse options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LapseConfig {
    /// Relearning steps in minutes.
    pub delays: Vec<f64>,
    /// New interval multiplier.
    pub mult: f64,
    /// Minimum interval in days.
    pub min_int: i64,
    /// Lapses before a card is a leech.
    pub leech_fails: i64,
    /// `0` suspend, `1` tag only.
    pub leech_action: i64,
}

impl Default for LapseConfig {
    fn default() -> Self {
        Self {
            delays: vec![10.0],
            mult: 0.0,
            min_int: 1,
            leech_fails: 8,
            leech_action: 1,
        }
    }
}
