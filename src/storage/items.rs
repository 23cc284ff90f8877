use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of study material the assistant manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Notes,
    Flashcards,
    Schedule,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Notes, ItemKind::Flashcards, ItemKind::Schedule];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Notes => "notes",
            ItemKind::Flashcards => "flashcards",
            ItemKind::Schedule => "schedule",
        }
    }

    /// Noun for `count` items, e.g. "1 note" / "3 notes"
    pub fn noun(&self, count: usize) -> &'static str {
        match (self, count) {
            (ItemKind::Notes, 1) => "note",
            (ItemKind::Notes, _) => "notes",
            (ItemKind::Flashcards, 1) => "flashcard",
            (ItemKind::Flashcards, _) => "flashcards",
            (ItemKind::Schedule, 1) => "schedule entry",
            (ItemKind::Schedule, _) => "schedule entries",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            ItemKind::Notes => "note",
            ItemKind::Flashcards => "card",
            ItemKind::Schedule => "event",
        }
    }

    /// Generate a random item id such as `card_3f9a01bc`
    pub fn generate_id(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: u32 = rng.gen();
        format!("{}_{:08x}", self.id_prefix(), suffix)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted record owned by the storage collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredItem {
    Note(Note),
    Flashcard(Flashcard),
    Schedule(ScheduleEntry),
}

impl StoredItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            StoredItem::Note(_) => ItemKind::Notes,
            StoredItem::Flashcard(_) => ItemKind::Flashcards,
            StoredItem::Schedule(_) => ItemKind::Schedule,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            StoredItem::Note(n) => &n.id,
            StoredItem::Flashcard(c) => &c.id,
            StoredItem::Schedule(e) => &e.id,
        }
    }

    /// Title for notes and schedule entries, question for flashcards
    pub fn label(&self) -> &str {
        match self {
            StoredItem::Note(n) => &n.title,
            StoredItem::Flashcard(c) => &c.question,
            StoredItem::Schedule(e) => &e.title,
        }
    }

    pub fn category(&self) -> &str {
        match self {
            StoredItem::Note(n) => &n.category,
            StoredItem::Flashcard(c) => &c.category,
            StoredItem::Schedule(e) => &e.category,
        }
    }

    /// Whole-word, case-insensitive topic match against the category, the
    /// title (question for flashcards) and note tags. Bodies are not searched.
    pub fn matches_topic(&self, topic: &str) -> bool {
        let phrase = words(topic);
        if phrase.is_empty() {
            return false;
        }
        let contains = |text: &str| contains_phrase(text, &phrase);
        match self {
            StoredItem::Note(n) => {
                contains(&n.category) || contains(&n.title) || n.tags.iter().any(|t| contains(t))
            }
            StoredItem::Flashcard(c) => contains(&c.category) || contains(&c.question),
            StoredItem::Schedule(e) => contains(&e.category) || contains(&e.title),
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `phrase` (non-empty) appears in `text` as consecutive whole words
fn contains_phrase(text: &str, phrase: &[String]) -> bool {
    words(text).windows(phrase.len()).any(|window| window == phrase)
}

/// Creation payload; the store assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NewItem {
    Note {
        title: String,
        content: String,
        category: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    Flashcard {
        question: String,
        answer: String,
        category: String,
    },
    Schedule {
        title: String,
        date: NaiveDate,
        time: Option<NaiveTime>,
        category: String,
    },
}

impl NewItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            NewItem::Note { .. } => ItemKind::Notes,
            NewItem::Flashcard { .. } => ItemKind::Flashcards,
            NewItem::Schedule { .. } => ItemKind::Schedule,
        }
    }

    /// Materialize into a stored record with a fresh id and timestamp
    pub fn into_stored(self) -> StoredItem {
        let id = self.kind().generate_id();
        let created_at = Utc::now();
        match self {
            NewItem::Note {
                title,
                content,
                category,
                tags,
            } => StoredItem::Note(Note {
                id,
                title,
                content,
                category,
                tags,
                created_at,
            }),
            NewItem::Flashcard {
                question,
                answer,
                category,
            } => StoredItem::Flashcard(Flashcard {
                id,
                question,
                answer,
                category,
                created_at,
            }),
            NewItem::Schedule {
                title,
                date,
                time,
                category,
            } => StoredItem::Schedule(ScheduleEntry {
                id,
                title,
                date,
                time,
                category,
                created_at,
            }),
        }
    }
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.date.is_none() && self.time.is_none()
    }

    /// Apply to an item. Title maps to question and content to answer for flashcards.
    pub fn apply(&self, item: &mut StoredItem) {
        match item {
            StoredItem::Note(n) => {
                if let Some(title) = &self.title {
                    n.title = title.clone();
                }
                if let Some(content) = &self.content {
                    n.content = content.clone();
                }
            }
            StoredItem::Flashcard(c) => {
                if let Some(title) = &self.title {
                    c.question = title.clone();
                }
                if let Some(content) = &self.content {
                    c.answer = content.clone();
                }
            }
            StoredItem::Schedule(e) => {
                if let Some(title) = &self.title {
                    e.title = title.clone();
                }
                if let Some(date) = self.date {
                    e.date = date;
                }
                if self.time.is_some() {
                    e.time = self.time;
                }
            }
        }
    }
}
