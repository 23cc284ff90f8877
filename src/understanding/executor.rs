//! Sequential execution of parsed actions against storage.
//!
//! Actions run strictly in order. A failing action is recorded and the batch
//! moves on; an unconfirmed mass delete is parked in the confirmation ledger
//! instead of touching storage.

use crate::config::ExecutorConfig;
use crate::content::ContentGenerator;
use crate::error::{Error, Result};
use crate::storage::{ItemKind, ItemPatch, NewItem, StorageCollaborator, StoredItem};
use crate::understanding::action::{Action, ActionStatus, ActionType, DEFAULT_TOPIC};
use crate::understanding::confirmation::{ConfirmationLedger, PendingConfirmation};
use crate::understanding::time_expr;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Upper bound on items generated by a single create action
const MAX_ITEMS_PER_ACTION: u32 = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: Action,
    pub status: ActionStatus,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_confirmation: Option<PendingConfirmation>,
}

/// Items touched by a batch, grouped by what happened to them
#[derive(Debug, Clone, Default, Serialize)]
pub struct Artifacts {
    pub created: Vec<StoredItem>,
    pub updated: Vec<StoredItem>,
    pub found: Vec<StoredItem>,
    pub deleted: Vec<StoredItem>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.found.is_empty()
            && self.deleted.is_empty()
    }

    pub fn created_of(&self, kind: ItemKind) -> Vec<&StoredItem> {
        self.created.iter().filter(|item| item.kind() == kind).collect()
    }

    fn merge(&mut self, other: Artifacts) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.found.extend(other.found);
        self.deleted.extend(other.deleted);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub outcomes: Vec<ActionOutcome>,
    pub artifacts: Artifacts,
    /// Human-readable, never empty
    pub summary: String,
    pub cancelled: bool,
}

impl ExecutionResult {
    fn new(outcomes: Vec<ActionOutcome>, artifacts: Artifacts, skipped: usize, cancelled: bool) -> Self {
        let mut lines: Vec<String> = outcomes
            .iter()
            .map(|o| format!("{} {}", o.status.icon(), o.detail))
            .collect();

        if cancelled {
            lines.push(format!(
                "⏹️ Cancelled; {} remaining {} not run",
                skipped,
                if skipped == 1 { "action was" } else { "actions were" }
            ));
        }
        if lines.is_empty() {
            lines.push(
                "I couldn't find anything to do in that message. Try something like \"make 5 flashcards about photosynthesis\"."
                    .to_string(),
            );
        }

        Self {
            outcomes,
            artifacts,
            summary: lines.join("\n"),
            cancelled,
        }
    }

    pub fn pending_confirmations(&self) -> Vec<PendingConfirmation> {
        self.outcomes
            .iter()
            .filter_map(|o| o.pending_confirmation.clone())
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled
            && self
                .outcomes
                .iter()
                .all(|o| o.status == ActionStatus::Succeeded)
    }
}

/// Result of running one action
struct Step {
    status: ActionStatus,
    detail: String,
    pending: Option<PendingConfirmation>,
    artifacts: Artifacts,
    /// Cancellation stopped the action part-way
    interrupted: bool,
}

impl Step {
    fn succeeded(detail: String, artifacts: Artifacts) -> Self {
        Self {
            status: ActionStatus::Succeeded,
            detail,
            pending: None,
            artifacts,
            interrupted: false,
        }
    }

    fn failed(detail: String) -> Self {
        Self::failed_with(detail, Artifacts::default())
    }

    /// Failure after some writes already landed
    fn failed_with(detail: String, artifacts: Artifacts) -> Self {
        Self {
            status: ActionStatus::Failed,
            detail,
            pending: None,
            artifacts,
            interrupted: false,
        }
    }

    fn interrupted(detail: String, artifacts: Artifacts) -> Self {
        Self {
            interrupted: true,
            ..Self::failed_with(detail, artifacts)
        }
    }
}

pub struct ActionExecutor {
    storage: Arc<dyn StorageCollaborator>,
    content: Arc<dyn ContentGenerator>,
    config: ExecutorConfig,
    confirmations: Mutex<ConfirmationLedger>,
}

impl ActionExecutor {
    pub fn new(
        storage: Arc<dyn StorageCollaborator>,
        content: Arc<dyn ContentGenerator>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            storage,
            content,
            config,
            confirmations: Mutex::new(ConfirmationLedger::new()),
        }
    }

    pub fn with_content_generator(mut self, content: Arc<dyn ContentGenerator>) -> Self {
        self.content = content;
        self
    }

    pub async fn execute(
        &self,
        actions: &[Action],
        cancel: Option<&CancellationToken>,
    ) -> ExecutionResult {
        self.execute_at(actions, cancel, Local::now().naive_local())
            .await
    }

    /// Execute relative to `now`, which anchors time expressions
    pub async fn execute_at(
        &self,
        actions: &[Action],
        cancel: Option<&CancellationToken>,
        now: NaiveDateTime,
    ) -> ExecutionResult {
        let mut outcomes = Vec::with_capacity(actions.len());
        let mut artifacts = Artifacts::default();
        let mut skipped = 0;
        let mut cancelled = false;

        for (index, action) in actions.iter().enumerate() {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                cancelled = true;
                skipped = actions.len() - index;
                break;
            }

            debug!(
                "{} action {}/{}: {}",
                ActionStatus::Executing,
                index + 1,
                actions.len(),
                action
            );
            let step = self
                .run(action, now, cancel)
                .await
                .unwrap_or_else(|e| failure(action, e));

            if step.interrupted && step.artifacts.is_empty() {
                cancelled = true;
                skipped = actions.len() - index;
                break;
            }
            let interrupted = step.interrupted;
            outcomes.push(record(action, step, &mut artifacts));
            if interrupted {
                cancelled = true;
                skipped = actions.len() - index - 1;
                break;
            }
        }

        if cancelled {
            info!("{} with {} actions not run", Error::Cancelled, skipped);
        }
        ExecutionResult::new(outcomes, artifacts, skipped, cancelled)
    }

    /// Run a parked mass delete. Only the items counted when it was requested
    /// are removed; anything created since then stays.
    pub async fn execute_confirmed(&self, pending: PendingConfirmation) -> ExecutionResult {
        let mut action = pending.action;
        action.data.confirm = Some(true);
        let kind = action.target;
        let ids: HashSet<String> = pending.item_ids.into_iter().collect();

        let step = self
            .storage
            .list(kind)
            .and_then(|items| {
                let matches: Vec<StoredItem> = items
                    .into_iter()
                    .filter(|item| ids.contains(item.id()))
                    .collect();
                if matches.is_empty() {
                    return Ok(Step::succeeded(
                        format!("No {} left to delete", kind),
                        Artifacts::default(),
                    ));
                }
                self.remove(&action, kind, matches)
            })
            .unwrap_or_else(|e| failure(&action, e));

        let mut artifacts = Artifacts::default();
        let outcome = record(&action, step, &mut artifacts);
        ExecutionResult::new(vec![outcome], artifacts, 0, false)
    }

    /// Remove and return a parked confirmation
    pub fn take_confirmation(&self, token: &str) -> Option<PendingConfirmation> {
        self.ledger().take(token)
    }

    pub fn pending_confirmations(&self) -> Vec<PendingConfirmation> {
        self.ledger().pending().to_vec()
    }

    fn ledger(&self) -> MutexGuard<'_, ConfirmationLedger> {
        self.confirmations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run(
        &self,
        action: &Action,
        now: NaiveDateTime,
        cancel: Option<&CancellationToken>,
    ) -> Result<Step> {
        // A placeholder topic never selects items to change
        let unspecified = !action.data.all && action.data.topic == DEFAULT_TOPIC;
        match (action.action_type, action.target) {
            (ActionType::Delete, kind) if unspecified => {
                Ok(Step::failed(format!("Which {} should I delete?", kind)))
            }
            (ActionType::Update, ItemKind::Schedule) if unspecified => Ok(Step::failed(
                "Which schedule entry should I move?".to_string(),
            )),
            (ActionType::Update, kind) if unspecified => {
                Ok(Step::failed(format!("Which {} should I update?", kind)))
            }
            (ActionType::Create, ItemKind::Schedule) => self.create_schedule(action, now),
            (ActionType::Create, kind) => self.create_material(action, kind, cancel).await,
            (ActionType::Delete, kind) => self.delete(action, kind),
            (ActionType::Read, kind) => self.read(action, kind),
            (ActionType::Update, ItemKind::Schedule) => self.reschedule(action, now),
            (ActionType::Update, kind) => self.regenerate(action, kind, cancel).await,
        }
    }

    /// Content for `count` items, or `None` when cancelled while generating
    async fn generate(
        &self,
        kind: ItemKind,
        topic: &str,
        count: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<Vec<NewItem>>> {
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Ok(None),
                items = self.content.generate(kind, topic, count) => items.map(Some),
            },
            None => self.content.generate(kind, topic, count).await.map(Some),
        }
    }

    fn matching_items(&self, kind: ItemKind, action: &Action) -> Result<Vec<StoredItem>> {
        Ok(self
            .storage
            .list(kind)?
            .into_iter()
            .filter(|item| action.data.all || item.matches_topic(&action.data.topic))
            .collect())
    }

    async fn create_material(
        &self,
        action: &Action,
        kind: ItemKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<Step> {
        let default_count = match kind {
            ItemKind::Flashcards => self.config.default_flashcard_count,
            _ => self.config.default_note_count,
        };
        let count = action
            .data
            .count
            .unwrap_or(default_count)
            .clamp(1, MAX_ITEMS_PER_ACTION) as usize;
        let topic = &action.data.topic;

        let Some(items) = self.generate(kind, topic, count, cancel).await? else {
            return Ok(Step::interrupted(String::new(), Artifacts::default()));
        };
        let wanted = items.len();
        let mut artifacts = Artifacts::default();
        for item in items {
            let created = artifacts.created.len();
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Ok(Step::interrupted(
                    format!(
                        "Created {} of {} {} about {} before cancelling",
                        created,
                        wanted,
                        kind.noun(wanted),
                        topic
                    ),
                    artifacts,
                ));
            }
            match self.storage.create(kind, item) {
                Ok(stored) => artifacts.created.push(stored),
                Err(e) if created == 0 => return Err(e),
                Err(e) => {
                    warn!("Storage failed after {} {}: {}", created, kind.noun(created), e);
                    return Ok(Step::failed_with(
                        format!(
                            "Created {} of {} {} about {}; storage failed: {}",
                            created,
                            wanted,
                            kind.noun(wanted),
                            topic,
                            e
                        ),
                        artifacts,
                    ));
                }
            }
        }

        let created = artifacts.created.len();
        info!("Created {} {} about '{}'", created, kind.noun(created), topic);
        Ok(Step::succeeded(
            format!("Created {} {} about {}", created, kind.noun(created), topic),
            artifacts,
        ))
    }

    fn create_schedule(&self, action: &Action, now: NaiveDateTime) -> Result<Step> {
        let topic = &action.data.topic;
        let resolved = action
            .data
            .time_expression
            .as_deref()
            .and_then(|expr| time_expr::resolve(expr, now));
        let date = resolved.map(|r| r.date).unwrap_or_else(|| now.date());
        let time = resolved.and_then(|r| r.time);

        let entry = self.storage.create(
            ItemKind::Schedule,
            NewItem::Schedule {
                title: topic.clone(),
                date,
                time,
                category: topic.clone(),
            },
        )?;

        let artifacts = Artifacts {
            created: vec![entry],
            ..Artifacts::default()
        };
        Ok(Step::succeeded(
            format!("Scheduled {} for {}", topic, describe_when(date, time)),
            artifacts,
        ))
    }

    fn delete(&self, action: &Action, kind: ItemKind) -> Result<Step> {
        let matches = self.matching_items(kind, action)?;
        if matches.is_empty() {
            let detail = if action.data.all {
                format!("No {} to delete", kind)
            } else {
                format!("No {} about {} to delete", kind, action.data.topic)
            };
            return Ok(Step::succeeded(detail, Artifacts::default()));
        }

        if action.is_mass_delete() && !action.is_confirmed() {
            let gate = Error::DestructiveActionUnconfirmed {
                target: kind.to_string(),
            };
            let ids = matches.iter().map(|item| item.id().to_string()).collect();
            let pending = self.ledger().register(action.clone(), ids);
            info!("{} (token {})", gate, pending.token);
            let detail = format!(
                "{} Reply \"{} confirm\" or confirm with token {}.",
                pending.prompt(),
                action.restate(),
                pending.token
            );
            return Ok(Step {
                status: ActionStatus::AwaitingConfirmation,
                detail,
                pending: Some(pending),
                artifacts: Artifacts::default(),
                interrupted: false,
            });
        }
        if action.is_mass_delete() {
            self.ledger().discard(kind);
        }
        self.remove(action, kind, matches)
    }

    fn remove(&self, action: &Action, kind: ItemKind, matches: Vec<StoredItem>) -> Result<Step> {
        let ids: HashSet<String> = matches.iter().map(|item| item.id().to_string()).collect();
        let removed = self
            .storage
            .delete(kind, &|item: &StoredItem| ids.contains(item.id()))?;

        let detail = if action.data.all {
            format!("Deleted all {} {}", removed, kind.noun(removed))
        } else {
            format!(
                "Deleted {} {} about {}",
                removed,
                kind.noun(removed),
                action.data.topic
            )
        };
        info!("{}", detail);
        Ok(Step::succeeded(
            detail,
            Artifacts {
                deleted: matches,
                ..Artifacts::default()
            },
        ))
    }

    fn read(&self, action: &Action, kind: ItemKind) -> Result<Step> {
        let matches = self.matching_items(kind, action)?;
        let found = matches.len();
        let detail = match (found, action.data.all) {
            (0, true) => format!("You don't have any {} yet", kind),
            (0, false) => format!("No {} about {} found", kind, action.data.topic),
            (_, true) => format!("Found {} {}", found, kind.noun(found)),
            (_, false) => format!(
                "Found {} {} about {}",
                found,
                kind.noun(found),
                action.data.topic
            ),
        };
        Ok(Step::succeeded(
            detail,
            Artifacts {
                found: matches,
                ..Artifacts::default()
            },
        ))
    }

    fn reschedule(&self, action: &Action, now: NaiveDateTime) -> Result<Step> {
        let topic = &action.data.topic;
        let Some(expression) = action.data.time_expression.as_deref() else {
            return Ok(Step::failed(format!("Tell me when to move {}", topic)));
        };
        let Some(resolved) = time_expr::resolve(expression, now) else {
            return Ok(Step::failed(format!(
                "Couldn't understand the time '{}'",
                expression
            )));
        };
        let Some(entry) = self
            .matching_items(ItemKind::Schedule, action)?
            .into_iter()
            .next()
        else {
            return Ok(Step::failed(format!("No schedule entry about {} found", topic)));
        };

        let patch = ItemPatch {
            date: Some(resolved.date),
            time: resolved.time,
            ..ItemPatch::default()
        };
        let updated = self.storage.update(ItemKind::Schedule, entry.id(), patch)?;
        let detail = format!(
            "Moved {} to {}",
            updated.label(),
            describe_when(resolved.date, resolved.time)
        );
        Ok(Step::succeeded(
            detail,
            Artifacts {
                updated: vec![updated],
                ..Artifacts::default()
            },
        ))
    }

    async fn regenerate(
        &self,
        action: &Action,
        kind: ItemKind,
        cancel: Option<&CancellationToken>,
    ) -> Result<Step> {
        let topic = &action.data.topic;
        let matches = self.matching_items(kind, action)?;
        if matches.is_empty() {
            return Ok(Step::failed(format!("No {} about {} to update", kind, topic)));
        }

        let Some(fresh) = self.generate(kind, topic, matches.len(), cancel).await? else {
            return Ok(Step::interrupted(String::new(), Artifacts::default()));
        };
        let mut artifacts = Artifacts::default();
        for (item, replacement) in matches.iter().zip(fresh) {
            let patch = match replacement {
                NewItem::Note { title, content, .. } => ItemPatch {
                    title: Some(title),
                    content: Some(content),
                    ..ItemPatch::default()
                },
                NewItem::Flashcard {
                    question, answer, ..
                } => ItemPatch {
                    title: Some(question),
                    content: Some(answer),
                    ..ItemPatch::default()
                },
                NewItem::Schedule { .. } => continue,
            };
            match self.storage.update(kind, item.id(), patch) {
                Ok(updated) => artifacts.updated.push(updated),
                Err(e) if artifacts.updated.is_empty() => return Err(e),
                Err(e) => {
                    let updated = artifacts.updated.len();
                    return Ok(Step::failed_with(
                        format!(
                            "Updated {} of {} {} about {}; storage failed: {}",
                            updated,
                            matches.len(),
                            kind.noun(matches.len()),
                            topic,
                            e
                        ),
                        artifacts,
                    ));
                }
            }
        }

        let updated = artifacts.updated.len();
        Ok(Step::succeeded(
            format!("Updated {} {} about {}", updated, kind.noun(updated), topic),
            artifacts,
        ))
    }
}

fn failure(action: &Action, e: Error) -> Step {
    warn!("Action '{}' failed: {}", action.restate(), e);
    Step::failed(format!("Couldn't {}: {}", action.restate(), e))
}

/// Fold a step's artifacts into the batch and turn it into an outcome
fn record(action: &Action, step: Step, artifacts: &mut Artifacts) -> ActionOutcome {
    artifacts.merge(step.artifacts);
    ActionOutcome {
        action: action.clone(),
        status: step.status,
        detail: step.detail,
        pending_confirmation: step.pending,
    }
}

fn describe_when(date: NaiveDate, time: Option<NaiveTime>) -> String {
    match time {
        Some(time) => format!("{} at {}", date.format("%a %d %b"), time.format("%H:%M")),
        None => date.format("%a %d %b").to_string(),
    }
}
