use crate::storage::ItemKind;
use crate::understanding::action::Action;
use serde::{Deserialize, Serialize};

/// A destructive action held back until the user confirms it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub token: String,
    pub action: Action,
    /// How many items the action would remove when it was requested
    pub affected: usize,
    /// Ids of those items; confirming removes these and nothing newer
    pub item_ids: Vec<String>,
}

impl PendingConfirmation {
    pub fn prompt(&self) -> String {
        format!(
            "Delete all {} {}? This cannot be undone.",
            self.affected,
            self.action.target.noun(self.affected)
        )
    }
}

/// Outstanding confirmations, at most one per item kind
#[derive(Debug, Default)]
pub struct ConfirmationLedger {
    pending: Vec<PendingConfirmation>,
    next_id: u64,
}

impl ConfirmationLedger {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 1,
        }
    }

    /// Generate a unique confirmation token
    fn generate_token(&mut self) -> String {
        let token = format!("confirm_{}", self.next_id.max(1));
        self.next_id = self.next_id.max(1) + 1;
        token
    }

    /// Hold `action` back; a newer request for the same kind replaces the older one
    pub fn register(&mut self, action: Action, item_ids: Vec<String>) -> PendingConfirmation {
        self.discard(action.target);
        let pending = PendingConfirmation {
            token: self.generate_token(),
            action,
            affected: item_ids.len(),
            item_ids,
        };
        self.pending.push(pending.clone());
        pending
    }

    /// Remove and return the confirmation for `token`
    pub fn take(&mut self, token: &str) -> Option<PendingConfirmation> {
        let index = self
            .pending
            .iter()
            .position(|p| p.token.eq_ignore_ascii_case(token.trim()))?;
        Some(self.pending.remove(index))
    }

    /// Drop whatever is pending for `target`
    pub fn discard(&mut self, target: ItemKind) {
        self.pending.retain(|p| p.action.target != target);
    }

    pub fn pending(&self) -> &[PendingConfirmation] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::understanding::action::{ActionData, ActionType, ALL_TOPIC};

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("card_{:08}", i)).collect()
    }

    fn delete_all(target: ItemKind) -> Action {
        Action {
            action_type: ActionType::Delete,
            target,
            data: ActionData {
                topic: ALL_TOPIC.to_string(),
                count: None,
                time_expression: None,
                confirm: None,
                all: true,
            },
            priority: 0,
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let mut ledger = ConfirmationLedger::new();
        let a = ledger.register(delete_all(ItemKind::Notes), ids(3));
        let b = ledger.register(delete_all(ItemKind::Flashcards), ids(4));
        assert_eq!(a.token, "confirm_1");
        assert_eq!(b.token, "confirm_2");
        assert_eq!(ledger.pending().len(), 2);
    }

    #[test]
    fn test_take_is_single_use() {
        let mut ledger = ConfirmationLedger::default();
        let pending = ledger.register(delete_all(ItemKind::Notes), ids(3));
        assert!(ledger.take(&pending.token).is_some());
        assert!(ledger.take(&pending.token).is_none());
        assert!(!ledger.has_pending());
    }

    #[test]
    fn test_newer_request_replaces_older_for_same_kind() {
        let mut ledger = ConfirmationLedger::new();
        let old = ledger.register(delete_all(ItemKind::Flashcards), ids(2));
        let new = ledger.register(delete_all(ItemKind::Flashcards), ids(5));
        assert!(ledger.take(&old.token).is_none());
        assert_eq!(ledger.take(&new.token).unwrap().affected, 5);
    }

    #[test]
    fn test_prompt_mentions_count() {
        let mut ledger = ConfirmationLedger::new();
        let pending = ledger.register(delete_all(ItemKind::Flashcards), ids(12));
        assert_eq!(pending.prompt(), "Delete all 12 flashcards? This cannot be undone.");
    }
}
