//! Reference-chain maintenance.
//!
//! A statement S references T when S's object is a StatementRef to T's id.
//! `refs(S)` is the ordered transitive chain S → T → T's target → …,
//! denormalized onto S's record. Because batches arrive in arbitrary order,
//! storing a statement can also change the chains of statements that already
//! reference it, transitively; the linker drains an explicit worklist of
//! "still needs relinking" ids rather than recursing.

use std::collections::{HashSet, VecDeque};

use tracing::debug;
use uuid::Uuid;

use lrx_store::StatementStore;
use lrx_types::TenantId;

use crate::error::LedgerError;

/// Recomputes reference chains for a batch and everything downstream of it.
pub struct Linker<'a> {
    store: &'a dyn StatementStore,
    tenant: &'a TenantId,
}

impl<'a> Linker<'a> {
    pub fn new(store: &'a dyn StatementStore, tenant: &'a TenantId) -> Self {
        Self { store, tenant }
    }

    /// Relink every statement in the batch, then propagate downward to
    /// persisted referrers, transitively.
    ///
    /// Each id is finalized at most once per invocation; the worklist is
    /// drained to empty. Cycles and missing targets end walks early and are
    /// not errors.
    pub fn link(&self, batch_ids: &[Uuid]) -> Result<(), LedgerError> {
        let mut worklist: VecDeque<Uuid> = batch_ids.iter().copied().collect();
        let mut finalized: HashSet<Uuid> = HashSet::new();

        while let Some(id) = worklist.pop_front() {
            if !finalized.insert(id) {
                continue;
            }

            let refs = self.upward_chain(id)?;
            debug!(%id, chain_len = refs.len(), "relinked statement");
            self.store.set_refs(self.tenant, id, refs)?;

            for referrer in self.store.find_referrers(self.tenant, id)? {
                if !finalized.contains(&referrer.id) {
                    worklist.push_back(referrer.id);
                }
            }
        }

        Ok(())
    }

    /// Follow the StatementRef chain upward from `start`, accumulating the
    /// ids of targets that exist. A missing or already-visited target ends
    /// the walk; the partial chain is the result.
    fn upward_chain(&self, start: Uuid) -> Result<Vec<Uuid>, LedgerError> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([start]);
        let mut current = self.store.get(self.tenant, start)?;

        while let Some(record) = current {
            let Some(target) = record.statement.statement_ref_target() else {
                break;
            };
            if !visited.insert(target) {
                break;
            }
            match self.store.get(self.tenant, target)? {
                Some(next) => {
                    chain.push(target);
                    current = Some(next);
                }
                None => break,
            }
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lrx_store::InMemoryStore;
    use lrx_types::{Statement, StatementRecord};

    fn tenant() -> TenantId {
        TenantId::new("t1")
    }

    // Short ids in the style 0xN0000000-... so failures read easily.
    fn uuid(n: u8) -> Uuid {
        Uuid::from_u128((n as u128) << 96)
    }

    fn plain(id: Uuid) -> Statement {
        serde_json::from_str(&format!(
            r#"{{
                "id": "{id}",
                "actor": {{"mbox": "mailto:a@example.com"}},
                "verb": {{"id": "http://example.com/verbs/did"}},
                "object": {{"id": "http://example.com/activities/quiz"}}
            }}"#,
        ))
        .unwrap()
    }

    fn referencing(id: Uuid, target: Uuid) -> Statement {
        serde_json::from_str(&format!(
            r#"{{
                "id": "{id}",
                "actor": {{"mbox": "mailto:a@example.com"}},
                "verb": {{"id": "http://example.com/verbs/did"}},
                "object": {{"objectType": "StatementRef", "id": "{target}"}}
            }}"#,
        ))
        .unwrap()
    }

    fn insert(store: &InMemoryStore, statement: Statement) -> Uuid {
        let id = statement.id.unwrap();
        store
            .insert(StatementRecord::new(tenant(), id, statement, Utc::now()))
            .unwrap();
        id
    }

    fn refs_of(store: &InMemoryStore, id: Uuid) -> Vec<Uuid> {
        store.get(&tenant(), id).unwrap().unwrap().refs
    }

    #[test]
    fn chains_build_and_propagate_out_of_order() {
        let store = InMemoryStore::new();
        let t = tenant();
        let (a, b, c, d, e) = (uuid(0xA), uuid(0xB), uuid(0xC), uuid(0xD), uuid(0xE));

        // Batch 1: A references the nonexistent E.
        insert(&store, referencing(a, e));
        Linker::new(&store, &t).link(&[a]).unwrap();
        assert_eq!(refs_of(&store, a), Vec::<Uuid>::new());

        // Batch 2: C references A; D references the nonexistent B.
        insert(&store, referencing(c, a));
        insert(&store, referencing(d, b));
        Linker::new(&store, &t).link(&[c, d]).unwrap();
        assert_eq!(refs_of(&store, c), vec![a]);
        assert_eq!(refs_of(&store, d), Vec::<Uuid>::new());

        // Batch 3: B arrives, referencing A; D's chain updates downstream.
        insert(&store, referencing(b, a));
        Linker::new(&store, &t).link(&[b]).unwrap();
        assert_eq!(refs_of(&store, b), vec![a]);
        assert_eq!(refs_of(&store, d), vec![b, a]);
        assert_eq!(refs_of(&store, c), vec![a]);
    }

    #[test]
    fn cycles_terminate() {
        let store = InMemoryStore::new();
        let t = tenant();
        let (x, y) = (uuid(1), uuid(2));

        insert(&store, referencing(x, y));
        insert(&store, referencing(y, x));
        Linker::new(&store, &t).link(&[x, y]).unwrap();

        assert_eq!(refs_of(&store, x), vec![y]);
        assert_eq!(refs_of(&store, y), vec![x]);
    }

    #[test]
    fn self_reference_terminates() {
        let store = InMemoryStore::new();
        let t = tenant();
        let s = uuid(3);

        insert(&store, referencing(s, s));
        Linker::new(&store, &t).link(&[s]).unwrap();
        assert_eq!(refs_of(&store, s), Vec::<Uuid>::new());
    }

    #[test]
    fn plain_statements_have_empty_chains() {
        let store = InMemoryStore::new();
        let t = tenant();
        let p = uuid(4);

        insert(&store, plain(p));
        Linker::new(&store, &t).link(&[p]).unwrap();
        assert_eq!(refs_of(&store, p), Vec::<Uuid>::new());
    }
}
