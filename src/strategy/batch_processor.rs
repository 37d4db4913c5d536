//! Batch processing with user-group partitioning for async replay
//!
//! `BatchProcessor` splits a batch into groups of operations whose users are
//! transitively related: two operations share a group when they touch a common
//! user, either as actor or as transfer counterparty. Groups touch disjoint
//! accounts, so they can run concurrently while each group runs sequentially in
//! file order. The final state therefore matches a sequential replay.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── TransferService  (shared handle, cloned into each task)
//! ```

use crate::core::{Operation, TransferService};
use crate::strategy::apply_logged;
use crate::types::PaymentError;
use std::collections::HashMap;

/// Result of applying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was applied
    pub operation: Operation,

    /// The outcome of applying it
    pub result: Result<(), PaymentError>,
}

/// Disjoint sets over usernames
#[derive(Debug, Default)]
struct UserSets {
    index: HashMap<String, usize>,
    parent: Vec<usize>,
}

impl UserSets {
    fn id(&mut self, username: &str) -> usize {
        if let Some(&id) = self.index.get(username) {
            return id;
        }
        let id = self.parent.len();
        self.parent.push(id);
        self.index.insert(username.to_string(), id);
        id
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }
}

/// Batch processor with user-group partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    service: TransferService,
}

impl BatchProcessor {
    pub fn new(service: TransferService) -> Self {
        Self { service }
    }

    /// Partition a batch into groups of related operations
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one group
    /// - Operations within a group keep their original order
    /// - No user appears in two groups
    /// - Groups are returned in order of their first operation
    pub fn partition_by_users(&self, batch: Vec<Operation>) -> Vec<Vec<Operation>> {
        let mut sets = UserSets::default();
        for operation in &batch {
            let actor = sets.id(operation.username());
            if let Some(counterparty) = operation.counterparty() {
                let other = sets.id(counterparty);
                sets.union(actor, other);
            }
        }

        let mut groups: Vec<Vec<Operation>> = Vec::new();
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        for operation in batch {
            let actor = sets.id(operation.username());
            let root = sets.find(actor);
            let slot = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(operation);
        }

        groups
    }

    /// Apply one group's operations in order
    ///
    /// Every operation is applied even if earlier ones fail; failures are
    /// logged and captured in the results.
    pub async fn process_group(&self, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(operations.len());

        for operation in operations {
            let result = apply_logged(&self.service, &operation);
            results.push(ProcessingResult { operation, result });
        }

        results
    }

    /// Apply a batch, running independent groups on separate tokio tasks
    ///
    /// Waits for every group to finish. Results are grouped, not in file order.
    pub async fn process_batch(&self, batch: Vec<Operation>) -> Vec<ProcessingResult> {
        let groups = self.partition_by_users(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for operations in groups {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move {
                processor.process_group(operations).await
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(error) => tracing::error!(%error, "replay task failed"),
            }
        }

        results
    }
}
