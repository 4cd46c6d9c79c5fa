use uuid::Uuid;

/// Source of task ids. Ids must be unique for the lifetime of the process;
/// nothing else about their shape is assumed. The engine retries an id that
/// is already taken a bounded number of times, then gives up with
/// `TaskError::IdsExhausted`.
pub trait IdProvider {
    fn new_id(&mut self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdProvider for UuidIds {
    fn new_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `task-1`, `task-2`, ... ids.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: u64,
}

impl IdProvider for SequentialIds {
    fn new_id(&mut self) -> String {
        self.next += 1;
        format!("task-{}", self.next)
    }
}
