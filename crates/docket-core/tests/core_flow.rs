use docket_core::datastore::{BlobStore, MemoryStore, TASKS_KEY, TaskStore};
use docket_core::{
    Due, ImportanceFilter, Recurrence, SequentialIds, TaskDraft, TaskEngine, TaskError,
    ValidationError, ViewQuery,
};
use tempfile::tempdir;

fn due(raw: &str) -> Due {
    Due::parse(raw).expect("valid due")
}

#[test]
fn monthly_bill_regenerates_next_month() {
    let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
    let id = engine
        .add_task(
            TaskDraft::new("Pay bills", "High")
                .with_recurring(Recurrence::Monthly)
                .with_due(due("2024-01-15")),
        )
        .expect("add task")
        .id
        .clone();

    let outcome = engine.toggle_complete(&id).expect("toggle complete");
    assert!(outcome.completed);

    let tasks = engine.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, id);
    assert!(tasks[0].completed);
    assert_eq!(tasks[0].due_date, Some(due("2024-01-15")));

    assert_eq!(tasks[1].name, "Pay bills");
    assert_eq!(tasks[1].due_date.map(|d| d.to_string()).as_deref(), Some("2024-02-15"));
    assert!(!tasks[1].completed);
    assert_eq!(Some(tasks[1].id.clone()), outcome.spawned);
}

#[test]
fn step_toggles_drive_progress_and_completion() {
    let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
    let id = engine
        .add_task(TaskDraft::new("Errands", "Medium").with_steps(["A", "B"]))
        .expect("add task")
        .id
        .clone();

    let task = engine.toggle_step(&id, 0).expect("toggle A");
    assert_eq!(task.progress(), 50.0);
    assert!(!task.completed);

    let task = engine.toggle_step(&id, 1).expect("toggle B");
    assert_eq!(task.progress(), 100.0);
    assert!(task.completed);
}

#[test]
fn toggling_a_step_twice_restores_state() {
    let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
    let id = engine
        .add_task(TaskDraft::new("Errands", "Medium").with_steps(["A", "B", "C"]))
        .expect("add task")
        .id
        .clone();
    engine.toggle_step(&id, 2).expect("seed step");

    let before = engine.get(&id).cloned().expect("task");
    for index in 0..3 {
        engine.toggle_step(&id, index).expect("first toggle");
        let after = engine.toggle_step(&id, index).expect("second toggle");
        assert_eq!(after.progress(), before.progress());
        assert_eq!(after.completed, before.completed);
    }
}

#[test]
fn empty_name_is_rejected_without_touching_the_collection() {
    let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
    engine
        .add_task(TaskDraft::new("keep me", "Low"))
        .expect("add task");

    let err = engine
        .add_task(TaskDraft::new("", "High"))
        .expect_err("empty name");
    assert_eq!(err, TaskError::Validation(ValidationError::EmptyName));
    assert_eq!(engine.len(), 1);
}

#[test]
fn high_filter_returns_high_tasks_in_order() {
    let mut engine = TaskEngine::open(MemoryStore::new(), SequentialIds::default());
    for (name, importance) in [("a", "High"), ("b", "Low"), ("c", "High"), ("d", "Medium")] {
        engine
            .add_task(TaskDraft::new(name, importance))
            .expect("add task");
    }

    let filter: ImportanceFilter = "high".parse().expect("filter");
    let names: Vec<&str> = engine
        .visible(&ViewQuery::new(filter, ""))
        .into_iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, ["a", "c"]);
}

#[test]
fn blob_store_round_trips_the_collection() {
    let temp = tempdir().expect("tempdir");
    let store = BlobStore::open(temp.path()).expect("open store");

    let mut engine = TaskEngine::open(&store, SequentialIds::default());
    engine
        .add_task(
            TaskDraft::new("Stretch", "Low")
                .with_due(due("2024-05-01 07:30"))
                .with_recurring(Recurrence::Daily)
                .with_steps(["neck", "back"]),
        )
        .expect("add task");
    engine.add_task(TaskDraft::new("Read", "Medium")).expect("add task");
    engine.toggle_step("task-1", 1).expect("toggle step");
    engine.toggle_complete("task-2").expect("toggle complete");

    let saved = engine.tasks().to_vec();
    let loaded = store.load().expect("load");
    assert_eq!(loaded, saved);

    let reopened = TaskEngine::open(&store, SequentialIds::default());
    assert_eq!(reopened.tasks(), saved.as_slice());
}

#[test]
fn blob_store_round_trips_seconds_and_reopened_tasks() {
    let temp = tempdir().expect("tempdir");
    let store = BlobStore::open(temp.path()).expect("open store");

    let mut engine = TaskEngine::open(&store, SequentialIds::default());
    engine
        .add_task(TaskDraft::new("Standup", "High").with_due(due("2024-01-15 09:30:45")))
        .expect("add task");
    engine
        .add_task(TaskDraft::new("Tidy desk", "Low").with_steps(["papers"]))
        .expect("add task");
    engine.toggle_step("task-2", 0).expect("toggle step");
    let outcome = engine.toggle_complete("task-2").expect("reopen");
    assert!(!outcome.completed);

    let saved = engine.tasks().to_vec();
    assert_eq!(store.load().expect("load"), saved);

    let reopened = TaskEngine::open(&store, SequentialIds::default());
    assert_eq!(reopened.tasks(), saved.as_slice());
    assert_eq!(
        reopened.tasks()[0].due_date.map(|d| d.to_string()).as_deref(),
        Some("2024-01-15 09:30")
    );
    assert!(!reopened.tasks()[1].completed);
}

#[test]
fn corrupt_blob_starts_an_empty_collection() {
    let store = MemoryStore::new();
    store.put(TASKS_KEY, "[{\"id\": 1");

    let engine = TaskEngine::open(&store, SequentialIds::default());
    assert!(engine.is_empty());
}

#[test]
fn legacy_blob_is_normalized_on_load() {
    let store = MemoryStore::new();
    store.put(
        TASKS_KEY,
        r#"[
            {"id": "a", "name": "Old", "dueDate": "2024-01-15 09:00", "importance": "High",
             "recurring": true, "completed": false},
            {"id": "b", "name": "Stale", "dueDate": "", "importance": "Low",
             "recurring": "none", "completed": false,
             "steps": [{"name": "x", "completed": true}, {"name": "y", "completed": true}],
             "progress": 12}
        ]"#,
    );

    let engine = TaskEngine::open(&store, SequentialIds::default());
    let old = engine.get("a").expect("legacy task");
    assert_eq!(old.recurring, Recurrence::Daily);

    let stale = engine.get("b").expect("stale task");
    assert_eq!(stale.progress(), 100.0);
    assert!(!stale.completed);
}

struct FailingStore;

impl TaskStore for FailingStore {
    fn load(&self) -> anyhow::Result<Vec<docket_core::Task>> {
        Err(anyhow::anyhow!("disk unavailable"))
    }

    fn save(&self, _tasks: &[docket_core::Task]) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("disk full"))
    }
}

#[test]
fn persistence_failures_do_not_block_state_changes() {
    let mut engine = TaskEngine::open(FailingStore, SequentialIds::default());
    let id = engine
        .add_task(TaskDraft::new("still works", "High"))
        .expect("add despite failing store")
        .id
        .clone();
    engine.toggle_complete(&id).expect("toggle despite failing store");

    assert_eq!(engine.len(), 1);
    assert!(engine.tasks()[0].completed);
}
