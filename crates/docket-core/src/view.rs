use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::ValidationError;
use crate::task::{
  Importance,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
)]
pub enum ImportanceFilter {
  #[default]
  All,
  Only(Importance)
}

impl ImportanceFilter {
  pub fn matches(
    self,
    importance: Importance
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(level) => {
        level == importance
      }
    }
  }
}

impl FromStr for ImportanceFilter {
  type Err = ValidationError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(Self::All);
    }
    s.parse().map(Self::Only)
  }
}

impl fmt::Display for ImportanceFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::All => f.write_str("all"),
      | Self::Only(level) => {
        write!(f, "{level}")
      }
    }
  }
}

/// What the task list is currently showing.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewQuery {
  pub importance: ImportanceFilter,
  pub search:     String
}

impl ViewQuery {
  pub fn new(
    importance: ImportanceFilter,
    search: impl Into<String>
  ) -> Self {
    Self {
      importance,
      search: search.into()
    }
  }

  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if !self
      .importance
      .matches(task.importance)
    {
      return false;
    }

    if !self.search.is_empty() {
      let needle =
        self.search.to_lowercase();
      if !task
        .name
        .to_lowercase()
        .contains(&needle)
      {
        return false;
      }
    }

    true
  }
}

/// Tasks passing both the importance filter and the name search, in
/// collection order.
#[tracing::instrument(skip(tasks), fields(total = tasks.len()))]
pub fn visible<'a>(
  tasks: &'a [Task],
  query: &ViewQuery
) -> Vec<&'a Task> {
  let out: Vec<&Task> = tasks
    .iter()
    .filter(|task| query.matches(task))
    .collect();
  trace!(
    shown = out.len(),
    "computed visible tasks"
  );
  out
}
