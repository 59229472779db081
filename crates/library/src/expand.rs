//! Cartesian expansion of placeholder values.

use crate::FileList;
use crate::error::{ErrorKind, Result};
use sheaf_template::{Properties, Template};
use std::collections::HashSet;
use tracing::instrument;

/// Values assigned to one placeholder in an expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Values {
    /// The same value for every entry; does not multiply the list.
    Scalar(String),
    /// One copy of every entry per value, in order. Duplicates are kept.
    List(Vec<String>),
}

impl Values {
    pub fn scalar(value: impl ToString) -> Self {
        Self::Scalar(value.to_string())
    }

    pub fn list<T: ToString>(values: impl IntoIterator<Item = T>) -> Self {
        Self::List(values.into_iter().map(|v| v.to_string()).collect())
    }

    /// How many entries each existing entry turns into.
    pub fn multiplier(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::List(values) => values.len(),
        }
    }
}

impl From<&str> for Values {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for Values {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for Values {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for Values {
    fn from(values: Vec<&str>) -> Self {
        Self::list(values)
    }
}

impl<const N: usize> From<[&str; N]> for Values {
    fn from(values: [&str; N]) -> Self {
        Self::list(values)
    }
}

/// One recorded operation in a list's history.
///
/// Replaying the steps of a list against its template with
/// [`FileList::from_steps`] rebuilds the same entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Assignments of one [`FileList::expand`] call, in call order.
    Expand(Vec<(String, Values)>),
    /// The history of a list merged in with [`FileList::merge`].
    Merge(Vec<Step>),
    /// Filenames given to [`FileList::from_filenames`].
    Import(Vec<String>),
}

impl Step {
    fn assigned_names<'a>(&'a self, names: &mut HashSet<&'a str>) {
        match self {
            Self::Expand(assignments) => names.extend(assignments.iter().map(|(name, _)| name.as_str())),
            Self::Merge(steps) => steps.iter().for_each(|step| step.assigned_names(names)),
            Self::Import(_) => {},
        }
    }
}

impl FileList {
    /// Assigns values to placeholders, multiplying the entries by every list.
    ///
    /// Existing entries form the outer loop and each new list the inner one,
    /// so the most recently assigned placeholder varies fastest. Within a call
    /// assignments apply in the order given. The first expansion of a fresh
    /// list starts from a single empty entry.
    ///
    /// # Errors
    /// - [`UnknownPlaceholder`](ErrorKind::UnknownPlaceholder) if the template
    ///   does not declare a name.
    /// - [`DuplicatePlaceholder`](ErrorKind::DuplicatePlaceholder) if a name was
    ///   already assigned, earlier in this call or by a previous step.
    #[instrument(skip_all, fields(template = %self.template, entries = self.entries.len()))]
    pub fn expand<I, K, V>(&self, assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Values>,
    {
        let assignments: Vec<(String, Values)> =
            assignments.into_iter().map(|(name, values)| (name.into(), values.into())).collect();

        let mut used = self.assigned_names();
        for (name, _) in &assignments {
            if !self.template.has_placeholder(name) {
                exn::bail!(ErrorKind::UnknownPlaceholder(name.clone()));
            }
            if !used.insert(name.as_str()) {
                exn::bail!(ErrorKind::DuplicatePlaceholder(name.clone()));
            }
        }

        let mut properties: Vec<Properties> = if self.entries.is_empty() && self.steps.is_empty() {
            vec![Properties::new()]
        } else {
            self.entries.iter().map(|entry| entry.properties.clone()).collect()
        };
        for (name, values) in &assignments {
            properties = match values {
                Values::Scalar(value) => properties.into_iter().map(|p| p.with(name, value)).collect(),
                Values::List(values) => properties
                    .iter()
                    .flat_map(|p| values.iter().map(move |value| p.clone().with(name, value)))
                    .collect(),
            };
        }

        let mut list = self.with_entries(Vec::new());
        list.entries = properties.into_iter().map(|p| list.complete(p)).collect();
        list.steps.push(Step::Expand(assignments));
        tracing::debug!(expanded = list.entries.len(), complete = list.is_complete(), "expanded");
        Ok(list)
    }

    /// Rebuilds a list by replaying recorded steps against `template`.
    pub fn from_steps(template: Template, steps: &[Step]) -> Result<Self> {
        let mut list = Self::new(template);
        for step in steps {
            list = match step {
                Step::Expand(assignments) => list.expand(assignments.iter().cloned())?,
                Step::Merge(steps) => list.merge(&Self::from_steps(list.template.clone(), steps)?)?,
                Step::Import(filenames) => {
                    let imported = Self::from_filenames(list.template.clone(), filenames.iter().cloned())?;
                    if list.steps.is_empty() { imported } else { list.merge(&imported)? }
                },
            };
        }
        Ok(list)
    }

    /// Names assigned by any step or present on any entry.
    fn assigned_names(&self) -> HashSet<&str> {
        let mut names: HashSet<&str> = self.entries.iter().flat_map(|entry| entry.properties.keys()).collect();
        for step in &self.steps {
            step.assigned_names(&mut names);
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sheaf_storage::FileEntry;

    fn list(pattern: &str) -> FileList {
        FileList::from_template(pattern).unwrap()
    }

    fn names(list: &FileList) -> Vec<&str> {
        list.iter().filter_map(FileEntry::filename).collect()
    }

    #[test]
    fn test_later_expansions_vary_fastest() {
        let expanded = list("{p1}_{p2}.txt")
            .expand([("p1", ["a", "b"])])
            .unwrap()
            .expand([("p2", ["1", "2", "3"])])
            .unwrap();
        assert_eq!(names(&expanded), ["a_1.txt", "a_2.txt", "a_3.txt", "b_1.txt", "b_2.txt", "b_3.txt"]);
    }

    #[test]
    fn test_assignments_within_a_call_apply_in_order() {
        let expanded = list("{p1}_{p2}.txt").expand([("p2", ["1", "2"]), ("p1", ["a", "b"])]).unwrap();
        assert_eq!(names(&expanded), ["a_1.txt", "b_1.txt", "a_2.txt", "b_2.txt"]);
        // Properties follow template order whatever order they were assigned in.
        assert_eq!(expanded[0].properties.keys().collect::<Vec<_>>(), ["p1", "p2"]);
    }

    #[rstest]
    #[case(1, 4)]
    #[case(3, 2)]
    #[case(5, 0)]
    fn test_cardinality(#[case] n: usize, #[case] k: usize) {
        let base = list("{a}_{b}.txt").expand([("a", Values::list(0..n))]).unwrap();
        let expanded = base.expand([("b", Values::list(0..k))]).unwrap();
        assert_eq!(expanded.len(), n * k);
    }

    #[test]
    fn test_scalar_does_not_multiply() {
        let expanded = list("{var}_{res}_{date}.tif")
            .expand([("var", Values::from(["ndvi", "evi"])), ("res", Values::from("250m"))])
            .unwrap();
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|e| e.properties.get("res") == Some("250m")));
        assert!(!expanded.is_complete());
    }

    #[test]
    fn test_duplicate_values_are_kept() {
        let expanded = list("{a}.txt").expand([("a", ["x", "x"])]).unwrap();
        assert_eq!(names(&expanded), ["x.txt", "x.txt"]);
    }

    #[test]
    fn test_empty_list_stays_empty() {
        let empty = list("{a}_{b}.txt").expand([("a", Values::List(vec![]))]).unwrap();
        assert!(empty.is_empty());
        // No reseeding once an expansion has happened.
        assert!(empty.expand([("b", ["1"])]).unwrap().is_empty());
    }

    #[test]
    fn test_reusing_a_name_fails() {
        let once = list("{a}_{b}.txt").expand([("a", ["1"])]).unwrap();
        let err = once.expand([("a", ["2"])]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicatePlaceholder(name) if name == "a"));

        let err = list("{a}_{b}.txt").expand([("b", "1"), ("b", "2")]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicatePlaceholder(name) if name == "b"));
    }

    #[test]
    fn test_unknown_name_fails() {
        let err = list("{a}.txt").expand([("z", ["1"])]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownPlaceholder(name) if name == "z"));
    }

    #[test]
    fn test_names_from_merged_lists_count_as_used() {
        let a = list("{a}_{b}.txt");
        let b = list("{a}_{b}.txt").expand([("a", Values::List(vec![]))]).unwrap();
        let merged = a.merge(&b).unwrap();
        let err = merged.expand([("a", ["1"])]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicatePlaceholder(_)));
    }

    #[test]
    fn test_expansion_binds_urls() {
        let bound = list("{a}.txt").set_dir("https://h/d/").expand([("a", ["1"])]).unwrap();
        assert_eq!(bound[0].url(), Some("https://h/d/1.txt"));
    }

    #[test]
    fn test_replay_steps() {
        let template: Template = "{a}_{b}.txt".parse().unwrap();
        let a = FileList::new(template.clone()).expand([("a", ["x", "y"])]).unwrap().expand([("b", "1")]).unwrap();
        let b = FileList::from_filenames(template.clone(), ["z_2.txt"]).unwrap();
        let merged = a.merge(&b).unwrap();

        let replayed = FileList::from_steps(template, merged.steps()).unwrap();
        assert_eq!(replayed.entries(), merged.entries());
        assert_eq!(replayed.steps(), merged.steps());
    }
}
