//! The set of named relations (edge layers) and the current-relation cursor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relations {
    names: Vec<String>,
    current: usize,
}

impl Default for Relations {
    fn default() -> Self {
        Self::new()
    }
}

impl Relations {
    /// Starts with a single unnamed relation.
    pub fn new() -> Self {
        Self {
            names: vec![String::new()],
            current: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.names.len()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_name(&self) -> &str {
        &self.names[self.current]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Appends a relation and returns its index. The cursor moves only when `switch` is set.
    pub fn add(&mut self, name: impl Into<String>, switch: bool) -> usize {
        self.names.push(name.into());
        let index = self.names.len() - 1;

        if switch {
            self.current = index;
        }

        index
    }

    pub fn rename_current(&mut self, name: impl Into<String>) {
        self.names[self.current] = name.into();
    }

    /// Moves the cursor. Returns whether it changed.
    pub fn set(&mut self, index: usize) -> Result<bool> {
        if index >= self.names.len() {
            return Err(Error::invalid(format!(
                "relation index {index} out of range (0..{})",
                self.names.len()
            )));
        }

        let changed = self.current != index;
        self.current = index;
        Ok(changed)
    }

    /// Advances the cursor, staying put on the last relation.
    ///
    /// # Examples
    ///
    /// ```
    /// use socnet::relation::Relations;
    ///
    /// let mut relations = Relations::new();
    /// relations.add("friendship", false);
    ///
    /// assert!(relations.next());
    /// assert!(!relations.next());
    /// assert_eq!(relations.current(), 1);
    /// ```
    pub fn next(&mut self) -> bool {
        if self.current + 1 < self.names.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Steps the cursor back, staying put on the first relation.
    pub fn previous(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Back to a single unnamed relation.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new() {
        let relations = Relations::new();

        assert_eq!(relations.count(), 1);
        assert_eq!(relations.current(), 0);
        assert_eq!(relations.current_name(), "");
    }

    #[test]
    fn add_without_switch() {
        let mut relations = Relations::new();

        assert_eq!(relations.add("advice", false), 1);
        assert_eq!(relations.current(), 0);

        assert_eq!(relations.add("trust", true), 2);
        assert_eq!(relations.current(), 2);
        assert_eq!(relations.current_name(), "trust");
    }

    #[test]
    fn clamp_at_boundaries() {
        let mut relations = Relations::new();
        relations.add("b", false);

        assert!(!relations.previous());
        assert_eq!(relations.current(), 0);

        assert!(relations.next());
        assert!(!relations.next());
        assert_eq!(relations.current(), 1);

        assert!(relations.previous());
        assert_eq!(relations.current(), 0);
    }

    #[test]
    fn set_out_of_range() {
        let mut relations = Relations::new();

        assert!(matches!(relations.set(3), Err(Error::InvalidParameter(_))));
        assert_eq!(relations.set(0), Ok(false));
    }

    #[test]
    fn rename_and_clear() {
        let mut relations = Relations::new();
        relations.add("x", true);
        relations.rename_current("y");

        assert_eq!(relations.names(), ["".to_string(), "y".to_string()]);

        relations.clear();
        assert_eq!(relations, Relations::new());
    }
}
