use std::fmt;
use std::sync::Arc;

/// One navigation step away from a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// Follow the foreign key with this navigation name.
    Foreign(&'static str),
    /// Follow the only foreign key that reaches this table.
    ToTable(&'static str),
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Self::Foreign(name) | Self::ToTable(name) => name,
        }
    }
}

/// The way a table handle was reached: a root table under an alias,
/// followed by zero or more foreign key navigations.
///
/// Two handles reached through the same steps compare equal and resolve to
/// the same join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TablePath {
    root_table: &'static str,
    root_alias: Arc<str>,
    steps: Vec<Step>,
    table: &'static str,
}

impl TablePath {
    #[must_use]
    pub fn root(table: &'static str) -> Self {
        Self::aliased(table, table)
    }

    #[must_use]
    pub fn aliased(table: &'static str, alias: &str) -> Self {
        Self {
            root_table: table,
            root_alias: Arc::from(alias),
            steps: Vec::new(),
            table,
        }
    }

    /// Extends the path along the foreign key `fk` that leads to `target`.
    #[must_use]
    pub fn navigate(&self, fk: &'static str, target: &'static str) -> Self {
        self.push(Step::Foreign(fk), target)
    }

    /// Extends the path towards `target` along a foreign key chosen at
    /// resolution time.
    #[must_use]
    pub fn navigate_to(&self, target: &'static str) -> Self {
        self.push(Step::ToTable(target), target)
    }

    fn push(&self, step: Step, target: &'static str) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step);
        Self {
            root_table: self.root_table,
            root_alias: Arc::clone(&self.root_alias),
            steps,
            table: target,
        }
    }

    /// The table this path ends at.
    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    #[must_use]
    pub const fn root_table(&self) -> &'static str {
        self.root_table
    }

    #[must_use]
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// The SQL alias of the table at the end of the path.
    ///
    /// Root tables use their alias; each navigation appends `__<name>`, so
    /// `athlete.club()` becomes `athlete__club`.
    #[must_use]
    pub fn alias(&self) -> String {
        let mut alias = String::from(&*self.root_alias);
        for step in &self.steps {
            alias.push_str("__");
            alias.push_str(step.label());
        }
        alias
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root_alias)?;
        for step in &self.steps {
            write!(f, ".{}()", step.label())?;
        }
        Ok(())
    }
}
