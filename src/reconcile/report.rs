use std::fmt;

/// Where a record failed on its way into the stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The remote JSON did not map onto a typed record
    Validation,
    /// The relational transaction was rolled back
    Relational,
    /// The relational row committed but the vector write failed
    Vector,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Relational => "relational",
            Self::Vector => "vector",
        };
        f.write_str(label)
    }
}

/// One record that could not be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub remote_id: Option<i64>,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of saving a batch of records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    /// Records written to every store they belong in
    pub saved: usize,
    pub failures: Vec<RecordFailure>,
}

impl SaveReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn record_failure(
        &mut self,
        remote_id: Option<i64>,
        stage: FailureStage,
        message: impl Into<String>,
    ) {
        self.failures.push(RecordFailure {
            remote_id,
            stage,
            message: message.into(),
        });
    }

    /// Folds another report into this one
    pub fn absorb(&mut self, other: SaveReport) {
        self.saved += other.saved;
        self.failures.extend(other.failures);
    }
}

/// Outcome of saving shipping zones with their methods, and shipping classes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingReport {
    pub zones: SaveReport,
    pub methods: SaveReport,
    pub classes: SaveReport,
}

impl ShippingReport {
    pub fn failed(&self) -> usize {
        self.zones.failed() + self.methods.failed() + self.classes.failed()
    }
}
