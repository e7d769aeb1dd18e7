use planlink_protocol::ActionKind;
use planlink_protocol::constants::STEP_FAILED;

/// Rows of a server-side error dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorDump {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ErrorDump {
    /// Parses dump CSV: first row is the header, ragged rows are kept.
    pub fn parse(raw: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(raw);
        let header = reader.headers()?.iter().map(str::to_string).collect();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect::<Vec<_>>()))
            .collect::<Result<_, _>>()?;
        Ok(Self { header, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Outcome of one step of a process action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NestedResult {
    pub object_id: String,
    pub successful: bool,
    pub failure_dump_available: bool,
    pub details: Vec<String>,
    pub error_dump: Option<ErrorDump>,
}

/// Parsed result of a finished task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub kind: ActionKind,
    pub task_id: String,
    pub current_step: String,
    pub successful: bool,
    pub failure_dump_available: bool,
    pub error_dump: Option<ErrorDump>,
    /// Exported file content.
    pub payload: Option<Vec<u8>>,
    /// The payload download stopped early.
    pub truncated: bool,
    pub details: Vec<String>,
    pub nested: Vec<NestedResult>,
}

impl TaskResult {
    pub(crate) fn new(kind: ActionKind, task_id: &str, current_step: &str) -> Self {
        Self {
            kind,
            task_id: task_id.to_string(),
            current_step: current_step.to_string(),
            successful: false,
            failure_dump_available: false,
            error_dump: None,
            payload: None,
            truncated: false,
            details: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// The server reported the `Failed.` step.
    pub fn is_failed(&self) -> bool {
        self.current_step == STEP_FAILED
    }

    /// Detail messages joined into one line.
    pub fn detail(&self) -> String {
        if self.details.is_empty() {
            self.current_step.clone()
        } else {
            self.details.join("; ")
        }
    }
}
