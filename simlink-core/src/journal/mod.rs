//! Replayable record of mutating operations.
//!
//! When started, the journal writes one statement per mutation, e.g.
//!
//! ```text
//! import simlink as remote
//! remote.setup.models.energy.enabled = true
//! remote.setup.boundary_conditions.velocity_inlet['inlet'].rename('cold-inlet')
//! del remote.results.graphics.mesh['mesh-1']
//! remote.solution.run_calculation.iterate(iter_count=100)
//! ```
//!
//! Statements can be read back and re-issued with [`replay`].

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::address::Address;
use crate::error::Result;
use crate::var::{quoted, Var, VarMap};

mod replay;

pub use replay::{parse_statement, replay, Statement};

/// Name of the module imported by the header line.
pub const MODULE_NAME: &str = "simlink";
/// Default name the remote root is bound to in statements.
pub const DEFAULT_ALIAS: &str = "remote";

/// Single mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    /// State written at the address
    Set { target: Address, value: Var },
    /// Container member at `target` renamed
    Rename { target: Address, new_name: String },
    /// Member removed from the container at `container`
    Delete { container: Address, name: String },
    Execute {
        target: Address,
        args: Vec<Var>,
        kwargs: VarMap,
    },
    /// Top-level function call, such as `start` or `exit`
    Call {
        function: String,
        args: Vec<Var>,
        kwargs: VarMap,
    },
}

impl JournalEntry {
    /// Renders the entry as a single statement line.
    pub fn to_statement(&self, alias: &str) -> String {
        match self {
            JournalEntry::Set { target, value } => {
                format!("{} = {}", script_path(alias, target), value.to_literal())
            }
            JournalEntry::Rename { target, new_name } => format!(
                "{}.rename({})",
                script_path(alias, target),
                quoted(new_name)
            ),
            JournalEntry::Delete { container, name } => format!(
                "del {}[{}]",
                script_path(alias, container),
                quoted(name)
            ),
            JournalEntry::Execute {
                target,
                args,
                kwargs,
            } => format!(
                "{}({})",
                script_path(alias, target),
                call_args(args, kwargs)
            ),
            JournalEntry::Call {
                function,
                args,
                kwargs,
            } => format!("{}.{}({})", alias, function, call_args(args, kwargs)),
        }
    }
}

/// Statement form of an address, e.g. `remote.a.b['inst'].c`.
pub fn script_path(alias: &str, address: &Address) -> String {
    let mut path = alias.to_string();
    for segment in address.segments() {
        path.push('.');
        path.push_str(&segment.name);
        if let Some(instance) = &segment.instance {
            path.push('[');
            path.push_str(&quoted(instance));
            path.push(']');
        }
    }
    path
}

fn call_args(args: &[Var], kwargs: &VarMap) -> String {
    args.iter()
        .map(|a| a.to_literal())
        .chain(
            kwargs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.to_literal())),
        )
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append-only statement log.
///
/// Disabled until started with a sink. Each entry is flushed as soon as
/// it's written, and write failures are reported to the caller.
pub struct Journal {
    sink: Option<Box<dyn Write + Send>>,
    alias: String,
}

impl Default for Journal {
    fn default() -> Self {
        Journal {
            sink: None,
            alias: DEFAULT_ALIAS.to_string(),
        }
    }
}

impl Journal {
    pub fn new() -> Self {
        Journal::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Starts writing to the sink, beginning with the header line. A sink
    /// that was already set is replaced and dropped.
    pub fn start(&mut self, mut sink: Box<dyn Write + Send>) -> Result<()> {
        writeln!(sink, "import {} as {}", MODULE_NAME, self.alias)?;
        sink.flush()?;
        self.sink = Some(sink);
        info!("journal started");
        Ok(())
    }

    /// Starts writing to a file, truncating it if it exists.
    pub fn start_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.start(Box::new(file))?;
        info!("journaling to {}", path.as_ref().display());
        Ok(())
    }

    /// Stops journaling and hands back the sink without closing it.
    pub fn stop(&mut self) -> Option<Box<dyn Write + Send>> {
        let sink = self.sink.take();
        if sink.is_some() {
            info!("journal stopped");
        }
        sink
    }

    /// Appends the entry if journaling is enabled.
    pub fn record(&mut self, entry: &JournalEntry) -> Result<()> {
        if let Some(sink) = &mut self.sink {
            let statement = entry.to_statement(&self.alias);
            trace!("journal: {}", statement);
            writeln!(sink, "{}", statement)?;
            sink.flush()?;
        }
        Ok(())
    }
}
