//! Entry point tying the model tree, field data and journal together.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::address::Address;
use crate::channel::{FieldChannel, ModelChannel};
use crate::error::{Error, Result};
use crate::field::{FieldData, FieldDataConfig, FieldInfo};
use crate::journal::{Journal, JournalEntry};
use crate::node::{Link, Node, SubNode};
use crate::var::{Var, VarMap};

/// Connection to a single remote server.
///
/// Owns the channels and the journal. Everything reachable from
/// [`Session::root`] shares them.
pub struct Session {
    model: Arc<dyn ModelChannel>,
    fields: Arc<dyn FieldChannel>,
    journal: Arc<Mutex<Journal>>,
    root: SubNode,
    field_data: FieldData,
    closed: bool,
}

impl Session {
    pub fn new(model: Arc<dyn ModelChannel>, fields: Arc<dyn FieldChannel>) -> Self {
        Session::with_config(model, fields, FieldDataConfig::default())
    }

    pub fn with_config(
        model: Arc<dyn ModelChannel>,
        fields: Arc<dyn FieldChannel>,
        field_config: FieldDataConfig,
    ) -> Self {
        let journal = Arc::new(Mutex::new(Journal::new()));
        let link = Link {
            channel: model.clone(),
            journal: journal.clone(),
        };
        Session {
            root: SubNode::new(link, Address::root()),
            field_data: FieldData::new(fields.clone(), field_config),
            model,
            fields,
            journal,
            closed: false,
        }
    }

    /// Root of the model tree.
    pub fn root(&mut self) -> &mut SubNode {
        &mut self.root
    }

    /// Navigates to the node at the address, resolving every node on the
    /// way. The root itself isn't a `Node`, see [`Session::root`].
    pub fn node_at(&mut self, address: &Address) -> Result<&mut Node> {
        let mut segments = address.segments().iter();
        let first = segments
            .next()
            .ok_or_else(|| Error::InvalidAddress("expected a non-root address".to_string()))?;
        let mut node = self.root.child(&first.name)?;
        if let Some(instance) = &first.instance {
            node = node.member(instance)?;
        }
        for segment in segments {
            node = node.child(&segment.name)?;
            if let Some(instance) = &segment.instance {
                node = node.member(instance)?;
            }
        }
        Ok(node)
    }

    /// Like [`Session::node_at`], but also accepts the root address.
    pub fn sub_node_at(&mut self, address: &Address) -> Result<&mut SubNode> {
        if address.is_root() {
            return Ok(&mut self.root);
        }
        self.node_at(address)?.as_sub_node()
    }

    /// Batch of field data requests.
    pub fn field_data(&mut self) -> &mut FieldData {
        &mut self.field_data
    }

    pub fn field_info(&self) -> FieldInfo {
        FieldInfo::new(self.fields.clone())
    }

    fn journal(&self) -> Result<MutexGuard<'_, Journal>> {
        self.journal
            .lock()
            .map_err(|_| Error::Other("journal lock poisoned".to_string()))
    }

    pub fn start_journal(&self, sink: Box<dyn Write + Send>) -> Result<()> {
        self.journal()?.start(sink)
    }

    pub fn start_journal_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.journal()?.start_file(path)
    }

    /// Stops journaling, handing back the sink.
    pub fn stop_journal(&self) -> Result<Option<Box<dyn Write + Send>>> {
        Ok(self.journal()?.stop())
    }

    pub fn is_journaling(&self) -> Result<bool> {
        Ok(self.journal()?.is_enabled())
    }

    /// Journals a call to a top-level function, e.g. `start('server.txt')`.
    pub fn record_call(&self, function: &str, args: Vec<Var>) -> Result<()> {
        self.journal()?.record(&JournalEntry::Call {
            function: function.to_string(),
            args,
            kwargs: VarMap::new(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Ends the session and closes the channel. Calling it again does
    /// nothing. The channel is closed even when the journal can't be
    /// written, and the journal error is returned.
    pub fn exit(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let journaled = self.record_call("exit", Vec::new());
        self.closed = true;
        info!("closing session");
        let closed = self.model.close();
        journaled.and(closed)
    }
}
