//! Proxy tree mirroring the remote model.
//!
//! Nodes are discovered lazily. A child is only resolved, by querying its
//! attributes on the server, the first time it's accessed, and is cached
//! by its parent afterwards. What a node is (a leaf value, a sub-menu, a
//! named object container or a command) is decided once at resolution time
//! and fixed from then on.

use std::fmt;
use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;
use linked_hash_map::LinkedHashMap;

use crate::address::{escape, unescape, Address};
use crate::channel::{Attribute, ModelChannel, CONTAINER_DATA_TYPE};
use crate::codec::{decode, encode, encode_map};
use crate::error::{Error, Result};
use crate::journal::{Journal, JournalEntry};
use crate::var::{Var, VarMap};

mod container;

pub use container::NamedObjectContainer;

/// Field used to pass positional arguments to commands.
pub const POSITIONAL_ARGS_FIELD: &str = "tui_args";

/// Handles shared by all nodes of a session.
#[derive(Clone)]
pub(crate) struct Link {
    pub channel: Arc<dyn ModelChannel>,
    pub journal: Arc<Mutex<Journal>>,
}

impl Link {
    pub fn record(&self, entry: JournalEntry) -> Result<()> {
        self.journal
            .lock()
            .map_err(|_| Error::Other("journal lock poisoned".to_string()))?
            .record(&entry)
    }

    pub fn attribute(&self, address: &Address, attribute: Attribute) -> Result<Var> {
        trace!("get_attribute_value {} {:?}", address, attribute);
        decode(&self.channel.get_attribute_value(address, attribute)?)
    }
}

/// Kind of a node, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    SubNode,
    Container,
    Command,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "leaf",
            NodeKind::SubNode => "sub-node",
            NodeKind::Container => "named object container",
            NodeKind::Command => "command",
        };
        write!(f, "{}", name)
    }
}

/// Data and behavior common to all node kinds.
pub struct NodeBase {
    link: Link,
    address: Address,
    help: Option<String>,
    extended: Option<bool>,
}

impl NodeBase {
    pub(crate) fn new(link: Link, address: Address) -> Self {
        NodeBase {
            link,
            address,
            help: None,
            extended: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Help text, fetched on first use.
    pub fn help(&mut self) -> Result<&str> {
        if self.help.is_none() {
            let help = match self.link.attribute(&self.address, Attribute::HelpString)? {
                Var::Null => String::new(),
                var => var.as_str()?.to_string(),
            };
            self.help = Some(help);
        }
        Ok(self.help.as_deref().unwrap_or(""))
    }

    /// Whether calling without arguments reads state. Fetched on first use.
    pub fn is_extended(&mut self) -> Result<bool> {
        match self.extended {
            Some(extended) => Ok(extended),
            None => {
                let extended = match self.link.attribute(&self.address, Attribute::IsExtendedMenu)? {
                    Var::Null => false,
                    var => var.as_bool()?,
                };
                self.extended = Some(extended);
                Ok(extended)
            }
        }
    }

    pub fn state(&self) -> Result<Var> {
        debug!("get_state {}", self.address);
        decode(&self.link.channel.get_state(&self.address)?)
    }

    /// Overwrites the state at this address.
    pub fn write(&self, value: Var) -> Result<()> {
        debug!("set_state {} = {}", self.address, value);
        self.link
            .channel
            .set_state(&self.address, Some(encode(&value)))?;
        self.link.record(JournalEntry::Set {
            target: self.address.clone(),
            value,
        })
    }

    /// Executes the command at this address.
    ///
    /// Named arguments are sent as they are. Without named arguments the
    /// positional ones are sent as a list under `POSITIONAL_ARGS_FIELD`.
    pub fn execute(&self, args: &[Var], kwargs: &VarMap) -> Result<Var> {
        let (sent_args, wire_args) = if kwargs.is_empty() {
            let mut wire_args = LinkedHashMap::new();
            wire_args.insert(
                POSITIONAL_ARGS_FIELD.to_string(),
                encode(&Var::List(args.to_vec())),
            );
            (args.to_vec(), wire_args)
        } else {
            if !args.is_empty() {
                warn!(
                    "{}: positional arguments are ignored when named arguments are given",
                    self.address
                );
            }
            (Vec::new(), encode_map(kwargs))
        };
        debug!("execute_command {}", self.address);
        let reply = self.link.channel.execute_command(&self.address, wire_args)?;
        self.link.record(JournalEntry::Execute {
            target: self.address.clone(),
            args: sent_args,
            kwargs: kwargs.clone(),
        })?;
        decode(&reply)
    }

    /// Calls the node.
    ///
    /// Named arguments always execute. Otherwise extended nodes read their
    /// state and all others execute with the positional arguments.
    pub fn invoke(&mut self, args: &[Var], kwargs: &VarMap) -> Result<Var> {
        if kwargs.is_empty() && self.is_extended()? {
            return self.state();
        }
        self.execute(args, kwargs)
    }
}

/// Value leaf of the model.
pub struct Leaf {
    base: NodeBase,
}

impl Leaf {
    pub fn get(&self) -> Result<Var> {
        self.base.state()
    }

    pub fn set(&self, value: impl Into<Var>) -> Result<()> {
        self.base.write(value.into())
    }
}

/// Remote command.
pub struct Command {
    base: NodeBase,
}

impl Command {
    pub fn execute(&self, args: &[Var], kwargs: &VarMap) -> Result<Var> {
        self.base.execute(args, kwargs)
    }
}

/// Menu with a fixed set of named children.
pub struct SubNode {
    base: NodeBase,
    children: FnvHashMap<String, Node>,
}

impl SubNode {
    pub(crate) fn new(link: Link, address: Address) -> Self {
        SubNode {
            base: NodeBase::new(link, address),
            children: FnvHashMap::default(),
        }
    }

    /// Wire names of the children, as reported by the server.
    pub fn child_names(&self) -> Result<Vec<String>> {
        self.base
            .link
            .attribute(&self.base.address, Attribute::ChildNames)?
            .to_str_list()
    }

    /// Returns the child node, resolving it on first access. Reserved
    /// names can be given in either form, `import` or `import_`.
    pub fn child(&mut self, name: &str) -> Result<&mut Node> {
        let key = unescape(name).to_string();
        if !self.children.contains_key(&key) {
            let names = self.child_names()?;
            if !names.contains(&key) {
                debug!("{} has no child {}", self.base.address, key);
                return Err(Error::not_available(&key, &names));
            }
            let address = self.base.address.child(&escape(&key));
            let node = Node::resolve(self.base.link.clone(), address)?;
            self.children.insert(key.clone(), node);
        }
        self.children
            .get_mut(&key)
            .ok_or_else(|| Error::UnknownAddress(name.to_string()))
    }

    /// Writes the state of a child.
    pub fn set(&mut self, name: &str, value: impl Into<Var>) -> Result<()> {
        let child = self.child(name)?;
        if child.kind() == NodeKind::Command {
            return Err(Error::SchemaMismatch(format!(
                "{} is a command and can't be assigned to",
                child.address()
            )));
        }
        child.base().write(value.into())
    }

    /// Reads a child by calling it without arguments.
    pub fn get(&mut self, name: &str) -> Result<Var> {
        self.child(name)?.call()
    }

    pub fn state(&self) -> Result<Var> {
        self.base.state()
    }

    /// Overwrites the whole state of this node.
    pub fn write(&self, value: impl Into<Var>) -> Result<()> {
        self.base.write(value.into())
    }
}

/// Single node of the model tree.
pub enum Node {
    Leaf(Leaf),
    SubNode(SubNode),
    Container(NamedObjectContainer),
    Command(Command),
}

impl Node {
    /// Queries the server to find out what kind of node sits at the address.
    pub(crate) fn resolve(link: Link, address: Address) -> Result<Node> {
        let data_type = link.attribute(&address, Attribute::DataType)?;
        if data_type.as_str().map(|s| s == CONTAINER_DATA_TYPE).unwrap_or(false) {
            trace!("{} resolved as {}", address, NodeKind::Container);
            return Ok(Node::Container(NamedObjectContainer::new(link, address)));
        }
        let child_names = link.attribute(&address, Attribute::ChildNames)?.to_str_list()?;
        if !child_names.is_empty() {
            trace!("{} resolved as {}", address, NodeKind::SubNode);
            return Ok(Node::SubNode(SubNode::new(link, address)));
        }
        let mut base = NodeBase::new(link, address);
        let node = if base.is_extended()? {
            Node::Leaf(Leaf { base })
        } else {
            Node::Command(Command { base })
        };
        trace!("{} resolved as {}", node.address(), node.kind());
        Ok(node)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::SubNode(_) => NodeKind::SubNode,
            Node::Container(_) => NodeKind::Container,
            Node::Command(_) => NodeKind::Command,
        }
    }

    pub fn base(&self) -> &NodeBase {
        match self {
            Node::Leaf(n) => &n.base,
            Node::SubNode(n) => &n.base,
            Node::Container(n) => &n.base,
            Node::Command(n) => &n.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            Node::Leaf(n) => &mut n.base,
            Node::SubNode(n) => &mut n.base,
            Node::Container(n) => &mut n.base,
            Node::Command(n) => &mut n.base,
        }
    }

    pub fn address(&self) -> &Address {
        self.base().address()
    }

    pub fn help(&mut self) -> Result<&str> {
        self.base_mut().help()
    }

    pub fn state(&self) -> Result<Var> {
        self.base().state()
    }

    /// Calls the node. Containers always read their state.
    pub fn invoke(&mut self, args: &[Var], kwargs: &VarMap) -> Result<Var> {
        match self {
            Node::Container(container) => container.state(),
            _ => self.base_mut().invoke(args, kwargs),
        }
    }

    /// Calls the node without arguments.
    pub fn call(&mut self) -> Result<Var> {
        self.invoke(&[], &VarMap::new())
    }

    /// Shorthand for navigating into a sub-node's child.
    pub fn child(&mut self, name: &str) -> Result<&mut Node> {
        self.as_sub_node()?.child(name)
    }

    /// Shorthand for looking up a container member.
    pub fn member(&mut self, name: &str) -> Result<&mut Node> {
        Ok(self.as_container()?.lookup(name))
    }

    /// Shorthand for writing a sub-node's child.
    pub fn set(&mut self, name: &str, value: impl Into<Var>) -> Result<()> {
        self.as_sub_node()?.set(name, value)
    }

    /// Shorthand for reading a sub-node's child.
    pub fn get(&mut self, name: &str) -> Result<Var> {
        self.as_sub_node()?.get(name)
    }

    fn mismatch(&self, expected: NodeKind) -> Error {
        Error::SchemaMismatch(format!(
            "{} is a {}, not a {}",
            self.address(),
            self.kind(),
            expected
        ))
    }

    pub fn as_leaf(&mut self) -> Result<&mut Leaf> {
        match self {
            Node::Leaf(n) => Ok(n),
            _ => Err(self.mismatch(NodeKind::Leaf)),
        }
    }

    pub fn as_sub_node(&mut self) -> Result<&mut SubNode> {
        match self {
            Node::SubNode(n) => Ok(n),
            _ => Err(self.mismatch(NodeKind::SubNode)),
        }
    }

    pub fn as_container(&mut self) -> Result<&mut NamedObjectContainer> {
        match self {
            Node::Container(n) => Ok(n),
            _ => Err(self.mismatch(NodeKind::Container)),
        }
    }

    pub fn as_command(&mut self) -> Result<&mut Command> {
        match self {
            Node::Command(n) => Ok(n),
            _ => Err(self.mismatch(NodeKind::Command)),
        }
    }
}
