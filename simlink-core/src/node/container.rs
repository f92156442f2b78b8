use fnv::FnvHashMap;

use crate::address::Address;
use crate::channel::Attribute;
use crate::codec::{decode, encode, Variant};
use crate::error::{Error, Result};
use crate::journal::JournalEntry;
use crate::var::{Var, VarMap};

use super::{Link, Node, NodeBase, SubNode};

/// Struct field holding a member's name.
pub const NAME_FIELD: &str = "name";

/// Keyed collection of objects sharing one schema position, e.g. the
/// boundary conditions of a given type.
///
/// Member proxies are created locally on lookup and only hit the server
/// when read or written.
pub struct NamedObjectContainer {
    pub(super) base: NodeBase,
    members: FnvHashMap<String, Node>,
}

impl NamedObjectContainer {
    pub(crate) fn new(link: Link, address: Address) -> Self {
        NamedObjectContainer {
            base: NodeBase::new(link, address),
            members: FnvHashMap::default(),
        }
    }

    pub fn address(&self) -> &Address {
        self.base.address()
    }

    fn link(&self) -> &Link {
        &self.base.link
    }

    /// Names of the existing members, as reported by the server.
    pub fn member_names(&self) -> Result<Vec<String>> {
        self.link()
            .attribute(self.address(), Attribute::ObjectNames)?
            .to_str_list()
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.member_names()?.iter().any(|n| n == name))
    }

    /// Returns the proxy of a member. Nothing is sent to the server, so the
    /// member doesn't need to exist yet.
    pub fn lookup(&mut self, name: &str) -> &mut Node {
        let link = self.base.link.clone();
        let address = self.base.address.member(name);
        self.members
            .entry(name.to_string())
            .or_insert_with(|| Node::SubNode(SubNode::new(link, address)))
    }

    /// Creates the member or overwrites its whole state. `Null` or an empty
    /// struct creates it with default settings.
    pub fn create_or_update(&mut self, name: &str, value: impl Into<Var>) -> Result<()> {
        let value = value.into();
        let address = self.base.address.member(name);
        let creates_default = match &value {
            Var::Null => true,
            Var::Struct(fields) => fields.is_empty(),
            _ => false,
        };
        let state = if creates_default {
            let mut state = Variant::default();
            state.set_field(NAME_FIELD, encode(&Var::from(name)));
            state
        } else {
            encode(&value)
        };
        debug!("set_state {} = {}", address, value);
        self.link().channel.set_state(&address, Some(state))?;
        self.lookup(name);
        self.link().record(JournalEntry::Set {
            target: address,
            value,
        })
    }

    /// Removes a member. Fails with `UnknownAddress` if the server doesn't
    /// know the member.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let names = self.member_names()?;
        if !names.iter().any(|n| n == name) {
            return Err(Error::not_available(name, &names));
        }
        let address = self.base.address.member(name);
        debug!("delete {}", address);
        self.link().channel.set_state(&address, None)?;
        self.members.remove(name);
        self.link().record(JournalEntry::Delete {
            container: self.base.address.clone(),
            name: name.to_string(),
        })
    }

    /// Renames a member. The proxy for the old name is dropped along with
    /// everything cached below it.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let address = self.base.address.member(old);
        let mut state = Variant::default();
        state.set_field(NAME_FIELD, encode(&Var::from(new)));
        debug!("rename {} to {}", address, new);
        self.link().channel.set_state(&address, Some(state))?;
        self.members.remove(old);
        self.lookup(new);
        self.link().record(JournalEntry::Rename {
            target: address,
            new_name: new.to_string(),
        })
    }

    /// Reads the state of every member.
    pub fn bulk_read(&self) -> Result<VarMap> {
        let mut states = VarMap::new();
        for name in self.member_names()? {
            let address = self.base.address.member(&name);
            let state = decode(&self.link().channel.get_state(&address)?)?;
            states.insert(name, state);
        }
        Ok(states)
    }

    pub fn state(&self) -> Result<Var> {
        self.base.state()
    }
}
