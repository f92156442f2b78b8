use std::io::BufRead;

use crate::address::{Address, Segment};
use crate::error::{Error, Result};
use crate::session::Session;
use crate::var::{LiteralReader, Var, VarMap};

use super::{JournalEntry, MODULE_NAME};

const DELETE_KEYWORD: &str = "del";
const IMPORT_KEYWORD: &str = "import";
const RENAME_METHOD: &str = "rename";
/// Top-level functions recorded as calls rather than commands.
const SESSION_FUNCTIONS: &[&str] = &["start", "exit"];

/// Parsed journal line.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `import simlink as <alias>`
    Header { alias: String },
    Entry(JournalEntry),
}

/// Parses one journal line. Blank lines and `#` comments give `None`.
///
/// `alias` is the name the remote root is bound to, as set by the last
/// header line.
pub fn parse_statement(line: &str, alias: &str) -> Result<Option<Statement>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let mut reader = LiteralReader::new(trimmed);

    if reader.eat_keyword(IMPORT_KEYWORD) {
        let module = reader.read_ident();
        if module != Some(MODULE_NAME) || !reader.eat_keyword("as") {
            return Err(reader.error("expected `import simlink as <alias>`"));
        }
        let alias = reader
            .read_ident()
            .ok_or_else(|| reader.error("expected alias"))?
            .to_string();
        finish(&mut reader)?;
        return Ok(Some(Statement::Header { alias }));
    }

    if reader.eat_keyword(DELETE_KEYWORD) {
        let path = read_path(&mut reader, alias)?;
        finish(&mut reader)?;
        return match path.last().and_then(|s| s.instance.clone()) {
            Some(name) => Ok(Some(Statement::Entry(JournalEntry::Delete {
                container: path.container(),
                name,
            }))),
            None => Err(reader.error("only container members can be deleted")),
        };
    }

    let path = read_path(&mut reader, alias)?;
    let entry = if reader.eat('=') {
        let value = reader.read_var()?;
        JournalEntry::Set {
            target: path,
            value,
        }
    } else if reader.eat('(') {
        let (args, kwargs) = read_call_args(&mut reader)?;
        call_entry(path, args, kwargs)
            .ok_or_else(|| reader.error("not a valid call target"))?
    } else {
        return Err(reader.error("expected assignment or call"));
    };
    finish(&mut reader)?;
    Ok(Some(Statement::Entry(entry)))
}

fn finish(reader: &mut LiteralReader) -> Result<()> {
    reader.skip_whitespace();
    if reader.is_done() {
        Ok(())
    } else {
        Err(reader.error("unexpected trailing input"))
    }
}

/// Reads `alias.a.b['inst'].c` into an address.
fn read_path(reader: &mut LiteralReader, alias: &str) -> Result<Address> {
    match reader.read_ident() {
        Some(name) if name == alias => (),
        _ => return Err(reader.error(&format!("expected `{}`", alias))),
    }
    let mut segments: Vec<Segment> = Vec::new();
    loop {
        let mark = reader.position();
        if reader.eat('.') {
            let name = reader
                .read_ident()
                .ok_or_else(|| reader.error("expected name"))?;
            segments.push(Segment::new(name));
        } else if reader.eat('[') {
            let instance = reader.read_string()?;
            reader.expect(']')?;
            match segments.last_mut() {
                Some(last) if last.instance.is_none() => last.instance = Some(instance),
                _ => return Err(reader.error("unexpected instance name")),
            }
        } else {
            reader.reset(mark);
            return Ok(Address::from_segments(segments));
        }
    }
}

/// Reads call arguments up to and including the closing parenthesis.
fn read_call_args(reader: &mut LiteralReader) -> Result<(Vec<Var>, VarMap)> {
    let mut args = Vec::new();
    let mut kwargs = VarMap::new();
    if reader.eat(')') {
        return Ok((args, kwargs));
    }
    loop {
        let mark = reader.position();
        let keyword = match reader.read_ident() {
            Some(name) if reader.eat('=') => Some(name.to_string()),
            _ => None,
        };
        match keyword {
            Some(name) => {
                let value = reader.read_var()?;
                kwargs.insert(name, value);
            }
            None => {
                reader.reset(mark);
                if !kwargs.is_empty() {
                    return Err(reader.error("positional argument after keyword argument"));
                }
                args.push(reader.read_var()?);
            }
        }
        if reader.eat(')') {
            return Ok((args, kwargs));
        }
        reader.expect(',')?;
    }
}

/// Tells apart renames, top-level calls and commands.
fn call_entry(path: Address, args: Vec<Var>, kwargs: VarMap) -> Option<JournalEntry> {
    let segments = path.segments();
    let last = segments.last()?;
    if last.instance.is_some() {
        return None;
    }
    if segments.len() == 1 && SESSION_FUNCTIONS.contains(&last.name.as_str()) {
        return Some(JournalEntry::Call {
            function: last.name.clone(),
            args,
            kwargs,
        });
    }
    let parent = path.parent().unwrap_or_default();
    let renames_member = last.name == RENAME_METHOD
        && parent.last().map(|s| s.instance.is_some()).unwrap_or(false)
        && kwargs.is_empty()
        && args.len() == 1;
    if renames_member {
        if let Var::String(new_name) = &args[0] {
            return Some(JournalEntry::Rename {
                target: parent,
                new_name: new_name.clone(),
            });
        }
    }
    Some(JournalEntry::Execute {
        target: path,
        args,
        kwargs,
    })
}

/// Re-issues every statement of a journal against the session. Top-level
/// calls such as `start` and `exit` are skipped, since the session already
/// exists and stays open, unless the server has a root command of that
/// name, in which case the command is executed.
///
/// Returns the number of entries applied.
pub fn replay<R: BufRead>(reader: R, session: &mut Session) -> Result<usize> {
    let mut alias = super::DEFAULT_ALIAS.to_string();
    let mut applied = 0;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = idx + 1;
        let statement = parse_statement(&line, &alias).map_err(|e| Error::JournalSyntax {
            line: line_number,
            message: e.to_string(),
        })?;
        match statement {
            None => continue,
            Some(Statement::Header { alias: new_alias }) => alias = new_alias,
            Some(Statement::Entry(JournalEntry::Call {
                function,
                args,
                kwargs,
            })) => {
                // `remote.exit()` is also how a root command named `exit` is journaled
                if session.root().child_names()?.contains(&function) {
                    debug!("replay line {}: {}", line_number, line.trim());
                    session.root().child(&function)?.invoke(&args, &kwargs)?;
                    applied += 1;
                } else {
                    debug!("replay: skipping call to `{}` on line {}", function, line_number);
                }
            }
            Some(Statement::Entry(entry)) => {
                debug!("replay line {}: {}", line_number, line.trim());
                apply(&entry, session)?;
                applied += 1;
            }
        }
    }
    Ok(applied)
}

fn apply(entry: &JournalEntry, session: &mut Session) -> Result<()> {
    match entry {
        JournalEntry::Set { target, value } => {
            let last = target
                .last()
                .ok_or_else(|| Error::InvalidMutation("cannot assign to the root".to_string()))?;
            match &last.instance {
                Some(instance) => session
                    .node_at(&target.container())?
                    .as_container()?
                    .create_or_update(instance, value.clone()),
                None => {
                    let name = last.name.clone();
                    let parent = target.parent().unwrap_or_default();
                    session
                        .sub_node_at(&parent)?
                        .set(&name, value.clone())
                }
            }
        }
        JournalEntry::Rename { target, new_name } => {
            let old_name = target
                .last()
                .and_then(|s| s.instance.clone())
                .ok_or_else(|| Error::InvalidMutation(format!("{} is not a member", target)))?;
            session
                .node_at(&target.container())?
                .as_container()?
                .rename(&old_name, new_name)
        }
        JournalEntry::Delete { container, name } => session
            .node_at(container)?
            .as_container()?
            .delete(name),
        JournalEntry::Execute {
            target,
            args,
            kwargs,
        } => session.node_at(target)?.invoke(args, kwargs).map(|_| ()),
        JournalEntry::Call { .. } => Ok(()),
    }
}
