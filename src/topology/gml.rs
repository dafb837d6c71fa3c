//! GML topology seed.
//!
//! Parses a GML graph describing switches, hosts and the links between
//! them, and converts it into the same topology events live discovery
//! produces. Seeding therefore goes through ordinary event ingestion.
//!
//! ```text
//! graph [
//!   node [ id 1 type "switch" dpid 1 ]
//!   node [ id 101 type "host" mac "00:00:00:00:00:01" ip "10.0.0.1" ]
//!   edge [ source 101 target 1 port 1 ]
//!   edge [ source 1 target 2 bw 50 src_port 2 dst_port 2 ]
//! ]
//! ```

use std::collections::HashMap;
use std::iter::Peekable;
use std::net::IpAddr;
use std::path::Path;
use std::str::Chars;

use color_eyre::eyre::{eyre, Result, WrapErr};
use log::info;

use super::types::{MacAddr, PortNo, SwitchId};
use crate::events::TopologyEvent;

/// A GML value: scalars are kept as text, lists are nested key/value pairs
#[derive(Debug, Clone, PartialEq)]
pub enum GmlValue {
    Scalar(String),
    List(Vec<(String, GmlValue)>),
}

/// A parsed `node [ ... ]` or `edge [ ... ]` block
#[derive(Debug, Clone, Default)]
pub struct GmlRecord {
    pub attributes: HashMap<String, String>,
}

impl GmlRecord {
    fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn parse_opt<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| eyre!("Invalid value '{}' for '{}': {}", raw, key, e)),
        }
    }

    fn parse_req<T: std::str::FromStr>(&self, key: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        self.parse_opt(key)?
            .ok_or_else(|| eyre!("Missing required attribute '{}'", key))
    }
}

#[derive(Debug, Clone, Default)]
pub struct GmlGraph {
    pub nodes: Vec<GmlRecord>,
    pub edges: Vec<GmlRecord>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Key(String),
    Value(String),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // comment to end of line
                while chars.next().is_some_and(|c| c != '\n') {}
            }
            '[' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ']' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                tokens.push(Token::Value(read_quoted(&mut chars)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(Token::Key(read_bare(&mut chars)));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                tokens.push(Token::Value(read_bare(&mut chars)));
            }
            other => return Err(eyre!("Unexpected character '{}' in GML input", other)),
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String> {
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(eyre!("Unterminated string literal"))
}

fn read_bare(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | ':') {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    out
}

/// Parse `key value` pairs until the closing bracket of the current list
fn parse_list(
    tokens: &mut std::vec::IntoIter<Token>,
    top_level: bool,
) -> Result<Vec<(String, GmlValue)>> {
    let mut entries = Vec::new();
    loop {
        let key = match tokens.next() {
            Some(Token::Key(key)) => key,
            Some(Token::Close) if !top_level => return Ok(entries),
            None if top_level => return Ok(entries),
            None => return Err(eyre!("Unexpected end of input, missing ']'")),
            Some(other) => return Err(eyre!("Expected attribute name, found {:?}", other)),
        };
        let value = match tokens.next() {
            Some(Token::Value(v)) | Some(Token::Key(v)) => GmlValue::Scalar(v),
            Some(Token::Open) => GmlValue::List(parse_list(tokens, false)?),
            other => return Err(eyre!("Expected value for '{}', found {:?}", key, other)),
        };
        entries.push((key, value));
    }
}

/// Parse GML text into node and edge records
pub fn parse_gml(input: &str) -> Result<GmlGraph> {
    let mut tokens = tokenize(input)?.into_iter();
    let top = parse_list(&mut tokens, true)?;

    let body = top
        .into_iter()
        .find_map(|(key, value)| match (key.as_str(), value) {
            ("graph", GmlValue::List(body)) => Some(body),
            _ => None,
        })
        .ok_or_else(|| eyre!("GML input has no 'graph [ ... ]' block"))?;

    let mut graph = GmlGraph::default();
    for (key, value) in body {
        let GmlValue::List(fields) = value else {
            continue;
        };
        // nested lists such as `graphics [ ... ]` are not needed for routing
        let attributes = fields
            .into_iter()
            .filter_map(|(k, v)| match v {
                GmlValue::Scalar(s) => Some((k, s)),
                GmlValue::List(_) => None,
            })
            .collect();
        match key.as_str() {
            "node" => graph.nodes.push(GmlRecord { attributes }),
            "edge" => graph.edges.push(GmlRecord { attributes }),
            _ => {}
        }
    }

    Ok(graph)
}

#[derive(Debug, Clone, Copy)]
enum SeedNode {
    Switch(SwitchId),
    Host(MacAddr, Option<IpAddr>),
}

/// Convert a parsed graph into topology events.
///
/// Events are ordered switches first, then inter-switch links, then
/// hosts, each in file order.
pub fn seed_events(graph: &GmlGraph) -> Result<Vec<TopologyEvent>> {
    let mut nodes: HashMap<u64, SeedNode> = HashMap::new();
    let mut switches = Vec::new();

    for record in &graph.nodes {
        let id: u64 = record.parse_req("id")?;
        let kind = record.get("type").unwrap_or("switch");
        let node = match kind {
            "switch" => {
                let dpid = record.parse_opt::<SwitchId>("dpid")?.unwrap_or(id);
                switches.push(TopologyEvent::SwitchJoined { id: dpid });
                SeedNode::Switch(dpid)
            }
            "host" => {
                let mac: MacAddr = record
                    .parse_req("mac")
                    .wrap_err_with(|| format!("Host node {}", id))?;
                let ip = record.parse_opt::<IpAddr>("ip")?;
                SeedNode::Host(mac, ip)
            }
            other => return Err(eyre!("Node {} has unknown type '{}'", id, other)),
        };
        if nodes.insert(id, node).is_some() {
            return Err(eyre!("Duplicate node id {}", id));
        }
    }

    let mut links = Vec::new();
    let mut hosts = Vec::new();

    for record in &graph.edges {
        let source: u64 = record.parse_req("source")?;
        let target: u64 = record.parse_req("target")?;
        let lookup = |id: u64| {
            nodes
                .get(&id)
                .copied()
                .ok_or_else(|| eyre!("Edge references non-existent node {}", id))
        };

        match (lookup(source)?, lookup(target)?) {
            (SeedNode::Switch(src), SeedNode::Switch(dst)) => {
                let bandwidth = match record.parse_opt::<f64>("bw")? {
                    Some(bw) => Some(bw),
                    None => record.parse_opt::<f64>("bandwidth")?,
                };
                links.push(TopologyEvent::LinkAdded {
                    src,
                    dst,
                    bandwidth,
                    src_port: record.parse_opt::<PortNo>("src_port")?,
                    dst_port: record.parse_opt::<PortNo>("dst_port")?,
                });
            }
            (SeedNode::Host(mac, ip), SeedNode::Switch(switch)) => {
                let port = match record.parse_opt::<PortNo>("port")? {
                    Some(port) => Some(port),
                    None => record.parse_opt::<PortNo>("dst_port")?,
                };
                hosts.push(TopologyEvent::HostAdded {
                    mac,
                    switch_id: Some(switch),
                    port,
                    address: ip,
                });
            }
            (SeedNode::Switch(switch), SeedNode::Host(mac, ip)) => {
                let port = match record.parse_opt::<PortNo>("port")? {
                    Some(port) => Some(port),
                    None => record.parse_opt::<PortNo>("src_port")?,
                };
                hosts.push(TopologyEvent::HostAdded {
                    mac,
                    switch_id: Some(switch),
                    port,
                    address: ip,
                });
            }
            (SeedNode::Host(..), SeedNode::Host(..)) => {
                return Err(eyre!(
                    "Edge {} -> {} connects two hosts directly",
                    source,
                    target
                ));
            }
        }
    }

    let mut events = switches;
    events.extend(links);
    events.extend(hosts);
    Ok(events)
}

/// Read a GML seed file and convert it into topology events
pub fn load_seed(path: &Path) -> Result<Vec<TopologyEvent>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read GML seed '{}'", path.display()))?;
    let graph = parse_gml(&content)
        .wrap_err_with(|| format!("Failed to parse GML seed '{}'", path.display()))?;
    let events = seed_events(&graph)?;
    info!(
        "Loaded GML seed {}: {} nodes, {} edges, {} events",
        path.display(),
        graph.nodes.len(),
        graph.edges.len(),
        events.len()
    );
    Ok(events)
}
