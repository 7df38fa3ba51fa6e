// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Line-oriented text format for generated connections.

```text
cortex_to_thalamus:
SingleSynapticConnection:0:0:0.5:3:2:0.25:0
SingleSynapticConnection:1:0:0.5:4:1:0.75:0:delay=0.4:prop=AMPA,1.5,0.8
```

A line ending in `:` names the connection for the lines that follow it.
Connection lines hold source cell, segment and fraction, then the same for
the target, then the kind code. Optional trailing fields carry the
propagation delay and one `prop=` entry per synapse type. Files written by
older tools may instead append `ConnSpecificProps [synapseType: X,
internalDelay: D, weight: W]` blocks; those are read as props too.
*/

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::{ConnKind, ConnSpecificProps, ConnectionStore, Endpoint, SingleConnection};
use crate::types::{ConnError, ConnResult};

const LINE_PREFIX: &str = "SingleSynapticConnection:";
const LEGACY_PROPS: &str = "ConnSpecificProps [";
const DELAY_FIELD: &str = "delay=";
const PROP_FIELD: &str = "prop=";

impl ConnectionStore {
    /// Write every non-empty connection list, names in first-append order
    pub fn write_to<W: Write>(&self, writer: &mut W) -> ConnResult<()> {
        for name in self.names_with_connections() {
            if name.contains('\n') {
                return Err(ConnError::InvalidSpec(format!(
                    "connection name {:?} contains a line break",
                    name
                )));
            }
            writeln!(writer, "{}:", name)?;
            for conn in self.connections_for(name) {
                writeln!(writer, "{}", format_connection(conn)?)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Parse a store from text; blank lines are skipped
    ///
    /// A line ending in `:` is a name line, taken verbatim up to that colon.
    pub fn read_from<R: BufRead>(reader: R) -> ConnResult<ConnectionStore> {
        let mut store = ConnectionStore::new();
        let mut current: Option<String> = None;

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Names keep surrounding whitespace; only text after the final `:` is dropped
            if let Some(name) = line.trim_end().strip_suffix(':') {
                current = Some(name.to_string());
                continue;
            }
            let line = line.trim();
            let name = current.as_deref().ok_or_else(|| ConnError::Parse {
                line: line_no,
                reason: "connection before any connection name".to_string(),
            })?;
            let conn = parse_connection(line).map_err(|reason| ConnError::Parse {
                line: line_no,
                reason,
            })?;
            store.append(name, conn);
        }
        Ok(store)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> ConnResult<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        info!(
            target: "cellnet-connectivity",
            "Saved {} connections to {}",
            self.total_count(),
            path.display()
        );
        Ok(())
    }

    /// Replace the contents of this store with the file's; on any error the store is unchanged
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> ConnResult<()> {
        let path = path.as_ref();
        let loaded = Self::read_from(BufReader::new(File::open(path)?))?;
        *self = loaded;
        info!(
            target: "cellnet-connectivity",
            "Loaded {} connections from {}",
            self.total_count(),
            path.display()
        );
        Ok(())
    }
}

fn format_connection(conn: &SingleConnection) -> ConnResult<String> {
    let mut line = format!(
        "{}{}:{}:{}:{}:{}:{}:{}",
        LINE_PREFIX,
        conn.source.cell_index,
        conn.source.segment_id,
        conn.source.fraction_along,
        conn.target.cell_index,
        conn.target.segment_id,
        conn.target.fraction_along,
        conn.kind.code()
    );
    if conn.ap_propagation_delay != 0.0 {
        line.push_str(&format!(":{}{}", DELAY_FIELD, conn.ap_propagation_delay));
    }
    for props in conn.props.iter().flatten() {
        if props.synapse_type.contains([':', ',', '\n']) {
            return Err(ConnError::InvalidSpec(format!(
                "synapse type {:?} cannot be saved",
                props.synapse_type
            )));
        }
        line.push_str(&format!(
            ":{}{},{},{}",
            PROP_FIELD, props.synapse_type, props.internal_delay, props.weight
        ));
    }
    Ok(line)
}

fn parse_connection(line: &str) -> Result<SingleConnection, String> {
    let line = line.strip_prefix(LINE_PREFIX).unwrap_or(line);
    let (fields, legacy) = match line.find(LEGACY_PROPS) {
        Some(at) => (
            line[..at].trim_end().trim_end_matches(':'),
            Some(&line[at..]),
        ),
        None => (line, None),
    };

    let parts: Vec<&str> = fields.split(':').map(str::trim).collect();
    if parts.len() < 6 {
        return Err(format!("expected at least 6 fields, found {}", parts.len()));
    }
    let source = Endpoint {
        cell_index: parse_field(parts[0], "source cell")?,
        segment_id: parse_field(parts[1], "source segment")?,
        fraction_along: parse_field(parts[2], "source fraction")?,
    };
    let target = Endpoint {
        cell_index: parse_field(parts[3], "target cell")?,
        segment_id: parse_field(parts[4], "target segment")?,
        fraction_along: parse_field(parts[5], "target fraction")?,
    };
    let kind = match parts.get(6) {
        Some(code) => {
            let code: u8 = parse_field(code, "connection kind")?;
            ConnKind::from_code(code).ok_or_else(|| format!("unknown connection kind {}", code))?
        }
        None => ConnKind::MorphologyBased,
    };

    let mut conn = SingleConnection::new(kind, source, target);
    let mut props = Vec::new();
    for extra in parts.iter().skip(7) {
        if let Some(delay) = extra.strip_prefix(DELAY_FIELD) {
            conn.ap_propagation_delay = parse_field(delay, "propagation delay")?;
        } else if let Some(prop) = extra.strip_prefix(PROP_FIELD) {
            props.push(parse_prop(prop)?);
        } else {
            return Err(format!("unrecognised field {:?}", extra));
        }
    }
    if let Some(legacy) = legacy {
        props.extend(parse_legacy_props(legacy)?);
    }
    if !props.is_empty() {
        conn.props = Some(props);
    }
    Ok(conn)
}

fn parse_prop(text: &str) -> Result<ConnSpecificProps, String> {
    let mut pieces = text.split(',');
    match (pieces.next(), pieces.next(), pieces.next(), pieces.next()) {
        (Some(synapse_type), Some(delay), Some(weight), None) if !synapse_type.is_empty() => {
            Ok(ConnSpecificProps {
                synapse_type: synapse_type.to_string(),
                internal_delay: parse_field(delay, "internal delay")?,
                weight: parse_field(weight, "weight")?,
            })
        }
        _ => Err(format!("malformed prop {:?}", text)),
    }
}

/// `ConnSpecificProps [synapseType: X, internalDelay: D, weight: W]`, possibly repeated
fn parse_legacy_props(text: &str) -> Result<Vec<ConnSpecificProps>, String> {
    let mut props = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(LEGACY_PROPS) {
        let body_start = start + LEGACY_PROPS.len();
        let body_len = rest[body_start..]
            .find(']')
            .ok_or_else(|| "unterminated ConnSpecificProps".to_string())?;
        let body = &rest[body_start..body_start + body_len];

        let mut prop = ConnSpecificProps::new("");
        for entry in body.split(',') {
            let (key, value) = entry
                .split_once(':')
                .ok_or_else(|| format!("malformed ConnSpecificProps entry {:?}", entry))?;
            let value = value.trim();
            match key.trim() {
                "synapseType" => prop.synapse_type = value.to_string(),
                "internalDelay" => prop.internal_delay = parse_field(value, "internal delay")?,
                "weight" => prop.weight = parse_field(value, "weight")?,
                other => return Err(format!("unknown ConnSpecificProps entry {:?}", other)),
            }
        }
        props.push(prop);
        rest = &rest[body_start + body_len + 1..];
    }
    Ok(props)
}

fn parse_field<T: std::str::FromStr>(text: &str, what: &str) -> Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {} {:?}", what, text))
}
