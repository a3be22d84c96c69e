//! Renders registry/dispenser outcomes into RESP reply [`Frame`]s, per the
//! reply shapes in spec §6.1 and the `info` field order in §9.

use dispenser_core::{DispenserSnapshot, ReconfigureOutcome};

use crate::resp::Frame;

/// `hset`'s reply: the number of fields it accepted.
pub fn hset_reply(field_count: usize, outcome: ReconfigureOutcome) -> Frame {
    match outcome {
        ReconfigureOutcome::Unchanged => Frame::Integer(0),
        ReconfigureOutcome::Created | ReconfigureOutcome::Reconfigured => {
            Frame::Integer(field_count as i64)
        }
    }
}

/// `get`'s reply: the generated identifier as a bulk string.
pub fn get_reply(identifier: String) -> Frame {
    Frame::bulk(identifier)
}

/// `del`'s reply: `1` if a dispenser was removed, `0` if it was absent.
pub fn del_reply(removed: bool) -> Frame {
    Frame::Integer(i64::from(removed))
}

/// `ping`'s reply.
pub fn ping_reply() -> Frame {
    Frame::Simple("PONG".to_string())
}

/// `info`'s reply: newline-separated `key:value` lines, in the field order
/// of spec §9: `name`, `type`, kind-specific fields, `current` (monotonic
/// only), `auto_disk`, `generated`, and for monotonic kinds `wasted` and
/// `waste_rate`.
pub fn info_reply(name: &str, snapshot: &DispenserSnapshot) -> Frame {
    let mut lines = vec![
        format!("name:{name}"),
        format!("type:{}", snapshot.config.kind.as_str()),
    ];

    for (key, value) in &snapshot.kind_fields {
        lines.push(format!("{key}:{value}"));
    }

    if let Some(current) = snapshot.current {
        lines.push(format!("current:{current}"));
    }

    lines.push(format!("auto_disk:{}", snapshot.config.durability.as_str()));
    lines.push(format!("generated:{}", snapshot.stats.generated));

    if snapshot.current.is_some() {
        lines.push(format!("wasted:{}", snapshot.stats.wasted));
        lines.push(format!("waste_rate:{}", snapshot.stats.waste_rate()));
    }

    Frame::bulk(lines.join("\n"))
}
