//! Name-keyed edits. Overwrites keep the member's position; new members go
//! last.

use rpds::Vector;

use super::Slot;

pub(super) fn set(members: &Vector<(String, Slot)>, name: String, slot: Slot) -> Vector<(String, Slot)> {
    match members.iter().position(|(k, _)| *k == name) {
        Some(position) => members
            .set(position, (name, slot))
            .unwrap_or_else(|| members.clone()),
        None => members.push_back((name, slot)),
    }
}

pub(super) fn remove(members: &Vector<(String, Slot)>, name: &str) -> Option<Vector<(String, Slot)>> {
    let position = members.iter().position(|(k, _)| k == name)?;
    if position + 1 == members.len() {
        return members.drop_last();
    }
    Some(
        members
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != position)
            .map(|(_, member)| member.clone())
            .collect(),
    )
}
