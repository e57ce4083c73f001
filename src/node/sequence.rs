//! Index-keyed edits. Later elements shift down on removal; writing at or
//! past the end appends.

use rpds::Vector;

use super::Slot;

pub(super) fn set(slots: &Vector<Slot>, index: usize, slot: Slot) -> Vector<Slot> {
    if index < slots.len() {
        slots.set(index, slot).unwrap_or_else(|| slots.clone())
    } else {
        slots.push_back(slot)
    }
}

pub(super) fn remove(slots: &Vector<Slot>, index: usize) -> Vector<Slot> {
    if index + 1 == slots.len() {
        if let Some(next) = slots.drop_last() {
            return next;
        }
    }
    slots
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, slot)| slot.clone())
        .collect()
}
