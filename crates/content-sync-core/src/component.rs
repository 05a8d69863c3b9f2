//! Version-nibble based component marker.
//!
//! Components are content items owned by exactly one parent's rich text and
//! never addressed on their own. The remote marks them structurally rather
//! than with a flag: their id carries `0x01` in byte 6 of the UUID, the byte
//! that holds the version nibble in standard UUIDs (characters `14..16` of
//! the hyphenated form, e.g. `xxxxxxxx-xxxx-01xx-xxxx-xxxxxxxxxxxx`).
//!
//! The predicate is recomputed from the id every time; nothing stores it.

use uuid::Uuid;

use crate::models::ModularContentMap;

/// Byte index of the version field in the 16-byte UUID layout.
const VERSION_BYTE: usize = 6;

/// Value of the version byte that marks a component.
const COMPONENT_MARKER: u8 = 0x01;

/// Returns `true` if `item_id` carries the component marker.
///
/// Ids that do not parse as UUIDs are never components.
pub fn is_component_id(item_id: &str) -> bool {
    Uuid::parse_str(item_id)
        .map(|id| id.as_bytes()[VERSION_BYTE] == COMPONENT_MARKER)
        .unwrap_or(false)
}

/// Remove component entries from a modular content map.
pub fn strip_components(modular: &mut ModularContentMap) {
    modular.retain(|_, item| !is_component_id(&item.system.id));
}
