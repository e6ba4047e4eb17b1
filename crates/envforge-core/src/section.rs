//! Section projection
//!
//! Selects the table named by a dotted section path and copies out the part
//! of it that gets exported. Scalars and sequences are always kept; nested
//! tables are kept only when child sections are included.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::resolver::ResolveOptions;
use crate::value::Value;

/// Project the section at `section` out of `root`
///
/// An empty section selects the root table. The returned tree is not yet
/// interpolated.
pub fn project(root: &Value, section: &str, options: &ResolveOptions) -> Result<Value> {
    let mut ancestors: Vec<&IndexMap<String, Value>> = Vec::new();
    let mut current = root;

    if !section.is_empty() {
        for segment in section.split('.') {
            let map = current
                .as_mapping()
                .ok_or_else(|| Error::section_not_an_object(section))?;
            if !std::ptr::eq(current, root) {
                ancestors.push(map);
            }
            current = map
                .get(segment)
                .ok_or_else(|| Error::section_not_found(section))?;
        }
    }

    let target = current
        .as_mapping()
        .ok_or_else(|| Error::section_not_an_object(section))?;

    let mut out = IndexMap::new();

    if options.inherit_parent_values && !options.include_child_sections {
        for ancestor in ancestors {
            copy_entries(ancestor, false, &mut out);
        }
    }
    copy_entries(target, options.include_child_sections, &mut out);

    log::debug!(
        "Projected section '{}' ({} keys)",
        if section.is_empty() { "<root>" } else { section },
        out.len()
    );

    Ok(Value::Mapping(out))
}

fn copy_entries(
    from: &IndexMap<String, Value>,
    include_children: bool,
    into: &mut IndexMap<String, Value>,
) {
    for (key, value) in from {
        if value.is_mapping() && !include_children {
            continue;
        }
        into.insert(key.clone(), value.clone());
    }
}
