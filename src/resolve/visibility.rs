use crate::{
    document::store::{LayerId, LayeredDocument},
    foundation::error::TraitStackResult,
    resolve::manifest::TraitSet,
};

/// Make the layers selected by `traits` visible in `doc`, then reveal `effects_layer` if given.
///
/// For every selecting attribute, in order, the top-level layer named after the attribute is
/// looked up:
///
/// - a group whose direct child is named after the trait value reveals only that child,
/// - any other group reveals all of its direct children,
/// - a leaf is revealed as a whole-attribute toggle,
///
/// and the attribute layer itself is always revealed. A revealed child group is revealed together
/// with its whole subtree. The effects layer goes through the same resolution with no trait value.
///
/// The first missing attribute aborts with [`crate::TraitStackError::LayerNotFound`]; layers
/// revealed before the failure stay revealed in `doc`.
#[tracing::instrument(skip_all, fields(index = traits.index()))]
pub fn apply_trait_set(
    doc: &mut LayeredDocument,
    traits: &TraitSet,
    effects_layer: Option<&str>,
) -> TraitStackResult<()> {
    for (attribute, value) in traits.selections() {
        reveal_attribute(doc, attribute, Some(value))?;
    }
    if let Some(effects) = effects_layer {
        reveal_attribute(doc, effects, None)?;
    }
    Ok(())
}

fn reveal_attribute(
    doc: &mut LayeredDocument,
    attribute: &str,
    value: Option<&str>,
) -> TraitStackResult<()> {
    let layer = doc.find_layer(attribute, None)?;

    if doc.layer(layer).is_group() {
        let targeted = value.and_then(|v| doc.find_layer(v, Some(layer)).ok());
        match targeted {
            Some(child) => {
                tracing::debug!(attribute, value, "revealing variant");
                reveal_subtree(doc, child);
            }
            None => {
                tracing::debug!(attribute, value, "revealing whole group");
                let children = doc.layer(layer).children.unwrap_or_default().to_vec();
                for child in children {
                    reveal_subtree(doc, child);
                }
            }
        }
    }

    doc.set_visible(layer, true);
    Ok(())
}

fn reveal_subtree(doc: &mut LayeredDocument, id: LayerId) {
    let mut stack = vec![id];
    while let Some(next) = stack.pop() {
        doc.set_visible(next, true);
        if let Some(children) = doc.layer(next).children {
            stack.extend_from_slice(children);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/visibility.rs"]
mod tests;
