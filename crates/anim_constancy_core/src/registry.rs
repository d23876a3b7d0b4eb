use std::collections::HashMap;

/// Non-animation mutation facts supplied by the embedding tooling: component
/// types whose mere presence forces a fixed list of their properties to be
/// treated as variable (e.g. physics or constraint components that write
/// transforms every frame).
///
/// Unknown component types simply contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct ComponentMutationRegistry {
    entries: HashMap<String, Vec<String>>,
}

impl ComponentMutationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        properties: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.entries
            .entry(type_name.into())
            .or_default()
            .extend(properties.into_iter().map(Into::into));
    }

    pub fn forced_properties(&self, type_name: &str) -> Option<&[String]> {
        self.entries.get(type_name).map(Vec::as_slice)
    }
}
