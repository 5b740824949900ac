use std::collections::BTreeMap;

use slotmap::new_key_type;

new_key_type! {
    /// Arena key for a [`Node`] in the working set.
    pub struct NodeId;
}

/// A cluster node and its attributes.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub uname: String,
    pub online: bool,
    /// Node state is unknown and it must be fenced before it can be trusted.
    pub unclean: bool,
    pub attrs: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: impl Into<String>, uname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uname: uname.into(),
            online: true,
            unclean: false,
            attrs: BTreeMap::new(),
        }
    }

    /// Look up an attribute, including the built-in `#uname`, `#id` and `#kind`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "#uname" => Some(&self.uname),
            "#id" => Some(&self.id),
            "#kind" => Some("cluster"),
            _ => self.attrs.get(name).map(String::as_str),
        }
    }
}
