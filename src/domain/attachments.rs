//! Attachment listing returned by the platform's files-links endpoint.
//!
//! The listing is a tree: a list of nodes, a file leaf
//! (`{"type": "file", "url" | "zip_url", "name"}`), or a directory
//! (`{"childNodes": {name: node}}`). A listing may also be a single
//! zipped bundle at the top level. Shapes we do not recognize are kept
//! as raw JSON so they can be logged instead of failing the parse.
//!
//! Directory children keep the order the server sent them in; the walk
//! order decides which of two identical files is kept.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Top-level response of the attachment listing endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttachmentListing {
    /// `{"files": <node>}`
    Tree { files: AttachmentNode },

    /// `{"zip_url": ..., "name": ...}`
    Bundle(BundleLeaf),

    Unrecognized(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundleLeaf {
    pub zip_url: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A node in the attachment tree
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AttachmentNode {
    List(Vec<AttachmentNode>),
    File(FileNode),
    Directory(DirectoryNode),
    Other(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileNode {
    #[serde(rename = "type")]
    _kind: FileTag,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub zip_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FileTag {
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryNode {
    #[serde(rename = "childNodes", deserialize_with = "children_in_order")]
    pub children: Vec<(String, AttachmentNode)>,
}

fn children_in_order<'de, D>(deserializer: D) -> Result<Vec<(String, AttachmentNode)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ChildrenVisitor;

    impl<'de> Visitor<'de> for ChildrenVisitor {
        type Value = Vec<(String, AttachmentNode)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of child nodes")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut children = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                children.push(entry);
            }
            Ok(children)
        }
    }

    deserializer.deserialize_map(ChildrenVisitor)
}

/// A terminal file found while walking the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentEntry {
    /// Directory names from the root, joined with `/` (empty at the root)
    pub relative_dir: String,
    pub url: Option<String>,
    pub name: Option<String>,
}

impl AttachmentEntry {
    fn new(relative_dir: &str, url: Option<&str>, zip_url: Option<&str>, name: Option<&str>) -> Self {
        let url = url
            .filter(|u| !u.is_empty())
            .or(zip_url.filter(|u| !u.is_empty()))
            .map(str::to_string);

        Self {
            relative_dir: relative_dir.to_string(),
            url,
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
        }
    }

    /// Download URL and relative name, if the leaf carries both
    pub fn resolved(&self) -> Option<(&str, String)> {
        let url = self.url.as_deref()?;
        let name = self.name.as_deref()?;
        Some((url, join_relative(&self.relative_dir, name)))
    }
}

impl AttachmentListing {
    /// Terminal files in depth-first order, or `None` for an unrecognized shape
    pub fn entries(&self) -> Option<Vec<AttachmentEntry>> {
        match self {
            Self::Tree { files } => {
                let mut out = Vec::new();
                files.collect_into("", &mut out);
                Some(out)
            }
            Self::Bundle(bundle) => Some(vec![AttachmentEntry::new(
                "",
                bundle.url.as_deref(),
                Some(&bundle.zip_url),
                bundle.name.as_deref(),
            )]),
            Self::Unrecognized(_) => None,
        }
    }
}

impl AttachmentNode {
    fn collect_into(&self, dir: &str, out: &mut Vec<AttachmentEntry>) {
        match self {
            Self::List(nodes) => {
                for node in nodes {
                    match node {
                        // List members are files whatever their "type" says
                        Self::Other(Value::Object(fields)) => out.push(AttachmentEntry::new(
                            dir,
                            field(fields, "url"),
                            field(fields, "zip_url"),
                            field(fields, "name"),
                        )),
                        node => node.collect_into(dir, out),
                    }
                }
            }
            Self::File(file) => out.push(AttachmentEntry::new(
                dir,
                file.url.as_deref(),
                file.zip_url.as_deref(),
                file.name.as_deref(),
            )),
            Self::Directory(directory) => {
                for (name, child) in &directory.children {
                    child.collect_into(&join_relative(dir, name), out);
                }
            }
            Self::Other(value) => warn!(dir, node = %value, "Unrecognized node in files listing"),
        }
    }
}

fn field<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

fn join_relative(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
