//! AndroidManifest.xml document model and merger.
//!
//! A split's permissions, activities and services are appended to the base
//! manifest when no equal declaration is already present, then split markers
//! are stripped from the root so the result describes one standalone package.

pub mod document;
pub mod merger;
pub mod policy;

pub use document::{Element, ManifestDocument, Node, XmlDeclaration};
pub use merger::{
    is_split_marker, merge_documents, merge_manifests, strip_split_markers, AppendCount,
    DeclarationKind, MergedManifest, MERGED_DECLARATIONS,
};
pub use policy::DedupPolicy;
