use crate::core::{MergeError, MergeResult};
use crate::manifest::document::{Element, ManifestDocument};
use crate::manifest::policy::DedupPolicy;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a kind of declaration lives in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationKind {
    /// Child of the root holding the declarations, or `None` for the root itself
    pub parent: Option<&'static str>,
    pub tag: &'static str,
}

/// Declaration kinds folded from splits into the base, in merge order.
///
/// Another component kind (receiver, provider, ...) is merged by adding an
/// entry here; nothing else changes.
pub const MERGED_DECLARATIONS: [DeclarationKind; 3] = [
    DeclarationKind {
        parent: None,
        tag: "uses-permission",
    },
    DeclarationKind {
        parent: Some("application"),
        tag: "activity",
    },
    DeclarationKind {
        parent: Some("application"),
        tag: "service",
    },
];

const ROOT_TAG: &str = "manifest";

/// Number of declarations of one kind appended from the splits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendCount {
    pub tag: &'static str,
    pub count: usize,
}

/// The base manifest after every split has contributed to it
#[derive(Debug, Clone)]
pub struct MergedManifest {
    pub document: ManifestDocument,
    pub appended: Vec<AppendCount>,
    /// Root attributes removed as split markers
    pub stripped: Vec<String>,
}

impl MergedManifest {
    pub fn appended_total(&self) -> usize {
        self.appended.iter().map(|a| a.count).sum()
    }

    /// Write over the base manifest (or anywhere else)
    pub fn write(&self, path: &Path) -> MergeResult<()> {
        self.document.save(path)
    }
}

/// Merge split manifests into the base manifest.
///
/// Splits are folded in the order given. Each split declaration is compared
/// against the accumulator as it stands at that moment, so later splits see
/// what earlier ones added. Split markers are stripped from the root last.
pub fn merge_manifests<P: AsRef<Path>>(
    base_path: &Path,
    split_paths: &[P],
    policy: DedupPolicy,
) -> MergeResult<MergedManifest> {
    let base = ManifestDocument::load(base_path)?;
    let mut splits = Vec::with_capacity(split_paths.len());
    for path in split_paths {
        let path = path.as_ref();
        splits.push((path.to_path_buf(), ManifestDocument::load(path)?));
    }
    merge_documents(base, base_path, &splits, policy)
}

/// In-memory form of [`merge_manifests`]. Paths are used for error messages.
pub fn merge_documents(
    mut base: ManifestDocument,
    base_path: &Path,
    splits: &[(PathBuf, ManifestDocument)],
    policy: DedupPolicy,
) -> MergeResult<MergedManifest> {
    expect_root(&base, base_path)?;

    let mut appended: Vec<AppendCount> = MERGED_DECLARATIONS
        .iter()
        .map(|kind| AppendCount {
            tag: kind.tag,
            count: 0,
        })
        .collect();

    for (split_path, split) in splits {
        expect_structure(split, split_path)?;
        for (kind, total) in MERGED_DECLARATIONS.iter().zip(appended.iter_mut()) {
            total.count += merge_kind(&mut base, base_path, split, split_path, kind, policy)?;
        }
    }

    let stripped = strip_split_markers(&mut base.root);
    debug!(?stripped, "Removed split markers from manifest root");

    Ok(MergedManifest {
        document: base,
        appended,
        stripped,
    })
}

/// A split must have every declaration parent, even if it contributes nothing
fn expect_structure(doc: &ManifestDocument, path: &Path) -> MergeResult<()> {
    expect_root(doc, path)?;
    for kind in &MERGED_DECLARATIONS {
        if scope(&doc.root, kind).is_none() {
            return Err(missing_parent(path, kind));
        }
    }
    Ok(())
}

fn expect_root(doc: &ManifestDocument, path: &Path) -> MergeResult<()> {
    if doc.root.name != ROOT_TAG {
        return Err(MergeError::Structure(format!(
            "{}: expected root element <{}>, found <{}>",
            path.display(),
            ROOT_TAG,
            doc.root.name
        )));
    }
    Ok(())
}

/// Append every declaration of `kind` from `split` that the accumulator lacks.
/// Returns how many were appended.
///
/// The accumulator only needs the kind's parent element when the split has
/// declarations of that kind. Namespace prefixes used by an appended
/// declaration are declared on the accumulator root if the split's root
/// declares them and the accumulator's does not.
fn merge_kind(
    acc: &mut ManifestDocument,
    acc_path: &Path,
    split: &ManifestDocument,
    split_path: &Path,
    kind: &DeclarationKind,
    policy: DedupPolicy,
) -> MergeResult<usize> {
    let source = scope(&split.root, kind).ok_or_else(|| missing_parent(split_path, kind))?;
    if source.children_named(kind.tag).next().is_none() {
        return Ok(0);
    }
    let target = scope_mut(&mut acc.root, kind).ok_or_else(|| missing_parent(acc_path, kind))?;

    let mut count = 0;
    let mut prefixes = Vec::new();
    for declaration in source.children_named(kind.tag) {
        let present = target
            .children_named(kind.tag)
            .any(|existing| policy.same_declaration(existing, declaration));
        if !present {
            debug!(
                tag = kind.tag,
                name = declaration.attribute("android:name").unwrap_or(""),
                "Appending declaration from {}",
                split_path.display()
            );
            collect_prefixes(declaration, &mut prefixes);
            target.append_child(declaration.clone());
            count += 1;
        }
    }

    for prefix in prefixes {
        let attribute = format!("xmlns:{}", prefix);
        if acc.root.attribute(&attribute).is_some() {
            continue;
        }
        if let Some(uri) = split.root.attribute(&attribute) {
            debug!(%attribute, uri, "Declaring namespace from {}", split_path.display());
            acc.root.set_attribute(attribute, uri);
        }
    }
    Ok(count)
}

/// Namespace prefixes used in element and attribute names under `element`
fn collect_prefixes(element: &Element, prefixes: &mut Vec<String>) {
    let names = std::iter::once(element.name.as_str())
        .chain(element.attributes.iter().map(|(name, _)| name.as_str()));
    for name in names {
        if let Some((prefix, _)) = name.split_once(':') {
            if prefix != "xmlns" && prefix != "xml" && !prefixes.iter().any(|p| p == prefix) {
                prefixes.push(prefix.to_string());
            }
        }
    }
    for child in element.child_elements() {
        collect_prefixes(child, prefixes);
    }
}

fn scope<'a>(root: &'a Element, kind: &DeclarationKind) -> Option<&'a Element> {
    match kind.parent {
        None => Some(root),
        Some(parent) => root.first_child(parent),
    }
}

fn scope_mut<'a>(root: &'a mut Element, kind: &DeclarationKind) -> Option<&'a mut Element> {
    match kind.parent {
        None => Some(root),
        Some(parent) => root.first_child_mut(parent),
    }
}

fn missing_parent(path: &Path, kind: &DeclarationKind) -> MergeError {
    let parent = kind.parent.unwrap_or(ROOT_TAG);
    MergeError::Structure(format!(
        "{}: no <{}> element to hold <{}> declarations",
        path.display(),
        parent,
        kind.tag
    ))
}

/// Whether a root attribute marks split membership or ABI targeting
pub fn is_split_marker(attribute: &str) -> bool {
    let name = attribute.to_ascii_lowercase();
    name.contains("split") || name.contains("base__abi")
}

/// Remove split-marker attributes from the manifest root. Returns the removed
/// names; a second call on the same root removes nothing.
pub fn strip_split_markers(root: &mut Element) -> Vec<String> {
    root.remove_attributes_where(is_split_marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn doc(xml: &str) -> ManifestDocument {
        ManifestDocument::parse(xml, Path::new("test.xml")).unwrap()
    }

    fn merge(base: &str, splits: &[&str]) -> MergeResult<MergedManifest> {
        let splits: Vec<(PathBuf, ManifestDocument)> = splits
            .iter()
            .enumerate()
            .map(|(i, xml)| (PathBuf::from(format!("split_{}.xml", i + 1)), doc(xml)))
            .collect();
        merge_documents(
            doc(base),
            Path::new("base.xml"),
            &splits,
            DedupPolicy::default(),
        )
    }

    fn names<'a>(parent: &'a Element, tag: &'a str) -> Vec<&'a str> {
        parent
            .children_named(tag)
            .map(|e| e.attribute("android:name").unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_permissions_union_in_append_order() {
        let merged = merge(
            r#"<manifest><uses-permission android:name="A"/><application/></manifest>"#,
            &[r#"<manifest><uses-permission android:name="A"/><uses-permission android:name="B"/><application/></manifest>"#],
        )
        .unwrap();

        assert_eq!(names(&merged.document.root, "uses-permission"), vec!["A", "B"]);
        assert_eq!(merged.appended[0], AppendCount { tag: "uses-permission", count: 1 });
    }

    #[test]
    fn test_later_split_sees_earlier_contributions() {
        let merged = merge(
            r#"<manifest><application/></manifest>"#,
            &[
                r#"<manifest><uses-permission android:name="B"/><application/></manifest>"#,
                r#"<manifest><uses-permission android:name="C"/><uses-permission android:name="B"/><application/></manifest>"#,
            ],
        )
        .unwrap();

        assert_eq!(names(&merged.document.root, "uses-permission"), vec!["B", "C"]);
    }

    #[test]
    fn test_service_appended_after_activities() {
        let merged = merge(
            r#"<manifest><application><activity android:name=".Main"/></application></manifest>"#,
            &[r#"<manifest><application><service android:name="S"/></application></manifest>"#],
        )
        .unwrap();

        let app = merged.document.root.first_child("application").unwrap();
        let order: Vec<&str> = app.child_elements().map(|e| e.name.as_str()).collect();
        assert_eq!(order, vec!["activity", "service"]);
        assert_eq!(names(app, "service"), vec!["S"]);
        assert_eq!(merged.appended_total(), 1);
    }

    #[test]
    fn test_activity_with_different_attributes_is_distinct() {
        let merged = merge(
            r#"<manifest><application><activity android:name=".Main"/></application></manifest>"#,
            &[r#"<manifest><application><activity android:name=".Main" android:exported="true"/></application></manifest>"#],
        )
        .unwrap();

        let app = merged.document.root.first_child("application").unwrap();
        assert_eq!(app.children_named("activity").count(), 2);
    }

    #[test]
    fn test_split_without_application_is_structure_error() {
        let err = merge(
            r#"<manifest><application/></manifest>"#,
            &[r#"<manifest><uses-permission android:name="A"/></manifest>"#],
        )
        .unwrap_err();

        match err {
            MergeError::Structure(msg) => {
                assert!(msg.contains("split_1.xml"));
                assert!(msg.contains("<application>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_without_application_is_fine_when_nothing_needs_it() {
        let merged = merge(
            r#"<manifest package="a" split="x"><uses-permission android:name="A"/></manifest>"#,
            &[],
        )
        .unwrap();
        assert_eq!(merged.stripped, vec!["split".to_string()]);
        assert!(merged.document.root.first_child("application").is_none());

        let merged = merge(
            r#"<manifest package="a"/>"#,
            &[r#"<manifest><uses-permission android:name="B"/><application/></manifest>"#],
        )
        .unwrap();
        assert_eq!(names(&merged.document.root, "uses-permission"), vec!["B"]);
    }

    #[test]
    fn test_base_without_application_rejects_component_append() {
        let err = merge(
            r#"<manifest package="a"/>"#,
            &[r#"<manifest><application><service android:name="S"/></application></manifest>"#],
        )
        .unwrap_err();
        match err {
            MergeError::Structure(msg) => {
                assert!(msg.starts_with("base.xml"));
                assert!(msg.contains("<service>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_appended_declaration_brings_its_namespace() {
        let merged = merge(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="a"><application/></manifest>"#,
            &[r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" xmlns:dist="http://schemas.android.com/apk/distribution" xmlns:tools="http://schemas.android.com/tools" split="f"><application><activity android:name=".F" dist:onDemand="true"/></application></manifest>"#],
        )
        .unwrap();

        let root = &merged.document.root;
        assert_eq!(
            root.attribute("xmlns:dist"),
            Some("http://schemas.android.com/apk/distribution")
        );
        // Unused by anything appended
        assert_eq!(root.attribute("xmlns:tools"), None);
        assert_eq!(
            root.attributes.iter().filter(|(k, _)| k == "xmlns:android").count(),
            1
        );

        let xml = merged.document.to_xml().unwrap();
        assert!(xml.contains("xmlns:dist=\"http://schemas.android.com/apk/distribution\""));
    }

    #[test]
    fn test_wrong_root_is_structure_error() {
        let err = merge(
            r#"<manifest><application/></manifest>"#,
            &[r#"<resources/>"#],
        )
        .unwrap_err();
        assert!(matches!(err, MergeError::Structure(_)));
    }

    #[test]
    fn test_strip_split_markers() {
        let mut root = Element::new("manifest")
            .with_attribute("package", "com.example")
            .with_attribute("android:isSplitRequired", "true")
            .with_attribute("android:requiredSplitTypes", "base__abi")
            .with_attribute("split", "config.arm64_v8a")
            .with_attribute("base__abi", "x");

        let removed = strip_split_markers(&mut root);
        assert_eq!(removed.len(), 4);
        assert_eq!(root.attributes, vec![("package".to_string(), "com.example".to_string())]);

        assert!(strip_split_markers(&mut root).is_empty());
        assert_eq!(root.attributes.len(), 1);
    }

    #[test]
    fn test_merge_manifests_from_files() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base.xml");
        let split = temp.path().join("split.xml");
        fs::write(
            &base,
            r#"<manifest package="a" android:isSplitRequired="true"><application/></manifest>"#,
        )
        .unwrap();
        fs::write(
            &split,
            r#"<manifest split="config.en"><application><activity android:name=".B"/></application></manifest>"#,
        )
        .unwrap();

        let merged = merge_manifests(&base, &[&split], DedupPolicy::default()).unwrap();
        merged.write(&base).unwrap();

        let written = ManifestDocument::load(&base).unwrap();
        assert_eq!(written.root.attribute("android:isSplitRequired"), None);
        let app = written.root.first_child("application").unwrap();
        assert_eq!(names(app, "activity"), vec![".B"]);
    }

    #[test]
    fn test_unparseable_split_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("base.xml");
        let split = temp.path().join("split.xml");
        fs::write(&base, "<manifest><application/></manifest>").unwrap();
        fs::write(&split, "<manifest><application></manifest>").unwrap();

        let err = merge_manifests(&base, &[&split], DedupPolicy::default()).unwrap_err();
        match err {
            MergeError::Parse { path, .. } => assert_eq!(path, split),
            other => panic!("unexpected error: {other}"),
        }
    }
}
