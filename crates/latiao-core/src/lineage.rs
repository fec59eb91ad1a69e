//! Dependency resolution over field provenance.

use indexmap::IndexSet;
use latiao_common::types::FieldId;

use crate::context::ExecutionContext;

/// Flattens `sources` to the visible fields they were derived from.
///
/// Visible fields are kept, hidden fields are replaced by their own
/// `ext_from` recursively, and unknown ids are kept verbatim. The result is
/// de-duplicated in first-seen order.
pub fn resolve_dependencies(sources: &[FieldId], ctx: &dyn ExecutionContext) -> Vec<FieldId> {
    let mut out = IndexSet::new();
    let mut stack: Vec<FieldId> = sources.iter().rev().cloned().collect();

    // Provenance only points at fields written earlier, so the walk ends.
    while let Some(fid) = stack.pop() {
        match ctx.field(fid.as_str()) {
            Some(field) if !field.out => {
                stack.extend(field.ext_from().iter().rev().cloned());
            }
            _ => {
                out.insert(fid);
            }
        }
    }

    out.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use latiao_common::types::{ColumnData, ExtInfo, FieldMode, FieldToken};

    use super::*;
    use crate::context::ColumnStore;
    use crate::context::testing::{context, num};

    fn hidden(store: &ColumnStore, from: &[&FieldId]) -> FieldId {
        let token = FieldToken::derived(
            "h",
            FieldMode::Vec,
            ExtInfo::new("$id", from.iter().map(|f| (*f).clone()).collect()),
        );
        let fid = token.fid.clone();
        store.write(token, ColumnData::Numbers(vec![0.0])).unwrap();
        fid
    }

    #[test]
    fn test_chain_flattens_to_visible_root() {
        let store = ColumnStore::new(vec![num("a", vec![1.0])]).unwrap();
        let ctx = context(&store);
        let a = FieldId::new("a");
        let b = hidden(&store, &[&a]);
        let c = hidden(&store, &[&b]);
        let d = hidden(&store, &[&c]);
        assert_eq!(resolve_dependencies(&[d], &ctx), vec![a]);
    }

    #[test]
    fn test_dedup_in_first_seen_order() {
        let store = ColumnStore::new(vec![num("a", vec![1.0]), num("b", vec![2.0])]).unwrap();
        let ctx = context(&store);
        let a = FieldId::new("a");
        let b = FieldId::new("b");
        let ab = hidden(&store, &[&b, &a]);
        let unknown = FieldId::new("ghost");
        assert_eq!(
            resolve_dependencies(&[ab, a.clone(), unknown.clone()], &ctx),
            vec![b, a, unknown]
        );
    }

    #[test]
    fn test_exported_field_is_kept() {
        let store = ColumnStore::new(vec![num("a", vec![1.0])]).unwrap();
        let ctx = context(&store);
        let b = hidden(&store, &[&FieldId::new("a")]);
        store.export(&b, None).unwrap();
        assert_eq!(resolve_dependencies(&[b.clone()], &ctx), vec![b]);
    }
}
