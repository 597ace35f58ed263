//! Index derivation properties.
//!
//! For any crawl store:
//! - exactly one record per site, none for ids outside the store
//! - a record's `meta_content` holds exactly its own tags' fragments
//! - a site without tags gets `None`, never an empty string
//! - deleting a site removes its record on the next rebuild
//! - rebuilding an unchanged store gives identical records

use std::collections::BTreeSet;

use proptest::prelude::*;

use crate::common::{assert_fragments, make_site, make_tag, tags_of};
use pulse::build::build_records;
use pulse::{AnalysisId, CrawlSnapshot, MemoryCrawlStore, SiteIndex};

/// Site ids, plus tags that may point at them or at ids with no site.
fn arb_snapshot() -> impl Strategy<Value = CrawlSnapshot> {
    let ids = prop::collection::btree_set(1i64..60, 0..20);
    let tags = prop::collection::vec((1i64..80, "[a-z:]{1,8}", "[a-z ]{0,12}"), 0..60);
    (ids, tags).prop_map(|(ids, tags)| {
        let sites = ids
            .iter()
            .map(|&id| make_site(id, &format!("Site {}", id)))
            .collect();
        let tags = tags
            .into_iter()
            .map(|(id, name, content)| make_tag(id, &name, &content))
            .collect();
        CrawlSnapshot::new(sites, tags)
    })
}

fn site_ids(snapshot: &CrawlSnapshot) -> BTreeSet<AnalysisId> {
    snapshot.sites.iter().map(|s| s.id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the record set is exactly the site set.
    #[test]
    fn prop_one_record_per_site(snapshot in arb_snapshot()) {
        let output = build_records(&snapshot);
        let record_ids: BTreeSet<AnalysisId> = output.records.keys().copied().collect();
        prop_assert_eq!(record_ids, site_ids(&snapshot));
    }

    /// Property: meta_content carries exactly the site's own fragments.
    #[test]
    fn prop_fragments_match_tags(snapshot in arb_snapshot()) {
        let output = build_records(&snapshot);
        for record in output.records.values() {
            assert_fragments(record, &tags_of(&snapshot, record.id));
        }
    }

    /// Property: no tags means None, and Some is never empty.
    #[test]
    fn prop_tagless_sites_have_no_meta(snapshot in arb_snapshot()) {
        let output = build_records(&snapshot);
        for record in output.records.values() {
            let has_tags = snapshot.tags.iter().any(|t| t.analysis_id == record.id);
            prop_assert_eq!(record.meta_content.is_some(), has_tags);
            prop_assert_ne!(record.meta_content.as_deref(), Some(""));
        }
    }

    /// Property: every tag is either in a record or counted as an orphan.
    #[test]
    fn prop_tags_accounted_for(snapshot in arb_snapshot()) {
        let output = build_records(&snapshot);
        let ids = site_ids(&snapshot);
        let orphans = snapshot.tags.iter().filter(|t| !ids.contains(&t.analysis_id)).count();
        prop_assert_eq!(output.stats.orphan_tags, orphans);
        prop_assert_eq!(output.stats.tags, snapshot.tags.len());
    }

    /// Property: building twice from the same snapshot is a no-op.
    #[test]
    fn prop_rebuild_idempotent(snapshot in arb_snapshot()) {
        let first = build_records(&snapshot);
        let second = build_records(&snapshot);
        prop_assert_eq!(first.records, second.records);
    }

    /// Property: a deleted site is gone after the next rebuild, and only it.
    #[test]
    fn prop_delete_removes_record(snapshot in arb_snapshot(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!snapshot.sites.is_empty());
        let store = MemoryCrawlStore::new();
        for site in &snapshot.sites {
            store.upsert_site(site.clone());
        }
        store.insert_tags(snapshot.tags.iter().cloned());

        let index = SiteIndex::new();
        index.rebuild(&store).unwrap();
        let victim = snapshot.sites[pick.index(snapshot.sites.len())].id;
        prop_assert!(store.delete_analysis(victim));
        index.rebuild(&store).unwrap();

        prop_assert!(index.get(victim).is_err());
        prop_assert_eq!(index.len(), snapshot.sites.len() - 1);
        for record in index.reader().iter() {
            prop_assert_ne!(record.id, victim);
            assert_fragments(record, &tags_of(&snapshot, record.id));
        }
    }
}
