use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};

use research_trends::corpus::ingest::{institutes_from_json, reports_from_json};
use research_trends::researcher::Signals;
use research_trends::{
    CorpusIndex, Engine, EngineConfig, Error, Filter, InstituteDirectory, ProfileKey, Report, Scope, ScopeFilter,
    SearchRequest, SimpleTokenizer, SortMode, Stopwords,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn report_records() -> Vec<Value> {
    vec![
        json!({"id": "r1", "year": 2018, "title": "Urban heat island study", "institute": "City Institute",
               "scope": "local", "url": "http://r/1", "authors": "Kim Minji, Lee Jun"}),
        json!({"id": "r2", "year": "2019", "title": "Urban heat adaptation", "institute": "City Institute",
               "scope": "local", "authors": ["Kim Minji"]}),
        json!({"id": "r3", "year": 2020, "title": "Flood resilience planning", "institute": "City Institute",
               "scope": "local", "authors": [{"name": "Lee Jun"}, {"name": "Hydrogen Kim"}]}),
        json!({"id": "r4", "year": 2021, "title": "Grid storage policy", "institute": "Energy Lab",
               "scope": "national", "authors": "Park Sora; Kim Minji"}),
        json!({"id": "r5", "year": 2022, "title": "Hydrogen grid storage", "institute": "Energy Lab",
               "scope": "national", "authors": ["Park Sora"]}),
        json!({"id": "r6", "year": 2022, "title": "Hydrogen economy roadmap", "institute": "Energy Lab",
               "scope": "national", "authors": ["Park Sora", "Choi Yuna"]}),
        json!({"id": "r7", "year": 2022, "title": "Hydrogen fuel cells", "institute": "Policy Institute",
               "scope": "national", "authors": ["Choi Yuna"]}),
        json!({"id": "r8", "year": 2022, "title": "Hydrogen safety rules", "institute": "Policy Institute",
               "scope": "national", "authors": "Han Bit"}),
        json!({"id": "r9", "year": 2022, "institute": "Policy Institute", "scope": "national"}),
        json!({"report_id": "r10", "pub_year": "2021-05-01", "name": "Urban mobility pricing",
               "org": "Policy Institute", "type": "national", "link": "http://r/10",
               "authors": "Choi Yuna / Han Bit"}),
    ]
}

fn institute_records() -> Vec<Value> {
    vec![
        json!({"name": "City Institute", "scope": "local"}),
        json!({"name": "Energy Lab", "scope": "national", "group": "nct"}),
        json!({"name": "Policy Institute", "scope": "national", "council": "NRC"}),
    ]
}

fn corpus() -> (Vec<Report>, InstituteDirectory) {
    let reports = reports_from_json(&report_records(), Scope::Local).unwrap();
    let directory = institutes_from_json(&institute_records(), Scope::National).unwrap();
    (reports, directory)
}

fn engine() -> Engine {
    init_logger();
    let (reports, directory) = corpus();
    Engine::new(reports, directory, Stopwords::new(), EngineConfig::default()).unwrap()
}

#[test]
fn ingestion_normalizes_record_shapes() {
    let (reports, directory) = corpus();
    assert_eq!(reports.len(), 9);
    let last = reports.last().unwrap();
    assert_eq!(last.id, "r10");
    assert_eq!(last.year, Some(2021));
    assert_eq!(last.institute, "Policy Institute");
    assert_eq!(last.authors, vec!["Choi Yuna", "Han Bit"]);
    assert_eq!(directory.resolve_group("energy lab", Scope::National), Some("NCT"));

    let err = reports_from_json(&[json!("not a record")], Scope::Local).unwrap_err();
    assert!(matches!(err, Error::Ingest { position: 0, .. }));
}

#[test]
fn council_code_selects_group_members() {
    let engine = engine();
    let snap = engine.snapshot();
    let overview = snap.overview(&Filter::new().scope("national").institute("nrc"));
    assert_eq!(overview.total, 3);
    assert_eq!(overview.institutes, 1);
    assert_eq!(snap.overview(&Filter::new()).local, 3);
}

#[test]
fn stopword_rebuild_drops_keyword_and_isolates_cache() {
    let engine = engine();
    let old = engine.snapshot();
    let before = old.keyword_stats(&Filter::new(), 1);
    assert_eq!(before.keywords[0].keyword, "hydrogen");
    assert_eq!(old.rising_keywords(&Filter::new(), 10).items[0].keyword, "hydrogen");

    let generation = engine.add_stopwords(["hydrogen"]).unwrap();
    let new = engine.snapshot();
    assert_eq!(new.generation(), generation);
    assert_ne!(new.generation(), old.generation());
    assert!(!new.index().keyword_counts().contains_key("hydrogen"));

    let after = new.keyword_stats(&Filter::new(), 1);
    assert!(!Arc::ptr_eq(&before, &after));
    assert_ne!(after.keywords[0].keyword, "hydrogen");
    assert!(new.rising_keywords(&Filter::new(), 10).items.is_empty());
    assert_eq!(new.cache().generation(), generation);

    // readers still holding the old snapshot keep a consistent view
    assert_eq!(old.index().keyword_count("hydrogen"), 4);
    assert!(Arc::ptr_eq(&before, &old.keyword_stats(&Filter::new(), 1)));
}

#[test]
fn rising_keywords_with_one_year_is_empty() {
    let engine = engine();
    let rising = engine.snapshot().rising_keywords(&Filter::new().year("2022"), 10);
    assert!(rising.items.is_empty());
    assert_eq!(rising.compare_year, None);

    let rising = engine.snapshot().rising_keywords(&Filter::new(), 10);
    assert_eq!((rising.base_year, rising.compare_year), (Some(2021), Some(2022)));
    assert!(rising.items.iter().all(|i| i.compare_count >= 3));
    assert!(rising.items.windows(2).all(|w| w[0].growth >= w[1].growth));
}

#[test]
fn burst_keywords_are_well_formed() {
    let engine = engine();
    let burst = engine.snapshot().burst_keywords(&Filter::new(), 10);
    assert_eq!(burst.last_year, Some(2022));
    assert_eq!(burst.items.len(), 1);
    let item = &burst.items[0];
    assert_eq!(item.keyword, "hydrogen");
    assert_eq!(item.last_val, 4);
    assert!(item.z > 2.0);
}

#[test]
fn heatmap_cells_are_bounded() {
    let engine = engine();
    let snap = engine.snapshot();
    for filter in [Filter::new(), Filter::new().scope("national"), Filter::new().year("2022")] {
        let map = snap.heatmap(&filter, 8);
        assert_eq!(map.values.len(), map.institutes.len());
        assert!(map.values.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    }
}

#[test]
fn keyword_series_resolves_punctuated_input() {
    let engine = engine();
    let snap = engine.snapshot();
    let series = snap.keyword_series(&Filter::new(), " Hydro-gen! ").unwrap();
    assert_eq!(series.resolved.as_deref(), Some("hydrogen"));
    assert!(series.points.iter().any(|p| p.count > 0));

    let missing = snap.keyword_series(&Filter::new(), "quantum").unwrap();
    assert!(missing.points.iter().all(|p| p.count == 0));
    assert!(matches!(snap.keyword_series(&Filter::new(), "  "), Err(Error::MissingParameter { .. })));
    assert!(snap.related_reports(&Filter::new(), "", 5).is_err());
}

#[test]
fn related_reports_are_newest_first() {
    let engine = engine();
    let related = engine.snapshot().related_reports(&Filter::new(), "GRID", 10).unwrap();
    let ids: Vec<&str> = related.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r5", "r4"]);
}

#[test]
fn empty_query_ranks_without_similarity() {
    let engine = engine();
    let page = engine.snapshot().search(ScopeFilter::All, &SearchRequest::new("")).unwrap();
    assert_eq!(page.total, engine.snapshot().researcher_model(ScopeFilter::All).len());
    assert!(page.items.iter().all(|i| i.signals.similarity == 0.0));
    assert!(page.items.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn exact_name_match_outranks_similar_profiles() {
    let engine = engine();
    let snap = engine.snapshot();
    for sort in [SortMode::Relevance, SortMode::Match] {
        let page = snap.search(ScopeFilter::All, &SearchRequest::new("hydrogen KIM").sort(sort)).unwrap();
        let top = &page.items[0];
        assert_eq!(top.name, "Hydrogen Kim");
        assert_eq!(top.signals.similarity, 0.0);
        // others match the topic far better
        assert!(page.items[1..].iter().any(|i| i.signals.similarity > 0.3));
    }
}

#[test]
fn ranking_is_deterministic_across_engines() {
    let request = SearchRequest::new("grid storage").page(3, 0);
    let a = engine().snapshot().search(ScopeFilter::All, &request).unwrap();
    let b = engine().snapshot().search(ScopeFilter::All, &request).unwrap();
    let keys = |p: &research_trends::SearchPage| p.items.iter().map(|i| i.key.clone()).collect::<Vec<_>>();
    assert_eq!(keys(&a), keys(&b));
    assert_eq!(a.total, b.total);
    let mut leaders = keys(&a)[..2].to_vec();
    leaders.sort();
    assert_eq!(
        leaders,
        vec![ProfileKey::new("Kim Minji", "Energy Lab"), ProfileKey::new("park sora", "Energy Lab")]
    );
    assert!(a.items.iter().all(|i| (0.0..=1.0).contains(&i.confidence)));
}

#[test]
fn similar_researchers_and_detail() {
    let engine = engine();
    let snap = engine.snapshot();
    let park = ProfileKey::new("Park Sora", "Energy Lab");
    let similar = snap.similar_researchers(ScopeFilter::National, &park, 5);
    assert!(!similar.is_empty());
    assert!(similar.iter().all(|s| s.key != park && (0.0..=1.0).contains(&s.similarity)));

    let detail = snap.researcher(ScopeFilter::National, &park).unwrap();
    assert_eq!(detail.profile.report_count, 3);
    assert_eq!(detail.profile.groups.iter().collect::<Vec<_>>(), vec!["NCT"]);
    assert_eq!(detail.collaborators, vec!["choi yuna", "kim minji"]);
    assert!(snap.researcher(ScopeFilter::Local, &park).is_none());
}

#[test]
fn confidence_weights_are_fixed() {
    let s = Signals { similarity: 0.30, coverage: 0.45, productivity: 1.5, ..Signals::default() };
    assert!((s.confidence() - (0.65 * 0.5 + 0.25 * 0.5 + 0.10 * 0.5)).abs() < 1e-9);
    let s = Signals { similarity: 1.0, coverage: 1.0, productivity: 0.0, recency: 20.0, collab: 0.0, focus: 1.0, name_boost: 3.0 };
    assert!((s.score() - (7.0 + 2.0 + 0.6 + 0.35 + 3.0)).abs() < 1e-9);
}

#[test]
fn readers_see_whole_snapshots_during_rebuilds() {
    let engine = Arc::new(engine());
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..50 {
                    let snap = engine.snapshot();
                    let stats = snap.keyword_stats(&Filter::new(), 20);
                    for kw in &stats.keywords {
                        assert_eq!(snap.index().keyword_count(&kw.keyword), kw.count);
                        assert!(!snap.stopwords().contains(&kw.keyword));
                    }
                }
            })
        })
        .collect();
    for round in 0..10 {
        if round % 2 == 0 {
            engine.add_stopwords(["urban", "grid"]).unwrap();
        } else {
            engine.invalidate(Stopwords::new()).unwrap();
        }
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(engine.generation(), 11);
}

#[test]
fn cbor_snapshot_warm_start() {
    let engine = engine();
    let bytes = engine.snapshot().index().to_cbor().unwrap();
    let index = CorpusIndex::from_cbor(&bytes).unwrap();
    let (_, directory) = corpus();
    let restored = Engine::from_index(
        index,
        directory,
        Stopwords::new(),
        EngineConfig::default(),
        Arc::new(SimpleTokenizer::default()),
    );
    assert_eq!(restored.generation(), engine.generation());
    assert_eq!(
        restored.snapshot().keyword_stats(&Filter::new(), 5),
        engine.snapshot().keyword_stats(&Filter::new(), 5)
    );
    // rebuilds continue from the restored generation
    assert_eq!(restored.add_stopwords(["urban"]).unwrap(), engine.generation() + 1);
}
