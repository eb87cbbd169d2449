mod helpers;

use helpers::{MemoryFetcher, api_url, catalog, loaded_catalog, strings_url, wiki_url};
use std::sync::Arc;
use std::time::Duration;
use wowdex::catalog::SearchQuery;
use wowdex::data::{Flavor, Locale};
use wowdex::error::CoreError;
use wowdex::fetch::FetchError;

#[tokio::test]
async fn list_keys_in_upstream_order() {
    let (_, catalog) = loaded_catalog().await;
    assert_eq!(
        catalog.list_keys(Flavor::Mainline).unwrap(),
        vec!["OKAY", "CANCEL"]
    );
}

#[tokio::test]
async fn search_returns_only_requested_locale() {
    let (_, catalog) = loaded_catalog().await;

    let results = catalog.search(&SearchQuery::new("okay")).unwrap();
    assert_eq!(results.keys().collect::<Vec<_>>(), vec!["OKAY"]);
    let okay = &results["OKAY"];
    assert_eq!(okay.len(), 1);
    assert_eq!(okay.get(&Locale::EnUs).map(String::as_str), Some("Okay"));
}

#[tokio::test]
async fn search_matches_localized_text() {
    let (_, catalog) = loaded_catalog().await;

    let query = SearchQuery {
        locale: Some(Locale::DeDe),
        flavor: Some(Flavor::Classic),
        ..SearchQuery::new("abbrechen")
    };
    let results = catalog.search(&query).unwrap();
    assert_eq!(results.keys().collect::<Vec<_>>(), vec!["CANCEL"]);
    assert_eq!(
        results["CANCEL"].get(&Locale::DeDe).map(String::as_str),
        Some("Abbrechen")
    );
}

#[tokio::test]
async fn multi_term_search_interleaves() {
    let (_, catalog) = loaded_catalog().await;
    let results = catalog.search(&SearchQuery::new("cancel|okay")).unwrap();
    assert_eq!(results.keys().collect::<Vec<_>>(), vec!["CANCEL", "OKAY"]);
}

#[tokio::test]
async fn empty_query_matches_nothing() {
    let (_, catalog) = loaded_catalog().await;
    assert!(catalog.search(&SearchQuery::new("  ")).unwrap().is_empty());
}

#[tokio::test]
async fn get_values_omits_unknown_keys() {
    let (_, catalog) = loaded_catalog().await;
    let values = catalog
        .get_values(Flavor::Vanilla, &["CANCEL", "NOPE"])
        .unwrap();
    assert_eq!(values.len(), 1);
    let cancel = &values["CANCEL"];
    assert_eq!(cancel.len(), Locale::COUNT);
    assert_eq!(cancel.get(&Locale::DeDe).map(String::as_str), Some("Abbrechen"));
}

#[tokio::test]
async fn reads_before_population_are_not_ready() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let catalog = catalog(&fetcher);

    assert!(matches!(
        catalog.list_keys(Flavor::Mainline),
        Err(CoreError::NotInitialized { .. })
    ));
    assert!(matches!(
        catalog.search(&SearchQuery::new("okay")),
        Err(CoreError::NotInitialized { .. })
    ));
    assert!(!catalog.is_ready());
}

#[tokio::test]
async fn invalid_partition_keys_are_rejected() {
    assert!(matches!(
        "retail2".parse::<Flavor>(),
        Err(CoreError::InvalidKey { kind: "flavor", .. })
    ));
    assert!(matches!(
        "xxXX".parse::<Locale>(),
        Err(CoreError::InvalidKey { kind: "locale", .. })
    ));
}

#[tokio::test]
async fn failed_refresh_keeps_previous_snapshot() {
    let (fetcher, catalog) = loaded_catalog().await;

    // Mainline would change, but vanilla is down: the whole cycle is rejected.
    fetcher.set_strings(Flavor::Mainline, "CHANGED = \"Changed\";");
    fetcher.fail(strings_url(Flavor::Vanilla, Locale::FrFr), 503);

    let err = catalog.strings().refresh().await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Fetch(FetchError::Status { status: 503, .. })
    ));
    assert_eq!(
        catalog.list_keys(Flavor::Mainline).unwrap(),
        vec!["OKAY", "CANCEL"]
    );

    let status = catalog.status().global_strings;
    assert_eq!(status.generation, 1);
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.is_some());

    // Once upstream recovers the next cycle publishes everything.
    fetcher.set_strings(Flavor::Vanilla, "OKAY = \"Okay\";");
    catalog.strings().refresh().await.unwrap();
    assert_eq!(catalog.list_keys(Flavor::Mainline).unwrap(), vec!["CHANGED"]);
    assert_eq!(catalog.status().global_strings.generation, 2);
}

#[tokio::test]
async fn unparseable_upstream_is_a_parse_failure() {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.seed();
    fetcher.set(api_url(Flavor::Classic), "<html>rate limited</html>");
    let catalog = catalog(&fetcher);

    assert!(matches!(
        catalog.api().load().await,
        Err(CoreError::Parse { .. })
    ));
}

#[tokio::test]
async fn search_api_finds_namespaced_functions() {
    let (_, catalog) = loaded_catalog().await;

    let results = catalog
        .search_api("C_QuestLog.IsQuestFlaggedCompleted", Some(0.9), None, None)
        .unwrap();
    assert_eq!(results, vec!["C_QuestLog.IsQuestFlaggedCompleted"]);

    let results = catalog.search_api("GetTime", None, Some(1), None).unwrap();
    assert_eq!(results.first().map(String::as_str), Some("GetTime"));
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn concurrent_wiki_lookups_share_one_fetch() {
    let fetcher = Arc::new(MemoryFetcher::with_delay(Duration::from_millis(50)));
    fetcher.set(wiki_url("API_GetTime"), "Returns the system uptime.");
    let catalog = Arc::new(catalog(&fetcher));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let catalog = catalog.clone();
            // Equivalent spellings share one cache key.
            let title = if i % 2 == 0 { "API GetTime" } else { "API_GetTime" };
            tokio::spawn(async move { catalog.lookup_content(title).await })
        })
        .collect();

    for handle in handles {
        let page = handle.await.unwrap().unwrap();
        assert_eq!(page.content, "Returns the system uptime.");
    }
    assert_eq!(fetcher.calls(&wiki_url("API_GetTime")), 1);

    // Served from cache afterwards.
    catalog.lookup_content("API GetTime").await.unwrap();
    assert_eq!(fetcher.calls(&wiki_url("API_GetTime")), 1);
    assert_eq!(catalog.status().pages.cached, 1);
}

#[tokio::test]
async fn wiki_redirects_are_followed() {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.set(wiki_url("GetTime"), "#REDIRECT [[API GetTime]]");
    fetcher.set(wiki_url("API_GetTime"), "Returns the system uptime.");
    let catalog = catalog(&fetcher);

    let page = catalog.lookup_content("getTime").await.unwrap();
    assert_eq!(page.title, "GetTime");
    assert_eq!(page.resolved_title, "API_GetTime");
    assert_eq!(page.redirected_from, vec!["GetTime"]);
    assert_eq!(page.url, wiki_url("API_GetTime"));
    assert_eq!(page.content, "Returns the system uptime.");
}

#[tokio::test]
async fn wiki_failures_are_not_cached() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let catalog = catalog(&fetcher);

    let err = catalog.lookup_content("Missing").await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Fetch(FetchError::Status { status: 404, .. })
    ));

    fetcher.set(wiki_url("Missing"), "Now it exists.");
    let page = catalog.lookup_content("Missing").await.unwrap();
    assert_eq!(page.content, "Now it exists.");
    assert_eq!(fetcher.calls(&wiki_url("Missing")), 2);
}

#[tokio::test]
async fn wiki_redirect_loops_fail() {
    let fetcher = Arc::new(MemoryFetcher::new());
    fetcher.set(wiki_url("A"), "#REDIRECT [[B]]");
    fetcher.set(wiki_url("B"), "#REDIRECT [[A]]");
    let catalog = catalog(&fetcher);

    assert!(matches!(
        catalog.lookup_content("A").await,
        Err(CoreError::Parse { .. })
    ));
}

#[tokio::test]
async fn blank_wiki_title_is_invalid() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let catalog = catalog(&fetcher);
    assert!(matches!(
        catalog.lookup_content("   ").await,
        Err(CoreError::InvalidKey { kind: "title", .. })
    ));
}
