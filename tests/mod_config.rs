use nexus_query::SearchConfig;

#[test]
fn file_then_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nexus-query.toml");
    std::fs::write(
        &path,
        "index_suffix = \"_file\"\nscroll_time = \"2m\"\ncursor_chunk_size = 250\n",
    )
    .unwrap();

    let cfg = SearchConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(cfg.scroll_time, "2m");
    assert_eq!(cfg.cursor_chunk_size, 250);
    assert_eq!(cfg.log_level, "info");

    unsafe { std::env::set_var("NEXUS_QUERY_SCROLL_TIME", "30s") };
    let cfg = SearchConfig::load(Some(path.as_path())).unwrap();
    unsafe { std::env::remove_var("NEXUS_QUERY_SCROLL_TIME") };
    assert_eq!(cfg.scroll_time, "30s");
}

#[test]
fn bad_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "cursor_chunk_size = \"lots\"\n").unwrap();
    let err = SearchConfig::load(Some(path.as_path())).unwrap_err();
    assert!(matches!(err, nexus_query::SearchError::Config(_)), "{err:?}");
}
