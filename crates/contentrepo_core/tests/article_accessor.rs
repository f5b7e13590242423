use contentrepo_core::db::open_db_in_memory;
use contentrepo_core::config::AVAILABLE_LOCALES_KEY;
use contentrepo_core::{
    AccessorError, ArticleContentAccessor, ArticleRecord, ArticleValidationError, ContentConfig,
    ContentNode, ContentNodeType, ContentObject, Identity, ItemCheck, LanguageResolution,
    RepoError, RepoResult, RepositoryAccess, SqliteRepositoryAccess,
};

const PUBLISHED_AT: i64 = 1_700_000_000_000;

fn sqlite_session() -> SqliteRepositoryAccess {
    let conn = open_db_in_memory().unwrap();
    SqliteRepositoryAccess::login(conn, &Identity::new("editor")).unwrap()
}

fn accessor() -> ArticleContentAccessor<SqliteRepositoryAccess> {
    ArticleContentAccessor::new(sqlite_session(), &ContentConfig::default())
}

fn write(accessor: &mut ArticleContentAccessor<impl RepositoryAccess>, path: &str, language: &str) {
    accessor
        .write(path, language, &format!("Title {language}"), "Body", PUBLISHED_AT)
        .unwrap();
}

/// Session whose existence checks, child listing or commit can be made to fail.
struct FlakyAccess {
    inner: SqliteRepositoryAccess,
    failing_checks: Vec<String>,
    failing_listing: bool,
    failing_commit: bool,
}

impl FlakyAccess {
    fn new() -> Self {
        Self {
            inner: sqlite_session(),
            failing_checks: Vec::new(),
            failing_listing: false,
            failing_commit: false,
        }
    }

    fn simulated(path: &str) -> RepoError {
        RepoError::InvalidData(format!("simulated repository failure at {path}"))
    }
}

impl RepositoryAccess for FlakyAccess {
    fn item_exists(&self, path: &str) -> RepoResult<bool> {
        if self.failing_checks.iter().any(|failing| failing == path) {
            return Err(Self::simulated(path));
        }
        self.inner.item_exists(path)
    }

    fn child_nodes(&self, path: &str) -> RepoResult<Vec<ContentNode>> {
        if self.failing_listing {
            return Err(Self::simulated(path));
        }
        self.inner.child_nodes(path)
    }

    fn get_content_object(&self, path: &str) -> RepoResult<ContentObject> {
        self.inner.get_content_object(path)
    }

    fn get_content_object_version(&self, path: &str, version: &str) -> RepoResult<ContentObject> {
        self.inner.get_content_object_version(path, version)
    }

    fn base_version(&self, path: &str) -> RepoResult<Option<String>> {
        self.inner.base_version(path)
    }

    fn store_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String> {
        self.inner.store_content_object(article)
    }

    fn update_content_object(&mut self, article: &ArticleRecord) -> RepoResult<String> {
        self.inner.update_content_object(article)
    }

    fn remove_content_object(&mut self, path: &str) -> RepoResult<()> {
        self.inner.remove_content_object(path)
    }

    fn version_list(&self, path: &str) -> RepoResult<Vec<String>> {
        self.inner.version_list(path)
    }

    fn close(self) -> RepoResult<()> {
        if self.failing_commit {
            // Dropping the inner session rolls it back.
            return Err(RepoError::from(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                Some("database is locked".to_string()),
            )));
        }
        self.inner.close()
    }
}

#[test]
fn root_path_resolves_to_itself() {
    let accessor = accessor();

    assert_eq!(accessor.resolve_language("/", "fr"), LanguageResolution::Root);
    assert_eq!(accessor.resolve_language_path("/", ""), "/");
}

#[test]
fn requested_language_wins_when_present() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");
    write(&mut accessor, "/articles/intro", "fr");

    assert_eq!(
        accessor.resolve_language("/articles/intro", "fr"),
        LanguageResolution::Requested("/articles/intro/fr".to_string())
    );

    let article = accessor.read_in_language("/articles/intro", "fr").unwrap();
    assert_eq!(article.path, "/articles/intro/fr");
    assert_eq!(article.language, "fr");
    assert_eq!(article.title, "Title fr");
    assert_eq!(article.version.as_deref(), Some("1.0"));
}

#[test]
fn missing_language_falls_back_to_default() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "fr");
    write(&mut accessor, "/articles/intro", "en");

    assert_eq!(
        accessor.resolve_language("/articles/intro", "es"),
        LanguageResolution::Fallback("/articles/intro/en".to_string())
    );
    let article = accessor.read_in_language("/articles/intro", "es").unwrap();
    assert_eq!(article.language, "en");
}

#[test]
fn configured_fallback_language_is_used() {
    let config =
        ContentConfig::from_properties([("locale.properties.fallback", "de")]).unwrap();
    let mut accessor = ArticleContentAccessor::new(sqlite_session(), &config);
    write(&mut accessor, "/articles/intro", "fr");
    write(&mut accessor, "/articles/intro", "de");

    assert_eq!(accessor.fallback_language(), "de");
    assert_eq!(
        accessor.resolve_language_path("/articles/intro", "es"),
        "/articles/intro/de"
    );
}

#[test]
fn first_locale_child_is_used_when_default_is_missing() {
    let mut accessor = accessor();
    accessor
        .write("/articles/intro/drafts", "it", "Bozza", "Body", PUBLISHED_AT)
        .unwrap();
    write(&mut accessor, "/articles/intro", "de");
    write(&mut accessor, "/articles/intro", "fr");

    assert_eq!(
        accessor.resolve_language("/articles/intro", "es"),
        LanguageResolution::FirstAvailable("/articles/intro/de".to_string())
    );
}

#[test]
fn resolution_is_idempotent() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "fr");
    write(&mut accessor, "/articles/intro", "en");

    let once = accessor.resolve_language_path("/articles/intro", "fr");
    let twice = accessor.resolve_language_path(&once, "fr");
    assert_eq!(once, "/articles/intro/fr");
    assert_eq!(twice, once);

    assert_eq!(
        accessor.resolve_language_path("/articles/intro/fr/", "en"),
        "/articles/intro/en"
    );
}

#[test]
fn empty_requested_language_skips_to_fallback() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");

    assert_eq!(
        accessor.resolve_language("/articles/intro", ""),
        LanguageResolution::Fallback("/articles/intro/en".to_string())
    );
}

#[test]
fn unresolvable_path_is_handed_on_and_read_fails() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");

    assert_eq!(
        accessor.resolve_language("/articles/missing", "fr"),
        LanguageResolution::Unresolved("/articles/missing".to_string())
    );

    let err = accessor
        .read_in_language("/articles/missing", "fr")
        .unwrap_err();
    assert!(matches!(err, AccessorError::NotFound(path) if path == "/articles/missing"));
    assert_eq!(accessor.current().unwrap().path, "/articles/intro/en");
}

#[test]
fn failed_existence_check_falls_through_to_next_tier() {
    let mut accessor = ArticleContentAccessor::new(FlakyAccess::new(), &ContentConfig::default());
    write(&mut accessor, "/articles/intro", "fr");
    write(&mut accessor, "/articles/intro", "en");

    let mut flaky = ArticleContentAccessor::new(
        FlakyAccess {
            failing_checks: vec!["/articles/intro/fr".to_string()],
            ..FlakyAccess::new()
        },
        &ContentConfig::default(),
    );
    write(&mut flaky, "/articles/intro", "fr");
    write(&mut flaky, "/articles/intro", "en");

    assert_eq!(flaky.check_item("/articles/intro/fr"), ItemCheck::CheckFailed);
    assert_eq!(flaky.check_item("/articles/intro/en"), ItemCheck::Present);
    assert_eq!(flaky.check_item("/articles/intro/es"), ItemCheck::Absent);
    assert_eq!(
        flaky.resolve_language("/articles/intro", "fr"),
        LanguageResolution::Fallback("/articles/intro/en".to_string())
    );
    assert_eq!(
        accessor.resolve_language("/articles/intro", "fr"),
        LanguageResolution::Requested("/articles/intro/fr".to_string())
    );
}

#[test]
fn failing_repository_never_aborts_resolution() {
    let mut accessor = ArticleContentAccessor::new(
        FlakyAccess {
            failing_checks: vec![
                "/articles/intro/fr".to_string(),
                "/articles/intro/en".to_string(),
            ],
            failing_listing: true,
            ..FlakyAccess::new()
        },
        &ContentConfig::default(),
    );
    write(&mut accessor, "/articles/intro", "fr");

    assert_eq!(
        accessor.resolve_language("/articles/intro", "fr"),
        LanguageResolution::Unresolved("/articles/intro".to_string())
    );
    let err = accessor.read_in_language("/articles/intro", "fr").unwrap_err();
    assert!(matches!(
        err,
        AccessorError::TypeMismatch {
            node_type: ContentNodeType::Folder,
            ..
        }
    ));
}

#[test]
fn write_appends_effective_language_segment_once() {
    let mut accessor = accessor();

    let cases = [
        ("/articles/intro", "en", "/articles/intro/en"),
        ("/news/launch/", "fr", "/news/launch/fr"),
        ("/colors/green/de", "de", "/colors/green/de"),
        ("guides//setup", "it", "/guides/setup/it"),
        ("/glossary/men", "en", "/glossary/men/en"),
    ];
    for (path, language, expected) in cases {
        let article = accessor
            .write(path, language, "Title", "Body", PUBLISHED_AT)
            .unwrap();
        assert_eq!(article.path, expected);
        assert!(!article.path.contains("//"));
        assert_eq!(article.language, language);
        assert_eq!(article.version.as_deref(), Some("1.0"));
    }
}

#[test]
fn write_without_language_uses_default() {
    let mut accessor = accessor();

    let article = accessor
        .write("/articles/intro", "", "Intro", "Body", PUBLISHED_AT)
        .unwrap();
    assert_eq!(article.path, "/articles/intro/en");
    assert_eq!(article.language, "en");

    let article = accessor
        .write("/articles/outro", "  ", "Outro", "Body", PUBLISHED_AT)
        .unwrap();
    assert_eq!(article.path, "/articles/outro/en");
    assert_eq!(accessor.current(), Some(&article));
}

#[test]
fn write_to_existing_path_conflicts() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");

    let err = accessor
        .write("/articles/intro", "en", "Again", "Body", PUBLISHED_AT)
        .unwrap_err();
    assert!(matches!(err, AccessorError::Conflict(path) if path == "/articles/intro/en"));
}

#[test]
fn write_with_illegal_segment_is_rejected() {
    let mut accessor = accessor();

    let err = accessor
        .write("/articles/a:b", "en", "Bad", "Body", PUBLISHED_AT)
        .unwrap_err();
    assert!(matches!(
        err,
        AccessorError::Validation(ArticleValidationError::IllegalSegment { segment, .. })
            if segment == "a:b"
    ));
    assert!(accessor.current().is_none());
}

#[test]
fn read_of_folder_is_type_mismatch_and_keeps_current() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");
    let before = accessor.current().cloned();

    let err = accessor.read("/articles").unwrap_err();
    assert!(matches!(
        err,
        AccessorError::TypeMismatch {
            ref path,
            node_type: ContentNodeType::Folder,
        } if path == "/articles"
    ));
    assert!(err.to_string().contains("only article content objects are supported"));
    assert_eq!(accessor.current().cloned(), before);
}

#[test]
fn read_canonicalizes_path() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");

    let article = accessor.read("articles//intro/en/").unwrap();
    assert_eq!(article.path, "/articles/intro/en");
}

#[test]
fn read_of_missing_path_is_not_found() {
    let mut accessor = accessor();

    let err = accessor.read("/articles/intro/en").unwrap_err();
    assert!(matches!(err, AccessorError::NotFound(path) if path == "/articles/intro/en"));
    assert!(accessor.current().is_none());
}

#[test]
fn list_versions_without_loaded_article_is_empty() {
    let accessor = accessor();

    assert!(accessor.list_versions().unwrap().is_empty());
}

#[test]
fn update_and_read_version_walk_history() {
    let mut accessor = accessor();
    accessor
        .write("/articles/intro", "en", "First", "One", PUBLISHED_AT)
        .unwrap();
    let updated = accessor
        .update("/articles/intro", "en", "Second", "Two", PUBLISHED_AT + 1)
        .unwrap();
    assert_eq!(updated.version.as_deref(), Some("1.1"));

    assert_eq!(accessor.list_versions().unwrap(), vec!["1.0", "1.1"]);

    let latest = accessor.read_in_language("/articles/intro", "en").unwrap();
    assert_eq!(latest.title, "Second");
    assert_eq!(latest.version.as_deref(), Some("1.1"));

    let first = accessor
        .read_version("/articles/intro", "en", "1.0")
        .unwrap();
    assert_eq!(first.title, "First");
    assert_eq!(first.body, "One");
    assert_eq!(first.version.as_deref(), Some("1.0"));
    assert_eq!(accessor.current(), Some(&first));

    let err = accessor
        .read_version("/articles/intro", "en", "9.9")
        .unwrap_err();
    assert!(matches!(err, AccessorError::VersionNotFound { version, .. } if version == "9.9"));
}

#[test]
fn update_of_missing_article_is_not_found() {
    let mut accessor = accessor();

    let err = accessor
        .update("/articles/intro", "en", "Title", "Body", PUBLISHED_AT)
        .unwrap_err();
    assert!(matches!(err, AccessorError::NotFound(path) if path == "/articles/intro/en"));
}

#[test]
fn remove_drops_subtree_and_clears_current() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");
    write(&mut accessor, "/articles/intro", "fr");

    accessor.remove("/articles/intro").unwrap();
    assert!(accessor.current().is_none());
    assert_eq!(accessor.check_item("/articles/intro/fr"), ItemCheck::Absent);

    let err = accessor.remove("/articles/intro").unwrap_err();
    assert!(matches!(err, AccessorError::NotFound(_)));
}

#[test]
fn remove_of_unrelated_path_keeps_current() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");
    write(&mut accessor, "/articles/introduction", "en");
    accessor.read("/articles/intro/en").unwrap();

    accessor.remove("/articles/introduction").unwrap();
    assert_eq!(accessor.current().unwrap().path, "/articles/intro/en");
}

#[test]
fn available_languages_lists_locale_children_in_order() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "fr");
    write(&mut accessor, "/articles/intro", "en");
    accessor
        .write("/articles/intro/assets", "de", "Assets", "Body", PUBLISHED_AT)
        .unwrap();
    write(&mut accessor, "/articles/intro", "de");

    assert_eq!(
        accessor.available_languages("/articles/intro").unwrap(),
        vec!["fr", "en", "de"]
    );
    assert_eq!(
        accessor.available_languages("/articles/intro/fr").unwrap(),
        vec!["fr", "en", "de"]
    );

    let err = accessor.available_languages("/nowhere").unwrap_err();
    assert!(matches!(err, AccessorError::NotFound(_)));
}

#[test]
fn close_releases_session() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");

    accessor.close().unwrap();
}

#[test]
fn read_version_of_folder_is_type_mismatch_and_keeps_current() {
    let mut accessor = accessor();
    write(&mut accessor, "/articles/intro", "en");
    let before = accessor.current().cloned();

    let err = accessor.read_version("/articles", "", "1.0").unwrap_err();
    assert!(matches!(
        err,
        AccessorError::TypeMismatch {
            ref path,
            node_type: ContentNodeType::Folder,
        } if path == "/articles"
    ));
    assert_eq!(accessor.current().cloned(), before);
}

#[test]
fn failed_commit_on_close_is_persistence_error() {
    let mut accessor = ArticleContentAccessor::new(
        FlakyAccess {
            failing_commit: true,
            ..FlakyAccess::new()
        },
        &ContentConfig::default(),
    );
    write(&mut accessor, "/articles/intro", "en");

    let err = accessor.close().unwrap_err();
    assert!(matches!(err, AccessorError::Persistence(RepoError::Db(_))));
    assert!(err.to_string().contains("database is locked"));
}

#[test]
fn configured_locale_set_drives_resolution() {
    let config = ContentConfig::from_properties([(AVAILABLE_LOCALES_KEY, "xx,en")]).unwrap();
    let mut accessor = ArticleContentAccessor::new(sqlite_session(), &config);
    write(&mut accessor, "/articles/intro", "de");
    write(&mut accessor, "/articles/intro", "xx");

    assert_eq!(
        accessor.resolve_language("/articles/intro", "es"),
        LanguageResolution::FirstAvailable("/articles/intro/xx".to_string())
    );
    assert_eq!(
        accessor.resolve_language_path("/articles/intro/xx", "fr"),
        "/articles/intro/xx"
    );
    assert_eq!(
        accessor.available_languages("/articles/intro/xx").unwrap(),
        vec!["xx"]
    );
}
