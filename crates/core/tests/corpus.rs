use docsort_core::config::AppConfig;
use docsort_core::corpus::{self, Corpus};
use docsort_core::lexicon::CategoryLabel;
use docsort_core::models::SourceFormat;
use docsort_core::pipeline::{open_repository, Pipeline};
use storage::documents::DocumentRepository;
use storage::{connect, migrate};

async fn memory_repo(name: &str) -> DocumentRepository {
    let pool = connect(&format!("sqlite://file:{}?mode=memory&cache=shared", name))
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    DocumentRepository::new(pool)
}

const METRO_TEXT: &str = "Báo cáo khảo sát tuyến metro số 2, ga ngầm Bến Thành.";
const NOXH_TEXT: &str = "Quyết định số 12/2023/QĐ-UBND về nhà ở xã hội tại Bình Dương.";

#[tokio::test]
async fn ingest_list_show_delete_round_trip() {
    let repo = memory_repo("core_corpus_round_trip").await;
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();

    let metro = pipeline
        .ingest(&repo, "metro2.txt", SourceFormat::Txt, METRO_TEXT)
        .await
        .unwrap();
    let noxh = pipeline
        .ingest(&repo, "qd12.txt", SourceFormat::Txt, NOXH_TEXT)
        .await
        .unwrap();
    assert!(metro.duplicates.is_empty());

    let all = corpus::list(&repo, None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].row_id, Some(metro.row_id));

    let social = corpus::list(&repo, Some(CategoryLabel::SocialHousing)).await.unwrap();
    assert_eq!(social.len(), 1);
    assert_eq!(social[0].document.filename, "qd12.txt");
    assert_eq!(social[0].analysis.legal_references, vec!["QĐ 12/2023/QĐ-UBND"]);

    let loaded = corpus::get(&repo, noxh.row_id).await.unwrap().unwrap();
    assert_eq!(loaded, noxh.stored);

    let counts = corpus::category_counts(&repo).await.unwrap();
    assert_eq!(counts.len(), 5);
    assert!(counts.contains(&(CategoryLabel::Metro, 1)));
    assert!(counts.contains(&(CategoryLabel::Apartment, 0)));

    assert!(corpus::delete(&repo, metro.row_id).await.unwrap());
    assert!(!corpus::delete(&repo, metro.row_id).await.unwrap());
    assert!(corpus::get(&repo, metro.row_id).await.unwrap().is_none());
    assert_eq!(Corpus::load(&repo).await.unwrap().len(), 1);
}

#[tokio::test]
async fn identical_text_is_reported_as_duplicate() {
    let repo = memory_repo("core_corpus_duplicates").await;
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();

    let first = pipeline
        .ingest(&repo, "a.txt", SourceFormat::Txt, METRO_TEXT)
        .await
        .unwrap();
    let second = pipeline
        .ingest(&repo, "b.txt", SourceFormat::Txt, METRO_TEXT)
        .await
        .unwrap();
    assert_eq!(second.duplicates, vec![first.row_id]);
    assert_eq!(corpus::list(&repo, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn same_filename_ingested_back_to_back_is_kept() {
    let repo = memory_repo("core_corpus_same_name").await;
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();

    let mut ids = Vec::new();
    for _ in 0..20 {
        let outcome = pipeline
            .ingest(&repo, "a.txt", SourceFormat::Txt, "tuyến metro")
            .await
            .unwrap();
        assert_eq!(outcome.duplicates.len(), ids.len());
        ids.push(outcome.row_id);
    }
    assert_eq!(corpus::list(&repo, None).await.unwrap().len(), 20);
}

#[tokio::test]
async fn keyword_search_over_text_and_filename() {
    let repo = memory_repo("core_corpus_search").await;
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();
    let metro = pipeline
        .ingest(&repo, "metro2.txt", SourceFormat::Txt, METRO_TEXT)
        .await
        .unwrap();
    pipeline
        .ingest(&repo, "qd12.txt", SourceFormat::Txt, NOXH_TEXT)
        .await
        .unwrap();

    let hits = corpus::search(&repo, "GA NGẦM", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].row_id, Some(metro.row_id));

    let by_name = corpus::search(&repo, "qd12", None).await.unwrap();
    assert_eq!(by_name[0].document.filename, "qd12.txt");

    assert!(corpus::search(&repo, "ga ngầm", Some(CategoryLabel::SocialHousing))
        .await
        .unwrap()
        .is_empty());
    assert!(corpus::search(&repo, "?!", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn file_backed_repository_survives_reopen() {
    let temp = tempfile::tempdir().unwrap();
    let mut cfg = AppConfig::default();
    cfg.database.path = temp.path().join("db").join("docs.db").to_string_lossy().into_owned();

    let pipeline = Pipeline::new(cfg.clone()).unwrap();
    {
        let repo = open_repository(&cfg).await.unwrap();
        pipeline
            .ingest(&repo, "metro2.txt", SourceFormat::Txt, METRO_TEXT)
            .await
            .unwrap();
    }
    let repo = open_repository(&cfg).await.unwrap();
    let snapshot = Corpus::load(&repo).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.documents()[0].category(), CategoryLabel::Metro);
}
