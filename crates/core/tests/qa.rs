use docsort_core::config::{AppConfig, QaConfig};
use docsort_core::corpus::Corpus;
use docsort_core::error::SynthesisError;
use docsort_core::lexicon::CategoryLabel;
use docsort_core::models::{AnswerMethod, QaQuery, QueryScope, SourceFormat};
use docsort_core::pipeline::Pipeline;
use docsort_core::qa::QaEngine;
use docsort_core::synthesis::{AnswerSynthesizer, SynthesisRequest, NO_EVIDENCE_ANSWER};
use providers::ProviderError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Counting {
    calls: AtomicUsize,
    reply: &'static str,
}

#[async_trait::async_trait]
impl AnswerSynthesizer for Counting {
    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

struct Failing;

#[async_trait::async_trait]
impl AnswerSynthesizer for Failing {
    async fn synthesize(&self, _request: &SynthesisRequest) -> Result<String, SynthesisError> {
        Err(SynthesisError::Provider(ProviderError::Status {
            status: 429,
            body: "rate limited".into(),
        }))
    }
}

fn corpus() -> Corpus {
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();
    Corpus::new(vec![
        pipeline.process_text(
            "metro1.txt",
            SourceFormat::Txt,
            "Dự án tuyến metro số 1 nằm tại Quận 1, TP.HCM.",
        ),
        pipeline.process_text(
            "chungcu.txt",
            SourceFormat::Txt,
            "Căn hộ chung cư bàn giao quý 4. Ban quản trị chung cư đã thành lập.",
        ),
        pipeline.process_text(
            "noxh.txt",
            SourceFormat::Txt,
            "Chính sách nhà ở xã hội cho người thu nhập thấp.",
        ),
    ])
}

fn query(question: &str, scope: QueryScope, external: bool) -> QaQuery {
    QaQuery {
        question: question.to_string(),
        scope,
        use_external_synthesis: external,
    }
}

#[tokio::test]
async fn local_answer_quotes_the_matching_document() {
    let engine = QaEngine::new(QaConfig::default());
    let result = engine
        .answer(&query("dự án này ở đâu?", QueryScope::All, false), &corpus())
        .await;
    assert_eq!(result.method, AnswerMethod::Local);
    assert!(result.answer.contains("Quận 1"), "{}", result.answer);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].filename, "metro1.txt");
    assert_eq!(result.citations[0].category, CategoryLabel::Metro);
    assert!(result.citations[0].relevance > 0.0);
}

#[tokio::test]
async fn location_question_finds_document_without_question_words() {
    let pipeline = Pipeline::new(AppConfig::default()).unwrap();
    let docs = Corpus::new(vec![
        pipeline.process_text(
            "noxh.txt",
            SourceFormat::Txt,
            "Chính sách nhà ở xã hội cho người thu nhập thấp.",
        ),
        pipeline.process_text(
            "ga_ngam.txt",
            SourceFormat::Txt,
            "Tuyến metro số 1 có ga ngầm đặt tại Quận 1.",
        ),
    ]);
    assert_eq!(docs.documents()[1].category(), CategoryLabel::Metro);

    let engine = QaEngine::new(QaConfig::default());
    let result = engine
        .answer(&query("dự án này ở đâu?", QueryScope::All, false), &docs)
        .await;
    assert_eq!(result.method, AnswerMethod::Local);
    assert_eq!(result.citations.len(), 1);
    assert_eq!(result.citations[0].filename, "ga_ngam.txt");
    assert_eq!(result.citations[0].excerpt, "Tuyến metro số 1 có ga ngầm đặt tại Quận 1.");
    assert!(result.answer.contains("Quận 1"), "{}", result.answer);
}

#[tokio::test]
async fn scope_restricts_candidates() {
    let engine = QaEngine::new(QaConfig::default());
    let scoped = engine
        .answer(
            &query("dự án này ở đâu?", QueryScope::Category(CategoryLabel::Apartment), false),
            &corpus(),
        )
        .await;
    assert_eq!(scoped.method, AnswerMethod::NoEvidence);
    assert_eq!(scoped.answer, NO_EVIDENCE_ANSWER);

    let chung_cu = engine
        .answer(
            &query("ban quản trị chung cư", QueryScope::Category(CategoryLabel::Apartment), false),
            &corpus(),
        )
        .await;
    assert!(chung_cu.citations.iter().all(|c| c.category == CategoryLabel::Apartment));
    assert_eq!(chung_cu.citations[0].excerpt, "Ban quản trị chung cư đã thành lập.");
}

#[tokio::test]
async fn empty_corpus_never_calls_external() {
    let external = Arc::new(Counting {
        calls: AtomicUsize::new(0),
        reply: "bịa",
    });
    let engine = QaEngine::new(QaConfig::default()).with_external(external.clone());
    let result = engine
        .answer(&query("metro ở đâu?", QueryScope::All, true), &Corpus::default())
        .await;
    assert_eq!(result.method, AnswerMethod::NoEvidence);
    assert!(result.citations.is_empty());

    let result = engine
        .answer(&query("sân bay quốc tế", QueryScope::All, true), &corpus())
        .await;
    assert_eq!(result.method, AnswerMethod::NoEvidence);
    assert_eq!(external.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn external_answer_keeps_citations() {
    let external = Arc::new(Counting {
        calls: AtomicUsize::new(0),
        reply: "Dự án nằm tại Quận 1.",
    });
    let engine = QaEngine::new(QaConfig::default()).with_external(external.clone());
    let result = engine
        .answer(&query("tuyến metro ở đâu?", QueryScope::All, true), &corpus())
        .await;
    assert_eq!(result.method, AnswerMethod::External);
    assert_eq!(result.answer, "Dự án nằm tại Quận 1.");
    assert_eq!(result.citations[0].filename, "metro1.txt");
    assert_eq!(external.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn external_failure_falls_back_to_local() {
    let docs = corpus();
    let engine = QaEngine::new(QaConfig::default()).with_external(Arc::new(Failing));
    let external = engine
        .answer(&query("tuyến metro ở đâu?", QueryScope::All, true), &docs)
        .await;
    let local = QaEngine::new(QaConfig::default())
        .answer(&query("tuyến metro ở đâu?", QueryScope::All, false), &docs)
        .await;
    assert_eq!(external.method, AnswerMethod::Local);
    assert_eq!(external, local);
}

#[tokio::test]
async fn slow_external_times_out_and_falls_back() {
    use docsort_core::synthesis::ExternalSynthesizer;
    use providers::{CompletionRequest, CompletionResponse, LlmProvider};

    struct Sleepy;

    #[async_trait::async_trait]
    impl LlmProvider for Sleepy {
        async fn complete(&self, _r: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(CompletionResponse {
                content: "quá muộn".into(),
                model: None,
            })
        }
    }

    let synth = ExternalSynthesizer::new(Arc::new(Sleepy), Duration::from_millis(50));
    let engine = QaEngine::new(QaConfig::default()).with_external(Arc::new(synth));
    let result = engine
        .answer(&query("tuyến metro ở đâu?", QueryScope::All, true), &corpus())
        .await;
    assert_eq!(result.method, AnswerMethod::Local);
    assert!(result.answer.starts_with("[metro1.txt]"));
}

#[tokio::test]
async fn top_k_limits_citations() {
    let engine = QaEngine::new(QaConfig {
        top_k: 1,
        ..Default::default()
    });
    let result = engine
        .answer(&query("chung cư nhà ở xã hội", QueryScope::All, false), &corpus())
        .await;
    assert_eq!(result.citations.len(), 1);
}
