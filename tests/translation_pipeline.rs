//! 翻译管道集成测试
//!
//! 测试从提取、分批到写回 DOM 的端到端流程

use std::sync::Arc;

use page_translator::translation::services::paths;
use page_translator::TranslationStatus;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{HtmlTestHelper, ScriptedBackend, ScriptedDetector, TestEnvironment};

const URL: &str = "https://example.com/notes";

/// 原样返回的后端不应改变文档
#[tokio::test]
async fn test_echo_translation_leaves_document_unchanged() {
    let backend = Arc::new(ScriptedBackend::echo());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend.clone());
    let window = env.attach(URL, &HtmlTestHelper::long_english_page());
    let before = HtmlTestHelper::body_html(&window);

    let status = env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();

    assert_eq!(status, Some(TranslationStatus::Translated));
    assert_eq!(HtmlTestHelper::body_html(&window), before);
    assert!(backend.calls() >= 1);

    // 脚本内容不会发送给后端
    let sent: Vec<String> = backend
        .requests()
        .into_iter()
        .flat_map(|request| request.texts)
        .collect();
    assert!(sent.iter().all(|text| !text.contains("not translated")));
    assert!(sent.iter().any(|text| text.contains("<b id=")));
}

/// 后端调整了占位标记的顺序时，原有元素及其属性随之移动
#[tokio::test]
async fn test_reordered_placeholders_keep_attributes() {
    let html = r#"<html><body><p>Click <a href="/x" class="btn">here</a> to see <img src="i.png" alt="pic"> the <em title="t">results</em>.</p></body></html>"#;
    let backend = Arc::new(ScriptedBackend::new(|text, _| {
        assert_eq!(
            text,
            "Click <b id=1>here</b> to see <br id=0> the <b id=2>results</b>."
        );
        "<b id=2>Ergebnisse</b> sehen <br id=0> hier <b id=1>klicken</b>.".to_string()
    }));
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend);
    let window = env.attach(URL, html);

    env.orchestrator.translate(&env.frame, "en", "de").await.unwrap();

    assert_eq!(
        HtmlTestHelper::body_html(&window),
        r#"<p><em title="t">Ergebnisse</em> sehen <img src="i.png" alt="pic"> hier <a href="/x" class="btn">klicken</a>.</p>"#
    );
}

/// 重复翻译基于原文快照，结果一致
#[tokio::test]
async fn test_translate_twice_is_idempotent() {
    let backend = Arc::new(ScriptedBackend::tagging());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend.clone());
    let window = env.attach(URL, &HtmlTestHelper::long_english_page());

    env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();
    let first = HtmlTestHelper::body_html(&window);
    assert!(first.contains("[fr]"));

    env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();
    let second = HtmlTestHelper::body_html(&window);

    assert_eq!(first, second);
    assert!(!second.contains("[fr] [fr]"));

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].texts, requests[1].texts);
}

/// 后端漏掉的单元显示原文，其余单元照常翻译
#[tokio::test]
async fn test_omitted_translation_only_affects_its_unit() {
    let html = "<html><body><p>first paragraph</p><p>second paragraph</p></body></html>";
    let backend = Arc::new(ScriptedBackend::tagging().omitting_last());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend);
    let window = env.attach(URL, html);

    let status = env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();

    assert_eq!(status, Some(TranslationStatus::Translated));
    assert_eq!(
        HtmlTestHelper::body_html(&window),
        "<p>first paragraph [fr]</p><p>second paragraph</p>"
    );

    let report = env
        .orchestrator
        .frame(&env.frame)
        .and_then(|controller| controller.last_report())
        .unwrap();
    assert_eq!(report.reconstructed, 1);
    assert_eq!(report.missing, 1);
}

/// 受后端限制拆分成多个批次，仍按文档顺序写回
#[tokio::test]
async fn test_batches_respect_backend_limits() {
    let backend = Arc::new(ScriptedBackend::tagging().with_limits(1, 9000));
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend.clone());
    let window = env.attach(URL, &HtmlTestHelper::long_english_page());

    env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();

    assert_eq!(backend.calls(), 3);
    assert!(backend.requests().iter().all(|request| request.texts.len() == 1));

    let html = HtmlTestHelper::body_html(&window);
    let heading = html.find("northern coast [fr]").unwrap();
    let tide = html.find("beach. [fr]").unwrap();
    let reeds = html.find("reeds. [fr]").unwrap();
    assert!(heading < tide && tide < reeds);
}

/// 在原文与译文之间切换
#[tokio::test]
async fn test_show_original_and_translation() {
    let backend = Arc::new(ScriptedBackend::tagging());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend);
    let window = env.attach(URL, &HtmlTestHelper::long_english_page());
    let original = HtmlTestHelper::body_html(&window);

    assert!(env.orchestrator.show_original(&env.frame).await.is_err());

    env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();
    let translated = HtmlTestHelper::body_html(&window);
    assert_ne!(translated, original);

    env.orchestrator.show_original(&env.frame).await.unwrap();
    assert_eq!(HtmlTestHelper::body_html(&window), original);

    env.orchestrator.show_translation(&env.frame).await.unwrap();
    assert_eq!(HtmlTestHelper::body_html(&window), translated);
}

/// 词数统计会发布到状态存储
#[tokio::test]
async fn test_report_statistics_publishes_word_counts() {
    let backend = Arc::new(ScriptedBackend::echo());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend);
    env.attach(URL, "<html><body><p>one two three</p><p>four five</p></body></html>");

    let stats = env
        .orchestrator
        .report_statistics(&env.frame)
        .await
        .unwrap()
        .unwrap();
    env.orchestrator.flush_notifications().await;

    assert_eq!(stats.word_count, 5);
    assert_eq!(stats.word_count_in_viewport, 0);
    assert_eq!(
        env.broadcaster.latest(&env.frame, paths::WORD_COUNT),
        Some(serde_json::json!(5))
    );
}

/// 深层嵌套的行内元素拆分为多个单元，翻译不会耗尽调用栈
#[tokio::test]
async fn test_deeply_nested_page_translates() {
    let depth = 10_000;
    let html = format!(
        "<html><body><p>{}core{}</p></body></html>",
        "<span>level ".repeat(depth),
        "</span>".repeat(depth)
    );
    let backend = Arc::new(ScriptedBackend::echo());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend.clone());
    let window = env.attach(URL, &html);
    let before = HtmlTestHelper::body_html(&window);

    let status = env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();

    assert_eq!(status, Some(TranslationStatus::Translated));
    assert_eq!(HtmlTestHelper::body_html(&window), before);

    let report = env
        .orchestrator
        .frame(&env.frame)
        .and_then(|controller| controller.last_report())
        .unwrap();
    assert!(report.units > 1);
    assert_eq!(report.degraded, 0);
    assert_eq!(report.reconstructed, report.units);
}

/// 重复翻译复用上一轮的文本节点
#[tokio::test]
async fn test_retranslation_does_not_grow_dom() {
    let backend = Arc::new(ScriptedBackend::tagging());
    let env = TestEnvironment::new(Arc::new(ScriptedDetector::confident("en")), backend);
    let window = env.attach(URL, &HtmlTestHelper::long_english_page());

    env.orchestrator.translate(&env.frame, "en", "fr").await.unwrap();
    let allocated = window.read_dom().unwrap().len();

    for target in ["de", "es", "fr"] {
        env.orchestrator.translate(&env.frame, "en", target).await.unwrap();
    }

    assert_eq!(window.read_dom().unwrap().len(), allocated);
    assert!(HtmlTestHelper::body_html(&window).contains("[fr]"));
}
