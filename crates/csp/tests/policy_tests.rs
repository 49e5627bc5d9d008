//! End-to-end tests for CSP generation
//!
//! These run real documents through feature extraction and policy
//! synthesis and check the properties every generated header must keep.

use citadel_csp::{
    analyze, generate, CspGenerator, LazyClassifier, PolicyConfig, StaticVerdict,
    CONTENT_SECURITY_POLICY_HEADER,
};
use pretty_assertions::assert_eq;

const LOCKDOWN: &str = "default-src 'none'; script-src 'none'; object-src 'none'; style-src 'none'; \
img-src 'none'; font-src 'none'; connect-src 'none'; form-action 'none'; frame-ancestors 'none'; \
base-uri 'none'; report-uri /csp-report;";

/// Documents covering every detection rule
fn sample_documents() -> Vec<&'static str> {
    vec![
        "",
        "<p>plain text</p>",
        "<form></form>",
        "<script>alert(1)</script>",
        r#"<script src="https://trusted.cdn.com/app.js"></script>"#,
        r#"<script src="/a.js"></script><button onclick="go()">Go</button>"#,
        r#"<script src="/a.js"></script><p>document.write</p>"#,
        r#"<img src='http://a.com/x.png'><link rel='stylesheet' href='/s.css'>"#,
        r#"<link href="https://fonts.example/f.woff2" rel="stylesheet">"#,
        r#"<script>var x = 1;</script><link rel="stylesheet" href="https://cdn.example/s.css">"#,
        "<scr<script>ipt>broken</sc</script>ript><img src=",
    ]
}

#[test]
fn test_malicious_verdict_always_locks_down() {
    for doc in sample_documents() {
        assert_eq!(generate(&analyze(doc), true), LOCKDOWN);
    }
}

#[test]
fn test_first_and_last_fragments() {
    for doc in sample_documents() {
        let csp = generate(&analyze(doc), false);
        assert!(csp.starts_with("default-src 'self';"), "bad prefix for {:?}: {}", doc, csp);
        assert!(csp.ends_with(" report-uri /csp-report;"), "bad suffix for {:?}: {}", doc, csp);
        assert_eq!(csp.matches("report-uri").count(), 1);
    }
}

#[test]
fn test_script_free_documents_block_scripts_and_plugins() {
    for doc in sample_documents() {
        let features = analyze(doc);
        if features.has_script {
            continue;
        }
        let csp = generate(&features, false);
        assert!(csp.contains("script-src 'none'; object-src 'none';"), "{}", csp);
        assert!(!csp.contains("script-src 'self'"), "{}", csp);
    }
}

#[test]
fn test_external_script_allows_trusted_cdn() {
    let features = analyze(r#"<script src="https://trusted.cdn.com/app.js"></script>"#);
    assert!(features.has_script);
    assert!(!features.has_inline_script);

    let csp = generate(&features, false);
    assert!(csp.contains("script-src 'self' https://trusted.cdn.com;"));
    assert!(!csp.contains("object-src"));
}

#[test]
fn test_dynamic_code_disables_scripts() {
    let docs = [
        "<script>alert(1)</script>",
        r#"<script src="/a.js"></script><img src="x.png" onerror="steal()">"#,
        r##"<script src="/a.js"></script><a href="#" data-x="eval(code)">x</a>"##,
        r#"<script src="/a.js"></script><div>document.write</div>"#,
    ];
    for doc in docs {
        let features = analyze(doc);
        assert!(features.has_script);
        assert!(features.allows_dynamic_code(), "{}", doc);

        let csp = generate(&features, false);
        assert!(csp.contains(" script-src 'none';"), "{}", csp);
        assert!(!csp.contains("trusted.cdn.com"), "{}", csp);
    }
}

#[test]
fn test_relative_image_sources_trigger_directive_without_listing() {
    let features = analyze(r#"<img src="/logo.png"><img src="data:image/png;base64,AA==">"#);
    assert_eq!(features.img_sources.len(), 2);

    let csp = generate(&features, false);
    assert!(csp.contains(" img-src 'self';"), "{}", csp);
    assert!(!csp.contains("/logo.png"));
    assert!(!csp.contains("data:"));
}

#[test]
fn test_analysis_is_idempotent() {
    for doc in sample_documents() {
        assert_eq!(analyze(doc), analyze(doc));
    }
}

#[test]
fn test_scenario_image_and_relative_stylesheet() {
    let features = analyze(r#"<img src='http://a.com/x.png'><link rel='stylesheet' href='/s.css'>"#);
    assert!(!features.has_script);
    assert_eq!(features.img_sources.iter().collect::<Vec<_>>(), vec!["http://a.com/x.png"]);
    assert_eq!(features.style_sources.iter().collect::<Vec<_>>(), vec!["/s.css"]);

    assert_eq!(
        generate(&features, false),
        "default-src 'self'; script-src 'none'; object-src 'none'; img-src 'self' http://a.com/x.png; \
         style-src 'self'; report-uri /csp-report;"
    );
}

#[test]
fn test_scenario_inline_script() {
    let features = analyze("<script>alert(1)</script>");
    assert!(features.has_script);
    assert!(features.has_inline_script);

    let csp = generate(&features, false);
    assert!(csp.contains("script-src 'none';"));
    assert!(!csp.contains("https://trusted.cdn.com"));
}

#[test]
fn test_scenario_form_only() {
    let csp = generate(&analyze("<form></form>"), false);
    assert!(csp.contains("form-action 'self';"));
    assert!(!csp.contains("img-src"));
    assert!(!csp.contains("style-src"));
    assert!(!csp.contains("font-src"));
}

#[test]
fn test_full_page() {
    let html = r#"<!DOCTYPE html>
<html>
<head>
    <link rel="stylesheet" href="https://cdn.example/site.css">
    <link href="/local.css" rel="stylesheet">
    <link rel="preload" href="https://fonts.example/inter.woff2" as="font">
    <script src="https://trusted.cdn.com/app.js"></script>
</head>
<body>
    <img src="https://img.example/b.png">
    <img src="https://img.example/a.png">
    <form action="/login"><input name="user"></form>
</body>
</html>"#;

    assert_eq!(
        generate(&analyze(html), false),
        "default-src 'self'; script-src 'self' https://trusted.cdn.com; form-action 'self'; \
         img-src 'self' https://img.example/a.png https://img.example/b.png; \
         style-src 'self' https://cdn.example/site.css; \
         font-src 'self' https://fonts.example/inter.woff2; report-uri /csp-report;"
    );
}

#[test]
fn test_generator_with_lazy_classifier() {
    let classifier = LazyClassifier::new(|| Ok(StaticVerdict::BENIGN));
    let generator = CspGenerator::new(PolicyConfig::default(), classifier).unwrap();
    assert!(!generator.classifier().is_loaded());

    let analysis = generator.analyze("<form></form>").unwrap();
    assert!(!analysis.is_malicious);
    assert!(analysis.features.has_form);
    assert!(generator.classifier().is_loaded());
    assert_eq!(CONTENT_SECURITY_POLICY_HEADER, "Content-Security-Policy");
}

#[test]
fn test_concurrent_analyses_do_not_interfere() {
    let handles: Vec<_> = sample_documents()
        .into_iter()
        .map(|doc| std::thread::spawn(move || (doc, generate(&analyze(doc), false))))
        .collect();

    for handle in handles {
        let (doc, csp) = handle.join().unwrap();
        assert_eq!(csp, generate(&analyze(doc), false));
    }
}

#[test]
fn test_handler_like_attribute_disables_external_scripts() {
    let html = r#"<meta name="viewport" content="width=device-width"><script src="/app.js"></script>"#;
    let features = analyze(html);
    assert!(features.has_event_handlers);

    let csp = generate(&features, false);
    assert_eq!(csp, "default-src 'self'; script-src 'none'; report-uri /csp-report;");

    let features = analyze(r#"<script src="/app.js"></script><img src=x xonerror=1 _onload=2>"#);
    assert!(features.has_event_handlers);
    assert!(generate(&features, false).contains(" script-src 'none';"));
}
