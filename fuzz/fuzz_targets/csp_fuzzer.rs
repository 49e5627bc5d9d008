#![no_main]
//! CSP generation fuzzing
//!
//! Drives arbitrary documents through feature extraction and policy
//! synthesis and checks that generation never panics and always keeps
//! the fixed directive frame.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use citadel_csp::{analyze, generate, lockdown_policy};

/// Document built from fragments that exercise the detection rules
#[derive(Debug, Arbitrary)]
pub struct CspFuzzInput {
    pub prefix: String,
    pub fragments: Vec<Fragment>,
    pub is_malicious: bool,
}

#[derive(Debug, Arbitrary)]
pub enum Fragment {
    Text(String),
    Script { src: Option<String>, body: String },
    Img(String),
    Stylesheet { href: String, href_first: bool },
    Font(String),
    Handler { name: String, value: String },
    Form,
}

impl Fragment {
    fn render(&self, out: &mut String) {
        match self {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Script { src: Some(src), body } => {
                out.push_str(&format!("<script src=\"{}\">{}</script>", src, body))
            }
            Fragment::Script { src: None, body } => {
                out.push_str(&format!("<script>{}</script>", body))
            }
            Fragment::Img(src) => out.push_str(&format!("<img src='{}'>", src)),
            Fragment::Stylesheet { href, href_first: true } => {
                out.push_str(&format!("<link href=\"{}\" rel=\"stylesheet\">", href))
            }
            Fragment::Stylesheet { href, href_first: false } => {
                out.push_str(&format!("<link rel=\"stylesheet\" href=\"{}\">", href))
            }
            Fragment::Font(href) => out.push_str(&format!("<link href=\"{}.woff2\">", href)),
            Fragment::Handler { name, value } => {
                out.push_str(&format!("<div on{}=\"{}\">", name, value))
            }
            Fragment::Form => out.push_str("<form></form>"),
        }
    }
}

fuzz_target!(|input: CspFuzzInput| {
    let mut document = input.prefix.clone();
    for fragment in &input.fragments {
        fragment.render(&mut document);
    }

    let features = analyze(&document);
    assert_eq!(features, analyze(&document));

    let csp = generate(&features, input.is_malicious);
    if input.is_malicious {
        assert_eq!(csp, lockdown_policy("/csp-report").to_string());
    } else {
        assert!(csp.starts_with("default-src 'self';"));
        assert!(csp.ends_with(" report-uri /csp-report;"));
        if !features.has_script {
            assert!(csp.contains("script-src 'none'; object-src 'none';"));
        }
    }
});
