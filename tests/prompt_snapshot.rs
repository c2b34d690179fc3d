use lingualens::languages::Tone;
use lingualens::settings;
use lingualens::translations::{TOOL_NAME, TranslateOptions, render_system_prompt};

#[test]
fn system_prompt_snapshot() {
    let settings = settings::load_settings(None).unwrap();
    let options = TranslateOptions {
        lang: "en".to_string(),
        tone: Tone::Formal,
    };
    let prompt = render_system_prompt(&options, TOOL_NAME, &settings).unwrap();
    insta::assert_snapshot!(prompt);
}
